//! Static page rendering of a `news.json` artifact.
//!
//! The renderer reads the artifact as generic JSON, so it works on any file
//! honoring the artifact contract, not only ones this binary wrote. Keys are
//! rendered in document order; categories with no articles are skipped.
//!
//! Failures never escape as errors: a failed load, a non-OK status, or
//! invalid JSON all render as an inline failure message, and an empty or
//! `null` artifact renders as "No news data found."

use chrono::{DateTime, Local, Utc};
use serde_json::Value;
use std::fmt::Write;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// What loading the artifact produced, mirroring a browser `fetch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The artifact body, as text.
    Body(String),
    /// The server answered with a non-OK status.
    Status(u16),
    /// The request itself failed.
    Failed(String),
}

/// Escape text for inclusion in HTML element content or attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn failure(message: &str) -> String {
    format!("<p>⚠️ Failed to load news: {}</p>", escape(message))
}

const NO_DATA: &str = "<p>No news data found.</p>";

fn str_field<'v>(article: &'v Value, key: &str) -> &'v str {
    article.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn render_article(out: &mut String, article: &Value) {
    let _ = write!(
        out,
        "<div class=\"article\"><h3>{}</h3><p>{}</p><ul>",
        escape(str_field(article, "headline")),
        escape(str_field(article, "summary")),
    );
    if let Some(points) = article.get("key_points").and_then(Value::as_array) {
        for point in points {
            let text = match point {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let _ = write!(out, "<li>{}</li>", escape(&text));
        }
    }
    out.push_str("</ul></div>");
}

/// Render the inner HTML of the news container.
pub fn render_container(outcome: &FetchOutcome) -> String {
    let body = match outcome {
        FetchOutcome::Body(body) => body,
        FetchOutcome::Status(status) => {
            return failure(&format!("HTTP error! status: {status}"));
        }
        FetchOutcome::Failed(message) => return failure(message),
    };

    let data: Value = match serde_json::from_str(body) {
        Ok(data) => data,
        Err(e) => return failure(&e.to_string()),
    };
    let categories = match data.as_object() {
        Some(map) if !map.is_empty() => map,
        _ => return NO_DATA.to_string(),
    };

    let mut out = String::new();
    for (category, articles) in categories {
        let Some(articles) = articles.as_array().filter(|a| !a.is_empty()) else {
            continue;
        };
        let _ = write!(
            out,
            "<section class=\"category\"><h2>{}</h2>",
            escape(category)
        );
        for article in articles {
            render_article(&mut out, article);
        }
        out.push_str("</section>");
    }
    out
}

/// Wrap container markup in a complete page.
pub fn render_page(container: &str, last_updated: DateTime<Utc>) -> String {
    let stamp = last_updated
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M %Z");
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>Daily News Digest</title>\n\
         <link rel=\"stylesheet\" href=\"style.css\">\n\
         </head>\n\
         <body>\n\
         <h1>Daily News Digest</h1>\n\
         <p class=\"updated\">Last updated: {}</p>\n\
         <div id=\"news-container\">{}</div>\n\
         </body>\n\
         </html>\n",
        escape(&stamp.to_string()),
        container
    )
}

/// Load an artifact from an `http(s)` URL or a local path.
///
/// Returns the outcome plus the best known generation time: the file's
/// modification time for local paths, otherwise now. `timeout` bounds the
/// whole HTTP request, body included.
#[instrument(level = "info")]
pub async fn fetch_artifact(from: &str, timeout: Duration) -> (FetchOutcome, DateTime<Utc>) {
    if from.starts_with("http://") || from.starts_with("https://") {
        return (fetch_remote(from, timeout).await, Utc::now());
    }

    let path = Path::new(from);
    match tokio::fs::read_to_string(path).await {
        Ok(text) => {
            let modified = tokio::fs::metadata(path)
                .await
                .and_then(|m| m.modified())
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            info!(bytes = text.len(), "Loaded artifact from disk");
            (FetchOutcome::Body(text), modified)
        }
        Err(e) => {
            warn!(error = %e, "Failed to read artifact");
            (FetchOutcome::Failed(e.to_string()), Utc::now())
        }
    }
}

async fn fetch_remote(url: &str, timeout: Duration) -> FetchOutcome {
    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => return FetchOutcome::Failed(e.to_string()),
    };
    match client.get(url).send().await {
        Ok(resp) if resp.status().is_success() => match resp.text().await {
            Ok(text) => FetchOutcome::Body(text),
            Err(e) => FetchOutcome::Failed(e.to_string()),
        },
        Ok(resp) => FetchOutcome::Status(resp.status().as_u16()),
        Err(e) => {
            warn!(error = %e, timed_out = e.is_timeout(), "Failed to fetch artifact");
            FetchOutcome::Failed(e.to_string())
        }
    }
}
