//! The scrape → extract → classify → aggregate pipeline.
//!
//! Stages run strictly one after another. Per-source, per-page and
//! per-article failures are recovered inside their stage; this function
//! always produces a feed, possibly an empty one.

use crate::api::AskAsync;
use crate::classifier::Classifier;
use crate::config::Config;
use crate::models::{Article, NewsFeed};
use crate::scrapers::extractor::extract_articles;
use crate::scrapers::fetcher::{Fetcher, fetch_sources};
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

/// Run every stage up to (not including) writing the artifact.
#[instrument(level = "info", skip_all, fields(sources = config.sources.len()))]
pub async fn build_feed<A>(
    config: &Config,
    fetcher: &Fetcher,
    classifier: &Classifier<'_, A>,
    generated_at: DateTime<Utc>,
) -> NewsFeed
where
    A: AskAsync<Response = String>,
{
    // ---- Fetch ----
    let pages = fetch_sources(fetcher, &config.sources).await;

    // ---- Extract ----
    let articles: Vec<Article> = pages
        .iter()
        .flat_map(|page| {
            let articles = extract_articles(
                &page.source,
                &page.body,
                config.extract.max_articles_per_source,
                config.classifier.max_content_chars,
            );
            info!(source = %page.source.name, count = articles.len(), "Extracted articles");
            articles
        })
        .collect();
    info!(count = articles.len(), "Total articles to classify");

    // ---- Classify & aggregate ----
    let mut feed = NewsFeed::new(generated_at);
    for classified in classifier.classify_all(&articles).await {
        feed.push(classified);
    }

    for (category, entries) in feed.categories() {
        info!(%category, count = entries.len(), "Category totals");
    }
    feed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::tests::CannedAsk;
    use crate::config::{ExtractionRule, SourceConfig};
    use crate::models::Category;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FRONT_PAGE: &str = r#"<html><body>
        <div class="card"><h2>Election called</h2><p>Polls open soon.</p></div>
        <div class="card"><h2>Cup final tonight</h2></div>
        <div class="card"><h2>Mystery item</h2></div>
    </body></html>"#;

    #[tokio::test]
    async fn test_pipeline_skips_bad_source_and_unparseable_article() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/front"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FRONT_PAGE))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut config = Config::builtin();
        config.sources = vec![
            SourceConfig {
                name: "Down".into(),
                url: format!("{}/down", server.uri()),
                rule: ExtractionRule::PageText,
            },
            SourceConfig {
                name: "Front".into(),
                url: format!("{}/front", server.uri()),
                rule: ExtractionRule::Selectors {
                    item: "div.card".into(),
                    title: "h2".into(),
                    link: None,
                    snippet: Some("p".into()),
                },
            },
        ];

        let client = CannedAsk::default()
            .with(
                "Title: Election called",
                r#"{"articles":[{"category":"world","headline":"Election called","summary":"S","key_points":["Polls open soon"]}]}"#,
            )
            .with(
                "Title: Cup final tonight",
                r#"{"articles":[{"category":"SPORTS ","headline":"Cup final","summary":"S","key_points":["Tonight"]}]}"#,
            )
            .with("Title: Mystery item", "I'm sorry, I can't do that.");

        let fetcher = Fetcher::new(&config.fetch).unwrap();
        let classifier = Classifier::new(client, &config.classifier);
        let generated_at = Utc::now();
        let feed = build_feed(&config, &fetcher, &classifier, generated_at).await;

        assert_eq!(feed.len(), 2);
        assert_eq!(feed.generated_at(), generated_at);
        assert_eq!(feed.articles(Category::World)[0].headline, "Election called");
        assert_eq!(feed.articles(Category::Sports)[0].headline, "Cup final");
        assert!(feed.articles(Category::Other).is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_with_no_reachable_sources_yields_empty_feed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut config = Config::builtin();
        for source in &mut config.sources {
            source.url = format!("{}/gone", server.uri());
        }

        let fetcher = Fetcher::new(&config.fetch).unwrap();
        let classifier = Classifier::new(CannedAsk::default(), &config.classifier);
        let feed = build_feed(&config, &fetcher, &classifier, Utc::now()).await;

        assert!(feed.is_empty());
        assert_eq!(feed.categories().count(), Category::ALL.len());
    }
}
