//! Article classification through the generative-AI service.
//!
//! Each [`Article`] is rendered into the configured prompt and sent to an
//! [`AskAsync`] client. The response must parse as
//! `{ "articles": [ {category, headline, summary, key_points} ] }`; anything
//! else drops the article with a log line and the run carries on.

use crate::api::{ApiError, AskAsync};
use crate::config::ClassifierConfig;
use crate::models::{Article, Category, ClassifiedArticle};
use crate::utils::{looks_truncated, truncate_chars, truncate_for_log};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Some models wrap JSON in a Markdown code fence despite the MIME type.
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("static regex"));

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("API call failed: {0}")]
    Api(#[from] ApiError),

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Model returned non-conforming JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct ModelResponse {
    articles: Vec<ModelArticle>,
}

#[derive(Debug, Deserialize)]
struct ModelArticle {
    #[serde(default)]
    category: String,
    headline: String,
    #[serde(default)]
    summary: String,
    key_points: Vec<String>,
}

impl ModelArticle {
    /// Normalize into a [`ClassifiedArticle`]; `None` when there is no headline.
    fn into_classified(self) -> Option<ClassifiedArticle> {
        let headline = self.headline.trim().to_string();
        if headline.is_empty() {
            return None;
        }
        let key_points = self
            .key_points
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unique()
            .collect();
        Some(ClassifiedArticle {
            headline,
            summary: self.summary.trim().to_string(),
            key_points,
            category: Category::parse(&self.category),
        })
    }
}

/// Render the prompt for one article.
pub fn build_prompt(config: &ClassifierConfig, article: &Article) -> String {
    let categories = Category::ALL
        .iter()
        .map(|c| format!("\"{}\"", c.as_str()))
        .join(", ");
    let mut content = format!(
        "Source: {}\nTitle: {}\nLink: {}\n",
        article.source_url, article.raw_title, article.link
    );
    if !article.raw_snippet.is_empty() {
        content.push('\n');
        content.push_str(truncate_chars(&article.raw_snippet, config.max_content_chars));
    }
    config
        .prompt_template
        .replace("{categories}", &categories)
        .replace("{content}", &content)
}

/// Validate a raw model response.
///
/// # Errors
///
/// [`ClassifyError::EmptyResponse`] for blank text and
/// [`ClassifyError::Malformed`] when the text does not match the schema.
/// Individual entries without a headline are dropped, not errors.
pub fn parse_response(text: &str) -> Result<Vec<ClassifiedArticle>, ClassifyError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ClassifyError::EmptyResponse);
    }
    let json = CODE_FENCE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map_or(trimmed, |m| m.as_str());

    let response: ModelResponse = serde_json::from_str(json)?;
    Ok(response
        .articles
        .into_iter()
        .filter_map(ModelArticle::into_classified)
        .collect())
}

/// Classifies articles with a model client.
#[derive(Debug)]
pub struct Classifier<'a, A> {
    client: A,
    config: &'a ClassifierConfig,
}

impl<'a, A> Classifier<'a, A>
where
    A: AskAsync<Response = String>,
{
    pub fn new(client: A, config: &'a ClassifierConfig) -> Self {
        Self { client, config }
    }

    /// Classify one article. A single article may yield several entries
    /// when its text holds more than one story.
    #[instrument(level = "info", skip_all, fields(title = %truncate_for_log(&article.raw_title, 80)))]
    pub async fn classify(&self, article: &Article) -> Result<Vec<ClassifiedArticle>, ClassifyError> {
        let prompt = build_prompt(self.config, article);
        let response = self.client.ask(&prompt).await?;
        parse_response(&response).inspect_err(|e| {
            if let ClassifyError::Malformed(inner) = e {
                warn!(
                    truncated = looks_truncated(inner),
                    response_preview = %truncate_for_log(&response, 300),
                    "Model returned non-conforming JSON"
                );
            }
        })
    }

    /// Classify articles one after another, dropping failures.
    ///
    /// # Returns
    ///
    /// Every classified entry, in the order the articles were given.
    #[instrument(level = "info", skip_all, fields(total = articles.len()))]
    pub async fn classify_all(&self, articles: &[Article]) -> Vec<ClassifiedArticle> {
        let results: Vec<Vec<ClassifiedArticle>> = stream::iter(articles.iter().enumerate())
            .then(|(i, article)| async move {
                debug!(index = i, source = %article.source_url, "Classifying article");
                match self.classify(article).await {
                    Ok(classified) => {
                        info!(index = i, entries = classified.len(), "Classified article");
                        classified
                    }
                    Err(ClassifyError::Api(e)) => {
                        error!(index = i, source = %article.source_url, error = %e, "API call failed; skipping article");
                        Vec::new()
                    }
                    Err(e) => {
                        warn!(index = i, source = %article.source_url, error = %e, "Unusable model response; skipping article");
                        Vec::new()
                    }
                }
            })
            .collect()
            .await;

        let classified: Vec<ClassifiedArticle> = results.into_iter().flatten().collect();
        info!(
            total = articles.len(),
            entries = classified.len(),
            "Completed article classification"
        );
        classified
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    /// Answers from a table keyed by a substring of the prompt.
    #[derive(Debug, Default)]
    pub(crate) struct CannedAsk {
        pub(crate) responses: HashMap<String, Result<String, u16>>,
    }

    impl CannedAsk {
        pub(crate) fn with(mut self, needle: &str, response: &str) -> Self {
            self.responses
                .insert(needle.to_string(), Ok(response.to_string()));
            self
        }

        pub(crate) fn failing(mut self, needle: &str, status: u16) -> Self {
            self.responses.insert(needle.to_string(), Err(status));
            self
        }
    }

    impl AskAsync for CannedAsk {
        type Response = String;

        async fn ask(&self, text: &str) -> Result<String, ApiError> {
            for (needle, response) in &self.responses {
                if text.contains(needle.as_str()) {
                    return match response {
                        Ok(body) => Ok(body.clone()),
                        Err(status) => Err(ApiError::Status {
                            status: *status,
                            body: String::new(),
                        }),
                    };
                }
            }
            Err(ApiError::EmptyResponse)
        }
    }

    fn article(title: &str) -> Article {
        Article {
            source_url: "https://news.example.com".into(),
            raw_title: title.into(),
            raw_snippet: format!("{title} body text"),
            link: "https://news.example.com/story".into(),
        }
    }

    #[test]
    fn test_build_prompt_fills_placeholders() {
        let config = ClassifierConfig::default();
        let prompt = build_prompt(&config, &article("Rates rise"));

        assert!(prompt.contains(r#""World", "Business", "Technology""#));
        assert!(prompt.contains("Title: Rates rise"));
        assert!(prompt.contains("Rates rise body text"));
        assert!(!prompt.contains("{content}"));
        assert!(!prompt.contains("{categories}"));
    }

    #[test]
    fn test_build_prompt_caps_content() {
        let config = ClassifierConfig {
            max_content_chars: 5,
            prompt_template: "{content}".into(),
            ..ClassifierConfig::default()
        };
        let mut long = article("T");
        long.raw_snippet = "abcdefghij".into();
        let prompt = build_prompt(&config, &long);
        assert!(prompt.ends_with("\nabcde"));
    }

    #[test]
    fn test_parse_response_normalizes_entries() {
        let text = r#"{"articles": [
            {"category": " technology ", "headline": " Chip launch ", "summary": "S",
             "key_points": ["a", " a ", "", "b"]},
            {"category": "Gossip", "headline": "Celebrity", "summary": "S2", "key_points": []},
            {"category": "World", "headline": "  ", "summary": "dropped", "key_points": ["x"]}
        ]}"#;
        let parsed = parse_response(text).unwrap();

        assert_eq!(parsed.len(), 2);
        assert_eq!(
            parsed[0],
            ClassifiedArticle {
                headline: "Chip launch".into(),
                summary: "S".into(),
                key_points: vec!["a".into(), "b".into()],
                category: Category::Technology,
            }
        );
        assert_eq!(parsed[1].category, Category::Other);
    }

    #[test]
    fn test_parse_response_strips_code_fence() {
        let text = "```json\n{\"articles\": []}\n```";
        assert!(parse_response(text).unwrap().is_empty());
    }

    #[test]
    fn test_parse_response_rejects_bad_payloads() {
        assert!(matches!(parse_response("   "), Err(ClassifyError::EmptyResponse)));
        assert!(matches!(
            parse_response("Sorry, I cannot help with that."),
            Err(ClassifyError::Malformed(_))
        ));
        // Missing required key_points
        assert!(matches!(
            parse_response(r#"{"articles":[{"headline":"H","summary":"S"}]}"#),
            Err(ClassifyError::Malformed(_))
        ));
        assert!(matches!(
            parse_response(r#"{"articles":[{"headline":"H""#),
            Err(ClassifyError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_classify_all_drops_unparseable_and_failed_articles() {
        let config = ClassifierConfig::default();
        let client = CannedAsk::default()
            .with(
                "Title: Good one",
                r#"{"articles":[{"category":"Sports","headline":"Win","summary":"S","key_points":["k"]}]}"#,
            )
            .with("Title: Garbage", "this is not json at all")
            .failing("Title: Broken", 500)
            .with(
                "Title: Good two",
                r#"{"articles":[{"category":"Health","headline":"Vaccine","summary":"S","key_points":[]}]}"#,
            );
        let classifier = Classifier::new(client, &config);

        let articles = vec![
            article("Good one"),
            article("Garbage"),
            article("Broken"),
            article("Good two"),
        ];
        let classified = classifier.classify_all(&articles).await;

        let headlines: Vec<&str> = classified.iter().map(|a| a.headline.as_str()).collect();
        assert_eq!(headlines, vec!["Win", "Vaccine"]);
        assert_eq!(classified[0].category, Category::Sports);
    }
}
