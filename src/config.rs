//! Run configuration loaded from `config.yaml`.
//!
//! The file is optional: without one, three built-in news front pages are
//! scraped in `page_text` mode. Every section uses
//! `#[serde(default)]`, so a file may override any subset of keys.
//!
//! ```yaml
//! sources:
//!   - name: Example
//!     url: https://news.example.com
//!     rule:
//!       kind: selectors
//!       item: article.story
//!       title: h2
//!       link: a[href]
//!       snippet: p.teaser
//!   - name: Example RSS
//!     url: https://news.example.com/rss.xml
//!     rule:
//!       kind: rss
//! fetch:
//!   timeout_secs: 15
//! classifier:
//!   model: gemini-2.5-flash
//! ```

use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML in config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration, passed by reference into every pipeline stage.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub sources: Vec<SourceConfig>,
    pub fetch: FetchConfig,
    pub extract: ExtractConfig,
    pub classifier: ClassifierConfig,
}

/// One news source and the rule used to pull articles out of it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub rule: ExtractionRule,
}

/// How a fetched body is turned into articles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionRule {
    /// CSS selectors for article blocks and the fields inside them.
    Selectors {
        item: String,
        title: String,
        #[serde(default)]
        link: Option<String>,
        #[serde(default)]
        snippet: Option<String>,
    },
    /// The whole cleaned page text as a single article.
    #[default]
    PageText,
    /// RSS 2.0 `<item>` elements.
    Rss,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request timeout.
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Bodies larger than this are rejected.
    pub max_body_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36"
                .to_string(),
            max_body_bytes: 5 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub max_articles_per_source: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_articles_per_source: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub model: String,
    /// Base URL of the Gemini REST API, without the `/models/...` suffix.
    pub endpoint: String,
    pub timeout_secs: u64,
    /// Article text sent to the model is cut to this many characters.
    pub max_content_chars: usize,
    /// Prompt with `{categories}` and `{content}` placeholders.
    pub prompt_template: String,
}

pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"You are a news content extractor. Your response MUST be a single, raw JSON object (no wrappers, no prose) that strictly adheres to the provided JSON schema.

From the following content, please:

1. Identify and extract the real news articles it contains.
2. Classify each article into exactly one of the following categories: {categories}.
3. For each article, provide: a headline, a brief summary (2-3 sentences), and key points (a list of the 2-4 most critical takeaways).
4. Filter out advertisements, navigation menus, and all irrelevant, non-news content.
5. Order articles by their importance, scale and effect from an Indian perspective.
6. Skip an article if the same news has already appeared.

If the content holds no news, return an empty "articles" array.

Content:
{content}"#;

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 120,
            max_content_chars: 55_000,
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
        }
    }
}

impl Config {
    /// Built-in configuration: three news front pages, scraped as plain
    /// page text.
    pub fn builtin() -> Self {
        let sources = [
            ("Times of India", "https://timesofindia.indiatimes.com"),
            ("Sputnik India", "https://sputniknews.in"),
            ("Euronews", "https://www.euronews.com/"),
        ]
        .into_iter()
        .map(|(name, url)| SourceConfig {
            name: name.to_string(),
            url: url.to_string(),
            rule: ExtractionRule::PageText,
        })
        .collect();

        Self {
            sources,
            ..Self::default()
        }
    }

    /// Load configuration from `path`, or the built-in defaults when `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// fails [`Config::validate`].
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                let config = Self::from_yaml(&text)?;
                info!(path = %path.display(), sources = config.sources.len(), "Loaded configuration");
                config
            }
            None => {
                info!("No config file given; using built-in sources");
                Self::builtin()
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML text. Missing keys take their defaults; an absent
    /// `sources` list takes the built-in sources.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let mut config: Config = serde_yaml::from_str(text)?;
        if config.sources.is_empty() {
            config.sources = Self::builtin().sources;
        }
        Ok(config)
    }

    /// Check invariants the pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid("no sources configured".into()));
        }
        if self.fetch.timeout_secs == 0 || self.classifier.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be non-zero".into()));
        }
        if !self.classifier.prompt_template.contains("{content}") {
            return Err(ConfigError::Invalid(
                "prompt_template must contain a {content} placeholder".into(),
            ));
        }
        for source in &self.sources {
            Url::parse(&source.url).map_err(|e| {
                ConfigError::Invalid(format!("source {:?} has invalid url: {e}", source.name))
            })?;
            if let ExtractionRule::Selectors {
                item,
                title,
                link,
                snippet,
            } = &source.rule
            {
                let all = [Some(item), Some(title), link.as_ref(), snippet.as_ref()];
                for css in all.into_iter().flatten() {
                    Selector::parse(css).map_err(|e| {
                        ConfigError::Invalid(format!(
                            "source {:?} has invalid selector {css:?}: {e}",
                            source.name
                        ))
                    })?;
                }
            }
        }
        Ok(())
    }
}
