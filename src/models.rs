//! Data models for scraped articles, classified articles, and the news feed.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Article`]: Raw scraped article data, discarded after classification
//! - [`Category`]: The closed set of buckets the classifier may assign
//! - [`ClassifiedArticle`]: Model-produced headline, summary, and key points
//! - [`NewsFeed`]: The category-keyed artifact written to `news.json`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A raw news article as extracted from a source page.
///
/// Created per run by the extractor and consumed by the classifier; never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// The URL of the source page this article was extracted from.
    pub source_url: String,
    /// The headline as it appeared on the page.
    pub raw_title: String,
    /// Teaser or body text. Empty when the page had none.
    pub raw_snippet: String,
    /// Absolute link to the article, or the source URL when none was found.
    pub link: String,
}

/// Classification bucket for an article.
///
/// Declaration order is the order categories appear in `news.json`.
/// Anything the model returns that does not match a known bucket lands in
/// [`Category::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Category {
    World,
    Business,
    Technology,
    Entertainment,
    Sports,
    Science,
    Health,
    #[default]
    Other,
}

impl Category {
    /// Every category, in artifact order.
    pub const ALL: [Category; 8] = [
        Category::World,
        Category::Business,
        Category::Technology,
        Category::Entertainment,
        Category::Sports,
        Category::Science,
        Category::Health,
        Category::Other,
    ];

    /// Display name, also used as the JSON key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::World => "World",
            Category::Business => "Business",
            Category::Technology => "Technology",
            Category::Entertainment => "Entertainment",
            Category::Sports => "Sports",
            Category::Science => "Science",
            Category::Health => "Health",
            Category::Other => "Other",
        }
    }

    /// Normalize a free-form category label.
    ///
    /// Case-folds and trims the input, accepts a handful of common aliases,
    /// and falls back to [`Category::Other`].
    ///
    /// # Examples
    ///
    /// ```ignore
    /// assert_eq!(Category::parse("  technology "), Category::Technology);
    /// assert_eq!(Category::parse("Tech"), Category::Technology);
    /// assert_eq!(Category::parse("Opinion"), Category::Other);
    /// ```
    pub fn parse(label: &str) -> Category {
        match label.trim().to_lowercase().as_str() {
            "world" | "world news" | "international" | "politics" => Category::World,
            "business" | "economy" | "finance" | "markets" => Category::Business,
            "technology" | "tech" | "science & technology" => Category::Technology,
            "entertainment" | "culture" | "arts" => Category::Entertainment,
            "sports" | "sport" => Category::Sports,
            "science" => Category::Science,
            "health" | "medicine" => Category::Health,
            _ => Category::Other,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// An article after classification.
///
/// In `news.json` the category is the enclosing key, so only `headline`,
/// `summary` and `key_points` are serialized.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClassifiedArticle {
    pub headline: String,
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(skip)]
    pub category: Category,
}

/// The category-keyed artifact produced by one run.
///
/// Every category is present, possibly with no articles. Within a category,
/// articles keep the order in which they were pushed.
#[derive(Debug, Clone)]
pub struct NewsFeed {
    generated_at: DateTime<Utc>,
    categories: BTreeMap<Category, Vec<ClassifiedArticle>>,
}

impl NewsFeed {
    /// Create an empty feed stamped with the run's generation time.
    pub fn new(generated_at: DateTime<Utc>) -> Self {
        let categories = Category::ALL.iter().map(|c| (*c, Vec::new())).collect();
        Self {
            generated_at,
            categories,
        }
    }

    /// Append an article to its category bucket.
    pub fn push(&mut self, article: ClassifiedArticle) {
        self.categories
            .entry(article.category)
            .or_default()
            .push(article);
    }

    /// When the pipeline produced this feed.
    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Articles in one category, in insertion order.
    #[cfg(test)]
    pub fn articles(&self, category: Category) -> &[ClassifiedArticle] {
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All categories with their articles, in artifact order.
    pub fn categories(&self) -> impl Iterator<Item = (Category, &[ClassifiedArticle])> {
        self.categories.iter().map(|(c, a)| (*c, a.as_slice()))
    }

    /// Total article count across every category.
    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Serialize for NewsFeed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.categories.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NewsFeed {
    /// Reads a `news.json` artifact. The generation time is not part of the
    /// artifact, so it is set to the time of loading.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Vec<ClassifiedArticle>>::deserialize(deserializer)?;
        let mut feed = NewsFeed::new(Utc::now());
        for (label, articles) in raw {
            let category = Category::parse(&label);
            for mut article in articles {
                article.category = category;
                feed.push(article);
            }
        }
        Ok(feed)
    }
}
