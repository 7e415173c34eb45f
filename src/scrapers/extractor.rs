//! Turn fetched bodies into [`Article`] records.
//!
//! A [`ParsedPage`] owns the parsed document; [`ParsedPage::articles`] then
//! walks it lazily, so nothing is built for blocks past the per-source cap.
//! The iterator is single-use: re-extracting means parsing the body again.
//!
//! Extraction never fails. HTML that yields no matching blocks, or a feed
//! that does not parse, simply produces no articles.

use crate::config::{ExtractionRule, SourceConfig};
use crate::models::Article;
use crate::utils::{collapse_whitespace, truncate_chars};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("static selector"));
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("static selector"));

/// Elements whose text is never article content.
const IRRELEVANT: [&str; 8] = [
    "script", "style", "img", "input", "nav", "footer", "header", "form",
];

struct CompiledSelectors {
    item: Selector,
    title: Selector,
    link: Option<Selector>,
    snippet: Option<Selector>,
}

#[derive(Debug, Default, Deserialize)]
struct Rss {
    #[serde(default)]
    channel: Channel,
}

#[derive(Debug, Default, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
}

enum Parsed {
    Selectors(Html, CompiledSelectors),
    PageText(Html),
    Feed(Vec<RssItem>),
    Nothing,
}

/// A source body parsed according to the source's [`ExtractionRule`].
pub struct ParsedPage<'s> {
    source: &'s SourceConfig,
    base: Option<Url>,
    parsed: Parsed,
}

impl<'s> ParsedPage<'s> {
    pub fn parse(source: &'s SourceConfig, body: &str) -> Self {
        let parsed = match &source.rule {
            ExtractionRule::Selectors {
                item,
                title,
                link,
                snippet,
            } => match compile(item, title, link.as_deref(), snippet.as_deref()) {
                Some(selectors) => Parsed::Selectors(Html::parse_document(body), selectors),
                None => {
                    warn!(source = %source.name, "Invalid selectors; no articles extracted");
                    Parsed::Nothing
                }
            },
            ExtractionRule::PageText => Parsed::PageText(Html::parse_document(body)),
            ExtractionRule::Rss => match quick_xml::de::from_str::<Rss>(body) {
                Ok(rss) => Parsed::Feed(rss.channel.items),
                Err(e) => {
                    warn!(source = %source.name, error = %e, "Unparseable feed; no articles extracted");
                    Parsed::Nothing
                }
            },
        };

        Self {
            source,
            base: Url::parse(&source.url).ok(),
            parsed,
        }
    }

    /// Lazily extract articles from the page.
    ///
    /// `max_content_chars` caps the text of a `page_text` article.
    pub fn articles(&self, max_content_chars: usize) -> Box<dyn Iterator<Item = Article> + '_> {
        match &self.parsed {
            Parsed::Selectors(html, selectors) => Box::new(
                html.select(&selectors.item)
                    .filter_map(move |block| self.from_block(block, selectors)),
            ),
            Parsed::PageText(html) => Box::new(self.from_page_text(html, max_content_chars).into_iter()),
            Parsed::Feed(items) => Box::new(items.iter().filter_map(move |item| self.from_rss_item(item))),
            Parsed::Nothing => Box::new(std::iter::empty()),
        }
    }

    fn resolve(&self, href: &str) -> String {
        match &self.base {
            Some(base) => base
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        }
    }

    fn from_block(&self, block: ElementRef<'_>, selectors: &CompiledSelectors) -> Option<Article> {
        let raw_title = block
            .select(&selectors.title)
            .next()
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|t| !t.is_empty())?;

        let link = selectors
            .link
            .as_ref()
            .and_then(|sel| block.select(sel).next())
            .and_then(|el| el.value().attr("href"))
            .map(|href| self.resolve(href))
            .unwrap_or_else(|| self.source.url.clone());

        let raw_snippet = selectors
            .snippet
            .as_ref()
            .and_then(|sel| block.select(sel).next())
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .unwrap_or_default();

        Some(Article {
            source_url: self.source.url.clone(),
            raw_title,
            raw_snippet,
            link,
        })
    }

    fn from_page_text(&self, html: &Html, max_content_chars: usize) -> Option<Article> {
        let body = html.select(&BODY).next()?;
        let mut lines = Vec::new();
        collect_text(body, &mut lines);
        let text = lines.join("\n");
        if text.is_empty() {
            debug!(source = %self.source.name, "Page has no body text");
            return None;
        }

        let raw_title = html
            .select(&TITLE)
            .next()
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .unwrap_or_else(|| self.source.name.clone());

        let capped = truncate_chars(&text, max_content_chars);
        if capped.len() < text.len() {
            debug!(source = %self.source.name, chars = max_content_chars, "Truncated page text");
        }

        Some(Article {
            source_url: self.source.url.clone(),
            raw_title,
            raw_snippet: capped.to_string(),
            link: self.source.url.clone(),
        })
    }

    fn from_rss_item(&self, item: &RssItem) -> Option<Article> {
        let raw_title = item
            .title
            .as_deref()
            .map(collapse_whitespace)
            .filter(|t| !t.is_empty())?;
        let link = item
            .link
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| self.resolve(l))
            .unwrap_or_else(|| self.source.url.clone());
        // Descriptions frequently carry escaped HTML
        let raw_snippet = item
            .description
            .as_deref()
            .map(|d| {
                let fragment = Html::parse_fragment(d);
                collapse_whitespace(&fragment.root_element().text().collect::<String>())
            })
            .unwrap_or_default();

        Some(Article {
            source_url: self.source.url.clone(),
            raw_title,
            raw_snippet,
            link,
        })
    }
}

fn compile(
    item: &str,
    title: &str,
    link: Option<&str>,
    snippet: Option<&str>,
) -> Option<CompiledSelectors> {
    let optional = |css: Option<&str>| match css {
        Some(css) => Selector::parse(css).ok().map(Some),
        None => Some(None),
    };
    Some(CompiledSelectors {
        item: Selector::parse(item).ok()?,
        title: Selector::parse(title).ok()?,
        link: optional(link)?,
        snippet: optional(snippet)?,
    })
}

/// Depth-first text collection that skips [`IRRELEVANT`] subtrees.
fn collect_text(element: ElementRef<'_>, out: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = collapse_whitespace(text);
                if !trimmed.is_empty() {
                    out.push(trimmed);
                }
            }
            Node::Element(el) if IRRELEVANT.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
            }
            _ => {}
        }
    }
}

/// Parse `body` and collect up to `max_articles` articles.
pub fn extract_articles(
    source: &SourceConfig,
    body: &str,
    max_articles: usize,
    max_content_chars: usize,
) -> Vec<Article> {
    let page = ParsedPage::parse(source, body);
    let articles: Vec<Article> = page.articles(max_content_chars).take(max_articles).collect();
    debug!(source = %source.name, count = articles.len(), "Extracted articles");
    articles
}
