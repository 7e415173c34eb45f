//! Source scraping: fetching pages and extracting candidate articles.
//!
//! Scraping follows a two-phase pattern:
//!
//! 1. **Fetching**: [`fetcher`] downloads each configured source once, skipping
//!    sources that fail.
//! 2. **Extraction**: [`extractor`] parses each body with the source's
//!    extraction rule and yields [`Article`](crate::models::Article) records.
//!
//! # Extraction rules
//!
//! | Rule | Input | Articles per page |
//! |------|-------|-------------------|
//! | `selectors` | HTML front page | one per matching block |
//! | `page_text` | any HTML page | one, holding the cleaned page text |
//! | `rss` | RSS 2.0 feed | one per `<item>` |

pub mod extractor;
pub mod fetcher;
