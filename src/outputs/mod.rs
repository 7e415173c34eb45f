//! Output generation for the JSON artifact and the static page.
//!
//! # Submodules
//!
//! - [`json`]: Atomically writes the [`NewsFeed`](crate::models::NewsFeed) to `news.json`
//! - [`html`]: Renders any `news.json` artifact into a static HTML page
//!
//! # Output Structure
//!
//! ```text
//! site/
//! ├── news.json     # category → [ {headline, summary, key_points} ]
//! └── index.html    # rendered page (optional)
//! ```

pub mod html;
pub mod json;
