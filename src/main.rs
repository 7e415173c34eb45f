//! # Daily Digest
//!
//! A daily news aggregation pipeline that scrapes a fixed set of news
//! sources, asks Gemini to classify each article into a category with a
//! headline, summary, and key points, and writes the result as a
//! category-keyed `news.json` for a static page to render.
//!
//! ## Usage
//!
//! ```sh
//! GEMINI_API_KEY=... daily_digest run -o site/news.json --html-output site/index.html
//! daily_digest render --from site/news.json
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Fetching**: Download each configured source page
//! 2. **Extraction**: Pull candidate articles out of each page
//! 3. **Classification**: Send articles to the model one at a time
//! 4. **Output**: Atomically write `news.json`, optionally render `index.html`
//!
//! Only a failure to write the artifact aborts a run; everything before it
//! degrades by skipping the failing source or article.

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod classifier;
mod cli;
mod config;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod utils;

use api::GeminiClient;
use classifier::Classifier;
use cli::{Cli, Command, RenderArgs, RunArgs};
use config::Config;
use outputs::{html, json};
use scrapers::fetcher::Fetcher;
use utils::ensure_writable_parent;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(?args.command, "Parsed CLI arguments");

    match args.command {
        Command::Run(run_args) => run(run_args).await,
        Command::Render(render_args) => render(render_args).await,
    }
}

#[instrument(level = "info", skip_all)]
async fn run(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let start_time = std::time::Instant::now();
    info!("daily_digest starting up");

    let config = Config::load(args.config.as_deref())?;

    let Some(api_key) = args.api_key.filter(|k| !k.trim().is_empty()) else {
        error!("GEMINI_API_KEY is not set; pass --api-key or export it");
        return Err("missing Gemini API key".into());
    };

    // Early check: fail before spending API calls if the artifact can't be written
    if let Err(e) = ensure_writable_parent(&args.output).await {
        error!(
            path = %args.output.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let fetcher = Fetcher::new(&config.fetch)?;
    let client = GeminiClient::new(&config.classifier, api_key)?;
    info!(model = %config.classifier.model, "Initialized Gemini client");
    let classifier = Classifier::new(client, &config.classifier);

    let feed = pipeline::build_feed(&config, &fetcher, &classifier, Utc::now()).await;
    if feed.is_empty() {
        warn!("No articles survived classification; writing an empty feed");
    }

    if let Err(e) = json::write_feed(&feed, &args.output).await {
        error!(error = %e, "Failed to write news.json");
        return Err(e.into());
    }

    if let Some(html_path) = &args.html_output {
        let body = serde_json::to_string(&feed)?;
        let container = html::render_container(&html::FetchOutcome::Body(body));
        let page = html::render_page(&container, feed.generated_at());
        match tokio::fs::write(html_path, page).await {
            Ok(()) => info!(path = %html_path.display(), "Wrote rendered page"),
            Err(e) => error!(path = %html_path.display(), error = %e, "Failed writing rendered page"),
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        articles = feed.len(),
        "Execution complete"
    );
    Ok(())
}

#[instrument(level = "info", skip_all, fields(from = %args.from))]
async fn render(args: RenderArgs) -> Result<(), Box<dyn Error>> {
    let (outcome, last_updated) = html::fetch_artifact(&args.from, Duration::from_secs(args.timeout_secs)).await;
    let page = html::render_page(&html::render_container(&outcome), last_updated);

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, page).await?;
            info!(path = %path.display(), "Wrote rendered page");
        }
        None => println!("{page}"),
    }
    Ok(())
}
