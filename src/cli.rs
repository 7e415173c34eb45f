//! Command-line interface definitions for Daily Digest.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Options that carry secrets or deployment paths can also come from
//! environment variables.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the Daily Digest application.
///
/// # Examples
///
/// ```sh
/// # Scrape, classify and write news.json plus the rendered page
/// daily_digest run -o site/news.json --html-output site/index.html
///
/// # Re-render a published artifact
/// daily_digest render --from https://example.github.io/news/news.json -o index.html
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape sources, classify articles, and write the artifact
    Run(RunArgs),
    /// Render an existing artifact to HTML
    Render(RenderArgs),
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Path to config.yaml (built-in sources are used when omitted)
    #[arg(short, long, env = "DAILY_DIGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Where to write the JSON artifact
    #[arg(short, long, default_value = "news.json")]
    pub output: PathBuf,

    /// Also render the page to this path
    #[arg(long)]
    pub html_output: Option<PathBuf>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RenderArgs {
    /// Artifact location: a local path or an http(s) URL
    #[arg(short, long, default_value = "news.json")]
    pub from: String,

    /// Write the page here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Give up on a remote artifact after this many seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_defaults() {
        let cli = Cli::parse_from(["daily_digest", "run", "--api-key", "k"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.output, PathBuf::from("news.json"));
        assert_eq!(args.api_key.as_deref(), Some("k"));
        assert!(args.html_output.is_none());
    }

    #[test]
    fn test_run_short_flags() {
        let cli = Cli::parse_from([
            "daily_digest",
            "run",
            "-c",
            "/etc/digest.yaml",
            "-o",
            "/tmp/site/news.json",
            "--html-output",
            "/tmp/site/index.html",
        ]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.config, Some(PathBuf::from("/etc/digest.yaml")));
        assert_eq!(args.output, PathBuf::from("/tmp/site/news.json"));
        assert_eq!(args.html_output, Some(PathBuf::from("/tmp/site/index.html")));
    }

    #[test]
    fn test_render_args() {
        let cli = Cli::parse_from(["daily_digest", "render", "--from", "https://x/news.json"]);
        let Command::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(args.from, "https://x/news.json");
        assert!(args.output.is_none());
        assert_eq!(args.timeout_secs, 30);
    }
}
