//! HTTP retrieval of source pages.
//!
//! Each configured source is fetched once, in order, with a per-request
//! timeout. A failing source is logged and skipped; it never aborts the run.

use crate::config::{FetchConfig, SourceConfig};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Errors that can occur while fetching a single source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded `max_body_bytes`
    #[error("Response too large: {0} bytes")]
    ResponseTooLarge(usize),
}

/// A successfully fetched source body.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub source: SourceConfig,
    pub body: String,
}

/// Thin wrapper over a configured [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_body_bytes: usize,
}

impl Fetcher {
    /// Build a client with the configured timeout and `User-Agent`.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// GET `url` and return its body as text.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; scraped pages are
    /// not always honest about their encoding.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let bytes = read_limited_bytes(response, self.max_body_bytes).await?;
        debug!(bytes = bytes.len(), "Fetched body");
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Read a body chunk by chunk, giving up as soon as it passes `limit`.
///
/// Chunked responses carry no `Content-Length`, so the header check alone
/// cannot bound memory.
async fn read_limited_bytes(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, FetchError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge(len as usize));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(classify)?;
        let total = bytes.len().saturating_add(chunk.len());
        if total > limit {
            return Err(FetchError::ResponseTooLarge(total));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

fn classify(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(e)
    }
}

/// Fetch every source sequentially.
///
/// Failed fetches are logged and skipped without failing the batch.
///
/// # Returns
///
/// The successfully fetched pages, in source order.
#[instrument(level = "info", skip_all, fields(sources = sources.len()))]
pub async fn fetch_sources(fetcher: &Fetcher, sources: &[SourceConfig]) -> Vec<FetchedPage> {
    let pages: Vec<FetchedPage> = stream::iter(sources)
        .then(|source| async move {
            match fetcher.fetch(&source.url).await {
                Ok(body) => {
                    info!(source = %source.name, bytes = body.len(), "Fetched source");
                    Some(FetchedPage {
                        source: source.clone(),
                        body,
                    })
                }
                Err(e @ FetchError::HttpStatus(_)) => {
                    warn!(source = %source.name, url = %source.url, error = %e, "Source returned an error status; skipping");
                    None
                }
                Err(e) => {
                    error!(source = %source.name, url = %source.url, error = %e, "Source fetch failed; skipping");
                    None
                }
            }
        })
        .filter_map(std::future::ready)
        .collect()
        .await;

    info!(
        fetched = pages.len(),
        skipped = sources.len() - pages.len(),
        "Fetched sources"
    );
    pages
}
