//! Generative-AI API interaction.
//!
//! This module provides the interface used by the classifier to talk to a
//! model that returns structured JSON.
//!
//! # Architecture
//!
//! - [`AskAsync`]: Core trait defining async model interaction
//! - [`GeminiClient`]: Calls the Gemini `generateContent` REST endpoint with a
//!   JSON response schema
//!
//! Requests are made once. A failed call surfaces as an [`ApiError`] and the
//! caller decides what to drop.

use crate::config::ClassifierConfig;
use crate::models::Category;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, instrument, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("API response contained no text")]
    EmptyResponse,
}

/// Trait for async model interaction.
///
/// Implementors send a prompt and return the model's raw text response.
/// This abstraction lets tests substitute canned responses for the real
/// service.
pub trait AskAsync {
    /// The type of response returned by the model.
    type Response;

    /// Send text to the model and receive a response.
    async fn ask(&self, text: &str) -> Result<Self::Response, ApiError>;
}

/// Client for the Gemini `models/{model}:generateContent` endpoint.
///
/// Every request asks for `application/json` output constrained by
/// [`response_schema`].
pub struct GeminiClient {
    http: Client,
    endpoint: String,
    model: String,
    api_key: String,
    schema: Value,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &ClassifierConfig, api_key: String) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            schema: response_schema(),
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint,
            urlencoding::encode(&self.model)
        )
    }
}

impl AskAsync for GeminiClient {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, text: &str) -> Result<Self::Response, ApiError> {
        let t0 = Instant::now();
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": text }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": self.schema,
            }
        });

        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(elapsed_ms = t0.elapsed().as_millis() as u64, %status, "API call failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        debug!(elapsed_ms = t0.elapsed().as_millis() as u64, bytes = text.len(), "API call succeeded");
        if text.trim().is_empty() {
            return Err(ApiError::EmptyResponse);
        }
        Ok(text)
    }
}

/// The JSON schema the model's output must follow.
///
/// ```text
/// { "articles": [ { "category", "headline", "summary", "key_points": [..] } ] }
/// ```
pub fn response_schema() -> Value {
    let categories: Vec<&str> = Category::ALL.iter().map(Category::as_str).collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "articles": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "category": {
                            "type": "STRING",
                            "enum": categories,
                            "description": "The single category this article belongs to."
                        },
                        "headline": {
                            "type": "STRING",
                            "description": "The main headline of the news article."
                        },
                        "summary": {
                            "type": "STRING",
                            "description": "A brief summary of the article (2-3 sentences)."
                        },
                        "key_points": {
                            "type": "ARRAY",
                            "description": "A list of the 2-4 most critical takeaways.",
                            "items": { "type": "STRING" }
                        }
                    },
                    "required": ["category", "headline", "summary", "key_points"],
                    "propertyOrdering": ["category", "headline", "summary", "key_points"]
                }
            }
        },
        "required": ["articles"]
    })
}
