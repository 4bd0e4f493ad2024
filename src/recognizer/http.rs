//! Remote token classification over HTTP.
//!
//! Talks to a token-classification inference endpoint in the Hugging Face
//! inference API shape: the request is `{"inputs": text, "parameters":
//! {"aggregation_strategy": "none"}}` and the response is a list of
//! `{entity, score, start, end}` objects with codepoint offsets.

use super::{OUTSIDE_LABEL, TokenClassifier, TokenPrediction};
use crate::text::CharIndex;
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP classifier configuration.
#[derive(Debug, Clone)]
pub struct HttpClassifierConfig {
    /// Inference endpoint URL.
    pub endpoint: String,
    /// Optional bearer token.
    pub token: Option<SecretString>,
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl HttpClassifierConfig {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

    /// Default connect timeout.
    pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 3_000;

    /// Creates a configuration for `endpoint` with default timeouts.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: None,
            timeout_ms: Self::DEFAULT_TIMEOUT_MS,
            connect_timeout_ms: Self::DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    /// Sets request and connect timeouts.
    #[must_use]
    pub const fn with_timeouts(mut self, timeout_ms: u64, connect_timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self.connect_timeout_ms = connect_timeout_ms;
        self
    }
}

/// Token classifier backed by a remote inference endpoint.
pub struct HttpTokenClassifier {
    config: HttpClassifierConfig,
    client: reqwest::blocking::Client,
}

impl HttpTokenClassifier {
    /// Creates a classifier for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is empty or the HTTP client cannot be
    /// built.
    pub fn new(config: HttpClassifierConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(Error::InvalidInput(
                "recognizer endpoint must not be empty".to_string(),
            ));
        }

        let mut builder = reqwest::blocking::Client::builder();
        if config.timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(config.timeout_ms));
        }
        if config.connect_timeout_ms > 0 {
            builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
        }
        let client = builder.build().map_err(|e| Error::OperationFailed {
            operation: "build_recognizer_client".to_string(),
            cause: e.to_string(),
        })?;

        Ok(Self { config, client })
    }

    /// Returns the endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

impl TokenClassifier for HttpTokenClassifier {
    fn name(&self) -> &'static str {
        "http"
    }

    fn classify(&self, text: &str) -> Result<Vec<TokenPrediction>> {
        let request = InferenceRequest {
            inputs: text,
            parameters: InferenceParameters {
                aggregation_strategy: "none",
            },
        };

        let mut builder = self.client.post(&self.config.endpoint).json(&request);
        if let Some(token) = &self.config.token {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let response = builder.send().map_err(|e| {
            let error_kind = if e.is_timeout() {
                "timeout"
            } else if e.is_connect() {
                "connect"
            } else {
                "request"
            };
            tracing::error!(
                endpoint = %self.config.endpoint,
                error = %e,
                error_kind = error_kind,
                "Recognizer request failed"
            );
            Error::Recognition {
                cause: format!("{error_kind} error: {e}"),
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            tracing::error!(
                endpoint = %self.config.endpoint,
                status = %status,
                "Recognizer returned error status"
            );
            return Err(Error::Recognition {
                cause: format!("endpoint returned status {status}: {body}"),
            });
        }

        let parsed: InferenceResponse = response.json().map_err(|e| Error::Recognition {
            cause: format!("invalid recognizer response: {e}"),
        })?;

        Ok(fill_gaps(text, parsed.into_predictions()))
    }
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Serialize)]
struct InferenceParameters {
    aggregation_strategy: &'static str,
}

#[derive(Debug, Deserialize)]
struct TokenEntry {
    #[serde(alias = "entity_group")]
    entity: String,
    score: f64,
    #[serde(default)]
    start: Option<usize>,
    #[serde(default)]
    end: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Flat(Vec<TokenEntry>),
    Batched(Vec<Vec<TokenEntry>>),
}

impl InferenceResponse {
    fn into_predictions(self) -> Vec<TokenPrediction> {
        let entries = match self {
            Self::Flat(entries) => entries,
            Self::Batched(batches) => batches.into_iter().next().unwrap_or_default(),
        };
        entries
            .into_iter()
            .map(|entry| {
                // Entries without offsets become zero-width and are skipped downstream.
                let start = entry.start.unwrap_or(0);
                let end = entry.end.unwrap_or(start);
                TokenPrediction::new(start, end, entry.entity, entry.score)
            })
            .collect()
    }
}

/// Inserts `O` tokens where the endpoint dropped non-entity text between two
/// predictions, so tokens separated by other words are not merged.
fn fill_gaps(text: &str, mut tokens: Vec<TokenPrediction>) -> Vec<TokenPrediction> {
    tokens.sort_by_key(|token| token.start);
    let index = CharIndex::new(text);
    let mut filled = Vec::with_capacity(tokens.len());
    let mut prev_end: Option<usize> = None;

    for token in tokens {
        if let Some(end) = prev_end
            && token.start > end
            && index
                .slice(end, token.start)
                .is_none_or(|gap| gap.chars().any(|c| !c.is_whitespace()))
        {
            filled.push(TokenPrediction::new(end, token.start, OUTSIDE_LABEL, 1.0));
        }
        if token.end > token.start {
            prev_end = Some(token.end);
        }
        filled.push(token);
    }

    filled
}
