//! HTTP transport for OpenAI-compatible APIs.
//!
//! Shared by the embedding and chat providers. Requests are JSON `POST`s
//! authenticated with a bearer key read from `OPENAI_API_KEY`.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - Network errors and timeouts → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::time::Duration;

use thiserror::Error;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Failure talking to an embedding or language-model provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} is not set")]
    MissingCredentials(&'static str),
    #[error("{0} provider is disabled")]
    Disabled(&'static str),
    #[error("provider temporarily unavailable: {0}")]
    Transient(String),
    #[error("provider rejected the request: {0}")]
    Rejected(String),
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

/// Minimal client for `POST {api_base}/{path}` JSON endpoints.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    max_retries: u32,
}

impl OpenAiClient {
    /// Builds a client; the API key is read from the environment now but only
    /// required when a request is sent.
    pub fn new(api_base: &str, timeout_secs: u64, max_retries: u32) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty());

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            max_retries,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        self.post_json_with_retries(path, body, self.max_retries).await
    }

    /// Like [`post_json`](Self::post_json) with an explicit retry budget.
    pub async fn post_json_with_retries(
        &self,
        path: &str,
        body: &serde_json::Value,
        max_retries: u32,
    ) -> Result<serde_json::Value, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredentials(API_KEY_ENV))?;
        let url = format!("{}/{}", self.api_base, path.trim_start_matches('/'));

        let mut last_err = None;

        for attempt in 0..=max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::debug!(attempt, ?delay, url = %url, "retrying provider request");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .http
                .post(&url)
                .bearer_auth(api_key)
                .json(body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response
                            .json::<serde_json::Value>()
                            .await
                            .map_err(|e| ProviderError::InvalidResponse(e.to_string()));
                    }

                    let body_text = response.text().await.unwrap_or_default();

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(ProviderError::Transient(format!(
                            "HTTP {}: {}",
                            status, body_text
                        )));
                        continue;
                    }

                    return Err(ProviderError::Rejected(format!(
                        "HTTP {}: {}",
                        status, body_text
                    )));
                }
                Err(e) => {
                    last_err = Some(ProviderError::Transient(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| ProviderError::Transient("request failed after retries".into())))
    }
}
