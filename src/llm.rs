//! Language-model clients.
//!
//! [`ChatModel`] is the seam the answer generator calls through. The OpenAI
//! implementation posts a single user message to `chat/completions`;
//! [`DisabledChatModel`] fails every call, which the chat pipeline turns into
//! its generic apology.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::provider::{OpenAiClient, ProviderError};

#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Sends `prompt` as a single user message and returns the reply text.
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}

pub struct DisabledChatModel;

#[async_trait]
impl ChatModel for DisabledChatModel {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
        Err(ProviderError::Disabled("llm"))
    }
}

pub struct OpenAiChatModel {
    model: String,
    temperature: f32,
    client: OpenAiClient,
}

impl OpenAiChatModel {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            model: config.model.clone(),
            temperature: config.temperature,
            client: OpenAiClient::new(&config.api_base, config.timeout_secs, config.max_retries)?,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [{ "role": "user", "content": prompt }],
        });
        let json = self.client.post_json("chat/completions", &body).await?;
        parse_completion(&json)
    }
}

/// Extracts `choices[0].message.content`.
fn parse_completion(json: &serde_json::Value) -> Result<String, ProviderError> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(|c| c.trim().to_string())
        .ok_or_else(|| ProviderError::InvalidResponse("missing choices[0].message.content".into()))
}

pub fn create_chat_model(config: &LlmConfig) -> Result<Arc<dyn ChatModel>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledChatModel)),
        "openai" => Ok(Arc::new(OpenAiChatModel::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_choice() {
        let json = serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": "  حياك الله.  " } },
                { "message": { "role": "assistant", "content": "ignored" } }
            ]
        });
        assert_eq!(parse_completion(&json).unwrap(), "حياك الله.");
    }

    #[test]
    fn missing_content_is_invalid_response() {
        let json = serde_json::json!({ "choices": [] });
        assert!(matches!(
            parse_completion(&json),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn disabled_model_fails() {
        let err = DisabledChatModel.complete("hi").await.unwrap_err();
        assert!(matches!(err, ProviderError::Disabled("llm")));
    }
}
