//! Chat pipeline: content filter → registry check → blank check → retrieval →
//! generation.
//!
//! Failures are classified into [`ChatError`] and logged with full detail.
//! Only validation errors reach the caller; every other failure becomes the
//! fixed apology so end users never see provider or storage internals.

use thiserror::Error;

use crate::app::App;
use crate::messages::{DEFLECTION, EMPTY_MESSAGE, GENERIC_APOLOGY, NOT_INDEXED};
use crate::provider::ProviderError;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("provider temporarily unavailable: {0}")]
    TransientProvider(#[source] ProviderError),
    #[error("provider failure: {0}")]
    Provider(#[source] ProviderError),
    #[error("store failure: {0:#}")]
    Store(anyhow::Error),
}

impl ChatError {
    pub fn kind(&self) -> &'static str {
        match self {
            ChatError::Validation(_) => "validation",
            ChatError::TransientProvider(_) => "transient_provider",
            ChatError::Provider(_) => "provider",
            ChatError::Store(_) => "store",
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ChatError::TransientProvider(_))
    }

    /// Errors from retrieval may come from the embedder or from storage.
    fn from_retrieval(err: anyhow::Error) -> Self {
        match err.downcast::<ProviderError>() {
            Ok(provider) => provider.into(),
            Err(err) => ChatError::Store(err),
        }
    }
}

impl From<ProviderError> for ChatError {
    fn from(err: ProviderError) -> Self {
        if err.is_transient() {
            ChatError::TransientProvider(err)
        } else {
            ChatError::Provider(err)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    Deflected,
    NotIndexed,
    Answered { sources: Vec<String> },
    Failed { kind: &'static str },
}

#[derive(Debug, Clone)]
pub struct ChatReply {
    pub response: String,
    pub outcome: ChatOutcome,
}

impl ChatReply {
    fn fixed(response: &str, outcome: ChatOutcome) -> Self {
        Self {
            response: response.to_string(),
            outcome,
        }
    }
}

/// Answers one chat message.
///
/// Returns `Err` only for [`ChatError::Validation`].
pub async fn respond(app: &App, message: &str) -> Result<ChatReply, ChatError> {
    match run_pipeline(app, message).await {
        Ok(reply) => Ok(reply),
        Err(err @ ChatError::Validation(_)) => Err(err),
        Err(err) => {
            tracing::error!(
                kind = err.kind(),
                transient = err.is_transient(),
                error = %err,
                "chat request failed"
            );
            Ok(ChatReply::fixed(
                GENERIC_APOLOGY,
                ChatOutcome::Failed { kind: err.kind() },
            ))
        }
    }
}

async fn run_pipeline(app: &App, message: &str) -> Result<ChatReply, ChatError> {
    let question = message.trim();

    if app.filter.is_offensive(question) {
        tracing::info!("message deflected by content filter");
        return Ok(ChatReply::fixed(DEFLECTION, ChatOutcome::Deflected));
    }

    // An empty index answers every message, blank ones included.
    if app.registry.count().await.map_err(ChatError::Store)? == 0 {
        return Ok(ChatReply::fixed(NOT_INDEXED, ChatOutcome::NotIndexed));
    }

    if question.is_empty() {
        return Err(ChatError::Validation(EMPTY_MESSAGE.to_string()));
    }

    let context = app
        .index
        .retrieve(question, app.config.retrieval.top_k)
        .await
        .map_err(ChatError::from_retrieval)?;
    tracing::debug!(hits = context.len(), "retrieved context");

    let answer = app.generator.generate(question, &context).await?;

    let mut sources: Vec<String> = Vec::new();
    for hit in &context {
        if !sources.contains(&hit.document_id) {
            sources.push(hit.document_id.clone());
        }
    }

    Ok(ChatReply {
        response: answer,
        outcome: ChatOutcome::Answered { sources },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_are_classified() {
        let transient: ChatError = ProviderError::Transient("HTTP 503".into()).into();
        assert_eq!(transient.kind(), "transient_provider");
        assert!(transient.is_transient());

        let rejected: ChatError = ProviderError::Rejected("HTTP 401".into()).into();
        assert_eq!(rejected.kind(), "provider");
        assert!(!rejected.is_transient());
    }

    #[test]
    fn retrieval_errors_keep_provider_classification() {
        let from_embedder = anyhow::Error::new(ProviderError::Transient("timeout".into()));
        assert_eq!(ChatError::from_retrieval(from_embedder).kind(), "transient_provider");

        let from_store = anyhow::anyhow!("database is locked");
        assert_eq!(ChatError::from_retrieval(from_store).kind(), "store");
    }
}
