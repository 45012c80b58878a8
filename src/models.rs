//! Core data models used throughout regdesk.
//!
//! These types represent the uploaded documents, chunks, and retrieval hits
//! that flow through the ingestion and question-answering pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A PDF accepted by the upload pipeline.
///
/// Serialized as `{"id", "filename", "date", "path"}` for the admin listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub id: String,
    pub filename: String,
    #[serde(rename = "date")]
    pub uploaded_at: DateTime<Utc>,
    pub path: PathBuf,
}

/// A chunk of a document's extracted text.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
}

/// A chunk returned by nearest-neighbor retrieval.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk_id: String,
    pub document_id: String,
    pub text: String,
    pub score: f32,
}
