//! Ingestion pipeline orchestration.
//!
//! Upload flow: validate name → store file → extract → chunk → embed and
//! index → register. Any failure after the file is written removes the file
//! and purges vectors already written for the document, so a failed upload
//! leaves nothing behind.
//!
//! Deletion removes the registry entry, the stored file, and the document's
//! vectors. [`prune_orphans`] removes vectors whose document is no longer
//! registered.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::app::App;
use crate::chunk::chunk_text;
use crate::extract::{extract_pdf_text, ExtractError};
use crate::models::UploadedDocument;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("only PDF files are accepted, got '{0}'")]
    NotPdf(String),
    #[error("failed to store upload: {0}")]
    Storage(#[source] std::io::Error),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("no extractable text in '{0}'")]
    NoText(String),
    #[error("indexing failed: {0:#}")]
    Index(anyhow::Error),
    #[error("failed to register document: {0:#}")]
    Register(anyhow::Error),
}

impl IngestError {
    /// Whether the request itself was invalid, as opposed to a server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, IngestError::NotPdf(_))
    }
}

pub fn is_pdf_filename(filename: &str) -> bool {
    filename.to_lowercase().ends_with(".pdf")
}

/// Final path component of a client-supplied name, whichever separator it uses.
fn base_name(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim()
}

fn stored_path(upload_dir: &Path, id: &str, filename: &str) -> PathBuf {
    upload_dir.join(format!("{}_{}", id, base_name(filename)))
}

/// Stores, indexes, and registers an uploaded PDF.
pub async fn ingest_upload(
    app: &App,
    filename: &str,
    bytes: &[u8],
) -> Result<UploadedDocument, IngestError> {
    let filename = base_name(filename).to_string();
    if filename.is_empty() || !is_pdf_filename(&filename) {
        return Err(IngestError::NotPdf(filename));
    }

    let id = Uuid::new_v4().to_string();
    let path = stored_path(&app.config.storage.upload_dir, &id, &filename);

    tokio::fs::write(&path, bytes)
        .await
        .map_err(IngestError::Storage)?;

    let doc = UploadedDocument {
        id,
        filename,
        uploaded_at: Utc::now(),
        path,
    };

    match index_and_register(app, &doc).await {
        Ok(chunks) => {
            tracing::info!(
                document_id = %doc.id,
                filename = %doc.filename,
                chunks,
                "document ingested"
            );
            Ok(doc)
        }
        Err(err) => {
            tracing::error!(
                document_id = %doc.id,
                filename = %doc.filename,
                error = %err,
                "ingestion failed, cleaning up"
            );
            discard(app, &doc).await;
            Err(err)
        }
    }
}

/// Ingests a PDF from the local filesystem (CLI path).
pub async fn ingest_file(app: &App, path: &Path) -> Result<UploadedDocument> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(ingest_upload(app, &filename, &bytes).await?)
}

async fn index_and_register(app: &App, doc: &UploadedDocument) -> Result<usize, IngestError> {
    let text = extract_pdf_text(&doc.path).await?;
    let chunks = chunk_text(
        &doc.id,
        &text,
        app.config.chunking.chunk_size,
        app.config.chunking.chunk_overlap,
    );
    if chunks.is_empty() {
        return Err(IngestError::NoText(doc.filename.clone()));
    }

    let written = app.index.index(&chunks).await.map_err(IngestError::Index)?;
    app.registry.add(doc).await.map_err(IngestError::Register)?;
    Ok(written)
}

/// Best-effort removal of a failed upload's file and vectors.
async fn discard(app: &App, doc: &UploadedDocument) {
    if let Err(e) = tokio::fs::remove_file(&doc.path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %doc.path.display(), error = %e, "failed to remove upload");
        }
    }
    if let Err(e) = app.index.purge_document(&doc.id).await {
        tracing::warn!(document_id = %doc.id, error = %e, "failed to purge vectors");
    }
}

/// Removes a document everywhere. Unknown ids are a no-op.
pub async fn delete_document(app: &App, id: &str) -> Result<Option<UploadedDocument>> {
    let removed = app.registry.remove(id).await?;

    if let Some(doc) = &removed {
        match tokio::fs::remove_file(&doc.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %doc.path.display(), error = %e, "failed to remove stored file")
            }
        }
    }

    let purged = app.index.purge_document(id).await?;
    tracing::info!(document_id = id, found = removed.is_some(), purged, "document deleted");
    Ok(removed)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub documents: usize,
    pub vectors: u64,
}

/// Purges vectors of documents that are not in the registry.
pub async fn prune_orphans(app: &App) -> Result<PruneReport> {
    let known: std::collections::HashSet<String> = app
        .registry
        .list()
        .await?
        .into_iter()
        .map(|d| d.id)
        .collect();

    let mut report = PruneReport::default();
    for id in app.index.store().document_ids().await? {
        if known.contains(&id) {
            continue;
        }
        report.vectors += app.index.purge_document(&id).await?;
        report.documents += 1;
    }
    Ok(report)
}
