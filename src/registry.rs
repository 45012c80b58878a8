//! Document registry: metadata for every accepted upload.
//!
//! The [`DocumentRegistry`] trait is what the pipeline depends on; two
//! backends implement it:
//!
//! - **[`SqliteRegistry`]**: persisted next to the vector index, so the list
//!   of known documents survives restarts. Default.
//! - **[`InMemoryRegistry`]**: a volatile list (`registry.backend = "memory"`).
//!   Entries are lost on restart while stored files and vectors remain; run
//!   `regdesk prune` to drop the orphaned vectors.
//!
//! Listing order is upload order. Ids are generated by the caller and are
//! the only uniqueness guarantee.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::path::PathBuf;
use tokio::sync::RwLock;

use crate::models::UploadedDocument;

#[async_trait]
pub trait DocumentRegistry: Send + Sync {
    async fn add(&self, doc: &UploadedDocument) -> Result<()>;

    async fn list(&self) -> Result<Vec<UploadedDocument>>;

    async fn get(&self, id: &str) -> Result<Option<UploadedDocument>>;

    /// Removes and returns the entry, or `None` if the id is unknown.
    async fn remove(&self, id: &str) -> Result<Option<UploadedDocument>>;

    async fn count(&self) -> Result<usize>;

    fn backend_name(&self) -> &str;
}

// ============ SQLite ============

pub struct SqliteRegistry {
    pool: SqlitePool,
}

impl SqliteRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<UploadedDocument> {
    let uploaded_at: String = row.get("uploaded_at");
    let uploaded_at = DateTime::parse_from_rfc3339(&uploaded_at)
        .with_context(|| format!("invalid uploaded_at timestamp: {}", uploaded_at))?
        .with_timezone(&Utc);
    let path: String = row.get("path");

    Ok(UploadedDocument {
        id: row.get("id"),
        filename: row.get("filename"),
        uploaded_at,
        path: PathBuf::from(path),
    })
}

#[async_trait]
impl DocumentRegistry for SqliteRegistry {
    async fn add(&self, doc: &UploadedDocument) -> Result<()> {
        sqlx::query("INSERT INTO documents (id, filename, uploaded_at, path) VALUES (?, ?, ?, ?)")
            .bind(&doc.id)
            .bind(&doc.filename)
            .bind(doc.uploaded_at.to_rfc3339())
            .bind(doc.path.to_string_lossy().to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<UploadedDocument>> {
        let rows = sqlx::query("SELECT id, filename, uploaded_at, path FROM documents ORDER BY rowid")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_document).collect()
    }

    async fn get(&self, id: &str) -> Result<Option<UploadedDocument>> {
        let row = sqlx::query("SELECT id, filename, uploaded_at, path FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_document).transpose()
    }

    async fn remove(&self, id: &str) -> Result<Option<UploadedDocument>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT id, filename, uploaded_at, path FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let doc = row.as_ref().map(row_to_document).transpose()?;
        if doc.is_some() {
            sqlx::query("DELETE FROM documents WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(doc)
    }

    async fn count(&self) -> Result<usize> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as usize)
    }

    fn backend_name(&self) -> &str {
        "sqlite"
    }
}

// ============ In-memory ============

#[derive(Default)]
pub struct InMemoryRegistry {
    docs: RwLock<Vec<UploadedDocument>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentRegistry for InMemoryRegistry {
    async fn add(&self, doc: &UploadedDocument) -> Result<()> {
        self.docs.write().await.push(doc.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<UploadedDocument>> {
        Ok(self.docs.read().await.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<UploadedDocument>> {
        Ok(self.docs.read().await.iter().find(|d| d.id == id).cloned())
    }

    async fn remove(&self, id: &str) -> Result<Option<UploadedDocument>> {
        let mut docs = self.docs.write().await;
        let position = docs.iter().position(|d| d.id == id);
        Ok(position.map(|i| docs.remove(i)))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.docs.read().await.len())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
