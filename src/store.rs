//! Vector store: persisted chunk embeddings and nearest-neighbor retrieval.
//!
//! The [`VectorStore`] trait is the storage seam; [`SqliteVectorStore`] keeps
//! one `chunk_vectors` row per chunk, tagged with its document id and the
//! embedding model that produced it. [`VectorIndex`] pairs a store with an
//! [`Embedder`] and exposes the two pipeline operations, `index` and
//! `retrieve`.
//!
//! Retrieval is brute-force cosine similarity over the rows of the active
//! model. Rows are scanned in insertion order and sorted stably, so equal
//! scores keep insertion order.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob, Embedder};
use crate::models::{Chunk, RetrievedChunk};

/// Abstract storage backend for chunk vectors.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert`](VectorStore::insert) | Append chunks and their vectors atomically |
/// | [`search`](VectorStore::search) | Top-k cosine similarity for one model |
/// | [`delete_document`](VectorStore::delete_document) | Purge a document's vectors |
/// | [`document_ids`](VectorStore::document_ids) | Documents present in the index |
/// | [`count`](VectorStore::count) | Number of stored vectors |
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn insert(&self, chunks: &[Chunk], vectors: &[Vec<f32>], model: &str) -> Result<()>;

    async fn search(&self, query_vec: &[f32], model: &str, k: usize)
        -> Result<Vec<RetrievedChunk>>;

    /// Returns the number of rows removed.
    async fn delete_document(&self, document_id: &str) -> Result<u64>;

    async fn document_ids(&self) -> Result<Vec<String>>;

    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of [`VectorStore`].
pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn insert(&self, chunks: &[Chunk], vectors: &[Vec<f32>], model: &str) -> Result<()> {
        if chunks.len() != vectors.len() {
            bail!(
                "chunk/vector count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            );
        }

        let mut tx = self.pool.begin().await?;
        for (chunk, vector) in chunks.iter().zip(vectors) {
            sqlx::query(
                r#"
                INSERT INTO chunk_vectors (chunk_id, document_id, chunk_index, text, hash, model, dims, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.document_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(&chunk.hash)
            .bind(model)
            .bind(vector.len() as i64)
            .bind(vec_to_blob(vector))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn search(
        &self,
        query_vec: &[f32],
        model: &str,
        k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let rows = sqlx::query(
            r#"
            SELECT chunk_id, document_id, text, embedding
            FROM chunk_vectors
            WHERE model = ?
            ORDER BY seq
            "#,
        )
        .bind(model)
        .fetch_all(&self.pool)
        .await?;

        let mut hits: Vec<RetrievedChunk> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                RetrievedChunk {
                    chunk_id: row.get("chunk_id"),
                    document_id: row.get("document_id"),
                    text: row.get("text"),
                    score: cosine_similarity(query_vec, &blob_to_vec(&blob)),
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn delete_document(&self, document_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM chunk_vectors WHERE document_id = ?")
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn document_ids(&self) -> Result<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT document_id FROM chunk_vectors GROUP BY document_id ORDER BY MIN(seq)",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn count(&self) -> Result<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunk_vectors")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

/// Embeds chunks into, and retrieves them from, a [`VectorStore`].
#[derive(Clone)]
pub struct VectorIndex {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
}

impl VectorIndex {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, batch_size: usize) -> Self {
        Self {
            embedder,
            store,
            batch_size: batch_size.max(1),
        }
    }

    pub fn store(&self) -> &dyn VectorStore {
        self.store.as_ref()
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Embeds `chunks` in batches and appends them to the store.
    ///
    /// Nothing is written unless every batch embeds successfully. Returns the
    /// number of vectors written.
    pub async fn index(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embedded = self.embedder.embed(&texts).await?;
            if embedded.len() != batch.len() {
                bail!(
                    "embedder returned {} vectors for {} texts",
                    embedded.len(),
                    batch.len()
                );
            }
            self.check_dims(&embedded)?;
            vectors.extend(embedded);
        }

        self.store
            .insert(chunks, &vectors, self.embedder.model_name())
            .await?;
        tracing::debug!(
            chunks = chunks.len(),
            model = self.embedder.model_name(),
            "indexed chunks"
        );
        Ok(vectors.len())
    }

    /// Returns the `k` chunks nearest to `query`, best first.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        let query_vec = self.embedder.embed_query(query).await?;
        self.check_dims(std::slice::from_ref(&query_vec))?;
        self.store
            .search(&query_vec, self.embedder.model_name(), k)
            .await
    }

    /// Rejects vectors whose length differs from the embedder's declared
    /// dimensionality.
    fn check_dims(&self, vectors: &[Vec<f32>]) -> Result<()> {
        let expected = self.embedder.dims();
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            bail!(
                "embedding model {} returned {} dimensions, expected {}",
                self.embedder.model_name(),
                bad.len(),
                expected
            );
        }
        Ok(())
    }

    pub async fn purge_document(&self, document_id: &str) -> Result<u64> {
        self.store.delete_document(document_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::chunk_text;
    use crate::config::Config;
    use crate::embedding::NgramEmbedder;
    use crate::{db, migrate};

    async fn test_index() -> (tempfile::TempDir, VectorIndex) {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.db.path = tmp.path().join("regdesk.sqlite");
        let pool = db::connect(&config).await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();

        let index = VectorIndex::new(
            Arc::new(NgramEmbedder::new(256)),
            Arc::new(SqliteVectorStore::new(pool)),
            2,
        );
        (tmp, index)
    }

    fn chunks(doc: &str, texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .flat_map(|t| chunk_text(doc, t, 1000, 200))
            .collect()
    }

    #[tokio::test]
    async fn index_then_retrieve_ranks_relevant_chunk_first() {
        let (_tmp, index) = test_index().await;
        let written = index
            .index(&chunks(
                "doc-a",
                &[
                    "Employees are entitled to thirty days of annual leave.",
                    "Travel expenses are reimbursed within fourteen days.",
                    "Overtime is paid at one and a half times the hourly rate.",
                ],
            ))
            .await
            .unwrap();
        assert_eq!(written, 3);

        let hits = index.retrieve("how many days of annual leave", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].text.contains("annual leave"));
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn index_appends_across_calls() {
        let (_tmp, index) = test_index().await;
        index.index(&chunks("doc-a", &["first document text"])).await.unwrap();
        index.index(&chunks("doc-b", &["second document text"])).await.unwrap();

        assert_eq!(index.store().count().await.unwrap(), 2);
        assert_eq!(
            index.store().document_ids().await.unwrap(),
            vec!["doc-a".to_string(), "doc-b".to_string()]
        );
    }

    #[tokio::test]
    async fn retrieve_caps_at_k_and_handles_empty_index() {
        let (_tmp, index) = test_index().await;
        assert!(index.retrieve("anything", 3).await.unwrap().is_empty());

        index
            .index(&chunks("doc-a", &["one", "two two", "three three three", "four"]))
            .await
            .unwrap();
        assert_eq!(index.retrieve("two", 3).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn purge_removes_only_that_document() {
        let (_tmp, index) = test_index().await;
        index
            .index(&chunks("doc-a", &["vacation policy for staff"]))
            .await
            .unwrap();
        index
            .index(&chunks("doc-b", &["procurement policy for vendors"]))
            .await
            .unwrap();

        assert_eq!(index.purge_document("doc-a").await.unwrap(), 1);
        let hits = index.retrieve("vacation policy", 5).await.unwrap();
        assert!(hits.iter().all(|h| h.document_id == "doc-b"));
        assert_eq!(index.purge_document("doc-a").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn other_models_are_ignored() {
        let (_tmp, index) = test_index().await;
        index.index(&chunks("doc-a", &["shared text"])).await.unwrap();

        let other = VectorIndex::new(
            Arc::new(NgramEmbedder::new(128)),
            index.store.clone(),
            8,
        );
        assert!(other.retrieve("shared text", 3).await.unwrap().is_empty());
    }

    /// Declares one width but returns another.
    struct MisreportingEmbedder;

    #[async_trait]
    impl Embedder for MisreportingEmbedder {
        fn model_name(&self) -> &str {
            "misreporting"
        }
        fn dims(&self) -> usize {
            8
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.5; 4]).collect())
        }
    }

    #[tokio::test]
    async fn mismatched_dimensions_are_rejected() {
        let (_tmp, index) = test_index().await;
        let bad = VectorIndex::new(Arc::new(MisreportingEmbedder), index.store.clone(), 2);

        let err = bad
            .index(&chunks("doc-a", &["annual leave policy"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("4 dimensions, expected 8"), "{}", err);
        assert_eq!(index.store().count().await.unwrap(), 0);

        assert!(bad.retrieve("annual leave", 3).await.is_err());
    }
}
