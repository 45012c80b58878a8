//! Component wiring.
//!
//! [`App`] holds every pipeline component behind its trait object so the
//! HTTP server, the CLI, and the tests share one code path. [`App::build`]
//! assembles the production components from configuration;
//! [`App::from_parts`] accepts injected ones.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::answer::AnswerGenerator;
use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::llm::{create_chat_model, ChatModel};
use crate::moderation::{ContentFilter, DenylistFilter};
use crate::registry::{DocumentRegistry, InMemoryRegistry, SqliteRegistry};
use crate::store::{SqliteVectorStore, VectorIndex};
use crate::{db, migrate};

pub struct App {
    pub config: Arc<Config>,
    pub registry: Arc<dyn DocumentRegistry>,
    pub index: VectorIndex,
    pub generator: AnswerGenerator,
    pub filter: Arc<dyn ContentFilter>,
}

impl App {
    /// Connects to the database, runs migrations, and creates the upload
    /// directory before constructing the configured providers.
    pub async fn build(config: Config) -> Result<Self> {
        let pool = db::connect(&config).await?;
        migrate::run_migrations(&pool).await?;

        let embedder = create_embedder(&config.embedding)?;
        let chat_model = create_chat_model(&config.llm)?;
        Self::from_parts(config, pool, embedder, chat_model).await
    }

    pub async fn from_parts(
        config: Config,
        pool: SqlitePool,
        embedder: Arc<dyn Embedder>,
        chat_model: Arc<dyn ChatModel>,
    ) -> Result<Self> {
        tokio::fs::create_dir_all(&config.storage.upload_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create upload dir: {}",
                    config.storage.upload_dir.display()
                )
            })?;

        let registry: Arc<dyn DocumentRegistry> = match config.registry.backend.as_str() {
            "memory" => Arc::new(InMemoryRegistry::new()),
            _ => Arc::new(SqliteRegistry::new(pool.clone())),
        };

        let index = VectorIndex::new(
            embedder,
            Arc::new(SqliteVectorStore::new(pool)),
            config.embedding.batch_size,
        );
        let filter = Arc::new(DenylistFilter::from_config(&config.moderation));

        tracing::info!(
            registry = registry.backend_name(),
            embedding_model = index.model_name(),
            llm_model = chat_model.model_name(),
            "components ready"
        );

        Ok(Self {
            config: Arc::new(config),
            registry,
            index,
            generator: AnswerGenerator::new(chat_model),
            filter,
        })
    }
}
