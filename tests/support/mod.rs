//! Shared fixtures: generated PDFs, a scripted chat model, and an [`App`]
//! rooted in a temporary directory.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tempfile::TempDir;

use regdesk::app::App;
use regdesk::config::Config;
use regdesk::embedding::NgramEmbedder;
use regdesk::llm::ChatModel;
use regdesk::provider::ProviderError;
use regdesk::{db, migrate};

/// Builds a PDF with one page per entry. `None` produces a page that only
/// draws a filled rectangle, i.e. a page without extractable text.
pub fn pdf_with_pages(pages: &[Option<&str>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in pages {
        let operations = match page {
            Some(text) => vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
            None => vec![
                Operation::new("re", vec![0.into(), 0.into(), 10.into(), 10.into()]),
                Operation::new("f", vec![]),
            ],
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode page content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("serialize pdf");
    out
}

pub fn pdf_with_text(text: &str) -> Vec<u8> {
    pdf_with_pages(&[Some(text)])
}

pub const LEAVE_POLICY: &str =
    "Annual leave policy: every employee receives thirty days of annual leave per year.";
pub const OVERTIME_POLICY: &str =
    "Overtime compensation: overtime hours are paid at one and a half times the hourly wage.";

enum Script {
    /// Replies with the context section of the prompt.
    EchoContext,
    Fail(fn() -> ProviderError),
}

/// Chat model that never touches the network and counts its invocations.
pub struct StubModel {
    script: Script,
    calls: AtomicUsize,
}

impl StubModel {
    pub fn echo_context() -> Arc<Self> {
        Arc::new(Self {
            script: Script::EchoContext,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(err: fn() -> ProviderError) -> Arc<Self> {
        Arc::new(Self {
            script: Script::Fail(err),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for StubModel {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::EchoContext => {
                let context = prompt
                    .split_once("السياق: ")
                    .and_then(|(_, rest)| rest.split_once("\nالسؤال:"))
                    .map(|(context, _)| context.to_string())
                    .unwrap_or_default();
                Ok(context)
            }
            Script::Fail(make) => Err(make()),
        }
    }
}

pub fn test_config(tmp: &TempDir, registry_backend: &str) -> Config {
    let mut config = Config::default();
    config.db.path = tmp.path().join("data").join("regdesk.sqlite");
    config.storage.upload_dir = tmp.path().join("uploads");
    config.chunking.chunk_size = 200;
    config.chunking.chunk_overlap = 40;
    config.retrieval.top_k = 1;
    config.embedding.provider = "local".to_string();
    config.embedding.dims = 256;
    config.registry.backend = registry_backend.to_string();
    config
}

pub async fn app_with_config(config: Config, model: Arc<dyn ChatModel>) -> App {
    let pool = db::connect(&config).await.expect("connect");
    migrate::run_migrations(&pool).await.expect("migrate");
    let embedder = Arc::new(NgramEmbedder::new(config.embedding.dims));
    App::from_parts(config, pool, embedder, model)
        .await
        .expect("build app")
}

pub async fn test_app(tmp: &TempDir, model: Arc<dyn ChatModel>) -> App {
    app_with_config(test_config(tmp, "sqlite"), model).await
}

/// Number of files currently in the upload directory.
pub fn stored_files(app: &App) -> usize {
    std::fs::read_dir(&app.config.storage.upload_dir)
        .map(|entries| entries.count())
        .unwrap_or(0)
}
