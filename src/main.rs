//! # regdesk CLI
//!
//! ## Usage
//!
//! ```bash
//! regdesk --config ./config/regdesk.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `regdesk init` | Create the database, run migrations, create the upload dir |
//! | `regdesk serve` | Start the HTTP server |
//! | `regdesk ingest <file.pdf>` | Index a PDF from disk |
//! | `regdesk ask "<question>"` | Answer one question through the chat pipeline |
//! | `regdesk files` | List registered documents |
//! | `regdesk delete <id>` | Remove a document and its vectors |
//! | `regdesk prune` | Remove vectors of unregistered documents |
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use regdesk::app::App;
use regdesk::config::{self, Config};
use regdesk::{chat, db, ingest, migrate, server};

const DEFAULT_CONFIG: &str = "./config/regdesk.toml";

/// Question answering over uploaded PDF regulations.
#[derive(Parser)]
#[command(name = "regdesk", version)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// When the default path does not exist the built-in defaults are used.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema and upload directory. Idempotent.
    Init,

    /// Start the HTTP server on `[server].bind` (or `PORT`).
    Serve,

    /// Extract, chunk, embed, and register a PDF from disk.
    Ingest {
        /// Path to the PDF file.
        path: PathBuf,
    },

    /// Ask a question and print the answer.
    Ask {
        /// The question text.
        question: String,
    },

    /// List registered documents as JSON.
    Files,

    /// Delete a document, its stored file, and its vectors.
    Delete {
        /// Document id as shown by `files`.
        id: String,
    },

    /// Remove vectors whose document is not registered.
    Prune,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn resolve_config(path: &Path) -> Result<Config> {
    let mut cfg = if path == Path::new(DEFAULT_CONFIG) && !path.exists() {
        tracing::info!(path = %path.display(), "config file not found, using defaults");
        Config::default()
    } else {
        config::load_config(path)?
    };
    cfg.apply_env_overrides();
    Ok(cfg)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let cfg = resolve_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            tokio::fs::create_dir_all(&cfg.storage.upload_dir).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            let app = App::build(cfg).await?;
            server::run_server(app).await?;
        }
        Commands::Ingest { path } => {
            let app = App::build(cfg).await?;
            let doc = ingest::ingest_file(&app, &path).await?;
            println!("{}  {}", doc.id, doc.filename);
        }
        Commands::Ask { question } => {
            let app = App::build(cfg).await?;
            let reply = chat::respond(&app, &question).await?;
            println!("{}", reply.response);
        }
        Commands::Files => {
            let app = App::build(cfg).await?;
            let files = app.registry.list().await?;
            println!("{}", serde_json::to_string_pretty(&files)?);
        }
        Commands::Delete { id } => {
            let app = App::build(cfg).await?;
            match ingest::delete_document(&app, &id).await? {
                Some(doc) => println!("Deleted {} ({})", doc.id, doc.filename),
                None => println!("No document with id {}", id),
            }
        }
        Commands::Prune => {
            let app = App::build(cfg).await?;
            let report = ingest::prune_orphans(&app).await?;
            println!(
                "Pruned {} vectors from {} unregistered documents.",
                report.vectors, report.documents
            );
        }
    }

    Ok(())
}
