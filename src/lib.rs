//! # regdesk
//!
//! Question answering over uploaded PDF regulations.
//!
//! Administrators upload PDF documents; each one is extracted, chunked,
//! embedded, and written to a SQLite-backed vector index, then recorded in
//! the document registry. Employees ask questions in a chat page; the
//! question is screened by a content filter, the top-k most similar chunks
//! are retrieved, and a language model answers from that context only.
//!
//! ## Architecture
//!
//! ```text
//! upload ─▶ extract ─▶ chunk ─▶ embed ─▶ chunk_vectors ─▶ registry
//!
//! chat ─▶ filter ─▶ registry check ─▶ retrieve top-k ─▶ answer
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`models`] | Core data types |
//! | [`extract`] | PDF text extraction |
//! | [`chunk`] | Overlapping text chunking |
//! | [`provider`] | OpenAI-compatible HTTP client and provider errors |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Vector store and retrieval |
//! | [`registry`] | Uploaded-document registry |
//! | [`moderation`] | Offensive-language filter |
//! | [`llm`] | Chat-completion model abstraction |
//! | [`answer`] | Prompt rendering and answer generation |
//! | [`messages`] | Fixed user-facing strings |
//! | [`app`] | Component wiring |
//! | [`ingest`] | Upload, delete, and prune pipelines |
//! | [`chat`] | Chat pipeline |
//! | [`server`] | HTTP server |

pub mod answer;
pub mod app;
pub mod chat;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod ingest;
pub mod llm;
pub mod messages;
pub mod migrate;
pub mod models;
pub mod moderation;
pub mod provider;
pub mod registry;
pub mod server;
pub mod store;
