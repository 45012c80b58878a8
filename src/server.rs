//! HTTP server.
//!
//! # Endpoints
//!
//! | Method   | Path                | Description |
//! |----------|---------------------|-------------|
//! | `GET`    | `/`                 | Service status |
//! | `GET`    | `/health`           | Health check (returns version) |
//! | `GET`    | `/chat`             | Chat page |
//! | `GET`    | `/admin`            | Admin page |
//! | `POST`   | `/chat`             | `{message}` → `{response}` |
//! | `POST`   | `/admin/upload`     | Multipart upload, field `file` |
//! | `GET`    | `/admin/files`      | Registered documents |
//! | `DELETE` | `/admin/files/{id}` | Remove a document |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "PDF فقط" } }
//! ```
//!
//! Error codes: `bad_request` (400), `ingest_failed` (500), `internal` (500).
//! Chat failures other than an empty message are answered with HTTP 200 and
//! the generic apology.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::app::App;
use crate::chat::{self, ChatError};
use crate::ingest::{self, IngestError};
use crate::messages::{DELETED, MISSING_FILE, PDF_ONLY, UPLOAD_OK};
use crate::models::UploadedDocument;

const CHAT_PAGE: &str = include_str!("../assets/chat.html");
const ADMIN_PAGE: &str = include_str!("../assets/admin.html");

/// Builds the router over a shared [`App`].
pub fn router(app: Arc<App>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = app.config.max_upload_bytes();

    Router::new()
        .route("/", get(handle_status))
        .route("/health", get(handle_health))
        .route("/chat", get(handle_chat_page).post(handle_chat))
        .route("/admin", get(handle_admin_page))
        .route("/admin/upload", post(handle_upload))
        .route("/admin/files", get(handle_list_files))
        .route("/admin/files/{id}", delete(handle_delete_file))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(app)
}

/// Binds to `[server].bind` and serves until the process is terminated.
pub async fn run_server(app: App) -> anyhow::Result<()> {
    let bind_addr = app.config.server.bind.clone();
    let router = router(Arc::new(app));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(address = %bind_addr, "listening");
    axum::serve(listener, router).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %format!("{:#}", err), "request failed");
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: format!("{:#}", err),
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        if err.is_client_error() {
            return bad_request(PDF_ONLY);
        }
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "ingest_failed",
            message: err.to_string(),
        }
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Validation(message) => bad_request(message),
            other => internal(anyhow::Error::new(other)),
        }
    }
}

// ============ Status ============

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    chat: &'static str,
    admin: &'static str,
    documents: usize,
    version: &'static str,
}

async fn handle_status(State(app): State<Arc<App>>) -> Result<Json<StatusResponse>, AppError> {
    let documents = app.registry.count().await.map_err(internal)?;
    Ok(Json(StatusResponse {
        status: "online",
        chat: "/chat",
        admin: "/admin",
        documents,
        version: env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn handle_chat_page() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

async fn handle_admin_page() -> Html<&'static str> {
    Html(ADMIN_PAGE)
}

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
}

async fn handle_chat(
    State(app): State<Arc<App>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let reply = chat::respond(&app, &req.message).await?;
    tracing::debug!(outcome = ?reply.outcome, "chat answered");
    Ok(Json(ChatResponse {
        response: reply.response,
    }))
}

// ============ Admin ============

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

/// Reads the `file` field, ignoring any other parts.
async fn handle_upload(
    State(app): State<Arc<App>>,
    mut multipart: Multipart,
) -> Result<Json<MessageResponse>, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(e.body_text()))?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }

    let (filename, bytes) = upload.ok_or_else(|| bad_request(MISSING_FILE))?;
    ingest::ingest_upload(&app, &filename, &bytes).await?;

    Ok(Json(MessageResponse { message: UPLOAD_OK }))
}

async fn handle_list_files(
    State(app): State<Arc<App>>,
) -> Result<Json<Vec<UploadedDocument>>, AppError> {
    let files = app.registry.list().await.map_err(internal)?;
    Ok(Json(files))
}

async fn handle_delete_file(
    State(app): State<Arc<App>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    ingest::delete_document(&app, &id).await.map_err(internal)?;
    Ok(Json(MessageResponse { message: DELETED }))
}
