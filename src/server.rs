//! HTTP presentation layer.
//!
//! Exposes the chat core as a JSON API so a browser page (or any HTTP
//! client) can drive the upload-then-ask loop. Sessions are addressed by
//! server-issued UUIDs; each session's operations run one at a time behind
//! its own lock, and sessions vanish when the process exits.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/sessions` | Create a session, returns its id |
//! | `DELETE` | `/sessions/{id}` | Discard a session |
//! | `POST` | `/sessions/{id}/document` | Upload a `.txt`/`.pdf` (base64 body) |
//! | `POST` | `/sessions/{id}/ask` | Ask a question |
//! | `GET`  | `/sessions/{id}/transcript` | All turns, most recent first |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_ready", "message": "no document indexed yet: upload a file first" } }
//! ```
//!
//! Codes: `bad_request` (400), `invalid_config` (400), `decode_error` (400),
//! `empty_document` (400), `not_found` (404), `not_ready` (409),
//! `generation_failed` (502).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::config::Config;
use crate::error::ChatError;
use crate::generate::Generator;
use crate::models::{RankedChunk, Turn};
use crate::session::{AskOptions, Session};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    generator: Arc<dyn Generator>,
    /// Live sessions by id. Each session has its own lock so one session's
    /// generation call does not block another's.
    sessions: Arc<Mutex<HashMap<String, Arc<Mutex<Session>>>>>,
}

/// Start the HTTP server on the configured bind address.
///
/// Runs until the process is terminated. The generator is injected so the
/// server itself stays free of any Gemini specifics.
pub async fn run_server(config: &Config, generator: Arc<dyn Generator>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState {
        config: Arc::new(config.clone()),
        generator,
        sessions: Arc::new(Mutex::new(HashMap::new())),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/sessions", post(handle_create_session))
        .route("/sessions/{id}", delete(handle_delete_session))
        .route("/sessions/{id}/document", post(handle_upload_document))
        .route("/sessions/{id}/ask", post(handle_ask))
        .route("/sessions/{id}/transcript", get(handle_transcript))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("docchat server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn session_not_found(id: &str) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: format!("no such session: {}", id),
    }
}

/// Map a core error onto the HTTP error contract.
fn classify_chat_error(err: ChatError) -> AppError {
    let message = err.to_string();
    let (status, code) = match err {
        ChatError::Config(_) => (StatusCode::BAD_REQUEST, "invalid_config"),
        ChatError::Decode(_) => (StatusCode::BAD_REQUEST, "decode_error"),
        ChatError::InsufficientData => (StatusCode::BAD_REQUEST, "empty_document"),
        ChatError::NotReady => (StatusCode::CONFLICT, "not_ready"),
        ChatError::Generation(_) => (StatusCode::BAD_GATEWAY, "generation_failed"),
    };
    AppError {
        status,
        code: code.to_string(),
        message,
    }
}

// ============ Handlers ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
struct CreateSessionResponse {
    session_id: String,
}

async fn handle_create_session(State(state): State<AppState>) -> Json<CreateSessionResponse> {
    let id = Uuid::new_v4().to_string();
    state
        .sessions
        .lock()
        .await
        .insert(id.clone(), Arc::new(Mutex::new(Session::new())));
    Json(CreateSessionResponse { session_id: id })
}

async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    match state.sessions.lock().await.remove(&id) {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(session_not_found(&id)),
    }
}

#[derive(Deserialize)]
struct UploadRequest {
    filename: String,
    /// Raw file bytes, base64-encoded (standard alphabet with padding).
    content_base64: String,
}

#[derive(Serialize)]
struct UploadResponse {
    filename: String,
    chunks: usize,
    fingerprint: String,
}

async fn handle_upload_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, AppError> {
    let session = lookup_session(&state, &id).await?;

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&req.content_base64)
        .map_err(|e| bad_request(format!("content_base64 is not valid base64: {}", e)))?;

    let mut session = session.lock().await;
    let doc = session
        .load_document(&req.filename, &bytes, state.config.chunking.chunk_size)
        .map_err(classify_chat_error)?;

    Ok(Json(UploadResponse {
        filename: doc.name().to_string(),
        chunks: doc.chunk_count(),
        fingerprint: doc.fingerprint().to_string(),
    }))
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
    context: Vec<RankedChunk>,
}

async fn handle_ask(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    if req.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let session = lookup_session(&state, &id).await?;
    let options = AskOptions {
        top_k: state.config.retrieval.top_k,
        history_turns: state.config.retrieval.history_turns,
    };

    let mut session = session.lock().await;
    let answer = session
        .ask(state.generator.as_ref(), &req.question, options)
        .await
        .map_err(classify_chat_error)?;

    Ok(Json(AskResponse {
        answer: answer.text,
        context: answer.context,
    }))
}

#[derive(Serialize)]
struct TranscriptResponse {
    /// Turns most-recent-first, matching the transcript display contract.
    turns: Vec<Turn>,
}

async fn handle_transcript(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TranscriptResponse>, AppError> {
    let session = lookup_session(&state, &id).await?;
    let session = session.lock().await;
    Ok(Json(TranscriptResponse {
        turns: session.transcript().cloned().collect(),
    }))
}

async fn lookup_session(state: &AppState, id: &str) -> Result<Arc<Mutex<Session>>, AppError> {
    state
        .sessions
        .lock()
        .await
        .get(id)
        .cloned()
        .ok_or_else(|| session_not_found(id))
}
