//! Chat HTTP server.
//!
//! Serves the single-page chat front-end and a JSON API over the turn
//! engine. Each browser session gets its own [`SessionState`], keyed by a
//! server-issued UUID; a per-session async lock preserves the
//! one-outstanding-request-per-session contract while letting distinct
//! sessions proceed concurrently.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Embedded single-page chat UI |
//! | `POST` | `/chat` | Run one turn: `{session_id?, message}` → `{session_id, answer, is_error}` |
//! | `GET`  | `/history/{session_id}` | Ordered turn sequence for rendering |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "unknown session: …" } }
//! ```
//!
//! Error codes: `not_found` (404), `retrieval_failed` (500), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::chat::ChatEngine;
use crate::config::Config;
use crate::models::ChatTurn;
use crate::session::SessionState;

const CHAT_PAGE: &str = include_str!("../assets/chat.html");

/// Shared application state passed to all route handlers via Axum's `State`
/// extractor.
#[derive(Clone)]
struct AppState {
    engine: Arc<ChatEngine>,
    /// Session registry. The outer lock guards the map only; each session
    /// carries its own async lock held for the duration of a turn.
    sessions: Arc<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<SessionState>>>>>,
}

/// Starts the chat HTTP server.
///
/// Binds to the address configured in `[server].bind` and runs until the
/// process is terminated. Fails fast if a required secret is missing,
/// before the listener is bound.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let engine = Arc::new(ChatEngine::from_config(config)?);

    let state = AppState {
        engine,
        sessions: Arc::new(Mutex::new(HashMap::new())),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(handle_index))
        .route("/chat", post(handle_chat))
        .route("/history/{session_id}", get(handle_history))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("NotionAtlas listening on http://{}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
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
    /// Machine-readable error code (e.g., `"not_found"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
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

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

/// Embedding and vector-index faults abort the turn and surface as 500s;
/// the session is left untouched.
fn retrieval_failed(err: anyhow::Error) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "retrieval_failed".to_string(),
        message: err.to_string(),
    }
}

// ============ GET / ============

/// Handler for `GET /`: the embedded single-page chat UI.
async fn handle_index() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

// ============ GET /health ============

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

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    /// Omit to start a new session; the response carries the issued id.
    session_id: Option<Uuid>,
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    session_id: Uuid,
    answer: String,
    /// True when the answer was synthesized from a failed completion call.
    /// The page renders these distinctly; the stored content is identical.
    is_error: bool,
}

/// Handler for `POST /chat`.
///
/// Resolves (or creates) the session, runs one turn, and returns the
/// assistant's answer. The per-session lock is held across the whole turn,
/// so concurrent posts to the same session are processed one at a time.
async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let (session_id, session) = match request.session_id {
        Some(id) => {
            let sessions = state.sessions.lock().unwrap_or_else(|e| e.into_inner());
            let session = sessions
                .get(&id)
                .cloned()
                .ok_or_else(|| not_found(format!("unknown session: {}", id)))?;
            (id, session)
        }
        None => {
            let id = Uuid::new_v4();
            let session = Arc::new(tokio::sync::Mutex::new(state.engine.new_session()));
            state
                .sessions
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(id, session.clone());
            (id, session)
        }
    };

    let mut session = session.lock().await;
    let turn = state
        .engine
        .run_turn(&mut session, &request.message)
        .await
        .map_err(retrieval_failed)?;

    Ok(Json(ChatResponse {
        session_id,
        answer: turn.content,
        is_error: turn.is_error,
    }))
}

// ============ GET /history/{session_id} ============

#[derive(Serialize)]
struct HistoryResponse {
    session_id: Uuid,
    turns: Vec<ChatTurn>,
}

/// Handler for `GET /history/{session_id}`: the ordered turn sequence the
/// page renders as chat bubbles.
async fn handle_history(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, AppError> {
    let session = {
        let sessions = state.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .get(&session_id)
            .cloned()
            .ok_or_else(|| not_found(format!("unknown session: {}", session_id)))?
    };

    let session = session.lock().await;
    Ok(Json(HistoryResponse {
        session_id,
        turns: session.history().to_vec(),
    }))
}
