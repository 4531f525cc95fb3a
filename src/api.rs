//! HTTP surface built on axum.
//!
//! Routes:
//! - `POST /api/chat` (and the legacy alias `POST /chat`)
//! - `POST /api/memory` with `action` = `get` | `clear`
//! - `POST /api/memory/search`
//! - `GET /` and `GET /test` liveness probes
//!
//! Every error body is `{"error": "..."}`.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::chat::llm::Providers;
use crate::chat::orchestrator::{ChatError, ChatOrchestrator};
use crate::config::{MemoryConfig, RelayConfig};
use crate::memory::backend::{MemoryBackend, SqliteBackend};
use crate::memory::types::Exchange;
use crate::routing::{ModelRoute, ModelRoutes};

/// Shared state for the request handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub backend: Arc<dyn MemoryBackend>,
    pub memory: MemoryConfig,
}

impl AppState {
    /// Validate routing, build provider clients and wrap `conn` in a backend.
    pub fn from_config(config: &RelayConfig, conn: Connection) -> anyhow::Result<Self> {
        let routes = ModelRoutes::from_config(&config.profiles, &config.models)?;
        let providers = Providers::from_config(&config.providers)?;
        let backend: Arc<dyn MemoryBackend> =
            Arc::new(SqliteBackend::new(Arc::new(Mutex::new(conn))));
        Ok(Self::new(
            Arc::new(routes),
            providers,
            backend,
            config.memory.clone(),
        ))
    }

    pub fn new(
        routes: Arc<ModelRoutes>,
        providers: Providers,
        backend: Arc<dyn MemoryBackend>,
        memory: MemoryConfig,
    ) -> Self {
        let orchestrator =
            ChatOrchestrator::new(routes, providers, Arc::clone(&backend), memory.history_limit);
        Self {
            orchestrator: Arc::new(orchestrator),
            backend,
            memory,
        }
    }

    fn route(&self, model: Option<&str>) -> Result<&ModelRoute, ApiError> {
        let model = required(model, "model")?;
        self.orchestrator
            .routes()
            .resolve(model)
            .ok_or_else(|| ApiError::BadRequest(format!("unknown model `{}`", model.trim())))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/test", get(liveness))
        .route("/api/chat", post(chat))
        .route("/chat", post(chat))
        .route("/api/memory", post(memory))
        .route("/api/memory/search", post(search))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Validation(_) | ChatError::UnknownModel(_) => {
                ApiError::BadRequest(err.to_string())
            }
            ChatError::ProviderUnavailable(_) | ChatError::Upstream(_) | ChatError::Storage(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(format!("{err:#}"))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{field} is required")))
}

async fn root() -> &'static str {
    "memory-relay is running"
}

async fn liveness() -> &'static str {
    "ok"
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChatRequest {
    pub model: Option<String>,
    pub user_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = body?;
    let model = required(req.model.as_deref(), "model")?;
    let user_message = required(req.user_message.as_deref(), "userMessage")?;

    let outcome = state.orchestrator.chat(model, user_message).await?;
    Ok(Json(ChatResponse {
        reply: outcome.reply,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MemoryRequest {
    pub model: Option<String>,
    pub action: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MemoryResponse {
    History { history: Vec<Exchange> },
    Cleared { ok: bool },
}

async fn memory(
    State(state): State<AppState>,
    body: Result<Json<MemoryRequest>, JsonRejection>,
) -> Result<Json<MemoryResponse>, ApiError> {
    let Json(req) = body?;
    let route = state.route(req.model.as_deref())?;
    let profile = route.profile.name.as_str();

    match req.action.as_deref().map(str::trim) {
        Some("get") => {
            let limit = clamp_limit(req.limit, &state.memory);
            let mut history = state.backend.recent_exchanges(profile, limit).await?;
            history.reverse();
            Ok(Json(MemoryResponse::History { history }))
        }
        Some("clear") => {
            let removed = state.backend.clear_exchanges(profile).await?;
            tracing::info!(profile, removed, "fallback history cleared");
            Ok(Json(MemoryResponse::Cleared { ok: true }))
        }
        Some(other) => Err(ApiError::BadRequest(format!("unknown action `{other}`"))),
        None => Err(ApiError::BadRequest("action is required".into())),
    }
}

/// Requested history size bounded to `1..=max_history_limit`.
fn clamp_limit(requested: Option<i64>, memory: &MemoryConfig) -> usize {
    let max = memory.max_history_limit.max(1);
    match requested {
        Some(n) if n < 1 => 1,
        Some(n) => usize::try_from(n).unwrap_or(max).min(max),
        None => memory.history_limit.clamp(1, max),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchRequest {
    pub model: Option<String>,
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<Exchange>,
}

async fn search(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(req) = body?;
    let route = state.route(req.model.as_deref())?;
    let query = required(req.query.as_deref(), "query")?;

    let results = state
        .backend
        .search_exchanges(&route.profile.name, query, state.memory.search_limit)
        .await?;
    Ok(Json(SearchResponse { results }))
}
