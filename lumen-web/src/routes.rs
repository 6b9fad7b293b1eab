//! Route definitions for Lumen.
//!
//! `/chat` and `/clear_chat` work on the session store. The generation
//! endpoints are stateless: one prompt, one remote call, one named field.

use crate::error::ApiError;
use crate::markdown::render_html;
use crate::prompts::{
    AddCommentsRequest, DesignSystemRequest, ExplainCodeRequest, GenerateIdeaRequest,
    GenerateReadmeRequest, PromptInput, QuickActionRequest, QuoteRequest, SummarizeRequest,
};
use crate::provider::{GenerateRequest, GeminiProvider, Provider};
use crate::session::{resolve_key, SessionStore, Turn};
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use lumen_common::config::{ChatConfig, Config};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Request bodies above this size are rejected.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub provider: Arc<dyn Provider>,
    pub chat: Arc<ChatConfig>,
}

impl AppState {
    /// Create state around an existing provider.
    pub fn new(provider: Arc<dyn Provider>, chat: ChatConfig) -> Self {
        Self {
            sessions: Arc::new(SessionStore::new()),
            provider,
            chat: Arc::new(chat),
        }
    }

    /// Create state with a Gemini provider built from configuration.
    pub fn from_config(config: &Config) -> Self {
        let provider = GeminiProvider::new(&config.gemini);
        if !provider.has_api_key() {
            tracing::warn!("No Gemini API key configured; model calls will fail until one is set");
        }
        Self::new(Arc::new(provider), config.chat.clone())
    }
}

/// Chat request body.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Chat response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_reply: Option<String>,
    /// RFC 3339, UTC
    pub timestamp: String,
    pub session_id: String,
}

/// Body of `/clear_chat`. The whole body may be omitted.
#[derive(Debug, Default, Deserialize)]
pub struct ClearChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub turns: Vec<Turn>,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub model: String,
    pub sessions: usize,
}

/// Build the application router with middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        // Session-backed chat
        .route("/chat", post(chat_handler))
        .route("/clear_chat", post(clear_chat_handler))
        .route("/history", get(history_handler))
        // Stateless generation
        .route("/quote", post(generate_handler::<QuoteRequest>))
        .route("/summarize", post(generate_handler::<SummarizeRequest>))
        .route("/explain_code", post(generate_handler::<ExplainCodeRequest>))
        .route("/generate_idea", post(generate_handler::<GenerateIdeaRequest>))
        .route("/quick_action", post(generate_handler::<QuickActionRequest>))
        .route("/generate_readme", post(generate_handler::<GenerateReadmeRequest>))
        .route("/add_comments", post(generate_handler::<AddCommentsRequest>))
        .route("/design_system", post(generate_handler::<DesignSystemRequest>))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                .layer(cors),
        )
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Health
// ─────────────────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        service: "lumen".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        model: state.provider.model().to_string(),
        sessions: state.sessions.len().await,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// One chat turn against the caller's session.
///
/// The session stays locked from reading the transcript until both new
/// turns are recorded. A failed remote call records nothing.
async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload?;

    let message = match request.message {
        Some(m) if !m.trim().is_empty() => m,
        _ => return Err(ApiError::InvalidInput("'message' is required".into())),
    };
    let session_id = resolve_key(request.session_id.as_deref()).to_string();

    let mut session = state.sessions.lock(&session_id).await;

    let generate = GenerateRequest::new(message.clone())
        .with_history(session.transcript().to_vec())
        .with_system(state.chat.system_prompt.clone());

    let response = state.provider.generate(generate).await.map_err(|e| {
        tracing::error!(session_id = %session_id, error = %e, "Chat request failed");
        e
    })?;

    session.append_exchange(message, response.text.clone());
    let turns = session.transcript().len();
    drop(session);

    tracing::info!(
        session_id = %session_id,
        turns,
        latency_ms = response.latency_ms,
        "Chat turn completed"
    );

    let formatted_reply = state
        .chat
        .render_markdown
        .then(|| render_html(&response.text));

    Ok(Json(ChatResponse {
        reply: response.text,
        formatted_reply,
        timestamp: chrono::Utc::now().to_rfc3339(),
        session_id,
    }))
}

/// Reset a session. An empty body resets `default`.
async fn clear_chat_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: ClearChatRequest = parse_body(&body)?;
    let session_id = resolve_key(request.session_id.as_deref());
    state.sessions.reset(session_id).await;
    tracing::info!(session_id = %session_id, "Chat cleared");

    Ok(Json(serde_json::json!({ "success": true })))
}

async fn history_handler(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<HistoryResponse> {
    let session_id = resolve_key(query.session_id.as_deref()).to_string();
    let session = state.sessions.get_or_create(&session_id).await;

    Json(HistoryResponse {
        session_id,
        turns: session.turns().to_vec(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Stateless Generation
// ─────────────────────────────────────────────────────────────────────────────

/// Parse a JSON body regardless of content type. An empty body yields the
/// input's defaults.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::InvalidInput(format!("Invalid JSON body: {}", e)))
}

/// Validate the input, send its prompt without context, and return the
/// reply under the prompt's response field.
async fn generate_handler<T>(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError>
where
    T: PromptInput + DeserializeOwned + Default + Send + 'static,
{
    let input: T = parse_body(&body)?;
    let kind = input.into_prompt()?;

    let response = state
        .provider
        .generate(GenerateRequest::new(kind.render()))
        .await
        .map_err(|e| {
            tracing::error!(
                provider = state.provider.name(),
                kind = kind.name(),
                error = %e,
                "Generation failed"
            );
            e
        })?;

    tracing::info!(
        kind = kind.name(),
        latency_ms = response.latency_ms,
        "Generation completed"
    );

    let mut body = serde_json::Map::new();
    body.insert(kind.response_field().to_string(), Value::String(response.text));
    Ok(Json(Value::Object(body)))
}
