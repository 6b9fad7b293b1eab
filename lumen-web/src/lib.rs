//! Lumen Web - session-keyed chat and prompt endpoints backed by Gemini.
//!
//! ## Architecture
//!
//! ```text
//! Client → Router → handler → SessionStore (chat only)
//!                       ↓
//!                  Provider (Gemini) → reply → markdown → JSON
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod error;
pub mod markdown;
pub mod prompts;
pub mod provider;
pub mod repl;
pub mod routes;
pub mod session;

pub use error::{ApiError, ErrorResponse};
pub use prompts::{PromptInput, PromptKind, QuickAction};
pub use provider::{
    GeminiProvider, GenerateRequest, GenerateResponse, Provider, ProviderError, TokenUsage,
};
pub use routes::{build_router, AppState};
pub use session::{Role, Session, SessionGuard, SessionStore, Turn, DEFAULT_SESSION_KEY};

use anyhow::Context;
use lumen_common::config::{Config, ServerConfig};
use tokio::net::TcpListener;

/// Bind the configured listener. `host` may be an address or a host name.
pub async fn bind_listener(server: &ServerConfig) -> anyhow::Result<TcpListener> {
    TcpListener::bind((server.host.as_str(), server.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", server.host, server.port))
}

/// Start the HTTP server and run until Ctrl-C.
pub async fn start_server(config: &Config) -> anyhow::Result<()> {
    let state = AppState::from_config(config);
    tracing::info!(
        provider = state.provider.name(),
        model = state.provider.model(),
        "Starting Lumen on {}:{}",
        config.server.host,
        config.server.port
    );

    let listener = bind_listener(&config.server).await?;
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Lumen stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
