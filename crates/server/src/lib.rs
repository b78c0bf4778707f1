//! HTTP API for docrag.
//!
//! Exposes the ask pipeline, the answer cache, a minimal user registry and
//! per-user chat history over JSON.

pub mod error;
pub mod routes;
pub mod state;
pub mod users;

pub use error::ApiError;
pub use routes::create_router;
pub use state::{AppState, ChatHistoryStore, ChatMessage};
pub use users::{UserError, UserStore};

use docrag_core::{AppConfig, AppError, AppResult};
use docrag_knowledge::rag::AskPipeline;
use std::sync::Arc;

/// Build the production state from `config` and serve until Ctrl-C.
pub async fn serve(config: &AppConfig) -> AppResult<()> {
    let pipeline = AskPipeline::from_config(config)?;
    let state = AppState::new(Arc::new(pipeline));
    let router = create_router(state);

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
