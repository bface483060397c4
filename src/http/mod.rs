//! Web form and JSON API.

pub mod error;
mod forms;
pub mod handlers;
pub mod models;
pub mod pages;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::{net::TcpListener, signal};
use tracing::info;

use crate::state::AppState;
use handlers::{
    api_ingest_handler, api_split_handler, health_handler, index_handler, ingest_form_handler,
    ingest_submit_handler, split_form_handler, split_submit_handler,
};

pub const PATH_INDEX: &str = "/";
pub const PATH_INGEST: &str = "/ingest";
pub const PATH_SPLIT: &str = "/split";
pub const PATH_API_INGEST: &str = "/api/ingest";
pub const PATH_API_SPLIT: &str = "/api/split";
pub const PATH_HEALTH: &str = "/health";

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        .route(PATH_INDEX, get(index_handler))
        .route(
            PATH_INGEST,
            get(ingest_form_handler).post(ingest_submit_handler),
        )
        .route(PATH_SPLIT, get(split_form_handler).post(split_submit_handler))
        .route(PATH_API_INGEST, post(api_ingest_handler))
        .route(PATH_API_SPLIT, post(api_split_handler))
        .route(PATH_HEALTH, get(health_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Binds the configured address and serves until Ctrl+C or SIGTERM.
pub async fn serve(state: AppState) -> Result<()> {
    let addr = state.config.server.listen_addr.clone();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("[HTTP] Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("[HTTP] Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
