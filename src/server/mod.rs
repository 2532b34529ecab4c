// Server module: axum routes over the cache store.

pub mod api;

use crate::storage::CacheStore;
use crate::updater::UpdateOrchestrator;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub use api::{create_router, ErrorResponse, NOT_READY_MESSAGE};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CacheStore>,
    pub orchestrator: Arc<UpdateOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<UpdateOrchestrator>) -> Self {
        Self {
            store: orchestrator.store().clone(),
            orchestrator,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// Routes plus request logging.
pub fn build_router(state: AppState) -> Router {
    create_router(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}

/// Serves until `shutdown` resolves, then lets in-flight requests finish.
pub async fn serve(
    addr: SocketAddr,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    tracing::info!("Listening on {}", addr);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Serve)?;

    tracing::info!("HTTP server closed");
    Ok(())
}
