// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::DefaultBodyLimit,
    http::Uri,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::{embed::embedding_handler, health::health_handler, ApiError};
use crate::embeddings::{EmbeddingProvider, ProviderSlot};

/// Shared, read-only state handed to every handler
#[derive(Clone, Debug)]
pub struct AppState {
    pub provider: Arc<ProviderSlot>,
}

impl AppState {
    pub fn new(provider: Arc<ProviderSlot>) -> Self {
        Self { provider }
    }

    /// State whose provider is already loaded
    pub fn with_provider(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::new(Arc::new(ProviderSlot::ready(provider)))
    }

    /// State with an empty provider slot
    pub fn new_for_test() -> Self {
        Self::new(Arc::new(ProviderSlot::new()))
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        // Liveness
        .route("/", get(health_handler))
        // Text → vector
        .route("/embedding", get(embedding_handler).post(embedding_handler))
        .fallback(fallback_handler)
        // Bodies are passed through unbounded; size governance is the transport's job
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn fallback_handler(uri: Uri) -> ApiError {
    warn!("Invalid route accessed: {}", uri);
    ApiError::NotFound(format!("No route for {}", uri.path()))
}

/// Binds `addr` and serves until Ctrl+C / SIGTERM
pub async fn start_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("API server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
