// SPDX-FileCopyrightText: 2026 Daydream Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.

use std::time::Instant;

use axum::{
    Router,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use daydream_config::model::ServerConfig;
use daydream_core::DaydreamError;
use daydream_queue::QueueService;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub service: QueueService,
    /// Process start time for uptime reporting.
    pub start_time: Instant,
}

impl GatewayState {
    pub fn new(service: QueueService) -> Self {
        Self {
            service,
            start_time: Instant::now(),
        }
    }
}

/// All routes with CORS and request tracing applied.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route(
            "/prompts",
            get(handlers::get_prompts)
                .post(handlers::post_prompt)
                .put(handlers::put_filler),
        )
        .route("/prompts/trending", get(handlers::get_trending))
        .route("/prompts/{id}/like", post(handlers::post_like))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `host:port` and serves until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), DaydreamError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| DaydreamError::Gateway {
            message: format!("failed to bind HTTP server to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("HTTP server listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| DaydreamError::Gateway {
            message: format!("HTTP server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
