// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for webhook ingestion, the
//! outbound message API, and the operator WebSocket surface.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use dashmap::DashMap;
use omnirelay_config::PlatformsConfig;
use omnirelay_core::traits::PlatformGateway;
use omnirelay_core::RelayError;
use omnirelay_notify::ConnectionRegistry;
use omnirelay_pipeline::{OutboundCoordinator, QueueDispatcher};
use omnirelay_storage::Database;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::ws;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Storage handle for webhook logging.
    pub db: Database,
    /// Enqueues inbound work items.
    pub dispatcher: QueueDispatcher,
    /// Drives outbound sends.
    pub coordinator: OutboundCoordinator,
    /// Signature verification for incoming webhooks.
    pub platform_gateway: Arc<dyn PlatformGateway>,
    /// Verify tokens for the webhook handshake.
    pub platforms: PlatformsConfig,
    /// Registry of live operator connections.
    pub registry: ConnectionRegistry,
    /// Map of connection_id -> mpsc sender feeding each WebSocket.
    pub ws_senders: Arc<DashMap<String, mpsc::Sender<String>>>,
}

/// Gateway bind configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Builds the full gateway router.
///
/// Split from [`start_server`] so tests can drive it in-process with
/// `tower::ServiceExt::oneshot`.
pub fn build_router(state: GatewayState) -> Router {
    // Unauthenticated liveness route.
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route(
            "/webhook/{platform}",
            get(handlers::verify_webhook).post(handlers::receive_webhook),
        )
        .route("/messages/{platform}", post(handlers::post_message))
        .with_state(state.clone());

    // WebSocket route (identity comes from query params during the handshake).
    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(ws_routes)
        .layer(CorsLayer::permissive())
}

/// Start the gateway HTTP/WebSocket server.
///
/// Serves until the cancellation token fires, then finishes in-flight
/// requests and returns.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), RelayError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RelayError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| RelayError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
