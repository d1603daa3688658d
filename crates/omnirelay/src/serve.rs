// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `omnirelay serve` command implementation.
//!
//! Wires the full router: SQLite storage, platform API clients, the
//! connection registry and fan-out engine over the gateway's WebSocket
//! transport, the queue worker, and the axum HTTP surface. Supports
//! graceful shutdown via signal handlers.

use std::sync::Arc;

use omnirelay_config::OmnirelayConfig;
use omnirelay_core::traits::assignment::StaticAssignment;
use omnirelay_core::RelayError;
use omnirelay_gateway::{GatewayState, ServerConfig, WsTransport};
use omnirelay_notify::{ConnectionRegistry, FanoutEngine};
use omnirelay_pipeline::{OutboundCoordinator, PersistenceStage, QueueDispatcher, Worker};
use omnirelay_platform::PlatformRouter;
use omnirelay_storage::Database;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Runs the `omnirelay serve` command until a shutdown signal arrives.
pub async fn run_serve(config: OmnirelayConfig) -> Result<(), RelayError> {
    init_tracing(&config.server.log_level);

    info!("starting omnirelay serve");

    let db = Database::open(&config.storage.database_path).await?;
    info!(path = %config.storage.database_path, "storage ready");

    let platform_gateway = Arc::new(PlatformRouter::new(&config.platforms)?);

    let transport = WsTransport::new();
    let registry = ConnectionRegistry::new(db.clone());
    let fanout = FanoutEngine::new(registry.clone(), Arc::new(transport.clone()));

    let dispatcher = QueueDispatcher::new(db.clone(), config.queue.clone());
    let persistence = PersistenceStage::new(db.clone());
    let assignment = Arc::new(StaticAssignment {
        user_id: config.assignment.user_id.clone(),
        company_id: config.assignment.company_id.clone(),
    });

    let cancel = install_signal_handler();

    let worker = Worker::new(
        db.clone(),
        dispatcher.clone(),
        persistence.clone(),
        fanout.clone(),
        assignment,
    );
    let worker_cancel = cancel.clone();
    let worker_handle = tokio::spawn(async move { worker.run(worker_cancel).await });

    let coordinator = OutboundCoordinator::new(platform_gateway.clone(), persistence, fanout);

    let state = GatewayState {
        db,
        dispatcher,
        coordinator,
        platform_gateway,
        platforms: config.platforms.clone(),
        registry,
        ws_senders: transport.senders(),
    };
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };

    let server_result =
        omnirelay_gateway::start_server(&server_config, state, cancel.clone()).await;

    // The server returned (shutdown or bind/serve failure); stop the worker
    // before propagating, so a startup error never leaks the spawned loop.
    cancel.cancel();
    match worker_handle.await {
        Ok(result) => result?,
        Err(e) => error!(error = %e, "worker task panicked"),
    }
    server_result?;

    info!("omnirelay stopped");
    Ok(())
}

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is
/// received.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
    });

    token
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("omnirelay={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
