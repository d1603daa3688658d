// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket surface for live operator connections.
//!
//! Client -> Server (JSON):
//! ```json
//! {"action": "ping"}
//! {"action": "subscribe"}
//! ```
//!
//! Server -> Client: notification frames (`connected`, `pong`, `new_message`,
//! `message_status`) serialized by `omnirelay-core`.
//!
//! Identity comes from the `userId` and `companyId` query parameters; a
//! handshake without both is rejected before the upgrade.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use omnirelay_core::traits::ConnectionTransport;
use omnirelay_core::types::{Notification, NotificationType};
use omnirelay_core::PushError;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::server::GatewayState;

/// Per-connection outbound buffer before pushes start failing.
const SEND_BUFFER: usize = 64;

/// Identity query parameters for the WebSocket handshake.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    #[serde(rename = "userId")]
    user_id: Option<String>,
    #[serde(rename = "companyId")]
    company_id: Option<String>,
}

/// Client frame: an action envelope. Unknown actions are ignored.
#[derive(Debug, Deserialize)]
struct WsIncoming {
    action: String,
}

/// Transport that pushes frames into the per-connection channels.
///
/// A missing or closed channel means the socket task is gone, which the
/// fan-out engine treats as a stale connection to prune.
#[derive(Clone, Default)]
pub struct WsTransport {
    senders: Arc<DashMap<String, mpsc::Sender<String>>>,
}

impl WsTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn senders(&self) -> Arc<DashMap<String, mpsc::Sender<String>>> {
        Arc::clone(&self.senders)
    }
}

#[async_trait]
impl ConnectionTransport for WsTransport {
    async fn push(&self, connection_id: &str, frame: &str) -> Result<(), PushError> {
        let sender = match self.senders.get(connection_id) {
            Some(entry) => entry.value().clone(),
            None => return Err(PushError::Gone),
        };
        match sender.try_send(frame.to_string()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(PushError::Gone),
            Err(mpsc::error::TrySendError::Full(_)) => {
                Err(PushError::Failed("send buffer full".into()))
            }
        }
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<GatewayState>,
) -> Response {
    let (Some(user_id), Some(company_id)) = (params.user_id, params.company_id) else {
        return (
            StatusCode::BAD_REQUEST,
            "userId and companyId query parameters are required",
        )
            .into_response();
    };
    if user_id.is_empty() || company_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            "userId and companyId must be non-empty",
        )
            .into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id, company_id))
}

/// Handle one WebSocket connection for its whole lifetime.
///
/// Registers the connection, streams notification frames out, answers pings,
/// and deregisters on any exit path.
async fn handle_socket(socket: WebSocket, state: GatewayState, user_id: String, company_id: String) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let connection_id = uuid::Uuid::new_v4().to_string();

    if let Err(e) = state
        .registry
        .register(&connection_id, &user_id, &company_id, None)
        .await
    {
        warn!(error = %e, "failed to register connection, closing socket");
        return;
    }

    let (tx, mut rx) = mpsc::channel::<String>(SEND_BUFFER);
    state.ws_senders.insert(connection_id.clone(), tx);
    info!(connection_id, user_id, company_id, "websocket connected");

    // Greeting frame confirms registration to the client.
    let mut connected = Notification::new(
        NotificationType::Connected,
        serde_json::json!({ "connectionId": connection_id }),
    );
    connected.user_id = Some(user_id.clone());
    connected.company_id = Some(company_id.clone());
    if let Ok(frame) = serde_json::to_string(&connected) {
        let _ = ws_sender.send(Message::Text(frame.into())).await;
    }

    // Forward queued notification frames to the socket.
    let sender_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => {
                let incoming: WsIncoming = match serde_json::from_str(&text) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!(connection_id, error = %e, "ignoring malformed frame");
                        continue;
                    }
                };
                match incoming.action.as_str() {
                    "ping" => {
                        if let Err(e) = state.registry.touch(&connection_id).await {
                            warn!(connection_id, error = %e, "failed to touch connection");
                        }
                        let pong =
                            Notification::new(NotificationType::Pong, serde_json::json!({}));
                        if let Ok(frame) = serde_json::to_string(&pong) {
                            if let Some(tx) = state.ws_senders.get(&connection_id) {
                                let _ = tx.try_send(frame);
                            }
                        }
                    }
                    // Subscription is implicit in the registry; accepted silently.
                    other => debug!(connection_id, action = other, "ignoring action"),
                }
            }
            Message::Close(_) => break,
            // Binary frames and protocol pings are handled by the ws layer.
            _ => {}
        }
    }

    state.ws_senders.remove(&connection_id);
    if let Err(e) = state.registry.deregister(&connection_id).await {
        warn!(connection_id, error = %e, "failed to deregister connection");
    }
    sender_task.abort();
    info!(connection_id, "websocket disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transport_reports_unknown_connection_as_gone() {
        let transport = WsTransport::new();
        let err = transport.push("nope", "frame").await.unwrap_err();
        assert!(matches!(err, PushError::Gone));
    }

    #[tokio::test]
    async fn transport_delivers_into_the_channel() {
        let transport = WsTransport::new();
        let (tx, mut rx) = mpsc::channel(4);
        transport.senders().insert("c-1".to_string(), tx);

        transport.push("c-1", "hello").await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn transport_reports_closed_channel_as_gone() {
        let transport = WsTransport::new();
        let (tx, rx) = mpsc::channel(4);
        transport.senders().insert("c-1".to_string(), tx);
        drop(rx);

        let err = transport.push("c-1", "hello").await.unwrap_err();
        assert!(matches!(err, PushError::Gone));
    }

    #[tokio::test]
    async fn transport_reports_full_buffer_as_transient() {
        let transport = WsTransport::new();
        let (tx, _rx) = mpsc::channel(1);
        transport.senders().insert("c-1".to_string(), tx);

        transport.push("c-1", "one").await.unwrap();
        let err = transport.push("c-1", "two").await.unwrap_err();
        assert!(matches!(err, PushError::Failed(_)));
    }

    #[test]
    fn ws_params_require_both_ids() {
        let params: WsParams =
            serde_json::from_str(r#"{"userId": "u-1"}"#).unwrap();
        assert!(params.company_id.is_none());
    }
}
