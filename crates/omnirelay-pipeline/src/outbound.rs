// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound dispatch coordinator.
//!
//! Order is send-before-persist: the platform send is the authoritative step,
//! and persistence records what the provider actually accepted (including its
//! message id). A persistence failure after a confirmed send is therefore a
//! warning on the response, never a request failure. Fan-out to the sender's
//! other connections is best-effort and cannot undo a completed send.

use std::sync::Arc;

use omnirelay_core::traits::PlatformGateway;
use omnirelay_core::types::{
    now_iso8601, ContentType, Direction, OutboundRequest, UnifiedMessage,
};
use omnirelay_core::RelayError;
use omnirelay_notify::{FanoutEngine, FanoutTarget};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::persist::PersistenceStage;

/// Response returned to the outbound caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundResponse {
    /// Stored message id, or the provider id when persistence failed.
    pub message_id: String,
    pub conversation_id: String,
    /// Present when the send succeeded but a later stage degraded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Drives one outbound request through send, persist, and fan-out.
#[derive(Clone)]
pub struct OutboundCoordinator {
    gateway: Arc<dyn PlatformGateway>,
    persistence: PersistenceStage,
    fanout: FanoutEngine,
}

impl OutboundCoordinator {
    pub fn new(
        gateway: Arc<dyn PlatformGateway>,
        persistence: PersistenceStage,
        fanout: FanoutEngine,
    ) -> Self {
        Self {
            gateway,
            persistence,
            fanout,
        }
    }

    /// Dispatch one outbound message.
    ///
    /// Fails with `Validation` before any side effect, and with
    /// `PlatformSend` when the provider rejects; in both cases no message
    /// row is written. After a confirmed send every further failure is
    /// downgraded to a response warning.
    pub async fn dispatch(&self, request: OutboundRequest) -> Result<OutboundResponse, RelayError> {
        validate(&request)?;

        let sent = self.gateway.send(&request).await?;
        info!(
            platform = %request.platform,
            conversation_id = %request.conversation_id,
            provider_message_id = %sent.message_id,
            "outbound send confirmed"
        );

        let mut warning = None;
        let mut msg = outbound_message(&request, &sent.message_id);
        let message_id = match self.persistence.persist(&mut msg).await {
            Ok(stored_id) => stored_id,
            Err(e) => {
                warn!(error = %e, "sent message could not be persisted");
                warning = Some(format!("message sent but not persisted: {e}"));
                sent.message_id.clone()
            }
        };

        if let Some(target) = fanout_target(&request) {
            match self.fanout.notify_new_message(target, &msg).await {
                Ok(report) => debug!(
                    delivered = report.delivered(),
                    pruned = report.pruned(),
                    "outbound message fanned out"
                ),
                Err(e) => {
                    warn!(error = %e, "outbound fan-out failed");
                    if warning.is_none() {
                        warning = Some(format!("message sent but not fanned out: {e}"));
                    }
                }
            }
        }

        Ok(OutboundResponse {
            message_id,
            conversation_id: request.conversation_id,
            warning,
        })
    }
}

fn validate(request: &OutboundRequest) -> Result<(), RelayError> {
    if request.conversation_id.trim().is_empty() {
        return Err(RelayError::validation("missing_field: conversationId"));
    }
    match request.content.kind {
        ContentType::Text => {
            if request
                .content
                .text
                .as_deref()
                .is_none_or(|t| t.trim().is_empty())
            {
                return Err(RelayError::validation("missing_field: content.text"));
            }
        }
        _ => {
            if request.content.url.is_none() {
                return Err(RelayError::validation("missing_field: content.url"));
            }
        }
    }
    Ok(())
}

fn outbound_message(request: &OutboundRequest, provider_message_id: &str) -> UnifiedMessage {
    let metadata = request
        .metadata
        .as_ref()
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default();
    UnifiedMessage {
        id: String::new(),
        platform: request.platform,
        platform_message_id: provider_message_id.to_string(),
        conversation_id: request.conversation_id.clone(),
        contact_id: None,
        direction: Direction::Outbound,
        content_type: request.content.kind,
        content_text: request.content.text.clone(),
        content_json: serde_json::to_value(&request.content).ok(),
        metadata,
        created_at: now_iso8601(),
    }
}

fn fanout_target(request: &OutboundRequest) -> Option<FanoutTarget> {
    if let Some(user_id) = request.user_id.clone() {
        Some(FanoutTarget::User(user_id))
    } else {
        request.company_id.clone().map(FanoutTarget::Company)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnirelay_core::types::{OutboundContent, Platform};
    use omnirelay_notify::ConnectionRegistry;
    use omnirelay_storage::queries::messages;
    use omnirelay_storage::Database;
    use omnirelay_test_utils::{MockPlatform, MockTransport};

    struct Fixture {
        coordinator: OutboundCoordinator,
        platform: MockPlatform,
        transport: MockTransport,
        registry: ConnectionRegistry,
        db: Database,
        _dir: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbound.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        let platform = MockPlatform::new();
        let transport = MockTransport::new();
        let registry = ConnectionRegistry::new(db.clone());
        let fanout = FanoutEngine::new(registry.clone(), Arc::new(transport.clone()));
        let coordinator = OutboundCoordinator::new(
            Arc::new(platform.clone()),
            PersistenceStage::new(db.clone()),
            fanout,
        );
        Fixture {
            coordinator,
            platform,
            transport,
            registry,
            db,
            _dir: dir,
        }
    }

    fn request() -> OutboundRequest {
        OutboundRequest {
            platform: Platform::Whatsapp,
            conversation_id: "conv-1".into(),
            content: OutboundContent::text("hello"),
            metadata: None,
            user_id: Some("u-1".into()),
            company_id: None,
        }
    }

    #[tokio::test]
    async fn successful_dispatch_persists_and_fans_out() {
        let f = fixture().await;
        f.registry.register("c-1", "u-1", "co-1", None).await.unwrap();
        f.platform.add_success("wamid.sent").await;

        let response = f.coordinator.dispatch(request()).await.unwrap();
        assert!(response.warning.is_none());
        assert_eq!(response.conversation_id, "conv-1");

        let rows = messages::list_by_conversation(&f.db, "conv-1", None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].platform_message_id, "wamid.sent");
        assert_eq!(rows[0].direction, "outbound");

        assert_eq!(f.transport.frames_for("c-1").await.len(), 1);
    }

    #[tokio::test]
    async fn validation_failure_reaches_no_collaborator() {
        let f = fixture().await;
        let mut bad = request();
        bad.content = OutboundContent::text("   ");

        let err = f.coordinator.dispatch(bad).await.unwrap_err();
        assert!(matches!(err, RelayError::Validation { .. }));
        assert!(f.platform.requests().await.is_empty());
        assert!(messages::list_by_conversation(&f.db, "conv-1", None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn rejected_send_writes_no_message_row() {
        let f = fixture().await;
        f.platform.add_failure("provider down").await;

        let err = f.coordinator.dispatch(request()).await.unwrap_err();
        assert!(matches!(err, RelayError::PlatformSend { .. }));
        assert!(messages::list_by_conversation(&f.db, "conv-1", None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn media_content_requires_a_url() {
        let f = fixture().await;
        let mut bad = request();
        bad.content = OutboundContent {
            kind: ContentType::Image,
            text: None,
            url: None,
            filename: None,
        };
        let err = f.coordinator.dispatch(bad).await.unwrap_err();
        assert!(matches!(err, RelayError::Validation { .. }));
    }

    #[tokio::test]
    async fn fanout_failure_downgrades_to_warning() {
        let f = fixture().await;
        f.registry.register("c-1", "u-1", "co-1", None).await.unwrap();
        f.transport.script_failure("c-1", "socket full").await;
        f.platform.add_success("wamid.sent").await;

        // Partial fan-out is not even a warning; the report absorbs it.
        let response = f.coordinator.dispatch(request()).await.unwrap();
        assert!(response.warning.is_none());

        // The send and the row both stand.
        assert_eq!(
            messages::list_by_conversation(&f.db, "conv-1", None)
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
