// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification fan-out engine.
//!
//! Resolves a target identity to its live connections and pushes one frame to
//! each. Each push is independent: a failure on one connection never blocks
//! the others, and a `Gone` endpoint prunes its registry row on the spot.

use std::sync::Arc;

use omnirelay_core::traits::ConnectionTransport;
use omnirelay_core::types::{
    DeliveryReport, Notification, NotificationType, PushOutcome, UnifiedMessage,
};
use omnirelay_core::{PushError, RelayError};
use tracing::{debug, warn};

use crate::registry::ConnectionRegistry;

/// Who a notification fans out to.
#[derive(Debug, Clone)]
pub enum FanoutTarget {
    User(String),
    Company(String),
    /// Explicit connection ids, bypassing registry lookup.
    Connections(Vec<String>),
}

/// Pushes notifications to live connections through a [`ConnectionTransport`].
#[derive(Clone)]
pub struct FanoutEngine {
    registry: ConnectionRegistry,
    transport: Arc<dyn ConnectionTransport>,
}

impl FanoutEngine {
    pub fn new(registry: ConnectionRegistry, transport: Arc<dyn ConnectionTransport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// Fan one notification out to every live connection of the target.
    ///
    /// Never fails on partial delivery; the [`DeliveryReport`] carries the
    /// per-connection outcomes. Only registry lookup errors propagate.
    pub async fn notify(
        &self,
        target: FanoutTarget,
        notification: &Notification,
    ) -> Result<DeliveryReport, RelayError> {
        let connection_ids = match target {
            FanoutTarget::User(user_id) => self
                .registry
                .list_by_user(&user_id)
                .await?
                .into_iter()
                .map(|c| c.connection_id)
                .collect(),
            FanoutTarget::Company(company_id) => self
                .registry
                .list_by_company(&company_id)
                .await?
                .into_iter()
                .map(|c| c.connection_id)
                .collect(),
            FanoutTarget::Connections(ids) => ids,
        };

        let frame = serde_json::to_string(notification)
            .map_err(|e| RelayError::Internal(format!("notification serialization: {e}")))?;

        let mut report = DeliveryReport::default();
        for connection_id in connection_ids {
            let outcome = match self.transport.push(&connection_id, &frame).await {
                Ok(()) => PushOutcome::Delivered,
                Err(PushError::Gone) => {
                    warn!(connection_id, "endpoint gone, pruning connection");
                    self.registry.deregister(&connection_id).await?;
                    PushOutcome::Stale
                }
                Err(PushError::Failed(reason)) => {
                    warn!(connection_id, reason, "push failed");
                    PushOutcome::Failed(reason)
                }
            };
            report.outcomes.push((connection_id, outcome));
        }

        debug!(
            attempted = report.attempted(),
            delivered = report.delivered(),
            pruned = report.pruned(),
            "fan-out complete"
        );
        Ok(report)
    }

    /// Notify about a newly persisted inbound message.
    pub async fn notify_new_message(
        &self,
        target: FanoutTarget,
        message: &UnifiedMessage,
    ) -> Result<DeliveryReport, RelayError> {
        let mut notification = Notification::new(
            NotificationType::NewMessage,
            serde_json::to_value(message)
                .map_err(|e| RelayError::Internal(format!("message serialization: {e}")))?,
        );
        notification.message_id = Some(message.id.clone());
        notification.conversation_id = Some(message.conversation_id.clone());
        self.notify(target, &notification).await
    }

    /// Notify about a delivery-status change for a message.
    pub async fn notify_message_status(
        &self,
        target: FanoutTarget,
        message_id: &str,
        status: &str,
    ) -> Result<DeliveryReport, RelayError> {
        let mut notification = Notification::new(
            NotificationType::MessageStatus,
            serde_json::json!({ "messageId": message_id, "status": status }),
        );
        notification.message_id = Some(message_id.to_string());
        self.notify(target, &notification).await
    }
}
