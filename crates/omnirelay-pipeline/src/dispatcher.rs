// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue dispatcher: typed enqueue/dequeue/ack over the storage queue.
//!
//! Work items cross the queue as JSON payloads. The dispatcher owns the
//! serialization boundary and the retry-budget reporting; row mechanics
//! (leasing, visibility timeout, dead-letter routing) live in the storage
//! layer.

use omnirelay_config::QueueConfig;
use omnirelay_core::types::{now_iso8601, Notification, Platform, QueueAction, QueueWorkItem};
use omnirelay_core::RelayError;
use omnirelay_storage::queries::queue::{self, FailDisposition};
use omnirelay_storage::Database;
use tracing::{error, warn};

/// A work item leased from the queue, paired with its queue row id for
/// `ack`/`fail`.
#[derive(Debug, Clone)]
pub struct LeasedItem {
    pub queue_id: i64,
    pub item: QueueWorkItem,
}

/// Typed facade over the storage queue.
#[derive(Clone)]
pub struct QueueDispatcher {
    db: Database,
    config: QueueConfig,
}

impl QueueDispatcher {
    pub fn new(db: Database, config: QueueConfig) -> Self {
        Self { db, config }
    }

    /// Enqueue a work item. Returns the queue row id.
    pub async fn enqueue(&self, item: &QueueWorkItem) -> Result<i64, RelayError> {
        let payload = serde_json::to_string(item)
            .map_err(|e| RelayError::Internal(format!("work item serialization: {e}")))?;
        queue::enqueue(&self.db, &payload, self.config.max_attempts).await
    }

    /// Enqueue a `process_message` item for a raw inbound event.
    pub async fn enqueue_process_message(
        &self,
        platform: Platform,
        provider_message_id: &str,
        payload: serde_json::Value,
    ) -> Result<i64, RelayError> {
        self.enqueue(&QueueWorkItem {
            id: uuid::Uuid::new_v4().to_string(),
            message_id: provider_message_id.to_string(),
            platform,
            action: QueueAction::ProcessMessage,
            payload,
            timestamp: now_iso8601(),
            retry_count: 0,
        })
        .await
    }

    /// Enqueue a `send_notification` item for deferred fan-out.
    pub async fn enqueue_notification(
        &self,
        platform: Platform,
        message_id: &str,
        notification: &Notification,
    ) -> Result<i64, RelayError> {
        self.enqueue(&QueueWorkItem {
            id: uuid::Uuid::new_v4().to_string(),
            message_id: message_id.to_string(),
            platform,
            action: QueueAction::SendNotification,
            payload: serde_json::to_value(notification)
                .map_err(|e| RelayError::Internal(format!("notification serialization: {e}")))?,
            timestamp: now_iso8601(),
            retry_count: 0,
        })
        .await
    }

    /// Lease up to the configured batch of deliverable items.
    ///
    /// Each leased item carries the queue's attempt count as `retry_count`.
    /// A payload that no longer parses is failed in place and skipped; it
    /// will dead-letter once its budget runs out.
    pub async fn dequeue(&self) -> Result<Vec<LeasedItem>, RelayError> {
        let rows = queue::dequeue(
            &self.db,
            self.config.batch_size,
            self.config.visibility_timeout_secs,
        )
        .await?;

        let mut leased = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_str::<QueueWorkItem>(&row.payload) {
                Ok(mut item) => {
                    item.retry_count = row.attempts.max(0) as u32;
                    leased.push(LeasedItem {
                        queue_id: row.id,
                        item,
                    });
                }
                Err(e) => {
                    warn!(queue_id = row.id, error = %e, "undecodable queue payload, failing item");
                    self.fail(row.id).await?;
                }
            }
        }
        Ok(leased)
    }

    /// Acknowledge successful processing of a leased item.
    pub async fn ack(&self, queue_id: i64) -> Result<(), RelayError> {
        queue::ack(&self.db, queue_id).await
    }

    /// Record a processing failure.
    ///
    /// The row either returns to pending for redelivery or, at the attempt
    /// budget, moves to dead-letter with an error-level report.
    pub async fn fail(&self, queue_id: i64) -> Result<FailDisposition, RelayError> {
        let disposition = queue::fail(&self.db, queue_id).await?;
        if let FailDisposition::DeadLettered { attempts } = disposition {
            error!(queue_id, attempts, "queue item dead-lettered");
        }
        Ok(disposition)
    }

    /// The configured poll interval for idle workers.
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.config.poll_interval_ms)
    }
}
