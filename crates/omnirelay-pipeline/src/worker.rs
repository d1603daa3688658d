// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue processing worker.
//!
//! Polls the dispatcher and handles work items one at a time. A failure is
//! scoped to its item: the item is failed (retry or dead-letter) and the
//! loop moves on. Acks happen only after the full item pipeline succeeded,
//! so a crash mid-item leads to redelivery, not loss.

use std::sync::Arc;
use std::time::Instant;

use omnirelay_core::traits::ConversationAssignment;
use omnirelay_core::types::{Direction, Notification, QueueAction};
use omnirelay_core::RelayError;
use omnirelay_notify::{FanoutEngine, FanoutTarget};
use omnirelay_storage::queries::logs;
use omnirelay_storage::Database;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dispatcher::{LeasedItem, QueueDispatcher};
use crate::normalizer;
use crate::persist::PersistenceStage;

/// Processes queued work items until cancelled.
pub struct Worker {
    db: Database,
    dispatcher: QueueDispatcher,
    persistence: PersistenceStage,
    fanout: FanoutEngine,
    assignment: Arc<dyn ConversationAssignment>,
}

impl Worker {
    pub fn new(
        db: Database,
        dispatcher: QueueDispatcher,
        persistence: PersistenceStage,
        fanout: FanoutEngine,
        assignment: Arc<dyn ConversationAssignment>,
    ) -> Self {
        Self {
            db,
            dispatcher,
            persistence,
            fanout,
            assignment,
        }
    }

    /// Runs the poll loop until the cancellation token is triggered.
    ///
    /// Several workers may run concurrently against the same queue; the
    /// lease mechanism keeps them from processing the same row, and the
    /// idempotent persistence stage absorbs duplicate logical messages.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), RelayError> {
        info!("worker loop running");
        loop {
            tokio::select! {
                batch = self.dispatcher.dequeue() => {
                    match batch {
                        Ok(items) if items.is_empty() => {
                            tokio::select! {
                                _ = tokio::time::sleep(self.dispatcher.poll_interval()) => {}
                                _ = cancel.cancelled() => break,
                            }
                        }
                        Ok(items) => {
                            for leased in items {
                                self.handle_item(leased).await;
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "dequeue failed, backing off");
                            tokio::select! {
                                _ = tokio::time::sleep(self.dispatcher.poll_interval()) => {}
                                _ = cancel.cancelled() => break,
                            }
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping worker loop");
                    break;
                }
            }
        }
        info!("worker loop stopped");
        Ok(())
    }

    /// Handles one leased item end to end, including ack/fail bookkeeping.
    pub async fn handle_item(&self, leased: LeasedItem) {
        let started = Instant::now();
        let queue_id = leased.queue_id;
        let item = leased.item;
        let retry_count = item.retry_count as i32;

        let result = match item.action {
            QueueAction::ProcessMessage => self.process_message(&item).await,
            QueueAction::SendNotification => self.send_notification(&item).await,
        };
        let elapsed_ms = started.elapsed().as_millis() as i64;

        match result {
            Ok(stored_id) => {
                if let Err(e) = logs::log_processing(
                    &self.db,
                    &stored_id,
                    &item.id,
                    "success",
                    retry_count,
                    None,
                    Some(elapsed_ms),
                )
                .await
                {
                    warn!(queue_id, error = %e, "failed to record processing log");
                }
                if let Err(e) = self.dispatcher.ack(queue_id).await {
                    error!(queue_id, error = %e, "ack failed, item will be redelivered");
                }
            }
            Err(e) => {
                warn!(queue_id, retry_count, error = %e, "work item failed");
                if let Err(log_err) = logs::log_processing(
                    &self.db,
                    &item.message_id,
                    &item.id,
                    "failed",
                    retry_count,
                    Some(e.to_string()),
                    Some(elapsed_ms),
                )
                .await
                {
                    warn!(queue_id, error = %log_err, "failed to record processing log");
                }
                if let Err(fail_err) = self.dispatcher.fail(queue_id).await {
                    error!(queue_id, error = %fail_err, "failed to fail queue item");
                }
            }
        }
    }

    /// Inbound path: normalize, persist, resolve the owner, fan out.
    async fn process_message(
        &self,
        item: &omnirelay_core::types::QueueWorkItem,
    ) -> Result<String, RelayError> {
        let mut msg = normalizer::normalize(&item.payload, item.platform, Direction::Inbound)?;
        let stored_id = self.persistence.persist(&mut msg).await?;

        let owner = self
            .assignment
            .resolve_owner(&msg.conversation_id, msg.platform)
            .await?;

        let target = if let Some(user_id) = owner.user_id {
            Some(FanoutTarget::User(user_id))
        } else {
            owner.company_id.map(FanoutTarget::Company)
        };

        match target {
            Some(target) => {
                let report = self.fanout.notify_new_message(target, &msg).await?;
                debug!(
                    message_id = stored_id,
                    delivered = report.delivered(),
                    pruned = report.pruned(),
                    "inbound message fanned out"
                );
            }
            None => debug!(message_id = stored_id, "no owner resolved, skipping fan-out"),
        }

        Ok(stored_id)
    }

    /// Deferred fan-out: the payload is a serialized notification frame.
    async fn send_notification(
        &self,
        item: &omnirelay_core::types::QueueWorkItem,
    ) -> Result<String, RelayError> {
        let notification: Notification = serde_json::from_value(item.payload.clone())
            .map_err(|e| RelayError::validation(format!("malformed notification payload: {e}")))?;

        let target = if let Some(user_id) = notification.user_id.clone() {
            FanoutTarget::User(user_id)
        } else if let Some(company_id) = notification.company_id.clone() {
            FanoutTarget::Company(company_id)
        } else {
            return Err(RelayError::validation(
                "notification carries neither userId nor companyId",
            ));
        };

        self.fanout.notify(target, &notification).await?;
        Ok(item.message_id.clone())
    }
}
