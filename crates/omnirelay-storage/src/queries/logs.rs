// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Observability log tables: webhook receipts and queue processing attempts.

use omnirelay_core::RelayError;
use rusqlite::params;

use crate::database::Database;

/// Fields recorded for one received webhook.
#[derive(Debug, Clone, Default)]
pub struct WebhookLogEntry {
    pub platform: String,
    pub event_type: String,
    pub payload: Option<String>,
    pub signature: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub status_code: Option<i32>,
    pub processing_time_ms: Option<i64>,
    pub error_message: Option<String>,
}

/// Record a webhook receipt. Returns the log row id.
pub async fn log_webhook(db: &Database, entry: WebhookLogEntry) -> Result<i64, RelayError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO webhook_log (platform, event_type, payload, signature,
                                          ip_address, user_agent, status_code,
                                          processing_time_ms, error_message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    entry.platform,
                    entry.event_type,
                    entry.payload,
                    entry.signature,
                    entry.ip_address,
                    entry.user_agent,
                    entry.status_code,
                    entry.processing_time_ms,
                    entry.error_message,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record one queue processing attempt, independent of whether the message
/// itself persisted. Returns the log row id.
pub async fn log_processing(
    db: &Database,
    message_id: &str,
    queue_item_id: &str,
    status: &str,
    retry_count: i32,
    error_message: Option<String>,
    processing_time_ms: Option<i64>,
) -> Result<i64, RelayError> {
    let message_id = message_id.to_string();
    let queue_item_id = queue_item_id.to_string();
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO processing_log (message_id, queue_item_id, status,
                                             retry_count, error_message, processing_time_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    message_id,
                    queue_item_id,
                    status,
                    retry_count,
                    error_message,
                    processing_time_ms,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
