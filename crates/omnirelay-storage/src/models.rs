// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for storage entities.
//!
//! Wire-facing domain types live in `omnirelay-core::types`; the structs
//! here mirror table columns one-to-one, including fields the domain types
//! do not carry (row ids, `updated_at`, lease bookkeeping).

pub use omnirelay_core::types::Connection;

/// A persisted message row.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRow {
    pub id: String,
    pub platform: String,
    pub platform_message_id: String,
    pub conversation_id: String,
    pub contact_id: Option<String>,
    pub direction: String,
    pub content_type: String,
    pub content_text: Option<String>,
    pub content_json: Option<String>,
    pub metadata: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A queue row as leased to a worker.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueRow {
    pub id: i64,
    pub payload: String,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub created_at: String,
    pub updated_at: String,
    pub locked_until: Option<String>,
}
