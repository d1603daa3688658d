// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Omnirelay pipeline.
//!
//! Wire shapes (queue items, notifications) serialize with camelCase keys to
//! stay compatible with the platform-facing JSON contract; internal rows use
//! snake_case column names in the storage crate.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The closed set of supported messaging providers.
///
/// Adding a provider means adding a variant here and a matching arm in the
/// platform client union; no string dispatch exists anywhere else.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Whatsapp,
    Facebook,
    Instagram,
    Telegram,
}

/// Message direction relative to the system.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Content type of a unified message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Image,
    Video,
    Audio,
    Document,
    Location,
    Contact,
}

/// Unified internal representation of a message on any platform.
///
/// The pair (`platform`, `platform_message_id`) is unique and serves as the
/// idempotency key for persistence. `id` is assigned by the persistence
/// stage and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedMessage {
    pub id: String,
    pub platform: Platform,
    pub platform_message_id: String,
    pub conversation_id: String,
    /// Nullable for outbound-only flows where no contact is known.
    pub contact_id: Option<String>,
    pub direction: Direction,
    pub content_type: ContentType,
    pub content_text: Option<String>,
    pub content_json: Option<serde_json::Value>,
    /// Open key-value mapping. Unknown provider fields land here rather than
    /// being discarded, for forward compatibility with schema changes.
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// ISO 8601 timestamp.
    pub created_at: String,
}

/// Action carried by a queue work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueAction {
    ProcessMessage,
    SendNotification,
}

/// Work item exchanged through the transport queue.
///
/// Wire shape: `{id, messageId, platform, action, payload, timestamp, retryCount}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueWorkItem {
    pub id: String,
    /// Identifier of the message this item refers to. For ingestion items
    /// this is the provider message id; after persistence it is the stored id.
    pub message_id: String,
    pub platform: Platform,
    pub action: QueueAction,
    pub payload: serde_json::Value,
    /// ISO 8601 enqueue timestamp.
    pub timestamp: String,
    /// Redelivery count, monotonically increased by the queue on each lease.
    #[serde(default)]
    pub retry_count: u32,
}

/// A live (or recently disconnected) operator connection record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub connection_id: String,
    pub user_id: String,
    pub company_id: String,
    /// Opaque JSON metadata supplied at connect time.
    pub metadata: Option<String>,
    pub connected_at: String,
    pub last_seen: String,
    /// `None` means live. Set exactly once on disconnect; cleared only by a
    /// fresh connect that re-issues the same `connection_id`.
    pub disconnected_at: Option<String>,
}

impl Connection {
    /// A connection is live while it has no disconnect timestamp.
    pub fn is_live(&self) -> bool {
        self.disconnected_at.is_none()
    }
}

/// Recognized notification frame types pushed to connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    NewMessage,
    MessageStatus,
    Connected,
    Pong,
}

/// Ephemeral notification pushed to a live connection.
///
/// Not persisted; has no identity beyond the single delivery attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub data: serde_json::Value,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
}

impl Notification {
    /// Builds a notification of the given kind with the current timestamp.
    pub fn new(kind: NotificationType, data: serde_json::Value) -> Self {
        Self {
            kind,
            data,
            timestamp: now_iso8601(),
            message_id: None,
            conversation_id: None,
            user_id: None,
            company_id: None,
        }
    }
}

/// Structured content of an outbound send request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundContent {
    #[serde(rename = "type")]
    pub kind: ContentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl OutboundContent {
    /// Plain-text content.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: ContentType::Text,
            text: Some(text.into()),
            url: None,
            filename: None,
        }
    }
}

/// A client-originated request to send a message out through a platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundRequest {
    pub platform: Platform,
    pub conversation_id: String,
    pub content: OutboundContent,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    /// Sender identity, used to route fan-out to other connections.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
}

/// Provider-reported result of a successful platform send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResult {
    /// Provider-assigned message identifier.
    pub message_id: String,
}

/// Identity whose message ownership a fan-out resolves against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageOwner {
    pub user_id: Option<String>,
    pub company_id: Option<String>,
}

/// Outcome of one push attempt within a fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered,
    /// Endpoint gone; the connection was deregistered.
    Stale,
    /// Transient failure; the connection stays registered.
    Failed(String),
}

/// Per-connection results of a fan-out. The fan-out engine never fails the
/// caller on partial delivery; this report carries the full picture instead.
#[derive(Debug, Clone, Default)]
pub struct DeliveryReport {
    pub outcomes: Vec<(String, PushOutcome)>,
}

impl DeliveryReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| *o == PushOutcome::Delivered)
            .count()
    }

    pub fn pruned(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| *o == PushOutcome::Stale)
            .count()
    }
}

/// Current UTC time as an ISO 8601 / RFC 3339 string.
pub fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn platform_round_trips_through_strings() {
        for p in [
            Platform::Whatsapp,
            Platform::Facebook,
            Platform::Instagram,
            Platform::Telegram,
        ] {
            let s = p.to_string();
            assert_eq!(Platform::from_str(&s).unwrap(), p);
            let json = serde_json::to_string(&p).unwrap();
            assert_eq!(json, format!("\"{s}\""));
        }
    }

    #[test]
    fn queue_item_uses_camel_case_wire_keys() {
        let item = QueueWorkItem {
            id: "q-1".into(),
            message_id: "wamid.1".into(),
            platform: Platform::Whatsapp,
            action: QueueAction::ProcessMessage,
            payload: serde_json::json!({"text": "hi"}),
            timestamp: "2026-01-01T00:00:00.000Z".into(),
            retry_count: 2,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["messageId"], "wamid.1");
        assert_eq!(json["action"], "process_message");
        assert_eq!(json["retryCount"], 2);
    }

    #[test]
    fn queue_item_retry_count_defaults_to_zero() {
        let json = r#"{
            "id": "q-1",
            "messageId": "m-1",
            "platform": "telegram",
            "action": "send_notification",
            "payload": {},
            "timestamp": "2026-01-01T00:00:00.000Z"
        }"#;
        let item: QueueWorkItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.retry_count, 0);
        assert_eq!(item.action, QueueAction::SendNotification);
    }

    #[test]
    fn notification_omits_absent_optionals() {
        let n = Notification::new(NotificationType::Pong, serde_json::json!({}));
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "pong");
        assert!(json.get("messageId").is_none());
        assert!(json.get("userId").is_none());
    }

    #[test]
    fn connection_liveness_follows_disconnected_at() {
        let mut conn = Connection {
            connection_id: "c-1".into(),
            user_id: "u-1".into(),
            company_id: "co-1".into(),
            metadata: None,
            connected_at: now_iso8601(),
            last_seen: now_iso8601(),
            disconnected_at: None,
        };
        assert!(conn.is_live());
        conn.disconnected_at = Some(now_iso8601());
        assert!(!conn.is_live());
    }

    #[test]
    fn delivery_report_counts() {
        let report = DeliveryReport {
            outcomes: vec![
                ("a".into(), PushOutcome::Delivered),
                ("b".into(), PushOutcome::Stale),
                ("c".into(), PushOutcome::Failed("timeout".into())),
            ],
        };
        assert_eq!(report.attempted(), 3);
        assert_eq!(report.delivered(), 1);
        assert_eq!(report.pruned(), 1);
    }
}
