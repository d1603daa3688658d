// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw event normalization into [`UnifiedMessage`].
//!
//! Pure function, no I/O. Provider payloads vary in key names; the normalizer
//! accepts the common aliases and carries everything it does not recognize
//! into `metadata` rather than dropping it.

use omnirelay_core::types::{
    now_iso8601, ContentType, Direction, Platform, UnifiedMessage,
};
use omnirelay_core::RelayError;
use serde_json::Value;

/// Keys the normalizer consumes; everything else lands in `metadata`.
const CONSUMED_KEYS: &[&str] = &[
    "id",
    "messageId",
    "conversationId",
    "from",
    "contactId",
    "type",
    "text",
    "content",
    "timestamp",
];

/// Normalize one raw provider event into a [`UnifiedMessage`].
///
/// Requires a provider message id (`id` or `messageId`), a conversation
/// (`conversationId` or `from`) and some content (`text` or `content`);
/// anything less is a `Validation` error and never enters the pipeline.
/// The returned message has an empty `id`; the persistence stage assigns it.
pub fn normalize(
    raw: &Value,
    platform: Platform,
    direction: Direction,
) -> Result<UnifiedMessage, RelayError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| RelayError::validation("missing_field: payload is not an object"))?;

    let platform_message_id = string_field(obj, &["id", "messageId"])
        .ok_or_else(|| RelayError::validation("missing_field: id"))?;

    let conversation_id = string_field(obj, &["conversationId", "from"])
        .ok_or_else(|| RelayError::validation("missing_field: conversationId"))?;

    let contact_id = string_field(obj, &["contactId", "from"]);

    let (content_type, content_text, content_json) = extract_content(obj)?;

    let created_at = string_field(obj, &["timestamp"]).unwrap_or_else(now_iso8601);

    let mut metadata = serde_json::Map::new();
    for (key, value) in obj {
        if !CONSUMED_KEYS.contains(&key.as_str()) {
            metadata.insert(key.clone(), value.clone());
        }
    }

    Ok(UnifiedMessage {
        id: String::new(),
        platform,
        platform_message_id,
        conversation_id,
        contact_id,
        direction,
        content_type,
        content_text,
        content_json,
        metadata,
        created_at,
    })
}

fn string_field(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| {
        obj.get(*k).and_then(|v| match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    })
}

/// Content comes either as a plain `text` string or a structured `content`
/// object with its own `type`. Plain strings default to text.
fn extract_content(
    obj: &serde_json::Map<String, Value>,
) -> Result<(ContentType, Option<String>, Option<Value>), RelayError> {
    if let Some(Value::String(text)) = obj.get("text") {
        if !text.is_empty() {
            return Ok((ContentType::Text, Some(text.clone()), None));
        }
    }

    if let Some(content) = obj.get("content") {
        let kind = content
            .get("type")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<ContentType>().ok())
            .or_else(|| obj.get("type").and_then(Value::as_str).and_then(|s| s.parse().ok()))
            .unwrap_or(ContentType::Text);
        let text = content
            .get("text")
            .and_then(Value::as_str)
            .map(str::to_string);
        return Ok((kind, text, Some(content.clone())));
    }

    Err(RelayError::validation("missing_field: content"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_text_event_normalizes() {
        let raw = json!({
            "id": "wamid.1",
            "from": "15551234567",
            "text": "hello there",
            "timestamp": "2026-02-01T10:00:00.000Z"
        });
        let msg = normalize(&raw, Platform::Whatsapp, Direction::Inbound).unwrap();
        assert_eq!(msg.platform_message_id, "wamid.1");
        assert_eq!(msg.conversation_id, "15551234567");
        assert_eq!(msg.content_type, ContentType::Text);
        assert_eq!(msg.content_text.as_deref(), Some("hello there"));
        assert_eq!(msg.created_at, "2026-02-01T10:00:00.000Z");
        assert!(msg.id.is_empty());
    }

    #[test]
    fn missing_id_is_a_validation_error() {
        let raw = json!({ "from": "x", "text": "hi" });
        let err = normalize(&raw, Platform::Telegram, Direction::Inbound).unwrap_err();
        assert!(matches!(err, RelayError::Validation { reason } if reason.contains("id")));
    }

    #[test]
    fn missing_content_is_a_validation_error() {
        let raw = json!({ "id": "m-1", "from": "x" });
        let err = normalize(&raw, Platform::Facebook, Direction::Inbound).unwrap_err();
        assert!(matches!(err, RelayError::Validation { reason } if reason.contains("content")));
    }

    #[test]
    fn structured_content_carries_type_and_json() {
        let raw = json!({
            "id": "m-2",
            "conversationId": "conv-1",
            "content": { "type": "image", "url": "https://cdn.example/p.jpg" }
        });
        let msg = normalize(&raw, Platform::Instagram, Direction::Inbound).unwrap();
        assert_eq!(msg.content_type, ContentType::Image);
        assert!(msg.content_text.is_none());
        assert_eq!(msg.content_json.unwrap()["url"], "https://cdn.example/p.jpg");
    }

    #[test]
    fn unknown_fields_land_in_metadata() {
        let raw = json!({
            "id": "m-3",
            "from": "chat-9",
            "text": "hi",
            "forwarded": true,
            "entities": [{"type": "mention"}]
        });
        let msg = normalize(&raw, Platform::Telegram, Direction::Inbound).unwrap();
        assert_eq!(msg.metadata.get("forwarded"), Some(&json!(true)));
        assert!(msg.metadata.contains_key("entities"));
        assert!(!msg.metadata.contains_key("text"));
    }

    #[test]
    fn numeric_ids_are_stringified() {
        let raw = json!({ "id": 4242, "from": 99, "text": "hi" });
        let msg = normalize(&raw, Platform::Telegram, Direction::Inbound).unwrap();
        assert_eq!(msg.platform_message_id, "4242");
        assert_eq!(msg.conversation_id, "99");
    }

    #[test]
    fn unrecognized_content_type_defaults_to_text() {
        let raw = json!({
            "id": "m-4",
            "from": "c",
            "content": { "type": "sticker", "text": "🎉" }
        });
        let msg = normalize(&raw, Platform::Whatsapp, Direction::Inbound).unwrap();
        assert_eq!(msg.content_type, ContentType::Text);
    }
}
