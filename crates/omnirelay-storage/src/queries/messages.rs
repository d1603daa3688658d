// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message persistence with idempotent upsert semantics.
//!
//! The unique (platform, platform_message_id) constraint is the sole
//! concurrency-control primitive: a conflicting insert is a no-op that
//! returns the existing row id, which is what makes at-least-once queue
//! redelivery safe.

use omnirelay_core::types::UnifiedMessage;
use omnirelay_core::RelayError;
use rusqlite::params;

use crate::database::Database;
use crate::models::MessageRow;

/// Insert a message, absorbing duplicates.
///
/// Returns the id of the surviving row: the new id on first insert, the
/// previously stored id when the (platform, platform_message_id) pair
/// already exists. Errors only on store unavailability, never on duplicate.
pub async fn upsert_message(db: &Database, msg: &UnifiedMessage) -> Result<String, RelayError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, platform, platform_message_id, conversation_id,
                                       contact_id, direction, content_type, content_text,
                                       content_json, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT (platform, platform_message_id) DO NOTHING",
                params![
                    msg.id,
                    msg.platform.to_string(),
                    msg.platform_message_id,
                    msg.conversation_id,
                    msg.contact_id,
                    msg.direction.to_string(),
                    msg.content_type.to_string(),
                    msg.content_text,
                    msg.content_json.as_ref().map(|v| v.to_string()),
                    if msg.metadata.is_empty() {
                        None
                    } else {
                        Some(serde_json::Value::Object(msg.metadata.clone()).to_string())
                    },
                    msg.created_at,
                ],
            )?;

            // The surviving row id, whether or not this call inserted it.
            let id: String = conn.query_row(
                "SELECT id FROM messages WHERE platform = ?1 AND platform_message_id = ?2",
                params![msg.platform.to_string(), msg.platform_message_id],
                |row| row.get(0),
            )?;
            Ok(id)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a message row by its stored id.
pub async fn get_message(db: &Database, id: &str) -> Result<Option<MessageRow>, RelayError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, platform, platform_message_id, conversation_id, contact_id,
                        direction, content_type, content_text, content_json, metadata,
                        created_at, updated_at
                 FROM messages WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], map_row);
            match result {
                Ok(row) => Ok(Some(row)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Messages for a conversation, ordered by provider timestamp.
///
/// Arrival order is meaningless under concurrent workers; `created_at`
/// carries the provider-reported time and is the only order presented.
pub async fn list_by_conversation(
    db: &Database,
    conversation_id: &str,
    limit: Option<i64>,
) -> Result<Vec<MessageRow>, RelayError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, platform, platform_message_id, conversation_id, contact_id,
                        direction, content_type, content_text, content_json, metadata,
                        created_at, updated_at
                 FROM messages WHERE conversation_id = ?1
                 ORDER BY created_at ASC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![conversation_id, limit.unwrap_or(-1)], map_row)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn map_row(row: &rusqlite::Row<'_>) -> Result<MessageRow, rusqlite::Error> {
    Ok(MessageRow {
        id: row.get(0)?,
        platform: row.get(1)?,
        platform_message_id: row.get(2)?,
        conversation_id: row.get(3)?,
        contact_id: row.get(4)?,
        direction: row.get(5)?,
        content_type: row.get(6)?,
        content_text: row.get(7)?,
        content_json: row.get(8)?,
        metadata: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnirelay_core::types::{ContentType, Direction, Platform};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_msg(id: &str, platform_message_id: &str, created_at: &str) -> UnifiedMessage {
        UnifiedMessage {
            id: id.to_string(),
            platform: Platform::Whatsapp,
            platform_message_id: platform_message_id.to_string(),
            conversation_id: "conv-1".to_string(),
            contact_id: Some("contact-1".to_string()),
            direction: Direction::Inbound,
            content_type: ContentType::Text,
            content_text: Some("hello".to_string()),
            content_json: None,
            metadata: serde_json::Map::new(),
            created_at: created_at.to_string(),
        }
    }

    async fn count_messages(db: &Database) -> i64 {
        db.connection()
            .call(|conn| -> Result<i64, tokio_rusqlite::Error> {
                Ok(conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn duplicate_insert_returns_existing_id() {
        let (db, _dir) = setup_db().await;

        let first = upsert_message(&db, &make_msg("m-1", "wamid.1", "2026-01-01T00:00:00.000Z"))
            .await
            .unwrap();
        assert_eq!(first, "m-1");

        // Same idempotency key, different proposed id: the original wins.
        let second = upsert_message(&db, &make_msg("m-2", "wamid.1", "2026-01-01T00:00:05.000Z"))
            .await
            .unwrap();
        assert_eq!(second, "m-1");
        assert_eq!(count_messages(&db).await, 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn same_provider_id_on_different_platforms_is_not_a_duplicate() {
        let (db, _dir) = setup_db().await;

        let mut telegram = make_msg("m-2", "123", "2026-01-01T00:00:00.000Z");
        telegram.platform = Platform::Telegram;

        upsert_message(&db, &make_msg("m-1", "123", "2026-01-01T00:00:00.000Z"))
            .await
            .unwrap();
        upsert_message(&db, &telegram).await.unwrap();
        assert_eq!(count_messages(&db).await, 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_message_round_trips_fields() {
        let (db, _dir) = setup_db().await;

        let mut msg = make_msg("m-1", "wamid.1", "2026-01-01T00:00:00.000Z");
        msg.metadata
            .insert("source".into(), serde_json::json!("webhook"));
        upsert_message(&db, &msg).await.unwrap();

        let row = get_message(&db, "m-1").await.unwrap().unwrap();
        assert_eq!(row.platform, "whatsapp");
        assert_eq!(row.direction, "inbound");
        assert_eq!(row.content_text.as_deref(), Some("hello"));
        assert!(row.metadata.unwrap().contains("webhook"));

        assert!(get_message(&db, "missing").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn conversation_listing_orders_by_provider_timestamp() {
        let (db, _dir) = setup_db().await;

        // Insert out of order relative to provider timestamps.
        upsert_message(&db, &make_msg("m-2", "p-2", "2026-01-01T00:00:02.000Z"))
            .await
            .unwrap();
        upsert_message(&db, &make_msg("m-1", "p-1", "2026-01-01T00:00:01.000Z"))
            .await
            .unwrap();
        upsert_message(&db, &make_msg("m-3", "p-3", "2026-01-01T00:00:03.000Z"))
            .await
            .unwrap();

        let rows = list_by_conversation(&db, "conv-1", None).await.unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["m-1", "m-2", "m-3"]);

        let limited = list_by_conversation(&db, "conv-1", Some(2)).await.unwrap();
        assert_eq!(limited.len(), 2);

        db.close().await.unwrap();
    }
}
