// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Idempotent persistence stage.
//!
//! Assigns the stored identity and writes through the message upsert: a
//! duplicate `(platform, platform_message_id)` returns the id of the row
//! that already won, so at-least-once upstream delivery collapses to exactly
//! one stored row. Duplicates are not an error path.

use omnirelay_core::types::UnifiedMessage;
use omnirelay_core::RelayError;
use omnirelay_storage::queries::messages;
use omnirelay_storage::Database;
use tracing::debug;

/// Writes unified messages exactly once.
#[derive(Clone)]
pub struct PersistenceStage {
    db: Database,
}

impl PersistenceStage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Persist a message, assigning its id if the normalizer left it empty.
    ///
    /// Returns the stored id, which is the previously-stored id when the
    /// message turns out to be a duplicate. The caller must treat the
    /// returned id, not the one it passed in, as authoritative.
    pub async fn persist(&self, msg: &mut UnifiedMessage) -> Result<String, RelayError> {
        if msg.id.is_empty() {
            msg.id = uuid::Uuid::new_v4().to_string();
        }
        let stored_id = messages::upsert_message(&self.db, msg).await?;
        if stored_id != msg.id {
            debug!(
                platform = %msg.platform,
                platform_message_id = %msg.platform_message_id,
                stored_id,
                "duplicate message absorbed"
            );
            msg.id = stored_id.clone();
        }
        Ok(stored_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnirelay_core::types::{now_iso8601, ContentType, Direction, Platform};

    async fn stage() -> (PersistenceStage, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persist.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (PersistenceStage::new(db), dir)
    }

    fn message(platform_message_id: &str) -> UnifiedMessage {
        UnifiedMessage {
            id: String::new(),
            platform: Platform::Whatsapp,
            platform_message_id: platform_message_id.into(),
            conversation_id: "conv-1".into(),
            contact_id: None,
            direction: Direction::Inbound,
            content_type: ContentType::Text,
            content_text: Some("hi".into()),
            content_json: None,
            metadata: serde_json::Map::new(),
            created_at: now_iso8601(),
        }
    }

    #[tokio::test]
    async fn assigns_an_id_on_first_persist() {
        let (stage, _dir) = stage().await;
        let mut msg = message("wamid.1");
        let id = stage.persist(&mut msg).await.unwrap();
        assert!(!id.is_empty());
        assert_eq!(msg.id, id);
    }

    #[tokio::test]
    async fn duplicate_returns_the_original_id() {
        let (stage, _dir) = stage().await;
        let mut first = message("wamid.dup");
        let first_id = stage.persist(&mut first).await.unwrap();

        let mut second = message("wamid.dup");
        let second_id = stage.persist(&mut second).await.unwrap();

        assert_eq!(first_id, second_id);
        // The caller-visible message now carries the surviving id.
        assert_eq!(second.id, first_id);
    }
}
