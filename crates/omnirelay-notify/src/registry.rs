// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection registry backed by the storage layer.
//!
//! The registry records which operator connections exist and who they belong
//! to; the transport that actually reaches them is a separate collaborator.
//! Registration is an upsert, so a reconnect with the same id simply revives
//! the row.

use omnirelay_core::types::Connection;
use omnirelay_core::RelayError;
use omnirelay_storage::queries::connections;
use omnirelay_storage::Database;
use tracing::debug;

/// Registry of operator connections, keyed by connection id.
#[derive(Clone)]
pub struct ConnectionRegistry {
    db: Database,
}

impl ConnectionRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Register (or revive) a connection as live under the given identity.
    pub async fn register(
        &self,
        connection_id: &str,
        user_id: &str,
        company_id: &str,
        metadata: Option<String>,
    ) -> Result<(), RelayError> {
        connections::upsert_connection(&self.db, connection_id, user_id, company_id, metadata)
            .await?;
        debug!(connection_id, user_id, company_id, "connection registered");
        Ok(())
    }

    /// Mark a connection as disconnected. Idempotent.
    pub async fn deregister(&self, connection_id: &str) -> Result<(), RelayError> {
        connections::disconnect_connection(&self.db, connection_id).await?;
        debug!(connection_id, "connection deregistered");
        Ok(())
    }

    /// Refresh liveness for a connection (heartbeat).
    pub async fn touch(&self, connection_id: &str) -> Result<(), RelayError> {
        connections::touch_connection(&self.db, connection_id).await
    }

    /// Live connections belonging to a user.
    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<Connection>, RelayError> {
        connections::list_by_user(&self.db, user_id).await
    }

    /// Live connections belonging to a company.
    pub async fn list_by_company(&self, company_id: &str) -> Result<Vec<Connection>, RelayError> {
        connections::list_by_company(&self.db, company_id).await
    }

    /// Every live connection.
    pub async fn list_active(&self) -> Result<Vec<Connection>, RelayError> {
        connections::list_active(&self.db).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn registry() -> (ConnectionRegistry, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (ConnectionRegistry::new(db), dir)
    }

    #[tokio::test]
    async fn register_then_deregister_cycle() {
        let (registry, _dir) = registry().await;
        registry.register("c-1", "u-1", "co-1", None).await.unwrap();
        assert_eq!(registry.list_by_user("u-1").await.unwrap().len(), 1);

        registry.deregister("c-1").await.unwrap();
        assert!(registry.list_by_user("u-1").await.unwrap().is_empty());

        // Reconnect with the same id revives the row.
        registry.register("c-1", "u-1", "co-1", None).await.unwrap();
        let live = registry.list_by_company("co-1").await.unwrap();
        assert_eq!(live.len(), 1);
        assert!(live[0].is_live());
    }

    #[tokio::test]
    async fn listing_scopes_by_identity() {
        let (registry, _dir) = registry().await;
        registry.register("c-1", "u-1", "co-1", None).await.unwrap();
        registry.register("c-2", "u-2", "co-1", None).await.unwrap();
        registry.register("c-3", "u-1", "co-2", None).await.unwrap();

        assert_eq!(registry.list_by_user("u-1").await.unwrap().len(), 2);
        assert_eq!(registry.list_by_company("co-1").await.unwrap().len(), 2);
        assert_eq!(registry.list_active().await.unwrap().len(), 3);
    }
}
