// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection record operations.
//!
//! Rows are keyed by `connection_id` with upsert semantics, so last-writer-wins
//! is the whole concurrency story: no operation spans multiple rows.

use omnirelay_core::types::Connection;
use omnirelay_core::RelayError;
use rusqlite::params;

use crate::database::Database;

/// Upsert a connection as live.
///
/// A reconnect with the same `connection_id` overwrites the identity fields,
/// refreshes the timestamps, and clears any prior `disconnected_at`.
pub async fn upsert_connection(
    db: &Database,
    connection_id: &str,
    user_id: &str,
    company_id: &str,
    metadata: Option<String>,
) -> Result<(), RelayError> {
    let connection_id = connection_id.to_string();
    let user_id = user_id.to_string();
    let company_id = company_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO connections (connection_id, user_id, company_id, metadata)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (connection_id) DO UPDATE SET
                     user_id = excluded.user_id,
                     company_id = excluded.company_id,
                     metadata = excluded.metadata,
                     connected_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                     last_seen = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                     disconnected_at = NULL",
                params![connection_id, user_id, company_id, metadata],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a connection as disconnected.
///
/// Idempotent: unknown ids and already-disconnected rows are no-ops.
pub async fn disconnect_connection(db: &Database, connection_id: &str) -> Result<(), RelayError> {
    let connection_id = connection_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE connections
                 SET disconnected_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE connection_id = ?1 AND disconnected_at IS NULL",
                params![connection_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Refresh `last_seen` for a live connection. No-op for closed rows.
pub async fn touch_connection(db: &Database, connection_id: &str) -> Result<(), RelayError> {
    let connection_id = connection_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE connections
                 SET last_seen = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE connection_id = ?1 AND disconnected_at IS NULL",
                params![connection_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Live connections for a user, most recently seen first.
pub async fn list_by_user(db: &Database, user_id: &str) -> Result<Vec<Connection>, RelayError> {
    let user_id = user_id.to_string();
    list_where(db, "user_id = ?1", user_id).await
}

/// Live connections for a company, most recently seen first.
pub async fn list_by_company(
    db: &Database,
    company_id: &str,
) -> Result<Vec<Connection>, RelayError> {
    let company_id = company_id.to_string();
    list_where(db, "company_id = ?1", company_id).await
}

/// All live connections across every identity.
pub async fn list_active(db: &Database) -> Result<Vec<Connection>, RelayError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT connection_id, user_id, company_id, metadata,
                        connected_at, last_seen, disconnected_at
                 FROM connections
                 WHERE disconnected_at IS NULL
                 ORDER BY last_seen DESC",
            )?;
            let rows = stmt.query_map([], map_row)?;
            let mut connections = Vec::new();
            for row in rows {
                connections.push(row?);
            }
            Ok(connections)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

async fn list_where(
    db: &Database,
    predicate: &'static str,
    value: String,
) -> Result<Vec<Connection>, RelayError> {
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT connection_id, user_id, company_id, metadata,
                        connected_at, last_seen, disconnected_at
                 FROM connections
                 WHERE {predicate} AND disconnected_at IS NULL
                 ORDER BY last_seen DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![value], map_row)?;
            let mut connections = Vec::new();
            for row in rows {
                connections.push(row?);
            }
            Ok(connections)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn map_row(row: &rusqlite::Row<'_>) -> Result<Connection, rusqlite::Error> {
    Ok(Connection {
        connection_id: row.get(0)?,
        user_id: row.get(1)?,
        company_id: row.get(2)?,
        metadata: row.get(3)?,
        connected_at: row.get(4)?,
        last_seen: row.get(5)?,
        disconnected_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn register_list_disconnect_cycle() {
        let (db, _dir) = setup_db().await;

        upsert_connection(&db, "c-1", "u-1", "co-1", None)
            .await
            .unwrap();
        upsert_connection(&db, "c-2", "u-1", "co-1", Some(r#"{"agent":"web"}"#.into()))
            .await
            .unwrap();
        upsert_connection(&db, "c-3", "u-2", "co-1", None)
            .await
            .unwrap();

        let by_user = list_by_user(&db, "u-1").await.unwrap();
        assert_eq!(by_user.len(), 2);
        let by_company = list_by_company(&db, "co-1").await.unwrap();
        assert_eq!(by_company.len(), 3);

        disconnect_connection(&db, "c-2").await.unwrap();
        let by_user = list_by_user(&db, "u-1").await.unwrap();
        assert_eq!(by_user.len(), 1);
        assert_eq!(by_user[0].connection_id, "c-1");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn listings_never_return_disconnected_rows() {
        let (db, _dir) = setup_db().await;

        upsert_connection(&db, "c-1", "u-1", "co-1", None)
            .await
            .unwrap();
        disconnect_connection(&db, "c-1").await.unwrap();

        assert!(list_by_user(&db, "u-1").await.unwrap().is_empty());
        assert!(list_by_company(&db, "co-1").await.unwrap().is_empty());
        assert!(list_active(&db).await.unwrap().is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reconnect_with_same_id_clears_disconnected_at() {
        let (db, _dir) = setup_db().await;

        upsert_connection(&db, "c-1", "u-1", "co-1", None)
            .await
            .unwrap();
        disconnect_connection(&db, "c-1").await.unwrap();
        assert!(list_by_user(&db, "u-1").await.unwrap().is_empty());

        // Fresh connect re-issuing the same transport id.
        upsert_connection(&db, "c-1", "u-1", "co-1", None)
            .await
            .unwrap();
        let live = list_by_user(&db, "u-1").await.unwrap();
        assert_eq!(live.len(), 1);
        assert!(live[0].is_live());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn disconnect_is_idempotent_for_unknown_ids() {
        let (db, _dir) = setup_db().await;
        // Neither call errors.
        disconnect_connection(&db, "never-registered").await.unwrap();
        disconnect_connection(&db, "never-registered").await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn touch_only_updates_live_rows() {
        let (db, _dir) = setup_db().await;

        upsert_connection(&db, "c-1", "u-1", "co-1", None)
            .await
            .unwrap();
        disconnect_connection(&db, "c-1").await.unwrap();
        touch_connection(&db, "c-1").await.unwrap();

        // Still disconnected: touch did not resurrect the row.
        assert!(list_by_user(&db, "u-1").await.unwrap().is_empty());
        db.close().await.unwrap();
    }
}
