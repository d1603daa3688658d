// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use std::time::Duration;

use omnirelay_core::RelayError;

/// Handle to the SQLite database.
///
/// Wraps a single `tokio_rusqlite::Connection`; all query modules accept
/// `&Database` and go through [`Database::connection`], which serializes
/// every closure on one background thread and eliminates SQLITE_BUSY under
/// concurrent access.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run all
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, RelayError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| map_tr_err(e.into()))?;

        conn.call(|conn| -> Result<(), RelayError> {
            conn.pragma_update(None, "journal_mode", "WAL")
                .map_err(|e| map_tr_err(e.into()))?;
            conn.pragma_update(None, "synchronous", "NORMAL")
                .map_err(|e| map_tr_err(e.into()))?;
            conn.pragma_update(None, "foreign_keys", "ON")
                .map_err(|e| map_tr_err(e.into()))?;
            conn.busy_timeout(Duration::from_secs(5))
                .map_err(|e| map_tr_err(e.into()))?;
            crate::migrations::run_migrations(conn)?;
            Ok(())
        })
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Error(e) => e,
            other => RelayError::Persistence {
                source: Box::new(other),
            },
        })?;

        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Close the database, flushing the WAL.
    pub async fn close(self) -> Result<(), RelayError> {
        self.conn
            .close()
            .await
            .map_err(|e| RelayError::Persistence {
                source: Box::new(e),
            })
    }
}

/// Map a tokio-rusqlite error into the storage error variant.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> RelayError {
    RelayError::Persistence {
        source: Box::new(e),
    }
}
