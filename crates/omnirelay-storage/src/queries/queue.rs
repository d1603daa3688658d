// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Work queue operations with at-least-once delivery semantics.
//!
//! Dequeued rows are leased with a visibility timeout rather than removed;
//! a worker that crashes before acking loses its lock and the row becomes
//! redeliverable with `attempts` incremented. Rows that exhaust their
//! attempt budget move to `dead_letter` and are never delivered again.

use omnirelay_core::RelayError;
use rusqlite::params;

use crate::database::Database;
use crate::models::QueueRow;

/// What happened to a failed queue row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailDisposition {
    /// Back to pending for another delivery.
    Retried { attempts: i32 },
    /// Attempt budget exhausted; terminal.
    DeadLettered { attempts: i32 },
}

/// Enqueue a serialized work item. Returns the auto-generated queue row ID.
pub async fn enqueue(db: &Database, payload: &str, max_attempts: i32) -> Result<i64, RelayError> {
    let payload = payload.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO queue (payload, max_attempts) VALUES (?1, ?2)",
                params![payload, max_attempts],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Lease up to `max_items` deliverable rows.
///
/// Deliverable means `pending`, or `processing` with an expired lock
/// (redelivery). Redelivered rows get `attempts` incremented; a redelivered
/// row that thereby reaches its budget is routed to `dead_letter` instead of
/// being returned. Leased rows are locked for `visibility_timeout_secs`.
pub async fn dequeue(
    db: &Database,
    max_items: usize,
    visibility_timeout_secs: i64,
) -> Result<Vec<QueueRow>, RelayError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut leased = Vec::new();

            loop {
                let candidate = {
                    let mut stmt = tx.prepare(
                        "SELECT id, payload, status, attempts, max_attempts,
                                created_at, updated_at, locked_until
                         FROM queue
                         WHERE status = 'pending'
                            OR (status = 'processing'
                                AND locked_until <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                         ORDER BY id ASC
                         LIMIT 1",
                    )?;
                    stmt.query_row([], |row| {
                        Ok(QueueRow {
                            id: row.get(0)?,
                            payload: row.get(1)?,
                            status: row.get(2)?,
                            attempts: row.get(3)?,
                            max_attempts: row.get(4)?,
                            created_at: row.get(5)?,
                            updated_at: row.get(6)?,
                            locked_until: row.get(7)?,
                        })
                    })
                };

                let row = match candidate {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => break,
                    Err(e) => return Err(e.into()),
                };

                // An expired lock is a redelivery: the lost attempt counts.
                let redelivered = row.status == "processing";
                let attempts = if redelivered {
                    row.attempts + 1
                } else {
                    row.attempts
                };

                if redelivered && attempts >= row.max_attempts {
                    tx.execute(
                        "UPDATE queue SET status = 'dead_letter', attempts = ?1,
                         locked_until = NULL,
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE id = ?2",
                        params![attempts, row.id],
                    )?;
                    tracing::error!(
                        queue_id = row.id,
                        attempts,
                        "queue item exhausted retry budget on lock expiry, dead-lettered"
                    );
                    continue;
                }

                tx.execute(
                    "UPDATE queue SET status = 'processing', attempts = ?1,
                     locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '+' || ?2 || ' seconds'),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?3",
                    params![attempts, visibility_timeout_secs, row.id],
                )?;

                let locked_until: Option<String> = tx.query_row(
                    "SELECT locked_until FROM queue WHERE id = ?1",
                    params![row.id],
                    |r| r.get(0),
                )?;

                leased.push(QueueRow {
                    status: "processing".to_string(),
                    attempts,
                    locked_until,
                    ..row
                });

                if leased.len() >= max_items {
                    break;
                }
            }

            tx.commit()?;
            Ok(leased)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Acknowledge successful processing: marks the row `completed`.
pub async fn ack(db: &Database, id: i64) -> Result<(), RelayError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queue SET status = 'completed', locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a failed processing attempt.
///
/// Increments `attempts`. At `max_attempts` the row becomes `dead_letter`;
/// otherwise it returns to `pending` with the lock cleared for retry.
pub async fn fail(db: &Database, id: i64) -> Result<FailDisposition, RelayError> {
    db.connection()
        .call(move |conn| {
            let (attempts, max_attempts): (i32, i32) = conn.query_row(
                "SELECT attempts, max_attempts FROM queue WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let new_attempts = attempts + 1;
            if new_attempts >= max_attempts {
                conn.execute(
                    "UPDATE queue SET status = 'dead_letter', attempts = ?1,
                     locked_until = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2",
                    params![new_attempts, id],
                )?;
                Ok(FailDisposition::DeadLettered {
                    attempts: new_attempts,
                })
            } else {
                conn.execute(
                    "UPDATE queue SET status = 'pending', attempts = ?1,
                     locked_until = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2",
                    params![new_attempts, id],
                )?;
                Ok(FailDisposition::Retried {
                    attempts: new_attempts,
                })
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
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

    async fn status_of(db: &Database, id: i64) -> String {
        db.connection()
            .call(move |conn| -> Result<String, tokio_rusqlite::Error> {
                Ok(conn.query_row(
                    "SELECT status FROM queue WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )?)
            })
            .await
            .unwrap()
    }

    async fn expire_lock(db: &Database, id: i64) {
        db.connection()
            .call(move |conn| -> Result<(), tokio_rusqlite::Error> {
                conn.execute(
                    "UPDATE queue SET locked_until = '2020-01-01T00:00:00.000Z' WHERE id = ?1",
                    params![id],
                )?;
                Ok(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn enqueue_and_dequeue_lifecycle() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, r#"{"action":"process_message"}"#, 3)
            .await
            .unwrap();
        assert!(id > 0);

        let leased = dequeue(&db, 10, 300).await.unwrap();
        assert_eq!(leased.len(), 1);
        assert_eq!(leased[0].id, id);
        assert_eq!(leased[0].status, "processing");
        assert_eq!(leased[0].attempts, 0);
        assert!(leased[0].locked_until.is_some());

        // Locked row is not redelivered.
        assert!(dequeue(&db, 10, 300).await.unwrap().is_empty());

        ack(&db, id).await.unwrap();
        assert_eq!(status_of(&db, id).await, "completed");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn dequeue_respects_batch_size() {
        let (db, _dir) = setup_db().await;

        for i in 0..5 {
            enqueue(&db, &format!(r#"{{"n":{i}}}"#), 3).await.unwrap();
        }

        let first = dequeue(&db, 3, 300).await.unwrap();
        assert_eq!(first.len(), 3);
        let second = dequeue(&db, 3, 300).await.unwrap();
        assert_eq!(second.len(), 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn fail_retries_until_budget_then_dead_letters() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, "payload", 3).await.unwrap();

        // Attempts 1 and 2 go back to pending.
        for expected in 1..3 {
            let leased = dequeue(&db, 1, 300).await.unwrap();
            assert_eq!(leased.len(), 1);
            let disposition = fail(&db, id).await.unwrap();
            assert_eq!(
                disposition,
                FailDisposition::Retried {
                    attempts: expected
                }
            );
            assert_eq!(status_of(&db, id).await, "pending");
        }

        // Third failure dead-letters, exactly at the budget.
        let leased = dequeue(&db, 1, 300).await.unwrap();
        assert_eq!(leased.len(), 1);
        assert_eq!(leased[0].attempts, 2);
        let disposition = fail(&db, id).await.unwrap();
        assert_eq!(disposition, FailDisposition::DeadLettered { attempts: 3 });
        assert_eq!(status_of(&db, id).await, "dead_letter");

        // Dead-lettered rows are never delivered again.
        assert!(dequeue(&db, 10, 300).await.unwrap().is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn expired_lock_redelivers_with_incremented_attempts() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, "payload", 3).await.unwrap();
        let leased = dequeue(&db, 1, 300).await.unwrap();
        assert_eq!(leased[0].attempts, 0);

        // Simulate a crashed worker: lock expires without ack or fail.
        expire_lock(&db, id).await;

        let redelivered = dequeue(&db, 1, 300).await.unwrap();
        assert_eq!(redelivered.len(), 1);
        assert_eq!(redelivered[0].id, id);
        assert_eq!(redelivered[0].attempts, 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn repeated_crashes_dead_letter_via_expiry() {
        let (db, _dir) = setup_db().await;

        let id = enqueue(&db, "payload", 3).await.unwrap();

        // Crash through the budget: each expiry consumes one attempt.
        dequeue(&db, 1, 300).await.unwrap();
        expire_lock(&db, id).await;
        dequeue(&db, 1, 300).await.unwrap();
        expire_lock(&db, id).await;
        dequeue(&db, 1, 300).await.unwrap();
        expire_lock(&db, id).await;

        // attempts would reach 3 == max_attempts: dead-lettered, not leased.
        let leased = dequeue(&db, 1, 300).await.unwrap();
        assert!(leased.is_empty());
        assert_eq!(status_of(&db, id).await, "dead_letter");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn dequeue_empty_queue_returns_no_rows() {
        let (db, _dir) = setup_db().await;
        assert!(dequeue(&db, 10, 300).await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_writers_no_sqlite_busy() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("concurrent_test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..10 {
            let conn = db.connection().clone();
            let handle = tokio::spawn(async move {
                conn.call(move |conn| -> Result<(), tokio_rusqlite::Error> {
                    conn.execute(
                        "INSERT INTO queue (payload) VALUES (?1)",
                        params![format!(r#"{{"n":{i}}}"#)],
                    )?;
                    Ok(())
                })
                .await
            });
            handles.push(handle);
        }

        for handle in handles {
            let result = handle.await.unwrap();
            assert!(result.is_ok(), "concurrent write failed: {result:?}");
        }

        let leased = dequeue(&db, 20, 300).await.unwrap();
        assert_eq!(leased.len(), 10);

        db.close().await.unwrap();
    }
}
