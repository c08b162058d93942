//! Durable pending-transmission queue
//!
//! At-least-once delivery: payloads that could not be sent are written to
//! SQLite and retried until acknowledged or expired. Entries and their
//! attempt counts survive process restarts. Expired entries move to a
//! separate table for operator inspection; nothing is silently dropped.

use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::api_client::Transport;
use crate::{Error, Result};

/// What a queued payload is: an attendance document or a device identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingKind {
    Attendance,
    Device,
}

impl PendingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingKind::Attendance => "attendance",
            PendingKind::Device => "device",
        }
    }
}

impl std::str::FromStr for PendingKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "attendance" => Ok(PendingKind::Attendance),
            "device" => Ok(PendingKind::Device),
            other => Err(Error::Validation(format!("unknown transmission kind: {other}"))),
        }
    }
}

/// One queued delivery, as stored.
#[derive(Debug, Clone)]
pub struct PendingTransmission {
    pub id: String,
    pub kind: PendingKind,
    pub payload: Value,
    pub attempts: u32,
    pub enqueued_at: String,
}

/// SQLite-backed delivery queue.
///
/// Cloneable; clones share the pool and the drain lock. The lock makes the
/// retry loop the single delivery authority: two concurrent drains can never
/// have the same entry in flight.
#[derive(Clone)]
pub struct PendingQueue {
    pool: SqlitePool,
    max_attempts: u32,
    drain_lock: Arc<tokio::sync::Mutex<()>>,
}

impl PendingQueue {
    pub fn new(pool: SqlitePool, max_attempts: u32) -> Self {
        Self {
            pool,
            max_attempts,
            drain_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Durably record a payload for later delivery. Local write only; never
    /// touches the network.
    pub async fn enqueue(&self, kind: PendingKind, payload: Value) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO pending_transmissions (id, kind, payload, attempts, status) VALUES (?, ?, ?, 0, 'pending')",
        )
        .bind(&id)
        .bind(kind.as_str())
        .bind(payload.to_string())
        .execute(&self.pool)
        .await?;

        info!(id = %id, kind = kind.as_str(), "transmission queued for retry");
        Ok(id)
    }

    /// All pending entries, oldest first.
    pub async fn pending(&self) -> Result<Vec<PendingTransmission>> {
        let rows: Vec<(String, String, String, i64, String)> = sqlx::query_as(
            "SELECT id, kind, payload, attempts, enqueued_at FROM pending_transmissions \
             WHERE status = 'pending' ORDER BY enqueued_at, id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for (id, kind, payload, attempts, enqueued_at) in rows {
            entries.push(PendingTransmission {
                id,
                kind: kind.parse()?,
                payload: serde_json::from_str(&payload)?,
                attempts: attempts as u32,
                enqueued_at,
            });
        }
        Ok(entries)
    }

    /// Number of entries in the expired store.
    pub async fn expired_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM expired_transmissions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// One pass over the pending entries.
    ///
    /// Success removes the entry; failure increments its attempt count;
    /// reaching the attempt ceiling moves it to the expired store.
    pub async fn drain_once(&self, transport: &dyn Transport) -> Result<()> {
        let _authority = self.drain_lock.lock().await;

        for entry in self.pending().await? {
            match transport.send(entry.kind, &entry.payload).await {
                Ok(()) => {
                    self.mark_delivered(&entry.id).await?;
                    info!(id = %entry.id, kind = entry.kind.as_str(), attempts = entry.attempts, "queued transmission delivered");
                }
                Err(e) => {
                    let attempts = entry.attempts + 1;
                    if attempts >= self.max_attempts {
                        self.expire(&entry.id, attempts).await?;
                        warn!(id = %entry.id, attempts, "transmission expired after repeated failures: {e}");
                    } else {
                        self.record_failure(&entry.id, attempts).await?;
                        warn!(id = %entry.id, attempts, "transmission still failing: {e}");
                    }
                }
            }
        }

        Ok(())
    }

    async fn mark_delivered(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE pending_transmissions SET status = 'delivered' WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM pending_transmissions WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn record_failure(&self, id: &str, attempts: u32) -> Result<()> {
        sqlx::query("UPDATE pending_transmissions SET attempts = ? WHERE id = ?")
            .bind(attempts as i64)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn expire(&self, id: &str, attempts: u32) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO expired_transmissions (id, kind, payload, attempts, status, enqueued_at) \
             SELECT id, kind, payload, ?, 'expired', enqueued_at FROM pending_transmissions WHERE id = ?",
        )
        .bind(attempts as i64)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM pending_transmissions WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Transport that fails a scripted number of times before succeeding.
    struct FlakyTransport {
        failures_left: AtomicU32,
        delivered: tokio::sync::Mutex<Vec<(PendingKind, Value)>>,
    }

    impl FlakyTransport {
        fn failing(times: u32) -> Self {
            Self {
                failures_left: AtomicU32::new(times),
                delivered: tokio::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for FlakyTransport {
        async fn send(&self, kind: PendingKind, payload: &Value) -> Result<()> {
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(Error::Api("remote unavailable".to_string()));
            }
            self.delivered.lock().await.push((kind, payload.clone()));
            Ok(())
        }
    }

    async fn test_queue(max_attempts: u32) -> PendingQueue {
        // One connection so the in-memory database is shared.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init::create_tables(&pool).await.unwrap();
        PendingQueue::new(pool, max_attempts)
    }

    #[tokio::test]
    async fn successful_drain_removes_entry() {
        let queue = test_queue(5).await;
        queue
            .enqueue(PendingKind::Attendance, json!({"date": "2026-08-06"}))
            .await
            .unwrap();

        let transport = FlakyTransport::failing(0);
        queue.drain_once(&transport).await.unwrap();

        assert!(queue.pending().await.unwrap().is_empty());
        assert_eq!(queue.expired_count().await.unwrap(), 0);
        let delivered = transport.delivered.lock().await;
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].0, PendingKind::Attendance);
    }

    #[tokio::test]
    async fn failure_increments_attempts_and_keeps_entry() {
        let queue = test_queue(5).await;
        queue.enqueue(PendingKind::Device, json!({"device_id": "SN1"})).await.unwrap();

        let transport = FlakyTransport::failing(10);
        queue.drain_once(&transport).await.unwrap();
        queue.drain_once(&transport).await.unwrap();

        let pending = queue.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempts, 2);
    }

    #[tokio::test]
    async fn delivery_after_three_failures_reaches_three_attempts() {
        let queue = test_queue(10).await;
        queue
            .enqueue(PendingKind::Attendance, json!({"date": "2026-08-06"}))
            .await
            .unwrap();

        let transport = FlakyTransport::failing(3);
        for _ in 0..3 {
            queue.drain_once(&transport).await.unwrap();
        }
        assert_eq!(queue.pending().await.unwrap()[0].attempts, 3);

        queue.drain_once(&transport).await.unwrap();
        assert!(queue.pending().await.unwrap().is_empty());
        assert_eq!(transport.delivered.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn entry_expires_at_the_attempt_ceiling() {
        let queue = test_queue(2).await;
        queue
            .enqueue(PendingKind::Attendance, json!({"date": "2026-08-06"}))
            .await
            .unwrap();

        let transport = FlakyTransport::failing(10);
        queue.drain_once(&transport).await.unwrap();
        queue.drain_once(&transport).await.unwrap();

        assert!(queue.pending().await.unwrap().is_empty());
        assert_eq!(queue.expired_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn queue_survives_reopen_with_attempts_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("punchd.db");

        {
            let pool = crate::db::init_database(&db_path).await.unwrap();
            let queue = PendingQueue::new(pool.clone(), 5);
            queue
                .enqueue(PendingKind::Attendance, json!({"date": "2026-08-06"}))
                .await
                .unwrap();
            queue.drain_once(&FlakyTransport::failing(10)).await.unwrap();
            pool.close().await;
        }

        let pool = crate::db::init_database(&db_path).await.unwrap();
        let queue = PendingQueue::new(pool, 5);
        let pending = queue.pending().await.unwrap();

        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempts, 1);
        assert_eq!(pending[0].payload, json!({"date": "2026-08-06"}));
    }

    #[tokio::test]
    async fn drain_preserves_oldest_first_order() {
        let queue = test_queue(5).await;
        let first = queue.enqueue(PendingKind::Attendance, json!({"n": 1})).await.unwrap();
        let second = queue.enqueue(PendingKind::Attendance, json!({"n": 2})).await.unwrap();

        let pending = queue.pending().await.unwrap();
        assert_eq!(pending.len(), 2);
        // Same-second inserts fall back to id order; both orders start with
        // one of the two ids and contain both.
        let ids: Vec<&str> = pending.iter().map(|p| p.id.as_str()).collect();
        assert!(ids.contains(&first.as_str()));
        assert!(ids.contains(&second.as_str()));
    }
}
