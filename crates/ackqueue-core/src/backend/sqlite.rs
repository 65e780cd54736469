//! SQLite backend.
//!
//! Durable store shared by every process that opens the same database file.
//! Each operation runs in its own `IMMEDIATE` transaction, so the write lock
//! is taken up front and concurrent claims serialize instead of deadlocking.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use tokio::sync::Notify;
use tokio_rusqlite::Connection;
use tracing::{debug, info, warn};

use super::schema::init_schema;
use super::{QueueBackend, ReadySignals};
use crate::error::QueueError;
use crate::item::{QueueCounts, Uid};
use crate::keys::QueueKeys;

/// Default re-check cadence for consumers blocked on a shared database.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-based queue backend.
pub struct SqliteBackend {
    conn: Connection,
    signals: ReadySignals,
    poll_interval: Duration,
}

impl SqliteBackend {
    /// Create a new in-memory database.
    pub async fn in_memory() -> Result<Self, QueueError> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn, BTreeMap::new()).await
    }

    /// Open or create a file-backed database.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, QueueError> {
        Self::open_with_pragmas(path, BTreeMap::new()).await
    }

    /// Open a file-backed database, applying connection pragmas verbatim.
    pub async fn open_with_pragmas(
        path: impl AsRef<Path>,
        pragmas: BTreeMap<String, String>,
    ) -> Result<Self, QueueError> {
        let path = path.as_ref().to_path_buf();
        info!("Opening SQLite queue store at {:?}", path);
        let conn = Connection::open(path).await?;
        Self::init(conn, pragmas).await
    }

    async fn init(conn: Connection, pragmas: BTreeMap<String, String>) -> Result<Self, QueueError> {
        conn.call(move |conn| {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            for (name, value) in &pragmas {
                conn.pragma_update(None, name, value)?;
            }
            init_schema(conn)?;
            Ok(())
        })
        .await?;

        Ok(Self {
            conn,
            signals: ReadySignals::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Override the re-check cadence for blocked consumers.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[async_trait]
impl QueueBackend for SqliteBackend {
    fn id(&self) -> &str {
        "sqlite"
    }

    async fn enqueue(&self, keys: &QueueKeys, uid: &Uid, payload: Vec<u8>) -> Result<(), QueueError> {
        let (items_key, queue_key) = (keys.items.clone(), keys.queue.clone());
        let uid_str = uid.as_str().to_string();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                tx.execute(
                    "INSERT INTO items (key, uid, payload) VALUES (?1, ?2, ?3)",
                    params![items_key, uid_str, payload],
                )?;
                tx.execute(
                    "INSERT INTO ready (key, uid) VALUES (?1, ?2)",
                    params![queue_key, uid_str],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await?;

        self.signals.wake(keys);
        Ok(())
    }

    async fn claim(&self, keys: &QueueKeys, now_micros: i64) -> Result<Option<(Uid, Vec<u8>)>, QueueError> {
        let keys = keys.clone();

        let claimed = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                loop {
                    let head: Option<(i64, String)> = tx
                        .query_row(
                            "SELECT seq, uid FROM ready WHERE key = ?1 ORDER BY seq LIMIT 1",
                            params![keys.queue],
                            |row| Ok((row.get(0)?, row.get(1)?)),
                        )
                        .optional()?;

                    let Some((seq, uid)) = head else {
                        tx.commit()?;
                        return Ok(None);
                    };

                    tx.execute("DELETE FROM ready WHERE seq = ?1", params![seq])?;

                    let payload: Option<Vec<u8>> = tx
                        .query_row(
                            "SELECT payload FROM items WHERE key = ?1 AND uid = ?2",
                            params![keys.items, uid],
                            |row| row.get(0),
                        )
                        .optional()?;

                    match payload {
                        Some(payload) => {
                            tx.execute(
                                "INSERT OR REPLACE INTO checkouts (key, uid, checkout_at) VALUES (?1, ?2, ?3)",
                                params![keys.checkouts, uid, now_micros],
                            )?;
                            tx.commit()?;
                            return Ok(Some((Uid::from(uid), payload)));
                        }
                        None => {
                            warn!("Dropping queued uid {} without stored item", uid);
                        }
                    }
                }
            })
            .await?;

        if let Some((uid, _)) = &claimed {
            debug!("Checked out {}", uid);
        }
        Ok(claimed)
    }

    async fn resolve(&self, keys: &QueueKeys, uid: &Uid) -> Result<bool, QueueError> {
        let (checkouts_key, items_key) = (keys.checkouts.clone(), keys.items.clone());
        let uid_str = uid.as_str().to_string();

        let resolved = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let removed = tx.execute(
                    "DELETE FROM checkouts WHERE key = ?1 AND uid = ?2",
                    params![checkouts_key, uid_str],
                )?;
                if removed == 0 {
                    return Ok(false);
                }
                tx.execute(
                    "DELETE FROM items WHERE key = ?1 AND uid = ?2",
                    params![items_key, uid_str],
                )?;
                tx.commit()?;
                Ok(true)
            })
            .await?;

        Ok(resolved)
    }

    async fn release(&self, keys: &QueueKeys, uid: &Uid) -> Result<bool, QueueError> {
        let (checkouts_key, queue_key) = (keys.checkouts.clone(), keys.queue.clone());
        let uid_str = uid.as_str().to_string();

        let released = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let removed = tx.execute(
                    "DELETE FROM checkouts WHERE key = ?1 AND uid = ?2",
                    params![checkouts_key, uid_str],
                )?;
                if removed == 0 {
                    return Ok(false);
                }
                tx.execute(
                    "INSERT INTO ready (key, uid) VALUES (?1, ?2)",
                    params![queue_key, uid_str],
                )?;
                tx.commit()?;
                Ok(true)
            })
            .await?;

        if released {
            self.signals.wake(keys);
        }
        Ok(released)
    }

    async fn stale_checkouts(
        &self,
        keys: &QueueKeys,
        max_score: i64,
        limit: usize,
    ) -> Result<Vec<Uid>, QueueError> {
        let checkouts_key = keys.checkouts.clone();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let uids = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT uid FROM checkouts WHERE key = ?1 AND checkout_at <= ?2
                     ORDER BY checkout_at, uid LIMIT ?3",
                )?;
                let uids = stmt
                    .query_map(params![checkouts_key, max_score, limit], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(uids)
            })
            .await?;

        Ok(uids.into_iter().map(Uid::from).collect())
    }

    async fn counts(&self, keys: &QueueKeys) -> Result<QueueCounts, QueueError> {
        let keys = keys.clone();

        let counts = self
            .conn
            .call(move |conn| {
                let count = |sql: &str, key: &str| -> Result<u64, rusqlite::Error> {
                    conn.query_row(sql, [key], |row| row.get::<_, i64>(0))
                        .map(|n| n as u64)
                };
                Ok(QueueCounts {
                    ready: count("SELECT COUNT(*) FROM ready WHERE key = ?1", &keys.queue)?,
                    checked_out: count("SELECT COUNT(*) FROM checkouts WHERE key = ?1", &keys.checkouts)?,
                    items: count("SELECT COUNT(*) FROM items WHERE key = ?1", &keys.items)?,
                })
            })
            .await?;

        Ok(counts)
    }

    fn ready_signal(&self, keys: &QueueKeys) -> Arc<Notify> {
        self.signals.get(keys)
    }

    fn poll_interval(&self) -> Option<Duration> {
        Some(self.poll_interval)
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
