//! Backing-store abstraction.
//!
//! A backend owns three structures per queue, all addressed through
//! [`QueueKeys`]:
//!
//! ```text
//! items      uid -> encoded payload
//! queue      ordered uids awaiting delivery (append tail, pop head)
//! checkouts  scored set: uid -> checkout time in microseconds
//! ```
//!
//! Every trait method is a single atomic transaction. The queue facade and the
//! reclaimer compose nothing across calls, so partial updates are never
//! observable.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Notify;

use crate::error::QueueError;
use crate::item::{QueueCounts, Uid};
use crate::keys::QueueKeys;

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::{SqliteBackend, DEFAULT_POLL_INTERVAL};

/// Atomic operations the queue needs from its store.
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Backend identifier.
    fn id(&self) -> &str;

    /// Store the payload and append `uid` to the ready tail.
    async fn enqueue(&self, keys: &QueueKeys, uid: &Uid, payload: Vec<u8>) -> Result<(), QueueError>;

    /// Pop the ready head, check it out at `now_micros` and return its payload.
    ///
    /// Never blocks. Returns `None` when the ready queue is empty.
    async fn claim(&self, keys: &QueueKeys, now_micros: i64) -> Result<Option<(Uid, Vec<u8>)>, QueueError>;

    /// Remove a checkout and delete its item.
    ///
    /// Returns `false` and changes nothing if `uid` is not checked out.
    async fn resolve(&self, keys: &QueueKeys, uid: &Uid) -> Result<bool, QueueError>;

    /// Remove a checkout and append its uid to the ready tail.
    ///
    /// Returns `false` and changes nothing if `uid` is not checked out.
    async fn release(&self, keys: &QueueKeys, uid: &Uid) -> Result<bool, QueueError>;

    /// Checked-out uids with a checkout time at or before `max_score`, oldest first.
    async fn stale_checkouts(
        &self,
        keys: &QueueKeys,
        max_score: i64,
        limit: usize,
    ) -> Result<Vec<Uid>, QueueError>;

    /// Sizes of the queue's structures.
    async fn counts(&self, keys: &QueueKeys) -> Result<QueueCounts, QueueError>;

    /// Signal fired whenever a uid is appended to the queue's ready tail.
    fn ready_signal(&self, keys: &QueueKeys) -> Arc<Notify>;

    /// Re-check cadence for blocked consumers when other processes may write
    /// the store without firing [`ready_signal`](Self::ready_signal).
    fn poll_interval(&self) -> Option<Duration> {
        None
    }
}

/// Per-queue wake-up signals shared by the backends.
#[derive(Default)]
pub(crate) struct ReadySignals {
    signals: DashMap<String, Arc<Notify>>,
}

impl ReadySignals {
    pub(crate) fn get(&self, keys: &QueueKeys) -> Arc<Notify> {
        self.signals
            .entry(keys.queue.clone())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    pub(crate) fn wake(&self, keys: &QueueKeys) {
        if let Some(signal) = self.signals.get(&keys.queue) {
            signal.notify_waiters();
        }
    }
}
