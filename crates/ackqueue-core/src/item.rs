//! Item identifiers and delivery results.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Globally unique item identifier, generated at `put` time and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the underlying string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Uid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Uid {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for Uid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An item handed to a consumer by `get`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery<V> {
    /// Identifier to pass back to `ack` or `fail`.
    pub uid: Uid,
    /// Decoded payload.
    pub payload: V,
}

/// Snapshot of a queue's structure sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    /// Uids waiting in the ready queue.
    pub ready: u64,
    /// Uids delivered but not yet resolved.
    pub checked_out: u64,
    /// Payloads held in the item store.
    pub items: u64,
}

impl QueueCounts {
    /// Whether every stored item is accounted for by exactly one structure.
    pub fn is_consistent(&self) -> bool {
        self.ready + self.checked_out == self.items
    }
}

/// Wall-clock time in microseconds, used as the checkout score.
pub(crate) fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}
