//! Configuration schema definitions.
//!
//! ```toml
//! [queue]
//! name = "jobs"
//! autoclean_interval_secs = 60   # 0 disables the reclaimer
//! codec = "text"
//!
//! [backend]
//! kind = "sqlite"
//! path = "~/.ackqueue/queue.db"
//! poll_interval_ms = 250
//!
//! [backend.options]              # passed to the store verbatim
//! journal_mode = "WAL"
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub queue: QueueSection,

    #[serde(default)]
    pub backend: BackendSection,
}

/// Options interpreted by the queue itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSection {
    #[serde(default = "default_name")]
    pub name: String,

    /// Seconds before an unresolved delivery is reclaimed (0 = disabled).
    #[serde(default = "default_autoclean_interval")]
    pub autoclean_interval_secs: f64,

    #[serde(default)]
    pub codec: CodecKind,
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            name: default_name(),
            autoclean_interval_secs: default_autoclean_interval(),
            codec: CodecKind::default(),
        }
    }
}

impl QueueSection {
    /// Autoclean interval, `None` when disabled.
    ///
    /// Values too large for a `Duration` also give `None`; the validator
    /// rejects them before a queue is built.
    pub fn autoclean_interval(&self) -> Option<Duration> {
        let secs = self.autoclean_interval_secs;
        if secs.is_nan() || secs <= 0.0 {
            return None;
        }
        Duration::try_from_secs_f64(secs).ok()
    }
}

fn default_name() -> String {
    "default".to_string()
}

fn default_autoclean_interval() -> f64 {
    60.0
}

/// Payload codec selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    /// Raw bytes.
    #[default]
    Raw,
    /// UTF-8 text.
    Text,
    /// JSON documents.
    Json,
}

/// Backing-store selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process-local, nothing persisted.
    Memory,
    /// SQLite database file shared across processes.
    #[default]
    Sqlite,
}

/// Connection settings for the backing store.
///
/// The queue never looks inside `options`; they go to the store as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSection {
    #[serde(default)]
    pub kind: BackendKind,

    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default)]
    pub options: BTreeMap<String, toml::Value>,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            path: default_db_path(),
            poll_interval_ms: default_poll_interval_ms(),
            options: BTreeMap::new(),
        }
    }
}

impl BackendSection {
    /// Poll interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Connection options rendered as strings.
    pub fn option_strings(&self) -> BTreeMap<String, String> {
        self.options
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    toml::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect()
    }
}

fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".ackqueue").join("queue.db"))
        .unwrap_or_else(|| PathBuf::from("ackqueue.db"))
}

fn default_poll_interval_ms() -> u64 {
    250
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
