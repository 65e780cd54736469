//! # AckQueue Core
//!
//! Reliable FIFO delivery queue with explicit acknowledgement.
//!
//! Producers `put` opaque payloads, consumers `get` them one at a time and must
//! either `ack` (processed) or `fail` (requeue) each delivery. Deliveries left
//! unresolved for longer than the autoclean interval are reclaimed by a
//! background task and become available again.
//!
//! ## Features
//!
//! - At-least-once delivery, FIFO among never-requeued items
//! - Blocking, timed and non-blocking `get`
//! - Pluggable payload codec (raw bytes, UTF-8 text, JSON)
//! - In-memory and SQLite backends behind one atomic-operation trait
//! - Background reclaimer tied to the queue's lifetime

pub mod backend;
pub mod codec;
pub mod config;
pub mod error;
pub mod item;
pub mod keys;
pub mod queue;
pub mod reclaimer;

pub use backend::{MemoryBackend, QueueBackend, SqliteBackend};
pub use codec::{Codec, CodecError, JsonCodec, RawCodec, TextCodec};
pub use config::QueueConfig;
pub use error::QueueError;
pub use item::{Delivery, QueueCounts, Uid};
pub use keys::QueueKeys;
pub use queue::{SafeQueue, Wait};
pub use reclaimer::{sweep_once, Reclaimer, ReclaimerState, ReclaimerStats};
