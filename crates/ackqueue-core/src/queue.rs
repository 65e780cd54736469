//! Queue facade: put / get / ack / fail.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::backend::QueueBackend;
use crate::codec::{Codec, RawCodec};
use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::item::{now_micros, Delivery, QueueCounts, Uid};
use crate::keys::QueueKeys;
use crate::reclaimer::{Reclaimer, ReclaimerStats};

/// How long `get` may wait for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Block until an item is available.
    Forever,
    /// Block up to the given duration, then return empty.
    For(Duration),
    /// Return immediately.
    NoWait,
}

impl Wait {
    /// Map a timeout in seconds: `0` blocks forever, positive waits that long,
    /// negative does not wait at all.
    pub fn from_secs(secs: f64) -> Self {
        if secs < 0.0 {
            Wait::NoWait
        } else if secs == 0.0 {
            Wait::Forever
        } else {
            // Too large (or NaN) to represent: no practical bound
            Duration::try_from_secs_f64(secs).map_or(Wait::Forever, Wait::For)
        }
    }
}

impl From<Duration> for Wait {
    fn from(d: Duration) -> Self {
        Wait::For(d)
    }
}

impl From<f64> for Wait {
    fn from(secs: f64) -> Self {
        Wait::from_secs(secs)
    }
}

/// Reliable FIFO queue with explicit acknowledgement.
///
/// Each delivery returned by [`get`](Self::get) stays checked out until it is
/// passed to [`ack`](Self::ack) or [`fail`](Self::fail). When an autoclean
/// interval is configured, a background [`Reclaimer`] returns deliveries that
/// stay unresolved for longer than the interval.
pub struct SafeQueue<C: Codec = RawCodec> {
    config: QueueConfig,
    keys: QueueKeys,
    backend: Arc<dyn QueueBackend>,
    codec: C,
    reclaimer: Option<Reclaimer>,
}

impl SafeQueue<RawCodec> {
    /// Create a byte queue.
    ///
    /// Must be called inside a Tokio runtime when autoclean is enabled.
    pub fn new(config: QueueConfig, backend: Arc<dyn QueueBackend>) -> Result<Self, QueueError> {
        Self::with_codec(config, backend, RawCodec)
    }
}

impl<C: Codec> SafeQueue<C> {
    /// Create a queue with a custom payload codec.
    pub fn with_codec(
        config: QueueConfig,
        backend: Arc<dyn QueueBackend>,
        codec: C,
    ) -> Result<Self, QueueError> {
        config.validate()?;
        let keys = QueueKeys::new(config.name.clone());

        let reclaimer = match config.autoclean_interval {
            Some(interval) => Some(Reclaimer::spawn(backend.clone(), keys.clone(), interval)?),
            None => None,
        };

        info!(
            "Queue '{}' opened on {} backend (autoclean: {:?})",
            config.name,
            backend.id(),
            config.autoclean_interval
        );

        Ok(Self {
            config,
            keys,
            backend,
            codec,
            reclaimer,
        })
    }

    /// Queue name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Queue configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Store keys used by this queue.
    pub fn keys(&self) -> &QueueKeys {
        &self.keys
    }

    /// Backend the queue runs on.
    pub fn backend(&self) -> &Arc<dyn QueueBackend> {
        &self.backend
    }

    /// Add an item to the tail of the queue and return its uid.
    pub async fn put(&self, value: &C::Value) -> Result<Uid, QueueError> {
        let payload = self
            .codec
            .encode(value)
            .map_err(|source| QueueError::Codec { uid: None, source })?;
        let uid = Uid::generate();

        self.backend.enqueue(&self.keys, &uid, payload).await?;
        debug!("Put {} on '{}'", uid, self.config.name);
        Ok(uid)
    }

    /// Take the next item and check it out.
    ///
    /// Returns `Ok(None)` when the wait ends without an item. If the payload
    /// cannot be decoded the item stays checked out and the error carries its
    /// uid.
    pub async fn get(&self, wait: impl Into<Wait>) -> Result<Option<Delivery<C::Value>>, QueueError> {
        let wait = wait.into();
        // A deadline past the clock's range waits forever
        let deadline = match wait {
            Wait::For(timeout) => Instant::now().checked_add(timeout),
            _ => None,
        };
        let signal = self.backend.ready_signal(&self.keys);
        let poll = self.backend.poll_interval();

        loop {
            // Register for wake-ups before looking, so a put that lands
            // between the claim and the wait is not missed.
            let notified = signal.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some((uid, payload)) = self.backend.claim(&self.keys, now_micros()).await? {
                debug!("Got {} from '{}'", uid, self.config.name);
                return match self.codec.decode(&payload) {
                    Ok(payload) => Ok(Some(Delivery { uid, payload })),
                    Err(source) => Err(QueueError::Codec { uid: Some(uid), source }),
                };
            }

            if wait == Wait::NoWait {
                return Ok(None);
            }

            let woken = async {
                match poll {
                    Some(poll) => {
                        tokio::select! {
                            _ = notified.as_mut() => {}
                            _ = tokio::time::sleep(poll) => {}
                        }
                    }
                    None => notified.as_mut().await,
                }
            };

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, woken).await.is_err() {
                        return Ok(None);
                    }
                }
                None => woken.await,
            }
        }
    }

    /// Alias for [`put`](Self::put).
    pub async fn push(&self, value: &C::Value) -> Result<Uid, QueueError> {
        self.put(value).await
    }

    /// Alias for [`get`](Self::get).
    pub async fn pop(&self, wait: impl Into<Wait>) -> Result<Option<Delivery<C::Value>>, QueueError> {
        self.get(wait).await
    }

    /// Confirm a delivery; the item is deleted for good.
    pub async fn ack(&self, uid: &Uid) -> Result<(), QueueError> {
        if !self.backend.resolve(&self.keys, uid).await? {
            return Err(QueueError::UnknownItem(uid.clone()));
        }
        debug!("Acked {} on '{}'", uid, self.config.name);
        Ok(())
    }

    /// Reject a delivery; the item goes back to the tail of the queue.
    pub async fn fail(&self, uid: &Uid) -> Result<(), QueueError> {
        if !self.backend.release(&self.keys, uid).await? {
            return Err(QueueError::UnknownItem(uid.clone()));
        }
        debug!("Failed {} on '{}', requeued", uid, self.config.name);
        Ok(())
    }

    /// Sizes of the queue's structures.
    pub async fn counts(&self) -> Result<QueueCounts, QueueError> {
        self.backend.counts(&self.keys).await
    }

    /// Reclaimer counters, if autoclean is enabled.
    pub fn reclaimer_stats(&self) -> Option<ReclaimerStats> {
        self.reclaimer.as_ref().map(|r| r.stats())
    }

    /// Stop the reclaimer and wait for it to finish.
    ///
    /// Dropping the queue also stops the reclaimer, without waiting.
    pub async fn shutdown(mut self) {
        if let Some(reclaimer) = self.reclaimer.take() {
            reclaimer.stop().await;
        }
        info!("Queue '{}' shut down", self.config.name);
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
