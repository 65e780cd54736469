//! Background reclaim of stale checkouts.
//!
//! A delivery that stays checked out for a full autoclean interval is assumed
//! to belong to a crashed or hung consumer and is released back to the ready
//! queue. Release is the same guarded primitive `fail` uses: if the consumer
//! resolves the uid between selection and release, the release is a no-op.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::QueueBackend;
use crate::error::QueueError;
use crate::item::now_micros;
use crate::keys::QueueKeys;

/// Uids selected per scored-set query.
pub const SWEEP_BATCH: usize = 100;

const MIN_TICK: Duration = Duration::from_millis(100);
const MAX_TICK: Duration = Duration::from_secs(5);

/// Reclaimer lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReclaimerState {
    /// Waiting for the next tick.
    Idle,
    /// Releasing stale checkouts.
    Sweeping,
    /// Task has exited.
    Stopped,
}

impl ReclaimerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ReclaimerState::Idle,
            1 => ReclaimerState::Sweeping,
            _ => ReclaimerState::Stopped,
        }
    }
}

impl std::fmt::Display for ReclaimerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReclaimerState::Idle => write!(f, "idle"),
            ReclaimerState::Sweeping => write!(f, "sweeping"),
            ReclaimerState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Point-in-time reclaimer counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReclaimerStats {
    /// Current state.
    pub state: ReclaimerState,
    /// Completed sweeps.
    pub sweeps: u64,
    /// Items released back to the ready queue.
    pub reclaimed: u64,
    /// Sweeps aborted by a backend error.
    pub failures: u64,
}

#[derive(Default)]
struct Shared {
    state: AtomicU8,
    sweeps: AtomicU64,
    reclaimed: AtomicU64,
    failures: AtomicU64,
}

impl Shared {
    fn set_state(&self, state: ReclaimerState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}

/// Handle to a running reclaim task.
///
/// The task is cancelled when the handle is dropped.
pub struct Reclaimer {
    interval: Duration,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
    shared: Arc<Shared>,
}

impl Reclaimer {
    /// Start reclaiming checkouts older than `interval` on the current runtime.
    pub fn spawn(
        backend: Arc<dyn QueueBackend>,
        keys: QueueKeys,
        interval: Duration,
    ) -> Result<Self, QueueError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            QueueError::Config(format!("autoclean requires a Tokio runtime: {}", e))
        })?;

        let cancel = CancellationToken::new();
        let shared = Arc::new(Shared::default());
        let handle = runtime.spawn(run_loop(
            backend,
            keys,
            interval,
            shared.clone(),
            cancel.clone(),
        ));

        Ok(Self {
            interval,
            cancel,
            handle: Some(handle),
            shared,
        })
    }

    /// Age after which a checkout is reclaimed.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Current counters.
    pub fn stats(&self) -> ReclaimerStats {
        ReclaimerStats {
            state: ReclaimerState::from_u8(self.shared.state.load(Ordering::SeqCst)),
            sweeps: self.shared.sweeps.load(Ordering::SeqCst),
            reclaimed: self.shared.reclaimed.load(Ordering::SeqCst),
            failures: self.shared.failures.load(Ordering::SeqCst),
        }
    }

    /// Cancel the task and wait for it to exit.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Reclaimer task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for Reclaimer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Time between sweeps for a given autoclean interval.
pub fn tick_period(interval: Duration) -> Duration {
    interval.mul_f64(0.5).clamp(MIN_TICK, MAX_TICK)
}

async fn run_loop(
    backend: Arc<dyn QueueBackend>,
    keys: QueueKeys,
    interval: Duration,
    shared: Arc<Shared>,
    cancel: CancellationToken,
) {
    let tick = tick_period(interval);
    info!(
        "Reclaimer started for '{}' (interval: {:?}, tick: {:?})",
        keys.name(),
        interval,
        tick
    );

    loop {
        shared.set_state(ReclaimerState::Sweeping);
        let budget = Instant::now() + tick.mul_f64(0.9);
        let outcome = sweep(backend.as_ref(), &keys, interval, Some(budget)).await;
        if outcome.released > 0 {
            shared.reclaimed.fetch_add(outcome.released, Ordering::SeqCst);
            info!("Reclaimed {} stale item(s) on '{}'", outcome.released, keys.name());
        }
        if let Some(e) = outcome.error {
            shared.failures.fetch_add(1, Ordering::SeqCst);
            warn!("Reclaim sweep on '{}' failed, retrying next tick: {}", keys.name(), e);
        }
        shared.sweeps.fetch_add(1, Ordering::SeqCst);
        shared.set_state(ReclaimerState::Idle);

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(tick) => {}
        }
    }

    shared.set_state(ReclaimerState::Stopped);
    info!("Reclaimer stopped for '{}'", keys.name());
}

/// Release every checkout of the queue that is at least `interval` old.
///
/// Returns the number of items moved back to the ready queue. On a backend
/// error, items already released stay released and are logged.
pub async fn sweep_once(
    backend: &dyn QueueBackend,
    keys: &QueueKeys,
    interval: Duration,
) -> Result<u64, QueueError> {
    let outcome = sweep(backend, keys, interval, None).await;
    match outcome.error {
        None => Ok(outcome.released),
        Some(e) => {
            if outcome.released > 0 {
                warn!(
                    "Reclaimed {} item(s) on '{}' before the sweep failed",
                    outcome.released,
                    keys.name()
                );
            }
            Err(e)
        }
    }
}

/// Result of one sweep; `released` counts items moved even when `error` is set.
struct SweepOutcome {
    released: u64,
    error: Option<QueueError>,
}

async fn sweep(
    backend: &dyn QueueBackend,
    keys: &QueueKeys,
    interval: Duration,
    deadline: Option<Instant>,
) -> SweepOutcome {
    let mut released = 0u64;
    let error = sweep_batches(backend, keys, interval, deadline, &mut released)
        .await
        .err();
    SweepOutcome { released, error }
}

async fn sweep_batches(
    backend: &dyn QueueBackend,
    keys: &QueueKeys,
    interval: Duration,
    deadline: Option<Instant>,
    released: &mut u64,
) -> Result<(), QueueError> {
    let max_age = i64::try_from(interval.as_micros()).unwrap_or(i64::MAX);

    loop {
        let max_score = now_micros().saturating_sub(max_age);
        let stale = backend.stale_checkouts(keys, max_score, SWEEP_BATCH).await?;
        let batch_len = stale.len();

        for uid in stale {
            if backend.release(keys, &uid).await? {
                debug!("Reclaimed {} on '{}'", uid, keys.name());
                *released += 1;
            }
        }

        if batch_len < SWEEP_BATCH {
            return Ok(());
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Ok(());
        }
    }
}

#[cfg(test)]
#[path = "reclaimer_tests.rs"]
mod tests;
