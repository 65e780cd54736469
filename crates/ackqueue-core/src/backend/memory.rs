//! Process-local backend.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, warn};

use super::{QueueBackend, ReadySignals};
use crate::error::QueueError;
use crate::item::{QueueCounts, Uid};
use crate::keys::QueueKeys;

/// Sorted set keyed by score, with O(1) membership lookup.
#[derive(Default)]
struct ScoredSet {
    by_score: BTreeSet<(i64, Uid)>,
    scores: HashMap<Uid, i64>,
}

impl ScoredSet {
    fn insert(&mut self, uid: Uid, score: i64) {
        if let Some(old) = self.scores.insert(uid.clone(), score) {
            self.by_score.remove(&(old, uid.clone()));
        }
        self.by_score.insert((score, uid));
    }

    fn remove(&mut self, uid: &Uid) -> bool {
        match self.scores.remove(uid) {
            Some(score) => {
                self.by_score.remove(&(score, uid.clone()));
                true
            }
            None => false,
        }
    }

    fn range_to(&self, max_score: i64, limit: usize) -> Vec<Uid> {
        self.by_score
            .iter()
            .take_while(|(score, _)| *score <= max_score)
            .take(limit)
            .map(|(_, uid)| uid.clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.scores.len()
    }
}

/// All structures, keyed by their full store key.
#[derive(Default)]
struct Keyspace {
    hashes: HashMap<String, HashMap<Uid, Vec<u8>>>,
    lists: HashMap<String, VecDeque<Uid>>,
    sets: HashMap<String, ScoredSet>,
}

/// In-memory backend.
///
/// One mutex guards the whole keyspace, which makes every operation a
/// transaction. The mutex is never held while a consumer waits.
pub struct MemoryBackend {
    keyspace: Mutex<Keyspace>,
    signals: ReadySignals,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self {
            keyspace: Mutex::new(Keyspace::default()),
            signals: ReadySignals::default(),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueBackend for MemoryBackend {
    fn id(&self) -> &str {
        "memory"
    }

    async fn enqueue(&self, keys: &QueueKeys, uid: &Uid, payload: Vec<u8>) -> Result<(), QueueError> {
        {
            let mut ks = self.keyspace.lock().await;
            ks.hashes
                .entry(keys.items.clone())
                .or_default()
                .insert(uid.clone(), payload);
            ks.lists
                .entry(keys.queue.clone())
                .or_default()
                .push_back(uid.clone());
        }
        self.signals.wake(keys);
        Ok(())
    }

    async fn claim(&self, keys: &QueueKeys, now_micros: i64) -> Result<Option<(Uid, Vec<u8>)>, QueueError> {
        let mut ks = self.keyspace.lock().await;
        let Keyspace { hashes, lists, sets } = &mut *ks;

        let Some(list) = lists.get_mut(&keys.queue) else {
            return Ok(None);
        };

        while let Some(uid) = list.pop_front() {
            let payload = hashes.get(&keys.items).and_then(|items| items.get(&uid));
            match payload {
                Some(payload) => {
                    let payload = payload.clone();
                    sets.entry(keys.checkouts.clone())
                        .or_default()
                        .insert(uid.clone(), now_micros);
                    debug!("Checked out {} from {}", uid, keys.queue);
                    return Ok(Some((uid, payload)));
                }
                None => {
                    warn!("Dropping queued uid {} without stored item", uid);
                }
            }
        }

        Ok(None)
    }

    async fn resolve(&self, keys: &QueueKeys, uid: &Uid) -> Result<bool, QueueError> {
        let mut ks = self.keyspace.lock().await;

        let removed = ks
            .sets
            .get_mut(&keys.checkouts)
            .is_some_and(|set| set.remove(uid));
        if !removed {
            return Ok(false);
        }

        if let Some(items) = ks.hashes.get_mut(&keys.items) {
            items.remove(uid);
        }
        Ok(true)
    }

    async fn release(&self, keys: &QueueKeys, uid: &Uid) -> Result<bool, QueueError> {
        {
            let mut ks = self.keyspace.lock().await;

            let removed = ks
                .sets
                .get_mut(&keys.checkouts)
                .is_some_and(|set| set.remove(uid));
            if !removed {
                return Ok(false);
            }

            ks.lists
                .entry(keys.queue.clone())
                .or_default()
                .push_back(uid.clone());
        }
        self.signals.wake(keys);
        Ok(true)
    }

    async fn stale_checkouts(
        &self,
        keys: &QueueKeys,
        max_score: i64,
        limit: usize,
    ) -> Result<Vec<Uid>, QueueError> {
        let ks = self.keyspace.lock().await;
        Ok(ks
            .sets
            .get(&keys.checkouts)
            .map(|set| set.range_to(max_score, limit))
            .unwrap_or_default())
    }

    async fn counts(&self, keys: &QueueKeys) -> Result<QueueCounts, QueueError> {
        let ks = self.keyspace.lock().await;
        Ok(QueueCounts {
            ready: ks.lists.get(&keys.queue).map_or(0, |l| l.len()) as u64,
            checked_out: ks.sets.get(&keys.checkouts).map_or(0, |s| s.len()) as u64,
            items: ks.hashes.get(&keys.items).map_or(0, |h| h.len()) as u64,
        })
    }

    fn ready_signal(&self, keys: &QueueKeys) -> Arc<Notify> {
        self.signals.get(keys)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
