// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A keyed map of in-flight and completed loads.
//!
//! Each key is absent, `Pending` or `Ready`. The first request for an absent
//! key starts the work on a spawned task and marks the key `Pending`; later
//! requests join that work instead of starting their own. When the work ends
//! the key becomes `Ready` on success or absent again on failure, and every
//! joined caller receives the same outcome.
//!
//! The work runs detached from the callers: dropping every caller future does
//! not cancel it, and its result still lands in the map.

use crate::error::LoadError;
use ahash::AHashMap;
use parking_lot::Mutex;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

type Outcome<V> = Option<Result<V, LoadError>>;

enum Slot<V> {
    Pending {
        ticket: u64,
        outcome: watch::Receiver<Outcome<V>>,
    },
    Ready(V),
}

/// Observable state of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Work is in flight.
    Pending,
    /// A value is stored.
    Ready,
}

/// Counters describing how requests were served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Requests answered from a `Ready` entry.
    pub hits: u64,
    /// Requests that joined work already in flight.
    pub joined: u64,
    /// Requests that started new work.
    pub started: u64,
    /// Work that ended in an error.
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    joined: AtomicU64,
    started: AtomicU64,
    failed: AtomicU64,
}

enum Lookup<V> {
    Ready(V),
    Wait(watch::Receiver<Outcome<V>>),
}

/// Deduplicating pending/ready map. See the [module docs](self).
pub struct InFlightMap<K, V> {
    slots: Mutex<AHashMap<K, Slot<V>>>,
    next_ticket: AtomicU64,
    counters: Counters,
}

impl<K, V> Default for InFlightMap<K, V> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(AHashMap::new()),
            next_ticket: AtomicU64::new(0),
            counters: Counters::default(),
        }
    }
}

impl<K, V> InFlightMap<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `key`, joining or starting work as needed.
    ///
    /// `start` is only called when the key is absent. If it fails, the error
    /// is returned and no entry is created. Otherwise the future it returns
    /// is spawned onto the tokio runtime.
    pub async fn get_or_load<F, Fut>(self: &Arc<Self>, key: K, start: F) -> Result<V, LoadError>
    where
        F: FnOnce() -> Result<Fut, LoadError>,
        Fut: Future<Output = Result<V, LoadError>> + Send + 'static,
    {
        let mut outcome = match self.lookup(key, start)? {
            Lookup::Ready(value) => return Ok(value),
            Lookup::Wait(outcome) => outcome,
        };
        let result = match outcome.wait_for(Option::is_some).await {
            Ok(settled) => (*settled).clone().unwrap_or(Err(LoadError::Interrupted)),
            Err(_) => Err(LoadError::Interrupted),
        };
        result
    }

    fn lookup<F, Fut>(self: &Arc<Self>, key: K, start: F) -> Result<Lookup<V>, LoadError>
    where
        F: FnOnce() -> Result<Fut, LoadError>,
        Fut: Future<Output = Result<V, LoadError>> + Send + 'static,
    {
        let mut slots = self.slots.lock();
        match slots.get(&key) {
            Some(Slot::Ready(value)) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Lookup::Ready(value.clone()));
            }
            Some(Slot::Pending { outcome, .. }) => {
                self.counters.joined.fetch_add(1, Ordering::Relaxed);
                return Ok(Lookup::Wait(outcome.clone()));
            }
            None => {}
        }

        let work = start()?;
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let (publish, outcome) = watch::channel(None);
        slots.insert(
            key.clone(),
            Slot::Pending {
                ticket,
                outcome: outcome.clone(),
            },
        );
        drop(slots);
        self.counters.started.fetch_add(1, Ordering::Relaxed);
        log::debug!("Started load of {key:?}");

        let map = Arc::clone(self);
        tokio::spawn(async move {
            // The inner task isolates panics in the work from the settle step.
            let result = match tokio::spawn(work).await {
                Ok(result) => result,
                Err(join_error) => {
                    log::error!("Load of {key:?} aborted: {join_error}");
                    Err(LoadError::Interrupted)
                }
            };
            map.settle(&key, ticket, &result);
            publish.send_replace(Some(result));
        });
        Ok(Lookup::Wait(outcome))
    }

    /// Applies a finished outcome, but only if `key` is still pending under
    /// the same ticket.
    fn settle(&self, key: &K, ticket: u64, result: &Result<V, LoadError>) {
        let mut slots = self.slots.lock();
        let current = matches!(
            slots.get(key),
            Some(Slot::Pending { ticket: t, .. }) if *t == ticket
        );
        if !current {
            log::debug!("Dropping stale outcome for {key:?}");
            return;
        }
        match result {
            Ok(value) => {
                slots.insert(key.clone(), Slot::Ready(value.clone()));
                log::debug!("Load of {key:?} is ready");
            }
            Err(err) => {
                slots.remove(key);
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                log::warn!("Load of {key:?} failed: {err}");
            }
        }
    }

    /// State of `key`, or `None` if absent.
    pub fn state(&self, key: &K) -> Option<EntryState> {
        self.slots.lock().get(key).map(|slot| match slot {
            Slot::Pending { .. } => EntryState::Pending,
            Slot::Ready(_) => EntryState::Ready,
        })
    }

    /// The stored value, if `key` is ready.
    pub fn peek(&self, key: &K) -> Option<V> {
        match self.slots.lock().get(key) {
            Some(Slot::Ready(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Removes and returns a ready value. Pending keys are left alone.
    pub fn remove_ready(&self, key: &K) -> Option<V> {
        let mut slots = self.slots.lock();
        match slots.get(key) {
            Some(Slot::Ready(_)) => match slots.remove(key) {
                Some(Slot::Ready(value)) => Some(value),
                _ => None,
            },
            _ => None,
        }
    }

    /// Removes and returns every ready value. Pending keys are left alone.
    pub fn drain_ready(&self) -> Vec<V> {
        let mut slots = self.slots.lock();
        let ready: Vec<K> = slots
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Ready(_)))
            .map(|(key, _)| key.clone())
            .collect();
        ready
            .into_iter()
            .filter_map(|key| match slots.remove(&key) {
                Some(Slot::Ready(value)) => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Number of keys, pending or ready.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Returns `true` if no key is present.
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    /// Number of keys currently pending.
    pub fn pending_count(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Pending { .. }))
            .count()
    }

    /// Snapshot of the request counters.
    pub fn stats(&self) -> LoadStats {
        LoadStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            joined: self.counters.joined.load(Ordering::Relaxed),
            started: self.counters.started.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}
