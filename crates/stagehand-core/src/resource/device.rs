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

//! The device abstraction handles are allocated from.

use super::handle::{GpuHandle, ResourceKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// The allocation side of a graphics backend.
///
/// Implementations must tolerate `release` being called with a handle they no
/// longer know about; the resource model guarantees single release for well
/// behaved owners, but a device must not crash when that guarantee is broken.
pub trait RenderDevice: Send + Sync {
    /// Allocates a new native object and returns its handle.
    fn allocate(&self, kind: ResourceKind, label: &str) -> GpuHandle;

    /// Returns a native object to the device.
    fn release(&self, handle: GpuHandle);
}

/// One entry of the [`ResourceLedger`] history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    /// A handle was allocated.
    Allocated {
        /// The new handle.
        handle: GpuHandle,
        /// Its kind.
        kind: ResourceKind,
    },
    /// A live handle was released.
    Released {
        /// The released handle.
        handle: GpuHandle,
        /// Its kind.
        kind: ResourceKind,
    },
}

#[derive(Debug)]
struct LiveEntry {
    kind: ResourceKind,
    label: String,
}

#[derive(Debug, Default)]
struct LedgerState {
    live: HashMap<GpuHandle, LiveEntry>,
    history: Vec<LedgerEvent>,
    rejected_releases: usize,
}

/// An in-process [`RenderDevice`] that keeps a full history of allocations
/// and releases.
///
/// Headless hosts run on it directly, and it is the reference for asserting
/// release discipline: a release of an unknown or already released handle is
/// counted and logged instead of being forwarded anywhere.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    next: AtomicU64,
    state: Mutex<LedgerState>,
}

impl ResourceLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles currently live.
    pub fn live_count(&self) -> usize {
        self.state.lock().live.len()
    }

    /// Number of live handles of the given kind.
    pub fn live_of(&self, kind: ResourceKind) -> usize {
        self.state
            .lock()
            .live
            .values()
            .filter(|entry| entry.kind == kind)
            .count()
    }

    /// Returns `true` if `handle` has been allocated and not yet released.
    pub fn is_live(&self, handle: GpuHandle) -> bool {
        self.state.lock().live.contains_key(&handle)
    }

    /// Returns the label a live handle was allocated with.
    pub fn label_of(&self, handle: GpuHandle) -> Option<String> {
        self.state
            .lock()
            .live
            .get(&handle)
            .map(|entry| entry.label.clone())
    }

    /// Total number of allocations ever made.
    pub fn allocation_count(&self) -> usize {
        self.state
            .lock()
            .history
            .iter()
            .filter(|event| matches!(event, LedgerEvent::Allocated { .. }))
            .count()
    }

    /// Handles in the order they were released.
    pub fn release_order(&self) -> Vec<GpuHandle> {
        self.state
            .lock()
            .history
            .iter()
            .filter_map(|event| match event {
                LedgerEvent::Released { handle, .. } => Some(*handle),
                LedgerEvent::Allocated { .. } => None,
            })
            .collect()
    }

    /// Position of `handle` in [`ResourceLedger::release_order`].
    pub fn release_position(&self, handle: GpuHandle) -> Option<usize> {
        self.release_order().iter().position(|h| *h == handle)
    }

    /// Number of release calls that targeted a handle that was not live.
    pub fn rejected_releases(&self) -> usize {
        self.state.lock().rejected_releases
    }

    /// A copy of the complete event history.
    pub fn history(&self) -> Vec<LedgerEvent> {
        self.state.lock().history.clone()
    }
}

impl RenderDevice for ResourceLedger {
    fn allocate(&self, kind: ResourceKind, label: &str) -> GpuHandle {
        let handle = GpuHandle::from_raw(self.next.fetch_add(1, Ordering::Relaxed) + 1);
        let mut state = self.state.lock();
        state.live.insert(
            handle,
            LiveEntry {
                kind,
                label: label.to_string(),
            },
        );
        state.history.push(LedgerEvent::Allocated { handle, kind });
        log::trace!("Allocated {handle} ({kind:?}) for '{label}'");
        handle
    }

    fn release(&self, handle: GpuHandle) {
        let mut state = self.state.lock();
        match state.live.remove(&handle) {
            Some(entry) => {
                state.history.push(LedgerEvent::Released {
                    handle,
                    kind: entry.kind,
                });
                log::trace!("Released {handle} ({:?}) of '{}'", entry.kind, entry.label);
            }
            None => {
                state.rejected_releases += 1;
                log::warn!("Ignoring release of {handle}: not a live handle");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_yields_distinct_live_handles() {
        let ledger = ResourceLedger::new();
        let a = ledger.allocate(ResourceKind::Geometry, "a");
        let b = ledger.allocate(ResourceKind::Material, "b");

        assert_ne!(a, b);
        assert_eq!(ledger.live_count(), 2);
        assert_eq!(ledger.live_of(ResourceKind::Material), 1);
        assert_eq!(ledger.label_of(a).as_deref(), Some("a"));
    }

    #[test]
    fn test_double_release_is_absorbed() {
        let ledger = ResourceLedger::new();
        let handle = ledger.allocate(ResourceKind::Texture, "t");

        ledger.release(handle);
        ledger.release(handle);

        assert!(!ledger.is_live(handle));
        assert_eq!(ledger.release_order(), vec![handle]);
        assert_eq!(ledger.rejected_releases(), 1);
    }
}
