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

//! Behaviour shared by both registries and the lock wrapper used for their
//! global instances.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Bookkeeping common to [`ServiceRegistry`](crate::ServiceRegistry) and
/// [`SystemRegistry`](crate::SystemRegistry).
pub trait Registry: Send + Sync {
    /// A short name used in log messages.
    fn label(&self) -> &'static str;

    /// Number of entries, dead ones included.
    fn len(&self) -> usize;

    /// Returns `true` if there are no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes entries whose subsystem has been dropped and returns how many
    /// were removed.
    fn prune(&mut self) -> usize;

    /// Removes every entry.
    fn clear(&mut self);
}

/// A registry behind a read/write lock, suitable for a `static`.
///
/// Poisoned locks are recovered: registry operations leave the map in a
/// consistent state even if a caller panicked while holding the guard.
#[derive(Debug)]
pub struct SharedRegistry<R> {
    inner: RwLock<R>,
    persistent: AtomicBool,
}

impl<R: Registry> SharedRegistry<R> {
    /// Wraps `registry`. A persistent registry keeps its entries across
    /// context transitions.
    pub fn new(registry: R, persistent: bool) -> Self {
        Self {
            inner: RwLock::new(registry),
            persistent: AtomicBool::new(persistent),
        }
    }

    /// Acquires shared access.
    pub fn read(&self) -> RwLockReadGuard<'_, R> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquires exclusive access.
    pub fn write(&self) -> RwLockWriteGuard<'_, R> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` if the registry survives context transitions.
    pub fn is_persistent(&self) -> bool {
        self.persistent.load(Ordering::Acquire)
    }

    /// Changes whether the registry survives context transitions.
    pub fn set_persistent(&self, persistent: bool) {
        self.persistent.store(persistent, Ordering::Release);
    }

    /// Called by the engine when the active scene or context is torn down.
    ///
    /// Persistent registries only drop dead entries; others are emptied.
    pub fn on_context_transition(&self) {
        let mut registry = self.write();
        if self.is_persistent() {
            let pruned = registry.prune();
            log::debug!(
                "{} kept across context transition ({} dead entries pruned).",
                registry.label(),
                pruned
            );
        } else {
            let count = registry.len();
            registry.clear();
            log::info!(
                "{} cleared {} entries on context transition.",
                registry.label(),
                count
            );
        }
    }

    /// Unwraps the registry.
    pub fn into_inner(self) -> R {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}
