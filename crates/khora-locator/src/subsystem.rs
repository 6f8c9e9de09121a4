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

//! Subsystem handles and the non-owning references registries keep to them.

use crate::capability::{CapabilityId, CapabilitySet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_SUBSYSTEM_ID: AtomicU64 = AtomicU64::new(1);

/// A process-unique identifier assigned to every [`Subsystem`] at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubsystemId(u64);

impl SubsystemId {
    fn next() -> Self {
        Self(NEXT_SUBSYSTEM_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubsystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node in the engine's subsystem hierarchy.
///
/// A subsystem exposes a set of capabilities and may own child subsystems.
/// Lookups that "narrow" to a capability search the node itself first and
/// then its descendants, depth-first.
///
/// The engine owns subsystems through `Arc<Subsystem>`. Registries only keep
/// [`SubsystemRef`]s, so dropping the last `Arc` retires the subsystem from
/// every registry at once.
pub struct Subsystem {
    id: SubsystemId,
    name: String,
    capabilities: CapabilitySet,
    children: Vec<Arc<Subsystem>>,
}

impl Subsystem {
    /// Starts building a subsystem with the given display name.
    pub fn builder(name: impl Into<String>) -> SubsystemBuilder {
        SubsystemBuilder {
            name: name.into(),
            capabilities: CapabilitySet::new(),
            children: Vec::new(),
        }
    }

    /// The identifier assigned at build time.
    pub fn id(&self) -> SubsystemId {
        self.id
    }

    /// The display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The capabilities exposed by this node, children excluded.
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// The direct children of this node.
    pub fn children(&self) -> &[Arc<Subsystem>] {
        &self.children
    }

    /// Returns the capability `T` exposed by this node itself.
    pub fn capability<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.capabilities.get::<T>()
    }

    /// Returns `true` if this node itself exposes `T`.
    pub fn provides<T: ?Sized + 'static>(&self) -> bool {
        self.capabilities.contains::<T>()
    }

    /// Searches this node, then its descendants in depth-first pre-order,
    /// for the first one exposing `T`.
    pub fn find_in_children<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.capability::<T>().or_else(|| {
            self.children
                .iter()
                .find_map(|child| child.find_in_children::<T>())
        })
    }

    /// Returns a non-owning reference to this subsystem.
    pub fn downgrade(this: &Arc<Self>) -> SubsystemRef {
        SubsystemRef {
            id: this.id,
            name: this.name.clone(),
            handle: Arc::downgrade(this),
        }
    }
}

impl fmt::Debug for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subsystem")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .field("children", &self.children.len())
            .finish()
    }
}

/// Builder for [`Subsystem`].
pub struct SubsystemBuilder {
    name: String,
    capabilities: CapabilitySet,
    children: Vec<Arc<Subsystem>>,
}

impl SubsystemBuilder {
    /// Exposes `capability` as `T`.
    ///
    /// The same object can be exposed under several capability types, for
    /// example once as `dyn AudioSystem` and once as its concrete type.
    pub fn provide<T>(mut self, capability: Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        if self.capabilities.insert(capability).is_some() {
            log::debug!(
                "Subsystem '{}' exposes {} twice; keeping the last one",
                self.name,
                CapabilityId::of::<T>()
            );
        }
        self
    }

    /// Attaches a child subsystem.
    pub fn child(mut self, child: Arc<Subsystem>) -> Self {
        self.children.push(child);
        self
    }

    /// Attaches several child subsystems, in order.
    pub fn children(mut self, children: impl IntoIterator<Item = Arc<Subsystem>>) -> Self {
        self.children.extend(children);
        self
    }

    /// Finishes the subsystem and assigns it a fresh [`SubsystemId`].
    pub fn build(self) -> Arc<Subsystem> {
        Arc::new(Subsystem {
            id: SubsystemId::next(),
            name: self.name,
            capabilities: self.capabilities,
            children: self.children,
        })
    }
}

/// A non-owning reference to a registered [`Subsystem`].
///
/// Identity is pointer identity: two references are the same if they point
/// at the same allocation, regardless of name or capabilities. The id and
/// name are cached so a dead reference can still be reported.
#[derive(Clone)]
pub struct SubsystemRef {
    id: SubsystemId,
    name: String,
    handle: Weak<Subsystem>,
}

impl SubsystemRef {
    /// The id of the referenced subsystem.
    pub fn id(&self) -> SubsystemId {
        self.id
    }

    /// The name of the referenced subsystem.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the subsystem if its owner still holds it.
    pub fn upgrade(&self) -> Option<Arc<Subsystem>> {
        self.handle.upgrade()
    }

    /// Returns `true` while the subsystem is alive.
    pub fn is_alive(&self) -> bool {
        self.handle.strong_count() > 0
    }

    /// Returns `true` if this reference points at `subsystem`.
    pub fn is(&self, subsystem: &Arc<Subsystem>) -> bool {
        // The weak count keeps the allocation reserved, so the address
        // cannot be reused while this reference exists.
        std::ptr::eq(self.handle.as_ptr(), Arc::as_ptr(subsystem))
    }
}

impl fmt::Debug for SubsystemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubsystemRef")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("alive", &self.is_alive())
            .finish()
    }
}
