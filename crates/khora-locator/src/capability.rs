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

//! Capability identifiers and the type-map that stores them.
//!
//! A capability is any `'static` type a subsystem can hand out, most often a
//! trait object such as `dyn AudioSystem`. Each capability is stored as an
//! `Arc<T>` behind a [`TypeId`] key and recovered by downcasting.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Identifies a capability type at runtime.
///
/// Equality and hashing only look at the [`TypeId`]; the type name is kept
/// for log messages.
#[derive(Clone, Copy)]
pub struct CapabilityId {
    type_id: TypeId,
    name: &'static str,
}

impl CapabilityId {
    /// Returns the identifier of the capability type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// The underlying [`TypeId`].
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The fully qualified type name, e.g. `dyn my_game::audio::AudioSystem`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The type name without its module path, e.g. `AudioSystem`.
    ///
    /// Marker bounds on a trait object are dropped, so
    /// `dyn AudioSystem + Send + Sync` is reported as `AudioSystem`.
    pub fn short_name(&self) -> &'static str {
        let bare = self.name.strip_prefix("dyn ").unwrap_or(self.name);
        let bare = &bare[..principal_end(bare)];
        match bare.find('<') {
            // Keep generic arguments intact, only trim the outer path.
            Some(generic_start) => {
                let (path, _) = bare.split_at(generic_start);
                let start = path.rfind("::").map_or(0, |i| i + 2);
                &bare[start..]
            }
            None => bare.rsplit("::").next().unwrap_or(bare),
        }
    }
}

/// Byte offset of the first ` + ` outside generic arguments, or the length.
fn principal_end(name: &str) -> usize {
    let mut depth = 0usize;
    for (i, c) in name.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            '+' if depth == 0 && name[..i].ends_with(' ') => return i - 1,
            _ => {}
        }
    }
    name.len()
}

impl PartialEq for CapabilityId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for CapabilityId {}

impl std::hash::Hash for CapabilityId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CapabilityId({})", self.name)
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

struct CapabilityEntry {
    id: CapabilityId,
    // Always an `Arc<T>` where `TypeId::of::<T>() == id.type_id()`.
    value: Box<dyn Any + Send + Sync>,
}

/// The set of capabilities exposed by a single subsystem.
///
/// Stores at most one `Arc<T>` per capability type.
///
/// # Example
///
/// ```rust
/// use khora_locator::CapabilitySet;
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String {
///         "hello".to_string()
///     }
/// }
///
/// let mut set = CapabilitySet::new();
/// set.insert::<dyn Greeter>(Arc::new(English));
///
/// let greeter = set.get::<dyn Greeter>().unwrap();
/// assert_eq!(greeter.greet(), "hello");
/// ```
#[derive(Default)]
pub struct CapabilitySet {
    entries: HashMap<TypeId, CapabilityEntry>,
}

impl CapabilitySet {
    /// Creates an empty capability set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Inserts a capability, keyed by `T`'s [`TypeId`].
    ///
    /// Returns the capability previously stored for `T`, if any.
    pub fn insert<T>(&mut self, capability: Arc<T>) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let id = CapabilityId::of::<T>();
        self.entries
            .insert(
                id.type_id(),
                CapabilityEntry {
                    id,
                    value: Box::new(capability),
                },
            )
            .and_then(|previous| previous.value.downcast::<Arc<T>>().ok())
            .map(|boxed| *boxed)
    }

    /// Returns a new reference to the capability of type `T`, if present.
    #[must_use]
    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.value.downcast_ref::<Arc<T>>())
            .cloned()
    }

    /// Returns `true` if a capability of type `T` is present.
    #[must_use]
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    /// Returns the identifiers of every stored capability, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = CapabilityId> + '_ {
        self.entries.values().map(|entry| entry.id)
    }

    /// Returns the number of stored capabilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no capabilities are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.ids().map(|id| id.name())).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Audio: Send + Sync {
        fn volume(&self) -> f32;
    }

    struct FakeAudio {
        volume: f32,
    }

    impl Audio for FakeAudio {
        fn volume(&self) -> f32 {
            self.volume
        }
    }

    struct FakeClock {
        ticks: u64,
    }

    #[test]
    fn test_insert_and_get_trait_object() {
        let mut set = CapabilitySet::new();
        set.insert::<dyn Audio>(Arc::new(FakeAudio { volume: 0.5 }));

        let audio = set.get::<dyn Audio>().unwrap();
        assert_eq!(audio.volume(), 0.5);
        assert!(set.contains::<dyn Audio>());
        assert!(!set.contains::<FakeAudio>());
    }

    #[test]
    fn test_concrete_and_trait_object_are_distinct_keys() {
        let mut set = CapabilitySet::new();
        let audio = Arc::new(FakeAudio { volume: 1.0 });
        set.insert::<FakeAudio>(audio.clone());
        set.insert::<dyn Audio>(audio);

        assert_eq!(set.len(), 2);
        assert!(set.get::<FakeAudio>().is_some());
        assert!(set.get::<dyn Audio>().is_some());
    }

    #[test]
    fn test_insert_returns_previous() {
        let mut set = CapabilitySet::new();
        assert!(set.insert(Arc::new(FakeClock { ticks: 1 })).is_none());

        let previous = set.insert(Arc::new(FakeClock { ticks: 2 })).unwrap();
        assert_eq!(previous.ticks, 1);
        assert_eq!(set.get::<FakeClock>().unwrap().ticks, 2);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_get_missing_returns_none() {
        let set = CapabilitySet::default();
        assert!(set.is_empty());
        assert!(set.get::<dyn Audio>().is_none());
    }

    #[test]
    fn test_short_name_strips_module_path() {
        assert_eq!(CapabilityId::of::<FakeClock>().short_name(), "FakeClock");
        assert_eq!(CapabilityId::of::<dyn Audio>().short_name(), "Audio");
        assert_eq!(
            CapabilityId::of::<Vec<FakeClock>>().short_name(),
            format!("Vec<{}>", type_name::<FakeClock>())
        );
    }

    #[test]
    fn test_short_name_drops_marker_bounds() {
        let bounded = CapabilityId::of::<dyn Audio + Send + Sync>();
        assert_eq!(bounded.short_name(), "Audio");
        assert_eq!(bounded.to_string(), "Audio");

        // Bounds inside generic arguments are part of the name.
        let boxed = CapabilityId::of::<Vec<Box<dyn Audio + Send>>>();
        assert!(boxed.short_name().starts_with("Vec<"));
        assert!(boxed.short_name().ends_with("Send>>"));
    }

    #[test]
    fn test_ids_equal_by_type() {
        assert_eq!(CapabilityId::of::<dyn Audio>(), CapabilityId::of::<dyn Audio>());
        assert_ne!(CapabilityId::of::<dyn Audio>(), CapabilityId::of::<FakeAudio>());
    }
}
