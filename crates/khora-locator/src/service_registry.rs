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

//! A type-keyed service locator with one subsystem per capability.
//!
//! The [`ServiceRegistry`] maps a capability type to the subsystem that
//! serves it. Registration is first come, first served: a second subsystem
//! for the same key is rejected with a warning and the original stays.
//!
//! # Design
//!
//! Lookups first find the owning subsystem by key, then narrow to the
//! requested capability on that subsystem or one of its descendants. The
//! registry never owns subsystems; it keeps [`SubsystemRef`]s and treats a
//! dropped subsystem as an empty slot.

use crate::capability::CapabilityId;
use crate::config::LocatorConfig;
use crate::error::{LocatorError, LocatorResult};
use crate::event::{emit, RegistryEvent};
use crate::registry::{Registry, SharedRegistry};
use crate::singleton::Singleton;
use crate::subsystem::{Subsystem, SubsystemRef};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

static INSTANCE: Singleton<SharedRegistry<ServiceRegistry>> = Singleton::new("ServiceRegistry");

struct ServiceEntry {
    capability: CapabilityId,
    service: SubsystemRef,
}

/// A service registry keyed by capability [`TypeId`].
///
/// # Example
///
/// ```rust
/// use khora_locator::{ServiceRegistry, Subsystem};
/// use std::sync::Arc;
///
/// trait AudioSystem: Send + Sync {
///     fn volume(&self) -> f32;
/// }
///
/// struct Mixer;
/// impl AudioSystem for Mixer {
///     fn volume(&self) -> f32 {
///         0.8
///     }
/// }
///
/// let audio = Subsystem::builder("Audio")
///     .provide::<dyn AudioSystem>(Arc::new(Mixer))
///     .build();
///
/// let mut registry = ServiceRegistry::new();
/// assert!(registry.register::<dyn AudioSystem>(&audio));
///
/// let svc = registry.get::<dyn AudioSystem>().unwrap();
/// assert_eq!(svc.volume(), 0.8);
/// ```
pub struct ServiceRegistry {
    services: HashMap<TypeId, ServiceEntry>,
    events: Option<flume::Sender<RegistryEvent>>,
    warn_on_missing: bool,
}

impl ServiceRegistry {
    /// Creates an empty service registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
            events: None,
            warn_on_missing: true,
        }
    }

    /// Applies the lookup settings from `config`.
    #[must_use]
    pub fn with_config(mut self, config: &LocatorConfig) -> Self {
        self.warn_on_missing = config.warn_on_missing;
        self
    }

    /// Reports every registration, rejection and miss to `events`.
    #[must_use]
    pub fn with_events(mut self, events: flume::Sender<RegistryEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Returns the global registry, creating an empty one on first access.
    ///
    /// The global registry is persistent across context transitions.
    pub fn instance() -> &'static SharedRegistry<ServiceRegistry> {
        INSTANCE.get_or_init(|| SharedRegistry::new(ServiceRegistry::new(), true))
    }

    /// Builds the global registry from `config` and installs it.
    ///
    /// Fails if the global registry already exists.
    pub fn bootstrap(
        config: &LocatorConfig,
    ) -> LocatorResult<&'static SharedRegistry<ServiceRegistry>> {
        Self::install(
            ServiceRegistry::new().with_config(config),
            config.persist_across_scenes,
        )
    }

    /// Installs `registry` as the global instance.
    ///
    /// Fails with [`LocatorError::DuplicateSingleton`] if the global instance
    /// already exists; the existing instance is kept and `registry` dropped.
    pub fn install(
        registry: ServiceRegistry,
        persistent: bool,
    ) -> LocatorResult<&'static SharedRegistry<ServiceRegistry>> {
        INSTANCE.install(SharedRegistry::new(registry, persistent))
    }

    /// Registers `service` under the capability key `K`.
    ///
    /// Returns `false` and logs a warning if a live subsystem is already
    /// registered for `K`; the existing entry is left untouched. An entry
    /// whose subsystem has been dropped is replaced.
    pub fn register<K>(&mut self, service: &Arc<Subsystem>) -> bool
    where
        K: ?Sized + Send + Sync + 'static,
    {
        let capability = CapabilityId::of::<K>();

        if let Some(existing) = self.services.get(&capability.type_id()) {
            if existing.service.is_alive() {
                log::warn!("{}", LocatorError::DuplicateRegistration { capability });
                emit(
                    self.events.as_ref(),
                    RegistryEvent::DuplicateRegistration {
                        subsystem: service.id(),
                        capability: Some(capability),
                    },
                );
                return false;
            }
            log::debug!(
                "Replacing dropped service '{}' registered for {}.",
                existing.service.name(),
                capability
            );
        }

        if service.find_in_children::<K>().is_none() {
            log::debug!(
                "Service '{}' registered for {} does not expose it yet.",
                service.name(),
                capability
            );
        }

        self.services.insert(
            capability.type_id(),
            ServiceEntry {
                capability,
                service: Subsystem::downgrade(service),
            },
        );
        log::info!("Registered service '{}' as {}.", service.name(), capability);
        emit(
            self.events.as_ref(),
            RegistryEvent::Registered {
                subsystem: service.id(),
                capability: Some(capability),
            },
        );
        true
    }

    /// Retrieves the capability `K` from the subsystem registered for `K`.
    ///
    /// Returns `None` and logs a warning if nothing is registered for `K`,
    /// the subsystem was dropped, or neither it nor its children expose `K`.
    #[must_use]
    pub fn get<K>(&self) -> Option<Arc<K>>
    where
        K: ?Sized + Send + Sync + 'static,
    {
        match self.try_get::<K>() {
            Ok(service) => Some(service),
            Err(err) => {
                if self.warn_on_missing {
                    log::warn!("{err}");
                } else {
                    log::debug!("{err}");
                }
                emit(
                    self.events.as_ref(),
                    RegistryEvent::CapabilityNotFound {
                        capability: CapabilityId::of::<K>(),
                    },
                );
                None
            }
        }
    }

    /// Like [`get`](Self::get), but returns the error instead of logging it.
    pub fn try_get<K>(&self) -> LocatorResult<Arc<K>>
    where
        K: ?Sized + Send + Sync + 'static,
    {
        self.subsystem::<K>()
            .and_then(|service| service.find_in_children::<K>())
            .ok_or(LocatorError::CapabilityNotFound {
                capability: CapabilityId::of::<K>(),
            })
    }

    /// Returns the live subsystem registered under `K`.
    #[must_use]
    pub fn subsystem<K: ?Sized + 'static>(&self) -> Option<Arc<Subsystem>> {
        self.services
            .get(&TypeId::of::<K>())
            .and_then(|entry| entry.service.upgrade())
    }

    /// Returns `true` if a live subsystem is registered under `K`.
    #[must_use]
    pub fn contains<K: ?Sized + 'static>(&self) -> bool {
        self.services
            .get(&TypeId::of::<K>())
            .is_some_and(|entry| entry.service.is_alive())
    }

    /// Returns the capability keys that currently have a live subsystem.
    pub fn capabilities(&self) -> impl Iterator<Item = CapabilityId> + '_ {
        self.services
            .values()
            .filter(|entry| entry.service.is_alive())
            .map(|entry| entry.capability)
    }

    /// Returns the number of entries, including dropped subsystems not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if no services are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field(
                "services",
                &self
                    .services
                    .values()
                    .map(|entry| (entry.capability, &entry.service))
                    .collect::<Vec<_>>(),
            )
            .field("warn_on_missing", &self.warn_on_missing)
            .finish()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry for ServiceRegistry {
    fn label(&self) -> &'static str {
        "ServiceRegistry"
    }

    fn len(&self) -> usize {
        self.services.len()
    }

    fn prune(&mut self) -> usize {
        let before = self.services.len();
        self.services.retain(|_, entry| entry.service.is_alive());
        let count = before - self.services.len();
        if count > 0 {
            log::debug!("ServiceRegistry pruned {count} dropped services.");
            emit(self.events.as_ref(), RegistryEvent::Pruned { count });
        }
        count
    }

    fn clear(&mut self) {
        self.services.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventBus;

    trait AudioSystem: Send + Sync {
        fn device(&self) -> &str;
    }

    trait SaveSystem: Send + Sync {}

    struct FakeAudio {
        name: String,
    }

    impl AudioSystem for FakeAudio {
        fn device(&self) -> &str {
            &self.name
        }
    }

    fn audio(name: &str) -> Arc<Subsystem> {
        Subsystem::builder(name)
            .provide::<dyn AudioSystem>(Arc::new(FakeAudio {
                name: name.to_string(),
            }))
            .build()
    }

    fn not_found_count(bus: &EventBus<RegistryEvent>) -> usize {
        bus.drain()
            .iter()
            .filter(|event| matches!(event, RegistryEvent::CapabilityNotFound { .. }))
            .count()
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ServiceRegistry::new();
        let a = audio("GPU-0");
        assert!(registry.register::<dyn AudioSystem>(&a));

        let retrieved = registry.get::<dyn AudioSystem>().unwrap();
        assert_eq!(retrieved.device(), "GPU-0");
        assert!(registry.contains::<dyn AudioSystem>());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_registration_keeps_original() {
        let bus = EventBus::new();
        let mut registry = ServiceRegistry::new().with_events(bus.sender());
        let a = audio("A");
        let b = audio("B");

        assert!(registry.register::<dyn AudioSystem>(&a));
        assert!(!registry.register::<dyn AudioSystem>(&b));

        assert!(Arc::ptr_eq(&registry.subsystem::<dyn AudioSystem>().unwrap(), &a));
        assert_eq!(registry.get::<dyn AudioSystem>().unwrap().device(), "A");
        assert_eq!(registry.len(), 1);

        let events = bus.drain();
        assert!(events.contains(&RegistryEvent::DuplicateRegistration {
            subsystem: b.id(),
            capability: Some(CapabilityId::of::<dyn AudioSystem>()),
        }));
    }

    #[test]
    fn test_get_missing_reports_once() {
        let bus = EventBus::new();
        let registry = ServiceRegistry::new().with_events(bus.sender());

        assert!(registry.get::<dyn AudioSystem>().is_none());
        assert_eq!(not_found_count(&bus), 1);
    }

    #[test]
    fn test_get_narrows_to_children() {
        let mut registry = ServiceRegistry::new();
        let root = Subsystem::builder("GameServices")
            .child(audio("Speakers"))
            .build();
        assert!(registry.register::<dyn AudioSystem>(&root));

        assert_eq!(registry.get::<dyn AudioSystem>().unwrap().device(), "Speakers");
    }

    #[test]
    fn test_registered_key_without_capability_is_not_found() {
        let bus = EventBus::new();
        let mut registry = ServiceRegistry::new().with_events(bus.sender());
        let save = Subsystem::builder("Save").build();
        assert!(registry.register::<dyn SaveSystem>(&save));
        bus.drain();

        assert!(registry.get::<dyn SaveSystem>().is_none());
        assert!(registry.contains::<dyn SaveSystem>());
        assert_eq!(not_found_count(&bus), 1);
    }

    #[test]
    fn test_dropped_service_is_not_returned() {
        let mut registry = ServiceRegistry::new();
        let a = audio("A");
        registry.register::<dyn AudioSystem>(&a);
        drop(a);

        assert!(registry.get::<dyn AudioSystem>().is_none());
        assert!(!registry.contains::<dyn AudioSystem>());
        assert_eq!(registry.capabilities().count(), 0);
    }

    #[test]
    fn test_dropped_entry_can_be_replaced() {
        let mut registry = ServiceRegistry::new();
        let a = audio("A");
        registry.register::<dyn AudioSystem>(&a);
        drop(a);

        let b = audio("B");
        assert!(registry.register::<dyn AudioSystem>(&b));
        assert_eq!(registry.get::<dyn AudioSystem>().unwrap().device(), "B");
    }

    #[test]
    fn test_prune_removes_dead_entries() {
        let bus = EventBus::new();
        let mut registry = ServiceRegistry::new().with_events(bus.sender());
        let a = audio("A");
        let save = Subsystem::builder("Save").build();
        registry.register::<dyn AudioSystem>(&a);
        registry.register::<dyn SaveSystem>(&save);
        drop(a);

        assert_eq!(registry.prune(), 1);
        assert_eq!(registry.len(), 1);
        assert!(bus.drain().contains(&RegistryEvent::Pruned { count: 1 }));
    }

    #[test]
    fn test_try_get_does_not_report() {
        let bus = EventBus::new();
        let registry = ServiceRegistry::new().with_events(bus.sender());

        let err = registry.try_get::<dyn AudioSystem>().err().unwrap();
        assert_eq!(
            err,
            LocatorError::CapabilityNotFound {
                capability: CapabilityId::of::<dyn AudioSystem>()
            }
        );
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn test_quiet_config_still_publishes_events() {
        let bus = EventBus::new();
        let config = LocatorConfig {
            warn_on_missing: false,
            ..LocatorConfig::default()
        };
        let registry = ServiceRegistry::new()
            .with_config(&config)
            .with_events(bus.sender());

        assert!(registry.get::<dyn AudioSystem>().is_none());
        assert_eq!(not_found_count(&bus), 1);
    }

    #[test]
    fn test_non_persistent_shared_registry_clears_on_transition() {
        let shared = SharedRegistry::new(ServiceRegistry::new(), false);
        let a = audio("A");
        shared.write().register::<dyn AudioSystem>(&a);

        shared.on_context_transition();
        assert!(shared.read().is_empty());
    }

    #[test]
    fn test_persistent_shared_registry_survives_transition() {
        let shared = SharedRegistry::new(ServiceRegistry::new(), true);
        let a = audio("A");
        let gone = Subsystem::builder("Save").build();
        shared.write().register::<dyn AudioSystem>(&a);
        shared.write().register::<dyn SaveSystem>(&gone);
        drop(gone);

        shared.on_context_transition();
        let registry = shared.read();
        assert_eq!(registry.len(), 1);
        assert!(registry.get::<dyn AudioSystem>().is_some());
    }

    #[test]
    fn test_default_is_empty() {
        let registry = ServiceRegistry::default();
        assert!(registry.is_empty());
    }
}
