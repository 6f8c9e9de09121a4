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

//! An open-ended list of runtime systems with capability lookup.
//!
//! Systems are appended as they come online and removed when they shut
//! down. A lookup scans the list and returns the *last* system exposing the
//! requested capability, so a later registration shadows an earlier one.
//! When no runtime system matches, the registry falls back to searching its
//! own root subsystem and the children the template attached to it.

use crate::capability::CapabilityId;
use crate::config::LocatorConfig;
use crate::error::{LocatorError, LocatorResult};
use crate::event::{emit, RegistryEvent};
use crate::registry::{Registry, SharedRegistry};
use crate::singleton::Singleton;
use crate::subsystem::{Subsystem, SubsystemRef};
use crate::template::{self, TemplateStore, DEFAULT_TEMPLATE};
use std::fmt;
use std::sync::Arc;

static INSTANCE: Singleton<SharedRegistry<SystemRegistry>> = Singleton::new("SystemRegistry");

/// A registry of runtime systems searched linearly, last match wins.
pub struct SystemRegistry {
    root: Arc<Subsystem>,
    systems: Vec<SubsystemRef>,
    events: Option<flume::Sender<RegistryEvent>>,
    warn_on_missing: bool,
}

impl SystemRegistry {
    /// Creates a registry with an empty root and no runtime systems.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root(Subsystem::builder(DEFAULT_TEMPLATE).build())
    }

    /// Creates a registry around an existing root subsystem.
    #[must_use]
    pub fn with_root(root: Arc<Subsystem>) -> Self {
        Self {
            root,
            systems: Vec::new(),
            events: None,
            warn_on_missing: true,
        }
    }

    /// Builds a registry from the template `name` in `store`.
    pub fn from_template(store: &dyn TemplateStore, name: &str) -> LocatorResult<Self> {
        let template = store.load(name).ok_or_else(|| LocatorError::TemplateNotFound {
            name: name.to_string(),
        })?;
        let root = template.instantiate();
        log::debug!(
            "SystemRegistry built from template '{}' with {} children.",
            name,
            root.children().len()
        );
        Ok(Self::with_root(root))
    }

    /// Applies the lookup settings from `config`.
    #[must_use]
    pub fn with_config(mut self, config: &LocatorConfig) -> Self {
        self.warn_on_missing = config.warn_on_missing;
        self
    }

    /// Reports every registration, removal and miss to `events`.
    #[must_use]
    pub fn with_events(mut self, events: flume::Sender<RegistryEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Returns the global registry, building it on first access from the
    /// default template of the global template store.
    ///
    /// If that template is missing the error is logged and the registry
    /// starts with an empty root. The global registry is persistent across
    /// context transitions.
    pub fn instance() -> &'static SharedRegistry<SystemRegistry> {
        INSTANCE.get_or_init(|| {
            let registry = Self::from_template(template::global(), DEFAULT_TEMPLATE)
                .unwrap_or_else(|err| {
                    log::error!("{err} Starting SystemRegistry with an empty root.");
                    Self::new()
                });
            SharedRegistry::new(registry, true)
        })
    }

    /// Builds the global registry from `config` and the global template
    /// store, then installs it.
    ///
    /// Fails if the template is missing or the global registry already exists.
    pub fn bootstrap(
        config: &LocatorConfig,
    ) -> LocatorResult<&'static SharedRegistry<SystemRegistry>> {
        let registry =
            Self::from_template(template::global(), &config.template)?.with_config(config);
        Self::install(registry, config.persist_across_scenes)
    }

    /// Installs `registry` as the global instance.
    ///
    /// Fails with [`LocatorError::DuplicateSingleton`] if the global instance
    /// already exists; the existing instance is kept and `registry` dropped.
    pub fn install(
        registry: SystemRegistry,
        persistent: bool,
    ) -> LocatorResult<&'static SharedRegistry<SystemRegistry>> {
        INSTANCE.install(SharedRegistry::new(registry, persistent))
    }

    /// The root subsystem whose children answer unmatched lookups.
    pub fn root(&self) -> &Arc<Subsystem> {
        &self.root
    }

    /// Appends `system` unless that exact subsystem is already registered.
    ///
    /// Identity is by pointer; distinct subsystems exposing the same
    /// capability are all kept.
    pub fn add(&mut self, system: &Arc<Subsystem>) -> bool {
        if self.systems.iter().any(|entry| entry.is(system)) {
            log::debug!("Runtime system '{}' is already registered.", system.name());
            emit(
                self.events.as_ref(),
                RegistryEvent::DuplicateRegistration {
                    subsystem: system.id(),
                    capability: None,
                },
            );
            return false;
        }

        self.systems.push(Subsystem::downgrade(system));
        log::debug!("Added runtime system '{}' ({}).", system.name(), system.id());
        emit(
            self.events.as_ref(),
            RegistryEvent::Registered {
                subsystem: system.id(),
                capability: None,
            },
        );
        true
    }

    /// Removes the first entry that is `system`. Returns whether one was removed.
    pub fn remove(&mut self, system: &Arc<Subsystem>) -> bool {
        let Some(index) = self.systems.iter().position(|entry| entry.is(system)) else {
            return false;
        };

        self.systems.remove(index);
        log::debug!("Removed runtime system '{}' ({}).", system.name(), system.id());
        emit(
            self.events.as_ref(),
            RegistryEvent::Unregistered {
                subsystem: system.id(),
            },
        );
        true
    }

    /// Returns `true` if `system` is registered.
    #[must_use]
    pub fn contains(&self, system: &Arc<Subsystem>) -> bool {
        self.systems.iter().any(|entry| entry.is(system))
    }

    /// Retrieves the capability `T`.
    ///
    /// Returns it from the last runtime system exposing `T`, otherwise from
    /// the root or its descendants. Returns `None` and logs a warning if
    /// neither has it.
    #[must_use]
    pub fn get<T>(&self) -> Option<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        match self.try_get::<T>() {
            Ok(system) => Some(system),
            Err(err) => {
                if self.warn_on_missing {
                    log::warn!("{err}");
                } else {
                    log::debug!("{err}");
                }
                emit(
                    self.events.as_ref(),
                    RegistryEvent::CapabilityNotFound {
                        capability: CapabilityId::of::<T>(),
                    },
                );
                None
            }
        }
    }

    /// Like [`get`](Self::get), but returns the error instead of logging it.
    pub fn try_get<T>(&self) -> LocatorResult<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.systems
            .iter()
            .rev()
            .filter_map(SubsystemRef::upgrade)
            .find_map(|system| system.capability::<T>())
            .or_else(|| self.root.find_in_children::<T>())
            .ok_or(LocatorError::CapabilityNotFound {
                capability: CapabilityId::of::<T>(),
            })
    }

    /// Returns the live runtime systems in registration order.
    pub fn systems(&self) -> impl Iterator<Item = Arc<Subsystem>> + '_ {
        self.systems.iter().filter_map(SubsystemRef::upgrade)
    }

    /// Returns the number of runtime systems, including dropped ones not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Returns `true` if no runtime systems are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

impl fmt::Debug for SystemRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemRegistry")
            .field("root", &self.root.name())
            .field("systems", &self.systems)
            .field("warn_on_missing", &self.warn_on_missing)
            .finish()
    }
}

impl Default for SystemRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry for SystemRegistry {
    fn label(&self) -> &'static str {
        "SystemRegistry"
    }

    fn len(&self) -> usize {
        self.systems.len()
    }

    fn prune(&mut self) -> usize {
        let before = self.systems.len();
        self.systems.retain(SubsystemRef::is_alive);
        let count = before - self.systems.len();
        if count > 0 {
            log::debug!("SystemRegistry pruned {count} dropped systems.");
            emit(self.events.as_ref(), RegistryEvent::Pruned { count });
        }
        count
    }

    fn clear(&mut self) {
        self.systems.clear();
    }
}
