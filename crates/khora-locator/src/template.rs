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

//! Named templates the [`SystemRegistry`](crate::SystemRegistry) is built from.
//!
//! A template plays the role of a prefab: it produces the registry's root
//! subsystem and the children attached under it. Those children are owned
//! by the registry and answer lookups that no runtime system matched.

use crate::subsystem::Subsystem;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Name of the template used when none is configured.
pub const DEFAULT_TEMPLATE: &str = "Service Locator";

/// The initial contents of a [`SystemRegistry`](crate::SystemRegistry).
#[derive(Debug, Clone)]
pub struct LocatorTemplate {
    /// Name given to the registry's root subsystem.
    pub name: String,
    /// Subsystems attached under the root.
    pub children: Vec<Arc<Subsystem>>,
}

impl LocatorTemplate {
    /// Creates an empty template.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Adds a child subsystem under the root.
    pub fn with_child(mut self, child: Arc<Subsystem>) -> Self {
        self.children.push(child);
        self
    }

    /// Builds the root subsystem described by this template.
    pub fn instantiate(self) -> Arc<Subsystem> {
        Subsystem::builder(self.name).children(self.children).build()
    }
}

/// Resolves template names to templates.
pub trait TemplateStore: Send + Sync {
    /// Produces a fresh template named `name`, or `None` if unknown.
    fn load(&self, name: &str) -> Option<LocatorTemplate>;
}

type TemplateFactory = Arc<dyn Fn() -> LocatorTemplate + Send + Sync>;

/// A [`TemplateStore`] backed by factory closures held in memory.
///
/// Each [`load`](TemplateStore::load) calls the factory again, so every
/// registry built from the store gets its own child subsystems.
#[derive(Default)]
pub struct InMemoryTemplateStore {
    factories: RwLock<HashMap<String, TemplateFactory>>,
}

impl InMemoryTemplateStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `name`, replacing any previous factory.
    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> LocatorTemplate + Send + Sync + 'static,
    {
        let name = name.into();
        let previous = self
            .factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), Arc::new(factory));
        if previous.is_some() {
            log::debug!("Template '{name}' replaced.");
        } else {
            log::debug!("Template '{name}' registered.");
        }
    }

    /// Returns `true` if a template named `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

impl TemplateStore for InMemoryTemplateStore {
    fn load(&self, name: &str) -> Option<LocatorTemplate> {
        // Clone the factory out so it runs without holding the lock.
        let factory = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()?;
        Some(factory())
    }
}

impl fmt::Debug for InMemoryTemplateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let factories = self.factories.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_set().entries(factories.keys()).finish()
    }
}

/// The process-wide template store used by
/// [`SystemRegistry::instance`](crate::SystemRegistry::instance).
pub fn global() -> &'static InMemoryTemplateStore {
    static STORE: OnceLock<InMemoryTemplateStore> = OnceLock::new();
    STORE.get_or_init(InMemoryTemplateStore::new)
}
