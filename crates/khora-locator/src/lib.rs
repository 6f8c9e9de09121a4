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

//! # Khora Locator
//!
//! A typed service locator for engine subsystems. Engine objects fetch the
//! audio, input or save system they need by capability type instead of
//! holding direct references to each other.
//!
//! Two registries are provided:
//!
//! - [`ServiceRegistry`]: one handle per capability key, duplicates rejected.
//! - [`SystemRegistry`]: an ordered list of runtime systems where the last
//!   match wins, with a fallback search through the registry's own children.
//!
//! Both can be passed around explicitly or reached through their global
//! [`instance`](ServiceRegistry::instance) accessors.

#![warn(missing_docs)]

pub mod capability;
pub mod config;
pub mod error;
pub mod event;
pub mod registry;
pub mod service_registry;
pub mod singleton;
pub mod subsystem;
pub mod system_registry;
pub mod template;

pub use capability::{CapabilityId, CapabilitySet};
pub use config::LocatorConfig;
pub use error::{LocatorError, LocatorResult};
pub use event::{EventBus, RegistryEvent};
pub use registry::{Registry, SharedRegistry};
pub use service_registry::ServiceRegistry;
pub use singleton::{LifecycleState, Singleton};
pub use subsystem::{Subsystem, SubsystemBuilder, SubsystemId, SubsystemRef};
pub use system_registry::SystemRegistry;
pub use template::{InMemoryTemplateStore, LocatorTemplate, TemplateStore, DEFAULT_TEMPLATE};
