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

//! Error types reported by the registries.
//!
//! None of these are fatal. The boolean and `Option` returning APIs log them
//! and carry on; the `try_*` variants hand them back to the caller.

use crate::capability::CapabilityId;
use std::fmt;

/// A specialized `Result` type for locator operations.
pub type LocatorResult<T> = Result<T, LocatorError>;

/// An error that can occur while registering or looking up subsystems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorError {
    /// A live handle is already registered for this capability.
    DuplicateRegistration {
        /// The capability key that was already taken.
        capability: CapabilityId,
    },
    /// No registered handle or child subsystem exposes this capability.
    CapabilityNotFound {
        /// The capability that was requested.
        capability: CapabilityId,
    },
    /// A second instance of a singleton was constructed and discarded.
    DuplicateSingleton {
        /// The label of the singleton.
        label: &'static str,
    },
    /// The template store has no template with this name.
    TemplateNotFound {
        /// The requested template name.
        name: String,
    },
}

impl fmt::Display for LocatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocatorError::DuplicateRegistration { capability } => {
                write!(f, "Service of type {capability} is already registered.")
            }
            LocatorError::CapabilityNotFound { capability } => {
                write!(f, "Service of type {capability} not found.")
            }
            LocatorError::DuplicateSingleton { label } => {
                write!(f, "Duplicate {label} was found and discarded.")
            }
            LocatorError::TemplateNotFound { name } => {
                write!(f, "Locator template '{name}' not found.")
            }
        }
    }
}

impl std::error::Error for LocatorError {}

#[cfg(test)]
mod tests {
    use super::*;

    struct AudioSystem;

    #[test]
    fn test_display_names_the_type() {
        let err = LocatorError::CapabilityNotFound {
            capability: CapabilityId::of::<AudioSystem>(),
        };
        assert_eq!(err.to_string(), "Service of type AudioSystem not found.");

        let err = LocatorError::DuplicateRegistration {
            capability: CapabilityId::of::<AudioSystem>(),
        };
        assert_eq!(
            err.to_string(),
            "Service of type AudioSystem is already registered."
        );
    }

    #[test]
    fn test_display_names_bounded_trait_object() {
        trait SaveSystem: Send + Sync {}

        let err = LocatorError::CapabilityNotFound {
            capability: CapabilityId::of::<dyn SaveSystem + Send + Sync>(),
        };
        assert_eq!(err.to_string(), "Service of type SaveSystem not found.");
    }

    #[test]
    fn test_converts_into_anyhow() {
        let err: anyhow::Error = LocatorError::TemplateNotFound {
            name: "Service Locator".to_string(),
        }
        .into();
        assert!(err.to_string().contains("Service Locator"));
    }
}
