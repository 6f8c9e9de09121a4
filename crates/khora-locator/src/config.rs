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

//! Locator configuration, stored as RON next to the project's other assets.

use crate::template::DEFAULT_TEMPLATE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings applied when bootstrapping the global registries.
///
/// Every field has a default, so a partial file is valid:
///
/// ```rust
/// use khora_locator::LocatorConfig;
///
/// let config = LocatorConfig::from_ron_str("(warn_on_missing: false)").unwrap();
/// assert!(!config.warn_on_missing);
/// assert_eq!(config.template, "Service Locator");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Name of the template the [`SystemRegistry`](crate::SystemRegistry) is built from.
    pub template: String,
    /// Whether the global registries keep their entries across context transitions.
    pub persist_across_scenes: bool,
    /// Log missed lookups at `warn` level. When `false` they are logged at `debug`.
    pub warn_on_missing: bool,
    /// `env_logger` filter used by binaries that bootstrap the locator.
    pub log_filter: String,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            persist_across_scenes: true,
            warn_on_missing: true,
            log_filter: "info".to_string(),
        }
    }
}

impl LocatorConfig {
    /// Parses a configuration from RON text.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        ron::from_str(source).context("Failed to parse locator configuration")
    }

    /// Loads a configuration from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read locator config '{}'", path.display()))?;
        let config = Self::from_ron_str(&source)
            .with_context(|| format!("Invalid locator config '{}'", path.display()))?;
        log::debug!("Loaded locator config from '{}'.", path.display());
        Ok(config)
    }

    /// Serializes the configuration as pretty-printed RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .context("Failed to serialize locator configuration")
    }
}
