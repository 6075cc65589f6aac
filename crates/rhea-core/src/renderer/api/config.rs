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

//! Named configuration options discovered at startup.
//!
//! Options are read once before the first context is created. After that the
//! set is frozen and every change is rejected.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::renderer::error::ConfigError;

/// A single named option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigOption {
    /// The option name, e.g. `"Orientation"`.
    pub name: String,
    /// Accepted values. Empty means any value is accepted.
    pub possible_values: Vec<String>,
    /// The current value.
    pub current_value: String,
    /// Immutable options cannot be changed even before freezing.
    pub immutable: bool,
}

impl ConfigOption {
    /// Creates an option.
    pub fn new(name: &str, possible_values: &[&str], current_value: &str, immutable: bool) -> Self {
        Self {
            name: name.to_string(),
            possible_values: possible_values.iter().map(|v| v.to_string()).collect(),
            current_value: current_value.to_string(),
            immutable,
        }
    }

    /// Returns `true` if `value` is acceptable for this option.
    pub fn accepts(&self, value: &str) -> bool {
        self.possible_values.is_empty() || self.possible_values.iter().any(|v| v == value)
    }
}

/// Options keyed by name, in name order.
pub type ConfigOptionMap = BTreeMap<String, ConfigOption>;

/// The option set published by a display support layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigOptions {
    options: ConfigOptionMap,
    #[serde(default)]
    frozen: bool,
}

impl ConfigOptions {
    /// Creates an empty, unfrozen set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an option definition.
    pub fn insert(&mut self, option: ConfigOption) {
        self.options.insert(option.name.clone(), option);
    }

    /// Looks up an option.
    pub fn get(&self, name: &str) -> Option<&ConfigOption> {
        self.options.get(name)
    }

    /// Returns the current value of an option.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(|o| o.current_value.as_str())
    }

    /// Changes an option's current value.
    ///
    /// ## Errors
    /// [`ConfigError::Frozen`] once the set is frozen,
    /// [`ConfigError::UnknownOption`] for an unknown name,
    /// [`ConfigError::Immutable`] for an immutable option and
    /// [`ConfigError::InvalidValue`] for a value outside the possible values.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        if self.frozen {
            return Err(ConfigError::Frozen(name.to_string()));
        }
        let option = self
            .options
            .get_mut(name)
            .ok_or_else(|| ConfigError::UnknownOption(name.to_string()))?;
        if option.immutable {
            return Err(ConfigError::Immutable(name.to_string()));
        }
        if !option.accepts(value) {
            return Err(ConfigError::InvalidValue {
                name: name.to_string(),
                value: value.to_string(),
            });
        }
        log::debug!("Config option '{name}' set to '{value}'.");
        option.current_value = value.to_string();
        Ok(())
    }

    /// Freezes the set. Idempotent.
    pub fn freeze(&mut self) {
        if !self.frozen {
            log::debug!("Config options frozen ({} options).", self.options.len());
        }
        self.frozen = true;
    }

    /// Returns `true` once the set has been frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Iterates over all options in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ConfigOption> {
        self.options.values()
    }

    /// Returns the underlying map.
    pub fn as_map(&self) -> &ConfigOptionMap {
        &self.options
    }

    /// Serializes the options as pretty-printed JSON for diagnostics.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConfigOptions {
        let mut options = ConfigOptions::new();
        options.insert(ConfigOption::new(
            "Orientation",
            &["Landscape", "Portrait"],
            "Landscape",
            false,
        ));
        options.insert(ConfigOption::new("Video Mode", &["1280 x 800"], "1280 x 800", true));
        options
    }

    #[test]
    fn set_validates_value() {
        let mut options = sample();
        assert!(options.set("Orientation", "Portrait").is_ok());
        assert_eq!(options.value("Orientation"), Some("Portrait"));
        assert_eq!(
            options.set("Orientation", "Sideways"),
            Err(ConfigError::InvalidValue {
                name: "Orientation".to_string(),
                value: "Sideways".to_string()
            })
        );
        assert_eq!(
            options.set("Video Mode", "1280 x 800"),
            Err(ConfigError::Immutable("Video Mode".to_string()))
        );
        assert_eq!(
            options.set("Colour Depth", "32"),
            Err(ConfigError::UnknownOption("Colour Depth".to_string()))
        );
    }

    #[test]
    fn frozen_options_reject_changes() {
        let mut options = sample();
        options.freeze();
        assert!(options.is_frozen());
        assert_eq!(
            options.set("Orientation", "Portrait"),
            Err(ConfigError::Frozen("Orientation".to_string()))
        );
        assert_eq!(options.value("Orientation"), Some("Landscape"));
    }

    #[test]
    fn json_dump_contains_options() {
        let json = sample().to_json().expect("options serialize");
        let parsed: ConfigOptionMap = serde_json::from_str(&json).expect("dump parses back");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["Orientation"].current_value, "Landscape");
    }
}
