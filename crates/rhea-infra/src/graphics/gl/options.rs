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

//! Names and defaults of the options shared by every EGL display.

use rhea_core::renderer::{ConfigOption, ConfigOptions};

/// `Yes` / `No`: cover the whole display.
pub const FULL_SCREEN: &str = "Full Screen";
/// One of the display's video modes, e.g. `1280 x 800`.
pub const VIDEO_MODE: &str = "Video Mode";
/// `Yes` / `No`: wait for vertical sync when presenting.
pub const VSYNC: &str = "VSync";
/// Multisample count, `0` disables multisampling.
pub const FSAA: &str = "FSAA";
/// `Yes` / `No`: expose fixed-function features when the driver has them.
pub const FIXED_PIPELINE_ENABLED: &str = "Fixed Pipeline Enabled";

const YES_NO: [&str; 2] = ["Yes", "No"];

/// Builds the base option set for a display offering `video_modes`.
///
/// The first mode is the default. `Video Mode` is immutable when only one
/// mode exists.
pub fn base_config_options(video_modes: &[String]) -> ConfigOptions {
    let modes: Vec<&str> = video_modes.iter().map(String::as_str).collect();
    let mut options = ConfigOptions::new();
    options.insert(ConfigOption::new(FULL_SCREEN, &YES_NO, "Yes", false));
    options.insert(ConfigOption::new(
        VIDEO_MODE,
        &modes,
        modes.first().copied().unwrap_or_default(),
        modes.len() <= 1,
    ));
    options.insert(ConfigOption::new(VSYNC, &YES_NO, "Yes", false));
    options.insert(ConfigOption::new(FSAA, &["0", "2", "4"], "0", false));
    options.insert(ConfigOption::new(
        FIXED_PIPELINE_ENABLED,
        &YES_NO,
        "Yes",
        false,
    ));
    options
}

/// Reads a `Yes` / `No` option. Missing options read as `default`.
pub fn flag(options: &ConfigOptions, name: &str, default: bool) -> bool {
    match options.value(name) {
        Some("Yes") => true,
        Some("No") => false,
        _ => default,
    }
}

/// The multisample count requested through `FSAA`.
pub fn fsaa_samples(options: &ConfigOptions) -> u32 {
    options
        .value(FSAA)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_mode_is_immutable() {
        let options = base_config_options(&["1280 x 800".to_string()]);
        assert_eq!(options.value(VIDEO_MODE), Some("1280 x 800"));
        assert!(options.get(VIDEO_MODE).is_some_and(|o| o.immutable));
        assert!(flag(&options, FIXED_PIPELINE_ENABLED, false));
        assert_eq!(fsaa_samples(&options), 0);
    }

    #[test]
    fn flags_fall_back_to_default() {
        let mut options = base_config_options(&[]);
        options.set(FSAA, "4").expect("4 is a valid sample count");
        options.set(FIXED_PIPELINE_ENABLED, "No").expect("valid flag");
        assert_eq!(fsaa_samples(&options), 4);
        assert!(!flag(&options, FIXED_PIPELINE_ENABLED, true));
        assert!(flag(&options, "Missing", true));
    }
}
