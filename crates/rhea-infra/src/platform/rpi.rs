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

//! Display support for the Raspberry Pi (VideoCore IV, EGL on the
//! framebuffer).
//!
//! The board exposes a single fixed video mode. Display bring-up itself
//! (`bcm_host`, dispmanx) happens in the context provider; this module only
//! publishes the options an application may choose from and turns them into
//! window descriptors.

use std::fmt;

use anyhow::{bail, Context as _};
use rhea_core::renderer::{ConfigOption, ConfigOptions, RenderTargetDesc};

use crate::graphics::gl::options::{self, FULL_SCREEN, VIDEO_MODE};
use crate::graphics::gl::{ContextProvider, GlDriver, GlRenderSystem};

/// Name of the orientation option.
pub const ORIENTATION: &str = "Orientation";

/// A display resolution and refresh rate. A refresh rate of `0` means the
/// display does not report one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VideoMode {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Refresh rate in Hz.
    pub refresh_rate: u16,
}

impl fmt::Display for VideoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {}", self.width, self.height)
    }
}

/// How the display is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Wider than tall.
    #[default]
    Landscape,
    /// Taller than wide.
    Portrait,
}

/// Parses a video mode written as `"<width> x <height>"`, optionally
/// followed by `"@ <rate>"` (e.g. `"1280 x 800 @ 60"`).
pub fn parse_video_mode(text: &str) -> anyhow::Result<VideoMode> {
    let (size, rate) = match text.split_once('@') {
        Some((size, rate)) => (size, Some(rate.trim())),
        None => (text, None),
    };
    let Some((width, height)) = size.split_once('x') else {
        bail!("video mode '{text}' is not of the form '<width> x <height>'");
    };
    let width: u32 = width
        .trim()
        .parse()
        .with_context(|| format!("invalid width in video mode '{text}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .with_context(|| format!("invalid height in video mode '{text}'"))?;
    if width == 0 || height == 0 {
        bail!("video mode '{text}' has a zero dimension");
    }
    let refresh_rate = match rate {
        Some(rate) => rate
            .trim_end_matches("Hz")
            .trim()
            .parse()
            .with_context(|| format!("invalid refresh rate in video mode '{text}'"))?,
        None => 0,
    };
    Ok(VideoMode {
        width,
        height,
        refresh_rate,
    })
}

/// The Raspberry Pi display: one fixed `1280 x 800` mode.
#[derive(Debug, Clone)]
pub struct RpiDisplaySupport {
    video_modes: Vec<VideoMode>,
    original_mode: VideoMode,
    current_mode: VideoMode,
}

impl Default for RpiDisplaySupport {
    fn default() -> Self {
        Self::new()
    }
}

impl RpiDisplaySupport {
    /// Creates the display support with its fixed mode current.
    pub fn new() -> Self {
        let mode = VideoMode {
            width: 1280,
            height: 800,
            refresh_rate: 0,
        };
        log::info!("Raspberry Pi display support: {mode} mode.");
        Self {
            video_modes: vec![mode],
            original_mode: mode,
            current_mode: mode,
        }
    }

    /// The modes the display offers.
    pub fn video_modes(&self) -> &[VideoMode] {
        &self.video_modes
    }

    /// The mode the display had at start-up.
    pub fn original_mode(&self) -> VideoMode {
        self.original_mode
    }

    /// The current mode.
    pub fn current_mode(&self) -> VideoMode {
        self.current_mode
    }

    /// Mode switching is not supported on this display; the request is
    /// ignored.
    pub fn switch_mode(&mut self, mode: VideoMode) {
        log::debug!("Ignoring switch to {mode}; the display mode is fixed.");
    }

    /// The base EGL options plus `Orientation`.
    pub fn config_options(&self) -> ConfigOptions {
        let modes: Vec<String> = self.video_modes.iter().map(ToString::to_string).collect();
        let mut options = options::base_config_options(&modes);
        options.insert(ConfigOption::new(
            ORIENTATION,
            &["Landscape", "Portrait"],
            "Landscape",
            false,
        ));
        options
    }

    /// Reads the orientation out of an option set.
    pub fn orientation(options: &ConfigOptions) -> Orientation {
        match options.value(ORIENTATION) {
            Some("Portrait") => Orientation::Portrait,
            _ => Orientation::Landscape,
        }
    }

    /// Builds the descriptor of a window matching the chosen options.
    ///
    /// Portrait orientation swaps width and height.
    pub fn window_desc(
        &self,
        name: &str,
        options: &ConfigOptions,
    ) -> anyhow::Result<RenderTargetDesc> {
        let mode = match options.value(VIDEO_MODE) {
            Some(text) if !text.is_empty() => parse_video_mode(text)?,
            _ => self.current_mode,
        };
        let (width, height) = match Self::orientation(options) {
            Orientation::Landscape => (mode.width, mode.height),
            Orientation::Portrait => (mode.height, mode.width),
        };
        let full_screen = options::flag(options, FULL_SCREEN, true);
        Ok(RenderTargetDesc::window(name, width, height, full_screen))
    }

    /// Creates a render system over this display's options.
    pub fn create_render_system(
        &self,
        driver: Box<dyn GlDriver>,
        provider: Box<dyn ContextProvider>,
    ) -> GlRenderSystem {
        GlRenderSystem::new(driver, provider, self.config_options())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhea_core::renderer::ConfigError;

    #[test]
    fn publishes_base_options_and_orientation() {
        let options = RpiDisplaySupport::new().config_options();
        for name in [
            FULL_SCREEN,
            VIDEO_MODE,
            options::VSYNC,
            options::FSAA,
            options::FIXED_PIPELINE_ENABLED,
            ORIENTATION,
        ] {
            assert!(options.get(name).is_some(), "missing option {name}");
        }
        assert_eq!(options.value(VIDEO_MODE), Some("1280 x 800"));
        assert_eq!(options.value(ORIENTATION), Some("Landscape"));
    }

    #[test]
    fn video_mode_is_fixed_but_orientation_is_not() {
        let mut options = RpiDisplaySupport::new().config_options();
        assert_eq!(
            options.set(VIDEO_MODE, "1920 x 1080"),
            Err(ConfigError::Immutable(VIDEO_MODE.to_string()))
        );
        options.set(ORIENTATION, "Portrait").unwrap();
        assert_eq!(
            RpiDisplaySupport::orientation(&options),
            Orientation::Portrait
        );
    }

    #[test]
    fn switch_mode_keeps_the_original() {
        let mut display = RpiDisplaySupport::new();
        display.switch_mode(VideoMode {
            width: 640,
            height: 480,
            refresh_rate: 60,
        });
        assert_eq!(display.current_mode(), display.original_mode());
        assert_eq!(display.video_modes().len(), 1);
        assert_eq!(display.original_mode().refresh_rate, 0);
    }

    #[test]
    fn parses_video_modes() {
        let mode = parse_video_mode("1280 x 800").unwrap();
        assert_eq!((mode.width, mode.height, mode.refresh_rate), (1280, 800, 0));
        let mode = parse_video_mode("800x480 @ 60Hz").unwrap();
        assert_eq!((mode.width, mode.height, mode.refresh_rate), (800, 480, 60));
        assert!(parse_video_mode("wide").is_err());
        assert!(parse_video_mode("0 x 800").is_err());
        assert!(parse_video_mode("1280 x tall").is_err());
    }

    #[test]
    fn portrait_swaps_window_size() {
        let display = RpiDisplaySupport::new();
        let mut options = display.config_options();
        options.set(ORIENTATION, "Portrait").unwrap();
        options.set(FULL_SCREEN, "No").unwrap();
        let desc = display.window_desc("main", &options).unwrap();
        assert_eq!((desc.width, desc.height), (800, 1280));
        assert!(desc.is_window());
        assert!(!desc.requires_texture_flipping);
    }
}
