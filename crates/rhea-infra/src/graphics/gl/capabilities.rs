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

//! Capability probing: turns driver strings and limits into a
//! [`Capabilities`] snapshot.

use std::collections::BTreeSet;

use rhea_core::renderer::{Capabilities, DriverProfile, DriverVersion, Features, RenderError};

use super::driver::GlDriver;
use super::enums::*;

const MAX_TEXTURE_UNITS: usize = 16;
const MAX_LIGHTS: usize = 8;
const MAX_CLIP_PLANES: usize = 6;

/// Inputs to a probe that do not come from the driver.
#[derive(Debug, Clone, Copy)]
pub struct ProbeOptions<'a> {
    /// The context provider's extension string.
    pub provider_extensions: &'a str,
    /// Whether the context provider can create stereo surfaces.
    pub provider_stereo: bool,
    /// The `Fixed Pipeline Enabled` option.
    pub fixed_pipeline_enabled: bool,
}

impl Default for ProbeOptions<'_> {
    fn default() -> Self {
        Self {
            provider_extensions: "",
            provider_stereo: false,
            fixed_pipeline_enabled: true,
        }
    }
}

/// Parses a `GL_VERSION` string.
///
/// ES drivers report `OpenGL ES 2.0 ...` (ES 1.x as `OpenGL ES-CM 1.1`);
/// desktop drivers start with the version, as in `2.1 Mesa 23.0.4`.
pub fn parse_version(version: &str) -> Option<(DriverProfile, DriverVersion)> {
    let (profile, rest) = match version.trim().strip_prefix("OpenGL ES") {
        Some(rest) => {
            let rest = rest.trim_start_matches(|c: char| c == '-' || c.is_ascii_alphabetic());
            (DriverProfile::OpenGlEs, rest.trim_start())
        }
        None => (DriverProfile::Desktop, version.trim()),
    };
    let number = rest.split_whitespace().next()?;
    let mut parts = number.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts
        .next()
        .and_then(|m| {
            let digits: String = m.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        })
        .unwrap_or(0);
    Some((profile, DriverVersion::new(major, minor)))
}

fn limit(driver: &mut dyn GlDriver, name: GLenum) -> Option<usize> {
    driver
        .get_integer(name)
        .and_then(|v| usize::try_from(v).ok())
}

/// Queries the driver and derives capabilities. Needs a current context.
pub fn detect_capabilities(
    driver: &mut dyn GlDriver,
    options: ProbeOptions<'_>,
) -> Result<Capabilities, RenderError> {
    let version_string = driver.get_string(GL_VERSION).ok_or_else(|| {
        RenderError::InvalidState("GL_VERSION is unavailable; no context is current".to_string())
    })?;
    let (profile, version) = parse_version(&version_string).ok_or_else(|| {
        RenderError::InvalidState(format!("unrecognised GL_VERSION '{version_string}'"))
    })?;
    let vendor = driver.get_string(GL_VENDOR).unwrap_or_default();
    let renderer = driver.get_string(GL_RENDERER).unwrap_or_default();

    let extensions: BTreeSet<String> = driver
        .get_string(GL_EXTENSIONS)
        .unwrap_or_default()
        .split_whitespace()
        .chain(options.provider_extensions.split_whitespace())
        .map(str::to_string)
        .collect();
    let ext = |name: &str| extensions.contains(name);

    let desktop = profile == DriverProfile::Desktop;
    let es = !desktop;
    let core = |major: u32, minor: u32, es_major: u32, es_minor: u32| {
        if desktop {
            version.at_least(major, minor)
        } else {
            version.at_least(es_major, es_minor)
        }
    };

    let mut features = Features::empty();
    let fixed_function_driver = desktop || !version.at_least(2, 0);
    features.set(
        Features::FIXED_FUNCTION,
        fixed_function_driver && options.fixed_pipeline_enabled,
    );
    features.set(
        Features::PROGRAMMABLE_PIPELINE,
        version.at_least(2, 0) || ext("GL_ARB_vertex_shader"),
    );
    features.set(
        Features::GEOMETRY_PROGRAMS,
        core(3, 2, 3, 2)
            || ext("GL_ARB_geometry_shader4")
            || ext("GL_EXT_geometry_shader4")
            || ext("GL_EXT_geometry_shader"),
    );
    features.set(
        Features::INSTANCING,
        core(3, 3, 3, 0)
            || ext("GL_ARB_instanced_arrays")
            || ext("GL_EXT_instanced_arrays")
            || ext("GL_ANGLE_instanced_arrays"),
    );
    features.set(
        Features::TWO_SIDED_STENCIL,
        core(2, 0, 2, 0) || ext("GL_EXT_stencil_two_side"),
    );
    features.set(
        Features::STENCIL_WRAP,
        core(1, 4, 2, 0) || ext("GL_EXT_stencil_wrap"),
    );
    features.set(
        Features::ANISOTROPY,
        ext("GL_EXT_texture_filter_anisotropic") || (desktop && version.at_least(4, 6)),
    );
    features.set(
        Features::CUBE_MAPS,
        core(1, 3, 2, 0) || ext("GL_ARB_texture_cube_map"),
    );
    features.set(
        Features::TEXTURE_3D,
        core(1, 2, 3, 0) || ext("GL_EXT_texture3D") || ext("GL_OES_texture_3D"),
    );
    features.set(
        Features::TEXTURE_2D_ARRAY,
        core(3, 0, 3, 0) || ext("GL_EXT_texture_array"),
    );
    features.set(Features::TEXTURE_1D, desktop);
    features.set(Features::POLYGON_MODE, desktop);
    features.set(
        Features::POINT_SPRITES,
        core(2, 0, 2, 0) || ext("GL_ARB_point_sprite") || ext("GL_OES_point_sprite"),
    );
    features.set(
        Features::DEBUG_MARKERS,
        ext("GL_KHR_debug") || ext("GL_EXT_debug_marker"),
    );
    features.set(
        Features::QUAD_BUFFER_STEREO,
        options.provider_stereo && desktop,
    );
    features.set(
        Features::BLEND_MIN_MAX,
        core(1, 4, 3, 0) || ext("GL_EXT_blend_minmax"),
    );
    features.set(
        Features::SEPARATE_BLEND,
        core(1, 4, 2, 0) || ext("GL_EXT_blend_func_separate"),
    );

    let fixed = features.contains(Features::FIXED_FUNCTION);
    let fixed_units = limit(driver, GL_MAX_TEXTURE_UNITS);
    let num_texture_units = limit(driver, GL_MAX_TEXTURE_IMAGE_UNITS)
        .or(fixed_units)
        .unwrap_or(1)
        .clamp(1, MAX_TEXTURE_UNITS);
    let num_fixed_function_texture_units = if fixed {
        fixed_units.unwrap_or(1).min(num_texture_units)
    } else {
        0
    };
    let (num_lights, num_clip_planes) = if fixed {
        (
            limit(driver, GL_MAX_LIGHTS).unwrap_or(0).min(MAX_LIGHTS),
            limit(driver, GL_MAX_CLIP_PLANES)
                .unwrap_or(0)
                .min(MAX_CLIP_PLANES),
        )
    } else {
        (0, 0)
    };
    features.set(Features::USER_CLIP_PLANES, num_clip_planes > 0);

    let num_vertex_attribs = limit(driver, GL_MAX_VERTEX_ATTRIBS).unwrap_or(if es { 8 } else { 16 });
    let max_anisotropy = if features.contains(Features::ANISOTROPY) {
        driver
            .get_float(GL_MAX_TEXTURE_MAX_ANISOTROPY_EXT)
            .unwrap_or(1.0)
            .max(1.0)
    } else {
        1.0
    };

    Ok(Capabilities {
        vendor,
        renderer,
        version_string,
        profile,
        version,
        num_texture_units,
        num_fixed_function_texture_units,
        num_lights,
        num_clip_planes,
        num_vertex_attribs,
        max_anisotropy,
        features,
        extensions,
    })
}

/// Probes capabilities once per render system.
#[derive(Debug, Default)]
pub struct CapabilityProbe {
    capabilities: Option<Capabilities>,
}

impl CapabilityProbe {
    /// Creates a probe that has not run yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the probe. Must be called exactly once, with the main context
    /// current.
    pub fn probe(
        &mut self,
        driver: &mut dyn GlDriver,
        options: ProbeOptions<'_>,
    ) -> Result<&Capabilities, RenderError> {
        if self.capabilities.is_some() {
            return Err(RenderError::InvalidState(
                "capabilities have already been probed".to_string(),
            ));
        }
        let caps = detect_capabilities(driver, options)?;
        log::info!(
            "GL driver: {} / {} / {} ({:?} {})",
            caps.vendor,
            caps.renderer,
            caps.version_string,
            caps.profile,
            caps.version
        );
        log::info!(
            "Limits: {} texture units ({} fixed-function), {} lights, {} clip planes, {} vertex attributes",
            caps.num_texture_units,
            caps.num_fixed_function_texture_units,
            caps.num_lights,
            caps.num_clip_planes,
            caps.num_vertex_attribs
        );
        log::debug!("Features: {:?}", caps.features);
        Ok(&*self.capabilities.insert(caps))
    }

    /// Probes again after the driver lost and recreated its contexts.
    pub fn reprobe_after_context_loss(
        &mut self,
        driver: &mut dyn GlDriver,
        options: ProbeOptions<'_>,
    ) -> Result<&Capabilities, RenderError> {
        let previous = self.capabilities.take();
        let caps = detect_capabilities(driver, options)?;
        if let Some(previous) = previous {
            if previous.features != caps.features {
                log::warn!(
                    "Driver features changed after context loss: {:?} -> {:?}",
                    previous.features,
                    caps.features
                );
            }
        }
        Ok(&*self.capabilities.insert(caps))
    }

    /// The probed capabilities, if the probe has run.
    pub fn capabilities(&self) -> Option<&Capabilities> {
        self.capabilities.as_ref()
    }
}
