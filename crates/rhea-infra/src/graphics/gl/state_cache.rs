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

//! The state cache: a per-context mirror of driver pipeline state.
//!
//! Every field is either known (`Some`, equal to what the driver has) or
//! unknown (`None`, must be emitted on next use). A setter compares the
//! request against the mirror and only calls the driver for what differs.
//! No setter writes to the driver without updating the mirror.

use std::collections::HashMap;

use rhea_core::math::{Mat4, Plane};
use rhea_core::renderer::{
    BlendComponent, BlendOperation, BufferId, Capabilities, ColorWrites, ColourBlendState,
    CompareFunction, CullingMode, Features, FilterOptions, FilterType, FogMode, GpuProgramType,
    LimitKind, PolygonMode, RenderError, ShadeOptions, StencilOperation, StencilState,
    TextureAddressingMode, TextureBlendMode, TextureHandle, TextureType, UvwAddressingMode,
};

use super::conversions::{self, IntoGl};
use super::driver::GlDriver;
use super::enums::*;

/// Hardware limits and features the cache checks indices against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheLimits {
    /// Texture units usable by programs.
    pub texture_units: usize,
    /// Texture units with fixed-function stages.
    pub fixed_function_texture_units: usize,
    /// User clip planes.
    pub clip_planes: usize,
    /// Fixed-function lights.
    pub lights: usize,
    /// Vertex attribute slots.
    pub vertex_attribs: usize,
    /// Maximum anisotropy.
    pub max_anisotropy: f32,
    /// Supported features.
    pub features: Features,
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            texture_units: 1,
            fixed_function_texture_units: 0,
            clip_planes: 0,
            lights: 0,
            vertex_attribs: 8,
            max_anisotropy: 1.0,
            features: Features::empty(),
        }
    }
}

impl From<&Capabilities> for CacheLimits {
    fn from(caps: &Capabilities) -> Self {
        Self {
            texture_units: caps.num_texture_units,
            fixed_function_texture_units: caps.num_fixed_function_texture_units,
            clip_planes: caps.num_clip_planes,
            lights: caps.num_lights,
            vertex_attribs: caps.num_vertex_attribs,
            max_anisotropy: caps.max_anisotropy,
            features: caps.features,
        }
    }
}

/// What is bound to a texture unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureBinding {
    /// Whether the unit is enabled.
    pub enabled: bool,
    /// The bound texture; `None` means texture 0.
    pub texture: Option<TextureHandle>,
}

/// The mirror of one texture unit.
#[derive(Debug, Clone, Default)]
pub struct TextureUnitState {
    /// The bound texture.
    pub binding: Option<TextureBinding>,
    /// The `GL_TEXTURE_MIN_FILTER` value (min and mip combined).
    pub min_filter: Option<GLenum>,
    /// The `GL_TEXTURE_MAG_FILTER` value.
    pub mag_filter: Option<GLenum>,
    /// The anisotropy level.
    pub anisotropy: Option<f32>,
    /// Addressing of the s, t and r axes.
    pub addressing: [Option<TextureAddressingMode>; 3],
    /// The texture coordinate set read by the unit.
    pub coord_set: Option<u32>,
    /// The fixed-function combine mode.
    pub blend_mode: Option<TextureBlendMode>,
    /// The fixed-function texture matrix.
    pub matrix: Option<Mat4>,
    // Last requested min and mip options; survive invalidation.
    requested_min: FilterOptions,
    requested_mip: FilterOptions,
}

impl TextureUnitState {
    fn new() -> Self {
        Self {
            requested_min: FilterOptions::Linear,
            requested_mip: FilterOptions::Point,
            ..Default::default()
        }
    }

    fn reset_sampler(&mut self) {
        self.min_filter = None;
        self.mag_filter = None;
        self.anisotropy = None;
        self.addressing = [None; 3];
    }

    fn forget(&mut self) {
        let (min, mip) = (self.requested_min, self.requested_mip);
        *self = Self::new();
        self.requested_min = min;
        self.requested_mip = mip;
    }

    fn bound_type(&self) -> Option<TextureType> {
        self.binding.and_then(|b| b.texture).map(|t| t.ty)
    }
}

/// The mirror of one user clip plane.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClipPlaneState {
    /// The last coefficients stored by the caller. Never-set planes are
    /// degenerate.
    pub stored: Plane,
    /// The coefficients the driver has, if known.
    pub pushed: Option<Plane>,
    /// Whether the plane is enabled, if known.
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct StencilFaceMirror {
    func: Option<(GLenum, i32, u32)>,
    ops: Option<[GLenum; 3]>,
    write_mask: Option<u32>,
}

const FACE_FRONT: usize = 0;
const FACE_BACK: usize = 1;

/// The per-context mirror of driver state.
#[derive(Debug, Clone)]
pub struct StateCache {
    limits: CacheLimits,
    capabilities: HashMap<GLenum, bool>,
    active_unit: Option<usize>,
    units: Vec<TextureUnitState>,

    blend_colour: Option<BlendComponent>,
    blend_alpha: Option<BlendComponent>,
    colour_mask: Option<ColorWrites>,

    depth_write: Option<bool>,
    depth_func: Option<CompareFunction>,
    depth_bias: Option<(f32, f32)>,

    stencil: [StencilFaceMirror; 2],

    cull_face: Option<GLenum>,
    polygon_mode: Option<PolygonMode>,
    shade: Option<ShadeOptions>,
    fog_mode: Option<FogMode>,
    line_width: Option<f32>,
    alpha_func: Option<(CompareFunction, f32)>,

    clip_planes: Vec<ClipPlaneState>,
    scissor_box: Option<[i32; 4]>,
    viewport: Option<[i32; 4]>,

    matrix_mode: Option<GLenum>,
    modelview: Option<Mat4>,
    projection: Option<Mat4>,

    programs: [Option<u32>; 3],
    buffers: HashMap<GLenum, u32>,
    attrib_arrays: Vec<Option<bool>>,
    attrib_divisors: Vec<Option<u32>>,

    elided: u64,
}

impl StateCache {
    /// Creates a cache with every field unknown.
    pub fn new(limits: CacheLimits) -> Self {
        Self {
            limits,
            capabilities: HashMap::new(),
            active_unit: None,
            units: (0..limits.texture_units)
                .map(|_| TextureUnitState::new())
                .collect(),
            blend_colour: None,
            blend_alpha: None,
            colour_mask: None,
            depth_write: None,
            depth_func: None,
            depth_bias: None,
            stencil: [StencilFaceMirror::default(); 2],
            cull_face: None,
            polygon_mode: None,
            shade: None,
            fog_mode: None,
            line_width: None,
            alpha_func: None,
            clip_planes: vec![ClipPlaneState::default(); limits.clip_planes],
            scissor_box: None,
            viewport: None,
            matrix_mode: None,
            modelview: None,
            projection: None,
            programs: [None; 3],
            buffers: HashMap::new(),
            attrib_arrays: vec![None; limits.vertex_attribs],
            attrib_divisors: vec![None; limits.vertex_attribs],
            elided: 0,
        }
    }

    /// The limits this cache checks against.
    pub fn limits(&self) -> &CacheLimits {
        &self.limits
    }

    /// Forgets all known driver state. Stored clip plane coefficients and the
    /// last requested min/mip filters are kept; they are requests, not mirror.
    pub fn invalidate(&mut self) {
        log::trace!("State cache invalidated.");
        self.capabilities.clear();
        self.active_unit = None;
        self.units.iter_mut().for_each(TextureUnitState::forget);
        self.blend_colour = None;
        self.blend_alpha = None;
        self.colour_mask = None;
        self.depth_write = None;
        self.depth_func = None;
        self.depth_bias = None;
        self.stencil = [StencilFaceMirror::default(); 2];
        self.cull_face = None;
        self.polygon_mode = None;
        self.shade = None;
        self.fog_mode = None;
        self.line_width = None;
        self.alpha_func = None;
        for plane in &mut self.clip_planes {
            plane.pushed = None;
            plane.enabled = None;
        }
        self.scissor_box = None;
        self.viewport = None;
        self.matrix_mode = None;
        self.modelview = None;
        self.projection = None;
        self.programs = [None; 3];
        self.buffers.clear();
        self.attrib_arrays.iter_mut().for_each(|a| *a = None);
        self.attrib_divisors.iter_mut().for_each(|d| *d = None);
    }

    /// Number of driver calls suppressed since creation.
    pub fn elided_calls(&self) -> u64 {
        self.elided
    }

    fn elide(&mut self, what: &str) {
        self.elided += 1;
        log::trace!("State cache: {what} unchanged, call elided.");
    }

    fn require(&self, features: Features, what: &str) -> Result<(), RenderError> {
        if self.limits.features.contains(features) {
            Ok(())
        } else {
            Err(RenderError::UnsupportedFeature(what.to_string()))
        }
    }

    fn check_unit(&self, unit: usize) -> Result<(), RenderError> {
        if unit < self.units.len() {
            Ok(())
        } else {
            Err(RenderError::out_of_range(
                LimitKind::TextureUnit,
                unit,
                self.units.len(),
            ))
        }
    }

    fn check_fixed_function_unit(&self, unit: usize, what: &str) -> Result<(), RenderError> {
        self.require(Features::FIXED_FUNCTION, what)?;
        let limit = self
            .limits
            .fixed_function_texture_units
            .min(self.units.len());
        if unit < limit {
            Ok(())
        } else {
            Err(RenderError::out_of_range(LimitKind::TextureUnit, unit, limit))
        }
    }

    fn has_fixed_function(&self) -> bool {
        self.limits.features.contains(Features::FIXED_FUNCTION)
    }

    // --- Capabilities ---

    /// Enables or disables a driver capability.
    pub fn set_enabled(&mut self, driver: &mut dyn GlDriver, cap: GLenum, enabled: bool) {
        if self.capabilities.get(&cap) == Some(&enabled) {
            self.elide("capability");
            return;
        }
        if enabled {
            driver.enable(cap);
        } else {
            driver.disable(cap);
        }
        self.capabilities.insert(cap, enabled);
    }

    /// Whether a capability is enabled, if known.
    pub fn is_enabled(&self, cap: GLenum) -> Option<bool> {
        self.capabilities.get(&cap).copied()
    }

    // --- Textures ---

    /// Makes `unit` the active texture unit.
    pub fn activate_unit(
        &mut self,
        driver: &mut dyn GlDriver,
        unit: usize,
    ) -> Result<(), RenderError> {
        self.check_unit(unit)?;
        if self.active_unit == Some(unit) {
            self.elide("active texture unit");
            return Ok(());
        }
        driver.active_texture(GL_TEXTURE0 + unit as GLenum);
        self.active_unit = Some(unit);
        Ok(())
    }

    /// Binds (or unbinds) a texture on a unit.
    ///
    /// A change of texture type resets the unit's sampler mirror. On
    /// fixed-function units the previous target is disabled and the new one
    /// enabled; disabling restores the `MODULATE` environment and binds
    /// texture 0.
    pub fn set_texture(
        &mut self,
        driver: &mut dyn GlDriver,
        unit: usize,
        enabled: bool,
        texture: Option<TextureHandle>,
    ) -> Result<(), RenderError> {
        self.check_unit(unit)?;
        if let Some(handle) = texture.filter(|_| enabled) {
            let required = match handle.ty {
                TextureType::D2 => Features::empty(),
                TextureType::D1 => Features::TEXTURE_1D,
                TextureType::D3 => Features::TEXTURE_3D,
                TextureType::CubeMap => Features::CUBE_MAPS,
                TextureType::D2Array => Features::TEXTURE_2D_ARRAY,
            };
            self.require(required, &format!("{:?} textures", handle.ty))?;
        }
        let requested = TextureBinding {
            enabled,
            texture: if enabled { texture } else { None },
        };
        if self.units[unit].binding == Some(requested) {
            self.elide("texture binding");
            return Ok(());
        }

        let fixed = self.has_fixed_function() && unit < self.limits.fixed_function_texture_units;
        let previous_type = self.units[unit].bound_type();
        self.activate_unit(driver, unit)?;

        match requested.texture {
            Some(handle) => {
                if previous_type != Some(handle.ty) {
                    self.units[unit].reset_sampler();
                    if fixed {
                        if let Some(previous) = previous_type {
                            driver.disable(previous.into_gl());
                        }
                        driver.enable(handle.ty.into_gl());
                    }
                }
                driver.bind_texture(handle.ty.into_gl(), handle.id);
            }
            None => {
                let target = previous_type.unwrap_or(TextureType::D2).into_gl();
                if fixed {
                    if let Some(previous) = previous_type {
                        driver.disable(previous.into_gl());
                    }
                    driver.tex_env_mode(GL_MODULATE);
                    self.units[unit].blend_mode = Some(TextureBlendMode::Modulate);
                }
                driver.bind_texture(target, 0);
            }
        }
        self.units[unit].binding = Some(requested);
        Ok(())
    }

    /// The binding of a unit, if known.
    pub fn texture(&self, unit: usize) -> Option<TextureBinding> {
        self.units.get(unit).and_then(|u| u.binding)
    }

    /// The full mirror of a unit.
    pub fn texture_unit(&self, unit: usize) -> Option<&TextureUnitState> {
        self.units.get(unit)
    }

    fn bound_texture_target(&self, unit: usize) -> Result<TextureType, RenderError> {
        self.units[unit].bound_type().ok_or_else(|| {
            RenderError::InvalidState(format!("no texture bound to texture unit {unit}"))
        })
    }

    /// Sets one filter stage of a unit.
    ///
    /// Min and mip share `GL_TEXTURE_MIN_FILTER`, so a change of either one is
    /// issued together with the last requested value of the other.
    pub fn set_texture_unit_filtering(
        &mut self,
        driver: &mut dyn GlDriver,
        unit: usize,
        filter_type: FilterType,
        options: FilterOptions,
    ) -> Result<(), RenderError> {
        self.check_unit(unit)?;
        let target = self.bound_texture_target(unit)?.into_gl();

        let (pname, value) = match filter_type {
            FilterType::Min | FilterType::Mip => {
                let state = &mut self.units[unit];
                if filter_type == FilterType::Min {
                    state.requested_min = options;
                } else {
                    state.requested_mip = options;
                }
                let combined =
                    conversions::combined_min_mip_filter(state.requested_min, state.requested_mip);
                (GL_TEXTURE_MIN_FILTER, combined)
            }
            FilterType::Mag => (GL_TEXTURE_MAG_FILTER, conversions::mag_filter(options)),
        };

        let mirror = if pname == GL_TEXTURE_MIN_FILTER {
            self.units[unit].min_filter
        } else {
            self.units[unit].mag_filter
        };
        if mirror == Some(value) {
            self.elide("texture filter");
            return Ok(());
        }

        self.activate_unit(driver, unit)?;
        driver.tex_parameter_i(target, pname, value as i32);
        if pname == GL_TEXTURE_MIN_FILTER {
            self.units[unit].min_filter = Some(value);
        } else {
            self.units[unit].mag_filter = Some(value);
        }
        Ok(())
    }

    /// Sets the anisotropy of a unit, clamped to the probed maximum.
    pub fn set_texture_anisotropy(
        &mut self,
        driver: &mut dyn GlDriver,
        unit: usize,
        level: f32,
    ) -> Result<(), RenderError> {
        self.check_unit(unit)?;
        if !self.limits.features.contains(Features::ANISOTROPY) {
            if level <= 1.0 {
                return Ok(());
            }
            return Err(RenderError::UnsupportedFeature(
                "anisotropic filtering".to_string(),
            ));
        }
        let target = self.bound_texture_target(unit)?.into_gl();
        let level = level.clamp(1.0, self.limits.max_anisotropy.max(1.0));
        if self.units[unit].anisotropy == Some(level) {
            self.elide("texture anisotropy");
            return Ok(());
        }
        self.activate_unit(driver, unit)?;
        driver.tex_parameter_f(target, GL_TEXTURE_MAX_ANISOTROPY_EXT, level);
        self.units[unit].anisotropy = Some(level);
        Ok(())
    }

    /// Sets the addressing mode of a unit; one call per axis that changed.
    ///
    /// The r axis is only issued for texture types that have one.
    pub fn set_texture_addressing_mode(
        &mut self,
        driver: &mut dyn GlDriver,
        unit: usize,
        uvw: UvwAddressingMode,
    ) -> Result<(), RenderError> {
        self.check_unit(unit)?;
        let ty = self.bound_texture_target(unit)?;
        let has_r = matches!(
            ty,
            TextureType::D3 | TextureType::CubeMap | TextureType::D2Array
        );
        let axes = [
            (GL_TEXTURE_WRAP_S, uvw.u),
            (GL_TEXTURE_WRAP_T, uvw.v),
            (GL_TEXTURE_WRAP_R, uvw.w),
        ];
        for (axis, (pname, mode)) in axes.into_iter().enumerate() {
            if axis == 2 && !has_r {
                continue;
            }
            if self.units[unit].addressing[axis] == Some(mode) {
                self.elide("texture addressing");
                continue;
            }
            self.activate_unit(driver, unit)?;
            driver.tex_parameter_i(ty.into_gl(), pname, mode.into_gl() as i32);
            self.units[unit].addressing[axis] = Some(mode);
        }
        Ok(())
    }

    /// Selects the texture coordinate set a unit reads. Consumed when vertex
    /// arrays are bound, so no driver call is made here.
    pub fn set_texture_coord_set(&mut self, unit: usize, index: u32) -> Result<(), RenderError> {
        self.check_unit(unit)?;
        self.units[unit].coord_set = Some(index);
        Ok(())
    }

    /// The coordinate set of a unit, defaulting to the unit index.
    pub fn texture_coord_set(&self, unit: usize) -> u32 {
        self.units
            .get(unit)
            .and_then(|u| u.coord_set)
            .unwrap_or(unit as u32)
    }

    /// Sets the fixed-function combine mode of a unit.
    pub fn set_texture_blend_mode(
        &mut self,
        driver: &mut dyn GlDriver,
        unit: usize,
        mode: TextureBlendMode,
    ) -> Result<(), RenderError> {
        self.check_fixed_function_unit(unit, "texture blend modes")?;
        if self.units[unit].blend_mode == Some(mode) {
            self.elide("texture blend mode");
            return Ok(());
        }
        self.activate_unit(driver, unit)?;
        driver.tex_env_mode(mode.into_gl());
        self.units[unit].blend_mode = Some(mode);
        Ok(())
    }

    /// Sets the fixed-function texture matrix of a unit.
    pub fn set_texture_matrix(
        &mut self,
        driver: &mut dyn GlDriver,
        unit: usize,
        matrix: &Mat4,
    ) -> Result<(), RenderError> {
        self.check_fixed_function_unit(unit, "texture matrices")?;
        if self.units[unit].matrix.as_ref() == Some(matrix) {
            self.elide("texture matrix");
            return Ok(());
        }
        self.activate_unit(driver, unit)?;
        self.set_matrix_mode(driver, GL_TEXTURE);
        driver.load_matrix(&matrix.to_cols_array());
        self.set_matrix_mode(driver, GL_MODELVIEW);
        self.units[unit].matrix = Some(*matrix);
        Ok(())
    }

    // --- Blending ---

    /// Applies a colour blend state. Factors and equations are only emitted
    /// while blending is enabled.
    pub fn set_blend_state(
        &mut self,
        driver: &mut dyn GlDriver,
        state: &ColourBlendState,
    ) -> Result<(), RenderError> {
        let uses_min_max = [state.colour.operation, state.alpha.operation]
            .iter()
            .any(|op| matches!(op, BlendOperation::Min | BlendOperation::Max));
        if uses_min_max && state.blending_enabled() {
            self.require(Features::BLEND_MIN_MAX, "min/max blend operations")?;
        }

        if state.blending_enabled() {
            self.set_enabled(driver, GL_BLEND, true);
            let factors_known = self.blend_colour.zip(self.blend_alpha).map(|(c, a)| {
                (c.src_factor, c.dst_factor, a.src_factor, a.dst_factor)
                    == (
                        state.colour.src_factor,
                        state.colour.dst_factor,
                        state.alpha.src_factor,
                        state.alpha.dst_factor,
                    )
            });
            if factors_known == Some(true) {
                self.elide("blend factors");
            } else {
                driver.blend_func_separate(
                    state.colour.src_factor.into_gl(),
                    state.colour.dst_factor.into_gl(),
                    state.alpha.src_factor.into_gl(),
                    state.alpha.dst_factor.into_gl(),
                );
            }
            let equations_known = self.blend_colour.zip(self.blend_alpha).map(|(c, a)| {
                (c.operation, a.operation) == (state.colour.operation, state.alpha.operation)
            });
            if equations_known == Some(true) {
                self.elide("blend equations");
            } else {
                driver.blend_equation_separate(
                    state.colour.operation.into_gl(),
                    state.alpha.operation.into_gl(),
                );
            }
            self.blend_colour = Some(state.colour);
            self.blend_alpha = Some(state.alpha);
        } else {
            self.set_enabled(driver, GL_BLEND, false);
        }
        self.set_colour_mask(driver, state.write_mask);
        Ok(())
    }

    /// The blend state the driver has, if fully known.
    pub fn blend_state(&self) -> Option<ColourBlendState> {
        let write_mask = self.colour_mask?;
        match self.is_enabled(GL_BLEND)? {
            false => Some(ColourBlendState {
                write_mask,
                ..ColourBlendState::REPLACE
            }),
            true => Some(ColourBlendState {
                colour: self.blend_colour?,
                alpha: self.blend_alpha?,
                write_mask,
            }),
        }
    }

    /// Sets the colour write mask.
    pub fn set_colour_mask(&mut self, driver: &mut dyn GlDriver, mask: ColorWrites) {
        if self.colour_mask == Some(mask) {
            self.elide("colour mask");
            return;
        }
        driver.color_mask(
            mask.contains(ColorWrites::R),
            mask.contains(ColorWrites::G),
            mask.contains(ColorWrites::B),
            mask.contains(ColorWrites::A),
        );
        self.colour_mask = Some(mask);
    }

    /// The colour write mask, if known.
    pub fn colour_mask(&self) -> Option<ColorWrites> {
        self.colour_mask
    }

    // --- Depth ---

    /// Sets depth test, depth write and compare function together.
    pub fn set_depth_params(
        &mut self,
        driver: &mut dyn GlDriver,
        test: bool,
        write: bool,
        function: CompareFunction,
    ) {
        self.set_depth_check_enabled(driver, test);
        self.set_depth_write_enabled(driver, write);
        self.set_depth_function(driver, function);
    }

    /// Enables or disables the depth test.
    pub fn set_depth_check_enabled(&mut self, driver: &mut dyn GlDriver, enabled: bool) {
        self.set_enabled(driver, GL_DEPTH_TEST, enabled);
    }

    /// Enables or disables depth writes.
    pub fn set_depth_write_enabled(&mut self, driver: &mut dyn GlDriver, enabled: bool) {
        if self.depth_write == Some(enabled) {
            self.elide("depth mask");
            return;
        }
        driver.depth_mask(enabled);
        self.depth_write = Some(enabled);
    }

    /// Depth writes, if known.
    pub fn depth_write(&self) -> Option<bool> {
        self.depth_write
    }

    /// Sets the depth compare function.
    pub fn set_depth_function(&mut self, driver: &mut dyn GlDriver, function: CompareFunction) {
        if self.depth_func == Some(function) {
            self.elide("depth function");
            return;
        }
        driver.depth_func(function.into_gl());
        self.depth_func = Some(function);
    }

    /// Sets the depth bias. A zero bias disables polygon offset.
    pub fn set_depth_bias(&mut self, driver: &mut dyn GlDriver, constant: f32, slope_scale: f32) {
        let enabled = constant != 0.0 || slope_scale != 0.0;
        let offset_caps: &[GLenum] = if self.limits.features.contains(Features::POLYGON_MODE) {
            &[
                GL_POLYGON_OFFSET_FILL,
                GL_POLYGON_OFFSET_POINT,
                GL_POLYGON_OFFSET_LINE,
            ]
        } else {
            &[GL_POLYGON_OFFSET_FILL]
        };
        for &cap in offset_caps {
            self.set_enabled(driver, cap, enabled);
        }
        if !enabled {
            return;
        }
        if self.depth_bias == Some((constant, slope_scale)) {
            self.elide("polygon offset");
            return;
        }
        driver.polygon_offset(-slope_scale, -constant);
        self.depth_bias = Some((constant, slope_scale));
    }

    // --- Stencil ---

    /// Enables or disables the stencil test.
    pub fn set_stencil_check_enabled(&mut self, driver: &mut dyn GlDriver, enabled: bool) {
        self.set_enabled(driver, GL_STENCIL_TEST, enabled);
    }

    /// Applies the stencil functions, operations and write mask.
    ///
    /// `flip` is set when the current target renders upside down; the face
    /// pointing away then gets increment and decrement swapped.
    pub fn set_stencil_params(
        &mut self,
        driver: &mut dyn GlDriver,
        state: &StencilState,
        flip: bool,
    ) -> Result<(), RenderError> {
        if state.two_sided {
            self.require(Features::TWO_SIDED_STENCIL, "two-sided stencil")?;
        }
        if [state.fail_op, state.depth_fail_op, state.pass_op]
            .iter()
            .any(|op| op.wraps())
        {
            self.require(Features::STENCIL_WRAP, "wrapping stencil operations")?;
        }

        self.set_stencil_check_enabled(driver, state.enabled);

        let func = (
            state.compare.into_gl(),
            state.reference as i32,
            state.compare_mask,
        );
        let ops = |invert: bool| -> [GLenum; 3] {
            let op = |o: StencilOperation| (if invert { o.inverted() } else { o }).into_gl();
            [op(state.fail_op), op(state.depth_fail_op), op(state.pass_op)]
        };

        if state.two_sided {
            self.apply_stencil_face(driver, FACE_BACK, func, ops(!flip), state.write_mask);
            self.apply_stencil_face(driver, FACE_FRONT, func, ops(flip), state.write_mask);
        } else {
            let face_ops = ops(flip);
            let both = StencilFaceMirror {
                func: Some(func),
                ops: Some(face_ops),
                write_mask: Some(state.write_mask),
            };
            if self.stencil[FACE_FRONT] == both && self.stencil[FACE_BACK] == both {
                self.elide("stencil state");
                return Ok(());
            }
            self.set_stencil_mask(driver, state.write_mask);
            if self.stencil[FACE_FRONT].func == Some(func) && self.stencil[FACE_BACK].func == Some(func)
            {
                self.elide("stencil function");
            } else {
                driver.stencil_func_separate(GL_FRONT_AND_BACK, func.0, func.1, func.2);
                self.stencil[FACE_FRONT].func = Some(func);
                self.stencil[FACE_BACK].func = Some(func);
            }
            if self.stencil[FACE_FRONT].ops == Some(face_ops)
                && self.stencil[FACE_BACK].ops == Some(face_ops)
            {
                self.elide("stencil operations");
            } else {
                driver.stencil_op_separate(GL_FRONT_AND_BACK, face_ops[0], face_ops[1], face_ops[2]);
                self.stencil[FACE_FRONT].ops = Some(face_ops);
                self.stencil[FACE_BACK].ops = Some(face_ops);
            }
        }
        Ok(())
    }

    fn apply_stencil_face(
        &mut self,
        driver: &mut dyn GlDriver,
        face: usize,
        func: (GLenum, i32, u32),
        ops: [GLenum; 3],
        write_mask: u32,
    ) {
        let gl_face = if face == FACE_FRONT { GL_FRONT } else { GL_BACK };
        if self.stencil[face].write_mask != Some(write_mask) {
            driver.stencil_mask_separate(gl_face, write_mask);
            self.stencil[face].write_mask = Some(write_mask);
        } else {
            self.elide("stencil write mask");
        }
        if self.stencil[face].func != Some(func) {
            driver.stencil_func_separate(gl_face, func.0, func.1, func.2);
            self.stencil[face].func = Some(func);
        } else {
            self.elide("stencil function");
        }
        if self.stencil[face].ops != Some(ops) {
            driver.stencil_op_separate(gl_face, ops[0], ops[1], ops[2]);
            self.stencil[face].ops = Some(ops);
        } else {
            self.elide("stencil operations");
        }
    }

    /// Sets the stencil write mask of both faces.
    pub fn set_stencil_mask(&mut self, driver: &mut dyn GlDriver, mask: u32) {
        if self.stencil[FACE_FRONT].write_mask == Some(mask)
            && self.stencil[FACE_BACK].write_mask == Some(mask)
        {
            self.elide("stencil write mask");
            return;
        }
        driver.stencil_mask_separate(GL_FRONT_AND_BACK, mask);
        self.stencil[FACE_FRONT].write_mask = Some(mask);
        self.stencil[FACE_BACK].write_mask = Some(mask);
    }

    /// The stencil write mask, if known and equal for both faces.
    pub fn stencil_mask(&self) -> Option<u32> {
        let front = self.stencil[FACE_FRONT].write_mask?;
        (self.stencil[FACE_BACK].write_mask == Some(front)).then_some(front)
    }

    // --- Rasterizer ---

    /// Sets the culled face from a winding and the target's flip state.
    pub fn set_culling_mode(&mut self, driver: &mut dyn GlDriver, mode: CullingMode, flip: bool) {
        match conversions::cull_face(mode, flip) {
            None => self.set_enabled(driver, GL_CULL_FACE, false),
            Some(face) => {
                self.set_enabled(driver, GL_CULL_FACE, true);
                if self.cull_face == Some(face) {
                    self.elide("cull face");
                } else {
                    driver.cull_face(face);
                    self.cull_face = Some(face);
                }
            }
        }
    }

    /// Sets the polygon rasterization mode.
    ///
    /// Drivers without polygon modes only accept `Solid`.
    pub fn set_polygon_mode(
        &mut self,
        driver: &mut dyn GlDriver,
        mode: PolygonMode,
    ) -> Result<(), RenderError> {
        if self.polygon_mode == Some(mode) {
            self.elide("polygon mode");
            return Ok(());
        }
        if !self.limits.features.contains(Features::POLYGON_MODE) {
            if mode != PolygonMode::Solid {
                return Err(RenderError::UnsupportedFeature(format!(
                    "polygon mode {mode:?}"
                )));
            }
        } else {
            driver.polygon_mode(GL_FRONT_AND_BACK, mode.into_gl());
        }
        self.polygon_mode = Some(mode);
        Ok(())
    }

    /// Sets the fixed-function shading model.
    pub fn set_shading_type(
        &mut self,
        driver: &mut dyn GlDriver,
        shade: ShadeOptions,
    ) -> Result<(), RenderError> {
        self.require(Features::FIXED_FUNCTION, "fixed-function shading")?;
        if self.shade.map(IntoGl::into_gl) == Some(shade.into_gl()) {
            self.elide("shade model");
            return Ok(());
        }
        driver.shade_model(shade.into_gl());
        self.shade = Some(shade);
        Ok(())
    }

    /// Sets the fixed-function fog mode. `None` disables fog.
    pub fn set_fog(&mut self, driver: &mut dyn GlDriver, mode: FogMode) -> Result<(), RenderError> {
        self.require(Features::FIXED_FUNCTION, "fixed-function fog")?;
        match conversions::fog_mode(mode) {
            None => self.set_enabled(driver, GL_FOG, false),
            Some(gl_mode) => {
                self.set_enabled(driver, GL_FOG, true);
                if self.fog_mode == Some(mode) {
                    self.elide("fog mode");
                } else {
                    driver.fog_i(GL_FOG_MODE, gl_mode as i32);
                }
            }
        }
        self.fog_mode = Some(mode);
        Ok(())
    }

    /// Sets the rasterized line width.
    pub fn set_line_width(&mut self, driver: &mut dyn GlDriver, width: f32) {
        if self.line_width == Some(width) {
            self.elide("line width");
            return;
        }
        driver.line_width(width);
        self.line_width = Some(width);
    }

    /// Sets the alpha test. `Always` disables it.
    ///
    /// Without fixed function only `Always` is accepted; shaders discard
    /// fragments themselves.
    pub fn set_alpha_test(
        &mut self,
        driver: &mut dyn GlDriver,
        function: CompareFunction,
        reference: f32,
    ) -> Result<(), RenderError> {
        let enabled = function != CompareFunction::Always;
        if !self.has_fixed_function() {
            if enabled {
                return Err(RenderError::UnsupportedFeature(
                    "fixed-function alpha test".to_string(),
                ));
            }
            return Ok(());
        }
        self.set_enabled(driver, GL_ALPHA_TEST, enabled);
        if !enabled {
            return Ok(());
        }
        if self.alpha_func == Some((function, reference)) {
            self.elide("alpha function");
            return Ok(());
        }
        driver.alpha_func(function.into_gl(), reference);
        self.alpha_func = Some((function, reference));
        Ok(())
    }

    // --- Clip planes ---

    fn check_clip_plane(&self, index: usize) -> Result<(), RenderError> {
        if index < self.clip_planes.len() {
            Ok(())
        } else {
            Err(RenderError::out_of_range(
                LimitKind::ClipPlane,
                index,
                self.clip_planes.len(),
            ))
        }
    }

    fn push_clip_plane(&mut self, driver: &mut dyn GlDriver, index: usize) {
        let stored = self.clip_planes[index].stored;
        if self.clip_planes[index].pushed == Some(stored) {
            self.elide("clip plane equation");
            return;
        }
        driver.clip_plane(GL_CLIP_PLANE0 + index as GLenum, stored.to_f64_array());
        self.clip_planes[index].pushed = Some(stored);
    }

    /// Stores the equation of a clip plane; it is pushed now if the plane is
    /// enabled, otherwise when it gets enabled.
    pub fn set_clip_plane(
        &mut self,
        driver: &mut dyn GlDriver,
        index: usize,
        a: f32,
        b: f32,
        c: f32,
        d: f32,
    ) -> Result<(), RenderError> {
        self.check_clip_plane(index)?;
        self.clip_planes[index].stored = Plane::new(a, b, c, d);
        if self.clip_planes[index].enabled == Some(true) {
            self.push_clip_plane(driver, index);
        }
        Ok(())
    }

    /// Enables or disables a clip plane. Enabling pushes the stored equation,
    /// which is degenerate if the plane was never set.
    pub fn enable_clip_plane(
        &mut self,
        driver: &mut dyn GlDriver,
        index: usize,
        enabled: bool,
    ) -> Result<(), RenderError> {
        self.check_clip_plane(index)?;
        if enabled {
            self.push_clip_plane(driver, index);
        }
        self.set_enabled(driver, GL_CLIP_PLANE0 + index as GLenum, enabled);
        self.clip_planes[index].enabled = Some(enabled);
        Ok(())
    }

    /// The mirror of a clip plane.
    pub fn clip_plane(&self, index: usize) -> Option<&ClipPlaneState> {
        self.clip_planes.get(index)
    }

    /// Forgets the pushed equations. `glClipPlane` stores planes in eye space,
    /// so they must be pushed again when the view matrix changes.
    pub fn forget_clip_plane_equations(&mut self) {
        for plane in &mut self.clip_planes {
            plane.pushed = None;
        }
    }

    // --- Viewport and scissor ---

    /// Enables or disables the scissor test and sets its box, in window
    /// coordinates with a bottom-left origin.
    pub fn set_scissor(&mut self, driver: &mut dyn GlDriver, enabled: bool, rect: [i32; 4]) {
        self.set_enabled(driver, GL_SCISSOR_TEST, enabled);
        self.set_scissor_box(driver, rect);
    }

    /// Sets the scissor box without touching the scissor test.
    pub fn set_scissor_box(&mut self, driver: &mut dyn GlDriver, rect: [i32; 4]) {
        if self.scissor_box == Some(rect) {
            self.elide("scissor box");
            return;
        }
        driver.scissor(rect[0], rect[1], rect[2], rect[3]);
        self.scissor_box = Some(rect);
    }

    /// The scissor box, if known.
    pub fn scissor_box(&self) -> Option<[i32; 4]> {
        self.scissor_box
    }

    /// Sets the viewport, in window coordinates with a bottom-left origin.
    pub fn set_viewport(&mut self, driver: &mut dyn GlDriver, rect: [i32; 4]) {
        if self.viewport == Some(rect) {
            self.elide("viewport");
            return;
        }
        driver.viewport(rect[0], rect[1], rect[2], rect[3]);
        self.viewport = Some(rect);
    }

    /// The viewport, if known.
    pub fn viewport(&self) -> Option<[i32; 4]> {
        self.viewport
    }

    // --- Fixed-function matrices ---

    fn set_matrix_mode(&mut self, driver: &mut dyn GlDriver, mode: GLenum) {
        if self.matrix_mode == Some(mode) {
            self.elide("matrix mode");
            return;
        }
        driver.matrix_mode(mode);
        self.matrix_mode = Some(mode);
    }

    /// Loads the model-view matrix.
    pub fn set_modelview_matrix(
        &mut self,
        driver: &mut dyn GlDriver,
        matrix: &Mat4,
    ) -> Result<(), RenderError> {
        self.require(Features::FIXED_FUNCTION, "fixed-function transforms")?;
        if self.modelview.as_ref() == Some(matrix) {
            self.elide("model-view matrix");
            return Ok(());
        }
        self.set_matrix_mode(driver, GL_MODELVIEW);
        driver.load_matrix(&matrix.to_cols_array());
        self.modelview = Some(*matrix);
        Ok(())
    }

    /// Loads the projection matrix.
    pub fn set_projection_matrix(
        &mut self,
        driver: &mut dyn GlDriver,
        matrix: &Mat4,
    ) -> Result<(), RenderError> {
        self.require(Features::FIXED_FUNCTION, "fixed-function transforms")?;
        if self.projection.as_ref() == Some(matrix) {
            self.elide("projection matrix");
            return Ok(());
        }
        self.set_matrix_mode(driver, GL_PROJECTION);
        driver.load_matrix(&matrix.to_cols_array());
        self.set_matrix_mode(driver, GL_MODELVIEW);
        self.projection = Some(*matrix);
        Ok(())
    }

    /// The model-view matrix, if known.
    pub fn modelview_matrix(&self) -> Option<&Mat4> {
        self.modelview.as_ref()
    }

    // --- Lights ---

    /// Enables or disables a fixed-function light.
    pub fn set_light_enabled(
        &mut self,
        driver: &mut dyn GlDriver,
        index: usize,
        enabled: bool,
    ) -> Result<(), RenderError> {
        self.require(Features::FIXED_FUNCTION, "fixed-function lighting")?;
        if index >= self.limits.lights {
            return Err(RenderError::out_of_range(
                LimitKind::Light,
                index,
                self.limits.lights,
            ));
        }
        self.set_enabled(driver, GL_LIGHT0 + index as GLenum, enabled);
        Ok(())
    }

    // --- Programs ---

    /// Binds a program to a stage; `None` unbinds it.
    ///
    /// ## Returns
    /// `true` if the driver binding changed.
    pub fn bind_program(
        &mut self,
        driver: &mut dyn GlDriver,
        stage: GpuProgramType,
        program: Option<u32>,
    ) -> Result<bool, RenderError> {
        let id = program.unwrap_or(0);
        if id != 0 {
            self.require(Features::PROGRAMMABLE_PIPELINE, "GPU programs")?;
            if stage == GpuProgramType::Geometry {
                self.require(Features::GEOMETRY_PROGRAMS, "geometry programs")?;
            }
        }
        let slot = stage.index();
        if self.programs[slot] == Some(id) {
            self.elide("program binding");
            return Ok(false);
        }
        driver.use_program_stage(stage.into_gl(), id);
        self.programs[slot] = Some(id);
        Ok(true)
    }

    /// The program bound to a stage, if known. `Some(0)` means unbound.
    pub fn bound_program(&self, stage: GpuProgramType) -> Option<u32> {
        self.programs[stage.index()]
    }

    // --- Buffers and vertex arrays ---

    /// Binds a buffer to a target.
    pub fn bind_buffer(&mut self, driver: &mut dyn GlDriver, target: GLenum, buffer: BufferId) {
        if self.buffers.get(&target) == Some(&buffer.0) {
            self.elide("buffer binding");
            return;
        }
        driver.bind_buffer(target, buffer.0);
        self.buffers.insert(target, buffer.0);
    }

    /// The buffer bound to a target, if known.
    pub fn bound_buffer(&self, target: GLenum) -> Option<BufferId> {
        self.buffers.get(&target).copied().map(BufferId)
    }

    fn check_attrib(&self, index: u32) -> Result<usize, RenderError> {
        let i = index as usize;
        if i < self.attrib_arrays.len() {
            Ok(i)
        } else {
            Err(RenderError::out_of_range(
                LimitKind::VertexAttribute,
                i,
                self.attrib_arrays.len(),
            ))
        }
    }

    /// Enables or disables a vertex attribute array.
    pub fn set_vertex_attrib_array(
        &mut self,
        driver: &mut dyn GlDriver,
        index: u32,
        enabled: bool,
    ) -> Result<(), RenderError> {
        let i = self.check_attrib(index)?;
        if self.attrib_arrays[i] == Some(enabled) {
            self.elide("vertex attribute array");
            return Ok(());
        }
        if enabled {
            driver.enable_vertex_attrib_array(index);
        } else {
            driver.disable_vertex_attrib_array(index);
        }
        self.attrib_arrays[i] = Some(enabled);
        Ok(())
    }

    /// Sets the instance divisor of a vertex attribute.
    pub fn set_vertex_attrib_divisor(
        &mut self,
        driver: &mut dyn GlDriver,
        index: u32,
        divisor: u32,
    ) -> Result<(), RenderError> {
        let i = self.check_attrib(index)?;
        if self.attrib_divisors[i] == Some(divisor) {
            self.elide("vertex attribute divisor");
            return Ok(());
        }
        if !self.limits.features.contains(Features::INSTANCING) {
            if divisor != 0 {
                return Err(RenderError::UnsupportedFeature("instancing".to_string()));
            }
            self.attrib_divisors[i] = Some(0);
            return Ok(());
        }
        driver.vertex_attrib_divisor(index, divisor);
        self.attrib_divisors[i] = Some(divisor);
        Ok(())
    }

    /// Indices of the attribute arrays known to be enabled, ascending.
    pub fn enabled_vertex_attribs(&self) -> Vec<u32> {
        self.attrib_arrays
            .iter()
            .enumerate()
            .filter(|(_, enabled)| **enabled == Some(true))
            .map(|(i, _)| i as u32)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::headless::{GlCall, HeadlessDriver};
    use rhea_core::renderer::BlendFactor;

    fn desktop() -> (HeadlessDriver, StateCache) {
        let driver = HeadlessDriver::desktop_compat();
        let cache = StateCache::new(CacheLimits::from(&driver.expected_capabilities()));
        (driver, cache)
    }

    #[test]
    fn repeated_depth_function_is_elided() {
        let (mut driver, mut cache) = desktop();
        cache.set_depth_function(&mut driver, CompareFunction::LessEqual);
        cache.set_depth_function(&mut driver, CompareFunction::LessEqual);
        assert_eq!(driver.calls(), &[GlCall::DepthFunc(GL_LEQUAL)]);
        assert_eq!(cache.elided_calls(), 1);
    }

    #[test]
    fn coord_set_requests_are_not_counted_as_elided() {
        let (driver, mut cache) = desktop();
        cache.set_texture_coord_set(1, 0).unwrap();
        cache.set_texture_coord_set(1, 0).unwrap();
        assert_eq!(cache.texture_coord_set(1), 0);
        assert_eq!(cache.elided_calls(), 0);
        assert!(driver.calls().is_empty());
    }

    #[test]
    fn invalidate_forces_re_emission() {
        let (mut driver, mut cache) = desktop();
        cache.set_line_width(&mut driver, 2.0);
        cache.invalidate();
        cache.set_line_width(&mut driver, 2.0);
        assert_eq!(driver.count(|c| matches!(c, GlCall::LineWidth(_))), 2);
    }

    #[test]
    fn texture_type_change_resets_sampler_mirror() {
        let (mut driver, mut cache) = desktop();
        let tex2d = TextureHandle::new(5, TextureType::D2);
        let cube = TextureHandle::new(6, TextureType::CubeMap);

        cache.set_texture(&mut driver, 0, true, Some(tex2d)).unwrap();
        cache
            .set_texture_unit_filtering(&mut driver, 0, FilterType::Mag, FilterOptions::Linear)
            .unwrap();
        assert_eq!(cache.texture_unit(0).unwrap().mag_filter, Some(GL_LINEAR));

        cache.set_texture(&mut driver, 0, true, Some(cube)).unwrap();
        assert_eq!(cache.texture_unit(0).unwrap().mag_filter, None);
        assert!(driver.calls().contains(&GlCall::Disable(GL_TEXTURE_2D)));
        assert!(driver.calls().contains(&GlCall::Enable(GL_TEXTURE_CUBE_MAP)));
    }

    #[test]
    fn disabling_fixed_function_unit_restores_modulate() {
        let (mut driver, mut cache) = desktop();
        let tex = TextureHandle::new(9, TextureType::D2);
        cache.set_texture(&mut driver, 1, true, Some(tex)).unwrap();
        driver.clear_calls();

        cache.set_texture(&mut driver, 1, false, None).unwrap();
        assert_eq!(
            driver.calls(),
            &[
                GlCall::Disable(GL_TEXTURE_2D),
                GlCall::TexEnvMode(GL_MODULATE),
                GlCall::BindTexture(GL_TEXTURE_2D, 0),
            ]
        );
    }

    #[test]
    fn mip_change_reuses_last_min_filter() {
        let (mut driver, mut cache) = desktop();
        cache
            .set_texture(&mut driver, 0, true, Some(TextureHandle::new(1, TextureType::D2)))
            .unwrap();
        cache
            .set_texture_unit_filtering(&mut driver, 0, FilterType::Min, FilterOptions::Point)
            .unwrap();
        driver.clear_calls();
        cache
            .set_texture_unit_filtering(&mut driver, 0, FilterType::Mip, FilterOptions::Linear)
            .unwrap();
        assert_eq!(
            driver.calls(),
            &[GlCall::TexParameterI(
                GL_TEXTURE_2D,
                GL_TEXTURE_MIN_FILTER,
                GL_NEAREST_MIPMAP_LINEAR as i32
            )]
        );
    }

    #[test]
    fn filtering_without_texture_is_invalid_state() {
        let (mut driver, mut cache) = desktop();
        let result =
            cache.set_texture_unit_filtering(&mut driver, 0, FilterType::Mag, FilterOptions::Linear);
        assert!(matches!(result, Err(RenderError::InvalidState(_))));
        assert!(driver.calls().is_empty());
    }

    #[test]
    fn blend_factor_change_only_emits_factors() {
        let (mut driver, mut cache) = desktop();
        cache
            .set_blend_state(&mut driver, &ColourBlendState::alpha_blending())
            .unwrap();
        driver.clear_calls();

        let additive = ColourBlendState::from_factors(BlendFactor::One, BlendFactor::One);
        cache.set_blend_state(&mut driver, &additive).unwrap();
        assert_eq!(
            driver.calls(),
            &[GlCall::BlendFuncSeparate(GL_ONE, GL_ONE, GL_ONE, GL_ONE)]
        );
        assert_eq!(cache.blend_state(), Some(additive));
    }

    #[test]
    fn two_sided_stencil_inverts_back_face_ops() {
        let (mut driver, mut cache) = desktop();
        let state = StencilState {
            enabled: true,
            pass_op: StencilOperation::Increment,
            two_sided: true,
            ..Default::default()
        };
        cache.set_stencil_params(&mut driver, &state, false).unwrap();
        assert!(driver
            .calls()
            .contains(&GlCall::StencilOpSeparate(GL_BACK, GL_KEEP, GL_KEEP, GL_DECR)));
        assert!(driver
            .calls()
            .contains(&GlCall::StencilOpSeparate(GL_FRONT, GL_KEEP, GL_KEEP, GL_INCR)));
    }

    #[test]
    fn one_sided_stencil_is_idempotent() {
        let (mut driver, mut cache) = desktop();
        let state = StencilState {
            enabled: true,
            compare: CompareFunction::Equal,
            reference: 1,
            ..Default::default()
        };
        cache.set_stencil_params(&mut driver, &state, false).unwrap();
        let first = driver.calls().len();
        cache.set_stencil_params(&mut driver, &state, false).unwrap();
        assert_eq!(driver.calls().len(), first);
    }

    #[test]
    fn depth_bias_uses_negated_slope_and_constant() {
        let (mut driver, mut cache) = desktop();
        cache.set_depth_bias(&mut driver, 2.0, 1.5);
        assert!(driver.calls().contains(&GlCall::PolygonOffset(-1.5, -2.0)));
        assert!(driver.calls().contains(&GlCall::Enable(GL_POLYGON_OFFSET_FILL)));
    }

    #[test]
    fn out_of_range_attribute_issues_nothing() {
        let (mut driver, mut cache) = desktop();
        let limit = cache.limits().vertex_attribs;
        let result = cache.set_vertex_attrib_array(&mut driver, limit as u32, true);
        assert_eq!(
            result,
            Err(RenderError::out_of_range(
                LimitKind::VertexAttribute,
                limit,
                limit
            ))
        );
        assert!(driver.calls().is_empty());
    }

    #[test]
    fn polygon_mode_requires_feature_on_es() {
        let mut driver = HeadlessDriver::videocore_iv();
        let mut cache = StateCache::new(CacheLimits::from(&driver.expected_capabilities()));
        assert!(cache.set_polygon_mode(&mut driver, PolygonMode::Solid).is_ok());
        assert!(matches!(
            cache.set_polygon_mode(&mut driver, PolygonMode::Wireframe),
            Err(RenderError::UnsupportedFeature(_))
        ));
        assert!(driver.calls().is_empty());
    }
}
