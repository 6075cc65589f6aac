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

//! A `GlDriver` that records every call instead of talking to a GPU.

use std::any::Any;
use std::collections::{HashMap, VecDeque};

use rhea_core::renderer::Capabilities;

use crate::graphics::gl::capabilities::{detect_capabilities, ProbeOptions};
use crate::graphics::gl::enums::*;
use crate::graphics::gl::GlDriver;

/// One recorded driver call.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    Enable(GLenum),
    Disable(GLenum),
    ActiveTexture(GLenum),
    BindTexture(GLenum, u32),
    TexParameterI(GLenum, GLenum, i32),
    TexParameterF(GLenum, GLenum, f32),
    TexEnvMode(GLenum),
    BlendFuncSeparate(GLenum, GLenum, GLenum, GLenum),
    BlendEquationSeparate(GLenum, GLenum),
    ColorMask(bool, bool, bool, bool),
    DepthMask(bool),
    DepthFunc(GLenum),
    PolygonOffset(f32, f32),
    StencilFuncSeparate(GLenum, GLenum, i32, u32),
    StencilOpSeparate(GLenum, GLenum, GLenum, GLenum),
    StencilMaskSeparate(GLenum, u32),
    AlphaFunc(GLenum, f32),
    CullFace(GLenum),
    PolygonMode(GLenum, GLenum),
    ShadeModel(GLenum),
    LineWidth(f32),
    Scissor(i32, i32, i32, i32),
    Viewport(i32, i32, i32, i32),
    ClipPlane(GLenum, [f64; 4]),
    MatrixMode(GLenum),
    LoadMatrix([f32; 16]),
    LightFv(GLenum, GLenum, Vec<f32>),
    LightModelFv(GLenum, Vec<f32>),
    MaterialFv(GLenum, GLenum, Vec<f32>),
    ColorMaterial(GLenum, GLenum),
    FogI(GLenum, i32),
    FogFv(GLenum, Vec<f32>),
    UseProgramStage(GLenum, u32),
    UniformFv {
        program: u32,
        location: i32,
        values: Vec<f32>,
    },
    UniformI {
        program: u32,
        location: i32,
        value: i32,
    },
    BindBuffer(GLenum, u32),
    VertexAttribPointer {
        index: u32,
        size: i32,
        ty: GLenum,
        normalized: bool,
        stride: i32,
        offset: usize,
    },
    EnableVertexAttribArray(u32),
    DisableVertexAttribArray(u32),
    VertexAttribDivisor(u32, u32),
    DrawArrays {
        mode: GLenum,
        first: i32,
        count: i32,
        instances: u32,
    },
    DrawElements {
        mode: GLenum,
        count: i32,
        ty: GLenum,
        offset: usize,
        instances: u32,
    },
    ClearColor(f32, f32, f32, f32),
    ClearDepth(f32),
    ClearStencil(i32),
    Clear(u32),
    DrawBuffer(GLenum),
    PushDebugGroup(String),
    PopDebugGroup,
    InsertDebugMarker(String),
}

/// What a headless driver reports when queried.
#[derive(Debug, Clone, Default)]
pub struct DriverStrings {
    /// `GL_VENDOR`.
    pub vendor: String,
    /// `GL_RENDERER`.
    pub renderer: String,
    /// `GL_VERSION`.
    pub version: String,
    /// `GL_EXTENSIONS`, space separated.
    pub extensions: String,
}

/// A driver that records calls and answers queries from a fixed profile.
#[derive(Debug, Clone)]
pub struct HeadlessDriver {
    strings: DriverStrings,
    integers: HashMap<GLenum, i32>,
    floats: HashMap<GLenum, f32>,
    calls: Vec<GlCall>,
    errors: VecDeque<GLenum>,
    locations: HashMap<(u32, String), i32>,
}

impl HeadlessDriver {
    /// Creates a driver answering with the given strings and no limits.
    pub fn new(strings: DriverStrings) -> Self {
        Self {
            strings,
            integers: HashMap::new(),
            floats: HashMap::new(),
            calls: Vec::new(),
            errors: VecDeque::new(),
            locations: HashMap::new(),
        }
    }

    /// A VideoCore IV class OpenGL ES 2.0 driver: shader-only, 8 texture
    /// units, no clip planes.
    pub fn videocore_iv() -> Self {
        Self::new(DriverStrings {
            vendor: "Broadcom".to_string(),
            renderer: "VideoCore IV HW".to_string(),
            version: "OpenGL ES 2.0".to_string(),
            extensions: [
                "GL_OES_compressed_ETC1_RGB8_texture",
                "GL_OES_compressed_paletted_texture",
                "GL_OES_texture_npot",
                "GL_OES_depth24",
                "GL_OES_vertex_half_float",
                "GL_OES_EGL_image",
                "GL_OES_EGL_image_external",
                "GL_EXT_discard_framebuffer",
                "GL_OES_rgb8_rgba8",
                "GL_OES_depth32",
                "GL_OES_mapbuffer",
                "GL_EXT_texture_format_BGRA8888",
                "GL_APPLE_rgb_422",
                "GL_EXT_debug_marker",
            ]
            .join(" "),
        })
        .with_integer(GL_MAX_TEXTURE_IMAGE_UNITS, 8)
        .with_integer(GL_MAX_VERTEX_ATTRIBS, 8)
    }

    /// A desktop compatibility-profile GL 2.1 driver with the fixed-function
    /// pipeline, 8 lights and 8 clip planes (clamped to 6 by the probe).
    pub fn desktop_compat() -> Self {
        Self::new(DriverStrings {
            vendor: "Mesa".to_string(),
            renderer: "llvmpipe (LLVM 15.0.7, 256 bits)".to_string(),
            version: "2.1 Mesa 23.0.4".to_string(),
            extensions: [
                "GL_ARB_multitexture",
                "GL_ARB_texture_cube_map",
                "GL_EXT_texture3D",
                "GL_EXT_texture_array",
                "GL_EXT_texture_filter_anisotropic",
                "GL_EXT_stencil_two_side",
                "GL_EXT_stencil_wrap",
                "GL_EXT_blend_minmax",
                "GL_EXT_blend_func_separate",
                "GL_ARB_point_sprite",
                "GL_ARB_instanced_arrays",
                "GL_ARB_draw_instanced",
                "GL_ARB_geometry_shader4",
                "GL_KHR_debug",
            ]
            .join(" "),
        })
        .with_integer(GL_MAX_TEXTURE_UNITS, 8)
        .with_integer(GL_MAX_TEXTURE_IMAGE_UNITS, 16)
        .with_integer(GL_MAX_LIGHTS, 8)
        .with_integer(GL_MAX_CLIP_PLANES, 8)
        .with_integer(GL_MAX_VERTEX_ATTRIBS, 16)
        .with_float(GL_MAX_TEXTURE_MAX_ANISOTROPY_EXT, 16.0)
    }

    /// Answers `get_integer(name)` with `value`.
    pub fn with_integer(mut self, name: GLenum, value: i32) -> Self {
        self.integers.insert(name, value);
        self
    }

    /// Answers `get_float(name)` with `value`.
    pub fn with_float(mut self, name: GLenum, value: f32) -> Self {
        self.floats.insert(name, value);
        self
    }

    /// The capabilities a probe of this driver yields, with no provider
    /// extensions.
    pub fn expected_capabilities(&self) -> Capabilities {
        let mut scratch = self.clone();
        detect_capabilities(&mut scratch, ProbeOptions::default()).unwrap_or_default()
    }

    /// Makes the next `get_error` return `code`.
    pub fn inject_error(&mut self, code: GLenum) {
        self.errors.push_back(code);
    }

    /// All calls recorded so far.
    pub fn calls(&self) -> &[GlCall] {
        &self.calls
    }

    /// Takes the recorded calls, leaving the log empty.
    pub fn take_calls(&mut self) -> Vec<GlCall> {
        std::mem::take(&mut self.calls)
    }

    /// Clears the call log.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Counts the recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&GlCall) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }

    fn record(&mut self, call: GlCall) {
        log::trace!("GL: {call:?}");
        self.calls.push(call);
    }
}

impl GlDriver for HeadlessDriver {
    fn get_string(&mut self, name: GLenum) -> Option<String> {
        match name {
            GL_VENDOR => Some(self.strings.vendor.clone()),
            GL_RENDERER => Some(self.strings.renderer.clone()),
            GL_VERSION => Some(self.strings.version.clone()),
            GL_EXTENSIONS => Some(self.strings.extensions.clone()),
            _ => None,
        }
    }

    fn get_integer(&mut self, name: GLenum) -> Option<i32> {
        self.integers.get(&name).copied()
    }

    fn get_float(&mut self, name: GLenum) -> Option<f32> {
        self.floats.get(&name).copied()
    }

    fn get_error(&mut self) -> GLenum {
        self.errors.pop_front().unwrap_or(GL_NO_ERROR)
    }

    fn enable(&mut self, cap: GLenum) {
        self.record(GlCall::Enable(cap));
    }

    fn disable(&mut self, cap: GLenum) {
        self.record(GlCall::Disable(cap));
    }

    fn active_texture(&mut self, unit: GLenum) {
        self.record(GlCall::ActiveTexture(unit));
    }

    fn bind_texture(&mut self, target: GLenum, texture: u32) {
        self.record(GlCall::BindTexture(target, texture));
    }

    fn tex_parameter_i(&mut self, target: GLenum, pname: GLenum, value: i32) {
        self.record(GlCall::TexParameterI(target, pname, value));
    }

    fn tex_parameter_f(&mut self, target: GLenum, pname: GLenum, value: f32) {
        self.record(GlCall::TexParameterF(target, pname, value));
    }

    fn tex_env_mode(&mut self, mode: GLenum) {
        self.record(GlCall::TexEnvMode(mode));
    }

    fn blend_func_separate(
        &mut self,
        src_rgb: GLenum,
        dst_rgb: GLenum,
        src_alpha: GLenum,
        dst_alpha: GLenum,
    ) {
        self.record(GlCall::BlendFuncSeparate(
            src_rgb, dst_rgb, src_alpha, dst_alpha,
        ));
    }

    fn blend_equation_separate(&mut self, rgb: GLenum, alpha: GLenum) {
        self.record(GlCall::BlendEquationSeparate(rgb, alpha));
    }

    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool) {
        self.record(GlCall::ColorMask(r, g, b, a));
    }

    fn depth_mask(&mut self, write: bool) {
        self.record(GlCall::DepthMask(write));
    }

    fn depth_func(&mut self, func: GLenum) {
        self.record(GlCall::DepthFunc(func));
    }

    fn polygon_offset(&mut self, factor: f32, units: f32) {
        self.record(GlCall::PolygonOffset(factor, units));
    }

    fn stencil_func_separate(&mut self, face: GLenum, func: GLenum, reference: i32, mask: u32) {
        self.record(GlCall::StencilFuncSeparate(face, func, reference, mask));
    }

    fn stencil_op_separate(&mut self, face: GLenum, fail: GLenum, depth_fail: GLenum, pass: GLenum) {
        self.record(GlCall::StencilOpSeparate(face, fail, depth_fail, pass));
    }

    fn stencil_mask_separate(&mut self, face: GLenum, mask: u32) {
        self.record(GlCall::StencilMaskSeparate(face, mask));
    }

    fn alpha_func(&mut self, func: GLenum, reference: f32) {
        self.record(GlCall::AlphaFunc(func, reference));
    }

    fn cull_face(&mut self, mode: GLenum) {
        self.record(GlCall::CullFace(mode));
    }

    fn polygon_mode(&mut self, face: GLenum, mode: GLenum) {
        self.record(GlCall::PolygonMode(face, mode));
    }

    fn shade_model(&mut self, mode: GLenum) {
        self.record(GlCall::ShadeModel(mode));
    }

    fn line_width(&mut self, width: f32) {
        self.record(GlCall::LineWidth(width));
    }

    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.record(GlCall::Scissor(x, y, width, height));
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.record(GlCall::Viewport(x, y, width, height));
    }

    fn clip_plane(&mut self, plane: GLenum, equation: [f64; 4]) {
        self.record(GlCall::ClipPlane(plane, equation));
    }

    fn matrix_mode(&mut self, mode: GLenum) {
        self.record(GlCall::MatrixMode(mode));
    }

    fn load_matrix(&mut self, matrix: &[f32; 16]) {
        self.record(GlCall::LoadMatrix(*matrix));
    }

    fn light_fv(&mut self, light: GLenum, pname: GLenum, params: &[f32]) {
        self.record(GlCall::LightFv(light, pname, params.to_vec()));
    }

    fn light_model_fv(&mut self, pname: GLenum, params: &[f32]) {
        self.record(GlCall::LightModelFv(pname, params.to_vec()));
    }

    fn material_fv(&mut self, face: GLenum, pname: GLenum, params: &[f32]) {
        self.record(GlCall::MaterialFv(face, pname, params.to_vec()));
    }

    fn color_material(&mut self, face: GLenum, mode: GLenum) {
        self.record(GlCall::ColorMaterial(face, mode));
    }

    fn fog_i(&mut self, pname: GLenum, value: i32) {
        self.record(GlCall::FogI(pname, value));
    }

    fn fog_fv(&mut self, pname: GLenum, params: &[f32]) {
        self.record(GlCall::FogFv(pname, params.to_vec()));
    }

    fn use_program_stage(&mut self, stage: GLenum, program: u32) {
        self.record(GlCall::UseProgramStage(stage, program));
    }

    fn uniform_location(&mut self, program: u32, name: &str) -> Option<i32> {
        let next = self.locations.len() as i32;
        Some(
            *self
                .locations
                .entry((program, name.to_string()))
                .or_insert(next),
        )
    }

    fn uniform_fv(&mut self, program: u32, location: i32, values: &[f32]) {
        self.record(GlCall::UniformFv {
            program,
            location,
            values: values.to_vec(),
        });
    }

    fn uniform_i(&mut self, program: u32, location: i32, value: i32) {
        self.record(GlCall::UniformI {
            program,
            location,
            value,
        });
    }

    fn bind_buffer(&mut self, target: GLenum, buffer: u32) {
        self.record(GlCall::BindBuffer(target, buffer));
    }

    fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        size: i32,
        ty: GLenum,
        normalized: bool,
        stride: i32,
        offset: usize,
    ) {
        self.record(GlCall::VertexAttribPointer {
            index,
            size,
            ty,
            normalized,
            stride,
            offset,
        });
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.record(GlCall::EnableVertexAttribArray(index));
    }

    fn disable_vertex_attrib_array(&mut self, index: u32) {
        self.record(GlCall::DisableVertexAttribArray(index));
    }

    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32) {
        self.record(GlCall::VertexAttribDivisor(index, divisor));
    }

    fn draw_arrays(&mut self, mode: GLenum, first: i32, count: i32, instances: u32) {
        self.record(GlCall::DrawArrays {
            mode,
            first,
            count,
            instances,
        });
    }

    fn draw_elements(&mut self, mode: GLenum, count: i32, ty: GLenum, offset: usize, instances: u32) {
        self.record(GlCall::DrawElements {
            mode,
            count,
            ty,
            offset,
            instances,
        });
    }

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.record(GlCall::ClearColor(r, g, b, a));
    }

    fn clear_depth(&mut self, depth: f32) {
        self.record(GlCall::ClearDepth(depth));
    }

    fn clear_stencil(&mut self, stencil: i32) {
        self.record(GlCall::ClearStencil(stencil));
    }

    fn clear(&mut self, mask: u32) {
        self.record(GlCall::Clear(mask));
    }

    fn draw_buffer(&mut self, buffer: GLenum) {
        self.record(GlCall::DrawBuffer(buffer));
    }

    fn push_debug_group(&mut self, name: &str) {
        self.record(GlCall::PushDebugGroup(name.to_string()));
    }

    fn pop_debug_group(&mut self) {
        self.record(GlCall::PopDebugGroup);
    }

    fn insert_debug_marker(&mut self, name: &str) {
        self.record(GlCall::InsertDebugMarker(name.to_string()));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injected_errors_are_reported_once() {
        let mut driver = HeadlessDriver::videocore_iv();
        driver.inject_error(GL_OUT_OF_MEMORY);
        assert_eq!(driver.get_error(), GL_OUT_OF_MEMORY);
        assert_eq!(driver.get_error(), GL_NO_ERROR);
    }

    #[test]
    fn uniform_locations_are_stable_per_program() {
        let mut driver = HeadlessDriver::videocore_iv();
        let a = driver.uniform_location(1, "world");
        let b = driver.uniform_location(1, "view");
        assert_ne!(a, b);
        assert_eq!(driver.uniform_location(1, "world"), a);
    }

    #[test]
    fn queries_are_not_recorded() {
        let mut driver = HeadlessDriver::desktop_compat();
        let _ = driver.get_string(GL_VERSION);
        let _ = driver.get_integer(GL_MAX_LIGHTS);
        driver.enable(GL_BLEND);
        assert_eq!(driver.calls(), &[GlCall::Enable(GL_BLEND)]);
    }
}
