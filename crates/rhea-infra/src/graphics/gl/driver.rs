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

//! The downstream interfaces of the GL backend.
//!
//! [`GlDriver`] mirrors the GL entry points the render system needs, taking
//! raw enum values. [`ContextProvider`] is the window-system side (EGL on the
//! embedded target): context creation, make-current and buffer swaps.
//! Both are implemented by a native binding in production and by the
//! recording backend in [`crate::graphics::headless`].

use std::any::Any;

use rhea_core::renderer::{ContextId, DriverError, RenderTargetDesc};

use super::enums::GLenum;

/// The GL entry points used by the render system.
///
/// Every method maps to one driver call. The state cache is the only caller
/// of the state-changing methods, so a call here always means a real change.
pub trait GlDriver: std::fmt::Debug {
    // --- Queries ---

    /// `glGetString`. Returns `None` if the name is not supported.
    fn get_string(&mut self, name: GLenum) -> Option<String>;
    /// `glGetIntegerv` for a single value.
    fn get_integer(&mut self, name: GLenum) -> Option<i32>;
    /// `glGetFloatv` for a single value.
    fn get_float(&mut self, name: GLenum) -> Option<f32>;
    /// `glGetError`.
    fn get_error(&mut self) -> GLenum;

    // --- Capabilities ---

    /// `glEnable`.
    fn enable(&mut self, cap: GLenum);
    /// `glDisable`.
    fn disable(&mut self, cap: GLenum);

    // --- Textures ---

    /// `glActiveTexture`.
    fn active_texture(&mut self, unit: GLenum);
    /// `glBindTexture`.
    fn bind_texture(&mut self, target: GLenum, texture: u32);
    /// `glTexParameteri`.
    fn tex_parameter_i(&mut self, target: GLenum, pname: GLenum, value: i32);
    /// `glTexParameterf`.
    fn tex_parameter_f(&mut self, target: GLenum, pname: GLenum, value: f32);
    /// `glTexEnvi(GL_TEXTURE_ENV, GL_TEXTURE_ENV_MODE, mode)`.
    fn tex_env_mode(&mut self, mode: GLenum);

    // --- Output merger ---

    /// `glBlendFuncSeparate`.
    fn blend_func_separate(
        &mut self,
        src_rgb: GLenum,
        dst_rgb: GLenum,
        src_alpha: GLenum,
        dst_alpha: GLenum,
    );
    /// `glBlendEquationSeparate`.
    fn blend_equation_separate(&mut self, rgb: GLenum, alpha: GLenum);
    /// `glColorMask`.
    fn color_mask(&mut self, r: bool, g: bool, b: bool, a: bool);
    /// `glDepthMask`.
    fn depth_mask(&mut self, write: bool);
    /// `glDepthFunc`.
    fn depth_func(&mut self, func: GLenum);
    /// `glPolygonOffset`.
    fn polygon_offset(&mut self, factor: f32, units: f32);
    /// `glStencilFuncSeparate`.
    fn stencil_func_separate(&mut self, face: GLenum, func: GLenum, reference: i32, mask: u32);
    /// `glStencilOpSeparate`.
    fn stencil_op_separate(&mut self, face: GLenum, fail: GLenum, depth_fail: GLenum, pass: GLenum);
    /// `glStencilMaskSeparate`.
    fn stencil_mask_separate(&mut self, face: GLenum, mask: u32);
    /// `glAlphaFunc` (fixed function).
    fn alpha_func(&mut self, func: GLenum, reference: f32);

    // --- Rasterizer ---

    /// `glCullFace`.
    fn cull_face(&mut self, mode: GLenum);
    /// `glPolygonMode` (desktop only).
    fn polygon_mode(&mut self, face: GLenum, mode: GLenum);
    /// `glShadeModel` (fixed function).
    fn shade_model(&mut self, mode: GLenum);
    /// `glLineWidth`.
    fn line_width(&mut self, width: f32);
    /// `glScissor`, in window coordinates with a bottom-left origin.
    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32);
    /// `glViewport`, in window coordinates with a bottom-left origin.
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    /// `glClipPlane` (fixed function).
    fn clip_plane(&mut self, plane: GLenum, equation: [f64; 4]);

    // --- Fixed-function transform, lighting and fog ---

    /// `glMatrixMode`.
    fn matrix_mode(&mut self, mode: GLenum);
    /// `glLoadMatrixf`, column-major.
    fn load_matrix(&mut self, matrix: &[f32; 16]);
    /// `glLightfv`.
    fn light_fv(&mut self, light: GLenum, pname: GLenum, params: &[f32]);
    /// `glLightModelfv`.
    fn light_model_fv(&mut self, pname: GLenum, params: &[f32]);
    /// `glMaterialfv`.
    fn material_fv(&mut self, face: GLenum, pname: GLenum, params: &[f32]);
    /// `glColorMaterial`.
    fn color_material(&mut self, face: GLenum, mode: GLenum);
    /// `glFogi`.
    fn fog_i(&mut self, pname: GLenum, value: i32);
    /// `glFogfv`.
    fn fog_fv(&mut self, pname: GLenum, params: &[f32]);

    // --- Programs ---

    /// Binds a program object to a stage (`GL_VERTEX_SHADER`, ...). `0`
    /// unbinds the stage.
    fn use_program_stage(&mut self, stage: GLenum, program: u32);
    /// `glGetUniformLocation`.
    fn uniform_location(&mut self, program: u32, name: &str) -> Option<i32>;
    /// `glProgramUniform{1,4,Matrix4}fv` depending on the value count.
    fn uniform_fv(&mut self, program: u32, location: i32, values: &[f32]);
    /// `glProgramUniform1i`.
    fn uniform_i(&mut self, program: u32, location: i32, value: i32);

    // --- Vertex input ---

    /// `glBindBuffer`.
    fn bind_buffer(&mut self, target: GLenum, buffer: u32);
    /// `glVertexAttribPointer` with a byte offset into the bound array buffer.
    fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        size: i32,
        ty: GLenum,
        normalized: bool,
        stride: i32,
        offset: usize,
    );
    /// `glEnableVertexAttribArray`.
    fn enable_vertex_attrib_array(&mut self, index: u32);
    /// `glDisableVertexAttribArray`.
    fn disable_vertex_attrib_array(&mut self, index: u32);
    /// `glVertexAttribDivisor`.
    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32);

    // --- Draws and clears ---

    /// `glDrawArrays` or `glDrawArraysInstanced` when `instances > 1`.
    fn draw_arrays(&mut self, mode: GLenum, first: i32, count: i32, instances: u32);
    /// `glDrawElements` or `glDrawElementsInstanced` when `instances > 1`.
    fn draw_elements(&mut self, mode: GLenum, count: i32, ty: GLenum, offset: usize, instances: u32);
    /// `glClearColor`.
    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32);
    /// `glClearDepthf`.
    fn clear_depth(&mut self, depth: f32);
    /// `glClearStencil`.
    fn clear_stencil(&mut self, stencil: i32);
    /// `glClear`.
    fn clear(&mut self, mask: u32);
    /// `glDrawBuffer`.
    fn draw_buffer(&mut self, buffer: GLenum);

    // --- Debug markers ---

    /// `glPushDebugGroup`.
    fn push_debug_group(&mut self, name: &str);
    /// `glPopDebugGroup`.
    fn pop_debug_group(&mut self);
    /// `glDebugMessageInsert` with a marker type.
    fn insert_debug_marker(&mut self, name: &str);

    /// Downcast to Any for type-specific access.
    fn as_any(&self) -> &dyn Any;
    /// Mutable downcast to Any.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The window-system side of context management.
pub trait ContextProvider: std::fmt::Debug {
    /// Creates a context for a window, sharing objects with `share_with`.
    fn create_context(
        &mut self,
        desc: &RenderTargetDesc,
        share_with: Option<ContextId>,
    ) -> Result<ContextId, DriverError>;

    /// Destroys a context. It must not be current.
    fn destroy_context(&mut self, context: ContextId);

    /// Makes a context current on the calling thread.
    fn make_current(&mut self, context: ContextId) -> Result<(), DriverError>;

    /// Releases the current context.
    fn release_current(&mut self);

    /// Presents the back buffer of a window context.
    fn swap_buffers(&mut self, context: ContextId) -> Result<(), DriverError>;

    /// The window-system extension string (e.g. `EGL_EXTENSIONS`).
    fn extension_string(&self) -> String;

    /// Whether quad-buffered stereo surfaces can be created.
    fn supports_stereo(&self) -> bool;

    /// Downcast to Any for type-specific access.
    fn as_any(&self) -> &dyn Any;
    /// Mutable downcast to Any.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Maps a `glGetError` code to a [`DriverError`].
///
/// `GL_NO_ERROR` maps to `None`.
pub fn driver_error_from_code(code: GLenum, call: &'static str) -> Option<DriverError> {
    use super::enums::*;
    match code {
        GL_NO_ERROR => None,
        GL_OUT_OF_MEMORY => Some(DriverError::OutOfMemory),
        GL_CONTEXT_LOST => Some(DriverError::ContextLost),
        GL_INVALID_OPERATION => Some(DriverError::InvalidOperation { call }),
        other => Some(DriverError::Unknown { code: other }),
    }
}
