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

use crate::math::{LinearRgba, Mat4, Plane, Rect};
use crate::renderer::api::*;
use crate::renderer::error::{ConfigError, RenderError};
use crate::renderer::light::Light;

/// The backend-agnostic render system façade.
///
/// Callers follow a fixed per-frame sequence: begin frame, set the render
/// target, set matrices, lights and material state per drawable, call
/// [`render`](RenderSystem::render) per draw, end frame.
///
/// Implementations are bound to the thread that owns the graphics context, so
/// the trait requires neither `Send` nor `Sync`.
pub trait RenderSystem: std::fmt::Debug {
    /// A human-readable backend name.
    fn name(&self) -> &str;

    /// The configuration options published by the display support.
    fn config_options(&self) -> &ConfigOptions;

    /// Changes a configuration option. Fails once the first window exists.
    fn set_config_option(&mut self, name: &str, value: &str) -> Result<(), ConfigError>;

    /// The probed capabilities, available once the first window exists.
    fn capabilities(&self) -> Option<&Capabilities>;

    // --- Render targets ---

    /// Creates a window with its own context. The first window creates the
    /// main context and runs the capability probe.
    fn create_render_window(&mut self, desc: RenderTargetDesc)
        -> Result<RenderTargetId, RenderError>;

    /// Creates an offscreen target sharing the main context.
    fn create_offscreen_target(
        &mut self,
        desc: RenderTargetDesc,
    ) -> Result<RenderTargetId, RenderError>;

    /// Destroys a target. Its context is unregistered before it is destroyed.
    fn destroy_render_target(&mut self, target: RenderTargetId) -> Result<(), RenderError>;

    /// Makes `target` the destination of subsequent draws.
    fn set_render_target(&mut self, target: RenderTargetId) -> Result<(), RenderError>;

    /// Sets the viewport of the current target.
    fn set_viewport(&mut self, viewport: Viewport) -> Result<(), RenderError>;

    // --- Matrices ---

    /// Sets the world matrix.
    fn set_world_matrix(&mut self, matrix: &Mat4);
    /// Sets the view matrix.
    fn set_view_matrix(&mut self, matrix: &Mat4);
    /// Sets the projection matrix.
    fn set_projection_matrix(&mut self, matrix: &Mat4);

    // --- Lighting ---

    /// Uses the first `limit` lights of `lights`; remaining slots are disabled.
    fn use_lights(&mut self, lights: &[Light], limit: usize) -> Result<(), RenderError>;
    /// Sets the global ambient light colour.
    fn set_ambient_light(&mut self, colour: LinearRgba) -> Result<(), RenderError>;
    /// Enables or disables fixed-function lighting.
    fn set_lighting_enabled(&mut self, enabled: bool) -> Result<(), RenderError>;
    /// Renormalizes normals after transformation.
    fn set_normalise_normals(&mut self, enabled: bool) -> Result<(), RenderError>;
    /// Selects which surface colours follow the vertex colour.
    fn set_surface_tracking(&mut self, tracking: TrackVertexColour) -> Result<(), RenderError>;
    /// Sets the material colours used by lighting.
    fn set_surface_params(&mut self, params: &SurfaceParams) -> Result<(), RenderError>;
    /// Sets the fog mode, colour, density and range.
    fn set_fog_params(&mut self, fog: &FogParams) -> Result<(), RenderError>;

    // --- Textures ---

    /// Binds or unbinds a texture on a unit.
    fn set_texture(
        &mut self,
        unit: usize,
        enabled: bool,
        texture: Option<TextureHandle>,
    ) -> Result<(), RenderError>;
    /// Applies a full sampler description to a unit.
    fn set_sampler(&mut self, unit: usize, sampler: &SamplerState) -> Result<(), RenderError>;
    /// Sets one filter stage of a unit.
    fn set_texture_unit_filtering(
        &mut self,
        unit: usize,
        filter_type: FilterType,
        options: FilterOptions,
    ) -> Result<(), RenderError>;
    /// Sets the maximum anisotropy of a unit.
    fn set_texture_anisotropy(&mut self, unit: usize, level: f32) -> Result<(), RenderError>;
    /// Sets the addressing mode of a unit.
    fn set_texture_addressing_mode(
        &mut self,
        unit: usize,
        uvw: UvwAddressingMode,
    ) -> Result<(), RenderError>;
    /// Selects the texture coordinate set read by a unit.
    fn set_texture_coord_set(&mut self, unit: usize, index: u32) -> Result<(), RenderError>;
    /// Sets the fixed-function combine mode of a unit.
    fn set_texture_blend_mode(
        &mut self,
        unit: usize,
        mode: TextureBlendMode,
    ) -> Result<(), RenderError>;
    /// Sets the fixed-function texture matrix of a unit.
    fn set_texture_matrix(&mut self, unit: usize, matrix: &Mat4) -> Result<(), RenderError>;

    // --- Fixed pipeline state ---

    /// Sets the blend equations and colour write mask.
    fn set_colour_blend_state(&mut self, state: &ColourBlendState) -> Result<(), RenderError>;
    /// Sets depth test, depth write and the compare function together.
    fn set_depth_buffer_params(
        &mut self,
        test: bool,
        write: bool,
        function: CompareFunction,
    ) -> Result<(), RenderError>;
    /// Enables or disables the depth test.
    fn set_depth_check_enabled(&mut self, enabled: bool) -> Result<(), RenderError>;
    /// Enables or disables depth writes.
    fn set_depth_write_enabled(&mut self, enabled: bool) -> Result<(), RenderError>;
    /// Sets the depth compare function.
    fn set_depth_function(&mut self, function: CompareFunction) -> Result<(), RenderError>;
    /// Sets the depth bias.
    fn set_depth_bias(&mut self, bias: DepthBias) -> Result<(), RenderError>;
    /// Enables or disables the stencil test.
    fn set_stencil_check_enabled(&mut self, enabled: bool) -> Result<(), RenderError>;
    /// Sets the stencil functions, operations and masks.
    fn set_stencil_buffer_params(&mut self, state: &StencilState) -> Result<(), RenderError>;
    /// Sets the culling mode. The current target's flipping is applied.
    fn set_culling_mode(&mut self, mode: CullingMode) -> Result<(), RenderError>;
    /// Sets the polygon rasterization mode.
    fn set_polygon_mode(&mut self, mode: PolygonMode) -> Result<(), RenderError>;
    /// Sets the shading model.
    fn set_shading_type(&mut self, shade: ShadeOptions) -> Result<(), RenderError>;
    /// Sets the fog mode only.
    fn set_fog(&mut self, mode: FogMode) -> Result<(), RenderError>;
    /// Sets the alpha test.
    fn set_alpha_reject_settings(
        &mut self,
        function: CompareFunction,
        value: u8,
        alpha_to_coverage: bool,
    ) -> Result<(), RenderError>;
    /// Sets the rasterized line width.
    fn set_line_width(&mut self, width: f32) -> Result<(), RenderError>;
    /// Enables or disables point sprites.
    fn set_point_sprites_enabled(&mut self, enabled: bool) -> Result<(), RenderError>;
    /// Stores the equation of a user clip plane.
    fn set_clip_plane(&mut self, index: usize, plane: Plane) -> Result<(), RenderError>;
    /// Enables or disables a user clip plane.
    fn enable_clip_plane(&mut self, index: usize, enabled: bool) -> Result<(), RenderError>;
    /// Replaces the full list of active clip planes; remaining planes are
    /// disabled.
    fn set_clip_planes(&mut self, planes: &[Plane]) -> Result<(), RenderError>;
    /// Enables or disables the scissor test for a rectangle of the current
    /// target.
    fn set_scissor_test(&mut self, enabled: bool, rect: Rect) -> Result<(), RenderError>;
    /// Clears buffers of the current viewport.
    fn clear_frame_buffer(
        &mut self,
        buffers: FrameBufferType,
        colour: LinearRgba,
        depth: f32,
        stencil: u32,
    ) -> Result<(), RenderError>;

    // --- Programs ---

    /// Binds a program to its stage.
    fn bind_gpu_program(&mut self, program: &GpuProgram) -> Result<(), RenderError>;
    /// Unbinds the program of a stage.
    fn unbind_gpu_program(&mut self, stage: GpuProgramType) -> Result<(), RenderError>;
    /// Uploads the constants of `params` whose variability intersects `mask`.
    fn bind_gpu_program_parameters(
        &mut self,
        stage: GpuProgramType,
        params: &GpuProgramParameters,
        mask: VariabilityMask,
    ) -> Result<(), RenderError>;
    /// Builds a parameter block emulating the fixed-function pipeline from the
    /// current matrices, lights, surface and fog state.
    fn fixed_function_params(
        &mut self,
        tracking: TrackVertexColour,
        fog: FogMode,
    ) -> GpuProgramParametersPtr;
    /// Applies a fixed-function parameter block.
    fn apply_fixed_function_params(
        &mut self,
        params: &GpuProgramParameters,
        mask: VariabilityMask,
    ) -> Result<(), RenderError>;

    // --- Draw and frame ---

    /// Issues a draw call.
    fn render(&mut self, op: &RenderOperation) -> Result<(), RenderError>;
    /// Starts a frame.
    fn begin_frame(&mut self) -> Result<(), RenderError>;
    /// Ends a frame.
    fn end_frame(&mut self) -> Result<(), RenderError>;
    /// Presents a window target.
    fn swap_buffers(&mut self, target: RenderTargetId) -> Result<(), RenderError>;
    /// Statistics of the last completed frame.
    fn last_frame_stats(&self) -> &RenderStats;

    /// Releases every target and context.
    fn shutdown(&mut self);

    /// Downcast to Any for type-specific access.
    fn as_any(&self) -> &dyn std::any::Any;
    /// Mutable downcast to Any.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
