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

//! The concrete, GL-based implementation of the `RenderSystem` trait.

use std::fmt;
use std::sync::Arc;

use rhea_core::event::EventBus;
use rhea_core::math::{LinearRgba, Mat4, Plane, Rect};
use rhea_core::renderer::{
    CameraId, Capabilities, ColorWrites, ColourBlendState, CompareFunction, ConfigError,
    ConfigOptions, ConstantValue, ContextId, CullingMode, DepthBias, Features, FilterOptions,
    FilterType, FogMode, FogParams, FrameBufferType, GpuProgram, GpuProgramParameters,
    GpuProgramParametersPtr, GpuProgramType, Light, LimitKind, ListenerEvent, PolygonMode,
    RenderError, RenderOperation, RenderStats, RenderSystem, RenderTargetDesc, RenderTargetId,
    SamplerState, SceneManagerId, ShadeOptions, StencilState, SurfaceParams, TextureBlendMode,
    TextureHandle, TrackVertexColour, UvwAddressingMode, VariabilityMask, VertexBufferBinding,
    VertexElement, VertexElementSemantic, Viewport,
};

use super::capabilities::{CapabilityProbe, ProbeOptions};
use super::context::ContextManager;
use super::conversions::IntoGl;
use super::driver::{driver_error_from_code, ContextProvider, GlDriver};
use super::enums::*;
use super::fixed_function::{self, FixedFunctionState};
use super::options;
use super::state_cache::{CacheLimits, StateCache};
use super::stereo::{StereoAction, StereoRenderer};
use super::targets::RenderTargetRegistry;

/// How a call to [`GlRenderSystem::render_target_frame`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was drawn and presented.
    Presented,
    /// The frame primed a stereo camera; nothing was drawn or presented.
    Primed,
}

fn no_context() -> RenderError {
    RenderError::InvalidState("no context is current".to_string())
}

fn no_target() -> RenderError {
    RenderError::InvalidState("no render target is set".to_string())
}

/// The concrete, GL-based implementation of the [`RenderSystem`] trait.
///
/// The render system owns the driver, the context provider and one
/// [`StateCache`] per context. Every state change goes through the cache of
/// the current context, so redundant driver calls never reach the driver.
///
/// Capabilities are probed when the first window is created; until then
/// only configuration and target creation are available.
pub struct GlRenderSystem {
    driver: Box<dyn GlDriver>,
    provider: Box<dyn ContextProvider>,
    config: ConfigOptions,
    probe: CapabilityProbe,
    contexts: ContextManager,
    targets: RenderTargetRegistry,
    stereo: StereoRenderer,
    listener_events: EventBus<ListenerEvent>,

    // --- Current target ---
    current_target: Option<RenderTargetId>,
    target_height: i32,
    target_flipped: bool,
    invert_winding: bool,
    viewport: Option<Viewport>,

    // --- Requested state re-applied on target and context changes ---
    culling: CullingMode,
    stencil: Option<StencilState>,
    depth_write: bool,
    colour_write: ColorWrites,
    stencil_write_mask: u32,

    // --- Transforms and lighting ---
    scene: FixedFunctionState,
    world_view: Mat4,
    world_view_dirty: bool,
    lights_dirty: bool,
    clip_planes_dirty: bool,
    lighting_enabled: bool,
    active_lights: usize,

    // --- Programs ---
    programs: [Option<GpuProgram>; 3],
    fresh_programs: [bool; 3],

    // --- Vertex arrays of the previous draw, and scratch for the next ---
    bound_attribs: Vec<u32>,
    scratch_attribs: Vec<u32>,

    // --- Statistics ---
    frame: RenderStats,
    last_frame_stats: RenderStats,
    frame_elided_base: u64,
    frame_number: u64,
    shut_down: bool,
}

impl fmt::Debug for GlRenderSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlRenderSystem")
            .field("driver", &self.driver)
            .field("provider", &self.provider)
            .field(
                "capabilities",
                &self
                    .probe
                    .capabilities()
                    .map(|c| format!("{:?} {}", c.profile, c.version)),
            )
            .field("current_context", &self.contexts.current())
            .field("main_context", &self.contexts.main())
            .field("render_targets", &self.targets.len())
            .field("current_target", &self.current_target)
            .field("programs", &self.programs)
            .field("frame_number", &self.frame_number)
            .field("shut_down", &self.shut_down)
            .finish()
    }
}

impl GlRenderSystem {
    /// Creates a render system over a driver and a context provider.
    ///
    /// `config` is the option set of the display; it is frozen when the first
    /// window is created.
    pub fn new(
        driver: Box<dyn GlDriver>,
        provider: Box<dyn ContextProvider>,
        config: ConfigOptions,
    ) -> Self {
        log::info!("GlRenderSystem created.");
        Self {
            driver,
            provider,
            config,
            probe: CapabilityProbe::new(),
            contexts: ContextManager::new(),
            targets: RenderTargetRegistry::new(),
            stereo: StereoRenderer::new(),
            listener_events: EventBus::new(),
            current_target: None,
            target_height: 0,
            target_flipped: false,
            invert_winding: false,
            viewport: None,
            culling: CullingMode::Clockwise,
            stencil: None,
            depth_write: true,
            colour_write: ColorWrites::ALL,
            stencil_write_mask: u32::MAX,
            scene: FixedFunctionState::default(),
            world_view: Mat4::IDENTITY,
            world_view_dirty: false,
            lights_dirty: false,
            clip_planes_dirty: false,
            lighting_enabled: true,
            active_lights: 0,
            programs: [None; 3],
            fresh_programs: [false; 3],
            bound_attribs: Vec::new(),
            scratch_attribs: Vec::new(),
            frame: RenderStats::default(),
            last_frame_stats: RenderStats::default(),
            frame_elided_base: 0,
            frame_number: 0,
            shut_down: false,
        }
    }

    /// Creates a render system with the base EGL options and no video modes.
    pub fn with_base_options(
        driver: Box<dyn GlDriver>,
        provider: Box<dyn ContextProvider>,
    ) -> Self {
        Self::new(driver, provider, options::base_config_options(&[]))
    }

    // --- Accessors ---

    /// The driver.
    pub fn driver(&self) -> &dyn GlDriver {
        self.driver.as_ref()
    }

    /// The driver, mutably.
    pub fn driver_mut(&mut self) -> &mut dyn GlDriver {
        self.driver.as_mut()
    }

    /// The driver downcast to its concrete type.
    pub fn driver_as<T: 'static>(&self) -> Option<&T> {
        self.driver.as_any().downcast_ref::<T>()
    }

    /// The driver downcast to its concrete type, mutably.
    pub fn driver_as_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.driver.as_any_mut().downcast_mut::<T>()
    }

    /// The context provider.
    pub fn context_provider(&self) -> &dyn ContextProvider {
        self.provider.as_ref()
    }

    /// The context provider downcast to its concrete type.
    pub fn context_provider_as<T: 'static>(&self) -> Option<&T> {
        self.provider.as_any().downcast_ref::<T>()
    }

    /// The context provider downcast to its concrete type, mutably.
    pub fn context_provider_as_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.provider.as_any_mut().downcast_mut::<T>()
    }

    /// The context manager.
    pub fn context_manager(&self) -> &ContextManager {
        &self.contexts
    }

    /// The state cache of the current context.
    pub fn state_cache(&self) -> Option<&StateCache> {
        self.contexts.current_cache()
    }

    /// The render target registry.
    pub fn render_targets(&self) -> &RenderTargetRegistry {
        &self.targets
    }

    /// The target draws currently go to.
    pub fn current_render_target(&self) -> Option<RenderTargetId> {
        self.current_target
    }

    /// The stereo path.
    pub fn stereo(&self) -> &StereoRenderer {
        &self.stereo
    }

    // --- Internal helpers ---

    fn ensure_running(&self) -> Result<(), RenderError> {
        if self.shut_down {
            Err(RenderError::InvalidState(
                "the render system is shut down".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn has(&self, features: Features) -> bool {
        self.probe
            .capabilities()
            .is_some_and(|caps| caps.has(features))
    }

    fn fixed_function(&self) -> bool {
        self.has(Features::FIXED_FUNCTION)
    }

    fn uses_fixed_function_transform(&self) -> bool {
        self.fixed_function() && self.programs[GpuProgramType::Vertex.index()].is_none()
    }

    fn flip_winding(&self) -> bool {
        self.target_flipped != self.invert_winding
    }

    fn active(&mut self) -> Result<(&mut StateCache, &mut dyn GlDriver), RenderError> {
        let cache = self.contexts.current_cache_mut().ok_or_else(no_context)?;
        Ok((cache, self.driver.as_mut()))
    }

    fn limits(&self) -> Result<CacheLimits, RenderError> {
        self.contexts
            .current_cache()
            .map(|cache| *cache.limits())
            .ok_or_else(no_context)
    }

    fn probe_options<'a>(&self, provider_extensions: &'a str) -> ProbeOptions<'a> {
        ProbeOptions {
            provider_extensions,
            provider_stereo: self.provider.supports_stereo(),
            fixed_pipeline_enabled: options::flag(
                &self.config,
                options::FIXED_PIPELINE_ENABLED,
                true,
            ),
        }
    }

    fn check_driver_error(&mut self, call: &'static str) -> Result<(), RenderError> {
        let code = self.driver.get_error();
        match driver_error_from_code(code, call) {
            None => Ok(()),
            Some(err) => {
                log::error!("Driver error after {call}: {err}");
                Err(RenderError::DriverFatal(err))
            }
        }
    }

    /// Settings applied once per context, on its first activation.
    fn one_time_context_init(&mut self) {
        let fixed = self.fixed_function();
        let desktop = self.probe.capabilities().is_some_and(|c| !c.is_es());
        let multisample = options::fsaa_samples(&self.config) > 0;
        let Ok((cache, driver)) = self.active() else {
            return;
        };
        if fixed {
            driver.light_model_fv(
                GL_LIGHT_MODEL_COLOR_CONTROL,
                &[GL_SEPARATE_SPECULAR_COLOR as f32],
            );
            driver.light_model_fv(GL_LIGHT_MODEL_LOCAL_VIEWER, &[1.0]);
        }
        if fixed && desktop {
            cache.set_enabled(driver, GL_COLOR_SUM, true);
        }
        cache.set_enabled(driver, GL_DITHER, false);
        if multisample && desktop {
            cache.set_enabled(driver, GL_MULTISAMPLE, true);
        }
        log::debug!("One-time context initialisation done.");
    }

    fn attach_window(
        &mut self,
        desc: RenderTargetDesc,
        context: ContextId,
        first: bool,
    ) -> Result<RenderTargetId, RenderError> {
        let stereo = desc.stereo;
        if first {
            self.config.freeze();
            self.provider.make_current(context)?;
            if self.probe.capabilities().is_none() {
                let extensions = self.provider.extension_string();
                let probe_options = self.probe_options(&extensions);
                let caps = self.probe.probe(self.driver.as_mut(), probe_options)?;
                self.contexts.set_limits(CacheLimits::from(caps));
            }
        }
        if stereo && !self.has(Features::QUAD_BUFFER_STEREO) {
            return Err(RenderError::UnsupportedFeature(
                "quad-buffer stereo".to_string(),
            ));
        }

        let id = self.targets.register(desc, context, true)?;
        self.contexts.register_context(id, context);
        if first && self.contexts.adopt_current(context)? {
            self.one_time_context_init();
        }
        if stereo {
            self.enable_stereo(id)?;
        }
        Ok(id)
    }

    // --- Contexts ---

    /// Makes `context` current.
    ///
    /// Programs and lights are left unbound in the outgoing context. The
    /// incoming context's cache starts empty, so programs are bound again and
    /// the requested write masks are reapplied.
    pub fn switch_context(&mut self, context: ContextId) -> Result<(), RenderError> {
        if self.contexts.current() == Some(context) {
            return Ok(());
        }
        if !self.contexts.is_registered(context) {
            log::warn!("Refusing to switch to unregistered {context}.");
            return Err(RenderError::InvalidState(format!(
                "{context} is not registered"
            )));
        }

        let active_lights = std::mem::take(&mut self.active_lights);
        if let Some(cache) = self.contexts.current_cache_mut() {
            let driver = self.driver.as_mut();
            for program in self.programs.iter().flatten() {
                cache.bind_program(driver, program.ty, None)?;
            }
            for index in 0..active_lights {
                cache.set_light_enabled(driver, index, false)?;
            }
            for unit in 0..cache.limits().texture_units {
                if cache.texture(unit).is_some_and(|b| b.enabled) {
                    cache.set_texture(driver, unit, false, None)?;
                }
            }
        }

        let first = self
            .contexts
            .switch_context(context, self.provider.as_mut())?;
        self.frame.context_switches += 1;
        if first {
            self.one_time_context_init();
        }

        let programs = self.programs;
        let (depth_write, colour_write, stencil_mask) =
            (self.depth_write, self.colour_write, self.stencil_write_mask);
        let (cache, driver) = self.active()?;
        for program in programs.iter().flatten() {
            cache.bind_program(driver, program.ty, Some(program.id))?;
        }
        cache.set_depth_write_enabled(driver, depth_write);
        cache.set_colour_mask(driver, colour_write);
        cache.set_stencil_mask(driver, stencil_mask);

        self.bound_attribs.clear();
        self.world_view_dirty = true;
        self.clip_planes_dirty = true;
        Ok(())
    }

    /// Unregisters a context. A current context hands over to its successor
    /// first, and unregistering the main context promotes a remaining one.
    /// Only the last context leaves nothing current.
    pub fn unregister_context(&mut self, context: ContextId) -> Result<(), RenderError> {
        if self.contexts.current() == Some(context) {
            if let Some(next) = self.contexts.successor_of(context) {
                self.switch_context(next)?;
            }
        }
        self.contexts
            .unregister_context(context, self.provider.as_mut())?;
        if self.contexts.current().is_none() {
            self.current_target = None;
            self.viewport = None;
            self.bound_attribs.clear();
        }
        Ok(())
    }

    /// Probes capabilities again after the driver recreated its contexts,
    /// and replaces every state cache with an empty one.
    pub fn reprobe_after_context_loss(&mut self) -> Result<&Capabilities, RenderError> {
        if self.contexts.current().is_none() {
            return Err(no_context());
        }
        log::warn!("Re-probing capabilities after context loss.");
        self.fresh_programs = [true; 3];
        self.bound_attribs.clear();
        self.active_lights = 0;
        self.world_view_dirty = true;
        self.clip_planes_dirty = true;

        let extensions = self.provider.extension_string();
        let probe_options = self.probe_options(&extensions);
        let caps = self
            .probe
            .reprobe_after_context_loss(self.driver.as_mut(), probe_options)?;
        self.contexts.rebuild_caches(CacheLimits::from(caps));
        Ok(caps)
    }

    // --- Winding ---

    /// Inverts the winding used for culling and two-sided stencil, as needed
    /// for mirrored cameras.
    pub fn set_invert_vertex_winding(&mut self, invert: bool) -> Result<(), RenderError> {
        if self.invert_winding == invert {
            return Ok(());
        }
        self.invert_winding = invert;
        self.reapply_winding_state()
    }

    fn reapply_winding_state(&mut self) -> Result<(), RenderError> {
        let (culling, stencil, flip) = (self.culling, self.stencil, self.flip_winding());
        let (cache, driver) = self.active()?;
        cache.set_culling_mode(driver, culling, flip);
        if let Some(stencil) = stencil {
            cache.set_stencil_params(driver, &stencil, flip)?;
        }
        Ok(())
    }

    // --- Stereo ---

    /// Turns quad-buffer stereo on for a window.
    pub fn enable_stereo(&mut self, target: RenderTargetId) -> Result<(), RenderError> {
        if self.targets.get(target).is_none() {
            return Err(RenderError::InvalidState(format!(
                "{target} is not registered"
            )));
        }
        let caps = self.probe.capabilities().ok_or_else(|| {
            RenderError::InvalidState("capabilities have not been probed".to_string())
        })?;
        self.stereo.enable(target, caps)
    }

    /// Turns stereo off for a target.
    pub fn disable_stereo(&mut self, target: RenderTargetId) {
        self.stereo.disable(target);
    }

    /// Registers a camera with the stereo path.
    pub fn register_stereo_camera(&mut self, camera: CameraId) {
        self.stereo.register_camera(camera);
    }

    /// Registers a scene manager with the stereo path.
    pub fn register_stereo_scene_manager(&mut self, scene_manager: SceneManagerId) {
        self.stereo.register_scene_manager(scene_manager);
    }

    /// A sender for lifecycle events. Queued events are handled at the next
    /// [`RenderSystem::begin_frame`].
    pub fn listener_sender(&self) -> flume::Sender<ListenerEvent> {
        self.listener_events.sender()
    }

    /// Handles a lifecycle event now and applies the resulting action.
    pub fn notify(&mut self, event: ListenerEvent) -> Option<StereoAction> {
        let action = self.stereo.handle(event);
        match action {
            Some(StereoAction::SelectDrawBuffer(buffer)) => {
                self.driver.draw_buffer(buffer.into_gl());
            }
            Some(StereoAction::SuppressFrame(camera)) => {
                log::debug!("Priming frame for {camera}; drawing suppressed.");
            }
            None => {}
        }
        action
    }

    /// Renders one frame of `camera` into `target` and presents it.
    ///
    /// `draw` is called once per eye on stereo targets and once otherwise.
    /// A camera's first stereo frame only primes it.
    pub fn render_target_frame<F>(
        &mut self,
        target: RenderTargetId,
        camera: CameraId,
        mut draw: F,
    ) -> Result<FrameOutcome, RenderError>
    where
        F: FnMut(&mut Self) -> Result<(), RenderError>,
    {
        self.set_render_target(target)?;
        self.notify(ListenerEvent::PreRenderTargetUpdate(target));
        let drawn = self.draw_eyes(target, camera, &mut draw);
        self.notify(ListenerEvent::PostRenderTargetUpdate(target));
        let outcome = drawn?;
        if outcome == FrameOutcome::Presented {
            self.swap_buffers(target)?;
        }
        Ok(outcome)
    }

    fn draw_eyes<F>(
        &mut self,
        target: RenderTargetId,
        camera: CameraId,
        draw: &mut F,
    ) -> Result<FrameOutcome, RenderError>
    where
        F: FnMut(&mut Self) -> Result<(), RenderError>,
    {
        let eyes = if self.stereo.is_enabled(target) { 2 } else { 1 };
        for _ in 0..eyes {
            if let Some(StereoAction::SuppressFrame(_)) =
                self.notify(ListenerEvent::CameraPreRender(camera))
            {
                return Ok(FrameOutcome::Primed);
            }
            draw(self)?;
        }
        Ok(FrameOutcome::Presented)
    }

    // --- Profiling ---

    /// Opens a named debug group, when the driver supports debug markers.
    pub fn begin_profile_event(&mut self, name: &str) {
        if self.has(Features::DEBUG_MARKERS) {
            self.driver.push_debug_group(name);
        }
    }

    /// Closes the innermost debug group.
    pub fn end_profile_event(&mut self) {
        if self.has(Features::DEBUG_MARKERS) {
            self.driver.pop_debug_group();
        }
    }

    /// Inserts a single debug marker.
    pub fn mark_profile_event(&mut self, name: &str) {
        if self.has(Features::DEBUG_MARKERS) {
            self.driver.insert_debug_marker(name);
        }
    }

    // --- Draw helpers ---

    fn flush_fixed_function_transforms(&mut self) -> Result<(), RenderError> {
        if !self.uses_fixed_function_transform() {
            return Ok(());
        }
        if self.world_view_dirty {
            self.world_view = self.scene.view * self.scene.world;
            self.world_view_dirty = false;
        }
        let cache = self.contexts.current_cache_mut().ok_or_else(no_context)?;
        let driver = self.driver.as_mut();

        if self.lights_dirty {
            for (index, light) in self.scene.lights.iter().take(self.active_lights).enumerate() {
                fixed_function::push_light(driver, cache, index, Some(light), &self.scene.view)?;
            }
            self.lights_dirty = false;
        }

        if self.clip_planes_dirty {
            // Clip plane equations are stored in eye space.
            cache.set_modelview_matrix(driver, &self.scene.view)?;
            for index in 0..cache.limits().clip_planes {
                if cache.clip_plane(index).and_then(|p| p.enabled) == Some(true) {
                    cache.enable_clip_plane(driver, index, true)?;
                }
            }
            self.clip_planes_dirty = false;
        }

        cache.set_modelview_matrix(driver, &self.world_view)?;
        let mut projection = self.scene.projection;
        if self.target_flipped {
            for column in projection.cols.iter_mut() {
                column.y = -column.y;
            }
        }
        cache.set_projection_matrix(driver, &projection)
    }

    fn bind_vertex_arrays(
        &mut self,
        op: &RenderOperation,
        map_texcoords: bool,
    ) -> Result<(), RenderError> {
        let cache = self.contexts.current_cache_mut().ok_or_else(no_context)?;
        let driver = self.driver.as_mut();
        let used = &mut self.scratch_attribs;
        used.clear();

        let vertex_start = op.vertex_data.vertex_start;
        for element in &op.vertex_data.elements {
            let binding = op
                .vertex_data
                .bindings
                .get(usize::from(element.source))
                .ok_or_else(|| {
                    RenderError::InvalidState(format!(
                        "vertex element reads unbound source {}",
                        element.source
                    ))
                })?;
            cache.bind_buffer(driver, GL_ARRAY_BUFFER, binding.buffer);
            let offset = element.offset as usize + vertex_start as usize * binding.stride as usize;

            match element.semantic {
                VertexElementSemantic::TexCoord(set) if map_texcoords => {
                    // Each fixed-function unit reads the set chosen for it.
                    let base = VertexElementSemantic::TexCoord(0).attribute_index();
                    for unit in 0..cache.limits().fixed_function_texture_units {
                        if cache.texture_coord_set(unit) == u32::from(set) {
                            attach_attribute(
                                cache,
                                driver,
                                base + unit as u32,
                                element,
                                binding,
                                offset,
                                used,
                            )?;
                        }
                    }
                }
                semantic => attach_attribute(
                    cache,
                    driver,
                    semantic.attribute_index(),
                    element,
                    binding,
                    offset,
                    used,
                )?,
            }
        }

        for &index in &self.bound_attribs {
            if !used.contains(&index) {
                cache.set_vertex_attrib_array(driver, index, false)?;
            }
        }
        std::mem::swap(&mut self.bound_attribs, &mut self.scratch_attribs);
        Ok(())
    }
}

fn attach_attribute(
    cache: &mut StateCache,
    driver: &mut dyn GlDriver,
    index: u32,
    element: &VertexElement,
    binding: &VertexBufferBinding,
    offset: usize,
    used: &mut Vec<u32>,
) -> Result<(), RenderError> {
    cache.set_vertex_attrib_array(driver, index, true)?;
    driver.vertex_attrib_pointer(
        index,
        element.ty.component_count(),
        element.ty.into_gl(),
        element.ty.is_normalized(),
        binding.stride as i32,
        offset,
    );
    cache.set_vertex_attrib_divisor(driver, index, binding.instance_divisor)?;
    used.push(index);
    Ok(())
}

impl RenderSystem for GlRenderSystem {
    fn name(&self) -> &str {
        "OpenGL Rendering Subsystem"
    }

    fn config_options(&self) -> &ConfigOptions {
        &self.config
    }

    fn set_config_option(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        self.config.set(name, value)
    }

    fn capabilities(&self) -> Option<&Capabilities> {
        self.probe.capabilities()
    }

    // --- Render targets ---

    fn create_render_window(
        &mut self,
        desc: RenderTargetDesc,
    ) -> Result<RenderTargetId, RenderError> {
        self.ensure_running()?;
        if !desc.is_window() {
            return Err(RenderError::InvalidState(format!(
                "'{}' does not describe a window",
                desc.name
            )));
        }
        if self.targets.find_by_name(&desc.name).is_some() {
            return Err(RenderError::InvalidState(format!(
                "a render target named '{}' already exists",
                desc.name
            )));
        }
        if desc.stereo && !self.provider.supports_stereo() {
            return Err(RenderError::UnsupportedFeature(
                "stereo surfaces".to_string(),
            ));
        }

        let share_with = self.contexts.main();
        let context = self.provider.create_context(&desc, share_with)?;
        let first = share_with.is_none();
        let (name, width, height) = (desc.name.clone(), desc.width, desc.height);

        match self.attach_window(desc, context, first) {
            Ok(id) => {
                log::info!("Render window '{name}' ({width}x{height}) created as {id} on {context}.");
                Ok(id)
            }
            Err(err) => {
                log::error!("Failed to set up render window '{name}': {err}");
                if first {
                    self.provider.release_current();
                }
                self.provider.destroy_context(context);
                Err(err)
            }
        }
    }

    fn create_offscreen_target(
        &mut self,
        desc: RenderTargetDesc,
    ) -> Result<RenderTargetId, RenderError> {
        self.ensure_running()?;
        if desc.is_window() {
            return Err(RenderError::InvalidState(format!(
                "'{}' describes a window",
                desc.name
            )));
        }
        if desc.stereo {
            return Err(RenderError::UnsupportedFeature(
                "stereo offscreen targets".to_string(),
            ));
        }
        let main = self.contexts.main().ok_or_else(|| {
            RenderError::InvalidState(
                "offscreen targets need a window to share its context".to_string(),
            )
        })?;
        let name = desc.name.clone();
        let id = self.targets.register(desc, main, false)?;
        log::info!("Offscreen target '{name}' created as {id} on {main}.");
        Ok(id)
    }

    fn destroy_render_target(&mut self, target: RenderTargetId) -> Result<(), RenderError> {
        let Some(entry) = self.targets.remove(target) else {
            log::warn!("Destroying unknown {target}; ignoring.");
            return Ok(());
        };
        self.notify(ListenerEvent::RenderTargetDestroyed(target));
        if self.current_target == Some(target) {
            self.current_target = None;
            self.viewport = None;
        }

        if entry.owns_context {
            let context = entry.context;
            for dependent in self.targets.targets_for_context(context) {
                log::warn!("{dependent} shared {context} and is destroyed with {target}.");
                self.targets.remove(dependent);
                self.notify(ListenerEvent::RenderTargetDestroyed(dependent));
                if self.current_target == Some(dependent) {
                    self.current_target = None;
                    self.viewport = None;
                }
            }
            self.unregister_context(context)?;
            self.provider.destroy_context(context);
        }
        log::info!("Render target '{}' ({target}) destroyed.", entry.desc.name);
        Ok(())
    }

    fn set_render_target(&mut self, target: RenderTargetId) -> Result<(), RenderError> {
        self.ensure_running()?;
        let entry = self.targets.get(target).ok_or_else(|| {
            RenderError::InvalidState(format!("{target} is not registered"))
        })?;
        let context = entry.context;
        let (width, height) = (entry.desc.width, entry.desc.height);
        let flipped = entry.desc.requires_texture_flipping;

        self.switch_context(context)?;
        self.current_target = Some(target);
        self.target_height = height as i32;
        self.target_flipped = flipped;
        self.reapply_winding_state()?;
        self.set_viewport(Viewport::full(width, height))
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<(), RenderError> {
        if self.current_target.is_none() {
            return Err(no_target());
        }
        // GL measures from the bottom-left corner.
        let y = if self.target_flipped {
            viewport.top
        } else {
            self.target_height - viewport.height - viewport.top
        };
        let rect = [viewport.left, y, viewport.width, viewport.height];
        let (cache, driver) = self.active()?;
        cache.set_viewport(driver, rect);
        cache.set_scissor_box(driver, rect);
        self.viewport = Some(viewport);
        Ok(())
    }

    // --- Matrices ---

    fn set_world_matrix(&mut self, matrix: &Mat4) {
        self.scene.world = *matrix;
        self.world_view_dirty = true;
    }

    fn set_view_matrix(&mut self, matrix: &Mat4) {
        if self.scene.view == *matrix {
            return;
        }
        self.scene.view = *matrix;
        self.world_view_dirty = true;
        self.lights_dirty = self.active_lights > 0;
        if let Some(cache) = self.contexts.current_cache_mut() {
            cache.forget_clip_plane_equations();
            self.clip_planes_dirty = true;
        }
    }

    fn set_projection_matrix(&mut self, matrix: &Mat4) {
        self.scene.projection = *matrix;
    }

    // --- Lighting ---

    fn use_lights(&mut self, lights: &[Light], limit: usize) -> Result<(), RenderError> {
        let count = lights.len().min(limit);
        if !self.fixed_function() {
            self.scene.lights.clear();
            self.scene.lights.extend_from_slice(&lights[..count]);
            return Ok(());
        }

        let max = self.limits()?.lights;
        if count > max {
            return Err(RenderError::out_of_range(LimitKind::Light, count - 1, max));
        }
        self.scene.lights.clear();
        self.scene.lights.extend_from_slice(&lights[..count]);

        let cache = self.contexts.current_cache_mut().ok_or_else(no_context)?;
        let driver = self.driver.as_mut();
        for (index, light) in self.scene.lights.iter().enumerate() {
            fixed_function::push_light(driver, cache, index, Some(light), &self.scene.view)?;
        }
        for index in count..self.active_lights {
            fixed_function::push_light(driver, cache, index, None, &self.scene.view)?;
        }
        self.active_lights = count;
        self.lights_dirty = false;
        Ok(())
    }

    fn set_ambient_light(&mut self, colour: LinearRgba) -> Result<(), RenderError> {
        self.scene.ambient = colour;
        if self.fixed_function() {
            let (_, driver) = self.active()?;
            driver.light_model_fv(GL_LIGHT_MODEL_AMBIENT, &colour.to_array());
        }
        Ok(())
    }

    fn set_lighting_enabled(&mut self, enabled: bool) -> Result<(), RenderError> {
        self.lighting_enabled = enabled;
        if self.fixed_function() {
            let (cache, driver) = self.active()?;
            cache.set_enabled(driver, GL_LIGHTING, enabled);
        }
        Ok(())
    }

    fn set_normalise_normals(&mut self, enabled: bool) -> Result<(), RenderError> {
        if self.fixed_function() {
            let (cache, driver) = self.active()?;
            cache.set_enabled(driver, GL_NORMALIZE, enabled);
        }
        Ok(())
    }

    fn set_surface_tracking(&mut self, tracking: TrackVertexColour) -> Result<(), RenderError> {
        self.scene.surface.tracking = tracking;
        if !self.fixed_function() {
            return Ok(());
        }
        let (cache, driver) = self.active()?;
        match fixed_function::surface_tracking_mode(tracking) {
            Some(mode) => {
                driver.color_material(GL_FRONT_AND_BACK, mode);
                cache.set_enabled(driver, GL_COLOR_MATERIAL, true);
            }
            None => cache.set_enabled(driver, GL_COLOR_MATERIAL, false),
        }
        Ok(())
    }

    fn set_surface_params(&mut self, params: &SurfaceParams) -> Result<(), RenderError> {
        self.scene.surface = *params;
        if !self.fixed_function() {
            return Ok(());
        }
        {
            let (_, driver) = self.active()?;
            driver.material_fv(GL_FRONT_AND_BACK, GL_AMBIENT, &params.ambient.to_array());
            driver.material_fv(GL_FRONT_AND_BACK, GL_DIFFUSE, &params.diffuse.to_array());
            driver.material_fv(GL_FRONT_AND_BACK, GL_SPECULAR, &params.specular.to_array());
            driver.material_fv(GL_FRONT_AND_BACK, GL_EMISSION, &params.emissive.to_array());
            driver.material_fv(GL_FRONT_AND_BACK, GL_SHININESS, &[params.shininess]);
        }
        self.set_surface_tracking(params.tracking)
    }

    fn set_fog_params(&mut self, fog: &FogParams) -> Result<(), RenderError> {
        self.scene.fog = *fog;
        if !self.fixed_function() {
            return Ok(());
        }
        let (cache, driver) = self.active()?;
        cache.set_fog(driver, fog.mode)?;
        if fog.mode != FogMode::None {
            driver.fog_fv(GL_FOG_COLOR, &fog.colour.to_array());
            driver.fog_fv(GL_FOG_DENSITY, &[fog.density]);
            driver.fog_fv(GL_FOG_START, &[fog.start]);
            driver.fog_fv(GL_FOG_END, &[fog.end]);
        }
        Ok(())
    }

    // --- Textures ---

    fn set_texture(
        &mut self,
        unit: usize,
        enabled: bool,
        texture: Option<TextureHandle>,
    ) -> Result<(), RenderError> {
        let (cache, driver) = self.active()?;
        cache.set_texture(driver, unit, enabled, texture)
    }

    fn set_sampler(&mut self, unit: usize, sampler: &SamplerState) -> Result<(), RenderError> {
        let (cache, driver) = self.active()?;
        cache.set_texture_unit_filtering(driver, unit, FilterType::Min, sampler.min_filter)?;
        cache.set_texture_unit_filtering(driver, unit, FilterType::Mag, sampler.mag_filter)?;
        cache.set_texture_unit_filtering(driver, unit, FilterType::Mip, sampler.mip_filter)?;
        cache.set_texture_addressing_mode(driver, unit, sampler.addressing)?;
        cache.set_texture_anisotropy(driver, unit, sampler.max_anisotropy)
    }

    fn set_texture_unit_filtering(
        &mut self,
        unit: usize,
        filter_type: FilterType,
        options: FilterOptions,
    ) -> Result<(), RenderError> {
        let (cache, driver) = self.active()?;
        cache.set_texture_unit_filtering(driver, unit, filter_type, options)
    }

    fn set_texture_anisotropy(&mut self, unit: usize, level: f32) -> Result<(), RenderError> {
        let (cache, driver) = self.active()?;
        cache.set_texture_anisotropy(driver, unit, level)
    }

    fn set_texture_addressing_mode(
        &mut self,
        unit: usize,
        uvw: UvwAddressingMode,
    ) -> Result<(), RenderError> {
        let (cache, driver) = self.active()?;
        cache.set_texture_addressing_mode(driver, unit, uvw)
    }

    fn set_texture_coord_set(&mut self, unit: usize, index: u32) -> Result<(), RenderError> {
        let (cache, _) = self.active()?;
        cache.set_texture_coord_set(unit, index)
    }

    fn set_texture_blend_mode(
        &mut self,
        unit: usize,
        mode: TextureBlendMode,
    ) -> Result<(), RenderError> {
        let (cache, driver) = self.active()?;
        cache.set_texture_blend_mode(driver, unit, mode)
    }

    fn set_texture_matrix(&mut self, unit: usize, matrix: &Mat4) -> Result<(), RenderError> {
        let (cache, driver) = self.active()?;
        cache.set_texture_matrix(driver, unit, matrix)
    }

    // --- Fixed pipeline state ---

    fn set_colour_blend_state(&mut self, state: &ColourBlendState) -> Result<(), RenderError> {
        let (cache, driver) = self.active()?;
        cache.set_blend_state(driver, state)?;
        self.colour_write = state.write_mask;
        Ok(())
    }

    fn set_depth_buffer_params(
        &mut self,
        test: bool,
        write: bool,
        function: CompareFunction,
    ) -> Result<(), RenderError> {
        let (cache, driver) = self.active()?;
        cache.set_depth_params(driver, test, write, function);
        self.depth_write = write;
        Ok(())
    }

    fn set_depth_check_enabled(&mut self, enabled: bool) -> Result<(), RenderError> {
        let (cache, driver) = self.active()?;
        cache.set_depth_check_enabled(driver, enabled);
        Ok(())
    }

    fn set_depth_write_enabled(&mut self, enabled: bool) -> Result<(), RenderError> {
        let (cache, driver) = self.active()?;
        cache.set_depth_write_enabled(driver, enabled);
        self.depth_write = enabled;
        Ok(())
    }

    fn set_depth_function(&mut self, function: CompareFunction) -> Result<(), RenderError> {
        let (cache, driver) = self.active()?;
        cache.set_depth_function(driver, function);
        Ok(())
    }

    fn set_depth_bias(&mut self, bias: DepthBias) -> Result<(), RenderError> {
        let (cache, driver) = self.active()?;
        cache.set_depth_bias(driver, bias.constant, bias.slope_scale);
        Ok(())
    }

    fn set_stencil_check_enabled(&mut self, enabled: bool) -> Result<(), RenderError> {
        let (cache, driver) = self.active()?;
        cache.set_stencil_check_enabled(driver, enabled);
        Ok(())
    }

    fn set_stencil_buffer_params(&mut self, state: &StencilState) -> Result<(), RenderError> {
        let flip = self.flip_winding();
        let (cache, driver) = self.active()?;
        cache.set_stencil_check_enabled(driver, state.enabled);
        cache.set_stencil_params(driver, state, flip)?;
        self.stencil = Some(*state);
        self.stencil_write_mask = state.write_mask;
        Ok(())
    }

    fn set_culling_mode(&mut self, mode: CullingMode) -> Result<(), RenderError> {
        let flip = self.flip_winding();
        let (cache, driver) = self.active()?;
        cache.set_culling_mode(driver, mode, flip);
        self.culling = mode;
        Ok(())
    }

    fn set_polygon_mode(&mut self, mode: PolygonMode) -> Result<(), RenderError> {
        let (cache, driver) = self.active()?;
        cache.set_polygon_mode(driver, mode)
    }

    fn set_shading_type(&mut self, shade: ShadeOptions) -> Result<(), RenderError> {
        let (cache, driver) = self.active()?;
        cache.set_shading_type(driver, shade)
    }

    fn set_fog(&mut self, mode: FogMode) -> Result<(), RenderError> {
        self.scene.fog.mode = mode;
        if !self.fixed_function() {
            return Ok(());
        }
        let (cache, driver) = self.active()?;
        cache.set_fog(driver, mode)
    }

    fn set_alpha_reject_settings(
        &mut self,
        function: CompareFunction,
        value: u8,
        alpha_to_coverage: bool,
    ) -> Result<(), RenderError> {
        let (cache, driver) = self.active()?;
        cache.set_alpha_test(driver, function, f32::from(value) / 255.0)?;
        let coverage = alpha_to_coverage && function != CompareFunction::Always;
        cache.set_enabled(driver, GL_SAMPLE_ALPHA_TO_COVERAGE, coverage);
        Ok(())
    }

    fn set_line_width(&mut self, width: f32) -> Result<(), RenderError> {
        let (cache, driver) = self.active()?;
        cache.set_line_width(driver, width);
        Ok(())
    }

    fn set_point_sprites_enabled(&mut self, enabled: bool) -> Result<(), RenderError> {
        if enabled && !self.has(Features::POINT_SPRITES) {
            return Err(RenderError::UnsupportedFeature("point sprites".to_string()));
        }
        // Programmable pipelines always rasterize sprites.
        if !self.fixed_function() {
            return Ok(());
        }
        let (cache, driver) = self.active()?;
        cache.set_enabled(driver, GL_POINT_SPRITE, enabled);
        Ok(())
    }

    fn set_clip_plane(&mut self, index: usize, plane: Plane) -> Result<(), RenderError> {
        let limit = self.limits()?.clip_planes;
        if index >= limit {
            return Err(RenderError::out_of_range(LimitKind::ClipPlane, index, limit));
        }
        let (view, fixed) = (self.scene.view, self.fixed_function());
        let (cache, driver) = self.active()?;
        // Equations are transformed by the model-view matrix when pushed.
        if fixed {
            cache.set_modelview_matrix(driver, &view)?;
        }
        let c = plane.coefficients;
        cache.set_clip_plane(driver, index, c.x, c.y, c.z, c.w)
    }

    fn enable_clip_plane(&mut self, index: usize, enabled: bool) -> Result<(), RenderError> {
        let limit = self.limits()?.clip_planes;
        if index >= limit {
            return Err(RenderError::out_of_range(LimitKind::ClipPlane, index, limit));
        }
        let (view, fixed) = (self.scene.view, self.fixed_function());
        let (cache, driver) = self.active()?;
        if enabled && fixed {
            cache.set_modelview_matrix(driver, &view)?;
        }
        cache.enable_clip_plane(driver, index, enabled)
    }

    fn set_clip_planes(&mut self, planes: &[Plane]) -> Result<(), RenderError> {
        let limit = self.limits()?.clip_planes;
        if planes.len() > limit {
            return Err(RenderError::out_of_range(
                LimitKind::ClipPlane,
                planes.len() - 1,
                limit,
            ));
        }
        if limit == 0 {
            return Ok(());
        }
        let (view, fixed) = (self.scene.view, self.fixed_function());
        let (cache, driver) = self.active()?;
        if fixed {
            cache.set_modelview_matrix(driver, &view)?;
        }
        for (index, plane) in planes.iter().enumerate() {
            let c = plane.coefficients;
            cache.set_clip_plane(driver, index, c.x, c.y, c.z, c.w)?;
            cache.enable_clip_plane(driver, index, true)?;
        }
        for index in planes.len()..limit {
            cache.enable_clip_plane(driver, index, false)?;
        }
        Ok(())
    }

    fn set_scissor_test(&mut self, enabled: bool, rect: Rect) -> Result<(), RenderError> {
        if self.current_target.is_none() {
            return Err(no_target());
        }
        let (height, flipped) = (self.target_height, self.target_flipped);
        let rect = if enabled {
            let y = if flipped { rect.top } else { height - rect.bottom };
            [rect.left, y, rect.width(), rect.height()]
        } else {
            // GL requires the scissor box to be reset to the viewport.
            let vp = self.viewport.ok_or_else(no_target)?;
            let y = if flipped {
                vp.top
            } else {
                height - vp.top - vp.height
            };
            [vp.left, y, vp.width, vp.height]
        };
        let (cache, driver) = self.active()?;
        cache.set_scissor(driver, enabled, rect);
        Ok(())
    }

    fn clear_frame_buffer(
        &mut self,
        buffers: FrameBufferType,
        colour: LinearRgba,
        depth: f32,
        stencil: u32,
    ) -> Result<(), RenderError> {
        if self.current_target.is_none() {
            return Err(no_target());
        }
        let (depth_write, colour_write, stencil_mask) =
            (self.depth_write, self.colour_write, self.stencil_write_mask);
        let (cache, driver) = self.active()?;
        let viewport = cache.viewport().ok_or_else(no_target)?;

        let mut mask = 0;
        if buffers.contains(FrameBufferType::COLOUR) {
            mask |= GL_COLOR_BUFFER_BIT;
            cache.set_colour_mask(driver, ColorWrites::ALL);
            driver.clear_color(colour.r, colour.g, colour.b, colour.a);
        }
        if buffers.contains(FrameBufferType::DEPTH) {
            mask |= GL_DEPTH_BUFFER_BIT;
            cache.set_depth_write_enabled(driver, true);
            driver.clear_depth(depth);
        }
        if buffers.contains(FrameBufferType::STENCIL) {
            mask |= GL_STENCIL_BUFFER_BIT;
            cache.set_stencil_mask(driver, u32::MAX);
            driver.clear_stencil(stencil as i32);
        }

        // The clear region follows the scissor box, so clip to the viewport.
        let scissor_enabled = cache.is_enabled(GL_SCISSOR_TEST).unwrap_or(false);
        let scissor_box = cache.scissor_box();
        cache.set_scissor(driver, true, viewport);
        driver.clear(mask);
        cache.set_enabled(driver, GL_SCISSOR_TEST, scissor_enabled);
        if let Some(rect) = scissor_box {
            cache.set_scissor_box(driver, rect);
        }

        if buffers.contains(FrameBufferType::COLOUR) {
            cache.set_colour_mask(driver, colour_write);
        }
        if buffers.contains(FrameBufferType::DEPTH) {
            cache.set_depth_write_enabled(driver, depth_write);
        }
        if buffers.contains(FrameBufferType::STENCIL) {
            cache.set_stencil_mask(driver, stencil_mask);
        }
        Ok(())
    }

    // --- Programs ---

    fn bind_gpu_program(&mut self, program: &GpuProgram) -> Result<(), RenderError> {
        let (cache, driver) = self.active()?;
        let changed = cache.bind_program(driver, program.ty, Some(program.id))?;
        let slot = program.ty.index();
        if changed || self.programs[slot] != Some(*program) {
            self.fresh_programs[slot] = true;
            log::trace!("Bound {:?} program {}.", program.ty, program.id);
        }
        self.programs[slot] = Some(*program);
        Ok(())
    }

    fn unbind_gpu_program(&mut self, stage: GpuProgramType) -> Result<(), RenderError> {
        let (cache, driver) = self.active()?;
        cache.bind_program(driver, stage, None)?;
        self.programs[stage.index()] = None;
        self.fresh_programs[stage.index()] = false;
        Ok(())
    }

    fn bind_gpu_program_parameters(
        &mut self,
        stage: GpuProgramType,
        params: &GpuProgramParameters,
        mask: VariabilityMask,
    ) -> Result<(), RenderError> {
        let slot = stage.index();
        let program = self.programs[slot].ok_or_else(|| {
            RenderError::InvalidState(format!("no {stage:?} program is bound"))
        })?;
        // A program that just got bound has never seen any constant.
        let mask = if std::mem::take(&mut self.fresh_programs[slot]) {
            VariabilityMask::all()
        } else {
            mask
        };

        for constant in params.matching(mask) {
            let location = match constant.location {
                Some(location) => location,
                None => match self.driver.uniform_location(program.id, &constant.name) {
                    Some(location) => location,
                    None => {
                        log::trace!(
                            "Uniform '{}' is not active in program {}; skipped.",
                            constant.name,
                            program.id
                        );
                        continue;
                    }
                },
            };
            match constant.value {
                ConstantValue::Int(value) => self.driver.uniform_i(program.id, location, value),
                ref value => {
                    self.driver
                        .uniform_fv(program.id, location, value.as_floats().unwrap_or(&[]))
                }
            }
        }
        Ok(())
    }

    fn fixed_function_params(
        &mut self,
        tracking: TrackVertexColour,
        fog: FogMode,
    ) -> GpuProgramParametersPtr {
        if self.fixed_function() && self.contexts.current().is_some() {
            if let Err(err) = self.set_surface_tracking(tracking) {
                log::warn!("Could not apply surface tracking {tracking:?}: {err}");
            }
            if let Err(err) = self.set_fog(fog) {
                log::warn!("Could not apply fog mode {fog:?}: {err}");
            }
        }
        self.scene.surface.tracking = tracking;
        self.scene.fog.mode = fog;

        if self.lighting_enabled {
            Arc::new(self.scene.build_parameters())
        } else {
            let unlit = FixedFunctionState {
                lights: Vec::new(),
                ..self.scene.clone()
            };
            Arc::new(unlit.build_parameters())
        }
    }

    fn apply_fixed_function_params(
        &mut self,
        params: &GpuProgramParameters,
        mask: VariabilityMask,
    ) -> Result<(), RenderError> {
        if self.programs[GpuProgramType::Vertex.index()].is_some() {
            return self.bind_gpu_program_parameters(GpuProgramType::Vertex, params, mask);
        }
        if !self.fixed_function() {
            return Err(RenderError::InvalidState(
                "a vertex program must be bound to receive fixed-function parameters"
                    .to_string(),
            ));
        }

        let (cache, driver) = self.active()?;
        let updates = fixed_function::apply_to_driver(driver, cache, params, mask)?;
        if let Some(world) = updates.world {
            self.scene.world = world;
            self.world_view_dirty = true;
        }
        if let Some(view) = updates.view {
            // Lights were pushed for this view already.
            self.scene.view = view;
            self.world_view_dirty = true;
            self.clip_planes_dirty = true;
            if let Some(cache) = self.contexts.current_cache_mut() {
                cache.forget_clip_plane_equations();
            }
        }
        if let Some(projection) = updates.projection {
            self.scene.projection = projection;
        }
        Ok(())
    }

    // --- Draw and frame ---

    fn render(&mut self, op: &RenderOperation) -> Result<(), RenderError> {
        if self.current_target.is_none() {
            return Err(no_target());
        }
        let vertex_program = self.programs[GpuProgramType::Vertex.index()].is_some();
        let fixed = self.fixed_function();
        if !fixed && !vertex_program {
            return Err(RenderError::InvalidState(
                "drawing on a shader-only driver needs a bound vertex program".to_string(),
            ));
        }
        let instances = op.instance_count.max(1);
        if instances > 1 && !self.has(Features::INSTANCING) {
            return Err(RenderError::UnsupportedFeature(
                "instanced draws".to_string(),
            ));
        }

        self.flush_fixed_function_transforms()?;
        self.bind_vertex_arrays(op, fixed && !vertex_program)?;

        let mode = op.topology.into_gl();
        let (cache, driver) = self.active()?;
        match op.index_data {
            Some(index) => {
                cache.bind_buffer(driver, GL_ELEMENT_ARRAY_BUFFER, index.buffer);
                let offset = index.index_start as usize * index.index_type.size() as usize;
                driver.draw_elements(
                    mode,
                    index.index_count as i32,
                    index.index_type.into_gl(),
                    offset,
                    instances,
                );
            }
            None => driver.draw_arrays(mode, 0, op.vertex_data.vertex_count as i32, instances),
        }
        self.check_driver_error("draw")?;

        self.frame.draw_calls += 1;
        self.frame.primitives_rendered = self
            .frame
            .primitives_rendered
            .saturating_add(op.primitive_count());
        self.frame.vertices_rendered = self
            .frame
            .vertices_rendered
            .saturating_add(op.vertex_data.vertex_count.saturating_mul(instances));
        Ok(())
    }

    fn begin_frame(&mut self) -> Result<(), RenderError> {
        self.ensure_running()?;
        self.frame_number += 1;
        self.frame = RenderStats {
            frame_number: self.frame_number,
            ..RenderStats::default()
        };
        self.frame_elided_base = self.contexts.total_elided_calls();
        for event in self.listener_events.drain() {
            self.notify(event);
        }
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        // Deactivate viewport clipping.
        if let Ok((cache, driver)) = self.active() {
            cache.set_enabled(driver, GL_SCISSOR_TEST, false);
        }
        self.frame.elided_state_changes = self
            .contexts
            .total_elided_calls()
            .saturating_sub(self.frame_elided_base);
        self.last_frame_stats = self.frame.clone();
        log::trace!("Frame {} done: {:?}", self.frame_number, self.last_frame_stats);
        Ok(())
    }

    fn swap_buffers(&mut self, target: RenderTargetId) -> Result<(), RenderError> {
        let entry = self.targets.get(target).ok_or_else(|| {
            RenderError::InvalidState(format!("{target} is not registered"))
        })?;
        if !entry.desc.is_window() {
            return Ok(());
        }
        let context = entry.context;
        self.provider.swap_buffers(context)?;
        Ok(())
    }

    fn last_frame_stats(&self) -> &RenderStats {
        &self.last_frame_stats
    }

    fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        log::info!("Shutting down GlRenderSystem...");
        let main_owner = self.contexts.main().and_then(|m| self.contexts.owner(m));
        let mut ids: Vec<RenderTargetId> = self.targets.iter().map(|(id, _)| id).collect();
        // Offscreen targets first, the main window last.
        ids.sort_by_key(|id| {
            let window = self
                .targets
                .get(*id)
                .is_some_and(|entry| entry.desc.is_window());
            (Some(*id) == main_owner, window, *id)
        });
        for id in ids {
            if let Err(err) = self.destroy_render_target(id) {
                log::error!("Failed to destroy {id} during shutdown: {err}");
            }
        }
        self.shut_down = true;
        log::info!("GlRenderSystem shut down.");
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::headless::{ContextEvent, GlCall, HeadlessContextProvider, HeadlessDriver};
    use rhea_core::renderer::{
        BufferId, IndexData, IndexType, PrimitiveTopology, VertexData, VertexElementType,
    };

    fn system_on(driver: HeadlessDriver, provider: HeadlessContextProvider) -> GlRenderSystem {
        GlRenderSystem::with_base_options(Box::new(driver), Box::new(provider))
    }

    fn with_window(driver: HeadlessDriver) -> (GlRenderSystem, RenderTargetId) {
        let mut system = system_on(driver, HeadlessContextProvider::new());
        let window = system
            .create_render_window(RenderTargetDesc::window("main", 800, 600, false))
            .unwrap();
        system.set_render_target(window).unwrap();
        recorder(&mut system).clear_calls();
        (system, window)
    }

    fn recorder(system: &mut GlRenderSystem) -> &mut HeadlessDriver {
        system.driver_as_mut::<HeadlessDriver>().unwrap()
    }

    fn element(semantic: VertexElementSemantic, offset: u32) -> VertexElement {
        VertexElement {
            source: 0,
            offset,
            semantic,
            ty: VertexElementType::Float3,
        }
    }

    fn triangle(semantics: &[VertexElementSemantic]) -> RenderOperation {
        RenderOperation {
            topology: PrimitiveTopology::TriangleList,
            vertex_data: VertexData {
                elements: semantics
                    .iter()
                    .enumerate()
                    .map(|(i, s)| element(*s, 12 * i as u32))
                    .collect(),
                bindings: vec![VertexBufferBinding {
                    buffer: BufferId(1),
                    stride: 12 * semantics.len() as u32,
                    instance_divisor: 0,
                }],
                vertex_start: 0,
                vertex_count: 3,
            },
            index_data: None,
            instance_count: 1,
        }
    }

    #[test]
    fn viewport_is_measured_from_the_bottom() {
        let (mut system, _) = with_window(HeadlessDriver::desktop_compat());
        system
            .set_viewport(Viewport {
                left: 10,
                top: 20,
                width: 100,
                height: 50,
            })
            .unwrap();
        let calls = recorder(&mut system).take_calls();
        assert!(calls.contains(&GlCall::Viewport(10, 530, 100, 50)));
        assert!(calls.contains(&GlCall::Scissor(10, 530, 100, 50)));
    }

    #[test]
    fn flipped_targets_keep_the_top_edge() {
        let (mut system, _) = with_window(HeadlessDriver::desktop_compat());
        let offscreen = system
            .create_offscreen_target(RenderTargetDesc::offscreen("rtt", 256, 256))
            .unwrap();
        system.set_render_target(offscreen).unwrap();
        assert_eq!(system.state_cache().unwrap().viewport(), Some([0, 0, 256, 256]));
        recorder(&mut system).clear_calls();

        system
            .set_viewport(Viewport {
                left: 0,
                top: 16,
                width: 64,
                height: 64,
            })
            .unwrap();
        assert!(recorder(&mut system)
            .calls()
            .contains(&GlCall::Viewport(0, 16, 64, 64)));
    }

    #[test]
    fn render_needs_a_target() {
        let mut system = system_on(HeadlessDriver::desktop_compat(), HeadlessContextProvider::new());
        let err = system.render(&triangle(&[VertexElementSemantic::Position]));
        assert!(matches!(err, Err(RenderError::InvalidState(_))));
    }

    #[test]
    fn shader_only_driver_needs_a_vertex_program() {
        let (mut system, _) = with_window(HeadlessDriver::videocore_iv());
        let op = triangle(&[VertexElementSemantic::Position]);
        assert!(matches!(
            system.render(&op),
            Err(RenderError::InvalidState(_))
        ));

        system
            .bind_gpu_program(&GpuProgram::new(3, GpuProgramType::Vertex))
            .unwrap();
        system.render(&op).unwrap();
        assert_eq!(
            recorder(&mut system).count(|c| matches!(c, GlCall::DrawArrays { count: 3, .. })),
            1
        );
    }

    #[test]
    fn instanced_draws_need_instancing() {
        let (mut system, _) = with_window(HeadlessDriver::videocore_iv());
        system
            .bind_gpu_program(&GpuProgram::new(3, GpuProgramType::Vertex))
            .unwrap();
        let mut op = triangle(&[VertexElementSemantic::Position]);
        op.instance_count = 4;
        assert!(matches!(
            system.render(&op),
            Err(RenderError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn unused_attribute_arrays_are_disabled() {
        let (mut system, _) = with_window(HeadlessDriver::desktop_compat());
        system
            .render(&triangle(&[
                VertexElementSemantic::Position,
                VertexElementSemantic::Normal,
            ]))
            .unwrap();
        recorder(&mut system).clear_calls();

        system
            .render(&triangle(&[VertexElementSemantic::Position]))
            .unwrap();
        let driver = recorder(&mut system);
        assert_eq!(
            driver.count(|c| *c == GlCall::DisableVertexAttribArray(2)),
            1
        );
        assert_eq!(driver.count(|c| *c == GlCall::EnableVertexAttribArray(0)), 0);
        assert_eq!(
            system.state_cache().unwrap().enabled_vertex_attribs(),
            vec![0]
        );
    }

    #[test]
    fn indexed_draws_bind_the_index_buffer() {
        let (mut system, _) = with_window(HeadlessDriver::desktop_compat());
        let mut op = triangle(&[VertexElementSemantic::Position]);
        op.index_data = Some(IndexData {
            buffer: BufferId(9),
            index_type: IndexType::U16,
            index_start: 6,
            index_count: 6,
        });
        system.begin_frame().unwrap();
        system.render(&op).unwrap();
        system.end_frame().unwrap();

        let calls = recorder(&mut system).take_calls();
        assert!(calls.contains(&GlCall::BindBuffer(GL_ELEMENT_ARRAY_BUFFER, 9)));
        assert!(calls.contains(&GlCall::DrawElements {
            mode: GL_TRIANGLES,
            count: 6,
            ty: GL_UNSIGNED_SHORT,
            offset: 12,
            instances: 1,
        }));
        let stats = system.last_frame_stats();
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(stats.primitives_rendered, 2);
        assert_eq!(stats.vertices_rendered, 3);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn large_start_offsets_are_computed_without_wrapping() {
        let (mut system, _) = with_window(HeadlessDriver::desktop_compat());
        let mut op = triangle(&[VertexElementSemantic::Position, VertexElementSemantic::Normal]);
        op.vertex_data.vertex_start = 0x2000_0000;
        op.index_data = Some(IndexData {
            buffer: BufferId(9),
            index_type: IndexType::U32,
            index_start: 0x8000_0000,
            index_count: 3,
        });
        system.render(&op).unwrap();

        let calls = recorder(&mut system).take_calls();
        let offsets: Vec<usize> = calls
            .iter()
            .filter_map(|c| match c {
                GlCall::VertexAttribPointer { offset, .. } => Some(*offset),
                _ => None,
            })
            .collect();
        assert_eq!(offsets, vec![12_884_901_888, 12_884_901_900]);
        assert!(calls.iter().any(|c| matches!(
            c,
            GlCall::DrawElements { offset: 8_589_934_592, .. }
        )));
    }

    #[test]
    fn driver_errors_after_a_draw_are_fatal() {
        let (mut system, _) = with_window(HeadlessDriver::desktop_compat());
        recorder(&mut system).inject_error(GL_OUT_OF_MEMORY);
        let err = system
            .render(&triangle(&[VertexElementSemantic::Position]))
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn clear_forces_and_restores_write_masks() {
        let (mut system, _) = with_window(HeadlessDriver::desktop_compat());
        system.set_depth_write_enabled(false).unwrap();
        recorder(&mut system).clear_calls();

        system
            .clear_frame_buffer(FrameBufferType::DEPTH, LinearRgba::BLACK, 1.0, 0)
            .unwrap();
        let calls = recorder(&mut system).take_calls();
        let at = |call: GlCall| calls.iter().position(|c| *c == call).unwrap();
        let forced = at(GlCall::DepthMask(true));
        let clear = at(GlCall::Clear(GL_DEPTH_BUFFER_BIT));
        let restored = at(GlCall::DepthMask(false));
        assert!(forced < clear && clear < restored);
        assert_eq!(system.state_cache().unwrap().depth_write(), Some(false));
    }

    #[test]
    fn stereo_windows_need_provider_support() {
        let mut system = system_on(HeadlessDriver::desktop_compat(), HeadlessContextProvider::new());
        let mut desc = RenderTargetDesc::window("vr", 640, 480, false);
        desc.stereo = true;
        assert!(matches!(
            system.create_render_window(desc),
            Err(RenderError::UnsupportedFeature(_))
        ));
        let provider = system.context_provider_as::<HeadlessContextProvider>().unwrap();
        assert!(provider.events().is_empty());
    }

    #[test]
    fn failed_window_setup_destroys_its_context() {
        let provider = HeadlessContextProvider::new().with_stereo(true);
        let mut system = system_on(HeadlessDriver::videocore_iv(), provider);
        let mut desc = RenderTargetDesc::window("vr", 640, 480, false);
        desc.stereo = true;
        assert!(system.create_render_window(desc).is_err());

        let provider = system.context_provider_as::<HeadlessContextProvider>().unwrap();
        assert!(!provider.is_live(ContextId(1)));
        assert!(system.render_targets().is_empty());

        let window = system
            .create_render_window(RenderTargetDesc::window("main", 640, 480, false))
            .unwrap();
        assert!(system.set_render_target(window).is_ok());
    }

    #[test]
    fn first_stereo_frame_only_primes_the_camera() {
        let provider = HeadlessContextProvider::new().with_stereo(true);
        let mut system = system_on(HeadlessDriver::desktop_compat(), provider);
        let mut desc = RenderTargetDesc::window("vr", 640, 480, false);
        desc.stereo = true;
        let target = system.create_render_window(desc).unwrap();
        assert!(system.stereo().is_enabled(target));
        let camera = CameraId(7);
        system.register_stereo_camera(camera);

        let mut draws = 0;
        let outcome = system
            .render_target_frame(target, camera, |_| {
                draws += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(outcome, FrameOutcome::Primed);
        assert_eq!(draws, 0);
        let provider = system.context_provider_as::<HeadlessContextProvider>().unwrap();
        assert!(!provider
            .events()
            .iter()
            .any(|e| matches!(e, ContextEvent::Swapped(_))));

        recorder(&mut system).clear_calls();
        let outcome = system
            .render_target_frame(target, camera, |_| {
                draws += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(outcome, FrameOutcome::Presented);
        assert_eq!(draws, 2);
        let buffers: Vec<GLenum> = recorder(&mut system)
            .calls()
            .iter()
            .filter_map(|c| match c {
                GlCall::DrawBuffer(b) => Some(*b),
                _ => None,
            })
            .collect();
        assert_eq!(buffers, vec![GL_BACK_LEFT, GL_BACK_LEFT, GL_BACK_RIGHT, GL_BACK]);
    }

    #[test]
    fn queued_listener_events_are_handled_at_begin_frame() {
        let provider = HeadlessContextProvider::new().with_stereo(true);
        let mut system = system_on(HeadlessDriver::desktop_compat(), provider);
        let mut desc = RenderTargetDesc::window("vr", 640, 480, false);
        desc.stereo = true;
        let target = system.create_render_window(desc).unwrap();

        let sender = system.listener_sender();
        sender
            .send(ListenerEvent::RenderTargetDestroyed(target))
            .unwrap();
        assert!(system.stereo().is_enabled(target));
        system.begin_frame().unwrap();
        assert!(!system.stereo().is_enabled(target));
    }

    #[test]
    fn profile_events_use_debug_markers() {
        let (mut system, _) = with_window(HeadlessDriver::desktop_compat());
        system.begin_profile_event("shadows");
        system.mark_profile_event("split");
        system.end_profile_event();
        assert_eq!(
            recorder(&mut system).take_calls(),
            vec![
                GlCall::PushDebugGroup("shadows".to_string()),
                GlCall::InsertDebugMarker("split".to_string()),
                GlCall::PopDebugGroup,
            ]
        );
    }

    #[test]
    fn point_sprites_toggle_only_on_fixed_function() {
        let (mut system, _) = with_window(HeadlessDriver::videocore_iv());
        system.set_point_sprites_enabled(true).unwrap();
        assert!(recorder(&mut system).calls().is_empty());

        let (mut system, _) = with_window(HeadlessDriver::desktop_compat());
        system.set_point_sprites_enabled(true).unwrap();
        assert_eq!(
            recorder(&mut system).take_calls(),
            vec![GlCall::Enable(GL_POINT_SPRITE)]
        );
    }

    #[test]
    fn shutdown_destroys_everything_once() {
        let (mut system, _) = with_window(HeadlessDriver::desktop_compat());
        system
            .create_render_window(RenderTargetDesc::window("second", 320, 240, false))
            .unwrap();
        system
            .create_offscreen_target(RenderTargetDesc::offscreen("rtt", 64, 64))
            .unwrap();

        system.shutdown();
        system.shutdown();
        assert!(system.render_targets().is_empty());
        assert_eq!(system.context_manager().current(), None);
        let provider = system.context_provider_as::<HeadlessContextProvider>().unwrap();
        assert!(!provider.is_live(ContextId(1)));
        assert!(!provider.is_live(ContextId(2)));
        assert_eq!(
            provider
                .events()
                .iter()
                .filter(|e| matches!(e, ContextEvent::Destroyed(_)))
                .count(),
            2
        );
        assert!(system.begin_frame().is_err());
    }
}
