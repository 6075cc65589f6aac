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

//! Quad-buffer stereo rendering.
//!
//! Each frame of a stereo target is rendered twice, once into the left back
//! buffer and once into the right one. The path learns about frames and
//! entity lifetimes through [`ListenerEvent`]s, which a routing table sends
//! to one handler per event kind. All registries hold plain ids; destroying
//! an entity deregisters it.
//!
//! The first frame a camera renders into a stereo target primes it: the
//! camera is not drawn and the frame is not presented, so a stale back
//! buffer never reaches the display.

use std::collections::{HashMap, HashSet};

use rhea_core::renderer::{
    CameraId, Capabilities, Features, ListenerEvent, RenderError, RenderTargetId, SceneManagerId,
};

use super::conversions::IntoGl;
use super::enums::{GLenum, GL_BACK, GL_BACK_LEFT, GL_BACK_RIGHT};

/// The back buffer draws go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawBuffer {
    /// The ordinary back buffer.
    Mono,
    /// The left eye's back buffer.
    Left,
    /// The right eye's back buffer.
    Right,
}

impl IntoGl for DrawBuffer {
    fn into_gl(self) -> GLenum {
        match self {
            DrawBuffer::Mono => GL_BACK,
            DrawBuffer::Left => GL_BACK_LEFT,
            DrawBuffer::Right => GL_BACK_RIGHT,
        }
    }
}

/// What the render system must do in response to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StereoAction {
    /// Select a draw buffer.
    SelectDrawBuffer(DrawBuffer),
    /// Skip drawing this camera; the frame is a priming frame.
    SuppressFrame(CameraId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum EventKind {
    PreTargetUpdate,
    PostTargetUpdate,
    CameraPreRender,
    ShadowsPreRender,
    ShadowsUpdated,
    CameraDestroyed,
    TargetDestroyed,
    SceneManagerDestroyed,
}

impl EventKind {
    fn of(event: &ListenerEvent) -> Self {
        match event {
            ListenerEvent::PreRenderTargetUpdate(_) => EventKind::PreTargetUpdate,
            ListenerEvent::PostRenderTargetUpdate(_) => EventKind::PostTargetUpdate,
            ListenerEvent::CameraPreRender(_) => EventKind::CameraPreRender,
            ListenerEvent::ShadowTexturesPreRender(_) => EventKind::ShadowsPreRender,
            ListenerEvent::ShadowTexturesUpdated(_) => EventKind::ShadowsUpdated,
            ListenerEvent::CameraDestroyed(_) => EventKind::CameraDestroyed,
            ListenerEvent::RenderTargetDestroyed(_) => EventKind::TargetDestroyed,
            ListenerEvent::SceneManagerDestroyed(_) => EventKind::SceneManagerDestroyed,
        }
    }
}

type Handler = fn(&mut StereoRenderer, ListenerEvent) -> Option<StereoAction>;

#[derive(Debug, Clone, Copy, Default)]
struct CameraStereo {
    primed: bool,
}

#[derive(Debug, Clone, Copy)]
struct ActiveUpdate {
    target: RenderTargetId,
    next_eye: DrawBuffer,
}

/// Registries and per-frame state of the stereo path.
#[derive(Debug)]
pub struct StereoRenderer {
    routes: HashMap<EventKind, Handler>,
    targets: HashSet<RenderTargetId>,
    cameras: HashMap<CameraId, CameraStereo>,
    scene_managers: HashSet<SceneManagerId>,
    active: Option<ActiveUpdate>,
    shadow_pass: Option<SceneManagerId>,
    priming: HashSet<CameraId>,
}

impl Default for StereoRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl StereoRenderer {
    /// Creates the path with empty registries.
    pub fn new() -> Self {
        let routes: [(EventKind, Handler); 8] = [
            (EventKind::PreTargetUpdate, Self::on_pre_target_update),
            (EventKind::PostTargetUpdate, Self::on_post_target_update),
            (EventKind::CameraPreRender, Self::on_camera_pre_render),
            (EventKind::ShadowsPreRender, Self::on_shadows_pre_render),
            (EventKind::ShadowsUpdated, Self::on_shadows_updated),
            (EventKind::CameraDestroyed, Self::on_camera_destroyed),
            (EventKind::TargetDestroyed, Self::on_target_destroyed),
            (EventKind::SceneManagerDestroyed, Self::on_scene_manager_destroyed),
        ];
        Self {
            routes: routes.into_iter().collect(),
            targets: HashSet::new(),
            cameras: HashMap::new(),
            scene_managers: HashSet::new(),
            active: None,
            shadow_pass: None,
            priming: HashSet::new(),
        }
    }

    /// Turns stereo on for a target.
    pub fn enable(
        &mut self,
        target: RenderTargetId,
        capabilities: &Capabilities,
    ) -> Result<(), RenderError> {
        if !capabilities.has(Features::QUAD_BUFFER_STEREO) {
            return Err(RenderError::UnsupportedFeature(
                "quad-buffer stereo".to_string(),
            ));
        }
        if self.targets.insert(target) {
            log::info!("Stereo rendering enabled on {target}.");
        }
        Ok(())
    }

    /// Turns stereo off for a target.
    pub fn disable(&mut self, target: RenderTargetId) {
        if self.targets.remove(&target) {
            log::info!("Stereo rendering disabled on {target}.");
        }
        if self.active.map(|a| a.target) == Some(target) {
            self.active = None;
        }
    }

    /// Registers a camera. Its next stereo frame is a priming frame.
    pub fn register_camera(&mut self, camera: CameraId) {
        self.cameras.entry(camera).or_default();
    }

    /// Registers a scene manager whose shadow passes suspend eye switching.
    pub fn register_scene_manager(&mut self, scene_manager: SceneManagerId) {
        self.scene_managers.insert(scene_manager);
    }

    /// Whether stereo is on for a target.
    pub fn is_enabled(&self, target: RenderTargetId) -> bool {
        self.targets.contains(&target)
    }

    /// Whether a camera is registered.
    pub fn has_camera(&self, camera: CameraId) -> bool {
        self.cameras.contains_key(&camera)
    }

    /// Whether a scene manager is registered.
    pub fn has_scene_manager(&self, scene_manager: SceneManagerId) -> bool {
        self.scene_managers.contains(&scene_manager)
    }

    /// Whether a camera has rendered its priming frame.
    pub fn is_primed(&self, camera: CameraId) -> bool {
        self.cameras.get(&camera).is_some_and(|c| c.primed)
    }

    /// Routes an event to its handler.
    pub fn handle(&mut self, event: ListenerEvent) -> Option<StereoAction> {
        let handler = *self.routes.get(&EventKind::of(&event))?;
        handler(self, event)
    }

    fn on_pre_target_update(&mut self, event: ListenerEvent) -> Option<StereoAction> {
        let ListenerEvent::PreRenderTargetUpdate(target) = event else {
            return None;
        };
        if !self.targets.contains(&target) {
            return None;
        }
        self.active = Some(ActiveUpdate {
            target,
            next_eye: DrawBuffer::Left,
        });
        Some(StereoAction::SelectDrawBuffer(DrawBuffer::Left))
    }

    fn on_post_target_update(&mut self, event: ListenerEvent) -> Option<StereoAction> {
        let ListenerEvent::PostRenderTargetUpdate(target) = event else {
            return None;
        };
        if self.active.map(|a| a.target) != Some(target) {
            return None;
        }
        self.active = None;
        for camera in self.priming.drain() {
            if let Some(state) = self.cameras.get_mut(&camera) {
                state.primed = true;
                log::debug!("Stereo: {camera} primed.");
            }
        }
        Some(StereoAction::SelectDrawBuffer(DrawBuffer::Mono))
    }

    fn on_camera_pre_render(&mut self, event: ListenerEvent) -> Option<StereoAction> {
        let ListenerEvent::CameraPreRender(camera) = event else {
            return None;
        };
        let active = self.active.as_mut()?;
        if self.shadow_pass.is_some() {
            return None;
        }
        let state = self.cameras.get(&camera)?;
        if !state.primed {
            self.priming.insert(camera);
            return Some(StereoAction::SuppressFrame(camera));
        }
        let eye = active.next_eye;
        active.next_eye = match eye {
            DrawBuffer::Left => DrawBuffer::Right,
            _ => DrawBuffer::Left,
        };
        Some(StereoAction::SelectDrawBuffer(eye))
    }

    fn on_shadows_pre_render(&mut self, event: ListenerEvent) -> Option<StereoAction> {
        let ListenerEvent::ShadowTexturesPreRender(scene_manager) = event else {
            return None;
        };
        if self.scene_managers.contains(&scene_manager) {
            self.shadow_pass = Some(scene_manager);
        }
        None
    }

    fn on_shadows_updated(&mut self, event: ListenerEvent) -> Option<StereoAction> {
        let ListenerEvent::ShadowTexturesUpdated(scene_manager) = event else {
            return None;
        };
        if self.shadow_pass == Some(scene_manager) {
            self.shadow_pass = None;
        }
        None
    }

    fn on_camera_destroyed(&mut self, event: ListenerEvent) -> Option<StereoAction> {
        let ListenerEvent::CameraDestroyed(camera) = event else {
            return None;
        };
        self.cameras.remove(&camera);
        self.priming.remove(&camera);
        None
    }

    fn on_target_destroyed(&mut self, event: ListenerEvent) -> Option<StereoAction> {
        let ListenerEvent::RenderTargetDestroyed(target) = event else {
            return None;
        };
        self.disable(target);
        None
    }

    fn on_scene_manager_destroyed(&mut self, event: ListenerEvent) -> Option<StereoAction> {
        let ListenerEvent::SceneManagerDestroyed(scene_manager) = event else {
            return None;
        };
        self.scene_managers.remove(&scene_manager);
        if self.shadow_pass == Some(scene_manager) {
            self.shadow_pass = None;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo_caps() -> Capabilities {
        Capabilities {
            features: Features::QUAD_BUFFER_STEREO,
            ..Default::default()
        }
    }

    #[test]
    fn enable_requires_quad_buffer_stereo() {
        let mut stereo = StereoRenderer::new();
        assert!(stereo
            .enable(RenderTargetId(1), &Capabilities::default())
            .is_err());
        assert!(stereo.enable(RenderTargetId(1), &stereo_caps()).is_ok());
    }

    #[test]
    fn mono_targets_are_ignored() {
        let mut stereo = StereoRenderer::new();
        assert_eq!(
            stereo.handle(ListenerEvent::PreRenderTargetUpdate(RenderTargetId(3))),
            None
        );
        assert_eq!(stereo.handle(ListenerEvent::CameraPreRender(CameraId(1))), None);
    }

    #[test]
    fn eyes_alternate_after_priming() {
        let target = RenderTargetId(1);
        let camera = CameraId(7);
        let mut stereo = StereoRenderer::new();
        stereo.enable(target, &stereo_caps()).unwrap();
        stereo.register_camera(camera);

        stereo.handle(ListenerEvent::PreRenderTargetUpdate(target));
        assert_eq!(
            stereo.handle(ListenerEvent::CameraPreRender(camera)),
            Some(StereoAction::SuppressFrame(camera))
        );
        stereo.handle(ListenerEvent::PostRenderTargetUpdate(target));
        assert!(stereo.is_primed(camera));

        stereo.handle(ListenerEvent::PreRenderTargetUpdate(target));
        assert_eq!(
            stereo.handle(ListenerEvent::CameraPreRender(camera)),
            Some(StereoAction::SelectDrawBuffer(DrawBuffer::Left))
        );
        assert_eq!(
            stereo.handle(ListenerEvent::CameraPreRender(camera)),
            Some(StereoAction::SelectDrawBuffer(DrawBuffer::Right))
        );
        assert_eq!(
            stereo.handle(ListenerEvent::PostRenderTargetUpdate(target)),
            Some(StereoAction::SelectDrawBuffer(DrawBuffer::Mono))
        );
    }

    #[test]
    fn unregistered_cameras_are_not_tracked() {
        let target = RenderTargetId(1);
        let camera = CameraId(4);
        let mut stereo = StereoRenderer::new();
        stereo.enable(target, &stereo_caps()).unwrap();

        stereo.handle(ListenerEvent::PreRenderTargetUpdate(target));
        assert_eq!(stereo.handle(ListenerEvent::CameraPreRender(camera)), None);
        stereo.handle(ListenerEvent::PostRenderTargetUpdate(target));

        assert!(!stereo.has_camera(camera));
        assert!(!stereo.is_primed(camera));
    }

    #[test]
    fn shadow_pass_suspends_eye_switching() {
        let target = RenderTargetId(1);
        let scene = SceneManagerId(2);
        let camera = CameraId(1);
        let mut stereo = StereoRenderer::new();
        stereo.enable(target, &stereo_caps()).unwrap();
        stereo.register_scene_manager(scene);
        stereo.register_camera(camera);
        stereo.handle(ListenerEvent::PreRenderTargetUpdate(target));
        stereo.handle(ListenerEvent::CameraPreRender(camera));
        stereo.handle(ListenerEvent::PostRenderTargetUpdate(target));

        stereo.handle(ListenerEvent::PreRenderTargetUpdate(target));
        stereo.handle(ListenerEvent::ShadowTexturesPreRender(scene));
        assert_eq!(stereo.handle(ListenerEvent::CameraPreRender(CameraId(9))), None);
        stereo.handle(ListenerEvent::ShadowTexturesUpdated(scene));
        assert_eq!(
            stereo.handle(ListenerEvent::CameraPreRender(camera)),
            Some(StereoAction::SelectDrawBuffer(DrawBuffer::Left))
        );
    }

    #[test]
    fn destruction_deregisters() {
        let mut stereo = StereoRenderer::new();
        stereo.enable(RenderTargetId(1), &stereo_caps()).unwrap();
        stereo.register_camera(CameraId(1));
        stereo.register_scene_manager(SceneManagerId(1));

        stereo.handle(ListenerEvent::RenderTargetDestroyed(RenderTargetId(1)));
        stereo.handle(ListenerEvent::CameraDestroyed(CameraId(1)));
        stereo.handle(ListenerEvent::SceneManagerDestroyed(SceneManagerId(1)));

        assert!(!stereo.is_enabled(RenderTargetId(1)));
        assert!(!stereo.has_camera(CameraId(1)));
        assert!(!stereo.has_scene_manager(SceneManagerId(1)));
    }
}
