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

//! Render targets, contexts and the listener identifiers of the dual-buffer
//! path.

use std::fmt;

use crate::math::Rect;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Identifies a render target registered with the render system.
    RenderTargetId,
    "target"
);
id_type!(
    /// An opaque handle to a graphics context.
    ContextId,
    "context"
);
id_type!(
    /// A non-owning reference to a camera.
    CameraId,
    "camera"
);
id_type!(
    /// A non-owning reference to a scene manager.
    SceneManagerId,
    "scene-manager"
);

/// Whether a render target is a window or an offscreen surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTargetKind {
    /// An on-screen window owning its own context.
    Window {
        /// Whether the window covers the whole display.
        full_screen: bool,
    },
    /// An offscreen surface sharing the main context.
    Offscreen,
}

/// Describes a render target to create.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderTargetDesc {
    /// A unique, human-readable name.
    pub name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Window or offscreen.
    pub kind: RenderTargetKind,
    /// `true` for targets whose origin is the top-left corner (render
    /// textures), which flips culling and scissor orientation.
    pub requires_texture_flipping: bool,
    /// Request a quad-buffered stereo surface.
    pub stereo: bool,
}

impl RenderTargetDesc {
    /// Describes a window.
    pub fn window(name: &str, width: u32, height: u32, full_screen: bool) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            kind: RenderTargetKind::Window { full_screen },
            requires_texture_flipping: false,
            stereo: false,
        }
    }

    /// Describes an offscreen target. Offscreen targets are flipped.
    pub fn offscreen(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            kind: RenderTargetKind::Offscreen,
            requires_texture_flipping: true,
            stereo: false,
        }
    }

    /// Returns `true` for windows.
    pub fn is_window(&self) -> bool {
        matches!(self.kind, RenderTargetKind::Window { .. })
    }
}

/// A rectangle of the current render target, in pixels from the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Viewport {
    /// Left edge.
    pub left: i32,
    /// Top edge.
    pub top: i32,
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

impl Viewport {
    /// A viewport covering a whole target.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            left: 0,
            top: 0,
            width: width as i32,
            height: height as i32,
        }
    }

    /// The viewport as a rectangle.
    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.left, self.top, self.width, self.height)
    }
}

bitflags::bitflags! {
    /// Buffers affected by a clear.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FrameBufferType: u8 {
        /// The colour buffer.
        const COLOUR = 1;
        /// The depth buffer.
        const DEPTH = 2;
        /// The stencil buffer.
        const STENCIL = 4;
    }
}

/// Lifecycle notifications consumed by the dual-buffer path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerEvent {
    /// A render target is about to be updated.
    PreRenderTargetUpdate(RenderTargetId),
    /// A render target finished updating.
    PostRenderTargetUpdate(RenderTargetId),
    /// A camera is about to render.
    CameraPreRender(CameraId),
    /// A scene manager starts rendering shadow textures.
    ShadowTexturesPreRender(SceneManagerId),
    /// A scene manager finished updating its shadow textures.
    ShadowTexturesUpdated(SceneManagerId),
    /// A camera was destroyed.
    CameraDestroyed(CameraId),
    /// A render target was destroyed.
    RenderTargetDestroyed(RenderTargetId),
    /// A scene manager was destroyed.
    SceneManagerDestroyed(SceneManagerId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_with_prefix() {
        assert_eq!(RenderTargetId(3).to_string(), "target#3");
        assert_eq!(ContextId(1).to_string(), "context#1");
    }

    #[test]
    fn offscreen_targets_are_flipped() {
        let desc = RenderTargetDesc::offscreen("shadow", 512, 512);
        assert!(desc.requires_texture_flipping);
        assert!(!desc.is_window());
        assert!(RenderTargetDesc::window("main", 1280, 800, true).is_window());
    }
}
