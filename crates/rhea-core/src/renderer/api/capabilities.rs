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

//! The immutable snapshot of what the driver supports.

use std::collections::BTreeSet;
use std::fmt;

use super::texture::TextureType;

/// Which GL flavour the driver implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DriverProfile {
    /// OpenGL ES.
    #[default]
    OpenGlEs,
    /// Desktop OpenGL (compatibility profile).
    Desktop,
}

/// A `major.minor` driver API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DriverVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
}

impl DriverVersion {
    /// Creates a version.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Returns `true` if this version is at least `major.minor`.
    pub fn at_least(&self, major: u32, minor: u32) -> bool {
        *self >= Self::new(major, minor)
    }
}

impl fmt::Display for DriverVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

bitflags::bitflags! {
    /// Feature flags derived from the driver version and extensions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Features: u32 {
        /// Fixed-function transform, lighting, fog and texture stages.
        const FIXED_FUNCTION = 1 << 0;
        /// Vertex and fragment programs.
        const PROGRAMMABLE_PIPELINE = 1 << 1;
        /// Geometry programs.
        const GEOMETRY_PROGRAMS = 1 << 2;
        /// Instanced draws and attribute divisors.
        const INSTANCING = 1 << 3;
        /// Separate front and back stencil state.
        const TWO_SIDED_STENCIL = 1 << 4;
        /// Wrapping stencil increment and decrement.
        const STENCIL_WRAP = 1 << 5;
        /// Anisotropic texture filtering.
        const ANISOTROPY = 1 << 6;
        /// Cube map textures.
        const CUBE_MAPS = 1 << 7;
        /// Three-dimensional textures.
        const TEXTURE_3D = 1 << 8;
        /// Two-dimensional array textures.
        const TEXTURE_2D_ARRAY = 1 << 9;
        /// Wireframe and point polygon modes.
        const POLYGON_MODE = 1 << 10;
        /// User clip planes.
        const USER_CLIP_PLANES = 1 << 11;
        /// Point sprites.
        const POINT_SPRITES = 1 << 12;
        /// Debug groups and markers.
        const DEBUG_MARKERS = 1 << 13;
        /// Quad-buffered stereo back buffers.
        const QUAD_BUFFER_STEREO = 1 << 14;
        /// `Min` and `Max` blend operations.
        const BLEND_MIN_MAX = 1 << 15;
        /// Separate colour and alpha blend factors.
        const SEPARATE_BLEND = 1 << 16;
        /// One-dimensional textures.
        const TEXTURE_1D = 1 << 17;
    }
}

/// Driver limits and features, computed once after the main context is
/// current.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Capabilities {
    /// `GL_VENDOR`.
    pub vendor: String,
    /// `GL_RENDERER`.
    pub renderer: String,
    /// The full `GL_VERSION` string.
    pub version_string: String,
    /// ES or desktop.
    pub profile: DriverProfile,
    /// The parsed API version.
    pub version: DriverVersion,
    /// Texture units usable by programs.
    pub num_texture_units: usize,
    /// Texture units with fixed-function stages.
    pub num_fixed_function_texture_units: usize,
    /// Fixed-function light slots.
    pub num_lights: usize,
    /// User clip planes.
    pub num_clip_planes: usize,
    /// Generic vertex attribute slots.
    pub num_vertex_attribs: usize,
    /// Maximum anisotropy; `1.0` without the extension.
    pub max_anisotropy: f32,
    /// Derived feature flags.
    pub features: Features,
    /// Driver and window-system extensions.
    pub extensions: BTreeSet<String>,
}

impl Capabilities {
    /// Returns `true` if every flag in `features` is supported.
    pub fn has(&self, features: Features) -> bool {
        self.features.contains(features)
    }

    /// Returns `true` if the named extension was reported.
    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.contains(name)
    }

    /// Returns `true` if textures of this type can be bound.
    pub fn supports_texture_type(&self, ty: TextureType) -> bool {
        match ty {
            TextureType::D2 => true,
            TextureType::D1 => self.has(Features::TEXTURE_1D),
            TextureType::D3 => self.has(Features::TEXTURE_3D),
            TextureType::CubeMap => self.has(Features::CUBE_MAPS),
            TextureType::D2Array => self.has(Features::TEXTURE_2D_ARRAY),
        }
    }

    /// Returns `true` for OpenGL ES drivers.
    pub fn is_es(&self) -> bool {
        self.profile == DriverProfile::OpenGlEs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ordering() {
        let v = DriverVersion::new(2, 1);
        assert!(v.at_least(2, 0));
        assert!(v.at_least(2, 1));
        assert!(!v.at_least(3, 0));
        assert_eq!(v.to_string(), "2.1");
    }

    #[test]
    fn texture_type_support_follows_features() {
        let caps = Capabilities {
            features: Features::CUBE_MAPS,
            ..Default::default()
        };
        assert!(caps.supports_texture_type(TextureType::D2));
        assert!(caps.supports_texture_type(TextureType::CubeMap));
        assert!(!caps.supports_texture_type(TextureType::D3));
    }
}
