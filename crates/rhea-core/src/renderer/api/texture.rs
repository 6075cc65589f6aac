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

//! Texture and sampler types.

use serde::{Deserialize, Serialize};

/// The dimensionality of a texture, which selects the bind target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureType {
    /// A one-dimensional texture.
    D1,
    /// A two-dimensional texture.
    D2,
    /// A three-dimensional texture.
    D3,
    /// A cube map with six faces.
    CubeMap,
    /// An array of two-dimensional layers.
    D2Array,
}

/// A driver texture object together with its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureHandle {
    /// The driver-side texture name. `0` is the default texture.
    pub id: u32,
    /// The texture type.
    pub ty: TextureType,
}

impl TextureHandle {
    /// Creates a new handle.
    pub const fn new(id: u32, ty: TextureType) -> Self {
        Self { id, ty }
    }
}

/// Which filter stage an option applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterType {
    /// Filtering when the texture is minified.
    Min,
    /// Filtering when the texture is magnified.
    Mag,
    /// Filtering between mip levels.
    Mip,
}

/// The filtering applied by a filter stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FilterOptions {
    /// No filtering. For `Mip` this disables mipmapping.
    None,
    /// Nearest texel.
    #[default]
    Point,
    /// Bilinear interpolation.
    Linear,
    /// Anisotropic filtering; linear filtering plus the anisotropy level.
    Anisotropic,
}

/// How texture coordinates outside `[0, 1]` are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureAddressingMode {
    /// Repeat the texture.
    #[default]
    Wrap,
    /// Repeat the texture, mirroring every other repetition.
    Mirror,
    /// Clamp to the edge texel.
    Clamp,
    /// Clamp to the border colour.
    Border,
}

/// Addressing modes for the three texture axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct UvwAddressingMode {
    /// The `s` axis.
    pub u: TextureAddressingMode,
    /// The `t` axis.
    pub v: TextureAddressingMode,
    /// The `r` axis.
    pub w: TextureAddressingMode,
}

impl UvwAddressingMode {
    /// Uses the same mode for all axes.
    pub const fn uniform(mode: TextureAddressingMode) -> Self {
        Self {
            u: mode,
            v: mode,
            w: mode,
        }
    }
}

/// A complete sampler description applied to one texture unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplerState {
    /// Minification filter.
    pub min_filter: FilterOptions,
    /// Magnification filter.
    pub mag_filter: FilterOptions,
    /// Mip filter.
    pub mip_filter: FilterOptions,
    /// Addressing per axis.
    pub addressing: UvwAddressingMode,
    /// Maximum anisotropy; `1.0` disables anisotropic filtering.
    pub max_anisotropy: f32,
}

impl Default for SamplerState {
    fn default() -> Self {
        Self {
            min_filter: FilterOptions::Linear,
            mag_filter: FilterOptions::Linear,
            mip_filter: FilterOptions::Point,
            addressing: UvwAddressingMode::default(),
            max_anisotropy: 1.0,
        }
    }
}
