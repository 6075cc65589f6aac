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

//! Enums for fixed pipeline configuration.

use serde::{Deserialize, Serialize};

/// The comparison function used for depth, stencil and alpha testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompareFunction {
    /// The test never passes.
    Never,
    /// The test passes if the new value is less than the existing value.
    Less,
    /// The test passes if the new value is equal to the existing value.
    Equal,
    /// The test passes if the new value is less than or equal to the existing value.
    LessEqual,
    /// The test passes if the new value is greater than the existing value.
    Greater,
    /// The test passes if the new value is not equal to the existing value.
    NotEqual,
    /// The test passes if the new value is greater than or equal to the existing value.
    GreaterEqual,
    /// The test always passes.
    #[default]
    Always,
}

/// An operation to perform on a stencil buffer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StencilOperation {
    /// Keep the existing stencil value.
    #[default]
    Keep,
    /// Set the stencil value to zero.
    Zero,
    /// Replace the stencil value with the reference value.
    Replace,
    /// Increment the stencil value, clamping at the maximum.
    Increment,
    /// Decrement the stencil value, clamping at zero.
    Decrement,
    /// Increment the stencil value, wrapping to zero.
    IncrementWrap,
    /// Decrement the stencil value, wrapping to the maximum.
    DecrementWrap,
    /// Bitwise invert the stencil value.
    Invert,
}

impl StencilOperation {
    /// Returns the operation with increment and decrement swapped.
    ///
    /// Used for the face that points away from the viewer when rendering with
    /// a flipped projection, so two-sided stencil volumes keep their meaning.
    pub fn inverted(self) -> Self {
        match self {
            StencilOperation::Increment => StencilOperation::Decrement,
            StencilOperation::Decrement => StencilOperation::Increment,
            StencilOperation::IncrementWrap => StencilOperation::DecrementWrap,
            StencilOperation::DecrementWrap => StencilOperation::IncrementWrap,
            other => other,
        }
    }

    /// Returns `true` for the wrapping variants, which need stencil-wrap
    /// support from the driver.
    pub fn wraps(self) -> bool {
        matches!(
            self,
            StencilOperation::IncrementWrap | StencilOperation::DecrementWrap
        )
    }
}

/// A factor used in the blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendFactor {
    /// `1`
    One,
    /// `0`
    Zero,
    /// The destination colour.
    DestColour,
    /// The source colour.
    SourceColour,
    /// `1 - destination colour`.
    OneMinusDestColour,
    /// `1 - source colour`.
    OneMinusSourceColour,
    /// The destination alpha.
    DestAlpha,
    /// The source alpha.
    SourceAlpha,
    /// `1 - destination alpha`.
    OneMinusDestAlpha,
    /// `1 - source alpha`.
    OneMinusSourceAlpha,
}

/// The operation combining the weighted source and destination in blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendOperation {
    /// `src + dst`
    #[default]
    Add,
    /// `src - dst`
    Subtract,
    /// `dst - src`
    ReverseSubtract,
    /// `min(src, dst)`
    Min,
    /// `max(src, dst)`
    Max,
}

/// Which vertex winding is culled.
///
/// The winding is interpreted in window space, so a render target that needs
/// texture flipping reverses the face that is culled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CullingMode {
    /// No culling.
    None,
    /// Cull triangles whose vertices wind clockwise.
    #[default]
    Clockwise,
    /// Cull triangles whose vertices wind anticlockwise.
    Anticlockwise,
}

/// How polygons are rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PolygonMode {
    /// Only vertices are rendered.
    Points,
    /// Only edges are rendered.
    Wireframe,
    /// Polygons are filled.
    #[default]
    Solid,
}

/// Fixed-function shading model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShadeOptions {
    /// One colour per face.
    Flat,
    /// Colours interpolated across the face.
    #[default]
    Gouraud,
    /// Treated as Gouraud by the fixed-function pipeline.
    Phong,
}

/// Fog falloff mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FogMode {
    /// Fog disabled.
    #[default]
    None,
    /// Exponential falloff.
    Exp,
    /// Squared exponential falloff.
    Exp2,
    /// Linear falloff between the start and end distances.
    Linear,
}

/// Defines how vertices are connected to form a geometric primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PrimitiveTopology {
    /// Isolated points.
    PointList,
    /// Isolated lines, two vertices each.
    LineList,
    /// A connected line strip.
    LineStrip,
    /// Isolated triangles, three vertices each.
    #[default]
    TriangleList,
    /// A connected triangle strip.
    TriangleStrip,
    /// A triangle fan around the first vertex.
    TriangleFan,
}

impl PrimitiveTopology {
    /// Returns the number of primitives drawn from `count` vertices or indices.
    pub fn primitive_count(self, count: u32) -> u32 {
        match self {
            PrimitiveTopology::PointList => count,
            PrimitiveTopology::LineList => count / 2,
            PrimitiveTopology::LineStrip => count.saturating_sub(1),
            PrimitiveTopology::TriangleList => count / 3,
            PrimitiveTopology::TriangleStrip | PrimitiveTopology::TriangleFan => {
                count.saturating_sub(2)
            }
        }
    }
}

/// How a fixed-function texture unit combines its texel with the incoming
/// colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureBlendMode {
    /// Use the texel, ignoring the incoming colour.
    Replace,
    /// Add the texel to the incoming colour.
    Add,
    /// Multiply the texel with the incoming colour.
    #[default]
    Modulate,
    /// Blend the texel over the incoming colour by the texel alpha.
    Decal,
}
