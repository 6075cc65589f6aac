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

//! Conversions from the backend-agnostic state types to raw GL enums.

use rhea_core::renderer::{
    BlendFactor, BlendOperation, CompareFunction, CullingMode, FilterOptions, FogMode,
    GpuProgramType, IndexType, PolygonMode, PrimitiveTopology, ShadeOptions, StencilOperation,
    TextureAddressingMode, TextureBlendMode, TextureType, VertexElementType,
};

use super::enums::*;

/// A local extension trait converting the engine's state types into GL enums.
/// This keeps the `.into_gl()` call syntax without touching `rhea-core`.
pub trait IntoGl {
    /// Returns the matching GL enum.
    fn into_gl(self) -> GLenum;
}

impl IntoGl for CompareFunction {
    fn into_gl(self) -> GLenum {
        match self {
            CompareFunction::Never => GL_NEVER,
            CompareFunction::Less => GL_LESS,
            CompareFunction::Equal => GL_EQUAL,
            CompareFunction::LessEqual => GL_LEQUAL,
            CompareFunction::Greater => GL_GREATER,
            CompareFunction::NotEqual => GL_NOTEQUAL,
            CompareFunction::GreaterEqual => GL_GEQUAL,
            CompareFunction::Always => GL_ALWAYS,
        }
    }
}

impl IntoGl for StencilOperation {
    fn into_gl(self) -> GLenum {
        match self {
            StencilOperation::Keep => GL_KEEP,
            StencilOperation::Zero => GL_ZERO,
            StencilOperation::Replace => GL_REPLACE,
            StencilOperation::Increment => GL_INCR,
            StencilOperation::Decrement => GL_DECR,
            StencilOperation::IncrementWrap => GL_INCR_WRAP,
            StencilOperation::DecrementWrap => GL_DECR_WRAP,
            StencilOperation::Invert => GL_INVERT,
        }
    }
}

impl IntoGl for BlendFactor {
    fn into_gl(self) -> GLenum {
        match self {
            BlendFactor::One => GL_ONE,
            BlendFactor::Zero => GL_ZERO,
            BlendFactor::DestColour => GL_DST_COLOR,
            BlendFactor::SourceColour => GL_SRC_COLOR,
            BlendFactor::OneMinusDestColour => GL_ONE_MINUS_DST_COLOR,
            BlendFactor::OneMinusSourceColour => GL_ONE_MINUS_SRC_COLOR,
            BlendFactor::DestAlpha => GL_DST_ALPHA,
            BlendFactor::SourceAlpha => GL_SRC_ALPHA,
            BlendFactor::OneMinusDestAlpha => GL_ONE_MINUS_DST_ALPHA,
            BlendFactor::OneMinusSourceAlpha => GL_ONE_MINUS_SRC_ALPHA,
        }
    }
}

impl IntoGl for BlendOperation {
    fn into_gl(self) -> GLenum {
        match self {
            BlendOperation::Add => GL_FUNC_ADD,
            BlendOperation::Subtract => GL_FUNC_SUBTRACT,
            BlendOperation::ReverseSubtract => GL_FUNC_REVERSE_SUBTRACT,
            BlendOperation::Min => GL_MIN,
            BlendOperation::Max => GL_MAX,
        }
    }
}

impl IntoGl for PolygonMode {
    fn into_gl(self) -> GLenum {
        match self {
            PolygonMode::Points => GL_POINT,
            PolygonMode::Wireframe => GL_LINE,
            PolygonMode::Solid => GL_FILL,
        }
    }
}

impl IntoGl for ShadeOptions {
    fn into_gl(self) -> GLenum {
        match self {
            ShadeOptions::Flat => GL_FLAT,
            ShadeOptions::Gouraud | ShadeOptions::Phong => GL_SMOOTH,
        }
    }
}

impl IntoGl for PrimitiveTopology {
    fn into_gl(self) -> GLenum {
        match self {
            PrimitiveTopology::PointList => GL_POINTS,
            PrimitiveTopology::LineList => GL_LINES,
            PrimitiveTopology::LineStrip => GL_LINE_STRIP,
            PrimitiveTopology::TriangleList => GL_TRIANGLES,
            PrimitiveTopology::TriangleStrip => GL_TRIANGLE_STRIP,
            PrimitiveTopology::TriangleFan => GL_TRIANGLE_FAN,
        }
    }
}

impl IntoGl for TextureType {
    fn into_gl(self) -> GLenum {
        match self {
            TextureType::D1 => GL_TEXTURE_1D,
            TextureType::D2 => GL_TEXTURE_2D,
            TextureType::D3 => GL_TEXTURE_3D,
            TextureType::CubeMap => GL_TEXTURE_CUBE_MAP,
            TextureType::D2Array => GL_TEXTURE_2D_ARRAY,
        }
    }
}

impl IntoGl for TextureAddressingMode {
    fn into_gl(self) -> GLenum {
        match self {
            TextureAddressingMode::Wrap => GL_REPEAT,
            TextureAddressingMode::Mirror => GL_MIRRORED_REPEAT,
            TextureAddressingMode::Clamp => GL_CLAMP_TO_EDGE,
            TextureAddressingMode::Border => GL_CLAMP_TO_BORDER,
        }
    }
}

impl IntoGl for TextureBlendMode {
    fn into_gl(self) -> GLenum {
        match self {
            TextureBlendMode::Replace => GL_REPLACE,
            TextureBlendMode::Add => GL_ADD,
            TextureBlendMode::Modulate => GL_MODULATE,
            TextureBlendMode::Decal => GL_DECAL,
        }
    }
}

impl IntoGl for IndexType {
    fn into_gl(self) -> GLenum {
        match self {
            IndexType::U16 => GL_UNSIGNED_SHORT,
            IndexType::U32 => GL_UNSIGNED_INT,
        }
    }
}

impl IntoGl for VertexElementType {
    fn into_gl(self) -> GLenum {
        match self {
            VertexElementType::Float1
            | VertexElementType::Float2
            | VertexElementType::Float3
            | VertexElementType::Float4 => GL_FLOAT,
            VertexElementType::UByte4Norm => GL_UNSIGNED_BYTE,
            VertexElementType::Short2 | VertexElementType::Short4 => GL_SHORT,
        }
    }
}

impl IntoGl for GpuProgramType {
    fn into_gl(self) -> GLenum {
        match self {
            GpuProgramType::Vertex => GL_VERTEX_SHADER,
            GpuProgramType::Fragment => GL_FRAGMENT_SHADER,
            GpuProgramType::Geometry => GL_GEOMETRY_SHADER,
        }
    }
}

/// The fog mode enum, or `None` when fog is disabled.
pub fn fog_mode(mode: FogMode) -> Option<GLenum> {
    match mode {
        FogMode::None => None,
        FogMode::Exp => Some(GL_EXP),
        FogMode::Exp2 => Some(GL_EXP2),
        FogMode::Linear => Some(GL_LINEAR),
    }
}

/// GL exposes min and mip filtering as one `GL_TEXTURE_MIN_FILTER` value.
pub fn combined_min_mip_filter(min: FilterOptions, mip: FilterOptions) -> GLenum {
    match (min, mip) {
        (FilterOptions::Anisotropic | FilterOptions::Linear, FilterOptions::Anisotropic)
        | (FilterOptions::Anisotropic | FilterOptions::Linear, FilterOptions::Linear) => {
            GL_LINEAR_MIPMAP_LINEAR
        }
        (FilterOptions::Anisotropic | FilterOptions::Linear, FilterOptions::Point) => {
            GL_LINEAR_MIPMAP_NEAREST
        }
        (FilterOptions::Anisotropic | FilterOptions::Linear, FilterOptions::None) => GL_LINEAR,
        (FilterOptions::Point | FilterOptions::None, FilterOptions::Anisotropic)
        | (FilterOptions::Point | FilterOptions::None, FilterOptions::Linear) => {
            GL_NEAREST_MIPMAP_LINEAR
        }
        (FilterOptions::Point | FilterOptions::None, FilterOptions::Point) => {
            GL_NEAREST_MIPMAP_NEAREST
        }
        (FilterOptions::Point | FilterOptions::None, FilterOptions::None) => GL_NEAREST,
    }
}

/// The `GL_TEXTURE_MAG_FILTER` value.
pub fn mag_filter(options: FilterOptions) -> GLenum {
    match options {
        FilterOptions::Anisotropic | FilterOptions::Linear => GL_LINEAR,
        FilterOptions::Point | FilterOptions::None => GL_NEAREST,
    }
}

/// The face passed to `glCullFace`, or `None` when culling is disabled.
///
/// Winding is flipped for targets rendered upside down.
pub fn cull_face(mode: CullingMode, flip: bool) -> Option<GLenum> {
    match mode {
        CullingMode::None => None,
        CullingMode::Clockwise => Some(if flip { GL_FRONT } else { GL_BACK }),
        CullingMode::Anticlockwise => Some(if flip { GL_BACK } else { GL_FRONT }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_and_mip_combine() {
        assert_eq!(
            combined_min_mip_filter(FilterOptions::Linear, FilterOptions::Linear),
            GL_LINEAR_MIPMAP_LINEAR
        );
        assert_eq!(
            combined_min_mip_filter(FilterOptions::Linear, FilterOptions::None),
            GL_LINEAR
        );
        assert_eq!(
            combined_min_mip_filter(FilterOptions::Point, FilterOptions::Point),
            GL_NEAREST_MIPMAP_NEAREST
        );
        assert_eq!(
            combined_min_mip_filter(FilterOptions::Anisotropic, FilterOptions::Point),
            GL_LINEAR_MIPMAP_NEAREST
        );
    }

    #[test]
    fn culling_flips_with_target() {
        assert_eq!(cull_face(CullingMode::Clockwise, false), Some(GL_BACK));
        assert_eq!(cull_face(CullingMode::Clockwise, true), Some(GL_FRONT));
        assert_eq!(cull_face(CullingMode::Anticlockwise, false), Some(GL_FRONT));
        assert_eq!(cull_face(CullingMode::None, true), None);
    }
}
