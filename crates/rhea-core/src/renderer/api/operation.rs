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

//! Pre-resolved draw calls.

use super::pipeline::PrimitiveTopology;

/// A driver buffer object name. `BufferId(0)` unbinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferId(pub u32);

impl BufferId {
    /// The null buffer.
    pub const NONE: Self = BufferId(0);
}

/// The meaning of a vertex element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexElementSemantic {
    /// Vertex position.
    Position,
    /// Skinning weights.
    BlendWeights,
    /// Vertex normal.
    Normal,
    /// Primary (diffuse) colour.
    Diffuse,
    /// Secondary (specular) colour.
    Specular,
    /// Skinning indices.
    BlendIndices,
    /// Texture coordinate set `n` (0..=5).
    TexCoord(u8),
    /// Tangent vector.
    Tangent,
    /// Binormal vector.
    Binormal,
}

impl VertexElementSemantic {
    /// The generic attribute slot the semantic is bound to.
    ///
    /// Slots follow the fixed-function aliasing convention so the same vertex
    /// layout works with both pipelines.
    pub fn attribute_index(self) -> u32 {
        match self {
            VertexElementSemantic::Position => 0,
            VertexElementSemantic::BlendWeights => 1,
            VertexElementSemantic::Normal => 2,
            VertexElementSemantic::Diffuse => 3,
            VertexElementSemantic::Specular => 4,
            VertexElementSemantic::BlendIndices => 7,
            VertexElementSemantic::TexCoord(n) => 8 + u32::from(n),
            VertexElementSemantic::Tangent => 14,
            VertexElementSemantic::Binormal => 15,
        }
    }
}

/// The memory format of a vertex element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexElementType {
    /// One 32-bit float.
    Float1,
    /// Two 32-bit floats.
    Float2,
    /// Three 32-bit floats.
    Float3,
    /// Four 32-bit floats.
    Float4,
    /// Four normalized unsigned bytes (packed colour).
    UByte4Norm,
    /// Two 16-bit signed integers.
    Short2,
    /// Four 16-bit signed integers.
    Short4,
}

impl VertexElementType {
    /// Number of components.
    pub fn component_count(self) -> i32 {
        match self {
            VertexElementType::Float1 => 1,
            VertexElementType::Float2 | VertexElementType::Short2 => 2,
            VertexElementType::Float3 => 3,
            VertexElementType::Float4
            | VertexElementType::UByte4Norm
            | VertexElementType::Short4 => 4,
        }
    }

    /// Whether integer data is normalized to `[0, 1]`.
    pub fn is_normalized(self) -> bool {
        matches!(self, VertexElementType::UByte4Norm)
    }
}

/// One attribute within a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexElement {
    /// Index into [`VertexData::bindings`].
    pub source: u16,
    /// Byte offset within a vertex.
    pub offset: u32,
    /// The attribute meaning.
    pub semantic: VertexElementSemantic,
    /// The memory format.
    pub ty: VertexElementType,
}

/// A vertex buffer bound to a source slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBufferBinding {
    /// The buffer object.
    pub buffer: BufferId,
    /// Byte distance between consecutive vertices.
    pub stride: u32,
    /// `0` advances per vertex; `n` advances every `n` instances.
    pub instance_divisor: u32,
}

/// The vertex input of a draw.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VertexData {
    /// Attribute layout.
    pub elements: Vec<VertexElement>,
    /// Buffers indexed by [`VertexElement::source`].
    pub bindings: Vec<VertexBufferBinding>,
    /// First vertex.
    pub vertex_start: u32,
    /// Number of vertices.
    pub vertex_count: u32,
}

/// The width of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    /// 16-bit indices.
    U16,
    /// 32-bit indices.
    U32,
}

impl IndexType {
    /// Size in bytes.
    pub fn size(self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// The index input of a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexData {
    /// The index buffer object.
    pub buffer: BufferId,
    /// Index width.
    pub index_type: IndexType,
    /// First index.
    pub index_start: u32,
    /// Number of indices.
    pub index_count: u32,
}

/// A single draw call with all its inputs resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOperation {
    /// How vertices form primitives.
    pub topology: PrimitiveTopology,
    /// Vertex input.
    pub vertex_data: VertexData,
    /// Index input; `None` draws vertices in order.
    pub index_data: Option<IndexData>,
    /// Number of instances; values above `1` issue an instanced draw.
    pub instance_count: u32,
}

impl RenderOperation {
    /// Number of vertices or indices consumed by one instance.
    pub fn element_count(&self) -> u32 {
        match &self.index_data {
            Some(index) => index.index_count,
            None => self.vertex_data.vertex_count,
        }
    }

    /// Number of primitives drawn over all instances.
    pub fn primitive_count(&self) -> u32 {
        self.topology.primitive_count(self.element_count()) * self.instance_count.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texcoord_sets_follow_slot_eight() {
        assert_eq!(VertexElementSemantic::TexCoord(0).attribute_index(), 8);
        assert_eq!(VertexElementSemantic::TexCoord(3).attribute_index(), 11);
        assert_eq!(VertexElementSemantic::Position.attribute_index(), 0);
    }

    #[test]
    fn instanced_primitive_count() {
        let op = RenderOperation {
            topology: PrimitiveTopology::TriangleList,
            vertex_data: VertexData {
                vertex_count: 4,
                ..Default::default()
            },
            index_data: Some(IndexData {
                buffer: BufferId(2),
                index_type: IndexType::U16,
                index_start: 0,
                index_count: 6,
            }),
            instance_count: 3,
        };
        assert_eq!(op.element_count(), 6);
        assert_eq!(op.primitive_count(), 6);
    }
}
