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

//! GPU programs and their parameter blocks.
//!
//! Programs arrive already compiled and linked; this module only describes
//! how they are bound and which constants are uploaded to them.

use std::sync::Arc;

use crate::math::{LinearRgba, Mat4, Vec4};

/// The pipeline stage a program runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuProgramType {
    /// Vertex processing.
    Vertex,
    /// Fragment processing.
    Fragment,
    /// Geometry processing.
    Geometry,
}

impl GpuProgramType {
    /// All stages, in binding order.
    pub const ALL: [GpuProgramType; 3] = [
        GpuProgramType::Vertex,
        GpuProgramType::Fragment,
        GpuProgramType::Geometry,
    ];

    /// The stage's position in [`GpuProgramType::ALL`].
    pub fn index(self) -> usize {
        match self {
            GpuProgramType::Vertex => 0,
            GpuProgramType::Fragment => 1,
            GpuProgramType::Geometry => 2,
        }
    }
}

/// A compiled program for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuProgram {
    /// The driver-side program name.
    pub id: u32,
    /// The stage this program is bound to.
    pub ty: GpuProgramType,
}

impl GpuProgram {
    /// Creates a program handle.
    pub const fn new(id: u32, ty: GpuProgramType) -> Self {
        Self { id, ty }
    }
}

bitflags::bitflags! {
    /// Classifies constants by how often their source data changes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VariabilityMask: u16 {
        /// No variation except by manual setting.
        const GLOBAL = 1;
        /// Varies per object (e.g. the world matrix).
        const PER_OBJECT = 2;
        /// Varies with the light list.
        const LIGHTS = 4;
        /// Varies with the pass iteration number.
        const PASS_ITERATION_NUMBER = 8;
        /// Everything.
        const ALL = 0xFFFF;
    }
}

/// A constant whose value is derived from render system state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AutoConstant {
    /// The current world matrix.
    WorldMatrix,
    /// The current view matrix.
    ViewMatrix,
    /// The current projection matrix.
    ProjectionMatrix,
    /// `view * world`.
    WorldViewMatrix,
    /// `projection * view * world`.
    WorldViewProjMatrix,
    /// The surface ambient colour.
    SurfaceAmbientColour,
    /// The surface diffuse colour.
    SurfaceDiffuseColour,
    /// The surface specular colour.
    SurfaceSpecularColour,
    /// The surface emissive colour.
    SurfaceEmissiveColour,
    /// The surface shininess.
    SurfaceShininess,
    /// The global ambient light colour.
    AmbientLightColour,
    /// `(density, start, end, 1 / (end - start))`.
    FogParams,
    /// The fog colour.
    FogColour,
    /// Diffuse colour of the light at the given index.
    LightDiffuseColour(usize),
    /// Specular colour of the light at the given index.
    LightSpecularColour(usize),
    /// `(range, constant, linear, quadratic)` of the light at the given index.
    LightAttenuation(usize),
    /// View-space position of the light at the given index.
    LightPositionViewSpace(usize),
    /// View-space direction of the light at the given index.
    LightDirectionViewSpace(usize),
    /// The number of lights in use.
    LightCount,
}

impl AutoConstant {
    /// Returns the variability class of the constant's source data.
    pub fn variability(self) -> VariabilityMask {
        match self {
            AutoConstant::WorldMatrix
            | AutoConstant::WorldViewMatrix
            | AutoConstant::WorldViewProjMatrix => VariabilityMask::PER_OBJECT,
            AutoConstant::LightDiffuseColour(_)
            | AutoConstant::LightSpecularColour(_)
            | AutoConstant::LightAttenuation(_)
            | AutoConstant::LightPositionViewSpace(_)
            | AutoConstant::LightDirectionViewSpace(_)
            | AutoConstant::LightCount => VariabilityMask::LIGHTS,
            _ => VariabilityMask::GLOBAL,
        }
    }
}

/// The value of a constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstantValue {
    /// A single float.
    Float(f32),
    /// A single integer.
    Int(i32),
    /// Four floats.
    Float4([f32; 4]),
    /// A column-major 4x4 matrix.
    Matrix4(Mat4),
}

impl ConstantValue {
    /// Returns the float payload, or `None` for integers.
    pub fn as_floats(&self) -> Option<&[f32]> {
        match self {
            ConstantValue::Float(v) => Some(std::slice::from_ref(v)),
            ConstantValue::Float4(v) => Some(v),
            ConstantValue::Matrix4(m) => Some(bytemuck::cast_slice(std::slice::from_ref(m))),
            ConstantValue::Int(_) => None,
        }
    }
}

impl From<f32> for ConstantValue {
    fn from(v: f32) -> Self {
        ConstantValue::Float(v)
    }
}

impl From<i32> for ConstantValue {
    fn from(v: i32) -> Self {
        ConstantValue::Int(v)
    }
}

impl From<LinearRgba> for ConstantValue {
    fn from(c: LinearRgba) -> Self {
        ConstantValue::Float4(c.to_array())
    }
}

impl From<Vec4> for ConstantValue {
    fn from(v: Vec4) -> Self {
        ConstantValue::Float4(v.to_array())
    }
}

impl From<Mat4> for ConstantValue {
    fn from(m: Mat4) -> Self {
        ConstantValue::Matrix4(m)
    }
}

/// One named constant in a parameter block.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuConstant {
    /// The uniform name.
    pub name: String,
    /// The pre-resolved uniform location, if known.
    pub location: Option<i32>,
    /// The auto constant this value is derived from, if any.
    pub auto: Option<AutoConstant>,
    /// The variability class used to skip redundant uploads.
    pub variability: VariabilityMask,
    /// The current value.
    pub value: ConstantValue,
}

/// A block of constants uploaded to a bound program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpuProgramParameters {
    constants: Vec<GpuConstant>,
}

/// Parameter blocks are shared between the caller and the render system.
pub type GpuProgramParametersPtr = Arc<GpuProgramParameters>;

impl GpuProgramParameters {
    /// Creates an empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a manual constant, replacing any constant of the same name.
    pub fn set_named(
        &mut self,
        name: &str,
        value: impl Into<ConstantValue>,
        variability: VariabilityMask,
    ) {
        self.upsert(GpuConstant {
            name: name.to_string(),
            location: None,
            auto: None,
            variability,
            value: value.into(),
        });
    }

    /// Sets a constant with a pre-resolved uniform location.
    pub fn set_at_location(
        &mut self,
        name: &str,
        location: i32,
        value: impl Into<ConstantValue>,
        variability: VariabilityMask,
    ) {
        self.upsert(GpuConstant {
            name: name.to_string(),
            location: Some(location),
            auto: None,
            variability,
            value: value.into(),
        });
    }

    /// Sets an auto constant. Its variability comes from the auto kind.
    pub fn set_auto(&mut self, name: &str, auto: AutoConstant, value: impl Into<ConstantValue>) {
        self.upsert(GpuConstant {
            name: name.to_string(),
            location: None,
            auto: Some(auto),
            variability: auto.variability(),
            value: value.into(),
        });
    }

    fn upsert(&mut self, constant: GpuConstant) {
        match self.constants.iter_mut().find(|c| c.name == constant.name) {
            Some(existing) => *existing = constant,
            None => self.constants.push(constant),
        }
    }

    /// Looks up a constant by name.
    pub fn get(&self, name: &str) -> Option<&GpuConstant> {
        self.constants.iter().find(|c| c.name == name)
    }

    /// Looks up the first constant bound to an auto kind.
    pub fn find_auto(&self, auto: AutoConstant) -> Option<&GpuConstant> {
        self.constants.iter().find(|c| c.auto == Some(auto))
    }

    /// All constants, in insertion order.
    pub fn constants(&self) -> &[GpuConstant] {
        &self.constants
    }

    /// Constants whose variability intersects `mask`.
    pub fn matching(&self, mask: VariabilityMask) -> impl Iterator<Item = &GpuConstant> {
        self.constants
            .iter()
            .filter(move |c| c.variability.intersects(mask))
    }

    /// Number of constants.
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    /// Returns `true` if the block has no constants.
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_filters_by_variability() {
        let mut params = GpuProgramParameters::new();
        params.set_auto("world", AutoConstant::WorldMatrix, Mat4::IDENTITY);
        params.set_auto("view", AutoConstant::ViewMatrix, Mat4::IDENTITY);
        params.set_auto(
            "light0_diffuse",
            AutoConstant::LightDiffuseColour(0),
            LinearRgba::WHITE,
        );

        let per_object: Vec<_> = params
            .matching(VariabilityMask::PER_OBJECT)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(per_object, vec!["world"]);
        assert_eq!(params.matching(VariabilityMask::ALL).count(), 3);
    }

    #[test]
    fn set_named_replaces_existing() {
        let mut params = GpuProgramParameters::new();
        params.set_named("tint", 1.0_f32, VariabilityMask::GLOBAL);
        params.set_named("tint", 2.0_f32, VariabilityMask::GLOBAL);
        assert_eq!(params.len(), 1);
        assert_eq!(
            params.get("tint").map(|c| c.value),
            Some(ConstantValue::Float(2.0))
        );
    }

    #[test]
    fn matrix_value_is_sixteen_floats() {
        let value = ConstantValue::from(Mat4::IDENTITY);
        let floats = value.as_floats().expect("matrix has float payload");
        assert_eq!(floats.len(), 16);
        assert_eq!(floats[0], 1.0);
        assert_eq!(floats[1], 0.0);
        assert!(ConstantValue::Int(3).as_floats().is_none());
    }
}
