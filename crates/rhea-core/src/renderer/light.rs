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

//! Defines the light description consumed by fixed-function lighting and by
//! the fixed-function parameter block.

use crate::math::{LinearRgba, Vec3, Vec4};

/// The kind of light source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LightType {
    /// Emits in all directions from a position.
    #[default]
    Point,
    /// Emits parallel rays along a direction.
    Directional,
    /// Emits in a cone from a position.
    Spotlight,
}

/// Distance attenuation, `1 / (constant + linear * d + quadratic * d^2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    /// Distance beyond which the light has no effect.
    pub range: f32,
    /// Constant term.
    pub constant: f32,
    /// Linear term.
    pub linear: f32,
    /// Quadratic term.
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            range: 100_000.0,
            constant: 1.0,
            linear: 0.0,
            quadratic: 0.0,
        }
    }
}

impl Attenuation {
    /// `(range, constant, linear, quadratic)`.
    pub fn to_vec4(&self) -> Vec4 {
        Vec4::new(self.range, self.constant, self.linear, self.quadratic)
    }
}

/// Spotlight cone parameters. Angles are in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotParams {
    /// Full angle of the inner, fully lit cone.
    pub inner_angle: f32,
    /// Full angle of the outer cone.
    pub outer_angle: f32,
    /// Falloff between the cones.
    pub falloff: f32,
}

impl Default for SpotParams {
    fn default() -> Self {
        Self {
            inner_angle: 30.0_f32.to_radians(),
            outer_angle: 40.0_f32.to_radians(),
            falloff: 1.0,
        }
    }
}

/// A light in world space.
///
/// # Examples
///
/// ```
/// use rhea_core::renderer::light::{Light, LightType};
/// use rhea_core::math::{LinearRgba, Vec3};
///
/// let sun = Light {
///     kind: LightType::Directional,
///     direction: Vec3::new(0.0, -1.0, 0.0),
///     diffuse: LinearRgba::rgb(1.0, 0.95, 0.8),
///     ..Light::default()
/// };
/// assert_eq!(sun.position_vec4().w, 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Light {
    /// The kind of source.
    pub kind: LightType,
    /// World-space position; ignored by directional lights.
    pub position: Vec3,
    /// World-space direction; ignored by point lights.
    pub direction: Vec3,
    /// Diffuse colour.
    pub diffuse: LinearRgba,
    /// Specular colour.
    pub specular: LinearRgba,
    /// Distance attenuation.
    pub attenuation: Attenuation,
    /// Cone parameters for spotlights.
    pub spot: SpotParams,
}

impl Light {
    /// The homogeneous position used by fixed-function lighting: `w = 0` for
    /// directional lights, whose "position" is the direction towards the light.
    pub fn position_vec4(&self) -> Vec4 {
        match self.kind {
            LightType::Directional => (-self.direction).extend(0.0),
            _ => self.position.extend(1.0),
        }
    }
}
