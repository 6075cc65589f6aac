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

//! State descriptors for the fixed pipeline stages.

use super::pipeline::{BlendFactor, BlendOperation, CompareFunction, FogMode, StencilOperation};
use crate::math::LinearRgba;

bitflags::bitflags! {
    /// A bitmask to enable or disable writes to individual colour channels.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorWrites: u8 {
        /// Enable writes to the Red channel.
        const R = 0b0001;
        /// Enable writes to the Green channel.
        const G = 0b0010;
        /// Enable writes to the Blue channel.
        const B = 0b0100;
        /// Enable writes to the Alpha channel.
        const A = 0b1000;
        /// Enable writes to all channels.
        const ALL = Self::R.bits() | Self::G.bits() | Self::B.bits() | Self::A.bits();
    }
}

impl Default for ColorWrites {
    fn default() -> Self {
        ColorWrites::ALL
    }
}

/// A blend equation for one set of channels (colour or alpha).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendComponent {
    /// The factor applied to the incoming fragment.
    pub src_factor: BlendFactor,
    /// The factor applied to the value already in the framebuffer.
    pub dst_factor: BlendFactor,
    /// The operation combining both weighted values.
    pub operation: BlendOperation,
}

impl BlendComponent {
    /// `src * 1 + dst * 0`: the fragment replaces the framebuffer value.
    pub const REPLACE: Self = Self {
        src_factor: BlendFactor::One,
        dst_factor: BlendFactor::Zero,
        operation: BlendOperation::Add,
    };

    /// Creates an additive blend component from two factors.
    pub const fn new(src_factor: BlendFactor, dst_factor: BlendFactor) -> Self {
        Self {
            src_factor,
            dst_factor,
            operation: BlendOperation::Add,
        }
    }

    /// Returns `true` when this component leaves the fragment untouched.
    pub fn is_replace(&self) -> bool {
        self.src_factor == BlendFactor::One
            && self.dst_factor == BlendFactor::Zero
            && self.operation == BlendOperation::Add
    }
}

impl Default for BlendComponent {
    fn default() -> Self {
        Self::REPLACE
    }
}

/// The complete colour blend state: separate colour and alpha equations plus
/// the colour write mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ColourBlendState {
    /// The blend equation for the RGB channels.
    pub colour: BlendComponent,
    /// The blend equation for the alpha channel.
    pub alpha: BlendComponent,
    /// Which channels are written.
    pub write_mask: ColorWrites,
}

impl ColourBlendState {
    /// Opaque rendering: no blending, all channels written.
    pub const REPLACE: Self = Self {
        colour: BlendComponent::REPLACE,
        alpha: BlendComponent::REPLACE,
        write_mask: ColorWrites::ALL,
    };

    /// Creates a state that uses the same factors for colour and alpha.
    pub fn from_factors(src_factor: BlendFactor, dst_factor: BlendFactor) -> Self {
        let component = BlendComponent::new(src_factor, dst_factor);
        Self {
            colour: component,
            alpha: component,
            write_mask: ColorWrites::ALL,
        }
    }

    /// Classic `src_alpha, 1 - src_alpha` transparency.
    pub fn alpha_blending() -> Self {
        Self::from_factors(BlendFactor::SourceAlpha, BlendFactor::OneMinusSourceAlpha)
    }

    /// Returns `true` if the state needs `GL_BLEND` enabled.
    pub fn blending_enabled(&self) -> bool {
        !(self.colour.is_replace() && self.alpha.is_replace())
    }
}

/// Depth bias applied to rasterized fragments.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DepthBias {
    /// A constant value added to the depth of each fragment.
    pub constant: f32,
    /// A factor scaled by the fragment's depth slope.
    pub slope_scale: f32,
}

impl DepthBias {
    /// Returns `true` if any bias is applied.
    pub fn is_enabled(&self) -> bool {
        self.constant != 0.0 || self.slope_scale != 0.0
    }
}

/// Stencil test and update operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilState {
    /// Whether stencil testing is enabled.
    pub enabled: bool,
    /// The comparison function.
    pub compare: CompareFunction,
    /// The reference value.
    pub reference: u32,
    /// The mask applied to both reference and stored value before comparing.
    pub compare_mask: u32,
    /// The mask applied when writing.
    pub write_mask: u32,
    /// Applied when the stencil test fails.
    pub fail_op: StencilOperation,
    /// Applied when the stencil test passes but the depth test fails.
    pub depth_fail_op: StencilOperation,
    /// Applied when both tests pass.
    pub pass_op: StencilOperation,
    /// Apply inverted increment/decrement operations to back faces.
    pub two_sided: bool,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            enabled: false,
            compare: CompareFunction::Always,
            reference: 0,
            compare_mask: u32::MAX,
            write_mask: u32::MAX,
            fail_op: StencilOperation::Keep,
            depth_fail_op: StencilOperation::Keep,
            pass_op: StencilOperation::Keep,
            two_sided: false,
        }
    }
}

/// Fog parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogParams {
    /// The falloff mode.
    pub mode: FogMode,
    /// The fog colour.
    pub colour: LinearRgba,
    /// The density for exponential modes.
    pub density: f32,
    /// The distance where linear fog starts.
    pub start: f32,
    /// The distance where linear fog reaches full density.
    pub end: f32,
}

impl Default for FogParams {
    fn default() -> Self {
        Self {
            mode: FogMode::None,
            colour: LinearRgba::WHITE,
            density: 0.001,
            start: 0.0,
            end: 1.0,
        }
    }
}

bitflags::bitflags! {
    /// Which surface colours follow the vertex colour.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TrackVertexColour: u8 {
        /// The ambient colour tracks the vertex colour.
        const AMBIENT = 0b0001;
        /// The diffuse colour tracks the vertex colour.
        const DIFFUSE = 0b0010;
        /// The specular colour tracks the vertex colour.
        const SPECULAR = 0b0100;
        /// The emissive colour tracks the vertex colour.
        const EMISSIVE = 0b1000;
    }
}

/// Material surface colours used by fixed-function lighting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceParams {
    /// Ambient reflectance.
    pub ambient: LinearRgba,
    /// Diffuse reflectance.
    pub diffuse: LinearRgba,
    /// Specular reflectance.
    pub specular: LinearRgba,
    /// Emitted colour.
    pub emissive: LinearRgba,
    /// Specular exponent.
    pub shininess: f32,
    /// Which of the above follow the vertex colour.
    pub tracking: TrackVertexColour,
}

impl Default for SurfaceParams {
    fn default() -> Self {
        Self {
            ambient: LinearRgba::WHITE,
            diffuse: LinearRgba::WHITE,
            specular: LinearRgba::BLACK,
            emissive: LinearRgba::BLACK,
            shininess: 0.0,
            tracking: TrackVertexColour::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_state_disables_blending() {
        assert!(!ColourBlendState::REPLACE.blending_enabled());
        assert!(!ColourBlendState::from_factors(BlendFactor::One, BlendFactor::Zero)
            .blending_enabled());
        assert!(ColourBlendState::alpha_blending().blending_enabled());
    }

    #[test]
    fn separate_alpha_equation_enables_blending() {
        let state = ColourBlendState {
            alpha: BlendComponent {
                operation: BlendOperation::Max,
                ..BlendComponent::REPLACE
            },
            ..ColourBlendState::REPLACE
        };
        assert!(state.blending_enabled());
    }
}
