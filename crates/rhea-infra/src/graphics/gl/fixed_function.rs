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

//! Fixed-function emulation: synthesises a parameter block from scene state
//! and applies blocks either as fixed-function driver calls or, on
//! shader-only drivers, as uniforms.

use rhea_core::math::{LinearRgba, Mat4, Vec4};
use rhea_core::renderer::{
    AutoConstant, ConstantValue, FogParams, GpuProgramParameters, Light, LightType, LimitKind,
    RenderError, SurfaceParams, TrackVertexColour, VariabilityMask,
};

use super::driver::GlDriver;
use super::enums::*;
use super::state_cache::StateCache;

/// The scene state a fixed-function parameter block is built from.
#[derive(Debug, Clone, Default)]
pub struct FixedFunctionState {
    /// Object to world.
    pub world: Mat4,
    /// World to eye.
    pub view: Mat4,
    /// Eye to clip.
    pub projection: Mat4,
    /// Active lights, already limited to what the caller wants lit.
    pub lights: Vec<Light>,
    /// Global ambient light.
    pub ambient: LinearRgba,
    /// Material colours.
    pub surface: SurfaceParams,
    /// Fog parameters.
    pub fog: FogParams,
}

fn light_name(prefix: &str, index: usize) -> String {
    format!("{prefix}[{index}]")
}

impl FixedFunctionState {
    /// Builds the parameter block a fixed-function emulation program reads.
    pub fn build_parameters(&self) -> GpuProgramParameters {
        let mut params = GpuProgramParameters::new();
        let world_view = self.view * self.world;

        params.set_auto("world_matrix", AutoConstant::WorldMatrix, self.world);
        params.set_auto("view_matrix", AutoConstant::ViewMatrix, self.view);
        params.set_auto(
            "projection_matrix",
            AutoConstant::ProjectionMatrix,
            self.projection,
        );
        params.set_auto(
            "world_view_matrix",
            AutoConstant::WorldViewMatrix,
            world_view,
        );
        params.set_auto(
            "world_view_proj_matrix",
            AutoConstant::WorldViewProjMatrix,
            self.projection * world_view,
        );

        params.set_auto(
            "surface_ambient",
            AutoConstant::SurfaceAmbientColour,
            self.surface.ambient,
        );
        params.set_auto(
            "surface_diffuse",
            AutoConstant::SurfaceDiffuseColour,
            self.surface.diffuse,
        );
        params.set_auto(
            "surface_specular",
            AutoConstant::SurfaceSpecularColour,
            self.surface.specular,
        );
        params.set_auto(
            "surface_emissive",
            AutoConstant::SurfaceEmissiveColour,
            self.surface.emissive,
        );
        params.set_auto(
            "surface_shininess",
            AutoConstant::SurfaceShininess,
            self.surface.shininess,
        );
        params.set_auto("ambient_light", AutoConstant::AmbientLightColour, self.ambient);

        let fog_scale = if self.fog.end > self.fog.start {
            1.0 / (self.fog.end - self.fog.start)
        } else {
            0.0
        };
        params.set_auto(
            "fog_params",
            AutoConstant::FogParams,
            Vec4::new(self.fog.density, self.fog.start, self.fog.end, fog_scale),
        );
        params.set_auto("fog_colour", AutoConstant::FogColour, self.fog.colour);

        for (i, light) in self.lights.iter().enumerate() {
            params.set_auto(
                &light_name("light_diffuse", i),
                AutoConstant::LightDiffuseColour(i),
                light.diffuse,
            );
            params.set_auto(
                &light_name("light_specular", i),
                AutoConstant::LightSpecularColour(i),
                light.specular,
            );
            params.set_auto(
                &light_name("light_attenuation", i),
                AutoConstant::LightAttenuation(i),
                light.attenuation.to_vec4(),
            );
            params.set_auto(
                &light_name("light_position", i),
                AutoConstant::LightPositionViewSpace(i),
                self.view * light.position_vec4(),
            );
            params.set_auto(
                &light_name("light_direction", i),
                AutoConstant::LightDirectionViewSpace(i),
                self.view * (-light.direction).extend(0.0),
            );
        }
        params.set_auto(
            "light_count",
            AutoConstant::LightCount,
            self.lights.len() as i32,
        );
        params
    }
}

/// The `glColorMaterial` mode for a tracking set, or `None` to disable
/// colour tracking.
///
/// GL tracks one material property (or ambient and diffuse together), so
/// other combinations fall back to the first tracked property.
pub fn surface_tracking_mode(tracking: TrackVertexColour) -> Option<GLenum> {
    if tracking.is_empty() {
        None
    } else if tracking.contains(TrackVertexColour::AMBIENT) {
        if tracking.contains(TrackVertexColour::DIFFUSE) {
            Some(GL_AMBIENT_AND_DIFFUSE)
        } else {
            Some(GL_AMBIENT)
        }
    } else if tracking.contains(TrackVertexColour::DIFFUSE) {
        Some(GL_DIFFUSE)
    } else if tracking.contains(TrackVertexColour::SPECULAR) {
        Some(GL_SPECULAR)
    } else {
        Some(GL_EMISSION)
    }
}

/// Matrices found in an applied block. The caller adopts them as its
/// current transforms.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatrixUpdates {
    /// A new world matrix.
    pub world: Option<Mat4>,
    /// A new view matrix.
    pub view: Option<Mat4>,
    /// A new projection matrix.
    pub projection: Option<Mat4>,
}

fn floats(value: &ConstantValue) -> &[f32] {
    value.as_floats().unwrap_or(&[])
}

fn light_enum(cache: &StateCache, index: usize) -> Result<GLenum, RenderError> {
    let limit = cache.limits().lights;
    if index < limit {
        Ok(GL_LIGHT0 + index as GLenum)
    } else {
        Err(RenderError::out_of_range(LimitKind::Light, index, limit))
    }
}

/// Applies the constants of `params` whose variability intersects `mask` as
/// fixed-function state.
///
/// A view matrix in the block also pushes light positions and directions,
/// which GL stores in eye space. The values are already in eye space, so the
/// model-view matrix is set to identity while they are pushed.
pub fn apply_to_driver(
    driver: &mut dyn GlDriver,
    cache: &mut StateCache,
    params: &GpuProgramParameters,
    mask: VariabilityMask,
) -> Result<MatrixUpdates, RenderError> {
    let mut mask = mask;
    let view_changes = params
        .matching(mask)
        .any(|c| c.auto == Some(AutoConstant::ViewMatrix));
    if view_changes {
        mask |= VariabilityMask::LIGHTS;
    }

    let mut updates = MatrixUpdates::default();
    for constant in params.matching(mask) {
        let Some(auto) = constant.auto else {
            continue;
        };
        let values = floats(&constant.value);
        match auto {
            AutoConstant::WorldMatrix => updates.world = matrix_of(&constant.value),
            AutoConstant::ViewMatrix => updates.view = matrix_of(&constant.value),
            AutoConstant::ProjectionMatrix => updates.projection = matrix_of(&constant.value),
            AutoConstant::SurfaceAmbientColour => {
                driver.material_fv(GL_FRONT_AND_BACK, GL_AMBIENT, values)
            }
            AutoConstant::SurfaceDiffuseColour => {
                driver.material_fv(GL_FRONT_AND_BACK, GL_DIFFUSE, values)
            }
            AutoConstant::SurfaceSpecularColour => {
                driver.material_fv(GL_FRONT_AND_BACK, GL_SPECULAR, values)
            }
            AutoConstant::SurfaceEmissiveColour => {
                driver.material_fv(GL_FRONT_AND_BACK, GL_EMISSION, values)
            }
            AutoConstant::SurfaceShininess => {
                driver.material_fv(GL_FRONT_AND_BACK, GL_SHININESS, values)
            }
            AutoConstant::FogParams => {
                if let [density, start, end, ..] = values {
                    driver.fog_fv(GL_FOG_DENSITY, &[*density]);
                    driver.fog_fv(GL_FOG_START, &[*start]);
                    driver.fog_fv(GL_FOG_END, &[*end]);
                }
            }
            AutoConstant::FogColour => driver.fog_fv(GL_FOG_COLOR, values),
            AutoConstant::AmbientLightColour => {
                driver.light_model_fv(GL_LIGHT_MODEL_AMBIENT, values)
            }
            AutoConstant::LightDiffuseColour(i) => {
                driver.light_fv(light_enum(cache, i)?, GL_DIFFUSE, values)
            }
            AutoConstant::LightSpecularColour(i) => {
                driver.light_fv(light_enum(cache, i)?, GL_SPECULAR, values)
            }
            AutoConstant::LightAttenuation(i) => {
                let light = light_enum(cache, i)?;
                if let [_, constant, linear, quadratic] = values {
                    driver.light_fv(light, GL_CONSTANT_ATTENUATION, &[*constant]);
                    driver.light_fv(light, GL_LINEAR_ATTENUATION, &[*linear]);
                    driver.light_fv(light, GL_QUADRATIC_ATTENUATION, &[*quadratic]);
                }
            }
            // Pushed below, once the model-view matrix is in eye space.
            AutoConstant::LightPositionViewSpace(_) | AutoConstant::LightDirectionViewSpace(_) => {}
            AutoConstant::WorldViewMatrix
            | AutoConstant::WorldViewProjMatrix
            | AutoConstant::LightCount => {}
        }
    }

    if view_changes {
        cache.set_modelview_matrix(driver, &Mat4::IDENTITY)?;
        for constant in params.matching(VariabilityMask::LIGHTS) {
            let values = floats(&constant.value);
            match constant.auto {
                Some(AutoConstant::LightPositionViewSpace(i)) => {
                    driver.light_fv(light_enum(cache, i)?, GL_POSITION, values);
                }
                Some(AutoConstant::LightDirectionViewSpace(i)) => {
                    if let [x, y, z, ..] = values {
                        driver.light_fv(light_enum(cache, i)?, GL_SPOT_DIRECTION, &[-x, -y, -z]);
                    }
                }
                _ => {}
            }
        }
    }
    Ok(updates)
}

fn matrix_of(value: &ConstantValue) -> Option<Mat4> {
    match value {
        ConstantValue::Matrix4(m) => Some(*m),
        _ => None,
    }
}

/// Configures fixed-function light `index`, or disables it for `None`.
///
/// Position and direction are pushed in eye space with an identity
/// model-view matrix.
pub fn push_light(
    driver: &mut dyn GlDriver,
    cache: &mut StateCache,
    index: usize,
    light: Option<&Light>,
    view: &Mat4,
) -> Result<(), RenderError> {
    let Some(light) = light else {
        return cache.set_light_enabled(driver, index, false);
    };
    let gl_light = light_enum(cache, index)?;

    match light.kind {
        LightType::Spotlight => {
            driver.light_fv(
                gl_light,
                GL_SPOT_CUTOFF,
                &[0.5 * light.spot.outer_angle.to_degrees()],
            );
            driver.light_fv(gl_light, GL_SPOT_EXPONENT, &[light.spot.falloff]);
        }
        _ => driver.light_fv(gl_light, GL_SPOT_CUTOFF, &[180.0]),
    }

    driver.light_fv(gl_light, GL_DIFFUSE, &light.diffuse.to_array());
    driver.light_fv(gl_light, GL_SPECULAR, &light.specular.to_array());
    // Movable lights contribute no ambient term; that comes from the light model.
    driver.light_fv(gl_light, GL_AMBIENT, &[0.0, 0.0, 0.0, 1.0]);
    driver.light_fv(
        gl_light,
        GL_CONSTANT_ATTENUATION,
        &[light.attenuation.constant],
    );
    driver.light_fv(gl_light, GL_LINEAR_ATTENUATION, &[light.attenuation.linear]);
    driver.light_fv(
        gl_light,
        GL_QUADRATIC_ATTENUATION,
        &[light.attenuation.quadratic],
    );

    cache.set_modelview_matrix(driver, &Mat4::IDENTITY)?;
    let position = *view * light.position_vec4();
    driver.light_fv(gl_light, GL_POSITION, &position.to_array());
    if light.kind == LightType::Spotlight {
        let direction = (*view * light.direction.extend(0.0)).truncate();
        driver.light_fv(
            gl_light,
            GL_SPOT_DIRECTION,
            &[direction.x, direction.y, direction.z],
        );
    }

    cache.set_light_enabled(driver, index, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::gl::state_cache::CacheLimits;
    use crate::graphics::headless::{GlCall, HeadlessDriver};
    use approx::assert_relative_eq;
    use rhea_core::math::Vec3;

    #[test]
    fn tracking_modes() {
        let both = TrackVertexColour::AMBIENT | TrackVertexColour::DIFFUSE;
        assert_eq!(surface_tracking_mode(both), Some(GL_AMBIENT_AND_DIFFUSE));
        assert_eq!(
            surface_tracking_mode(TrackVertexColour::AMBIENT | TrackVertexColour::SPECULAR),
            Some(GL_AMBIENT)
        );
        assert_eq!(
            surface_tracking_mode(TrackVertexColour::EMISSIVE),
            Some(GL_EMISSION)
        );
        assert_eq!(surface_tracking_mode(TrackVertexColour::empty()), None);
    }

    #[test]
    fn parameters_carry_view_space_lights() {
        let state = FixedFunctionState {
            view: Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0)),
            lights: vec![Light {
                position: Vec3::new(1.0, 2.0, 3.0),
                ..Light::default()
            }],
            ..Default::default()
        };
        let params = state.build_parameters();
        let position = params
            .find_auto(AutoConstant::LightPositionViewSpace(0))
            .unwrap();
        let values = position.value.as_floats().unwrap();
        assert_relative_eq!(values[2], -2.0);
        assert_eq!(
            params.find_auto(AutoConstant::LightCount).unwrap().value,
            ConstantValue::Int(1)
        );
    }

    #[test]
    fn fog_params_split_into_three_calls() {
        let mut driver = HeadlessDriver::desktop_compat();
        let mut cache = StateCache::new(CacheLimits::from(&driver.expected_capabilities()));
        let state = FixedFunctionState {
            fog: FogParams {
                density: 0.5,
                start: 10.0,
                end: 20.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let params = state.build_parameters();
        apply_to_driver(&mut driver, &mut cache, &params, VariabilityMask::GLOBAL).unwrap();
        assert!(driver.calls().contains(&GlCall::FogFv(GL_FOG_DENSITY, vec![0.5])));
        assert!(driver.calls().contains(&GlCall::FogFv(GL_FOG_START, vec![10.0])));
        assert!(driver.calls().contains(&GlCall::FogFv(GL_FOG_END, vec![20.0])));
    }

    #[test]
    fn view_change_pushes_negated_directions() {
        let mut driver = HeadlessDriver::desktop_compat();
        let mut cache = StateCache::new(CacheLimits::from(&driver.expected_capabilities()));
        let state = FixedFunctionState {
            lights: vec![Light {
                kind: LightType::Directional,
                direction: Vec3::new(0.0, -1.0, 0.0),
                ..Light::default()
            }],
            ..Default::default()
        };
        let params = state.build_parameters();
        let updates =
            apply_to_driver(&mut driver, &mut cache, &params, VariabilityMask::GLOBAL).unwrap();
        assert_eq!(updates.view, Some(Mat4::IDENTITY));
        assert!(driver
            .calls()
            .contains(&GlCall::LightFv(GL_LIGHT0, GL_SPOT_DIRECTION, vec![0.0, -1.0, 0.0])));
    }

    #[test]
    fn lights_beyond_limit_are_rejected() {
        let mut driver = HeadlessDriver::desktop_compat();
        let mut cache = StateCache::new(CacheLimits::from(&driver.expected_capabilities()));
        let result = push_light(
            &mut driver,
            &mut cache,
            8,
            Some(&Light::default()),
            &Mat4::IDENTITY,
        );
        assert_eq!(
            result,
            Err(RenderError::out_of_range(LimitKind::Light, 8, 8))
        );
    }
}
