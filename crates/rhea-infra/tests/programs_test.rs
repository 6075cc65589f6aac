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

//! Integration tests for program constant uploads and the fixed-function
//! parameter emulation.

use rhea_core::math::{LinearRgba, Mat4, Vec3};
use rhea_core::renderer::{
    ConstantValue, FogMode, GpuProgram, GpuProgramParameters, GpuProgramType, Light,
    RenderError, RenderSystem, RenderTargetDesc, TrackVertexColour, VariabilityMask,
};
use rhea_infra::graphics::gl::GlRenderSystem;
use rhea_infra::graphics::headless::{GlCall, HeadlessContextProvider, HeadlessDriver};

const VERTEX_PROGRAM: GpuProgram = GpuProgram::new(7, GpuProgramType::Vertex);

fn render_system(driver: HeadlessDriver) -> GlRenderSystem {
    let mut system =
        GlRenderSystem::with_base_options(Box::new(driver), Box::new(HeadlessContextProvider::new()));
    let window = system
        .create_render_window(RenderTargetDesc::window("main", 640, 480, false))
        .expect("window creation should succeed on the headless backend");
    system.set_render_target(window).unwrap();
    system.driver_as_mut::<HeadlessDriver>().unwrap().clear_calls();
    system
}

/// Helper: the uniform uploads recorded since the last call, as
/// `(location, float count)` pairs, and the calls are cleared.
fn take_float_uploads(system: &mut GlRenderSystem) -> Vec<(i32, usize)> {
    system
        .driver_as_mut::<HeadlessDriver>()
        .unwrap()
        .take_calls()
        .into_iter()
        .filter_map(|call| match call {
            GlCall::UniformFv {
                location, values, ..
            } => Some((location, values.len())),
            _ => None,
        })
        .collect()
}

fn mixed_block() -> GpuProgramParameters {
    let mut params = GpuProgramParameters::new();
    params.set_named("time", 1.5_f32, VariabilityMask::GLOBAL);
    params.set_named("world", Mat4::IDENTITY, VariabilityMask::PER_OBJECT);
    params
}

// ─────────────────────────────────────────────────────────────────────────────
// Variability mask
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_fresh_program_receives_every_constant() {
    // ARRANGE
    let mut system = render_system(HeadlessDriver::videocore_iv());
    system.bind_gpu_program(&VERTEX_PROGRAM).unwrap();
    let params = mixed_block();

    // ACT
    system
        .bind_gpu_program_parameters(GpuProgramType::Vertex, &params, VariabilityMask::PER_OBJECT)
        .unwrap();

    // ASSERT
    let uploads = take_float_uploads(&mut system);
    assert_eq!(uploads.len(), 2, "a new program must get the whole block");
}

#[test]
fn test_later_uploads_follow_the_mask() {
    // ARRANGE
    let mut system = render_system(HeadlessDriver::videocore_iv());
    system.bind_gpu_program(&VERTEX_PROGRAM).unwrap();
    let params = mixed_block();
    system
        .bind_gpu_program_parameters(GpuProgramType::Vertex, &params, VariabilityMask::ALL)
        .unwrap();
    take_float_uploads(&mut system);

    // ACT
    system
        .bind_gpu_program_parameters(GpuProgramType::Vertex, &params, VariabilityMask::PER_OBJECT)
        .unwrap();

    // ASSERT
    let uploads = take_float_uploads(&mut system);
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].1, 16, "only the per-object matrix is uploaded");
}

#[test]
fn test_rebinding_the_same_program_keeps_the_mask() {
    // ARRANGE
    let mut system = render_system(HeadlessDriver::videocore_iv());
    system.bind_gpu_program(&VERTEX_PROGRAM).unwrap();
    let params = mixed_block();
    system
        .bind_gpu_program_parameters(GpuProgramType::Vertex, &params, VariabilityMask::ALL)
        .unwrap();

    // ACT
    system.bind_gpu_program(&VERTEX_PROGRAM).unwrap();
    take_float_uploads(&mut system);
    system
        .bind_gpu_program_parameters(GpuProgramType::Vertex, &params, VariabilityMask::GLOBAL)
        .unwrap();

    // ASSERT
    assert_eq!(take_float_uploads(&mut system), vec![(0, 1)]);
}

#[test]
fn test_switching_programs_uploads_everything_again() {
    // ARRANGE
    let mut system = render_system(HeadlessDriver::videocore_iv());
    system.bind_gpu_program(&VERTEX_PROGRAM).unwrap();
    let params = mixed_block();
    system
        .bind_gpu_program_parameters(GpuProgramType::Vertex, &params, VariabilityMask::ALL)
        .unwrap();

    // ACT
    system
        .bind_gpu_program(&GpuProgram::new(8, GpuProgramType::Vertex))
        .unwrap();
    take_float_uploads(&mut system);
    system
        .bind_gpu_program_parameters(GpuProgramType::Vertex, &params, VariabilityMask::GLOBAL)
        .unwrap();

    // ASSERT
    assert_eq!(take_float_uploads(&mut system).len(), 2);
}

#[test]
fn test_integer_constants_use_the_integer_upload() {
    let mut system = render_system(HeadlessDriver::videocore_iv());
    system.bind_gpu_program(&VERTEX_PROGRAM).unwrap();
    let mut params = GpuProgramParameters::new();
    params.set_named("sampler", 3_i32, VariabilityMask::GLOBAL);

    system
        .bind_gpu_program_parameters(GpuProgramType::Vertex, &params, VariabilityMask::ALL)
        .unwrap();

    let calls = system.driver_as_mut::<HeadlessDriver>().unwrap().take_calls();
    assert!(calls.iter().any(|c| matches!(
        c,
        GlCall::UniformI {
            program: 7,
            value: 3,
            ..
        }
    )));
    assert!(!calls.iter().any(|c| matches!(c, GlCall::UniformFv { .. })));
}

#[test]
fn test_parameters_need_a_bound_program() {
    let mut system = render_system(HeadlessDriver::videocore_iv());
    let result = system.bind_gpu_program_parameters(
        GpuProgramType::Fragment,
        &mixed_block(),
        VariabilityMask::ALL,
    );
    assert!(matches!(result, Err(RenderError::InvalidState(_))));
}

// ─────────────────────────────────────────────────────────────────────────────
// Fixed-function parameters
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_fixed_function_block_reflects_the_scene() {
    // ARRANGE
    let mut system = render_system(HeadlessDriver::desktop_compat());
    let world = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    system.set_world_matrix(&world);
    let light = Light {
        diffuse: LinearRgba::WHITE,
        ..Light::default()
    };
    system.use_lights(&[light], 8).unwrap();

    // ACT
    let params = system.fixed_function_params(TrackVertexColour::empty(), FogMode::None);

    // ASSERT
    assert_eq!(
        params.get("world_matrix").map(|c| c.value),
        Some(ConstantValue::Matrix4(world))
    );
    assert_eq!(
        params.get("light_count").map(|c| c.value),
        Some(ConstantValue::Int(1))
    );
    assert!(params.get("light_diffuse[0]").is_some());
}

#[test]
fn test_unlit_fixed_function_block_has_no_lights() {
    // ARRANGE
    let mut system = render_system(HeadlessDriver::desktop_compat());
    system.use_lights(&[Light::default()], 8).unwrap();

    // ACT
    system.set_lighting_enabled(false).unwrap();
    let params = system.fixed_function_params(TrackVertexColour::empty(), FogMode::None);

    // ASSERT
    assert_eq!(
        params.get("light_count").map(|c| c.value),
        Some(ConstantValue::Int(0))
    );
}

#[test]
fn test_too_many_lights_are_out_of_range() {
    let mut system = render_system(HeadlessDriver::desktop_compat());
    let lights = [Light::default(); 9];
    assert!(matches!(
        system.use_lights(&lights, 9),
        Err(RenderError::OutOfRange { .. })
    ));
    assert!(system.use_lights(&lights, 8).is_ok(), "the limit argument caps the count");
}

#[test]
fn test_shader_only_driver_needs_a_program_for_fixed_function_params() {
    // ARRANGE
    let mut system = render_system(HeadlessDriver::videocore_iv());
    let params = system.fixed_function_params(TrackVertexColour::empty(), FogMode::None);

    // ACT
    let without_program = system.apply_fixed_function_params(&params, VariabilityMask::ALL);
    system.bind_gpu_program(&VERTEX_PROGRAM).unwrap();
    let with_program = system.apply_fixed_function_params(&params, VariabilityMask::ALL);

    // ASSERT
    assert!(matches!(without_program, Err(RenderError::InvalidState(_))));
    assert!(with_program.is_ok());
    assert!(
        !take_float_uploads(&mut system).is_empty(),
        "the block is uploaded as uniforms"
    );
}

#[test]
fn test_fixed_function_params_reach_the_fixed_pipeline_without_a_program() {
    // ARRANGE
    let mut system = render_system(HeadlessDriver::desktop_compat());
    let world = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0));
    system.set_world_matrix(&world);
    let params = system.fixed_function_params(TrackVertexColour::empty(), FogMode::None);

    // ACT
    system
        .apply_fixed_function_params(&params, VariabilityMask::ALL)
        .unwrap();

    // ASSERT
    let calls = system.driver_as_mut::<HeadlessDriver>().unwrap().take_calls();
    assert!(calls
        .iter()
        .any(|c| matches!(c, GlCall::MaterialFv(_, _, _))));
    assert!(!calls.iter().any(|c| matches!(c, GlCall::UniformFv { .. })));
}
