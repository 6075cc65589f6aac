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

use anyhow::{Context, Result};
use rhea_core::math::{LinearRgba, Mat4, Vec3};
use rhea_core::renderer::{
    BufferId, CameraId, CompareFunction, CullingMode, FogMode, FrameBufferType, GpuProgram,
    GpuProgramType, IndexData, IndexType, Light, LightType, PrimitiveTopology, RenderError, RenderOperation,
    RenderSystem, TrackVertexColour, VariabilityMask, VertexBufferBinding, VertexData,
    VertexElement, VertexElementSemantic, VertexElementType,
};
use rhea_infra::graphics::gl::GlRenderSystem;
use rhea_infra::graphics::headless::{HeadlessContextProvider, HeadlessDriver};
use rhea_infra::platform::RpiDisplaySupport;

const FRAMES: u32 = 3;

/// A unit quad with positions and normals, drawn from two index triangles.
fn quad() -> RenderOperation {
    let element = |semantic, offset| VertexElement {
        source: 0,
        offset,
        semantic,
        ty: VertexElementType::Float3,
    };
    RenderOperation {
        topology: PrimitiveTopology::TriangleList,
        vertex_data: VertexData {
            elements: vec![
                element(VertexElementSemantic::Position, 0),
                element(VertexElementSemantic::Normal, 12),
            ],
            bindings: vec![VertexBufferBinding {
                buffer: BufferId(1),
                stride: 24,
                instance_divisor: 0,
            }],
            vertex_start: 0,
            vertex_count: 4,
        },
        index_data: Some(IndexData {
            buffer: BufferId(2),
            index_type: IndexType::U16,
            index_start: 0,
            index_count: 6,
        }),
        instance_count: 1,
    }
}

fn draw_scene(system: &mut GlRenderSystem, frame: u32) -> Result<(), RenderError> {
    system.clear_frame_buffer(
        FrameBufferType::COLOUR | FrameBufferType::DEPTH,
        LinearRgba::new(0.05, 0.05, 0.1, 1.0),
        1.0,
        0,
    )?;
    system.set_depth_buffer_params(true, true, CompareFunction::LessEqual)?;
    system.set_culling_mode(CullingMode::Clockwise)?;

    let spin = Mat4::from_translation(Vec3::new(frame as f32 * 0.1, 0.0, -4.0));
    system.set_world_matrix(&spin);
    let params = system.fixed_function_params(TrackVertexColour::empty(), FogMode::None);
    let mask = if frame == 0 {
        VariabilityMask::ALL
    } else {
        VariabilityMask::PER_OBJECT
    };
    system.apply_fixed_function_params(&params, mask)?;
    system.render(&quad())
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let display = RpiDisplaySupport::new();
    let mut system = display.create_render_system(
        Box::new(HeadlessDriver::videocore_iv()),
        Box::new(HeadlessContextProvider::new()),
    );
    system.set_config_option("VSync", "Yes")?;
    let desc = display.window_desc("sandbox", system.config_options())?;
    let window = system
        .create_render_window(desc)
        .context("creating the sandbox window")?;

    if let Some(caps) = system.capabilities() {
        log::info!(
            "Running on '{}' ({}), {} texture units, {} vertex attributes.",
            caps.renderer,
            caps.version_string,
            caps.num_texture_units,
            caps.num_vertex_attribs
        );
    }

    system.set_render_target(window)?;
    system.bind_gpu_program(&GpuProgram::new(1, GpuProgramType::Vertex))?;
    system.bind_gpu_program(&GpuProgram::new(2, GpuProgramType::Fragment))?;
    system.set_view_matrix(&Mat4::IDENTITY);
    system.use_lights(
        &[Light {
            kind: LightType::Directional,
            direction: Vec3::new(0.0, -1.0, -1.0).normalize(),
            diffuse: LinearRgba::WHITE,
            ..Light::default()
        }],
        1,
    )?;

    let camera = CameraId(1);
    for frame in 0..FRAMES {
        system.begin_frame()?;
        let outcome =
            system.render_target_frame(window, camera, |system| draw_scene(system, frame))?;
        system.end_frame()?;
        let stats = system.last_frame_stats();
        log::info!(
            "Frame {} {:?}: {} draw calls, {} primitives, {} state changes elided.",
            stats.frame_number,
            outcome,
            stats.draw_calls,
            stats.primitives_rendered,
            stats.elided_state_changes
        );
    }

    system.shutdown();
    Ok(())
}
