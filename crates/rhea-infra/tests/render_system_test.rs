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

//! Integration tests for the state-cache-backed GL render system.
//!
//! Every test drives `GlRenderSystem` through its public API on the headless
//! backend and asserts on the exact driver calls it recorded.

use rhea_core::math::{LinearRgba, Plane};
use rhea_core::renderer::{
    BlendFactor, ColourBlendState, CompareFunction, ConfigError, ContextId, CullingMode,
    FilterOptions, FilterType, LimitKind, PolygonMode, RenderError, RenderSystem,
    RenderTargetDesc, RenderTargetId, TextureHandle, TextureType,
};
use rhea_infra::graphics::gl::enums::*;
use rhea_infra::graphics::gl::GlRenderSystem;
use rhea_infra::graphics::headless::{ContextEvent, GlCall, HeadlessContextProvider, HeadlessDriver};

/// Helper: a render system with one 800x600 window set as the target and an
/// empty call log.
fn render_system(driver: HeadlessDriver) -> (GlRenderSystem, RenderTargetId) {
    let mut system =
        GlRenderSystem::with_base_options(Box::new(driver), Box::new(HeadlessContextProvider::new()));
    let window = system
        .create_render_window(RenderTargetDesc::window("main", 800, 600, false))
        .expect("window creation should succeed on the headless backend");
    system.set_render_target(window).unwrap();
    calls_of(&mut system).clear_calls();
    (system, window)
}

fn calls_of(system: &mut GlRenderSystem) -> &mut HeadlessDriver {
    system.driver_as_mut::<HeadlessDriver>().unwrap()
}

fn provider_of(system: &GlRenderSystem) -> &HeadlessContextProvider {
    system.context_provider_as::<HeadlessContextProvider>().unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Redundant call elision
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_repeated_setters_reach_the_driver_once() {
    // ARRANGE
    let (mut system, _) = render_system(HeadlessDriver::desktop_compat());
    system
        .set_texture(0, true, Some(TextureHandle::new(3, TextureType::D2)))
        .unwrap();

    // ACT
    for _ in 0..3 {
        system.set_depth_function(CompareFunction::LessEqual).unwrap();
        system.set_culling_mode(CullingMode::Anticlockwise).unwrap();
        system.set_line_width(2.0).unwrap();
        system
            .set_texture_unit_filtering(0, FilterType::Mag, FilterOptions::Linear)
            .unwrap();
    }

    // ASSERT
    let driver = calls_of(&mut system);
    assert_eq!(driver.count(|c| matches!(c, GlCall::DepthFunc(_))), 1);
    assert_eq!(driver.count(|c| matches!(c, GlCall::CullFace(_))), 1);
    assert_eq!(driver.count(|c| matches!(c, GlCall::LineWidth(_))), 1);
    assert_eq!(
        driver.count(|c| matches!(c, GlCall::TexParameterI(_, GL_TEXTURE_MAG_FILTER, _))),
        1
    );
}

#[test]
fn test_opaque_blend_twice_disables_blending_once() {
    // ARRANGE
    let (mut system, _) = render_system(HeadlessDriver::desktop_compat());
    let opaque = ColourBlendState::from_factors(BlendFactor::One, BlendFactor::Zero);

    // ACT
    system.set_colour_blend_state(&opaque).unwrap();
    system.set_colour_blend_state(&opaque).unwrap();

    // ASSERT
    let driver = calls_of(&mut system);
    assert_eq!(driver.count(|c| *c == GlCall::Disable(GL_BLEND)), 1);
    assert_eq!(
        driver.count(|c| matches!(c, GlCall::BlendFuncSeparate(..))),
        0,
        "factors are not sent while blending is off"
    );
}

#[test]
fn test_alternating_values_are_all_sent() {
    // ARRANGE
    let (mut system, _) = render_system(HeadlessDriver::desktop_compat());

    // ACT
    for function in [
        CompareFunction::Less,
        CompareFunction::Greater,
        CompareFunction::Less,
    ] {
        system.set_depth_function(function).unwrap();
    }

    // ASSERT
    let funcs: Vec<GlCall> = calls_of(&mut system)
        .calls()
        .iter()
        .filter(|c| matches!(c, GlCall::DepthFunc(_)))
        .cloned()
        .collect();
    assert_eq!(
        funcs,
        vec![
            GlCall::DepthFunc(GL_LESS),
            GlCall::DepthFunc(GL_GREATER),
            GlCall::DepthFunc(GL_LESS),
        ]
    );
}

#[test]
fn test_elided_calls_are_counted_per_frame() {
    // ARRANGE
    let (mut system, _) = render_system(HeadlessDriver::desktop_compat());

    // ACT
    system.begin_frame().unwrap();
    for _ in 0..5 {
        system.set_depth_check_enabled(true).unwrap();
    }
    system.end_frame().unwrap();

    // ASSERT
    let stats = system.last_frame_stats();
    assert_eq!(stats.frame_number, 1);
    assert!(
        stats.elided_state_changes >= 4,
        "four of the five depth-test enables were redundant, got {}",
        stats.elided_state_changes
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Clip planes
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_enabling_a_clip_plane_pushes_its_equation() {
    // ARRANGE
    let (mut system, _) = render_system(HeadlessDriver::desktop_compat());

    // ACT
    system
        .set_clip_plane(0, Plane::new(1.0, 0.0, 0.0, 5.0))
        .unwrap();
    system.enable_clip_plane(0, true).unwrap();

    // ASSERT
    let driver = calls_of(&mut system);
    assert!(driver
        .calls()
        .contains(&GlCall::ClipPlane(GL_CLIP_PLANE0, [1.0, 0.0, 0.0, 5.0])));
    assert_eq!(driver.count(|c| *c == GlCall::Enable(GL_CLIP_PLANE0)), 1);
}

#[test]
fn test_clip_plane_beyond_the_limit_is_out_of_range() {
    let (mut system, _) = render_system(HeadlessDriver::desktop_compat());
    let err = system
        .set_clip_plane(6, Plane::new(0.0, 1.0, 0.0, 0.0))
        .unwrap_err();
    assert!(matches!(
        err,
        RenderError::OutOfRange {
            kind: LimitKind::ClipPlane,
            index: 6,
            limit: 6
        }
    ));
}

// ─────────────────────────────────────────────────────────────────────────────
// Contexts and render targets
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_context_switch_hides_the_previous_texture_binding() {
    // ARRANGE
    let (mut system, _) = render_system(HeadlessDriver::desktop_compat());
    let second = system
        .create_render_window(RenderTargetDesc::window("second", 320, 240, false))
        .unwrap();
    let texture = TextureHandle::new(5, TextureType::D2);
    system.set_texture(0, true, Some(texture)).unwrap();

    // ACT
    system.set_render_target(second).unwrap();
    calls_of(&mut system).clear_calls();
    let hidden = system.state_cache().unwrap().texture(0).is_none();
    system.set_texture(0, true, Some(texture)).unwrap();

    // ASSERT
    assert!(hidden, "a fresh context must not see the first context's binding");
    assert_eq!(
        calls_of(&mut system).count(|c| *c == GlCall::BindTexture(GL_TEXTURE_2D, 5)),
        1,
        "the new context must receive its own binding"
    );
    assert_eq!(system.context_manager().current(), Some(ContextId(2)));
}

#[test]
fn test_round_trip_between_contexts_forgets_state() {
    // ARRANGE
    let (mut system, main) = render_system(HeadlessDriver::desktop_compat());
    let second = system
        .create_render_window(RenderTargetDesc::window("second", 320, 240, false))
        .unwrap();
    let texture = TextureHandle::new(5, TextureType::D2);
    system.set_texture(0, true, Some(texture)).unwrap();
    system.set_depth_function(CompareFunction::Greater).unwrap();

    // ACT
    system.set_render_target(second).unwrap();
    system.set_render_target(main).unwrap();
    calls_of(&mut system).clear_calls();
    let forgotten = system.state_cache().unwrap().texture(0).is_none();
    system.set_texture(0, true, Some(texture)).unwrap();
    system.set_depth_function(CompareFunction::Greater).unwrap();

    // ASSERT
    assert!(forgotten, "returning to a context must not trust its old binding");
    assert_eq!(system.context_manager().current(), Some(ContextId(1)));
    let driver = calls_of(&mut system);
    assert_eq!(
        driver.count(|c| *c == GlCall::BindTexture(GL_TEXTURE_2D, 5)),
        1
    );
    assert_eq!(driver.count(|c| matches!(c, GlCall::DepthFunc(_))), 1);
}

#[test]
fn test_new_windows_share_with_the_main_context() {
    let (mut system, _) = render_system(HeadlessDriver::desktop_compat());
    system
        .create_render_window(RenderTargetDesc::window("second", 320, 240, false))
        .unwrap();
    assert!(provider_of(&system).events().contains(&ContextEvent::Created {
        context: ContextId(2),
        target: "second".to_string(),
        shared_with: Some(ContextId(1)),
    }));
}

#[test]
fn test_destroying_the_current_secondary_window_falls_back_to_main() {
    // ARRANGE
    let (mut system, _) = render_system(HeadlessDriver::desktop_compat());
    let second = system
        .create_render_window(RenderTargetDesc::window("second", 320, 240, false))
        .unwrap();
    system.set_render_target(second).unwrap();

    // ACT
    system.destroy_render_target(second).unwrap();

    // ASSERT
    assert_eq!(system.context_manager().current(), Some(ContextId(1)));
    assert!(system.context_manager().cache(ContextId(2)).is_none());
    assert!(!provider_of(&system).is_live(ContextId(2)));
    assert_eq!(system.current_render_target(), None);
    assert!(system.set_render_target(second).is_err());
}

#[test]
fn test_destroying_the_main_window_takes_its_offscreen_targets() {
    // ARRANGE
    let (mut system, main) = render_system(HeadlessDriver::desktop_compat());
    let rtt = system
        .create_offscreen_target(RenderTargetDesc::offscreen("shadow_map", 512, 512))
        .unwrap();

    // ACT
    system.destroy_render_target(main).unwrap();

    // ASSERT
    assert!(system.render_targets().get(rtt).is_none());
    assert_eq!(system.context_manager().current(), None);
    assert_eq!(system.context_manager().main(), None);
    assert!(matches!(
        system.set_depth_check_enabled(true),
        Err(RenderError::InvalidState(_))
    ));
}

#[test]
fn test_destroying_main_keeps_the_current_secondary_window() {
    // ARRANGE
    let (mut system, main) = render_system(HeadlessDriver::desktop_compat());
    let second = system
        .create_render_window(RenderTargetDesc::window("second", 320, 240, false))
        .unwrap();
    system.set_render_target(second).unwrap();

    // ACT
    system.destroy_render_target(main).unwrap();

    // ASSERT
    assert_eq!(system.context_manager().current(), Some(ContextId(2)));
    assert_eq!(system.context_manager().main(), Some(ContextId(2)));
    assert_eq!(system.current_render_target(), Some(second));
    assert!(provider_of(&system).is_live(ContextId(2)));
    assert!(system.set_depth_check_enabled(true).is_ok());
    let rtt = system
        .create_offscreen_target(RenderTargetDesc::offscreen("reflection", 256, 256))
        .expect("the promoted main context must host offscreen targets");
    assert!(system.set_render_target(rtt).is_ok());
}

#[test]
fn test_destroying_the_current_main_window_promotes_the_other_window() {
    // ARRANGE
    let (mut system, main) = render_system(HeadlessDriver::desktop_compat());
    system
        .create_render_window(RenderTargetDesc::window("second", 320, 240, false))
        .unwrap();

    // ACT
    system.destroy_render_target(main).unwrap();

    // ASSERT
    assert_eq!(system.context_manager().current(), Some(ContextId(2)));
    assert_eq!(system.context_manager().main(), Some(ContextId(2)));
    assert_eq!(system.current_render_target(), None);
    assert!(!provider_of(&system).is_live(ContextId(1)));
}

#[test]
fn test_destroying_an_unknown_target_is_harmless() {
    let (mut system, _) = render_system(HeadlessDriver::desktop_compat());
    assert!(system.destroy_render_target(RenderTargetId(99)).is_ok());
    assert_eq!(system.render_targets().len(), 1);
}

#[test]
fn test_offscreen_targets_need_a_window() {
    let mut system = GlRenderSystem::with_base_options(
        Box::new(HeadlessDriver::desktop_compat()),
        Box::new(HeadlessContextProvider::new()),
    );
    assert!(matches!(
        system.create_offscreen_target(RenderTargetDesc::offscreen("rtt", 64, 64)),
        Err(RenderError::InvalidState(_))
    ));
}

#[test]
fn test_window_names_are_unique() {
    let (mut system, _) = render_system(HeadlessDriver::desktop_compat());
    assert!(system
        .create_render_window(RenderTargetDesc::window("main", 320, 240, false))
        .is_err());
}

#[test]
fn test_swap_buffers_presents_windows_only() {
    // ARRANGE
    let (mut system, main) = render_system(HeadlessDriver::desktop_compat());
    let rtt = system
        .create_offscreen_target(RenderTargetDesc::offscreen("rtt", 64, 64))
        .unwrap();

    // ACT
    system.swap_buffers(rtt).unwrap();
    system.swap_buffers(main).unwrap();

    // ASSERT
    let swaps: Vec<&ContextEvent> = provider_of(&system)
        .events()
        .iter()
        .filter(|e| matches!(e, ContextEvent::Swapped(_)))
        .collect();
    assert_eq!(swaps, vec![&ContextEvent::Swapped(ContextId(1))]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Capability gating
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_es2_driver_rejects_missing_features() {
    // ARRANGE
    let (mut system, _) = render_system(HeadlessDriver::videocore_iv());

    // ACT / ASSERT
    assert!(matches!(
        system.set_polygon_mode(PolygonMode::Wireframe),
        Err(RenderError::UnsupportedFeature(_))
    ));
    assert!(matches!(
        system.set_texture(0, true, Some(TextureHandle::new(1, TextureType::D3))),
        Err(RenderError::UnsupportedFeature(_))
    ));
    assert!(matches!(
        system.set_clip_plane(0, Plane::new(1.0, 0.0, 0.0, 0.0)),
        Err(RenderError::OutOfRange {
            kind: LimitKind::ClipPlane,
            ..
        })
    ));
    assert!(system.set_polygon_mode(PolygonMode::Solid).is_ok());
    assert!(
        calls_of(&mut system).calls().is_empty(),
        "rejected calls must not reach the driver"
    );
}

#[test]
fn test_texture_unit_beyond_the_limit_is_out_of_range() {
    let (mut system, _) = render_system(HeadlessDriver::videocore_iv());
    let err = system
        .set_texture(8, true, Some(TextureHandle::new(1, TextureType::D2)))
        .unwrap_err();
    assert!(matches!(
        err,
        RenderError::OutOfRange {
            kind: LimitKind::TextureUnit,
            index: 8,
            limit: 8
        }
    ));
}

#[test]
fn test_capabilities_follow_the_driver_profile() {
    let (es, _) = render_system(HeadlessDriver::videocore_iv());
    let caps = es.capabilities().unwrap();
    assert!(caps.is_es());
    assert_eq!(caps.num_texture_units, 8);
    assert_eq!(caps.num_clip_planes, 0);

    let (desktop, _) = render_system(HeadlessDriver::desktop_compat());
    let caps = desktop.capabilities().unwrap();
    assert!(!caps.is_es());
    assert_eq!(caps.num_lights, 8);
    assert_eq!(caps.num_clip_planes, 6);
    assert_eq!(caps.num_fixed_function_texture_units, 8);
}

#[test]
fn test_fixed_pipeline_can_be_switched_off() {
    // ARRANGE
    let mut system = GlRenderSystem::with_base_options(
        Box::new(HeadlessDriver::desktop_compat()),
        Box::new(HeadlessContextProvider::new()),
    );
    system.set_config_option("Fixed Pipeline Enabled", "No").unwrap();

    // ACT
    system
        .create_render_window(RenderTargetDesc::window("main", 640, 480, false))
        .unwrap();

    // ASSERT
    let caps = system.capabilities().unwrap();
    assert_eq!(caps.num_lights, 0);
    assert_eq!(caps.num_fixed_function_texture_units, 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_is_frozen_by_the_first_window() {
    // ARRANGE
    let mut system = GlRenderSystem::with_base_options(
        Box::new(HeadlessDriver::videocore_iv()),
        Box::new(HeadlessContextProvider::new()),
    );
    system.set_config_option("VSync", "No").unwrap();

    // ACT
    system
        .create_render_window(RenderTargetDesc::window("main", 640, 480, true))
        .unwrap();

    // ASSERT
    assert_eq!(
        system.set_config_option("VSync", "Yes"),
        Err(ConfigError::Frozen("VSync".to_string()))
    );
    assert_eq!(system.config_options().value("VSync"), Some("No"));
}

#[test]
fn test_unknown_and_invalid_options_are_rejected() {
    let mut system = GlRenderSystem::with_base_options(
        Box::new(HeadlessDriver::videocore_iv()),
        Box::new(HeadlessContextProvider::new()),
    );
    assert!(matches!(
        system.set_config_option("Colour Depth", "32"),
        Err(ConfigError::UnknownOption(_))
    ));
    assert!(matches!(
        system.set_config_option("FSAA", "3"),
        Err(ConfigError::InvalidValue { .. })
    ));
}

// ─────────────────────────────────────────────────────────────────────────────
// Clearing and scissor
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_clear_is_clipped_to_the_viewport() {
    // ARRANGE
    let (mut system, _) = render_system(HeadlessDriver::desktop_compat());

    // ACT
    system
        .clear_frame_buffer(
            rhea_core::renderer::FrameBufferType::COLOUR,
            LinearRgba::new(0.1, 0.2, 0.3, 1.0),
            1.0,
            0,
        )
        .unwrap();

    // ASSERT
    let calls = calls_of(&mut system).take_calls();
    let enable = calls
        .iter()
        .position(|c| *c == GlCall::Enable(GL_SCISSOR_TEST))
        .expect("scissor test enabled for the clear");
    let clear = calls
        .iter()
        .position(|c| *c == GlCall::Clear(GL_COLOR_BUFFER_BIT))
        .expect("clear issued");
    let disable = calls
        .iter()
        .rposition(|c| *c == GlCall::Disable(GL_SCISSOR_TEST))
        .expect("scissor test restored after the clear");
    assert!(enable < clear && clear < disable);
    assert!(calls.contains(&GlCall::ClearColor(0.1, 0.2, 0.3, 1.0)));
}
