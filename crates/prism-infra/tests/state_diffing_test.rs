mod common;

use common::{headless, Fixture};
use prism_core::rhi::traits::RhiCounter;
use prism_core::rhi::{
    PipelineState, PrimitiveTopology, RhiContext, RhiSettings, ShaderScope, ShaderStage,
    StateQueryMode, TextureBinding,
};
use prism_infra::graphics::headless::{DeviceCall, HeadlessConfig};
use prism_infra::telemetry::MetricsProfiler;
use prism_telemetry::MetricsRegistry;
use std::sync::Arc;

fn state_changes(calls: &[DeviceCall]) -> Vec<&DeviceCall> {
    calls.iter().filter(|call| call.is_state_change()).collect()
}

#[test]
fn repeating_a_pass_issues_no_state_changes() {
    let fx = Fixture::new();
    let target = fx.color_target("scene", 64);
    let pso = Arc::new(fx.graphics_pass("scene", &target));
    let mut list = fx.recording("repeat");

    list.begin_render_pass(&pso).unwrap();
    list.end_render_pass().unwrap();
    assert!(!state_changes(headless(&mut list).calls()).is_empty());

    headless(&mut list).clear_calls();
    list.begin_render_pass(&pso).unwrap();
    list.end_render_pass().unwrap();

    assert!(state_changes(headless(&mut list).calls()).is_empty());
}

/// Binds `first`, then `second`, and returns the state changes `second`
/// issued together with the counters that moved.
fn switch_passes(
    fx: &Fixture,
    first: PipelineState,
    second: PipelineState,
) -> (Vec<DeviceCall>, Vec<(RhiCounter, u64)>) {
    let profiler = Arc::new(
        MetricsProfiler::new(Arc::new(fx.device.clone()), MetricsRegistry::new()).unwrap(),
    );
    let context = Arc::new(
        RhiContext::new(Arc::new(fx.device.clone()), RhiSettings::default())
            .with_profiler(profiler.clone()),
    );
    let mut list = context.create_command_list("switch").unwrap();
    list.begin().unwrap();
    list.begin_render_pass(&Arc::new(first)).unwrap();
    list.end_render_pass().unwrap();
    headless(&mut list).clear_calls();
    profiler.reset_counters();

    list.begin_render_pass(&Arc::new(second)).unwrap();

    let changes = headless(&mut list)
        .take_calls()
        .into_iter()
        .filter(DeviceCall::is_state_change)
        .collect();
    let moved = RhiCounter::ALL
        .into_iter()
        .filter(|&counter| counter != RhiCounter::Pipeline)
        .map(|counter| (counter, profiler.counter(counter)))
        .filter(|&(_, value)| value > 0)
        .collect();
    (changes, moved)
}

#[test]
fn only_the_rasterizer_state_differs() {
    let fx = Fixture::new();
    let target = fx.color_target("scene", 64);
    let first = fx.graphics_pass("scene", &target);
    let mut second = first.clone();
    let wireframe = fx.factory.rasterizer_states().cull_back_wireframe.clone();
    second.rasterizer_state = Some(wireframe.clone());

    let (changes, moved) = switch_passes(&fx, first, second);

    assert_eq!(changes, vec![DeviceCall::SetRasterizerState(Some(wireframe.handle()))]);
    assert!(moved.is_empty(), "{moved:?}");
}

#[test]
fn only_the_blend_state_differs() {
    let fx = Fixture::new();
    let target = fx.color_target("scene", 64);
    let first = fx.graphics_pass("scene", &target);
    let mut second = first.clone();
    second.blend_state = Some(fx.factory.blend_states().alpha.clone());

    let (changes, moved) = switch_passes(&fx, first, second);

    assert_eq!(changes.len(), 1, "{changes:?}");
    assert!(matches!(changes[0], DeviceCall::SetBlendState(_)));
    assert!(moved.is_empty(), "{moved:?}");
}

#[test]
fn only_the_pixel_shader_differs() {
    let fx = Fixture::new();
    let target = fx.color_target("scene", 64);
    let first = fx.graphics_pass("scene", &target);
    let mut second = first.clone();
    let tonemap = fx.shader("tonemap_ps", ShaderStage::Pixel);
    second.shader_pixel = Some(tonemap.clone());

    let (changes, moved) = switch_passes(&fx, first, second);

    assert_eq!(
        changes,
        vec![DeviceCall::SetShader {
            stage: ShaderStage::Pixel,
            shader: Some(tonemap.handle()),
        }]
    );
    assert_eq!(moved, vec![(RhiCounter::ShaderPixel, 1)]);
}

#[test]
fn only_the_topology_differs() {
    let fx = Fixture::new();
    let target = fx.color_target("scene", 64);
    let first = fx.graphics_pass("scene", &target);
    let mut second = first.clone();
    second.primitive_topology = PrimitiveTopology::LineList;

    let (changes, moved) = switch_passes(&fx, first, second);

    assert_eq!(
        changes,
        vec![DeviceCall::SetPrimitiveTopology(PrimitiveTopology::LineList)]
    );
    assert!(moved.is_empty(), "{moved:?}");
}

#[test]
fn only_the_color_target_differs() {
    let fx = Fixture::new();
    let target = fx.color_target("scene", 64);
    let other = fx.color_target("scene_2", 64);
    let first = fx.graphics_pass("scene", &target);
    let mut second = first.clone();
    second.render_target_color_textures[0] = Some(other.clone());

    let (changes, moved) = switch_passes(&fx, first, second);

    assert_eq!(changes.len(), 1, "{changes:?}");
    let DeviceCall::SetRenderTargets(binding) = &changes[0] else {
        panic!("expected a render target change, got {changes:?}");
    };
    assert_eq!(binding.color[0], other.render_target_view(0));
    assert_eq!(moved, vec![(RhiCounter::RenderTarget, 1)]);
}

#[test]
fn effective_mode_needs_both_settings_and_backend() {
    let fx = Fixture::with(
        RhiSettings::default(),
        HeadlessConfig {
            state_query_mode: StateQueryMode::CacheOnly,
            ..HeadlessConfig::default()
        },
    );
    let list = fx.recording("modes");
    assert_eq!(list.state_query_mode(), StateQueryMode::CacheOnly);

    let fx = Fixture::with(
        RhiSettings {
            state_query_mode: StateQueryMode::CacheOnly,
            ..RhiSettings::default()
        },
        HeadlessConfig::default(),
    );
    let list = fx.recording("modes");
    assert_eq!(list.state_query_mode(), StateQueryMode::CacheOnly);

    let fx = Fixture::new();
    let list = fx.recording("modes");
    assert_eq!(list.state_query_mode(), StateQueryMode::Live);
}

#[test]
fn live_mode_repairs_state_changed_behind_its_back() {
    let fx = Fixture::new();
    let target = fx.color_target("scene", 64);
    let pso = Arc::new(fx.graphics_pass("scene", &target));
    let pixel = pso.shader_pixel.as_ref().unwrap().handle();
    let mut list = fx.recording("live");

    list.begin_render_pass(&pso).unwrap();
    list.end_render_pass().unwrap();
    headless(&mut list).bind_shader_untracked(ShaderStage::Pixel, None);
    headless(&mut list).clear_calls();

    list.begin_render_pass(&pso).unwrap();

    let calls = headless(&mut list).take_calls();
    assert_eq!(
        state_changes(&calls),
        vec![&DeviceCall::SetShader {
            stage: ShaderStage::Pixel,
            shader: Some(pixel),
        }]
    );
}

#[test]
fn cache_only_mode_trusts_its_own_record() {
    let fx = Fixture::with(
        RhiSettings {
            state_query_mode: StateQueryMode::CacheOnly,
            ..RhiSettings::default()
        },
        HeadlessConfig::default(),
    );
    let target = fx.color_target("scene", 64);
    let pso = Arc::new(fx.graphics_pass("scene", &target));
    let mut list = fx.recording("cache");

    list.begin_render_pass(&pso).unwrap();
    list.end_render_pass().unwrap();
    headless(&mut list).bind_shader_untracked(ShaderStage::Pixel, None);
    headless(&mut list).clear_calls();

    list.begin_render_pass(&pso).unwrap();

    assert!(state_changes(headless(&mut list).calls()).is_empty());
    assert_eq!(headless(&mut list).calls().len(), 1);
    assert_eq!(
        list.bound_state().shader(ShaderStage::Pixel),
        pso.shader_pixel.as_ref().map(|s| s.handle())
    );
}

#[test]
fn redundant_bindings_are_skipped_and_counted_once() {
    let fx = Fixture::new();
    let profiler = Arc::new(
        MetricsProfiler::new(Arc::new(fx.device.clone()), MetricsRegistry::new()).unwrap(),
    );
    let context = Arc::new(
        RhiContext::new(Arc::new(fx.device.clone()), RhiSettings::default())
            .with_profiler(profiler.clone()),
    );
    let target = fx.color_target("scene", 64);
    let source = fx.color_target("source", 64);
    let pso = Arc::new(fx.graphics_pass("scene", &target));
    let buffer = fx.factory.constant_buffers().material.clone();

    let mut list = context.create_command_list("bindings").unwrap();
    list.begin().unwrap();
    list.begin_render_pass(&pso).unwrap();
    headless(&mut list).clear_calls();

    let scope = ShaderScope::VERTEX | ShaderScope::PIXEL;
    for _ in 0..3 {
        list.set_constant_buffer(3, scope, Some(&buffer)).unwrap();
        list.set_texture(0, ShaderScope::PIXEL, Some(&source), TextureBinding::sampled())
            .unwrap();
    }
    list.draw(3).unwrap();

    let calls = headless(&mut list).take_calls();
    assert_eq!(state_changes(&calls).len(), 3);
    assert_eq!(profiler.counter(RhiCounter::BufferConstant), 2);
    assert_eq!(profiler.counter(RhiCounter::TextureSampled), 1);
    assert_eq!(profiler.counter(RhiCounter::Pipeline), 1);
    assert_eq!(profiler.counter(RhiCounter::Draw), 1);
}

#[test]
fn unbinding_a_constant_buffer_is_a_change() {
    let fx = Fixture::new();
    let target = fx.color_target("scene", 64);
    let pso = Arc::new(fx.graphics_pass("scene", &target));
    let buffer = fx.factory.constant_buffers().light.clone();
    let mut list = fx.recording("unbind");
    list.begin_render_pass(&pso).unwrap();

    list.set_constant_buffer(2, ShaderScope::PIXEL, Some(&buffer)).unwrap();
    headless(&mut list).clear_calls();
    list.set_constant_buffer(2, ShaderScope::PIXEL, None).unwrap();
    list.set_constant_buffer(2, ShaderScope::PIXEL, None).unwrap();

    assert_eq!(
        headless(&mut list).calls(),
        &[DeviceCall::SetConstantBuffer {
            stage: ShaderStage::Pixel,
            slot: 2,
            buffer: None,
        }]
    );
}

#[test]
fn reset_forgets_the_cache() {
    let fx = Fixture::with(
        RhiSettings {
            state_query_mode: StateQueryMode::CacheOnly,
            ..RhiSettings::default()
        },
        HeadlessConfig::default(),
    );
    let target = fx.color_target("scene", 64);
    let pso = Arc::new(fx.graphics_pass("scene", &target));
    let mut list = fx.recording("reset");
    list.begin_render_pass(&pso).unwrap();
    list.end_render_pass().unwrap();

    list.reset();
    headless(&mut list).clear_calls();
    list.begin().unwrap();
    list.begin_render_pass(&pso).unwrap();

    let calls = headless(&mut list).take_calls();
    assert!(calls.iter().any(|call| matches!(
        call,
        DeviceCall::SetShader {
            stage: ShaderStage::Vertex,
            ..
        }
    )));
}
