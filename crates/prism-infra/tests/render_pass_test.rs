mod common;

use common::{headless, Fixture};
use prism_core::renderer::SamplerSlot;
use prism_core::rhi::resource::{
    Semaphore, SwapChain, SwapChainDesc, Texture, TextureDesc, TextureFlags,
};
use prism_core::rhi::traits::{
    BlendBinding, DepthStencilBinding, GlobalShaderResources, RenderTargetBinding,
};
use prism_core::rhi::{
    ClearFlags, ClearValue, Color, CommandList, CommandListState, Format, PipelineStateError,
    PrimitiveTopology, Rectangle, RhiError, RhiSettings, ShaderStage, TextureClear, Viewport,
};
use prism_infra::graphics::headless::{DeviceCall, HeadlessConfig};
use std::sync::Arc;

#[test]
fn begin_render_pass_binds_then_clears_in_order() {
    let fx = Fixture::new();
    let target = fx.color_target("albedo", 64);
    let depth = fx.depth_target("depth", 64);
    let mut pso = fx.graphics_pass("gbuffer", &target);
    pso.render_target_depth_texture = Some(depth.clone());
    pso.clear_color[0] = ClearValue::Value(Color::BLACK);
    pso.clear_depth = ClearValue::Value(0.0);
    pso.viewport = Some(Viewport::new(0.0, 0.0, 64.0, 64.0));
    let pso = Arc::new(pso);

    let mut list = fx.recording("order");
    list.begin_render_pass(&pso).unwrap();
    list.draw(3).unwrap();
    list.end_render_pass().unwrap();

    let blend = pso.blend_state.as_ref().unwrap();
    let rtv = target.render_target_view(0).unwrap();
    let dsv = depth.depth_stencil_view(0, false).unwrap();
    let mut color = [None; 8];
    color[0] = Some(rtv);
    let expected = vec![
        DeviceCall::BeginEvent(String::from("gbuffer")),
        DeviceCall::SetShader {
            stage: ShaderStage::Vertex,
            shader: pso.shader_vertex.as_ref().map(|s| s.handle()),
        },
        DeviceCall::SetShader {
            stage: ShaderStage::Pixel,
            shader: pso.shader_pixel.as_ref().map(|s| s.handle()),
        },
        DeviceCall::SetBlendState(BlendBinding {
            state: Some(blend.handle()),
            factor: [blend.blend_factor(); 4],
            sample_mask: u32::MAX,
        }),
        DeviceCall::SetDepthStencilState(DepthStencilBinding {
            state: pso.depth_stencil_state.as_ref().map(|s| s.handle()),
            stencil_ref: 1,
        }),
        DeviceCall::SetRasterizerState(pso.rasterizer_state.as_ref().map(|s| s.handle())),
        DeviceCall::SetPrimitiveTopology(PrimitiveTopology::TriangleList),
        DeviceCall::SetRenderTargets(RenderTargetBinding {
            color,
            depth_stencil: Some(dsv),
        }),
        DeviceCall::SetViewport(Viewport::new(0.0, 0.0, 64.0, 64.0)),
        DeviceCall::ClearRenderTarget {
            view: rtv,
            color: [0.0, 0.0, 0.0, 1.0],
        },
        DeviceCall::ClearDepthStencil {
            view: dsv,
            flags: ClearFlags::DEPTH,
            depth: 0.0,
            stencil: 0,
        },
        DeviceCall::Draw {
            vertex_count: 3,
            vertex_offset: 0,
        },
        DeviceCall::EndEvent,
    ];
    assert_eq!(headless(&mut list).calls(), expected.as_slice());
}

#[test]
fn invalid_pipeline_is_rejected_before_any_device_call() {
    let fx = Fixture::new();
    let target = fx.color_target("albedo", 64);
    let swap_chain = SwapChain::new(
        &fx.device,
        SwapChainDesc {
            name: String::from("window"),
            width: 64,
            height: 64,
            format: Format::R8G8B8A8Unorm,
            buffer_count: 2,
        },
    )
    .unwrap();
    let mut pso = fx.graphics_pass("conflict", &target);
    pso.render_target_swapchain = Some(swap_chain);
    let mut list = fx.recording("invalid");

    let err = list.begin_render_pass(&Arc::new(pso)).unwrap_err();

    assert_eq!(
        err,
        RhiError::InvalidPipelineState(PipelineStateError::ConflictingRenderTargets)
    );
    assert!(headless(&mut list).calls().is_empty());
    assert!(list.pipeline_state().is_none());
}

#[test]
fn target_without_render_target_view_leaves_no_pass_behind() {
    let fx = Fixture::new();
    let sampled_only = Texture::new(
        &fx.device,
        TextureDesc::new_2d("sampled_only", 64, 64, 1, Format::R8G8B8A8Unorm, TextureFlags::SRV),
    )
    .unwrap();
    let pso = Arc::new(fx.graphics_pass("no_rtv", &sampled_only));
    assert!(pso.is_valid());
    let mut list = fx.recording("no_rtv");

    let err = list.begin_render_pass(&pso).unwrap_err();

    assert!(matches!(err, RhiError::Precondition(_)), "{err}");
    assert!(headless(&mut list).calls().is_empty());
    assert_eq!(headless(&mut list).marker_depth(), 0);
    assert!(list.pipeline_state().is_none());
    assert_eq!(list.draw(3), Err(RhiError::NoActivePass));
}

struct FailingGlobals;

impl GlobalShaderResources for FailingGlobals {
    fn bind(&self, _cmd: &mut CommandList) -> Result<(), RhiError> {
        Err(RhiError::Precondition(String::from("globals unavailable")))
    }
}

#[test]
fn failed_global_binding_closes_the_pass() {
    let fx = Fixture::new();
    fx.context.set_global_shader_resources(Some(Arc::new(FailingGlobals)));
    let target = fx.color_target("albedo", 64);
    let pso = Arc::new(fx.graphics_pass("globals", &target));
    let mut list = fx.recording("globals");

    let err = list.begin_render_pass(&pso).unwrap_err();

    assert_eq!(err, RhiError::Precondition(String::from("globals unavailable")));
    assert!(list.pipeline_state().is_none());
    assert_eq!(headless(&mut list).marker_depth(), 0);
    assert_eq!(headless(&mut list).calls().last(), Some(&DeviceCall::EndEvent));
    assert_eq!(list.draw(3), Err(RhiError::NoActivePass));
}

#[test]
fn swapchain_pass_clears_and_presents_the_back_buffer() {
    let fx = Fixture::new();
    let swap_chain = SwapChain::new(
        &fx.device,
        SwapChainDesc {
            name: String::from("window"),
            width: 64,
            height: 64,
            format: Format::R8G8B8A8Unorm,
            buffer_count: 2,
        },
    )
    .unwrap();
    let placeholder = fx.color_target("unused", 64);
    let mut pso = fx.graphics_pass("present", &placeholder);
    pso.render_target_color_textures[0] = None;
    pso.render_target_swapchain = Some(swap_chain.clone());
    pso.clear_color[0] = ClearValue::Value(Color::WHITE);
    let pso = Arc::new(pso);
    let back_buffer = swap_chain.back_buffer_view().unwrap();

    let mut list = fx.recording("present");
    list.begin_render_pass(&pso).unwrap();
    list.draw(3).unwrap();
    list.end_render_pass().unwrap();
    list.end().unwrap();
    list.submit(None).unwrap();
    swap_chain.present(list.device_context()).unwrap();

    let calls = headless(&mut list).take_calls();
    let mut color = [None; 8];
    color[0] = Some(back_buffer);
    assert!(calls.contains(&DeviceCall::SetRenderTargets(RenderTargetBinding {
        color,
        depth_stencil: None,
    })));
    assert!(calls.contains(&DeviceCall::ClearRenderTarget {
        view: back_buffer,
        color: [1.0; 4],
    }));
    assert_eq!(calls.last(), Some(&DeviceCall::Present(swap_chain.handle())));
    assert_eq!(swap_chain.back_buffer_index(), 1);
}

#[test]
fn read_only_depth_binds_the_read_only_view() {
    let fx = Fixture::new();
    let depth = fx.depth_target("depth", 64);
    let placeholder = fx.color_target("unused", 64);
    let mut pso = fx.graphics_pass("depth_prepass", &placeholder);
    pso.render_target_color_textures[0] = None;
    pso.render_target_depth_texture = Some(depth.clone());
    pso.render_target_depth_texture_read_only = true;
    let mut list = fx.recording("depth");

    list.begin_render_pass(&Arc::new(pso)).unwrap();

    assert_eq!(
        list.bound_state().render_targets,
        RenderTargetBinding {
            color: [None; 8],
            depth_stencil: depth.depth_stencil_view(0, true),
        }
    );
    assert_ne!(
        depth.depth_stencil_view(0, true),
        depth.depth_stencil_view(0, false)
    );
    assert!(!headless(&mut list).calls().iter().any(DeviceCall::is_clear));
}

#[test]
fn global_resources_are_bound_once_per_change() {
    let fx = Fixture::new();
    fx.context
        .set_global_shader_resources(Some(fx.factory.globals().clone()));
    let target = fx.color_target("albedo", 64);
    let pso = Arc::new(fx.graphics_pass("lighting", &target));
    let mut list = fx.recording("globals");

    list.begin_render_pass(&pso).unwrap();
    list.end_render_pass().unwrap();

    let calls = headless(&mut list).take_calls();
    let constant_buffers = calls
        .iter()
        .filter(|call| matches!(call, DeviceCall::SetConstantBuffer { .. }))
        .count();
    let samplers = calls
        .iter()
        .filter(|call| matches!(call, DeviceCall::SetSampler { .. }))
        .count();
    assert_eq!(constant_buffers, 6);
    assert_eq!(samplers, 14);
    assert!(calls.contains(&DeviceCall::SetSampler {
        stage: ShaderStage::Compute,
        slot: SamplerSlot::AnisotropicWrap as u32,
        sampler: Some(fx.factory.sampler(SamplerSlot::AnisotropicWrap).handle()),
    }));

    list.begin_render_pass(&pso).unwrap();
    assert!(!headless(&mut list)
        .calls()
        .iter()
        .any(DeviceCall::is_state_change));
}

#[test]
fn markers_follow_settings_and_pass_names() {
    let fx = Fixture::with(
        RhiSettings {
            markers_enabled: false,
            ..RhiSettings::default()
        },
        HeadlessConfig::default(),
    );
    let target = fx.color_target("albedo", 64);
    let mut list = fx.recording("markers");
    list.begin_render_pass(&Arc::new(fx.graphics_pass("quiet", &target)))
        .unwrap();
    list.end_render_pass().unwrap();
    assert!(!headless(&mut list)
        .calls()
        .iter()
        .any(|call| matches!(call, DeviceCall::BeginEvent(_) | DeviceCall::EndEvent)));

    let fx = Fixture::new();
    let target = fx.color_target("albedo", 64);
    let mut list = fx.recording("markers");
    list.begin_render_pass(&Arc::new(fx.graphics_pass("", &target)))
        .unwrap();
    list.end_render_pass().unwrap();
    assert!(!headless(&mut list)
        .calls()
        .iter()
        .any(|call| matches!(call, DeviceCall::BeginEvent(_))));
}

#[test]
fn starting_a_pass_closes_the_previous_one() {
    let fx = Fixture::new();
    let target = fx.color_target("albedo", 64);
    let first = Arc::new(fx.graphics_pass("first", &target));
    let second = Arc::new(fx.graphics_pass("second", &target));
    let mut list = fx.recording("nesting");

    list.begin_render_pass(&first).unwrap();
    list.begin_render_pass(&second).unwrap();
    assert_eq!(headless(&mut list).marker_depth(), 1);

    list.end().unwrap();
    assert_eq!(headless(&mut list).marker_depth(), 0);
    assert_eq!(list.state(), CommandListState::Ended);
    let markers: Vec<_> = headless(&mut list)
        .calls()
        .iter()
        .filter(|call| matches!(call, DeviceCall::BeginEvent(_) | DeviceCall::EndEvent))
        .cloned()
        .collect();
    assert_eq!(
        markers,
        vec![
            DeviceCall::BeginEvent(String::from("first")),
            DeviceCall::EndEvent,
            DeviceCall::BeginEvent(String::from("second")),
            DeviceCall::EndEvent,
        ]
    );
}

#[test]
fn work_outside_a_pass_is_rejected() {
    let fx = Fixture::new();
    let mut list = fx.recording("no_pass");

    assert_eq!(list.draw(3), Err(RhiError::NoActivePass));
    assert_eq!(list.draw_indexed(6, 0, 0), Err(RhiError::NoActivePass));
    assert_eq!(list.dispatch(1, 1, 1), Err(RhiError::NoActivePass));
    assert_eq!(list.end_render_pass(), Err(RhiError::NoActivePass));
    assert!(headless(&mut list).calls().is_empty());
}

#[test]
fn lifecycle_is_enforced_when_strict() {
    let fx = Fixture::new();
    let semaphore = Semaphore::new(&fx.device).unwrap();
    let mut list = fx.context.create_command_list("lifecycle").unwrap();

    assert_eq!(
        list.draw(3),
        Err(RhiError::InvalidState {
            operation: "draw",
            state: CommandListState::Idle,
        })
    );
    list.begin().unwrap();
    assert!(matches!(list.begin(), Err(RhiError::InvalidState { .. })));
    assert_eq!(
        list.submit(None),
        Err(RhiError::InvalidState {
            operation: "submit",
            state: CommandListState::Recording,
        })
    );

    list.end().unwrap();
    list.submit(Some(&semaphore)).unwrap();
    assert_eq!(list.state(), CommandListState::Submitted);
    assert_eq!(headless(&mut list).submissions(), 1);
    assert_eq!(
        headless(&mut list).calls().last(),
        Some(&DeviceCall::Submit {
            wait: Some(semaphore.handle()),
        })
    );

    list.reset();
    assert_eq!(list.state(), CommandListState::Idle);
    list.begin().unwrap();
}

#[test]
fn lifecycle_violations_only_warn_when_permissive() {
    let fx = Fixture::with(
        RhiSettings {
            strict_state_machine: false,
            ..RhiSettings::default()
        },
        HeadlessConfig::default(),
    );
    let mut list = fx.context.create_command_list("permissive").unwrap();

    list.end().unwrap();
    assert_eq!(list.state(), CommandListState::Ended);
    list.submit(None).unwrap();
    list.submit(None).unwrap();
    assert_eq!(headless(&mut list).submissions(), 2);
}

#[test]
fn settings_are_snapshotted_at_begin() {
    let fx = Fixture::new();
    let target = fx.color_target("albedo", 64);
    let pso = Arc::new(fx.graphics_pass("snapshot", &target));
    let mut list = fx.recording("snapshot");

    fx.context.update_settings(|s| s.markers_enabled = false);
    list.begin_render_pass(&pso).unwrap();
    assert_eq!(headless(&mut list).marker_depth(), 1);

    list.reset();
    list.begin().unwrap();
    headless(&mut list).clear_calls();
    list.begin_render_pass(&pso).unwrap();
    assert_eq!(headless(&mut list).marker_depth(), 0);
}

#[test]
fn clear_texture_picks_the_view_from_the_format() {
    let fx = Fixture::new();
    let color = fx.color_target("albedo", 64);
    let depth = fx.depth_target("depth", 64);
    let storage = Texture::new(
        &fx.device,
        TextureDesc::new_2d(
            "bloom",
            64,
            64,
            3,
            Format::R11G11B10Float,
            TextureFlags::UAV | TextureFlags::SRV | TextureFlags::PER_MIP_VIEW,
        ),
    )
    .unwrap();
    let mut list = fx.recording("clears");

    list.clear_texture(&color, &TextureClear::color(Color::WHITE))
        .unwrap();
    list.clear_texture(
        &depth,
        &TextureClear::depth_stencil(ClearValue::Value(1.0), ClearValue::Value(0)),
    )
    .unwrap();
    list.clear_texture(&storage, &TextureClear::storage(Color::TRANSPARENT))
        .unwrap();

    let calls = headless(&mut list).take_calls();
    assert_eq!(
        calls[0],
        DeviceCall::ClearRenderTarget {
            view: color.render_target_view(0).unwrap(),
            color: [1.0; 4],
        }
    );
    assert_eq!(
        calls[1],
        DeviceCall::ClearDepthStencil {
            view: depth.depth_stencil_view(0, false).unwrap(),
            flags: ClearFlags::DEPTH | ClearFlags::STENCIL,
            depth: 1.0,
            stencil: 0,
        }
    );
    // The whole-texture storage view, then one per mip.
    assert_eq!(calls.len(), 2 + 1 + 3);
    assert!(calls[2..]
        .iter()
        .all(|call| matches!(call, DeviceCall::ClearStorage { .. })));
}

#[test]
fn clearing_an_unbacked_texture_fails() {
    let fx = Fixture::new();
    let texture = Texture::unbacked(TextureDesc::new_2d(
        "placeholder",
        64,
        64,
        1,
        Format::R8G8B8A8Unorm,
        TextureFlags::RT_COLOR,
    ));
    let mut list = fx.recording("unbacked");

    let err = list
        .clear_texture(&texture, &TextureClear::color(Color::BLACK))
        .unwrap_err();

    assert!(matches!(err, RhiError::Precondition(_)));
}

#[test]
fn viewport_and_scissor_reach_the_device() {
    let fx = Fixture::new();
    let mut list = fx.recording("viewport");

    list.set_viewport(&Viewport::new(0.0, 0.0, 32.0, 16.0)).unwrap();
    list.set_scissor_rectangle(&Rectangle::new(0, 0, 8, 8)).unwrap();

    assert_eq!(
        headless(&mut list).viewport(),
        Some(Viewport::new(0.0, 0.0, 32.0, 16.0))
    );
    assert_eq!(headless(&mut list).scissor(), Some(Rectangle::new(0, 0, 8, 8)));
}
