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

//! Records a few frames of a deferred renderer on the headless backend and
//! prints what the state-diffing command list actually sent to the device.
//!
//! Usage: `sandbox [settings.json]`

use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use prism_core::renderer::{FrameConstants, RenderTargetId, ResourceFactory, Resolution};
use prism_core::rhi::query::QueryWait;
use prism_core::rhi::resource::{
    InputLayout, InputLayoutDesc, Shader, ShaderDesc, SwapChain, SwapChainDesc, Texture,
    VertexFormat,
};
use prism_core::rhi::traits::{RhiCounter, RhiDevice};
use prism_core::rhi::{
    ClearValue, Color, CommandList, Format, PipelineState, PrimitiveTopology, RhiContext,
    RhiSettings, ShaderScope, ShaderStage, TextureBinding, Viewport,
};
use prism_core::sync::CancellationToken;
use prism_infra::graphics::headless::{HeadlessContext, HeadlessDevice};
use prism_infra::imaging::mipmaps::MipChainGenerator;
use prism_infra::telemetry::MetricsProfiler;
use prism_telemetry::MetricsRegistry;
use std::sync::Arc;

const FRAMES: u32 = 3;
const RENDER_RESOLUTION: Resolution = Resolution::new(1280, 720);
const OUTPUT_RESOLUTION: Resolution = Resolution::new(1920, 1080);

struct Passes {
    gbuffer: Arc<PipelineState>,
    ssao: Arc<PipelineState>,
    present: Arc<PipelineState>,
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let settings = match std::env::args().nth(1) {
        Some(path) => RhiSettings::load(&path)
            .with_context(|| format!("Failed to load settings from '{path}'"))?,
        None => RhiSettings::default(),
    };

    let headless = HeadlessDevice::default();
    let device: Arc<dyn RhiDevice> = Arc::new(headless.clone());
    let registry = MetricsRegistry::new();
    let profiler = Arc::new(MetricsProfiler::new(Arc::clone(&device), registry.clone())?);
    let context = Arc::new(
        RhiContext::new(Arc::clone(&device), settings.clone()).with_profiler(profiler.clone()),
    );

    let factory = ResourceFactory::new(
        Arc::clone(&device),
        settings.clone(),
        RENDER_RESOLUTION,
        OUTPUT_RESOLUTION,
    )?;
    context.set_global_shader_resources(Some(factory.globals().clone()));

    let swap_chain = SwapChain::new(
        device.as_ref(),
        SwapChainDesc {
            name: String::from("sandbox"),
            width: OUTPUT_RESOLUTION.width,
            height: OUTPUT_RESOLUTION.height,
            format: Format::R8G8B8A8Unorm,
            buffer_count: 2,
        },
    )?;
    let passes = build_passes(device.as_ref(), &factory, &swap_chain)?;

    let mut list = context.create_command_list("frame")?;
    let wait = QueryWait::from_settings(&settings);
    for frame in 0..FRAMES {
        record_frame(&mut list, &factory, &passes, frame)?;
        list.submit(None)?;
        swap_chain.present(list.device_context())?;

        let calls = list
            .device_context()
            .as_any_mut()
            .downcast_mut::<HeadlessContext>()
            .map(|ctx| {
                let calls = ctx.take_calls();
                let changes = calls.iter().filter(|c| c.is_state_change()).count();
                (calls.len(), changes)
            });
        if let Some((total, changes)) = calls {
            log::info!("Frame {frame}: {total} device calls, {changes} state changes");
        }

        let resolved = profiler.resolve_gpu_time_blocks(list.device_context(), &wait)?;
        log::debug!("Frame {frame}: resolved {resolved} GPU time blocks");
        profiler.record_gpu_memory();
        list.reset();
    }

    generate_mips(&settings)?;

    for counter in RhiCounter::ALL {
        log::info!("{:<32} {}", counter.name(), profiler.counter(counter));
    }
    println!("{}", registry.snapshot_json());
    log::info!("{} objects still alive on the device", headless.live_object_count());
    Ok(())
}

fn shader(device: &dyn RhiDevice, name: &str, stage: ShaderStage) -> Result<Arc<Shader>> {
    let desc = ShaderDesc {
        name: name.to_owned(),
        stage,
        entry_point: String::from("main"),
    };
    Ok(Shader::new(device, desc, None)?)
}

fn build_passes(
    device: &dyn RhiDevice,
    factory: &ResourceFactory,
    swap_chain: &Arc<SwapChain>,
) -> Result<Passes> {
    let target = |id: RenderTargetId| -> Result<Arc<Texture>> {
        factory
            .render_target(id)
            .cloned()
            .with_context(|| format!("Render target '{}' was not created", id.name()))
    };

    let layout = InputLayout::new(
        device,
        InputLayoutDesc::packed(
            "mesh",
            &[
                ("POSITION", VertexFormat::Float3),
                ("NORMAL", VertexFormat::Float3),
                ("TEXCOORD", VertexFormat::Float2),
            ],
        ),
    )?;
    let mesh_vs = Shader::new(
        device,
        ShaderDesc {
            name: String::from("gbuffer_vs"),
            stage: ShaderStage::Vertex,
            entry_point: String::from("main"),
        },
        Some(layout),
    )?;

    let mut gbuffer = PipelineState::graphics("gbuffer");
    gbuffer.shader_vertex = Some(mesh_vs);
    gbuffer.shader_pixel = Some(shader(device, "gbuffer_ps", ShaderStage::Pixel)?);
    gbuffer.blend_state = Some(factory.blend_states().disabled.clone());
    gbuffer.depth_stencil_state = Some(factory.depth_stencil_states().rw_off.clone());
    gbuffer.rasterizer_state = Some(factory.rasterizer_states().cull_back_solid.clone());
    gbuffer.primitive_topology = PrimitiveTopology::TriangleList;
    for (slot, id) in [
        RenderTargetId::GbufferAlbedo,
        RenderTargetId::GbufferNormal,
        RenderTargetId::GbufferMaterial,
        RenderTargetId::GbufferVelocity,
    ]
    .into_iter()
    .enumerate()
    {
        gbuffer.render_target_color_textures[slot] = Some(target(id)?);
        gbuffer.clear_color[slot] = ClearValue::Value(Color::TRANSPARENT);
    }
    gbuffer.render_target_depth_texture = Some(target(RenderTargetId::GbufferDepth)?);
    // Reverse-Z clears to the far plane at zero.
    gbuffer.clear_depth = ClearValue::Value(0.0);
    gbuffer.viewport = Some(Viewport::new(
        0.0,
        0.0,
        RENDER_RESOLUTION.width as f32,
        RENDER_RESOLUTION.height as f32,
    ));

    let ssao = PipelineState::compute("ssao", shader(device, "ssao_cs", ShaderStage::Compute)?);

    let mut present = PipelineState::graphics("present");
    present.shader_vertex = Some(shader(device, "fullscreen_vs", ShaderStage::Vertex)?);
    present.shader_pixel = Some(shader(device, "present_ps", ShaderStage::Pixel)?);
    present.blend_state = Some(factory.blend_states().disabled.clone());
    present.depth_stencil_state = Some(factory.depth_stencil_states().off_off.clone());
    present.rasterizer_state = Some(factory.rasterizer_states().cull_back_solid.clone());
    present.primitive_topology = PrimitiveTopology::TriangleList;
    present.render_target_swapchain = Some(Arc::clone(swap_chain));
    present.clear_color[0] = ClearValue::DontCare;
    present.viewport = Some(Viewport::new(
        0.0,
        0.0,
        OUTPUT_RESOLUTION.width as f32,
        OUTPUT_RESOLUTION.height as f32,
    ));

    Ok(Passes {
        gbuffer: Arc::new(gbuffer),
        ssao: Arc::new(ssao),
        present: Arc::new(present),
    })
}

fn record_frame(
    list: &mut CommandList,
    factory: &ResourceFactory,
    passes: &Passes,
    frame: u32,
) -> Result<()> {
    let normal = factory
        .render_target(RenderTargetId::GbufferNormal)
        .context("Missing normal target")?;
    let ssao = factory
        .render_target(RenderTargetId::Ssao)
        .context("Missing SSAO target")?;
    let output = factory
        .render_target(RenderTargetId::FrameOutput)
        .context("Missing output target")?;

    list.begin()?;
    let constants = FrameConstants {
        frame,
        time: frame as f32 / 60.0,
        ..FrameConstants::default()
    };
    factory
        .constant_buffers()
        .frame
        .update(list.device_context(), &constants)?;

    list.begin_render_pass(&passes.gbuffer)?;
    for _ in 0..4 {
        list.draw(36)?;
    }
    list.end_render_pass()?;

    list.begin_render_pass(&passes.ssao)?;
    list.set_texture(0, ShaderScope::COMPUTE, Some(normal), TextureBinding::sampled())?;
    list.set_texture(0, ShaderScope::COMPUTE, Some(ssao), TextureBinding::storage())?;
    list.dispatch(
        RENDER_RESOLUTION.width.div_ceil(8),
        RENDER_RESOLUTION.height.div_ceil(8),
        1,
    )?;
    list.end_render_pass()?;

    list.begin_render_pass(&passes.present)?;
    list.set_texture(0, ShaderScope::PIXEL, Some(output), TextureBinding::sampled())?;
    list.set_texture(1, ShaderScope::PIXEL, Some(ssao), TextureBinding::sampled())?;
    list.draw(3)?;
    list.end_render_pass()?;

    list.end()?;
    Ok(())
}

fn generate_mips(settings: &RhiSettings) -> Result<()> {
    let generator = MipChainGenerator::new(0)?;
    let source = RgbaImage::from_fn(512, 256, |x, y| {
        let checker = ((x / 32) + (y / 32)) % 2 == 0;
        if checker {
            Rgba([230, 230, 230, 255])
        } else {
            Rgba([40, 40, 40, 255])
        }
    });
    let chain = generator.generate_with_settings(&source, settings, &CancellationToken::new())?;
    let sizes: Vec<_> = chain.levels().iter().map(|level| level.dimensions()).collect();
    log::info!("Generated {} mip levels: {:?}", chain.len(), sizes);
    Ok(())
}
