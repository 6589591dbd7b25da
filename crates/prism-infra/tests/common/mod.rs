#![allow(dead_code)]

use prism_core::renderer::{ResourceFactory, Resolution};
use prism_core::rhi::resource::{Shader, ShaderDesc, Texture, TextureDesc, TextureFlags};
use prism_core::rhi::traits::RhiDeviceContext;
use prism_core::rhi::{
    CommandList, Format, PipelineState, PrimitiveTopology, RhiContext, RhiSettings, ShaderStage,
};
use prism_infra::graphics::headless::{HeadlessConfig, HeadlessContext, HeadlessDevice};
use std::sync::Arc;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A headless device, a context over it and the standard state objects.
pub struct Fixture {
    pub device: HeadlessDevice,
    pub context: Arc<RhiContext>,
    pub factory: ResourceFactory,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with(RhiSettings::default(), HeadlessConfig::default())
    }

    pub fn with(settings: RhiSettings, config: HeadlessConfig) -> Self {
        init_logging();
        let device = HeadlessDevice::new(config);
        let factory = ResourceFactory::new(
            Arc::new(device.clone()),
            settings.clone(),
            Resolution::new(64, 64),
            Resolution::new(64, 64),
        )
        .unwrap();
        let context = Arc::new(RhiContext::new(Arc::new(device.clone()), settings));
        Self {
            device,
            context,
            factory,
        }
    }

    /// A command list that has already begun recording.
    pub fn recording(&self, name: &str) -> CommandList {
        let mut list = self.context.create_command_list(name).unwrap();
        list.begin().unwrap();
        list
    }

    pub fn shader(&self, name: &str, stage: ShaderStage) -> Arc<Shader> {
        Shader::new(
            &self.device,
            ShaderDesc {
                name: name.to_owned(),
                stage,
                entry_point: String::from("main"),
            },
            None,
        )
        .unwrap()
    }

    pub fn color_target(&self, name: &str, size: u32) -> Arc<Texture> {
        Texture::new(
            &self.device,
            TextureDesc::new_2d(
                name,
                size,
                size,
                1,
                Format::R8G8B8A8Unorm,
                TextureFlags::RT_COLOR | TextureFlags::SRV,
            ),
        )
        .unwrap()
    }

    pub fn depth_target(&self, name: &str, size: u32) -> Arc<Texture> {
        Texture::new(
            &self.device,
            TextureDesc::new_2d(
                name,
                size,
                size,
                1,
                Format::D32Float,
                TextureFlags::RT_DEPTH_STENCIL
                    | TextureFlags::RT_DEPTH_STENCIL_READ_ONLY
                    | TextureFlags::SRV,
            ),
        )
        .unwrap()
    }

    pub fn storage_texture(&self, name: &str, size: u32) -> Arc<Texture> {
        Texture::new(
            &self.device,
            TextureDesc::new_2d(
                name,
                size,
                size,
                1,
                Format::R16G16B16A16Float,
                TextureFlags::UAV | TextureFlags::SRV,
            ),
        )
        .unwrap()
    }

    /// A valid graphics pipeline writing one color target.
    pub fn graphics_pass(&self, name: &str, target: &Arc<Texture>) -> PipelineState {
        let mut pso = PipelineState::graphics(name);
        pso.shader_vertex = Some(self.shader("fullscreen_vs", ShaderStage::Vertex));
        pso.shader_pixel = Some(self.shader("fullscreen_ps", ShaderStage::Pixel));
        pso.blend_state = Some(self.factory.blend_states().disabled.clone());
        pso.depth_stencil_state = Some(self.factory.depth_stencil_states().off_off.clone());
        pso.rasterizer_state = Some(self.factory.rasterizer_states().cull_back_solid.clone());
        pso.primitive_topology = PrimitiveTopology::TriangleList;
        pso.render_target_color_textures[0] = Some(target.clone());
        pso
    }

    pub fn compute_pass(&self, name: &str) -> PipelineState {
        PipelineState::compute(name, self.shader("compute_cs", ShaderStage::Compute))
    }
}

/// The headless context a command list records into.
pub fn headless(list: &mut CommandList) -> &mut HeadlessContext {
    list.device_context()
        .as_any_mut()
        .downcast_mut::<HeadlessContext>()
        .unwrap()
}
