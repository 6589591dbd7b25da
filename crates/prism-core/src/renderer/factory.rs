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

//! Creation and ownership of the renderer's standard GPU objects.
//!
//! The [`ResourceFactory`] owns the constant buffers, pipeline states,
//! samplers and render targets every pass of the renderer draws from, and
//! recreates the resolution-dependent ones when the resolutions change.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::constants::{FrameConstants, LightConstants, MaterialConstants, UberConstants};
use super::globals::{FactoryGlobals, GlobalBindings, SamplerSlot};
use super::render_targets::{RenderTargetGroup, RenderTargetId, Resolution};
use crate::rhi::error::ResourceError;
use crate::rhi::resource::{
    AddressMode, BlendDesc, BlendFactor, BlendOperation, BlendState, ComparisonFunction,
    ConstantBuffer, CullMode, DepthStencilDesc, DepthStencilState, FillMode, Filter,
    RasterizerDesc, RasterizerState, Sampler, SamplerDesc, StencilOperation, StructuredBuffer,
    Texture,
};
use crate::rhi::settings::RhiSettings;
use crate::rhi::traits::RhiDevice;

/// The per-frame constant buffers.
#[derive(Debug, Clone)]
pub struct FactoryConstantBuffers {
    /// [`FrameConstants`].
    pub frame: Arc<ConstantBuffer>,
    /// [`UberConstants`].
    pub uber: Arc<ConstantBuffer>,
    /// [`LightConstants`].
    pub light: Arc<ConstantBuffer>,
    /// [`MaterialConstants`].
    pub material: Arc<ConstantBuffer>,
}

/// Depth-stencil states, named `<depth>_<stencil>` where `rw` is read-write,
/// `r` read-only, `w` write and `off` disabled.
#[derive(Debug, Clone)]
pub struct DepthStencilStates {
    /// No depth, no stencil.
    pub off_off: Arc<DepthStencilState>,
    /// Depth test and write, no stencil.
    pub rw_off: Arc<DepthStencilState>,
    /// Depth test only, no stencil.
    pub r_off: Arc<DepthStencilState>,
    /// No depth, stencil test.
    pub off_r: Arc<DepthStencilState>,
    /// Depth test and write, stencil write.
    pub rw_w: Arc<DepthStencilState>,
}

/// Rasterizer states.
#[derive(Debug, Clone)]
pub struct RasterizerStates {
    /// Back-face culling, solid fill.
    pub cull_back_solid: Arc<RasterizerState>,
    /// Back-face culling, wireframe.
    pub cull_back_wireframe: Arc<RasterizerState>,
    /// Shadow rendering for point and spot lights.
    pub light_point_spot: Arc<RasterizerState>,
    /// Shadow rendering for directional lights.
    pub light_directional: Arc<RasterizerState>,
}

/// Blend states.
#[derive(Debug, Clone)]
pub struct BlendStates {
    /// Blending off.
    pub disabled: Arc<BlendState>,
    /// Standard alpha blending.
    pub alpha: Arc<BlendState>,
    /// Additive blending.
    pub additive: Arc<BlendState>,
}

/// Owns the renderer's standard GPU objects.
pub struct ResourceFactory {
    device: Arc<dyn RhiDevice>,
    settings: RhiSettings,
    render_resolution: Resolution,
    output_resolution: Resolution,
    constant_buffers: FactoryConstantBuffers,
    counter_buffer: Arc<StructuredBuffer>,
    depth_stencil_states: DepthStencilStates,
    rasterizer_states: RasterizerStates,
    blend_states: BlendStates,
    render_targets: BTreeMap<RenderTargetId, Arc<Texture>>,
    globals: Arc<FactoryGlobals>,
}

impl ResourceFactory {
    /// Creates every standard object for the given resolutions.
    pub fn new(
        device: Arc<dyn RhiDevice>,
        settings: RhiSettings,
        render_resolution: Resolution,
        output_resolution: Resolution,
    ) -> Result<Self, ResourceError> {
        let constant_buffers = create_constant_buffers(device.as_ref())?;
        let counter_buffer = StructuredBuffer::new(
            device.as_ref(),
            "counter",
            std::mem::size_of::<u32>() as u32,
            1,
        )?;
        let depth_stencil_states = create_depth_stencil_states(device.as_ref(), &settings)?;
        let rasterizer_states = create_rasterizer_states(device.as_ref(), &settings)?;
        let blend_states = create_blend_states(device.as_ref())?;
        let samplers =
            create_samplers(device.as_ref(), &settings, render_resolution, output_resolution)?;

        let globals = Arc::new(FactoryGlobals::new(GlobalBindings {
            frame: constant_buffers.frame.clone(),
            uber: constant_buffers.uber.clone(),
            samplers,
        }));

        let mut factory = Self {
            device,
            settings,
            render_resolution,
            output_resolution,
            constant_buffers,
            counter_buffer,
            depth_stencil_states,
            rasterizer_states,
            blend_states,
            render_targets: BTreeMap::new(),
            globals,
        };
        factory.create_render_targets(&[
            RenderTargetGroup::Render,
            RenderTargetGroup::Output,
            RenderTargetGroup::Fixed,
            RenderTargetGroup::Dynamic,
        ])?;

        log::info!(
            "Resource factory ready: render {}x{}, output {}x{}, {} render targets",
            render_resolution.width,
            render_resolution.height,
            output_resolution.width,
            output_resolution.height,
            factory.render_targets.len()
        );
        Ok(factory)
    }

    /// (Re)creates the render targets of the given groups.
    pub fn create_render_targets(
        &mut self,
        groups: &[RenderTargetGroup],
    ) -> Result<(), ResourceError> {
        for id in RenderTargetId::ALL {
            if !groups.contains(&id.group()) {
                continue;
            }
            let desc = id.describe(self.render_resolution, self.output_resolution);
            let texture = Texture::new(self.device.as_ref(), desc)?;
            self.render_targets.insert(id, texture);
        }
        Ok(())
    }

    /// Applies new resolutions, recreating only what depends on the ones that
    /// changed. Returns the render target groups that were recreated.
    pub fn resize(
        &mut self,
        render_resolution: Resolution,
        output_resolution: Resolution,
    ) -> Result<Vec<RenderTargetGroup>, ResourceError> {
        let render_changed = render_resolution != self.render_resolution;
        let output_changed = output_resolution != self.output_resolution;
        if !render_changed && !output_changed {
            return Ok(Vec::new());
        }

        let previous_bias = mip_lod_bias(self.render_resolution, self.output_resolution);
        self.render_resolution = render_resolution;
        self.output_resolution = output_resolution;

        let mut groups = Vec::new();
        if render_changed {
            groups.push(RenderTargetGroup::Render);
        }
        if output_changed {
            groups.push(RenderTargetGroup::Output);
        }
        groups.push(RenderTargetGroup::Dynamic);
        self.create_render_targets(&groups)?;

        if mip_lod_bias(render_resolution, output_resolution) != previous_bias {
            self.recreate_anisotropic_sampler()?;
        }

        log::debug!(
            "Resized render targets to render {}x{}, output {}x{} ({:?})",
            render_resolution.width,
            render_resolution.height,
            output_resolution.width,
            output_resolution.height,
            groups
        );
        Ok(groups)
    }

    /// Recreates the anisotropic sampler with a new maximum anisotropy.
    pub fn on_anisotropy_changed(&mut self, anisotropy: u32) -> Result<(), ResourceError> {
        if self.settings.anisotropy == anisotropy {
            return Ok(());
        }
        self.settings.anisotropy = anisotropy;
        self.recreate_anisotropic_sampler()
    }

    fn recreate_anisotropic_sampler(&mut self) -> Result<(), ResourceError> {
        let sampler = anisotropic_sampler(
            self.device.as_ref(),
            &self.settings,
            self.render_resolution,
            self.output_resolution,
        )?;
        self.globals
            .replace_sampler(SamplerSlot::AnisotropicWrap, sampler);
        Ok(())
    }

    /// The render target `id`, if it has been created.
    pub fn render_target(&self, id: RenderTargetId) -> Option<&Arc<Texture>> {
        self.render_targets.get(&id)
    }

    /// The sampler bound at `slot`.
    pub fn sampler(&self, slot: SamplerSlot) -> Arc<Sampler> {
        self.globals.bindings().samplers[slot as usize].clone()
    }

    /// The shared resources to install with
    /// [`RhiContext::set_global_shader_resources`](crate::rhi::RhiContext::set_global_shader_resources).
    pub fn globals(&self) -> &Arc<FactoryGlobals> {
        &self.globals
    }

    /// The per-frame constant buffers.
    pub fn constant_buffers(&self) -> &FactoryConstantBuffers {
        &self.constant_buffers
    }

    /// A single `u32` structured buffer used as an atomic counter.
    pub fn counter_buffer(&self) -> &Arc<StructuredBuffer> {
        &self.counter_buffer
    }

    /// The depth-stencil states.
    pub fn depth_stencil_states(&self) -> &DepthStencilStates {
        &self.depth_stencil_states
    }

    /// The rasterizer states.
    pub fn rasterizer_states(&self) -> &RasterizerStates {
        &self.rasterizer_states
    }

    /// The blend states.
    pub fn blend_states(&self) -> &BlendStates {
        &self.blend_states
    }

    /// The current render resolution.
    pub fn render_resolution(&self) -> Resolution {
        self.render_resolution
    }

    /// The current output resolution.
    pub fn output_resolution(&self) -> Resolution {
        self.output_resolution
    }
}

/// Mip bias that keeps texture detail when rendering below output resolution.
pub fn mip_lod_bias(render: Resolution, output: Resolution) -> f32 {
    if render.width == 0 || output.width == 0 {
        return 0.0;
    }
    -(output.width as f32 / render.width as f32).log2()
}

fn create_constant_buffers(device: &dyn RhiDevice) -> Result<FactoryConstantBuffers, ResourceError> {
    Ok(FactoryConstantBuffers {
        frame: ConstantBuffer::new::<FrameConstants>(device, "frame", true)?,
        uber: ConstantBuffer::new::<UberConstants>(device, "uber", true)?,
        light: ConstantBuffer::new::<LightConstants>(device, "light", true)?,
        material: ConstantBuffer::new::<MaterialConstants>(device, "material", true)?,
    })
}

fn depth_comparison(settings: &RhiSettings) -> ComparisonFunction {
    if settings.reverse_z {
        ComparisonFunction::GreaterEqual
    } else {
        ComparisonFunction::LessEqual
    }
}

fn create_depth_stencil_states(
    device: &dyn RhiDevice,
    settings: &RhiSettings,
) -> Result<DepthStencilStates, ResourceError> {
    let depth_function = depth_comparison(settings);
    let off = DepthStencilDesc {
        depth_test: false,
        depth_write: false,
        depth_function,
        stencil_test: false,
        stencil_write: false,
        stencil_function: ComparisonFunction::Always,
        stencil_pass_operation: StencilOperation::Keep,
    };
    let read_write = DepthStencilDesc {
        depth_test: true,
        depth_write: true,
        ..off
    };

    Ok(DepthStencilStates {
        off_off: DepthStencilState::new(device, off)?,
        rw_off: DepthStencilState::new(device, read_write)?,
        r_off: DepthStencilState::new(
            device,
            DepthStencilDesc {
                depth_test: true,
                ..off
            },
        )?,
        off_r: DepthStencilState::new(
            device,
            DepthStencilDesc {
                stencil_test: true,
                stencil_function: ComparisonFunction::Equal,
                ..off
            },
        )?,
        rw_w: DepthStencilState::new(
            device,
            DepthStencilDesc {
                stencil_test: true,
                stencil_write: true,
                stencil_pass_operation: StencilOperation::Replace,
                ..read_write
            },
        )?,
    })
}

fn create_rasterizer_states(
    device: &dyn RhiDevice,
    settings: &RhiSettings,
) -> Result<RasterizerStates, ResourceError> {
    let shadow = RasterizerDesc {
        depth_bias: settings.depth_bias,
        depth_bias_clamp: settings.depth_bias_clamp,
        depth_bias_slope_scaled: settings.depth_bias_slope_scaled,
        ..RasterizerDesc::solid(CullMode::Back)
    };

    Ok(RasterizerStates {
        cull_back_solid: RasterizerState::new(device, RasterizerDesc::solid(CullMode::Back))?,
        cull_back_wireframe: RasterizerState::new(
            device,
            RasterizerDesc {
                fill_mode: FillMode::Wireframe,
                antialiased_lines: true,
                ..RasterizerDesc::solid(CullMode::Back)
            },
        )?,
        light_point_spot: RasterizerState::new(device, shadow)?,
        // Directional shadows span a much larger depth range.
        light_directional: RasterizerState::new(
            device,
            RasterizerDesc {
                depth_bias: settings.depth_bias * 0.1,
                depth_clip: false,
                ..shadow
            },
        )?,
    })
}

fn create_blend_states(device: &dyn RhiDevice) -> Result<BlendStates, ResourceError> {
    let alpha = BlendDesc {
        enabled: true,
        source: BlendFactor::SrcAlpha,
        destination: BlendFactor::InvSrcAlpha,
        operation: BlendOperation::Add,
        source_alpha: BlendFactor::One,
        destination_alpha: BlendFactor::One,
        operation_alpha: BlendOperation::Add,
        blend_factor: 0.0,
    };
    let additive = BlendDesc {
        source: BlendFactor::One,
        destination: BlendFactor::One,
        blend_factor: 1.0,
        ..alpha
    };

    Ok(BlendStates {
        disabled: BlendState::new(device, BlendDesc::disabled())?,
        alpha: BlendState::new(device, alpha)?,
        additive: BlendState::new(device, additive)?,
    })
}

fn sampler_desc(filter_min_mag: Filter, filter_mip: Filter, address_mode: AddressMode) -> SamplerDesc {
    SamplerDesc {
        filter_min: filter_min_mag,
        filter_mag: filter_min_mag,
        filter_mip,
        address_mode,
        ..SamplerDesc::default()
    }
}

fn anisotropic_sampler(
    device: &dyn RhiDevice,
    settings: &RhiSettings,
    render: Resolution,
    output: Resolution,
) -> Result<Arc<Sampler>, ResourceError> {
    let mip_lod_bias = mip_lod_bias(render, output);
    log::info!(
        "Anisotropic sampler: anisotropy {}, mip bias {:.3}",
        settings.anisotropy,
        mip_lod_bias
    );
    Sampler::new(
        device,
        SamplerDesc {
            anisotropy: settings.anisotropy,
            mip_lod_bias,
            ..sampler_desc(Filter::Linear, Filter::Linear, AddressMode::Wrap)
        },
    )
}

fn create_samplers(
    device: &dyn RhiDevice,
    settings: &RhiSettings,
    render: Resolution,
    output: Resolution,
) -> Result<[Arc<Sampler>; 7], ResourceError> {
    let comparison = if settings.reverse_z {
        ComparisonFunction::Greater
    } else {
        ComparisonFunction::Less
    };
    let compare_depth = SamplerDesc {
        comparison,
        comparison_enabled: true,
        ..sampler_desc(Filter::Linear, Filter::Nearest, AddressMode::Clamp)
    };

    Ok([
        Sampler::new(device, compare_depth)?,
        Sampler::new(device, sampler_desc(Filter::Nearest, Filter::Nearest, AddressMode::Clamp))?,
        Sampler::new(device, sampler_desc(Filter::Nearest, Filter::Nearest, AddressMode::Wrap))?,
        Sampler::new(device, sampler_desc(Filter::Linear, Filter::Nearest, AddressMode::Clamp))?,
        Sampler::new(device, sampler_desc(Filter::Linear, Filter::Nearest, AddressMode::Wrap))?,
        Sampler::new(device, sampler_desc(Filter::Linear, Filter::Linear, AddressMode::Clamp))?,
        anisotropic_sampler(device, settings, render, output)?,
    ])
}
