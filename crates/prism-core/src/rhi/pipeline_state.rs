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

//! The complete description of GPU state for one render pass.

use crate::rhi::clear::ClearValue;
use crate::rhi::common::{Color, PrimitiveTopology, Viewport, MAX_RENDER_TARGETS};
use crate::rhi::error::PipelineStateError;
use crate::rhi::resource::{
    BlendState, DepthStencilState, RasterizerState, Shader, SwapChain, Texture,
};
use std::sync::Arc;

/// Shaders, fixed-function state, render targets, clears and pass metadata.
///
/// Built by the renderer for each pass (or cached across frames) and handed to
/// `begin_render_pass` as an `Arc`; the command list keeps a reference for the
/// duration of the pass.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    /// Vertex shader. Its input layout is bound with it.
    pub shader_vertex: Option<Arc<Shader>>,
    /// Pixel shader.
    pub shader_pixel: Option<Arc<Shader>>,
    /// Compute shader. Excludes every graphics field.
    pub shader_compute: Option<Arc<Shader>>,
    /// Blend state.
    pub blend_state: Option<Arc<BlendState>>,
    /// Depth-stencil state.
    pub depth_stencil_state: Option<Arc<DepthStencilState>>,
    /// Rasterizer state.
    pub rasterizer_state: Option<Arc<RasterizerState>>,
    /// Primitive topology. `Unknown` leaves the device value untouched.
    pub primitive_topology: PrimitiveTopology,
    /// Color targets.
    pub render_target_color_textures: [Option<Arc<Texture>>; MAX_RENDER_TARGETS],
    /// Array slice used for every color target.
    pub render_target_color_texture_array_index: u32,
    /// Depth target.
    pub render_target_depth_texture: Option<Arc<Texture>>,
    /// Array slice used for the depth target.
    pub render_target_depth_stencil_texture_array_index: u32,
    /// Bind the read-only depth-stencil view instead of the read-write one.
    pub render_target_depth_texture_read_only: bool,
    /// Render into the swapchain's current back buffer instead of textures.
    pub render_target_swapchain: Option<Arc<SwapChain>>,
    /// Clear policy per color target. With a swapchain only slot zero is used.
    pub clear_color: [ClearValue<Color>; MAX_RENDER_TARGETS],
    /// Depth clear policy.
    pub clear_depth: ClearValue<f32>,
    /// Stencil clear policy.
    pub clear_stencil: ClearValue<u32>,
    /// Viewport applied at the start of the pass, if any.
    pub viewport: Option<Viewport>,
    /// Name used for time blocks and markers. `None` suppresses both.
    pub pass_name: Option<String>,
    /// Measure this pass when profiling is enabled.
    pub profile: bool,
    /// Annotate this pass when markers are enabled.
    pub mark: bool,
}

impl PipelineState {
    /// An empty graphics pipeline state with profiling and markers on.
    pub fn graphics(pass_name: &str) -> Self {
        Self {
            pass_name: Some(pass_name.to_owned()),
            profile: true,
            mark: true,
            ..Default::default()
        }
    }

    /// A compute pipeline state.
    pub fn compute(pass_name: &str, shader: Arc<Shader>) -> Self {
        Self {
            shader_compute: Some(shader),
            pass_name: Some(pass_name.to_owned()),
            profile: true,
            mark: true,
            ..Default::default()
        }
    }

    /// `true` when the state describes a compute dispatch.
    pub fn is_compute(&self) -> bool {
        self.shader_compute.is_some()
    }

    /// `true` if any color texture target is set.
    pub fn has_color_textures(&self) -> bool {
        self.render_target_color_textures.iter().any(Option::is_some)
    }

    /// `true` if any color or depth texture target is set.
    pub fn has_texture_targets(&self) -> bool {
        self.has_color_textures() || self.render_target_depth_texture.is_some()
    }

    /// Checks the field combinations `begin_render_pass` relies on.
    pub fn validate(&self) -> Result<(), PipelineStateError> {
        if self.is_compute() {
            if self.shader_vertex.is_some() || self.shader_pixel.is_some() {
                return Err(PipelineStateError::ComputeWithGraphicsShader);
            }
            if self.has_texture_targets() || self.render_target_swapchain.is_some() {
                return Err(PipelineStateError::ComputeWithRenderTargets);
            }
            return Ok(());
        }

        if self.shader_vertex.is_none() && self.shader_pixel.is_none() {
            return Err(PipelineStateError::MissingShader);
        }
        if self.blend_state.is_none() {
            return Err(PipelineStateError::MissingBlendState);
        }
        if self.depth_stencil_state.is_none() {
            return Err(PipelineStateError::MissingDepthStencilState);
        }
        if self.rasterizer_state.is_none() {
            return Err(PipelineStateError::MissingRasterizerState);
        }
        if self.primitive_topology == PrimitiveTopology::Unknown {
            return Err(PipelineStateError::UnknownTopology);
        }
        // A depth target may accompany either color source, or stand alone.
        let swapchain = self.render_target_swapchain.is_some();
        if swapchain && self.has_color_textures() {
            return Err(PipelineStateError::ConflictingRenderTargets);
        }
        if !swapchain && !self.has_texture_targets() {
            return Err(PipelineStateError::MissingRenderTargets);
        }
        Ok(())
    }

    /// Shorthand for `validate().is_ok()`.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// The pass name, if it is set and not empty.
    pub fn name(&self) -> Option<&str> {
        self.pass_name.as_deref().filter(|name| !name.is_empty())
    }
}
