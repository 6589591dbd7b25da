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

//! Render pass bracketing, fixed-function state diffing and clears.

use super::CommandList;
use crate::rhi::clear::{ClearFlags, ClearValue, TextureClear};
use crate::rhi::common::{
    BackendHandle, PrimitiveTopology, Rectangle, ShaderStage, Viewport, MAX_RENDER_TARGETS,
};
use crate::rhi::error::RhiError;
use crate::rhi::pipeline_state::PipelineState;
use crate::rhi::resource::Texture;
use crate::rhi::traits::{BlendBinding, DepthStencilBinding, RenderTargetBinding, RhiCounter};
use std::sync::Arc;

/// Sample mask used for every blend state binding.
const SAMPLE_MASK_ALL: u32 = 0xffff_ffff;
/// Stencil reference used for every depth-stencil state binding.
const STENCIL_REFERENCE: u32 = 1;

impl CommandList {
    /// Starts a pass: validates `pipeline_state`, opens its time block, binds
    /// every fixed-function state that differs from what is bound, performs
    /// the requested clears and binds the global shader resources.
    ///
    /// An invalid pipeline state, or one whose targets lack the views the
    /// pass needs, is rejected before any device call. If binding the global
    /// resources fails the pass is closed again before the error is returned.
    pub fn begin_render_pass(&mut self, pipeline_state: &Arc<PipelineState>) -> Result<(), RhiError> {
        self.require_recording("begin_render_pass")?;
        if let Err(err) = pipeline_state.validate() {
            log::error!(
                "Invalid pipeline state for pass '{}': {err}",
                pipeline_state.name().unwrap_or("unnamed")
            );
            return Err(err.into());
        }
        let render_targets = self.resolve_render_targets(pipeline_state)?;

        if self.pipeline_state.is_some() {
            log::warn!(
                "Command list '{}' began a pass without ending the previous one",
                self.name
            );
            self.close_pass();
        }

        self.pipeline_state = Some(Arc::clone(pipeline_state));
        self.open_time_block(pipeline_state);

        self.apply_input_layout(pipeline_state);
        self.apply_shaders(pipeline_state);
        self.apply_blend_state(pipeline_state);
        self.apply_depth_stencil_state(pipeline_state);
        self.apply_rasterizer_state(pipeline_state);
        self.apply_primitive_topology(pipeline_state.primitive_topology);
        self.apply_render_targets(render_targets);

        if let Some(viewport) = pipeline_state.viewport.filter(Viewport::is_defined) {
            self.device_context.set_viewport(&viewport);
        }

        self.clear_pipeline_state_render_targets(pipeline_state);

        let global_resources = self
            .context
            .upgrade()
            .and_then(|ctx| ctx.global_shader_resources());
        if let Some(global_resources) = global_resources {
            if let Err(err) = global_resources.bind(self) {
                log::error!(
                    "Failed to bind global resources for pass '{}': {err}",
                    pipeline_state.name().unwrap_or("unnamed")
                );
                self.close_pass();
                return Err(err);
            }
        }

        self.count(RhiCounter::Pipeline);
        Ok(())
    }

    /// Ends the active pass. Only the time block is closed; bound state stays.
    pub fn end_render_pass(&mut self) -> Result<(), RhiError> {
        self.require_recording("end_render_pass")?;
        if self.pipeline_state.is_none() {
            log::error!("Command list '{}' has no pass to end", self.name);
            return Err(RhiError::NoActivePass);
        }
        self.close_pass();
        Ok(())
    }

    pub(super) fn close_pass(&mut self) {
        self.close_time_block();
        self.pipeline_state = None;
    }

    /// Sets the viewport.
    pub fn set_viewport(&mut self, viewport: &Viewport) -> Result<(), RhiError> {
        self.require_recording("set_viewport")?;
        self.device_context.set_viewport(viewport);
        Ok(())
    }

    /// Sets the scissor rectangle.
    pub fn set_scissor_rectangle(&mut self, rectangle: &Rectangle) -> Result<(), RhiError> {
        self.require_recording("set_scissor_rectangle")?;
        self.device_context.set_scissor(rectangle);
        Ok(())
    }

    fn apply_input_layout(&mut self, pipeline_state: &PipelineState) {
        let requested = pipeline_state
            .shader_vertex
            .as_ref()
            .and_then(|shader| shader.input_layout())
            .map(|layout| layout.handle());
        let current = if self.is_live() {
            self.device_context.input_layout()
        } else {
            self.bound.input_layout
        };
        if current != requested {
            log::trace!("Binding input layout {requested:?}");
            self.device_context.set_input_layout(requested);
        }
        self.bound.input_layout = requested;
    }

    fn apply_shaders(&mut self, pipeline_state: &PipelineState) {
        let stages = [
            (ShaderStage::Vertex, &pipeline_state.shader_vertex, RhiCounter::ShaderVertex),
            (ShaderStage::Pixel, &pipeline_state.shader_pixel, RhiCounter::ShaderPixel),
            (ShaderStage::Compute, &pipeline_state.shader_compute, RhiCounter::ShaderCompute),
        ];
        for (stage, shader, counter) in stages {
            let requested = shader.as_ref().map(|s| s.handle());
            let current = if self.is_live() {
                self.device_context.shader(stage)
            } else {
                self.bound.shader(stage)
            };
            if current != requested {
                self.device_context.set_shader(stage, requested);
                self.count(counter);
            }
            self.bound.shaders[stage.index()] = requested;
        }
    }

    fn apply_blend_state(&mut self, pipeline_state: &PipelineState) {
        let factor = pipeline_state
            .blend_state
            .as_ref()
            .map_or(0.0, |state| state.blend_factor());
        let requested = BlendBinding {
            state: pipeline_state.blend_state.as_ref().map(|s| s.handle()),
            factor: [factor; 4],
            sample_mask: SAMPLE_MASK_ALL,
        };
        let current = if self.is_live() {
            self.device_context.blend_state()
        } else {
            self.bound.blend
        };
        if current != requested {
            log::trace!("Binding blend state {:?}", requested.state);
            self.device_context.set_blend_state(requested);
        }
        self.bound.blend = requested;
    }

    fn apply_depth_stencil_state(&mut self, pipeline_state: &PipelineState) {
        let requested = pipeline_state.depth_stencil_state.as_ref().map(|s| s.handle());
        let current = if self.is_live() {
            self.device_context.depth_stencil_state().state
        } else {
            self.bound.depth_stencil.state
        };
        let binding = DepthStencilBinding {
            state: requested,
            stencil_ref: STENCIL_REFERENCE,
        };
        if current != requested {
            log::trace!("Binding depth-stencil state {requested:?}");
            self.device_context.set_depth_stencil_state(binding);
            self.bound.depth_stencil = binding;
        } else {
            self.bound.depth_stencil.state = requested;
        }
    }

    fn apply_rasterizer_state(&mut self, pipeline_state: &PipelineState) {
        let requested = pipeline_state.rasterizer_state.as_ref().map(|s| s.handle());
        let current = if self.is_live() {
            self.device_context.rasterizer_state()
        } else {
            self.bound.rasterizer
        };
        if current != requested {
            log::trace!("Binding rasterizer state {requested:?}");
            self.device_context.set_rasterizer_state(requested);
        }
        self.bound.rasterizer = requested;
    }

    fn apply_primitive_topology(&mut self, requested: PrimitiveTopology) {
        if requested == PrimitiveTopology::Unknown {
            return;
        }
        let current = if self.is_live() {
            self.device_context.primitive_topology()
        } else {
            self.bound.primitive_topology
        };
        if current != requested {
            log::trace!("Setting primitive topology {requested:?}");
            self.device_context.set_primitive_topology(requested);
        }
        self.bound.primitive_topology = requested;
    }

    fn apply_render_targets(&mut self, requested: RenderTargetBinding) {
        let current = if self.is_live() {
            self.device_context.render_targets()
        } else {
            self.bound.render_targets
        };
        if current != requested {
            self.device_context.set_render_targets(&requested);
            self.count(RhiCounter::RenderTarget);
        }
        self.bound.render_targets = requested;
    }

    fn resolve_render_targets(
        &self,
        pipeline_state: &PipelineState,
    ) -> Result<RenderTargetBinding, RhiError> {
        let mut binding = RenderTargetBinding::default();

        if let Some(depth) = &pipeline_state.render_target_depth_texture {
            let slice = pipeline_state.render_target_depth_stencil_texture_array_index;
            let read_only = pipeline_state.render_target_depth_texture_read_only;
            binding.depth_stencil = depth.depth_stencil_view(slice, read_only);
            if binding.depth_stencil.is_none() {
                return Err(self.precondition(format!(
                    "texture '{}' has no {}depth-stencil view for slice {slice}",
                    depth.name(),
                    if read_only { "read-only " } else { "" }
                )));
            }
        }

        if let Some(swap_chain) = &pipeline_state.render_target_swapchain {
            binding.color[0] = swap_chain.back_buffer_view();
            return Ok(binding);
        }

        let slice = pipeline_state.render_target_color_texture_array_index;
        for (i, texture) in pipeline_state.render_target_color_textures.iter().enumerate() {
            let Some(texture) = texture else { continue };
            binding.color[i] = texture.render_target_view(slice);
            if binding.color[i].is_none() {
                return Err(self.precondition(format!(
                    "texture '{}' has no render-target view for slice {slice}",
                    texture.name()
                )));
            }
        }
        Ok(binding)
    }

    fn clear_pipeline_state_render_targets(&mut self, pipeline_state: &PipelineState) {
        if let Some(swap_chain) = &pipeline_state.render_target_swapchain {
            if let (Some(color), Some(view)) =
                (pipeline_state.clear_color[0].value(), swap_chain.back_buffer_view())
            {
                self.device_context
                    .clear_render_target_view(view, color.to_array());
            }
        } else {
            let slice = pipeline_state.render_target_color_texture_array_index;
            for i in 0..MAX_RENDER_TARGETS {
                let Some(color) = pipeline_state.clear_color[i].value() else {
                    continue;
                };
                let view = pipeline_state.render_target_color_textures[i]
                    .as_ref()
                    .and_then(|texture| texture.render_target_view(slice));
                if let Some(view) = view {
                    self.device_context
                        .clear_render_target_view(view, color.to_array());
                }
            }
        }

        if let Some(depth) = &pipeline_state.render_target_depth_texture {
            let slice = pipeline_state.render_target_depth_stencil_texture_array_index;
            self.clear_depth_stencil(
                depth,
                slice,
                &pipeline_state.clear_depth,
                &pipeline_state.clear_stencil,
            );
        }
    }

    fn clear_depth_stencil(
        &mut self,
        texture: &Texture,
        slice: u32,
        depth: &ClearValue<f32>,
        stencil: &ClearValue<u32>,
    ) {
        let flags = ClearFlags::from_values(depth, stencil);
        if flags.is_empty() {
            return;
        }
        if let Some(view) = texture.depth_stencil_view(slice, false) {
            self.device_context.clear_depth_stencil_view(
                view,
                flags,
                depth.value().unwrap_or(0.0),
                stencil.value().unwrap_or(0),
            );
        }
    }

    /// Clears a texture outside of a pass.
    ///
    /// Storage clears only accept an explicit color and also clear every
    /// per-mip storage view. Render-target clears pick the color or the
    /// depth-stencil view from the texture format.
    pub fn clear_texture(&mut self, texture: &Texture, clear: &TextureClear) -> Result<(), RhiError> {
        self.require_recording("clear_texture")?;
        if !texture.is_backed() {
            return Err(self.precondition(format!("texture '{}' is not backed", texture.name())));
        }

        if clear.storage {
            let Some(color) = clear.color.value() else {
                return Ok(());
            };
            let view = texture.storage_view().ok_or_else(|| {
                self.precondition(format!("texture '{}' has no storage view", texture.name()))
            })?;
            self.device_context
                .clear_storage_view_float(view, color.to_array());
            if texture.has_per_mip_view() {
                let mip_views: Vec<BackendHandle> = (0..texture.mip_count())
                    .filter_map(|mip| texture.storage_view_mip(mip))
                    .collect();
                for view in mip_views {
                    self.device_context
                        .clear_storage_view_float(view, color.to_array());
                }
            }
            return Ok(());
        }

        if texture.format().is_color() {
            let Some(color) = clear.color.value() else {
                return Ok(());
            };
            let view = texture.render_target_view(clear.color_index).ok_or_else(|| {
                self.precondition(format!(
                    "texture '{}' has no render-target view for slice {}",
                    texture.name(),
                    clear.color_index
                ))
            })?;
            self.device_context
                .clear_render_target_view(view, color.to_array());
        } else if texture.format().is_depth_stencil() {
            let flags = ClearFlags::from_values(&clear.depth, &clear.stencil);
            if !flags.is_empty()
                && texture
                    .depth_stencil_view(clear.depth_stencil_index, false)
                    .is_none()
            {
                return Err(self.precondition(format!(
                    "texture '{}' has no depth-stencil view for slice {}",
                    texture.name(),
                    clear.depth_stencil_index
                )));
            }
            self.clear_depth_stencil(
                texture,
                clear.depth_stencil_index,
                &clear.depth,
                &clear.stencil,
            );
        }
        Ok(())
    }
}
