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

//! The per-command-list half of a graphics backend.

use crate::rhi::clear::ClearFlags;
use crate::rhi::common::{
    BackendHandle, Format, PrimitiveTopology, Rectangle, ShaderStage, StateQueryMode, Viewport,
    MAX_RENDER_TARGETS,
};
use crate::rhi::error::{QueryError, ResourceError};
use crate::rhi::query::QueryData;
use std::any::Any;

/// The bound blend state with its dynamic parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BlendBinding {
    /// The state object.
    pub state: Option<BackendHandle>,
    /// Constant blend factor per channel.
    pub factor: [f32; 4],
    /// Sample coverage mask.
    pub sample_mask: u32,
}

/// The bound depth-stencil state with its stencil reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DepthStencilBinding {
    /// The state object.
    pub state: Option<BackendHandle>,
    /// Stencil reference value.
    pub stencil_ref: u32,
}

/// The bound output-merger targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderTargetBinding {
    /// Color render-target views.
    pub color: [Option<BackendHandle>; MAX_RENDER_TARGETS],
    /// Depth-stencil view.
    pub depth_stencil: Option<BackendHandle>,
}

/// The bound vertex buffer of one input slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VertexBufferBinding {
    /// The buffer.
    pub buffer: Option<BackendHandle>,
    /// Vertex stride in bytes.
    pub stride: u32,
    /// Offset in bytes.
    pub offset: u32,
}

/// The bound index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBufferBinding {
    /// The buffer.
    pub buffer: Option<BackendHandle>,
    /// Index format.
    pub format: Format,
    /// Offset in bytes.
    pub offset: u32,
}

impl Default for IndexBufferBinding {
    fn default() -> Self {
        Self {
            buffer: None,
            format: Format::R32Uint,
            offset: 0,
        }
    }
}

/// A recording context, exclusively owned by one command list.
///
/// Every piece of state comes as a getter and a setter. The getters report what
/// the device has bound right now; setters are only called by the command list
/// when the value actually changes.
pub trait RhiDeviceContext: Send {
    /// Whether the getters reflect live device state or nothing useful.
    fn state_query_mode(&self) -> StateQueryMode;

    /// Currently bound input layout.
    fn input_layout(&self) -> Option<BackendHandle>;
    /// Binds an input layout.
    fn set_input_layout(&mut self, layout: Option<BackendHandle>);

    /// Current primitive topology.
    fn primitive_topology(&self) -> PrimitiveTopology;
    /// Sets the primitive topology.
    fn set_primitive_topology(&mut self, topology: PrimitiveTopology);

    /// Shader bound to `stage`.
    fn shader(&self, stage: ShaderStage) -> Option<BackendHandle>;
    /// Binds a shader to `stage`.
    fn set_shader(&mut self, stage: ShaderStage, shader: Option<BackendHandle>);

    /// Current blend state.
    fn blend_state(&self) -> BlendBinding;
    /// Binds a blend state.
    fn set_blend_state(&mut self, binding: BlendBinding);

    /// Current depth-stencil state.
    fn depth_stencil_state(&self) -> DepthStencilBinding;
    /// Binds a depth-stencil state.
    fn set_depth_stencil_state(&mut self, binding: DepthStencilBinding);

    /// Current rasterizer state.
    fn rasterizer_state(&self) -> Option<BackendHandle>;
    /// Binds a rasterizer state.
    fn set_rasterizer_state(&mut self, state: Option<BackendHandle>);

    /// Current render targets.
    fn render_targets(&self) -> RenderTargetBinding;
    /// Binds render targets.
    fn set_render_targets(&mut self, targets: &RenderTargetBinding);

    /// Vertex buffer of input `slot`.
    fn vertex_buffer(&self, slot: u32) -> VertexBufferBinding;
    /// Binds a vertex buffer to input `slot`.
    fn set_vertex_buffer(&mut self, slot: u32, binding: VertexBufferBinding);

    /// Current index buffer.
    fn index_buffer(&self) -> IndexBufferBinding;
    /// Binds an index buffer.
    fn set_index_buffer(&mut self, binding: IndexBufferBinding);

    /// Constant buffer of `stage` at `slot`.
    fn constant_buffer(&self, stage: ShaderStage, slot: u32) -> Option<BackendHandle>;
    /// Binds a constant buffer.
    fn set_constant_buffer(&mut self, stage: ShaderStage, slot: u32, buffer: Option<BackendHandle>);

    /// Sampler of `stage` at `slot`.
    fn sampler(&self, stage: ShaderStage, slot: u32) -> Option<BackendHandle>;
    /// Binds a sampler.
    fn set_sampler(&mut self, stage: ShaderStage, slot: u32, sampler: Option<BackendHandle>);

    /// Sampled view of `stage` at `slot`.
    fn sampled_view(&self, stage: ShaderStage, slot: u32) -> Option<BackendHandle>;
    /// Binds consecutive sampled views starting at `start_slot`.
    fn set_sampled_views(
        &mut self,
        stage: ShaderStage,
        start_slot: u32,
        views: &[Option<BackendHandle>],
    );

    /// Compute storage view at `slot`.
    fn storage_view(&self, slot: u32) -> Option<BackendHandle>;
    /// Binds consecutive compute storage views starting at `start_slot`.
    fn set_storage_views(&mut self, start_slot: u32, views: &[Option<BackendHandle>]);

    /// Sets the viewport.
    fn set_viewport(&mut self, viewport: &Viewport);
    /// Sets the scissor rectangle.
    fn set_scissor(&mut self, rectangle: &Rectangle);

    /// Clears a color render-target view.
    fn clear_render_target_view(&mut self, view: BackendHandle, color: [f32; 4]);
    /// Clears the aspects in `flags` of a depth-stencil view.
    fn clear_depth_stencil_view(
        &mut self,
        view: BackendHandle,
        flags: ClearFlags,
        depth: f32,
        stencil: u32,
    );
    /// Clears a storage view with float values.
    fn clear_storage_view_float(&mut self, view: BackendHandle, color: [f32; 4]);

    /// Non-indexed draw.
    fn draw(&mut self, vertex_count: u32, vertex_offset: u32);
    /// Indexed draw.
    fn draw_indexed(&mut self, index_count: u32, index_offset: u32, vertex_offset: i32);
    /// Compute dispatch.
    fn dispatch(&mut self, x: u32, y: u32, z: u32);
    /// Copies one whole resource into another of identical shape.
    fn copy_resource(&mut self, destination: BackendHandle, source: BackendHandle);
    /// Overwrites the start of a buffer.
    fn update_buffer(&mut self, buffer: BackendHandle, data: &[u8]) -> Result<(), ResourceError>;

    /// Begins a query. Only disjoint queries have a begin.
    fn begin_query(&mut self, query: BackendHandle);
    /// Ends a query, which for timestamps captures the current GPU tick.
    fn end_query(&mut self, query: BackendHandle);
    /// Reads a query result, `Ok(None)` while it is not available yet.
    fn query_data(&mut self, query: BackendHandle) -> Result<Option<QueryData>, QueryError>;

    /// Opens a named debug annotation for GPU debugging tools.
    fn begin_event(&mut self, name: &str);
    /// Closes the innermost debug annotation.
    fn end_event(&mut self);

    /// Submits the recorded work, waiting on `wait` before execution starts.
    fn submit(&mut self, wait: Option<BackendHandle>) -> Result<(), ResourceError>;
    /// Presents a swapchain.
    fn present(&mut self, swap_chain: BackendHandle) -> Result<(), ResourceError>;

    /// Allows downcasting to a concrete backend.
    fn as_any(&self) -> &dyn Any;
    /// Allows mutable downcasting to a concrete backend.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
