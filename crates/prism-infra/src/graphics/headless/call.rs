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

use prism_core::rhi::clear::ClearFlags;
use prism_core::rhi::common::{BackendHandle, PrimitiveTopology, Rectangle, ShaderStage, Viewport};
use prism_core::rhi::traits::{
    BlendBinding, DepthStencilBinding, IndexBufferBinding, RenderTargetBinding,
    VertexBufferBinding,
};

/// One call received by a [`HeadlessContext`](super::HeadlessContext).
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    /// Input layout bound.
    SetInputLayout(Option<BackendHandle>),
    /// Primitive topology set.
    SetPrimitiveTopology(PrimitiveTopology),
    /// Shader bound to a stage.
    SetShader {
        /// The stage.
        stage: ShaderStage,
        /// The shader, `None` to unbind.
        shader: Option<BackendHandle>,
    },
    /// Blend state bound.
    SetBlendState(BlendBinding),
    /// Depth-stencil state bound.
    SetDepthStencilState(DepthStencilBinding),
    /// Rasterizer state bound.
    SetRasterizerState(Option<BackendHandle>),
    /// Render targets bound.
    SetRenderTargets(RenderTargetBinding),
    /// Vertex buffer bound.
    SetVertexBuffer {
        /// Input slot.
        slot: u32,
        /// The binding.
        binding: VertexBufferBinding,
    },
    /// Index buffer bound.
    SetIndexBuffer(IndexBufferBinding),
    /// Constant buffer bound.
    SetConstantBuffer {
        /// The stage.
        stage: ShaderStage,
        /// The slot.
        slot: u32,
        /// The buffer, `None` to unbind.
        buffer: Option<BackendHandle>,
    },
    /// Sampler bound.
    SetSampler {
        /// The stage.
        stage: ShaderStage,
        /// The slot.
        slot: u32,
        /// The sampler, `None` to unbind.
        sampler: Option<BackendHandle>,
    },
    /// Sampled views bound to consecutive slots.
    SetSampledViews {
        /// The stage.
        stage: ShaderStage,
        /// First slot.
        start_slot: u32,
        /// One entry per slot.
        views: Vec<Option<BackendHandle>>,
    },
    /// Storage views bound to consecutive compute slots.
    SetStorageViews {
        /// First slot.
        start_slot: u32,
        /// One entry per slot.
        views: Vec<Option<BackendHandle>>,
    },
    /// Viewport set.
    SetViewport(Viewport),
    /// Scissor rectangle set.
    SetScissor(Rectangle),
    /// Color render-target view cleared.
    ClearRenderTarget {
        /// The view.
        view: BackendHandle,
        /// RGBA clear color.
        color: [f32; 4],
    },
    /// Depth-stencil view cleared.
    ClearDepthStencil {
        /// The view.
        view: BackendHandle,
        /// Aspects cleared.
        flags: ClearFlags,
        /// Depth value.
        depth: f32,
        /// Stencil value.
        stencil: u32,
    },
    /// Storage view cleared with a float color.
    ClearStorage {
        /// The view.
        view: BackendHandle,
        /// RGBA clear color.
        color: [f32; 4],
    },
    /// Non-indexed draw.
    Draw {
        /// Vertices drawn.
        vertex_count: u32,
        /// First vertex.
        vertex_offset: u32,
    },
    /// Indexed draw.
    DrawIndexed {
        /// Indices drawn.
        index_count: u32,
        /// First index.
        index_offset: u32,
        /// Added to every index.
        vertex_offset: i32,
    },
    /// Compute dispatch.
    Dispatch {
        /// Groups along x.
        x: u32,
        /// Groups along y.
        y: u32,
        /// Groups along z.
        z: u32,
    },
    /// Whole-resource copy.
    CopyResource {
        /// Written resource.
        destination: BackendHandle,
        /// Read resource.
        source: BackendHandle,
    },
    /// Buffer contents replaced.
    UpdateBuffer {
        /// The buffer.
        buffer: BackendHandle,
        /// Bytes written.
        size: usize,
    },
    /// Query begun.
    BeginQuery(BackendHandle),
    /// Query ended.
    EndQuery(BackendHandle),
    /// Debug marker opened.
    BeginEvent(String),
    /// Debug marker closed.
    EndEvent,
    /// Recorded work submitted.
    Submit {
        /// Semaphore waited on first.
        wait: Option<BackendHandle>,
    },
    /// Swapchain presented.
    Present(BackendHandle),
}

impl DeviceCall {
    /// `true` for calls that change pipeline or binding state.
    pub fn is_state_change(&self) -> bool {
        matches!(
            self,
            DeviceCall::SetInputLayout(_)
                | DeviceCall::SetPrimitiveTopology(_)
                | DeviceCall::SetShader { .. }
                | DeviceCall::SetBlendState(_)
                | DeviceCall::SetDepthStencilState(_)
                | DeviceCall::SetRasterizerState(_)
                | DeviceCall::SetRenderTargets(_)
                | DeviceCall::SetVertexBuffer { .. }
                | DeviceCall::SetIndexBuffer(_)
                | DeviceCall::SetConstantBuffer { .. }
                | DeviceCall::SetSampler { .. }
                | DeviceCall::SetSampledViews { .. }
                | DeviceCall::SetStorageViews { .. }
        )
    }

    /// `true` for clears.
    pub fn is_clear(&self) -> bool {
        matches!(
            self,
            DeviceCall::ClearRenderTarget { .. }
                | DeviceCall::ClearDepthStencil { .. }
                | DeviceCall::ClearStorage { .. }
        )
    }
}
