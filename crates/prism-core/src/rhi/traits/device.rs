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

use crate::rhi::common::BackendHandle;
use crate::rhi::error::{QueryError, ResourceError};
use crate::rhi::query::QueryKind;
use crate::rhi::resource::{
    BlendDesc, BufferDesc, DepthStencilDesc, InputLayoutDesc, OwnedHandle, RasterizerDesc,
    SamplerDesc, ShaderDesc, SwapChainAllocation, SwapChainDesc, TextureAllocation, TextureDesc,
};
use crate::rhi::traits::RhiDeviceContext;
use std::any::Any;

/// Frees backend objects when the last owner of a resource lets go of it.
pub trait ResourceReleaser: Send + Sync {
    /// Destroys the backend object behind `handle`.
    fn release(&self, handle: BackendHandle);
}

/// Video memory figures reported by an adapter, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VideoMemoryInfo {
    /// Memory currently in use by this process.
    pub used: u64,
    /// Memory budget the OS grants this process.
    pub budget: u64,
}

/// The shared, thread-safe half of a graphics backend.
///
/// A device creates resources and per-command-list contexts. It is shared by
/// every command list through the [`RhiContext`](crate::rhi::context::RhiContext).
pub trait RhiDevice: Send + Sync {
    /// A human readable name of the adapter.
    fn adapter_name(&self) -> String;

    /// Creates a buffer.
    fn create_buffer(&self, desc: &BufferDesc) -> Result<OwnedHandle, ResourceError>;

    /// Creates a texture with the views its flags ask for.
    fn create_texture(&self, desc: &TextureDesc) -> Result<TextureAllocation, ResourceError>;

    /// Creates a sampler.
    fn create_sampler(&self, desc: &SamplerDesc) -> Result<OwnedHandle, ResourceError>;

    /// Creates a blend state.
    fn create_blend_state(&self, desc: &BlendDesc) -> Result<OwnedHandle, ResourceError>;

    /// Creates a depth-stencil state.
    fn create_depth_stencil_state(
        &self,
        desc: &DepthStencilDesc,
    ) -> Result<OwnedHandle, ResourceError>;

    /// Creates a rasterizer state.
    fn create_rasterizer_state(&self, desc: &RasterizerDesc)
        -> Result<OwnedHandle, ResourceError>;

    /// Creates a vertex input layout.
    fn create_input_layout(&self, desc: &InputLayoutDesc) -> Result<OwnedHandle, ResourceError>;

    /// Creates a shader object from already compiled code.
    fn create_shader(&self, desc: &ShaderDesc) -> Result<OwnedHandle, ResourceError>;

    /// Creates a swapchain with its back buffers.
    fn create_swap_chain(&self, desc: &SwapChainDesc)
        -> Result<SwapChainAllocation, ResourceError>;

    /// Creates a GPU semaphore.
    fn create_semaphore(&self) -> Result<OwnedHandle, ResourceError>;

    /// Creates a recording context for a new command list.
    fn create_context(&self) -> Result<Box<dyn RhiDeviceContext>, ResourceError>;

    /// Creates a GPU query object.
    fn create_query(&self, kind: QueryKind) -> Result<BackendHandle, QueryError>;

    /// Destroys a GPU query object.
    fn release_query(&self, handle: BackendHandle);

    /// Reports video memory usage of the primary adapter.
    fn query_video_memory(&self) -> Result<VideoMemoryInfo, QueryError>;

    /// Allows downcasting to a concrete backend.
    fn as_any(&self) -> &dyn Any;
}
