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

//! The command list's record of what it has bound to the device.

use crate::rhi::common::{
    BackendHandle, PrimitiveTopology, ResourceId, ShaderStage, MAX_CONSTANT_BUFFER_SLOTS,
    MAX_SAMPLED_SLOTS, MAX_SAMPLER_SLOTS, MAX_STORAGE_SLOTS, MAX_VERTEX_BUFFER_SLOTS,
};
use crate::rhi::traits::{
    BlendBinding, DepthStencilBinding, IndexBufferBinding, RenderTargetBinding,
    VertexBufferBinding,
};

/// A storage view bound to a compute slot, with the resource it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageBinding {
    /// The view.
    pub view: BackendHandle,
    /// The texture or buffer the view belongs to.
    pub resource: ResourceId,
}

/// A snapshot of every slot the command list has set.
///
/// Capacities are the hardware-derived slot counts; indices outside them are
/// rejected by the command list before they reach the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundState {
    /// Input layout.
    pub input_layout: Option<BackendHandle>,
    /// Shader per stage, indexed by [`ShaderStage::index`].
    pub shaders: [Option<BackendHandle>; 3],
    /// Blend state with factor and mask.
    pub blend: BlendBinding,
    /// Depth-stencil state with stencil reference.
    pub depth_stencil: DepthStencilBinding,
    /// Rasterizer state.
    pub rasterizer: Option<BackendHandle>,
    /// Primitive topology.
    pub primitive_topology: PrimitiveTopology,
    /// Color and depth-stencil views.
    pub render_targets: RenderTargetBinding,
    /// Vertex buffer per input slot.
    pub vertex_buffers: [VertexBufferBinding; MAX_VERTEX_BUFFER_SLOTS],
    /// Index buffer.
    pub index_buffer: IndexBufferBinding,
    /// Constant buffers per stage and slot.
    pub constant_buffers: [[Option<BackendHandle>; MAX_CONSTANT_BUFFER_SLOTS]; 3],
    /// Samplers per stage and slot.
    pub samplers: [[Option<BackendHandle>; MAX_SAMPLER_SLOTS]; 3],
    /// Sampled views per stage and slot.
    pub sampled_views: [[Option<BackendHandle>; MAX_SAMPLED_SLOTS]; 3],
    /// Compute storage views.
    pub storage_views: [Option<StorageBinding>; MAX_STORAGE_SLOTS],
}

impl Default for BoundState {
    fn default() -> Self {
        Self {
            input_layout: None,
            shaders: [None; 3],
            blend: BlendBinding::default(),
            depth_stencil: DepthStencilBinding::default(),
            rasterizer: None,
            primitive_topology: PrimitiveTopology::Unknown,
            render_targets: RenderTargetBinding::default(),
            vertex_buffers: [VertexBufferBinding::default(); MAX_VERTEX_BUFFER_SLOTS],
            index_buffer: IndexBufferBinding::default(),
            constant_buffers: [[None; MAX_CONSTANT_BUFFER_SLOTS]; 3],
            samplers: [[None; MAX_SAMPLER_SLOTS]; 3],
            sampled_views: [[None; MAX_SAMPLED_SLOTS]; 3],
            storage_views: [None; MAX_STORAGE_SLOTS],
        }
    }
}

impl BoundState {
    /// Forgets everything.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Shader bound to `stage`.
    pub fn shader(&self, stage: ShaderStage) -> Option<BackendHandle> {
        self.shaders[stage.index()]
    }

    /// Sampled view of `stage` at `slot`, `None` when out of range.
    pub fn sampled_view(&self, stage: ShaderStage, slot: usize) -> Option<BackendHandle> {
        self.sampled_views[stage.index()].get(slot).copied().flatten()
    }

    /// Storage view at `slot`, `None` when out of range.
    pub fn storage_view(&self, slot: usize) -> Option<BackendHandle> {
        self.storage_views
            .get(slot)
            .copied()
            .flatten()
            .map(|binding| binding.view)
    }

    /// `true` if any view of `resource` is bound for storage access.
    pub fn is_storage_bound(&self, resource: ResourceId) -> bool {
        self.storage_views
            .iter()
            .flatten()
            .any(|binding| binding.resource == resource)
    }

    /// Slots that currently hold a storage view.
    pub fn occupied_storage_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.storage_views
            .iter()
            .enumerate()
            .filter_map(|(slot, binding)| binding.map(|_| slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(raw: u64) -> BackendHandle {
        BackendHandle::new(raw).unwrap()
    }

    #[test]
    fn storage_tracking() {
        let mut state = BoundState::default();
        let texture = ResourceId::next();
        state.storage_views[3] = Some(StorageBinding {
            view: handle(9),
            resource: texture,
        });
        assert!(state.is_storage_bound(texture));
        assert!(!state.is_storage_bound(ResourceId::next()));
        assert_eq!(state.occupied_storage_slots().collect::<Vec<_>>(), vec![3]);
        assert_eq!(state.storage_view(3), Some(handle(9)));
        assert_eq!(state.storage_view(99), None);
    }

    #[test]
    fn reset_empties_everything() {
        let mut state = BoundState::default();
        state.shaders[ShaderStage::Pixel.index()] = Some(handle(1));
        state.sampled_views[0][5] = Some(handle(2));
        state.primitive_topology = PrimitiveTopology::TriangleList;
        state.reset();
        assert_eq!(state, BoundState::default());
        assert_eq!(state.shader(ShaderStage::Pixel), None);
    }
}
