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

//! Per-slot resource binding with dirty checks.

use super::CommandList;
use crate::rhi::bound_state::StorageBinding;
use crate::rhi::common::{
    BackendHandle, ResourceId, ShaderScope, ShaderStage, MAX_CONSTANT_BUFFER_SLOTS,
    MAX_SAMPLED_SLOTS, MAX_SAMPLER_SLOTS, MAX_STORAGE_SLOTS, MAX_TEXTURE_VIEWS,
    MAX_VERTEX_BUFFER_SLOTS,
};
use crate::rhi::error::RhiError;
use crate::rhi::resource::{
    ConstantBuffer, IndexBuffer, Sampler, StructuredBuffer, Texture, VertexBuffer,
};
use crate::rhi::traits::{IndexBufferBinding, RhiCounter, VertexBufferBinding};

/// How a shader accesses a bound texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureAccess {
    /// Read-only, through a sampled view.
    #[default]
    Sampled,
    /// Read-write, through a storage view. Compute stage only.
    Storage,
}

/// Which views of a texture `set_texture` binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureBinding {
    /// A single mip, or the whole chain when `None`.
    pub mip: Option<u32>,
    /// Bind one view per mip from `mip` (or zero) to the last, in consecutive slots.
    pub ranged: bool,
    /// Sampled or storage access.
    pub access: TextureAccess,
}

impl TextureBinding {
    /// The whole chain, sampled.
    pub fn sampled() -> Self {
        Self::default()
    }

    /// The whole chain (mip zero for storage), read-write.
    pub fn storage() -> Self {
        Self {
            access: TextureAccess::Storage,
            ..Self::default()
        }
    }

    /// Restricts the binding to a single mip.
    pub fn with_mip(mut self, mip: u32) -> Self {
        self.mip = Some(mip);
        self
    }

    /// Binds every mip from the current one to the last.
    pub fn ranged(mut self) -> Self {
        self.ranged = true;
        self
    }
}

impl CommandList {
    /// Binds a vertex buffer to input slot zero.
    pub fn set_buffer_vertex(&mut self, buffer: &VertexBuffer, offset: u32) -> Result<(), RhiError> {
        self.set_buffer_vertex_at(0, buffer, offset)
    }

    /// Binds a vertex buffer to input `slot`.
    pub fn set_buffer_vertex_at(
        &mut self,
        slot: u32,
        buffer: &VertexBuffer,
        offset: u32,
    ) -> Result<(), RhiError> {
        self.require_recording("set_buffer_vertex")?;
        self.check_slot("vertex buffer", slot, 1, MAX_VERTEX_BUFFER_SLOTS)?;
        let requested = VertexBufferBinding {
            buffer: Some(buffer.handle()),
            stride: buffer.stride(),
            offset,
        };
        let current = if self.is_live() {
            self.device_context.vertex_buffer(slot)
        } else {
            self.bound.vertex_buffers[slot as usize]
        };
        if current.buffer == requested.buffer && current.offset == requested.offset {
            return Ok(());
        }
        self.device_context.set_vertex_buffer(slot, requested);
        self.bound.vertex_buffers[slot as usize] = requested;
        self.count(RhiCounter::BufferVertex);
        Ok(())
    }

    /// Binds an index buffer.
    pub fn set_buffer_index(&mut self, buffer: &IndexBuffer, offset: u32) -> Result<(), RhiError> {
        self.require_recording("set_buffer_index")?;
        let requested = IndexBufferBinding {
            buffer: Some(buffer.handle()),
            format: buffer.format(),
            offset,
        };
        let current = if self.is_live() {
            self.device_context.index_buffer()
        } else {
            self.bound.index_buffer
        };
        if current.buffer == requested.buffer && current.offset == requested.offset {
            return Ok(());
        }
        self.device_context.set_index_buffer(requested);
        self.bound.index_buffer = requested;
        self.count(RhiCounter::BufferIndex);
        Ok(())
    }

    /// Binds a constant buffer to `slot` of every stage in `scope`. `None` unbinds.
    pub fn set_constant_buffer(
        &mut self,
        slot: u32,
        scope: ShaderScope,
        buffer: Option<&ConstantBuffer>,
    ) -> Result<(), RhiError> {
        self.require_recording("set_constant_buffer")?;
        self.check_scope("set_constant_buffer", scope)?;
        self.check_slot("constant buffer", slot, 1, MAX_CONSTANT_BUFFER_SLOTS)?;
        let requested = buffer.map(ConstantBuffer::handle);
        for stage in scope.stages() {
            let current = if self.is_live() {
                self.device_context.constant_buffer(stage, slot)
            } else {
                self.bound.constant_buffers[stage.index()][slot as usize]
            };
            if current != requested {
                self.device_context.set_constant_buffer(stage, slot, requested);
                self.count(RhiCounter::BufferConstant);
            }
            self.bound.constant_buffers[stage.index()][slot as usize] = requested;
        }
        Ok(())
    }

    /// Binds a sampler to `slot` of every stage in `scope`. `None` unbinds.
    pub fn set_sampler(
        &mut self,
        slot: u32,
        scope: ShaderScope,
        sampler: Option<&Sampler>,
    ) -> Result<(), RhiError> {
        self.require_recording("set_sampler")?;
        self.check_scope("set_sampler", scope)?;
        self.check_slot("sampler", slot, 1, MAX_SAMPLER_SLOTS)?;
        let requested = sampler.map(Sampler::handle);
        for stage in scope.stages() {
            let current = if self.is_live() {
                self.device_context.sampler(stage, slot)
            } else {
                self.bound.samplers[stage.index()][slot as usize]
            };
            if current != requested {
                self.device_context.set_sampler(stage, slot, requested);
                self.count(RhiCounter::Sampler);
            }
            self.bound.samplers[stage.index()][slot as usize] = requested;
        }
        Ok(())
    }

    /// Binds views of `texture` starting at `slot`. `None` (or an unbacked
    /// texture) unbinds the slot.
    ///
    /// Sampled access applies to every stage in `scope` and is refused while
    /// any storage view of the texture is still bound. Storage access binds
    /// compute storage slots and requires `scope` to be exactly compute.
    pub fn set_texture(
        &mut self,
        slot: u32,
        scope: ShaderScope,
        texture: Option<&Texture>,
        binding: TextureBinding,
    ) -> Result<(), RhiError> {
        self.require_recording("set_texture")?;
        self.check_scope("set_texture", scope)?;
        let views = self.resolve_texture_views(texture, &binding)?;

        match binding.access {
            TextureAccess::Sampled => {
                self.check_slot("sampled texture", slot, views.len(), MAX_SAMPLED_SLOTS)?;
                if let Some(texture) = texture {
                    if self.bound.is_storage_bound(texture.id()) {
                        log::error!(
                            "Texture '{}' is still bound for storage access and cannot be sampled",
                            texture.name()
                        );
                        return Err(RhiError::ResourceHazard {
                            texture: texture.name().to_owned(),
                        });
                    }
                }
                for stage in scope.stages() {
                    self.bind_sampled_views(stage, slot, &views);
                }
            }
            TextureAccess::Storage => {
                if scope != ShaderScope::COMPUTE {
                    return Err(self.precondition(format!(
                        "storage textures bind to the compute stage only, got {scope:?}"
                    )));
                }
                self.check_slot("storage texture", slot, views.len(), MAX_STORAGE_SLOTS)?;
                let resource = texture.map(Texture::id);
                if self.bind_storage_views(slot, &views, resource) {
                    self.count(RhiCounter::TextureStorage);
                }
            }
        }
        Ok(())
    }

    /// Binds a structured buffer to compute storage `slot`. `None` unbinds.
    pub fn set_structured_buffer(
        &mut self,
        slot: u32,
        buffer: Option<&StructuredBuffer>,
    ) -> Result<(), RhiError> {
        self.require_recording("set_structured_buffer")?;
        self.check_slot("structured buffer", slot, 1, MAX_STORAGE_SLOTS)?;
        let views = [buffer.map(StructuredBuffer::handle)];
        if self.bind_storage_views(slot, &views, buffer.map(StructuredBuffer::id)) {
            self.count(RhiCounter::BufferStructured);
        }
        Ok(())
    }

    fn resolve_texture_views(
        &self,
        texture: Option<&Texture>,
        binding: &TextureBinding,
    ) -> Result<Vec<Option<BackendHandle>>, RhiError> {
        let Some(texture) = texture.filter(|t| t.is_backed()) else {
            return Ok(vec![None]);
        };
        let storage = binding.access == TextureAccess::Storage;
        let kind = if storage { "storage" } else { "sampled" };
        let mip_view = |mip: u32| {
            if storage {
                texture.storage_view_mip(mip)
            } else {
                texture.sampled_view_mip(mip)
            }
        };

        if !binding.ranged {
            let view = match binding.mip {
                None if storage => texture.storage_view(),
                None => texture.sampled_view(),
                Some(mip) => mip_view(mip),
            };
            return match view {
                Some(view) => Ok(vec![Some(view)]),
                None => Err(self.precondition(format!(
                    "texture '{}' has no {kind} view{}",
                    texture.name(),
                    binding.mip.map(|m| format!(" for mip {m}")).unwrap_or_default()
                ))),
            };
        }

        let first = binding.mip.unwrap_or(0);
        if first >= texture.mip_count() {
            return Err(self.precondition(format!(
                "mip {first} is out of range for texture '{}' with {} mips",
                texture.name(),
                texture.mip_count()
            )));
        }
        let count = (texture.mip_count() - first) as usize;
        if count > MAX_TEXTURE_VIEWS {
            log::error!(
                "Binding {count} views of texture '{}' exceeds the maximum of {MAX_TEXTURE_VIEWS}",
                texture.name()
            );
            return Err(RhiError::TooManyViews {
                requested: count,
                max: MAX_TEXTURE_VIEWS,
            });
        }
        (first..texture.mip_count())
            .map(|mip| {
                mip_view(mip).map(Some).ok_or_else(|| {
                    self.precondition(format!(
                        "texture '{}' has no {kind} view for mip {mip}",
                        texture.name()
                    ))
                })
            })
            .collect()
    }

    fn bind_sampled_views(&mut self, stage: ShaderStage, slot: u32, views: &[Option<BackendHandle>]) {
        let live = self.is_live();
        let differs = views.iter().enumerate().any(|(i, view)| {
            let target = slot + i as u32;
            let current = if live {
                self.device_context.sampled_view(stage, target)
            } else {
                self.bound.sampled_view(stage, target as usize)
            };
            current != *view
        });
        if differs {
            self.device_context.set_sampled_views(stage, slot, views);
            self.count(RhiCounter::TextureSampled);
        }
        for (i, view) in views.iter().enumerate() {
            self.bound.sampled_views[stage.index()][slot as usize + i] = *view;
        }
    }

    /// Returns `true` if a set call was issued.
    fn bind_storage_views(
        &mut self,
        slot: u32,
        views: &[Option<BackendHandle>],
        resource: Option<ResourceId>,
    ) -> bool {
        let live = self.is_live();
        let differs = views.iter().enumerate().any(|(i, view)| {
            let target = slot + i as u32;
            let current = if live {
                self.device_context.storage_view(target)
            } else {
                self.bound.storage_view(target as usize)
            };
            current != *view
        });
        if differs {
            self.device_context.set_storage_views(slot, views);
        }
        for (i, view) in views.iter().enumerate() {
            self.bound.storage_views[slot as usize + i] = match (view, resource) {
                (Some(view), Some(resource)) => Some(StorageBinding {
                    view: *view,
                    resource,
                }),
                _ => None,
            };
        }
        differs
    }

    /// Unbinds every occupied storage slot, one set call per slot.
    pub(super) fn unbind_storage_slots(&mut self) {
        let live = self.is_live();
        for slot in 0..MAX_STORAGE_SLOTS {
            let occupied = if live {
                self.device_context.storage_view(slot as u32).is_some()
            } else {
                self.bound.storage_views[slot].is_some()
            };
            if occupied {
                self.device_context.set_storage_views(slot as u32, &[None]);
            }
            self.bound.storage_views[slot] = None;
        }
    }

    fn check_slot(
        &self,
        what: &str,
        slot: u32,
        count: usize,
        capacity: usize,
    ) -> Result<(), RhiError> {
        if slot as usize + count > capacity {
            return Err(self.precondition(format!(
                "{what} slots {slot}..{} exceed the {capacity} available",
                slot as usize + count
            )));
        }
        Ok(())
    }

    fn check_scope(&self, operation: &str, scope: ShaderScope) -> Result<(), RhiError> {
        if scope.is_empty() {
            return Err(self.precondition(format!("{operation} called with an empty scope")));
        }
        Ok(())
    }
}
