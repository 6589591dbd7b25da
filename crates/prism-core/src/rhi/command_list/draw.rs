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

use super::CommandList;
use crate::rhi::error::RhiError;
use crate::rhi::resource::Texture;
use crate::rhi::traits::RhiCounter;

impl CommandList {
    /// Draws `vertex_count` non-indexed vertices.
    pub fn draw(&mut self, vertex_count: u32) -> Result<(), RhiError> {
        self.require_pass("draw")?;
        self.device_context.draw(vertex_count, 0);
        self.count(RhiCounter::Draw);
        Ok(())
    }

    /// Draws `index_count` indices of the bound index buffer.
    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        index_offset: u32,
        vertex_offset: i32,
    ) -> Result<(), RhiError> {
        self.require_pass("draw_indexed")?;
        self.device_context
            .draw_indexed(index_count, index_offset, vertex_offset);
        self.count(RhiCounter::Draw);
        Ok(())
    }

    /// Dispatches compute work, then unbinds every storage slot so the
    /// written resources can be sampled by later passes.
    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<(), RhiError> {
        self.require_pass("dispatch")?;
        self.device_context.dispatch(x, y, z);
        self.count(RhiCounter::Dispatch);
        self.unbind_storage_slots();
        Ok(())
    }

    /// Copies the whole of `source` into `destination`.
    ///
    /// Both textures must be backed, distinct, and identical in format, size,
    /// array length and mip count.
    pub fn blit(&mut self, source: &Texture, destination: &Texture) -> Result<(), RhiError> {
        self.require_recording("blit")?;
        let (Some(src), Some(dst)) = (source.handle(), destination.handle()) else {
            return Err(self.precondition(format!(
                "blit from '{}' to '{}' needs two backed textures",
                source.name(),
                destination.name()
            )));
        };
        if source.id() == destination.id() {
            return Err(self.precondition(format!(
                "blit source and destination are both '{}'",
                source.name()
            )));
        }
        if !source.is_copy_compatible(destination) {
            return Err(self.precondition(format!(
                "blit from '{}' {:?} to '{}' {:?}: format, size, array length and mip count must match",
                source.name(),
                (source.format(), source.width(), source.height(), source.array_length(), source.mip_count()),
                destination.name(),
                (destination.format(), destination.width(), destination.height(), destination.array_length(), destination.mip_count()),
            )));
        }
        self.device_context.copy_resource(dst, src);
        Ok(())
    }

    fn require_pass(&self, operation: &'static str) -> Result<(), RhiError> {
        self.require_recording(operation)?;
        if self.pipeline_state.is_none() {
            log::error!(
                "'{operation}' on command list '{}' outside of a render pass",
                self.name
            );
            return Err(RhiError::NoActivePass);
        }
        Ok(())
    }
}
