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

//! Defines the profiler interface the command list reports to.

use crate::rhi::traits::RhiDeviceContext;
use std::any::Any;
use std::fmt;

/// A named counter the command list increments whenever it issues a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RhiCounter {
    /// Vertex shader changes.
    ShaderVertex,
    /// Pixel shader changes.
    ShaderPixel,
    /// Compute shader changes.
    ShaderCompute,
    /// Render target changes.
    RenderTarget,
    /// Vertex buffer changes.
    BufferVertex,
    /// Index buffer changes.
    BufferIndex,
    /// Constant buffer changes, counted per stage.
    BufferConstant,
    /// Structured buffer changes.
    BufferStructured,
    /// Sampler changes, counted per stage.
    Sampler,
    /// Sampled texture changes, counted per stage.
    TextureSampled,
    /// Storage texture changes.
    TextureStorage,
    /// Draw calls.
    Draw,
    /// Compute dispatches.
    Dispatch,
    /// Successfully begun render passes.
    Pipeline,
}

impl RhiCounter {
    /// Every counter, in reporting order.
    pub const ALL: [RhiCounter; 14] = [
        RhiCounter::ShaderVertex,
        RhiCounter::ShaderPixel,
        RhiCounter::ShaderCompute,
        RhiCounter::RenderTarget,
        RhiCounter::BufferVertex,
        RhiCounter::BufferIndex,
        RhiCounter::BufferConstant,
        RhiCounter::BufferStructured,
        RhiCounter::Sampler,
        RhiCounter::TextureSampled,
        RhiCounter::TextureStorage,
        RhiCounter::Draw,
        RhiCounter::Dispatch,
        RhiCounter::Pipeline,
    ];

    /// The stable metric name.
    pub const fn name(self) -> &'static str {
        match self {
            RhiCounter::ShaderVertex => "rhi_bindings_shader_vertex",
            RhiCounter::ShaderPixel => "rhi_bindings_shader_pixel",
            RhiCounter::ShaderCompute => "rhi_bindings_shader_compute",
            RhiCounter::RenderTarget => "rhi_bindings_render_target",
            RhiCounter::BufferVertex => "rhi_bindings_buffer_vertex",
            RhiCounter::BufferIndex => "rhi_bindings_buffer_index",
            RhiCounter::BufferConstant => "rhi_bindings_buffer_constant",
            RhiCounter::BufferStructured => "rhi_bindings_buffer_structured",
            RhiCounter::Sampler => "rhi_bindings_sampler",
            RhiCounter::TextureSampled => "rhi_bindings_texture_sampled",
            RhiCounter::TextureStorage => "rhi_bindings_texture_storage",
            RhiCounter::Draw => "rhi_draw",
            RhiCounter::Dispatch => "rhi_dispatch",
            RhiCounter::Pipeline => "rhi_bindings_pipeline",
        }
    }
}

impl fmt::Display for RhiCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which clock a time block measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeBlockKind {
    /// Wall time on the recording thread.
    Cpu,
    /// GPU time, measured with timestamp queries.
    Gpu,
}

/// Identifies an open time block so it can be closed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeBlockId(pub u64);

/// Receives counters and time blocks from command lists.
///
/// Implementations are shared by every command list and must tolerate
/// concurrent calls from several recording threads.
pub trait RhiProfiler: Any + Send + Sync {
    /// Adds one to `counter`.
    fn increment(&self, counter: RhiCounter);

    /// Opens a time block named `name`. Returns `None` if the block could not be opened.
    fn time_block_start(
        &self,
        name: &str,
        kind: TimeBlockKind,
        ctx: &mut dyn RhiDeviceContext,
    ) -> Option<TimeBlockId>;

    /// Closes a block previously returned by [`time_block_start`](Self::time_block_start).
    fn time_block_end(&self, block: TimeBlockId, ctx: &mut dyn RhiDeviceContext);

    /// Returns a reference to the underlying `Any` trait object.
    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn counter_names_are_unique() {
        let names: HashSet<_> = RhiCounter::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(names.len(), RhiCounter::ALL.len());
        assert_eq!(RhiCounter::Draw.to_string(), "rhi_draw");
    }
}
