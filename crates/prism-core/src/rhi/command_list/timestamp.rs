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

//! GPU timestamps, memory queries and per-pass time blocks.

use super::{CommandList, OpenTimeBlock};
use crate::rhi::error::RhiError;
use crate::rhi::pipeline_state::PipelineState;
use crate::rhi::query::{self, QueryWait, TimestampQueries};
use crate::rhi::traits::{RhiDevice, TimeBlockKind};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Weak;

const BYTES_PER_MB: u64 = 1024 * 1024;

static MEMORY_QUERY_SUPPORT: AtomicU8 = AtomicU8::new(MemoryQuerySupport::Unknown as u8);

/// Whether the adapter can report its memory usage.
///
/// Detected on the first query and cached for the rest of the process. Once
/// a query fails the capability is never checked again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MemoryQuerySupport {
    /// Not queried yet.
    Unknown = 0,
    /// The last query succeeded.
    Supported = 1,
    /// A query failed; memory usage reads as zero from now on.
    Unsupported = 2,
}

impl MemoryQuerySupport {
    /// The capability as currently known to this process.
    pub fn current() -> Self {
        match MEMORY_QUERY_SUPPORT.load(Ordering::Acquire) {
            1 => MemoryQuerySupport::Supported,
            2 => MemoryQuerySupport::Unsupported,
            _ => MemoryQuerySupport::Unknown,
        }
    }
}

/// Video memory used by this process on the primary adapter, in megabytes.
///
/// Returns zero when the adapter cannot report it. The first failure is
/// logged and disables the query for the rest of the process.
pub fn gpu_memory_used_mb(device: &dyn RhiDevice) -> u64 {
    if MemoryQuerySupport::current() == MemoryQuerySupport::Unsupported {
        return 0;
    }
    match device.query_video_memory() {
        Ok(info) => {
            MEMORY_QUERY_SUPPORT.store(MemoryQuerySupport::Supported as u8, Ordering::Release);
            info.used / BYTES_PER_MB
        }
        Err(err) => {
            let previous = MEMORY_QUERY_SUPPORT
                .swap(MemoryQuerySupport::Unsupported as u8, Ordering::AcqRel);
            if previous != MemoryQuerySupport::Unsupported as u8 {
                log::error!(
                    "Failed to query video memory on '{}', disabling the query: {err}",
                    device.adapter_name()
                );
            }
            0
        }
    }
}

impl CommandList {
    /// Creates the three queries that measure one interval.
    pub fn create_timestamp_queries(&self) -> Result<TimestampQueries, RhiError> {
        let device = self.device()?;
        Ok(TimestampQueries::create(&device)?)
    }

    /// Begins the disjoint query and captures the start tick.
    pub fn timestamp_start(&mut self, queries: &TimestampQueries) -> Result<(), RhiError> {
        self.require_recording("timestamp_start")?;
        query::timestamp_start(self.device_context.as_mut(), queries);
        Ok(())
    }

    /// Captures the end tick and ends the disjoint query.
    pub fn timestamp_end(&mut self, queries: &TimestampQueries) -> Result<(), RhiError> {
        self.require_recording("timestamp_end")?;
        query::timestamp_end(self.device_context.as_mut(), queries);
        Ok(())
    }

    /// Waits for the interval's results and returns its length in milliseconds.
    ///
    /// Blocks the calling thread, polling with backoff, for at most
    /// `wait.timeout`. A disjoint interval measures zero.
    pub fn timestamp_get_duration(
        &mut self,
        queries: &TimestampQueries,
        wait: &QueryWait,
    ) -> Result<f64, RhiError> {
        query::resolve_timestamp_duration(self.device_context.as_mut(), queries, wait).map_err(
            |err| {
                log::error!("Failed to read timestamps on '{}': {err}", self.name);
                err.into()
            },
        )
    }

    /// Video memory in use, in megabytes. See [`gpu_memory_used_mb`].
    pub fn gpu_memory_used_mb(&self) -> u64 {
        self.device()
            .map(|device| gpu_memory_used_mb(device.as_ref()))
            .unwrap_or(0)
    }

    /// Opens the CPU block, then the GPU block, then the debug marker of a named pass.
    pub(super) fn open_time_block(&mut self, pipeline_state: &PipelineState) {
        let Some(name) = pipeline_state.name() else {
            return;
        };
        let mut block = OpenTimeBlock::default();

        if self.settings.profiler_enabled && pipeline_state.profile {
            if let Some(profiler) = self.profiler.as_ref().and_then(Weak::upgrade) {
                let ctx = self.device_context.as_mut();
                block.cpu = profiler.time_block_start(name, TimeBlockKind::Cpu, &mut *ctx);
                block.gpu = profiler.time_block_start(name, TimeBlockKind::Gpu, ctx);
            }
        }
        if self.settings.markers_enabled && pipeline_state.mark {
            self.device_context.begin_event(name);
            block.marker = true;
        }
        self.time_block = Some(block);
    }

    /// Closes the marker, then the GPU block, then the CPU block. Each at most once.
    pub(super) fn close_time_block(&mut self) {
        let Some(block) = self.time_block.take() else {
            return;
        };
        if block.marker {
            self.device_context.end_event();
        }
        let Some(profiler) = self.profiler.as_ref().and_then(Weak::upgrade) else {
            return;
        };
        if let Some(gpu) = block.gpu {
            profiler.time_block_end(gpu, self.device_context.as_mut());
        }
        if let Some(cpu) = block.cpu {
            profiler.time_block_end(cpu, self.device_context.as_mut());
        }
    }
}
