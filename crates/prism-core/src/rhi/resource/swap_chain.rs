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

//! Swapchains and GPU semaphores.

use super::OwnedHandle;
use crate::rhi::common::{BackendHandle, Format, ResourceId};
use crate::rhi::error::ResourceError;
use crate::rhi::traits::{RhiDevice, RhiDeviceContext};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A descriptor for creating a swapchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapChainDesc {
    /// A debug label.
    pub name: String,
    /// Width of the back buffers.
    pub width: u32,
    /// Height of the back buffers.
    pub height: u32,
    /// Format of the back buffers.
    pub format: Format,
    /// Number of back buffers.
    pub buffer_count: u32,
}

/// The handles a backend returns for a new swapchain.
#[derive(Debug)]
pub struct SwapChainAllocation {
    /// The swapchain object.
    pub swap_chain: OwnedHandle,
    /// One render-target view per back buffer.
    pub back_buffers: Vec<OwnedHandle>,
}

/// A chain of presentable back buffers.
#[derive(Debug)]
pub struct SwapChain {
    id: ResourceId,
    desc: SwapChainDesc,
    swap_chain: OwnedHandle,
    back_buffers: Vec<OwnedHandle>,
    index: AtomicUsize,
}

impl SwapChain {
    /// Creates a swapchain on `device`.
    pub fn new(device: &dyn RhiDevice, desc: SwapChainDesc) -> Result<Arc<Self>, ResourceError> {
        if desc.buffer_count == 0 || !desc.format.is_color() {
            return Err(ResourceError::InvalidDescriptor(format!(
                "swapchain '{}' needs at least one color back buffer",
                desc.name
            )));
        }
        let allocation = device.create_swap_chain(&desc)?;
        Ok(Arc::new(Self {
            id: ResourceId::next(),
            desc,
            swap_chain: allocation.swap_chain,
            back_buffers: allocation.back_buffers,
            index: AtomicUsize::new(0),
        }))
    }

    /// The process-unique id.
    pub fn id(&self) -> ResourceId {
        self.id
    }
    /// The creation descriptor.
    pub fn desc(&self) -> &SwapChainDesc {
        &self.desc
    }
    /// The backend handle of the swapchain object.
    pub fn handle(&self) -> BackendHandle {
        self.swap_chain.handle()
    }
    /// Index of the back buffer the next frame renders into.
    pub fn back_buffer_index(&self) -> usize {
        self.index.load(Ordering::Acquire)
    }
    /// Render-target view of the current back buffer.
    pub fn back_buffer_view(&self) -> Option<BackendHandle> {
        self.back_buffers
            .get(self.back_buffer_index())
            .map(OwnedHandle::handle)
    }

    /// Presents the current back buffer and advances to the next one.
    pub fn present(&self, ctx: &mut dyn RhiDeviceContext) -> Result<(), ResourceError> {
        ctx.present(self.handle())?;
        let count = self.back_buffers.len().max(1);
        let next = (self.back_buffer_index() + 1) % count;
        self.index.store(next, Ordering::Release);
        Ok(())
    }
}

/// A GPU-side wait primitive handed to `submit`.
#[derive(Debug)]
pub struct Semaphore {
    id: ResourceId,
    semaphore: OwnedHandle,
}

impl Semaphore {
    /// Creates a semaphore on `device`.
    pub fn new(device: &dyn RhiDevice) -> Result<Arc<Self>, ResourceError> {
        Ok(Arc::new(Self {
            id: ResourceId::next(),
            semaphore: device.create_semaphore()?,
        }))
    }

    /// The process-unique id.
    pub fn id(&self) -> ResourceId {
        self.id
    }
    /// The backend handle.
    pub fn handle(&self) -> BackendHandle {
        self.semaphore.handle()
    }
}
