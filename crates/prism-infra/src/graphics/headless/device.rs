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

use super::context::HeadlessContext;
use prism_core::rhi::common::{BackendHandle, StateQueryMode};
use prism_core::rhi::error::{QueryError, ResourceError};
use prism_core::rhi::query::{QueryData, QueryKind};
use prism_core::rhi::resource::{
    BlendDesc, BufferDesc, DepthStencilDesc, InputLayoutDesc, OwnedHandle, RasterizerDesc,
    SamplerDesc, ShaderDesc, SwapChainAllocation, SwapChainDesc, TextureAllocation, TextureDesc,
    TextureFlags, TextureViews,
};
use prism_core::rhi::traits::{ResourceReleaser, RhiDevice, RhiDeviceContext, VideoMemoryInfo};
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// What a live handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// A buffer.
    Buffer,
    /// A texture resource.
    Texture,
    /// A view of a texture or a back buffer.
    TextureView,
    /// A sampler.
    Sampler,
    /// A blend state.
    BlendState,
    /// A depth-stencil state.
    DepthStencilState,
    /// A rasterizer state.
    RasterizerState,
    /// A vertex input layout.
    InputLayout,
    /// A shader.
    Shader,
    /// A swapchain.
    SwapChain,
    /// A GPU semaphore.
    Semaphore,
    /// A GPU query.
    Query,
}

/// Behaviour of a [`HeadlessDevice`].
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessConfig {
    /// Reported by `adapter_name`.
    pub adapter_name: String,
    /// Whether contexts answer state queries.
    pub state_query_mode: StateQueryMode,
    /// Ticks per second reported by disjoint queries.
    pub timestamp_frequency: u64,
    /// How far the simulated GPU clock advances per captured timestamp.
    pub ticks_per_timestamp: u64,
    /// Reported by disjoint queries.
    pub disjoint: bool,
    /// Reads that report "not ready" before a query resolves.
    pub query_ready_after_polls: u32,
    /// Memory usage reported by the adapter; `None` makes the query unsupported.
    pub video_memory: Option<VideoMemoryInfo>,
    /// Makes every query creation fail.
    pub fail_query_creation: bool,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            adapter_name: String::from("Prism Headless Adapter"),
            state_query_mode: StateQueryMode::Live,
            timestamp_frequency: 1_000_000_000,
            ticks_per_timestamp: 1_000_000,
            disjoint: false,
            query_ready_after_polls: 0,
            video_memory: Some(VideoMemoryInfo {
                used: 256 * 1024 * 1024,
                budget: 4 * 1024 * 1024 * 1024,
            }),
            fail_query_creation: false,
        }
    }
}

#[derive(Debug)]
struct QueryRecord {
    kind: QueryKind,
    ended: bool,
    ticks: u64,
    polls: u32,
}

/// Device state shared with every context and every handle's release path.
#[derive(Debug)]
pub(super) struct DeviceShared {
    config: HeadlessConfig,
    next_handle: AtomicU64,
    clock: AtomicU64,
    objects: Mutex<HashMap<BackendHandle, ObjectKind>>,
    buffers: Mutex<HashMap<BackendHandle, Vec<u8>>>,
    queries: Mutex<HashMap<BackendHandle, QueryRecord>>,
    released: Mutex<Vec<BackendHandle>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DeviceShared {
    pub(super) fn config(&self) -> &HeadlessConfig {
        &self.config
    }

    fn allocate(&self, kind: ObjectKind) -> Result<BackendHandle, ResourceError> {
        let raw = self.next_handle.fetch_add(1, Ordering::Relaxed);
        let handle = BackendHandle::new(raw)
            .ok_or_else(|| ResourceError::BackendError("handle space exhausted".to_owned()))?;
        lock(&self.objects).insert(handle, kind);
        Ok(handle)
    }

    fn owned(self: &Arc<Self>, kind: ObjectKind) -> Result<OwnedHandle, ResourceError> {
        let handle = self.allocate(kind)?;
        let weak: Weak<DeviceShared> = Arc::downgrade(self);
        let releaser: Weak<dyn ResourceReleaser> = weak;
        Ok(OwnedHandle::new(handle, releaser))
    }

    fn owned_many(
        self: &Arc<Self>,
        kind: ObjectKind,
        count: u32,
    ) -> Result<Vec<OwnedHandle>, ResourceError> {
        (0..count).map(|_| self.owned(kind)).collect()
    }

    pub(super) fn kind_of(&self, handle: BackendHandle) -> Option<ObjectKind> {
        lock(&self.objects).get(&handle).copied()
    }

    pub(super) fn write_buffer(
        &self,
        buffer: BackendHandle,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        let mut buffers = lock(&self.buffers);
        let contents = buffers
            .get_mut(&buffer)
            .ok_or_else(|| ResourceError::NotBacked(format!("buffer {}", buffer.raw())))?;
        if data.len() > contents.len() {
            return Err(ResourceError::InvalidDescriptor(format!(
                "{} bytes written into a {} byte buffer",
                data.len(),
                contents.len()
            )));
        }
        contents[..data.len()].copy_from_slice(data);
        Ok(())
    }

    pub(super) fn end_query(&self, query: BackendHandle) {
        let mut queries = lock(&self.queries);
        let Some(record) = queries.get_mut(&query) else {
            log::warn!("Ended unknown query {}", query.raw());
            return;
        };
        if record.kind == QueryKind::Timestamp {
            let step = self.config.ticks_per_timestamp;
            record.ticks = self.clock.fetch_add(step, Ordering::Relaxed) + step;
        }
        record.ended = true;
        record.polls = 0;
    }

    pub(super) fn begin_query(&self, query: BackendHandle) {
        let mut queries = lock(&self.queries);
        match queries.get_mut(&query) {
            Some(record) if record.kind == QueryKind::Timestamp => {
                log::warn!("Timestamp query {} has no begin", query.raw());
            }
            Some(record) => {
                record.ended = false;
                record.polls = 0;
            }
            None => log::warn!("Began unknown query {}", query.raw()),
        }
    }

    pub(super) fn query_data(&self, query: BackendHandle) -> Option<QueryData> {
        let mut queries = lock(&self.queries);
        let record = queries.get_mut(&query)?;
        if !record.ended {
            return None;
        }
        if record.polls < self.config.query_ready_after_polls {
            record.polls += 1;
            return None;
        }
        Some(match record.kind {
            QueryKind::TimestampDisjoint => QueryData::Disjoint {
                disjoint: self.config.disjoint,
                frequency: self.config.timestamp_frequency,
            },
            QueryKind::Timestamp => QueryData::Timestamp(record.ticks),
        })
    }
}

impl ResourceReleaser for DeviceShared {
    fn release(&self, handle: BackendHandle) {
        if lock(&self.objects).remove(&handle).is_none() {
            log::warn!("Released handle {} twice", handle.raw());
            return;
        }
        lock(&self.buffers).remove(&handle);
        lock(&self.released).push(handle);
    }
}

/// An in-memory [`RhiDevice`].
///
/// Cloning yields another handle to the same device.
#[derive(Debug, Clone)]
pub struct HeadlessDevice {
    shared: Arc<DeviceShared>,
}

impl HeadlessDevice {
    /// Creates a device with the given behaviour.
    pub fn new(config: HeadlessConfig) -> Self {
        log::info!("Created headless device '{}'", config.adapter_name);
        Self {
            shared: Arc::new(DeviceShared {
                config,
                next_handle: AtomicU64::new(1),
                clock: AtomicU64::new(0),
                objects: Mutex::new(HashMap::new()),
                buffers: Mutex::new(HashMap::new()),
                queries: Mutex::new(HashMap::new()),
                released: Mutex::new(Vec::new()),
            }),
        }
    }

    /// The device behaviour.
    pub fn config(&self) -> &HeadlessConfig {
        &self.shared.config
    }

    /// Number of handles currently alive.
    pub fn live_object_count(&self) -> usize {
        lock(&self.shared.objects).len()
    }

    /// Number of live handles of `kind`.
    pub fn live_objects_of(&self, kind: ObjectKind) -> usize {
        lock(&self.shared.objects)
            .values()
            .filter(|k| **k == kind)
            .count()
    }

    /// `true` while `handle` has not been released.
    pub fn is_live(&self, handle: BackendHandle) -> bool {
        self.shared.kind_of(handle).is_some()
    }

    /// Every handle released so far, in release order.
    pub fn released(&self) -> Vec<BackendHandle> {
        lock(&self.shared.released).clone()
    }

    /// The current contents of a buffer.
    pub fn buffer_contents(&self, buffer: BackendHandle) -> Option<Vec<u8>> {
        lock(&self.shared.buffers).get(&buffer).cloned()
    }

    /// Creates a context with its own call log, as a concrete type.
    pub fn create_headless_context(&self) -> HeadlessContext {
        HeadlessContext::new(Arc::clone(&self.shared))
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new(HeadlessConfig::default())
    }
}

impl RhiDevice for HeadlessDevice {
    fn adapter_name(&self) -> String {
        self.shared.config.adapter_name.clone()
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<OwnedHandle, ResourceError> {
        if desc.size == 0 {
            return Err(ResourceError::InvalidDescriptor(format!(
                "buffer '{}' has zero size",
                desc.name
            )));
        }
        let size = usize::try_from(desc.size).map_err(|_| {
            ResourceError::InvalidDescriptor(format!("buffer '{}' is too large", desc.name))
        })?;
        let buffer = self.shared.owned(ObjectKind::Buffer)?;
        lock(&self.shared.buffers).insert(buffer.handle(), vec![0; size]);
        log::trace!("Created buffer '{}' ({} bytes)", desc.name, desc.size);
        Ok(buffer)
    }

    fn create_texture(&self, desc: &TextureDesc) -> Result<TextureAllocation, ResourceError> {
        desc.validate()?;
        let shared = &self.shared;
        let per_mip = desc.flags.contains(TextureFlags::PER_MIP_VIEW);
        let mut views = TextureViews::default();

        if desc.flags.contains(TextureFlags::SRV) {
            views.sampled = Some(shared.owned(ObjectKind::TextureView)?);
            if per_mip {
                views.sampled_per_mip = shared.owned_many(ObjectKind::TextureView, desc.mip_count)?;
            }
        }
        if desc.flags.contains(TextureFlags::UAV) {
            views.storage = Some(shared.owned(ObjectKind::TextureView)?);
            if per_mip {
                views.storage_per_mip = shared.owned_many(ObjectKind::TextureView, desc.mip_count)?;
            }
        }
        if desc.flags.contains(TextureFlags::RT_COLOR) {
            views.render_target = shared.owned_many(ObjectKind::TextureView, desc.array_length)?;
        }
        if desc.flags.contains(TextureFlags::RT_DEPTH_STENCIL) {
            views.depth_stencil = shared.owned_many(ObjectKind::TextureView, desc.array_length)?;
        }
        if desc.flags.contains(TextureFlags::RT_DEPTH_STENCIL_READ_ONLY) {
            views.depth_stencil_read_only =
                shared.owned_many(ObjectKind::TextureView, desc.array_length)?;
        }

        log::trace!(
            "Created texture '{}' {}x{} ({:?})",
            desc.name,
            desc.width,
            desc.height,
            desc.format
        );
        Ok(TextureAllocation {
            resource: shared.owned(ObjectKind::Texture)?,
            views,
        })
    }

    fn create_sampler(&self, _desc: &SamplerDesc) -> Result<OwnedHandle, ResourceError> {
        self.shared.owned(ObjectKind::Sampler)
    }

    fn create_blend_state(&self, _desc: &BlendDesc) -> Result<OwnedHandle, ResourceError> {
        self.shared.owned(ObjectKind::BlendState)
    }

    fn create_depth_stencil_state(
        &self,
        _desc: &DepthStencilDesc,
    ) -> Result<OwnedHandle, ResourceError> {
        self.shared.owned(ObjectKind::DepthStencilState)
    }

    fn create_rasterizer_state(
        &self,
        _desc: &RasterizerDesc,
    ) -> Result<OwnedHandle, ResourceError> {
        self.shared.owned(ObjectKind::RasterizerState)
    }

    fn create_input_layout(&self, desc: &InputLayoutDesc) -> Result<OwnedHandle, ResourceError> {
        if desc.attributes.is_empty() {
            return Err(ResourceError::InvalidDescriptor(format!(
                "input layout '{}' has no attributes",
                desc.name
            )));
        }
        self.shared.owned(ObjectKind::InputLayout)
    }

    fn create_shader(&self, desc: &ShaderDesc) -> Result<OwnedHandle, ResourceError> {
        log::trace!("Created {:?} shader '{}'", desc.stage, desc.name);
        self.shared.owned(ObjectKind::Shader)
    }

    fn create_swap_chain(&self, desc: &SwapChainDesc) -> Result<SwapChainAllocation, ResourceError> {
        if desc.buffer_count == 0 || desc.width == 0 || desc.height == 0 {
            return Err(ResourceError::InvalidDescriptor(format!(
                "swapchain '{}' needs a non-zero size and at least one buffer",
                desc.name
            )));
        }
        Ok(SwapChainAllocation {
            swap_chain: self.shared.owned(ObjectKind::SwapChain)?,
            back_buffers: self
                .shared
                .owned_many(ObjectKind::TextureView, desc.buffer_count)?,
        })
    }

    fn create_semaphore(&self) -> Result<OwnedHandle, ResourceError> {
        self.shared.owned(ObjectKind::Semaphore)
    }

    fn create_context(&self) -> Result<Box<dyn RhiDeviceContext>, ResourceError> {
        Ok(Box::new(self.create_headless_context()))
    }

    fn create_query(&self, kind: QueryKind) -> Result<BackendHandle, QueryError> {
        if self.shared.config.fail_query_creation {
            return Err(QueryError::CreationFailed(format!(
                "{kind:?} queries are disabled on '{}'",
                self.shared.config.adapter_name
            )));
        }
        let handle = self
            .shared
            .allocate(ObjectKind::Query)
            .map_err(|e| QueryError::CreationFailed(e.to_string()))?;
        lock(&self.shared.queries).insert(
            handle,
            QueryRecord {
                kind,
                ended: false,
                ticks: 0,
                polls: 0,
            },
        );
        Ok(handle)
    }

    fn release_query(&self, handle: BackendHandle) {
        lock(&self.shared.queries).remove(&handle);
        self.shared.release(handle);
    }

    fn query_video_memory(&self) -> Result<VideoMemoryInfo, QueryError> {
        self.shared.config.video_memory.ok_or(QueryError::Unsupported)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::rhi::common::Format;
    use prism_core::rhi::resource::Texture;

    #[test]
    fn texture_views_follow_flags() {
        let device = HeadlessDevice::default();
        let desc = TextureDesc::new_2d(
            "bloom",
            256,
            128,
            4,
            Format::R11G11B10Float,
            TextureFlags::SRV | TextureFlags::UAV | TextureFlags::PER_MIP_VIEW,
        );
        let allocation = device.create_texture(&desc).unwrap();

        assert!(allocation.views.sampled.is_some());
        assert_eq!(allocation.views.storage_per_mip.len(), 4);
        assert!(allocation.views.render_target.is_empty());
        // resource + 2 whole-chain views + 8 per-mip views
        assert_eq!(device.live_object_count(), 11);
    }

    #[test]
    fn dropping_a_texture_releases_every_handle() {
        let device = HeadlessDevice::default();
        let desc = TextureDesc::new_2d(
            "depth",
            64,
            64,
            1,
            Format::D32Float,
            TextureFlags::RT_DEPTH_STENCIL | TextureFlags::RT_DEPTH_STENCIL_READ_ONLY,
        );
        let texture = Texture::new(&device, desc).unwrap();
        assert_eq!(device.live_object_count(), 3);

        drop(texture);

        assert_eq!(device.live_object_count(), 0);
        assert_eq!(device.released().len(), 3);
    }

    #[test]
    fn query_creation_can_fail() {
        let device = HeadlessDevice::new(HeadlessConfig {
            fail_query_creation: true,
            ..HeadlessConfig::default()
        });
        assert!(matches!(
            device.create_query(QueryKind::Timestamp),
            Err(QueryError::CreationFailed(_))
        ));
    }
}
