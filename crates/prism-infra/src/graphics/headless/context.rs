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

use super::call::DeviceCall;
use super::device::{DeviceShared, ObjectKind};
use prism_core::rhi::clear::ClearFlags;
use prism_core::rhi::common::{
    BackendHandle, PrimitiveTopology, Rectangle, ShaderStage, StateQueryMode, Viewport,
    MAX_CONSTANT_BUFFER_SLOTS, MAX_SAMPLED_SLOTS, MAX_SAMPLER_SLOTS, MAX_STORAGE_SLOTS,
    MAX_VERTEX_BUFFER_SLOTS,
};
use prism_core::rhi::error::{QueryError, ResourceError};
use prism_core::rhi::query::QueryData;
use prism_core::rhi::traits::{
    BlendBinding, DepthStencilBinding, IndexBufferBinding, RenderTargetBinding, RhiDeviceContext,
    VertexBufferBinding,
};
use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

/// The pipeline state a context currently has bound.
#[derive(Debug, Clone)]
struct LiveState {
    input_layout: Option<BackendHandle>,
    topology: PrimitiveTopology,
    shaders: [Option<BackendHandle>; 3],
    blend: BlendBinding,
    depth_stencil: DepthStencilBinding,
    rasterizer: Option<BackendHandle>,
    render_targets: RenderTargetBinding,
    vertex_buffers: [VertexBufferBinding; MAX_VERTEX_BUFFER_SLOTS],
    index_buffer: IndexBufferBinding,
    constant_buffers: [[Option<BackendHandle>; MAX_CONSTANT_BUFFER_SLOTS]; 3],
    samplers: [[Option<BackendHandle>; MAX_SAMPLER_SLOTS]; 3],
    sampled_views: [[Option<BackendHandle>; MAX_SAMPLED_SLOTS]; 3],
    storage_views: [Option<BackendHandle>; MAX_STORAGE_SLOTS],
    viewport: Option<Viewport>,
    scissor: Option<Rectangle>,
}

impl Default for LiveState {
    fn default() -> Self {
        Self {
            input_layout: None,
            topology: PrimitiveTopology::Unknown,
            shaders: [None; 3],
            blend: BlendBinding::default(),
            depth_stencil: DepthStencilBinding::default(),
            rasterizer: None,
            render_targets: RenderTargetBinding::default(),
            vertex_buffers: [VertexBufferBinding::default(); MAX_VERTEX_BUFFER_SLOTS],
            index_buffer: IndexBufferBinding::default(),
            constant_buffers: [[None; MAX_CONSTANT_BUFFER_SLOTS]; 3],
            samplers: [[None; MAX_SAMPLER_SLOTS]; 3],
            sampled_views: [[None; MAX_SAMPLED_SLOTS]; 3],
            storage_views: [None; MAX_STORAGE_SLOTS],
            viewport: None,
            scissor: None,
        }
    }
}

/// Writes `values` into `slots` starting at `start`, ignoring what does not fit.
fn write_slots<T: Copy>(slots: &mut [T], start: u32, values: &[T]) {
    let start = start as usize;
    if start + values.len() > slots.len() {
        log::warn!(
            "Slots {start}..{} exceed the {} available, truncating",
            start + values.len(),
            slots.len()
        );
    }
    for (slot, value) in slots.iter_mut().skip(start).zip(values) {
        *slot = *value;
    }
}

/// An in-memory [`RhiDeviceContext`] that keeps live state and logs every call.
#[derive(Debug)]
pub struct HeadlessContext {
    device: Arc<DeviceShared>,
    state_query_mode: StateQueryMode,
    state: LiveState,
    calls: Vec<DeviceCall>,
    stalled_queries: HashSet<BackendHandle>,
    marker_depth: u32,
    submissions: u32,
}

impl HeadlessContext {
    pub(super) fn new(device: Arc<DeviceShared>) -> Self {
        let state_query_mode = device.config().state_query_mode;
        Self {
            device,
            state_query_mode,
            state: LiveState::default(),
            calls: Vec::new(),
            stalled_queries: HashSet::new(),
            marker_depth: 0,
            submissions: 0,
        }
    }

    /// Switches whether this context answers state queries.
    pub fn set_state_query_mode(&mut self, mode: StateQueryMode) {
        self.state_query_mode = mode;
    }

    /// Every call received since creation or the last [`clear_calls`](Self::clear_calls).
    ///
    /// The log is unbounded. Long-running callers drain it once per frame with
    /// [`take_calls`](Self::take_calls).
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    /// Returns the call log and empties it.
    pub fn take_calls(&mut self) -> Vec<DeviceCall> {
        std::mem::take(&mut self.calls)
    }

    /// Empties the call log. Live state is kept.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of logged calls that changed state.
    pub fn state_change_count(&self) -> usize {
        self.calls.iter().filter(|c| c.is_state_change()).count()
    }

    /// Debug markers currently open.
    pub fn marker_depth(&self) -> u32 {
        self.marker_depth
    }

    /// Number of successful submissions.
    pub fn submissions(&self) -> u32 {
        self.submissions
    }

    /// The last viewport set.
    pub fn viewport(&self) -> Option<Viewport> {
        self.state.viewport
    }

    /// The last scissor rectangle set.
    pub fn scissor(&self) -> Option<Rectangle> {
        self.state.scissor
    }

    /// Changes live state without logging a call, as code outside the
    /// command list would.
    pub fn bind_shader_untracked(&mut self, stage: ShaderStage, shader: Option<BackendHandle>) {
        self.state.shaders[stage.index()] = shader;
    }

    /// Makes `query` report "not ready" for as long as this context lives.
    pub fn stall_query(&mut self, query: BackendHandle) {
        self.stalled_queries.insert(query);
    }

    fn record(&mut self, call: DeviceCall) {
        log::trace!("{call:?}");
        self.calls.push(call);
    }
}

impl RhiDeviceContext for HeadlessContext {
    fn state_query_mode(&self) -> StateQueryMode {
        self.state_query_mode
    }

    fn input_layout(&self) -> Option<BackendHandle> {
        self.state.input_layout
    }

    fn set_input_layout(&mut self, layout: Option<BackendHandle>) {
        self.state.input_layout = layout;
        self.record(DeviceCall::SetInputLayout(layout));
    }

    fn primitive_topology(&self) -> PrimitiveTopology {
        self.state.topology
    }

    fn set_primitive_topology(&mut self, topology: PrimitiveTopology) {
        self.state.topology = topology;
        self.record(DeviceCall::SetPrimitiveTopology(topology));
    }

    fn shader(&self, stage: ShaderStage) -> Option<BackendHandle> {
        self.state.shaders[stage.index()]
    }

    fn set_shader(&mut self, stage: ShaderStage, shader: Option<BackendHandle>) {
        self.state.shaders[stage.index()] = shader;
        self.record(DeviceCall::SetShader { stage, shader });
    }

    fn blend_state(&self) -> BlendBinding {
        self.state.blend
    }

    fn set_blend_state(&mut self, binding: BlendBinding) {
        self.state.blend = binding;
        self.record(DeviceCall::SetBlendState(binding));
    }

    fn depth_stencil_state(&self) -> DepthStencilBinding {
        self.state.depth_stencil
    }

    fn set_depth_stencil_state(&mut self, binding: DepthStencilBinding) {
        self.state.depth_stencil = binding;
        self.record(DeviceCall::SetDepthStencilState(binding));
    }

    fn rasterizer_state(&self) -> Option<BackendHandle> {
        self.state.rasterizer
    }

    fn set_rasterizer_state(&mut self, state: Option<BackendHandle>) {
        self.state.rasterizer = state;
        self.record(DeviceCall::SetRasterizerState(state));
    }

    fn render_targets(&self) -> RenderTargetBinding {
        self.state.render_targets
    }

    fn set_render_targets(&mut self, targets: &RenderTargetBinding) {
        self.state.render_targets = *targets;
        self.record(DeviceCall::SetRenderTargets(*targets));
    }

    fn vertex_buffer(&self, slot: u32) -> VertexBufferBinding {
        self.state
            .vertex_buffers
            .get(slot as usize)
            .copied()
            .unwrap_or_default()
    }

    fn set_vertex_buffer(&mut self, slot: u32, binding: VertexBufferBinding) {
        write_slots(&mut self.state.vertex_buffers, slot, &[binding]);
        self.record(DeviceCall::SetVertexBuffer { slot, binding });
    }

    fn index_buffer(&self) -> IndexBufferBinding {
        self.state.index_buffer
    }

    fn set_index_buffer(&mut self, binding: IndexBufferBinding) {
        self.state.index_buffer = binding;
        self.record(DeviceCall::SetIndexBuffer(binding));
    }

    fn constant_buffer(&self, stage: ShaderStage, slot: u32) -> Option<BackendHandle> {
        self.state.constant_buffers[stage.index()]
            .get(slot as usize)
            .copied()
            .flatten()
    }

    fn set_constant_buffer(&mut self, stage: ShaderStage, slot: u32, buffer: Option<BackendHandle>) {
        write_slots(&mut self.state.constant_buffers[stage.index()], slot, &[buffer]);
        self.record(DeviceCall::SetConstantBuffer {
            stage,
            slot,
            buffer,
        });
    }

    fn sampler(&self, stage: ShaderStage, slot: u32) -> Option<BackendHandle> {
        self.state.samplers[stage.index()]
            .get(slot as usize)
            .copied()
            .flatten()
    }

    fn set_sampler(&mut self, stage: ShaderStage, slot: u32, sampler: Option<BackendHandle>) {
        write_slots(&mut self.state.samplers[stage.index()], slot, &[sampler]);
        self.record(DeviceCall::SetSampler {
            stage,
            slot,
            sampler,
        });
    }

    fn sampled_view(&self, stage: ShaderStage, slot: u32) -> Option<BackendHandle> {
        self.state.sampled_views[stage.index()]
            .get(slot as usize)
            .copied()
            .flatten()
    }

    fn set_sampled_views(
        &mut self,
        stage: ShaderStage,
        start_slot: u32,
        views: &[Option<BackendHandle>],
    ) {
        write_slots(&mut self.state.sampled_views[stage.index()], start_slot, views);
        self.record(DeviceCall::SetSampledViews {
            stage,
            start_slot,
            views: views.to_vec(),
        });
    }

    fn storage_view(&self, slot: u32) -> Option<BackendHandle> {
        self.state.storage_views.get(slot as usize).copied().flatten()
    }

    fn set_storage_views(&mut self, start_slot: u32, views: &[Option<BackendHandle>]) {
        write_slots(&mut self.state.storage_views, start_slot, views);
        self.record(DeviceCall::SetStorageViews {
            start_slot,
            views: views.to_vec(),
        });
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        self.state.viewport = Some(*viewport);
        self.record(DeviceCall::SetViewport(*viewport));
    }

    fn set_scissor(&mut self, rectangle: &Rectangle) {
        self.state.scissor = Some(*rectangle);
        self.record(DeviceCall::SetScissor(*rectangle));
    }

    fn clear_render_target_view(&mut self, view: BackendHandle, color: [f32; 4]) {
        self.record(DeviceCall::ClearRenderTarget { view, color });
    }

    fn clear_depth_stencil_view(
        &mut self,
        view: BackendHandle,
        flags: ClearFlags,
        depth: f32,
        stencil: u32,
    ) {
        self.record(DeviceCall::ClearDepthStencil {
            view,
            flags,
            depth,
            stencil,
        });
    }

    fn clear_storage_view_float(&mut self, view: BackendHandle, color: [f32; 4]) {
        self.record(DeviceCall::ClearStorage { view, color });
    }

    fn draw(&mut self, vertex_count: u32, vertex_offset: u32) {
        self.record(DeviceCall::Draw {
            vertex_count,
            vertex_offset,
        });
    }

    fn draw_indexed(&mut self, index_count: u32, index_offset: u32, vertex_offset: i32) {
        self.record(DeviceCall::DrawIndexed {
            index_count,
            index_offset,
            vertex_offset,
        });
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.record(DeviceCall::Dispatch { x, y, z });
    }

    fn copy_resource(&mut self, destination: BackendHandle, source: BackendHandle) {
        self.record(DeviceCall::CopyResource {
            destination,
            source,
        });
    }

    fn update_buffer(&mut self, buffer: BackendHandle, data: &[u8]) -> Result<(), ResourceError> {
        self.device.write_buffer(buffer, data)?;
        self.record(DeviceCall::UpdateBuffer {
            buffer,
            size: data.len(),
        });
        Ok(())
    }

    fn begin_query(&mut self, query: BackendHandle) {
        self.device.begin_query(query);
        self.record(DeviceCall::BeginQuery(query));
    }

    fn end_query(&mut self, query: BackendHandle) {
        self.device.end_query(query);
        self.record(DeviceCall::EndQuery(query));
    }

    fn query_data(&mut self, query: BackendHandle) -> Result<Option<QueryData>, QueryError> {
        if self.device.kind_of(query) != Some(ObjectKind::Query) {
            return Err(QueryError::WrongKind);
        }
        if self.stalled_queries.contains(&query) {
            return Ok(None);
        }
        Ok(self.device.query_data(query))
    }

    fn begin_event(&mut self, name: &str) {
        self.marker_depth += 1;
        self.record(DeviceCall::BeginEvent(name.to_owned()));
    }

    fn end_event(&mut self) {
        if self.marker_depth == 0 {
            log::warn!("Debug marker closed without a matching begin");
        } else {
            self.marker_depth -= 1;
        }
        self.record(DeviceCall::EndEvent);
    }

    fn submit(&mut self, wait: Option<BackendHandle>) -> Result<(), ResourceError> {
        if let Some(semaphore) = wait {
            if self.device.kind_of(semaphore) != Some(ObjectKind::Semaphore) {
                return Err(ResourceError::NotBacked(format!(
                    "semaphore {}",
                    semaphore.raw()
                )));
            }
        }
        self.submissions += 1;
        self.record(DeviceCall::Submit { wait });
        Ok(())
    }

    fn present(&mut self, swap_chain: BackendHandle) -> Result<(), ResourceError> {
        if self.device.kind_of(swap_chain) != Some(ObjectKind::SwapChain) {
            return Err(ResourceError::NotBacked(format!(
                "swapchain {}",
                swap_chain.raw()
            )));
        }
        self.record(DeviceCall::Present(swap_chain));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
