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

//! Fixed-function state objects: blend, depth-stencil and rasterizer.

use super::OwnedHandle;
use crate::rhi::common::{BackendHandle, ResourceId};
use crate::rhi::error::ResourceError;
use crate::rhi::traits::RhiDevice;
use std::sync::Arc;

/// A comparison between a new and a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonFunction {
    /// Never passes.
    Never,
    /// Passes if new < stored.
    Less,
    /// Passes if new == stored.
    Equal,
    /// Passes if new <= stored.
    LessEqual,
    /// Passes if new > stored.
    Greater,
    /// Passes if new != stored.
    NotEqual,
    /// Passes if new >= stored.
    GreaterEqual,
    /// Always passes.
    Always,
}

/// Operation applied to the stencil buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOperation {
    /// Keep the stored value.
    Keep,
    /// Write zero.
    Zero,
    /// Write the reference value.
    Replace,
    /// Increment and clamp.
    IncrementClamp,
}

/// A multiplier applied to source or destination color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// `0`
    Zero,
    /// `1`
    One,
    /// Source alpha.
    SrcAlpha,
    /// `1 - source alpha`.
    InvSrcAlpha,
    /// The state's constant blend factor.
    Constant,
}

/// How source and destination terms are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOperation {
    /// `src + dst`
    Add,
    /// `src - dst`
    Subtract,
    /// `min(src, dst)`
    Min,
    /// `max(src, dst)`
    Max,
}

/// Which triangles are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    /// Keep everything.
    None,
    /// Discard front faces.
    Front,
    /// Discard back faces.
    Back,
}

/// How triangles are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FillMode {
    /// Filled triangles.
    Solid,
    /// Edges only.
    Wireframe,
}

/// A descriptor for creating a blend state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendDesc {
    /// Whether blending is enabled.
    pub enabled: bool,
    /// Source color factor.
    pub source: BlendFactor,
    /// Destination color factor.
    pub destination: BlendFactor,
    /// Color operation.
    pub operation: BlendOperation,
    /// Source alpha factor.
    pub source_alpha: BlendFactor,
    /// Destination alpha factor.
    pub destination_alpha: BlendFactor,
    /// Alpha operation.
    pub operation_alpha: BlendOperation,
    /// Constant factor, applied to all four channels when the state is bound.
    pub blend_factor: f32,
}

impl BlendDesc {
    /// Blending disabled.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            source: BlendFactor::One,
            destination: BlendFactor::Zero,
            operation: BlendOperation::Add,
            source_alpha: BlendFactor::One,
            destination_alpha: BlendFactor::Zero,
            operation_alpha: BlendOperation::Add,
            blend_factor: 0.0,
        }
    }
}

/// A blend state.
#[derive(Debug)]
pub struct BlendState {
    id: ResourceId,
    desc: BlendDesc,
    state: OwnedHandle,
}

impl BlendState {
    /// Creates a blend state on `device`.
    pub fn new(device: &dyn RhiDevice, desc: BlendDesc) -> Result<Arc<Self>, ResourceError> {
        Ok(Arc::new(Self {
            id: ResourceId::next(),
            state: device.create_blend_state(&desc)?,
            desc,
        }))
    }

    /// The process-unique id.
    pub fn id(&self) -> ResourceId {
        self.id
    }
    /// The creation descriptor.
    pub fn desc(&self) -> &BlendDesc {
        &self.desc
    }
    /// The backend handle.
    pub fn handle(&self) -> BackendHandle {
        self.state.handle()
    }
    /// The constant blend factor.
    pub fn blend_factor(&self) -> f32 {
        self.desc.blend_factor
    }
}

/// A descriptor for creating a depth-stencil state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthStencilDesc {
    /// Whether depth testing is enabled.
    pub depth_test: bool,
    /// Whether depth writes are enabled.
    pub depth_write: bool,
    /// Depth comparison.
    pub depth_function: ComparisonFunction,
    /// Whether stencil testing is enabled.
    pub stencil_test: bool,
    /// Whether stencil writes are enabled.
    pub stencil_write: bool,
    /// Stencil comparison.
    pub stencil_function: ComparisonFunction,
    /// Operation when both tests pass.
    pub stencil_pass_operation: StencilOperation,
}

/// A depth-stencil state.
#[derive(Debug)]
pub struct DepthStencilState {
    id: ResourceId,
    desc: DepthStencilDesc,
    state: OwnedHandle,
}

impl DepthStencilState {
    /// Creates a depth-stencil state on `device`.
    pub fn new(
        device: &dyn RhiDevice,
        desc: DepthStencilDesc,
    ) -> Result<Arc<Self>, ResourceError> {
        Ok(Arc::new(Self {
            id: ResourceId::next(),
            state: device.create_depth_stencil_state(&desc)?,
            desc,
        }))
    }

    /// The process-unique id.
    pub fn id(&self) -> ResourceId {
        self.id
    }
    /// The creation descriptor.
    pub fn desc(&self) -> &DepthStencilDesc {
        &self.desc
    }
    /// The backend handle.
    pub fn handle(&self) -> BackendHandle {
        self.state.handle()
    }
}

/// A descriptor for creating a rasterizer state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizerDesc {
    /// Face culling.
    pub cull_mode: CullMode,
    /// Fill mode.
    pub fill_mode: FillMode,
    /// Clip against the depth range.
    pub depth_clip: bool,
    /// Enable the scissor test.
    pub scissor: bool,
    /// Enable multisample rasterization.
    pub multisample: bool,
    /// Enable antialiased lines.
    pub antialiased_lines: bool,
    /// Constant depth bias.
    pub depth_bias: f32,
    /// Maximum depth bias.
    pub depth_bias_clamp: f32,
    /// Slope-scaled depth bias.
    pub depth_bias_slope_scaled: f32,
}

impl RasterizerDesc {
    /// Solid fill with the given culling and no depth bias.
    pub fn solid(cull_mode: CullMode) -> Self {
        Self {
            cull_mode,
            fill_mode: FillMode::Solid,
            depth_clip: true,
            scissor: false,
            multisample: false,
            antialiased_lines: false,
            depth_bias: 0.0,
            depth_bias_clamp: 0.0,
            depth_bias_slope_scaled: 0.0,
        }
    }
}

/// A rasterizer state.
#[derive(Debug)]
pub struct RasterizerState {
    id: ResourceId,
    desc: RasterizerDesc,
    state: OwnedHandle,
}

impl RasterizerState {
    /// Creates a rasterizer state on `device`.
    pub fn new(device: &dyn RhiDevice, desc: RasterizerDesc) -> Result<Arc<Self>, ResourceError> {
        Ok(Arc::new(Self {
            id: ResourceId::next(),
            state: device.create_rasterizer_state(&desc)?,
            desc,
        }))
    }

    /// The process-unique id.
    pub fn id(&self) -> ResourceId {
        self.id
    }
    /// The creation descriptor.
    pub fn desc(&self) -> &RasterizerDesc {
        &self.desc
    }
    /// The backend handle.
    pub fn handle(&self) -> BackendHandle {
        self.state.handle()
    }
}
