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

//! Renderer-wide resources bound at the start of every render pass.

use std::sync::{Arc, PoisonError, RwLock};

use crate::rhi::command_list::CommandList;
use crate::rhi::common::ShaderScope;
use crate::rhi::error::RhiError;
use crate::rhi::resource::{ConstantBuffer, Sampler};
use crate::rhi::traits::GlobalShaderResources;

/// Constant buffer slots shared by every shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ConstantBufferSlot {
    /// Per-frame constants.
    Frame = 0,
    /// Per-draw constants.
    Uber = 1,
    /// Per-light constants.
    Light = 2,
    /// Per-material constants.
    Material = 3,
}

/// Sampler slots shared by every pixel and compute shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SamplerSlot {
    /// Depth comparison.
    CompareDepth = 0,
    /// Point filtering, clamped.
    PointClamp = 1,
    /// Point filtering, wrapped.
    PointWrap = 2,
    /// Bilinear filtering, clamped.
    BilinearClamp = 3,
    /// Bilinear filtering, wrapped.
    BilinearWrap = 4,
    /// Trilinear filtering, clamped.
    TrilinearClamp = 5,
    /// Anisotropic filtering, wrapped.
    AnisotropicWrap = 6,
}

impl SamplerSlot {
    /// Every slot, in slot order.
    pub const ALL: [SamplerSlot; 7] = [
        SamplerSlot::CompareDepth,
        SamplerSlot::PointClamp,
        SamplerSlot::PointWrap,
        SamplerSlot::BilinearClamp,
        SamplerSlot::BilinearWrap,
        SamplerSlot::TrilinearClamp,
        SamplerSlot::AnisotropicWrap,
    ];
}

/// The resources bound by [`FactoryGlobals`].
#[derive(Debug, Clone)]
pub struct GlobalBindings {
    /// Frame constants, bound to every stage.
    pub frame: Arc<ConstantBuffer>,
    /// Uber constants, bound to every stage.
    pub uber: Arc<ConstantBuffer>,
    /// Samplers indexed by [`SamplerSlot`].
    pub samplers: [Arc<Sampler>; 7],
}

/// [`GlobalShaderResources`] backed by the resource factory.
///
/// The factory swaps samplers in place when resolutions or anisotropy change,
/// so passes always see the current set.
#[derive(Debug)]
pub struct FactoryGlobals {
    bindings: RwLock<GlobalBindings>,
}

impl FactoryGlobals {
    /// Wraps the given bindings.
    pub fn new(bindings: GlobalBindings) -> Self {
        Self {
            bindings: RwLock::new(bindings),
        }
    }

    /// A copy of the current bindings.
    pub fn bindings(&self) -> GlobalBindings {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the sampler at `slot`.
    pub fn replace_sampler(&self, slot: SamplerSlot, sampler: Arc<Sampler>) {
        let mut bindings = self
            .bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        bindings.samplers[slot as usize] = sampler;
    }
}

impl GlobalShaderResources for FactoryGlobals {
    fn bind(&self, cmd: &mut CommandList) -> Result<(), RhiError> {
        let bindings = self.bindings();
        let all = ShaderScope::VERTEX | ShaderScope::PIXEL | ShaderScope::COMPUTE;
        cmd.set_constant_buffer(ConstantBufferSlot::Frame as u32, all, Some(&bindings.frame))?;
        cmd.set_constant_buffer(ConstantBufferSlot::Uber as u32, all, Some(&bindings.uber))?;

        let sampling = ShaderScope::PIXEL | ShaderScope::COMPUTE;
        for slot in SamplerSlot::ALL {
            cmd.set_sampler(slot as u32, sampling, Some(&bindings.samplers[slot as usize]))?;
        }
        Ok(())
    }
}
