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

//! Texture samplers.

use super::OwnedHandle;
use super::state::ComparisonFunction;
use crate::rhi::common::{BackendHandle, ResourceId};
use crate::rhi::error::ResourceError;
use crate::rhi::traits::RhiDevice;
use std::sync::Arc;

/// Texel filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    /// Nearest texel.
    Nearest,
    /// Linear blend of neighbouring texels.
    Linear,
}

/// What happens outside the `[0, 1]` coordinate range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    /// Repeat the texture.
    Wrap,
    /// Repeat, mirroring every other tile.
    Mirror,
    /// Clamp to the edge texel.
    Clamp,
    /// Use the border color.
    Border,
}

/// A descriptor for creating a sampler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerDesc {
    /// Minification filter.
    pub filter_min: Filter,
    /// Magnification filter.
    pub filter_mag: Filter,
    /// Filter between mip levels.
    pub filter_mip: Filter,
    /// Address mode for all coordinates.
    pub address_mode: AddressMode,
    /// Comparison used when `comparison_enabled` is set.
    pub comparison: ComparisonFunction,
    /// Maximum anisotropy. Zero disables anisotropic filtering.
    pub anisotropy: u32,
    /// `true` for comparison (shadow) samplers.
    pub comparison_enabled: bool,
    /// Bias added to the computed mip level.
    pub mip_lod_bias: f32,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            filter_min: Filter::Linear,
            filter_mag: Filter::Linear,
            filter_mip: Filter::Nearest,
            address_mode: AddressMode::Clamp,
            comparison: ComparisonFunction::Always,
            anisotropy: 0,
            comparison_enabled: false,
            mip_lod_bias: 0.0,
        }
    }
}

/// A texture sampler.
#[derive(Debug)]
pub struct Sampler {
    id: ResourceId,
    desc: SamplerDesc,
    sampler: OwnedHandle,
}

impl Sampler {
    /// Creates a sampler on `device`.
    pub fn new(device: &dyn RhiDevice, desc: SamplerDesc) -> Result<Arc<Self>, ResourceError> {
        Ok(Arc::new(Self {
            id: ResourceId::next(),
            sampler: device.create_sampler(&desc)?,
            desc,
        }))
    }

    /// The process-unique id.
    pub fn id(&self) -> ResourceId {
        self.id
    }
    /// The creation descriptor.
    pub fn desc(&self) -> &SamplerDesc {
        &self.desc
    }
    /// The backend handle.
    pub fn handle(&self) -> BackendHandle {
        self.sampler.handle()
    }
}
