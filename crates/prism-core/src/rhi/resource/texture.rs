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

//! Textures and their derived views.

use super::OwnedHandle;
use crate::rhi::common::{BackendHandle, Format, ResourceId};
use crate::rhi::error::ResourceError;
use crate::rhi::traits::RhiDevice;
use bitflags::bitflags;
use std::sync::Arc;

bitflags! {
    /// Capabilities of a texture, fixed at creation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureFlags: u32 {
        /// Usable as a color render target.
        const RT_COLOR = 1 << 0;
        /// Usable as a read-write depth-stencil target.
        const RT_DEPTH_STENCIL = 1 << 1;
        /// Usable as a read-only depth-stencil target.
        const RT_DEPTH_STENCIL_READ_ONLY = 1 << 2;
        /// Has a sampled view.
        const SRV = 1 << 3;
        /// Has a storage view.
        const UAV = 1 << 4;
        /// Has one sampled (and storage, with `UAV`) view per mip level.
        const PER_MIP_VIEW = 1 << 5;
        /// May be cleared outside of a render pass.
        const CAN_BE_CLEARED = 1 << 6;
    }
}

/// A descriptor for creating a texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    /// A debug label.
    pub name: String,
    /// Width of mip zero in pixels.
    pub width: u32,
    /// Height of mip zero in pixels.
    pub height: u32,
    /// Number of array slices.
    pub array_length: u32,
    /// Number of mip levels.
    pub mip_count: u32,
    /// Texel format.
    pub format: Format,
    /// Capabilities.
    pub flags: TextureFlags,
}

impl TextureDesc {
    /// A single-slice 2D texture.
    pub fn new_2d(
        name: &str,
        width: u32,
        height: u32,
        mip_count: u32,
        format: Format,
        flags: TextureFlags,
    ) -> Self {
        Self {
            name: name.to_owned(),
            width,
            height,
            array_length: 1,
            mip_count,
            format,
            flags,
        }
    }

    /// Checks that the flags and format describe a texture a backend can create.
    pub fn validate(&self) -> Result<(), ResourceError> {
        let fail = |msg: &str| {
            Err(ResourceError::InvalidDescriptor(format!(
                "texture '{}': {msg}",
                self.name
            )))
        };
        if self.width == 0 || self.height == 0 {
            return fail("zero-sized");
        }
        if self.array_length == 0 || self.mip_count == 0 {
            return fail("needs at least one slice and one mip");
        }
        let depth_flags = TextureFlags::RT_DEPTH_STENCIL | TextureFlags::RT_DEPTH_STENCIL_READ_ONLY;
        if self.flags.intersects(depth_flags) && !self.format.is_depth_stencil() {
            return fail("depth-stencil target with a color format");
        }
        if self.flags.intersects(TextureFlags::RT_COLOR | TextureFlags::UAV)
            && !self.format.is_color()
        {
            return fail("color or storage target with a non-color format");
        }
        if self.flags.contains(TextureFlags::PER_MIP_VIEW)
            && !self.flags.intersects(TextureFlags::SRV | TextureFlags::UAV)
        {
            return fail("per-mip views need a sampled or storage view");
        }
        Ok(())
    }
}

/// The backend views derived from a texture resource.
///
/// Per-slice vectors are indexed by array slice, per-mip vectors by mip level.
#[derive(Debug, Default)]
pub struct TextureViews {
    /// Sampled view of the whole mip chain.
    pub sampled: Option<OwnedHandle>,
    /// Storage view of mip zero.
    pub storage: Option<OwnedHandle>,
    /// Sampled view per mip level.
    pub sampled_per_mip: Vec<OwnedHandle>,
    /// Storage view per mip level.
    pub storage_per_mip: Vec<OwnedHandle>,
    /// Color render-target view per array slice.
    pub render_target: Vec<OwnedHandle>,
    /// Read-write depth-stencil view per array slice.
    pub depth_stencil: Vec<OwnedHandle>,
    /// Read-only depth-stencil view per array slice.
    pub depth_stencil_read_only: Vec<OwnedHandle>,
}

/// The handles a backend returns for a new texture.
#[derive(Debug)]
pub struct TextureAllocation {
    /// The texture resource itself.
    pub resource: OwnedHandle,
    /// Views derived from it.
    pub views: TextureViews,
}

/// A texture resource with its views.
#[derive(Debug)]
pub struct Texture {
    id: ResourceId,
    desc: TextureDesc,
    resource: Option<OwnedHandle>,
    views: TextureViews,
}

impl Texture {
    /// Validates `desc` and creates the texture on `device`.
    pub fn new(device: &dyn RhiDevice, desc: TextureDesc) -> Result<Arc<Self>, ResourceError> {
        desc.validate()?;
        let allocation = device.create_texture(&desc)?;
        log::debug!(
            "Created texture '{}' ({}x{}, {} mips, {:?})",
            desc.name,
            desc.width,
            desc.height,
            desc.mip_count,
            desc.format
        );
        Ok(Arc::new(Self {
            id: ResourceId::next(),
            desc,
            resource: Some(allocation.resource),
            views: allocation.views,
        }))
    }

    /// A texture whose backend object does not exist yet, e.g. while its data is
    /// still loading. Binding it binds nothing.
    pub fn unbacked(desc: TextureDesc) -> Arc<Self> {
        Arc::new(Self {
            id: ResourceId::next(),
            desc,
            resource: None,
            views: TextureViews::default(),
        })
    }

    /// The process-unique id.
    pub fn id(&self) -> ResourceId {
        self.id
    }
    /// The creation descriptor.
    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }
    /// The debug label.
    pub fn name(&self) -> &str {
        &self.desc.name
    }
    /// Width of mip zero.
    pub fn width(&self) -> u32 {
        self.desc.width
    }
    /// Height of mip zero.
    pub fn height(&self) -> u32 {
        self.desc.height
    }
    /// Number of array slices.
    pub fn array_length(&self) -> u32 {
        self.desc.array_length
    }
    /// Number of mip levels.
    pub fn mip_count(&self) -> u32 {
        self.desc.mip_count
    }
    /// Texel format.
    pub fn format(&self) -> Format {
        self.desc.format
    }
    /// Capabilities.
    pub fn flags(&self) -> TextureFlags {
        self.desc.flags
    }
    /// `true` once a backend object exists.
    pub fn is_backed(&self) -> bool {
        self.resource.is_some()
    }
    /// `true` if the texture exposes one view per mip level.
    pub fn has_per_mip_view(&self) -> bool {
        self.desc.flags.contains(TextureFlags::PER_MIP_VIEW)
    }
    /// `true` if the texture may be cleared outside of a render pass.
    pub fn can_be_cleared(&self) -> bool {
        self.desc.flags.contains(TextureFlags::CAN_BE_CLEARED)
    }

    /// The resource handle, `None` when unbacked.
    pub fn handle(&self) -> Option<BackendHandle> {
        self.resource.as_ref().map(OwnedHandle::handle)
    }
    /// Sampled view of the whole mip chain.
    pub fn sampled_view(&self) -> Option<BackendHandle> {
        self.views.sampled.as_ref().map(OwnedHandle::handle)
    }
    /// Storage view of mip zero.
    pub fn storage_view(&self) -> Option<BackendHandle> {
        self.views.storage.as_ref().map(OwnedHandle::handle)
    }
    /// Sampled view of a single mip.
    pub fn sampled_view_mip(&self, mip: u32) -> Option<BackendHandle> {
        self.views.sampled_per_mip.get(mip as usize).map(OwnedHandle::handle)
    }
    /// Storage view of a single mip.
    pub fn storage_view_mip(&self, mip: u32) -> Option<BackendHandle> {
        self.views.storage_per_mip.get(mip as usize).map(OwnedHandle::handle)
    }
    /// Number of per-mip storage views.
    pub fn storage_view_mip_count(&self) -> usize {
        self.views.storage_per_mip.len()
    }
    /// Color render-target view of an array slice.
    pub fn render_target_view(&self, slice: u32) -> Option<BackendHandle> {
        self.views.render_target.get(slice as usize).map(OwnedHandle::handle)
    }
    /// Depth-stencil view of an array slice.
    pub fn depth_stencil_view(&self, slice: u32, read_only: bool) -> Option<BackendHandle> {
        let views = if read_only {
            &self.views.depth_stencil_read_only
        } else {
            &self.views.depth_stencil
        };
        views.get(slice as usize).map(OwnedHandle::handle)
    }

    /// `true` if shape and format match, which makes a whole-resource copy legal.
    pub fn is_copy_compatible(&self, other: &Texture) -> bool {
        self.desc.format == other.desc.format
            && self.desc.width == other.desc.width
            && self.desc.height == other.desc.height
            && self.desc.array_length == other.desc.array_length
            && self.desc.mip_count == other.desc.mip_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::resource::test_support::CountingReleaser;

    fn desc(flags: TextureFlags, format: Format) -> TextureDesc {
        TextureDesc::new_2d("t", 64, 32, 3, format, flags)
    }

    #[test]
    fn depth_flags_need_depth_format() {
        assert!(desc(TextureFlags::RT_DEPTH_STENCIL, Format::R8G8B8A8Unorm)
            .validate()
            .is_err());
        assert!(desc(TextureFlags::RT_DEPTH_STENCIL | TextureFlags::SRV, Format::D32Float)
            .validate()
            .is_ok());
    }

    #[test]
    fn zero_size_is_rejected() {
        let mut d = desc(TextureFlags::SRV, Format::R8G8B8A8Unorm);
        d.width = 0;
        assert!(matches!(d.validate(), Err(ResourceError::InvalidDescriptor(_))));
    }

    #[test]
    fn per_mip_requires_a_view() {
        assert!(desc(TextureFlags::PER_MIP_VIEW, Format::R8G8B8A8Unorm)
            .validate()
            .is_err());
    }

    #[test]
    fn dropping_the_texture_releases_all_views() {
        let releaser = std::sync::Arc::new(CountingReleaser::default());
        let texture = Texture {
            id: ResourceId::next(),
            desc: desc(TextureFlags::SRV | TextureFlags::RT_COLOR, Format::R8G8B8A8Unorm),
            resource: Some(releaser.owned()),
            views: TextureViews {
                sampled: Some(releaser.owned()),
                render_target: vec![releaser.owned()],
                ..Default::default()
            },
        };
        assert!(texture.is_backed());
        assert!(texture.render_target_view(1).is_none());
        drop(texture);
        assert_eq!(releaser.released_count(), 3);
    }

    #[test]
    fn copy_compatibility_checks_every_field() {
        let a = Texture::unbacked(desc(TextureFlags::SRV, Format::R8G8B8A8Unorm));
        let b = Texture::unbacked(desc(TextureFlags::SRV, Format::R8G8B8A8Unorm));
        assert!(a.is_copy_compatible(&b));
        let mut other = desc(TextureFlags::SRV, Format::R8G8B8A8Unorm);
        other.mip_count = 1;
        assert!(!a.is_copy_compatible(&Texture::unbacked(other)));
        assert!(!a.is_backed());
    }
}
