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

//! Plain data types shared by every part of the RHI.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

/// The maximum number of simultaneously bound color render targets.
pub const MAX_RENDER_TARGETS: usize = 8;
/// The maximum number of texture views a single `set_texture` call may bind.
pub const MAX_TEXTURE_VIEWS: usize = 12;
/// The number of storage (read/write) slots cleared after every dispatch.
pub const MAX_STORAGE_SLOTS: usize = 8;
/// The number of constant buffer slots per shader stage.
pub const MAX_CONSTANT_BUFFER_SLOTS: usize = 14;
/// The number of sampler slots per shader stage.
pub const MAX_SAMPLER_SLOTS: usize = 16;
/// The number of sampled texture slots per shader stage.
pub const MAX_SAMPLED_SLOTS: usize = 128;
/// The number of vertex buffer input slots.
pub const MAX_VERTEX_BUFFER_SLOTS: usize = 16;

/// An opaque handle to an object living inside the graphics backend.
///
/// The RHI never interprets the value; it only compares handles to decide whether
/// a piece of state is already bound. "Nothing bound" is expressed as
/// `Option<BackendHandle>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendHandle(NonZeroU64);

impl BackendHandle {
    /// Wraps a raw backend value. Returns `None` for zero, which backends use as "null".
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Returns the raw backend value.
    pub fn raw(self) -> u64 {
        self.0.get()
    }
}

/// A process-unique identity for a resource object.
///
/// Two distinct resource objects never share an id, even when they wrap
/// resources of identical shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u64);

impl ResourceId {
    /// Allocates the next free id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A linear RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    /// Red channel.
    pub r: f32,
    /// Green channel.
    pub g: f32,
    /// Blue channel.
    pub b: f32,
    /// Alpha channel.
    pub a: f32,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    /// Opaque black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Creates a new color from its components.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Returns the color as an `[r, g, b, a]` array, the layout backends expect.
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// The region of the render target that rasterization maps into.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    /// Left edge in pixels.
    pub x: f32,
    /// Top edge in pixels.
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Minimum depth, usually `0.0`.
    pub depth_min: f32,
    /// Maximum depth, usually `1.0`.
    pub depth_max: f32,
}

impl Viewport {
    /// Creates a viewport covering `width` x `height` pixels with the full depth range.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            depth_min: 0.0,
            depth_max: 1.0,
        }
    }

    /// A viewport is defined once it covers a non-empty area.
    pub fn is_defined(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// A scissor rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rectangle {
    /// Left edge.
    pub left: i32,
    /// Top edge.
    pub top: i32,
    /// Right edge (exclusive).
    pub right: i32,
    /// Bottom edge (exclusive).
    pub bottom: i32,
}

impl Rectangle {
    /// Creates a new rectangle.
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Returns `true` if the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }
}

/// How vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Not specified. The command list leaves the device topology untouched.
    #[default]
    Unknown,
    /// Every three vertices form a triangle.
    TriangleList,
    /// Each vertex after the first two forms a triangle with the previous two.
    TriangleStrip,
    /// Every two vertices form a line.
    LineList,
    /// Each vertex is a point.
    PointList,
}

/// A single programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// The vertex stage.
    Vertex,
    /// The pixel (fragment) stage.
    Pixel,
    /// The compute stage.
    Compute,
}

impl ShaderStage {
    /// All stages, in binding order.
    pub const ALL: [ShaderStage; 3] = [ShaderStage::Vertex, ShaderStage::Pixel, ShaderStage::Compute];

    /// Index of the stage into per-stage arrays.
    pub const fn index(self) -> usize {
        match self {
            ShaderStage::Vertex => 0,
            ShaderStage::Pixel => 1,
            ShaderStage::Compute => 2,
        }
    }
}

bitflags! {
    /// The set of shader stages a binding call applies to.
    ///
    /// The same resource may be bound to several stages at once; the dirty check
    /// runs independently for every stage in the scope.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderScope: u8 {
        /// The vertex stage.
        const VERTEX = 1 << 0;
        /// The pixel stage.
        const PIXEL = 1 << 1;
        /// The compute stage.
        const COMPUTE = 1 << 2;
    }
}

impl ShaderScope {
    /// Returns the individual stages contained in this scope.
    pub fn stages(self) -> impl Iterator<Item = ShaderStage> {
        ShaderStage::ALL
            .into_iter()
            .filter(move |stage| self.contains(ShaderScope::from(*stage)))
    }
}

impl From<ShaderStage> for ShaderScope {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => ShaderScope::VERTEX,
            ShaderStage::Pixel => ShaderScope::PIXEL,
            ShaderStage::Compute => ShaderScope::COMPUTE,
        }
    }
}

/// Texel, depth and index formats understood by the RHI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// 8-bit red/green, unsigned normalized.
    R8G8Unorm,
    /// 8-bit RGBA, unsigned normalized.
    R8G8B8A8Unorm,
    /// Packed 11/11/10-bit float.
    R11G11B10Float,
    /// 16-bit red/green float.
    R16G16Float,
    /// 16-bit RGBA float.
    R16G16B16A16Float,
    /// 16-bit RGBA, signed normalized.
    R16G16B16A16Snorm,
    /// 32-bit RGBA float.
    R32G32B32A32Float,
    /// 32-bit float depth.
    D32Float,
    /// 32-bit float depth with 8-bit stencil.
    D32FloatS8X24Uint,
    /// 16-bit unsigned index.
    R16Uint,
    /// 32-bit unsigned index.
    R32Uint,
}

impl Format {
    /// Returns `true` for formats that carry depth (and possibly stencil).
    pub fn is_depth_stencil(self) -> bool {
        matches!(self, Format::D32Float | Format::D32FloatS8X24Uint)
    }

    /// Returns `true` for color formats usable as render or storage targets.
    pub fn is_color(self) -> bool {
        !self.is_depth_stencil() && !matches!(self, Format::R16Uint | Format::R32Uint)
    }

    /// Size of one texel (or index) in bytes.
    pub fn bytes_per_texel(self) -> u32 {
        match self {
            Format::R16Uint | Format::R8G8Unorm => 2,
            Format::R8G8B8A8Unorm
            | Format::R11G11B10Float
            | Format::R16G16Float
            | Format::D32Float
            | Format::R32Uint => 4,
            Format::R16G16B16A16Float | Format::R16G16B16A16Snorm | Format::D32FloatS8X24Uint => 8,
            Format::R32G32B32A32Float => 16,
        }
    }
}

/// Whether the command list compares requested state against the live device
/// state or against its own bound-state cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateQueryMode {
    /// Query the device before every set. Tolerates state changed behind the
    /// command list's back.
    #[default]
    Live,
    /// Trust the command list's cache. Used by backends that cannot read state back.
    CacheOnly,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_handle_zero_is_null() {
        assert!(BackendHandle::new(0).is_none());
        assert_eq!(BackendHandle::new(7).map(BackendHandle::raw), Some(7));
    }

    #[test]
    fn resource_ids_are_unique() {
        let a = ResourceId::next();
        let b = ResourceId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn shader_scope_expands_to_stages() {
        let scope = ShaderScope::VERTEX | ShaderScope::COMPUTE;
        let stages: Vec<_> = scope.stages().collect();
        assert_eq!(stages, vec![ShaderStage::Vertex, ShaderStage::Compute]);
        assert_eq!(ShaderScope::empty().stages().count(), 0);
    }

    #[test]
    fn viewport_definition() {
        assert!(!Viewport::default().is_defined());
        assert!(Viewport::new(0.0, 0.0, 1920.0, 1080.0).is_defined());
    }

    #[test]
    fn format_classification() {
        assert!(Format::D32Float.is_depth_stencil());
        assert!(!Format::D32Float.is_color());
        assert!(Format::R11G11B10Float.is_color());
        assert!(!Format::R16Uint.is_color());
    }
}
