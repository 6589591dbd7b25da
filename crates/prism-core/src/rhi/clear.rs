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

//! Clear policies for render targets and storage textures.

use crate::rhi::common::Color;
use bitflags::bitflags;

/// What to do with the previous contents of a target at the start of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ClearValue<T> {
    /// Keep the existing contents. No clear call is issued.
    #[default]
    Load,
    /// The contents may become undefined. No clear call is issued.
    DontCare,
    /// Clear to the given value with exactly one clear call.
    Value(T),
}

impl<T: Copy> ClearValue<T> {
    /// Returns the explicit value, if any.
    pub fn value(&self) -> Option<T> {
        match self {
            ClearValue::Value(v) => Some(*v),
            ClearValue::Load | ClearValue::DontCare => None,
        }
    }

    /// Returns `true` if this policy issues a clear call.
    pub fn is_explicit(&self) -> bool {
        matches!(self, ClearValue::Value(_))
    }
}

impl<T> From<T> for ClearValue<T> {
    fn from(value: T) -> Self {
        ClearValue::Value(value)
    }
}

bitflags! {
    /// Which aspects of a depth-stencil view a clear call touches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u8 {
        /// Clear the depth aspect.
        const DEPTH = 1 << 0;
        /// Clear the stencil aspect.
        const STENCIL = 1 << 1;
    }
}

impl ClearFlags {
    /// Builds the flag set from independent depth and stencil policies.
    ///
    /// Only explicit values contribute a flag, so `depth = Value, stencil = Load`
    /// yields `DEPTH` alone.
    pub fn from_values(depth: &ClearValue<f32>, stencil: &ClearValue<u32>) -> Self {
        let mut flags = ClearFlags::empty();
        if depth.is_explicit() {
            flags |= ClearFlags::DEPTH;
        }
        if stencil.is_explicit() {
            flags |= ClearFlags::STENCIL;
        }
        flags
    }
}

/// A standalone clear of one texture, outside of a render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureClear {
    /// Array slice of the color render-target view to clear.
    pub color_index: u32,
    /// Array slice of the depth-stencil view to clear.
    pub depth_stencil_index: u32,
    /// Clear through the storage (read/write) views instead of the render-target views.
    pub storage: bool,
    /// Color policy.
    pub color: ClearValue<Color>,
    /// Depth policy.
    pub depth: ClearValue<f32>,
    /// Stencil policy.
    pub stencil: ClearValue<u32>,
}

impl Default for TextureClear {
    fn default() -> Self {
        Self {
            color_index: 0,
            depth_stencil_index: 0,
            storage: false,
            color: ClearValue::Load,
            depth: ClearValue::Load,
            stencil: ClearValue::Load,
        }
    }
}

impl TextureClear {
    /// A color clear of slice zero.
    pub fn color(color: Color) -> Self {
        Self {
            color: ClearValue::Value(color),
            ..Default::default()
        }
    }

    /// A float clear through the storage views.
    pub fn storage(color: Color) -> Self {
        Self {
            storage: true,
            color: ClearValue::Value(color),
            ..Default::default()
        }
    }

    /// A depth and/or stencil clear of slice zero.
    pub fn depth_stencil(depth: ClearValue<f32>, stencil: ClearValue<u32>) -> Self {
        Self {
            depth,
            stencil,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_explicit_values_produce_flags() {
        assert_eq!(
            ClearFlags::from_values(&ClearValue::Value(0.0), &ClearValue::Load),
            ClearFlags::DEPTH
        );
        assert_eq!(
            ClearFlags::from_values(&ClearValue::DontCare, &ClearValue::Value(0)),
            ClearFlags::STENCIL
        );
        assert_eq!(
            ClearFlags::from_values(&ClearValue::Value(1.0), &ClearValue::Value(0)),
            ClearFlags::DEPTH | ClearFlags::STENCIL
        );
        assert!(ClearFlags::from_values(&ClearValue::Load, &ClearValue::DontCare).is_empty());
    }

    #[test]
    fn clear_value_accessors() {
        let load: ClearValue<Color> = ClearValue::Load;
        assert_eq!(load.value(), None);
        assert_eq!(ClearValue::from(Color::WHITE).value(), Some(Color::WHITE));
        assert!(!ClearValue::<f32>::DontCare.is_explicit());
    }
}
