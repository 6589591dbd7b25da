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

//! GPU layouts of the renderer's constant buffers.

use bytemuck::{Pod, Zeroable};

/// A column-major 4x4 matrix as uploaded to shaders.
pub type GpuMatrix = [[f32; 4]; 4];

/// The identity matrix.
pub const IDENTITY: GpuMatrix = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Per-frame constants.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameConstants {
    /// World to view.
    pub view: GpuMatrix,
    /// View to clip.
    pub projection: GpuMatrix,
    /// World to clip.
    pub view_projection: GpuMatrix,
    /// Camera position in `xyz`, delta time in `w`.
    pub camera_position_delta_time: [f32; 4],
    /// Render resolution in `xy`, output resolution in `zw`.
    pub resolutions: [f32; 4],
    /// Sub-pixel jitter of the projection.
    pub taa_jitter: [f32; 2],
    /// Frame counter.
    pub frame: u32,
    /// Elapsed time in seconds.
    pub time: f32,
}

impl Default for FrameConstants {
    fn default() -> Self {
        Self {
            view: IDENTITY,
            projection: IDENTITY,
            view_projection: IDENTITY,
            ..Zeroable::zeroed()
        }
    }
}

/// Per-draw constants shared by most passes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct UberConstants {
    /// Object to world.
    pub transform: GpuMatrix,
    /// Previous frame object to world, for velocity.
    pub transform_previous: GpuMatrix,
    /// Generic color parameter.
    pub color: [f32; 4],
    /// Resolution of the bound render target.
    pub resolution_rt: [f32; 2],
    /// Mip being processed by per-mip passes.
    pub mip_index: u32,
    /// Generic flags.
    pub options: u32,
}

/// Per-light constants.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightConstants {
    /// One matrix per cascade or cube face.
    pub view_projection: [GpuMatrix; 6],
    /// Intensity, range, cone angle, depth bias.
    pub intensity_range_angle_bias: [f32; 4],
    /// Light color.
    pub color: [f32; 4],
    /// World position.
    pub position: [f32; 4],
    /// World direction.
    pub direction: [f32; 4],
    /// Normal offset bias.
    pub normal_bias: f32,
    /// Light flags.
    pub options: u32,
    /// Keeps the layout a multiple of 16 bytes.
    pub padding: [u32; 2],
}

/// Per-material constants.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialConstants {
    /// Base color.
    pub albedo: [f32; 4],
    /// UV tiling in `xy`, offset in `zw`.
    pub tiling_offset: [f32; 4],
    /// Roughness, metalness, normal strength, height scale.
    pub roughness_metalness_normal_height: [f32; 4],
    /// Clearcoat, clearcoat roughness, anisotropy, sheen.
    pub clearcoat_anisotropy_sheen: [f32; 4],
    /// Material flags.
    pub properties: u32,
    /// Keeps the layout a multiple of 16 bytes.
    pub padding: [u32; 3],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_are_sixteen_byte_multiples() {
        for size in [
            std::mem::size_of::<FrameConstants>(),
            std::mem::size_of::<UberConstants>(),
            std::mem::size_of::<LightConstants>(),
            std::mem::size_of::<MaterialConstants>(),
        ] {
            assert_eq!(size % 16, 0, "size {size} is not a multiple of 16");
        }
    }

    #[test]
    fn frame_defaults_to_identity() {
        let frame = FrameConstants::default();
        assert_eq!(frame.view, IDENTITY);
        assert_eq!(frame.frame, 0);
    }
}
