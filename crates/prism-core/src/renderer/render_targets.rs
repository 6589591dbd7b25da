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

//! The renderer's render targets and how they are sized.

use crate::rhi::common::Format;
use crate::rhi::resource::{TextureDesc, TextureFlags};

/// A width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Creates a resolution.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Half the resolution, never below one pixel.
    pub fn half(self) -> Self {
        Self::new((self.width / 2).max(1), (self.height / 2).max(1))
    }
}

/// The sizing rule a render target follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTargetGroup {
    /// Follows the internal render resolution.
    Render,
    /// Follows the output (display) resolution.
    Output,
    /// Fixed size.
    Fixed,
    /// Depends on both resolutions.
    Dynamic,
}

/// Every render target the renderer owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RenderTargetId {
    /// HDR frame at render resolution.
    FrameRender,
    /// Ping-pong partner of `FrameRender`.
    FrameRender2,
    /// G-buffer albedo.
    GbufferAlbedo,
    /// G-buffer normals.
    GbufferNormal,
    /// G-buffer material parameters.
    GbufferMaterial,
    /// G-buffer screen-space velocity.
    GbufferVelocity,
    /// G-buffer depth.
    GbufferDepth,
    /// Diffuse light accumulation.
    LightDiffuse,
    /// Diffuse light of transparent surfaces.
    LightDiffuseTransparent,
    /// Specular light accumulation.
    LightSpecular,
    /// Specular light of transparent surfaces.
    LightSpecularTransparent,
    /// Volumetric light.
    LightVolumetric,
    /// Ambient occlusion.
    Ssao,
    /// Screen-space reflections.
    Ssr,
    /// Half resolution depth of field.
    DofHalf,
    /// Ping-pong partner of `DofHalf`.
    DofHalf2,
    /// LDR frame at output resolution.
    FrameOutput,
    /// Ping-pong partner of `FrameOutput`.
    FrameOutput2,
    /// Bloom mip chain.
    Bloom,
    /// Pre-integrated specular BRDF.
    BrdfSpecularLut,
    /// Blur scratch target at the larger of both resolutions.
    Blur,
}

impl RenderTargetId {
    /// Every render target, in creation order.
    pub const ALL: [RenderTargetId; 21] = [
        RenderTargetId::FrameRender,
        RenderTargetId::FrameRender2,
        RenderTargetId::GbufferAlbedo,
        RenderTargetId::GbufferNormal,
        RenderTargetId::GbufferMaterial,
        RenderTargetId::GbufferVelocity,
        RenderTargetId::GbufferDepth,
        RenderTargetId::LightDiffuse,
        RenderTargetId::LightDiffuseTransparent,
        RenderTargetId::LightSpecular,
        RenderTargetId::LightSpecularTransparent,
        RenderTargetId::LightVolumetric,
        RenderTargetId::Ssao,
        RenderTargetId::Ssr,
        RenderTargetId::DofHalf,
        RenderTargetId::DofHalf2,
        RenderTargetId::FrameOutput,
        RenderTargetId::FrameOutput2,
        RenderTargetId::Bloom,
        RenderTargetId::BrdfSpecularLut,
        RenderTargetId::Blur,
    ];

    /// The sizing rule of this target.
    pub fn group(self) -> RenderTargetGroup {
        use RenderTargetId::*;
        match self {
            FrameOutput | FrameOutput2 | Bloom => RenderTargetGroup::Output,
            BrdfSpecularLut => RenderTargetGroup::Fixed,
            Blur => RenderTargetGroup::Dynamic,
            _ => RenderTargetGroup::Render,
        }
    }

    /// The debug name of the texture.
    pub fn name(self) -> &'static str {
        use RenderTargetId::*;
        match self {
            FrameRender => "rt_frame_render",
            FrameRender2 => "rt_frame_render_2",
            GbufferAlbedo => "rt_gbuffer_albedo",
            GbufferNormal => "rt_gbuffer_normal",
            GbufferMaterial => "rt_gbuffer_material",
            GbufferVelocity => "rt_gbuffer_velocity",
            GbufferDepth => "rt_gbuffer_depth",
            LightDiffuse => "rt_light_diffuse",
            LightDiffuseTransparent => "rt_light_diffuse_transparent",
            LightSpecular => "rt_light_specular",
            LightSpecularTransparent => "rt_light_specular_transparent",
            LightVolumetric => "rt_light_volumetric",
            Ssao => "rt_ssao",
            Ssr => "rt_ssr",
            DofHalf => "rt_dof_half",
            DofHalf2 => "rt_dof_half_2",
            FrameOutput => "rt_frame_output",
            FrameOutput2 => "rt_frame_output_2",
            Bloom => "rt_bloom",
            BrdfSpecularLut => "rt_brdf_specular_lut",
            Blur => "rt_blur",
        }
    }

    /// The texture this target is created as, for the given resolutions.
    pub fn describe(self, render: Resolution, output: Resolution) -> TextureDesc {
        use RenderTargetId::*;
        type F = TextureFlags;

        let light = F::UAV | F::SRV | F::CAN_BE_CLEARED;
        let frame = F::RT_COLOR | F::UAV | F::SRV;
        let gbuffer = F::RT_COLOR | F::SRV;
        let mip_16_render = mip_count_to(render.width, render.height, 16);
        let mip_16_output = mip_count_to(output.width, output.height, 16);

        let (size, mips, format, flags) = match self {
            FrameRender | FrameRender2 => (
                render,
                mip_16_render,
                Format::R11G11B10Float,
                frame | F::PER_MIP_VIEW,
            ),
            GbufferAlbedo | GbufferMaterial => (render, 1, Format::R8G8B8A8Unorm, gbuffer),
            GbufferNormal => (render, 1, Format::R16G16B16A16Float, gbuffer),
            GbufferVelocity => (render, 1, Format::R16G16Float, gbuffer),
            GbufferDepth => (
                render,
                1,
                Format::D32Float,
                F::RT_DEPTH_STENCIL | F::RT_DEPTH_STENCIL_READ_ONLY | F::SRV,
            ),
            LightDiffuse | LightDiffuseTransparent | LightSpecular | LightSpecularTransparent
            | LightVolumetric => (render, 1, Format::R11G11B10Float, light),
            Ssao => (render, 1, Format::R16G16B16A16Snorm, F::UAV | F::SRV),
            Ssr => (
                render,
                mip_16_render.saturating_sub(1).max(1),
                Format::R16G16B16A16Float,
                F::UAV | F::SRV | F::PER_MIP_VIEW,
            ),
            DofHalf | DofHalf2 => (render.half(), 1, Format::R16G16B16A16Float, F::UAV | F::SRV),
            FrameOutput | FrameOutput2 => (output, 1, Format::R11G11B10Float, frame),
            Bloom => (
                output,
                mip_16_output,
                Format::R11G11B10Float,
                F::UAV | F::SRV | F::PER_MIP_VIEW,
            ),
            BrdfSpecularLut => (
                Resolution::new(400, 400),
                1,
                Format::R8G8Unorm,
                F::UAV | F::SRV,
            ),
            Blur => {
                let larger = output.width > render.width && output.height > render.height;
                let size = if larger { output } else { render };
                (size, 1, Format::R16G16B16A16Float, F::UAV | F::SRV)
            }
        };

        TextureDesc::new_2d(self.name(), size.width, size.height, mips, format, flags)
    }
}

/// How many mips it takes to scale `width` x `height` down to roughly `min_size`
/// pixels: halving continues while both halves stay above `min_size`.
pub fn mip_count_to(width: u32, height: u32, min_size: u32) -> u32 {
    let (mut width, mut height) = (width, height);
    let mut count = 1;
    while width / 2 > min_size && height / 2 > min_size {
        width /= 2;
        height /= 2;
        count += 1;
    }
    count
}
