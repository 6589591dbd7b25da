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

//! Shaders and vertex input layouts.
//!
//! Compiling shader source is up to the backend; these types only carry the
//! resulting handles and the metadata the command list needs.

use super::OwnedHandle;
use crate::rhi::common::{BackendHandle, ResourceId, ShaderStage};
use crate::rhi::error::ResourceError;
use crate::rhi::traits::RhiDevice;
use std::sync::Arc;

/// The data type of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// Two 32-bit floats.
    Float2,
    /// Three 32-bit floats.
    Float3,
    /// Four 32-bit floats.
    Float4,
    /// Four 8-bit unsigned normalized values.
    Unorm4,
}

impl VertexFormat {
    /// Size in bytes.
    pub fn size(self) -> u32 {
        match self {
            VertexFormat::Float2 => 8,
            VertexFormat::Float3 => 12,
            VertexFormat::Float4 => 16,
            VertexFormat::Unorm4 => 4,
        }
    }
}

/// One attribute of a vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Semantic name the shader binds to.
    pub semantic: String,
    /// Data type.
    pub format: VertexFormat,
    /// Byte offset inside the vertex.
    pub offset: u32,
}

/// A descriptor for creating an input layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLayoutDesc {
    /// A debug label.
    pub name: String,
    /// The attributes, in order.
    pub attributes: Vec<VertexAttribute>,
}

impl InputLayoutDesc {
    /// Builds a tightly packed layout from `(semantic, format)` pairs.
    pub fn packed(name: &str, attributes: &[(&str, VertexFormat)]) -> Self {
        let mut offset = 0;
        let attributes = attributes
            .iter()
            .map(|(semantic, format)| {
                let attribute = VertexAttribute {
                    semantic: (*semantic).to_owned(),
                    format: *format,
                    offset,
                };
                offset += format.size();
                attribute
            })
            .collect();
        Self {
            name: name.to_owned(),
            attributes,
        }
    }

    /// Size of one vertex in bytes.
    pub fn stride(&self) -> u32 {
        self.attributes
            .iter()
            .map(|a| a.offset + a.format.size())
            .max()
            .unwrap_or(0)
    }
}

/// A vertex input layout.
#[derive(Debug)]
pub struct InputLayout {
    id: ResourceId,
    desc: InputLayoutDesc,
    layout: OwnedHandle,
}

impl InputLayout {
    /// Creates an input layout on `device`.
    pub fn new(device: &dyn RhiDevice, desc: InputLayoutDesc) -> Result<Arc<Self>, ResourceError> {
        Ok(Arc::new(Self {
            id: ResourceId::next(),
            layout: device.create_input_layout(&desc)?,
            desc,
        }))
    }

    /// The process-unique id.
    pub fn id(&self) -> ResourceId {
        self.id
    }
    /// The creation descriptor.
    pub fn desc(&self) -> &InputLayoutDesc {
        &self.desc
    }
    /// The backend handle.
    pub fn handle(&self) -> BackendHandle {
        self.layout.handle()
    }
}

/// A descriptor for creating a shader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderDesc {
    /// A debug label, usually the source file.
    pub name: String,
    /// The stage the shader runs in.
    pub stage: ShaderStage,
    /// The entry point function.
    pub entry_point: String,
}

/// A compiled shader.
#[derive(Debug)]
pub struct Shader {
    id: ResourceId,
    desc: ShaderDesc,
    shader: OwnedHandle,
    input_layout: Option<Arc<InputLayout>>,
}

impl Shader {
    /// Creates a shader on `device`. Only vertex shaders may carry an input layout.
    pub fn new(
        device: &dyn RhiDevice,
        desc: ShaderDesc,
        input_layout: Option<Arc<InputLayout>>,
    ) -> Result<Arc<Self>, ResourceError> {
        if input_layout.is_some() && desc.stage != ShaderStage::Vertex {
            return Err(ResourceError::InvalidDescriptor(format!(
                "shader '{}' is not a vertex shader but has an input layout",
                desc.name
            )));
        }
        Ok(Arc::new(Self {
            id: ResourceId::next(),
            shader: device.create_shader(&desc)?,
            desc,
            input_layout,
        }))
    }

    /// The process-unique id.
    pub fn id(&self) -> ResourceId {
        self.id
    }
    /// The debug label.
    pub fn name(&self) -> &str {
        &self.desc.name
    }
    /// The stage.
    pub fn stage(&self) -> ShaderStage {
        self.desc.stage
    }
    /// The backend handle.
    pub fn handle(&self) -> BackendHandle {
        self.shader.handle()
    }
    /// The vertex input layout, if any.
    pub fn input_layout(&self) -> Option<&Arc<InputLayout>> {
        self.input_layout.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_layout_offsets() {
        let desc = InputLayoutDesc::packed(
            "pos_uv_nor",
            &[
                ("POSITION", VertexFormat::Float3),
                ("TEXCOORD", VertexFormat::Float2),
                ("NORMAL", VertexFormat::Float3),
            ],
        );
        let offsets: Vec<_> = desc.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 20]);
        assert_eq!(desc.stride(), 32);
    }
}
