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

//! Vertex, index, constant and structured buffers.

use super::OwnedHandle;
use crate::rhi::common::{BackendHandle, Format, ResourceId};
use crate::rhi::error::ResourceError;
use crate::rhi::traits::{RhiDevice, RhiDeviceContext};
use bytemuck::Pod;
use std::sync::Arc;

/// What a buffer is bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Per-vertex input data.
    Vertex,
    /// 16- or 32-bit indices.
    Index,
    /// Shader constants.
    Constant,
    /// Read/write structured elements, bound through a storage view.
    Structured,
}

/// A descriptor for creating a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDesc {
    /// A debug label.
    pub name: String,
    /// What the buffer is bound as.
    pub kind: BufferKind,
    /// Size in bytes.
    pub size: u64,
    /// Size of one element in bytes.
    pub stride: u32,
    /// `true` if the CPU rewrites the buffer frequently.
    pub dynamic: bool,
}

fn create(device: &dyn RhiDevice, desc: &BufferDesc) -> Result<OwnedHandle, ResourceError> {
    if desc.size == 0 {
        return Err(ResourceError::InvalidDescriptor(format!(
            "buffer '{}' has zero size",
            desc.name
        )));
    }
    device.create_buffer(desc)
}

fn write(
    ctx: &mut dyn RhiDeviceContext,
    name: &str,
    handle: BackendHandle,
    capacity: u64,
    bytes: &[u8],
) -> Result<(), ResourceError> {
    if bytes.len() as u64 > capacity {
        return Err(ResourceError::InvalidDescriptor(format!(
            "{} bytes do not fit into buffer '{name}' of {capacity} bytes",
            bytes.len()
        )));
    }
    ctx.update_buffer(handle, bytes)
}

/// A buffer of vertices.
#[derive(Debug)]
pub struct VertexBuffer {
    id: ResourceId,
    name: String,
    buffer: OwnedHandle,
    stride: u32,
    vertex_count: u32,
}

impl VertexBuffer {
    /// Creates a vertex buffer large enough for `vertex_count` vertices of `stride` bytes.
    pub fn new(
        device: &dyn RhiDevice,
        name: &str,
        stride: u32,
        vertex_count: u32,
    ) -> Result<Arc<Self>, ResourceError> {
        let desc = BufferDesc {
            name: name.to_owned(),
            kind: BufferKind::Vertex,
            size: u64::from(stride) * u64::from(vertex_count),
            stride,
            dynamic: false,
        };
        Ok(Arc::new(Self {
            id: ResourceId::next(),
            name: desc.name.clone(),
            buffer: create(device, &desc)?,
            stride,
            vertex_count,
        }))
    }

    /// Uploads vertices.
    pub fn update<T: Pod>(
        &self,
        ctx: &mut dyn RhiDeviceContext,
        vertices: &[T],
    ) -> Result<(), ResourceError> {
        write(
            ctx,
            &self.name,
            self.handle(),
            u64::from(self.stride) * u64::from(self.vertex_count),
            bytemuck::cast_slice(vertices),
        )
    }

    /// The process-unique id.
    pub fn id(&self) -> ResourceId {
        self.id
    }
    /// The backend handle.
    pub fn handle(&self) -> BackendHandle {
        self.buffer.handle()
    }
    /// Size of one vertex in bytes.
    pub fn stride(&self) -> u32 {
        self.stride
    }
    /// Number of vertices.
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}

/// A buffer of 16- or 32-bit indices.
#[derive(Debug)]
pub struct IndexBuffer {
    id: ResourceId,
    name: String,
    buffer: OwnedHandle,
    format: Format,
    index_count: u32,
}

impl IndexBuffer {
    /// Creates an index buffer of `index_count` indices.
    pub fn new(
        device: &dyn RhiDevice,
        name: &str,
        is_16bit: bool,
        index_count: u32,
    ) -> Result<Arc<Self>, ResourceError> {
        let format = if is_16bit {
            Format::R16Uint
        } else {
            Format::R32Uint
        };
        let stride = format.bytes_per_texel();
        let desc = BufferDesc {
            name: name.to_owned(),
            kind: BufferKind::Index,
            size: u64::from(stride) * u64::from(index_count),
            stride,
            dynamic: false,
        };
        Ok(Arc::new(Self {
            id: ResourceId::next(),
            name: desc.name.clone(),
            buffer: create(device, &desc)?,
            format,
            index_count,
        }))
    }

    /// Uploads indices. `T` must match the index width.
    pub fn update<T: Pod>(
        &self,
        ctx: &mut dyn RhiDeviceContext,
        indices: &[T],
    ) -> Result<(), ResourceError> {
        if std::mem::size_of::<T>() as u32 != self.format.bytes_per_texel() {
            return Err(ResourceError::InvalidDescriptor(format!(
                "index type does not match the format of '{}'",
                self.name
            )));
        }
        write(
            ctx,
            &self.name,
            self.handle(),
            u64::from(self.format.bytes_per_texel()) * u64::from(self.index_count),
            bytemuck::cast_slice(indices),
        )
    }

    /// The process-unique id.
    pub fn id(&self) -> ResourceId {
        self.id
    }
    /// The backend handle.
    pub fn handle(&self) -> BackendHandle {
        self.buffer.handle()
    }
    /// `R16Uint` or `R32Uint`.
    pub fn format(&self) -> Format {
        self.format
    }
    /// `true` for 16-bit indices.
    pub fn is_16bit(&self) -> bool {
        self.format == Format::R16Uint
    }
    /// Number of indices.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

/// A buffer of shader constants.
#[derive(Debug)]
pub struct ConstantBuffer {
    id: ResourceId,
    name: String,
    buffer: OwnedHandle,
    size: u32,
    dynamic: bool,
}

impl ConstantBuffer {
    /// Creates a constant buffer sized for `T`.
    pub fn new<T: Pod>(
        device: &dyn RhiDevice,
        name: &str,
        dynamic: bool,
    ) -> Result<Arc<Self>, ResourceError> {
        let size = std::mem::size_of::<T>() as u32;
        let desc = BufferDesc {
            name: name.to_owned(),
            kind: BufferKind::Constant,
            size: u64::from(size),
            stride: size,
            dynamic,
        };
        Ok(Arc::new(Self {
            id: ResourceId::next(),
            name: desc.name.clone(),
            buffer: create(device, &desc)?,
            size,
            dynamic,
        }))
    }

    /// Uploads a new value.
    pub fn update<T: Pod>(
        &self,
        ctx: &mut dyn RhiDeviceContext,
        value: &T,
    ) -> Result<(), ResourceError> {
        write(
            ctx,
            &self.name,
            self.handle(),
            u64::from(self.size),
            bytemuck::bytes_of(value),
        )
    }

    /// The process-unique id.
    pub fn id(&self) -> ResourceId {
        self.id
    }
    /// The backend handle.
    pub fn handle(&self) -> BackendHandle {
        self.buffer.handle()
    }
    /// The debug label.
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Size in bytes.
    pub fn size(&self) -> u32 {
        self.size
    }
    /// `true` if the buffer is rewritten frequently.
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }
}

/// A read/write buffer of structured elements.
#[derive(Debug)]
pub struct StructuredBuffer {
    id: ResourceId,
    name: String,
    buffer: OwnedHandle,
    stride: u32,
    element_count: u32,
}

impl StructuredBuffer {
    /// Creates a structured buffer of `element_count` elements of `stride` bytes.
    pub fn new(
        device: &dyn RhiDevice,
        name: &str,
        stride: u32,
        element_count: u32,
    ) -> Result<Arc<Self>, ResourceError> {
        let desc = BufferDesc {
            name: name.to_owned(),
            kind: BufferKind::Structured,
            size: u64::from(stride) * u64::from(element_count),
            stride,
            dynamic: false,
        };
        Ok(Arc::new(Self {
            id: ResourceId::next(),
            name: desc.name.clone(),
            buffer: create(device, &desc)?,
            stride,
            element_count,
        }))
    }

    /// Uploads elements.
    pub fn update<T: Pod>(
        &self,
        ctx: &mut dyn RhiDeviceContext,
        elements: &[T],
    ) -> Result<(), ResourceError> {
        write(
            ctx,
            &self.name,
            self.handle(),
            u64::from(self.stride) * u64::from(self.element_count),
            bytemuck::cast_slice(elements),
        )
    }

    /// The process-unique id.
    pub fn id(&self) -> ResourceId {
        self.id
    }
    /// The backend handle of the storage view.
    pub fn handle(&self) -> BackendHandle {
        self.buffer.handle()
    }
    /// Size of one element in bytes.
    pub fn stride(&self) -> u32 {
        self.stride
    }
    /// Number of elements.
    pub fn element_count(&self) -> u32 {
        self.element_count
    }
}
