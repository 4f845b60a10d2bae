//! Creation of every GPU resource the renderer consumes.
//!
//! The factory only borrows the device. It keeps no state of its own, so it can be created
//! wherever a [`GraphicsDevice`] is reachable.

use crate::rendering::resources::buffer::{
    Buffer, BufferError, ConstantBuffer, IndexBuffer, InvalidBufferSizeErr, VertexBuffer,
};
use crate::rendering::resources::mesh::{
    CreateIndexBufferFailedErr, CreateVertexBufferFailedErr, Mesh, MeshDesc, MeshError,
};
use crate::rendering::resources::shader::{Shader, ShaderError, ShaderKind};
use crate::rendering::resources::texture::{Texture2D, Texture2DDesc, TextureError};
use crate::rendering::{ErrorCode, GraphicsDevice};
use bytemuck::Pod;
use snafu::ResultExt;
use std::fs;
use std::path::Path;
use wgpu::BufferUsages;

#[derive(Debug, Copy, Clone)]
pub struct ResourceFactory<'a> {
    device: &'a GraphicsDevice,
}

impl<'a> ResourceFactory<'a> {
    pub fn new(device: &'a GraphicsDevice) -> Self {
        ResourceFactory { device }
    }

    #[inline]
    pub fn device(&self) -> &'a GraphicsDevice {
        self.device
    }

    /// Creates a vertex buffer of `count * stride` bytes taken from the start of `data`.
    pub fn create_vertex_buffer(
        &self,
        data: &[u8],
        count: u32,
        stride: u32,
        dynamic: bool,
    ) -> Result<VertexBuffer, BufferError> {
        let size = count as usize * stride as usize;
        if stride == 0 || count == 0 {
            return InvalidBufferSizeErr {
                code: ErrorCode::INVALID_ARGUMENT,
                message: format!("{count} vertices of {stride} bytes"),
            }
            .fail();
        }
        if data.len() < size {
            return InvalidBufferSizeErr {
                code: ErrorCode::INVALID_ARGUMENT,
                message: format!("{} bytes given for {count} vertices of {stride} bytes", data.len()),
            }
            .fail();
        }

        let buffer = Buffer::create(
            self.device,
            "Vertex Buffer",
            &data[..size],
            BufferUsages::VERTEX,
            dynamic,
        )?;

        Ok(VertexBuffer::new(buffer, count, stride))
    }

    /// Typed convenience over [`ResourceFactory::create_vertex_buffer`].
    pub fn create_vertex_buffer_from<V: Pod>(
        &self,
        vertices: &[V],
        dynamic: bool,
    ) -> Result<VertexBuffer, BufferError> {
        self.create_vertex_buffer(
            bytemuck::cast_slice(vertices),
            vertices.len() as u32,
            size_of::<V>() as u32,
            dynamic,
        )
    }

    pub fn create_index_buffer(
        &self,
        indices: &[u32],
        dynamic: bool,
    ) -> Result<IndexBuffer, BufferError> {
        let buffer = Buffer::create(
            self.device,
            "Index Buffer",
            bytemuck::cast_slice(indices),
            BufferUsages::INDEX,
            dynamic,
        )?;

        Ok(IndexBuffer::new(buffer, indices.len() as u32))
    }

    /// A zero-initialized constant buffer. Constant buffers are always dynamic.
    pub fn create_constant_buffer<T: Pod>(&self) -> Result<ConstantBuffer<T>, BufferError> {
        self.create_constant_buffer_with(&<T as bytemuck::Zeroable>::zeroed())
    }

    pub fn create_constant_buffer_with<T: Pod>(
        &self,
        value: &T,
    ) -> Result<ConstantBuffer<T>, BufferError> {
        #[allow(clippy::let_unit_value)]
        let () = ConstantBuffer::<T>::SIZE_CHECK;

        let buffer = Buffer::create(
            self.device,
            "Constant Buffer",
            bytemuck::bytes_of(value),
            BufferUsages::UNIFORM,
            true,
        )?;

        Ok(ConstantBuffer::new(buffer))
    }

    /// Builds the vertex and index buffers of a mesh. A failure names the stage that
    /// failed and keeps the buffer error as its source.
    pub fn create_mesh<V: Pod>(
        &self,
        vertices: &[V],
        indices: &[u32],
        desc: &MeshDesc,
    ) -> Result<Mesh, MeshError> {
        let stride = match desc.vertex_stride {
            0 => size_of::<V>() as u32,
            stride => stride,
        };
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        let count = match stride {
            0 => 0,
            stride => (bytes.len() / stride as usize) as u32,
        };

        let vertex_buffer = self
            .create_vertex_buffer(bytes, count, stride, desc.dynamic_vb)
            .context(CreateVertexBufferFailedErr)?;
        let index_buffer = self
            .create_index_buffer(indices, desc.dynamic_ib)
            .context(CreateIndexBufferFailedErr)?;

        Ok(Mesh::new(vertex_buffer, index_buffer, desc.topology))
    }

    /// Loads a compiled shader from disk.
    ///
    /// An unreadable file yields [`ShaderError::FileNotFound`], whose
    /// [`placeholder`](ShaderError::placeholder) is an empty shader of `kind`.
    pub fn create_shader(&self, kind: ShaderKind, path: impl AsRef<Path>) -> Result<Shader, ShaderError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| ShaderError::FileNotFound {
            kind,
            code: ErrorCode::from(&e),
            message: format!("{}: {e}", path.display()),
        })?;

        let label = path.file_stem().and_then(|stem| stem.to_str());
        self.create_shader_from_bytes(kind, bytes, label)
    }

    pub fn create_shader_from_bytes(
        &self,
        kind: ShaderKind,
        bytes: Vec<u8>,
        label: Option<&str>,
    ) -> Result<Shader, ShaderError> {
        Shader::compile(self.device, kind, bytes, label)
    }

    /// Creates a texture from raw pixels. `row_pitch` is the distance between rows in
    /// bytes.
    pub fn create_texture_2d(
        &self,
        desc: &Texture2DDesc,
        pixels: &[u8],
        row_pitch: u32,
    ) -> Result<Texture2D, TextureError> {
        Texture2D::create(self.device, desc, pixels, row_pitch, Some("Texture 2D"))
    }

    /// Decodes an image file held in memory into a texture.
    pub fn create_texture_from_compressed_data(&self, bytes: &[u8]) -> Result<Texture2D, TextureError> {
        Texture2D::decode(self.device, bytes)
    }
}
