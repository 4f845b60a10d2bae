//! GPU buffers owned by meshes and constant blocks.
//!
//! Every buffer records whether it is dynamic. Only dynamic buffers accept
//! [`Buffer::update`], updating a static buffer is reported as [`BufferError::UpdateFailed`].

use crate::error_info;
use crate::rendering::readback::read_buffer;
use crate::rendering::{ErrorCode, GraphicsDevice};
use crate::utils::sizes::CONSTANT_BUFFER_ALIGNMENT;
use bytemuck::Pod;
use log::debug;
use snafu::Snafu;
use std::marker::PhantomData;
use wgpu::util::{BufferInitDescriptor, DeviceExt};
use wgpu::{BufferAddress, BufferSlice, BufferUsages, IndexFormat};

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)), visibility(pub(crate)))]
pub enum BufferError {
    #[snafu(display("Failed to create buffer [{code}]: {message}"))]
    CreateBufferFailed { code: ErrorCode, message: String },

    #[snafu(display("Invalid buffer size [{code}]: {message}"))]
    InvalidBufferSize { code: ErrorCode, message: String },

    #[snafu(display("Failed to map buffer [{code}]: {message}"))]
    MapFailed { code: ErrorCode, message: String },

    #[snafu(display("Failed to update buffer [{code}]: {message}"))]
    UpdateFailed { code: ErrorCode, message: String },
}

error_info!(BufferError {
    CreateBufferFailed,
    InvalidBufferSize,
    MapFailed,
    UpdateFailed,
});

pub type Result<T, E = BufferError> = std::result::Result<T, E>;

/// A single GPU buffer plus the size its contents were created with.
#[derive(Debug)]
pub struct Buffer {
    raw: wgpu::Buffer,
    size: BufferAddress,
    dynamic: bool,
}

impl Buffer {
    pub(crate) fn create(
        device: &GraphicsDevice,
        label: &str,
        contents: &[u8],
        usage: BufferUsages,
        dynamic: bool,
    ) -> Result<Buffer> {
        let size = contents.len() as BufferAddress;
        if size == 0 {
            return InvalidBufferSizeErr {
                code: ErrorCode::INVALID_ARGUMENT,
                message: format!("{label} would be empty"),
            }
            .fail();
        }

        let max = device.device().limits().max_buffer_size;
        if size > max {
            return CreateBufferFailedErr {
                code: ErrorCode::OUT_OF_MEMORY,
                message: format!("{label} needs {size} bytes, the device allows {max}"),
            }
            .fail();
        }

        let mut usage = usage | BufferUsages::COPY_SRC;
        if dynamic {
            usage |= BufferUsages::COPY_DST;
        }

        let raw = device.device().create_buffer_init(&BufferInitDescriptor {
            label: Some(label),
            contents,
            usage,
        });

        debug!("Created {label} ({size} bytes, dynamic: {dynamic})");

        Ok(Buffer { raw, size, dynamic })
    }

    /// Overwrites the start of the buffer. Previously submitted draws keep seeing the old
    /// contents, draws submitted afterwards see the new ones.
    pub fn update(&self, device: &GraphicsDevice, data: &[u8]) -> Result<()> {
        if !self.dynamic {
            return UpdateFailedErr {
                code: ErrorCode::INVALID_ARGUMENT,
                message: "buffer was not created as dynamic",
            }
            .fail();
        }

        let len = data.len() as BufferAddress;
        if len > self.size {
            return InvalidBufferSizeErr {
                code: ErrorCode::INVALID_ARGUMENT,
                message: format!("{len} bytes do not fit into {} bytes", self.size),
            }
            .fail();
        }
        if len % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return InvalidBufferSizeErr {
                code: ErrorCode::INVALID_ARGUMENT,
                message: format!("{len} bytes is not a multiple of 4"),
            }
            .fail();
        }

        device.queue().write_buffer(&self.raw, 0, data);
        Ok(())
    }

    /// Copies the buffer contents back to the host. Blocks until the GPU is idle.
    pub fn read_back(&self, device: &GraphicsDevice) -> Result<Vec<u8>> {
        read_buffer(device, &self.raw, self.size).map_err(|e| BufferError::MapFailed {
            code: e.code(),
            message: e.message().to_string(),
        })
    }

    #[inline]
    pub fn raw(&self) -> &wgpu::Buffer {
        &self.raw
    }

    #[inline]
    pub fn size(&self) -> BufferAddress {
        self.size
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    #[inline]
    pub fn slice(&self) -> BufferSlice<'_> {
        self.raw.slice(..self.size)
    }
}

#[derive(Debug)]
pub struct VertexBuffer {
    buffer: Buffer,
    count: u32,
    stride: u32,
}

impl VertexBuffer {
    pub(crate) fn new(buffer: Buffer, count: u32, stride: u32) -> Self {
        VertexBuffer {
            buffer,
            count,
            stride,
        }
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[inline]
    pub fn stride(&self) -> u32 {
        self.stride
    }

    #[inline]
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn update<V: Pod>(&self, device: &GraphicsDevice, vertices: &[V]) -> Result<()> {
        self.buffer.update(device, bytemuck::cast_slice(vertices))
    }
}

/// Always 32-bit indices.
#[derive(Debug)]
pub struct IndexBuffer {
    buffer: Buffer,
    count: u32,
}

impl IndexBuffer {
    pub const FORMAT: IndexFormat = IndexFormat::Uint32;

    pub(crate) fn new(buffer: Buffer, count: u32) -> Self {
        IndexBuffer { buffer, count }
    }

    #[inline]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[inline]
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn update(&self, device: &GraphicsDevice, indices: &[u32]) -> Result<()> {
        self.buffer.update(device, bytemuck::cast_slice(indices))
    }
}

/// A dynamic uniform buffer holding exactly one `T`.
///
/// `T` has to be a non-empty multiple of 16 bytes, which is checked when the buffer type
/// is instantiated:
///
/// ```compile_fail
/// use vitrail::rendering::resources::ConstantBuffer;
///
/// let _ = ConstantBuffer::<[f32; 3]>::SIZE_CHECK;
/// ```
#[derive(Debug)]
pub struct ConstantBuffer<T: Pod> {
    buffer: Buffer,
    _marker: PhantomData<T>,
}

impl<T: Pod> ConstantBuffer<T> {
    pub const SIZE_CHECK: () = assert!(
        size_of::<T>() != 0 && size_of::<T>() % CONSTANT_BUFFER_ALIGNMENT == 0,
        "constant buffer payloads must be a non-empty multiple of 16 bytes"
    );

    pub(crate) fn new(buffer: Buffer) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::SIZE_CHECK;

        ConstantBuffer {
            buffer,
            _marker: PhantomData,
        }
    }

    pub fn update(&self, device: &GraphicsDevice, value: &T) -> Result<()> {
        self.buffer.update(device, bytemuck::bytes_of(value))
    }

    /// Reads the value back from GPU memory.
    pub fn read_back(&self, device: &GraphicsDevice) -> Result<T> {
        let bytes = self.buffer.read_back(device)?;
        bytemuck::try_pod_read_unaligned(&bytes).map_err(|e| BufferError::MapFailed {
            code: ErrorCode::FAIL,
            message: e.to_string(),
        })
    }

    #[inline]
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    #[inline]
    pub fn raw(&self) -> &wgpu::Buffer {
        self.buffer.raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C)]
    #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
    struct Block {
        a: [f32; 4],
        b: [f32; 4],
    }

    #[test]
    fn aligned_payload_passes_size_check() {
        #[allow(clippy::let_unit_value)]
        let () = ConstantBuffer::<Block>::SIZE_CHECK;
        assert_eq!(size_of::<Block>() % CONSTANT_BUFFER_ALIGNMENT, 0);
    }

    #[test]
    fn errors_carry_codes() {
        let err = UpdateFailedErr {
            code: ErrorCode::INVALID_ARGUMENT,
            message: "static",
        }
        .build();
        assert_eq!(err.code(), ErrorCode::INVALID_ARGUMENT);
        assert_eq!(err.message(), "static");
        assert!(err.to_string().contains("static"));
    }

    #[test]
    fn index_format_is_32_bit() {
        assert_eq!(IndexBuffer::FORMAT, IndexFormat::Uint32);
    }
}
