//! Blocking GPU to CPU copies. Only diagnostics and tests read GPU memory back, the frame
//! loop never waits on the GPU.

use crate::error_info;
use crate::rendering::{ErrorCode, GraphicsDevice};
use crossbeam_channel::bounded;
use snafu::Snafu;
use wgpu::{
    BufferAddress, BufferDescriptor, BufferUsages, COPY_BYTES_PER_ROW_ALIGNMENT,
    CommandEncoder, CommandEncoderDescriptor, MapMode, PollType, TexelCopyBufferInfo,
    TexelCopyBufferLayout,
};

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)), visibility(pub(crate)))]
pub enum ReadbackError {
    #[snafu(display("Failed to map readback buffer [{code}]: {message}"))]
    MapFailed { code: ErrorCode, message: String },

    #[snafu(display("Unsupported readback format [{code}]: {message}"))]
    UnsupportedFormat { code: ErrorCode, message: String },

    #[snafu(display("Cannot read back an empty resource [{code}]: {message}"))]
    EmptyResource { code: ErrorCode, message: String },
}

error_info!(ReadbackError {
    MapFailed,
    UnsupportedFormat,
    EmptyResource,
});

pub type Result<T, E = ReadbackError> = std::result::Result<T, E>;

/// Copies the first `size` bytes of `source` into host memory. `source` needs `COPY_SRC`.
pub fn read_buffer(
    device: &GraphicsDevice,
    source: &wgpu::Buffer,
    size: BufferAddress,
) -> Result<Vec<u8>> {
    if size == 0 {
        return EmptyResourceErr {
            code: ErrorCode::INVALID_ARGUMENT,
            message: "buffer has no contents",
        }
        .fail();
    }

    // copies must cover whole 4 byte words
    let copy_size = size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT).min(source.size());

    let mut bytes = copy_to_host(device, "Buffer Readback", copy_size, |encoder, staging| {
        encoder.copy_buffer_to_buffer(source, 0, staging, 0, copy_size);
    })?;
    bytes.truncate(size as usize);
    Ok(bytes)
}

/// Copies mip level 0 of a single-layer 2D texture into host memory, tightly packed in
/// the texture's own format. `source` needs `COPY_SRC`.
pub fn read_texture(device: &GraphicsDevice, source: &wgpu::Texture) -> Result<Vec<u8>> {
    let format = source.format();
    let extent = source.size();

    if extent.width == 0 || extent.height == 0 {
        return EmptyResourceErr {
            code: ErrorCode::INVALID_ARGUMENT,
            message: format!("texture is {}x{}", extent.width, extent.height),
        }
        .fail();
    }

    let texel_size = match format.block_copy_size(None) {
        Some(size) if format.block_dimensions() == (1, 1) => size,
        _ => {
            return UnsupportedFormatErr {
                code: ErrorCode::UNSUPPORTED,
                message: format!("{format:?} has no single-texel copy layout"),
            }
            .fail();
        }
    };

    let row = texel_size * extent.width;
    let padded_row = row.next_multiple_of(COPY_BYTES_PER_ROW_ALIGNMENT);
    let copy_extent = wgpu::Extent3d {
        depth_or_array_layers: 1,
        ..extent
    };

    let padded = copy_to_host(
        device,
        "Texture Readback",
        padded_row as BufferAddress * extent.height as BufferAddress,
        |encoder, staging| {
            encoder.copy_texture_to_buffer(
                source.as_image_copy(),
                TexelCopyBufferInfo {
                    buffer: staging,
                    layout: TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(padded_row),
                        rows_per_image: Some(extent.height),
                    },
                },
                copy_extent,
            );
        },
    )?;

    Ok(padded
        .chunks_exact(padded_row as usize)
        .flat_map(|line| &line[..row as usize])
        .copied()
        .collect())
}

/// Records `copy` into a staging buffer of `size` bytes, submits it and maps the result.
fn copy_to_host(
    device: &GraphicsDevice,
    label: &str,
    size: BufferAddress,
    copy: impl FnOnce(&mut CommandEncoder, &wgpu::Buffer),
) -> Result<Vec<u8>> {
    let staging = device.device().create_buffer(&BufferDescriptor {
        label: Some(label),
        size,
        usage: BufferUsages::COPY_DST | BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device
        .device()
        .create_command_encoder(&CommandEncoderDescriptor { label: Some(label) });
    copy(&mut encoder, &staging);
    device.queue().submit(Some(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = bounded(1);
    slice.map_async(MapMode::Read, move |res| {
        let _ = tx.send(res);
    });
    let _ = device.device().poll(PollType::wait_indefinitely());

    match rx.recv() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            return MapFailedErr {
                code: ErrorCode::FAIL,
                message: e.to_string(),
            }
            .fail();
        }
        Err(_) => {
            return MapFailedErr {
                code: ErrorCode::FAIL,
                message: "map callback channel closed",
            }
            .fail();
        }
    }

    let bytes = slice.get_mapped_range().to_vec();
    staging.unmap();
    Ok(bytes)
}
