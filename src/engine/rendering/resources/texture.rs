//! 2D textures with a default shader resource view.

use crate::error_info;
use crate::rendering::readback::read_texture;
use crate::rendering::{ErrorCode, GraphicsDevice};
use bon::Builder;
use log::debug;
use snafu::Snafu;
use wgpu::{
    Extent3d, Origin3d, TexelCopyBufferLayout, TexelCopyTextureInfo, TextureAspect,
    TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
    TextureViewDescriptor,
};

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)), visibility(pub(crate)))]
pub enum TextureError {
    #[snafu(display("Failed to create texture [{code}]: {message}"))]
    CreateTextureFailed { code: ErrorCode, message: String },

    #[snafu(display("Failed to create shader resource view [{code}]: {message}"))]
    CreateShaderResourceViewFailed { code: ErrorCode, message: String },

    #[snafu(display("Invalid texture dimensions [{code}]: {message}"))]
    InvalidDimensions { code: ErrorCode, message: String },

    #[snafu(display("Failed to read texture back [{code}]: {message}"))]
    ReadbackFailed { code: ErrorCode, message: String },
}

error_info!(TextureError {
    CreateTextureFailed,
    CreateShaderResourceViewFailed,
    InvalidDimensions,
    ReadbackFailed,
});

pub type Result<T, E = TextureError> = std::result::Result<T, E>;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Builder)]
pub struct Texture2DDesc {
    pub width: u32,
    pub height: u32,
    #[builder(default = TextureFormat::Rgba8UnormSrgb)]
    pub format: TextureFormat,
    #[builder(default = 1)]
    pub mip_levels: u32,
}

impl Texture2DDesc {
    pub fn new(width: u32, height: u32) -> Self {
        Texture2DDesc {
            width,
            height,
            format: TextureFormat::Rgba8UnormSrgb,
            mip_levels: 1,
        }
    }

    /// Checks the extent, the row pitch and the amount of pixel data against each other.
    pub fn validate(&self, max_dimension: u32, pixels: &[u8], row_pitch: u32) -> Result<()> {
        let (width, height) = (self.width, self.height);

        if width == 0 || height == 0 || width > max_dimension || height > max_dimension {
            return InvalidDimensionsErr {
                code: ErrorCode::INVALID_ARGUMENT,
                message: format!("{width}x{height} is outside 1..={max_dimension}"),
            }
            .fail();
        }

        if self.mip_levels == 0 {
            return InvalidDimensionsErr {
                code: ErrorCode::INVALID_ARGUMENT,
                message: "a texture needs at least one mip level",
            }
            .fail();
        }

        let Some(bpp) = self.format.block_copy_size(None) else {
            return InvalidDimensionsErr {
                code: ErrorCode::UNSUPPORTED,
                message: format!("{:?} has no uniform texel size", self.format),
            }
            .fail();
        };
        if self.format.is_compressed() {
            return InvalidDimensionsErr {
                code: ErrorCode::UNSUPPORTED,
                message: format!("{:?} is block compressed", self.format),
            }
            .fail();
        }

        let tight_pitch = width as u64 * bpp as u64;
        if (row_pitch as u64) < tight_pitch {
            return InvalidDimensionsErr {
                code: ErrorCode::INVALID_ARGUMENT,
                message: format!("row pitch {row_pitch} is below {tight_pitch}"),
            }
            .fail();
        }

        let needed = row_pitch as u64 * (height as u64 - 1) + tight_pitch;
        if (pixels.len() as u64) < needed {
            return InvalidDimensionsErr {
                code: ErrorCode::INVALID_ARGUMENT,
                message: format!("{} bytes of pixel data, {needed} needed", pixels.len()),
            }
            .fail();
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct Texture2D {
    texture: wgpu::Texture,
    view: TextureView,
    width: u32,
    height: u32,
    format: TextureFormat,
}

impl Texture2D {
    pub(crate) fn create(
        device: &GraphicsDevice,
        desc: &Texture2DDesc,
        pixels: &[u8],
        row_pitch: u32,
        label: Option<&str>,
    ) -> Result<Texture2D> {
        let max = device.device().limits().max_texture_dimension_2d;
        desc.validate(max, pixels, row_pitch)?;

        let size = Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };

        let texture = device.device().create_texture(&TextureDescriptor {
            label,
            size,
            mip_level_count: desc.mip_levels,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: desc.format,
            usage: TextureUsages::TEXTURE_BINDING
                | TextureUsages::COPY_DST
                | TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        device.queue().write_texture(
            TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            pixels,
            TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(row_pitch),
                rows_per_image: Some(desc.height),
            },
            size,
        );

        let view = texture.create_view(&TextureViewDescriptor {
            label: Some("Texture View"),
            ..TextureViewDescriptor::default()
        });

        debug!(
            "Created texture {} {}x{} {:?}",
            label.unwrap_or("<unnamed>"),
            desc.width,
            desc.height,
            desc.format
        );

        Ok(Texture2D {
            texture,
            view,
            width: desc.width,
            height: desc.height,
            format: desc.format,
        })
    }

    /// Decodes an image container (PNG, JPEG, ...) into an sRGB RGBA8 texture.
    pub(crate) fn decode(device: &GraphicsDevice, bytes: &[u8]) -> Result<Texture2D> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| TextureError::CreateTextureFailed {
                code: ErrorCode::INVALID_ARGUMENT,
                message: e.to_string(),
            })?
            .into_rgba8();

        let (width, height) = image.dimensions();
        let desc = Texture2DDesc::new(width, height);

        Self::create(device, &desc, image.as_raw(), width * 4, Some("Decoded Texture"))
    }

    /// Copies the top mip level back to the host, tightly packed in the texture's format.
    /// Blocks until the GPU is idle.
    pub fn read_back(&self, device: &GraphicsDevice) -> Result<Vec<u8>> {
        read_texture(device, &self.texture).map_err(|e| TextureError::ReadbackFailed {
            code: e.code(),
            message: e.message().to_string(),
        })
    }

    #[inline]
    pub fn raw(&self) -> &wgpu::Texture {
        &self.texture
    }

    #[inline]
    pub fn view(&self) -> &TextureView {
        &self.view
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn format(&self) -> TextureFormat {
        self.format
    }
}
