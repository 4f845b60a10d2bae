//! What a [`Renderer`](crate::rendering::Renderer) draws into.

use crate::rendering::readback::{self, ReadbackError};
use crate::rendering::swap_chain::check_extent;
use crate::rendering::{GraphicsDevice, SwapChain, SwapChainDesc, SwapChainError};
use log::debug;
use wgpu::{
    Extent3d, Texture, TextureDescriptor, TextureDimension, TextureFormat, TextureUsages,
    TextureView, TextureViewDescriptor,
};

/// A color texture that stands in for a window surface. It can be read back after drawing.
pub struct OffscreenTarget {
    texture: Texture,
    view: TextureView,
}

impl OffscreenTarget {
    pub fn new(
        device: &GraphicsDevice,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<Self, SwapChainError> {
        check_extent(width, height)?;

        let texture = device.device().create_texture(&TextureDescriptor {
            label: Some("Offscreen Target"),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format,
            usage: TextureUsages::RENDER_ATTACHMENT
                | TextureUsages::TEXTURE_BINDING
                | TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&TextureViewDescriptor::default());

        Ok(OffscreenTarget { texture, view })
    }

    pub fn recreate(
        &mut self,
        device: &GraphicsDevice,
        width: u32,
        height: u32,
    ) -> Result<(), SwapChainError> {
        *self = Self::new(device, width, height, self.texture.format())?;
        Ok(())
    }

    #[inline]
    pub fn view(&self) -> &TextureView {
        &self.view
    }

    #[inline]
    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    /// Tightly packed texels of the last drawn frame.
    pub fn read_back(&self, device: &GraphicsDevice) -> Result<Vec<u8>, ReadbackError> {
        readback::read_texture(device, &self.texture)
    }
}

/// How to create a [`RenderTarget`].
#[derive(Debug, Clone)]
pub enum TargetDesc {
    Window(SwapChainDesc),
    Offscreen {
        width: u32,
        height: u32,
        format: TextureFormat,
    },
}

impl From<SwapChainDesc> for TargetDesc {
    fn from(desc: SwapChainDesc) -> Self {
        TargetDesc::Window(desc)
    }
}

pub enum RenderTarget {
    Window(SwapChain),
    Offscreen(OffscreenTarget),
}

impl RenderTarget {
    pub fn create(device: &GraphicsDevice, desc: &TargetDesc) -> Result<Self, SwapChainError> {
        match desc {
            TargetDesc::Window(desc) => SwapChain::create(device, desc).map(RenderTarget::Window),
            TargetDesc::Offscreen {
                width,
                height,
                format,
            } => OffscreenTarget::new(device, *width, *height, *format)
                .map(RenderTarget::Offscreen),
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            RenderTarget::Window(swap_chain) => swap_chain.width(),
            RenderTarget::Offscreen(target) => target.texture.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            RenderTarget::Window(swap_chain) => swap_chain.height(),
            RenderTarget::Offscreen(target) => target.texture.height(),
        }
    }

    pub fn format(&self) -> TextureFormat {
        match self {
            RenderTarget::Window(swap_chain) => swap_chain.format(),
            RenderTarget::Offscreen(target) => target.texture.format(),
        }
    }

    /// Makes a view available for this frame. Offscreen targets always have one.
    pub fn acquire(&mut self, device: &GraphicsDevice) -> Result<(), SwapChainError> {
        match self {
            RenderTarget::Window(swap_chain) => swap_chain.acquire_back_buffer(device).map(drop),
            RenderTarget::Offscreen(_) => Ok(()),
        }
    }

    pub fn view(&self) -> Option<&TextureView> {
        match self {
            RenderTarget::Window(swap_chain) => swap_chain.back_buffer_view(),
            RenderTarget::Offscreen(target) => Some(target.view()),
        }
    }

    pub fn present(&mut self) -> Result<(), SwapChainError> {
        match self {
            RenderTarget::Window(swap_chain) => swap_chain.present(),
            RenderTarget::Offscreen(_) => Ok(()),
        }
    }

    pub fn resize(
        &mut self,
        device: &GraphicsDevice,
        width: u32,
        height: u32,
    ) -> Result<(), SwapChainError> {
        match self {
            RenderTarget::Window(swap_chain) => swap_chain.resize(device, width, height),
            RenderTarget::Offscreen(target) => {
                target.recreate(device, width, height)?;
                debug!("Recreated offscreen target at {width}x{height}");
                Ok(())
            }
        }
    }

    pub fn swap_chain(&self) -> Option<&SwapChain> {
        match self {
            RenderTarget::Window(swap_chain) => Some(swap_chain),
            RenderTarget::Offscreen(_) => None,
        }
    }

    pub fn swap_chain_mut(&mut self) -> Option<&mut SwapChain> {
        match self {
            RenderTarget::Window(swap_chain) => Some(swap_chain),
            RenderTarget::Offscreen(_) => None,
        }
    }

    pub fn offscreen(&self) -> Option<&OffscreenTarget> {
        match self {
            RenderTarget::Window(_) => None,
            RenderTarget::Offscreen(target) => Some(target),
        }
    }
}
