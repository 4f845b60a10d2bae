//! Presentation surface and back buffer management.
//!
//! The back buffer view only lives between [`SwapChain::acquire_back_buffer`] and
//! [`SwapChain::present`]. Resizing drops it before the surface is reconfigured, the next
//! acquire recreates it at the new size.

use crate::error_info;
use crate::rendering::{ErrorCode, GraphicsDevice};
use bon::Builder;
use log::{debug, info, warn};
use snafu::Snafu;
use std::sync::Arc;
use wgpu::{
    CompositeAlphaMode, PresentMode, Surface, SurfaceConfiguration, SurfaceError, SurfaceTexture,
    TextureFormat, TextureUsages, TextureView, TextureViewDescriptor,
};
use winit::window::{Fullscreen, Window};

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)), visibility(pub(crate)))]
pub enum SwapChainError {
    #[snafu(display("Failed to create the swap chain [{code}]: {message}"))]
    CreateSwapChainFailed { code: ErrorCode, message: String },

    #[snafu(display("Failed to acquire a back buffer [{code}]: {message}"))]
    GetBufferFailed { code: ErrorCode, message: String },

    #[snafu(display("Failed to create a render target view [{code}]: {message}"))]
    CreateRTVFailed { code: ErrorCode, message: String },

    #[snafu(display("Failed to resize the swap chain [{code}]: {message}"))]
    ResizeFailed { code: ErrorCode, message: String },

    #[snafu(display("Failed to present [{code}]: {message}"))]
    PresentFailed { code: ErrorCode, message: String },

    #[snafu(display("Invalid swap chain parameters [{code}]: {message}"))]
    InvalidParameters { code: ErrorCode, message: String },
}

error_info!(SwapChainError {
    CreateSwapChainFailed,
    GetBufferFailed,
    CreateRTVFailed,
    ResizeFailed,
    PresentFailed,
    InvalidParameters,
});

pub type Result<T, E = SwapChainError> = std::result::Result<T, E>;

#[derive(Debug, Clone, Builder)]
pub struct SwapChainDesc {
    pub window: Option<Arc<Window>>,
    #[builder(default)]
    pub width: u32,
    #[builder(default)]
    pub height: u32,
    #[builder(default = 2)]
    pub buffer_count: u32,
    #[builder(default = TextureFormat::Bgra8UnormSrgb)]
    pub format: TextureFormat,
    #[builder(default = true)]
    pub allow_tearing: bool,
    #[builder(default)]
    pub fullscreen: bool,
    /// 0 presents immediately, anything else waits for vertical blank.
    #[builder(default = 1)]
    pub sync_interval: u32,
}

impl Default for SwapChainDesc {
    fn default() -> Self {
        SwapChainDesc {
            window: None,
            width: 0,
            height: 0,
            buffer_count: 2,
            format: TextureFormat::Bgra8UnormSrgb,
            allow_tearing: true,
            fullscreen: false,
            sync_interval: 1,
        }
    }
}

impl SwapChainDesc {
    /// Checks everything that can be rejected without touching the GPU.
    pub fn validate(&self) -> Result<&Arc<Window>> {
        let Some(window) = &self.window else {
            return InvalidParametersErr {
                code: ErrorCode::INVALID_ARGUMENT,
                message: "no window handle",
            }
            .fail();
        };

        check_extent(self.width, self.height)?;

        if self.buffer_count == 0 {
            return InvalidParametersErr {
                code: ErrorCode::INVALID_ARGUMENT,
                message: "buffer count must be at least 1",
            }
            .fail();
        }

        Ok(window)
    }
}

/// Rejects zero-sized surfaces.
pub fn check_extent(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return InvalidParametersErr {
            code: ErrorCode::INVALID_ARGUMENT,
            message: format!("surface extent {width}x{height} has a zero dimension"),
        }
        .fail();
    }
    Ok(())
}

/// Picks the present mode for a sync interval. Tearing (immediate presentation) is only
/// used when it is supported, allowed, and no vertical sync was requested.
pub fn choose_present_mode(
    sync_interval: u32,
    tearing_supported: bool,
    allow_tearing: bool,
    available: &[PresentMode],
) -> PresentMode {
    if sync_interval > 0 {
        return PresentMode::Fifo;
    }

    if tearing_supported && allow_tearing {
        PresentMode::Immediate
    } else if available.contains(&PresentMode::Mailbox) {
        PresentMode::Mailbox
    } else {
        PresentMode::Fifo
    }
}

/// The requested format if the surface supports it, else the first sRGB format, else
/// whatever comes first.
pub fn choose_format(requested: TextureFormat, available: &[TextureFormat]) -> Option<TextureFormat> {
    if available.contains(&requested) {
        return Some(requested);
    }

    available
        .iter()
        .copied()
        .find(TextureFormat::is_srgb)
        .or_else(|| available.first().copied())
}

struct BackBuffer {
    texture: SurfaceTexture,
    view: TextureView,
}

pub struct SwapChain {
    back_buffer: Option<BackBuffer>,
    surface: Surface<'static>,
    window: Arc<Window>,
    config: SurfaceConfiguration,
    present_modes: Vec<PresentMode>,
    tearing_supported: bool,
    allow_tearing: bool,
    sync_interval: u32,
    fullscreen: bool,
    resize_count: u64,
}

impl SwapChain {
    pub fn create(device: &GraphicsDevice, desc: &SwapChainDesc) -> Result<SwapChain> {
        let window = desc.validate()?.clone();

        let surface = device
            .instance()
            .create_surface(window.clone())
            .map_err(|e| SwapChainError::CreateSwapChainFailed {
                code: ErrorCode::FAIL,
                message: e.to_string(),
            })?;

        let caps = surface.get_capabilities(device.adapter());
        let Some(format) = choose_format(desc.format, &caps.formats) else {
            return CreateSwapChainFailedErr {
                code: ErrorCode::UNSUPPORTED,
                message: "surface reports no supported formats",
            }
            .fail();
        };
        if format != desc.format {
            warn!("Surface format {:?} unsupported, using {format:?}", desc.format);
        }

        let tearing_supported = caps.present_modes.contains(&PresentMode::Immediate);
        let present_mode = choose_present_mode(
            desc.sync_interval,
            tearing_supported,
            desc.allow_tearing,
            &caps.present_modes,
        );

        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(CompositeAlphaMode::Auto);

        let config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format,
            width: desc.width,
            height: desc.height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: desc.buffer_count,
        };

        surface.configure(device.device(), &config);
        info!(
            "Created swap chain {}x{} {format:?} ({present_mode:?}, tearing supported: {tearing_supported})",
            desc.width, desc.height
        );

        let mut swap_chain = SwapChain {
            back_buffer: None,
            surface,
            window,
            config,
            present_modes: caps.present_modes,
            tearing_supported,
            allow_tearing: desc.allow_tearing,
            sync_interval: desc.sync_interval,
            fullscreen: false,
            resize_count: 0,
        };
        swap_chain.set_fullscreen(desc.fullscreen);

        Ok(swap_chain)
    }

    #[inline]
    pub fn format(&self) -> TextureFormat {
        self.config.format
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.config.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.config.height
    }

    #[inline]
    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    #[inline]
    pub fn is_tearing_supported(&self) -> bool {
        self.tearing_supported
    }

    /// Whether presentation currently happens without waiting for vertical blank.
    pub fn tearing_applied(&self) -> bool {
        self.config.present_mode == PresentMode::Immediate
    }

    #[inline]
    pub fn sync_interval(&self) -> u32 {
        self.sync_interval
    }

    #[inline]
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Number of surface reconfigurations caused by [`SwapChain::resize`].
    #[inline]
    pub fn resize_count(&self) -> u64 {
        self.resize_count
    }

    pub fn has_back_buffer(&self) -> bool {
        self.back_buffer.is_some()
    }

    /// The view acquired by the last [`SwapChain::acquire_back_buffer`], until presented.
    pub fn back_buffer_view(&self) -> Option<&TextureView> {
        self.back_buffer.as_ref().map(|back_buffer| &back_buffer.view)
    }

    pub fn set_sync_interval(&mut self, device: &GraphicsDevice, sync_interval: u32) {
        self.sync_interval = sync_interval;
        let mode = choose_present_mode(
            sync_interval,
            self.tearing_supported,
            self.allow_tearing,
            &self.present_modes,
        );

        if mode != self.config.present_mode {
            self.back_buffer = None;
            self.config.present_mode = mode;
            self.surface.configure(device.device(), &self.config);
            debug!("Present mode changed to {mode:?}");
        }
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        if self.fullscreen == fullscreen {
            return;
        }
        self.fullscreen = fullscreen;
        self.window
            .set_fullscreen(fullscreen.then_some(Fullscreen::Borderless(None)));
    }

    /// Returns the render target view of the current back buffer, acquiring one if needed.
    pub fn acquire_back_buffer(&mut self, device: &GraphicsDevice) -> Result<&TextureView> {
        if self.back_buffer.is_none() {
            let texture = self.next_texture(device)?;
            let view = texture
                .texture
                .create_view(&TextureViewDescriptor {
                    label: Some("Back Buffer View"),
                    ..TextureViewDescriptor::default()
                });
            self.back_buffer = Some(BackBuffer { texture, view });
        }

        match &self.back_buffer {
            Some(back_buffer) => Ok(&back_buffer.view),
            None => CreateRTVFailedErr {
                code: ErrorCode::FAIL,
                message: "back buffer view missing after acquire",
            }
            .fail(),
        }
    }

    fn next_texture(&mut self, device: &GraphicsDevice) -> Result<SurfaceTexture> {
        let texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(SurfaceError::Lost | SurfaceError::Outdated) => {
                debug!("Surface lost or outdated, reconfiguring");
                self.surface.configure(device.device(), &self.config);
                self.surface
                    .get_current_texture()
                    .map_err(surface_error_to_get_buffer)?
            }
            Err(e) => return Err(surface_error_to_get_buffer(e)),
        };

        if texture.suboptimal {
            drop(texture);
            self.surface.configure(device.device(), &self.config);
            return self
                .surface
                .get_current_texture()
                .map_err(surface_error_to_get_buffer);
        }

        Ok(texture)
    }

    pub fn present(&mut self) -> Result<()> {
        let Some(BackBuffer { texture, view }) = self.back_buffer.take() else {
            return PresentFailedErr {
                code: ErrorCode::INVALID_ARGUMENT,
                message: "no back buffer was acquired this frame",
            }
            .fail();
        };

        drop(view);
        self.window.pre_present_notify();
        texture.present();
        Ok(())
    }

    /// Drops the back buffer, reconfigures the surface to the new extent. The view is
    /// recreated by the next acquire. Zero extents are rejected before any GPU call.
    pub fn resize(&mut self, device: &GraphicsDevice, width: u32, height: u32) -> Result<()> {
        check_extent(width, height)?;

        let max = device.device().limits().max_texture_dimension_2d;
        if width > max || height > max {
            return ResizeFailedErr {
                code: ErrorCode::INVALID_ARGUMENT,
                message: format!("{width}x{height} exceeds the maximum surface size {max}"),
            }
            .fail();
        }

        self.back_buffer = None;

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(device.device(), &self.config);
        self.resize_count += 1;

        debug!("Resized swap chain to {width}x{height}");
        Ok(())
    }
}

fn surface_error_to_get_buffer(err: SurfaceError) -> SwapChainError {
    SwapChainError::GetBufferFailed {
        code: ErrorCode::from(err.clone()),
        message: err.to_string(),
    }
}
