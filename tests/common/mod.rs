#![allow(dead_code)]

use vitrail::rendering::{
    DeviceDesc, GraphicsDevice, RenderError, Renderer, RendererDesc, TargetDesc,
};

/// A device on any adapter, software rasterizers included. `None` on machines without
/// one, in which case GPU tests return early.
pub fn device() -> Option<GraphicsDevice> {
    let _ = env_logger::builder().is_test(true).try_init();

    let desc = DeviceDesc::builder().allow_software(true).build();
    match GraphicsDevice::create(&desc) {
        Ok(device) => Some(device),
        Err(e) => {
            eprintln!("skipping GPU test: {e}");
            None
        }
    }
}

/// A renderer drawing into an `Rgba8Unorm` texture cleared to black.
pub fn offscreen_renderer(width: u32, height: u32) -> Option<Renderer> {
    let _ = env_logger::builder().is_test(true).try_init();

    let desc = RendererDesc::builder()
        .device(DeviceDesc::builder().allow_software(true).build())
        .target(TargetDesc::Offscreen {
            width,
            height,
            format: wgpu::TextureFormat::Rgba8Unorm,
        })
        .clear_color(wgpu::Color::BLACK)
        .build();

    match Renderer::new(desc) {
        Ok(renderer) => Some(renderer),
        Err(e @ RenderError::Device { .. }) => {
            eprintln!("skipping GPU test: {e}");
            None
        }
        Err(e) => panic!("offscreen renderer: {e}"),
    }
}
