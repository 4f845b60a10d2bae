//! GPU bring-up, resources and the frame loop.

pub mod device;
pub mod error;
pub mod pipeline;
pub mod readback;
pub mod renderer;
pub mod resources;
pub mod shaders;
pub mod swap_chain;
pub mod target;
pub mod uniform;

pub use device::{DeviceDesc, DeviceError, FeatureLevel, GraphicsDevice};
pub use error::ErrorCode;
pub use renderer::{RenderError, Renderer, RendererDesc, Viewport};
pub use swap_chain::{SwapChain, SwapChainDesc, SwapChainError};
pub use target::{OffscreenTarget, RenderTarget, TargetDesc};
pub use uniform::{ConstantBinding, Wvp};
