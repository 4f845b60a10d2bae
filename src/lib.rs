//! A small real-time 3D rendering framework on top of wgpu.
//!
//! [`rendering`] brings up the device and swap chain and creates GPU resources,
//! [`core`] holds the scene graph and [`components`] the camera and node behaviours.

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod engine;
pub mod utils;

pub use engine::*;

pub use ::log;
pub use ::nalgebra;
pub use ::wgpu;
pub use ::winit;
