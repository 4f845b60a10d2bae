//! Small math and layout helpers shared by the rendering and scene modules.

pub mod align;
pub mod math;
pub mod sizes;

pub use math::*;
