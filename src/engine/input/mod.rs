//! Raw input records consumed by the camera controller.
//!
//! The crate never owns a window or an event loop. Applications forward winit events
//! through [`InputEvent::from_window_event`] and [`InputEvent::from_device_event`].

pub mod events;

pub use self::events::*;
