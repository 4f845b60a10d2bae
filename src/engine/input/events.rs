use bitflags::bitflags;
use winit::event::{DeviceEvent, ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CONTROL = 1 << 1;
        const ALT = 1 << 2;
        const SUPER = 1 << 3;
    }
}

impl From<ModifiersState> for Modifiers {
    fn from(state: ModifiersState) -> Self {
        let mut modifiers = Modifiers::empty();
        modifiers.set(Modifiers::SHIFT, state.shift_key());
        modifiers.set(Modifiers::CONTROL, state.control_key());
        modifiers.set(Modifiers::ALT, state.alt_key());
        modifiers.set(Modifiers::SUPER, state.super_key());
        modifiers
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum WheelAxis {
    #[default]
    Vertical,
    Horizontal,
}

/// Raw input as delivered by the windowing layer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum InputEvent {
    Resize { width: u32, height: u32 },
    KeyPressed { key: KeyCode, modifiers: Modifiers },
    KeyReleased { key: KeyCode, modifiers: Modifiers },
    MouseMovedRaw { dx: f32, dy: f32 },
    MouseButtonPressed(MouseButton),
    MouseButtonReleased(MouseButton),
    MouseWheelScrolled { delta: f32, axis: WheelAxis },
}

/// Pixels per wheel line, for touchpads reporting pixel deltas.
const PIXELS_PER_LINE: f32 = 120.0;

impl InputEvent {
    /// Translates a window event. `modifiers` is the modifier state last reported by the
    /// window. Events without a counterpart yield `None`.
    pub fn from_window_event(event: &WindowEvent, modifiers: Modifiers) -> Option<InputEvent> {
        match event {
            WindowEvent::Resized(size) => Some(InputEvent::Resize {
                width: size.width,
                height: size.height,
            }),
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(key) = event.physical_key else {
                    return None;
                };
                match event.state {
                    ElementState::Pressed => Some(InputEvent::KeyPressed { key, modifiers }),
                    ElementState::Released => Some(InputEvent::KeyReleased { key, modifiers }),
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => Some(InputEvent::MouseButtonPressed(*button)),
                ElementState::Released => Some(InputEvent::MouseButtonReleased(*button)),
            },
            WindowEvent::MouseWheel { delta, .. } => {
                let (x, y) = match delta {
                    MouseScrollDelta::LineDelta(x, y) => (*x, *y),
                    MouseScrollDelta::PixelDelta(pos) => (
                        pos.x as f32 / PIXELS_PER_LINE,
                        pos.y as f32 / PIXELS_PER_LINE,
                    ),
                };
                if y != 0.0 {
                    Some(InputEvent::MouseWheelScrolled {
                        delta: y,
                        axis: WheelAxis::Vertical,
                    })
                } else if x != 0.0 {
                    Some(InputEvent::MouseWheelScrolled {
                        delta: x,
                        axis: WheelAxis::Horizontal,
                    })
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Raw mouse motion arrives as a device event, unaffected by cursor acceleration.
    pub fn from_device_event(event: &DeviceEvent) -> Option<InputEvent> {
        match event {
            DeviceEvent::MouseMotion { delta } => Some(InputEvent::MouseMovedRaw {
                dx: delta.0 as f32,
                dy: delta.1 as f32,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalSize;

    #[test]
    fn modifiers_from_winit_state() {
        let state = ModifiersState::SHIFT | ModifiersState::CONTROL;
        let modifiers = Modifiers::from(state);
        assert!(modifiers.contains(Modifiers::SHIFT | Modifiers::CONTROL));
        assert!(!modifiers.intersects(Modifiers::ALT | Modifiers::SUPER));
    }

    #[test]
    fn resize_translates() {
        let event = WindowEvent::Resized(PhysicalSize::new(640, 480));
        assert_eq!(
            InputEvent::from_window_event(&event, Modifiers::empty()),
            Some(InputEvent::Resize {
                width: 640,
                height: 480
            })
        );
    }

    #[test]
    fn motion_is_raw() {
        let event = DeviceEvent::MouseMotion { delta: (3.0, -2.0) };
        assert_eq!(
            InputEvent::from_device_event(&event),
            Some(InputEvent::MouseMovedRaw { dx: 3.0, dy: -2.0 })
        );
    }
}
