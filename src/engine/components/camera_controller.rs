use crate::components::Camera;
use crate::input::InputEvent;
use bon::Builder;
use nalgebra::{UnitQuaternion, Vector3};
use std::f32::consts::{FRAC_PI_2, PI, TAU};
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

const EPSILON: f32 = 1.0e-6;
const PITCH_LIMIT: f32 = FRAC_PI_2 * 0.99;
const VELOCITY_THRESHOLD: f32 = 0.05;

#[derive(Debug, Clone, PartialEq, Builder)]
pub struct CameraControllerSettings {
    /// Units per second.
    #[builder(default = 5.0)]
    pub move_speed: f32,
    /// Degrees per pixel of raw mouse motion.
    #[builder(default = 0.2)]
    pub rotation_speed: f32,
    #[builder(default = 0.1)]
    pub zoom_sensitivity: f32,
    /// Seconds the velocity takes to roughly reach its target.
    #[builder(default = 0.2)]
    pub smoothing_time: f32,
    /// Scales how fast the camera comes to rest once input stops.
    #[builder(default = 1.0)]
    pub movement_damping: f32,
    #[builder(default = 3.0)]
    pub boost_factor: f32,
    #[builder(default = 0.25)]
    pub slow_factor: f32,
    #[builder(default = true)]
    pub first_person: bool,
    #[builder(default = Vector3::zeros())]
    pub orbit_point: Vector3<f32>,
    #[builder(default = 10.0)]
    pub orbit_distance: f32,

    #[builder(default = KeyCode::KeyW)]
    pub forward_key: KeyCode,
    #[builder(default = KeyCode::KeyS)]
    pub backward_key: KeyCode,
    #[builder(default = KeyCode::KeyA)]
    pub left_key: KeyCode,
    #[builder(default = KeyCode::KeyD)]
    pub right_key: KeyCode,
    #[builder(default = KeyCode::KeyE)]
    pub up_key: KeyCode,
    #[builder(default = KeyCode::KeyQ)]
    pub down_key: KeyCode,
    #[builder(default = KeyCode::ControlLeft)]
    pub boost_key: KeyCode,
    #[builder(default = KeyCode::ShiftLeft)]
    pub slow_key: KeyCode,
    #[builder(default = MouseButton::Right)]
    pub rotate_button: MouseButton,
}

impl Default for CameraControllerSettings {
    fn default() -> Self {
        CameraControllerSettings::builder().build()
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
struct MoveState {
    forward: bool,
    backward: bool,
    left: bool,
    right: bool,
    up: bool,
    down: bool,
    boost: bool,
    slow: bool,
}

/// Fly camera driven by raw input: WASD/EQ to move while the rotate button is held,
/// mouse motion to look around and the wheel to zoom.
#[derive(Debug, Clone)]
pub struct CameraController {
    settings: CameraControllerSettings,
    position: Vector3<f32>,
    yaw: f32,
    pitch: f32,
    velocity: Vector3<f32>,
    target_velocity: Vector3<f32>,
    moving: MoveState,
    rotating: bool,
    was_moving: bool,
}

impl CameraController {
    /// Takes the position and look direction over from `camera`.
    pub fn new(camera: &Camera, settings: CameraControllerSettings) -> CameraController {
        let forward = camera.forward();
        let pitch = forward.y.clamp(-1.0, 1.0).asin().clamp(-PITCH_LIMIT, PITCH_LIMIT);
        let yaw = (-forward.x).atan2(-forward.z);

        CameraController {
            settings,
            position: camera.position(),
            yaw,
            pitch,
            velocity: Vector3::zeros(),
            target_velocity: Vector3::zeros(),
            moving: MoveState::default(),
            rotating: false,
            was_moving: false,
        }
    }

    pub fn handle_event(&mut self, camera: &mut Camera, event: &InputEvent) {
        match *event {
            InputEvent::Resize { width, height } => camera.resize(width, height),
            InputEvent::KeyPressed { key, .. } => self.set_key(key, true),
            InputEvent::KeyReleased { key, .. } => self.set_key(key, false),
            InputEvent::MouseMovedRaw { dx, dy } => self.look(dx, dy),
            InputEvent::MouseButtonPressed(button) if button == self.settings.rotate_button => {
                self.rotating = true;
            }
            InputEvent::MouseButtonReleased(button) if button == self.settings.rotate_button => {
                self.rotating = false;
            }
            InputEvent::MouseWheelScrolled { delta, .. } => {
                camera.zoom_by(delta * self.settings.zoom_sensitivity);
            }
            InputEvent::MouseButtonPressed(_) | InputEvent::MouseButtonReleased(_) => {}
        }
    }

    /// Only the configured keys move the camera. Held modifiers are not consulted.
    fn set_key(&mut self, key: KeyCode, pressed: bool) {
        let s = &self.settings;
        let flag = if key == s.forward_key {
            &mut self.moving.forward
        } else if key == s.backward_key {
            &mut self.moving.backward
        } else if key == s.left_key {
            &mut self.moving.left
        } else if key == s.right_key {
            &mut self.moving.right
        } else if key == s.up_key {
            &mut self.moving.up
        } else if key == s.down_key {
            &mut self.moving.down
        } else if key == s.boost_key {
            &mut self.moving.boost
        } else if key == s.slow_key {
            &mut self.moving.slow
        } else {
            return;
        };
        *flag = pressed;
    }

    fn look(&mut self, dx: f32, dy: f32) {
        if !self.rotating {
            return;
        }

        self.yaw -= (dx * self.settings.rotation_speed).to_radians();
        self.pitch -= (dy * self.settings.rotation_speed).to_radians();
        self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);

        if self.yaw > PI {
            self.yaw -= TAU;
        } else if self.yaw < -PI {
            self.yaw += TAU;
        }
    }

    /// Advances movement by `dt` seconds and writes the result to `camera`.
    pub fn update(&mut self, camera: &mut Camera, dt: f32) {
        self.update_movement(camera, dt);
        self.apply(camera);
    }

    fn update_movement(&mut self, camera: &Camera, dt: f32) {
        let direction = self.movement_direction(camera);
        let has_input = direction.norm_squared() > EPSILON;

        if self.rotating && has_input {
            self.target_velocity = direction * self.current_speed();
            self.was_moving = true;
        } else {
            self.target_velocity = Vector3::zeros();
            if self.rotating {
                self.was_moving = has_input;
            }
        }

        self.smooth_damp(dt);

        if self.velocity.norm_squared() > EPSILON {
            self.position += self.velocity * dt;
        }
    }

    fn movement_direction(&self, camera: &Camera) -> Vector3<f32> {
        let mut forward = camera.forward();
        forward.y = 0.0;
        if forward.norm_squared() > EPSILON {
            forward.normalize_mut();
        }
        let right = camera.right();
        let up = camera.up();

        let m = &self.moving;
        let mut direction = Vector3::zeros();
        if m.forward {
            direction += forward;
        }
        if m.backward {
            direction -= forward;
        }
        if m.right {
            direction += right;
        }
        if m.left {
            direction -= right;
        }
        if m.up {
            direction += up;
        }
        if m.down {
            direction -= up;
        }

        if direction.norm_squared() > EPSILON {
            direction.normalize_mut();
        }
        direction
    }

    fn current_speed(&self) -> f32 {
        let mut speed = self.settings.move_speed;
        if self.moving.boost {
            speed *= self.settings.boost_factor;
        }
        if self.moving.slow {
            speed *= self.settings.slow_factor;
        }
        speed
    }

    /// Critically damped spring on the velocity, stopping dead once it would overshoot
    /// or once it falls under a small threshold.
    fn smooth_damp(&mut self, dt: f32) {
        let stopping = self.target_velocity.norm_squared() < EPSILON;

        let mut damping = 1.0;
        if !self.rotating || stopping {
            damping = self.settings.movement_damping;
        }
        if !self.rotating && self.was_moving && stopping {
            damping *= 1.5;
        }

        let omega = 2.0 / self.settings.smoothing_time.max(0.01);
        let x = omega * dt * damping;
        let decay = 1.0 / (1.0 + x + 0.5 * x * x + 0.25 * x * x * x);

        let target = self.target_velocity;
        let delta = self.velocity - target;
        let temp = delta * omega * dt;
        self.velocity = target + (delta + temp) * decay;

        if (self.velocity - target).dot(&delta) < 0.0 {
            self.velocity = target;
        }
        if self.velocity.norm_squared() < VELOCITY_THRESHOLD * VELOCITY_THRESHOLD {
            self.velocity = Vector3::zeros();
        }
    }

    fn orientation(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), self.yaw)
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), self.pitch)
    }

    fn apply(&mut self, camera: &mut Camera) {
        let orientation = self.orientation();
        camera.set_orientation(orientation);

        if !self.settings.first_person {
            let forward = orientation * Vector3::new(0.0, 0.0, -1.0);
            self.position = self.settings.orbit_point - forward * self.settings.orbit_distance;
        }

        camera.set_position(self.position);
        camera.update();
    }

    /// Back to (0, 0, 15) looking down -Z, at rest.
    pub fn reset(&mut self, camera: &mut Camera) {
        self.position = Vector3::new(0.0, 0.0, 15.0);
        self.yaw = 0.0;
        self.pitch = 0.0;
        self.velocity = Vector3::zeros();
        self.target_velocity = Vector3::zeros();
        self.apply(camera);
    }

    pub fn set_position(&mut self, camera: &mut Camera, position: Vector3<f32>) {
        self.position = position;
        self.apply(camera);
    }

    pub fn set_first_person_mode(&mut self, enabled: bool) {
        self.settings.first_person = enabled;
    }

    pub fn set_orbit_point(&mut self, point: Vector3<f32>) {
        self.settings.orbit_point = point;
    }

    pub fn set_orbit_distance(&mut self, distance: f32) {
        self.settings.orbit_distance = distance.max(EPSILON);
    }

    pub fn settings(&self) -> &CameraControllerSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: CameraControllerSettings) {
        self.settings = settings;
    }

    #[inline]
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    #[inline]
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    #[inline]
    pub fn velocity(&self) -> Vector3<f32> {
        self.velocity
    }

    #[inline]
    pub fn is_rotating(&self) -> bool {
        self.rotating
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::CameraDesc;
    use crate::input::Modifiers;

    fn setup() -> (Camera, CameraController) {
        let camera = Camera::new(
            &CameraDesc::builder()
                .position(Vector3::new(0.0, 0.0, 15.0))
                .look_at(Vector3::zeros())
                .build(),
        );
        let controller = CameraController::new(&camera, CameraControllerSettings::default());
        (camera, controller)
    }

    fn press(key: KeyCode) -> InputEvent {
        InputEvent::KeyPressed {
            key,
            modifiers: Modifiers::empty(),
        }
    }

    #[test]
    fn looking_down_negative_z_is_zero_yaw_and_pitch() {
        let (_, controller) = setup();
        assert!(controller.yaw().abs() < 1e-6);
        assert!(controller.pitch().abs() < 1e-6);
    }

    #[test]
    fn mouse_only_rotates_while_button_held() {
        let (mut camera, mut controller) = setup();

        controller.handle_event(&mut camera, &InputEvent::MouseMovedRaw { dx: 100.0, dy: 0.0 });
        assert_eq!(controller.yaw(), 0.0);

        controller.handle_event(&mut camera, &InputEvent::MouseButtonPressed(MouseButton::Right));
        controller.handle_event(&mut camera, &InputEvent::MouseMovedRaw { dx: 100.0, dy: 0.0 });
        assert!((controller.yaw() + 20f32.to_radians()).abs() < 1e-5);
    }

    #[test]
    fn pitch_is_clamped() {
        let (mut camera, mut controller) = setup();
        controller.handle_event(&mut camera, &InputEvent::MouseButtonPressed(MouseButton::Right));
        controller.handle_event(&mut camera, &InputEvent::MouseMovedRaw { dx: 0.0, dy: -10_000.0 });
        assert_eq!(controller.pitch(), PITCH_LIMIT);
    }

    #[test]
    fn moves_forward_only_while_rotating() {
        let (mut camera, mut controller) = setup();
        controller.handle_event(&mut camera, &press(KeyCode::KeyW));

        controller.update(&mut camera, 0.1);
        assert_eq!(camera.position(), Vector3::new(0.0, 0.0, 15.0));

        controller.handle_event(&mut camera, &InputEvent::MouseButtonPressed(MouseButton::Right));
        for _ in 0..10 {
            controller.update(&mut camera, 0.1);
        }
        assert!(camera.position().z < 15.0);
        assert!(camera.position().x.abs() < 1e-4);
    }

    #[test]
    fn modifiers_alone_do_not_change_speed() {
        let (mut camera, mut controller) = setup();
        let with_ctrl = |key| InputEvent::KeyPressed {
            key,
            modifiers: Modifiers::CONTROL | Modifiers::SHIFT,
        };

        controller.handle_event(&mut camera, &with_ctrl(KeyCode::KeyC));
        assert_eq!(controller.current_speed(), 5.0);

        controller.handle_event(&mut camera, &with_ctrl(KeyCode::ControlLeft));
        assert_eq!(controller.current_speed(), 15.0);

        controller.handle_event(
            &mut camera,
            &InputEvent::KeyReleased {
                key: KeyCode::ControlLeft,
                modifiers: Modifiers::empty(),
            },
        );
        assert_eq!(controller.current_speed(), 5.0);
        assert_eq!(controller.moving, MoveState::default());
    }

    #[test]
    fn wheel_zooms_camera() {
        let (mut camera, mut controller) = setup();
        controller.handle_event(
            &mut camera,
            &InputEvent::MouseWheelScrolled {
                delta: 1.0,
                axis: crate::input::WheelAxis::Vertical,
            },
        );
        assert!(camera.zoom_level() > 1.0);
    }

    #[test]
    fn orbit_keeps_distance() {
        let (mut camera, mut controller) = setup();
        controller.set_first_person_mode(false);
        controller.set_orbit_point(Vector3::new(1.0, 2.0, 3.0));
        controller.set_orbit_distance(4.0);
        controller.update(&mut camera, 0.016);

        let offset = camera.position() - Vector3::new(1.0, 2.0, 3.0);
        assert!((offset.norm() - 4.0).abs() < 1e-4);
    }

    #[test]
    fn reset_restores_home() {
        let (mut camera, mut controller) = setup();
        controller.set_position(&mut camera, Vector3::new(5.0, 5.0, 5.0));
        controller.reset(&mut camera);
        assert_eq!(camera.position(), Vector3::new(0.0, 0.0, 15.0));
        assert!((camera.forward() - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-6);
    }
}
