use crate::components::Component;
use crate::core::Node;
use nalgebra::{Unit, UnitQuaternion, Vector3};

/// Spins its node around `axis`, replacing the node's local rotation.
#[derive(Debug, Clone)]
pub struct RotateComponent {
    axis: Unit<Vector3<f32>>,
    /// Degrees per second.
    pub speed: f32,
    angle: f32,
}

impl Default for RotateComponent {
    fn default() -> Self {
        RotateComponent::new(Vector3::y_axis(), 50.0)
    }
}

impl RotateComponent {
    pub fn new(axis: Unit<Vector3<f32>>, speed: f32) -> Self {
        RotateComponent {
            axis,
            speed,
            angle: 0.0,
        }
    }

    pub fn axis(&self) -> &Unit<Vector3<f32>> {
        &self.axis
    }

    pub fn set_axis(&mut self, axis: Unit<Vector3<f32>>) {
        self.axis = axis;
    }

    /// Current angle in degrees, wrapped to `0..360`.
    pub fn angle(&self) -> f32 {
        self.angle
    }
}

impl Component for RotateComponent {
    fn update(&mut self, node: &mut Node, dt: f32) {
        self.angle = (self.angle + self.speed * dt).rem_euclid(360.0);

        let rotation = UnitQuaternion::from_axis_angle(&self.axis, self.angle.to_radians());
        node.transform_mut().set_local_rotation(rotation);
    }
}
