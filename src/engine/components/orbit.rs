use crate::components::Component;
use crate::core::Node;
use nalgebra::{Unit, UnitQuaternion, Vector3};

const MIN_LOOK_DISTANCE_SQUARED: f32 = 1.0e-3;

/// Circles its node around `center` in the plane perpendicular to `axis`. With
/// `face_center` the node's -Z axis keeps pointing at the center.
#[derive(Debug, Clone)]
pub struct OrbitComponent {
    center: Vector3<f32>,
    axis: Unit<Vector3<f32>>,
    pub radius: f32,
    /// Radians per second.
    pub speed: f32,
    pub face_center: bool,
    angle: f32,
}

impl Default for OrbitComponent {
    fn default() -> Self {
        OrbitComponent::new(Vector3::zeros(), 5.0, 0.5, Vector3::y_axis())
    }
}

impl OrbitComponent {
    pub fn new(center: Vector3<f32>, radius: f32, speed: f32, axis: Unit<Vector3<f32>>) -> Self {
        OrbitComponent {
            center,
            axis,
            radius,
            speed,
            face_center: true,
            angle: 0.0,
        }
    }

    pub fn center(&self) -> &Vector3<f32> {
        &self.center
    }

    pub fn set_center(&mut self, center: Vector3<f32>) {
        self.center = center;
    }

    pub fn axis(&self) -> &Unit<Vector3<f32>> {
        &self.axis
    }

    /// Current angle in radians, wrapped to `0..2π`.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Where the node sits at the current angle.
    pub fn position(&self) -> Vector3<f32> {
        let rotation = UnitQuaternion::from_axis_angle(&self.axis, self.angle);
        self.center + rotation * (self.start_direction() * self.radius)
    }

    /// Unit vector in the orbit plane at angle zero. X projected onto the plane, or Z
    /// when the axis is close to X.
    fn start_direction(&self) -> Vector3<f32> {
        let axis = self.axis.into_inner();
        let reference = if axis.x.abs() < 0.99 {
            Vector3::x()
        } else {
            Vector3::z()
        };
        (reference - axis * axis.dot(&reference)).normalize()
    }
}

impl Component for OrbitComponent {
    fn update(&mut self, node: &mut Node, dt: f32) {
        self.angle = (self.angle + self.speed * dt).rem_euclid(std::f32::consts::TAU);

        let position = self.position();
        let transform = node.transform_mut();
        transform.set_local_position_vec(position);

        if !self.face_center {
            return;
        }

        let to_center = self.center - position;
        if to_center.norm_squared() <= MIN_LOOK_DISTANCE_SQUARED {
            return;
        }
        let up = if to_center.normalize().dot(&Vector3::y()).abs() > 0.999 {
            Vector3::z()
        } else {
            Vector3::y()
        };
        transform.set_local_rotation(UnitQuaternion::face_towards(&-to_center, &up));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SceneGraph;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn quarter_turn_around_y() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let id = scene.create_child(root, "moon").unwrap();
        scene.node_mut(id).unwrap().add_component(OrbitComponent::new(
            Vector3::new(0.0, 1.0, 0.0),
            4.0,
            FRAC_PI_2,
            Vector3::y_axis(),
        ));

        scene.update(1.0);

        let node = scene.node(id).unwrap();
        let position = *node.transform().local_position();
        assert!((position - Vector3::new(0.0, 1.0, -4.0)).norm() < 1e-5);

        let forward = node.transform().local_rotation() * -Vector3::z();
        assert!((forward - Vector3::z()).norm() < 1e-5);
    }

    #[test]
    fn keeps_radius_for_tilted_axis() {
        let axis = Unit::new_normalize(Vector3::new(0.1, 1.0, 0.0));
        let mut orbit = OrbitComponent::new(Vector3::zeros(), 8.0, 0.2, axis);
        let mut node = Node::new("planet");

        for _ in 0..50 {
            orbit.update(&mut node, 0.1);
            let position = *node.transform().local_position();
            assert!((position.norm() - 8.0).abs() < 1e-4);
            assert!(position.dot(&axis.into_inner()).abs() < 1e-4);
        }
        assert!((orbit.angle() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn axis_along_x_still_orbits() {
        let mut orbit = OrbitComponent::new(Vector3::zeros(), 2.0, 1.0, Vector3::x_axis());
        orbit.face_center = false;
        let mut node = Node::new("n");

        orbit.update(&mut node, 0.0);
        let position = *node.transform().local_position();
        assert!((position.norm() - 2.0).abs() < 1e-5);
        assert_eq!(*node.transform().local_rotation(), UnitQuaternion::identity());
    }
}
