use crate::components::Component;
use crate::core::Node;
use nalgebra::{Unit, Vector3};

/// Moves its node back and forth along `axis` around the position it had when the
/// component first ran.
#[derive(Debug, Clone)]
pub struct OscillateComponent {
    axis: Unit<Vector3<f32>>,
    /// Largest distance from the rest position.
    pub amplitude: f32,
    /// Radians per second.
    pub frequency: f32,
    elapsed: f32,
    origin: Option<Vector3<f32>>,
}

impl Default for OscillateComponent {
    fn default() -> Self {
        OscillateComponent::new(Vector3::y_axis(), 1.0, 1.0)
    }
}

impl OscillateComponent {
    pub fn new(axis: Unit<Vector3<f32>>, amplitude: f32, frequency: f32) -> Self {
        OscillateComponent {
            axis,
            amplitude,
            frequency,
            elapsed: 0.0,
            origin: None,
        }
    }

    pub fn axis(&self) -> &Unit<Vector3<f32>> {
        &self.axis
    }

    /// Seconds of animation applied so far.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Signed distance from the rest position at the current time.
    pub fn displacement(&self) -> f32 {
        self.amplitude * (self.frequency * self.elapsed).sin()
    }

    /// Forgets the rest position. The next update captures the node's position anew.
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.origin = None;
    }
}

impl Component for OscillateComponent {
    fn update(&mut self, node: &mut Node, dt: f32) {
        let transform = node.transform_mut();
        let origin = *self.origin.get_or_insert(*transform.local_position());

        self.elapsed += dt;
        transform.set_local_position_vec(origin + self.axis.into_inner() * self.displacement());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SceneGraph;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn swings_around_start_position() {
        let mut scene = SceneGraph::new();
        let root = scene.root();
        let id = scene.create_child(root, "bob").unwrap();
        let node = scene.node_mut(id).unwrap();
        node.transform_mut().set_local_position(1.0, 0.0, 0.0);
        node.add_component(OscillateComponent::new(Vector3::y_axis(), 2.0, FRAC_PI_2));

        scene.update(1.0);
        let position = *scene.node(id).unwrap().transform().local_position();
        assert!((position - Vector3::new(1.0, 2.0, 0.0)).norm() < 1e-5);

        scene.update(1.0);
        let position = *scene.node(id).unwrap().transform().local_position();
        assert!((position - Vector3::new(1.0, 0.0, 0.0)).norm() < 1e-5);

        scene.update(1.0);
        let position = *scene.node(id).unwrap().transform().local_position();
        assert!((position - Vector3::new(1.0, -2.0, 0.0)).norm() < 1e-5);
    }

    #[test]
    fn instances_keep_their_own_clock() {
        let mut node = Node::new("n");
        let mut first = OscillateComponent::new(Vector3::x_axis(), 1.0, 1.0);
        let mut second = first.clone();

        first.update(&mut node, 0.5);
        first.update(&mut node, 0.5);
        second.update(&mut node, 0.25);

        assert_eq!(first.elapsed(), 1.0);
        assert_eq!(second.elapsed(), 0.25);

        second.reset();
        assert_eq!(second.elapsed(), 0.0);
        assert_eq!(second.displacement(), 0.0);
    }
}
