use nalgebra::{Matrix4, UnitQuaternion, Vector3};

/// Position, rotation and scale of a node relative to its parent.
///
/// The local matrix is rebuilt on every change, so propagating world matrices through the
/// scene graph is a single multiplication per node.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    position: Vector3<f32>,
    rotation: UnitQuaternion<f32>,
    scale: Vector3<f32>,
    local: Matrix4<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Transform {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::repeat(1.0),
            local: Matrix4::identity(),
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn set_local_position(&mut self, x: f32, y: f32, z: f32) {
        self.set_local_position_vec(Vector3::new(x, y, z));
    }

    pub fn set_local_position_vec(&mut self, position: Vector3<f32>) {
        self.position = position;
        self.rebuild();
    }

    pub fn local_position(&self) -> &Vector3<f32> {
        &self.position
    }

    pub fn translate(&mut self, offset: Vector3<f32>) {
        self.position += offset;
        self.rebuild();
    }

    pub fn set_local_rotation(&mut self, rotation: UnitQuaternion<f32>) {
        self.rotation = rotation;
        self.rebuild();
    }

    pub fn local_rotation(&self) -> &UnitQuaternion<f32> {
        &self.rotation
    }

    /// Rotates in local space, after the current rotation.
    pub fn rotate(&mut self, rotation: UnitQuaternion<f32>) {
        self.rotation *= rotation;
        self.rebuild();
    }

    pub fn set_nonuniform_local_scale(&mut self, scale: Vector3<f32>) {
        self.scale = scale;
        self.rebuild();
    }

    pub fn set_uniform_local_scale(&mut self, factor: f32) {
        self.set_nonuniform_local_scale(Vector3::repeat(factor));
    }

    pub fn local_scale(&self) -> &Vector3<f32> {
        &self.scale
    }

    /// Translation * rotation * scale.
    #[inline]
    pub fn local_matrix(&self) -> &Matrix4<f32> {
        &self.local
    }

    fn rebuild(&mut self) {
        self.local = Matrix4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ExtraMatrixMath;
    use nalgebra::Point3;

    #[test]
    fn scale_then_rotation_then_translation() {
        let mut t = Transform::new();
        t.set_uniform_local_scale(2.0);
        t.set_local_rotation(UnitQuaternion::from_axis_angle(
            &Vector3::y_axis(),
            std::f32::consts::FRAC_PI_2,
        ));
        t.set_local_position(1.0, 0.0, 0.0);

        let p = t.local_matrix().transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert!((p - Point3::new(1.0, 0.0, -2.0)).norm() < 1e-5);
    }

    #[test]
    fn local_matrix_decomposes_back() {
        let mut t = Transform::new();
        t.translate(Vector3::new(1.0, 2.0, 3.0));
        t.set_nonuniform_local_scale(Vector3::new(1.0, 2.0, 0.5));

        let (pos, _, scale) = t.local_matrix().decompose();
        assert!((pos - Vector3::new(1.0, 2.0, 3.0)).norm() < 1e-6);
        assert!((scale - Vector3::new(1.0, 2.0, 0.5)).norm() < 1e-6);
    }
}
