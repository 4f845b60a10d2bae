use nalgebra::{Matrix3, Matrix4, Rotation3, UnitQuaternion, Vector3};

/// Squared length below which a direction is treated as degenerate.
pub const DIRECTION_EPSILON: f32 = 1.0e-6;

pub trait FloatMathExt {
    fn lerp(self, other: Self, t: Self) -> Self;
}

impl FloatMathExt for f32 {
    #[inline]
    fn lerp(self, other: Self, t: Self) -> Self {
        self + (other - self) * t
    }
}

pub trait ExtraMatrixMath {
    fn decompose(self) -> (Vector3<f32>, UnitQuaternion<f32>, Vector3<f32>);
}

pub fn matrix_to_quaternion(matrix: Matrix3<f32>) -> UnitQuaternion<f32> {
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_eps(
        &matrix,
        f32::EPSILON,
        1000,
        Rotation3::identity(),
    ))
}

impl ExtraMatrixMath for Matrix4<f32> {
    fn decompose(self) -> (Vector3<f32>, UnitQuaternion<f32>, Vector3<f32>) {
        let translation = self.column(3).xyz();

        let scale = Vector3::new(
            self.column(0).xyz().norm(),
            self.column(1).xyz().norm(),
            self.column(2).xyz().norm(),
        );

        let rotation_matrix = Matrix3::from_columns(&[
            self.column(0).xyz() / scale.x,
            self.column(1).xyz() / scale.y,
            self.column(2).xyz() / scale.z,
        ]);

        (translation, matrix_to_quaternion(rotation_matrix), scale)
    }
}

#[inline]
pub fn is_nan_vec(v: &Vector3<f32>) -> bool {
    v.iter().any(|c| c.is_nan())
}

/// Normalizes `v`, or returns `fallback` if `v` is NaN or too short to normalize.
#[inline]
pub fn normalize_or(v: Vector3<f32>, fallback: Vector3<f32>) -> Vector3<f32> {
    if is_nan_vec(&v) || v.norm_squared() < DIRECTION_EPSILON {
        fallback
    } else {
        v.normalize()
    }
}

/// Right-handed perspective projection mapping depth to `0..=1`.
pub fn perspective_rh_zo(fov_y_radians: f32, aspect: f32, near: f32, far: f32) -> Matrix4<f32> {
    let f = 1.0 / (fov_y_radians * 0.5).tan();
    let range = near - far;

    #[rustfmt::skip]
    let m = Matrix4::new(
        f / aspect, 0.0, 0.0,         0.0,
        0.0,        f,   0.0,         0.0,
        0.0,        0.0, far / range, near * far / range,
        0.0,        0.0, -1.0,        0.0,
    );
    m
}

/// Right-handed, view-centered orthographic projection mapping depth to `0..=1`.
pub fn orthographic_rh_zo(width: f32, height: f32, near: f32, far: f32) -> Matrix4<f32> {
    let range = near - far;

    #[rustfmt::skip]
    let m = Matrix4::new(
        2.0 / width, 0.0,          0.0,         0.0,
        0.0,         2.0 / height, 0.0,         0.0,
        0.0,         0.0,          1.0 / range, near / range,
        0.0,         0.0,          0.0,         1.0,
    );
    m
}

/// Component-wise interpolation between two matrices.
pub fn lerp_matrix(a: &Matrix4<f32>, b: &Matrix4<f32>, t: f32) -> Matrix4<f32> {
    a.zip_map(b, |x, y| x.lerp(y, t))
}
