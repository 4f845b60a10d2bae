//! Built-in geometry.

use crate::core::Vertex3D;
use nalgebra::{Vector2, Vector3, Vector4};

pub const CUBE_INDICES: [u32; 36] = [
    0, 1, 3, 3, 1, 2, //
    1, 5, 2, 2, 5, 6, //
    5, 4, 6, 6, 4, 7, //
    4, 0, 7, 7, 0, 3, //
    3, 2, 7, 7, 2, 6, //
    4, 5, 0, 0, 5, 1,
];

const CUBE_CORNERS: [([f32; 3], [f32; 4]); 8] = [
    ([-1.0, -1.0, -1.0], [0.0, 0.0, 1.0, 1.0]),
    ([1.0, -1.0, -1.0], [0.0, 1.0, 1.0, 1.0]),
    ([1.0, 1.0, -1.0], [1.0, 0.0, 0.0, 1.0]),
    ([-1.0, 1.0, -1.0], [0.0, 1.0, 0.0, 1.0]),
    ([-1.0, -1.0, 1.0], [1.0, 0.0, 1.0, 1.0]),
    ([1.0, -1.0, 1.0], [1.0, 1.0, 1.0, 1.0]),
    ([1.0, 1.0, 1.0], [0.0, 0.0, 0.0, 1.0]),
    ([-1.0, 1.0, 1.0], [1.0, 1.0, 0.0, 1.0]),
];

/// A cube spanning -1..1 on every axis with one coloured vertex per corner. Normals point
/// away from the centre.
pub fn cube() -> ([Vertex3D; 8], [u32; 36]) {
    let vertices = CUBE_CORNERS.map(|([x, y, z], [r, g, b, a])| {
        let position = Vector3::new(x, y, z);
        Vertex3D::new(
            position,
            position.normalize(),
            Vector3::zeros(),
            Vector4::new(r, g, b, a),
            Vector2::new((x + 1.0) * 0.5, (y + 1.0) * 0.5),
        )
    });

    (vertices, CUBE_INDICES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_indices_stay_in_range() {
        let (vertices, indices) = cube();
        assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));
        assert_eq!(indices.len() % 3, 0);
    }

    #[test]
    fn every_corner_is_used() {
        let (_, indices) = cube();
        for corner in 0..8u32 {
            assert!(indices.contains(&corner));
        }
    }
}
