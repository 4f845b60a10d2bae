use crate::utils::sizes::{VEC2_SIZE, VEC3_SIZE, VEC4_SIZE, layout_size};
use nalgebra::{Vector2, Vector3, Vector4};
use static_assertions::const_assert_eq;
use wgpu::{BufferAddress, VertexAttribute, VertexBufferLayout, VertexStepMode, vertex_attr_array};

/// The fixed vertex format of imported and built-in geometry.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3D {
    pub position: Vector3<f32>,
    pub normal: Vector3<f32>,
    pub tangent: Vector3<f32>,
    pub color: Vector4<f32>,
    pub tex_coord: Vector2<f32>,
}

impl Vertex3D {
    pub const STRIDE: u32 = size_of::<Vertex3D>() as u32;

    pub const fn new(
        position: Vector3<f32>,
        normal: Vector3<f32>,
        tangent: Vector3<f32>,
        color: Vector4<f32>,
        tex_coord: Vector2<f32>,
    ) -> Self {
        Vertex3D {
            position,
            normal,
            tangent,
            color,
            tex_coord,
        }
    }

    /// A white vertex with only a position and a normal.
    pub const fn basic(position: Vector3<f32>, normal: Vector3<f32>) -> Self {
        Vertex3D {
            position,
            normal,
            tangent: Vector3::new(0.0, 0.0, 0.0),
            color: Vector4::new(1.0, 1.0, 1.0, 1.0),
            tex_coord: Vector2::new(0.0, 0.0),
        }
    }

    const ATTRIBUTES: [VertexAttribute; 5] = vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x3,
        3 => Float32x4,
        4 => Float32x2,
    ];

    /// Tightly packed layout of a buffer holding only `Vertex3D`s, at locations 0 to 4.
    pub const fn continuous_descriptor<'a>() -> VertexBufferLayout<'a> {
        const LAYOUT: VertexBufferLayout = VertexBufferLayout {
            array_stride: Vertex3D::STRIDE as BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: &Vertex3D::ATTRIBUTES,
        };

        const_assert_eq!(Vertex3D::STRIDE as u64, layout_size(&LAYOUT));
        const_assert_eq!(Vertex3D::STRIDE as u64, VEC3_SIZE * 3 + VEC4_SIZE + VEC2_SIZE);

        LAYOUT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_struct() {
        let layout = Vertex3D::continuous_descriptor();
        assert_eq!(Vertex3D::STRIDE, 60);
        assert_eq!(layout.array_stride, 60);
        assert_eq!(layout.attributes.len(), 5);
        assert_eq!(
            layout.attributes[4].offset,
            std::mem::offset_of!(Vertex3D, tex_coord) as u64
        );
        assert_eq!(
            layout.attributes[3].offset,
            std::mem::offset_of!(Vertex3D, color) as u64
        );
    }
}
