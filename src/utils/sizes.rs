use nalgebra::{Matrix4, Vector2, Vector3, Vector4};

pub const VEC2_SIZE: u64 = size_of::<Vector2<f32>>() as u64;
pub const VEC3_SIZE: u64 = size_of::<Vector3<f32>>() as u64;
pub const VEC4_SIZE: u64 = size_of::<Vector4<f32>>() as u64;
pub const MAT4_SIZE: u64 = size_of::<Matrix4<f32>>() as u64;

/// Constant buffers are bound in 16 byte registers.
pub const CONSTANT_BUFFER_ALIGNMENT: usize = 16;

/// Sum of all attribute sizes in a vertex buffer layout, ignoring its stride.
pub const fn layout_size(layout: &wgpu::VertexBufferLayout) -> u64 {
    let mut sum: u64 = 0;
    let mut i = 0;

    while i < layout.attributes.len() {
        sum += layout.attributes[i].format.size();
        i += 1;
    }

    sum
}
