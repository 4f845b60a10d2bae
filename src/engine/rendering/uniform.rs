use crate::ensure_aligned;
use crate::rendering::GraphicsDevice;
use crate::rendering::resources::ConstantBuffer;
use bytemuck::Pod;
use nalgebra::Matrix4;
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingType, BufferBindingType, BufferSize, ShaderStages,
};

/// World, view and projection matrices of one draw.
///
/// nalgebra stores matrices column by column, which is the layout WGSL expects, so the
/// struct is uploaded as is.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Wvp {
    pub world: Matrix4<f32>,
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
}

ensure_aligned!(Wvp { world, view, projection }, align <= 16 * 4 * 3 => size);

impl Wvp {
    pub fn new(world: Matrix4<f32>, view: Matrix4<f32>, projection: Matrix4<f32>) -> Self {
        Wvp {
            world,
            view,
            projection,
        }
    }
}

impl Default for Wvp {
    fn default() -> Self {
        Wvp {
            world: Matrix4::identity(),
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
        }
    }
}

/// Binds one constant buffer at binding 0 of a bind group, visible to vertex and pixel
/// shaders.
#[derive(Debug)]
pub struct ConstantBinding {
    layout: BindGroupLayout,
    bind_group: BindGroup,
}

impl ConstantBinding {
    pub fn new<T: Pod>(device: &GraphicsDevice, buffer: &ConstantBuffer<T>, label: &str) -> Self {
        let layout = device
            .device()
            .create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: Some(&format!("{label} Bind Group Layout")),
                entries: &[BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
                    ty: BindingType::Buffer {
                        ty: BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: BufferSize::new(size_of::<T>() as u64),
                    },
                    count: None,
                }],
            });

        let bind_group = device.device().create_bind_group(&BindGroupDescriptor {
            label: Some(&format!("{label} Bind Group")),
            layout: &layout,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: buffer.raw().as_entire_binding(),
            }],
        });

        ConstantBinding { layout, bind_group }
    }

    #[inline]
    pub fn layout(&self) -> &BindGroupLayout {
        &self.layout
    }

    #[inline]
    pub fn bind_group(&self) -> &BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::sizes::MAT4_SIZE;

    #[test]
    fn wvp_is_three_packed_matrices() {
        assert_eq!(size_of::<Wvp>() as u64, MAT4_SIZE * 3);
        assert_eq!(size_of::<Wvp>(), 192);
        assert_eq!(std::mem::offset_of!(Wvp, projection), 128);
    }

    #[test]
    fn matrices_upload_column_major() {
        let mut world = Matrix4::identity();
        world[(0, 3)] = 7.0;
        let wvp = Wvp::new(world, Matrix4::identity(), Matrix4::identity());

        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&wvp));
        // translation sits in the fourth column, i.e. floats 12..15
        assert_eq!(floats[12], 7.0);
        assert_eq!(floats[3], 0.0);
    }
}
