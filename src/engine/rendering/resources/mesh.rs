use crate::error_info;
use crate::rendering::GraphicsDevice;
use crate::rendering::resources::buffer::{BufferError, IndexBuffer, VertexBuffer};
use bon::Builder;
use bytemuck::Pod;
use snafu::Snafu;
use wgpu::{PrimitiveTopology, RenderPass};

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)), visibility(pub(crate)))]
pub enum MeshError {
    #[snafu(display("Failed to create the vertex buffer: {source}"))]
    CreateVertexBufferFailed { source: BufferError },

    #[snafu(display("Failed to create the index buffer: {source}"))]
    CreateIndexBufferFailed { source: BufferError },
}

error_info!(MeshError {} wrap {
    CreateVertexBufferFailed,
    CreateIndexBufferFailed,
});

#[derive(Debug, Copy, Clone, PartialEq, Eq, Builder)]
pub struct MeshDesc {
    #[builder(default = PrimitiveTopology::TriangleList)]
    pub topology: PrimitiveTopology,
    /// Bytes per vertex, 0 means the size of the vertex type.
    #[builder(default)]
    pub vertex_stride: u32,
    #[builder(default)]
    pub dynamic_vb: bool,
    #[builder(default)]
    pub dynamic_ib: bool,
}

impl Default for MeshDesc {
    fn default() -> Self {
        MeshDesc {
            topology: PrimitiveTopology::TriangleList,
            vertex_stride: 0,
            dynamic_vb: false,
            dynamic_ib: false,
        }
    }
}

/// Indexed geometry. Shared between nodes as `Arc<Mesh>`.
#[derive(Debug)]
pub struct Mesh {
    vertices: VertexBuffer,
    indices: IndexBuffer,
    topology: PrimitiveTopology,
}

impl Mesh {
    pub(crate) fn new(
        vertices: VertexBuffer,
        indices: IndexBuffer,
        topology: PrimitiveTopology,
    ) -> Self {
        Mesh {
            vertices,
            indices,
            topology,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.vertices.count() > 0 && self.vertices.stride() > 0 && self.indices.count() > 0
    }

    #[inline]
    pub fn vertex_buffer(&self) -> &VertexBuffer {
        &self.vertices
    }

    #[inline]
    pub fn index_buffer(&self) -> &IndexBuffer {
        &self.indices
    }

    #[inline]
    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    #[inline]
    pub fn stride(&self) -> u32 {
        self.vertices.stride()
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.indices.count()
    }

    pub fn bind(&self, pass: &mut RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertices.buffer().slice());
        pass.set_index_buffer(self.indices.buffer().slice(), IndexBuffer::FORMAT);
    }

    pub fn draw(&self, pass: &mut RenderPass<'_>) {
        self.bind(pass);
        pass.draw_indexed(0..self.indices.count(), 0, 0..1);
    }

    pub fn update_vertices<V: Pod>(
        &self,
        device: &GraphicsDevice,
        vertices: &[V],
    ) -> Result<(), BufferError> {
        self.vertices.update(device, vertices)
    }

    pub fn update_indices(&self, device: &GraphicsDevice, indices: &[u32]) -> Result<(), BufferError> {
        self.indices.update(device, indices)
    }
}
