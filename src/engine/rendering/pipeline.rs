use crate::rendering::resources::shader::{BindingFailedErr, Result};
use crate::rendering::resources::{Mesh, Shader, ShaderId};
use crate::rendering::ErrorCode;
use log::debug;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use wgpu::*;

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Everything a render pipeline is specialised on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    vertex_shader: ShaderId,
    pixel_shader: ShaderId,
    topology: PrimitiveTopology,
    stride: u32,
    format: TextureFormat,
}

impl PipelineKey {
    pub fn new(vs: &Shader, ps: &Shader, mesh: &Mesh, format: TextureFormat) -> Self {
        PipelineKey {
            vertex_shader: vs.id(),
            pixel_shader: ps.id(),
            topology: mesh.topology(),
            stride: mesh.stride(),
            format,
        }
    }

    pub fn uses_shader(&self, id: ShaderId) -> bool {
        self.vertex_shader == id || self.pixel_shader == id
    }
}

pub struct RenderPipelineBuilder<'a> {
    label: String,
    layout: &'a PipelineLayout,
    vertex: &'a Shader,
    pixel: &'a Shader,
    topology: PrimitiveTopology,
    stride: u32,
    format: TextureFormat,
}

impl<'a> RenderPipelineBuilder<'a> {
    pub fn mesh(
        layout: &'a PipelineLayout,
        vertex: &'a Shader,
        pixel: &'a Shader,
        mesh: &Mesh,
        format: TextureFormat,
    ) -> RenderPipelineBuilder<'a> {
        let name = vertex.debug_name().unwrap_or("Mesh");
        RenderPipelineBuilder {
            label: format!("{name} Pipeline"),
            layout,
            vertex,
            pixel,
            topology: mesh.topology(),
            stride: mesh.stride(),
            format,
        }
    }

    pub fn build(&self, device: &Device) -> Result<RenderPipeline> {
        let (Some(vs_module), Some(input_layout)) = (self.vertex.module(), self.vertex.input_layout())
        else {
            return BindingFailedErr {
                code: ErrorCode::INVALID_ARGUMENT,
                message: "vertex shader has no module or input layout",
            }
            .fail();
        };
        let Some(ps_module) = self.pixel.module() else {
            return BindingFailedErr {
                code: ErrorCode::INVALID_ARGUMENT,
                message: "pixel shader has no module",
            }
            .fail();
        };

        const DEPTH_STENCIL: DepthStencilState = DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: CompareFunction::Less,
            stencil: StencilState {
                front: StencilFaceState::IGNORE,
                back: StencilFaceState::IGNORE,
                read_mask: 0,
                write_mask: 0,
            },
            bias: DepthBiasState {
                constant: 0,
                slope_scale: 0.0,
                clamp: 0.0,
            },
        };

        let buffers = [input_layout.buffer_layout(self.stride as BufferAddress)];
        let targets = [Some(ColorTargetState {
            format: self.format,
            blend: None,
            write_mask: ColorWrites::all(),
        })];

        let strip_index_format = matches!(
            self.topology,
            PrimitiveTopology::LineStrip | PrimitiveTopology::TriangleStrip
        )
        .then_some(IndexFormat::Uint32);

        debug!("Building pipeline {:?} ({:?})", self.label, self.topology);

        Ok(device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(&self.label),
            layout: Some(self.layout),
            vertex: VertexState {
                module: vs_module,
                entry_point: self.vertex.entry_point(),
                compilation_options: PipelineCompilationOptions::default(),
                buffers: &buffers,
            },
            primitive: PrimitiveState {
                topology: self.topology,
                strip_index_format,
                cull_mode: None,
                ..PrimitiveState::default()
            },
            depth_stencil: Some(DEPTH_STENCIL),
            multisample: MultisampleState::default(),
            fragment: Some(FragmentState {
                module: ps_module,
                entry_point: self.pixel.entry_point(),
                compilation_options: PipelineCompilationOptions::default(),
                targets: &targets,
            }),
            multiview_mask: None,
            cache: None,
        }))
    }
}

/// Pipelines built so far, keyed by shader pair, mesh layout and target format.
#[derive(Default)]
pub struct PipelineCache {
    pipelines: HashMap<PipelineKey, RenderPipeline>,
}

impl PipelineCache {
    pub fn get_or_build(
        &mut self,
        key: PipelineKey,
        builder: impl FnOnce() -> Result<RenderPipeline>,
    ) -> Result<&RenderPipeline> {
        match self.pipelines.entry(key) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(builder()?)),
        }
    }

    /// Drops every pipeline built from shader `id`. Returns how many were dropped.
    pub fn evict_shader(&mut self, id: ShaderId) -> usize {
        let before = self.pipelines.len();
        self.pipelines.retain(|key, _| !key.uses_shader(id));
        let evicted = before - self.pipelines.len();
        if evicted > 0 {
            debug!("Evicted {evicted} pipelines of shader {id:?}");
        }
        evicted
    }

    pub fn contains(&self, key: &PipelineKey) -> bool {
        self.pipelines.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    pub fn clear(&mut self) {
        self.pipelines.clear();
    }
}

/// Creates the depth target matching a swap chain extent.
pub fn create_depth_target(device: &Device, width: u32, height: u32) -> (Texture, TextureView) {
    let texture = device.create_texture(&TextureDescriptor {
        label: Some("Depth Texture"),
        size: Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&TextureViewDescriptor::default());
    (texture, view)
}
