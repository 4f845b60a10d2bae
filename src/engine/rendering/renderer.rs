//! Composition root of the rendering layer.
//!
//! The [`Renderer`] owns the device, the render target and the per-frame state: a depth
//! target, the [`Wvp`] constant buffer and the bound shaders. The target is either a
//! window's swap chain or an offscreen texture. Every mesh draw is its own
//! submission, written after its constant buffer update, so each draw observes its own
//! matrices.

use crate::components::Camera;
use crate::core::{Node, SceneGraph};
use crate::error_info;
use crate::rendering::pipeline::{
    PipelineCache, PipelineKey, RenderPipelineBuilder, create_depth_target,
};
use crate::rendering::resources::shader::BindingFailedErr;
use crate::rendering::resources::{
    BufferError, ConstantBuffer, Mesh, Model, ResourceFactory, Shader, ShaderError, ShaderKind,
};
use crate::rendering::shaders::MESH_SHADER;
use crate::rendering::target::{RenderTarget, TargetDesc};
use crate::rendering::uniform::{ConstantBinding, Wvp};
use crate::rendering::{
    DeviceDesc, DeviceError, ErrorCode, GraphicsDevice, SwapChain, SwapChainError,
};
use bon::Builder;
use bytemuck::Pod;
use log::{debug, error, info, warn};
use nalgebra::{Matrix4, Vector3};
use snafu::{ResultExt, Snafu};
use std::sync::Arc;
use wgpu::{
    Color, CommandEncoderDescriptor, LoadOp, Operations, PipelineLayout,
    PipelineLayoutDescriptor, RenderPass, RenderPassColorAttachment,
    RenderPassDepthStencilAttachment, RenderPassDescriptor, StoreOp, Texture, TextureView,
};

/// Errors logged per failing streak before the renderer goes quiet.
const MAX_PRINTED_ERRORS: u32 = 5;

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)), visibility(pub(crate)))]
pub enum RenderError {
    #[snafu(display("Graphics device error: {source}"))]
    Device { source: DeviceError },

    #[snafu(display("Swap chain error: {source}"))]
    SwapChain { source: SwapChainError },

    #[snafu(display("Buffer error: {source}"))]
    Buffer { source: BufferError },

    #[snafu(display("Shader error: {source}"))]
    Shader { source: ShaderError },

    #[snafu(display("No frame in flight [{code}]: {message}"))]
    NoFrame { code: ErrorCode, message: String },

    #[snafu(display("Invalid mesh [{code}]: {message}"))]
    InvalidMesh { code: ErrorCode, message: String },
}

error_info!(RenderError { NoFrame, InvalidMesh } wrap {
    Device,
    SwapChain,
    Buffer,
    Shader,
});

pub type Result<T, E = RenderError> = std::result::Result<T, E>;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Covers a whole `width` x `height` target with the full depth range.
    pub fn full(width: u32, height: u32) -> Viewport {
        Viewport {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    fn apply(&self, pass: &mut RenderPass<'_>) {
        pass.set_viewport(
            self.x,
            self.y,
            self.width,
            self.height,
            self.min_depth,
            self.max_depth,
        );
    }
}

#[derive(Debug, Builder)]
pub struct RendererDesc {
    #[builder(default)]
    pub device: DeviceDesc,
    /// A [`SwapChainDesc`](crate::rendering::SwapChainDesc) converts into a window target.
    #[builder(into)]
    pub target: TargetDesc,
    #[builder(default = Color { r: 0.1, g: 0.1, b: 0.1, a: 1.0 })]
    pub clear_color: Color,
}

pub struct Renderer {
    target: RenderTarget,
    depth_texture: Texture,
    depth_view: TextureView,

    wvp_buffer: ConstantBuffer<Wvp>,
    wvp_binding: ConstantBinding,
    pipeline_layout: PipelineLayout,
    pipelines: PipelineCache,

    mesh_vs: Arc<Shader>,
    mesh_ps: Arc<Shader>,
    vertex_shader: Option<Arc<Shader>>,
    pixel_shader: Option<Arc<Shader>>,

    viewport: Option<Viewport>,
    clear_color: Color,
    printed_errors: u32,
    draw_calls: u32,

    // dropped last
    device: GraphicsDevice,
}

impl Renderer {
    pub fn new(desc: RendererDesc) -> Result<Renderer> {
        let device = GraphicsDevice::create(&desc.device).context(DeviceErr)?;
        let target = RenderTarget::create(&device, &desc.target).context(SwapChainErr)?;

        let (depth_texture, depth_view) =
            create_depth_target(device.device(), target.width(), target.height());

        let factory = ResourceFactory::new(&device);
        let wvp_buffer = factory
            .create_constant_buffer_with(&Wvp::default())
            .context(BufferErr)?;
        let wvp_binding = ConstantBinding::new(&device, &wvp_buffer, "WVP");

        let pipeline_layout = device
            .device()
            .create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some("Mesh Pipeline Layout"),
                bind_group_layouts: &[wvp_binding.layout()],
                immediate_size: 0,
            });

        let mesh_vs = factory
            .create_shader_from_bytes(
                ShaderKind::Vertex,
                MESH_SHADER.as_bytes().to_vec(),
                Some("Mesh Vertex Shader"),
            )
            .context(ShaderErr)?;
        let mesh_ps = factory
            .create_shader_from_bytes(
                ShaderKind::Pixel,
                MESH_SHADER.as_bytes().to_vec(),
                Some("Mesh Pixel Shader"),
            )
            .context(ShaderErr)?;

        info!(
            "Renderer ready at {}x{}",
            target.width(),
            target.height()
        );

        Ok(Renderer {
            target,
            depth_texture,
            depth_view,
            wvp_buffer,
            wvp_binding,
            pipeline_layout,
            pipelines: PipelineCache::default(),
            mesh_vs: Arc::new(mesh_vs),
            mesh_ps: Arc::new(mesh_ps),
            vertex_shader: None,
            pixel_shader: None,
            viewport: None,
            clear_color: desc.clear_color,
            printed_errors: 0,
            draw_calls: 0,
            device,
        })
    }

    #[inline]
    pub fn device(&self) -> &GraphicsDevice {
        &self.device
    }

    pub fn resource_factory(&self) -> ResourceFactory<'_> {
        ResourceFactory::new(&self.device)
    }

    #[inline]
    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    /// The window swap chain, `None` when rendering offscreen.
    #[inline]
    pub fn swap_chain(&self) -> Option<&SwapChain> {
        self.target.swap_chain()
    }

    #[inline]
    pub fn swap_chain_mut(&mut self) -> Option<&mut SwapChain> {
        self.target.swap_chain_mut()
    }

    /// The constant buffer holding the matrices of the last draw.
    #[inline]
    pub fn wvp_buffer(&self) -> &ConstantBuffer<Wvp> {
        &self.wvp_buffer
    }

    /// Meshes drawn since the last [`Renderer::begin_frame`].
    #[inline]
    pub fn draw_calls(&self) -> u32 {
        self.draw_calls
    }

    #[inline]
    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    /// Unbinds all shaders and forgets built pipelines. Draws fall back to the built-in
    /// mesh shaders and the full-target viewport.
    pub fn clear_state(&mut self) {
        self.vertex_shader = None;
        self.pixel_shader = None;
        self.viewport = None;
        self.pipelines.clear();
    }

    /// Acquires the back buffer for this frame.
    pub fn begin_frame(&mut self) -> Result<()> {
        self.target.acquire(&self.device).context(SwapChainErr)?;
        self.draw_calls = 0;
        Ok(())
    }

    /// Clears the back buffer to `color` and the depth target to the far plane.
    pub fn clear_back_buffer(&mut self, color: Color) -> Result<()> {
        let view = self.back_buffer_view()?;

        let mut encoder =
            self.device
                .device()
                .create_command_encoder(&CommandEncoderDescriptor {
                    label: Some("Clear Encoder"),
                });
        encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("Clear Pass"),
            color_attachments: &[Some(RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops: Operations {
                    load: LoadOp::Clear(color),
                    store: StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(Operations {
                    load: LoadOp::Clear(1.0),
                    store: StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        self.device.queue().submit(Some(encoder.finish()));
        Ok(())
    }

    fn back_buffer_view(&self) -> Result<&TextureView> {
        match self.target.view() {
            Some(view) => Ok(view),
            None => NoFrameErr {
                code: ErrorCode::INVALID_ARGUMENT,
                message: "begin_frame was not called",
            }
            .fail(),
        }
    }

    /// Restricts following draws to `viewport`.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport.unwrap_or_else(|| {
            Viewport::full(self.target.width(), self.target.height())
        })
    }

    /// Binds a vertex or pixel shader for following draws. Stages without a render
    /// pipeline slot are accepted and ignored.
    pub fn set_shader(&mut self, shader: Arc<Shader>) -> Result<(), ShaderError> {
        if !shader.is_valid() {
            return BindingFailedErr {
                code: ErrorCode::INVALID_ARGUMENT,
                message: format!("{} shader is not valid", shader.kind()),
            }
            .fail();
        }

        let id = shader.id();
        let replaced = match shader.kind() {
            ShaderKind::Vertex => self.vertex_shader.replace(shader),
            ShaderKind::Pixel => self.pixel_shader.replace(shader),
            kind @ (ShaderKind::Compute
            | ShaderKind::Geometry
            | ShaderKind::Domain
            | ShaderKind::Hull) => {
                warn!("{kind} shaders have no render pipeline stage, ignoring");
                None
            }
        };

        if let Some(old) = replaced.filter(|old| old.id() != id) {
            let evicted = self.pipelines.evict_shader(old.id());
            debug!("Replaced {} shader, dropped {evicted} pipelines", old.kind());
        }
        Ok(())
    }

    #[inline]
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    pub fn update_constant_buffer<T: Pod>(&self, buffer: &ConstantBuffer<T>, value: &T) -> Result<()> {
        buffer.update(&self.device, value).context(BufferErr)
    }

    /// Draws `mesh` with the bound shaders and the current WVP constant buffer contents.
    pub fn draw_mesh(&mut self, mesh: &Mesh) -> Result<()> {
        if !mesh.is_valid() {
            return InvalidMeshErr {
                code: ErrorCode::INVALID_ARGUMENT,
                message: "mesh has no vertices or indices",
            }
            .fail();
        }

        let viewport = self.viewport();
        let view = match self.target.view() {
            Some(view) => view,
            None => {
                return NoFrameErr {
                    code: ErrorCode::INVALID_ARGUMENT,
                    message: "begin_frame was not called",
                }
                .fail();
            }
        };

        let vs = self.vertex_shader.as_ref().unwrap_or(&self.mesh_vs);
        let ps = self.pixel_shader.as_ref().unwrap_or(&self.mesh_ps);
        let format = self.target.format();
        let key = PipelineKey::new(vs, ps, mesh, format);

        let layout = &self.pipeline_layout;
        let device = &self.device;
        let pipeline = self
            .pipelines
            .get_or_build(key, || {
                RenderPipelineBuilder::mesh(layout, vs, ps, mesh, format).build(device.device())
            })
            .context(ShaderErr)?;

        let mut encoder = device
            .device()
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Mesh Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("Mesh Pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Load,
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Load,
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, self.wvp_binding.bind_group(), &[]);
            viewport.apply(&mut pass);
            mesh.draw(&mut pass);
        }

        device.queue().submit(Some(encoder.finish()));
        self.draw_calls += 1;
        Ok(())
    }

    /// Draws every visible node carrying an `Arc<Mesh>` or a [`Model`] property. A node
    /// with both draws its mesh first.
    pub fn render_scene(&mut self, scene: &SceneGraph, camera: &Camera) -> Result<()> {
        let mut draws = Vec::new();
        scene.for_each_visible(scene.root(), |_, node| {
            let world = node_world_matrix(node);
            if let Some(mesh) = node.property::<Arc<Mesh>>() {
                draws.push((mesh.clone(), world));
            }
            if let Some(model) = node.property::<Model>() {
                draws.extend(model.meshes().iter().map(|mesh| (mesh.clone(), world)));
            }
        });

        for (mesh, world) in draws {
            let wvp = Wvp::new(world, *camera.view_matrix(), *camera.projection_matrix());
            self.wvp_buffer.update(&self.device, &wvp).context(BufferErr)?;
            self.draw_mesh(&mesh)?;
        }
        Ok(())
    }

    pub fn present(&mut self) -> Result<()> {
        self.target.present().context(SwapChainErr)
    }

    /// Resizes the render target and the depth target. A zero extent, as reported for
    /// minimized windows, is ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            debug!("Ignoring resize to {width}x{height}");
            return Ok(());
        }

        self.target
            .resize(&self.device, width, height)
            .context(SwapChainErr)?;

        let (texture, view) = create_depth_target(self.device.device(), width, height);
        self.depth_texture = texture;
        self.depth_view = view;
        Ok(())
    }

    /// Blocks until the GPU finished all submitted work.
    pub fn flush(&self) {
        self.device.flush();
    }

    /// Renders and presents a whole frame. Failures are logged, up to a few in a row.
    pub fn render_frame(&mut self, scene: &SceneGraph, camera: &Camera) -> Result<()> {
        let result = self.render_frame_inner(scene, camera);

        match &result {
            Ok(()) => self.printed_errors = 0,
            Err(e) => {
                if self.printed_errors < MAX_PRINTED_ERRORS {
                    self.printed_errors += 1;
                    error!("{e}");
                    if self.printed_errors == MAX_PRINTED_ERRORS {
                        warn!("Suppressing further render errors until a frame succeeds");
                    }
                }
            }
        }
        result
    }

    fn render_frame_inner(&mut self, scene: &SceneGraph, camera: &Camera) -> Result<()> {
        self.begin_frame()?;
        self.clear_back_buffer(self.clear_color)?;
        self.render_scene(scene, camera)?;
        self.present()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.device.flush();
        self.vertex_shader = None;
        self.pixel_shader = None;
        self.pipelines.clear();

        #[cfg(debug_assertions)]
        self.device.report_live_objects(false);
    }
}

/// A node's world matrix, moved by its optional `Vector3<f32>` world-space offset.
pub fn node_world_matrix(node: &Node) -> Matrix4<f32> {
    match node.property::<Vector3<f32>>() {
        Some(offset) => Matrix4::new_translation(offset) * node.world_matrix(),
        None => *node.world_matrix(),
    }
}
