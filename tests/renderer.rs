mod common;

use nalgebra::Vector3;
use serial_test::serial;
use std::sync::Arc;
use vitrail::components::{Camera, CameraDesc};
use vitrail::core::primitives::cube;
use vitrail::core::SceneGraph;
use vitrail::rendering::renderer::node_world_matrix;
use vitrail::rendering::resources::{Mesh, MeshDesc, Model, Shader, ShaderKind};
use vitrail::rendering::shaders::MESH_SHADER;
use vitrail::rendering::{Renderer, Wvp};

const SIZE: u32 = 64;

fn cube_mesh(renderer: &Renderer) -> Arc<Mesh> {
    let (vertices, indices) = cube();
    let mesh = renderer
        .resource_factory()
        .create_mesh(&vertices, &indices, &MeshDesc::default())
        .unwrap();
    Arc::new(mesh)
}

fn front_camera() -> Camera {
    Camera::new(
        &CameraDesc::builder()
            .aspect_ratio(1.0)
            .position(Vector3::new(0.0, 0.0, 6.0))
            .look_at(Vector3::zeros())
            .build(),
    )
}

fn vertex_shader(renderer: &Renderer) -> Arc<Shader> {
    let shader = renderer
        .resource_factory()
        .create_shader_from_bytes(ShaderKind::Vertex, MESH_SHADER.as_bytes().to_vec(), None)
        .unwrap();
    Arc::new(shader)
}

fn texel(pixels: &[u8], x: u32, y: u32) -> &[u8] {
    let offset = ((y * SIZE + x) * 4) as usize;
    &pixels[offset..offset + 4]
}

#[test]
#[serial]
fn visible_mesh_is_drawn_with_its_matrices() {
    let Some(mut renderer) = common::offscreen_renderer(SIZE, SIZE) else {
        return;
    };
    let mesh = cube_mesh(&renderer);

    let mut scene = SceneGraph::new();
    let root = scene.root();
    let id = scene.create_child(root, "cube").unwrap();
    let node = scene.node_mut(id).unwrap();
    node.set_property(mesh);
    node.transform_mut().set_uniform_local_scale(0.5);
    scene.update_transforms();

    let camera = front_camera();
    renderer.render_frame(&scene, &camera).unwrap();
    assert_eq!(renderer.draw_calls(), 1);

    let expected = Wvp::new(
        node_world_matrix(scene.node(id).unwrap()),
        *camera.view_matrix(),
        *camera.projection_matrix(),
    );
    let written = renderer.wvp_buffer().read_back(renderer.device()).unwrap();
    assert_eq!(written, expected);

    let target = renderer.target().offscreen().unwrap();
    let pixels = target.read_back(renderer.device()).unwrap();
    assert_eq!(pixels.len(), (SIZE * SIZE * 4) as usize);
    assert_eq!(texel(&pixels, 0, 0), [0, 0, 0, 255]);
    assert_ne!(&texel(&pixels, SIZE / 2, SIZE / 2)[..3], [0, 0, 0]);
}

#[test]
#[serial]
fn hidden_nodes_and_models_count_per_mesh() {
    let Some(mut renderer) = common::offscreen_renderer(SIZE, SIZE) else {
        return;
    };
    let mesh = cube_mesh(&renderer);

    let mut scene = SceneGraph::new();
    let root = scene.root();
    let grouped = scene.create_child(root, "grouped").unwrap();
    scene
        .node_mut(grouped)
        .unwrap()
        .set_property(Model::new([mesh.clone(), mesh.clone()]));

    let hidden = scene.create_child(root, "hidden").unwrap();
    let node = scene.node_mut(hidden).unwrap();
    node.set_property(mesh);
    node.set_visible(false);
    scene.update_transforms();

    renderer.render_frame(&scene, &front_camera()).unwrap();
    assert_eq!(renderer.draw_calls(), 2);

    renderer.render_frame(&SceneGraph::new(), &front_camera()).unwrap();
    assert_eq!(renderer.draw_calls(), 0);
}

#[test]
#[serial]
fn replacing_a_shader_drops_its_pipelines() {
    let Some(mut renderer) = common::offscreen_renderer(SIZE, SIZE) else {
        return;
    };
    let mut scene = SceneGraph::new();
    let root = scene.root();
    let id = scene.create_child(root, "cube").unwrap();
    scene.node_mut(id).unwrap().set_property(cube_mesh(&renderer));
    scene.update_transforms();
    let camera = front_camera();

    renderer.render_frame(&scene, &camera).unwrap();
    assert_eq!(renderer.pipeline_count(), 1);

    let first = vertex_shader(&renderer);
    renderer.set_shader(first.clone()).unwrap();
    renderer.render_frame(&scene, &camera).unwrap();
    assert_eq!(renderer.pipeline_count(), 2);

    // rebinding the same shader keeps its pipeline
    renderer.set_shader(first).unwrap();
    assert_eq!(renderer.pipeline_count(), 2);

    renderer.set_shader(vertex_shader(&renderer)).unwrap();
    assert_eq!(renderer.pipeline_count(), 1);

    renderer.render_frame(&scene, &camera).unwrap();
    assert_eq!(renderer.pipeline_count(), 2);
    assert_eq!(renderer.draw_calls(), 1);

    renderer.clear_state();
    assert_eq!(renderer.pipeline_count(), 0);
}

#[test]
#[serial]
fn offscreen_target_follows_resize() {
    let Some(mut renderer) = common::offscreen_renderer(SIZE, SIZE) else {
        return;
    };

    renderer.resize(0, 32).unwrap();
    assert_eq!(renderer.target().width(), SIZE);

    renderer.resize(32, 16).unwrap();
    assert_eq!((renderer.target().width(), renderer.target().height()), (32, 16));
    assert_eq!(renderer.viewport().width, 32.0);
    assert!(renderer.swap_chain().is_none());

    renderer.render_frame(&SceneGraph::new(), &front_camera()).unwrap();
    let pixels = renderer
        .target()
        .offscreen()
        .unwrap()
        .read_back(renderer.device())
        .unwrap();
    assert_eq!(pixels.len(), 32 * 16 * 4);
    assert!(pixels.chunks_exact(4).all(|texel| texel == [0, 0, 0, 255]));
}
