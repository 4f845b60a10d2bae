mod common;

use bytemuck::Zeroable;
use nalgebra::{Matrix4, Vector3};
use serial_test::serial;
use vitrail::core::Vertex3D;
use vitrail::core::primitives::cube;
use vitrail::rendering::resources::{
    BufferError, ImportedMesh, ImportedScene, MeshDesc, ResourceFactory, ShaderError, ShaderKind,
    Texture2DDesc, TextureError,
};
use vitrail::rendering::shaders::MESH_SHADER;
use vitrail::rendering::{ErrorCode, Wvp};

#[test]
#[serial]
fn constant_buffer_round_trip() {
    let Some(device) = common::device() else {
        return;
    };
    let factory = ResourceFactory::new(&device);

    let buffer = factory.create_constant_buffer::<Wvp>().unwrap();
    assert_eq!(buffer.read_back(&device).unwrap(), Wvp::zeroed());

    let wvp = Wvp::new(
        Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0)),
        Matrix4::new_scaling(2.0),
        Matrix4::identity(),
    );
    buffer.update(&device, &wvp).unwrap();
    assert_eq!(buffer.read_back(&device).unwrap(), wvp);
}

#[test]
#[serial]
fn static_buffers_reject_updates() {
    let Some(device) = common::device() else {
        return;
    };
    let factory = ResourceFactory::new(&device);

    let vertices = factory
        .create_vertex_buffer_from(&[Vertex3D::basic(Vector3::zeros(), Vector3::y())], false)
        .unwrap();
    let err = vertices
        .update(&device, &[Vertex3D::basic(Vector3::x(), Vector3::y())])
        .unwrap_err();
    assert!(matches!(err, BufferError::UpdateFailed { .. }));

    let indices = factory.create_index_buffer(&[0, 1, 2], true).unwrap();
    indices.update(&device, &[2, 1, 0]).unwrap();
    let err = indices.update(&device, &[0, 1, 2, 3]).unwrap_err();
    assert!(matches!(err, BufferError::InvalidBufferSize { .. }));
}

#[test]
#[serial]
fn empty_buffers_are_rejected() {
    let Some(device) = common::device() else {
        return;
    };
    let factory = ResourceFactory::new(&device);

    let err = factory.create_index_buffer(&[], false).unwrap_err();
    assert!(matches!(err, BufferError::InvalidBufferSize { .. }));
    assert_eq!(err.code(), ErrorCode::INVALID_ARGUMENT);
}

#[test]
#[serial]
fn cube_mesh_is_valid() {
    let Some(device) = common::device() else {
        return;
    };
    let factory = ResourceFactory::new(&device);
    let (vertices, indices) = cube();

    let mesh = factory
        .create_mesh(&vertices, &indices, &MeshDesc::default())
        .unwrap();

    assert!(mesh.is_valid());
    assert_eq!(mesh.index_count(), 36);
    assert_eq!(mesh.stride(), Vertex3D::STRIDE);
    assert_eq!(mesh.vertex_buffer().count(), 8);
}

#[test]
#[serial]
fn mesh_shader_compiles_with_reflected_layout() {
    let Some(device) = common::device() else {
        return;
    };
    let factory = ResourceFactory::new(&device);

    let mut vs = factory
        .create_shader_from_bytes(ShaderKind::Vertex, MESH_SHADER.as_bytes().to_vec(), None)
        .unwrap();
    assert!(vs.is_valid());
    assert_eq!(vs.kind(), ShaderKind::Vertex);
    assert_eq!(vs.entry_point(), Some("vs_main"));
    assert_eq!(vs.input_layout().map(|l| l.elements().len()), Some(5));

    vs.set_debug_name("mesh");
    assert_eq!(vs.debug_name(), Some("mesh"));

    let ps = factory
        .create_shader_from_bytes(ShaderKind::Pixel, MESH_SHADER.as_bytes().to_vec(), None)
        .unwrap();
    assert!(ps.is_valid());
    assert_eq!(ps.entry_point(), Some("fs_main"));
    assert!(ps.input_layout().is_none());

    let err = factory
        .create_shader_from_bytes(ShaderKind::Compute, MESH_SHADER.as_bytes().to_vec(), None)
        .unwrap_err();
    assert!(matches!(err, ShaderError::InvalidShaderType { .. }));
}

#[test]
#[serial]
fn missing_shader_file_yields_placeholder() {
    let Some(device) = common::device() else {
        return;
    };
    let factory = ResourceFactory::new(&device);

    let err = factory
        .create_shader(ShaderKind::Pixel, "does/not/exist.wgsl")
        .unwrap_err();
    let placeholder = err.placeholder().unwrap();
    assert_eq!(placeholder.kind(), ShaderKind::Pixel);
    assert!(!placeholder.is_valid());
}

#[test]
#[serial]
fn texture_upload_reads_back() {
    let Some(device) = common::device() else {
        return;
    };
    let factory = ResourceFactory::new(&device);

    let desc = Texture2DDesc::builder()
        .width(2)
        .height(2)
        .format(wgpu::TextureFormat::Rgba8Unorm)
        .build();
    let pixels: Vec<u8> = (0u8..16).collect();
    let texture = factory.create_texture_2d(&desc, &pixels, 8).unwrap();

    assert_eq!(texture.read_back(&device).unwrap(), pixels);

    // rows wider than the copy alignment and a non-RGBA channel order come back as stored
    let wide = Texture2DDesc::builder()
        .width(70)
        .height(3)
        .format(wgpu::TextureFormat::Bgra8Unorm)
        .build();
    let wide_pixels: Vec<u8> = (0..70 * 3 * 4).map(|i| (i % 251) as u8).collect();
    let texture = factory.create_texture_2d(&wide, &wide_pixels, 70 * 4).unwrap();
    assert_eq!(texture.read_back(&device).unwrap(), wide_pixels);

    let err = factory.create_texture_2d(&desc, &pixels, 4).unwrap_err();
    assert!(matches!(err, TextureError::InvalidDimensions { .. }));

    let err = factory
        .create_texture_from_compressed_data(b"not an image")
        .unwrap_err();
    assert!(matches!(err, TextureError::CreateTextureFailed { .. }));
}

#[test]
#[serial]
fn imported_scene_uploads_by_name() {
    let Some(device) = common::device() else {
        return;
    };
    let factory = ResourceFactory::new(&device);
    let (vertices, indices) = cube();

    let mut imported = ImportedScene::default();
    imported.push_mesh(ImportedMesh {
        name: "cube".to_string(),
        vertices: vertices.to_vec(),
        indices: indices.to_vec(),
    });

    let uploaded = factory.upload_imported(&imported).unwrap();
    assert_eq!(uploaded.meshes.len(), 1);
    assert_eq!(uploaded.mesh("cube").map(|m| m.index_count()), Some(36));
    assert!(uploaded.mesh("sphere").is_none());
}
