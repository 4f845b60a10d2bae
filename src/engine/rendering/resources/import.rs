//! The hand-off point for geometry and textures loaded by an external importer.
//!
//! Importers produce an [`ImportedScene`] in the fixed [`Vertex3D`] format with 32-bit
//! indices. Uploading it turns every entry into a GPU resource, keeping the name index.

use crate::core::Vertex3D;
use crate::error_info;
use crate::rendering::resources::factory::ResourceFactory;
use crate::rendering::resources::mesh::{Mesh, MeshDesc, MeshError};
use crate::rendering::resources::texture::{Texture2D, TextureError};
use log::debug;
use snafu::{ResultExt, Snafu};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)), visibility(pub(crate)))]
pub enum ImportError {
    #[snafu(display("Failed to upload mesh {name:?}: {source}"))]
    MeshUpload { name: String, source: MeshError },

    #[snafu(display("Failed to upload texture #{index}: {source}"))]
    TextureUpload { index: usize, source: TextureError },
}

error_info!(ImportError {} wrap { MeshUpload, TextureUpload });

#[derive(Debug, Clone, Default)]
pub struct ImportedMesh {
    pub name: String,
    pub vertices: Vec<Vertex3D>,
    pub indices: Vec<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct ImportedScene {
    pub meshes: Vec<ImportedMesh>,
    /// Encoded image files, decoded on upload.
    pub textures: Vec<Vec<u8>>,
    pub mesh_index: HashMap<String, usize>,
}

impl ImportedScene {
    /// Adds a mesh and indexes it by name.
    pub fn push_mesh(&mut self, mesh: ImportedMesh) -> usize {
        let index = self.meshes.len();
        self.mesh_index.insert(mesh.name.clone(), index);
        self.meshes.push(mesh);
        index
    }
}

#[derive(Debug, Default)]
pub struct UploadedScene {
    pub meshes: Vec<Arc<Mesh>>,
    pub textures: Vec<Texture2D>,
    pub mesh_index: HashMap<String, usize>,
}

impl UploadedScene {
    pub fn mesh(&self, name: &str) -> Option<&Arc<Mesh>> {
        self.mesh_index.get(name).and_then(|&i| self.meshes.get(i))
    }
}

impl ResourceFactory<'_> {
    pub fn upload_imported(&self, scene: &ImportedScene) -> Result<UploadedScene, ImportError> {
        let meshes = scene
            .meshes
            .iter()
            .map(|mesh| {
                self.create_mesh(&mesh.vertices, &mesh.indices, &MeshDesc::default())
                    .map(Arc::new)
                    .context(MeshUploadErr {
                        name: mesh.name.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let textures = scene
            .textures
            .iter()
            .enumerate()
            .map(|(index, bytes)| {
                self.create_texture_from_compressed_data(bytes)
                    .context(TextureUploadErr { index })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "Uploaded {} meshes and {} textures",
            meshes.len(),
            textures.len()
        );

        Ok(UploadedScene {
            meshes,
            textures,
            mesh_index: scene.mesh_index.clone(),
        })
    }
}
