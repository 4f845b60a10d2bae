use crate::rendering::resources::import::UploadedScene;
use crate::rendering::resources::mesh::Mesh;
use log::warn;
use std::sync::Arc;

/// Several meshes drawn with one transform. Attach it to a node as a property, the
/// renderer draws every mesh with that node's world matrix.
#[derive(Debug, Clone, Default)]
pub struct Model {
    meshes: Vec<Arc<Mesh>>,
}

impl Model {
    pub fn new(meshes: impl IntoIterator<Item = Arc<Mesh>>) -> Self {
        let mut model = Model::default();
        for mesh in meshes {
            model.add_mesh(mesh);
        }
        model
    }

    /// Appends `mesh`. Meshes without geometry are skipped.
    pub fn add_mesh(&mut self, mesh: Arc<Mesh>) -> bool {
        if !mesh.is_valid() {
            warn!("Skipping a mesh without geometry");
            return false;
        }
        self.meshes.push(mesh);
        true
    }

    #[inline]
    pub fn meshes(&self) -> &[Arc<Mesh>] {
        &self.meshes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

impl From<&UploadedScene> for Model {
    fn from(scene: &UploadedScene) -> Self {
        Model::new(scene.meshes.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_scene_gives_empty_model() {
        let model = Model::from(&UploadedScene::default());
        assert!(model.is_empty());
        assert_eq!(model.len(), 0);
    }
}
