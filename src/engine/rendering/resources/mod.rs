//! GPU resources and the factory creating them.

pub mod buffer;
pub mod factory;
pub mod import;
pub mod mesh;
pub mod model;
pub mod reflection;
pub mod shader;
pub mod texture;

pub use buffer::{Buffer, BufferError, ConstantBuffer, IndexBuffer, VertexBuffer};
pub use factory::ResourceFactory;
pub use import::{ImportError, ImportedMesh, ImportedScene, UploadedScene};
pub use mesh::{Mesh, MeshDesc, MeshError};
pub use model::Model;
pub use reflection::{InputElement, InputLayout, vertex_format};
pub use shader::{Shader, ShaderError, ShaderId, ShaderKind, parse_module};
pub use texture::{Texture2D, Texture2DDesc, TextureError};
