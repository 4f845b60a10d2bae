//! Scene structure and geometry basics.
//!
//! This includes the scene graph with its nodes, node transforms and the vertex type used
//! by imported and built-in meshes.

pub mod node;
pub mod primitives;
pub mod scene_graph;
pub mod transform;
pub mod vertex;

pub use node::*;
pub use scene_graph::*;
pub use transform::*;
pub use vertex::*;
