//! Shaders compiled into the crate.

/// Vertex and pixel stage for [`Vertex3D`](crate::core::Vertex3D) meshes, transformed by
/// a [`Wvp`](crate::rendering::Wvp) constant buffer at group 0, binding 0.
pub const MESH_SHADER: &str = include_str!("mesh.wgsl");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Vertex3D;
    use crate::rendering::resources::{InputLayout, parse_module};

    macro_rules! test_shader {
        ($fn_name:ident => $source:expr) => {
            #[test]
            fn $fn_name() {
                parse_module($source.as_bytes()).unwrap();
            }
        };
    }

    test_shader!(mesh_shader_validates => MESH_SHADER);

    #[test]
    fn mesh_shader_matches_vertex_layout() {
        let module = parse_module(MESH_SHADER.as_bytes()).unwrap();
        let layout = InputLayout::reflect(&module, Some("vs_main")).unwrap();

        assert_eq!(layout.stride(), Vertex3D::STRIDE as u64);
        assert_eq!(
            layout.attributes(),
            Vertex3D::continuous_descriptor().attributes
        );
    }
}
