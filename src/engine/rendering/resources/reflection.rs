//! Vertex input layouts derived from a shader's vertex entry point.
//!
//! Every `@location` input of the entry point becomes one [`InputElement`]. Struct inputs
//! are flattened into their members. Offsets are packed in declaration order, so a vertex
//! type only needs to match the order of the shader's inputs.

use crate::rendering::ErrorCode;
use crate::rendering::resources::shader::{
    InvalidShaderTypeErr, ResourceCreationFailedErr, Result,
};
use naga::{Binding, Module, ScalarKind, ShaderStage, Type, TypeInner};
use wgpu::{BufferAddress, VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

/// Name used for inputs that carry no name in the shader.
pub const UNNAMED_SEMANTIC: &str = "ATTRIBUTE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputElement {
    pub semantic_name: String,
    pub semantic_index: u32,
    pub format: VertexFormat,
    pub offset: BufferAddress,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLayout {
    elements: Vec<InputElement>,
    attributes: Vec<VertexAttribute>,
    stride: BufferAddress,
}

/// Maps a scalar kind and a component count to the vertex format of the same shape.
///
/// Only 32-bit scalars exist in vertex inputs, so the width is implied.
pub fn vertex_format(kind: ScalarKind, components: u32) -> Option<VertexFormat> {
    use VertexFormat::*;

    let format = match (kind, components) {
        (ScalarKind::Uint, 1) => Uint32,
        (ScalarKind::Uint, 2) => Uint32x2,
        (ScalarKind::Uint, 3) => Uint32x3,
        (ScalarKind::Uint, 4) => Uint32x4,
        (ScalarKind::Sint, 1) => Sint32,
        (ScalarKind::Sint, 2) => Sint32x2,
        (ScalarKind::Sint, 3) => Sint32x3,
        (ScalarKind::Sint, 4) => Sint32x4,
        (ScalarKind::Float, 1) => Float32,
        (ScalarKind::Float, 2) => Float32x2,
        (ScalarKind::Float, 3) => Float32x3,
        (ScalarKind::Float, 4) => Float32x4,
        _ => return None,
    };

    Some(format)
}

impl InputLayout {
    /// Reflects the inputs of the vertex entry point `entry_point`, or of the first vertex
    /// entry point when `None`.
    pub fn reflect(module: &Module, entry_point: Option<&str>) -> Result<InputLayout> {
        let Some(entry) = module.entry_points.iter().find(|ep| {
            ep.stage == ShaderStage::Vertex && entry_point.is_none_or(|name| ep.name == name)
        }) else {
            return InvalidShaderTypeErr {
                code: ErrorCode::INVALID_ARGUMENT,
                message: format!(
                    "no vertex entry point {}",
                    entry_point.unwrap_or("in module")
                ),
            }
            .fail();
        };

        let mut layout = InputLayout {
            elements: Vec::new(),
            attributes: Vec::new(),
            stride: 0,
        };

        for arg in &entry.function.arguments {
            let ty = &module.types[arg.ty];
            match (&arg.binding, &ty.inner) {
                (Some(binding), _) => layout.push(arg.name.as_deref(), binding, ty)?,
                (None, TypeInner::Struct { members, .. }) => {
                    for member in members {
                        let Some(binding) = &member.binding else {
                            continue;
                        };
                        layout.push(
                            member.name.as_deref(),
                            binding,
                            &module.types[member.ty],
                        )?;
                    }
                }
                (None, _) => {}
            }
        }

        Ok(layout)
    }

    fn push(
        &mut self,
        name: Option<&str>,
        binding: &Binding,
        ty: &Type,
    ) -> Result<()> {
        let Binding::Location { location, .. } = binding else {
            return Ok(());
        };

        let Some(format) = input_format(&ty.inner) else {
            return ResourceCreationFailedErr {
                code: ErrorCode::UNSUPPORTED,
                message: format!(
                    "vertex input {} at location {location} has unsupported type {}",
                    name.unwrap_or(UNNAMED_SEMANTIC),
                    describe(ty),
                ),
            }
            .fail();
        };

        let offset = self.stride;
        self.elements.push(InputElement {
            semantic_name: name.unwrap_or(UNNAMED_SEMANTIC).to_string(),
            semantic_index: *location,
            format,
            offset,
        });
        self.attributes.push(VertexAttribute {
            format,
            offset,
            shader_location: *location,
        });
        self.stride += format.size();

        Ok(())
    }

    #[inline]
    pub fn elements(&self) -> &[InputElement] {
        &self.elements
    }

    #[inline]
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Packed size of all inputs.
    #[inline]
    pub fn stride(&self) -> BufferAddress {
        self.stride
    }

    /// Vertex buffer layout for a buffer with the given stride. A stride of 0 uses the
    /// packed size of the inputs.
    pub fn buffer_layout(&self, stride: BufferAddress) -> VertexBufferLayout<'_> {
        VertexBufferLayout {
            array_stride: if stride == 0 { self.stride } else { stride },
            step_mode: VertexStepMode::Vertex,
            attributes: &self.attributes,
        }
    }
}

fn input_format(inner: &TypeInner) -> Option<VertexFormat> {
    let (scalar, components) = match inner {
        TypeInner::Scalar(scalar) => (*scalar, 1),
        TypeInner::Vector { size, scalar } => (*scalar, *size as u32),
        _ => return None,
    };

    if scalar.width != 4 {
        return None;
    }

    vertex_format(scalar.kind, components)
}

fn describe(ty: &Type) -> String {
    ty.name
        .clone()
        .unwrap_or_else(|| format!("{:?}", ty.inner).chars().take(64).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Module {
        naga::front::wgsl::parse_str(source).unwrap()
    }

    #[test]
    fn format_table_is_complete() {
        let kinds = [
            (ScalarKind::Uint, [VertexFormat::Uint32, VertexFormat::Uint32x2, VertexFormat::Uint32x3, VertexFormat::Uint32x4]),
            (ScalarKind::Sint, [VertexFormat::Sint32, VertexFormat::Sint32x2, VertexFormat::Sint32x3, VertexFormat::Sint32x4]),
            (ScalarKind::Float, [VertexFormat::Float32, VertexFormat::Float32x2, VertexFormat::Float32x3, VertexFormat::Float32x4]),
        ];

        for (kind, formats) in kinds {
            for (i, expected) in formats.into_iter().enumerate() {
                assert_eq!(vertex_format(kind, i as u32 + 1), Some(expected));
            }
            assert_eq!(vertex_format(kind, 0), None);
            assert_eq!(vertex_format(kind, 5), None);
        }

        assert_eq!(vertex_format(ScalarKind::Bool, 1), None);
    }

    #[test]
    fn struct_members_are_packed_in_order() {
        let module = parse(
            r#"
            struct In {
                @location(0) position: vec3<f32>,
                @location(1) uv: vec2<f32>,
                @location(2) ids: vec4<u32>,
                @builtin(vertex_index) index: u32,
            };

            @vertex
            fn vs_main(input: In) -> @builtin(position) vec4<f32> {
                return vec4<f32>(input.position, 1.0);
            }
            "#,
        );

        let layout = InputLayout::reflect(&module, None).unwrap();
        let elements = layout.elements();

        assert_eq!(elements.len(), 3);
        assert_eq!(elements[0].semantic_name, "position");
        assert_eq!(elements[0].format, VertexFormat::Float32x3);
        assert_eq!(elements[1].offset, 12);
        assert_eq!(elements[1].semantic_index, 1);
        assert_eq!(elements[2].format, VertexFormat::Uint32x4);
        assert_eq!(elements[2].offset, 20);
        assert_eq!(layout.stride(), 36);
    }

    #[test]
    fn plain_arguments_and_scalars() {
        let module = parse(
            r#"
            @vertex
            fn vs_main(@location(3) weight: f32, @location(0) id: i32) -> @builtin(position) vec4<f32> {
                return vec4<f32>(weight, f32(id), 0.0, 1.0);
            }
            "#,
        );

        let layout = InputLayout::reflect(&module, Some("vs_main")).unwrap();
        assert_eq!(layout.elements()[0].semantic_index, 3);
        assert_eq!(layout.elements()[0].format, VertexFormat::Float32);
        assert_eq!(layout.elements()[1].format, VertexFormat::Sint32);
        assert_eq!(layout.elements()[1].offset, 4);
        assert_eq!(layout.buffer_layout(0).array_stride, 8);
        assert_eq!(layout.buffer_layout(64).array_stride, 64);
    }

    #[test]
    fn missing_vertex_entry_point_is_rejected() {
        let module = parse(
            r#"
            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return vec4<f32>(1.0);
            }
            "#,
        );

        assert!(InputLayout::reflect(&module, None).is_err());
    }
}
