//! Shaders as a closed set of stage kinds.
//!
//! A [`Shader`] holds its compiled bytes and the GPU module built from them. Vertex shaders
//! additionally own the [`InputLayout`] reflected from their inputs. An empty shader of any
//! kind is a legal value that reports `is_valid() == false`, so callers can keep a
//! placeholder when loading fails.

use crate::error_info;
use crate::rendering::resources::reflection::InputLayout;
use crate::rendering::{ErrorCode, GraphicsDevice};
use log::debug;
use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{Module, ShaderStage};
use snafu::Snafu;
use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use wgpu::{ShaderModule, ShaderModuleDescriptor, ShaderSource};

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)), visibility(pub(crate)))]
pub enum ShaderError {
    #[snafu(display("Shader file for {kind} shader not readable [{code}]: {message}"))]
    FileNotFound {
        kind: ShaderKind,
        code: ErrorCode,
        message: String,
    },

    #[snafu(display("Invalid shader type [{code}]: {message}"))]
    InvalidShaderType { code: ErrorCode, message: String },

    #[snafu(display("Failed to create shader [{code}]: {message}"))]
    CreationFailed { code: ErrorCode, message: String },

    #[snafu(display("Failed to bind shader [{code}]: {message}"))]
    BindingFailed { code: ErrorCode, message: String },

    #[snafu(display("Failed to create shader resource [{code}]: {message}"))]
    ResourceCreationFailed { code: ErrorCode, message: String },
}

error_info!(ShaderError {
    FileNotFound,
    InvalidShaderType,
    CreationFailed,
    BindingFailed,
    ResourceCreationFailed,
});

impl ShaderError {
    /// The empty shader callers may hold on to after a missing file.
    pub fn placeholder(&self) -> Option<Shader> {
        match self {
            ShaderError::FileNotFound { kind, .. } => Some(Shader::empty(*kind)),
            _ => None,
        }
    }
}

pub type Result<T, E = ShaderError> = std::result::Result<T, E>;

/// First word of every SPIR-V binary.
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    Vertex,
    Pixel,
    Compute,
    Geometry,
    Domain,
    Hull,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 6] = [
        ShaderKind::Vertex,
        ShaderKind::Pixel,
        ShaderKind::Compute,
        ShaderKind::Geometry,
        ShaderKind::Domain,
        ShaderKind::Hull,
    ];

    /// The pipeline stage whose entry point this kind uses. Geometry, domain and hull
    /// shaders have no stage of their own and use the first entry point of the module.
    pub fn stage(self) -> Option<ShaderStage> {
        match self {
            ShaderKind::Vertex => Some(ShaderStage::Vertex),
            ShaderKind::Pixel => Some(ShaderStage::Fragment),
            ShaderKind::Compute => Some(ShaderStage::Compute),
            ShaderKind::Geometry | ShaderKind::Domain | ShaderKind::Hull => None,
        }
    }
}

impl Display for ShaderKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ShaderKind::Vertex => "vertex",
            ShaderKind::Pixel => "pixel",
            ShaderKind::Compute => "compute",
            ShaderKind::Geometry => "geometry",
            ShaderKind::Domain => "domain",
            ShaderKind::Hull => "hull",
        };
        f.write_str(name)
    }
}

/// Identity of one shader for the lifetime of the process. Ids are never reused, so a
/// shader created after another was dropped never shares its id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ShaderId(u64);

impl ShaderId {
    fn next() -> ShaderId {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ShaderId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// The stage independent part of every shader.
#[derive(Debug)]
pub struct ShaderObject {
    id: ShaderId,
    module: Option<ShaderModule>,
    bytecode: Vec<u8>,
    entry_point: Option<String>,
    debug_name: Option<String>,
}

impl Default for ShaderObject {
    fn default() -> Self {
        ShaderObject {
            id: ShaderId::next(),
            module: None,
            bytecode: Vec::new(),
            entry_point: None,
            debug_name: None,
        }
    }
}

impl ShaderObject {
    fn is_set(&self) -> bool {
        self.module.is_some() && !self.bytecode.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct VertexShader {
    object: ShaderObject,
    input_layout: Option<InputLayout>,
}

#[derive(Debug)]
pub enum Shader {
    Vertex(VertexShader),
    Pixel(ShaderObject),
    Compute(ShaderObject),
    Geometry(ShaderObject),
    Domain(ShaderObject),
    Hull(ShaderObject),
}

impl Shader {
    /// A shader of `kind` without bytes or module.
    pub fn empty(kind: ShaderKind) -> Shader {
        Self::with_object(kind, ShaderObject::default(), None)
    }

    fn with_object(kind: ShaderKind, object: ShaderObject, layout: Option<InputLayout>) -> Shader {
        match kind {
            ShaderKind::Vertex => Shader::Vertex(VertexShader {
                object,
                input_layout: layout,
            }),
            ShaderKind::Pixel => Shader::Pixel(object),
            ShaderKind::Compute => Shader::Compute(object),
            ShaderKind::Geometry => Shader::Geometry(object),
            ShaderKind::Domain => Shader::Domain(object),
            ShaderKind::Hull => Shader::Hull(object),
        }
    }

    /// Parses, validates and reflects `bytecode`, then creates the GPU module.
    ///
    /// SPIR-V is detected by its magic number, everything else is read as WGSL text.
    pub fn compile(
        device: &GraphicsDevice,
        kind: ShaderKind,
        bytecode: Vec<u8>,
        label: Option<&str>,
    ) -> Result<Shader> {
        let module = parse_module(&bytecode)?;

        let entry_point = entry_point_for(&module, kind)?;

        let input_layout = match kind {
            ShaderKind::Vertex => Some(InputLayout::reflect(&module, Some(&entry_point))?),
            ShaderKind::Pixel
            | ShaderKind::Compute
            | ShaderKind::Geometry
            | ShaderKind::Domain
            | ShaderKind::Hull => None,
        };

        let gpu_module = device
            .device()
            .create_shader_module(ShaderModuleDescriptor {
                label,
                source: ShaderSource::Naga(Cow::Owned(module)),
            });

        debug!(
            "Created {kind} shader {} ({} bytes, entry point {entry_point})",
            label.unwrap_or("<unnamed>"),
            bytecode.len()
        );

        let object = ShaderObject {
            module: Some(gpu_module),
            bytecode,
            entry_point: Some(entry_point),
            debug_name: label.map(str::to_string),
            ..ShaderObject::default()
        };

        Ok(Self::with_object(kind, object, input_layout))
    }

    fn object(&self) -> &ShaderObject {
        match self {
            Shader::Vertex(vertex) => &vertex.object,
            Shader::Pixel(object)
            | Shader::Compute(object)
            | Shader::Geometry(object)
            | Shader::Domain(object)
            | Shader::Hull(object) => object,
        }
    }

    fn object_mut(&mut self) -> &mut ShaderObject {
        match self {
            Shader::Vertex(vertex) => &mut vertex.object,
            Shader::Pixel(object)
            | Shader::Compute(object)
            | Shader::Geometry(object)
            | Shader::Domain(object)
            | Shader::Hull(object) => object,
        }
    }

    /// True when the module exists, the bytes are not empty and, for vertex shaders, the
    /// input layout was derived.
    pub fn is_valid(&self) -> bool {
        match self {
            Shader::Vertex(vertex) => vertex.object.is_set() && vertex.input_layout.is_some(),
            Shader::Pixel(object)
            | Shader::Compute(object)
            | Shader::Geometry(object)
            | Shader::Domain(object)
            | Shader::Hull(object) => object.is_set(),
        }
    }

    #[inline]
    pub fn id(&self) -> ShaderId {
        self.object().id
    }

    pub fn kind(&self) -> ShaderKind {
        match self {
            Shader::Vertex(_) => ShaderKind::Vertex,
            Shader::Pixel(_) => ShaderKind::Pixel,
            Shader::Compute(_) => ShaderKind::Compute,
            Shader::Geometry(_) => ShaderKind::Geometry,
            Shader::Domain(_) => ShaderKind::Domain,
            Shader::Hull(_) => ShaderKind::Hull,
        }
    }

    /// Labels the shader for diagnostics. wgpu modules are labelled at creation, so the
    /// name is kept on the shader and shows up in logs.
    pub fn set_debug_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        debug!("Naming {} shader {name:?}", self.kind());
        self.object_mut().debug_name = Some(name);
    }

    pub fn debug_name(&self) -> Option<&str> {
        self.object().debug_name.as_deref()
    }

    pub fn entry_point(&self) -> Option<&str> {
        self.object().entry_point.as_deref()
    }

    pub fn bytecode(&self) -> &[u8] {
        &self.object().bytecode
    }

    pub fn module(&self) -> Option<&ShaderModule> {
        self.object().module.as_ref()
    }

    pub fn input_layout(&self) -> Option<&InputLayout> {
        match self {
            Shader::Vertex(vertex) => vertex.input_layout.as_ref(),
            Shader::Pixel(_)
            | Shader::Compute(_)
            | Shader::Geometry(_)
            | Shader::Domain(_)
            | Shader::Hull(_) => None,
        }
    }
}

pub(crate) fn is_spirv(bytes: &[u8]) -> bool {
    bytes
        .first_chunk::<4>()
        .is_some_and(|word| u32::from_le_bytes(*word) == SPIRV_MAGIC)
}

/// Parses SPIR-V or WGSL bytes into a validated naga module.
pub fn parse_module(bytes: &[u8]) -> Result<Module> {
    if bytes.is_empty() {
        return CreationFailedErr {
            code: ErrorCode::INVALID_ARGUMENT,
            message: "shader bytecode is empty",
        }
        .fail();
    }

    let (module, source) = if is_spirv(bytes) {
        let module = naga::front::spv::parse_u8_slice(bytes, &naga::front::spv::Options::default())
            .map_err(|e| ShaderError::CreationFailed {
                code: ErrorCode::VALIDATION,
                message: e.to_string(),
            })?;
        (module, None)
    } else {
        let source = std::str::from_utf8(bytes).map_err(|e| ShaderError::CreationFailed {
            code: ErrorCode::INVALID_ARGUMENT,
            message: format!("shader is neither SPIR-V nor UTF-8 text: {e}"),
        })?;
        let module =
            naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::CreationFailed {
                code: ErrorCode::VALIDATION,
                message: e.emit_to_string(source),
            })?;
        (module, Some(source))
    };

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    validator
        .validate(&module)
        .map_err(|e| ShaderError::CreationFailed {
            code: ErrorCode::VALIDATION,
            message: match source {
                Some(source) => e.emit_to_string(source),
                None => e.as_inner().to_string(),
            },
        })?;

    Ok(module)
}

fn entry_point_for(module: &Module, kind: ShaderKind) -> Result<String> {
    let entry = match kind.stage() {
        Some(stage) => module.entry_points.iter().find(|ep| ep.stage == stage),
        None => module.entry_points.first(),
    };

    match entry {
        Some(entry) => Ok(entry.name.clone()),
        None => InvalidShaderTypeErr {
            code: ErrorCode::INVALID_ARGUMENT,
            message: format!("module has no entry point usable as a {kind} shader"),
        }
        .fail(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAGMENT_ONLY: &str = r#"
        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return vec4<f32>(1.0, 0.0, 0.0, 1.0);
        }
    "#;

    #[test]
    fn empty_shaders_keep_their_kind_and_are_invalid() {
        for kind in ShaderKind::ALL {
            let shader = Shader::empty(kind);
            assert_eq!(shader.kind(), kind);
            assert!(!shader.is_valid());
            assert!(shader.bytecode().is_empty());
            assert!(shader.input_layout().is_none());
        }
    }

    #[test]
    fn placeholder_only_for_missing_files() {
        let missing = FileNotFoundErr {
            kind: ShaderKind::Pixel,
            code: ErrorCode::NOT_FOUND,
            message: "gone",
        }
        .build();
        let placeholder = missing.placeholder().unwrap();
        assert_eq!(placeholder.kind(), ShaderKind::Pixel);
        assert!(!placeholder.is_valid());
        assert_eq!(missing.code(), ErrorCode::NOT_FOUND);

        let other = CreationFailedErr {
            code: ErrorCode::VALIDATION,
            message: "bad",
        }
        .build();
        assert!(other.placeholder().is_none());
    }

    #[test]
    fn every_shader_gets_its_own_id() {
        let first = Shader::empty(ShaderKind::Vertex);
        let first_id = first.id();
        drop(first);

        let second = Shader::empty(ShaderKind::Vertex);
        let third = Shader::empty(ShaderKind::Pixel);
        assert_ne!(second.id(), first_id);
        assert_ne!(second.id(), third.id());
    }

    #[test]
    fn spirv_is_detected_by_magic() {
        assert!(is_spirv(&SPIRV_MAGIC.to_le_bytes()));
        assert!(!is_spirv(b"@vertex"));
        assert!(!is_spirv(&[0x03, 0x02]));
    }

    #[test]
    fn entry_points_follow_stage() {
        let module = parse_module(FRAGMENT_ONLY.as_bytes()).unwrap();

        assert_eq!(entry_point_for(&module, ShaderKind::Pixel).unwrap(), "fs_main");
        assert_eq!(entry_point_for(&module, ShaderKind::Hull).unwrap(), "fs_main");
        assert!(matches!(
            entry_point_for(&module, ShaderKind::Vertex),
            Err(ShaderError::InvalidShaderType { .. })
        ));
    }

    #[test]
    fn broken_sources_fail_creation() {
        assert!(matches!(
            parse_module(b"fn nope( {"),
            Err(ShaderError::CreationFailed { .. })
        ));
        assert!(matches!(
            parse_module(&[]),
            Err(ShaderError::CreationFailed { .. })
        ));
        assert!(matches!(
            parse_module(&[0xff, 0xfe, 0xfd]),
            Err(ShaderError::CreationFailed { .. })
        ));
    }
}
