//! GPU resource provisioning boundary.
//!
//! The renderer never touches a graphics API directly. It asks a [`Backend`]
//! for two programs and two vertex buffers when it is built, and on every
//! flush uploads a matrix and one full vertex stream through it.
//!
//! Implementations:
//! - [`WgpuBackend`]: wgpu device + window surface
//! - [`RecordingBackend`]: headless, records every call (tests and tooling)

mod recording;
mod gpu;

pub use recording::{BackendEvent, EventLog, RecordedDraw, RecordingBackend};
pub use gpu::WgpuBackend;

use crate::coords::{ColorRgba, Mat4};
use crate::error::DrawError;

/// WGSL source of the colored program (`position`, `color`).
pub const COLORED_SHADER: &str = include_str!("shaders/colored.wgsl");
/// WGSL source of the textured program (`position`, `color`, `texcoord`).
pub const TEXTURED_SHADER: &str = include_str!("shaders/textured.wgsl");

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub(crate) u32);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub(crate) u32);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub(crate) u32);

/// Any backend-owned resource, for [`Backend::destroy`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResourceHandle {
    Program(ProgramHandle),
    Buffer(BufferHandle),
    Texture(TextureHandle),
}

impl From<ProgramHandle> for ResourceHandle {
    fn from(h: ProgramHandle) -> Self {
        ResourceHandle::Program(h)
    }
}

impl From<BufferHandle> for ResourceHandle {
    fn from(h: BufferHandle) -> Self {
        ResourceHandle::Buffer(h)
    }
}

impl From<TextureHandle> for ResourceHandle {
    fn from(h: TextureHandle) -> Self {
        ResourceHandle::Texture(h)
    }
}

/// One `f32` vertex attribute a program must bind.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexAttribute {
    pub name: &'static str,
    pub location: u32,
    /// Number of `f32` components.
    pub components: u32,
}

impl VertexAttribute {
    pub const POSITION: VertexAttribute = VertexAttribute { name: "position", location: 0, components: 3 };
    pub const COLOR: VertexAttribute = VertexAttribute { name: "color", location: 1, components: 4 };
    pub const TEXCOORD: VertexAttribute = VertexAttribute { name: "texcoord", location: 2, components: 2 };
}

pub const COLORED_ATTRIBUTES: [VertexAttribute; 2] = [VertexAttribute::POSITION, VertexAttribute::COLOR];
pub const TEXTURED_ATTRIBUTES: [VertexAttribute; 3] = [
    VertexAttribute::POSITION,
    VertexAttribute::COLOR,
    VertexAttribute::TEXCOORD,
];

/// Everything needed to build one program.
#[derive(Debug, Clone, Copy)]
pub struct ProgramDesc<'a> {
    pub label: &'a str,
    /// Single-module source holding both stages.
    pub source: &'a str,
    pub vertex_entry: &'a str,
    pub fragment_entry: &'a str,
    /// Interleaved in this order, tightly packed.
    pub attributes: &'a [VertexAttribute],
    /// Samples a texture bound alongside the matrix.
    pub textured: bool,
}

impl ProgramDesc<'_> {
    /// Record width in floats.
    pub fn stride(&self) -> usize {
        self.attributes.iter().map(|a| a.components as usize).sum()
    }
}

/// RGBA8 pixel data, rows tightly packed.
#[derive(Debug, Clone, Copy)]
pub struct TextureDesc<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub rgba: &'a [u8],
}

impl TextureDesc<'_> {
    pub(crate) fn validate(&self) -> Result<(), DrawError> {
        let expected = self.width as usize * self.height as usize * 4;
        if self.width == 0 || self.height == 0 || self.rgba.len() != expected {
            return Err(DrawError::Backend(format!(
                "texture `{}`: {}x{} needs {expected} bytes, got {}",
                self.label,
                self.width,
                self.height,
                self.rgba.len()
            )));
        }
        Ok(())
    }
}

/// One flush worth of geometry.
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    pub program: ProgramHandle,
    pub buffer: BufferHandle,
    /// Required by textured programs, ignored otherwise.
    pub texture: Option<TextureHandle>,
    pub vertices: &'a [f32],
    /// Floats per vertex record.
    pub vertex_stride: usize,
    /// Triangles to draw; `vertices.len() / vertex_stride / 3`.
    pub primitive_count: u32,
}

/// GPU capability the renderer is built on.
///
/// All calls are synchronous from the caller's point of view. Failures are
/// returned, never only logged.
pub trait Backend {
    /// Compiles `desc.source` and links it into a program.
    ///
    /// Fails with [`DrawError::Shader`] on compile/link errors and with
    /// [`DrawError::AttributeBinding`] if an attribute is not declared.
    fn compile_and_link(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramHandle, DrawError>;

    fn create_vertex_buffer(&mut self, label: &str) -> Result<BufferHandle, DrawError>;

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureHandle, DrawError>;

    /// Stages `matrix` in the program's transform uniform.
    fn upload_matrix(&mut self, program: ProgramHandle, matrix: &Mat4) -> Result<(), DrawError>;

    /// Clears the current frame immediately; does not affect staged geometry.
    fn clear(&mut self, color: ColorRgba) -> Result<(), DrawError>;

    /// Replaces the buffer's contents with `call.vertices` and draws them as a
    /// triangle list with `call.program`.
    fn upload_and_draw(&mut self, call: &DrawCall<'_>) -> Result<(), DrawError>;

    /// Presents everything drawn since the last present.
    fn present(&mut self) -> Result<(), DrawError>;

    fn destroy(&mut self, handle: ResourceHandle);
}

/// Checks that every attribute in `desc` is declared at its location among the
/// vertex entry point's inputs, e.g. `@location(1) color`.
pub(crate) fn check_attributes(desc: &ProgramDesc<'_>) -> Result<(), DrawError> {
    let source = strip_comments(desc.source);
    let declared = vertex_inputs(&source, desc.vertex_entry);
    for attr in desc.attributes {
        if !declared.iter().any(|(loc, name)| *loc == attr.location && *name == attr.name) {
            return Err(DrawError::AttributeBinding {
                label: desc.label.to_string(),
                attribute: attr.name,
                location: attr.location,
            });
        }
    }
    Ok(())
}

/// Checks that both entry points are defined.
pub(crate) fn check_entry_points(desc: &ProgramDesc<'_>) -> Result<(), DrawError> {
    let source = strip_comments(desc.source);
    for entry in [desc.vertex_entry, desc.fragment_entry] {
        if entry_params(&source, entry).is_none() {
            return Err(DrawError::Shader {
                label: desc.label.to_string(),
                message: format!("entry point `{entry}` not found"),
            });
        }
    }
    Ok(())
}

/// `source` with `//` and `/* */` comments replaced by spaces.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut block_depth = 0u32;
    while let Some(c) = chars.next() {
        match (c, chars.peek().copied()) {
            ('/', Some('*')) => {
                chars.next();
                block_depth += 1;
                out.push(' ');
            }
            ('*', Some('/')) if block_depth > 0 => {
                chars.next();
                block_depth -= 1;
                out.push(' ');
            }
            ('/', Some('/')) if block_depth == 0 => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            (c, _) if block_depth > 0 => out.push(if c == '\n' { '\n' } else { ' ' }),
            (c, _) => out.push(c),
        }
    }
    out
}

/// Parameter list of `fn entry(...)`, without the parentheses.
fn entry_params<'a>(source: &'a str, entry: &str) -> Option<&'a str> {
    let needle = format!("fn {entry}(");
    let start = source.find(&needle)? + needle.len();
    let len = source[start..].find(')')?;
    Some(&source[start..start + len])
}

/// `(location, identifier)` pairs the vertex entry point takes as input,
/// either directly as parameters or as fields of a struct parameter.
fn vertex_inputs<'a>(source: &'a str, entry: &str) -> Vec<(u32, &'a str)> {
    let Some(params) = entry_params(source, entry) else {
        return Vec::new();
    };
    let mut out = declared_locations(params);
    for param in params.split(',') {
        let Some((_, ty)) = param.rsplit_once(':') else { continue };
        if let Some(body) = struct_body(source, ty.trim()) {
            out.extend(declared_locations(body));
        }
    }
    out
}

/// Text between the braces of `struct name { ... }`.
fn struct_body<'a>(source: &'a str, name: &str) -> Option<&'a str> {
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }
    let needle = format!("struct {name}");
    let mut from = 0;
    while let Some(found) = source[from..].find(&needle) {
        let after = from + found + needle.len();
        let rest = source[after..].trim_start();
        if let Some(body) = rest.strip_prefix('{') {
            return body.find('}').map(|end| &body[..end]);
        }
        from = after;
    }
    None
}

/// `(location, identifier)` pairs for every `@location(N) ident` in `source`.
fn declared_locations(source: &str) -> Vec<(u32, &str)> {
    const TAG: &str = "@location(";
    let mut out = Vec::new();
    let mut rest = source;
    while let Some(start) = rest.find(TAG) {
        rest = &rest[start + TAG.len()..];
        let Some(close) = rest.find(')') else { break };
        let loc = rest[..close].trim().parse::<u32>();
        rest = &rest[close + 1..];

        let tail = rest.trim_start();
        let end = tail
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(tail.len());
        if let Ok(loc) = loc {
            out.push((loc, &tail[..end]));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc<'a>(source: &'a str, attributes: &'a [VertexAttribute]) -> ProgramDesc<'a> {
        ProgramDesc {
            label: "test",
            source,
            vertex_entry: "vs_main",
            fragment_entry: "fs_main",
            attributes,
            textured: false,
        }
    }

    #[test]
    fn builtin_shaders_declare_their_attributes() {
        check_attributes(&desc(COLORED_SHADER, &COLORED_ATTRIBUTES)).unwrap();
        check_attributes(&desc(TEXTURED_SHADER, &TEXTURED_ATTRIBUTES)).unwrap();
        check_entry_points(&desc(COLORED_SHADER, &COLORED_ATTRIBUTES)).unwrap();
        check_entry_points(&desc(TEXTURED_SHADER, &TEXTURED_ATTRIBUTES)).unwrap();
    }

    #[test]
    fn colored_shader_lacks_texcoord() {
        let err = check_attributes(&desc(COLORED_SHADER, &TEXTURED_ATTRIBUTES)).unwrap_err();
        match err {
            DrawError::AttributeBinding { attribute, location, .. } => {
                assert_eq!(attribute, "texcoord");
                assert_eq!(location, 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn wrong_location_does_not_resolve() {
        let src = "struct V { @location(3) position: vec3<f32>, @location(1) color: vec4<f32> };\n\
                   @vertex fn vs_main(v: V) {}";
        assert!(check_attributes(&desc(src, &COLORED_ATTRIBUTES)).is_err());
    }

    #[test]
    fn inline_vertex_parameters_resolve() {
        let src = "@vertex fn vs_main(@location(0) position: vec3<f32>, \
                   @location(1) color: vec4<f32>) {}";
        check_attributes(&desc(src, &COLORED_ATTRIBUTES)).unwrap();
    }

    #[test]
    fn commented_out_attribute_does_not_count() {
        let src = "struct V {\n\
                   @location(0) position: vec3<f32>,\n\
                   // @location(1) color: vec4<f32>,\n\
                   /* @location(1) color: vec4<f32>, */\n\
                   };\n\
                   @vertex fn vs_main(v: V) {}";
        let err = check_attributes(&desc(src, &COLORED_ATTRIBUTES)).unwrap_err();
        assert!(matches!(err, DrawError::AttributeBinding { location: 1, .. }));
    }

    #[test]
    fn fragment_outputs_are_not_vertex_inputs() {
        // `color` at location 1 exists only on the fragment side.
        let src = "struct V { @location(0) position: vec3<f32> };\n\
                   struct Out { @location(1) color: vec4<f32> };\n\
                   @vertex fn vs_main(v: V) {}\n\
                   @fragment fn fs_main(o: Out) -> @location(0) vec4<f32> {}";
        assert!(check_attributes(&desc(src, &COLORED_ATTRIBUTES)).is_err());
    }

    #[test]
    fn commented_out_entry_point_is_missing() {
        let src = "// @vertex fn vs_main() {}\n@fragment fn fs_main() {}";
        assert!(check_entry_points(&desc(src, &[])).is_err());
    }

    #[test]
    fn missing_entry_point_is_a_shader_error() {
        let src = "@vertex fn vs_main() {}";
        assert!(matches!(
            check_entry_points(&desc(src, &[])),
            Err(DrawError::Shader { .. })
        ));
    }

    #[test]
    fn strides_match_record_widths() {
        assert_eq!(desc("", &COLORED_ATTRIBUTES).stride(), 7);
        assert_eq!(desc("", &TEXTURED_ATTRIBUTES).stride(), 9);
    }

    #[test]
    fn texture_desc_checks_byte_count() {
        let px = [255u8; 16];
        let ok = TextureDesc { label: "t", width: 2, height: 2, rgba: &px };
        assert!(ok.validate().is_ok());
        let short = TextureDesc { label: "t", width: 3, height: 2, rgba: &px };
        assert!(short.validate().is_err());
    }
}
