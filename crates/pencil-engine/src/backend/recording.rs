use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use log::debug;

use crate::coords::{ColorRgba, Mat4};
use crate::error::DrawError;

use super::{
    check_attributes, check_entry_points, Backend, BufferHandle, DrawCall, ProgramDesc,
    ProgramHandle, ResourceHandle, TextureDesc, TextureHandle,
};

/// A draw as the backend saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub program: ProgramHandle,
    pub buffer: BufferHandle,
    pub texture: Option<TextureHandle>,
    pub vertices: Vec<f32>,
    pub vertex_stride: usize,
    pub primitive_count: u32,
}

impl RecordedDraw {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / self.vertex_stride.max(1)
    }

    /// Position of vertex `i`.
    pub fn position(&self, i: usize) -> [f32; 3] {
        let at = i * self.vertex_stride;
        [self.vertices[at], self.vertices[at + 1], self.vertices[at + 2]]
    }

    /// Color of vertex `i`.
    pub fn color(&self, i: usize) -> [f32; 4] {
        let at = i * self.vertex_stride + 3;
        [
            self.vertices[at],
            self.vertices[at + 1],
            self.vertices[at + 2],
            self.vertices[at + 3],
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    ProgramLinked { handle: ProgramHandle, label: String },
    BufferCreated { handle: BufferHandle, label: String },
    TextureCreated { handle: TextureHandle, label: String, width: u32, height: u32 },
    MatrixUploaded { program: ProgramHandle, matrix: Mat4 },
    Cleared(ColorRgba),
    Draw(RecordedDraw),
    Presented,
    Destroyed(ResourceHandle),
}

/// Shared view of a [`RecordingBackend`]'s history.
///
/// Stays readable after the backend (and the renderer owning it) is dropped.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<BackendEvent>>>);

impl EventLog {
    pub fn events(&self) -> Vec<BackendEvent> {
        self.0.borrow().clone()
    }

    pub fn draws(&self) -> Vec<RecordedDraw> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| match e {
                BackendEvent::Draw(d) => Some(d.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn draw_count(&self) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|e| matches!(e, BackendEvent::Draw(_)))
            .count()
    }

    pub fn destroyed(&self) -> Vec<ResourceHandle> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| match e {
                BackendEvent::Destroyed(h) => Some(*h),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    fn push(&self, event: BackendEvent) {
        self.0.borrow_mut().push(event);
    }
}

/// Headless [`Backend`] that validates and records every call.
///
/// Shader sources get the same attribute and entry point checks the wgpu
/// backend applies; compilation itself always succeeds unless a label was
/// registered with [`RecordingBackend::failing_program`].
#[derive(Debug, Default)]
pub struct RecordingBackend {
    log: EventLog,
    next_id: u32,
    programs: HashSet<ProgramHandle>,
    textured_programs: HashSet<ProgramHandle>,
    buffers: HashSet<BufferHandle>,
    textures: HashSet<TextureHandle>,
    failing: Vec<String>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `compile_and_link` fail for programs labelled `label`.
    pub fn failing_program(mut self, label: impl Into<String>) -> Self {
        self.failing.push(label.into());
        self
    }

    pub fn log(&self) -> EventLog {
        self.log.clone()
    }

    /// Live resources of every kind.
    pub fn live_resources(&self) -> usize {
        self.programs.len() + self.buffers.len() + self.textures.len()
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl Backend for RecordingBackend {
    fn compile_and_link(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramHandle, DrawError> {
        if self.failing.iter().any(|l| l == desc.label) {
            return Err(DrawError::Shader {
                label: desc.label.to_string(),
                message: "compilation rejected".to_string(),
            });
        }
        check_entry_points(desc)?;
        check_attributes(desc)?;

        let handle = ProgramHandle(self.next());
        self.programs.insert(handle);
        if desc.textured {
            self.textured_programs.insert(handle);
        }
        debug!("recording: linked `{}` as {handle:?}", desc.label);
        self.log.push(BackendEvent::ProgramLinked { handle, label: desc.label.to_string() });
        Ok(handle)
    }

    fn create_vertex_buffer(&mut self, label: &str) -> Result<BufferHandle, DrawError> {
        let handle = BufferHandle(self.next());
        self.buffers.insert(handle);
        self.log.push(BackendEvent::BufferCreated { handle, label: label.to_string() });
        Ok(handle)
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureHandle, DrawError> {
        desc.validate()?;
        let handle = TextureHandle(self.next());
        self.textures.insert(handle);
        self.log.push(BackendEvent::TextureCreated {
            handle,
            label: desc.label.to_string(),
            width: desc.width,
            height: desc.height,
        });
        Ok(handle)
    }

    fn upload_matrix(&mut self, program: ProgramHandle, matrix: &Mat4) -> Result<(), DrawError> {
        if !self.programs.contains(&program) {
            return Err(DrawError::UnknownHandle(program.into()));
        }
        self.log.push(BackendEvent::MatrixUploaded { program, matrix: *matrix });
        Ok(())
    }

    fn clear(&mut self, color: ColorRgba) -> Result<(), DrawError> {
        self.log.push(BackendEvent::Cleared(color));
        Ok(())
    }

    fn upload_and_draw(&mut self, call: &DrawCall<'_>) -> Result<(), DrawError> {
        if !self.programs.contains(&call.program) {
            return Err(DrawError::UnknownHandle(call.program.into()));
        }
        if !self.buffers.contains(&call.buffer) {
            return Err(DrawError::UnknownHandle(call.buffer.into()));
        }
        match call.texture {
            Some(t) if !self.textures.contains(&t) => {
                return Err(DrawError::UnknownHandle(t.into()));
            }
            None if self.textured_programs.contains(&call.program) => {
                return Err(DrawError::Backend(
                    "textured program drawn without a texture".to_string(),
                ));
            }
            _ => {}
        }

        self.log.push(BackendEvent::Draw(RecordedDraw {
            program: call.program,
            buffer: call.buffer,
            texture: call.texture,
            vertices: call.vertices.to_vec(),
            vertex_stride: call.vertex_stride,
            primitive_count: call.primitive_count,
        }));
        Ok(())
    }

    fn present(&mut self) -> Result<(), DrawError> {
        self.log.push(BackendEvent::Presented);
        Ok(())
    }

    fn destroy(&mut self, handle: ResourceHandle) {
        let known = match handle {
            ResourceHandle::Program(h) => {
                self.textured_programs.remove(&h);
                self.programs.remove(&h)
            }
            ResourceHandle::Buffer(h) => self.buffers.remove(&h),
            ResourceHandle::Texture(h) => self.textures.remove(&h),
        };
        if known {
            self.log.push(BackendEvent::Destroyed(handle));
        } else {
            debug!("recording: ignoring destroy of unknown {handle:?}");
        }
    }
}
