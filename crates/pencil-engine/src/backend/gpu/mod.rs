//! [`Backend`] over a wgpu device and window surface.
//!
//! Every clear and flush records into one frame encoder, acquired on first
//! use and submitted by `present`. Vertex and matrix data go through staging
//! copies recorded in the same encoder, so each flush sees its own data even
//! when several flushes share a frame.

mod pipeline;
mod texture;

use std::collections::HashMap;

use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::coords::{ColorRgba, Mat4};
use crate::device::{Gpu, GpuFrame};
use crate::error::DrawError;

use super::{
    Backend, BufferHandle, DrawCall, ProgramDesc, ProgramHandle, ResourceHandle, TextureDesc,
    TextureHandle,
};

use pipeline::{Layouts, Program};
use texture::GpuTexture;

/// Smallest vertex buffer allocation, in bytes.
const MIN_VERTEX_BUFFER_BYTES: u64 = 4096;

struct VertexBuffer {
    label: String,
    buffer: Option<wgpu::Buffer>,
    capacity: u64,
}

enum FrameSlot {
    /// No surface texture held.
    Idle,
    Active(GpuFrame),
    /// Acquisition failed transiently; drop work until `present`.
    Skipped,
}

pub struct WgpuBackend<'w> {
    gpu: Gpu<'w>,
    frame: FrameSlot,

    matrix_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    next_id: u32,
    programs: HashMap<ProgramHandle, Program>,
    buffers: HashMap<BufferHandle, VertexBuffer>,
    textures: HashMap<TextureHandle, GpuTexture>,
}

impl<'w> WgpuBackend<'w> {
    pub fn new(gpu: Gpu<'w>) -> Self {
        let device = gpu.device();
        let matrix_layout = pipeline::matrix_bind_group_layout(device);
        let texture_layout = pipeline::texture_bind_group_layout(device);
        let sampler = texture::create_sampler(device);

        Self {
            gpu,
            frame: FrameSlot::Idle,
            matrix_layout,
            texture_layout,
            sampler,
            next_id: 0,
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
        }
    }

    pub fn gpu(&self) -> &Gpu<'w> {
        &self.gpu
    }

    /// Forwards a window resize to the surface.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.gpu.resize(size);
    }

    /// Releases the acquired frame, if any, without submitting what was
    /// recorded into it. The next clear or draw acquires a fresh frame.
    pub fn discard_frame(&mut self) {
        if let FrameSlot::Active(_) = std::mem::replace(&mut self.frame, FrameSlot::Idle) {
            log::debug!("frame discarded");
        }
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Acquires a frame unless one is held or this frame is being skipped.
    ///
    /// Returns whether a frame is active.
    fn ensure_frame(&mut self) -> Result<bool, DrawError> {
        if let FrameSlot::Idle = self.frame {
            self.frame = match self.gpu.acquire_frame() {
                Ok(Some(frame)) => FrameSlot::Active(frame),
                Ok(None) => FrameSlot::Skipped,
                Err(err) => return Err(DrawError::Surface(err.to_string())),
            };
        }
        Ok(matches!(self.frame, FrameSlot::Active(_)))
    }

    /// Makes sure `handle` can hold `bytes`, reallocating if it cannot.
    fn reserve(&mut self, handle: BufferHandle, bytes: u64) -> Result<(), DrawError> {
        let device = self.gpu.device();
        let vb = self
            .buffers
            .get_mut(&handle)
            .ok_or(DrawError::UnknownHandle(handle.into()))?;

        let Some(capacity) = grown_capacity(vb.buffer.as_ref().map(|_| vb.capacity), bytes) else {
            return Ok(());
        };
        // Passes recorded earlier this frame may still read the old buffer.
        vb.buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&vb.label),
            size: capacity,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        vb.capacity = capacity;
        log::debug!("vertex buffer `{}` grown to {capacity} bytes", vb.label);
        Ok(())
    }
}

/// New allocation size for a vertex buffer that must hold `needed` bytes, or
/// `None` when the current allocation (if any) already fits.
fn grown_capacity(current: Option<u64>, needed: u64) -> Option<u64> {
    match current {
        Some(capacity) if capacity >= needed => None,
        _ => Some(needed.next_power_of_two().max(MIN_VERTEX_BUFFER_BYTES)),
    }
}

impl Backend for WgpuBackend<'_> {
    fn compile_and_link(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramHandle, DrawError> {
        let layouts = Layouts {
            matrix: &self.matrix_layout,
            texture: &self.texture_layout,
            surface_format: self.gpu.surface_format(),
        };
        let program = pipeline::build_program(self.gpu.device(), &layouts, desc)?;

        let handle = ProgramHandle(self.next());
        log::debug!("program `{}` linked as {handle:?}", program.label);
        self.programs.insert(handle, program);
        Ok(handle)
    }

    fn create_vertex_buffer(&mut self, label: &str) -> Result<BufferHandle, DrawError> {
        let handle = BufferHandle(self.next());
        self.buffers.insert(
            handle,
            VertexBuffer {
                label: label.to_string(),
                buffer: None,
                capacity: 0,
            },
        );
        Ok(handle)
    }

    fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureHandle, DrawError> {
        desc.validate()?;
        let tex = texture::create_texture(
            self.gpu.device(),
            self.gpu.queue(),
            &self.texture_layout,
            &self.sampler,
            desc,
        );
        let handle = TextureHandle(self.next());
        log::debug!("texture `{}` ({}x{}) as {handle:?}", desc.label, desc.width, desc.height);
        self.textures.insert(handle, tex);
        Ok(handle)
    }

    fn upload_matrix(&mut self, program: ProgramHandle, matrix: &Mat4) -> Result<(), DrawError> {
        let p = self
            .programs
            .get_mut(&program)
            .ok_or(DrawError::UnknownHandle(program.into()))?;
        p.matrix = *matrix;
        Ok(())
    }

    fn clear(&mut self, color: ColorRgba) -> Result<(), DrawError> {
        if !self.ensure_frame()? {
            return Ok(());
        }
        let FrameSlot::Active(frame) = &mut self.frame else {
            return Ok(());
        };

        let _rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("pencil clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: color.r as f64,
                        g: color.g as f64,
                        b: color.b as f64,
                        a: color.a as f64,
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        Ok(())
    }

    fn upload_and_draw(&mut self, call: &DrawCall<'_>) -> Result<(), DrawError> {
        let program = self
            .programs
            .get(&call.program)
            .ok_or(DrawError::UnknownHandle(call.program.into()))?;
        if program.stride_bytes != (call.vertex_stride * std::mem::size_of::<f32>()) as u64 {
            return Err(DrawError::Backend(format!(
                "program `{}` expects {} byte records, got {} floats",
                program.label, program.stride_bytes, call.vertex_stride
            )));
        }
        let texture = match (program.textured, call.texture) {
            (true, Some(t)) => Some(
                self.textures
                    .get(&t)
                    .ok_or(DrawError::UnknownHandle(t.into()))?
                    .bind_group
                    .clone(),
            ),
            (true, None) => {
                return Err(DrawError::Backend(format!(
                    "program `{}` drawn without a texture",
                    program.label
                )))
            }
            (false, _) => None,
        };
        let matrix = program.matrix;

        let bytes: &[u8] = bytemuck::cast_slice(call.vertices);
        let len = bytes.len() as u64;
        self.reserve(call.buffer, len)?;
        if len == 0 || call.primitive_count == 0 {
            return Ok(());
        }

        let device = self.gpu.device().clone();
        let vertex_staging = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("pencil vertex staging"),
            contents: bytes,
            usage: wgpu::BufferUsages::COPY_SRC,
        });
        let matrix_staging = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("pencil matrix staging"),
            contents: bytemuck::bytes_of(&matrix),
            usage: wgpu::BufferUsages::COPY_SRC,
        });

        if !self.ensure_frame()? {
            return Ok(());
        }
        let Some(vertex_buffer) = self.buffers.get(&call.buffer).and_then(|vb| vb.buffer.as_ref())
        else {
            return Err(DrawError::UnknownHandle(call.buffer.into()));
        };
        let FrameSlot::Active(frame) = &mut self.frame else {
            return Ok(());
        };
        let Some(program) = self.programs.get(&call.program) else {
            return Err(DrawError::UnknownHandle(call.program.into()));
        };

        frame
            .encoder
            .copy_buffer_to_buffer(&vertex_staging, 0, vertex_buffer, 0, len);
        frame.encoder.copy_buffer_to_buffer(
            &matrix_staging,
            0,
            &program.matrix_ubo,
            0,
            pipeline::MATRIX_BYTES,
        );

        let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("pencil batch"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&program.pipeline);
        rpass.set_bind_group(0, &program.matrix_bind_group, &[]);
        if let Some(bg) = &texture {
            rpass.set_bind_group(1, bg, &[]);
        }
        rpass.set_vertex_buffer(0, vertex_buffer.slice(..len));
        rpass.draw(0..call.primitive_count * 3, 0..1);

        log::trace!(
            "draw `{}`: {} triangles, {len} bytes",
            program.label,
            call.primitive_count
        );
        Ok(())
    }

    fn present(&mut self) -> Result<(), DrawError> {
        // Acquire even when nothing was drawn so every present swaps.
        self.ensure_frame()?;
        match std::mem::replace(&mut self.frame, FrameSlot::Idle) {
            FrameSlot::Active(frame) => self.gpu.present_frame(frame),
            FrameSlot::Idle | FrameSlot::Skipped => {}
        }
        Ok(())
    }

    fn destroy(&mut self, handle: ResourceHandle) {
        match handle {
            ResourceHandle::Program(h) => {
                if let Some(p) = self.programs.remove(&h) {
                    p.destroy();
                }
            }
            ResourceHandle::Buffer(h) => {
                if let Some(buffer) = self.buffers.remove(&h).and_then(|vb| vb.buffer) {
                    buffer.destroy();
                }
            }
            ResourceHandle::Texture(h) => {
                if let Some(t) = self.textures.remove(&h) {
                    t.texture.destroy();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── vertex buffer growth ──────────────────────────────────────────────

    #[test]
    fn first_reservation_allocates_at_least_the_minimum() {
        assert_eq!(grown_capacity(None, 0), Some(MIN_VERTEX_BUFFER_BYTES));
        assert_eq!(grown_capacity(None, 1024), Some(MIN_VERTEX_BUFFER_BYTES));
        assert_eq!(grown_capacity(None, 5000), Some(8192));
    }

    #[test]
    fn fitting_reservation_keeps_the_buffer() {
        assert_eq!(grown_capacity(Some(4096), 4096), None);
        assert_eq!(grown_capacity(Some(8192), 100), None);
    }

    #[test]
    fn larger_second_flush_in_a_frame_grows_the_buffer() {
        // A small colored batch, then 200 spatial quads (6 vertices of 7 floats).
        let first = grown_capacity(None, 1024);
        assert_eq!(first, Some(4096));
        let quads = 200 * 6 * 7 * std::mem::size_of::<f32>() as u64;
        assert_eq!(grown_capacity(first, quads), Some(65536));
    }
}
