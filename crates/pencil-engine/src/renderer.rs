//! Immediate-mode drawing API.
//!
//! A [`Renderer`] owns the batch (state + vertex stream), a [`Backend`], and
//! the resources it provisioned from it: two programs, two vertex buffers and
//! a 1×1 white texture. Primitives append to the stream; geometry reaches the
//! backend only when it is flushed:
//!
//! - explicitly via [`Renderer::flush`] or [`Renderer::present`],
//! - before a primitive that needs a different [`DrawMode`],
//! - before a transform change (ortho, MVP, view direction),
//! - before a texture change while textured geometry is pending.

use crate::backend::{
    Backend, BufferHandle, DrawCall, ProgramDesc, ProgramHandle, ResourceHandle, TextureDesc,
    TextureHandle, COLORED_ATTRIBUTES, COLORED_SHADER, TEXTURED_ATTRIBUTES, TEXTURED_SHADER,
};
use crate::batch::{BatchContext, BatchState, DrawMode, Emitter, Family, FlushPlan, UvRect};
use crate::coords::{ColorRgba, Mat4, Vec2, Vec3, Viewport};
use crate::error::DrawError;

/// Renderer construction parameters.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial flat-space viewport.
    pub viewport: Viewport,
    /// Floats reserved in the vertex stream up front.
    pub stream_capacity: usize,
    /// Segments used by [`Renderer::circle`].
    pub circle_segments: u32,
}

impl RendererConfig {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            viewport: Viewport::new(width, height),
            ..Default::default()
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::new(800.0, 600.0),
            stream_capacity: 64 * 1024,
            circle_segments: 16,
        }
    }
}

/// One program and the vertex buffer that feeds it.
#[derive(Debug, Copy, Clone)]
struct Pipeline {
    program: ProgramHandle,
    buffer: BufferHandle,
}

pub struct Renderer<B: Backend> {
    batch: BatchContext,
    backend: B,
    colored: Pipeline,
    textured: Pipeline,
    white: TextureHandle,
    user_textures: Vec<TextureHandle>,
    circle_segments: u32,
}

impl<B: Backend> Renderer<B> {
    /// Builds both programs and buffers on `backend`.
    ///
    /// Shader and attribute failures are returned; anything created before
    /// the failure is destroyed again.
    pub fn new(mut backend: B, config: RendererConfig) -> Result<Self, DrawError> {
        let mut created = Vec::new();
        match provision(&mut backend, &mut created) {
            Ok((colored, textured, white)) => {
                log::debug!(
                    "renderer ready: viewport {:?}, stream capacity {} floats",
                    config.viewport,
                    config.stream_capacity
                );
                Ok(Self {
                    batch: BatchContext::new(config.viewport, config.stream_capacity),
                    backend,
                    colored,
                    textured,
                    white,
                    user_textures: Vec::new(),
                    circle_segments: config.circle_segments,
                })
            }
            Err(e) => {
                for h in created.into_iter().rev() {
                    backend.destroy(h);
                }
                Err(e)
            }
        }
    }

    /// Flushes pending geometry, then releases every resource.
    pub fn shutdown(mut self) -> Result<(), DrawError> {
        let result = self.flush();
        drop(self);
        result
    }

    #[inline]
    pub fn state(&self) -> &BatchState {
        self.batch.state()
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Floats currently staged.
    #[inline]
    pub fn pending_floats(&self) -> usize {
        self.batch.stream().len()
    }

    // ── frame ─────────────────────────────────────────────────────────────

    /// Clears the target immediately. Staged geometry is untouched and is drawn
    /// over the cleared target when it is flushed.
    pub fn clear(&mut self, r: f32, g: f32, b: f32, a: f32) -> Result<(), DrawError> {
        self.backend.clear(ColorRgba::new(r, g, b, a))
    }

    /// Sends staged geometry to the backend as one draw call.
    ///
    /// No-op when nothing is staged. The stream is emptied even when the
    /// backend fails; the failure is returned.
    pub fn flush(&mut self) -> Result<(), DrawError> {
        let Some(plan) = self.batch.plan_flush() else {
            return Ok(());
        };
        let result = self.submit(&plan);
        self.batch.drain();
        if let Err(e) = &result {
            log::warn!("flush of {} {:?} vertices failed: {e}", plan.vertex_count, plan.mode);
        }
        result
    }

    /// Flushes, then applies `change`. The change is applied even when the
    /// flush fails, since the stream is drained either way.
    fn flush_then(&mut self, change: impl FnOnce(&mut BatchState)) -> Result<(), DrawError> {
        let result = self.flush();
        change(self.batch.state_mut());
        result
    }

    /// Drops staged geometry without drawing it.
    pub fn discard(&mut self) {
        if self.batch.plan_flush().is_some() {
            log::debug!("discarding {} staged floats", self.pending_floats());
        }
        self.batch.drain();
    }

    /// Flushes, then presents the frame. The frame is presented even when
    /// the flush fails; the first error is returned.
    pub fn present(&mut self) -> Result<(), DrawError> {
        let flushed = self.flush();
        let presented = self.backend.present();
        flushed.and(presented)
    }

    // ── state ─────────────────────────────────────────────────────────────

    pub fn set_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.set_color_rgba(ColorRgba::new(r, g, b, a));
    }

    pub fn set_color_rgba(&mut self, color: ColorRgba) {
        self.batch.state_mut().set_color(color);
    }

    /// Z used by flat primitives.
    pub fn set_depth(&mut self, depth: f32) {
        self.batch.state_mut().set_depth(depth);
    }

    pub fn set_line_width(&mut self, width: f32) {
        self.batch.state_mut().set_line_width(width);
    }

    pub fn set_wireframe(&mut self, enable: bool) {
        self.batch.state_mut().set_wireframe(enable);
    }

    pub fn set_ortho_matrix(&mut self, width: f32, height: f32) -> Result<(), DrawError> {
        self.set_ortho_matrix_with_offset(0.0, 0.0, width, height)
    }

    pub fn set_ortho_matrix_with_offset(
        &mut self,
        x_offset: f32,
        y_offset: f32,
        width: f32,
        height: f32,
    ) -> Result<(), DrawError> {
        let viewport = Viewport::with_offset(x_offset, y_offset, width, height);
        self.flush_then(|s| s.set_viewport(viewport))
    }

    /// Column-major matrix used by spatial primitives.
    pub fn set_mvp_matrix(&mut self, matrix: [f32; 16]) -> Result<(), DrawError> {
        self.flush_then(|s| s.set_mvp(Mat4::from_cols_array(matrix)))
    }

    /// Stored for billboarding; emission does not read it yet.
    pub fn set_view_direction(&mut self, x: f32, y: f32, z: f32) -> Result<(), DrawError> {
        self.flush_then(|s| s.set_view_direction(Vec3::new(x, y, z)))
    }

    /// Texture sampled by textured primitives; `None` samples plain white.
    pub fn set_texture(&mut self, texture: Option<TextureHandle>) -> Result<(), DrawError> {
        if texture == self.batch.state().texture() {
            return Ok(());
        }
        if self.batch.state().mode().family() == Family::Textured {
            return self.flush_then(|s| s.set_texture(texture));
        }
        self.batch.state_mut().set_texture(texture);
        Ok(())
    }

    /// Uploads an RGBA8 texture. Row 0 of `rgba` maps to `t = 0`.
    ///
    /// The texture lives until the renderer is dropped.
    pub fn create_texture(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<TextureHandle, DrawError> {
        let handle = self.backend.create_texture(&TextureDesc {
            label,
            width,
            height,
            rgba,
        })?;
        self.user_textures.push(handle);
        Ok(handle)
    }

    // ── colored flat ──────────────────────────────────────────────────────

    pub fn point(&mut self, x: f32, y: f32) -> Result<(), DrawError> {
        self.emit(DrawMode::ColoredFlat, "point", |e| e.point(x, y))
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> Result<(), DrawError> {
        self.emit(DrawMode::ColoredFlat, "line", |e| {
            e.line(Vec2::new(x1, y1), Vec2::new(x2, y2))
        })
    }

    pub fn rectangle(&mut self, x: f32, y: f32, w: f32, h: f32) -> Result<(), DrawError> {
        self.emit(DrawMode::ColoredFlat, "rectangle", |e| e.rectangle(x, y, w, h))
    }

    pub fn triangle(
        &mut self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        x3: f32,
        y3: f32,
    ) -> Result<(), DrawError> {
        self.emit(DrawMode::ColoredFlat, "triangle", |e| {
            e.triangle(Vec2::new(x1, y1), Vec2::new(x2, y2), Vec2::new(x3, y3))
        })
    }

    /// Circle with the configured default segment count.
    pub fn circle(&mut self, x: f32, y: f32, radius: f32) -> Result<(), DrawError> {
        self.circle_with_segments(x, y, radius, self.circle_segments)
    }

    /// `segments` below 3 are raised to 3.
    pub fn circle_with_segments(
        &mut self,
        x: f32,
        y: f32,
        radius: f32,
        segments: u32,
    ) -> Result<(), DrawError> {
        self.emit(DrawMode::ColoredFlat, "circle", |e| {
            e.circle(Vec2::new(x, y), radius, segments)
        })
    }

    // ── textured flat ─────────────────────────────────────────────────────

    pub fn textured_quad(&mut self, x: f32, y: f32, w: f32, h: f32) -> Result<(), DrawError> {
        self.textured_quad_region(x, y, w, h, UvRect::FULL)
    }

    pub fn textured_quad_region(
        &mut self,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        uv: UvRect,
    ) -> Result<(), DrawError> {
        self.emit(DrawMode::TexturedFlat, "textured quad", |e| {
            e.textured_quad(x, y, w, h, uv)
        })
    }

    /// Corners are `(position, [s, t])`.
    pub fn textured_triangle(&mut self, corners: [(Vec2, [f32; 2]); 3]) -> Result<(), DrawError> {
        self.emit(DrawMode::TexturedFlat, "textured triangle", |e| {
            e.textured_triangle(corners)
        })
    }

    // ── spatial ───────────────────────────────────────────────────────────

    pub fn triangle_3d(&mut self, a: Vec3, b: Vec3, c: Vec3) -> Result<(), DrawError> {
        self.emit(DrawMode::ColoredSpatial, "3d triangle", |e| e.triangle_3d(a, b, c))
    }

    pub fn quad_3d(&mut self, a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> Result<(), DrawError> {
        self.emit(DrawMode::ColoredSpatial, "3d quad", |e| e.quad_3d(a, b, c, d))
    }

    pub fn textured_triangle_3d(
        &mut self,
        corners: [(Vec3, [f32; 2]); 3],
    ) -> Result<(), DrawError> {
        self.emit(DrawMode::TexturedSpatial, "textured 3d triangle", |e| {
            e.textured_triangle_3d(corners)
        })
    }

    pub fn textured_quad_3d(&mut self, corners: [(Vec3, [f32; 2]); 4]) -> Result<(), DrawError> {
        self.emit(DrawMode::TexturedSpatial, "textured 3d quad", |e| {
            e.textured_quad_3d(corners)
        })
    }

    // ── internals ─────────────────────────────────────────────────────────

    /// Switches to `mode` (flushing first if it differs), then runs `f`.
    fn emit<F>(&mut self, mode: DrawMode, primitive: &'static str, f: F) -> Result<(), DrawError>
    where
        F: FnOnce(&mut Emitter<'_>),
    {
        if self.batch.state().wireframe() && !mode.supports_wireframe() {
            return Err(DrawError::UnsupportedWireframe { primitive, mode });
        }

        if self.batch.state().mode() != mode {
            self.flush()?;
            self.batch.state_mut().set_mode(mode);
        }

        f(&mut self.batch.emitter());
        Ok(())
    }

    fn submit(&mut self, plan: &FlushPlan) -> Result<(), DrawError> {
        for program in [self.colored.program, self.textured.program] {
            self.backend.upload_matrix(program, &plan.matrix)?;
        }

        let (pipeline, texture) = match plan.mode.family() {
            Family::Colored => (self.colored, None),
            Family::Textured => (
                self.textured,
                Some(self.batch.state().texture().unwrap_or(self.white)),
            ),
        };

        log::trace!(
            "flush {:?}: {} vertices, {} triangles",
            plan.mode,
            plan.vertex_count,
            plan.primitive_count
        );

        self.backend.upload_and_draw(&DrawCall {
            program: pipeline.program,
            buffer: pipeline.buffer,
            texture,
            vertices: self.batch.stream().as_slice(),
            vertex_stride: plan.mode.record_width(),
            primitive_count: plan.primitive_count,
        })
    }
}

impl<B: Backend> Drop for Renderer<B> {
    fn drop(&mut self) {
        if self.batch.stream().len() > 0 {
            log::debug!(
                "renderer dropped with {} unflushed floats",
                self.batch.stream().len()
            );
        }

        let handles = self
            .user_textures
            .drain(..)
            .map(ResourceHandle::from)
            .chain([
                ResourceHandle::from(self.white),
                ResourceHandle::from(self.textured.buffer),
                ResourceHandle::from(self.colored.buffer),
                ResourceHandle::from(self.textured.program),
                ResourceHandle::from(self.colored.program),
            ]);
        for h in handles {
            self.backend.destroy(h);
        }
    }
}

fn provision<B: Backend>(
    backend: &mut B,
    created: &mut Vec<ResourceHandle>,
) -> Result<(Pipeline, Pipeline, TextureHandle), DrawError> {
    let colored = pipeline(
        backend,
        created,
        &ProgramDesc {
            label: "colored",
            source: COLORED_SHADER,
            vertex_entry: "vs_main",
            fragment_entry: "fs_main",
            attributes: &COLORED_ATTRIBUTES,
            textured: false,
        },
    )?;

    let textured = pipeline(
        backend,
        created,
        &ProgramDesc {
            label: "textured",
            source: TEXTURED_SHADER,
            vertex_entry: "vs_main",
            fragment_entry: "fs_main",
            attributes: &TEXTURED_ATTRIBUTES,
            textured: true,
        },
    )?;

    let white = backend.create_texture(&TextureDesc {
        label: "white",
        width: 1,
        height: 1,
        rgba: &[255; 4],
    })?;
    created.push(white.into());

    Ok((colored, textured, white))
}

fn pipeline<B: Backend>(
    backend: &mut B,
    created: &mut Vec<ResourceHandle>,
    desc: &ProgramDesc<'_>,
) -> Result<Pipeline, DrawError> {
    let program = backend.compile_and_link(desc)?;
    created.push(program.into());
    let buffer = backend.create_vertex_buffer(desc.label)?;
    created.push(buffer.into());
    Ok(Pipeline { program, buffer })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendEvent, RecordingBackend};

    fn renderer() -> (Renderer<RecordingBackend>, crate::backend::EventLog) {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let r = Renderer::new(backend, RendererConfig::new(800.0, 600.0)).unwrap();
        log.clear();
        (r, log)
    }

    // ── mode dispatch ─────────────────────────────────────────────────────

    #[test]
    fn same_mode_primitives_share_one_flush() {
        let (mut r, log) = renderer();
        r.point(0.0, 0.0).unwrap();
        r.rectangle(0.0, 0.0, 1.0, 1.0).unwrap();
        r.circle(5.0, 5.0, 2.0).unwrap();
        assert_eq!(log.draw_count(), 0);
        r.flush().unwrap();
        assert_eq!(log.draw_count(), 1);
        assert_eq!(log.draws()[0].vertex_count(), 6 + 6 + 48);
    }

    #[test]
    fn textured_draw_without_texture_binds_white() {
        let (mut r, log) = renderer();
        r.textured_quad(0.0, 0.0, 4.0, 4.0).unwrap();
        r.flush().unwrap();
        let draw = &log.draws()[0];
        assert_eq!(draw.texture, Some(r.white));
        assert_eq!(draw.vertex_stride, 9);
    }

    #[test]
    fn texture_switch_splits_textured_batches() {
        let (mut r, log) = renderer();
        let a = r.create_texture("a", 1, 1, &[0, 0, 0, 255]).unwrap();
        let b = r.create_texture("b", 1, 1, &[9, 9, 9, 255]).unwrap();

        r.set_texture(Some(a)).unwrap();
        r.textured_quad(0.0, 0.0, 1.0, 1.0).unwrap();
        r.set_texture(Some(b)).unwrap();
        assert_eq!(log.draw_count(), 1);
        r.textured_quad(0.0, 0.0, 1.0, 1.0).unwrap();
        r.flush().unwrap();

        let draws = log.draws();
        assert_eq!(draws[0].texture, Some(a));
        assert_eq!(draws[1].texture, Some(b));
    }

    #[test]
    fn texture_switch_during_colored_batch_does_not_flush() {
        let (mut r, log) = renderer();
        let a = r.create_texture("a", 1, 1, &[0, 0, 0, 255]).unwrap();
        r.rectangle(0.0, 0.0, 1.0, 1.0).unwrap();
        r.set_texture(Some(a)).unwrap();
        assert_eq!(log.draw_count(), 0);
        assert_eq!(r.pending_floats(), 6 * 7);
    }

    #[test]
    fn spatial_flush_uploads_mvp() {
        let (mut r, log) = renderer();
        let mvp = Mat4::translation(0.0, 0.0, -2.0);
        r.set_mvp_matrix(mvp.to_cols_array()).unwrap();
        r.triangle_3d(Vec3::zero(), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0))
            .unwrap();
        r.flush().unwrap();

        let uploads: Vec<Mat4> = log
            .events()
            .into_iter()
            .filter_map(|e| match e {
                BackendEvent::MatrixUploaded { matrix, .. } => Some(matrix),
                _ => None,
            })
            .collect();
        assert_eq!(uploads, vec![mvp, mvp]);
    }

    // ── wireframe ─────────────────────────────────────────────────────────

    #[test]
    fn wireframe_textured_is_rejected_without_flushing() {
        let (mut r, log) = renderer();
        r.rectangle(0.0, 0.0, 1.0, 1.0).unwrap();
        r.set_wireframe(true);
        let err = r.textured_quad(0.0, 0.0, 1.0, 1.0).unwrap_err();
        assert!(matches!(
            err,
            DrawError::UnsupportedWireframe { mode: DrawMode::TexturedFlat, .. }
        ));
        assert_eq!(log.draw_count(), 0);
        assert_eq!(r.state().mode(), DrawMode::ColoredFlat);
    }

    #[test]
    fn wireframe_spatial_is_rejected() {
        let (mut r, _log) = renderer();
        r.set_wireframe(true);
        assert!(r
            .quad_3d(Vec3::zero(), Vec3::zero(), Vec3::zero(), Vec3::zero())
            .is_err());
        assert_eq!(r.pending_floats(), 0);
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn failed_textured_program_releases_colored_resources() {
        let backend = RecordingBackend::new().failing_program("textured");
        let log = backend.log();
        let err = Renderer::new(backend, RendererConfig::default()).err();
        assert!(matches!(err, Some(DrawError::Shader { .. })));
        assert_eq!(log.destroyed().len(), 2);
    }

    #[test]
    fn defaults_match_fresh_state() {
        let (r, _log) = renderer();
        let s = r.state();
        assert_eq!(s.mode(), DrawMode::ColoredFlat);
        assert_eq!(s.color(), ColorRgba::white());
        assert_eq!(s.line_width(), 1.0);
        assert!(!s.wireframe());
        assert_eq!(s.mvp_matrix(), Mat4::IDENTITY);
        assert_eq!(s.texture(), None);
    }
}
