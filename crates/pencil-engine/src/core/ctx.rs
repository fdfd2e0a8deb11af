use winit::window::{Window, WindowId};

use crate::backend::WgpuBackend;
use crate::error::DrawError;
use crate::renderer::Renderer;
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

/// The window being drawn.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl WindowCtx<'_> {
    /// Logical window size as `(width, height)`.
    pub fn size(&self) -> (f32, f32) {
        let logical: winit::dpi::LogicalSize<f64> =
            self.window.inner_size().to_logical(self.window.scale_factor());
        (logical.width as f32, logical.height as f32)
    }

    /// Drawable size in physical pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }
}

/// Per-frame context passed to `App::on_frame`.
///
/// - `'a` is the duration of the callback
/// - `'w` is the window borrow carried by the wgpu surface
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub renderer: &'a mut Renderer<WgpuBackend<'w>>,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}

impl FrameCtx<'_, '_> {
    /// Flushes and presents the frame, presenting even when the flush fails.
    pub fn present(&mut self) -> Result<(), DrawError> {
        let flushed = self.renderer.flush();
        self.window.window.pre_present_notify();
        flushed.and(self.renderer.present())
    }

    /// Abandons the frame: staged geometry and everything recorded since the
    /// last present are dropped instead of shown.
    pub fn discard(&mut self) {
        self.renderer.discard();
        self.renderer.backend_mut().discard_frame();
    }
}
