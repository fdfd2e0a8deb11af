use crate::backend::TextureHandle;
use crate::coords::{ColorRgba, Mat4, Vec3, Viewport};

use super::mode::{DrawMode, Space};

/// Smallest line width accepted; non-positive requests are raised to this.
pub const MIN_LINE_WIDTH: f32 = 1.0e-3;

/// Everything that shapes the next emitted vertex or the next flush.
///
/// Plain setters here never flush. Transform and texture changes go through the
/// renderer, which flushes pending geometry before calling them.
#[derive(Debug, Clone)]
pub struct BatchState {
    mode: DrawMode,

    color: ColorRgba,
    line_width: f32,
    wireframe: bool,
    depth: f32,

    viewport: Viewport,
    ortho: Mat4,
    mvp: Mat4,
    view_direction: Vec3,

    texture: Option<TextureHandle>,

    warned_line_width: bool,
}

impl BatchState {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            mode: DrawMode::default(),
            color: ColorRgba::white(),
            line_width: 1.0,
            wireframe: false,
            depth: 0.0,
            viewport,
            ortho: viewport.ortho_matrix(),
            mvp: Mat4::IDENTITY,
            view_direction: Vec3::zero(),
            texture: None,
            warned_line_width: false,
        }
    }

    // ── mode ──────────────────────────────────────────────────────────────

    #[inline]
    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    #[inline]
    pub(crate) fn set_mode(&mut self, mode: DrawMode) {
        self.mode = mode;
    }

    // ── per-vertex attributes ─────────────────────────────────────────────

    #[inline]
    pub fn color(&self) -> ColorRgba {
        self.color
    }

    #[inline]
    pub fn set_color(&mut self, color: ColorRgba) {
        self.color = color;
    }

    #[inline]
    pub fn line_width(&self) -> f32 {
        self.line_width
    }

    pub fn set_line_width(&mut self, width: f32) {
        if width > 0.0 && width.is_finite() {
            self.line_width = width;
            return;
        }
        if !self.warned_line_width {
            log::debug!("line width {width} is not positive; using {MIN_LINE_WIDTH}");
            self.warned_line_width = true;
        }
        self.line_width = MIN_LINE_WIDTH;
    }

    #[inline]
    pub fn wireframe(&self) -> bool {
        self.wireframe
    }

    #[inline]
    pub fn set_wireframe(&mut self, enable: bool) {
        self.wireframe = enable;
    }

    /// Z value written for every flat primitive.
    #[inline]
    pub fn depth(&self) -> f32 {
        self.depth
    }

    #[inline]
    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth;
    }

    // ── transforms ────────────────────────────────────────────────────────

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[inline]
    pub fn ortho_matrix(&self) -> Mat4 {
        self.ortho
    }

    #[inline]
    pub fn mvp_matrix(&self) -> Mat4 {
        self.mvp
    }

    #[inline]
    pub fn view_direction(&self) -> Vec3 {
        self.view_direction
    }

    /// Matrix applied to geometry of the given space.
    #[inline]
    pub fn matrix_for(&self, space: Space) -> Mat4 {
        match space {
            Space::Flat => self.ortho,
            Space::Spatial => self.mvp,
        }
    }

    pub(crate) fn set_viewport(&mut self, viewport: Viewport) {
        if !viewport.is_valid() {
            log::warn!("degenerate ortho viewport {viewport:?}; flat geometry will not be visible");
        }
        self.viewport = viewport;
        self.ortho = viewport.ortho_matrix();
    }

    pub(crate) fn set_mvp(&mut self, mvp: Mat4) {
        self.mvp = mvp;
    }

    pub(crate) fn set_view_direction(&mut self, dir: Vec3) {
        self.view_direction = dir;
    }

    // ── texture ───────────────────────────────────────────────────────────

    #[inline]
    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    pub(crate) fn set_texture(&mut self, texture: Option<TextureHandle>) {
        self.texture = texture;
    }
}

impl Default for BatchState {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}
