use super::Mat4;

/// Flat-space viewport: the region of pixel space mapped onto the whole surface.
///
/// `x_offset`/`y_offset` shift the visible region; `width`/`height` are its size.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub x_offset: f32,
    pub y_offset: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self::with_offset(0.0, 0.0, width, height)
    }

    #[inline]
    pub const fn with_offset(x_offset: f32, y_offset: f32, width: f32, height: f32) -> Self {
        Self { x_offset, y_offset, width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width != 0.0 && self.height != 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Orthographic projection for this viewport (+Y down, origin top-left).
    pub fn ortho_matrix(self) -> Mat4 {
        let xs = 2.0 / self.width;
        let ys = -2.0 / self.height;
        let xo = -1.0 - (self.x_offset * 2.0) / self.width;
        let yo = 1.0 + (self.y_offset * 2.0) / self.height;

        let mut m = [0.0f32; 16];
        m[0] = xs;
        m[5] = ys;
        m[10] = 1.0;
        m[15] = 1.0;
        m[12] = xo;
        m[13] = yo;
        Mat4::from_cols_array(m)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn ortho_800x600_terms() {
        let m = Viewport::new(800.0, 600.0).ortho_matrix();
        let c = m.to_cols_array();
        assert!(close(c[0], 0.0025));
        assert!(close(c[5], -2.0 / 600.0));
        assert!(close(c[12], -1.0));
        assert!(close(c[13], 1.0));
        assert_eq!(c[10], 1.0);
        assert_eq!(c[15], 1.0);
    }

    #[test]
    fn ortho_only_touches_diagonal_and_translation() {
        let c = Viewport::with_offset(10.0, 20.0, 640.0, 480.0)
            .ortho_matrix()
            .to_cols_array();
        for (i, v) in c.iter().enumerate() {
            if ![0, 5, 10, 12, 13, 15].contains(&i) {
                assert_eq!(*v, 0.0, "element {i}");
            }
        }
    }

    #[test]
    fn ortho_offset_shifts_translation() {
        let c = Viewport::with_offset(100.0, 50.0, 800.0, 600.0)
            .ortho_matrix()
            .to_cols_array();
        assert!(close(c[12], -1.0 - 200.0 / 800.0));
        assert!(close(c[13], 1.0 + 100.0 / 600.0));
    }

    #[test]
    fn ortho_maps_corners_to_ndc() {
        let m = Viewport::new(800.0, 600.0).ortho_matrix();
        let tl = m.transform_point([0.0, 0.0, 0.0]);
        let br = m.transform_point([800.0, 600.0, 0.0]);
        assert!(close(tl[0], -1.0) && close(tl[1], 1.0));
        assert!(close(br[0], 1.0) && close(br[1], -1.0));
    }
}
