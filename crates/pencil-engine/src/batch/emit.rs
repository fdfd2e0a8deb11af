//! Primitive → triangle conversion.
//!
//! The emitter only appends records; mode switching and flushing are the
//! renderer's job and have already happened by the time a method here runs.

use std::f32::consts::TAU;

use crate::coords::{Vec2, Vec3};

use super::state::BatchState;
use super::stream::VertexStream;
use super::stroke::{self, Quad};

/// Fewest segments a circle is tessellated into.
pub const MIN_CIRCLE_SEGMENTS: u32 = 3;

/// Sub-rectangle of a texture in normalized coordinates.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct UvRect {
    pub s: f32,
    pub t: f32,
    pub width: f32,
    pub height: f32,
}

impl UvRect {
    /// The whole texture.
    pub const FULL: UvRect = UvRect::new(0.0, 0.0, 1.0, 1.0);

    #[inline]
    pub const fn new(s: f32, t: f32, width: f32, height: f32) -> Self {
        Self { s, t, width, height }
    }
}

impl Default for UvRect {
    fn default() -> Self {
        Self::FULL
    }
}

/// Appends geometry for one primitive under a borrowed [`BatchState`].
pub struct Emitter<'a> {
    stream: &'a mut VertexStream,
    state: &'a BatchState,
}

impl<'a> Emitter<'a> {
    #[inline]
    pub fn new(stream: &'a mut VertexStream, state: &'a BatchState) -> Self {
        Self { stream, state }
    }

    // ── colored flat ──────────────────────────────────────────────────────

    /// Unit square with its top-left corner at `(x, y)`.
    pub fn point(&mut self, x: f32, y: f32) {
        self.quad([
            Vec2::new(x, y),
            Vec2::new(x + 1.0, y),
            Vec2::new(x + 1.0, y + 1.0),
            Vec2::new(x, y + 1.0),
        ]);
    }

    /// Band of the current line width centred on `a → b`.
    ///
    /// Zero-length lines emit nothing.
    pub fn line(&mut self, a: Vec2, b: Vec2) {
        match stroke::segment(a, b, self.state.line_width()) {
            Some([p, pd, pdn, pn]) => {
                self.tri(p, pd, pn);
                self.tri(pn, pd, pdn);
            }
            None => log::trace!("skipping zero-length line at {a:?}"),
        }
    }

    pub fn rectangle(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let corners = [
            Vec2::new(x, y),
            Vec2::new(x + w, y),
            Vec2::new(x + w, y + h),
            Vec2::new(x, y + h),
        ];
        if self.state.wireframe() {
            self.outline(&corners);
        } else {
            self.quad(corners);
        }
    }

    pub fn triangle(&mut self, a: Vec2, b: Vec2, c: Vec2) {
        if self.state.wireframe() {
            self.outline(&[a, b, c]);
        } else {
            self.tri(a, b, c);
        }
    }

    /// Circle fanned from `center`; vertex `i` sits at angle `i·2π/segments`,
    /// starting at `(cx, cy + r)`.
    pub fn circle(&mut self, center: Vec2, radius: f32, segments: u32) {
        let n = segments.max(MIN_CIRCLE_SEGMENTS);
        if n != segments {
            log::trace!("circle segments {segments} raised to {n}");
        }

        let rim: Vec<Vec2> = (0..n).map(|i| rim_point(center, radius, i, n)).collect();

        if self.state.wireframe() {
            self.outline(&rim);
            return;
        }

        for i in 0..rim.len() {
            let next = rim[(i + 1) % rim.len()];
            self.tri(center, rim[i], next);
        }
    }

    // ── textured flat ─────────────────────────────────────────────────────

    /// Axis-aligned quad sampling `uv`; the texture's `t` axis runs bottom-up.
    pub fn textured_quad(&mut self, x: f32, y: f32, w: f32, h: f32, uv: UvRect) {
        let z = self.state.depth();
        let (s0, s1) = (uv.s, uv.s + uv.width);
        let (t0, t1) = (uv.t, uv.t + uv.height);

        let tl = (Vec3::new(x, y, z), [s0, t1]);
        let tr = (Vec3::new(x + w, y, z), [s1, t1]);
        let br = (Vec3::new(x + w, y + h, z), [s1, t0]);
        let bl = (Vec3::new(x, y + h, z), [s0, t0]);

        for (pos, st) in [tl, tr, br, tl, br, bl] {
            self.stream.push_textured(pos, self.state.color(), st);
        }
    }

    pub fn textured_triangle(&mut self, corners: [(Vec2, [f32; 2]); 3]) {
        let z = self.state.depth();
        for (p, st) in corners {
            self.stream
                .push_textured(Vec3::new(p.x, p.y, z), self.state.color(), st);
        }
    }

    // ── colored spatial ───────────────────────────────────────────────────

    pub fn triangle_3d(&mut self, a: Vec3, b: Vec3, c: Vec3) {
        for p in [a, b, c] {
            self.stream.push_colored(p, self.state.color());
        }
    }

    /// Quad split along the `a–c` diagonal.
    pub fn quad_3d(&mut self, a: Vec3, b: Vec3, c: Vec3, d: Vec3) {
        for p in [a, b, c, a, c, d] {
            self.stream.push_colored(p, self.state.color());
        }
    }

    // ── textured spatial ──────────────────────────────────────────────────

    pub fn textured_triangle_3d(&mut self, corners: [(Vec3, [f32; 2]); 3]) {
        for (p, st) in corners {
            self.stream.push_textured(p, self.state.color(), st);
        }
    }

    /// Textured quad split along the `a–c` diagonal.
    pub fn textured_quad_3d(&mut self, corners: [(Vec3, [f32; 2]); 4]) {
        let [a, b, c, d] = corners;
        for (p, st) in [a, b, c, a, c, d] {
            self.stream.push_textured(p, self.state.color(), st);
        }
    }

    // ── helpers ───────────────────────────────────────────────────────────

    fn outline(&mut self, points: &[Vec2]) {
        let outline = stroke::closed_inward(points, self.state.line_width());
        for q in outline.bands {
            self.quad(q);
        }
        for [a, b, c] in outline.joins {
            self.tri(a, b, c);
        }
    }

    fn quad(&mut self, q: Quad) {
        self.tri(q[0], q[1], q[2]);
        self.tri(q[0], q[2], q[3]);
    }

    fn tri(&mut self, a: Vec2, b: Vec2, c: Vec2) {
        let z = self.state.depth();
        let color = self.state.color();
        for p in [a, b, c] {
            self.stream.push_colored(Vec3::new(p.x, p.y, z), color);
        }
    }
}

fn rim_point(center: Vec2, radius: f32, i: u32, segments: u32) -> Vec2 {
    let angle = i as f32 * (TAU / segments as f32);
    Vec2::new(center.x + angle.sin() * radius, center.y + angle.cos() * radius)
}
