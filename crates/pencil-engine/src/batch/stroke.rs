//! Stroke expansion: turns outlines into thick quads.
//!
//! Every wireframe shape goes through here so line thickness is computed one
//! way: the band between an edge and its inner offset is exactly `width` wide,
//! measured perpendicular to that edge. Corners are mitred; corners too sharp
//! for the mitre limit are bevelled.

use crate::coords::Vec2;

/// Four corners emitted as triangles `(q0, q1, q2)` and `(q0, q2, q3)`.
pub type Quad = [Vec2; 4];

/// Mitre length beyond which a corner is bevelled, as a multiple of `width`.
const MITER_LIMIT: f32 = 4.0;

/// Inward stroke of a closed outline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outline {
    /// One band per edge: `[start, end, inner end, inner start]`.
    pub bands: Vec<Quad>,
    /// Triangles filling the gap at bevelled corners.
    pub joins: Vec<[Vec2; 3]>,
}

/// Band of `width` centred on the segment `a → b`.
///
/// Returns `None` for a zero-length segment (no direction to offset along).
pub fn segment(a: Vec2, b: Vec2, width: f32) -> Option<Quad> {
    let d = b - a;
    let n = d.normalized()?.perp() * width;
    let p = a - n * 0.5;
    Some([p, p + d, p + d + n, p + n])
}

/// Bands of `width` along every edge of the closed outline `points`, grown
/// towards the interior.
///
/// Yields one band per edge plus one join per bevelled corner; fewer than
/// three points yield nothing. Winding may be either direction.
pub fn closed_inward(points: &[Vec2], width: f32) -> Outline {
    let n = points.len();
    if n < 3 {
        return Outline::default();
    }

    // Interior lies left of each edge for positive signed area.
    let area2: f32 = (0..n).map(|i| points[i].cross(points[(i + 1) % n])).sum();
    let side = if area2 < 0.0 { -1.0 } else { 1.0 };

    let normals: Vec<Vec2> = (0..n)
        .map(|i| {
            let d = points[(i + 1) % n] - points[i];
            d.normalized().map_or(Vec2::zero(), |u| u.perp() * side)
        })
        .collect();

    // Inner endpoints per edge, indexed by edge.
    let mut starts = vec![Vec2::zero(); n];
    let mut ends = vec![Vec2::zero(); n];
    let mut joins = Vec::new();

    for i in 0..n {
        let prev = (i + n - 1) % n;
        let corner = points[i];
        match miter(normals[prev], normals[i], width) {
            Some(m) => {
                ends[prev] = corner + m;
                starts[i] = corner + m;
            }
            None => {
                let end = corner + normals[prev] * width;
                let start = corner + normals[i] * width;
                ends[prev] = end;
                starts[i] = start;
                joins.push([corner, end, start]);
            }
        }
    }

    let bands = (0..n)
        .map(|i| [points[i], points[(i + 1) % n], ends[i], starts[i]])
        .collect();

    Outline { bands, joins }
}

/// Offset from a corner to the intersection of both edges' inner offset
/// lines, or `None` when that point lies beyond the mitre limit.
fn miter(n0: Vec2, n1: Vec2, width: f32) -> Option<Vec2> {
    let denom = 1.0 + n0.dot(n1);
    if denom <= f32::EPSILON {
        return None;
    }
    let m = (n0 + n1) * (width / denom);
    (m.length() <= MITER_LIMIT * width).then_some(m)
}
