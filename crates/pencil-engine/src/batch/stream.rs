use crate::coords::{ColorRgba, Vec3};

/// Interleaved vertex records awaiting the next flush.
///
/// The stream does not know its own record width; callers push whole records
/// through [`push_colored`](Self::push_colored) / [`push_textured`](Self::push_textured)
/// and the batch guarantees a single width per flush.
///
/// Growth is unbounded: nothing flushes on a size threshold.
#[derive(Debug, Default)]
pub struct VertexStream {
    data: Vec<f32>,
}

impl VertexStream {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_capacity(floats: usize) -> Self {
        Self { data: Vec::with_capacity(floats) }
    }

    /// Appends raw floats in order.
    #[inline]
    pub fn push(&mut self, values: &[f32]) {
        self.data.extend_from_slice(values);
    }

    /// Appends one `{x,y,z, r,g,b,a}` record.
    #[inline]
    pub fn push_colored(&mut self, pos: Vec3, color: ColorRgba) {
        self.data.extend_from_slice(&[
            pos.x, pos.y, pos.z, color.r, color.g, color.b, color.a,
        ]);
    }

    /// Appends one `{x,y,z, r,g,b,a, s,t}` record.
    #[inline]
    pub fn push_textured(&mut self, pos: Vec3, color: ColorRgba, uv: [f32; 2]) {
        self.data.extend_from_slice(&[
            pos.x, pos.y, pos.z, color.r, color.g, color.b, color.a, uv[0], uv[1],
        ]);
    }

    /// Empties the stream. Keeps allocated capacity for reuse.
    #[inline]
    pub fn clear(&mut self) {
        self.data.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of floats currently staged.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Number of whole records of `record_width` floats.
    #[inline]
    pub fn vertex_count(&self, record_width: usize) -> usize {
        self.data.len() / record_width
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}
