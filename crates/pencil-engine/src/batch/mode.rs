/// Draw mode of the current batch.
///
/// A mode fixes both the vertex record layout (its [`Family`]) and the matrix
/// the batch is transformed by (its [`Space`]). Geometry of two different modes
/// never shares a flush.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum DrawMode {
    #[default]
    ColoredFlat,
    TexturedFlat,
    ColoredSpatial,
    TexturedSpatial,
}

/// Program/buffer family selected by a mode.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Family {
    Colored,
    Textured,
}

/// Which staged matrix transforms a mode's geometry.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Space {
    /// Orthographic pixel projection.
    Flat,
    /// Caller-supplied model-view-projection matrix.
    Spatial,
}

/// Floats per colored record: `x, y, z, r, g, b, a`.
pub const COLORED_RECORD_WIDTH: usize = 7;
/// Floats per textured record: `x, y, z, r, g, b, a, s, t`.
pub const TEXTURED_RECORD_WIDTH: usize = 9;

impl DrawMode {
    pub const ALL: [DrawMode; 4] = [
        DrawMode::ColoredFlat,
        DrawMode::TexturedFlat,
        DrawMode::ColoredSpatial,
        DrawMode::TexturedSpatial,
    ];

    #[inline]
    pub const fn family(self) -> Family {
        match self {
            DrawMode::ColoredFlat | DrawMode::ColoredSpatial => Family::Colored,
            DrawMode::TexturedFlat | DrawMode::TexturedSpatial => Family::Textured,
        }
    }

    #[inline]
    pub const fn space(self) -> Space {
        match self {
            DrawMode::ColoredFlat | DrawMode::TexturedFlat => Space::Flat,
            DrawMode::ColoredSpatial | DrawMode::TexturedSpatial => Space::Spatial,
        }
    }

    #[inline]
    pub const fn record_width(self) -> usize {
        self.family().record_width()
    }

    /// Only colored flat primitives have a wireframe form.
    #[inline]
    pub const fn supports_wireframe(self) -> bool {
        matches!(self, DrawMode::ColoredFlat)
    }
}

impl Family {
    #[inline]
    pub const fn record_width(self) -> usize {
        match self {
            Family::Colored => COLORED_RECORD_WIDTH,
            Family::Textured => TEXTURED_RECORD_WIDTH,
        }
    }
}
