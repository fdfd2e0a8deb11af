//! Batching core: vertex stream, batch state and geometry emission.
//!
//! A [`BatchContext`] is everything a renderer accumulates between flushes.
//! It never talks to a backend; the renderer decides when to flush and feeds
//! the [`FlushPlan`] plus the raw stream to its backend.

mod emit;
mod flush;
mod mode;
mod state;
mod stream;

pub mod stroke;

pub use emit::{Emitter, UvRect, MIN_CIRCLE_SEGMENTS};
pub use flush::{BatchPhase, FlushPlan};
pub use mode::{DrawMode, Family, Space, COLORED_RECORD_WIDTH, TEXTURED_RECORD_WIDTH};
pub use state::{BatchState, MIN_LINE_WIDTH};
pub use stream::VertexStream;

use crate::coords::Viewport;

/// Stream + state owned by one renderer.
#[derive(Debug)]
pub struct BatchContext {
    state: BatchState,
    stream: VertexStream,
}

impl BatchContext {
    /// `capacity` is the number of floats reserved up front.
    pub fn new(viewport: Viewport, capacity: usize) -> Self {
        Self {
            state: BatchState::new(viewport),
            stream: VertexStream::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn state(&self) -> &BatchState {
        &self.state
    }

    #[inline]
    pub fn state_mut(&mut self) -> &mut BatchState {
        &mut self.state
    }

    #[inline]
    pub fn stream(&self) -> &VertexStream {
        &self.stream
    }

    /// Emitter appending to this context's stream under its state.
    #[inline]
    pub fn emitter(&mut self) -> Emitter<'_> {
        Emitter::new(&mut self.stream, &self.state)
    }

    /// Empties the stream after (or instead of) a flush.
    #[inline]
    pub fn drain(&mut self) {
        self.stream.clear();
    }
}
