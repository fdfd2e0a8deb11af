use crate::coords::Mat4;

use super::mode::DrawMode;
use super::BatchContext;

/// Flush state machine.
///
/// `Pending → Idle` happens only through a flush; emission moves `Idle → Pending`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BatchPhase {
    /// Stream is empty; flushing is a no-op.
    Idle,
    /// Stream holds records of the current mode.
    Pending,
}

/// What a flush has to submit, captured before the stream is drained.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FlushPlan {
    pub mode: DrawMode,
    pub matrix: Mat4,
    pub vertex_count: u32,
    /// Triangles: every three vertices form one.
    pub primitive_count: u32,
}

impl BatchContext {
    #[inline]
    pub fn phase(&self) -> BatchPhase {
        if self.stream.is_empty() {
            BatchPhase::Idle
        } else {
            BatchPhase::Pending
        }
    }

    /// Describes the pending flush, or `None` when idle.
    pub fn plan_flush(&self) -> Option<FlushPlan> {
        if self.phase() == BatchPhase::Idle {
            return None;
        }

        let mode = self.state.mode();
        let width = mode.record_width();
        debug_assert_eq!(
            self.stream.len() % width,
            0,
            "vertex stream holds a partial {mode:?} record"
        );

        let vertex_count = self.stream.vertex_count(width) as u32;
        Some(FlushPlan {
            mode,
            matrix: self.state.matrix_for(mode.space()),
            vertex_count,
            primitive_count: vertex_count / 3,
        })
    }
}
