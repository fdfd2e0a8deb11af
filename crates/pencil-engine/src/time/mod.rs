//! Frame timing handed to `App::on_frame`.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
