//! Pencil engine crate.
//!
//! Immediate-mode 2D/3D primitive drawing batched into one draw call per
//! state change, on wgpu. [`Renderer`] is the drawing API; [`window::Runtime`]
//! opens a window and drives an [`App`] with one.

pub mod backend;
pub mod batch;
pub mod coords;
pub mod core;
pub mod device;
pub mod logging;
pub mod time;
pub mod window;

mod error;
mod renderer;

pub use crate::core::{App, AppControl, FrameCtx, WindowCtx};
pub use backend::{Backend, RecordingBackend, TextureHandle, WgpuBackend};
pub use batch::{DrawMode, UvRect};
pub use coords::{ColorRgba, Mat4, Vec2, Vec3, Viewport};
pub use error::DrawError;
pub use renderer::{Renderer, RendererConfig};
