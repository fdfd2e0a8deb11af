use thiserror::Error;

use crate::backend::ResourceHandle;
use crate::batch::DrawMode;

/// Errors reported by the renderer and its backends.
#[derive(Debug, Error)]
pub enum DrawError {
    /// Window, surface, adapter or device could not be created.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// Shader source failed to compile, or the program failed to link.
    #[error("shader `{label}` failed to build: {message}")]
    Shader { label: String, message: String },

    /// A required vertex attribute is not declared by the shader.
    #[error("shader `{label}` has no vertex attribute `{attribute}` at location {location}")]
    AttributeBinding {
        label: String,
        attribute: &'static str,
        location: u32,
    },

    /// Wireframe was requested for a primitive that has no wireframe form.
    #[error("{primitive} cannot be drawn as wireframe in {mode:?} mode")]
    UnsupportedWireframe {
        primitive: &'static str,
        mode: DrawMode,
    },

    /// The handle was never created by this backend, or was already destroyed.
    #[error("unknown resource handle {0:?}")]
    UnknownHandle(ResourceHandle),

    /// The surface could not provide a frame and cannot recover.
    #[error("surface failure: {0}")]
    Surface(String),

    /// Any other backend-side rejection.
    #[error("backend error: {0}")]
    Backend(String),
}
