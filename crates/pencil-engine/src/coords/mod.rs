//! Coordinate, color and matrix types shared by the batching core and backends.
//!
//! Canonical flat space:
//! - pixels, origin top-left, +X right, +Y down (as set up by the ortho projection)
//!
//! Spatial primitives are passed through the caller-supplied MVP matrix as-is.
//! Matrices are column-major, matching WGSL `mat4x4<f32>`.

mod color;
mod mat4;
mod vec2;
mod vec3;
mod viewport;

pub use color::ColorRgba;
pub use mat4::Mat4;
pub use vec2::Vec2;
pub use vec3::Vec3;
pub use viewport::Viewport;
