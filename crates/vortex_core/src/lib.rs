//! Vortex Core
//!
//! The simulation-and-encoding half of the pipeline:
//! - Entity stores (array-of-structs and structure-of-arrays)
//! - Integrators (scalar and 8-wide vortex field, ballistic bounce)
//! - Vertex encoders (quads, points, planar channels, graph lines)
//! - Growable GPU buffers over an abstract backend
//! - The per-frame pipeline tying it all together
//!
//! Nothing in here talks to a real graphics API; `vortex_render` provides the
//! wgpu implementation of [`gpu::GpuBackend`] and [`pipeline::FrameRenderer`].

pub mod bounds;
pub mod buffer;
pub mod config;
pub mod encoder;
pub mod entity;
pub mod error;
pub mod field;
pub mod gpu;
pub mod graph;
pub mod integrator;
pub mod kernel;
pub mod layout;
pub mod pipeline;
pub mod store;
pub mod time;

pub use glam;

pub use entity::{Entity, EntityId};
pub use error::CoreError;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
