//! Vortex Render
//!
//! The wgpu half of the pipeline: surface and device setup, a
//! [`GpuBackend`](vortex_core::gpu::GpuBackend) over real GPU buffers, one
//! render pipeline per topology, and the compute kernel that integrates
//! entities on the GPU.

pub mod backend;
pub mod context;
pub mod error;
pub mod kernel;
pub mod pipelines;
pub mod renderer;
pub mod window;

pub use wgpu;
pub use winit;

pub use backend::{ScopedBuffer, WgpuBackend};
pub use context::GpuContext;
pub use error::RenderError;
pub use renderer::Renderer;
