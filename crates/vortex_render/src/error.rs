use thiserror::Error;
use vortex_core::error::BufferError;
use vortex_core::layout::Topology;
use vortex_core::CoreError;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("no compatible graphics adapter found")]
    AdapterUnavailable,

    #[error("failed to open device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,

    #[error("attribute with {components} components has no vertex format")]
    UnsupportedAttribute { components: usize },

    #[error("{label}: {topology:?} draws need an index buffer")]
    MissingIndices { label: &'static str, topology: Topology },

    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error(transparent)]
    Core(#[from] CoreError),
}
