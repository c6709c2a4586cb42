//! wgpu implementation of the buffer seam

use std::sync::Arc;
use vortex_core::error::BufferError;
use vortex_core::gpu::{BufferDesc, BufferUsage, GpuBackend, GpuBuffer};

/// Device and queue handles shared with the renderer.
#[derive(Clone)]
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl WgpuBackend {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self { device, queue }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

/// Owned GPU buffer; the allocation is destroyed when the handle drops.
#[derive(Debug)]
pub struct ScopedBuffer {
    buffer: wgpu::Buffer,
    usage: BufferUsage,
}

impl ScopedBuffer {
    pub fn raw(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }
}

impl GpuBuffer for ScopedBuffer {
    fn size_bytes(&self) -> u64 {
        self.buffer.size()
    }
}

impl Drop for ScopedBuffer {
    fn drop(&mut self) {
        self.buffer.destroy();
    }
}

pub fn usages(usage: BufferUsage) -> wgpu::BufferUsages {
    use wgpu::BufferUsages as U;
    match usage {
        // COPY_SRC keeps every buffer eligible as a device-side copy source.
        BufferUsage::Vertex => U::VERTEX | U::COPY_DST | U::COPY_SRC,
        BufferUsage::Index => U::INDEX | U::COPY_DST | U::COPY_SRC,
        BufferUsage::StorageVertex => U::STORAGE | U::VERTEX | U::COPY_DST | U::COPY_SRC,
        BufferUsage::Uniform => U::UNIFORM | U::COPY_DST,
    }
}

impl GpuBackend for WgpuBackend {
    type Buffer = ScopedBuffer;

    fn create_buffer(&self, desc: &BufferDesc<'_>) -> Result<ScopedBuffer, BufferError> {
        let limits = self.device.limits();
        let mut max = limits.max_buffer_size;
        if desc.usage == BufferUsage::StorageVertex {
            max = max.min(u64::from(limits.max_storage_buffer_binding_size));
        }
        if desc.size_bytes > max {
            return Err(BufferError::Allocation {
                label: desc.label.to_string(),
                size_bytes: desc.size_bytes,
                reason: format!("device limit is {max} bytes"),
            });
        }

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size: desc.size_bytes,
            usage: usages(desc.usage),
            mapped_at_creation: false,
        });

        tracing::trace!(label = desc.label, size_bytes = desc.size_bytes, "buffer created");
        Ok(ScopedBuffer {
            buffer,
            usage: desc.usage,
        })
    }

    fn write_buffer(&self, buffer: &ScopedBuffer, offset: u64, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.queue.write_buffer(&buffer.buffer, offset, data);
    }

    fn copy_buffer(&self, src: &ScopedBuffer, dst: &ScopedBuffer, size_bytes: u64) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("buffer copy"),
            });
        encoder.copy_buffer_to_buffer(&src.buffer, 0, &dst.buffer, 0, size_bytes);
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::BufferUsages as U;

    #[test]
    fn kernel_buffers_are_storage_and_vertex() {
        let usage = usages(BufferUsage::StorageVertex);
        assert!(usage.contains(U::STORAGE | U::VERTEX | U::COPY_SRC | U::COPY_DST));
    }

    #[test]
    fn uniforms_are_not_copy_sources() {
        assert!(!usages(BufferUsage::Uniform).contains(U::COPY_SRC));
        assert!(usages(BufferUsage::Index).contains(U::INDEX));
    }
}
