//! Growable GPU buffers
//!
//! A [`GrowableBuffer`] holds a fixed-stride array of elements on the GPU plus a
//! host mirror of everything written to it. When the element count outgrows the
//! buffer it is recreated at the next power of two and refilled from the
//! mirror, so callers never lose data across a reallocation.
//!
//! Invariant: `handle.size_bytes() == capacity × stride_bytes`.

use crate::encoder::quad_indices;
use crate::error::BufferError;
use crate::gpu::{BufferDesc, BufferUsage, GpuBackend, GpuBuffer};
use crate::layout::INDEX_BYTES;

pub struct GrowableBuffer<B: GpuBackend> {
    label: String,
    usage: BufferUsage,
    stride_bytes: usize,
    capacity: usize,
    handle: B::Buffer,
    mirror: Vec<u8>,
    /// Bytes of `mirror` holding written data.
    used_bytes: usize,
}

impl<B: GpuBackend> GrowableBuffer<B> {
    /// Allocate room for `capacity` elements of `stride_bytes` each (at least one).
    pub fn new(
        backend: &B,
        label: impl Into<String>,
        usage: BufferUsage,
        stride_bytes: usize,
        capacity: usize,
    ) -> Result<Self, BufferError> {
        let label = label.into();
        let capacity = capacity.max(1);
        let handle = Self::allocate(backend, &label, usage, stride_bytes, capacity)?;
        Ok(Self {
            label,
            usage,
            stride_bytes,
            capacity,
            handle,
            mirror: vec![0; capacity * stride_bytes],
            used_bytes: 0,
        })
    }

    fn allocate(
        backend: &B,
        label: &str,
        usage: BufferUsage,
        stride_bytes: usize,
        capacity: usize,
    ) -> Result<B::Buffer, BufferError> {
        let size_bytes = (capacity * stride_bytes) as u64;
        let handle = backend.create_buffer(&BufferDesc {
            label,
            size_bytes,
            usage,
        })?;
        debug_assert_eq!(handle.size_bytes(), size_bytes);
        Ok(handle)
    }

    /// Make room for `required` elements.
    ///
    /// Returns `true` when the buffer was recreated. The new capacity is
    /// `required.next_power_of_two()`, which is always at least double the old
    /// one. Written contents are re-uploaded.
    pub fn ensure_capacity(&mut self, backend: &B, required: usize) -> Result<bool, BufferError> {
        if required <= self.capacity {
            return Ok(false);
        }

        let capacity = required.next_power_of_two().max(self.capacity * 2);
        let handle = Self::allocate(backend, &self.label, self.usage, self.stride_bytes, capacity)?;
        // Old handle is released here.
        self.handle = handle;
        self.mirror.resize(capacity * self.stride_bytes, 0);

        tracing::debug!(
            label = %self.label,
            old_capacity = self.capacity,
            new_capacity = capacity,
            size_bytes = capacity * self.stride_bytes,
            "reallocated GPU buffer"
        );
        self.capacity = capacity;

        if self.used_bytes > 0 {
            backend.write_buffer(&self.handle, 0, &self.mirror[..self.used_bytes]);
        }
        Ok(true)
    }

    /// Copy `bytes` into the buffer at `offset` bytes.
    pub fn write(&mut self, backend: &B, offset: u64, bytes: &[u8]) -> Result<(), BufferError> {
        let end = offset as usize + bytes.len();
        if end > self.mirror.len() {
            return Err(BufferError::OutOfRange {
                label: self.label.clone(),
                offset,
                len: bytes.len() as u64,
                size_bytes: self.size_bytes(),
            });
        }
        if bytes.is_empty() {
            return Ok(());
        }
        self.mirror[offset as usize..end].copy_from_slice(bytes);
        self.used_bytes = self.used_bytes.max(end);
        backend.write_buffer(&self.handle, offset, bytes);
        Ok(())
    }

    /// Replace the buffer contents from the start.
    pub fn write_all(&mut self, backend: &B, bytes: &[u8]) -> Result<(), BufferError> {
        self.write(backend, 0, bytes)?;
        self.used_bytes = bytes.len();
        Ok(())
    }

    /// Host copy of the written contents.
    pub fn mirror(&self) -> &[u8] {
        &self.mirror[..self.used_bytes]
    }

    pub fn handle(&self) -> &B::Buffer {
        &self.handle
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stride_bytes(&self) -> usize {
        self.stride_bytes
    }

    pub fn size_bytes(&self) -> u64 {
        (self.capacity * self.stride_bytes) as u64
    }
}

/// Index buffer for indexed quads, sized to the vertex buffer's capacity.
///
/// The contents depend only on the capacity, so the whole buffer is
/// regenerated whenever that changes.
pub struct QuadIndices<B: GpuBackend> {
    buffer: GrowableBuffer<B>,
    quads: usize,
}

impl<B: GpuBackend> QuadIndices<B> {
    const STRIDE_BYTES: usize = 6 * INDEX_BYTES;

    pub fn new(backend: &B, capacity: usize) -> Result<Self, BufferError> {
        let buffer = GrowableBuffer::new(
            backend,
            "quad indices",
            BufferUsage::Index,
            Self::STRIDE_BYTES,
            capacity,
        )?;
        let mut indices = Self { buffer, quads: 0 };
        indices.sync(backend, capacity)?;
        Ok(indices)
    }

    /// Regenerate for `capacity` quads if that differs from the last sync.
    pub fn sync(&mut self, backend: &B, capacity: usize) -> Result<bool, BufferError> {
        let capacity = capacity.max(1);
        if capacity == self.quads {
            return Ok(false);
        }
        self.buffer.ensure_capacity(backend, capacity)?;
        let indices = quad_indices(self.buffer.capacity());
        self.buffer.write_all(backend, bytemuck::cast_slice(&indices))?;
        self.quads = capacity;
        Ok(true)
    }

    pub fn buffer(&self) -> &GrowableBuffer<B> {
        &self.buffer
    }

    pub fn handle(&self) -> &B::Buffer {
        self.buffer.handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::MemoryBackend;

    fn floats(values: &[f32]) -> &[u8] {
        bytemuck::cast_slice(values)
    }

    // Byte vectors carry no alignment guarantee, so decode instead of casting.
    fn read_f32(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn read_u32(bytes: &[u8]) -> Vec<u32> {
        bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn size_tracks_capacity_times_stride() {
        let backend = MemoryBackend::new();
        let mut buffer = GrowableBuffer::new(&backend, "v", BufferUsage::Vertex, 20, 3).unwrap();
        assert_eq!(buffer.handle().size_bytes(), 60);

        assert!(!buffer.ensure_capacity(&backend, 3).unwrap());
        assert!(buffer.ensure_capacity(&backend, 5).unwrap());
        assert_eq!(buffer.capacity(), 8);
        assert_eq!(buffer.handle().size_bytes(), 8 * 20);
        assert_eq!(buffer.size_bytes(), buffer.handle().size_bytes());
    }

    #[test]
    fn growth_at_least_doubles() {
        let backend = MemoryBackend::new();
        let mut buffer = GrowableBuffer::new(&backend, "v", BufferUsage::Vertex, 4, 16).unwrap();
        buffer.ensure_capacity(&backend, 17).unwrap();
        assert_eq!(buffer.capacity(), 32);

        let mut odd = GrowableBuffer::new(&backend, "w", BufferUsage::Vertex, 4, 20).unwrap();
        odd.ensure_capacity(&backend, 21).unwrap();
        assert_eq!(odd.capacity(), 40);
    }

    #[test]
    fn growth_preserves_written_data() {
        let backend = MemoryBackend::new();
        let n = 10;
        let mut buffer = GrowableBuffer::new(&backend, "v", BufferUsage::Vertex, 4, n).unwrap();
        let data: Vec<f32> = (0..n).map(|i| i as f32 * 1.5).collect();
        buffer.write_all(&backend, floats(&data)).unwrap();

        assert!(buffer.ensure_capacity(&backend, n + 1).unwrap());
        assert_eq!(backend.live_buffers(), 1);

        let gpu = buffer.handle().contents();
        assert_eq!(read_f32(&gpu[..n * 4]), data);
        assert_eq!(buffer.mirror(), floats(&data));
    }

    #[test]
    fn out_of_range_write_is_rejected() {
        let backend = MemoryBackend::new();
        let mut buffer = GrowableBuffer::new(&backend, "v", BufferUsage::Vertex, 4, 2).unwrap();
        let err = buffer
            .write(&backend, 4, floats(&[1.0, 2.0]))
            .unwrap_err();
        assert!(matches!(err, BufferError::OutOfRange { offset: 4, len: 8, .. }));
        assert!(backend.take_writes().is_empty());
    }

    #[test]
    fn allocation_failure_is_reported() {
        let backend = MemoryBackend::with_limit(64);
        let mut buffer = GrowableBuffer::new(&backend, "v", BufferUsage::Vertex, 8, 8).unwrap();
        let err = buffer.ensure_capacity(&backend, 9).unwrap_err();
        assert!(matches!(err, BufferError::Allocation { .. }));
        // The old buffer is kept on failure.
        assert_eq!(buffer.capacity(), 8);
        assert_eq!(backend.live_buffers(), 1);
    }

    #[test]
    fn quad_indices_regenerate_on_capacity_change() {
        let backend = MemoryBackend::new();
        let mut indices = QuadIndices::new(&backend, 2).unwrap();
        assert_eq!(read_u32(indices.buffer().mirror()), quad_indices(2));

        assert!(!indices.sync(&backend, 2).unwrap());
        assert!(indices.sync(&backend, 4).unwrap());
        assert_eq!(read_u32(indices.buffer().mirror()), quad_indices(4));
    }
}
