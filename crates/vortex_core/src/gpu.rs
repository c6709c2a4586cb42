//! Graphics-API seam
//!
//! The pipeline only needs to create buffers and copy bytes into them. Keeping
//! that behind [`GpuBackend`] lets the frame logic run against the wgpu device
//! in `vortex_render` or against [`MemoryBackend`] in headless tests.
//!
//! Buffer handles own their GPU resource: dropping a handle releases it.

use crate::error::BufferError;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// What a buffer is bound as.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
    /// Read and written by a compute pass, then drawn as vertices.
    StorageVertex,
    Uniform,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDesc<'a> {
    pub label: &'a str,
    pub size_bytes: u64,
    pub usage: BufferUsage,
}

pub trait GpuBuffer {
    fn size_bytes(&self) -> u64;
}

pub trait GpuBackend {
    type Buffer: GpuBuffer;

    fn create_buffer(&self, desc: &BufferDesc<'_>) -> Result<Self::Buffer, BufferError>;

    /// Queue a copy of `data` into `buffer` at `offset` bytes.
    ///
    /// Callers guarantee the range lies inside the buffer.
    fn write_buffer(&self, buffer: &Self::Buffer, offset: u64, data: &[u8]);

    /// Queue a GPU-side copy of the first `size_bytes` of `src` into `dst`.
    fn copy_buffer(&self, src: &Self::Buffer, dst: &Self::Buffer, size_bytes: u64);
}

/// Host-memory backend.
///
/// Records every write so tests can check what would have reached the GPU.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    limit_bytes: Option<u64>,
    live: Rc<Cell<usize>>,
    created: Cell<usize>,
    writes: RefCell<Vec<WriteRecord>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub buffer: usize,
    pub offset: u64,
    pub len: u64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse allocations larger than `limit_bytes`.
    pub fn with_limit(limit_bytes: u64) -> Self {
        Self {
            limit_bytes: Some(limit_bytes),
            ..Self::default()
        }
    }

    /// Buffers currently alive.
    pub fn live_buffers(&self) -> usize {
        self.live.get()
    }

    pub fn created_buffers(&self) -> usize {
        self.created.get()
    }

    pub fn take_writes(&self) -> Vec<WriteRecord> {
        std::mem::take(&mut *self.writes.borrow_mut())
    }

    pub fn bytes_written(&self) -> u64 {
        self.writes.borrow().iter().map(|w| w.len).sum()
    }
}

#[derive(Debug)]
pub struct MemoryBuffer {
    id: usize,
    usage: BufferUsage,
    data: RefCell<Vec<u8>>,
    live: Rc<Cell<usize>>,
}

impl MemoryBuffer {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn contents(&self) -> Vec<u8> {
        self.data.borrow().clone()
    }
}

impl GpuBuffer for MemoryBuffer {
    fn size_bytes(&self) -> u64 {
        self.data.borrow().len() as u64
    }
}

impl Drop for MemoryBuffer {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

impl GpuBackend for MemoryBackend {
    type Buffer = MemoryBuffer;

    fn create_buffer(&self, desc: &BufferDesc<'_>) -> Result<MemoryBuffer, BufferError> {
        if let Some(limit) = self.limit_bytes {
            if desc.size_bytes > limit {
                return Err(BufferError::Allocation {
                    label: desc.label.to_string(),
                    size_bytes: desc.size_bytes,
                    reason: format!("exceeds limit of {limit} bytes"),
                });
            }
        }
        let id = self.created.get();
        self.created.set(id + 1);
        self.live.set(self.live.get() + 1);
        Ok(MemoryBuffer {
            id,
            usage: desc.usage,
            data: RefCell::new(vec![0; desc.size_bytes as usize]),
            live: Rc::clone(&self.live),
        })
    }

    fn write_buffer(&self, buffer: &MemoryBuffer, offset: u64, data: &[u8]) {
        let start = offset as usize;
        buffer.data.borrow_mut()[start..start + data.len()].copy_from_slice(data);
        self.writes.borrow_mut().push(WriteRecord {
            buffer: buffer.id,
            offset,
            len: data.len() as u64,
        });
    }

    fn copy_buffer(&self, src: &MemoryBuffer, dst: &MemoryBuffer, size_bytes: u64) {
        let len = size_bytes as usize;
        let data = src.data.borrow()[..len].to_vec();
        dst.data.borrow_mut()[..len].copy_from_slice(&data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_handles_releases_them() {
        let backend = MemoryBackend::new();
        let desc = BufferDesc {
            label: "test",
            size_bytes: 16,
            usage: BufferUsage::Vertex,
        };
        let a = backend.create_buffer(&desc).unwrap();
        let b = backend.create_buffer(&desc).unwrap();
        assert_eq!(backend.live_buffers(), 2);
        drop(a);
        assert_eq!(backend.live_buffers(), 1);
        backend.write_buffer(&b, 4, &[1, 2, 3, 4]);
        assert_eq!(b.contents()[4..8], [1, 2, 3, 4]);
        drop(b);
        assert_eq!(backend.live_buffers(), 0);
        assert_eq!(backend.created_buffers(), 2);
    }

    #[test]
    fn limit_rejects_large_allocations() {
        let backend = MemoryBackend::with_limit(64);
        let err = backend
            .create_buffer(&BufferDesc {
                label: "big",
                size_bytes: 128,
                usage: BufferUsage::Index,
            })
            .unwrap_err();
        assert!(matches!(err, BufferError::Allocation { size_bytes: 128, .. }));
        assert_eq!(backend.live_buffers(), 0);
    }
}
