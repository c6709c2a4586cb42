//! GPU-resident integration
//!
//! Positions live in two storage buffers. Each frame a compute pass reads one
//! and writes the other, and the render pass draws the freshly written one:
//!
//! ```text
//! frame n:   read [0] ──compute──> write [1] ──draw
//! frame n+1: read [1] ──compute──> write [0] ──draw
//! ```
//!
//! Records are the point layout: `x, y, r, g, b`.

use crate::encoder::{PointEncoder, VertexEncoder};
use crate::error::BufferError;
use crate::field::VortexField;
use crate::gpu::{BufferDesc, BufferUsage, GpuBackend};
use crate::layout::FLOAT_BYTES;
use crate::store::EntityStore;
use bytemuck::{Pod, Zeroable};

/// Floats per kernel record.
pub const RECORD_FLOATS: usize = 5;
pub const RECORD_BYTES: usize = RECORD_FLOATS * FLOAT_BYTES;

/// Uniform block read by the compute shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct KernelParams {
    pub attractor: [f32; 2],
    pub inv_max_extent: f32,
    pub scaler_dt: f32,
    pub min_distance_sq: f32,
    pub count: u32,
    pub _padding: [u32; 2],
}

const _: () = assert!(std::mem::size_of::<KernelParams>() == 32);
const _: () = assert!(std::mem::align_of::<KernelParams>() == 4);

impl KernelParams {
    pub fn new(field: &VortexField, dt: f32, count: usize) -> Self {
        Self {
            attractor: field.attractor.to_array(),
            inv_max_extent: field.inv_max_extent,
            scaler_dt: field.gain(dt),
            min_distance_sq: field.min_distance_sq(),
            count: count as u32,
            _padding: [0; 2],
        }
    }

    /// Workgroups needed to cover `count` records.
    pub fn workgroups(&self, workgroup_size: u32) -> u32 {
        self.count.div_ceil(workgroup_size)
    }
}

/// Which of the two buffers holds the latest positions.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PingPong {
    current: usize,
    first_frame: bool,
}

impl Default for PingPong {
    fn default() -> Self {
        Self::new()
    }
}

impl PingPong {
    pub fn new() -> Self {
        Self {
            current: 0,
            first_frame: true,
        }
    }

    /// Buffer the next dispatch reads from.
    pub fn source(&self) -> usize {
        self.current
    }

    /// Buffer the next dispatch writes to.
    pub fn target(&self) -> usize {
        1 - self.current
    }

    /// True until the first swap; the source still holds the initial upload.
    pub fn is_first_frame(&self) -> bool {
        self.first_frame
    }

    pub fn swap(&mut self) {
        self.current = 1 - self.current;
        self.first_frame = false;
    }

    /// Back to reading buffer 0, as after a fresh upload.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Both kernel buffers plus the ping-pong state.
///
/// Unlike [`GrowableBuffer`](crate::buffer::GrowableBuffer) there is no host
/// mirror: after the first dispatch the only up-to-date positions are on the
/// GPU, so growth copies them across on the device.
pub struct KernelBuffers<B: GpuBackend> {
    buffers: [B::Buffer; 2],
    ping_pong: PingPong,
    capacity: usize,
    count: usize,
    scratch: Vec<f32>,
}

impl<B: GpuBackend> KernelBuffers<B> {
    /// Allocate both buffers for the store and upload its contents.
    pub fn new(backend: &B, store: &dyn EntityStore) -> Result<Self, BufferError> {
        let capacity = store.len().max(1);
        let mut kernel = Self {
            buffers: Self::allocate(backend, capacity)?,
            ping_pong: PingPong::new(),
            capacity,
            count: 0,
            scratch: Vec::new(),
        };
        kernel.upload(backend, store);
        Ok(kernel)
    }

    fn allocate(backend: &B, capacity: usize) -> Result<[B::Buffer; 2], BufferError> {
        let size_bytes = (capacity * RECORD_BYTES) as u64;
        let a = backend.create_buffer(&BufferDesc {
            label: "kernel a",
            size_bytes,
            usage: BufferUsage::StorageVertex,
        })?;
        let b = backend.create_buffer(&BufferDesc {
            label: "kernel b",
            size_bytes,
            usage: BufferUsage::StorageVertex,
        })?;
        Ok([a, b])
    }

    /// Overwrite both buffers with the store contents and restart the ping-pong.
    fn upload(&mut self, backend: &B, store: &dyn EntityStore) {
        PointEncoder::new(false).encode(store.columns(), &mut self.scratch);
        if !self.scratch.is_empty() {
            let bytes: &[u8] = bytemuck::cast_slice(&self.scratch);
            for buffer in &self.buffers {
                backend.write_buffer(buffer, 0, bytes);
            }
        }
        self.ping_pong.reset();
        self.count = store.len();
    }

    /// Bring the GPU state in line with a store that gained entities at its end.
    ///
    /// Existing records keep their GPU-side positions; only the appended tail is
    /// uploaded. A store that shrank is re-uploaded from scratch. Returns `true`
    /// when the buffers were recreated.
    pub fn sync(&mut self, backend: &B, store: &dyn EntityStore) -> Result<bool, BufferError> {
        let len = store.len();
        if len == self.count {
            return Ok(false);
        }
        if len < self.count {
            self.upload(backend, store);
            return Ok(false);
        }

        PointEncoder::new(false).encode(store.columns(), &mut self.scratch);
        let tail: &[u8] = bytemuck::cast_slice(&self.scratch[self.count * RECORD_FLOATS..]);
        let offset = (self.count * RECORD_BYTES) as u64;

        let mut grew = false;
        if len > self.capacity {
            let capacity = len.next_power_of_two().max(self.capacity * 2);
            let buffers = Self::allocate(backend, capacity)?;
            if offset > 0 {
                backend.copy_buffer(self.latest(), &buffers[0], offset);
            }
            tracing::debug!(
                old_capacity = self.capacity,
                new_capacity = capacity,
                "reallocated kernel buffers"
            );
            // Old pair is released here.
            self.buffers = buffers;
            self.capacity = capacity;
            self.ping_pong.reset();
            grew = true;
        }
        backend.write_buffer(&self.buffers[self.ping_pong.source()], offset, tail);
        self.count = len;
        Ok(grew)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ping_pong(&self) -> PingPong {
        self.ping_pong
    }

    pub fn source(&self) -> &B::Buffer {
        &self.buffers[self.ping_pong.source()]
    }

    pub fn target(&self) -> &B::Buffer {
        &self.buffers[self.ping_pong.target()]
    }

    /// Buffer holding the most recent positions.
    pub fn latest(&self) -> &B::Buffer {
        self.source()
    }

    pub fn swap(&mut self) {
        self.ping_pong.swap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::WorldBounds;
    use crate::entity::{Entity, EntityId};
    use crate::gpu::{GpuBuffer, MemoryBackend};
    use crate::store::SoaStore;
    use glam::{Vec2, Vec3};

    #[test]
    fn params_layout() {
        let world = WorldBounds::new(Vec2::new(30.0, 40.0));
        let field = VortexField::for_world(&world, 10.0, 0.5);
        let params = KernelParams::new(&field, 0.5, 100);
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&params));
        assert_eq!(floats[0], 15.0);
        assert_eq!(floats[1], 20.0);
        assert_eq!(floats[2], 1.0 / 50.0);
        assert_eq!(floats[3], 5.0);
        assert_eq!(floats[4], 0.25);
        assert_eq!(params.count, 100);
        assert_eq!(params.workgroups(64), 2);
    }

    #[test]
    fn ping_pong_alternates() {
        let mut pp = PingPong::new();
        assert!(pp.is_first_frame());
        assert_eq!((pp.source(), pp.target()), (0, 1));
        pp.swap();
        assert!(!pp.is_first_frame());
        assert_eq!((pp.source(), pp.target()), (1, 0));
        pp.swap();
        assert_eq!((pp.source(), pp.target()), (0, 1));
        pp.reset();
        assert!(pp.is_first_frame());
    }

    fn records(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn upload_fills_both_buffers() {
        let backend = MemoryBackend::new();
        let mut store = SoaStore::new();
        store.append(Entity::new(EntityId(1), Vec2::new(1.0, 2.0), Vec3::new(0.1, 0.2, 0.3)));
        let kernel = KernelBuffers::new(&backend, &store).unwrap();
        assert_eq!(kernel.count(), 1);
        assert_eq!(kernel.source().size_bytes(), RECORD_BYTES as u64);
        assert_eq!(kernel.source().contents(), kernel.target().contents());
        assert_eq!(records(&kernel.source().contents()), vec![1.0, 2.0, 0.1, 0.2, 0.3]);
    }

    #[test]
    fn growth_keeps_gpu_positions() {
        let backend = MemoryBackend::new();
        let mut store = SoaStore::new();
        store.append(Entity::new(EntityId(1), Vec2::new(1.0, 2.0), Vec3::ONE));
        store.append(Entity::new(EntityId(2), Vec2::new(3.0, 4.0), Vec3::ONE));
        let mut kernel = KernelBuffers::new(&backend, &store).unwrap();

        // Stand-in for a dispatch: the target gets moved positions, then swap.
        let moved = [9.0f32, 9.0, 1.0, 1.0, 1.0, 8.0, 8.0, 1.0, 1.0, 1.0];
        backend.write_buffer(kernel.target(), 0, bytemuck::cast_slice(&moved));
        kernel.swap();

        store.append(Entity::new(EntityId(3), Vec2::new(5.0, 6.0), Vec3::ZERO));
        assert!(kernel.sync(&backend, &store).unwrap());
        assert_eq!(kernel.capacity(), 4);
        assert_eq!(kernel.count(), 3);
        assert!(kernel.ping_pong().is_first_frame());
        assert_eq!(backend.live_buffers(), 2);

        let latest = records(&kernel.latest().contents());
        assert_eq!(latest[..10], moved);
        assert_eq!(latest[10..15], [5.0, 6.0, 0.0, 0.0, 0.0]);

        assert!(!kernel.sync(&backend, &store).unwrap());
    }

    #[test]
    fn shrinking_reuploads_from_the_store() {
        let backend = MemoryBackend::new();
        let mut store = SoaStore::new();
        store.append(Entity::new(EntityId(1), Vec2::new(1.0, 2.0), Vec3::ONE));
        store.append(Entity::new(EntityId(2), Vec2::new(3.0, 4.0), Vec3::ZERO));
        let mut kernel = KernelBuffers::new(&backend, &store).unwrap();
        kernel.swap();

        store.remove(EntityId(1)).unwrap();
        assert!(!kernel.sync(&backend, &store).unwrap());
        assert_eq!(kernel.count(), 1);
        assert_eq!(kernel.capacity(), 2);
        assert!(kernel.ping_pong().is_first_frame());
        let expected = [3.0, 4.0, 0.0, 0.0, 0.0];
        assert_eq!(records(&kernel.source().contents())[..5], expected);
        assert_eq!(records(&kernel.target().contents())[..5], expected);
    }
}
