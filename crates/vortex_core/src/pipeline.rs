//! Per-frame driver
//!
//! One frame of a scene runs these phases in order:
//!
//! ```text
//! integrate ─> cull ─> ensure capacity ─> encode ─> upload ─> draw
//! ```
//!
//! [`Pipeline`] drives the fluid scene, where integrator and encoder are
//! strategies picked from [`FluidSettings`]. [`GraphPipeline`] drives the node
//! editor, which draws edges and nodes as two layers. Both hand a [`Frame`] to
//! a [`FrameRenderer`] and never touch the graphics API themselves.

use crate::bounds::WorldBounds;
use crate::buffer::{GrowableBuffer, QuadIndices};
use crate::config::{AttractorMode, FluidSettings, GraphSettings};
use crate::encoder::{encoder_for, DepthBias, LineEncoder, QuadEncoder, VertexEncoder};
use crate::entity::{Entity, EntityId, IdAllocator};
use crate::error::CoreError;
use crate::field::VortexField;
use crate::gpu::{BufferUsage, GpuBackend};
use crate::graph::{Graph, GraphPhysics};
use crate::integrator::{integrator_for, Integrator, StepContext};
use crate::kernel::{KernelBuffers, KernelParams};
use crate::layout::{DrawCall, Topology, VertexLayout, FLOAT_BYTES, INDEX_BYTES};
use crate::store::{populate, store_for, EntityStore};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};
use rand::Rng;
use std::time::{Duration, Instant};

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FrameInput {
    /// Seconds since the previous frame.
    pub dt: f32,
    /// Pointer position in world units, when inside the window.
    pub pointer: Option<Vec2>,
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct PhaseTimings {
    pub physics: Duration,
    pub encode: Duration,
    pub upload: Duration,
    pub render: Duration,
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Live entities after the frame.
    pub count: usize,
    /// A GPU buffer was reallocated this frame.
    pub grew: bool,
    pub uploaded_bytes: u64,
    pub culled: usize,
    pub timings: PhaseTimings,
}

/// Uniform block shared by every draw.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    /// Half the world-space size of an expanded point.
    pub half_size: f32,
    pub _padding: [f32; 3],
}

const _: () = assert!(std::mem::size_of::<FrameUniforms>() == 80);

impl FrameUniforms {
    /// Orthographic projection of `[0, w] × [0, h]` with depth range `[-1, 1]`.
    pub fn new(world: &WorldBounds, node_size: f32) -> Self {
        let proj = Mat4::orthographic_rh(0.0, world.size.x, 0.0, world.size.y, -1.0, 1.0);
        Self {
            view_proj: proj.to_cols_array_2d(),
            half_size: 0.5 * node_size,
            _padding: [0.0; 3],
        }
    }
}

/// Compute work to run before drawing.
pub struct KernelDispatch<'a, B: GpuBackend> {
    pub params: KernelParams,
    pub source: &'a B::Buffer,
    pub target: &'a B::Buffer,
}

pub struct DrawItem<'a, B: GpuBackend> {
    pub label: &'static str,
    pub topology: Topology,
    pub layout: &'a VertexLayout,
    pub vertices: &'a B::Buffer,
    pub indices: Option<&'a B::Buffer>,
    /// Vertices per attribute plane; planar layouts slice their streams by it.
    pub vertex_count: usize,
    pub call: DrawCall,
}

pub struct Frame<'a, B: GpuBackend> {
    pub uniforms: FrameUniforms,
    pub dispatch: Option<KernelDispatch<'a, B>>,
    /// Drawn in order.
    pub items: Vec<DrawItem<'a, B>>,
}

pub trait FrameRenderer<B: GpuBackend> {
    type Error: From<CoreError>;

    fn render(&mut self, frame: &Frame<'_, B>) -> Result<(), Self::Error>;
}

enum Stage<B: GpuBackend> {
    Cpu {
        integrator: Box<dyn Integrator>,
        vertices: GrowableBuffer<B>,
        quad_indices: Option<QuadIndices<B>>,
    },
    Gpu {
        kernel: KernelBuffers<B>,
    },
}

pub struct Pipeline<B: GpuBackend> {
    store: Box<dyn EntityStore>,
    encoder: Box<dyn VertexEncoder>,
    stage: Stage<B>,
    ids: IdAllocator,
    scratch: Vec<f32>,
    world: WorldBounds,
    field: VortexField,
    attractor: AttractorMode,
    node_size: f32,
    cull: bool,
    paused: bool,
    /// Entities were added or removed since the last full upload, so
    /// indices may have shifted under the static attribute planes.
    reshaped: bool,
    pending_dispatch: Option<KernelParams>,
}

impl<B: GpuBackend> Pipeline<B> {
    /// Populate a fresh store per `settings` and set up its GPU buffers.
    pub fn new(
        backend: &B,
        settings: &FluidSettings,
        world: WorldBounds,
        rng: &mut impl Rng,
    ) -> Result<Self, CoreError> {
        let mut store = store_for(settings.store);
        let mut ids = IdAllocator::default();
        populate(
            store.as_mut(),
            settings.count,
            &world,
            &settings.spawn_params(),
            &mut ids,
            rng,
        )?;
        let mut pipeline = Self::with_store(backend, store, settings, world)?;
        pipeline.ids = ids;
        Ok(pipeline)
    }

    /// Wrap an already populated store.
    pub fn with_store(
        backend: &B,
        store: Box<dyn EntityStore>,
        settings: &FluidSettings,
        world: WorldBounds,
    ) -> Result<Self, CoreError> {
        let encoder = encoder_for(
            settings.encoder,
            settings.node_size,
            DepthBias::NODES,
            settings.expanded,
        );

        let stage = match integrator_for(settings.integrator, settings.ballistic_params()) {
            Some(integrator) => {
                let stride = encoder.floats_per_entity() * FLOAT_BYTES;
                let vertices = GrowableBuffer::new(
                    backend,
                    encoder.name(),
                    BufferUsage::Vertex,
                    stride,
                    store.len(),
                )?;
                let quad_indices = match encoder.topology() {
                    Topology::IndexedQuads => Some(QuadIndices::new(backend, vertices.capacity())?),
                    _ => None,
                };
                Stage::Cpu {
                    integrator,
                    vertices,
                    quad_indices,
                }
            }
            None => Stage::Gpu {
                kernel: KernelBuffers::new(backend, store.as_ref())?,
            },
        };

        // The kernel owns the live positions; the store keeps spawn-time ones.
        let cull = settings.cull && matches!(stage, Stage::Cpu { .. });
        if settings.cull && !cull {
            tracing::warn!("culling is not supported with the gpu integrator, disabled");
        }

        let mut ids = IdAllocator::default();
        for i in 0..store.len() {
            if let Some(e) = store.entity_at(i) {
                ids.observe(e.id);
            }
        }

        tracing::info!(
            count = store.len(),
            layout = ?store.layout(),
            integrator = ?settings.integrator,
            encoder = encoder.name(),
            "fluid pipeline ready"
        );

        Ok(Self {
            store,
            encoder,
            stage,
            ids,
            scratch: Vec::new(),
            world,
            field: VortexField::for_world(&world, settings.scaler, settings.min_distance),
            attractor: settings.attractor,
            node_size: settings.node_size,
            cull,
            paused: false,
            reshaped: true,
            pending_dispatch: None,
        })
    }

    pub fn store(&self) -> &dyn EntityStore {
        self.store.as_ref()
    }

    pub fn world(&self) -> &WorldBounds {
        &self.world
    }

    pub fn field(&self) -> &VortexField {
        &self.field
    }

    pub fn encoder(&self) -> &dyn VertexEncoder {
        self.encoder.as_ref()
    }

    /// Name of the integration strategy in use.
    pub fn integrator_name(&self) -> &'static str {
        match &self.stage {
            Stage::Cpu { integrator, .. } => integrator.name(),
            Stage::Gpu { .. } => "gpu",
        }
    }

    /// Entities the vertex (or kernel) buffers can hold without reallocating.
    pub fn gpu_capacity(&self) -> usize {
        match &self.stage {
            Stage::Cpu { vertices, .. } => vertices.capacity(),
            Stage::Gpu { kernel } => kernel.capacity(),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn flip_paused(&mut self) -> bool {
        self.paused = !self.paused;
        tracing::info!(paused = self.paused, "physics toggled");
        self.paused
    }

    /// Add one entity; GPU buffers follow on the next frame.
    pub fn append(&mut self, entity: Entity) -> usize {
        self.ids.observe(entity.id);
        self.reshaped = true;
        self.store.append(entity)
    }

    pub fn spawn(&mut self, position: Vec2, color: Vec3) -> EntityId {
        let id = self.ids.next_id();
        self.store.append(Entity::new(id, position, color));
        self.reshaped = true;
        id
    }

    /// Adopt a new world size. The attractor re-centers and the field cutoff
    /// follows the new diagonal.
    pub fn resize(&mut self, world: WorldBounds) {
        let attractor = match self.attractor {
            AttractorMode::Center => world.center(),
            AttractorMode::Pointer => self.field.attractor,
        };
        self.world = world;
        self.field = VortexField::for_world(&world, self.field.scaler, self.field.min_distance)
            .with_attractor(attractor);
        tracing::debug!(width = world.size.x, height = world.size.y, "world resized");
    }

    pub fn uniforms(&self) -> FrameUniforms {
        FrameUniforms::new(&self.world, self.node_size)
    }

    /// Run every phase up to, but not including, the draw.
    pub fn prepare(&mut self, input: &FrameInput, backend: &B) -> Result<FrameReport, CoreError> {
        let mut report = FrameReport::default();

        if self.attractor == AttractorMode::Pointer {
            if let Some(pointer) = input.pointer {
                self.field.attractor = pointer;
            }
        }

        let started = Instant::now();
        if let Stage::Cpu { integrator, .. } = &self.stage {
            if !self.paused {
                let ctx = StepContext {
                    dt: input.dt,
                    field: self.field,
                    world: self.world,
                };
                integrator.step(self.store.columns_mut(), &ctx);
            }
        }
        if self.cull {
            let removed = self.store.retain_within(&self.world.cull_rect());
            if !removed.is_empty() {
                tracing::warn!(count = removed.len(), "culled entities outside the world");
                self.reshaped = true;
            }
            report.culled = removed.len();
        }
        report.timings.physics = started.elapsed();

        let count = self.store.len();
        report.count = count;
        self.pending_dispatch = None;

        match &mut self.stage {
            Stage::Cpu {
                vertices,
                quad_indices,
                ..
            } => {
                report.grew = vertices.ensure_capacity(backend, count)?;
                if let Some(indices) = quad_indices {
                    indices.sync(backend, vertices.capacity())?;
                }

                let started = Instant::now();
                let partial = !report.grew && !self.reshaped;
                if partial {
                    self.encoder.encode_dynamic(self.store.columns(), &mut self.scratch);
                } else {
                    self.encoder.encode(self.store.columns(), &mut self.scratch);
                }
                report.timings.encode = started.elapsed();

                let started = Instant::now();
                let bytes: &[u8] = bytemuck::cast_slice(&self.scratch);
                if partial {
                    vertices.write(backend, 0, bytes)?;
                } else {
                    vertices.write_all(backend, bytes)?;
                    self.reshaped = false;
                }
                report.uploaded_bytes = bytes.len() as u64;
                report.timings.upload = started.elapsed();
            }
            Stage::Gpu { kernel } => {
                let started = Instant::now();
                let before = kernel.count();
                report.grew = kernel.sync(backend, self.store.as_ref())?;
                report.uploaded_bytes = (count.saturating_sub(before) * crate::kernel::RECORD_BYTES) as u64;
                report.timings.upload = started.elapsed();
                if !self.paused && count > 0 {
                    self.pending_dispatch = Some(KernelParams::new(&self.field, input.dt, count));
                }
            }
        }
        Ok(report)
    }

    /// The draw list for the state left by [`prepare`](Self::prepare).
    pub fn frame_view(&self) -> Frame<'_, B> {
        let count = self.store.len();
        let topology = self.encoder.topology();
        let mut dispatch = None;
        let (vertices, indices) = match &self.stage {
            Stage::Cpu {
                vertices,
                quad_indices,
                ..
            } => (vertices.handle(), quad_indices.as_ref().map(|q| q.handle())),
            Stage::Gpu { kernel } => match self.pending_dispatch {
                Some(params) => {
                    dispatch = Some(KernelDispatch {
                        params,
                        source: kernel.source(),
                        target: kernel.target(),
                    });
                    (kernel.target(), None)
                }
                None => (kernel.latest(), None),
            },
        };

        Frame {
            uniforms: self.uniforms(),
            dispatch,
            items: vec![DrawItem {
                label: self.encoder.name(),
                topology,
                layout: self.encoder.layout(),
                vertices,
                indices,
                vertex_count: count,
                call: DrawCall::for_topology(topology, count),
            }],
        }
    }

    pub fn frame<R: FrameRenderer<B>>(
        &mut self,
        input: &FrameInput,
        backend: &B,
        renderer: &mut R,
    ) -> Result<FrameReport, R::Error> {
        let mut report = self.prepare(input, backend)?;

        let started = Instant::now();
        renderer.render(&self.frame_view())?;
        report.timings.render = started.elapsed();

        if let (Stage::Gpu { kernel }, Some(_)) = (&mut self.stage, self.pending_dispatch.take()) {
            kernel.swap();
        }
        Ok(report)
    }
}

/// The node editor scene: edges underneath, nodes on top.
pub struct GraphPipeline<B: GpuBackend> {
    graph: Graph,
    physics: GraphPhysics,
    world: WorldBounds,
    node_size: f32,
    paused: bool,
    node_encoder: QuadEncoder,
    dot_encoder: LineEncoder,
    node_vertices: GrowableBuffer<B>,
    node_indices: QuadIndices<B>,
    dot_vertices: GrowableBuffer<B>,
    line_indices: GrowableBuffer<B>,
    line_revision: Option<u64>,
    scratch: Vec<f32>,
}

impl<B: GpuBackend> GraphPipeline<B> {
    const STARTING_CAPACITY: usize = 8;

    /// Physics starts switched off, as the editor expects.
    pub fn new(backend: &B, graph: Graph, settings: &GraphSettings, world: WorldBounds) -> Result<Self, CoreError> {
        let node_encoder = QuadEncoder::new(settings.node_size, DepthBias::NODES);
        let dot_encoder = LineEncoder::new(DepthBias::LINES);
        let capacity = graph.nodes().len().max(Self::STARTING_CAPACITY);

        let node_vertices = GrowableBuffer::new(
            backend,
            "nodes",
            BufferUsage::Vertex,
            node_encoder.floats_per_entity() * FLOAT_BYTES,
            capacity,
        )?;
        let node_indices = QuadIndices::new(backend, node_vertices.capacity())?;
        let dot_vertices = GrowableBuffer::new(
            backend,
            "dots",
            BufferUsage::Vertex,
            dot_encoder.floats_per_entity() * FLOAT_BYTES,
            capacity,
        )?;
        let line_indices = GrowableBuffer::new(
            backend,
            "line indices",
            BufferUsage::Index,
            2 * INDEX_BYTES,
            graph.edges().len().max(Self::STARTING_CAPACITY),
        )?;

        Ok(Self {
            graph,
            physics: settings.physics,
            world,
            node_size: settings.node_size,
            paused: true,
            node_encoder,
            dot_encoder,
            node_vertices,
            node_indices,
            dot_vertices,
            line_indices,
            line_revision: None,
            scratch: Vec::new(),
        })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn world(&self) -> &WorldBounds {
        &self.world
    }

    pub fn resize(&mut self, world: WorldBounds) {
        self.world = world;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn flip_paused(&mut self) -> bool {
        self.paused = !self.paused;
        tracing::info!(physics = !self.paused, "graph physics toggled");
        self.paused
    }

    pub fn prepare(&mut self, input: &FrameInput, backend: &B) -> Result<FrameReport, CoreError> {
        let mut report = FrameReport::default();

        let started = Instant::now();
        if !self.paused {
            self.graph.step(input.dt, &self.physics);
            report.culled = self.graph.remove_distant(&self.world).len();
        }
        report.timings.physics = started.elapsed();

        let count = self.graph.nodes().len();
        report.count = count;
        report.grew = self.node_vertices.ensure_capacity(backend, count)?;
        report.grew |= self.dot_vertices.ensure_capacity(backend, count)?;
        self.node_indices.sync(backend, self.node_vertices.capacity())?;

        let mut encode = Duration::ZERO;
        let mut upload = Duration::ZERO;

        let started = Instant::now();
        self.node_encoder.encode(self.graph.nodes().columns(), &mut self.scratch);
        encode += started.elapsed();
        let started = Instant::now();
        self.node_vertices.write_all(backend, bytemuck::cast_slice(&self.scratch))?;
        report.uploaded_bytes += (self.scratch.len() * FLOAT_BYTES) as u64;
        upload += started.elapsed();

        let started = Instant::now();
        self.dot_encoder.encode(self.graph.nodes().columns(), &mut self.scratch);
        encode += started.elapsed();
        let started = Instant::now();
        self.dot_vertices.write_all(backend, bytemuck::cast_slice(&self.scratch))?;
        report.uploaded_bytes += (self.scratch.len() * FLOAT_BYTES) as u64;

        // Store indices shift on any structural change, so rebuild rather than patch.
        if self.line_revision != Some(self.graph.revision()) {
            let indices = self.graph.line_indices()?;
            report.grew |= self.line_indices.ensure_capacity(backend, self.graph.edges().len())?;
            self.line_indices.write_all(backend, bytemuck::cast_slice(&indices))?;
            report.uploaded_bytes += (indices.len() * INDEX_BYTES) as u64;
            self.line_revision = Some(self.graph.revision());
        }
        upload += started.elapsed();

        report.timings.encode = encode;
        report.timings.upload = upload;
        Ok(report)
    }

    pub fn frame_view(&self) -> Frame<'_, B> {
        let nodes = self.graph.nodes().len();
        let edges = self.graph.edges().len();
        Frame {
            uniforms: FrameUniforms::new(&self.world, self.node_size),
            dispatch: None,
            items: vec![
                DrawItem {
                    label: "lines",
                    topology: Topology::Lines,
                    layout: self.dot_encoder.layout(),
                    vertices: self.dot_vertices.handle(),
                    indices: Some(self.line_indices.handle()),
                    vertex_count: nodes,
                    call: DrawCall::for_topology(Topology::Lines, edges),
                },
                DrawItem {
                    label: "nodes",
                    topology: Topology::IndexedQuads,
                    layout: self.node_encoder.layout(),
                    vertices: self.node_vertices.handle(),
                    indices: Some(self.node_indices.handle()),
                    vertex_count: nodes * self.node_encoder.vertices_per_entity(),
                    call: DrawCall::for_topology(Topology::IndexedQuads, nodes),
                },
            ],
        }
    }

    pub fn frame<R: FrameRenderer<B>>(
        &mut self,
        input: &FrameInput,
        backend: &B,
        renderer: &mut R,
    ) -> Result<FrameReport, R::Error> {
        let mut report = self.prepare(input, backend)?;
        let started = Instant::now();
        renderer.render(&self.frame_view())?;
        report.timings.render = started.elapsed();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn projection_maps_world_corners_to_clip_space() {
        let world = WorldBounds::new(Vec2::new(200.0, 100.0));
        let uniforms = FrameUniforms::new(&world, 1.0);
        let proj = Mat4::from_cols_array_2d(&uniforms.view_proj);
        let low = proj * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let high = proj * Vec4::new(200.0, 100.0, 0.0, 1.0);
        assert!((low.x + 1.0).abs() < 1e-6 && (low.y + 1.0).abs() < 1e-6);
        assert!((high.x - 1.0).abs() < 1e-6 && (high.y - 1.0).abs() < 1e-6);
        assert_eq!(uniforms.half_size, 0.5);
    }

    #[test]
    fn larger_depth_bias_is_closer() {
        let world = WorldBounds::new(Vec2::new(100.0, 100.0));
        let proj = Mat4::from_cols_array_2d(&FrameUniforms::new(&world, 1.0).view_proj);
        let lines = proj * Vec4::new(0.0, 0.0, DepthBias::LINES.base, 1.0);
        let nodes = proj * Vec4::new(0.0, 0.0, DepthBias::NODES.base, 1.0);
        // Depth test is "less": nodes must land nearer than the lines below them.
        assert!(nodes.z < lines.z);
        assert!((0.0..=1.0).contains(&nodes.z) && (0.0..=1.0).contains(&lines.z));
    }
}
