//! The two demo scenes and the input gestures that drive them.

pub mod fluid;
pub mod graph;

pub use fluid::FluidDemo;
pub use graph::GraphDemo;

use crate::input::InputState;
use glam::Vec2;
use vortex_core::bounds::WorldBounds;
use vortex_core::config::{Demo, Settings};
use vortex_core::gpu::GpuBackend;
use vortex_core::pipeline::{FrameInput, FrameRenderer, FrameReport};
use vortex_core::CoreError;

pub enum Scene<B: GpuBackend> {
    Fluid(FluidDemo<B>),
    Graph(GraphDemo<B>),
}

impl<B: GpuBackend> Scene<B> {
    pub fn new(backend: &B, settings: &Settings, world: WorldBounds) -> Result<Self, CoreError> {
        Ok(match settings.demo {
            Demo::Fluid => Scene::Fluid(FluidDemo::new(backend, &settings.fluid, world)?),
            Demo::Graph => Scene::Graph(GraphDemo::new(backend, &settings.graph, world)?),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scene::Fluid(_) => "fluid",
            Scene::Graph(_) => "graph",
        }
    }

    /// Apply this frame's gestures. `pointer` is the cursor in world units.
    pub fn handle_input(&mut self, input: &InputState, pointer: Option<Vec2>) {
        match self {
            Scene::Fluid(demo) => demo.handle_input(input, pointer),
            Scene::Graph(demo) => demo.handle_input(input, pointer),
        }
    }

    pub fn frame<R: FrameRenderer<B>>(
        &mut self,
        input: &FrameInput,
        backend: &B,
        renderer: &mut R,
    ) -> Result<FrameReport, R::Error> {
        match self {
            Scene::Fluid(demo) => demo.pipeline_mut().frame(input, backend, renderer),
            Scene::Graph(demo) => demo.pipeline_mut().frame(input, backend, renderer),
        }
    }

    pub fn resize(&mut self, world: WorldBounds) {
        match self {
            Scene::Fluid(demo) => demo.pipeline_mut().resize(world),
            Scene::Graph(demo) => demo.pipeline_mut().resize(world),
        }
    }
}
