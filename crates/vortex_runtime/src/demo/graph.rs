use crate::input::InputState;
use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use vortex_core::bounds::WorldBounds;
use vortex_core::config::GraphSettings;
use vortex_core::gpu::GpuBackend;
use vortex_core::graph::Graph;
use vortex_core::pipeline::GraphPipeline;
use vortex_core::store::EntityStore;
use vortex_core::CoreError;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

/// Node editor.
///
/// | gesture                            | effect                          |
/// |------------------------------------|---------------------------------|
/// | left click on empty space          | spawn an unpinned node          |
/// | left drag from node to node        | connect them                    |
/// | right click on a node              | destroy it and its edges        |
/// | right drag from node to node       | delete the edge between them    |
/// | middle click on a node             | pin / unpin                     |
/// | space                              | physics on / off (starts off)   |
pub struct GraphDemo<B: GpuBackend> {
    pipeline: GraphPipeline<B>,
    rng: StdRng,
    /// Where a left drag started on a node.
    link_from: Option<Vec2>,
    /// Where a right drag started.
    erase_from: Option<Vec2>,
}

impl<B: GpuBackend> GraphDemo<B> {
    pub fn new(backend: &B, settings: &GraphSettings, world: WorldBounds) -> Result<Self, CoreError> {
        let graph = Graph::sample(settings.pick_threshold);
        let pipeline = GraphPipeline::new(backend, graph, settings, world)?;
        tracing::info!(
            nodes = pipeline.graph().nodes().len(),
            edges = pipeline.graph().edges().len(),
            "graph editor ready; space toggles physics"
        );
        Ok(Self {
            pipeline,
            rng: StdRng::seed_from_u64(settings.seed),
            link_from: None,
            erase_from: None,
        })
    }

    pub fn pipeline(&self) -> &GraphPipeline<B> {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut GraphPipeline<B> {
        &mut self.pipeline
    }

    pub fn handle_input(&mut self, input: &InputState, pointer: Option<Vec2>) {
        if input.key_pressed(KeyCode::Space) {
            self.pipeline.flip_paused();
        }

        let Some(at) = pointer else {
            // Releasing outside the window cancels any drag.
            if input.was_released(MouseButton::Left) {
                self.link_from = None;
            }
            if input.was_released(MouseButton::Right) {
                self.erase_from = None;
            }
            return;
        };
        let graph = self.pipeline.graph_mut();

        if input.was_pressed(MouseButton::Left) {
            if graph.closest_to(at).is_some() {
                self.link_from = Some(at);
            } else {
                graph.spawn_node(at, &mut self.rng);
            }
        }
        if input.was_released(MouseButton::Left) {
            if let Some(from) = self.link_from.take() {
                match graph.connect_at(from, at) {
                    Ok(Some(edge)) => tracing::debug!(a = %edge.a, b = %edge.b, "connected"),
                    Ok(None) => {}
                    Err(error) => tracing::debug!(%error, "connection refused"),
                }
            }
        }

        if input.was_pressed(MouseButton::Right) {
            self.erase_from = Some(at);
        }
        if input.was_released(MouseButton::Right) {
            if let Some(from) = self.erase_from.take() {
                graph.erase_between(from, at);
            }
        }

        if input.was_pressed(MouseButton::Middle) {
            graph.flip_pin_at(at, &mut self.rng);
        }
    }
}
