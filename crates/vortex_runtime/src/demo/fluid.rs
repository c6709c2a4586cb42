use crate::input::InputState;
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vortex_core::bounds::WorldBounds;
use vortex_core::config::FluidSettings;
use vortex_core::entity::random_color;
use vortex_core::gpu::GpuBackend;
use vortex_core::pipeline::Pipeline;
use vortex_core::CoreError;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

/// Entities added per frame while the left button is held.
pub const BRUSH_RATE: usize = 8;
/// Half-width of the square the brush scatters into, in world units.
pub const BRUSH_RADIUS: f32 = 1.0;

/// Vortex field demo. Space pauses the field, holding the left button paints
/// new entities under the cursor.
pub struct FluidDemo<B: GpuBackend> {
    pipeline: Pipeline<B>,
    rng: StdRng,
}

impl<B: GpuBackend> FluidDemo<B> {
    pub fn new(backend: &B, settings: &FluidSettings, world: WorldBounds) -> Result<Self, CoreError> {
        let mut rng = StdRng::seed_from_u64(settings.seed);
        let pipeline = Pipeline::new(backend, settings, world, &mut rng)?;
        Ok(Self { pipeline, rng })
    }

    pub fn pipeline(&self) -> &Pipeline<B> {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut Pipeline<B> {
        &mut self.pipeline
    }

    pub fn handle_input(&mut self, input: &InputState, pointer: Option<Vec2>) {
        if input.key_pressed(KeyCode::Space) {
            self.pipeline.flip_paused();
        }

        if let Some(pointer) = pointer.filter(|_| input.is_held(MouseButton::Left)) {
            for _ in 0..BRUSH_RATE {
                let offset = Vec2::new(
                    self.rng.random_range(-BRUSH_RADIUS..BRUSH_RADIUS),
                    self.rng.random_range(-BRUSH_RADIUS..BRUSH_RADIUS),
                );
                let color = random_color(&mut self.rng);
                self.pipeline.spawn(pointer + offset, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vortex_core::gpu::MemoryBackend;
    use vortex_core::store::EntityStore;
    use winit::event::ElementState;

    fn demo(backend: &MemoryBackend) -> FluidDemo<MemoryBackend> {
        let settings = FluidSettings {
            count: 10,
            ..FluidSettings::default()
        };
        FluidDemo::new(backend, &settings, WorldBounds::new(Vec2::new(100.0, 100.0))).unwrap()
    }

    #[test]
    fn brush_paints_while_held() {
        let backend = MemoryBackend::new();
        let mut demo = demo(&backend);
        let mut input = InputState::new();
        input.mouse_input(MouseButton::Left, ElementState::Pressed);

        demo.handle_input(&input, Some(Vec2::new(50.0, 50.0)));
        input.end_frame();
        demo.handle_input(&input, Some(Vec2::new(50.0, 50.0)));
        assert_eq!(demo.pipeline().store().len(), 10 + 2 * BRUSH_RATE);

        let last = demo.pipeline().store().entity_at(10 + 2 * BRUSH_RATE - 1).unwrap();
        assert!(last.position.distance(Vec2::new(50.0, 50.0)) <= BRUSH_RADIUS * 2f32.sqrt());

        // Outside the window nothing is painted.
        demo.handle_input(&input, None);
        assert_eq!(demo.pipeline().store().len(), 10 + 2 * BRUSH_RATE);
    }

    #[test]
    fn space_toggles_the_field() {
        let backend = MemoryBackend::new();
        let mut demo = demo(&backend);
        let mut input = InputState::new();
        input.key_input(KeyCode::Space, ElementState::Pressed, false);
        demo.handle_input(&input, None);
        assert!(demo.pipeline().is_paused());
    }
}
