//! Event-loop glue
//!
//! Owns the window, the GPU objects and the active scene, and turns each
//! `RedrawRequested` into one pipeline frame.

use crate::demo::Scene;
use crate::input::InputState;
use anyhow::{Context, Result};
use glam::Vec2;
use std::sync::Arc;
use std::time::{Duration, Instant};
use vortex_core::bounds::WorldBounds;
use vortex_core::config::Settings;
use vortex_core::pipeline::{FrameInput, FrameReport};
use vortex_core::time::FrameClock;
use vortex_metrics::{FrameTimer, Phase, PhaseProfiler};
use vortex_render::window::window_attributes;
use vortex_render::{GpuContext, Renderer, WgpuBackend};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

const METRICS_WINDOW: usize = 120;
const REPORT_INTERVAL: Duration = Duration::from_secs(2);

struct Gpu {
    backend: WgpuBackend,
    renderer: Renderer,
    scene: Scene<WgpuBackend>,
}

pub struct App {
    settings: Settings,
    window: Option<Arc<Window>>,
    gpu: Option<Gpu>,
    input: InputState,
    clock: FrameClock,
    world: WorldBounds,
    timer: FrameTimer,
    phases: PhaseProfiler,
    last_frame_end: Instant,
    last_report: Instant,
    last_count: usize,
    error: Option<anyhow::Error>,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        let world = world_for(&settings, settings.window.width, settings.window.height);
        Self {
            settings,
            window: None,
            gpu: None,
            input: InputState::new(),
            clock: FrameClock::new(),
            world,
            timer: FrameTimer::new(METRICS_WINDOW),
            phases: PhaseProfiler::new(METRICS_WINDOW),
            last_frame_end: Instant::now(),
            last_report: Instant::now(),
            last_count: 0,
            error: None,
        }
    }

    /// The error that stopped the event loop, if any.
    pub fn finish(self) -> Result<()> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        tracing::error!("{error:#}");
        self.error = Some(error);
        event_loop.exit();
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = Arc::new(
            event_loop
                .create_window(window_attributes(&self.settings.window))
                .context("creating window")?,
        );
        let size = window.inner_size();
        self.world = world_for(&self.settings, size.width, size.height);

        let context = pollster::block_on(GpuContext::new(Arc::clone(&window), self.settings.window.vsync))
            .context("initializing GPU")?;
        let renderer = Renderer::new(context);
        let backend = renderer.backend();
        let scene = Scene::new(&backend, &self.settings, self.world).context("building scene")?;

        tracing::info!(
            demo = scene.name(),
            width = self.world.size.x,
            height = self.world.size.y,
            "scene started"
        );
        window.set_title(&format!("{} - {}", self.settings.window.title, scene.name()));

        self.gpu = Some(Gpu {
            backend,
            renderer,
            scene,
        });
        self.window = Some(window);
        self.clock.reset();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.world = world_for(&self.settings, width, height);
        if let Some(gpu) = &mut self.gpu {
            gpu.renderer.resize(width, height);
            gpu.scene.resize(self.world);
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        if self.input.key_pressed(KeyCode::Escape) {
            event_loop.exit();
            return Ok(());
        }
        let (Some(window), Some(gpu)) = (&self.window, &mut self.gpu) else {
            return Ok(());
        };

        self.phases.record(Phase::Idle, self.last_frame_end.elapsed());
        self.timer.begin();

        let size = window.inner_size();
        let pointer = self
            .input
            .cursor()
            .map(|c| self.world.cursor_to_world(c, Vec2::new(size.width as f32, size.height as f32)));

        gpu.scene.handle_input(&self.input, pointer);
        self.input.end_frame();

        let input = FrameInput {
            dt: self.clock.tick(),
            pointer,
        };
        let report = gpu
            .scene
            .frame(&input, &gpu.backend, &mut gpu.renderer)
            .context("rendering frame")?;

        self.timer.end();
        self.record(&report);
        self.last_frame_end = Instant::now();
        Ok(())
    }

    fn record(&mut self, report: &FrameReport) {
        let t = &report.timings;
        self.phases.record(Phase::Physics, t.physics);
        self.phases.record(Phase::Encode, t.encode);
        self.phases.record(Phase::Upload, t.upload);
        self.phases.record(Phase::Render, t.render);
        tracing::trace!(
            count = report.count,
            physics_us = t.physics.as_micros() as u64,
            encode_us = t.encode.as_micros() as u64,
            upload_us = t.upload.as_micros() as u64,
            render_us = t.render.as_micros() as u64,
            uploaded_bytes = report.uploaded_bytes,
            "frame"
        );
        if report.grew {
            tracing::debug!(count = report.count, "gpu buffers grew");
        }

        if self.last_report.elapsed() >= REPORT_INTERVAL {
            let (min_ms, max_ms) = self.timer.frame_time_range_ms();
            tracing::info!(
                fps = %format!("{:.1}", self.timer.fps()),
                frame_ms = %format!("{:.2}", self.timer.frame_time_ms()),
                min_ms = %format!("{min_ms:.2}"),
                max_ms = %format!("{max_ms:.2}"),
                count = report.count,
                delta = report.count as i64 - self.last_count as i64,
                phases = %self.phases.summary(),
                "frame stats"
            );
            self.last_count = report.count;
            self.last_report = Instant::now();
        }
    }
}

fn world_for(settings: &Settings, width: u32, height: u32) -> WorldBounds {
    let aspect = width.max(1) as f32 / height.max(1) as f32;
    WorldBounds::for_aspect(settings.world.height, aspect)
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(error) = self.start(event_loop) {
                self.fail(event_loop, error);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.resize(size.width, size.height);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input.cursor_moved(position.x, position.y);
            }
            WindowEvent::CursorLeft { .. } => {
                self.input.cursor_left();
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.input.mouse_input(button, state);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.input.key_input(code, event.state, event.repeat);
                }
            }
            WindowEvent::Focused(false) => {
                self.input.release_all();
            }
            WindowEvent::RedrawRequested => {
                if let Err(error) = self.redraw(event_loop) {
                    self.fail(event_loop, error);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_width_follows_window_aspect() {
        let settings = Settings::default();
        let world = world_for(&settings, 2048, 1024);
        assert_eq!(world.size, Vec2::new(200.0, 100.0));
        // Minimized windows must not divide by zero.
        assert!(world_for(&settings, 0, 0).size.is_finite());
    }
}
