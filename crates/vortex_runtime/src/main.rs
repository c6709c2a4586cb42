//! Vortex Runtime
//!
//! Boots the demo named in the settings:
//!
//! ```text
//! vortex [settings.json]
//! VORTEX_SETTINGS=settings.json vortex
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

mod app;
mod demo;
mod input;

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vortex_core::config::{Settings, SETTINGS_ENV};
use winit::event_loop::{ControlFlow, EventLoop};

fn settings_path() -> Option<PathBuf> {
    std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os(SETTINGS_ENV))
        .map(PathBuf::from)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Vortex v{}", vortex_core::VERSION);

    let settings = Settings::load_or_default(settings_path().as_deref()).context("loading settings")?;
    tracing::info!(
        demo = ?settings.demo,
        count = settings.fluid.count,
        integrator = ?settings.fluid.integrator,
        encoder = ?settings.fluid.encoder,
        "settings loaded"
    );

    let event_loop = EventLoop::new().context("creating event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = app::App::new(settings);
    event_loop.run_app(&mut app).context("running event loop")?;
    app.finish()
}
