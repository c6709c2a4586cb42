//! Window management
//!
//! Cross-platform window creation via winit

use vortex_core::config::WindowSettings;
use winit::dpi::LogicalSize;
use winit::window::{Window, WindowAttributes};

/// Create window attributes from settings.
///
/// In winit 0.30+ the window itself must be created inside
/// `ApplicationHandler::resumed`.
pub fn window_attributes(settings: &WindowSettings) -> WindowAttributes {
    Window::default_attributes()
        .with_title(settings.title.clone())
        .with_inner_size(LogicalSize::new(settings.width, settings.height))
}
