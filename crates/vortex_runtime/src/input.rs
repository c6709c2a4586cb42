//! Per-frame input state
//!
//! winit delivers input as events; the demos want to ask "was the left button
//! pressed this frame?". Edges are cleared by [`InputState::end_frame`].

use glam::Vec2;
use winit::event::{ElementState, MouseButton};
use winit::keyboard::KeyCode;

#[derive(Debug, Default)]
pub struct InputState {
    /// Cursor in physical pixels, origin top-left; `None` outside the window.
    cursor: Option<Vec2>,
    held: Vec<MouseButton>,
    pressed: Vec<MouseButton>,
    released: Vec<MouseButton>,
    keys_pressed: Vec<KeyCode>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor_moved(&mut self, x: f64, y: f64) {
        self.cursor = Some(Vec2::new(x as f32, y as f32));
    }

    pub fn cursor_left(&mut self) {
        self.cursor = None;
    }

    pub fn cursor(&self) -> Option<Vec2> {
        self.cursor
    }

    pub fn mouse_input(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.held.contains(&button) {
                    self.held.push(button);
                    self.pressed.push(button);
                }
            }
            ElementState::Released => {
                if let Some(i) = self.held.iter().position(|b| *b == button) {
                    self.held.swap_remove(i);
                    self.released.push(button);
                }
            }
        }
    }

    /// Key-down edges only; auto-repeat is ignored.
    pub fn key_input(&mut self, key: KeyCode, state: ElementState, repeat: bool) {
        if state == ElementState::Pressed && !repeat {
            self.keys_pressed.push(key);
        }
    }

    pub fn is_held(&self, button: MouseButton) -> bool {
        self.held.contains(&button)
    }

    pub fn was_pressed(&self, button: MouseButton) -> bool {
        self.pressed.contains(&button)
    }

    pub fn was_released(&self, button: MouseButton) -> bool {
        self.released.contains(&button)
    }

    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Window lost focus: buttons held at that moment will never see a release.
    pub fn release_all(&mut self) {
        self.released.append(&mut self.held);
    }

    pub fn end_frame(&mut self) {
        self.pressed.clear();
        self.released.clear();
        self.keys_pressed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_and_release_are_edges() {
        let mut input = InputState::new();
        input.mouse_input(MouseButton::Left, ElementState::Pressed);
        assert!(input.was_pressed(MouseButton::Left));
        assert!(input.is_held(MouseButton::Left));

        input.end_frame();
        assert!(!input.was_pressed(MouseButton::Left));
        assert!(input.is_held(MouseButton::Left));

        input.mouse_input(MouseButton::Left, ElementState::Released);
        assert!(input.was_released(MouseButton::Left));
        assert!(!input.is_held(MouseButton::Left));
    }

    #[test]
    fn duplicate_presses_are_ignored() {
        let mut input = InputState::new();
        input.mouse_input(MouseButton::Right, ElementState::Pressed);
        input.mouse_input(MouseButton::Right, ElementState::Pressed);
        input.mouse_input(MouseButton::Right, ElementState::Released);
        input.mouse_input(MouseButton::Right, ElementState::Released);
        assert_eq!(input.released, vec![MouseButton::Right]);
    }

    #[test]
    fn key_repeat_is_not_a_press() {
        let mut input = InputState::new();
        input.key_input(KeyCode::Space, ElementState::Pressed, true);
        assert!(!input.key_pressed(KeyCode::Space));
        input.key_input(KeyCode::Space, ElementState::Pressed, false);
        assert!(input.key_pressed(KeyCode::Space));
    }

    #[test]
    fn focus_loss_releases_held_buttons() {
        let mut input = InputState::new();
        input.mouse_input(MouseButton::Middle, ElementState::Pressed);
        input.end_frame();
        input.release_all();
        assert!(input.was_released(MouseButton::Middle));
        assert!(!input.is_held(MouseButton::Middle));
    }
}
