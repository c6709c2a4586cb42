//! World rectangle helpers

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in world units.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }
}

/// The simulated world: `[0, w] × [0, h]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WorldBounds {
    pub size: Vec2,
}

impl WorldBounds {
    pub fn new(size: Vec2) -> Self {
        Self { size }
    }

    /// World whose height is fixed and whose width follows the window aspect.
    pub fn for_aspect(height: f32, aspect_w_h: f32) -> Self {
        Self::new(Vec2::new(height * aspect_w_h, height))
    }

    pub fn center(&self) -> Vec2 {
        self.size * 0.5
    }

    pub fn diagonal(&self) -> f32 {
        self.size.length()
    }

    pub fn rect(&self) -> Rect {
        Rect::new(Vec2::ZERO, self.size)
    }

    /// World rectangle shrunk by `border` on every side.
    pub fn inset(&self, border: f32) -> Rect {
        Rect::new(Vec2::splat(border), self.size - Vec2::splat(border))
    }

    /// Entities outside `[-w, 2w] × [-h, 2h]` are culled.
    pub fn cull_rect(&self) -> Rect {
        Rect::new(-self.size, self.size * 2.0)
    }

    /// Map a cursor position in physical pixels (origin top-left) to world units
    /// (origin bottom-left).
    pub fn cursor_to_world(&self, cursor: Vec2, window: Vec2) -> Vec2 {
        Vec2::new(
            cursor.x / window.x * self.size.x,
            self.size.y - cursor.y / window.y * self.size.y,
        )
    }
}
