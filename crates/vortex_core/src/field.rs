//! Rotational attractor field
//!
//! Entities orbit a fixed attractor clockwise. Speed falls off with the inverse
//! of the distance to the attractor and reaches zero at the world diagonal:
//!
//! ```text
//! r        = position - attractor
//! velocity = normalize(perp_cw(r)) * scaler * (1/|r| - 1/max_extent) * dt
//! ```
//!
//! `|r|` is clamped to `min_distance` so an entity sitting on the attractor
//! never produces an infinite speed.

use crate::bounds::WorldBounds;
use glam::Vec2;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VortexField {
    pub attractor: Vec2,
    /// `1 / max_extent`, where `max_extent` is the world diagonal.
    pub inv_max_extent: f32,
    pub scaler: f32,
    /// Smallest distance used when evaluating `1/|r|`.
    pub min_distance: f32,
}

impl VortexField {
    /// Field centered on the world with the diagonal as cutoff.
    pub fn for_world(world: &WorldBounds, scaler: f32, min_distance: f32) -> Self {
        Self {
            attractor: world.center(),
            inv_max_extent: 1.0 / world.diagonal(),
            scaler,
            min_distance,
        }
    }

    pub fn with_attractor(mut self, attractor: Vec2) -> Self {
        self.attractor = attractor;
        self
    }

    /// `scaler * dt`, folded once per step.
    #[inline]
    pub fn gain(&self, dt: f32) -> f32 {
        self.scaler * dt
    }

    #[inline]
    pub fn min_distance_sq(&self) -> f32 {
        self.min_distance * self.min_distance
    }

    /// Displacement of an entity at `position` over `dt`.
    #[inline]
    pub fn velocity_at(&self, position: Vec2, dt: f32) -> Vec2 {
        let r = position - self.attractor;
        let len_sq = r.length_squared().max(self.min_distance_sq());
        let inv_len = 1.0 / len_sq.sqrt();
        // normalize(perp) * (inv_len - inv_max) == perp * inv_len * (inv_len - inv_max)
        let mul = inv_len * (inv_len - self.inv_max_extent) * self.gain(dt);
        perp_cw(r) * mul
    }
}

/// Clockwise perpendicular: `(x, y) -> (y, -x)`.
#[inline]
pub fn perp_cw(v: Vec2) -> Vec2 {
    Vec2::new(v.y, -v.x)
}
