//! Simulated point entities
//!
//! An entity is a point with a velocity and a color. Graph nodes additionally
//! use the identity and pin flag; fluid particles ignore both.

use glam::{Vec2, Vec3};
use rand::Rng;
use std::fmt;

/// Stable identity of an entity.
///
/// Unlike the storage index, the id survives removals of other entities and is
/// what edges refer to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out fresh, monotonically increasing ids.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn starting_at(next: u32) -> Self {
        Self { next }
    }

    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }

    /// Make sure ids handed out later never collide with `id`.
    pub fn observe(&mut self, id: EntityId) {
        if id.0 >= self.next {
            self.next = id.0.wrapping_add(1);
        }
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub color: Vec3,
    pub pinned: bool,
}

impl Entity {
    pub fn new(id: EntityId, position: Vec2, color: Vec3) -> Self {
        Self {
            id,
            position,
            velocity: Vec2::ZERO,
            color,
            pinned: false,
        }
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    /// Freeze the entity in place; pinned entities render white.
    pub fn pin(&mut self) {
        self.pinned = true;
        self.velocity = Vec2::ZERO;
        self.color = PINNED_COLOR;
    }

    pub fn unpin(&mut self, rng: &mut impl Rng) {
        self.pinned = false;
        self.color = random_color(rng);
    }

    pub fn flip_pin(&mut self, rng: &mut impl Rng) {
        if self.pinned {
            self.unpin(rng);
        } else {
            self.pin();
        }
    }
}

pub const PINNED_COLOR: Vec3 = Vec3::ONE;

/// Muted random color, each channel in `[0.1, 0.7)`.
pub fn random_color(rng: &mut impl Rng) -> Vec3 {
    Vec3::new(
        rng.random_range(0.1..0.7),
        rng.random_range(0.1..0.7),
        rng.random_range(0.1..0.7),
    )
}

/// Color that encodes where in the world an entity started.
pub fn position_color(position: Vec2, world_size: Vec2) -> Vec3 {
    Vec3::new(position.x / world_size.x, position.y / world_size.y, 0.7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn pinning_zeroes_velocity_and_whitens() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut e = Entity::new(EntityId(1), Vec2::new(1.0, 2.0), Vec3::ZERO)
            .with_velocity(Vec2::new(3.0, 4.0));
        e.pin();
        assert!(e.pinned);
        assert_eq!(e.velocity, Vec2::ZERO);
        assert_eq!(e.color, PINNED_COLOR);

        e.flip_pin(&mut rng);
        assert!(!e.pinned);
        assert!(e.color.max_element() < 0.7);
        assert!(e.color.min_element() >= 0.1);
    }

    #[test]
    fn id_allocator_skips_observed_ids() {
        let mut ids = IdAllocator::default();
        assert_eq!(ids.next_id(), EntityId(1));
        ids.observe(EntityId(10));
        assert_eq!(ids.next_id(), EntityId(11));
        ids.observe(EntityId(3));
        assert_eq!(ids.next_id(), EntityId(12));
    }
}
