//! Entity storage
//!
//! Two layouts sit behind the same [`EntityStore`] trait:
//!
//! ```text
//! AosStore:  [ {id,pos,vel,color,pinned}, {id,pos,vel,color,pinned}, ... ]
//! SoaStore:  xs:  [x0, x1, x2, ...]
//!            ys:  [y0, y1, y2, ...]
//!            vxs, vys, colors, ids, pinned ...
//! ```
//!
//! The structure-of-arrays layout is what the 8-wide integrator and the planar
//! encoder want; the array-of-structs layout is simpler for the graph editor.
//!
//! Storage order carries no meaning beyond being the vertex-buffer index. Any
//! removal shifts every later entity down by one.

mod aos;
mod soa;

pub use aos::AosStore;
pub use soa::SoaStore;

use crate::bounds::{Rect, WorldBounds};
use crate::entity::{position_color, random_color, Entity, EntityId, IdAllocator};
use crate::error::CoreError;
use glam::{Vec2, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Memory layout of an entity store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreLayout {
    /// Array of structs.
    Interleaved,
    /// Structure of arrays.
    Planar,
}

/// Read-only view of entity columns.
#[derive(Debug, Copy, Clone)]
pub enum Columns<'a> {
    Interleaved(&'a [Entity]),
    Planar(Planar<'a>),
}

#[derive(Debug, Copy, Clone)]
pub struct Planar<'a> {
    pub xs: &'a [f32],
    pub ys: &'a [f32],
    pub colors: &'a [Vec3],
}

impl Columns<'_> {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Columns::Interleaved(entities) => entities.len(),
            Columns::Planar(p) => p.xs.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn position(&self, index: usize) -> Vec2 {
        match self {
            Columns::Interleaved(entities) => entities[index].position,
            Columns::Planar(p) => Vec2::new(p.xs[index], p.ys[index]),
        }
    }

    #[inline]
    pub fn color(&self, index: usize) -> Vec3 {
        match self {
            Columns::Interleaved(entities) => entities[index].color,
            Columns::Planar(p) => p.colors[index],
        }
    }
}

/// Mutable view handed to integrators.
pub enum ColumnsMut<'a> {
    Interleaved(&'a mut [Entity]),
    Planar(PlanarMut<'a>),
}

pub struct PlanarMut<'a> {
    pub xs: &'a mut [f32],
    pub ys: &'a mut [f32],
    pub vxs: &'a mut [f32],
    pub vys: &'a mut [f32],
    pub pinned: &'a [bool],
}

impl ColumnsMut<'_> {
    pub fn len(&self) -> usize {
        match self {
            ColumnsMut::Interleaved(entities) => entities.len(),
            ColumnsMut::Planar(p) => p.xs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owner of all live entities.
pub trait EntityStore {
    fn layout(&self) -> StoreLayout;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entities storable without reallocating host memory.
    fn capacity(&self) -> usize;

    fn reserve(&mut self, additional: usize);

    /// Append an entity, returning the new count.
    fn append(&mut self, entity: Entity) -> usize;

    /// Remove the entity with `id`; later entities shift down by one.
    fn remove(&mut self, id: EntityId) -> Result<Entity, CoreError>;

    fn index_of(&self, id: EntityId) -> Option<usize>;

    fn entity_at(&self, index: usize) -> Option<Entity>;

    fn get(&self, id: EntityId) -> Option<Entity> {
        self.index_of(id).and_then(|index| self.entity_at(index))
    }

    /// Overwrite the entity stored at `index` (identity included).
    fn set_at(&mut self, index: usize, entity: Entity);

    fn columns(&self) -> Columns<'_>;

    fn columns_mut(&mut self) -> ColumnsMut<'_>;

    /// Drop every entity whose position lies outside `rect`, returning their ids.
    fn retain_within(&mut self, rect: &Rect) -> Vec<EntityId>;

    fn clear(&mut self);
}

/// Build an empty store of the requested layout.
pub fn store_for(layout: StoreLayout) -> Box<dyn EntityStore> {
    match layout {
        StoreLayout::Interleaved => Box::new(AosStore::new()),
        StoreLayout::Planar => Box::new(SoaStore::new()),
    }
}

/// How freshly spawned entities get their color.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coloring {
    /// `(x / w, y / h, 0.7)` of the spawn position.
    Position,
    /// Random muted color.
    Random,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SpawnParams {
    /// Distance kept from every world edge.
    pub border: f32,
    /// Upper bound (exclusive) of each velocity component.
    pub max_speed: f32,
    pub coloring: Coloring,
}

/// Fill `store` with `count` random entities inside the world inset by
/// `params.border`.
pub fn populate(
    store: &mut dyn EntityStore,
    count: usize,
    world: &WorldBounds,
    params: &SpawnParams,
    ids: &mut IdAllocator,
    rng: &mut impl Rng,
) -> Result<(), CoreError> {
    let area = world.inset(params.border);
    if area.min.x >= area.max.x || area.min.y >= area.max.y {
        return Err(CoreError::InvalidConfig(format!(
            "border {} leaves no room in a {}x{} world",
            params.border, world.size.x, world.size.y
        )));
    }

    store.reserve(count);
    for _ in 0..count {
        let position = Vec2::new(
            rng.random_range(area.min.x..area.max.x),
            rng.random_range(area.min.y..area.max.y),
        );
        let velocity = if params.max_speed > 0.0 {
            Vec2::new(
                rng.random_range(0.0..params.max_speed),
                rng.random_range(0.0..params.max_speed),
            )
        } else {
            Vec2::ZERO
        };
        let color = match params.coloring {
            Coloring::Position => position_color(position, world.size),
            Coloring::Random => random_color(rng),
        };
        store.append(Entity::new(ids.next_id(), position, color).with_velocity(velocity));
    }
    tracing::debug!(count, len = store.len(), "populated entity store");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn both_layouts() -> Vec<Box<dyn EntityStore>> {
        vec![store_for(StoreLayout::Interleaved), store_for(StoreLayout::Planar)]
    }

    fn entity(id: u32, x: f32) -> Entity {
        Entity::new(EntityId(id), Vec2::new(x, x), Vec3::splat(0.5))
    }

    #[test]
    fn populate_honors_border() {
        let world = WorldBounds::new(Vec2::new(100.0, 50.0));
        let params = SpawnParams {
            border: 5.0,
            max_speed: 1.0,
            coloring: Coloring::Position,
        };
        for mut store in both_layouts() {
            let mut rng = StdRng::seed_from_u64(300);
            let mut ids = IdAllocator::default();
            populate(store.as_mut(), 500, &world, &params, &mut ids, &mut rng).unwrap();
            assert_eq!(store.len(), 500);
            let inner = world.inset(5.0);
            for i in 0..store.len() {
                let e = store.entity_at(i).unwrap();
                assert!(inner.contains(e.position));
                assert!(e.velocity.x >= 0.0 && e.velocity.x < 1.0);
                assert!((e.color.z - 0.7).abs() < f32::EPSILON);
            }
        }
    }

    #[test]
    fn populate_rejects_border_larger_than_world() {
        let world = WorldBounds::new(Vec2::new(10.0, 10.0));
        let params = SpawnParams {
            border: 6.0,
            max_speed: 0.0,
            coloring: Coloring::Random,
        };
        let mut store = AosStore::new();
        let mut rng = StdRng::seed_from_u64(1);
        let err = populate(
            &mut store,
            1,
            &world,
            &params,
            &mut IdAllocator::default(),
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig(_)));
    }

    #[test]
    fn append_returns_count_and_remove_shifts() {
        for mut store in both_layouts() {
            assert_eq!(store.append(entity(1, 1.0)), 1);
            assert_eq!(store.append(entity(2, 2.0)), 2);
            assert_eq!(store.append(entity(3, 3.0)), 3);

            let removed = store.remove(EntityId(2)).unwrap();
            assert_eq!(removed.position, Vec2::splat(2.0));
            assert_eq!(store.len(), 2);
            assert_eq!(store.index_of(EntityId(3)), Some(1));
            assert_eq!(store.get(EntityId(3)).unwrap().position, Vec2::splat(3.0));
        }
    }

    #[test]
    fn removing_missing_entity_is_not_found() {
        for mut store in both_layouts() {
            store.append(entity(1, 1.0));
            let err = store.remove(EntityId(42)).unwrap_err();
            assert!(matches!(err, CoreError::NotFound(EntityId(42))));
            assert_eq!(store.len(), 1);
        }
    }

    #[test]
    fn retain_within_culls_and_reports() {
        let rect = Rect::new(Vec2::ZERO, Vec2::splat(10.0));
        for mut store in both_layouts() {
            store.append(entity(1, 1.0));
            store.append(entity(2, 11.0));
            store.append(entity(3, 5.0));
            store.append(entity(4, -3.0));
            let removed = store.retain_within(&rect);
            assert_eq!(removed, vec![EntityId(2), EntityId(4)]);
            assert_eq!(store.len(), 2);
            assert_eq!(store.entity_at(1).unwrap().id, EntityId(3));
        }
    }

    #[test]
    fn columns_agree_between_layouts() {
        let mut stores = both_layouts();
        for store in stores.iter_mut() {
            for i in 0..5 {
                store.append(entity(i, i as f32));
            }
        }
        let a = stores[0].columns();
        let b = stores[1].columns();
        assert_eq!(a.len(), b.len());
        for i in 0..a.len() {
            assert_eq!(a.position(i), b.position(i));
            assert_eq!(a.color(i), b.color(i));
        }
    }
}
