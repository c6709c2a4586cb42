use super::{Columns, ColumnsMut, EntityStore, Planar, PlanarMut, StoreLayout};
use crate::bounds::Rect;
use crate::entity::{Entity, EntityId};
use crate::error::CoreError;
use glam::{Vec2, Vec3};

/// Structure-of-arrays entity storage.
///
/// Every column has the same length; index `i` of each column describes the
/// same entity.
#[derive(Debug, Default, Clone)]
pub struct SoaStore {
    ids: Vec<EntityId>,
    xs: Vec<f32>,
    ys: Vec<f32>,
    vxs: Vec<f32>,
    vys: Vec<f32>,
    colors: Vec<Vec3>,
    pinned: Vec<bool>,
}

impl SoaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut store = Self::default();
        store.reserve(capacity);
        store
    }

    pub fn xs(&self) -> &[f32] {
        &self.xs
    }

    pub fn ys(&self) -> &[f32] {
        &self.ys
    }

    pub fn colors(&self) -> &[Vec3] {
        &self.colors
    }

    fn remove_index(&mut self, index: usize) -> Entity {
        Entity {
            id: self.ids.remove(index),
            position: Vec2::new(self.xs.remove(index), self.ys.remove(index)),
            velocity: Vec2::new(self.vxs.remove(index), self.vys.remove(index)),
            color: self.colors.remove(index),
            pinned: self.pinned.remove(index),
        }
    }

    #[inline]
    fn debug_check_columns(&self) {
        debug_assert!(
            [
                self.xs.len(),
                self.ys.len(),
                self.vxs.len(),
                self.vys.len(),
                self.colors.len(),
                self.pinned.len()
            ]
            .iter()
            .all(|&len| len == self.ids.len()),
            "soa columns diverged"
        );
    }
}

impl EntityStore for SoaStore {
    fn layout(&self) -> StoreLayout {
        StoreLayout::Planar
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn capacity(&self) -> usize {
        self.xs.capacity()
    }

    fn reserve(&mut self, additional: usize) {
        self.ids.reserve(additional);
        self.xs.reserve(additional);
        self.ys.reserve(additional);
        self.vxs.reserve(additional);
        self.vys.reserve(additional);
        self.colors.reserve(additional);
        self.pinned.reserve(additional);
    }

    fn append(&mut self, entity: Entity) -> usize {
        self.ids.push(entity.id);
        self.xs.push(entity.position.x);
        self.ys.push(entity.position.y);
        self.vxs.push(entity.velocity.x);
        self.vys.push(entity.velocity.y);
        self.colors.push(entity.color);
        self.pinned.push(entity.pinned);
        self.debug_check_columns();
        self.ids.len()
    }

    fn remove(&mut self, id: EntityId) -> Result<Entity, CoreError> {
        let index = self.index_of(id).ok_or(CoreError::NotFound(id))?;
        Ok(self.remove_index(index))
    }

    fn index_of(&self, id: EntityId) -> Option<usize> {
        self.ids.iter().position(|&other| other == id)
    }

    fn entity_at(&self, index: usize) -> Option<Entity> {
        if index >= self.ids.len() {
            return None;
        }
        Some(Entity {
            id: self.ids[index],
            position: Vec2::new(self.xs[index], self.ys[index]),
            velocity: Vec2::new(self.vxs[index], self.vys[index]),
            color: self.colors[index],
            pinned: self.pinned[index],
        })
    }

    fn set_at(&mut self, index: usize, entity: Entity) {
        self.ids[index] = entity.id;
        self.xs[index] = entity.position.x;
        self.ys[index] = entity.position.y;
        self.vxs[index] = entity.velocity.x;
        self.vys[index] = entity.velocity.y;
        self.colors[index] = entity.color;
        self.pinned[index] = entity.pinned;
    }

    fn columns(&self) -> Columns<'_> {
        Columns::Planar(Planar {
            xs: &self.xs,
            ys: &self.ys,
            colors: &self.colors,
        })
    }

    fn columns_mut(&mut self) -> ColumnsMut<'_> {
        ColumnsMut::Planar(PlanarMut {
            xs: &mut self.xs,
            ys: &mut self.ys,
            vxs: &mut self.vxs,
            vys: &mut self.vys,
            pinned: &self.pinned,
        })
    }

    fn retain_within(&mut self, rect: &Rect) -> Vec<EntityId> {
        let mut removed = Vec::new();
        let mut write = 0;
        for read in 0..self.ids.len() {
            let p = Vec2::new(self.xs[read], self.ys[read]);
            if !rect.contains(p) {
                removed.push(self.ids[read]);
                continue;
            }
            if write != read {
                self.ids[write] = self.ids[read];
                self.xs[write] = self.xs[read];
                self.ys[write] = self.ys[read];
                self.vxs[write] = self.vxs[read];
                self.vys[write] = self.vys[read];
                self.colors[write] = self.colors[read];
                self.pinned[write] = self.pinned[read];
            }
            write += 1;
        }
        self.ids.truncate(write);
        self.xs.truncate(write);
        self.ys.truncate(write);
        self.vxs.truncate(write);
        self.vys.truncate(write);
        self.colors.truncate(write);
        self.pinned.truncate(write);
        removed
    }

    fn clear(&mut self) {
        self.ids.clear();
        self.xs.clear();
        self.ys.clear();
        self.vxs.clear();
        self.vys.clear();
        self.colors.clear();
        self.pinned.clear();
    }
}
