use super::{Columns, ColumnsMut, EntityStore, StoreLayout};
use crate::bounds::Rect;
use crate::entity::{Entity, EntityId};
use crate::error::CoreError;

/// Array-of-structs entity storage.
#[derive(Debug, Default, Clone)]
pub struct AosStore {
    entities: Vec<Entity>,
}

impl AosStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entities: Vec::with_capacity(capacity),
        }
    }

    pub fn as_slice(&self) -> &[Entity] {
        &self.entities
    }

    pub fn as_mut_slice(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }
}

impl EntityStore for AosStore {
    fn layout(&self) -> StoreLayout {
        StoreLayout::Interleaved
    }

    fn len(&self) -> usize {
        self.entities.len()
    }

    fn capacity(&self) -> usize {
        self.entities.capacity()
    }

    fn reserve(&mut self, additional: usize) {
        self.entities.reserve(additional);
    }

    fn append(&mut self, entity: Entity) -> usize {
        self.entities.push(entity);
        self.entities.len()
    }

    fn remove(&mut self, id: EntityId) -> Result<Entity, CoreError> {
        let index = self.index_of(id).ok_or(CoreError::NotFound(id))?;
        Ok(self.entities.remove(index))
    }

    fn index_of(&self, id: EntityId) -> Option<usize> {
        self.entities.iter().position(|e| e.id == id)
    }

    fn entity_at(&self, index: usize) -> Option<Entity> {
        self.entities.get(index).copied()
    }

    fn set_at(&mut self, index: usize, entity: Entity) {
        self.entities[index] = entity;
    }

    fn columns(&self) -> Columns<'_> {
        Columns::Interleaved(&self.entities)
    }

    fn columns_mut(&mut self) -> ColumnsMut<'_> {
        ColumnsMut::Interleaved(&mut self.entities)
    }

    fn retain_within(&mut self, rect: &Rect) -> Vec<EntityId> {
        let mut removed = Vec::new();
        self.entities.retain(|e| {
            let keep = rect.contains(e.position);
            if !keep {
                removed.push(e.id);
            }
            keep
        });
        removed
    }

    fn clear(&mut self) {
        self.entities.clear();
    }
}
