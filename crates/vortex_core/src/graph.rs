//! Node-and-edge graph
//!
//! Nodes live in an [`AosStore`]; edges refer to nodes by id, never by index.
//! Every structural change bumps [`Graph::revision`] so index-based caches
//! (the line index buffer) know to rebuild.
//!
//! Removing a node prunes every edge touching it, so no edge ever outlives
//! one of its endpoints.

use crate::bounds::WorldBounds;
use crate::encoder;
use crate::entity::{random_color, Entity, EntityId, IdAllocator, PINNED_COLOR};
use crate::error::CoreError;
use crate::store::{AosStore, EntityStore};
use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Undirected connection between two nodes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub a: EntityId,
    pub b: EntityId,
}

impl Edge {
    pub fn new(a: EntityId, b: EntityId) -> Self {
        Self { a, b }
    }

    #[inline]
    pub fn touches(&self, id: EntityId) -> bool {
        self.a == id || self.b == id
    }

    /// The endpoint opposite `id`, if `id` is an endpoint.
    pub fn other(&self, id: EntityId) -> Option<EntityId> {
        if id == self.a {
            Some(self.b)
        } else if id == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    /// Same endpoints, in either order.
    pub fn joins(&self, a: EntityId, b: EntityId) -> bool {
        (self.a == a && self.b == b) || (self.a == b && self.b == a)
    }
}

/// Spring and gravity constants; `t = scaler × dt` is the effective step.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphPhysics {
    pub gravity: f32,
    pub spring: f32,
    pub scaler: f32,
}

impl Default for GraphPhysics {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            spring: 0.1,
            scaler: 2.0,
        }
    }
}

pub struct Graph {
    nodes: AosStore,
    edges: Vec<Edge>,
    ids: IdAllocator,
    pick_threshold_sq: f32,
    revision: u64,
}

impl Graph {
    /// Empty graph. Picking matches nodes whose squared distance to the
    /// cursor is below `pick_threshold_sq`.
    pub fn new(pick_threshold_sq: f32) -> Self {
        Self {
            nodes: AosStore::with_capacity(8),
            edges: Vec::with_capacity(8),
            ids: IdAllocator::default(),
            pick_threshold_sq,
            revision: 0,
        }
    }

    /// Three pinned nodes joined in a chain.
    pub fn sample(pick_threshold_sq: f32) -> Self {
        let mut graph = Self::new(pick_threshold_sq);
        for (id, x, y) in [(1, 10.0, 20.0), (2, 20.0, 20.0), (3, 30.0, 30.0)] {
            let mut node = Entity::new(EntityId(id), Vec2::new(x, y), PINNED_COLOR);
            node.pin();
            graph.insert(node);
        }
        // Endpoints were inserted just above.
        graph.edges.push(Edge::new(EntityId(1), EntityId(2)));
        graph.edges.push(Edge::new(EntityId(2), EntityId(3)));
        graph
    }

    pub fn nodes(&self) -> &AosStore {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn node(&self, id: EntityId) -> Option<Entity> {
        self.nodes.get(id)
    }

    /// Insert a fully formed node, keeping future ids clear of its id.
    pub fn insert(&mut self, node: Entity) -> EntityId {
        self.ids.observe(node.id);
        self.nodes.append(node);
        self.revision += 1;
        node.id
    }

    /// New unpinned node with a random color at `position`.
    pub fn spawn_node(&mut self, position: Vec2, rng: &mut impl Rng) -> EntityId {
        let node = Entity::new(self.ids.next_id(), position, random_color(rng));
        tracing::debug!(id = %node.id, x = position.x, y = position.y, "spawned node");
        self.insert(node)
    }

    /// Closest node within the pick radius of `position`.
    pub fn closest_to(&self, position: Vec2) -> Option<EntityId> {
        let mut best: Option<(f32, EntityId)> = None;
        for node in self.nodes.iter() {
            let d = node.position.distance_squared(position);
            if d < self.pick_threshold_sq && best.map_or(true, |(min, _)| d < min) {
                best = Some((d, node.id));
            }
        }
        best.map(|(_, id)| id)
    }

    pub fn connect(&mut self, a: EntityId, b: EntityId) -> Result<Edge, CoreError> {
        if self.nodes.index_of(a).is_none() {
            return Err(CoreError::NotFound(a));
        }
        if self.nodes.index_of(b).is_none() {
            return Err(CoreError::NotFound(b));
        }
        if a == b {
            return Err(CoreError::SelfEdge(a));
        }
        if self.edges.iter().any(|e| e.joins(a, b)) {
            return Err(CoreError::DuplicateEdge { a, b });
        }
        let edge = Edge::new(a, b);
        self.edges.push(edge);
        self.revision += 1;
        Ok(edge)
    }

    /// Connect the nodes under `from` and `to`. `Ok(None)` when either point
    /// misses every node.
    pub fn connect_at(&mut self, from: Vec2, to: Vec2) -> Result<Option<Edge>, CoreError> {
        match (self.closest_to(from), self.closest_to(to)) {
            (Some(a), Some(b)) => self.connect(a, b).map(Some),
            _ => Ok(None),
        }
    }

    /// Remove the edge joining `a` and `b`; returns whether one existed.
    pub fn disconnect(&mut self, a: EntityId, b: EntityId) -> bool {
        let before = self.edges.len();
        self.edges.retain(|e| !e.joins(a, b));
        let removed = self.edges.len() != before;
        if removed {
            self.revision += 1;
        }
        removed
    }

    pub fn remove_node(&mut self, id: EntityId) -> Result<Entity, CoreError> {
        let node = self.nodes.remove(id)?;
        self.edges.retain(|e| !e.touches(id));
        self.revision += 1;
        tracing::debug!(id = %id, edges = self.edges.len(), "removed node");
        Ok(node)
    }

    /// Editor gesture ending a right-drag: on a single node it deletes the node,
    /// across two nodes it deletes their edge.
    pub fn erase_between(&mut self, from: Vec2, to: Vec2) -> bool {
        let (Some(a), Some(b)) = (self.closest_to(from), self.closest_to(to)) else {
            return false;
        };
        if a == b {
            self.remove_node(a).is_ok()
        } else {
            self.disconnect(a, b)
        }
    }

    pub fn flip_pin_at(&mut self, position: Vec2, rng: &mut impl Rng) -> Option<EntityId> {
        let id = self.closest_to(position)?;
        let index = self.nodes.index_of(id)?;
        let node = &mut self.nodes.as_mut_slice()[index];
        node.flip_pin(rng);
        tracing::debug!(id = %id, pinned = node.pinned, "flipped pin");
        Some(id)
    }

    /// Advance unpinned nodes by `dt` seconds under gravity and edge springs.
    ///
    /// Nodes are updated in storage order and see the already-updated
    /// positions of earlier nodes.
    pub fn step(&mut self, dt: f32, physics: &GraphPhysics) {
        let t = physics.scaler * dt;
        if t == 0.0 {
            return;
        }

        let index: HashMap<EntityId, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id, i))
            .collect();
        let nodes = self.nodes.as_mut_slice();

        for i in 0..nodes.len() {
            if nodes[i].pinned {
                continue;
            }
            let id = nodes[i].id;
            let position = nodes[i].position;
            let mut velocity = nodes[i].velocity + Vec2::NEG_Y * (t * physics.gravity);
            for other in self.edges.iter().filter_map(|e| e.other(id)) {
                let Some(&j) = index.get(&other) else {
                    continue;
                };
                let d = nodes[j].position - position;
                velocity += d.normalize_or_zero() * d.length_squared() * (t * physics.spring);
            }
            nodes[i].velocity = velocity;
            nodes[i].position = position + velocity * t;
        }
    }

    /// Cull nodes outside `[-w, 2w] × [-h, 2h]` together with their edges.
    pub fn remove_distant(&mut self, world: &WorldBounds) -> Vec<EntityId> {
        let removed = self.nodes.retain_within(&world.cull_rect());
        if !removed.is_empty() {
            self.edges.retain(|e| !removed.iter().any(|&id| e.touches(id)));
            self.revision += 1;
            for id in &removed {
                tracing::warn!(id = %id, "removing node that drifted too far");
            }
        }
        removed
    }

    /// Index pairs into the node store, one pair per edge.
    pub fn line_indices(&self) -> Result<Vec<u32>, CoreError> {
        encoder::line_indices(&self.edges, &self.nodes)
    }
}
