use super::{DepthBias, VertexEncoder};
use crate::error::CoreError;
use crate::graph::Edge;
use crate::layout::{StepMode, Topology, VertexLayout};
use crate::store::{Columns, EntityStore};

/// One `x, y, z | rgb` "dot" per entity; edges index into these dots.
#[derive(Debug, Clone)]
pub struct LineEncoder {
    depth: DepthBias,
    layout: VertexLayout,
}

impl LineEncoder {
    pub fn new(depth: DepthBias) -> Self {
        Self {
            depth,
            layout: VertexLayout::interleaved(&[3, 3], StepMode::Vertex),
        }
    }
}

impl VertexEncoder for LineEncoder {
    fn name(&self) -> &'static str {
        "lines"
    }

    fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    fn topology(&self) -> Topology {
        Topology::Lines
    }

    fn vertices_per_entity(&self) -> usize {
        1
    }

    fn encode(&self, columns: Columns<'_>, out: &mut Vec<f32>) {
        out.clear();
        out.reserve(columns.len() * 6);
        for i in 0..columns.len() {
            let p = columns.position(i);
            let c = columns.color(i);
            out.extend_from_slice(&[p.x, p.y, self.depth.z(i), c.x, c.y, c.z]);
        }
    }
}

/// Resolve every edge to the current store indices of its endpoints.
///
/// Indices shift on every removal, so this is rebuilt rather than patched.
pub fn line_indices(edges: &[Edge], store: &dyn EntityStore) -> Result<Vec<u32>, CoreError> {
    let mut indices = Vec::with_capacity(edges.len() * 2);
    for edge in edges {
        let a = store.index_of(edge.a).ok_or(CoreError::NotFound(edge.a))?;
        let b = store.index_of(edge.b).ok_or(CoreError::NotFound(edge.b))?;
        indices.push(a as u32);
        indices.push(b as u32);
    }
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, EntityId};
    use crate::store::AosStore;
    use glam::{Vec2, Vec3};

    #[test]
    fn indices_follow_current_positions() {
        let mut store = AosStore::new();
        for id in 1..=3 {
            store.append(Entity::new(EntityId(id), Vec2::ZERO, Vec3::ONE));
        }
        let edges = [Edge::new(EntityId(1), EntityId(3)), Edge::new(EntityId(3), EntityId(2))];
        assert_eq!(line_indices(&edges, &store).unwrap(), vec![0, 2, 2, 1]);

        store.remove(EntityId(2)).unwrap();
        let err = line_indices(&edges, &store).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(EntityId(2))));
        assert_eq!(line_indices(&edges[..1], &store).unwrap(), vec![0, 1]);
    }
}
