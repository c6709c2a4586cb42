use super::{DepthBias, VertexEncoder};
use crate::layout::{StepMode, Topology, VertexLayout};
use crate::store::Columns;

/// Corner codes in emission order: bottom-left, top-left, top-right, bottom-right.
pub const QUAD_CORNERS: [[f32; 2]; 4] = [[-1.0, -1.0], [-1.0, 1.0], [1.0, 1.0], [1.0, -1.0]];

const VERTICES_PER_QUAD: usize = 4;
const INDICES_PER_QUAD: usize = 6;

/// Billboarded quads, interleaved as `inner_xy(2) | x, y, z(3) | rgb(3)`.
///
/// The fragment stage uses `inner_xy` to cut the square into a disc.
#[derive(Debug, Clone)]
pub struct QuadEncoder {
    half_size: f32,
    depth: DepthBias,
    layout: VertexLayout,
}

impl QuadEncoder {
    pub fn new(size: f32, depth: DepthBias) -> Self {
        Self {
            half_size: 0.5 * size,
            depth,
            layout: VertexLayout::interleaved(&[2, 3, 3], StepMode::Vertex),
        }
    }
}

impl VertexEncoder for QuadEncoder {
    fn name(&self) -> &'static str {
        "quads"
    }

    fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    fn topology(&self) -> Topology {
        Topology::IndexedQuads
    }

    fn vertices_per_entity(&self) -> usize {
        VERTICES_PER_QUAD
    }

    fn encode(&self, columns: Columns<'_>, out: &mut Vec<f32>) {
        out.clear();
        out.reserve(columns.len() * self.floats_per_entity());
        for i in 0..columns.len() {
            let p = columns.position(i);
            let c = columns.color(i);
            let z = self.depth.z(i);
            for [cx, cy] in QUAD_CORNERS {
                out.extend_from_slice(&[
                    cx,
                    cy,
                    p.x + cx * self.half_size,
                    p.y + cy * self.half_size,
                    z,
                    c.x,
                    c.y,
                    c.z,
                ]);
            }
        }
    }
}

/// Index list for `capacity` quads: `(0,1,2), (0,2,3)` offset by `4 × i`.
///
/// Depends only on the capacity, so it is generated once per capacity change.
pub fn quad_indices(capacity: usize) -> Vec<u32> {
    let mut indices = Vec::with_capacity(capacity * INDICES_PER_QUAD);
    for i in 0..capacity as u32 {
        let base = i * VERTICES_PER_QUAD as u32;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, EntityId};
    use crate::store::{AosStore, EntityStore};
    use glam::{Vec2, Vec3};

    #[test]
    fn corners_surround_position() {
        let mut store = AosStore::new();
        store.append(Entity::new(EntityId(1), Vec2::new(10.0, 20.0), Vec3::new(0.8, 0.2, 0.4)));
        store.append(Entity::new(EntityId(2), Vec2::new(0.0, 0.0), Vec3::ONE));

        let encoder = QuadEncoder::new(2.0, DepthBias::NODES);
        let mut out = Vec::new();
        encoder.encode(store.columns(), &mut out);

        let first: Vec<&[f32]> = out[..32].chunks(8).collect();
        assert_eq!(first[0], &[-1.0, -1.0, 9.0, 19.0, 0.3, 0.8, 0.2, 0.4]);
        assert_eq!(first[1], &[-1.0, 1.0, 9.0, 21.0, 0.3, 0.8, 0.2, 0.4]);
        assert_eq!(first[2], &[1.0, 1.0, 11.0, 21.0, 0.3, 0.8, 0.2, 0.4]);
        assert_eq!(first[3], &[1.0, -1.0, 11.0, 19.0, 0.3, 0.8, 0.2, 0.4]);

        // Second entity sits one depth step further.
        assert_eq!(out[32 + 4], DepthBias::NODES.z(1));
    }

    #[test]
    fn indices_form_two_triangles_per_quad() {
        assert_eq!(quad_indices(2), vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]);
        assert!(quad_indices(0).is_empty());
    }
}
