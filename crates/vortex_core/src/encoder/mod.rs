//! Vertex encoders
//!
//! Encoders turn entity columns into the float stream the GPU reads. They are
//! interchangeable strategies; the pipeline picks one from configuration and
//! never looks at the concrete type.
//!
//! Encoded length is always `count × vertices_per_entity × components_per_vertex`.

mod line;
mod planar;
mod point;
mod quad;

pub use line::{line_indices, LineEncoder};
pub use planar::PlanarEncoder;
pub use point::PointEncoder;
pub use quad::{quad_indices, QuadEncoder, QUAD_CORNERS};

use crate::layout::{Topology, VertexLayout};
use crate::store::Columns;
use serde::{Deserialize, Serialize};

pub trait VertexEncoder {
    fn name(&self) -> &'static str;

    fn layout(&self) -> &VertexLayout;

    fn topology(&self) -> Topology;

    fn vertices_per_entity(&self) -> usize;

    fn components_per_vertex(&self) -> usize {
        self.layout().floats_per_vertex()
    }

    fn floats_per_entity(&self) -> usize {
        self.vertices_per_entity() * self.components_per_vertex()
    }

    /// Replace `out` with the full encoding of `columns`.
    fn encode(&self, columns: Columns<'_>, out: &mut Vec<f32>);

    /// Number of leading floats that change when only positions move.
    fn dynamic_floats(&self, count: usize) -> usize {
        count * self.floats_per_entity()
    }

    /// Replace `out` with the leading `dynamic_floats` of the encoding.
    fn encode_dynamic(&self, columns: Columns<'_>, out: &mut Vec<f32>) {
        self.encode(columns, out);
    }
}

/// Deterministic per-entity depth: `z = base + delta × index`.
///
/// Strictly increasing while `delta × count` stays well inside f32 precision at
/// `base`; past that, neighbouring entities collapse onto the same depth.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthBias {
    pub base: f32,
    pub delta: f32,
}

impl DepthBias {
    pub const NODES: DepthBias = DepthBias {
        base: 0.3,
        delta: 0.000_01,
    };
    pub const LINES: DepthBias = DepthBias {
        base: 0.2,
        delta: 0.000_01,
    };

    #[inline]
    pub fn z(&self, index: usize) -> f32 {
        self.base + self.delta * index as f32
    }

    /// Largest entity count for which every depth is distinct.
    pub fn precision_ceiling(&self) -> usize {
        // One ulp at the largest depth must stay below delta.
        let mut count = 1usize;
        while count < (1 << 30) {
            let z = self.z(count * 2);
            let ulp = f32::from_bits(z.to_bits() + 1) - z;
            if ulp >= self.delta * 0.5 {
                break;
            }
            count *= 2;
        }
        count
    }
}

/// Encoder selection from configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderKind {
    /// Interleaved billboarded quads.
    Quads,
    /// Interleaved `x, y, rgb` per entity.
    Points,
    /// Planar `xs | ys | rgb` channels.
    PlanarPoints,
}

/// Build the encoder for `kind`. Point-style encoders honor `expanded` by
/// switching to instanced quads.
pub fn encoder_for(
    kind: EncoderKind,
    node_size: f32,
    depth: DepthBias,
    expanded: bool,
) -> Box<dyn VertexEncoder> {
    match kind {
        EncoderKind::Quads => Box::new(QuadEncoder::new(node_size, depth)),
        EncoderKind::Points => Box::new(PointEncoder::new(expanded)),
        EncoderKind::PlanarPoints => Box::new(PlanarEncoder::new(expanded)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, EntityId};
    use crate::store::{AosStore, EntityStore, SoaStore};
    use glam::{Vec2, Vec3};

    fn fill(store: &mut dyn EntityStore, count: u32) {
        for i in 0..count {
            store.append(Entity::new(
                EntityId(i),
                Vec2::new(i as f32, 2.0 * i as f32),
                Vec3::new(0.1, 0.2, 0.3),
            ));
        }
    }

    #[test]
    fn encoded_length_matches_layout() {
        let encoders: Vec<Box<dyn VertexEncoder>> = vec![
            encoder_for(EncoderKind::Quads, 1.0, DepthBias::NODES, false),
            encoder_for(EncoderKind::Points, 1.0, DepthBias::NODES, false),
            encoder_for(EncoderKind::Points, 1.0, DepthBias::NODES, true),
            encoder_for(EncoderKind::PlanarPoints, 1.0, DepthBias::NODES, false),
            Box::new(LineEncoder::new(DepthBias::LINES)),
        ];
        for count in [0u32, 1, 7, 64] {
            let mut aos = AosStore::new();
            let mut soa = SoaStore::new();
            fill(&mut aos, count);
            fill(&mut soa, count);
            for encoder in &encoders {
                let expected = count as usize
                    * encoder.vertices_per_entity()
                    * encoder.components_per_vertex();
                let mut out = vec![42.0; 3];
                encoder.encode(aos.columns(), &mut out);
                assert_eq!(out.len(), expected, "{} aos", encoder.name());
                let mut planar_out = Vec::new();
                encoder.encode(soa.columns(), &mut planar_out);
                assert_eq!(planar_out, out, "{} soa", encoder.name());
            }
        }
    }

    #[test]
    fn depth_bias_strictly_increases() {
        let depth = DepthBias::NODES;
        let ceiling = depth.precision_ceiling();
        assert!(ceiling >= 10_000);
        let mut last = f32::NEG_INFINITY;
        for i in 0..ceiling.min(50_000) {
            let z = depth.z(i);
            assert!(z > last, "index {i}");
            last = z;
        }
    }
}
