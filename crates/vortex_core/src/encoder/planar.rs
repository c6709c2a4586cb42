use super::VertexEncoder;
use crate::layout::{StepMode, Topology, VertexLayout};
use crate::store::Columns;

/// Planar channels: `xs[N] | ys[N] | rgb[N × 3]`.
///
/// Colors never change while the count stays the same, so per-frame uploads
/// only need the leading `2N` floats.
#[derive(Debug, Clone)]
pub struct PlanarEncoder {
    expanded: bool,
    layout: VertexLayout,
}

impl PlanarEncoder {
    pub fn new(expanded: bool) -> Self {
        let step_mode = if expanded {
            StepMode::Instance
        } else {
            StepMode::Vertex
        };
        Self {
            expanded,
            layout: VertexLayout::planar(&[1, 1, 3], step_mode),
        }
    }

    fn push_positions(columns: &Columns<'_>, out: &mut Vec<f32>) {
        match columns {
            Columns::Planar(p) => {
                out.extend_from_slice(p.xs);
                out.extend_from_slice(p.ys);
            }
            Columns::Interleaved(entities) => {
                out.extend(entities.iter().map(|e| e.position.x));
                out.extend(entities.iter().map(|e| e.position.y));
            }
        }
    }
}

impl VertexEncoder for PlanarEncoder {
    fn name(&self) -> &'static str {
        "planar_points"
    }

    fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    fn topology(&self) -> Topology {
        if self.expanded {
            Topology::ExpandedPoints
        } else {
            Topology::Points
        }
    }

    fn vertices_per_entity(&self) -> usize {
        1
    }

    fn encode(&self, columns: Columns<'_>, out: &mut Vec<f32>) {
        out.clear();
        out.reserve(columns.len() * 5);
        Self::push_positions(&columns, out);
        for i in 0..columns.len() {
            let c = columns.color(i);
            out.extend_from_slice(&[c.x, c.y, c.z]);
        }
    }

    fn dynamic_floats(&self, count: usize) -> usize {
        count * 2
    }

    fn encode_dynamic(&self, columns: Columns<'_>, out: &mut Vec<f32>) {
        out.clear();
        out.reserve(columns.len() * 2);
        Self::push_positions(&columns, out);
    }
}
