use super::VertexEncoder;
use crate::layout::{StepMode, Topology, VertexLayout};
use crate::store::Columns;

/// One interleaved `x, y | rgb` record per entity.
///
/// Drawn either as a point list or, when `expanded`, as one instanced quad per
/// record.
#[derive(Debug, Clone)]
pub struct PointEncoder {
    expanded: bool,
    layout: VertexLayout,
}

impl PointEncoder {
    pub fn new(expanded: bool) -> Self {
        let step_mode = if expanded {
            StepMode::Instance
        } else {
            StepMode::Vertex
        };
        Self {
            expanded,
            layout: VertexLayout::interleaved(&[2, 3], step_mode),
        }
    }
}

impl VertexEncoder for PointEncoder {
    fn name(&self) -> &'static str {
        if self.expanded {
            "expanded_points"
        } else {
            "points"
        }
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
        for i in 0..columns.len() {
            let p = columns.position(i);
            let c = columns.color(i);
            out.extend_from_slice(&[p.x, p.y, c.x, c.y, c.z]);
        }
    }
}
