//! Vertex layouts and draw calls
//!
//! Graphics-API-neutral descriptions that the renderer turns into real vertex
//! buffer layouts and draw commands.

use serde::{Deserialize, Serialize};
use std::ops::Range;

pub const FLOAT_BYTES: usize = std::mem::size_of::<f32>();
pub const INDEX_BYTES: usize = std::mem::size_of::<u32>();

/// Primitive topology used to draw a set of entities.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// Four vertices per entity, two indexed triangles.
    IndexedQuads,
    /// One vertex per entity, rasterized as a single pixel.
    Points,
    /// One instance per entity, expanded to a quad in the vertex stage.
    ExpandedPoints,
    /// Indexed line list; used for graph edges.
    Lines,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StepMode {
    Vertex,
    Instance,
}

/// How attribute streams are laid out in the buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Arrangement {
    /// All attributes of a vertex are contiguous.
    Interleaved,
    /// Each attribute occupies its own contiguous plane, planes in attribute order.
    Planar,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub location: u32,
    pub components: usize,
    /// Offset inside an interleaved vertex, in floats. Unused for planar layouts.
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    pub arrangement: Arrangement,
    pub step_mode: StepMode,
    pub attributes: Vec<Attribute>,
}

impl VertexLayout {
    /// Interleaved layout from attribute component counts, locations `0..`.
    pub fn interleaved(components: &[usize], step_mode: StepMode) -> Self {
        let mut offset = 0;
        let attributes = components
            .iter()
            .enumerate()
            .map(|(location, &components)| {
                let attr = Attribute {
                    location: location as u32,
                    components,
                    offset,
                };
                offset += components;
                attr
            })
            .collect();
        Self {
            arrangement: Arrangement::Interleaved,
            step_mode,
            attributes,
        }
    }

    pub fn planar(components: &[usize], step_mode: StepMode) -> Self {
        Self {
            arrangement: Arrangement::Planar,
            ..Self::interleaved(components, step_mode)
        }
    }

    pub fn floats_per_vertex(&self) -> usize {
        self.attributes.iter().map(|a| a.components).sum()
    }

    pub fn stride_bytes(&self) -> usize {
        self.floats_per_vertex() * FLOAT_BYTES
    }

    /// Byte range of each attribute plane for `vertex_count` vertices.
    ///
    /// Interleaved layouts have a single stream covering everything.
    pub fn streams(&self, vertex_count: usize) -> Vec<Range<u64>> {
        match self.arrangement {
            Arrangement::Interleaved => {
                vec![0..(vertex_count * self.stride_bytes()) as u64]
            }
            Arrangement::Planar => {
                let mut start = 0u64;
                self.attributes
                    .iter()
                    .map(|a| {
                        let len = (vertex_count * a.components * FLOAT_BYTES) as u64;
                        let range = start..start + len;
                        start += len;
                        range
                    })
                    .collect()
            }
        }
    }
}

/// A single draw command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCall {
    Indexed {
        indices: Range<u32>,
        instances: Range<u32>,
    },
    Direct {
        vertices: Range<u32>,
        instances: Range<u32>,
    },
}

/// Vertices emitted per expanded point instance (two triangles).
pub const EXPANDED_VERTICES: u32 = 6;

impl DrawCall {
    /// Draw `count` primitives of `topology` (entities, or edges for lines).
    pub fn for_topology(topology: Topology, count: usize) -> Self {
        let count = count as u32;
        match topology {
            Topology::IndexedQuads => DrawCall::Indexed {
                indices: 0..count * 6,
                instances: 0..1,
            },
            Topology::Points => DrawCall::Direct {
                vertices: 0..count,
                instances: 0..1,
            },
            Topology::ExpandedPoints => DrawCall::Direct {
                vertices: 0..EXPANDED_VERTICES,
                instances: 0..count,
            },
            Topology::Lines => DrawCall::Indexed {
                indices: 0..count * 2,
                instances: 0..1,
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            DrawCall::Indexed { indices, instances } => indices.is_empty() || instances.is_empty(),
            DrawCall::Direct {
                vertices,
                instances,
            } => vertices.is_empty() || instances.is_empty(),
        }
    }
}
