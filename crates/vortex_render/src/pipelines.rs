//! Render pipelines
//!
//! One pipeline per (topology, vertex layout) pair, built on first use. The
//! layout comes from the encoder, so switching encoders at runtime only costs
//! one extra pipeline build.

use crate::context::DEPTH_FORMAT;
use crate::error::RenderError;
use vortex_core::layout::{Arrangement, StepMode, Topology, VertexLayout, FLOAT_BYTES};

pub fn vertex_format(components: usize) -> Result<wgpu::VertexFormat, RenderError> {
    match components {
        1 => Ok(wgpu::VertexFormat::Float32),
        2 => Ok(wgpu::VertexFormat::Float32x2),
        3 => Ok(wgpu::VertexFormat::Float32x3),
        4 => Ok(wgpu::VertexFormat::Float32x4),
        _ => Err(RenderError::UnsupportedAttribute { components }),
    }
}

struct Stream {
    stride: u64,
    step_mode: wgpu::VertexStepMode,
    attributes: Vec<wgpu::VertexAttribute>,
}

/// Owned vertex buffer layouts; `wgpu::VertexBufferLayout` only borrows.
///
/// Interleaved layouts become a single stream; planar layouts become one
/// stream per attribute, bound to consecutive slots.
pub struct BufferLayouts {
    streams: Vec<Stream>,
}

impl BufferLayouts {
    pub fn new(layout: &VertexLayout) -> Result<Self, RenderError> {
        let step_mode = match layout.step_mode {
            StepMode::Vertex => wgpu::VertexStepMode::Vertex,
            StepMode::Instance => wgpu::VertexStepMode::Instance,
        };

        let streams = match layout.arrangement {
            Arrangement::Interleaved => {
                let attributes = layout
                    .attributes
                    .iter()
                    .map(|a| {
                        Ok(wgpu::VertexAttribute {
                            format: vertex_format(a.components)?,
                            offset: (a.offset * FLOAT_BYTES) as u64,
                            shader_location: a.location,
                        })
                    })
                    .collect::<Result<Vec<_>, RenderError>>()?;
                vec![Stream {
                    stride: layout.stride_bytes() as u64,
                    step_mode,
                    attributes,
                }]
            }
            Arrangement::Planar => layout
                .attributes
                .iter()
                .map(|a| {
                    Ok(Stream {
                        stride: (a.components * FLOAT_BYTES) as u64,
                        step_mode,
                        attributes: vec![wgpu::VertexAttribute {
                            format: vertex_format(a.components)?,
                            offset: 0,
                            shader_location: a.location,
                        }],
                    })
                })
                .collect::<Result<Vec<_>, RenderError>>()?,
        };
        Ok(Self { streams })
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn as_wgpu(&self) -> Vec<wgpu::VertexBufferLayout<'_>> {
        self.streams
            .iter()
            .map(|s| wgpu::VertexBufferLayout {
                array_stride: s.stride,
                step_mode: s.step_mode,
                attributes: &s.attributes,
            })
            .collect()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShaderKind {
    Points,
    Quads,
    Lines,
}

/// Which shader and vertex entry point draw `topology` from `arrangement`.
pub fn entry_point(topology: Topology, arrangement: Arrangement) -> (ShaderKind, &'static str) {
    match (topology, arrangement) {
        (Topology::IndexedQuads, _) => (ShaderKind::Quads, "vs_main"),
        (Topology::Lines, _) => (ShaderKind::Lines, "vs_main"),
        (Topology::Points, Arrangement::Interleaved) => (ShaderKind::Points, "vs_points"),
        (Topology::Points, Arrangement::Planar) => (ShaderKind::Points, "vs_planar"),
        (Topology::ExpandedPoints, Arrangement::Interleaved) => (ShaderKind::Points, "vs_points_expanded"),
        (Topology::ExpandedPoints, Arrangement::Planar) => (ShaderKind::Points, "vs_planar_expanded"),
    }
}

pub fn primitive_topology(topology: Topology) -> wgpu::PrimitiveTopology {
    match topology {
        Topology::IndexedQuads | Topology::ExpandedPoints => wgpu::PrimitiveTopology::TriangleList,
        Topology::Points => wgpu::PrimitiveTopology::PointList,
        Topology::Lines => wgpu::PrimitiveTopology::LineList,
    }
}

struct Shaders {
    points: wgpu::ShaderModule,
    quads: wgpu::ShaderModule,
    lines: wgpu::ShaderModule,
}

impl Shaders {
    fn new(device: &wgpu::Device) -> Self {
        let load = |label: &str, source: &'static str| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        };
        Self {
            points: load("points shader", include_str!("../shaders/points.wgsl")),
            quads: load("quads shader", include_str!("../shaders/quads.wgsl")),
            lines: load("lines shader", include_str!("../shaders/lines.wgsl")),
        }
    }

    fn get(&self, kind: ShaderKind) -> &wgpu::ShaderModule {
        match kind {
            ShaderKind::Points => &self.points,
            ShaderKind::Quads => &self.quads,
            ShaderKind::Lines => &self.lines,
        }
    }
}

struct CachedPipeline {
    topology: Topology,
    layout: VertexLayout,
    pipeline: wgpu::RenderPipeline,
}

pub struct PipelineCache {
    shaders: Shaders,
    layout: wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
    entries: Vec<CachedPipeline>,
}

impl PipelineCache {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        frame_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("render pipeline layout"),
            bind_group_layouts: &[frame_layout],
            push_constant_ranges: &[],
        });
        Self {
            shaders: Shaders::new(device),
            layout,
            format,
            entries: Vec::new(),
        }
    }

    /// Index of the pipeline for this pair, building it if needed.
    pub fn resolve(
        &mut self,
        device: &wgpu::Device,
        topology: Topology,
        layout: &VertexLayout,
    ) -> Result<usize, RenderError> {
        if let Some(i) = self
            .entries
            .iter()
            .position(|e| e.topology == topology && e.layout == *layout)
        {
            return Ok(i);
        }

        let pipeline = self.build(device, topology, layout)?;
        self.entries.push(CachedPipeline {
            topology,
            layout: layout.clone(),
            pipeline,
        });
        Ok(self.entries.len() - 1)
    }

    pub fn pipeline(&self, index: usize) -> Option<&wgpu::RenderPipeline> {
        self.entries.get(index).map(|e| &e.pipeline)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn build(
        &self,
        device: &wgpu::Device,
        topology: Topology,
        layout: &VertexLayout,
    ) -> Result<wgpu::RenderPipeline, RenderError> {
        let (kind, entry) = entry_point(topology, layout.arrangement);
        let module = self.shaders.get(kind);
        let buffers = BufferLayouts::new(layout)?;
        let label = format!("{topology:?} via {entry}");
        tracing::debug!(pipeline = %label, streams = buffers.len(), "building render pipeline");

        Ok(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(&self.layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some(entry),
                buffers: &buffers.as_wgpu(),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: primitive_topology(topology),
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaved_layout_is_one_stream() {
        let layout = VertexLayout::interleaved(&[2, 3, 3], StepMode::Vertex);
        let buffers = BufferLayouts::new(&layout).unwrap();
        let wgpu_layouts = buffers.as_wgpu();
        assert_eq!(wgpu_layouts.len(), 1);
        assert_eq!(wgpu_layouts[0].array_stride, 32);
        let offsets: Vec<_> = wgpu_layouts[0].attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 8, 20]);
    }

    #[test]
    fn planar_layout_is_one_stream_per_attribute() {
        let layout = VertexLayout::planar(&[1, 1, 3], StepMode::Instance);
        let buffers = BufferLayouts::new(&layout).unwrap();
        let wgpu_layouts = buffers.as_wgpu();
        let strides: Vec<_> = wgpu_layouts.iter().map(|l| l.array_stride).collect();
        assert_eq!(strides, vec![4, 4, 12]);
        assert!(wgpu_layouts
            .iter()
            .all(|l| l.step_mode == wgpu::VertexStepMode::Instance && l.attributes[0].offset == 0));
        assert_eq!(wgpu_layouts[2].attributes[0].shader_location, 2);
    }

    #[test]
    fn five_component_attributes_are_rejected() {
        assert!(matches!(
            vertex_format(5),
            Err(RenderError::UnsupportedAttribute { components: 5 })
        ));
    }

    #[test]
    fn expanded_points_draw_triangles() {
        assert_eq!(
            entry_point(Topology::ExpandedPoints, Arrangement::Planar),
            (ShaderKind::Points, "vs_planar_expanded")
        );
        assert_eq!(
            primitive_topology(Topology::ExpandedPoints),
            wgpu::PrimitiveTopology::TriangleList
        );
        assert_eq!(primitive_topology(Topology::Points), wgpu::PrimitiveTopology::PointList);
    }
}
