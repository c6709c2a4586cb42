//! Frame submission
//!
//! Turns a [`Frame`] into one command buffer: the optional kernel dispatch,
//! then a single render pass that draws every item in order against a
//! cleared depth buffer.

use crate::backend::WgpuBackend;
use crate::context::GpuContext;
use crate::error::RenderError;
use crate::kernel::VortexKernel;
use crate::pipelines::PipelineCache;
use vortex_core::layout::DrawCall;
use vortex_core::pipeline::{DrawItem, Frame, FrameRenderer, FrameUniforms};

pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.02,
    b: 0.05,
    a: 1.0,
};

pub struct Renderer {
    context: GpuContext,
    pipelines: PipelineCache,
    kernel: VortexKernel,
    uniforms: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    skipped_frames: u64,
}

impl Renderer {
    pub fn new(context: GpuContext) -> Self {
        let device = context.device();

        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame bind group layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            }],
        });

        let pipelines = PipelineCache::new(device, context.format(), &bind_group_layout);
        let kernel = VortexKernel::new(device);

        Self {
            context,
            pipelines,
            kernel,
            uniforms,
            bind_group,
            skipped_frames: 0,
        }
    }

    pub fn backend(&self) -> WgpuBackend {
        self.context.backend()
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.context.resize(width, height);
    }

    /// Frames whose draw was dropped because no surface texture was available.
    pub fn skipped_frames(&self) -> u64 {
        self.skipped_frames
    }

    /// Pipeline index per item, `None` for items with nothing to draw.
    fn resolve(&mut self, items: &[DrawItem<'_, WgpuBackend>]) -> Result<Vec<Option<usize>>, RenderError> {
        let device = self.context.device();
        items
            .iter()
            .map(|item| {
                let streams = item.layout.streams(item.vertex_count);
                // wgpu rejects empty buffer slices.
                if item.call.is_empty() || streams.iter().any(|s| s.is_empty()) {
                    return Ok(None);
                }
                if matches!(item.call, DrawCall::Indexed { .. }) && item.indices.is_none() {
                    return Err(RenderError::MissingIndices {
                        label: item.label,
                        topology: item.topology,
                    });
                }
                self.pipelines
                    .resolve(device, item.topology, item.layout)
                    .map(Some)
            })
            .collect()
    }
}

impl FrameRenderer<WgpuBackend> for Renderer {
    type Error = RenderError;

    fn render(&mut self, frame: &Frame<'_, WgpuBackend>) -> Result<(), RenderError> {
        let resolved = self.resolve(&frame.items)?;
        let device = self.context.device();
        let queue = self.context.queue();

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame encoder"),
        });

        // The kernel must run even when the draw is skipped, or the caller's
        // ping-pong swap would expose an unwritten buffer.
        if let Some(dispatch) = &frame.dispatch {
            self.kernel.encode(device, queue, &mut encoder, dispatch);
        }

        let output = match self.context.current_texture() {
            Ok(output) => output,
            Err(error @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                tracing::warn!(%error, "surface needs reconfiguring");
                queue.submit(std::iter::once(encoder.finish()));
                self.context.reconfigure();
                self.skipped_frames += 1;
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("timed out waiting for a surface texture");
                queue.submit(std::iter::once(encoder.finish()));
                self.skipped_frames += 1;
                return Ok(());
            }
            Err(error) => return Err(error.into()),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        queue.write_buffer(&self.uniforms, 0, bytemuck::bytes_of(&frame.uniforms));

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("frame pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.context.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_bind_group(0, &self.bind_group, &[]);

            for (item, index) in frame.items.iter().zip(&resolved) {
                let Some(pipeline) = index.and_then(|i| self.pipelines.pipeline(i)) else {
                    continue;
                };
                pass.set_pipeline(pipeline);
                for (slot, range) in item.layout.streams(item.vertex_count).into_iter().enumerate() {
                    pass.set_vertex_buffer(slot as u32, item.vertices.raw().slice(range));
                }
                match &item.call {
                    DrawCall::Indexed { indices, instances } => {
                        if let Some(index_buffer) = item.indices {
                            pass.set_index_buffer(index_buffer.raw().slice(..), wgpu::IndexFormat::Uint32);
                            pass.draw_indexed(indices.clone(), 0, instances.clone());
                        }
                    }
                    DrawCall::Direct { vertices, instances } => {
                        pass.draw(vertices.clone(), instances.clone());
                    }
                }
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
