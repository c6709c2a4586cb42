//! Compute pass for the GPU-resident integrator

use crate::backend::WgpuBackend;
use vortex_core::kernel::KernelParams;
use vortex_core::pipeline::KernelDispatch;

pub const WORKGROUP_SIZE: u32 = 64;

/// Per-dimension dispatch limit guaranteed by every wgpu backend.
pub const MAX_GROUPS_PER_DIMENSION: u32 = 65_535;

/// Split `groups` workgroups into an `(x, y)` grid within the per-dimension limit.
pub fn dispatch_size(groups: u32) -> (u32, u32) {
    if groups <= MAX_GROUPS_PER_DIMENSION {
        (groups, 1)
    } else {
        (MAX_GROUPS_PER_DIMENSION, groups.div_ceil(MAX_GROUPS_PER_DIMENSION))
    }
}

pub struct VortexKernel {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    params: wgpu::Buffer,
}

impl VortexKernel {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("vortex kernel"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/vortex.wgsl").into()),
        });

        let storage = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("vortex kernel bind group layout"),
            entries: &[
                storage(0, true),
                storage(1, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("vortex kernel layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("vortex kernel"),
            layout: Some(&layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        let params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("vortex kernel params"),
            size: std::mem::size_of::<KernelParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            pipeline,
            bind_group_layout,
            params,
        }
    }

    /// Record one integration step into `encoder`.
    ///
    /// The source and target swap every frame, so the bind group is rebuilt
    /// per dispatch.
    pub fn encode(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        dispatch: &KernelDispatch<'_, WgpuBackend>,
    ) {
        queue.write_buffer(&self.params, 0, bytemuck::bytes_of(&dispatch.params));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("vortex kernel bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: dispatch.source.raw().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: dispatch.target.raw().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.params.as_entire_binding(),
                },
            ],
        });

        let (x, y) = dispatch_size(dispatch.params.workgroups(WORKGROUP_SIZE));
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("vortex kernel"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(x, y, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_dispatches_stay_one_dimensional() {
        assert_eq!(dispatch_size(0), (0, 1));
        assert_eq!(dispatch_size(782), (782, 1));
        assert_eq!(dispatch_size(MAX_GROUPS_PER_DIMENSION), (MAX_GROUPS_PER_DIMENSION, 1));
    }

    #[test]
    fn large_dispatches_spill_into_y() {
        let (x, y) = dispatch_size(MAX_GROUPS_PER_DIMENSION + 1);
        assert_eq!((x, y), (MAX_GROUPS_PER_DIMENSION, 2));
        assert!(u64::from(x) * u64::from(y) >= u64::from(MAX_GROUPS_PER_DIMENSION) + 1);
    }
}
