//! wgpu compute pipeline for bidirectional nearest-hit queries.

use bytemuck::Zeroable;
use meshbake_gpu::{GpuContext, GpuError};
use wgpu::util::DeviceExt;

use super::buffers::{GpuBakeParams, GpuBvhNode, GpuRay, GpuScene, GpuTriangle};

const WORKGROUP_SIZE: u32 = 8;

/// Compiled nearest-hit kernel and its bind group layout.
pub struct NearestHitPipeline {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl NearestHitPipeline {
    /// Compile the kernel on `ctx`'s device.
    ///
    /// Shader or pipeline validation failures come back as
    /// [`GpuError::Validation`].
    pub fn new(ctx: &GpuContext) -> Result<Self, GpuError> {
        ctx.scoped(|device| {
            let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Nearest Hit Shader"),
                source: wgpu::ShaderSource::Wgsl(super::shaders::NEAREST_HIT_SHADER.into()),
            });

            let entries: Vec<wgpu::BindGroupLayoutEntry> = (0..6)
                .map(|binding| wgpu::BindGroupLayoutEntry {
                    binding,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: match binding {
                            0 => wgpu::BufferBindingType::Uniform,
                            5 => wgpu::BufferBindingType::Storage { read_only: false },
                            _ => wgpu::BufferBindingType::Storage { read_only: true },
                        },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                })
                .collect();

            let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Nearest Hit Bind Group Layout"),
                entries: &entries,
            });

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Nearest Hit Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

            let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("Nearest Hit Pipeline"),
                layout: Some(&pipeline_layout),
                module: &shader_module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            });

            Self {
                pipeline,
                bind_group_layout,
            }
        })
    }

    /// Trace every ray against `scene` and read back one triangle index per
    /// texel, or [`crate::NO_HIT`].
    ///
    /// Blocks until the device finishes.
    pub fn dispatch(
        &self,
        ctx: &GpuContext,
        scene: &GpuScene,
        rays: &[GpuRay],
        params: &GpuBakeParams,
    ) -> Result<Vec<u32>, GpuError> {
        let texels = params.width as usize * params.height as usize;
        if rays.len() != texels {
            return Err(GpuError::Validation(format!(
                "{} rays for a {}x{} dispatch",
                rays.len(),
                params.width,
                params.height
            )));
        }

        let groups_x = params.width.div_ceil(WORKGROUP_SIZE);
        let groups_y = params.height.div_ceil(WORKGROUP_SIZE);
        let max_groups = ctx.device.limits().max_compute_workgroups_per_dimension;
        if groups_x > max_groups || groups_y > max_groups {
            return Err(GpuError::Validation(format!(
                "{}x{} texels need more than {} workgroups per dimension",
                params.width, params.height, max_groups
            )));
        }

        let hits_size = (texels * std::mem::size_of::<u32>()) as u64;
        ctx.check_storage_size("triangles", std::mem::size_of_val(scene.triangles.as_slice()) as u64)?;
        ctx.check_storage_size("bvh nodes", std::mem::size_of_val(scene.nodes.as_slice()) as u64)?;
        ctx.check_storage_size("rays", std::mem::size_of_val(rays) as u64)?;
        ctx.check_storage_size("hits", hits_size)?;

        // Zero-sized storage buffers are invalid; pad empty arrays with one element.
        let triangles = non_empty(&scene.triangles, GpuTriangle::zeroed());
        let nodes = non_empty(&scene.nodes, GpuBvhNode::zeroed());
        let leaf_triangles = non_empty(&scene.leaf_triangles, 0u32);
        let rays = non_empty(rays, GpuRay::zeroed());

        let (hits_buffer, readback_buffer, bind_group) = ctx.scoped(|device| {
            let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Bake Params Buffer"),
                contents: bytemuck::bytes_of(params),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let triangle_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Triangle Buffer"),
                contents: bytemuck::cast_slice(&triangles),
                usage: wgpu::BufferUsages::STORAGE,
            });
            let node_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("BVH Buffer"),
                contents: bytemuck::cast_slice(&nodes),
                usage: wgpu::BufferUsages::STORAGE,
            });
            let leaf_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Leaf Triangle Buffer"),
                contents: bytemuck::cast_slice(&leaf_triangles),
                usage: wgpu::BufferUsages::STORAGE,
            });
            let ray_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Ray Buffer"),
                contents: bytemuck::cast_slice(&rays),
                usage: wgpu::BufferUsages::STORAGE,
            });
            let hits_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Hit Buffer"),
                size: hits_size.max(4),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            });
            let readback_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Hit Readback Buffer"),
                size: hits_size.max(4),
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            });

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Nearest Hit Bind Group"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: params_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: triangle_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: node_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: leaf_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: ray_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 5,
                        resource: hits_buffer.as_entire_binding(),
                    },
                ],
            });

            (hits_buffer, readback_buffer, bind_group)
        })?;

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Nearest Hit Encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Nearest Hit Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups_x, groups_y, 1);
        }
        encoder.copy_buffer_to_buffer(&hits_buffer, 0, &readback_buffer, 0, hits_size);
        ctx.queue.submit(Some(encoder.finish()));

        let slice = readback_buffer.slice(..hits_size);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        ctx.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|_| GpuError::BufferMapping)?
            .map_err(|_| GpuError::BufferMapping)?;

        let data = slice.get_mapped_range();
        let hits: Vec<u32> = bytemuck::cast_slice(&data[..]).to_vec();
        drop(data);
        readback_buffer.unmap();

        Ok(hits)
    }
}

fn non_empty<T: Copy>(items: &[T], filler: T) -> Vec<T> {
    if items.is_empty() {
        vec![filler]
    } else {
        items.to_vec()
    }
}
