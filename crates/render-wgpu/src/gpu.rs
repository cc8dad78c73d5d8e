use crate::shaders;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use gridscape_common::Rgba;
use gridscape_kernel::{GridEngine, GridGeometry, GridLine};
use gridscape_render::GridCamera;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    minor_color: [f32; 4],
    major_color: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
struct GridVertex {
    position: [f32; 3],
    kind: f32,
}

const MINOR: f32 = 0.0;
const MAJOR: f32 = 1.0;

/// Two vertices per line, minor lines first.
fn grid_vertices(geometry: &GridGeometry) -> Vec<GridVertex> {
    let mut verts = Vec::with_capacity(geometry.line_count() * 2);
    let mut push = |lines: &[GridLine], kind: f32| {
        for line in lines {
            let s = line.segment;
            verts.push(GridVertex {
                position: [s.start.x, s.start.y, 0.0],
                kind,
            });
            verts.push(GridVertex {
                position: [s.end.x, s.end.y, 0.0],
                kind,
            });
        }
    };
    push(geometry.minor(), MINOR);
    push(geometry.major(), MAJOR);
    verts
}

fn color(c: Rgba) -> [f32; 4] {
    c.to_array()
}

/// wgpu-based grid renderer.
pub struct WgpuGridRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    vertex_buffer: Option<wgpu::Buffer>,
    vertex_count: u32,
    uploaded_generation: Option<u64>,
    uploads: u64,
    surface_format: wgpu::TextureFormat,
    clear_color: wgpu::Color,
}

impl WgpuGridRenderer {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("grid_uniform_buffer"),
            contents: bytemuck::bytes_of(&Uniforms {
                view_proj: Mat4::IDENTITY.to_cols_array_2d(),
                model: Mat4::IDENTITY.to_cols_array_2d(),
                minor_color: Rgba::SECONDARY.to_array(),
                major_color: Rgba::SECONDARY.to_array(),
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("grid_bind_group_layout"),
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

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("grid_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("grid_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("grid_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::GRID_SHADER.into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("grid_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_grid"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<GridVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x3,
                        1 => Float32,
                    ],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_grid"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            vertex_buffer: None,
            vertex_count: 0,
            uploaded_generation: None,
            uploads: 0,
            surface_format,
            clear_color: wgpu::Color {
                r: 0.02,
                g: 0.03,
                b: 0.05,
                a: 1.0,
            },
        }
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    pub fn set_clear_color(&mut self, color: Rgba) {
        self.clear_color = wgpu::Color {
            r: color.r as f64,
            g: color.g as f64,
            b: color.b as f64,
            a: color.a as f64,
        };
    }

    /// Geometry generation currently on the GPU.
    pub fn uploaded_generation(&self) -> Option<u64> {
        self.uploaded_generation
    }

    /// Number of vertex uploads so far.
    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    /// Sync GPU state with the engine: vertices if the geometry generation
    /// moved, uniforms always.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        engine: &GridEngine,
        camera: &GridCamera,
    ) {
        if self.uploaded_generation != Some(engine.generation()) {
            let verts = grid_vertices(engine.geometry());
            self.vertex_count = verts.len() as u32;
            self.vertex_buffer = (!verts.is_empty()).then(|| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("grid_vertex_buffer"),
                    contents: bytemuck::cast_slice(&verts),
                    usage: wgpu::BufferUsages::VERTEX,
                })
            });
            self.uploaded_generation = Some(engine.generation());
            self.uploads += 1;
            tracing::debug!(
                generation = engine.generation(),
                vertices = self.vertex_count,
                "grid vertices uploaded"
            );
        }

        let materials = engine.materials();
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&Uniforms {
                view_proj: camera.view_projection().to_cols_array_2d(),
                model: engine.transform().model_matrix().to_cols_array_2d(),
                minor_color: color(materials.minor.color),
                major_color: color(materials.major.color),
            }),
        );
    }

    /// Render one frame of grid lines into `view`.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
        engine: &GridEngine,
        camera: &GridCamera,
    ) {
        self.prepare(device, queue, engine, camera);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("grid_encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("grid_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });

            if let (true, Some(buffer)) = (engine.is_visible(), &self.vertex_buffer) {
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                pass.set_vertex_buffer(0, buffer.slice(..));
                pass.draw(0..self.vertex_count, 0..1);
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridscape_common::GridConfig;

    #[test]
    fn uniforms_are_std140_sized() {
        assert_eq!(std::mem::size_of::<Uniforms>(), 160);
        assert_eq!(std::mem::size_of::<GridVertex>(), 16);
    }

    #[test]
    fn vertices_tag_line_kind() {
        let geometry = GridGeometry::build(&GridConfig::default(), 200.0).unwrap();
        let verts = grid_vertices(&geometry);
        assert_eq!(verts.len(), geometry.line_count() * 2);
        let minor_verts = geometry.minor().len() * 2;
        assert!(verts[..minor_verts].iter().all(|v| v.kind == MINOR));
        assert!(verts[minor_verts..].iter().all(|v| v.kind == MAJOR));
        assert!(verts.iter().all(|v| v.position[2] == 0.0));
    }
}
