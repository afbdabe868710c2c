//! `wgpu` resource management for [`super::CandidateRenderer`]: pipelines,
//! offscreen textures and the vertex/instance buffers they draw from.
//! Grounded in the teacher's `downscale/pipeline.rs` / `downscale/node.rs`
//! (raw `wgpu` types reached through Bevy's `render_resource` re-export
//! there; reached directly here) — same "cached offscreen texture,
//! recomposited via a fullscreen triangle + custom shader, never a
//! framebuffer blit" structure (DESIGN.md).

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::geometry::ViewState;
use crate::renderer::RendererOptions;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PointInstance {
    pub pos: [f32; 2],
    pub label: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct ViewUniformData {
    center_and_scale: [f32; 4],
    viewport: [f32; 4],
    mobius_a: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct BackdropUniformData {
    viewport: [f32; 4],
    fill_color: [f32; 4],
    border_color: [f32; 4],
    grid_color: [f32; 4],
    widths: [f32; 4],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct BackdropKey {
    pub width: u32,
    pub height: u32,
    pub dpr_bits: u32,
    pub display_zoom_bits: u32,
}

pub(super) struct GpuState {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,

    view_bind_group_layout: wgpu::BindGroupLayout,
    view_uniform_buffer: wgpu::Buffer,
    view_bind_group: wgpu::BindGroup,

    palette_texture: wgpu::Texture,
    palette_view: wgpu::TextureView,
    palette_sampler: wgpu::Sampler,

    circle_pipeline: wgpu::RenderPipeline,
    square_pipeline: wgpu::RenderPipeline,
    overlay_pipeline: wgpu::RenderPipeline,

    backdrop_bind_group_layout: wgpu::BindGroupLayout,
    backdrop_uniform_buffer: wgpu::Buffer,
    backdrop_pipeline: wgpu::RenderPipeline,

    composite_bind_group_layout: wgpu::BindGroupLayout,
    composite_sampler: wgpu::Sampler,
    composite_pipeline: wgpu::RenderPipeline,

    backdrop_target: Option<(wgpu::Texture, wgpu::TextureView, BackdropKey)>,
    points_target: Option<(wgpu::Texture, wgpu::TextureView, (u32, u32))>,
    output_target: Option<(wgpu::Texture, wgpu::TextureView, (u32, u32))>,

    base_instances: Option<(wgpu::Buffer, u32)>,
    lod_instances: Option<(wgpu::Buffer, u32)>,
    selection_instances: Option<(wgpu::Buffer, u32)>,
    hover_instance: Option<(wgpu::Buffer, u32)>,
}

const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

impl GpuState {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        let view_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("hyperscatter-points-view-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let view_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("hyperscatter-view-uniform"),
            size: std::mem::size_of::<ViewUniformData>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let palette_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("hyperscatter-palette"),
            size: wgpu::Extent3d { width: 1, height: 1, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let palette_view = palette_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let palette_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("hyperscatter-palette-sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let view_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("hyperscatter-points-view-bind-group"),
            layout: &view_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: view_uniform_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(&palette_view) },
                wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::Sampler(&palette_sampler) },
            ],
        });

        let points_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("hyperscatter-points-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/points.wgsl").into()),
        });

        let points_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("hyperscatter-points-pipeline-layout"),
            bind_group_layouts: &[&view_bind_group_layout],
            push_constant_ranges: &[],
        });

        let instance_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PointInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute { format: wgpu::VertexFormat::Float32x2, offset: 0, shader_location: 0 },
                wgpu::VertexAttribute { format: wgpu::VertexFormat::Uint32, offset: 8, shader_location: 1 },
            ],
        };

        let make_points_pipeline = |fragment_entry: &str, label: &str| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&points_pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &points_shader,
                    entry_point: "vs_main",
                    buffers: &[instance_layout.clone()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &points_shader,
                    entry_point: fragment_entry,
                    targets: &[Some(wgpu::ColorTargetState {
                        format: OUTPUT_FORMAT,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            })
        };

        let circle_pipeline = make_points_pipeline("fs_circle", "hyperscatter-points-circle");
        let square_pipeline = make_points_pipeline("fs_square", "hyperscatter-points-square");
        let overlay_pipeline = make_points_pipeline("fs_solid_overlay", "hyperscatter-points-overlay");

        let backdrop_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("hyperscatter-backdrop-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let backdrop_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("hyperscatter-backdrop-uniform"),
            size: std::mem::size_of::<BackdropUniformData>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let backdrop_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("hyperscatter-backdrop-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/backdrop.wgsl").into()),
        });
        let backdrop_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("hyperscatter-backdrop-pipeline-layout"),
            bind_group_layouts: &[&backdrop_bind_group_layout],
            push_constant_ranges: &[],
        });
        let backdrop_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("hyperscatter-backdrop-pipeline"),
            layout: Some(&backdrop_pipeline_layout),
            vertex: wgpu::VertexState { module: &backdrop_shader, entry_point: "vs_fullscreen", buffers: &[] },
            fragment: Some(wgpu::FragmentState {
                module: &backdrop_shader,
                entry_point: "fs_backdrop",
                targets: &[Some(wgpu::ColorTargetState {
                    format: OUTPUT_FORMAT,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let composite_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("hyperscatter-composite-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let composite_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("hyperscatter-composite-sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let composite_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("hyperscatter-composite-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/composite.wgsl").into()),
        });
        let composite_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("hyperscatter-composite-pipeline-layout"),
            bind_group_layouts: &[&composite_bind_group_layout],
            push_constant_ranges: &[],
        });
        let composite_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("hyperscatter-composite-pipeline"),
            layout: Some(&composite_pipeline_layout),
            vertex: wgpu::VertexState { module: &composite_shader, entry_point: "vs_fullscreen", buffers: &[] },
            fragment: Some(wgpu::FragmentState {
                module: &composite_shader,
                entry_point: "fs_composite",
                targets: &[Some(wgpu::ColorTargetState {
                    format: OUTPUT_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        GpuState {
            device,
            queue,
            view_bind_group_layout,
            view_uniform_buffer,
            view_bind_group,
            palette_texture,
            palette_view,
            palette_sampler,
            circle_pipeline,
            square_pipeline,
            overlay_pipeline,
            backdrop_bind_group_layout,
            backdrop_uniform_buffer,
            backdrop_pipeline,
            composite_bind_group_layout,
            composite_sampler,
            composite_pipeline,
            backdrop_target: None,
            points_target: None,
            output_target: None,
            base_instances: None,
            lod_instances: None,
            selection_instances: None,
            hover_instance: None,
        }
    }

    pub fn upload_palette(&mut self, rgba_bytes: &[u8], width: u32) {
        if self.palette_texture.size().width != width {
            self.palette_texture = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("hyperscatter-palette"),
                size: wgpu::Extent3d { width: width.max(1), height: 1, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            self.palette_view = self.palette_texture.create_view(&wgpu::TextureViewDescriptor::default());
            self.view_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("hyperscatter-points-view-bind-group"),
                layout: &self.view_bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry { binding: 0, resource: self.view_uniform_buffer.as_entire_binding() },
                    wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(&self.palette_view) },
                    wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::Sampler(&self.palette_sampler) },
                ],
            });
        }
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.palette_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba_bytes,
            wgpu::ImageDataLayout { offset: 0, bytes_per_row: Some(width * 4), rows_per_image: None },
            wgpu::Extent3d { width, height: 1, depth_or_array_layers: 1 },
        );
    }

    fn upload_instances(&self, points: &[PointInstance], label: &str) -> (wgpu::Buffer, u32) {
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(points),
            usage: wgpu::BufferUsages::VERTEX,
        });
        (buffer, points.len() as u32)
    }

    pub fn upload_base_points(&mut self, points: &[PointInstance]) {
        self.base_instances = Some(self.upload_instances(points, "hyperscatter-base-instances"));
    }

    pub fn upload_lod_points(&mut self, points: &[PointInstance]) {
        self.lod_instances = Some(self.upload_instances(points, "hyperscatter-lod-instances"));
    }

    pub fn upload_selection_points(&mut self, points: &[PointInstance]) {
        self.selection_instances = Some(self.upload_instances(points, "hyperscatter-selection-instances"));
    }

    pub fn upload_hover_point(&mut self, point: Option<PointInstance>) {
        self.hover_instance = point.map(|p| self.upload_instances(&[p], "hyperscatter-hover-instance"));
    }

    pub fn write_view_uniform(&self, view: &ViewState, width: u32, height: u32, dpr: f32, point_radius_px: f32) {
        let data = match *view {
            ViewState::Euclidean { center_x, center_y, zoom } => {
                let s = width.min(height) as f32 * 0.4 * zoom;
                ViewUniformData {
                    center_and_scale: [center_x, center_y, s, s],
                    viewport: [width as f32, height as f32, dpr, point_radius_px],
                    mobius_a: [0.0, 0.0, 0.0, 0.0],
                }
            }
            ViewState::Poincare { ax, ay, display_zoom } => {
                let r = width.min(height) as f32 * 0.45 * display_zoom;
                ViewUniformData {
                    center_and_scale: [0.0, 0.0, 0.0, 0.0],
                    viewport: [width as f32, height as f32, dpr, point_radius_px],
                    mobius_a: [ax, ay, r, 1.0],
                }
            }
        };
        self.queue.write_buffer(&self.view_uniform_buffer, 0, bytemuck::bytes_of(&data));
    }

    fn ensure_backdrop_target(&mut self, key: BackdropKey) -> bool {
        let needs_rebuild = match &self.backdrop_target {
            Some((_, _, existing)) => *existing != key,
            None => true,
        };
        if needs_rebuild {
            let texture = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("hyperscatter-backdrop-target"),
                size: wgpu::Extent3d { width: key.width.max(1), height: key.height.max(1), depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: OUTPUT_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            self.backdrop_target = Some((texture, view, key));
        }
        needs_rebuild
    }

    fn ensure_points_target(&mut self, width: u32, height: u32) {
        let needs_rebuild = match &self.points_target {
            Some((_, _, size)) => *size != (width, height),
            None => true,
        };
        if needs_rebuild {
            let texture = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("hyperscatter-points-target"),
                size: wgpu::Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: OUTPUT_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            self.points_target = Some((texture, view, (width, height)));
        }
    }

    fn ensure_output_target(&mut self, width: u32, height: u32) {
        let needs_rebuild = match &self.output_target {
            Some((_, _, size)) => *size != (width, height),
            None => true,
        };
        if needs_rebuild {
            let texture = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("hyperscatter-output-target"),
                size: wgpu::Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: OUTPUT_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            self.output_target = Some((texture, view, (width, height)));
        }
    }

    pub fn output_texture(&self) -> Option<&wgpu::Texture> {
        self.output_target.as_ref().map(|(t, _, _)| t)
    }

    /// Runs the full §4.5 render sequence: backdrop (cached, rebuilt only
    /// on a size/dpr/zoom change), offscreen points pass (base or LOD,
    /// then overlays unless actively interacting), then the composite pass
    /// onto `output_target`.
    #[allow(clippy::too_many_arguments)]
    pub fn render_frame(
        &mut self,
        opts: &RendererOptions,
        points_width: u32,
        points_height: u32,
        output_width: u32,
        output_height: u32,
        is_poincare: bool,
        backdrop_key: Option<BackdropKey>,
        draw_lod: bool,
        draw_overlays: bool,
        shape_squares: bool,
    ) {
        self.ensure_points_target(points_width, points_height);
        self.ensure_output_target(output_width, output_height);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("hyperscatter-frame-encoder"),
        });

        if let Some(key) = backdrop_key {
            let rebuilt = self.ensure_backdrop_target(key);
            if rebuilt {
                let data = BackdropUniformData {
                    viewport: [key.width as f32, key.height as f32, 0.0, 0.0],
                    fill_color: color_to_array(opts.poincare_disk_fill_color),
                    border_color: color_to_array(opts.poincare_disk_border_color),
                    grid_color: color_to_array(opts.poincare_grid_color),
                    widths: [opts.poincare_disk_border_width_px, opts.poincare_grid_width_px, 0.0, 0.0],
                };
                self.queue.write_buffer(&self.backdrop_uniform_buffer, 0, bytemuck::bytes_of(&data));

                let backdrop_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("hyperscatter-backdrop-bind-group"),
                    layout: &self.backdrop_bind_group_layout,
                    entries: &[wgpu::BindGroupEntry { binding: 0, resource: self.backdrop_uniform_buffer.as_entire_binding() }],
                });

                let (_, view, _) = self.backdrop_target.as_ref().unwrap();
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("hyperscatter-backdrop-pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations { load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT), store: wgpu::StoreOp::Store },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                pass.set_pipeline(&self.backdrop_pipeline);
                pass.set_bind_group(0, &backdrop_bind_group, &[]);
                pass.draw(0..3, 0..1);
            }
        }

        {
            let (_, points_view, _) = self.points_target.as_ref().unwrap();
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("hyperscatter-points-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: points_view,
                    resolve_target: None,
                    ops: wgpu::Operations { load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT), store: wgpu::StoreOp::Store },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let base_pipeline = if shape_squares { &self.square_pipeline } else { &self.circle_pipeline };
            pass.set_pipeline(base_pipeline);
            pass.set_bind_group(0, &self.view_bind_group, &[]);

            let base = if draw_lod { &self.lod_instances } else { &self.base_instances };
            if let Some((buffer, count)) = base {
                pass.set_vertex_buffer(0, buffer.slice(..));
                pass.draw(0..4, 0..*count);
            }

            if draw_overlays {
                pass.set_pipeline(&self.overlay_pipeline);
                if let Some((buffer, count)) = &self.selection_instances {
                    pass.set_vertex_buffer(0, buffer.slice(..));
                    pass.draw(0..4, 0..*count);
                }
                if let Some((buffer, count)) = &self.hover_instance {
                    pass.set_vertex_buffer(0, buffer.slice(..));
                    pass.draw(0..4, 0..*count);
                }
            }
        }

        {
            let backdrop_view = self
                .backdrop_target
                .as_ref()
                .map(|(_, v, _)| v)
                .unwrap_or_else(|| &self.points_target.as_ref().unwrap().1);
            let (_, points_view, _) = self.points_target.as_ref().unwrap();

            let composite_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("hyperscatter-composite-bind-group"),
                layout: &self.composite_bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(backdrop_view) },
                    wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(points_view) },
                    wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::Sampler(&self.composite_sampler) },
                ],
            });

            let (_, output_view, _) = self.output_target.as_ref().unwrap();
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("hyperscatter-composite-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: output_view,
                    resolve_target: None,
                    ops: wgpu::Operations { load: wgpu::LoadOp::Clear(wgpu::Color::BLACK), store: wgpu::StoreOp::Store },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.composite_pipeline);
            pass.set_bind_group(0, &composite_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        let _ = is_poincare;
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

fn color_to_array(c: crate::renderer::Rgba) -> [f32; 4] {
    [c.r, c.g, c.b, c.a]
}
