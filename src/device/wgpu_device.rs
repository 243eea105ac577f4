//! wgpu implementation of [`RenderDevice`].
//!
//! Each frame records into a single command encoder. Every fullscreen pass and
//! every geometry draw opens its own render pass with a freshly initialised
//! uniform buffer, so several draws sharing a program in one frame never see
//! each other's uniforms. The first pass to touch the surface clears it; later
//! passes load. The frame is submitted and presented in
//! [`end_frame`](RenderDevice::end_frame) without waiting on the GPU.

use std::collections::HashMap;
use std::sync::Arc;

use glam::Mat4;
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::{
    FullscreenPass, GeometryId, Output, OutputFormat, ProgramDescriptor, ProgramId, ProgramKind,
    RenderDevice, TargetDescriptor, TargetId,
};
use crate::color::Color;
use crate::error::{Error, Result};
use crate::geometry::{Geometry, Topology, Vertex};
use crate::gpu::GpuContext;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Model matrices for a geometry draw, bound at `@group(0) @binding(0)`.
///
/// # WGSL Declaration
///
/// ```wgsl
/// struct Model {
///     model: mat4x4f,
///     normal_matrix: mat4x4f,
/// }
/// @group(0) @binding(0) var<uniform> m: Model;
/// ```
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ModelUniforms {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
}

struct GpuTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

struct GpuProgram {
    label: String,
    kind: ProgramKind,
    shader: wgpu::ShaderModule,
    pipelines: HashMap<Topology, wgpu::RenderPipeline>,
}

struct GpuGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: Option<(wgpu::Buffer, u32)>,
    vertex_count: u32,
    topology: Topology,
}

struct BoundProgram {
    program: ProgramId,
    bind_group: wgpu::BindGroup,
}

struct FrameState {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
    surface_loaded: bool,
    depth_loaded: bool,
}

struct DepthBuffer {
    view: wgpu::TextureView,
    size: (u32, u32),
}

impl DepthBuffer {
    fn new(gpu: &GpuContext) -> Self {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Flare Depth Texture"),
            size: wgpu::Extent3d {
                width: gpu.width(),
                height: gpu.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            view,
            size: (gpu.width(), gpu.height()),
        }
    }
}

/// Renders to a window surface through wgpu.
pub struct WgpuDevice {
    gpu: GpuContext,
    clear_color: Color,
    next_id: u32,
    targets: HashMap<TargetId, GpuTarget>,
    programs: HashMap<ProgramId, GpuProgram>,
    geometries: HashMap<GeometryId, GpuGeometry>,
    fullscreen_layout: wgpu::BindGroupLayout,
    fullscreen_pipeline_layout: wgpu::PipelineLayout,
    model_layout: wgpu::BindGroupLayout,
    material_layout: wgpu::BindGroupLayout,
    mesh_pipeline_layout: wgpu::PipelineLayout,
    sampler: wgpu::Sampler,
    placeholder: wgpu::TextureView,
    depth: DepthBuffer,
    frame: Option<FrameState>,
    bound: Option<BoundProgram>,
}

impl WgpuDevice {
    /// Acquire a GPU for `window`.
    ///
    /// Fails with [`Error::MissingCapability`] when no usable adapter exists.
    pub fn new(window: Arc<Window>, vsync: bool) -> Result<Self> {
        let gpu = GpuContext::new(window, vsync)?;
        Ok(Self::from_context(gpu))
    }

    /// Wrap an existing [`GpuContext`].
    pub fn from_context(gpu: GpuContext) -> Self {
        let device = &gpu.device;

        let fullscreen_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Fullscreen Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        // Rgba32Float is not filterable without an optional feature.
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
            ],
        });

        let fullscreen_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Fullscreen Pipeline Layout"),
                bind_group_layouts: &[&fullscreen_layout],
                push_constant_ranges: &[],
            });

        let uniform_entry = wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Model Bind Group Layout"),
            entries: &[uniform_entry],
        });
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Bind Group Layout"),
            entries: &[uniform_entry],
        });
        let mesh_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&model_layout, &material_layout],
            push_constant_ranges: &[],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("State Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let placeholder = device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("Placeholder Input"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba16Float,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default());

        let depth = DepthBuffer::new(&gpu);

        Self {
            gpu,
            clear_color: Color::BLACK,
            next_id: 1,
            targets: HashMap::new(),
            programs: HashMap::new(),
            geometries: HashMap::new(),
            fullscreen_layout,
            fullscreen_pipeline_layout,
            model_layout,
            material_layout,
            mesh_pipeline_layout,
            sampler,
            placeholder,
            depth,
            frame: None,
            bound: None,
        }
    }

    /// The underlying wgpu objects, for plugins that record their own passes.
    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn acquire(&self) -> Result<wgpu::SurfaceTexture> {
        match self.gpu.surface.get_current_texture() {
            Ok(texture) => Ok(texture),
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                log::debug!("surface lost, reconfiguring");
                self.gpu.reconfigure();
                self.gpu
                    .surface
                    .get_current_texture()
                    .map_err(|e| Error::Surface(e.to_string()))
            }
            Err(e) => Err(Error::Surface(e.to_string())),
        }
    }

    fn build_pipeline(
        &self,
        label: &str,
        shader: &wgpu::ShaderModule,
        kind: ProgramKind,
        topology: Topology,
    ) -> wgpu::RenderPipeline {
        create_pipeline(
            &self.gpu,
            match kind {
                ProgramKind::Fullscreen { .. } => &self.fullscreen_pipeline_layout,
                ProgramKind::Mesh => &self.mesh_pipeline_layout,
            },
            label,
            shader,
            kind,
            topology,
        )
    }
}

fn create_pipeline(
    gpu: &GpuContext,
    layout: &wgpu::PipelineLayout,
    label: &str,
    shader: &wgpu::ShaderModule,
    kind: ProgramKind,
    topology: Topology,
) -> wgpu::RenderPipeline {
    let (format, blend, buffers, depth_stencil): (_, _, &[wgpu::VertexBufferLayout], _) =
        match kind {
            ProgramKind::Fullscreen {
                output: OutputFormat::Surface,
            } => (
                gpu.config.format,
                Some(wgpu::BlendState::REPLACE),
                &[],
                None,
            ),
            // Float32 targets are not blendable; state passes overwrite every texel.
            ProgramKind::Fullscreen {
                output: OutputFormat::State(precision),
            } => (precision.texture_format(), None, &[], None),
            ProgramKind::Mesh => (
                gpu.config.format,
                Some(wgpu::BlendState::ALPHA_BLENDING),
                &[Vertex::LAYOUT],
                Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
            ),
        };

    gpu.device
        .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs"),
                buffers,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: topology.into(),
                strip_index_format: topology.is_strip().then_some(wgpu::IndexFormat::Uint32),
                ..Default::default()
            },
            depth_stencil,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
}

fn uniform_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    label: &str,
    bytes: &[u8],
) -> wgpu::BindGroup {
    // Uniform bindings must be at least 16 bytes and a multiple of 16.
    let mut contents = bytes.to_vec();
    let padded = contents.len().max(16).next_multiple_of(16);
    contents.resize(padded, 0);

    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: &contents,
        usage: wgpu::BufferUsages::UNIFORM,
    });
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    })
}

impl RenderDevice for WgpuDevice {
    fn surface_size(&self) -> (u32, u32) {
        (self.gpu.width(), self.gpu.height())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
        if self.depth.size != (self.gpu.width(), self.gpu.height()) {
            self.depth = DepthBuffer::new(&self.gpu);
        }
    }

    fn begin_frame(&mut self) -> Result<()> {
        if self.frame.take().is_some() {
            log::debug!("discarding unfinished frame");
        }
        self.bound = None;

        let surface_texture = self.acquire()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Flare Frame Encoder"),
            });

        self.frame = Some(FrameState {
            surface_texture,
            view,
            encoder,
            surface_loaded: false,
            depth_loaded: false,
        });
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        let mut frame = self
            .frame
            .take()
            .ok_or_else(|| Error::Surface("no frame in flight".into()))?;

        if !frame.surface_loaded {
            frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Surface Clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color.into()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }

        self.gpu.queue.submit(std::iter::once(frame.encoder.finish()));
        frame.surface_texture.present();
        self.bound = None;
        Ok(())
    }

    fn clear(&mut self, color: Color) {
        self.clear_color = color;
        if let Some(frame) = self.frame.as_mut() {
            frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Surface Clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(color.into()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            frame.surface_loaded = true;
        }
    }

    fn create_target(&mut self, desc: &TargetDescriptor) -> Result<TargetId> {
        if !self.gpu.supports(desc.precision) {
            return Err(Error::allocation(
                desc.label,
                format!("{:?} is not renderable on this adapter", desc.precision.texture_format()),
            ));
        }
        if desc.width == 0 || desc.height == 0 {
            return Err(Error::allocation(desc.label, "zero-sized target"));
        }

        let device = &self.gpu.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        // New textures are zero-initialised, which is the documented reset value.
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.precision.texture_format(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let oom = pollster::block_on(device.pop_error_scope());
        let invalid = pollster::block_on(device.pop_error_scope());
        if let Some(err) = oom.or(invalid) {
            return Err(Error::allocation(desc.label, err));
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = TargetId(self.next_id());
        log::debug!("allocated {} {}x{} as {:?}", desc.label, desc.width, desc.height, id);
        self.targets.insert(
            id,
            GpuTarget {
                _texture: texture,
                view,
                width: desc.width,
                height: desc.height,
            },
        );
        Ok(id)
    }

    fn destroy_target(&mut self, target: TargetId) {
        self.targets.remove(&target);
    }

    fn target_size(&self, target: TargetId) -> Option<(u32, u32)> {
        self.targets.get(&target).map(|t| (t.width, t.height))
    }

    fn compile_program(&mut self, desc: &ProgramDescriptor) -> Result<ProgramId> {
        self.gpu
            .device
            .push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = self
            .gpu
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(desc.label),
                source: wgpu::ShaderSource::Wgsl(desc.source.into()),
            });
        // Mesh programs get further pipelines per topology on first use; building
        // the triangle-list one here surfaces shader errors at compile time.
        let pipeline = self.build_pipeline(desc.label, &shader, desc.kind, Topology::Triangles);

        if let Some(err) = pollster::block_on(self.gpu.device.pop_error_scope()) {
            return Err(Error::compile(desc.label, err));
        }

        let id = ProgramId(self.next_id());
        let mut pipelines = HashMap::new();
        pipelines.insert(Topology::Triangles, pipeline);
        self.programs.insert(
            id,
            GpuProgram {
                label: desc.label.to_string(),
                kind: desc.kind,
                shader,
                pipelines,
            },
        );
        Ok(id)
    }

    fn destroy_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        if self.bound.as_ref().is_some_and(|b| b.program == program) {
            self.bound = None;
        }
    }

    fn fullscreen(&mut self, pass: &FullscreenPass) -> Result<()> {
        let program = self
            .programs
            .get(&pass.program)
            .ok_or(Error::UnknownResource("program"))?;
        let pipeline = match program.kind {
            ProgramKind::Fullscreen { .. } => program
                .pipelines
                .get(&Topology::Triangles)
                .ok_or(Error::UnknownResource("program"))?,
            ProgramKind::Mesh => return Err(Error::UnknownResource("fullscreen program")),
        };

        let input = match pass.input {
            Some(id) => {
                &self
                    .targets
                    .get(&id)
                    .ok_or(Error::UnknownResource("target"))?
                    .view
            }
            None => &self.placeholder,
        };

        let uniforms = self
            .gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Fullscreen Uniforms"),
                contents: bytemuck::bytes_of(&pass.uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = self
            .gpu
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Fullscreen Bind Group"),
                layout: &self.fullscreen_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniforms.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(input),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            });

        let frame = self
            .frame
            .as_mut()
            .ok_or_else(|| Error::Surface("no frame in flight".into()))?;
        let (view, load) = match pass.output {
            Output::Surface => {
                let load = if frame.surface_loaded {
                    wgpu::LoadOp::Load
                } else {
                    wgpu::LoadOp::Clear(self.clear_color.into())
                };
                frame.surface_loaded = true;
                (&frame.view, load)
            }
            Output::Target(id) => (
                &self
                    .targets
                    .get(&id)
                    .ok_or(Error::UnknownResource("target"))?
                    .view,
                wgpu::LoadOp::Load,
            ),
        };

        let mut render_pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(program.label.as_str()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &bind_group, &[]);
        render_pass.draw(0..3, 0..1);
        Ok(())
    }

    fn upload_geometry(&mut self, geometry: &Geometry) -> Result<GeometryId> {
        let vertices = geometry.vertices();
        if vertices.is_empty() {
            return Err(Error::allocation("geometry", "no vertices"));
        }

        let vertex_buffer = self
            .gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Geometry Vertex Buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = geometry
            .indices
            .as_ref()
            .filter(|indices| !indices.is_empty())
            .map(|indices| {
                let buffer =
                    self.gpu
                        .device
                        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                            label: Some("Geometry Index Buffer"),
                            contents: bytemuck::cast_slice(indices),
                            usage: wgpu::BufferUsages::INDEX,
                        });
                (buffer, indices.len() as u32)
            });

        let id = GeometryId(self.next_id());
        self.geometries.insert(
            id,
            GpuGeometry {
                vertex_buffer,
                index_buffer,
                vertex_count: vertices.len() as u32,
                topology: geometry.draw_mode,
            },
        );
        Ok(id)
    }

    fn destroy_geometry(&mut self, geometry: GeometryId) {
        self.geometries.remove(&geometry);
    }

    fn bind_program(&mut self, program: ProgramId, uniforms: &[u8]) -> Result<()> {
        if !self.programs.contains_key(&program) {
            return Err(Error::UnknownResource("program"));
        }
        let bind_group = uniform_bind_group(
            &self.gpu.device,
            &self.material_layout,
            "Material Uniforms",
            uniforms,
        );
        self.bound = Some(BoundProgram {
            program,
            bind_group,
        });
        Ok(())
    }

    fn draw_geometry(&mut self, geometry: GeometryId, model: Mat4) -> Result<()> {
        let bound = self
            .bound
            .as_ref()
            .ok_or(Error::UnknownResource("bound program"))?;
        let mesh = self
            .geometries
            .get(&geometry)
            .ok_or(Error::UnknownResource("geometry"))?;
        let program = self
            .programs
            .get_mut(&bound.program)
            .ok_or(Error::UnknownResource("program"))?;
        if program.kind != ProgramKind::Mesh {
            return Err(Error::UnknownResource("mesh program"));
        }
        if !program.pipelines.contains_key(&mesh.topology) {
            let pipeline = create_pipeline(
                &self.gpu,
                &self.mesh_pipeline_layout,
                &program.label,
                &program.shader,
                program.kind,
                mesh.topology,
            );
            program.pipelines.insert(mesh.topology, pipeline);
        }
        let pipeline = program
            .pipelines
            .get(&mesh.topology)
            .ok_or(Error::UnknownResource("program"))?;

        let uniforms = ModelUniforms {
            model: model.to_cols_array_2d(),
            normal_matrix: model.inverse().transpose().to_cols_array_2d(),
        };
        let model_group = uniform_bind_group(
            &self.gpu.device,
            &self.model_layout,
            "Model Uniforms",
            bytemuck::bytes_of(&uniforms),
        );

        let frame = self
            .frame
            .as_mut()
            .ok_or_else(|| Error::Surface("no frame in flight".into()))?;
        let color_load = if frame.surface_loaded {
            wgpu::LoadOp::Load
        } else {
            wgpu::LoadOp::Clear(self.clear_color.into())
        };
        let depth_load = if frame.depth_loaded {
            wgpu::LoadOp::Load
        } else {
            wgpu::LoadOp::Clear(1.0)
        };

        {
            let mut render_pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Geometry Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &model_group, &[]);
            render_pass.set_bind_group(1, &bound.bind_group, &[]);
            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            match &mesh.index_buffer {
                Some((buffer, count)) => {
                    render_pass.set_index_buffer(buffer.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..*count, 0, 0..1);
                }
                None => render_pass.draw(0..mesh.vertex_count, 0..1),
            }
        }

        frame.surface_loaded = true;
        frame.depth_loaded = true;
        Ok(())
    }

    fn release(&mut self) {
        self.frame = None;
        self.bound = None;
    }
}
