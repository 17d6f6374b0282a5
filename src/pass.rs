// Ribofluid - GPU Stable-Fluids Simulator
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

// One WGSL fragment program per pass, drawn over the shared quad.
// Binding 0 is the uniform block, 1..=TEXTURE_SLOTS the inputs in order.

use std::collections::HashMap;

use bytemuck::Pod;
use wgpu::util::DeviceExt;

use crate::error::{FluidError, Result};
use crate::field::{FieldSet, TextureRef};
use crate::geometry::FullscreenQuad;
use crate::gpu::GpuContext;

const COMMON_WGSL: &str = include_str!("../shaders/common.wgsl");

pub trait PassParams {
    /// Partial parameter set. Fields left `None` keep their current value.
    type Update: Default;
    /// Uniform block uploaded at binding 0.
    type Uniforms: Pod;

    const LABEL: &'static str;
    /// Fragment stage source. `common.wgsl` is prepended.
    const SOURCE: &'static str;
    const TEXTURE_SLOTS: usize;

    fn apply(&mut self, update: Self::Update);
    fn uniforms(&self) -> Self::Uniforms;
    fn textures(&self) -> Vec<Option<TextureRef>>;
}

/// Overwrites `slot` when `value` carries something.
pub(crate) fn merge<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// Everything a [`Renderer`] needs to issue one draw.
pub struct Drawable<'a> {
    pub label: &'static str,
    pub pipeline: &'a wgpu::RenderPipeline,
    pub layout: &'a wgpu::BindGroupLayout,
    pub uniforms: &'a wgpu::Buffer,
    pub textures: Vec<Option<TextureRef>>,
}

pub struct Pass<P: PassParams> {
    params: P,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    uploaded: Vec<u8>,
}

impl<P: PassParams> Pass<P> {
    pub fn new(device: &wgpu::Device, params: P, target: wgpu::TextureFormat) -> Self {
        Self::with_constants(device, params, target, &[])
    }

    /// Builds the pass with pipeline-overridable constants specialised.
    pub fn with_constants(
        device: &wgpu::Device,
        params: P,
        target: wgpu::TextureFormat,
        constants: &[(&str, f64)],
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(P::LABEL),
            source: wgpu::ShaderSource::Wgsl(format!("{COMMON_WGSL}\n{}", P::SOURCE).into()),
        });

        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }];
        entries.extend((0..P::TEXTURE_SLOTS).map(|slot| wgpu::BindGroupLayoutEntry {
            binding: slot as u32 + 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        }));
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(P::LABEL),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(P::LABEL),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let constants: HashMap<String, f64> = constants
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect();

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(P::LABEL),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[FullscreenQuad::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: target,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions {
                    constants: &constants,
                    ..Default::default()
                },
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        let uniforms = params.uniforms();
        let uploaded = bytemuck::bytes_of(&uniforms).to_vec();
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(P::LABEL),
            contents: &uploaded,
            usage: wgpu::BufferUsages::UNIFORM,
        });

        Self {
            params,
            pipeline,
            bind_group_layout,
            uniform_buffer,
            uploaded,
        }
    }

    pub fn params(&self) -> &P {
        &self.params
    }

    pub fn update(&mut self, update: P::Update) {
        self.params.apply(update);
    }

    /// Current drawable. A changed uniform block gets a fresh buffer instead of
    /// an in-place write, so draws already recorded into the same encoder keep
    /// the values they were recorded with.
    pub fn drawable(&mut self, device: &wgpu::Device) -> Drawable<'_> {
        let uniforms = self.params.uniforms();
        let bytes = bytemuck::bytes_of(&uniforms);
        if bytes != self.uploaded.as_slice() {
            self.uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(P::LABEL),
                contents: bytes,
                usage: wgpu::BufferUsages::UNIFORM,
            });
            self.uploaded = bytes.to_vec();
        }
        Drawable {
            label: P::LABEL,
            pipeline: &self.pipeline,
            layout: &self.bind_group_layout,
            uniforms: &self.uniform_buffer,
            textures: self.params.textures(),
        }
    }
}

/// Records draws for one frame into a single command encoder.
pub struct Renderer<'a> {
    gpu: &'a GpuContext,
    encoder: wgpu::CommandEncoder,
    target: Option<TextureRef>,
}

impl<'a> Renderer<'a> {
    pub fn new(gpu: &'a GpuContext, label: &str) -> Self {
        let encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
        Self {
            gpu,
            encoder,
            target: None,
        }
    }

    pub fn device(&self) -> &'a wgpu::Device {
        &self.gpu.device
    }

    pub fn set_render_target(&mut self, target: TextureRef) {
        self.target = Some(target);
    }

    pub fn render_target(&self) -> Option<TextureRef> {
        self.target
    }

    /// Draws into the field slot last bound with [`Self::set_render_target`].
    pub fn render(&mut self, fields: &FieldSet, drawable: Drawable<'_>) -> Result<()> {
        let target = self.target.ok_or(FluidError::NoRenderTarget {
            pass: drawable.label,
        })?;
        if drawable.textures.contains(&Some(target)) {
            return Err(FluidError::ReadWriteAlias {
                pass: drawable.label,
            });
        }
        let view = fields.view(target)?;
        self.encode(fields, &drawable, view)
    }

    /// Draws into an arbitrary view, typically a swapchain or capture texture.
    pub fn render_to_view(
        &mut self,
        fields: &FieldSet,
        drawable: Drawable<'_>,
        view: &wgpu::TextureView,
    ) -> Result<()> {
        self.encode(fields, &drawable, view)
    }

    fn encode(
        &mut self,
        fields: &FieldSet,
        drawable: &Drawable<'_>,
        view: &wgpu::TextureView,
    ) -> Result<()> {
        let views = drawable
            .textures
            .iter()
            .enumerate()
            .map(|(slot, texture)| {
                let handle = texture.ok_or(FluidError::UnboundTexture {
                    pass: drawable.label,
                    slot,
                })?;
                fields.view(handle)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: drawable.uniforms.as_entire_binding(),
        }];
        entries.extend(views.iter().enumerate().map(|(slot, view)| wgpu::BindGroupEntry {
            binding: slot as u32 + 1,
            resource: wgpu::BindingResource::TextureView(view),
        }));
        let bind_group = self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(drawable.label),
            layout: drawable.layout,
            entries: &entries,
        });

        let quad = self.gpu.quad();
        let mut pass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(drawable.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(drawable.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.set_vertex_buffer(0, quad.buffer().slice(..));
        pass.draw(0..quad.vertex_count(), 0..1);
        Ok(())
    }

    pub fn submit(self) {
        let queue = &self.gpu.queue;
        queue.submit(std::iter::once(self.encoder.finish()));
    }
}
