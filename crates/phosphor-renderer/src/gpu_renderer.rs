//! wgpu frame renderer
//!
//! Draws the generated effect shader as a fullscreen triangle over the
//! uploaded text texture. Offscreen draws go to an RGBA8 target that can be
//! read back for export; the preview draws straight into a surface view.

use std::collections::HashMap;
use std::sync::mpsc;

use image::RgbaImage;
use phosphor_core::EffectParameters;
use wgpu::util::DeviceExt;

use crate::bitmap::TextureBitmap;
use crate::error::RenderError;
use crate::gpu::GpuContext;
use crate::shaders::{CrtUniforms, ShaderGenerator};
use crate::stages::StagePlan;
use crate::traits::{FrameRenderer, FrameStatus};

/// Format of the source texture and the offscreen target
pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

pub struct GpuFrameRenderer {
    context: GpuContext,
    width: u32,
    height: u32,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    source_texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    target_texture: wgpu::Texture,
    target_view: wgpu::TextureView,
    readback_buffer: wgpu::Buffer,
    padded_bytes_per_row: u32,
    pipelines: HashMap<(u32, wgpu::TextureFormat), wgpu::RenderPipeline>,
    uploaded: bool,
    has_frame: bool,
}

impl GpuFrameRenderer {
    pub fn new(context: GpuContext, width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let device = &context.device;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("CRT Bind Group Layout"),
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

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("CRT Uniform Buffer"),
            contents: bytemuck::bytes_of(&CrtUniforms::new(
                &EffectParameters::default(),
                0.0,
                (width, height),
                (width, height),
            )),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let extent = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let source_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Text Texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let source_view = source_texture.create_view(&Default::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Text Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("CRT Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&source_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let target_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("CRT Render Target"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let target_view = target_texture.create_view(&Default::default());

        let padded_bytes_per_row = align_to(width * 4, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let readback_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("CRT Readback Buffer"),
            size: padded_bytes_per_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            context,
            width,
            height,
            bind_group_layout,
            uniform_buffer,
            source_texture,
            bind_group,
            target_texture,
            target_view,
            readback_buffer,
            padded_bytes_per_row,
            pipelines: HashMap::new(),
            uploaded: false,
            has_frame: false,
        }
    }

    /// Headless renderer on a fresh device
    pub fn headless(width: u32, height: u32) -> Result<Self, RenderError> {
        Ok(Self::new(GpuContext::new_headless()?, width, height))
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    /// Draw into an arbitrary view, e.g. a window surface texture
    ///
    /// Scanline frequency follows the height of the view being drawn.
    pub fn render_to_view(
        &mut self,
        view: &wgpu::TextureView,
        format: wgpu::TextureFormat,
        target_size: (u32, u32),
        params: &EffectParameters,
        time_seconds: f32,
    ) -> Result<FrameStatus, RenderError> {
        if !self.uploaded {
            return Ok(FrameStatus::Skipped);
        }

        let plan = StagePlan::from_params(params);
        let key = (plan.key(), format);
        if !self.pipelines.contains_key(&key) {
            let pipeline = self.build_pipeline(&plan, format)?;
            self.pipelines.insert(key, pipeline);
        }
        let Some(pipeline) = self.pipelines.get(&key) else {
            return Ok(FrameStatus::Skipped);
        };

        let uniforms = CrtUniforms::new(params, time_seconds, target_size, (self.width, self.height));
        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let clear = uniforms.clear_color;
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("CRT Frame Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("CRT Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear[0] as f64,
                            g: clear[1] as f64,
                            b: clear[2] as f64,
                            a: clear[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        self.context.queue.submit(Some(encoder.finish()));

        Ok(FrameStatus::Drawn)
    }

    fn build_pipeline(
        &self,
        plan: &StagePlan,
        format: wgpu::TextureFormat,
    ) -> Result<wgpu::RenderPipeline, RenderError> {
        let device = &self.context.device;
        let label = ShaderGenerator::label(plan);
        let source = ShaderGenerator::generate(plan);

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("CRT Pipeline Layout"),
            bind_group_layouts: &[&self.bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::ShaderCompile {
                label,
                diagnostic: error.to_string(),
            });
        }

        log::debug!("Compiled pipeline '{}' for {:?}", label, format);
        Ok(pipeline)
    }
}

impl FrameRenderer for GpuFrameRenderer {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn upload_texture(&mut self, bitmap: &TextureBitmap) -> Result<(), RenderError> {
        if bitmap.size() != self.size() {
            return Err(RenderError::SizeMismatch {
                expected: self.size(),
                actual: bitmap.size(),
            });
        }

        self.context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.source_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bitmap.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.width * 4),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.uploaded = true;
        Ok(())
    }

    fn render_frame(
        &mut self,
        params: &EffectParameters,
        time_seconds: f32,
    ) -> Result<FrameStatus, RenderError> {
        // The view is cloned out so `render_to_view` can borrow self mutably
        let view = self.target_view.clone();
        let status =
            self.render_to_view(&view, TEXTURE_FORMAT, self.size(), params, time_seconds)?;
        if status == FrameStatus::Drawn {
            self.has_frame = true;
        }
        Ok(status)
    }

    fn read_pixels(&mut self) -> Result<RgbaImage, RenderError> {
        if !self.has_frame {
            return Err(RenderError::NoFrame);
        }
        let device = &self.context.device;

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("CRT Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.target_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.readback_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.context.queue.submit(Some(encoder.finish()));

        let slice = self.readback_buffer.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device
            .poll(wgpu::PollType::Wait)
            .map_err(|e| RenderError::Readback(format!("device poll failed: {:?}", e)))?;
        rx.recv()
            .map_err(|_| RenderError::Readback("map callback never ran".to_string()))?
            .map_err(|e| RenderError::Readback(format!("buffer map failed: {:?}", e)))?;

        let row_bytes = self.width as usize * 4;
        let mut pixels = Vec::with_capacity(row_bytes * self.height as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks(self.padded_bytes_per_row as usize) {
                pixels.extend_from_slice(&row[..row_bytes]);
            }
        }
        self.readback_buffer.unmap();

        RgbaImage::from_raw(self.width, self.height, pixels)
            .ok_or_else(|| RenderError::Readback("readback size mismatch".to_string()))
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}
