// Ribofluid - GPU Stable-Fluids Simulator
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

// Copying field slots and composed frames back to the CPU.

use std::path::{Path, PathBuf};

use crate::config::FluidConfig;
use crate::error::{FluidError, Result};
use crate::field::{ChannelFormat, FieldSet, TextureRef};
use crate::gpu::GpuContext;
use crate::pass::Renderer;
use crate::simulation::{FluidSimulation, FrameState};

/// CPU copy of one texture, rows top to bottom, every format widened to f32.
#[derive(Clone, Debug)]
pub struct FieldSnapshot {
    pub width: u32,
    pub height: u32,
    pub texels: Vec<[f32; 4]>,
}

impl FieldSnapshot {
    pub fn at(&self, x: u32, y: u32) -> [f32; 4] {
        self.texels[(y * self.width + x) as usize]
    }

    /// Texel under `uv` (y up), nearest neighbour.
    pub fn at_uv(&self, uv: [f32; 2]) -> [f32; 4] {
        let x = (uv[0] * self.width as f32).floor() as i64;
        let y = ((1.0 - uv[1]) * self.height as f32).floor() as i64;
        let x = x.clamp(0, self.width as i64 - 1) as u32;
        let y = y.clamp(0, self.height as i64 - 1) as u32;
        self.at(x, y)
    }

    pub fn abs_sum(&self, channel: usize) -> f32 {
        self.texels.iter().map(|texel| texel[channel].abs()).sum()
    }

    /// Sum of `|value|` over the square of texels within `half_width` of `center`.
    pub fn abs_sum_window(&self, channel: usize, center: [u32; 2], half_width: u32) -> f32 {
        let x0 = center[0].saturating_sub(half_width);
        let y0 = center[1].saturating_sub(half_width);
        let x1 = (center[0] + half_width).min(self.width - 1);
        let y1 = (center[1] + half_width).min(self.height - 1);
        (y0..=y1)
            .flat_map(|y| (x0..=x1).map(move |x| (x, y)))
            .map(|(x, y)| self.at(x, y)[channel].abs())
            .sum()
    }

    pub fn rms(&self, channel: usize) -> f32 {
        if self.texels.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.texels.iter().map(|texel| texel[channel] * texel[channel]).sum();
        (sum / self.texels.len() as f32).sqrt()
    }

    pub fn max_abs(&self, channel: usize) -> f32 {
        self.texels
            .iter()
            .map(|texel| texel[channel].abs())
            .fold(0.0, f32::max)
    }
}

fn padded_bytes_per_row(width: u32, bytes_per_texel: u32) -> u32 {
    let unpadded = width * bytes_per_texel;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Raw texel bytes of `texture`, row padding removed.
pub async fn read_texture_bytes(
    gpu: &GpuContext,
    texture: &wgpu::Texture,
    format: ChannelFormat,
    size: [u32; 2],
) -> Result<Vec<u8>> {
    let [width, height] = size;
    let bytes_per_texel = format.bytes_per_texel();
    let unpadded = (width * bytes_per_texel) as usize;
    let padded = padded_bytes_per_row(width, bytes_per_texel);

    let staging = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Staging"),
        size: (padded * height) as u64,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &staging,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    gpu.queue.submit(std::iter::once(encoder.finish()));

    let buffer_slice = staging.slice(..);
    let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    gpu.device.poll(wgpu::Maintain::Wait);
    receiver.receive().await.ok_or(FluidError::ReadbackChannel)??;

    let data = buffer_slice.get_mapped_range();
    let mut bytes = Vec::with_capacity(unpadded * height as usize);
    for row in data.chunks(padded as usize) {
        bytes.extend_from_slice(&row[..unpadded]);
    }
    drop(data);
    staging.unmap();

    Ok(bytes)
}

pub async fn read_texture(
    gpu: &GpuContext,
    texture: &wgpu::Texture,
    format: ChannelFormat,
    size: [u32; 2],
) -> Result<FieldSnapshot> {
    let bytes = read_texture_bytes(gpu, texture, format, size).await?;
    let texels = match format {
        ChannelFormat::Float => bytes
            .chunks_exact(16)
            .map(bytemuck::pod_read_unaligned::<[f32; 4]>)
            .collect(),
        ChannelFormat::Unorm => bytes
            .chunks_exact(4)
            .map(|px| {
                [
                    px[0] as f32 / 255.0,
                    px[1] as f32 / 255.0,
                    px[2] as f32 / 255.0,
                    px[3] as f32 / 255.0,
                ]
            })
            .collect(),
    };
    Ok(FieldSnapshot {
        width: size[0],
        height: size[1],
        texels,
    })
}

/// Reads the slot behind `handle` at its allocated size.
pub async fn read_field(
    gpu: &GpuContext,
    fields: &FieldSet,
    handle: TextureRef,
) -> Result<FieldSnapshot> {
    let texture = fields.texture(handle)?;
    let format = fields.format(handle)?;
    let size = fields.extent(handle)?;
    read_texture(gpu, texture, format, size).await
}

/// Composes `state` into an offscreen RGBA8 target of `size` and reads it back.
pub async fn capture_frame(
    gpu: &GpuContext,
    simulation: &mut FluidSimulation,
    state: &FrameState,
    config: &FluidConfig,
    size: [u32; 2],
) -> Result<image::RgbaImage> {
    let size = [size[0].max(1), size[1].max(1)];
    let format = ChannelFormat::Unorm;
    let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Capture"),
        size: wgpu::Extent3d {
            width: size[0],
            height: size[1],
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: format.texture_format(),
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let mut renderer = Renderer::new(gpu, "Fluid Capture");
    simulation.encode_composition(&mut renderer, state, config, &view, format.texture_format())?;
    renderer.submit();

    let bytes = read_texture_bytes(gpu, &texture, format, size).await?;
    let width = size[0];
    Ok(image::RgbaImage::from_fn(size[0], size[1], |x, y| {
        let i = ((y * width + x) * 4) as usize;
        image::Rgba([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]])
    }))
}

/// Writes `frame` as `<prefix>_<timestamp>.png` under `dir`.
pub fn save_capture(frame: &image::RgbaImage, dir: &Path, prefix: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f");
    let path = dir.join(format!("{prefix}_{timestamp}.png"));
    frame.save(&path)?;
    Ok(path)
}
