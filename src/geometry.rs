// Ribofluid - GPU Stable-Fluids Simulator
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

use wgpu::util::DeviceExt;

/// Two triangles covering clip space, shared by every pass.
pub const QUAD_VERTICES: [[f32; 2]; 6] = [
    [-1.0, -1.0],
    [1.0, -1.0],
    [1.0, 1.0],
    [1.0, 1.0],
    [-1.0, 1.0],
    [-1.0, -1.0],
];

pub struct FullscreenQuad {
    buffer: wgpu::Buffer,
}

impl FullscreenQuad {
    const ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Fullscreen Quad"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self { buffer }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn vertex_count(&self) -> u32 {
        QUAD_VERTICES.len() as u32
    }
}

/// Simulation grid size for a viewport and resolution scale. Never zero.
pub fn scaled_resolution(viewport: [u32; 2], scale: f32) -> [u32; 2] {
    let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
    [
        ((viewport[0] as f32 * scale).round() as u32).max(1),
        ((viewport[1] as f32 * scale).round() as u32).max(1),
    ]
}

/// Aspect correction applied to splat coordinates: `(w / h, 1)`.
pub fn aspect(resolution: [u32; 2]) -> [f32; 2] {
    [resolution[0].max(1) as f32 / resolution[1].max(1) as f32, 1.0]
}

/// Maps a window pixel position to aspect-corrected simulation space with y up.
pub fn normalize_pointer(position: [f32; 2], window: [u32; 2], aspect: [f32; 2]) -> [f32; 2] {
    let w = window[0].max(1) as f32;
    let h = window[1].max(1) as f32;
    [position[0] / w * aspect[0], 1.0 - position[1] / h]
}
