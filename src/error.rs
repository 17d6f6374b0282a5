// Ribofluid - GPU Stable-Fluids Simulator
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

use thiserror::Error;

use crate::field::TextureRef;

#[derive(Error, Debug)]
pub enum FluidError {
    #[error("No compatible GPU adapter found")]
    NoAdapter,
    #[error("Failed to open GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("GPU cannot render to and sample {format:?} textures; floating-point render targets are required")]
    UnsupportedHardware { format: wgpu::TextureFormat },
    #[error("Texture handle {0:?} does not name a live buffer")]
    StaleTexture(TextureRef),
    #[error("Pass `{pass}` has no texture bound for slot {slot}")]
    UnboundTexture { pass: &'static str, slot: usize },
    #[error("Pass `{pass}` was drawn before any render target was acquired")]
    NoRenderTarget { pass: &'static str },
    #[error("Pass `{pass}` samples the buffer it is writing")]
    ReadWriteAlias { pass: &'static str },
    #[error("Upload of {got} bytes does not match field `{field}` ({expected} bytes)")]
    UploadSize {
        field: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("Failed to map readback buffer: {0}")]
    Readback(#[from] wgpu::BufferAsyncError),
    #[error("Readback channel closed before the GPU answered")]
    ReadbackChannel,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T, E = FluidError> = std::result::Result<T, E>;
