// Ribofluid - GPU Stable-Fluids Simulator
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

use crate::error::{FluidError, Result};
use crate::field::ChannelFormat;
use crate::geometry::FullscreenQuad;

/// Adapter, device and queue plus the quad geometry every pass draws.
pub struct GpuContext {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    quad: FullscreenQuad,
}

impl GpuContext {
    /// Opens a device without any presentation surface.
    pub async fn headless() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(FluidError::NoAdapter)?;
        Self::from_adapter(adapter).await
    }

    pub async fn for_surface(
        instance: &wgpu::Instance,
        surface: &wgpu::Surface<'_>,
    ) -> Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(FluidError::NoAdapter)?;
        Self::from_adapter(adapter).await
    }

    async fn from_adapter(adapter: wgpu::Adapter) -> Result<Self> {
        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);

        check_float_targets(&adapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Fluid Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let quad = FullscreenQuad::new(&device);
        Ok(Self {
            adapter,
            device,
            queue,
            quad,
        })
    }

    pub fn quad(&self) -> &FullscreenQuad {
        &self.quad
    }
}

/// Startup precondition: the simulation fields must be renderable, sampleable
/// and copyable float textures. There is no fallback path.
pub fn check_float_targets(adapter: &wgpu::Adapter) -> Result<()> {
    let format = ChannelFormat::Float.texture_format();
    let required = wgpu::TextureUsages::RENDER_ATTACHMENT
        | wgpu::TextureUsages::TEXTURE_BINDING
        | wgpu::TextureUsages::COPY_SRC
        | wgpu::TextureUsages::COPY_DST;
    let features = adapter.get_texture_format_features(format);
    if features.allowed_usages.contains(required) {
        Ok(())
    } else {
        Err(FluidError::UnsupportedHardware { format })
    }
}
