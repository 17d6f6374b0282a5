// Ribofluid - GPU Stable-Fluids Simulator
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

use bytemuck::{Pod, Zeroable};

use crate::field::TextureRef;
use crate::pass::{merge, Pass, PassParams};

/// Which seed pattern an initialiser writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeedKind {
    /// `(sin(2π f·clip.y), sin(2π f·clip.x)) · amplitude`
    Velocity,
    /// `(uv.x, uv.y, blue, 1)`
    Color,
}

impl SeedKind {
    fn shader_constant(self) -> f64 {
        match self {
            SeedKind::Velocity => 0.0,
            SeedKind::Color => 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SeedParams {
    pub frequency: f32,
    pub amplitude: f32,
    pub blue: f32,
}

impl Default for SeedParams {
    fn default() -> Self {
        Self {
            frequency: 1.0,
            amplitude: 1.0,
            blue: 0.0,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SeedUpdate {
    pub frequency: Option<f32>,
    pub amplitude: Option<f32>,
    pub blue: Option<f32>,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct SeedUniforms {
    frequency: f32,
    amplitude: f32,
    blue: f32,
    _pad: f32,
}

impl PassParams for SeedParams {
    type Update = SeedUpdate;
    type Uniforms = SeedUniforms;

    const LABEL: &'static str = "Seed";
    const SOURCE: &'static str = include_str!("../../shaders/init.wgsl");
    const TEXTURE_SLOTS: usize = 0;

    fn apply(&mut self, update: SeedUpdate) {
        merge(&mut self.frequency, update.frequency);
        merge(&mut self.amplitude, update.amplitude);
        merge(&mut self.blue, update.blue);
    }

    fn uniforms(&self) -> SeedUniforms {
        SeedUniforms {
            frequency: self.frequency,
            amplitude: self.amplitude,
            blue: self.blue,
            _pad: 0.0,
        }
    }

    fn textures(&self) -> Vec<Option<TextureRef>> {
        Vec::new()
    }
}

pub type SeedPass = Pass<SeedParams>;

impl Pass<SeedParams> {
    pub fn seed(device: &wgpu::Device, kind: SeedKind, target: wgpu::TextureFormat) -> Self {
        Self::with_constants(
            device,
            SeedParams::default(),
            target,
            &[("SEED_KIND", kind.shader_constant())],
        )
    }
}
