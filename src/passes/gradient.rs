// Ribofluid - GPU Stable-Fluids Simulator
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

use bytemuck::{Pod, Zeroable};

use crate::field::TextureRef;
use crate::pass::{merge, Pass, PassParams};

/// `v' = v - scale * (p_r - p_l, p_t - p_b)`. Without a pressure field the
/// velocity passes through unchanged.
#[derive(Clone, Debug, PartialEq)]
pub struct GradientParams {
    pub scale: f32,
    pub velocity: Option<TextureRef>,
    pub pressure: Option<TextureRef>,
}

impl Default for GradientParams {
    fn default() -> Self {
        Self {
            scale: 0.5,
            velocity: None,
            pressure: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct GradientUpdate {
    pub scale: Option<f32>,
    pub velocity: Option<TextureRef>,
    pub pressure: Option<Option<TextureRef>>,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct GradientUniforms {
    scale: f32,
    has_pressure: u32,
    _pad: [f32; 2],
}

impl PassParams for GradientParams {
    type Update = GradientUpdate;
    type Uniforms = GradientUniforms;

    const LABEL: &'static str = "Gradient Subtraction";
    const SOURCE: &'static str = include_str!("../../shaders/gradient.wgsl");
    const TEXTURE_SLOTS: usize = 2;

    fn apply(&mut self, update: GradientUpdate) {
        merge(&mut self.scale, update.scale);
        merge(&mut self.velocity, update.velocity.map(Some));
        merge(&mut self.pressure, update.pressure);
    }

    fn uniforms(&self) -> GradientUniforms {
        GradientUniforms {
            scale: self.scale,
            has_pressure: self.pressure.is_some() as u32,
            _pad: [0.0; 2],
        }
    }

    fn textures(&self) -> Vec<Option<TextureRef>> {
        vec![self.velocity, self.pressure.or(self.velocity)]
    }
}

pub type GradientSubtractionPass = Pass<GradientParams>;
