// Ribofluid - GPU Stable-Fluids Simulator
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

use bytemuck::{Pod, Zeroable};

use crate::field::TextureRef;
use crate::pass::{merge, Pass, PassParams};

/// Central-difference divergence, `(x1 - x0 + y1 - y0) * scale`.
#[derive(Clone, Debug, PartialEq)]
pub struct DivergenceParams {
    pub scale: f32,
    pub velocity: Option<TextureRef>,
}

impl Default for DivergenceParams {
    fn default() -> Self {
        Self {
            scale: 0.5,
            velocity: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DivergenceUpdate {
    pub scale: Option<f32>,
    pub velocity: Option<TextureRef>,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct DivergenceUniforms {
    scale: f32,
    _pad: [f32; 3],
}

impl PassParams for DivergenceParams {
    type Update = DivergenceUpdate;
    type Uniforms = DivergenceUniforms;

    const LABEL: &'static str = "Divergence";
    const SOURCE: &'static str = include_str!("../../shaders/divergence.wgsl");
    const TEXTURE_SLOTS: usize = 1;

    fn apply(&mut self, update: DivergenceUpdate) {
        merge(&mut self.scale, update.scale);
        merge(&mut self.velocity, update.velocity.map(Some));
    }

    fn uniforms(&self) -> DivergenceUniforms {
        DivergenceUniforms {
            scale: self.scale,
            _pad: [0.0; 3],
        }
    }

    fn textures(&self) -> Vec<Option<TextureRef>> {
        vec![self.velocity]
    }
}

pub type DivergencePass = Pass<DivergenceParams>;
