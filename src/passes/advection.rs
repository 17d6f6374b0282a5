// Ribofluid - GPU Stable-Fluids Simulator
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

use bytemuck::{Pod, Zeroable};

use crate::field::TextureRef;
use crate::pass::{merge, Pass, PassParams};

/// Backward trace `fract(uv - dt * v(uv))`, attenuated by `1 - decay`.
#[derive(Clone, Debug, PartialEq)]
pub struct AdvectionParams {
    pub dt: f32,
    pub decay: f32,
    pub input: Option<TextureRef>,
    pub velocity: Option<TextureRef>,
}

impl AdvectionParams {
    pub fn new(dt: f32, decay: f32) -> Self {
        Self {
            dt,
            decay,
            input: None,
            velocity: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AdvectionUpdate {
    pub dt: Option<f32>,
    pub decay: Option<f32>,
    pub input: Option<TextureRef>,
    pub velocity: Option<TextureRef>,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct AdvectionUniforms {
    dt: f32,
    decay: f32,
    _pad: [f32; 2],
}

impl PassParams for AdvectionParams {
    type Update = AdvectionUpdate;
    type Uniforms = AdvectionUniforms;

    const LABEL: &'static str = "Advection";
    const SOURCE: &'static str = include_str!("../../shaders/advection.wgsl");
    const TEXTURE_SLOTS: usize = 2;

    fn apply(&mut self, update: AdvectionUpdate) {
        merge(&mut self.dt, update.dt);
        merge(&mut self.decay, update.decay);
        merge(&mut self.input, update.input.map(Some));
        merge(&mut self.velocity, update.velocity.map(Some));
    }

    fn uniforms(&self) -> AdvectionUniforms {
        AdvectionUniforms {
            dt: self.dt,
            decay: self.decay,
            _pad: [0.0; 2],
        }
    }

    fn textures(&self) -> Vec<Option<TextureRef>> {
        vec![self.input, self.velocity]
    }
}

pub type AdvectionPass = Pass<AdvectionParams>;
