// Ribofluid - GPU Stable-Fluids Simulator
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

use bytemuck::{Pod, Zeroable};

use crate::field::TextureRef;
use crate::pass::{merge, Pass, PassParams};

/// Edge texels (within one derivative-measured texel of a wall) have their
/// velocity scaled by `wall_factor`.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundaryParams {
    pub wall_factor: f32,
    pub velocity: Option<TextureRef>,
}

impl Default for BoundaryParams {
    fn default() -> Self {
        Self {
            wall_factor: -1.0,
            velocity: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct BoundaryUpdate {
    pub wall_factor: Option<f32>,
    pub velocity: Option<TextureRef>,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct BoundaryUniforms {
    wall_factor: f32,
    _pad: [f32; 3],
}

impl PassParams for BoundaryParams {
    type Update = BoundaryUpdate;
    type Uniforms = BoundaryUniforms;

    const LABEL: &'static str = "Boundary";
    const SOURCE: &'static str = include_str!("../../shaders/boundary.wgsl");
    const TEXTURE_SLOTS: usize = 1;

    fn apply(&mut self, update: BoundaryUpdate) {
        merge(&mut self.wall_factor, update.wall_factor);
        merge(&mut self.velocity, update.velocity.map(Some));
    }

    fn uniforms(&self) -> BoundaryUniforms {
        BoundaryUniforms {
            wall_factor: self.wall_factor,
            _pad: [0.0; 3],
        }
    }

    fn textures(&self) -> Vec<Option<TextureRef>> {
        vec![self.velocity]
    }
}

pub type BoundaryPass = Pass<BoundaryParams>;
