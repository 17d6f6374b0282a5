// Ribofluid - GPU Stable-Fluids Simulator
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

use crate::config::ColorMode;
use crate::field::TextureRef;
use crate::pass::{merge, Pass, PassParams};

/// Maps `source * scale + bias` to display color. The color mode is not a
/// parameter here: it is baked into the pipeline, see [`CompositionPrograms`].
#[derive(Clone, Debug, PartialEq)]
pub struct CompositionParams {
    pub scale: f32,
    pub bias: f32,
    pub source: Option<TextureRef>,
    pub gradient: Option<TextureRef>,
}

impl Default for CompositionParams {
    fn default() -> Self {
        Self {
            scale: 1.0,
            bias: 0.0,
            source: None,
            gradient: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct CompositionUpdate {
    pub scale: Option<f32>,
    pub bias: Option<f32>,
    pub source: Option<TextureRef>,
    pub gradient: Option<TextureRef>,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct CompositionUniforms {
    scale: f32,
    bias: f32,
    _pad: [f32; 2],
}

impl PassParams for CompositionParams {
    type Update = CompositionUpdate;
    type Uniforms = CompositionUniforms;

    const LABEL: &'static str = "Composition";
    const SOURCE: &'static str = include_str!("../../shaders/composition.wgsl");
    const TEXTURE_SLOTS: usize = 2;

    fn apply(&mut self, update: CompositionUpdate) {
        merge(&mut self.scale, update.scale);
        merge(&mut self.bias, update.bias);
        merge(&mut self.source, update.source.map(Some));
        merge(&mut self.gradient, update.gradient.map(Some));
    }

    fn uniforms(&self) -> CompositionUniforms {
        CompositionUniforms {
            scale: self.scale,
            bias: self.bias,
            _pad: [0.0; 2],
        }
    }

    fn textures(&self) -> Vec<Option<TextureRef>> {
        vec![self.source, self.gradient]
    }
}

pub type CompositionPass = Pass<CompositionParams>;

/// One specialised composition pipeline per color mode and output format,
/// built the first time that pair is requested.
#[derive(Default)]
pub struct CompositionPrograms {
    programs: HashMap<(ColorMode, wgpu::TextureFormat), CompositionPass>,
}

impl CompositionPrograms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn program(
        &mut self,
        device: &wgpu::Device,
        mode: ColorMode,
        format: wgpu::TextureFormat,
    ) -> &mut CompositionPass {
        self.programs.entry((mode, format)).or_insert_with(|| {
            log::debug!("Building {} composition for {:?}", mode.label(), format);
            Pass::with_constants(
                device,
                CompositionParams::default(),
                format,
                &[("COLOR_MODE", mode.shader_constant() as f64)],
            )
        })
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}
