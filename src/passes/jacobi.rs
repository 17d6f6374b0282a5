// Ribofluid - GPU Stable-Fluids Simulator
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

use bytemuck::{Pod, Zeroable};

use crate::field::TextureRef;
use crate::pass::{merge, Pass, PassParams};

/// `p' = (p_l + p_r + p_b + p_t + alpha * div) * beta`.
///
/// With no `previous` iterate the sweep reads a zero pressure field. The
/// divergence texture stands in at that binding so the layout stays complete.
#[derive(Clone, Debug, PartialEq)]
pub struct JacobiParams {
    pub alpha: f32,
    pub beta: f32,
    pub divergence: Option<TextureRef>,
    pub previous: Option<TextureRef>,
}

impl Default for JacobiParams {
    fn default() -> Self {
        Self {
            alpha: -1.0,
            beta: 0.25,
            divergence: None,
            previous: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct JacobiUpdate {
    pub alpha: Option<f32>,
    pub beta: Option<f32>,
    pub divergence: Option<TextureRef>,
    /// `Some(None)` drops the previous iterate and restarts from zero.
    pub previous: Option<Option<TextureRef>>,
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct JacobiUniforms {
    alpha: f32,
    beta: f32,
    has_previous: u32,
    _pad: u32,
}

impl PassParams for JacobiParams {
    type Update = JacobiUpdate;
    type Uniforms = JacobiUniforms;

    const LABEL: &'static str = "Jacobi";
    const SOURCE: &'static str = include_str!("../../shaders/jacobi.wgsl");
    const TEXTURE_SLOTS: usize = 2;

    fn apply(&mut self, update: JacobiUpdate) {
        merge(&mut self.alpha, update.alpha);
        merge(&mut self.beta, update.beta);
        merge(&mut self.divergence, update.divergence.map(Some));
        merge(&mut self.previous, update.previous);
    }

    fn uniforms(&self) -> JacobiUniforms {
        JacobiUniforms {
            alpha: self.alpha,
            beta: self.beta,
            has_previous: self.previous.is_some() as u32,
            _pad: 0,
        }
    }

    fn textures(&self) -> Vec<Option<TextureRef>> {
        vec![self.divergence, self.previous.or(self.divergence)]
    }
}

pub type JacobiPass = Pass<JacobiParams>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coefficients_default_to_unit_grid() {
        let params = JacobiParams::default();
        assert_eq!(params.alpha, -1.0);
        assert_eq!(params.beta, 0.25);
        assert_eq!(params.uniforms().has_previous, 0);
    }

    #[test]
    fn previous_can_be_cleared_explicitly() {
        let handle = TextureRef::dummy(1);
        let mut params = JacobiParams::default();
        params.apply(JacobiUpdate {
            previous: Some(Some(handle)),
            ..Default::default()
        });
        assert_eq!(params.uniforms().has_previous, 1);

        params.apply(JacobiUpdate::default());
        assert_eq!(params.previous, Some(handle));

        params.apply(JacobiUpdate {
            previous: Some(None),
            ..Default::default()
        });
        assert_eq!(params.uniforms().has_previous, 0);
    }

    #[test]
    fn missing_previous_binds_divergence_in_its_place() {
        let divergence = TextureRef::dummy(0);
        let params = JacobiParams {
            divergence: Some(divergence),
            ..Default::default()
        };
        assert_eq!(params.textures(), vec![Some(divergence), Some(divergence)]);
    }
}
