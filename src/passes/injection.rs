// Ribofluid - GPU Stable-Fluids Simulator
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

// Pointer splats into velocity (force) or dye (color). The falloff lives in
// common.wgsl: 1 / max(d^2, 0.01), gated by alignment with the delta.

use bytemuck::{Pod, Zeroable};

use crate::field::TextureRef;
use crate::input::PointerSample;
use crate::pass::{merge, Pass, PassParams};

/// Contacts a single touch splat accepts. Extra contacts are ignored.
pub const MAX_CONTACTS: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Injection {
    Force,
    Color,
}

impl Injection {
    fn shader_constant(self) -> f64 {
        match self {
            Injection::Force => 0.0,
            Injection::Color => 1.0,
        }
    }
}

// ============================================================================
// SINGLE POINTER
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct PointerSplatParams {
    pub aspect: [f32; 2],
    pub radius: f32,
    pub position: [f32; 2],
    pub delta: [f32; 2],
    pub source: Option<TextureRef>,
}

impl PointerSplatParams {
    pub fn new(aspect: [f32; 2], radius: f32) -> Self {
        Self {
            aspect,
            radius,
            position: [0.0; 2],
            delta: [0.0; 2],
            source: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PointerSplatUpdate {
    pub aspect: Option<[f32; 2]>,
    pub radius: Option<f32>,
    pub position: Option<[f32; 2]>,
    pub delta: Option<[f32; 2]>,
    pub source: Option<TextureRef>,
}

impl PointerSplatUpdate {
    pub fn from_sample(sample: &PointerSample) -> Self {
        Self {
            position: Some(sample.position),
            delta: Some(sample.delta),
            ..Default::default()
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct PointerUniforms {
    aspect: [f32; 2],
    position: [f32; 2],
    delta: [f32; 2],
    radius: f32,
    _pad: f32,
}

impl PassParams for PointerSplatParams {
    type Update = PointerSplatUpdate;
    type Uniforms = PointerUniforms;

    const LABEL: &'static str = "Pointer Splat";
    const SOURCE: &'static str = include_str!("../../shaders/pointer_splat.wgsl");
    const TEXTURE_SLOTS: usize = 1;

    fn apply(&mut self, update: PointerSplatUpdate) {
        merge(&mut self.aspect, update.aspect);
        merge(&mut self.radius, update.radius);
        merge(&mut self.position, update.position);
        merge(&mut self.delta, update.delta);
        merge(&mut self.source, update.source.map(Some));
    }

    fn uniforms(&self) -> PointerUniforms {
        PointerUniforms {
            aspect: self.aspect,
            position: self.position,
            delta: self.delta,
            radius: self.radius,
            _pad: 0.0,
        }
    }

    fn textures(&self) -> Vec<Option<TextureRef>> {
        vec![self.source]
    }
}

pub type PointerSplatPass = Pass<PointerSplatParams>;

impl Pass<PointerSplatParams> {
    pub fn injecting(
        device: &wgpu::Device,
        injection: Injection,
        params: PointerSplatParams,
        target: wgpu::TextureFormat,
    ) -> Self {
        Self::with_constants(
            device,
            params,
            target,
            &[("INJECT_COLOR", injection.shader_constant())],
        )
    }
}

// ============================================================================
// MULTI CONTACT
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct TouchSplatParams {
    pub aspect: [f32; 2],
    pub radius: f32,
    pub contacts: [[f32; 4]; MAX_CONTACTS],
    pub count: u32,
    pub source: Option<TextureRef>,
}

impl TouchSplatParams {
    pub fn new(aspect: [f32; 2], radius: f32) -> Self {
        Self {
            aspect,
            radius,
            contacts: [[0.0; 4]; MAX_CONTACTS],
            count: 0,
            source: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct TouchSplatUpdate {
    pub aspect: Option<[f32; 2]>,
    pub radius: Option<f32>,
    pub contacts: Option<Vec<PointerSample>>,
    pub source: Option<TextureRef>,
}

/// Packs samples as `(position, delta)` rows. Only the first
/// [`MAX_CONTACTS`] are kept; the remaining rows are zero.
pub fn pack_contacts(samples: &[PointerSample]) -> ([[f32; 4]; MAX_CONTACTS], u32) {
    let mut rows = [[0.0; 4]; MAX_CONTACTS];
    let count = samples.len().min(MAX_CONTACTS);
    for (row, sample) in rows.iter_mut().zip(samples) {
        *row = [
            sample.position[0],
            sample.position[1],
            sample.delta[0],
            sample.delta[1],
        ];
    }
    (rows, count as u32)
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct TouchUniforms {
    aspect: [f32; 2],
    radius: f32,
    count: u32,
    contacts: [[f32; 4]; MAX_CONTACTS],
}

impl PassParams for TouchSplatParams {
    type Update = TouchSplatUpdate;
    type Uniforms = TouchUniforms;

    const LABEL: &'static str = "Touch Splat";
    const SOURCE: &'static str = include_str!("../../shaders/touch_splat.wgsl");
    const TEXTURE_SLOTS: usize = 1;

    fn apply(&mut self, update: TouchSplatUpdate) {
        merge(&mut self.aspect, update.aspect);
        merge(&mut self.radius, update.radius);
        if let Some(samples) = update.contacts {
            let (contacts, count) = pack_contacts(&samples);
            self.contacts = contacts;
            self.count = count;
        }
        merge(&mut self.source, update.source.map(Some));
    }

    fn uniforms(&self) -> TouchUniforms {
        TouchUniforms {
            aspect: self.aspect,
            radius: self.radius,
            count: self.count,
            contacts: self.contacts,
        }
    }

    fn textures(&self) -> Vec<Option<TextureRef>> {
        vec![self.source]
    }
}

pub type TouchSplatPass = Pass<TouchSplatParams>;

impl Pass<TouchSplatParams> {
    pub fn injecting(
        device: &wgpu::Device,
        injection: Injection,
        params: TouchSplatParams,
        target: wgpu::TextureFormat,
    ) -> Self {
        Self::with_constants(
            device,
            params,
            target,
            &[("INJECT_COLOR", injection.shader_constant())],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::PointerId;

    fn sample(id: u64, x: f32) -> PointerSample {
        PointerSample {
            id: PointerId::Touch(id),
            position: [x, 0.5],
            delta: [0.1, -0.2],
        }
    }

    #[test]
    fn contacts_beyond_cap_are_ignored() {
        let samples: Vec<_> = (0..14).map(|i| sample(i, i as f32)).collect();
        let (rows, count) = pack_contacts(&samples);
        assert_eq!(count as usize, MAX_CONTACTS);
        assert_eq!(rows[9], [9.0, 0.5, 0.1, -0.2]);
    }

    #[test]
    fn unused_contact_rows_are_zero() {
        let (rows, count) = pack_contacts(&[sample(3, 0.25), sample(7, 0.75)]);
        assert_eq!(count, 2);
        assert_eq!(rows[1], [0.75, 0.5, 0.1, -0.2]);
        assert!(rows[2..].iter().all(|row| *row == [0.0; 4]));
    }

    #[test]
    fn shrinking_contact_list_clears_stale_rows() {
        let mut params = TouchSplatParams::new([1.0, 1.0], 0.25);
        params.apply(TouchSplatUpdate {
            contacts: Some((0..5).map(|i| sample(i, 0.1)).collect()),
            ..Default::default()
        });
        params.apply(TouchSplatUpdate {
            contacts: Some(vec![sample(0, 0.3)]),
            ..Default::default()
        });
        assert_eq!(params.count, 1);
        assert!(params.contacts[1..].iter().all(|row| *row == [0.0; 4]));
    }

    #[test]
    fn pointer_update_keeps_untouched_fields() {
        let mut params = PointerSplatParams::new([2.0, 1.0], 0.25);
        params.apply(PointerSplatUpdate::from_sample(&sample(0, 0.4)));
        assert_eq!(params.aspect, [2.0, 1.0]);
        assert_eq!(params.radius, 0.25);
        assert_eq!(params.position, [0.4, 0.5]);
        let before = params.clone();
        params.apply(PointerSplatUpdate::default());
        assert_eq!(params, before);
    }

    #[test]
    fn touch_uniform_block_matches_wgsl_layout() {
        assert_eq!(std::mem::size_of::<TouchUniforms>(), 176);
        assert_eq!(std::mem::size_of::<PointerUniforms>(), 32);
    }
}
