// Ribofluid - GPU Stable-Fluids Simulator
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

// Per-frame sequencing of the fluid passes, all recorded into one encoder.

use crate::config::{ColorMode, FluidConfig, Visualize};
use crate::error::Result;
use crate::field::{ChannelFormat, FieldId, FieldSet, TextureRef};
use crate::geometry::{aspect, scaled_resolution};
use crate::gpu::GpuContext;
use crate::input::PointerSample;
use crate::pass::Renderer;
use crate::passes::{
    AdvectionParams, AdvectionPass, AdvectionUpdate, BoundaryParams, BoundaryPass, BoundaryUpdate,
    CompositionPrograms, CompositionUpdate, DivergenceParams, DivergencePass, DivergenceUpdate,
    GradientParams, GradientSubtractionPass, GradientUpdate, Injection, JacobiParams, JacobiPass,
    JacobiUpdate, PointerSplatParams, PointerSplatPass, PointerSplatUpdate, SeedKind, SeedPass,
    TouchSplatParams, TouchSplatPass, TouchSplatUpdate,
};

/// Most recent output of each simulated quantity. `None` means the quantity
/// has not been produced since startup or the last reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameState {
    pub velocity: Option<TextureRef>,
    pub color: Option<TextureRef>,
    pub divergence: Option<TextureRef>,
    pub pressure: Option<TextureRef>,
}

#[derive(Clone, Copy, Debug)]
pub struct FieldIds {
    pub velocity: FieldId,
    pub color: FieldId,
    pub divergence: FieldId,
    pub pressure: FieldId,
    pub velocity_seed: FieldId,
    pub color_seed: FieldId,
    pub gradient: FieldId,
}

impl FieldIds {
    /// Fields that follow the viewport size.
    fn simulated(&self) -> [FieldId; 4] {
        [self.velocity, self.color, self.divergence, self.pressure]
    }
}

/// Initialiser outputs that advection falls back to when a `FrameState`
/// has no velocity or dye yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Seeds {
    pub velocity: TextureRef,
    pub color: TextureRef,
}

pub struct FluidSimulation {
    fields: FieldSet,
    ids: FieldIds,
    resolution: [u32; 2],
    aspect: [f32; 2],
    seeds: Seeds,

    velocity_seed: SeedPass,
    color_seed: SeedPass,
    velocity_advection: AdvectionPass,
    color_advection: AdvectionPass,
    pointer_force: PointerSplatPass,
    pointer_color: PointerSplatPass,
    touch_force: TouchSplatPass,
    touch_color: TouchSplatPass,
    boundary: BoundaryPass,
    divergence: DivergencePass,
    jacobi: JacobiPass,
    gradient_subtraction: GradientSubtractionPass,
    compositions: CompositionPrograms,

    gradient: TextureRef,
    gradient_loaded: bool,
    warned_missing_gradient: bool,
}

impl FluidSimulation {
    /// Allocates every field at `viewport * config.scale`, compiles the passes
    /// and renders the seed fields.
    pub fn new(gpu: &GpuContext, viewport: [u32; 2], config: &FluidConfig) -> Result<Self> {
        let device = &gpu.device;
        let resolution = scaled_resolution(viewport, config.scale);
        let aspect = aspect(resolution);
        let float = ChannelFormat::Float;
        let unorm = ChannelFormat::Unorm;

        let mut fields = FieldSet::new();
        let ids = FieldIds {
            velocity: fields.create(device, "Velocity", resolution, 2, float),
            color: fields.create(device, "Color", resolution, 2, unorm),
            divergence: fields.create(device, "Divergence", resolution, 1, float),
            pressure: fields.create(device, "Pressure", resolution, 2, float),
            velocity_seed: fields.create(device, "Velocity Seed", resolution, 1, float),
            color_seed: fields.create(device, "Color Seed", resolution, 1, unorm),
            gradient: fields.create(device, "Gradient Map", [1, 1], 1, unorm),
        };

        // Placeholder ramp until a real gradient is supplied.
        let gradient = fields.upload(gpu, ids.gradient, &[255, 255, 255, 255])?;

        let float_target = float.texture_format();
        let unorm_target = unorm.texture_format();
        let dt = config.dt();

        let mut velocity_seed = SeedPass::seed(device, SeedKind::Velocity, float_target);
        let mut color_seed = SeedPass::seed(device, SeedKind::Color, unorm_target);
        let seeds = render_seeds(gpu, &mut fields, &ids, &mut velocity_seed, &mut color_seed)?;

        let simulation = Self {
            velocity_advection: AdvectionPass::new(
                device,
                AdvectionParams::new(dt, 0.0),
                float_target,
            ),
            color_advection: AdvectionPass::new(
                device,
                AdvectionParams::new(dt, config.color_decay),
                unorm_target,
            ),
            pointer_force: PointerSplatPass::injecting(
                device,
                Injection::Force,
                PointerSplatParams::new(aspect, config.radius),
                float_target,
            ),
            pointer_color: PointerSplatPass::injecting(
                device,
                Injection::Color,
                PointerSplatParams::new(aspect, config.radius),
                unorm_target,
            ),
            touch_force: TouchSplatPass::injecting(
                device,
                Injection::Force,
                TouchSplatParams::new(aspect, config.radius),
                float_target,
            ),
            touch_color: TouchSplatPass::injecting(
                device,
                Injection::Color,
                TouchSplatParams::new(aspect, config.radius),
                unorm_target,
            ),
            boundary: BoundaryPass::new(device, BoundaryParams::default(), float_target),
            divergence: DivergencePass::new(device, DivergenceParams::default(), float_target),
            jacobi: JacobiPass::new(device, JacobiParams::default(), float_target),
            gradient_subtraction: GradientSubtractionPass::new(
                device,
                GradientParams::default(),
                float_target,
            ),
            compositions: CompositionPrograms::new(),
            fields,
            ids,
            resolution,
            aspect,
            seeds,
            velocity_seed,
            color_seed,
            gradient,
            gradient_loaded: false,
            warned_missing_gradient: false,
        };

        log::info!(
            "Fluid simulation ready at {}x{}",
            resolution[0],
            resolution[1]
        );
        Ok(simulation)
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn field_ids(&self) -> FieldIds {
        self.ids
    }

    pub fn seeds(&self) -> Seeds {
        self.seeds
    }

    /// Resolution new writes are allocated at.
    pub fn resolution(&self) -> [u32; 2] {
        self.resolution
    }

    pub fn aspect(&self) -> [f32; 2] {
        self.aspect
    }

    pub fn has_gradient(&self) -> bool {
        self.gradient_loaded
    }

    /// Re-renders the seed fields and drops all feedback. Nothing is
    /// deallocated or resized.
    pub fn reset(&mut self, gpu: &GpuContext) -> Result<FrameState> {
        self.seeds = render_seeds(
            gpu,
            &mut self.fields,
            &self.ids,
            &mut self.velocity_seed,
            &mut self.color_seed,
        )?;
        self.jacobi.update(JacobiUpdate {
            previous: Some(None),
            ..Default::default()
        });
        Ok(FrameState::default())
    }

    /// Records a new target resolution. Fields reallocate lazily when next
    /// written; splat aspect correction is refreshed now.
    pub fn resize(&mut self, viewport: [u32; 2], scale: f32) {
        let resolution = scaled_resolution(viewport, scale);
        if resolution == self.resolution {
            return;
        }
        for id in self.ids.simulated() {
            self.fields.mark_resize_needed(id, resolution);
        }
        self.resolution = resolution;
        self.aspect = aspect(resolution);

        let aspect = Some(self.aspect);
        self.pointer_force.update(PointerSplatUpdate {
            aspect,
            ..Default::default()
        });
        self.pointer_color.update(PointerSplatUpdate {
            aspect,
            ..Default::default()
        });
        self.touch_force.update(TouchSplatUpdate {
            aspect,
            ..Default::default()
        });
        self.touch_color.update(TouchSplatUpdate {
            aspect,
            ..Default::default()
        });
        log::info!("Fluid resolution now {}x{}", resolution[0], resolution[1]);
    }

    /// Uploads the color ramp used by [`ColorMode::Gradient`].
    pub fn set_gradient(&mut self, gpu: &GpuContext, ramp: &image::RgbaImage) -> Result<()> {
        let (width, height) = ramp.dimensions();
        self.fields
            .mark_resize_needed(self.ids.gradient, [width, height]);
        self.gradient = self.fields.upload(gpu, self.ids.gradient, ramp.as_raw())?;
        self.gradient_loaded = true;
        self.warned_missing_gradient = false;
        log::info!("Loaded {}x{} gradient map", width, height);
        Ok(())
    }

    /// Advances one frame. With `simulate` off the state is returned as is.
    pub fn step(
        &mut self,
        gpu: &GpuContext,
        state: FrameState,
        config: &FluidConfig,
        pointers: &[PointerSample],
    ) -> Result<FrameState> {
        if !config.simulate {
            return Ok(state);
        }

        let device = &gpu.device;
        let ids = self.ids;
        let dt = config.dt();
        let mut renderer = Renderer::new(gpu, "Fluid Step");

        let previous_velocity = state.velocity.unwrap_or(self.seeds.velocity);
        let mut color = state.color.unwrap_or(self.seeds.color);

        // 1. Advect velocity by itself
        self.velocity_advection.update(AdvectionUpdate {
            dt: Some(dt),
            decay: Some(0.0),
            input: Some(previous_velocity),
            velocity: Some(previous_velocity),
        });
        let mut velocity = self.fields.acquire_next(ids.velocity, &mut renderer);
        renderer.render(&self.fields, self.velocity_advection.drawable(device))?;

        // 2. Pointer force, then dye
        if !pointers.is_empty() {
            velocity = self.splat(&mut renderer, Injection::Force, pointers, config.radius, velocity)?;
            if config.add_color {
                color = self.splat(&mut renderer, Injection::Color, pointers, config.radius, color)?;
            }
        }

        // 3. Walls
        if config.boundaries {
            self.boundary.update(BoundaryUpdate {
                velocity: Some(velocity),
                ..Default::default()
            });
            velocity = self.fields.acquire_next(ids.velocity, &mut renderer);
            renderer.render(&self.fields, self.boundary.drawable(device))?;
        }

        // 4. Divergence
        self.divergence.update(DivergenceUpdate {
            velocity: Some(velocity),
            ..Default::default()
        });
        let divergence = self.fields.acquire_next(ids.divergence, &mut renderer);
        renderer.render(&self.fields, self.divergence.drawable(device))?;

        // 5. Pressure, warm-started from last frame
        self.jacobi.update(JacobiUpdate {
            divergence: Some(divergence),
            previous: Some(state.pressure),
            ..Default::default()
        });
        let mut pressure = state.pressure;
        for _ in 0..config.iterations {
            let target = self.fields.acquire_next(ids.pressure, &mut renderer);
            renderer.render(&self.fields, self.jacobi.drawable(device))?;
            self.jacobi.update(JacobiUpdate {
                previous: Some(Some(target)),
                ..Default::default()
            });
            pressure = Some(target);
        }

        // 6. Projection
        self.gradient_subtraction.update(GradientUpdate {
            velocity: Some(velocity),
            pressure: Some(pressure),
            ..Default::default()
        });
        velocity = self.fields.acquire_next(ids.velocity, &mut renderer);
        renderer.render(&self.fields, self.gradient_subtraction.drawable(device))?;

        // 7. Advect dye with the projected velocity
        self.color_advection.update(AdvectionUpdate {
            dt: Some(dt),
            decay: Some(config.color_decay),
            input: Some(color),
            velocity: Some(velocity),
        });
        color = self.fields.acquire_next(ids.color, &mut renderer);
        renderer.render(&self.fields, self.color_advection.drawable(device))?;

        renderer.submit();

        Ok(FrameState {
            velocity: Some(velocity),
            color: Some(color),
            divergence: Some(divergence),
            pressure,
        })
    }

    fn splat(
        &mut self,
        renderer: &mut Renderer<'_>,
        injection: Injection,
        pointers: &[PointerSample],
        radius: f32,
        source: TextureRef,
    ) -> Result<TextureRef> {
        let device = renderer.device();
        let field = match injection {
            Injection::Force => self.ids.velocity,
            Injection::Color => self.ids.color,
        };

        if let [single] = pointers {
            let pass = match injection {
                Injection::Force => &mut self.pointer_force,
                Injection::Color => &mut self.pointer_color,
            };
            pass.update(PointerSplatUpdate {
                radius: Some(radius),
                source: Some(source),
                ..PointerSplatUpdate::from_sample(single)
            });
            let target = self.fields.acquire_next(field, renderer);
            renderer.render(&self.fields, pass.drawable(device))?;
            Ok(target)
        } else {
            let pass = match injection {
                Injection::Force => &mut self.touch_force,
                Injection::Color => &mut self.touch_color,
            };
            pass.update(TouchSplatUpdate {
                radius: Some(radius),
                contacts: Some(pointers.to_vec()),
                source: Some(source),
                ..Default::default()
            });
            let target = self.fields.acquire_next(field, renderer);
            renderer.render(&self.fields, pass.drawable(device))?;
            Ok(target)
        }
    }

    /// The field shown for `visualize`, falling back to dye when that
    /// quantity has not been produced yet.
    pub fn visualized(&self, state: &FrameState, visualize: Visualize) -> TextureRef {
        let color = state.color.unwrap_or(self.seeds.color);
        match visualize {
            Visualize::Color => color,
            Visualize::Velocity => state.velocity.unwrap_or(self.seeds.velocity),
            Visualize::Divergence => state.divergence.unwrap_or(color),
            Visualize::Pressure => state.pressure.unwrap_or(color),
        }
    }

    /// Gradient mapping without a loaded ramp renders as Normal.
    fn effective_mode(&mut self, mode: ColorMode) -> ColorMode {
        if mode == ColorMode::Gradient && !self.gradient_loaded {
            if !self.warned_missing_gradient {
                log::warn!("Gradient map not loaded yet; showing unmapped colors");
                self.warned_missing_gradient = true;
            }
            return ColorMode::Normal;
        }
        mode
    }

    /// Records the visualisation of `state` into `view`.
    pub fn encode_composition(
        &mut self,
        renderer: &mut Renderer<'_>,
        state: &FrameState,
        config: &FluidConfig,
        view: &wgpu::TextureView,
        format: wgpu::TextureFormat,
    ) -> Result<()> {
        let source = self.visualized(state, config.visualize);
        let mode = self.effective_mode(config.color_mode);
        let (scale, bias) = display_range(config.visualize);
        let gradient = self.gradient;
        let device = renderer.device();

        let program = self.compositions.program(device, mode, format);
        program.update(CompositionUpdate {
            scale: Some(scale),
            bias: Some(bias),
            source: Some(source),
            gradient: Some(gradient),
        });
        renderer.render_to_view(&self.fields, program.drawable(device), view)
    }

    /// Draws the visualisation of `state` into a host-supplied view and submits.
    pub fn compose(
        &mut self,
        gpu: &GpuContext,
        state: &FrameState,
        config: &FluidConfig,
        view: &wgpu::TextureView,
        format: wgpu::TextureFormat,
    ) -> Result<()> {
        let mut renderer = Renderer::new(gpu, "Fluid Composition");
        self.encode_composition(&mut renderer, state, config, view, format)?;
        renderer.submit();
        Ok(())
    }

    /// Number of composition pipelines built so far.
    pub fn composition_programs(&self) -> usize {
        self.compositions.len()
    }
}

/// Signed quantities are centred on mid grey.
fn display_range(visualize: Visualize) -> (f32, f32) {
    match visualize {
        Visualize::Color => (1.0, 0.0),
        Visualize::Velocity | Visualize::Divergence | Visualize::Pressure => (0.5, 0.5),
    }
}

fn render_seeds(
    gpu: &GpuContext,
    fields: &mut FieldSet,
    ids: &FieldIds,
    velocity_seed: &mut SeedPass,
    color_seed: &mut SeedPass,
) -> Result<Seeds> {
    let mut renderer = Renderer::new(gpu, "Fluid Seed");
    let velocity = fields.acquire_next(ids.velocity_seed, &mut renderer);
    renderer.render(fields, velocity_seed.drawable(&gpu.device))?;
    let color = fields.acquire_next(ids.color_seed, &mut renderer);
    renderer.render(fields, color_seed.drawable(&gpu.device))?;
    renderer.submit();
    Ok(Seeds { velocity, color })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_fields_are_recentred() {
        assert_eq!(display_range(Visualize::Color), (1.0, 0.0));
        assert_eq!(display_range(Visualize::Pressure), (0.5, 0.5));
    }
}
