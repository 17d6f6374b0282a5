// Ribofluid - GPU Stable-Fluids Simulator
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

mod common;

use ribofluid::{
    passes::{
        DivergenceParams, DivergencePass, DivergenceUpdate, GradientParams,
        GradientSubtractionPass, GradientUpdate, Injection, JacobiParams, JacobiPass,
        JacobiUpdate, PointerSplatParams, PointerSplatPass, PointerSplatUpdate, SeedKind,
        SeedPass,
    },
    ChannelFormat, FieldId, FieldSet, FieldSnapshot, GpuContext, TextureRef,
};

const FLOAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
const SIZE: [u32; 2] = [64, 64];

struct Tank {
    fields: FieldSet,
    velocity_id: FieldId,
    divergence_id: FieldId,
    pressure_id: FieldId,
    velocity: TextureRef,
}

/// A 64x64 tank holding the periodic seed flow, stirred once at its centre
/// moving right. The seed flow is discretely divergence-free, so all the
/// divergence comes from the stroke.
fn stirred_tank(gpu: &GpuContext) -> Tank {
    let mut fields = FieldSet::new();
    let seed_id = fields.create(&gpu.device, "seed", SIZE, 1, ChannelFormat::Float);
    // One slot for the stroke plus one per projection a test runs.
    let velocity_id = fields.create(&gpu.device, "velocity", SIZE, 3, ChannelFormat::Float);
    let divergence_id = fields.create(&gpu.device, "divergence", SIZE, 2, ChannelFormat::Float);
    let pressure_id = fields.create(&gpu.device, "pressure", SIZE, 2, ChannelFormat::Float);
    let mut seed_pass = SeedPass::seed(&gpu.device, SeedKind::Velocity, FLOAT);
    let seed = common::run_pass(gpu, &mut fields, seed_id, &mut seed_pass);

    let mut splat = PointerSplatPass::injecting(
        &gpu.device,
        Injection::Force,
        PointerSplatParams::new([1.0, 1.0], 0.25),
        FLOAT,
    );
    splat.update(PointerSplatUpdate {
        position: Some([0.5, 0.5]),
        delta: Some([1.0, 0.0]),
        source: Some(seed),
        ..Default::default()
    });
    let velocity = common::run_pass(gpu, &mut fields, velocity_id, &mut splat);

    Tank {
        fields,
        velocity_id,
        divergence_id,
        pressure_id,
        velocity,
    }
}

fn divergence_of(gpu: &GpuContext, tank: &mut Tank, velocity: TextureRef) -> FieldSnapshot {
    let mut divergence = DivergencePass::new(&gpu.device, DivergenceParams::default(), FLOAT);
    divergence.update(DivergenceUpdate {
        velocity: Some(velocity),
        ..Default::default()
    });
    let out = common::run_pass(gpu, &mut tank.fields, tank.divergence_id, &mut divergence);
    common::read(gpu, &tank.fields, out)
}

/// Divergence before and after a projection with `iterations` Jacobi sweeps.
fn project(gpu: &GpuContext, tank: &mut Tank, iterations: u32) -> (FieldSnapshot, FieldSnapshot) {
    let mut divergence = DivergencePass::new(&gpu.device, DivergenceParams::default(), FLOAT);
    divergence.update(DivergenceUpdate {
        velocity: Some(tank.velocity),
        ..Default::default()
    });
    let divergence_handle =
        common::run_pass(gpu, &mut tank.fields, tank.divergence_id, &mut divergence);
    let before = common::read(gpu, &tank.fields, divergence_handle);

    let mut jacobi = JacobiPass::new(&gpu.device, JacobiParams::default(), FLOAT);
    jacobi.update(JacobiUpdate {
        divergence: Some(divergence_handle),
        previous: Some(None),
        ..Default::default()
    });
    let mut pressure = None;
    for _ in 0..iterations {
        let out = common::run_pass(gpu, &mut tank.fields, tank.pressure_id, &mut jacobi);
        jacobi.update(JacobiUpdate {
            previous: Some(Some(out)),
            ..Default::default()
        });
        pressure = Some(out);
    }

    let mut gradient = GradientSubtractionPass::new(&gpu.device, GradientParams::default(), FLOAT);
    gradient.update(GradientUpdate {
        velocity: Some(tank.velocity),
        pressure: Some(pressure),
        ..Default::default()
    });
    let projected = common::run_pass(gpu, &mut tank.fields, tank.velocity_id, &mut gradient);
    let after = divergence_of(gpu, tank, projected);
    (before, after)
}

#[test]
fn projection_shrinks_divergence_near_the_stroke() {
    let Some(gpu) = common::gpu() else { return };
    let mut tank = stirred_tank(&gpu);
    let (before, after) = project(&gpu, &mut tank, 32);

    let centre = [SIZE[0] / 2, SIZE[1] / 2];
    let window_before = before.abs_sum_window(0, centre, 4);
    let window_after = after.abs_sum_window(0, centre, 4);
    assert!(window_before > 0.0, "the stroke produced no divergence");
    assert!(
        window_after < 0.6 * window_before,
        "divergence near the stroke went from {window_before} to {window_after}"
    );
    assert!(
        after.rms(0) < 0.6 * before.rms(0),
        "rms divergence went from {} to {}",
        before.rms(0),
        after.rms(0)
    );
}

#[test]
fn more_sweeps_leave_less_divergence() {
    let Some(gpu) = common::gpu() else { return };
    let mut tank = stirred_tank(&gpu);

    let (before, after_8) = project(&gpu, &mut tank, 8);
    let (_, after_32) = project(&gpu, &mut tank, 32);

    let total = |snapshot: &FieldSnapshot| snapshot.abs_sum(0);
    assert!(
        total(&before) > total(&after_8),
        "8 sweeps: {} -> {}",
        total(&before),
        total(&after_8)
    );
    assert!(
        total(&after_8) > total(&after_32),
        "8 sweeps left {}, 32 sweeps left {}",
        total(&after_8),
        total(&after_32)
    );
}

#[test]
fn without_pressure_projection_passes_velocity_through() {
    let Some(gpu) = common::gpu() else { return };
    let mut tank = stirred_tank(&gpu);
    let (before, after) = project(&gpu, &mut tank, 0);

    for (a, b) in before.texels.iter().zip(&after.texels) {
        common::assert_close(b[0], a[0], 1e-4 + 1e-5 * a[0].abs(), "divergence");
    }
}

#[test]
fn jacobi_on_a_divergence_free_field_stays_flat() {
    let Some(gpu) = common::gpu() else { return };
    let mut fields = FieldSet::new();
    let divergence_id = fields.create(&gpu.device, "divergence", [16, 16], 1, ChannelFormat::Float);
    let pressure_id = fields.create(&gpu.device, "pressure", [16, 16], 2, ChannelFormat::Float);
    let divergence = common::zeros(&gpu, &mut fields, divergence_id);

    let mut jacobi = JacobiPass::new(&gpu.device, JacobiParams::default(), FLOAT);
    jacobi.update(JacobiUpdate {
        divergence: Some(divergence),
        ..Default::default()
    });
    let mut pressure = common::run_pass(&gpu, &mut fields, pressure_id, &mut jacobi);
    for _ in 0..4 {
        jacobi.update(JacobiUpdate {
            previous: Some(Some(pressure)),
            ..Default::default()
        });
        pressure = common::run_pass(&gpu, &mut fields, pressure_id, &mut jacobi);
    }

    let snapshot = common::read(&gpu, &fields, pressure);
    assert_eq!(snapshot.max_abs(0), 0.0);
}
