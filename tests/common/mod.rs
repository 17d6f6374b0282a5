// Ribofluid - GPU Stable-Fluids Simulator
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

#![allow(dead_code)]

use ribofluid::{
    pass::{PassParams, Renderer},
    read_field, FieldId, FieldSet, FieldSnapshot, GpuContext, Pass, TextureRef,
};

/// Headless device, or `None` (with a note on stderr) when the machine has
/// no adapter that can render to float targets.
pub fn gpu() -> Option<GpuContext> {
    let _ = env_logger::builder().is_test(true).try_init();
    match pollster::block_on(GpuContext::headless()) {
        Ok(gpu) => Some(gpu),
        Err(err) => {
            eprintln!("skipping GPU test: {err}");
            None
        }
    }
}

/// uv (y up) at the centre of texel `(x, y)`, row 0 at the top.
pub fn texel_uv(x: u32, y: u32, size: [u32; 2]) -> [f32; 2] {
    [
        (x as f32 + 0.5) / size[0] as f32,
        1.0 - (y as f32 + 0.5) / size[1] as f32,
    ]
}

/// Writes `value(uv)` into the next slot of a float field.
pub fn upload_float(
    gpu: &GpuContext,
    fields: &mut FieldSet,
    id: FieldId,
    value: impl Fn([f32; 2]) -> [f32; 4],
) -> TextureRef {
    let size = fields.field(id).resolution();
    let texels: Vec<[f32; 4]> = (0..size[1])
        .flat_map(|y| (0..size[0]).map(move |x| (x, y)))
        .map(|(x, y)| value(texel_uv(x, y, size)))
        .collect();
    fields
        .upload(gpu, id, bytemuck::cast_slice(&texels))
        .expect("upload float field")
}

pub fn zeros(gpu: &GpuContext, fields: &mut FieldSet, id: FieldId) -> TextureRef {
    upload_float(gpu, fields, id, |_| [0.0; 4])
}

/// Draws `pass` into the next slot of `id` and submits.
pub fn run_pass<P: PassParams>(
    gpu: &GpuContext,
    fields: &mut FieldSet,
    id: FieldId,
    pass: &mut Pass<P>,
) -> TextureRef {
    let mut renderer = Renderer::new(gpu, "test pass");
    let target = fields.acquire_next(id, &mut renderer);
    renderer
        .render(fields, pass.drawable(&gpu.device))
        .expect("render pass");
    renderer.submit();
    target
}

pub fn read(gpu: &GpuContext, fields: &FieldSet, handle: TextureRef) -> FieldSnapshot {
    pollster::block_on(read_field(gpu, fields, handle)).expect("read back field")
}

pub fn assert_close(actual: f32, expected: f32, tolerance: f32, what: &str) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "{what}: expected {expected}, got {actual} (tolerance {tolerance})"
    );
}
