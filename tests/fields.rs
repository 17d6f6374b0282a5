// Ribofluid - GPU Stable-Fluids Simulator
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

mod common;

use std::panic::AssertUnwindSafe;

use ribofluid::{ChannelFormat, FieldSet, FluidError, Renderer};

#[test]
fn acquire_rotates_through_every_slot() {
    let Some(gpu) = common::gpu() else { return };
    let mut fields = FieldSet::new();
    let id = fields.create(&gpu.device, "ring", [8, 8], 3, ChannelFormat::Float);

    assert_eq!(fields.field(id).buffer_count(), 3);

    let mut renderer = Renderer::new(&gpu, "rotation");
    let slots: Vec<usize> = (0..6)
        .map(|_| fields.acquire_next(id, &mut renderer))
        .inspect(|handle| assert_eq!(handle.field(), id))
        .map(|handle| handle.slot())
        .collect();
    assert_eq!(slots, vec![0, 1, 2, 0, 1, 2]);
    assert_eq!(
        renderer.render_target().map(|handle| handle.slot()),
        Some(2)
    );
}

#[test]
fn resize_waits_for_the_next_write_to_each_slot() {
    let Some(gpu) = common::gpu() else { return };
    let mut fields = FieldSet::new();
    let id = fields.create(&gpu.device, "resizable", [8, 8], 2, ChannelFormat::Float);

    let old = common::zeros(&gpu, &mut fields, id);
    fields.mark_resize_needed(id, [16, 4]);
    assert_eq!(fields.extent(old).unwrap(), [8, 8]);
    assert_eq!(fields.field(id).resolution(), [16, 4]);

    let mut renderer = Renderer::new(&gpu, "resize");
    let fresh = fields.acquire_next(id, &mut renderer);
    assert_ne!(fresh.slot(), old.slot());
    assert_eq!(fields.extent(fresh).unwrap(), [16, 4]);
    assert_eq!(fields.extent(old).unwrap(), [8, 8]);

    let recycled = fields.acquire_next(id, &mut renderer);
    assert_eq!(recycled.slot(), old.slot());
    assert_eq!(fields.extent(recycled).unwrap(), [16, 4]);
}

#[test]
fn uploaded_texels_read_back_unchanged() {
    let Some(gpu) = common::gpu() else { return };
    let mut fields = FieldSet::new();
    let id = fields.create(&gpu.device, "upload", [5, 3], 1, ChannelFormat::Float);

    let handle = common::upload_float(&gpu, &mut fields, id, |uv| [uv[0], uv[1], -uv[0], 1.0]);
    let snapshot = common::read(&gpu, &fields, handle);

    assert_eq!((snapshot.width, snapshot.height), (5, 3));
    let top_left = snapshot.at(0, 0);
    common::assert_close(top_left[0], 0.1, 1e-6, "top-left u");
    common::assert_close(top_left[1], 1.0 - 0.5 / 3.0, 1e-6, "top-left v");
    let bottom_right = snapshot.at(4, 2);
    common::assert_close(bottom_right[0], 0.9, 1e-6, "bottom-right u");
    common::assert_close(bottom_right[1], 0.5 / 3.0, 1e-6, "bottom-right v");
}

#[test]
fn unorm_fields_read_back_as_unit_floats() {
    let Some(gpu) = common::gpu() else { return };
    let mut fields = FieldSet::new();
    let id = fields.create(&gpu.device, "dye", [2, 1], 1, ChannelFormat::Unorm);

    let handle = fields
        .upload(&gpu, id, &[255, 0, 51, 255, 0, 255, 0, 255])
        .unwrap();
    let snapshot = common::read(&gpu, &fields, handle);
    assert_eq!(snapshot.at(0, 0), [1.0, 0.0, 0.2, 1.0]);
    assert_eq!(snapshot.at(1, 0), [0.0, 1.0, 0.0, 1.0]);
}

#[test]
fn upload_rejects_mismatched_length() {
    let Some(gpu) = common::gpu() else { return };
    let mut fields = FieldSet::new();
    let id = fields.create(&gpu.device, "short", [4, 4], 1, ChannelFormat::Float);

    let err = fields.upload(&gpu, id, &[0; 16]).unwrap_err();
    assert!(matches!(
        err,
        FluidError::UploadSize {
            expected: 256,
            got: 16,
            ..
        }
    ));
}

#[test]
fn handles_do_not_resolve_in_another_set() {
    let Some(gpu) = common::gpu() else { return };
    let mut owner = FieldSet::new();
    let id = owner.create(&gpu.device, "owned", [4, 4], 1, ChannelFormat::Float);
    let handle = common::zeros(&gpu, &mut owner, id);

    let stranger = FieldSet::new();
    assert!(matches!(
        stranger.view(handle),
        Err(FluidError::StaleTexture(h)) if h == handle
    ));
}

#[test]
fn ids_from_another_set_panic_on_lookup() {
    let Some(gpu) = common::gpu() else { return };
    let mut larger = FieldSet::new();
    larger.create(&gpu.device, "first", [4, 4], 1, ChannelFormat::Float);
    let foreign = larger.create(&gpu.device, "second", [4, 4], 1, ChannelFormat::Float);

    let mut smaller = FieldSet::new();
    smaller.create(&gpu.device, "only", [4, 4], 1, ChannelFormat::Float);

    let lookup = std::panic::catch_unwind(AssertUnwindSafe(|| smaller.field(foreign).label()));
    assert!(lookup.is_err());
    let resize = std::panic::catch_unwind(AssertUnwindSafe(|| {
        smaller.mark_resize_needed(foreign, [8, 8])
    }));
    assert!(resize.is_err());
}
