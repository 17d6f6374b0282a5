// Ribofluid - GPU Stable-Fluids Simulator
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

//! Real-time 2D incompressible fluid on the GPU.
//!
//! Every physical quantity lives in a ring of float render targets
//! ([`field`]). Each solver stage is a full-screen fragment pass
//! ([`pass`], [`passes`]) and [`simulation`] chains them into the stable-fluids
//! frame: advect, inject, reflect at walls, project, advect dye, compose.

pub mod config;
pub mod error;
pub mod field;
pub mod geometry;
pub mod gpu;
pub mod input;
pub mod pass;
pub mod passes;
pub mod readback;
pub mod simulation;

pub use config::{ColorMode, FluidConfig, Timestep, Visualize};
pub use error::{FluidError, Result};
pub use field::{ChannelFormat, FieldId, FieldSet, TextureRef};
pub use gpu::GpuContext;
pub use input::{PointerId, PointerSample, Pointers};
pub use pass::{Pass, PassParams, Renderer};
pub use readback::{capture_frame, read_field, save_capture, FieldSnapshot};
pub use simulation::{FieldIds, FluidSimulation, FrameState, Seeds};
