// Ribofluid - GPU Stable-Fluids Simulator
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

pub mod advection;
pub mod boundary;
pub mod composition;
pub mod divergence;
pub mod gradient;
pub mod init;
pub mod injection;
pub mod jacobi;

pub use advection::{AdvectionParams, AdvectionPass, AdvectionUpdate};
pub use boundary::{BoundaryParams, BoundaryPass, BoundaryUpdate};
pub use composition::{
    CompositionParams, CompositionPass, CompositionPrograms, CompositionUpdate,
};
pub use divergence::{DivergenceParams, DivergencePass, DivergenceUpdate};
pub use gradient::{GradientParams, GradientSubtractionPass, GradientUpdate};
pub use init::{SeedKind, SeedParams, SeedPass, SeedUpdate};
pub use injection::{
    pack_contacts, Injection, PointerSplatParams, PointerSplatPass, PointerSplatUpdate, TouchSplatParams,
    TouchSplatPass, TouchSplatUpdate, MAX_CONTACTS,
};
pub use jacobi::{JacobiParams, JacobiPass, JacobiUpdate};
