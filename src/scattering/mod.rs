//! This module contains the physics of a single dark-matter scattering event.
//!
//! It provides the halo velocity weight, the nuclear and cloud form factors, and the complex
//! phase kernel. The `rate` module combines them into momentum integrals.

/// Nuclear and coherent cloud form factors.
pub mod form_factors;

/// The complex kernel of the phase detection channel.
pub mod phase;

/// Minimum velocity, truncated-Maxwellian weight and its normalization.
pub mod velocity;

pub use form_factors::{
    CoherentFormFactor, coherent_form_factor_sq, helm_form_factor, short_range_form_factor,
};
pub use phase::{KernelTerms, PhaseKernel, phase_kernel};
pub use velocity::{
    TruncatedMaxwellian, minimum_velocity, minimum_velocity_batch, normalization_constant,
    velocity_integral_factor,
};
