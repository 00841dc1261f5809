//! This module provides the numerical building blocks of the dmlimit library.
//!
//! It collects the unit system and halo model, the special functions that appear in the
//! scattering kernels, and the quadrature rules used to turn those kernels into rates.

/// Physical constants, unit conversions and the default galactic halo.
///
/// All conversions land in natural units with energies in MeV, which is the only unit system
/// used past the experiment catalog boundary.
pub mod constants;

/// Vector-valued adaptive Gauss–Kronrod quadrature and the composite Simpson rule.
pub mod quadrature;

/// Spherical Bessel functions and the real and complex error functions.
pub mod special;
