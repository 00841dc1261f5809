//! Truncated-Maxwellian velocity integrals of the galactic halo.

use crate::math::constants::HaloModel;
use crate::math::special::erf;
use ndarray::Array1;
use std::f64::consts::PI;

/// Smallest dark-matter speed able to transfer momentum `q` to the target.
///
/// Returns q/(2·mx·cos_angle), clamped to `escape_velocity`. Speeds above the galactic escape
/// velocity cannot occur in the halo, so the clamp marks a momentum slice with no contribution.
#[inline]
pub fn minimum_velocity(q: f64, mx: f64, escape_velocity: f64, cos_angle: f64) -> f64 {
    let v = q / (2.0 * mx * cos_angle);
    if v.is_nan() || v > escape_velocity {
        escape_velocity
    } else {
        v
    }
}

/// Elementwise `minimum_velocity` over an array of momentum transfers.
pub fn minimum_velocity_batch(
    q: &Array1<f64>,
    mx: f64,
    escape_velocity: f64,
    cos_angle: f64,
) -> Array1<f64> {
    q.mapv(|qi| minimum_velocity(qi, mx, escape_velocity, cos_angle))
}

/// The truncated-Maxwellian weight exp(−v_min²/v₀²) − exp(−v_esc²/v₀²).
///
/// Lies in [0, 1) and vanishes once `q` reaches the kinematic endpoint 2·mx·v_esc.
#[inline]
pub fn velocity_integral_factor(q: f64, mx: f64, halo: &HaloModel) -> f64 {
    let v0_sq = halo.dispersion_velocity * halo.dispersion_velocity;
    let v_min = minimum_velocity(q, mx, halo.escape_velocity, 1.0);
    (-v_min * v_min / v0_sq).exp() - (-halo.escape_velocity * halo.escape_velocity / v0_sq).exp()
}

/// Normalization of the truncated Maxwellian,
/// π^{3/2}·v₀³·(erf(v_esc/v₀) − (2/√π)(v_esc/v₀)·exp(−v_esc²/v₀²)).
pub fn normalization_constant(dispersion_velocity: f64, escape_velocity: f64) -> f64 {
    let ratio = escape_velocity / dispersion_velocity;
    let prefactor = PI.powf(1.5) * dispersion_velocity.powi(3);
    prefactor * (erf(ratio) - 2.0 / PI.sqrt() * ratio * (-ratio * ratio).exp())
}

/// The velocity weight of a fixed halo with its constant terms evaluated once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncatedMaxwellian {
    escape_velocity: f64,
    inv_dispersion_sq: f64,
    escape_term: f64,
    normalization: f64,
}

impl TruncatedMaxwellian {
    pub fn new(halo: &HaloModel) -> Self {
        let inv_dispersion_sq = (halo.dispersion_velocity * halo.dispersion_velocity).recip();
        Self {
            escape_velocity: halo.escape_velocity,
            inv_dispersion_sq,
            escape_term: (-halo.escape_velocity * halo.escape_velocity * inv_dispersion_sq).exp(),
            normalization: normalization_constant(halo.dispersion_velocity, halo.escape_velocity),
        }
    }

    /// Same value as `velocity_integral_factor` for this halo.
    #[inline]
    pub fn weight(&self, q: f64, mx: f64) -> f64 {
        let v_min = minimum_velocity(q, mx, self.escape_velocity, 1.0);
        (-v_min * v_min * self.inv_dispersion_sq).exp() - self.escape_term
    }

    /// Momentum transfer 2·mx·v_esc above which the weight is identically zero.
    #[inline]
    pub fn kinematic_endpoint(&self, mx: f64) -> f64 {
        2.0 * mx * self.escape_velocity
    }

    pub fn normalization(&self) -> f64 {
        self.normalization
    }
}
