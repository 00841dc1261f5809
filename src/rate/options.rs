//! This module defines configuration options for rate computations.
//!
//! `RateOptions` gathers the halo model, the reference cross section and the numerical settings of
//! the two integration strategies: adaptive Gauss–Kronrod for the decoherence channel and the
//! fixed logarithmic grid, or its refined exact counterpart, for the phase channel.

use crate::math::constants::HaloModel;
use crate::math::quadrature::AdaptiveOptions;
use crate::scattering::form_factors::HELM_SKIN_THICKNESS_FM;

/// Numerical settings of the decoherence-channel momentum integral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationOptions {
    /// Tolerances and subdivision budget of the adaptive integrator.
    pub adaptive: AdaptiveOptions,
    /// Lower integration limit in MeV used when the experiment's minimum momentum transfer is not
    /// positive. The integrand vanishes at q = 0, so only the logarithmic map needs it.
    pub q_floor: f64,
}

impl Default for IntegrationOptions {
    fn default() -> Self {
        Self {
            adaptive: AdaptiveOptions::default(),
            q_floor: 1.0e-30,
        }
    }
}

/// Numerical settings of the phase-channel momentum integral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseGridOptions {
    /// The integral spans 10^{-decades}/Δx to 10^{decades}/Δx.
    pub decades: f64,
    /// Number of grid points for the fast mode. Even values are rounded up to the next odd number.
    ///
    /// Sub-percent accuracy needs at least 10⁵ points.
    pub points: usize,
    /// Tolerances and budget of exact mode. The tolerances also govern grid refinement for the
    /// oscillating edge terms.
    pub exact: AdaptiveOptions,
    /// How often exact mode may double the grid of the edge terms before giving up.
    pub max_refinements: usize,
    /// Zero the kernel where q/(2·mx) exceeds the escape velocity.
    pub enforce_escape_cutoff: bool,
}

impl Default for PhaseGridOptions {
    fn default() -> Self {
        Self {
            decades: 10.0,
            points: 200_001,
            exact: AdaptiveOptions {
                epsabs: 0.0,
                epsrel: 1.0e-6,
                initial_intervals: 64,
                max_subdivisions: 20_000,
            },
            max_refinements: 3,
            enforce_escape_cutoff: false,
        }
    }
}

impl PhaseGridOptions {
    /// The number of fast-grid points actually used (always odd, at least 3).
    pub fn grid_points(&self) -> usize {
        let points = self.points.max(3);
        if points % 2 == 0 { points + 1 } else { points }
    }
}

/// Configuration of a `RateCalculator`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateOptions {
    /// Galactic halo the dark matter is drawn from.
    pub halo: HaloModel,
    /// Cross section the rate is normalized to, in cm².
    pub reference_cross_section_cm2: f64,
    /// Gaussian skin thickness of the Helm form factor, in fm.
    pub helm_skin_thickness_fm: f64,
    pub integration: IntegrationOptions,
    pub phase: PhaseGridOptions,
}

impl Default for RateOptions {
    fn default() -> Self {
        Self {
            halo: HaloModel::default(),
            reference_cross_section_cm2: 1.0,
            helm_skin_thickness_fm: HELM_SKIN_THICKNESS_FM,
            integration: IntegrationOptions::default(),
            phase: PhaseGridOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_points_are_odd() {
        let mut options = PhaseGridOptions::default();
        assert_eq!(options.grid_points(), 200_001);
        options.points = 100_000;
        assert_eq!(options.grid_points(), 100_001);
        options.points = 0;
        assert_eq!(options.grid_points(), 3);
    }
}
