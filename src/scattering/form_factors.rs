//! Nuclear and target form factors.
//!
//! The momentum integral weights each slice by the coherent form factor
//!
//! F²(q) = 1 + A·F_Helm(q)² + N·F_sr(q·r)²,
//!
//! where the first term is scattering off a single nucleon, the second coherent scattering off a
//! nucleus of mass number A and the third coherent scattering off the whole cloud of N atoms with
//! size r.

use crate::experiment::ExperimentProfile;
use crate::math::constants::FEMTOMETER_TO_INV_MEV;
use crate::math::special::sphere_form_factor;

/// Nuclear radius coefficient R_A = 1.2 fm·A^{1/3}.
pub const NUCLEAR_RADIUS_FM: f64 = 1.2;

/// Default Gaussian skin thickness s of the Helm form factor, in fm.
pub const HELM_SKIN_THICKNESS_FM: f64 = 1.0;

/// Form factor of a uniform sphere, 3·j1(x)/x, equal to 1 at the origin.
#[inline]
pub fn short_range_form_factor(x: f64) -> f64 {
    sphere_form_factor(x)
}

/// Nuclear radius R_A in MeV⁻¹ for a given mass number.
#[inline]
pub fn nuclear_radius(mass_number: f64) -> f64 {
    NUCLEAR_RADIUS_FM * FEMTOMETER_TO_INV_MEV * mass_number.cbrt()
}

/// Helm form factor 3·j1(q·R_A)/(q·R_A)·exp(−q²·s²).
///
/// # Arguments
///
/// * `q` - Momentum transfer in MeV.
/// * `mass_number` - Mass number A setting the nuclear radius.
/// * `skin_thickness` - Gaussian width s in MeV⁻¹.
#[inline]
pub fn helm_form_factor(q: f64, mass_number: f64, skin_thickness: f64) -> f64 {
    let qs = q * skin_thickness;
    short_range_form_factor(q * nuclear_radius(mass_number)) * (-qs * qs).exp()
}

/// F²(q) = 1 + A·F_Helm(q)² + N·F_sr(q·r)² for an experiment.
pub fn coherent_form_factor_sq(q: f64, profile: &ExperimentProfile, skin_thickness: f64) -> f64 {
    CoherentFormFactor::new(profile, skin_thickness).squared(q)
}

/// `coherent_form_factor_sq` with the experiment-dependent radii evaluated once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoherentFormFactor {
    mass_number: f64,
    atom_count: f64,
    target_size: f64,
    nuclear_radius: f64,
    skin_thickness: f64,
}

impl CoherentFormFactor {
    pub fn new(profile: &ExperimentProfile, skin_thickness: f64) -> Self {
        let mass_number = profile.mass_number() as f64;
        Self {
            mass_number,
            atom_count: profile.atom_count(),
            target_size: profile.target_size(),
            nuclear_radius: nuclear_radius(mass_number),
            skin_thickness,
        }
    }

    #[inline]
    pub fn squared(&self, q: f64) -> f64 {
        let qs = q * self.skin_thickness;
        let helm = short_range_form_factor(q * self.nuclear_radius) * (-qs * qs).exp();
        let cloud = short_range_form_factor(q * self.target_size);
        1.0 + self.mass_number * helm * helm + self.atom_count * cloud * cloud
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::{ExperimentSpec, SensitivityPolicy};
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn profile() -> ExperimentProfile {
        ExperimentProfile::from_spec(&ExperimentSpec {
            name: "Cloud".to_string(),
            atom_count: 1.0e6,
            mass_number: 87,
            min_acceleration: 1.0e-13,
            target_size: 1.0e-4,
            baseline: 1.0e-3,
            measurements: 1.0e4,
            exposure_time: 1.0,
            dm_efficiency: 1.0,
            background_efficiency: 1.0,
            sensitivity: SensitivityPolicy::AtomCount,
        })
        .unwrap()
    }

    #[test]
    fn test_short_range_limit_at_origin() {
        assert_eq!(short_range_form_factor(0.0), 1.0);
        assert_relative_eq!(short_range_form_factor(1e-8), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_nuclear_radius_rubidium() {
        // 1.2 fm · 87^{1/3} ≈ 5.32 fm
        let radius_fm = nuclear_radius(87.0) / FEMTOMETER_TO_INV_MEV;
        assert_relative_eq!(radius_fm, 5.317_26, max_relative = 1e-5);
    }

    #[test]
    fn test_helm_is_damped_by_skin() {
        let s = HELM_SKIN_THICKNESS_FM * FEMTOMETER_TO_INV_MEV;
        let q = 50.0;
        let undamped = helm_form_factor(q, 87.0, 0.0);
        let damped = helm_form_factor(q, 87.0, s);
        assert_relative_eq!(damped, undamped * (-(q * s).powi(2)).exp(), max_relative = 1e-12);
        assert_relative_eq!(helm_form_factor(0.0, 87.0, s), 1.0);
    }

    #[test]
    fn test_coherent_form_factor_limits() {
        let profile = profile();
        let s = HELM_SKIN_THICKNESS_FM * FEMTOMETER_TO_INV_MEV;
        // Fully coherent at zero momentum transfer.
        assert_relative_eq!(coherent_form_factor_sq(0.0, &profile, s), 1.0 + 87.0 + 1.0e6);
        // Far above the nuclear scale only the single-nucleon term survives.
        assert_relative_eq!(coherent_form_factor_sq(1.0e4, &profile, s), 1.0, max_relative = 1e-9);
    }

    #[test]
    fn test_cached_form_factor_matches_free_function() {
        let profile = profile();
        let s = HELM_SKIN_THICKNESS_FM * FEMTOMETER_TO_INV_MEV;
        let cached = CoherentFormFactor::new(&profile, s);
        for &q in &[1e-12, 1e-9, 1e-6, 1e-3, 1.0, 100.0] {
            assert_relative_eq!(
                cached.squared(q),
                coherent_form_factor_sq(q, &profile, s),
                max_relative = 1e-14
            );
        }
    }

    proptest! {
        #[test]
        fn short_range_form_factor_is_bounded(x in -1.0e4f64..1.0e4) {
            prop_assert!(short_range_form_factor(x).abs() <= 1.0 + 1e-12);
        }

        #[test]
        fn short_range_form_factor_is_continuous_at_origin(x in 0.0f64..1.0e-3) {
            prop_assert!((short_range_form_factor(x) - 1.0).abs() <= x * x / 9.0);
        }
    }
}
