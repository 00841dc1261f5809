//! This module implements `RateCalculator`, the entry point of the rate pipeline.
//!
//! A rate is the product of a mediator-dependent prefactor (exposure time, atom count, halo
//! density and velocity normalization) and a momentum-transfer integral from `rate::integral`.
//! The calculator validates the mass batch, resolves light-mediator masses and dispatches on the
//! detection channel.

use crate::error::DmLimitError;
use crate::experiment::ExperimentProfile;
use crate::math::constants::CM2_TO_INV_MEV2;
use crate::rate::integral::{decoherence_integral, phase_integral};
use crate::rate::options::RateOptions;
use crate::scattering::TruncatedMaxwellian;
use crate::types::{Channel, Mediator, validate_masses};
use ndarray::Array1;
use std::f64::consts::PI;

/// Computes expected scattering rates of one experiment for batches of dark-matter masses.
///
/// The calculator borrows an `ExperimentProfile` and caches the truncated-Maxwellian
/// normalization of its halo model, so repeated `rate` calls only pay for the momentum
/// integrals themselves.
pub struct RateCalculator<'p> {
    /// The experiment whose rates are computed.
    profile: &'p ExperimentProfile,
    /// Halo model, reference cross section and numerical settings.
    options: RateOptions,
    /// Velocity weight of `options.halo` with its normalization evaluated once.
    maxwellian: TruncatedMaxwellian,
}

impl<'p> RateCalculator<'p> {
    /// Creates a new `RateCalculator` with default options.
    ///
    /// # Arguments
    ///
    /// * `profile` - The experiment to compute rates for.
    ///
    /// # Returns
    ///
    /// A new `RateCalculator` using the standard halo model and a 1 cm² reference cross section.
    ///
    /// # Examples
    ///
    /// ```
    /// use dmlimit::{RateCalculator, default_experiment};
    ///
    /// let calculator = RateCalculator::new(default_experiment());
    /// assert_eq!(calculator.profile().name(), "GDM");
    /// ```
    pub fn new(profile: &'p ExperimentProfile) -> Self {
        let options = RateOptions::default();
        Self {
            profile,
            maxwellian: TruncatedMaxwellian::new(&options.halo),
            options,
        }
    }

    /// Configures the calculator with custom options.
    ///
    /// The velocity normalization is recomputed for the new halo model.
    ///
    /// # Arguments
    ///
    /// * `options` - The `RateOptions` to apply.
    ///
    /// # Returns
    ///
    /// The calculator with the specified options.
    ///
    /// # Examples
    ///
    /// ```
    /// use dmlimit::{RateCalculator, RateOptions, default_experiment};
    ///
    /// let mut options = RateOptions::default();
    /// options.phase.points = 100_001;
    /// let calculator = RateCalculator::new(default_experiment()).with_options(options);
    /// assert_eq!(calculator.options().phase.points, 100_001);
    /// ```
    pub fn with_options(mut self, options: RateOptions) -> Self {
        self.maxwellian = TruncatedMaxwellian::new(&options.halo);
        self.options = options;
        self
    }

    pub fn profile(&self) -> &'p ExperimentProfile {
        self.profile
    }

    pub fn options(&self) -> &RateOptions {
        &self.options
    }

    /// Normalization N₀ of the halo velocity distribution.
    pub fn normalization(&self) -> f64 {
        self.maxwellian.normalization()
    }

    /// T·N·π·σ_ref·ρ, shared by both mediator branches.
    fn exposure(&self) -> f64 {
        self.profile.exposure_time()
            * self.profile.atom_count()
            * PI
            * self.options.reference_cross_section_cm2
            * CM2_TO_INV_MEV2
            * self.options.halo.density
    }

    /// Heavy-mediator prefactor T·N·π·σ_ref·ρ·v₀²/(mx³·N₀), in MeV⁻².
    pub fn heavy_prefactor(&self, mx: f64) -> f64 {
        let v0 = self.options.halo.dispersion_velocity;
        self.exposure() * v0 * v0 / (mx.powi(3) * self.normalization())
    }

    /// Light-mediator prefactor T·N·π·σ_ref·ρ·v₀⁶·mx/N₀, in MeV².
    pub fn light_prefactor(&self, mx: f64) -> f64 {
        let v0 = self.options.halo.dispersion_velocity;
        self.exposure() * v0.powi(6) * mx / self.normalization()
    }

    /// Computes the rate for every dark-matter mass in `masses`.
    ///
    /// The heavy mediator yields rates in MeV⁻², the light mediator in MeV², both per unit of the
    /// reference cross section. Decoherence rates are non-negative; phase rates are the signed
    /// real or imaginary part of the phase response.
    ///
    /// # Arguments
    ///
    /// * `masses` - Dark-matter masses in MeV, integrated together as one batch.
    /// * `mediator` - The mediator hypothesis. A light mediator's mass is resolved per entry.
    /// * `channel` - Decoherence, or the phase channel with its component and accuracy.
    ///
    /// # Returns
    ///
    /// One rate per mass, in the order of `masses`.
    ///
    /// # Errors
    ///
    /// * `DmLimitError::InvalidMass` if a dark-matter or mediator mass is not positive and finite.
    /// * `DmLimitError::IntegrationNotConverged` if an adaptive integral misses its tolerance
    ///   within the budget of `RateOptions`.
    ///
    /// # Examples
    ///
    /// ```
    /// use dmlimit::{Channel, Mediator, RateCalculator, default_experiment};
    /// use ndarray::array;
    ///
    /// let calculator = RateCalculator::new(default_experiment());
    /// let rates = calculator
    ///     .rate(&array![1e-2, 1.0], &Mediator::Heavy, Channel::Decoherence)
    ///     .unwrap();
    /// assert!(rates.iter().all(|&r| r > 0.0));
    /// ```
    pub fn rate(
        &self,
        masses: &Array1<f64>,
        mediator: &Mediator,
        channel: Channel,
    ) -> Result<Array1<f64>, DmLimitError> {
        validate_masses(masses)?;

        let (prefactors, mediator_masses) = match mediator {
            Mediator::Heavy => (masses.mapv(|mx| self.heavy_prefactor(mx)), None),
            Mediator::Light(mediator_mass) => (
                masses.mapv(|mx| self.light_prefactor(mx)),
                Some(mediator_mass.resolve(masses)?),
            ),
        };

        let integrals = match channel {
            Channel::Decoherence => decoherence_integral(
                masses,
                mediator_masses.as_ref(),
                self.profile,
                &self.options,
            )?,
            Channel::Phase {
                component,
                accuracy,
            } => phase_integral(
                masses,
                mediator_masses.as_ref(),
                self.profile,
                component,
                accuracy,
                &self.options,
            )?,
        };

        Ok(prefactors * integrals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::{ExperimentSpec, SensitivityPolicy};
    use crate::math::constants::HaloModel;
    use crate::scattering::normalization_constant;
    use crate::types::MediatorMass;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn profile() -> ExperimentProfile {
        ExperimentProfile::from_spec(&ExperimentSpec {
            name: "Bench".to_string(),
            atom_count: 1.0e6,
            mass_number: 87,
            min_acceleration: 1.0e-13,
            target_size: 1.0e-6,
            baseline: 1.0e-6,
            measurements: 1.0e4,
            exposure_time: 1.0,
            dm_efficiency: 1.0,
            background_efficiency: 1.0,
            sensitivity: SensitivityPolicy::AtomCount,
        })
        .unwrap()
    }

    #[test]
    fn test_normalization_is_cached_from_halo() {
        let profile = profile();
        let halo = HaloModel {
            dispersion_velocity: 5.0e-4,
            ..HaloModel::default()
        };
        let calculator = RateCalculator::new(&profile).with_options(RateOptions {
            halo,
            ..Default::default()
        });
        assert_relative_eq!(
            calculator.normalization(),
            normalization_constant(5.0e-4, halo.escape_velocity),
            max_relative = 1e-15
        );
    }

    #[test]
    fn test_prefactor_scaling() {
        let profile = profile();
        let calculator = RateCalculator::new(&profile);
        let v0 = calculator.options().halo.dispersion_velocity;
        assert_relative_eq!(
            calculator.heavy_prefactor(1.0) / calculator.heavy_prefactor(10.0),
            1.0e3,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            calculator.light_prefactor(10.0) / calculator.light_prefactor(1.0),
            10.0,
            max_relative = 1e-12
        );
        // light(mx)·m_φ⁴ = heavy(mx)·v₀⁴·mx⁴ for any m_φ.
        let mx = 3.0;
        assert_relative_eq!(
            calculator.light_prefactor(mx),
            calculator.heavy_prefactor(mx) * v0.powi(4) * mx.powi(4),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_prefactor_is_linear_in_reference_cross_section() {
        let profile = profile();
        let base = RateCalculator::new(&profile);
        let doubled = RateCalculator::new(&profile).with_options(RateOptions {
            reference_cross_section_cm2: 2.0,
            ..Default::default()
        });
        assert_relative_eq!(
            doubled.heavy_prefactor(1.0),
            2.0 * base.heavy_prefactor(1.0),
            max_relative = 1e-14
        );
    }

    #[test]
    fn test_rate_rejects_invalid_masses() {
        let profile = profile();
        let calculator = RateCalculator::new(&profile);
        let result = calculator.rate(&array![1.0, 0.0], &Mediator::Heavy, Channel::Decoherence);
        assert!(matches!(result, Err(DmLimitError::InvalidMass(m)) if m == 0.0));

        let result = calculator.rate(
            &array![1.0],
            &Mediator::Light(MediatorMass::Ratio(-1.0)),
            Channel::Decoherence,
        );
        assert!(matches!(result, Err(DmLimitError::InvalidMass(_))));
    }

    #[test]
    fn test_heavy_decoherence_rate_is_positive() {
        let profile = profile();
        let calculator = RateCalculator::new(&profile);
        let masses = array![1e-4, 1e-2, 1.0];
        let rates = calculator
            .rate(&masses, &Mediator::Heavy, Channel::Decoherence)
            .unwrap();
        assert_eq!(rates.len(), 3);
        assert!(rates.iter().all(|r| r.is_finite() && *r > 0.0));
    }
}
