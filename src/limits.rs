//! This module inverts interaction rates into minimum detectable cross sections.
//!
//! A rate computed for the reference cross section σ_ref scales linearly with σ, so the
//! smallest detectable cross section is σ_ref times the ratio of the experiment's sensitivity
//! floor to that rate. The floor combines shot noise with a background term; both depend on the
//! interferometer visibility γ.

use crate::error::DmLimitError;
use crate::experiment::ExperimentProfile;
use crate::math::constants::CM2_TO_INV_MEV2;
use crate::rate::{RateCalculator, RateOptions};
use crate::types::{Channel, Mediator};
use ndarray::Array1;
use std::f64::consts::PI;
use tracing::debug;

/// Default dark-matter mass splitting Δ used by the axion coupling conversion, in MeV.
pub const DEFAULT_MASS_SPLITTING_MEV: f64 = 1000.0;

/// Configuration of a `LimitCalculator`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitOptions {
    /// Interferometer visibility γ in (0, 1].
    pub visibility: f64,
    /// Shot-to-shot spread of the visibility, used by the contrast noise model.
    pub visibility_spread: f64,
    pub rate: RateOptions,
}

impl Default for LimitOptions {
    fn default() -> Self {
        Self {
            visibility: 0.5,
            visibility_spread: 0.05,
            rate: RateOptions::default(),
        }
    }
}

/// Shot-noise floor √(4(1/γ − 1)/N_meas).
pub fn noise_term(visibility: f64, measurements: f64) -> f64 {
    (4.0 * (1.0 / visibility - 1.0) / measurements).sqrt()
}

/// Background floor scale·ln(1/γ).
pub fn background_term(visibility: f64, background_scale: f64) -> f64 {
    background_scale * (1.0 / visibility).ln()
}

/// Converts a cross section in cm² to the axion-like coupling (Δ²/(256π·σ))^{1/4}, in MeV.
pub fn cross_section_to_axion_coupling(cross_section_cm2: f64, mass_splitting_mev: f64) -> f64 {
    let sigma = cross_section_cm2 * CM2_TO_INV_MEV2;
    (mass_splitting_mev * mass_splitting_mev / (256.0 * PI * sigma)).powf(0.25)
}

/// Converts a cross section in cm² to the dimensionless fifth-force strength
/// 3·(16π·σ·m_N²/3)^{1/4}, with m_N the mean nucleon mass of the target.
pub fn cross_section_to_fifth_force_coupling(
    cross_section_cm2: f64,
    profile: &ExperimentProfile,
) -> f64 {
    let sigma = cross_section_cm2 * CM2_TO_INV_MEV2;
    let nucleon_mass = profile.nucleon_mass();
    3.0 * (16.0 * PI * sigma * nucleon_mass * nucleon_mass / 3.0).powf(0.25)
}

/// Inverts the rates of one experiment into minimum detectable cross sections.
///
/// The calculator combines the experiment's noise and background floors with the rates of a
/// `RateCalculator` configured from `LimitOptions::rate`.
pub struct LimitCalculator<'p> {
    /// The experiment whose sensitivity is computed.
    profile: &'p ExperimentProfile,
    /// Interferometer visibility and the options of the underlying rate computation.
    options: LimitOptions,
}

impl<'p> LimitCalculator<'p> {
    /// Creates a new `LimitCalculator` with default options.
    ///
    /// # Arguments
    ///
    /// * `profile` - The experiment to compute limits for.
    ///
    /// # Returns
    ///
    /// A new `LimitCalculator` with visibility 0.5 and default `RateOptions`.
    ///
    /// # Examples
    ///
    /// ```
    /// use dmlimit::{LimitCalculator, default_experiment};
    ///
    /// let calculator = LimitCalculator::new(default_experiment());
    /// assert_eq!(calculator.options().visibility, 0.5);
    /// ```
    pub fn new(profile: &'p ExperimentProfile) -> Self {
        Self {
            profile,
            options: LimitOptions::default(),
        }
    }

    /// Configures the calculator with custom options.
    ///
    /// # Arguments
    ///
    /// * `options` - The `LimitOptions` to apply, including the nested `RateOptions`.
    ///
    /// # Returns
    ///
    /// The calculator with the specified options.
    ///
    /// # Examples
    ///
    /// ```
    /// use dmlimit::{LimitCalculator, LimitOptions, default_experiment};
    ///
    /// let options = LimitOptions {
    ///     visibility: 0.8,
    ///     ..Default::default()
    /// };
    /// let calculator = LimitCalculator::new(default_experiment()).with_options(options);
    /// assert_eq!(calculator.options().visibility, 0.8);
    /// ```
    pub fn with_options(mut self, options: LimitOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &LimitOptions {
        &self.options
    }

    fn rates(
        &self,
        masses: &Array1<f64>,
        mediator: &Mediator,
        channel: Channel,
    ) -> Result<Array1<f64>, DmLimitError> {
        RateCalculator::new(self.profile)
            .with_options(self.options.rate)
            .rate(masses, mediator, channel)
    }

    /// Minimum detectable cross section in cm² for each mass.
    ///
    /// Decoherence rates must be non-negative; phase rates are signed responses and enter
    /// through their magnitude. A vanishing rate yields `f64::INFINITY`.
    pub fn cross_section_limit(
        &self,
        masses: &Array1<f64>,
        mediator: &Mediator,
        channel: Channel,
    ) -> Result<Array1<f64>, DmLimitError> {
        let rates = self.rates(masses, mediator, channel)?;
        let gamma = self.options.visibility;
        let floor = noise_term(gamma, self.profile.measurements())
            + background_term(gamma, self.profile.background_efficiency());
        let efficiency = self.profile.dm_efficiency();

        debug!(
            experiment = self.profile.name(),
            mediator = mediator.tag(),
            phase = channel.is_phase(),
            floor,
            "Inverting rates into cross-section limits."
        );

        self.invert(masses, &rates, channel, floor / efficiency)
    }

    /// Minimum detectable cross section under the contrast noise model.
    ///
    /// Decoherence uses (σ_γ/γ + ln(1/γ))/√N_meas as the floor; the phase channel uses the
    /// experiment's minimum resolvable phase. Detection efficiencies are not applied.
    pub fn contrast_cross_section_limit(
        &self,
        masses: &Array1<f64>,
        mediator: &Mediator,
        channel: Channel,
    ) -> Result<Array1<f64>, DmLimitError> {
        let rates = self.rates(masses, mediator, channel)?;
        let floor = match channel {
            Channel::Decoherence => {
                let gamma = self.options.visibility;
                (self.options.visibility_spread / gamma + (1.0 / gamma).ln())
                    / self.profile.measurements().sqrt()
            }
            Channel::Phase { .. } => self.profile.phase_min(),
        };

        self.invert(masses, &rates, channel, floor)
    }

    fn invert(
        &self,
        masses: &Array1<f64>,
        rates: &Array1<f64>,
        channel: Channel,
        floor: f64,
    ) -> Result<Array1<f64>, DmLimitError> {
        if !channel.is_phase() {
            if let Some((mass, rate)) = masses
                .iter()
                .zip(rates.iter())
                .find(|(_, rate)| **rate < 0.0)
            {
                return Err(DmLimitError::NegativeRate {
                    mass: *mass,
                    rate: *rate,
                });
            }
        }

        let reference = self.options.rate.reference_cross_section_cm2;
        Ok(rates.mapv(|rate| {
            let magnitude = rate.abs();
            if magnitude == 0.0 {
                f64::INFINITY
            } else {
                reference * floor / magnitude
            }
        }))
    }
}
