//! This module defines the selector types that parameterize every rate and limit computation.
//!
//! A computation is fully described by a batch of dark-matter masses, an experiment profile, a
//! `Mediator` hypothesis and a detection `Channel`. The types here are plain values: they carry no
//! state between calls and their defaults are resolved eagerly, before any integral is dispatched.

use crate::error::DmLimitError;
use ndarray::Array1;
use num_complex::Complex64;
use std::fmt;
use std::str::FromStr;

/// The mediator-to-dark-matter mass ratio used when a light mediator is requested without one.
pub const DEFAULT_MEDIATOR_RATIO: f64 = 1.0e-5;

/// How the mass of a light mediator is chosen for each dark-matter mass in a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediatorMass {
    /// The mediator mass is this fraction of the dark-matter mass.
    Ratio(f64),
    /// The mediator mass is fixed, in MeV, for every dark-matter mass.
    Fixed(f64),
}

impl Default for MediatorMass {
    fn default() -> Self {
        MediatorMass::Ratio(DEFAULT_MEDIATOR_RATIO)
    }
}

impl MediatorMass {
    /// Resolves the mediator mass for every entry of a batch of dark-matter masses.
    ///
    /// # Arguments
    ///
    /// * `masses` - Dark-matter masses in MeV.
    ///
    /// # Returns
    ///
    /// An array of the same length holding the mediator mass, in MeV, for each entry.
    ///
    /// # Errors
    ///
    /// Returns `DmLimitError::InvalidMass` if the ratio or fixed mass is not positive and finite.
    pub fn resolve(&self, masses: &Array1<f64>) -> Result<Array1<f64>, DmLimitError> {
        match *self {
            MediatorMass::Ratio(ratio) => {
                check_positive(ratio)?;
                Ok(masses.mapv(|mx| ratio * mx))
            }
            MediatorMass::Fixed(mass) => {
                check_positive(mass)?;
                Ok(Array1::from_elem(masses.len(), mass))
            }
        }
    }
}

/// The mediator hypothesis under test.
///
/// A heavy mediator produces a contact interaction; a light mediator adds the Yukawa propagator
/// 1/(q² + m_φ²)² to the momentum integral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mediator {
    /// Contact interaction.
    Heavy,
    /// Long-range interaction through a mediator of the given mass.
    Light(MediatorMass),
}

impl Mediator {
    /// A light mediator with the default mass ratio.
    pub fn light() -> Self {
        Mediator::Light(MediatorMass::default())
    }

    /// Short tag used in file names and logs (`"h"` or `"l"`).
    pub fn tag(&self) -> &'static str {
        match self {
            Mediator::Heavy => "h",
            Mediator::Light(_) => "l",
        }
    }
}

impl FromStr for Mediator {
    type Err = DmLimitError;

    /// Parses `heavy` or `light` (case-insensitive). Any other tag is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heavy" => Ok(Mediator::Heavy),
            "light" => Ok(Mediator::light()),
            _ => Err(DmLimitError::UnknownMediator(s.to_string())),
        }
    }
}

impl fmt::Display for Mediator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mediator::Heavy => write!(f, "heavy"),
            Mediator::Light(MediatorMass::Ratio(r)) => write!(f, "light (m_phi = {r:e} m_x)"),
            Mediator::Light(MediatorMass::Fixed(m)) => write!(f, "light (m_phi = {m:e} MeV)"),
        }
    }
}

/// Which part of the complex phase response is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhaseComponent {
    #[default]
    Real,
    Imaginary,
}

impl PhaseComponent {
    /// Picks this component out of a complex value.
    #[inline]
    pub fn of(self, value: Complex64) -> f64 {
        match self {
            PhaseComponent::Real => value.re,
            PhaseComponent::Imaginary => value.im,
        }
    }
}

/// How the phase-channel momentum integral is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhaseAccuracy {
    /// One fixed logarithmic grid: Simpson for the Gaussian term, Filon for the edge terms.
    #[default]
    FastGrid,
    /// Adaptive Gauss–Kronrod for the Gaussian term and a grid refined to tolerance for the
    /// edge terms, over the same domain.
    Exact,
}

/// The detection channel of the interferometer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Channel {
    /// Scattering is inferred from a loss of fringe visibility.
    #[default]
    Decoherence,
    /// Scattering is inferred from a shift of the interferometer phase.
    Phase {
        component: PhaseComponent,
        accuracy: PhaseAccuracy,
    },
}

impl Channel {
    /// The phase channel with the real component on the fast grid.
    pub fn phase() -> Self {
        Channel::Phase {
            component: PhaseComponent::Real,
            accuracy: PhaseAccuracy::FastGrid,
        }
    }

    pub fn is_phase(&self) -> bool {
        matches!(self, Channel::Phase { .. })
    }
}

/// Checks that every dark-matter mass in a batch is strictly positive and finite.
pub(crate) fn validate_masses(masses: &Array1<f64>) -> Result<(), DmLimitError> {
    masses.iter().try_for_each(|&mx| check_positive(mx))
}

fn check_positive(value: f64) -> Result<(), DmLimitError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DmLimitError::InvalidMass(value))
    }
}
