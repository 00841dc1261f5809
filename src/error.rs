use std::path::PathBuf;
use thiserror::Error;

/// The primary error type for all fallible operations in the `dmlimit` library.
///
/// Usage errors (bad names, malformed experiment records, non-physical masses)
/// are reported immediately and never replaced by a default. Numerical failures
/// of the adaptive integrator are surfaced as `IntegrationNotConverged` rather
/// than returned as an approximate value.
#[derive(Error, Debug)]
pub enum DmLimitError {
    /// A mediator hypothesis tag that is neither `heavy` nor `light`.
    #[error("Unknown mediator hypothesis '{0}': expected 'heavy' or 'light'")]
    UnknownMediator(String),

    /// The requested experiment is not present in the catalog.
    #[error("Experiment '{0}' not found in the catalog")]
    UnknownExperiment(String),

    /// An experiment record was parsed but holds non-physical values.
    #[error("Invalid experiment '{name}': {reason}")]
    InvalidExperiment {
        /// Catalog name of the offending record.
        name: String,
        /// Human-readable description of the violated constraint.
        reason: String,
    },

    /// A dark-matter or mediator mass that is not strictly positive and finite.
    #[error("Invalid mass {0:e} MeV: masses must be positive and finite")]
    InvalidMass(f64),

    /// The adaptive quadrature exhausted its subdivision budget before the
    /// error estimate of every batch entry fell below tolerance.
    #[error(
        "Integration failed to converge after {subdivisions} subdivisions. Worst relative error estimate: {error:.2e}"
    )]
    IntegrationNotConverged {
        /// Number of intervals in the subdivision tree when the budget ran out.
        subdivisions: usize,
        /// Largest remaining error estimate relative to its tolerance scale.
        error: f64,
    },

    /// A decoherence rate came out negative, which indicates a sign error in
    /// the integration rather than a physical answer.
    #[error("Negative decoherence rate {rate:e} at mass {mass:e} MeV")]
    NegativeRate {
        /// Dark-matter mass of the offending batch entry, in MeV.
        mass: f64,
        /// The offending rate value.
        rate: f64,
    },

    /// An I/O error that occurred while reading an experiment catalog file.
    #[error("I/O error at path '{path}': {source}")]
    IoError {
        /// The path of the file that caused the I/O error.
        path: PathBuf,
        /// The underlying `std::io::Error`.
        #[source]
        source: std::io::Error,
    },

    /// The catalog file is not valid TOML or a record is missing a required field.
    #[error("Failed to deserialize experiment catalog: {0}")]
    DeserializationError(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_unknown_mediator() {
        let err = DmLimitError::UnknownMediator("medium".to_string());
        assert_eq!(
            err.to_string(),
            "Unknown mediator hypothesis 'medium': expected 'heavy' or 'light'"
        );
    }

    #[test]
    fn test_display_not_converged() {
        let err = DmLimitError::IntegrationNotConverged {
            subdivisions: 12,
            error: 0.5,
        };
        assert_eq!(
            err.to_string(),
            "Integration failed to converge after 12 subdivisions. Worst relative error estimate: 5.00e-1"
        );
    }
}
