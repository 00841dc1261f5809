pub mod error;
pub mod experiment;
pub mod limits;
pub mod math;
pub mod rate;
pub mod scattering;
pub mod types;

pub use error::DmLimitError;
pub use experiment::{Catalog, ExperimentProfile, ExperimentSpec, SensitivityPolicy};
pub use limits::{
    DEFAULT_MASS_SPLITTING_MEV, LimitCalculator, LimitOptions, background_term,
    cross_section_to_axion_coupling, cross_section_to_fifth_force_coupling, noise_term,
};
pub use math::constants::HaloModel;
pub use rate::{IntegrationOptions, PhaseGridOptions, RateCalculator, RateOptions};
pub use types::{Channel, Mediator, MediatorMass, PhaseAccuracy, PhaseComponent};

use std::sync::OnceLock;

static DEFAULT_CATALOG: OnceLock<Catalog> = OnceLock::new();

/// The catalog of reference experiments shipped with the library.
pub fn default_catalog() -> &'static Catalog {
    DEFAULT_CATALOG.get_or_init(|| {
        const DEFAULT_CATALOG_TOML: &str = include_str!("../resources/experiments.toml");
        Catalog::load_from_str(DEFAULT_CATALOG_TOML)
            .expect("Failed to parse embedded experiment catalog. This is a library bug.")
    })
}

/// The experiment used when none is named: GDM.
pub fn default_experiment() -> &'static ExperimentProfile {
    default_catalog()
        .get("GDM")
        .expect("Embedded experiment catalog lacks GDM. This is a library bug.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let catalog1 = default_catalog();
        for name in ["GDM", "BECCAL", "MAQRO", "Pino"] {
            assert!(catalog1.get(name).is_ok(), "{name} should be present");
        }
        assert_eq!(catalog1.len(), 4);

        let catalog2 = default_catalog();
        assert_eq!(
            catalog1 as *const _, catalog2 as *const _,
            "Subsequent calls should return a cached reference"
        );
    }

    #[test]
    fn test_default_experiment_is_gdm() {
        assert_eq!(default_experiment().name(), "GDM");
        assert_eq!(default_experiment().mass_number(), 87);
    }
}
