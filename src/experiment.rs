//! This module describes atom-interferometer experiments and the catalog that holds them.
//!
//! An experiment enters the library as an `ExperimentSpec`, a plain record in SI units read from
//! TOML. A single pure derivation step converts it into an immutable `ExperimentProfile` in natural
//! units and computes the derived quantities (target mass, minimum momentum transfer and minimum
//! resolvable phase). Profiles are collected by name in a `Catalog`.

use crate::error::DmLimitError;
use crate::math::constants::{METER_TO_INV_MEV, PROTON_MASS_MEV, SECOND_TO_INV_MEV, SPEED_OF_LIGHT_M_PER_S};
use serde::Deserialize;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// How the minimum resolvable interferometer phase of an experiment is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SensitivityPolicy {
    /// Momentum-resolution bound: φ_min = q_min·Δx.
    Kinematic,
    /// Atom shot-noise bound: φ_min = 1/√(N/A).
    #[default]
    AtomCount,
}

impl SensitivityPolicy {
    fn minimum_phase(&self, q_min: f64, baseline: f64, atom_count: f64, mass_number: f64) -> f64 {
        match self {
            SensitivityPolicy::Kinematic => q_min * baseline,
            SensitivityPolicy::AtomCount => (atom_count / mass_number).sqrt().recip(),
        }
    }
}

fn default_efficiency() -> f64 {
    1.0
}

/// The raw description of an experiment, in SI units.
///
/// This is the record stored in catalog files. It is never used by the rate pipeline directly;
/// call `ExperimentProfile::from_spec` to validate it and convert it to natural units.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentSpec {
    /// Catalog name. Filled from the table key when read from a catalog file.
    #[serde(default)]
    pub name: String,
    /// Number of atoms in the interferometer target.
    pub atom_count: f64,
    /// Mass number of the atomic species.
    pub mass_number: u32,
    /// Smallest resolvable acceleration in m/s².
    pub min_acceleration: f64,
    /// Characteristic size of the atom cloud in m.
    pub target_size: f64,
    /// Spatial separation of the interferometer arms in m.
    pub baseline: f64,
    /// Number of independent measurements per run.
    pub measurements: f64,
    /// Interrogation time of a single measurement in s.
    pub exposure_time: f64,
    /// Detection efficiency for a dark-matter signal.
    #[serde(default = "default_efficiency")]
    pub dm_efficiency: f64,
    /// Scale of the background contribution to the noise floor.
    #[serde(default = "default_efficiency")]
    pub background_efficiency: f64,
    /// Rule used to derive the minimum resolvable phase.
    #[serde(default)]
    pub sensitivity: SensitivityPolicy,
}

/// An experiment in natural units with its derived quantities.
///
/// Profiles are immutable once built. Every rate and limit computation borrows one read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentProfile {
    name: String,
    atom_count: f64,
    mass_number: u32,
    min_acceleration: f64,
    target_size: f64,
    baseline: f64,
    measurements: f64,
    exposure_time: f64,
    dm_efficiency: f64,
    background_efficiency: f64,
    sensitivity: SensitivityPolicy,
    target_mass: f64,
    q_min: f64,
    phase_min: f64,
}

impl ExperimentProfile {
    /// Validates an experiment record and derives its natural-unit profile.
    ///
    /// The target mass is N·m_p, the minimum momentum transfer is ½·m_T·a_min·T and the minimum
    /// resolvable phase follows the record's `SensitivityPolicy`.
    ///
    /// # Arguments
    ///
    /// * `spec` - The SI-unit experiment record.
    ///
    /// # Errors
    ///
    /// Returns `DmLimitError::InvalidExperiment` if any field is non-finite or out of its physical
    /// range (counts, sizes and times must be positive, efficiencies in (0, 1] for the signal and
    /// non-negative for the background, the acceleration non-negative).
    ///
    /// # Examples
    ///
    /// ```
    /// use dmlimit::{ExperimentProfile, ExperimentSpec, SensitivityPolicy};
    ///
    /// let spec = ExperimentSpec {
    ///     name: "bench".to_string(),
    ///     atom_count: 1.0e6,
    ///     mass_number: 87,
    ///     min_acceleration: 1.0e-12,
    ///     target_size: 1.0e-4,
    ///     baseline: 1.0e-3,
    ///     measurements: 1.0e4,
    ///     exposure_time: 1.0,
    ///     dm_efficiency: 1.0,
    ///     background_efficiency: 1.0,
    ///     sensitivity: SensitivityPolicy::AtomCount,
    /// };
    /// let profile = ExperimentProfile::from_spec(&spec).unwrap();
    /// assert!(profile.q_min() > 0.0);
    /// ```
    pub fn from_spec(spec: &ExperimentSpec) -> Result<Self, DmLimitError> {
        validate(spec)?;

        let mass_number = spec.mass_number as f64;
        let target_mass = spec.atom_count * PROTON_MASS_MEV;
        let min_acceleration = spec.min_acceleration / SPEED_OF_LIGHT_M_PER_S / SECOND_TO_INV_MEV;
        let exposure_time = spec.exposure_time * SECOND_TO_INV_MEV;
        let baseline = spec.baseline * METER_TO_INV_MEV;
        let q_min = 0.5 * target_mass * min_acceleration * exposure_time;
        let phase_min = spec
            .sensitivity
            .minimum_phase(q_min, baseline, spec.atom_count, mass_number);

        Ok(Self {
            name: spec.name.clone(),
            atom_count: spec.atom_count,
            mass_number: spec.mass_number,
            min_acceleration,
            target_size: spec.target_size * METER_TO_INV_MEV,
            baseline,
            measurements: spec.measurements,
            exposure_time,
            dm_efficiency: spec.dm_efficiency,
            background_efficiency: spec.background_efficiency,
            sensitivity: spec.sensitivity,
            target_mass,
            q_min,
            phase_min,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of atoms N.
    pub fn atom_count(&self) -> f64 {
        self.atom_count
    }

    /// Mass number A of the atomic species.
    pub fn mass_number(&self) -> u32 {
        self.mass_number
    }

    /// Smallest resolvable acceleration in MeV.
    pub fn min_acceleration(&self) -> f64 {
        self.min_acceleration
    }

    /// Cloud size r in MeV⁻¹.
    pub fn target_size(&self) -> f64 {
        self.target_size
    }

    /// Arm separation Δx in MeV⁻¹.
    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    pub fn measurements(&self) -> f64 {
        self.measurements
    }

    /// Interrogation time T in MeV⁻¹.
    pub fn exposure_time(&self) -> f64 {
        self.exposure_time
    }

    pub fn dm_efficiency(&self) -> f64 {
        self.dm_efficiency
    }

    pub fn background_efficiency(&self) -> f64 {
        self.background_efficiency
    }

    pub fn sensitivity(&self) -> SensitivityPolicy {
        self.sensitivity
    }

    /// Total target mass m_T = N·m_p in MeV.
    pub fn target_mass(&self) -> f64 {
        self.target_mass
    }

    /// Mass per nucleon-equivalent, m_T/N, in MeV.
    pub fn nucleon_mass(&self) -> f64 {
        self.target_mass / self.atom_count
    }

    /// Minimum resolvable momentum transfer in MeV.
    pub fn q_min(&self) -> f64 {
        self.q_min
    }

    /// Minimum resolvable phase in radians.
    pub fn phase_min(&self) -> f64 {
        self.phase_min
    }
}

fn validate(spec: &ExperimentSpec) -> Result<(), DmLimitError> {
    let invalid = |reason: String| DmLimitError::InvalidExperiment {
        name: spec.name.clone(),
        reason,
    };
    let positive = [
        ("atom_count", spec.atom_count),
        ("target_size", spec.target_size),
        ("baseline", spec.baseline),
        ("measurements", spec.measurements),
        ("exposure_time", spec.exposure_time),
    ];
    for (field, value) in positive {
        if !(value.is_finite() && value > 0.0) {
            return Err(invalid(format!("{field} must be positive and finite, got {value}")));
        }
    }
    if spec.mass_number == 0 {
        return Err(invalid("mass_number must be at least 1".to_string()));
    }
    if !(spec.min_acceleration.is_finite() && spec.min_acceleration >= 0.0) {
        return Err(invalid(format!(
            "min_acceleration must be non-negative and finite, got {}",
            spec.min_acceleration
        )));
    }
    if !(spec.dm_efficiency > 0.0 && spec.dm_efficiency <= 1.0) {
        return Err(invalid(format!(
            "dm_efficiency must lie in (0, 1], got {}",
            spec.dm_efficiency
        )));
    }
    if !(spec.background_efficiency.is_finite() && spec.background_efficiency >= 0.0) {
        return Err(invalid(format!(
            "background_efficiency must be non-negative and finite, got {}",
            spec.background_efficiency
        )));
    }
    Ok(())
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(deserialize_with = "deserialize_experiment_map")]
    experiments: BTreeMap<String, ExperimentSpec>,
}

/// A named collection of experiment profiles.
///
/// Catalog files hold one `[experiments.<NAME>]` table per experiment; the table key becomes the
/// profile name. Names are kept in sorted order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Catalog {
    experiments: BTreeMap<String, ExperimentProfile>,
}

impl Catalog {
    /// Loads an experiment catalog from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `DmLimitError::IoError` if the file cannot be read, `DmLimitError::DeserializationError`
    /// if it is not a valid catalog, or `DmLimitError::InvalidExperiment` if a record fails validation.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dmlimit::Catalog;
    /// use std::path::Path;
    ///
    /// let catalog = Catalog::load_from_file(Path::new("experiments.toml")).unwrap();
    /// ```
    pub fn load_from_file(path: &Path) -> Result<Self, DmLimitError> {
        let content = std::fs::read_to_string(path).map_err(|io_error| DmLimitError::IoError {
            path: path.to_path_buf(),
            source: io_error,
        })?;

        Self::load_from_str(&content)
    }

    /// Parses an experiment catalog from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `DmLimitError::DeserializationError` if the TOML is malformed, a required field is
    /// missing or an unknown field is present, and `DmLimitError::InvalidExperiment` if a record
    /// holds non-physical values.
    ///
    /// # Examples
    ///
    /// ```
    /// use dmlimit::Catalog;
    ///
    /// let toml_data = r#"
    /// [experiments.Lab]
    /// atom_count = 1.0e6
    /// mass_number = 87
    /// min_acceleration = 1.0e-12
    /// target_size = 1.0e-4
    /// baseline = 1.0e-3
    /// measurements = 1.0e4
    /// exposure_time = 1.0
    /// "#;
    ///
    /// let catalog = Catalog::load_from_str(toml_data).unwrap();
    /// assert_eq!(catalog.len(), 1);
    /// assert_eq!(catalog.get("Lab").unwrap().mass_number(), 87);
    /// ```
    pub fn load_from_str(toml_str: &str) -> Result<Self, DmLimitError> {
        let file: CatalogFile = toml::from_str(toml_str)?;
        let experiments = file
            .experiments
            .into_iter()
            .map(|(name, spec)| Ok((name, ExperimentProfile::from_spec(&spec)?)))
            .collect::<Result<_, DmLimitError>>()?;
        Ok(Self { experiments })
    }

    /// Looks up an experiment by name.
    ///
    /// # Errors
    ///
    /// Returns `DmLimitError::UnknownExperiment` if no experiment of that name exists.
    pub fn get(&self, name: &str) -> Result<&ExperimentProfile, DmLimitError> {
        self.experiments
            .get(name)
            .ok_or_else(|| DmLimitError::UnknownExperiment(name.to_string()))
    }

    /// Adds or replaces a profile under its own name.
    pub fn insert(&mut self, profile: ExperimentProfile) {
        self.experiments.insert(profile.name().to_string(), profile);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.experiments.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExperimentProfile> {
        self.experiments.values()
    }

    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }
}

/// Deserializes the experiment tables, naming each record after its key.
///
/// A record that spells out its own `name` must agree with the key.
fn deserialize_experiment_map<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, ExperimentSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ExperimentMapVisitor;

    impl<'de> Visitor<'de> for ExperimentMapVisitor {
        type Value = BTreeMap<String, ExperimentSpec>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map from experiment name to experiment record")
        }

        fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
        where
            M: MapAccess<'de>,
        {
            let mut experiments = BTreeMap::new();
            while let Some((key, mut spec)) = map.next_entry::<String, ExperimentSpec>()? {
                if key.trim().is_empty() {
                    return Err(de::Error::custom("experiment names must not be empty"));
                }
                if spec.name.is_empty() {
                    spec.name = key.clone();
                } else if spec.name != key {
                    return Err(de::Error::custom(format!(
                        "experiment '{}' is stored under key '{}'",
                        spec.name, key
                    )));
                }
                experiments.insert(key, spec);
            }
            Ok(experiments)
        }
    }

    deserializer.deserialize_map(ExperimentMapVisitor)
}
