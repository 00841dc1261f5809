mod common;

use approx::assert_relative_eq;
use common::{SweepCase, mass_grid, run_sweep_test};
use dmlimit::{
    Catalog, Channel, DmLimitError, LimitCalculator, Mediator, MediatorMass, RateCalculator,
    default_catalog, default_experiment,
};
use ndarray::array;
use std::io::Write;

const GDM_TOML: &str = r#"
[experiments.Copy]
atom_count = 8.7e9
mass_number = 87
min_acceleration = 2.2e-15
target_size = 1.0e-3
baseline = 25.0
measurements = 3.2e6
exposure_time = 20.0
"#;

#[test]
fn test_reference_experiments_heavy_decoherence() {
    let cases = ["GDM", "BECCAL", "MAQRO", "Pino"]
        .into_iter()
        .map(|experiment| SweepCase {
            experiment,
            mediator: Mediator::Heavy,
            channel: Channel::Decoherence,
        })
        .collect();
    let results = run_sweep_test("Heavy Decoherence", cases, &mass_grid(-4.0, 2.0, 7));

    // GDM's threshold lies far below the grid, so every entry is bounded.
    assert!(results[0].iter().all(|limit| limit.is_finite()));
}

#[test]
fn test_reference_experiments_light_decoherence() {
    let cases = vec![
        SweepCase {
            experiment: "GDM",
            mediator: Mediator::light(),
            channel: Channel::Decoherence,
        },
        SweepCase {
            experiment: "BECCAL",
            mediator: Mediator::Light(MediatorMass::Ratio(1.0e-2)),
            channel: Channel::Decoherence,
        },
        SweepCase {
            experiment: "GDM",
            mediator: Mediator::Light(MediatorMass::Fixed(1.0e-6)),
            channel: Channel::Decoherence,
        },
    ];
    run_sweep_test("Light Decoherence", cases, &mass_grid(-4.0, 2.0, 7));
}

#[test]
fn test_gdm_phase_limits() {
    let cases = vec![
        SweepCase {
            experiment: "GDM",
            mediator: Mediator::Heavy,
            channel: Channel::phase(),
        },
        SweepCase {
            experiment: "GDM",
            mediator: Mediator::light(),
            channel: Channel::phase(),
        },
    ];
    run_sweep_test("GDM Phase", cases, &array![1e-3, 1.0, 1e3]);
}

#[test]
fn test_gdm_heavy_sweep_has_no_negative_or_nan_limits() {
    let masses = mass_grid(-5.0, 3.0, 100);
    let cases = vec![SweepCase {
        experiment: "GDM",
        mediator: Mediator::Heavy,
        channel: Channel::Decoherence,
    }];
    let results = run_sweep_test("GDM Heavy Sweep", cases, &masses);
    assert!(results[0].iter().all(|limit| limit.is_finite()));
}

#[test]
fn test_gdm_light_sweep_has_no_negative_or_nan_limits() {
    let masses = mass_grid(-5.0, 3.0, 100);
    let cases = [1.0e-10, 1.0e-2]
        .into_iter()
        .map(|ratio| SweepCase {
            experiment: "GDM",
            mediator: Mediator::Light(MediatorMass::Ratio(ratio)),
            channel: Channel::Decoherence,
        })
        .collect();
    let results = run_sweep_test("GDM Light Sweep", cases, &masses);
    for limits in &results {
        assert!(limits.iter().all(|limit| limit.is_finite()));
    }
}

#[test]
fn test_limit_decreases_as_rate_grows() {
    let profile = default_experiment();
    let masses = array![1e-2, 1.0];
    let rates = RateCalculator::new(profile)
        .rate(&masses, &Mediator::Heavy, Channel::Decoherence)
        .unwrap();
    let limits = LimitCalculator::new(profile)
        .cross_section_limit(&masses, &Mediator::Heavy, Channel::Decoherence)
        .unwrap();

    assert!(rates[0] > 0.0 && rates[1] > 0.0);
    assert_ne!(rates[0], rates[1]);
    let (larger, smaller) = if rates[0] > rates[1] { (0, 1) } else { (1, 0) };
    assert!(limits[larger] < limits[smaller]);
    assert_relative_eq!(
        limits[0] * rates[0],
        limits[1] * rates[1],
        max_relative = 1e-12
    );
}

#[test]
fn test_limit_is_deterministic() {
    let profile = default_experiment();
    let masses = array![1.0];
    let calculator = LimitCalculator::new(profile);
    let first = calculator
        .cross_section_limit(&masses, &Mediator::Heavy, Channel::Decoherence)
        .unwrap();
    let second = calculator
        .cross_section_limit(&masses, &Mediator::Heavy, Channel::Decoherence)
        .unwrap();
    assert!(first[0].is_finite() && first[0] > 0.0);
    assert_eq!(first[0], second[0]);
}

#[test]
fn test_unknown_names_are_errors() {
    assert!(matches!(
        default_catalog().get("LIGO"),
        Err(DmLimitError::UnknownExperiment(name)) if name == "LIGO"
    ));
    assert!(matches!(
        "medium".parse::<Mediator>(),
        Err(DmLimitError::UnknownMediator(tag)) if tag == "medium"
    ));
    assert_eq!(" Heavy ".parse::<Mediator>().unwrap(), Mediator::Heavy);
}

#[test]
fn test_non_positive_mass_is_rejected() {
    let result = LimitCalculator::new(default_experiment()).cross_section_limit(
        &array![1.0, -1.0],
        &Mediator::Heavy,
        Channel::Decoherence,
    );
    assert!(matches!(result, Err(DmLimitError::InvalidMass(m)) if m == -1.0));
}

#[test]
fn test_catalog_file_reproduces_builtin_experiment() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(GDM_TOML.as_bytes()).unwrap();

    let catalog = Catalog::load_from_file(file.path()).unwrap();
    assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["Copy"]);

    let masses = array![1e-3, 1.0];
    let copied = LimitCalculator::new(catalog.get("Copy").unwrap())
        .cross_section_limit(&masses, &Mediator::Heavy, Channel::Decoherence)
        .unwrap();
    let builtin = LimitCalculator::new(default_experiment())
        .cross_section_limit(&masses, &Mediator::Heavy, Channel::Decoherence)
        .unwrap();
    for (a, b) in copied.iter().zip(builtin.iter()) {
        assert_relative_eq!(*a, *b, max_relative = 1e-12);
    }
}

#[test]
fn test_catalog_file_missing_field_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let truncated = GDM_TOML.replace("baseline = 25.0\n", "");
    file.write_all(truncated.as_bytes()).unwrap();

    let result = Catalog::load_from_file(file.path());
    assert!(matches!(result, Err(DmLimitError::DeserializationError(_))));
}

#[test]
fn test_missing_catalog_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let result = Catalog::load_from_file(&path);
    assert!(matches!(result, Err(DmLimitError::IoError { path: p, .. }) if p == path));
}
