#![allow(dead_code)]

use dmlimit::{Channel, LimitCalculator, Mediator, default_catalog};
use ndarray::Array1;

pub struct SweepCase<'a> {
    pub experiment: &'a str,
    pub mediator: Mediator,
    pub channel: Channel,
}

/// Logarithmically spaced masses 10^lo … 10^hi MeV.
pub fn mass_grid(lo: f64, hi: f64, points: usize) -> Array1<f64> {
    Array1::logspace(10.0, lo, hi, points)
}

/// Runs each case over `masses` with the built-in catalog and checks that every limit is
/// strictly positive and never NaN. Returns the limits in case order.
pub fn run_sweep_test(group_name: &str, cases: Vec<SweepCase>, masses: &Array1<f64>) -> Vec<Array1<f64>> {
    let catalog = default_catalog();
    let mut results = Vec::with_capacity(cases.len());

    println!("\nRunning Sweep Test: {}", group_name);
    println!("{:-<80}", "");
    println!(
        "{:<10} | {:<28} | {:<12} | {:<12} | {:<8}",
        "Experiment", "Mediator", "Best (cm²)", "At m_x", "Infinite"
    );

    for case in cases {
        let profile = catalog.get(case.experiment).expect("Experiment missing");
        let limits = LimitCalculator::new(profile)
            .cross_section_limit(masses, &case.mediator, case.channel)
            .expect("Limit computation failed");

        assert_eq!(limits.len(), masses.len());
        for (mx, limit) in masses.iter().zip(limits.iter()) {
            assert!(!limit.is_nan(), "{}: NaN limit at m_x = {:e}", case.experiment, mx);
            assert!(*limit > 0.0, "{}: limit {:e} at m_x = {:e}", case.experiment, limit, mx);
        }

        let (best_index, best) = limits
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, v)| (i, *v))
            .expect("Empty mass grid");
        let infinite = limits.iter().filter(|l| l.is_infinite()).count();

        println!(
            "{:<10} | {:<28} | {:<12.4e} | {:<12.4e} | {:<8}",
            case.experiment,
            case.mediator.to_string(),
            best,
            masses[best_index],
            infinite
        );

        results.push(limits);
    }

    println!("{:-<80}\n", "");
    results
}
