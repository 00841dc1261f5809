use super::cli::{Cli, MediatorKind, Quantity};
use super::error::CliError;
use super::io;
use dmlimit::{
    Catalog, Channel, DEFAULT_MASS_SPLITTING_MEV, ExperimentProfile, LimitCalculator,
    LimitOptions, Mediator, MediatorMass, PhaseAccuracy, PhaseComponent,
    cross_section_to_axion_coupling, cross_section_to_fifth_force_coupling, default_catalog,
};
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{Array1, Axis};
use rayon::prelude::*;
use std::fs;
use std::io::Write;
use tracing::{debug, info};

/// The limits of one mediator setting, headed by its column name.
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

/// The limits of one experiment over the mass grid.
pub struct LimitTable {
    pub experiment: String,
    pub file_stem: String,
    pub mediator: String,
    pub channel: String,
    pub quantity: Quantity,
    pub masses: Vec<f64>,
    pub columns: Vec<Column>,
}

pub fn run(args: Cli) -> Result<(), CliError> {
    validate(&args)?;

    let catalog = match &args.experiments.catalog {
        Some(path) => Catalog::load_from_file(path)?,
        None => default_catalog().clone(),
    };
    let profiles: Vec<&ExperimentProfile> = if args.experiments.names.is_empty() {
        catalog.iter().collect()
    } else {
        args.experiments
            .names
            .iter()
            .map(|name| catalog.get(name))
            .collect::<Result<_, _>>()?
    };

    let masses = Array1::logspace(
        10.0,
        args.sweep.mass_min,
        args.sweep.mass_max,
        args.sweep.points,
    );
    let channel = channel(&args);
    let options = LimitOptions {
        visibility: args.model.visibility,
        ..Default::default()
    };
    let chunks: Vec<Array1<f64>> = masses
        .axis_chunks_iter(Axis(0), args.sweep.batch_size)
        .map(|chunk| chunk.to_owned())
        .collect();

    let settings = mediator_settings(&args);
    let total = (profiles.len() * settings.len() * chunks.len()) as u64;
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut tables = Vec::with_capacity(profiles.len());
    for profile in profiles {
        pb.set_message(format!("Computing limits for {}...", profile.name()));
        info!(
            experiment = profile.name(),
            mediator = %describe_mediator(&args),
            phase = args.model.phase,
            "Computing cross-section limits."
        );

        let calculator = LimitCalculator::new(profile).with_options(options);
        let mut columns = Vec::with_capacity(settings.len());
        for (name, mediator) in &settings {
            let batches = chunks
                .par_iter()
                .map(|chunk| {
                    let limits = if args.model.contrast {
                        calculator.contrast_cross_section_limit(chunk, mediator, channel)
                    } else {
                        calculator.cross_section_limit(chunk, mediator, channel)
                    };
                    pb.inc(1);
                    limits
                })
                .collect::<Result<Vec<_>, _>>()?;

            let values = batches
                .iter()
                .flat_map(|batch| batch.iter())
                .map(|&sigma| convert(sigma, args.output.quantity, profile))
                .collect();
            debug!(experiment = profile.name(), column = %name, "Column complete.");
            columns.push(Column {
                name: name.clone(),
                values,
            });
        }

        tables.push(LimitTable {
            experiment: profile.name().to_string(),
            file_stem: file_stem(profile.name(), &args),
            mediator: describe_mediator(&args),
            channel: describe_channel(channel),
            quantity: args.output.quantity,
            masses: masses.to_vec(),
            columns,
        });
    }

    pb.finish_and_clear();

    match &args.output.output {
        Some(dir) => {
            fs::create_dir_all(dir).map_err(|e| CliError::Io {
                path: dir.clone(),
                source: e,
            })?;
            for table in &tables {
                let path = dir.join(format!(
                    "{}.{}",
                    table.file_stem,
                    args.output.format.extension()
                ));
                let writer = io::get_writer(&Some(path.clone()))?;
                io::write_table(writer, table, &args.output.format, args.output.precision)?;
                info!(path = %path.display(), "Saved limits to file.");
            }
        }
        None => {
            for (i, table) in tables.iter().enumerate() {
                let mut writer = io::get_writer(&None)?;
                if i > 0 {
                    writeln!(writer)?;
                }
                io::write_table(writer, table, &args.output.format, args.output.precision)?;
            }
        }
    }

    Ok(())
}

fn validate(args: &Cli) -> Result<(), CliError> {
    if args.sweep.points == 0 {
        return Err(CliError::InvalidArgument(
            "the mass grid needs at least one point".to_string(),
        ));
    }
    if args.sweep.batch_size == 0 {
        return Err(CliError::InvalidArgument(
            "the batch size must be positive".to_string(),
        ));
    }
    let (lo, hi) = (args.sweep.mass_min, args.sweep.mass_max);
    if !lo.is_finite() || !hi.is_finite() || lo > hi {
        return Err(CliError::InvalidArgument(format!(
            "mass range 10^{lo} to 10^{hi} MeV is empty"
        )));
    }
    let visibility = args.model.visibility;
    if visibility.is_nan() || visibility <= 0.0 || visibility > 1.0 {
        return Err(CliError::InvalidArgument(format!(
            "visibility {visibility} is outside (0, 1]"
        )));
    }
    if args.model.mediator == MediatorKind::Light && args.model.ratios.is_empty() {
        return Err(CliError::InvalidArgument(
            "the light mediator needs at least one mass ratio".to_string(),
        ));
    }
    Ok(())
}

fn channel(args: &Cli) -> Channel {
    if !args.model.phase {
        return Channel::Decoherence;
    }
    Channel::Phase {
        component: if args.model.imaginary {
            PhaseComponent::Imaginary
        } else {
            PhaseComponent::Real
        },
        accuracy: if args.model.exact {
            PhaseAccuracy::Exact
        } else {
            PhaseAccuracy::FastGrid
        },
    }
}

/// The decade index k of a mediator mass or ratio 10^{-k}.
fn decade(value: f64) -> i64 {
    (-value.log10()).round() as i64
}

fn mediator_settings(args: &Cli) -> Vec<(String, Mediator)> {
    match args.model.mediator {
        MediatorKind::Heavy => vec![("sigma".to_string(), Mediator::Heavy)],
        MediatorKind::Light => args
            .model
            .ratios
            .iter()
            .map(|&ratio| {
                (
                    format!("sigma_{}", decade(ratio)),
                    Mediator::Light(MediatorMass::Ratio(ratio)),
                )
            })
            .collect(),
        MediatorKind::FixedLight => vec![(
            format!("sigma_{}", decade(args.model.fixed_mass)),
            Mediator::Light(MediatorMass::Fixed(args.model.fixed_mass)),
        )],
    }
}

fn file_stem(experiment: &str, args: &Cli) -> String {
    let mut stem = match args.model.mediator {
        MediatorKind::Heavy => format!("{experiment}_h"),
        MediatorKind::Light => format!("{experiment}_l"),
        MediatorKind::FixedLight => {
            format!("{experiment}_l_{}", decade(args.model.fixed_mass))
        }
    };
    if args.model.phase {
        stem.push_str("_phase");
    }
    stem
}

fn describe_mediator(args: &Cli) -> String {
    match args.model.mediator {
        MediatorKind::Heavy => Mediator::Heavy.to_string(),
        MediatorKind::Light => "light (m_phi = ratio x m_x)".to_string(),
        MediatorKind::FixedLight => {
            Mediator::Light(MediatorMass::Fixed(args.model.fixed_mass)).to_string()
        }
    }
}

fn describe_channel(channel: Channel) -> String {
    match channel {
        Channel::Decoherence => "decoherence".to_string(),
        Channel::Phase {
            component,
            accuracy,
        } => {
            let component = match component {
                PhaseComponent::Real => "real",
                PhaseComponent::Imaginary => "imaginary",
            };
            let accuracy = match accuracy {
                PhaseAccuracy::FastGrid => "grid",
                PhaseAccuracy::Exact => "adaptive",
            };
            format!("phase ({component}, {accuracy})")
        }
    }
}

fn convert(sigma: f64, quantity: Quantity, profile: &ExperimentProfile) -> f64 {
    match quantity {
        Quantity::CrossSection => sigma,
        Quantity::Axion => cross_section_to_axion_coupling(sigma, DEFAULT_MASS_SPLITTING_MEV),
        Quantity::FifthForce => cross_section_to_fifth_force_coupling(sigma, profile),
    }
}
