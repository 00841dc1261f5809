use clap::{Args, Parser, ValueEnum};
use std::path::PathBuf;

const ABOUT: &str = "A command-line tool for computing dark-matter cross-section limits of atom-interferometer experiments.";
const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

/// Light-mediator ratios m_φ/m_x swept by default.
pub const DEFAULT_RATIOS: [f64; 8] = [1e-10, 1e-9, 1e-7, 1e-6, 1e-5, 1e-4, 1e-3, 1e-2];

#[derive(Parser)]
#[command(version, about = ABOUT, help_template = HELP_TEMPLATE)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub experiments: ExperimentOptions,

    #[command(flatten)]
    pub model: ModelOptions,

    #[command(flatten)]
    pub sweep: SweepOptions,

    #[command(flatten)]
    pub output: OutputOptions,

    /// Enable debug logging on standard error.
    ///
    /// Without this flag the log level is taken from `RUST_LOG`, with warnings always shown.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Options selecting the experiments to evaluate.
#[derive(Args)]
#[command(next_help_heading = "Experiment Options")]
pub struct ExperimentOptions {
    /// Experiment to evaluate. May be repeated.
    ///
    /// If not specified, every experiment of the catalog is evaluated.
    #[arg(short = 'e', long = "experiment", value_name = "NAME")]
    pub names: Vec<String>,

    /// Custom experiment catalog in TOML format.
    ///
    /// If not specified, the built-in catalog (GDM, BECCAL, MAQRO, Pino) is used.
    #[arg(short, long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,
}

/// Options describing the interaction model and detection channel.
#[derive(Args)]
#[command(next_help_heading = "Model Options")]
pub struct ModelOptions {
    /// Mediator hypothesis.
    #[arg(short, long, value_enum, default_value_t = MediatorKind::Heavy)]
    pub mediator: MediatorKind,

    /// Mediator-to-dark-matter mass ratios for the light mediator, comma separated.
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_RATIOS)]
    pub ratios: Vec<f64>,

    /// Mediator mass in MeV for the fixed light mediator.
    #[arg(long, value_name = "MEV", default_value_t = 1e-6)]
    pub fixed_mass: f64,

    /// Use the phase detection channel instead of decoherence.
    #[arg(long)]
    pub phase: bool,

    /// Report the imaginary component of the phase response.
    #[arg(long, requires = "phase")]
    pub imaginary: bool,

    /// Integrate the phase response adaptively instead of on the fixed grid.
    #[arg(long, requires = "phase")]
    pub exact: bool,

    /// Interferometer visibility.
    #[arg(long, default_value_t = 0.5)]
    pub visibility: f64,

    /// Use the contrast noise model instead of shot noise plus background.
    #[arg(long)]
    pub contrast: bool,
}

/// Options controlling the dark-matter mass grid.
#[derive(Args)]
#[command(next_help_heading = "Sweep Options")]
pub struct SweepOptions {
    /// Base-10 logarithm of the smallest dark-matter mass in MeV.
    #[arg(long, value_name = "LOG10", default_value_t = -6.5, allow_negative_numbers = true)]
    pub mass_min: f64,

    /// Base-10 logarithm of the largest dark-matter mass in MeV.
    #[arg(long, value_name = "LOG10", default_value_t = 3.5, allow_negative_numbers = true)]
    pub mass_max: f64,

    /// Number of logarithmically spaced masses.
    #[arg(long, default_value_t = 1000)]
    pub points: usize,

    /// Number of masses integrated together as one batch.
    #[arg(long, default_value_t = 50)]
    pub batch_size: usize,
}

/// Options for controlling the output format and destination.
#[derive(Args)]
#[command(next_help_heading = "Output Options")]
pub struct OutputOptions {
    /// Output directory.
    ///
    /// One file per experiment is written, named `<EXPERIMENT>_<h|l>[_k][_phase]` with an
    /// extension matching the format. If not specified, results are written to standard output.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Output format for the results.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,

    /// Quantity reported for each mass.
    #[arg(short, long, value_enum, default_value_t = Quantity::CrossSection)]
    pub quantity: Quantity,

    /// Number of significant digits after the decimal point.
    #[arg(short, long, default_value_t = 4)]
    pub precision: usize,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MediatorKind {
    /// Contact interaction.
    Heavy,
    /// Light mediator with m_φ proportional to m_x, one column per ratio.
    Light,
    /// Light mediator of a single fixed mass.
    FixedLight,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Quantity {
    /// Cross section in cm².
    CrossSection,
    /// Axion-like coupling in MeV.
    Axion,
    /// Dimensionless fifth-force strength.
    FifthForce,
}

/// Output format for the limit tables.
#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table with a summary of the best limit.
    Pretty,
    /// Comma-separated values with a mass column followed by one column per mediator setting.
    Csv,
    /// JSON object with the experiment metadata and one array per column.
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Pretty => "txt",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}
