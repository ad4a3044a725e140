use clap::builder::PossibleValuesParser;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const AUTHORS: &str = "Tony Kan, Ted Yu, William A. Goddard III";
const ABOUT: &str = "A command-line tool for calculating empirical partial atomic charges and fitting charge model parameters against reference charges.";
const COPYRIGHT: &str = "Copyright (c) 2025 California Institute of Technology, Materials and Process Simulation Center (MSC)";
const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = AUTHORS,
    version,
    about = ABOUT,
    after_help = COPYRIGHT,
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub logging: LoggingOptions,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print atom and atom type statistics of a molecule set.
    Info(InfoArgs),
    /// Calculate partial charges for every molecule of a set.
    Charges(ChargesArgs),
    /// Fit the parameters of a charge method against reference charges.
    Parameterize(ParameterizeArgs),
    /// Compare two charge files over a molecule set.
    Stats(StatsArgs),
}

/// Options controlling diagnostics and parallelism, shared by every subcommand.
#[derive(Args, Debug)]
#[command(next_help_heading = "Global Options")]
pub struct LoggingOptions {
    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a file in addition to the console output.
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Number of worker threads. Defaults to the number of logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

/// Arguments of the `info` subcommand.
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Input file containing molecules in SDF (V2000) format. Use '-' for standard input.
    #[arg(value_name = "SDF")]
    pub input: String,

    /// Classification scheme used to group atoms into types.
    #[arg(long, value_enum, default_value_t = ClassifierChoice::Plain)]
    pub classifier: ClassifierChoice,
}

/// Arguments of the `charges` subcommand.
#[derive(Args, Debug)]
pub struct ChargesArgs {
    /// Charge calculation method.
    #[arg(value_name = "METHOD", value_parser = PossibleValuesParser::new(chargefit::available_methods()))]
    pub method: String,

    /// Input file containing molecules in SDF (V2000) format. Use '-' for standard input.
    #[arg(value_name = "SDF")]
    pub input: String,

    /// Output file for the calculated charges (JSON).
    #[arg(value_name = "OUT")]
    pub output: PathBuf,

    /// Parameter file (JSON) for methods with parameters.
    #[arg(short = 'P', long, value_name = "FILE")]
    pub par_file: Option<PathBuf>,

    #[command(flatten)]
    pub display: DisplayOptions,
}

/// Arguments of the `parameterize` subcommand.
#[derive(Args, Debug)]
pub struct ParameterizeArgs {
    /// Charge calculation method whose parameters are fitted.
    #[arg(value_name = "METHOD", value_parser = PossibleValuesParser::new(chargefit::available_methods()))]
    pub method: String,

    /// Training set in SDF (V2000) format. Use '-' for standard input.
    #[arg(value_name = "SDF")]
    pub input: String,

    /// Reference charges (JSON) for every molecule of the training set.
    #[arg(value_name = "REF")]
    pub reference: PathBuf,

    /// Output file for the fitted parameters (JSON).
    #[arg(value_name = "OUT")]
    pub output: PathBuf,

    /// Classification scheme used to derive the atom types of the fitted parameters.
    #[arg(long, value_enum, default_value_t = ClassifierChoice::Plain)]
    pub classifier: ClassifierChoice,

    #[command(flatten)]
    pub search: SearchOptions,

    #[command(flatten)]
    pub display: DisplayOptions,
}

/// Options controlling the parameter search.
#[derive(Args, Debug)]
#[command(next_help_heading = "Search Options")]
pub struct SearchOptions {
    /// Parameterization options file in TOML format.
    ///
    /// Values given on the command line override the file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of independent multi-start runs.
    #[arg(long, value_name = "NUM")]
    pub population: Option<usize>,

    /// Base seed of the random starting points.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Maximum number of L-BFGS iterations per run.
    #[arg(long, value_name = "NUM")]
    pub max_iterations: Option<u32>,
}

/// Arguments of the `stats` subcommand.
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Molecules in SDF (V2000) format. Use '-' for standard input.
    #[arg(value_name = "SDF")]
    pub input: String,

    /// Reference charges (JSON).
    #[arg(value_name = "REF")]
    pub reference: PathBuf,

    /// Calculated charges (JSON).
    #[arg(value_name = "CALC")]
    pub calculated: PathBuf,

    /// Parameter file (JSON) whose atom types group the per-type statistics.
    ///
    /// Without it atoms are grouped by `--classifier`.
    #[arg(short = 'P', long, value_name = "FILE", requires = "method")]
    pub par_file: Option<PathBuf>,

    /// Charge method the parameter file belongs to.
    #[arg(long, value_name = "METHOD", requires = "par_file", value_parser = PossibleValuesParser::new(chargefit::available_methods()))]
    pub method: Option<String>,

    /// Classification scheme used when no parameter file is given.
    #[arg(long, value_enum, default_value_t = ClassifierChoice::Plain, conflicts_with = "par_file")]
    pub classifier: ClassifierChoice,

    #[command(flatten)]
    pub display: DisplayOptions,
}

/// Options for controlling the printed tables.
#[derive(Args, Debug)]
#[command(next_help_heading = "Output Options")]
pub struct DisplayOptions {
    /// Number of decimal places to display for floating-point values.
    #[arg(short, long, default_value_t = 3)]
    pub precision: usize,
}

/// Built-in classification schemes.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ClassifierChoice {
    /// One type per element.
    Plain,
    /// One type per element and highest bond order.
    Hbo,
}

impl ClassifierChoice {
    pub fn scheme_name(self) -> &'static str {
        match self {
            ClassifierChoice::Plain => chargefit::Plain::NAME,
            ClassifierChoice::Hbo => chargefit::HighestBondOrder::NAME,
        }
    }
}
