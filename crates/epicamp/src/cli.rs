//! Command-line arguments

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "epicamp")]
#[command(about = "Age-structured epidemic scenarios for camp settings")]
pub struct Cli {
    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the Monte Carlo ensemble and write the report
    Run(RunArgs),
    /// Print the identity hash of a scenario without running it
    Hash(InputArgs),
}

/// Everything needed to build a parameter set
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Disease parameter table (Type, Name, Value, CV)
    #[arg(long)]
    pub disease: PathBuf,

    /// Population table (Age, Population_structure, Total_population, ...)
    #[arg(long)]
    pub population: PathBuf,

    /// Select rows of this camp when the population table has a Camp column
    #[arg(long)]
    pub camp: Option<String>,

    /// Intervention profile table (Parameter, Start Time, End Time, Value)
    #[arg(long)]
    pub profile: PathBuf,

    /// Select rows of this profile when the table has a Profile column
    #[arg(long)]
    pub profile_name: Option<String>,

    /// Location used to look up the contact matrix
    #[arg(long, default_value = "Camp")]
    pub location: String,

    /// Directory of fine-grained contact matrices, one `<country>.csv` each
    #[arg(long)]
    pub contact_dir: Option<PathBuf>,

    /// Contact matrix already in model age bands, for unsupported locations
    #[arg(long)]
    pub fallback_matrix: Option<PathBuf>,

    /// Age band boundaries in years, e.g. 0,10,20,...,80
    #[arg(long, value_delimiter = ',')]
    pub age_limits: Option<Vec<u32>>,

    /// People exposed at t = 0
    #[arg(long)]
    pub initial_infected: Option<f64>,

    /// Pre-generated rate draws to use instead of sampling
    #[arg(long)]
    pub generated_draws: Option<PathBuf>,

    /// RK4 steps per simulated day
    #[arg(long)]
    pub substeps: Option<u32>,

    /// YAML file of fully resolved control overrides
    #[arg(long)]
    pub overrides: Option<PathBuf>,

    #[arg(long)]
    pub iterations: Option<usize>,

    /// Simulation horizon in days
    #[arg(long)]
    pub horizon: Option<u32>,

    /// Worker count (does not affect results)
    #[arg(long)]
    pub workers: Option<usize>,

    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    /// Directory for the report and summary files
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Rerun even if output for the same identity hash exists
    #[arg(long)]
    pub force: bool,
}
