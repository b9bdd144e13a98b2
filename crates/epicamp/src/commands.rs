//! Subcommand implementations

use std::fs;

use color_eyre::eyre::{Result, WrapErr};

use epicamp_core::config::{ParameterSet, ParameterSetBuilder};
use epicamp_core::report::{self, RunSummary};
use epicamp_core::simulation::monte_carlo_simulate;

use crate::cli::{InputArgs, RunArgs};
use crate::inputs;
use crate::output::{self, OutputPaths};
use crate::overrides::collect_overrides;

/// Read every input file and build the parameter set
pub fn build_parameters(args: &InputArgs) -> Result<ParameterSet> {
    let mut builder = ParameterSetBuilder::new(&args.location)
        .disease_table(inputs::read_disease_table(&args.disease)?)
        .population_rows(inputs::read_population(&args.population, args.camp.as_deref())?)
        .profile(inputs::read_profile(&args.profile, args.profile_name.as_deref())?)
        .contact_library(inputs::read_contact_library(
            args.contact_dir.as_deref(),
            args.fallback_matrix.as_deref(),
        )?)
        .overrides(collect_overrides(args)?);

    if let Some(limits) = &args.age_limits {
        builder = builder.age_limits(limits);
    }
    if let Some(people) = args.initial_infected {
        builder = builder.initial_infected(people);
    }
    if let Some(path) = &args.generated_draws {
        builder = builder.generated_draws(inputs::read_generated_draws(path)?);
    }
    if let Some(substeps) = args.substeps {
        builder = builder.substeps_per_day(substeps);
    }

    Ok(builder.build()?)
}

pub fn hash(args: &InputArgs) -> Result<String> {
    let params = build_parameters(args)?;
    Ok(params.identity_hash()?)
}

/// What a `run` produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub identity_hash: String,
    pub paths: OutputPaths,
    /// Output existed already and was left untouched
    pub reused: bool,
    pub warnings: Vec<String>,
}

pub fn run(args: &RunArgs) -> Result<RunOutcome> {
    let params = build_parameters(&args.inputs)?;
    let identity_hash = params.identity_hash()?;
    let paths = OutputPaths::new(&args.output_dir, &identity_hash);

    if paths.exist() && !args.force {
        tracing::info!(%identity_hash, "output exists, skipping run");
        return Ok(RunOutcome {
            identity_hash,
            paths,
            reused: true,
            warnings: Vec::new(),
        });
    }

    tracing::info!(
        %identity_hash,
        location = %params.location,
        scenario = %params.scenario_label(),
        "running scenario"
    );
    let ensemble = monte_carlo_simulate(&params)?;
    let summary = RunSummary::new(&params, &ensemble)?;
    for warning in &summary.warnings {
        tracing::warn!("{warning}");
    }

    fs::create_dir_all(&args.output_dir)
        .wrap_err_with(|| format!("cannot create {}", args.output_dir.display()))?;
    let rows = report::normalize(&params, &ensemble);
    output::write_report(&paths.report, &rows)?;
    output::write_summary(&paths.summary, &summary)?;
    tracing::info!(rows = rows.len(), report = %paths.report.display(), "report written");

    Ok(RunOutcome {
        identity_hash,
        paths,
        reused: false,
        warnings: summary.warnings,
    })
}
