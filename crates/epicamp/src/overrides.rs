//! Control overrides from a YAML file and command-line flags
//!
//! Overrides are fully resolved records in population-relative units, e.g.
//!
//! ```yaml
//! numberOfIterations: 200
//! ICU_capacity:
//!   fraction: 0.0003
//! better_hygiene:
//!   window: { start: 10, end: 90 }
//!   reduction: 0.3
//! ```

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Result, WrapErr, eyre};

use crate::cli::InputArgs;
use epicamp_core::ControlOverrides;

pub fn parse_overrides(yaml: &str) -> Result<ControlOverrides, serde_saphyr::Error> {
    serde_saphyr::from_str(yaml)
}

pub fn load_overrides(path: &Path) -> Result<ControlOverrides> {
    let yaml =
        fs::read_to_string(path).wrap_err_with(|| format!("cannot read {}", path.display()))?;
    parse_overrides(&yaml).map_err(|e| eyre!("invalid overrides in {}: {e}", path.display()))
}

/// Overrides file (if any) with the run-control flags applied on top
pub fn collect_overrides(args: &InputArgs) -> Result<ControlOverrides> {
    let mut overrides = match &args.overrides {
        Some(path) => load_overrides(path)?,
        None => ControlOverrides::default(),
    };

    if args.iterations.is_some() {
        overrides.iterations = args.iterations;
    }
    if args.horizon.is_some() {
        overrides.horizon = args.horizon;
    }
    if args.workers.is_some() {
        overrides.workers = args.workers;
    }
    if args.seed.is_some() {
        overrides.random_seed = args.seed;
    }

    if !overrides.is_empty() {
        tracing::debug!(?overrides, "control overrides");
    }
    Ok(overrides)
}
