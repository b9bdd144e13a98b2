//! Integration tests for the epidemic simulation engine
//!
//! Tests are organized by topic:
//! - `scenarios` - End-to-end runs: reproducibility, epidemic peak, ICU capacity
//! - `conservation` - Population conservation and integrator metrics
//! - `interventions` - Effect of each time-windowed intervention
//! - `identity` - Content hash stability and sensitivity
//! - `sampling` - Rate draws, pre-generated draws and divergence handling
//! - `report` - Long-form dataset and run summary

mod conservation;
mod identity;
mod report;

use crate::config::schedule::{RANDOM_SEED, WORKERS};
use crate::config::{InterventionProfile, ParameterSet, ParameterSetBuilder, ProfileRow};
use crate::contact::{ContactLibrary, ContactMatrix};
use crate::model::fixtures::{population_row, sample_table};

pub(crate) const POPULATION: f64 = 10_000.0;
pub(crate) const SEED: &str = "42";

/// Baseline profile with a fixed seed and worker count
pub(crate) fn seeded_profile(iterations: usize, horizon: u32) -> InterventionProfile {
    InterventionProfile::baseline(iterations, horizon, POPULATION)
        .set(ProfileRow::new(RANDOM_SEED, SEED))
        .set(ProfileRow::new(WORKERS, "4"))
}

/// Single age band of 10,000 people with a unit contact matrix
pub(crate) fn single_band(iterations: usize, horizon: u32) -> ParameterSetBuilder {
    ParameterSetBuilder::new("Test camp")
        .age_limits(&[0, 80])
        .disease_table(sample_table())
        .population_rows(vec![population_row("0-79", 100.0, POPULATION)])
        .contact_library(ContactLibrary::default().with_fallback(ContactMatrix::identity(1)))
        .profile(seeded_profile(iterations, horizon))
}

/// Two age bands; the second (older) band is the shielded/high-risk group
pub(crate) fn two_band(iterations: usize, horizon: u32) -> ParameterSetBuilder {
    let mut old = population_row("40+", 30.0, POPULATION);
    old.hosp_given_symptomatic_pct = 20.0;
    old.critical_given_hospitalised_pct = 40.0;
    ParameterSetBuilder::new("Test camp")
        .age_limits(&[0, 40, 80])
        .disease_table(sample_table())
        .population_rows(vec![population_row("0-39", 70.0, POPULATION), old])
        .contact_library(ContactLibrary::default().with_fallback(
            ContactMatrix::new(vec![vec![6.0, 2.0], vec![2.0, 3.0]]).unwrap(),
        ))
        .profile(seeded_profile(iterations, horizon))
}

pub(crate) fn build(builder: ParameterSetBuilder) -> ParameterSet {
    builder.build().expect("parameter set should build")
}
