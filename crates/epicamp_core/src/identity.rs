//! Content identity of a parameter set
//!
//! Every field that influences simulation output is serialised to JSON in a
//! fixed field order and hashed with SHA-256. The worker count is left out:
//! it changes scheduling, never results. Only ordered containers are used in
//! the hashed view so that the byte string is the same on every host.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::ParameterSet;
use crate::contact::ContactMatrix;
use crate::model::{
    CategoryMeta, DiseaseRow, DrawnRates, Interventions, PopulationProfile,
};

#[derive(Serialize)]
struct RunView {
    iterations: usize,
    horizon: u32,
    random_seed: Option<u64>,
}

#[derive(Serialize)]
struct HashView<'a> {
    interventions: &'a Interventions,
    run: RunView,
    infection_matrix: &'a ContactMatrix,
    shielded_matrix: Option<&'a ContactMatrix>,
    beta_list: &'a [f64],
    largest_eigenvalue: f64,
    generated_draws: &'a [DrawnRates],
    population: &'a PopulationProfile,
    location: &'a str,
    age_limits: &'a [u32],
    categories: &'a [CategoryMeta],
    disease_table: &'a [DiseaseRow],
    substeps_per_day: u32,
}

impl<'a> HashView<'a> {
    fn new(params: &'a ParameterSet) -> Self {
        let run = &params.control.run;
        Self {
            interventions: &params.control.interventions,
            run: RunView {
                iterations: run.iterations,
                horizon: run.horizon,
                random_seed: run.random_seed,
            },
            infection_matrix: &params.infection.base,
            shielded_matrix: params.infection.shielded.as_ref(),
            beta_list: &params.infection.beta_list,
            largest_eigenvalue: params.infection.largest_eigenvalue,
            generated_draws: &params.generated_draws,
            population: &params.population,
            location: &params.location,
            age_limits: &params.age_limits,
            categories: &params.categories,
            disease_table: &params.disease_table.rows,
            substeps_per_day: params.substeps_per_day,
        }
    }
}

/// Canonical byte string that is hashed
pub fn canonical_bytes(params: &ParameterSet) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&HashView::new(params))
}

/// Hex-encoded SHA-256 of the canonical serialisation
pub fn parameter_hash(params: &ParameterSet) -> Result<String, serde_json::Error> {
    let bytes = canonical_bytes(params)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
