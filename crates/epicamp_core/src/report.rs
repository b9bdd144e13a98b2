//! Report normaliser
//!
//! Flattens an ensemble into long-form rows keyed by iteration, time, age
//! band and category, with values in people. Also provides the small
//! aggregations downstream reports start from: a category per age band or
//! summed across bands, running totals, percentile bands across iterations,
//! and per-iteration peaks.

use serde::{Deserialize, Serialize};

use crate::config::ParameterSet;
use crate::error::ModelError;
use crate::model::disease::R0_SAMPLES;
use crate::model::{CategoryKind, CategoryMeta, Compartment, Ensemble, Trajectory};

/// Standard percentiles for summary bands
pub mod standard {
    pub const P5: f64 = 0.05;
    pub const P25: f64 = 0.25;
    pub const P50: f64 = 0.50;
    pub const P75: f64 = 0.75;
    pub const P95: f64 = 0.95;
}

/// One value of the long-form dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub iteration: usize,
    pub time: usize,
    pub age: String,
    pub category: String,
    /// People
    pub value: f64,
}

fn compartment_sum(
    trajectory: &Trajectory,
    t: usize,
    band: usize,
    compartments: &[Compartment],
) -> f64 {
    compartments.iter().map(|&c| trajectory.get(t, c, band)).sum()
}

fn kind_value(trajectory: &Trajectory, kind: &CategoryKind, t: usize, band: usize) -> f64 {
    match kind {
        CategoryKind::Occupancy(c) => trajectory.get(t, *c, band),
        CategoryKind::NewInfections => trajectory.new_infections[t][band],
        CategoryKind::NewSymptomatic => trajectory.new_symptomatic[t][band],
        CategoryKind::Sum(cs) => compartment_sum(trajectory, t, band, cs),
        CategoryKind::Change(cs) if t > 0 => {
            compartment_sum(trajectory, t, band, cs) - compartment_sum(trajectory, t - 1, band, cs)
        }
        CategoryKind::Change(_) => 0.0,
        CategoryKind::Cumulative(inner) => {
            (0..=t).map(|s| kind_value(trajectory, inner, s, band)).sum()
        }
    }
}

/// Value of a category for one band at step `t`, as a population fraction
pub fn category_value(trajectory: &Trajectory, meta: &CategoryMeta, t: usize, band: usize) -> f64 {
    kind_value(trajectory, &meta.kind, t, band)
}

/// `[t][band]` table of a category kind, as population fractions.
///
/// Running totals are accumulated step by step rather than re-summed.
fn kind_table(trajectory: &Trajectory, kind: &CategoryKind) -> Vec<Vec<f64>> {
    match kind {
        CategoryKind::Cumulative(inner) => {
            let mut table = kind_table(trajectory, inner);
            for t in 1..table.len() {
                let (done, rest) = table.split_at_mut(t);
                for (value, previous) in rest[0].iter_mut().zip(&done[t - 1]) {
                    *value += previous;
                }
            }
            table
        }
        _ => (0..trajectory.len())
            .map(|t| {
                (0..trajectory.num_bands)
                    .map(|band| kind_value(trajectory, kind, t, band))
                    .collect()
            })
            .collect(),
    }
}

/// Long-form dataset of the whole ensemble
pub fn normalize(params: &ParameterSet, ensemble: &Ensemble) -> Vec<ReportRow> {
    let population = params.total_population();
    let bands = &params.population.bands;
    let mut rows = Vec::with_capacity(
        ensemble.trajectories.len()
            * ensemble.trajectories.first().map_or(0, Trajectory::len)
            * bands.len()
            * params.categories.len(),
    );

    for trajectory in &ensemble.trajectories {
        let tables: Vec<Vec<Vec<f64>>> = params
            .categories
            .iter()
            .map(|meta| kind_table(trajectory, &meta.kind))
            .collect();
        for t in 0..trajectory.len() {
            for (band, info) in bands.iter().enumerate() {
                for (meta, table) in params.categories.iter().zip(&tables) {
                    rows.push(ReportRow {
                        iteration: trajectory.iteration,
                        time: t,
                        age: info.label.clone(),
                        category: meta.code.clone(),
                        value: table[t][band] * population,
                    });
                }
            }
        }
    }
    rows
}

fn find_category<'a>(params: &'a ParameterSet, code: &str) -> Option<&'a CategoryMeta> {
    params.categories.iter().find(|m| m.code == code)
}

fn in_people(table: Vec<Vec<f64>>, population: f64) -> Vec<Vec<f64>> {
    table
        .into_iter()
        .map(|row| row.into_iter().map(|v| v * population).collect())
        .collect()
}

fn sum_bands(table: &[Vec<f64>]) -> Vec<f64> {
    table.iter().map(|row| row.iter().sum()).collect()
}

/// Category per age band at every step, in people: `[t][band]`
pub fn category_by_age(
    params: &ParameterSet,
    trajectory: &Trajectory,
    code: &str,
) -> Option<Vec<Vec<f64>>> {
    let meta = find_category(params, code)?;
    Some(in_people(kind_table(trajectory, &meta.kind), params.total_population()))
}

/// Category summed across age bands at every step, in people
pub fn category_series(
    params: &ParameterSet,
    trajectory: &Trajectory,
    code: &str,
) -> Option<Vec<f64>> {
    category_by_age(params, trajectory, code).map(|table| sum_bands(&table))
}

/// `category_series` for every trajectory, in iteration order
pub fn prevalence_all(
    params: &ParameterSet,
    ensemble: &Ensemble,
    code: &str,
) -> Option<Vec<Vec<f64>>> {
    ensemble
        .trajectories
        .iter()
        .map(|t| category_series(params, t, code))
        .collect()
}

/// Running total of a category per age band, in people: `[t][band]`.
///
/// For the change-tracking categories this is the number of cases since the
/// start of the run; for occupancy categories it is person-days.
pub fn cumulative_by_age(
    params: &ParameterSet,
    trajectory: &Trajectory,
    code: &str,
) -> Option<Vec<Vec<f64>>> {
    let meta = find_category(params, code)?;
    let running = CategoryKind::Cumulative(Box::new(meta.kind.clone()));
    Some(in_people(kind_table(trajectory, &running), params.total_population()))
}

/// `cumulative_by_age` summed across age bands, for every trajectory in
/// iteration order
pub fn cumulative_all(
    params: &ParameterSet,
    ensemble: &Ensemble,
    code: &str,
) -> Option<Vec<Vec<f64>>> {
    ensemble
        .trajectories
        .iter()
        .map(|t| cumulative_by_age(params, t, code).map(|table| sum_bands(&table)))
        .collect()
}

/// Linear-interpolation percentile of `values` (need not be sorted)
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64))
}

/// Percentiles across iterations at one step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileBand {
    pub time: usize,
    pub p5: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
}

/// Percentile band of a category at every step
pub fn percentile_bands(series: &[Vec<f64>]) -> Vec<PercentileBand> {
    let steps = series.iter().map(Vec::len).min().unwrap_or(0);
    (0..steps)
        .filter_map(|t| {
            let column: Vec<f64> = series.iter().map(|s| s[t]).collect();
            Some(PercentileBand {
                time: t,
                p5: percentile(&column, standard::P5)?,
                p25: percentile(&column, standard::P25)?,
                p50: percentile(&column, standard::P50)?,
                p75: percentile(&column, standard::P75)?,
                p95: percentile(&column, standard::P95)?,
            })
        })
        .collect()
}

/// First step at which `series` reaches its maximum, and the maximum
pub fn peak(series: &[f64]) -> Option<(usize, f64)> {
    series
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (t, v)| match best {
            Some((_, bv)) if bv >= v => best,
            _ => Some((t, v)),
        })
}

/// Metadata published alongside the long-form dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub identity_hash: String,
    pub scenario: String,
    pub location: String,
    pub base_seed: u64,
    pub iterations: usize,
    pub completed_iterations: usize,
    pub failed_iterations: Vec<usize>,
    pub total_population: f64,
    pub infection_matrix: Vec<Vec<f64>>,
    pub largest_eigenvalue: f64,
    pub beta_list: Vec<f64>,
    /// Spread of the low, central and high transmissibility samples
    pub beta_sigma: [f64; R0_SAMPLES],
    pub warnings: Vec<String>,
}

impl RunSummary {
    pub fn new(params: &ParameterSet, ensemble: &Ensemble) -> Result<Self, ModelError> {
        Ok(Self {
            identity_hash: params.identity_hash()?,
            scenario: params.scenario_label(),
            location: params.location.clone(),
            base_seed: ensemble.base_seed,
            iterations: ensemble.iterations,
            completed_iterations: ensemble.trajectories.len(),
            failed_iterations: ensemble.failed_iterations(),
            total_population: params.total_population(),
            infection_matrix: params.infection.base.rows().to_vec(),
            largest_eigenvalue: params.infection.largest_eigenvalue,
            beta_list: params.infection.beta_list.clone(),
            beta_sigma: params.disease.beta_sigma,
            warnings: ensemble.warnings(),
        })
    }
}
