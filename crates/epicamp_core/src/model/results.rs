//! Simulation outputs: per-iteration trajectories and the ensemble

use serde::{Deserialize, Serialize};

use super::compartments::Compartment;
use crate::error::IterationError;

/// One scalar per stochastic rate, as drawn for a single iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawnRates {
    /// Transmissibility, already normalised by the dominant eigenvalue
    pub beta: f64,
    pub latent_rate: f64,
    pub removal_rate: f64,
    pub hosp_rate: f64,
    pub death_rate: f64,
    pub death_rate_with_icu: f64,
}

impl DrawnRates {
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.beta,
            self.latent_rate,
            self.removal_rate,
            self.hosp_rate,
            self.death_rate,
            self.death_rate_with_icu,
        ]
    }
}

/// Dense output of one Monte Carlo draw.
///
/// All values are fractions of the total population. Every series has
/// `horizon + 1` steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub iteration: usize,
    pub rates: DrawnRates,
    pub num_bands: usize,
    /// `occupancy[t][compartment * num_bands + band]`
    pub occupancy: Vec<Vec<f64>>,
    /// `new_infections[t][band]`: S->E flow since step t-1 (zero at t = 0)
    pub new_infections: Vec<Vec<f64>>,
    /// `new_symptomatic[t][band]`: E->I flow since step t-1 (zero at t = 0)
    pub new_symptomatic: Vec<Vec<f64>>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.occupancy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupancy.is_empty()
    }

    #[inline]
    pub fn get(&self, t: usize, compartment: Compartment, band: usize) -> f64 {
        self.occupancy[t][compartment.index() * self.num_bands + band]
    }

    /// Occupancy of a compartment summed across age bands
    pub fn total(&self, t: usize, compartment: Compartment) -> f64 {
        (0..self.num_bands).map(|b| self.get(t, compartment, b)).sum()
    }

    /// Sum over every compartment and band at step t
    pub fn population(&self, t: usize) -> f64 {
        self.occupancy[t].iter().sum()
    }

    /// Time series of one compartment summed across bands
    pub fn series(&self, compartment: Compartment) -> Vec<f64> {
        (0..self.len()).map(|t| self.total(t, compartment)).collect()
    }
}

/// An iteration that produced no trajectory
#[derive(Debug, Clone, PartialEq)]
pub struct IterationFailure {
    pub iteration: usize,
    pub error: IterationError,
}

/// Ordered trajectories of one simulation request.
///
/// `trajectories` are in iteration order; failed iterations are absent from
/// it and listed in `failures`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ensemble {
    pub trajectories: Vec<Trajectory>,
    pub failures: Vec<IterationFailure>,
    /// Seed of iteration 0; iteration i used `base_seed + i`
    pub base_seed: u64,
    pub iterations: usize,
}

impl Ensemble {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failed_iterations(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.iteration).collect()
    }

    /// Warnings to publish alongside the results
    pub fn warnings(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|f| format!("iteration {} dropped: {}", f.iteration, f.error))
            .collect()
    }
}
