//! Monte Carlo orchestration: one RK4 integration per iteration, fanned out
//! over a worker pool and merged back in iteration order

use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};

use crate::config::ParameterSet;
use crate::error::{
    EnsembleEmptyError, IterationError, ModelError, RunError, SimulationDivergedError,
};
use crate::metrics::SimulationMetrics;
use crate::model::{DrawnRates, Ensemble, IterationFailure, Trajectory};
use crate::sampler::{RateSampler, iteration_rng, resolve_base_seed};
use crate::simulation_state::SimulationState;

type IterationResult = (usize, Result<Trajectory, IterationError>);

/// Integrate one iteration over `[0, horizon]`.
pub fn simulate(
    params: &ParameterSet,
    rates: DrawnRates,
    iteration: usize,
) -> Result<Trajectory, SimulationDivergedError> {
    integrate(params, rates, iteration, None)
}

/// Like `simulate`, also returning integrator metrics (even on divergence)
pub fn simulate_with_metrics(
    params: &ParameterSet,
    rates: DrawnRates,
    iteration: usize,
) -> (Result<Trajectory, SimulationDivergedError>, SimulationMetrics) {
    let mut metrics = SimulationMetrics::new();
    let result = integrate(params, rates, iteration, Some(&mut metrics));
    (result, metrics)
}

fn difference(current: &[f64], previous: &[f64]) -> Vec<f64> {
    current.iter().zip(previous).map(|(c, p)| c - p).collect()
}

fn integrate(
    params: &ParameterSet,
    rates: DrawnRates,
    iteration: usize,
    mut metrics: Option<&mut SimulationMetrics>,
) -> Result<Trajectory, SimulationDivergedError> {
    let horizon = params.control.run.horizon as usize;
    let substeps = params.substeps_per_day.max(1);
    let dt = 1.0 / f64::from(substeps);
    let num_bands = params.num_bands();

    let mut state = SimulationState::from_parameters(params, rates, iteration);

    let mut occupancy = Vec::with_capacity(horizon + 1);
    let mut new_infections = Vec::with_capacity(horizon + 1);
    let mut new_symptomatic = Vec::with_capacity(horizon + 1);

    occupancy.push(state.occupancy().to_vec());
    new_infections.push(vec![0.0; num_bands]);
    new_symptomatic.push(vec![0.0; num_bands]);
    if let Some(m) = metrics.as_mut() {
        m.record_output(state.occupancy());
    }
    let (mut prev_inf, mut prev_sym) = state.accumulators();

    for day in 0..horizon {
        for k in 1..=substeps {
            let t = if k == substeps {
                (day + 1) as f64
            } else {
                day as f64 + f64::from(k) * dt
            };
            state.step_to(t)?;
            if let Some(m) = metrics.as_mut() {
                m.record_step();
            }
        }

        let (inf, sym) = state.accumulators();
        new_infections.push(difference(&inf, &prev_inf));
        new_symptomatic.push(difference(&sym, &prev_sym));
        (prev_inf, prev_sym) = (inf, sym);

        occupancy.push(state.occupancy().to_vec());
        if let Some(m) = metrics.as_mut() {
            m.record_output(state.occupancy());
        }
    }

    Ok(Trajectory {
        iteration,
        rates,
        num_bands,
        occupancy,
        new_infections,
        new_symptomatic,
    })
}

/// Rates of iteration `i`: a pre-generated draw when available, otherwise a
/// fresh sample from the iteration's own RNG.
pub fn iteration_rates(
    params: &ParameterSet,
    sampler: &RateSampler,
    base_seed: u64,
    iteration: usize,
) -> DrawnRates {
    match params.generated_draws.len() {
        0 => sampler.draw(&mut iteration_rng(base_seed, iteration)),
        len => params.generated_draws[iteration % len],
    }
}

/// Contiguous iteration ranges, one per worker. The worker count is clamped
/// to `[1, iterations]`; iteration i always lands in the same range for a
/// fixed worker count.
pub fn batch_ranges(iterations: usize, workers: usize) -> Vec<Range<usize>> {
    if iterations == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, iterations);
    let size = iterations.div_ceil(workers);
    (0..workers)
        .map(|k| (k * size).min(iterations)..((k + 1) * size).min(iterations))
        .filter(|r| !r.is_empty())
        .collect()
}

fn run_batch(
    params: &ParameterSet,
    sampler: &RateSampler,
    base_seed: u64,
    range: Range<usize>,
) -> Vec<IterationResult> {
    range
        .map(|i| {
            let rates = iteration_rates(params, sampler, base_seed, i);
            (i, simulate(params, rates, i).map_err(IterationError::from))
        })
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "worker panicked".to_string())
}

/// Run one batch, flagging all of its iterations if the worker panics
fn guarded_batch<F>(run: &F, range: Range<usize>) -> Vec<IterationResult>
where
    F: Fn(Range<usize>) -> Vec<IterationResult>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| run(range.clone()))) {
        Ok(results) => results,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(?range, %message, "worker failed, flagging its iterations");
            range
                .map(|iteration| {
                    let error = IterationError::WorkerFailed {
                        iteration,
                        message: message.clone(),
                    };
                    (iteration, Err(error))
                })
                .collect()
        }
    }
}

#[cfg(feature = "parallel")]
fn run_batches<F>(batches: Vec<Range<usize>>, run: F) -> Result<Vec<Vec<IterationResult>>, RunError>
where
    F: Fn(Range<usize>) -> Vec<IterationResult> + Sync,
{
    use rayon::iter::{IntoParallelIterator, ParallelIterator};

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(batches.len().max(1))
        .build()
        .map_err(|e| RunError::WorkerPool(e.to_string()))?;

    Ok(pool.install(|| {
        batches
            .into_par_iter()
            .map(|range| guarded_batch(&run, range))
            .collect()
    }))
}

#[cfg(not(feature = "parallel"))]
fn run_batches<F>(batches: Vec<Range<usize>>, run: F) -> Result<Vec<Vec<IterationResult>>, RunError>
where
    F: Fn(Range<usize>) -> Vec<IterationResult> + Sync,
{
    Ok(batches
        .into_iter()
        .map(|range| guarded_batch(&run, range))
        .collect())
}

/// Fan the iterations out over the worker batches with `run` and merge the
/// results in iteration order.
fn run_ensemble<F>(params: &ParameterSet, base_seed: u64, run: F) -> Result<Ensemble, ModelError>
where
    F: Fn(Range<usize>) -> Vec<IterationResult> + Sync,
{
    let control = &params.control.run;
    let batches = batch_ranges(control.iterations, control.workers);
    tracing::info!(
        iterations = control.iterations,
        workers = batches.len(),
        base_seed,
        "starting ensemble"
    );
    tracing::debug!(?batches, "batch layout");

    let results = run_batches(batches, run)?;

    let mut trajectories = Vec::with_capacity(control.iterations);
    let mut failures = Vec::new();
    for (iteration, result) in results.into_iter().flatten() {
        match result {
            Ok(trajectory) => trajectories.push(trajectory),
            Err(error) => {
                tracing::warn!(iteration, %error, "iteration failed, dropping it");
                failures.push(IterationFailure { iteration, error });
            }
        }
    }

    if trajectories.is_empty() {
        return Err(EnsembleEmptyError {
            iterations: control.iterations,
            first_failure: failures.into_iter().next().map(|f| f.error),
        }
        .into());
    }
    if !failures.is_empty() {
        tracing::warn!(
            failed = failures.len(),
            succeeded = trajectories.len(),
            "partial ensemble"
        );
    }

    Ok(Ensemble {
        trajectories,
        failures,
        base_seed,
        iterations: control.iterations,
    })
}

/// Run every Monte Carlo iteration and merge them into an ensemble in
/// iteration order.
///
/// Diverged iterations, and every iteration of a batch whose worker
/// panicked, are dropped and listed in `Ensemble::failures`; the run only
/// fails if no iteration succeeds.
pub fn monte_carlo_simulate(params: &ParameterSet) -> Result<Ensemble, ModelError> {
    let sampler = RateSampler::new(params)?;

    let seed = params.control.run.random_seed;
    let base_seed = resolve_base_seed(seed);
    if seed.is_none() {
        tracing::info!(base_seed, "no random seed configured, drew one from entropy");
    }

    run_ensemble(params, base_seed, |range| run_batch(params, &sampler, base_seed, range))
}
