//! Criterion benchmarks for epicamp_core simulation
//!
//! Run with: cargo bench -p epicamp_core

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use epicamp_core::config::schedule::{HIGH_RISK_CATEGORIES, RANDOM_SEED};
use epicamp_core::config::{InterventionProfile, ParameterSet, ParameterSetBuilder, ProfileRow};
use epicamp_core::contact::{ContactLibrary, ContactMatrix};
use epicamp_core::model::disease::*;
use epicamp_core::model::{DEFAULT_AGE_LIMITS, DiseaseRateTable, DiseaseRow, PopulationRow};
use epicamp_core::sampler::RateSampler;
use epicamp_core::simulation::{
    iteration_rates, monte_carlo_simulate, simulate, simulate_with_metrics,
};

const POPULATION: f64 = 18_700.0;

fn disease_table() -> DiseaseRateTable {
    DiseaseRateTable::new(vec![
        DiseaseRow::model(R0, 6.0, Some(0.1)),
        DiseaseRow::model(R0, 4.0, Some(0.1)),
        DiseaseRow::model(R0, 3.0, Some(0.1)),
        DiseaseRow::model(LATENT_PERIOD, 5.0, Some(0.2)),
        DiseaseRow::model(INFECTIOUS_PERIOD, 7.0, Some(0.2)),
        DiseaseRow::model(HOSP_PERIOD, 8.0, Some(0.1)),
        DiseaseRow::model(DEATH_PERIOD, 8.0, Some(0.1)),
        DiseaseRow::model(DEATH_PERIOD_WITH_ICU, 10.0, Some(0.1)),
        DiseaseRow::model(QUARANTINE_PERIOD, 14.0, None),
        DiseaseRow::model(DEATH_PROB_WITH_ICU, 0.5, None),
        DiseaseRow::model(ASYMPTOMATIC_INFECTIOUSNESS, 0.5, None),
        DiseaseRow::model(ASYMPTOMATIC_PROPORTION, 0.5, None),
        DiseaseRow::model(NUMBER_COMPARTMENTS, 11.0, None),
        DiseaseRow::control(BETTER_HYGIENE, 0.2),
        DiseaseRow::control(SHIELD_DECREASE, 0.25),
        DiseaseRow::control(SHIELD_INCREASE, 2.0),
    ])
}

/// Eight age bands with a banded contact pattern
fn create_camp(
    iterations: usize,
    horizon: u32,
    profile: Option<InterventionProfile>,
) -> ParameterSet {
    let structure = [24.0, 22.0, 17.0, 13.0, 10.0, 7.0, 4.5, 2.5];
    let rows = DEFAULT_AGE_LIMITS
        .windows(2)
        .zip(structure)
        .enumerate()
        .map(|(i, (ages, pct))| PopulationRow {
            age: format!("{}-{}", ages[0], ages[1] - 1),
            population_structure_pct: pct,
            total_population: POPULATION,
            hosp_given_symptomatic_pct: 0.1 + 3.0 * i as f64,
            critical_given_hospitalised_pct: 5.0 + 6.0 * i as f64,
        })
        .collect();
    let matrix = ContactMatrix::new(
        (0..8)
            .map(|i| {
                (0..8)
                    .map(|j: i32| 4.0 / (1.0 + (i - j).abs() as f64))
                    .collect()
            })
            .collect(),
    )
    .expect("banded matrix is valid");

    ParameterSetBuilder::new("Bench camp")
        .disease_table(disease_table())
        .population_rows(rows)
        .initial_infected(10.0)
        .contact_library(ContactLibrary::default().with_fallback(matrix))
        .profile(profile.unwrap_or_else(|| {
            InterventionProfile::baseline(iterations, horizon, POPULATION)
                .set(ProfileRow::new(RANDOM_SEED, "42"))
        }))
        .build()
        .expect("bench parameters are valid")
}

fn busy_profile(iterations: usize, horizon: u32) -> InterventionProfile {
    InterventionProfile::baseline(iterations, horizon, POPULATION)
        .set(ProfileRow::new(RANDOM_SEED, "42"))
        .set(ProfileRow::new("better_hygiene", "0.3").window(10, 120))
        .set(ProfileRow::new("ICU_capacity", "6"))
        .set(ProfileRow::new("remove_symptomatic", "40").window(20, 150))
        .set(ProfileRow::new("shielding", "yes").window(30, 200))
        .set(ProfileRow::new("remove_high_risk", "25").window(15, 90))
        .set(ProfileRow::new(HIGH_RISK_CATEGORIES, "2"))
}

fn bench_single_iteration(c: &mut Criterion) {
    let params = create_camp(1, 200, None);
    let sampler = RateSampler::new(&params).expect("sampler");
    let rates = iteration_rates(&params, &sampler, 42, 0);

    c.bench_function("single_iteration_200d", |b| {
        b.iter(|| simulate(black_box(&params), black_box(rates), 0))
    });
}

fn bench_with_interventions(c: &mut Criterion) {
    let params = create_camp(1, 200, Some(busy_profile(1, 200)));
    let sampler = RateSampler::new(&params).expect("sampler");
    let rates = iteration_rates(&params, &sampler, 42, 0);

    c.bench_function("all_interventions_200d", |b| {
        b.iter(|| simulate(black_box(&params), black_box(rates), 0))
    });
}

fn bench_monte_carlo(c: &mut Criterion) {
    let mut group = c.benchmark_group("monte_carlo");

    for iterations in [10, 50, 200].iter() {
        let params = create_camp(*iterations, 200, None);
        group.bench_with_input(
            BenchmarkId::new("iterations", iterations),
            iterations,
            |b, _| b.iter(|| monte_carlo_simulate(black_box(&params))),
        );
    }

    group.finish();
}

fn bench_instrumented_vs_normal(c: &mut Criterion) {
    let mut group = c.benchmark_group("instrumented_comparison");
    let params = create_camp(1, 200, Some(busy_profile(1, 200)));
    let sampler = RateSampler::new(&params).expect("sampler");
    let rates = iteration_rates(&params, &sampler, 42, 0);

    group.bench_function("normal_simulate", |b| {
        b.iter(|| simulate(black_box(&params), black_box(rates), 0))
    });
    group.bench_function("instrumented_simulate", |b| {
        b.iter(|| simulate_with_metrics(black_box(&params), black_box(rates), 0))
    });

    group.finish();
}

fn bench_parameter_hash(c: &mut Criterion) {
    let params = create_camp(100, 200, Some(busy_profile(100, 200)));
    c.bench_function("identity_hash", |b| b.iter(|| black_box(&params).identity_hash()));
}

criterion_group!(
    benches,
    bench_single_iteration,
    bench_with_interventions,
    bench_monte_carlo,
    bench_instrumented_vs_normal,
    bench_parameter_hash,
);
criterion_main!(benches);
