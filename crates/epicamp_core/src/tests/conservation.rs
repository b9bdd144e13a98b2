//! Population conservation and integrator metrics

use super::{build, seeded_profile, two_band};
use crate::config::schedule::HIGH_RISK_CATEGORIES;
use crate::config::{InterventionProfile, ProfileRow};
use crate::sampler::RateSampler;
use crate::simulation::{iteration_rates, monte_carlo_simulate, simulate, simulate_with_metrics};

const TOLERANCE: f64 = 1e-9;

/// Every intervention active at some point, some overlapping
fn busy_profile() -> InterventionProfile {
    seeded_profile(4, 150)
        .set(ProfileRow::new("better_hygiene", "0.4").window(20, 60))
        .set(ProfileRow::new("ICU_capacity", "2"))
        .set(ProfileRow::new("remove_symptomatic", "30").window(10, 100))
        .set(ProfileRow::new("shielding", "yes").window(30, 90))
        .set(ProfileRow::new("remove_high_risk", "50").window(40, 70))
        .set(ProfileRow::new(HIGH_RISK_CATEGORIES, "1"))
}

/// Total population is conserved at every step, with and without interventions
#[test]
fn test_population_conserved_every_step() {
    for builder in [
        two_band(4, 150).initial_infected(20.0),
        two_band(4, 150).initial_infected(20.0).profile(busy_profile()),
    ] {
        let params = build(builder);
        let ensemble = monte_carlo_simulate(&params).unwrap();
        for trajectory in &ensemble.trajectories {
            for t in 0..trajectory.len() {
                let total = trajectory.population(t);
                assert!(
                    (total - 1.0).abs() < TOLERANCE,
                    "iteration {} step {t}: population {total}",
                    trajectory.iteration
                );
            }
        }
    }
}

/// Change-tracking series integrate to the drop in susceptibles (no removal)
#[test]
fn test_new_infections_match_susceptible_depletion() {
    let params = build(two_band(2, 80).initial_infected(20.0));
    let ensemble = monte_carlo_simulate(&params).unwrap();
    let trajectory = &ensemble.trajectories[0];

    for band in 0..trajectory.num_bands {
        let cumulative: f64 = trajectory.new_infections.iter().map(|row| row[band]).sum();
        let s0 = trajectory.occupancy[0][band];
        let s_end = trajectory.occupancy[trajectory.len() - 1][band];
        assert!((cumulative - (s0 - s_end)).abs() < TOLERANCE);
    }
    assert!(trajectory.new_infections[0].iter().all(|v| *v == 0.0));
    assert!(trajectory.new_symptomatic[0].iter().all(|v| *v == 0.0));
}

/// Metrics count steps and track drift
#[test]
fn test_metrics_collected() {
    let params = build(two_band(1, 40).profile(busy_profile()).substeps_per_day(4));
    let sampler = RateSampler::new(&params).unwrap();
    let rates = iteration_rates(&params, &sampler, 42, 0);

    let (result, metrics) = simulate_with_metrics(&params, rates, 0);
    let trajectory = result.unwrap();

    let horizon = u64::from(params.control.run.horizon);
    assert_eq!(metrics.rk4_steps, horizon * 4);
    assert_eq!(metrics.output_steps, horizon + 1);
    assert!(metrics.max_population_drift < TOLERANCE);
    assert!(!metrics.had_negative_state(1e-6));

    // metrics do not perturb the result
    assert_eq!(simulate(&params, rates, 0).unwrap(), trajectory);
}
