//! Long-form dataset and run summary

use super::{POPULATION, build, single_band, two_band};
use crate::model::{Compartment, default_categories};
use crate::report::{self, RunSummary};
use crate::simulation::monte_carlo_simulate;

#[test]
fn test_normalized_row_count_and_order() {
    let params = build(two_band(3, 12));
    let ensemble = monte_carlo_simulate(&params).unwrap();
    let rows = report::normalize(&params, &ensemble);

    let categories = default_categories().len();
    assert_eq!(rows.len(), 3 * 13 * 2 * categories);

    let first = &rows[0];
    assert_eq!((first.iteration, first.time), (0, 0));
    assert_eq!(first.age, "0-39");
    assert_eq!(first.category, "S");
    let last = rows.last().unwrap();
    assert_eq!((last.iteration, last.time), (2, 12));
    assert_eq!(last.age, "40+");
}

#[test]
fn test_initial_values_in_people() {
    let params = build(single_band(1, 5));
    let ensemble = monte_carlo_simulate(&params).unwrap();
    let rows = report::normalize(&params, &ensemble);

    let at_start = |code: &str| {
        rows.iter()
            .find(|r| r.time == 0 && r.category == code)
            .map(|r| r.value)
            .unwrap()
    };
    assert!((at_start("S") - (POPULATION - 1.0)).abs() < 1e-9);
    assert!((at_start("E") - 1.0).abs() < 1e-9);
    assert_eq!(at_start("Ninf"), 0.0);
    assert_eq!(at_start("NewInf"), 0.0);
}

#[test]
fn test_category_series_sums_bands() {
    let params = build(two_band(2, 40).initial_infected(20.0));
    let ensemble = monte_carlo_simulate(&params).unwrap();
    let trajectory = &ensemble.trajectories[0];

    let series = report::category_series(&params, trajectory, "I").unwrap();
    assert_eq!(series.len(), trajectory.len());
    for (t, people) in series.iter().enumerate() {
        let expected = trajectory.total(t, Compartment::Symptomatic) * POPULATION;
        assert!((people - expected).abs() < 1e-9);
    }

    let hosp = report::category_series(&params, trajectory, "HOSP").unwrap();
    let last = trajectory.len() - 1;
    let expected = (trajectory.total(last, Compartment::Hospitalised)
        + trajectory.total(last, Compartment::Critical)
        + trajectory.total(last, Compartment::NoIcuCare))
        * POPULATION;
    assert!((hosp[last] - expected).abs() < 1e-9);

    assert!(report::category_series(&params, trajectory, "nope").is_none());
}

#[test]
fn test_prevalence_bands_across_iterations() {
    let params = build(single_band(8, 60).initial_infected(10.0));
    let ensemble = monte_carlo_simulate(&params).unwrap();

    let all = report::prevalence_all(&params, &ensemble, "INF").unwrap();
    assert_eq!(all.len(), 8);
    let bands = report::percentile_bands(&all);
    assert_eq!(bands.len(), 61);
    for band in &bands {
        assert!(band.p5 <= band.p25 && band.p25 <= band.p50);
        assert!(band.p50 <= band.p75 && band.p75 <= band.p95);
    }
    assert!(report::prevalence_all(&params, &ensemble, "nope").is_none());
}

#[test]
fn test_run_summary() {
    let params = build(two_band(4, 10));
    let ensemble = monte_carlo_simulate(&params).unwrap();
    let summary = RunSummary::new(&params, &ensemble).unwrap();

    assert_eq!(summary.identity_hash, params.identity_hash().unwrap());
    assert_eq!(summary.base_seed, 42);
    assert_eq!(summary.iterations, 4);
    assert_eq!(summary.completed_iterations, 4);
    assert!(summary.failed_iterations.is_empty());
    assert!(summary.warnings.is_empty());
    assert_eq!(summary.location, "Test camp");
    assert_eq!(summary.total_population, POPULATION);
    assert_eq!(summary.infection_matrix.len(), 2);
    assert_eq!(summary.beta_list.len(), params.infection.beta_list.len());
    assert_eq!(summary.beta_sigma, params.disease.beta_sigma);
    assert_eq!(summary.scenario, params.scenario_label());
}

/// Every S->E infection is counted once: the running total of new
/// infections per band equals the drop in susceptibles
#[test]
fn test_cumulative_infections_match_susceptible_drop() {
    let params = build(two_band(2, 60).initial_infected(20.0));
    let ensemble = monte_carlo_simulate(&params).unwrap();

    for trajectory in &ensemble.trajectories {
        let cumulative = report::cumulative_by_age(&params, trajectory, "NewInf").unwrap();
        let last = trajectory.len() - 1;
        assert_eq!(cumulative.len(), trajectory.len());
        assert_eq!(cumulative[0], vec![0.0, 0.0]);

        for band in 0..2 {
            let s0 = trajectory.get(0, Compartment::Susceptible, band) * POPULATION;
            let s_end = trajectory.get(last, Compartment::Susceptible, band) * POPULATION;
            let infected = cumulative[last][band];
            assert!(infected > 0.0);
            assert!(
                (infected - (s0 - s_end)).abs() < 1e-6,
                "band {band}: {infected} vs {}",
                s0 - s_end
            );
        }

        let published = report::category_by_age(&params, trajectory, "CumInf").unwrap();
        assert_eq!(published, cumulative);
    }

    let totals = report::cumulative_all(&params, &ensemble, "NewInf").unwrap();
    assert_eq!(totals.len(), 2);
    assert!(totals[0].windows(2).all(|w| w[1] >= w[0]));
    assert!(report::cumulative_all(&params, &ensemble, "nope").is_none());
}

/// Cumulative hospital demand is in person-days
#[test]
fn test_cumulative_hospital_person_days() {
    let params = build(two_band(1, 40).initial_infected(20.0));
    let ensemble = monte_carlo_simulate(&params).unwrap();
    let trajectory = &ensemble.trajectories[0];

    let daily = report::category_series(&params, trajectory, "HOSP").unwrap();
    let person_days = report::category_series(&params, trajectory, "CumHOSP").unwrap();
    let mut running = 0.0;
    for (t, people) in daily.iter().enumerate() {
        running += people;
        assert!((person_days[t] - running).abs() < 1e-6, "step {t}");
    }
}
