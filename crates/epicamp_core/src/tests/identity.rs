//! Parameter identity hash
//!
//! These tests verify:
//! - Identical inputs hash identically
//! - The worker count is excluded from the hash
//! - Changing any single hashed field changes the hash

use super::{POPULATION, build, seeded_profile, single_band, two_band};
use crate::config::schedule::RANDOM_SEED;
use crate::config::{ControlOverrides, ParameterSetBuilder, ProfileRow};
use crate::contact::{ContactLibrary, ContactMatrix};
use crate::identity::canonical_bytes;
use crate::model::DrawnRates;
use crate::model::fixtures::{population_row, sample_table};

fn hash(builder: ParameterSetBuilder) -> String {
    build(builder).identity_hash().unwrap()
}

/// `single_band(10, 30)` at a different location
fn elsewhere() -> ParameterSetBuilder {
    ParameterSetBuilder::new("Other camp")
        .age_limits(&[0, 80])
        .disease_table(sample_table())
        .population_rows(vec![population_row("0-79", 100.0, POPULATION)])
        .contact_library(ContactLibrary::default().with_fallback(ContactMatrix::identity(1)))
        .profile(seeded_profile(10, 30))
}

#[test]
fn test_identical_inputs_identical_hash() {
    let a = build(single_band(10, 30));
    let b = build(single_band(10, 30));

    assert_eq!(canonical_bytes(&a).unwrap(), canonical_bytes(&b).unwrap());
    let h = a.identity_hash().unwrap();
    assert_eq!(h, b.identity_hash().unwrap());
    assert_eq!(h.len(), 64);
    assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_worker_count_not_hashed() {
    let workers = |n: usize| ControlOverrides {
        workers: Some(n),
        ..Default::default()
    };
    assert_eq!(
        hash(single_band(10, 30).overrides(workers(1))),
        hash(single_band(10, 30).overrides(workers(8)))
    );
}

#[test]
fn test_every_hashed_field_changes_hash() {
    let reference = hash(single_band(10, 30));

    let mut table = sample_table();
    for row in &mut table.rows {
        if row.name == "hosp period" {
            row.cv = Some(0.15);
        }
    }
    let draw = DrawnRates {
        beta: 0.3,
        latent_rate: 0.2,
        removal_rate: 0.14,
        hosp_rate: 0.125,
        death_rate: 0.25,
        death_rate_with_icu: 0.1,
    };

    let variants = [
        ("iterations", single_band(11, 30)),
        ("horizon", single_band(10, 31)),
        (
            "seed",
            single_band(10, 30)
                .profile(seeded_profile(10, 30).set(ProfileRow::new(RANDOM_SEED, "43"))),
        ),
        (
            "hygiene",
            single_band(10, 30)
                .profile(seeded_profile(10, 30).set(ProfileRow::new("better_hygiene", "0.1"))),
        ),
        (
            "hygiene window",
            single_band(10, 30).profile(
                seeded_profile(10, 30).set(ProfileRow::new("better_hygiene", "0.1").window(1, 5)),
            ),
        ),
        ("disease table", single_band(10, 30).disease_table(table)),
        ("initial infected", single_band(10, 30).initial_infected(2.0)),
        ("generated draws", single_band(10, 30).generated_draws(vec![draw])),
        ("substeps", single_band(10, 30).substeps_per_day(20)),
        ("location", elsewhere()),
    ];

    for (name, builder) in variants {
        assert_ne!(hash(builder), reference, "changing {name} must change the hash");
    }
}

#[test]
fn test_structurally_different_sets_differ() {
    assert_ne!(hash(single_band(10, 30)), hash(two_band(10, 30)));
}
