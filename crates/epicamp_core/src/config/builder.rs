//! Parameter set builder
//!
//! Collects the tabular inputs of a request and performs every validation
//! step in one place, so that a `ParameterSet` that exists is always usable.

use super::ParameterSet;
use super::schedule::{ControlOverrides, InterventionProfile, resolve_profile};
use crate::contact::ContactLibrary;
use crate::error::{InputValidationError, Result};
use crate::infection;
use crate::model::disease::R0_SAMPLES;
use crate::model::{
    CategoryMeta, Compartment, DEFAULT_AGE_LIMITS, DiseaseParameters, DiseaseRateTable,
    DrawnRates, PopulationProfile, PopulationRow, SimulationControl, default_categories,
};

pub const DEFAULT_SUBSTEPS_PER_DAY: u32 = 10;

/// Where the run controls come from
#[derive(Debug, Clone)]
enum ControlSource {
    Profile(InterventionProfile),
    Resolved(SimulationControl),
}

/// Fluent builder for `ParameterSet`
#[derive(Debug, Clone)]
pub struct ParameterSetBuilder {
    location: String,
    age_limits: Vec<u32>,
    disease_table: Option<DiseaseRateTable>,
    population_rows: Vec<PopulationRow>,
    initial_infected: Option<f64>,
    contacts: ContactLibrary,
    control: Option<ControlSource>,
    overrides: ControlOverrides,
    generated_draws: Vec<DrawnRates>,
    categories: Vec<CategoryMeta>,
    substeps_per_day: u32,
}

impl ParameterSetBuilder {
    #[must_use]
    pub fn new(location: &str) -> Self {
        Self {
            location: location.to_string(),
            age_limits: DEFAULT_AGE_LIMITS.to_vec(),
            disease_table: None,
            population_rows: Vec::new(),
            initial_infected: None,
            contacts: ContactLibrary::default(),
            control: None,
            overrides: ControlOverrides::default(),
            generated_draws: Vec::new(),
            categories: default_categories(),
            substeps_per_day: DEFAULT_SUBSTEPS_PER_DAY,
        }
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    #[must_use]
    pub fn age_limits(mut self, limits: &[u32]) -> Self {
        self.age_limits = limits.to_vec();
        self
    }

    #[must_use]
    pub fn disease_table(mut self, table: DiseaseRateTable) -> Self {
        self.disease_table = Some(table);
        self
    }

    #[must_use]
    pub fn population_rows(mut self, rows: Vec<PopulationRow>) -> Self {
        self.population_rows = rows;
        self
    }

    /// People placed in the exposed compartment at t = 0 (default 1)
    #[must_use]
    pub fn initial_infected(mut self, people: f64) -> Self {
        self.initial_infected = Some(people);
        self
    }

    #[must_use]
    pub fn contact_library(mut self, library: ContactLibrary) -> Self {
        self.contacts = library;
        self
    }

    // =========================================================================
    // Controls
    // =========================================================================

    #[must_use]
    pub fn profile(mut self, profile: InterventionProfile) -> Self {
        self.control = Some(ControlSource::Profile(profile));
        self
    }

    /// Use an already resolved control structure instead of a profile
    #[must_use]
    pub fn control(mut self, control: SimulationControl) -> Self {
        self.control = Some(ControlSource::Resolved(control));
        self
    }

    #[must_use]
    pub fn overrides(mut self, overrides: ControlOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    #[must_use]
    pub fn generated_draws(mut self, draws: Vec<DrawnRates>) -> Self {
        self.generated_draws = draws;
        self
    }

    #[must_use]
    pub fn categories(mut self, categories: Vec<CategoryMeta>) -> Self {
        self.categories = categories;
        self
    }

    #[must_use]
    pub fn substeps_per_day(mut self, substeps: u32) -> Self {
        self.substeps_per_day = substeps;
        self
    }

    // =========================================================================
    // Build
    // =========================================================================

    pub fn build(self) -> Result<ParameterSet> {
        let disease_table = self.disease_table.ok_or(InputValidationError::MissingRows {
            table: "disease parameters",
            names: vec!["<table>".to_string()],
        })?;
        let disease = DiseaseParameters::from_table(&disease_table)?;
        if disease.number_compartments != Compartment::COUNT {
            return Err(InputValidationError::InvalidValue {
                field: "number_compartments".to_string(),
                value: disease.number_compartments as f64,
                reason: "the compartment model has exactly 11 compartments",
            });
        }

        let mut population = PopulationProfile::from_rows(&self.population_rows)?;
        if let Some(people) = self.initial_infected {
            population = population.with_initial_infected(people);
            population.validate()?;
        }
        let bands = self.age_limits.len().saturating_sub(1);
        if population.num_bands() != bands {
            return Err(InputValidationError::ShapeMismatch {
                what: "population age bands",
                expected: bands,
                found: population.num_bands(),
            });
        }

        let control = match self.control {
            Some(ControlSource::Profile(profile)) => {
                resolve_profile(&profile, &disease, population.total_population)?
            }
            Some(ControlSource::Resolved(control)) => control,
            None => {
                return Err(InputValidationError::MissingRows {
                    table: "intervention profile",
                    names: vec!["<table>".to_string()],
                });
            }
        };
        let control = self.overrides.apply(control);
        control.interventions.validate(bands)?;
        control.run.validate()?;

        let structure = population.structure();
        let contact = self.contacts.build(&self.location, &self.age_limits, &structure)?;
        let shielding = control
            .interventions
            .shielding
            .used
            .then_some((disease.shield_increase, disease.shield_decrease));
        let infection = infection::normalise(
            contact,
            &structure,
            (disease.beta[0], disease.beta[R0_SAMPLES - 1]),
            shielding,
        )?;

        validate_draws(&self.generated_draws)?;

        if self.substeps_per_day == 0 {
            return Err(InputValidationError::InvalidValue {
                field: "substeps per day".to_string(),
                value: 0.0,
                reason: "must be at least 1",
            });
        }

        tracing::debug!(
            location = %self.location,
            bands,
            eigenvalue = infection.largest_eigenvalue,
            "parameter set built"
        );

        Ok(ParameterSet {
            location: self.location,
            age_limits: self.age_limits,
            disease_table,
            disease,
            population,
            infection,
            control,
            categories: self.categories,
            generated_draws: self.generated_draws,
            substeps_per_day: self.substeps_per_day,
        })
    }
}

fn validate_draws(draws: &[DrawnRates]) -> Result<()> {
    for (i, draw) in draws.iter().enumerate() {
        if let Some(v) = draw
            .as_array()
            .into_iter()
            .find(|v| !(v.is_finite() && *v >= 0.0))
        {
            return Err(InputValidationError::InvalidValue {
                field: format!("generated draw {i}"),
                value: v,
                reason: "rates must be finite and non-negative",
            });
        }
    }
    Ok(())
}
