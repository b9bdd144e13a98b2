//! Population structure by age band

use serde::{Deserialize, Serialize};

use crate::error::{InputValidationError, Result};

/// Tolerance on the sum of population-structure fractions
pub const STRUCTURE_TOLERANCE: f64 = 1e-3;

/// Default age-band boundaries in years
pub const DEFAULT_AGE_LIMITS: [u32; 9] = [0, 10, 20, 30, 40, 50, 60, 70, 80];

/// One age band as it appears in the population table.
///
/// Percentages are kept as supplied (0-100) and converted on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationRow {
    pub age: String,
    pub population_structure_pct: f64,
    pub total_population: f64,
    pub hosp_given_symptomatic_pct: f64,
    pub critical_given_hospitalised_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeBand {
    pub label: String,
    /// Fraction of the population in this band
    pub structure: f64,
    /// P(hospitalised | symptomatic)
    pub p_hospitalised: f64,
    /// P(critical | hospitalised)
    pub p_critical: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationProfile {
    pub bands: Vec<AgeBand>,
    pub total_population: f64,
    /// People infected (placed in the exposed compartment) at t = 0
    pub initial_infected: f64,
}

fn probability(field: String, pct: f64) -> Result<f64> {
    let p = pct / 100.0;
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(InputValidationError::InvalidValue {
            field,
            value: pct,
            reason: "percentage must lie in [0, 100]",
        })
    }
}

impl PopulationProfile {
    /// Build from table rows. The total population is read from the first row.
    pub fn from_rows(rows: &[PopulationRow]) -> Result<Self> {
        let first = rows.first().ok_or(InputValidationError::MissingRows {
            table: "population",
            names: vec!["age bands".to_string()],
        })?;

        let bands = rows
            .iter()
            .map(|row| {
                Ok(AgeBand {
                    label: row.age.clone(),
                    structure: row.population_structure_pct / 100.0,
                    p_hospitalised: probability(
                        format!("Hosp_given_symptomatic[{}]", row.age),
                        row.hosp_given_symptomatic_pct,
                    )?,
                    p_critical: probability(
                        format!("Critical_given_hospitalised[{}]", row.age),
                        row.critical_given_hospitalised_pct,
                    )?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let profile = Self {
            bands,
            total_population: first.total_population,
            initial_infected: 1.0,
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Set the initial number of infected people
    #[must_use]
    pub fn with_initial_infected(mut self, people: f64) -> Self {
        self.initial_infected = people;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.total_population > 0.0) || !self.total_population.is_finite() {
            return Err(InputValidationError::InvalidValue {
                field: "Total_population".to_string(),
                value: self.total_population,
                reason: "must be finite and positive",
            });
        }
        if let Some(band) = self.bands.iter().find(|b| !(b.structure >= 0.0)) {
            return Err(InputValidationError::InvalidValue {
                field: format!("Population_structure[{}]", band.label),
                value: band.structure * 100.0,
                reason: "must be non-negative",
            });
        }
        let sum: f64 = self.bands.iter().map(|b| b.structure).sum();
        if (sum - 1.0).abs() > STRUCTURE_TOLERANCE {
            return Err(InputValidationError::InvalidValue {
                field: "Population_structure".to_string(),
                value: sum * 100.0,
                reason: "age-band percentages must sum to 100",
            });
        }
        if !(0.0..=self.total_population).contains(&self.initial_infected) {
            return Err(InputValidationError::InvalidValue {
                field: "initial infected".to_string(),
                value: self.initial_infected,
                reason: "must lie between zero and the total population",
            });
        }
        Ok(())
    }

    pub fn num_bands(&self) -> usize {
        self.bands.len()
    }

    pub fn structure(&self) -> Vec<f64> {
        self.bands.iter().map(|b| b.structure).collect()
    }
}
