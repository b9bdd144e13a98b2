//! Disease rate table and the rate deriver
//!
//! The disease table arrives as loosely-typed rows (name, value, CV). It is
//! parsed exactly once into `DiseaseParameters`, a statically validated
//! record; every later component reads fields instead of looking rows up by
//! name.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{InputValidationError, Result};

const TABLE: &str = "disease parameters";

pub const R0: &str = "R0";
pub const LATENT_PERIOD: &str = "latent period";
pub const INFECTIOUS_PERIOD: &str = "infectious period";
pub const HOSP_PERIOD: &str = "hosp period";
pub const DEATH_PERIOD: &str = "death period";
pub const DEATH_PERIOD_WITH_ICU: &str = "death period with ICU";
pub const QUARANTINE_PERIOD: &str = "quarantine period";
pub const DEATH_PROB_WITH_ICU: &str = "death prob with ICU";
pub const ASYMPTOMATIC_INFECTIOUSNESS: &str = "infectiousness of asymptomatic";
pub const ASYMPTOMATIC_PROPORTION: &str = "asymptomatic proportion";
pub const NUMBER_COMPARTMENTS: &str = "number_compartments";

pub const BETTER_HYGIENE: &str = "Better hygiene";
pub const SHIELD_DECREASE: &str = "Reduction in contact between groups";
pub const SHIELD_INCREASE: &str = "Increase in contact within group";

/// Number of R0 rows the table must carry (low, central, high)
pub const R0_SAMPLES: usize = 3;

const REQUIRED_MODEL_ROWS: [&str; 10] = [
    LATENT_PERIOD,
    INFECTIOUS_PERIOD,
    HOSP_PERIOD,
    DEATH_PERIOD,
    DEATH_PERIOD_WITH_ICU,
    QUARANTINE_PERIOD,
    DEATH_PROB_WITH_ICU,
    ASYMPTOMATIC_INFECTIOUSNESS,
    ASYMPTOMATIC_PROPORTION,
    NUMBER_COMPARTMENTS,
];

const REQUIRED_CONTROL_ROWS: [&str; 3] = [BETTER_HYGIENE, SHIELD_DECREASE, SHIELD_INCREASE];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowKind {
    #[serde(rename = "Model Parameter")]
    Model,
    #[serde(rename = "Control")]
    Control,
}

/// One row of the disease table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseRow {
    pub kind: RowKind,
    pub name: String,
    pub value: f64,
    /// Coefficient of variation, absent for rows without uncertainty
    pub cv: Option<f64>,
}

impl DiseaseRow {
    pub fn model(name: &str, value: f64, cv: Option<f64>) -> Self {
        Self {
            kind: RowKind::Model,
            name: name.to_string(),
            value,
            cv,
        }
    }

    pub fn control(name: &str, value: f64) -> Self {
        Self {
            kind: RowKind::Control,
            name: name.to_string(),
            value,
            cv: None,
        }
    }
}

/// Ordered disease table as supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiseaseRateTable {
    pub rows: Vec<DiseaseRow>,
}

impl DiseaseRateTable {
    pub fn new(rows: Vec<DiseaseRow>) -> Self {
        Self { rows }
    }
}

/// A rate derived from a period, with its first-order sampling sigma
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedRate {
    pub rate: f64,
    pub sigma: f64,
}

impl DerivedRate {
    /// rate = 1/period, sigma = CV(period) * rate
    pub fn from_period(name: &str, period: f64, cv: Option<f64>) -> Result<Self> {
        if !(period > 0.0) || !period.is_finite() {
            return Err(InputValidationError::NonPositivePeriod {
                name: name.to_string(),
                value: period,
            });
        }
        let cv = cv.unwrap_or(0.0);
        if !(cv >= 0.0) || !cv.is_finite() {
            return Err(InputValidationError::InvalidValue {
                field: format!("{name} CV"),
                value: cv,
                reason: "coefficient of variation must be finite and non-negative",
            });
        }
        let rate = 1.0 / period;
        Ok(Self {
            rate,
            sigma: cv * rate,
        })
    }
}

/// Statically validated disease parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseParameters {
    /// R0 samples sorted ascending (low, central, high)
    pub r0: [f64; R0_SAMPLES],
    pub r0_cv: [f64; R0_SAMPLES],
    /// beta = R0 * removal rate (unit-population SIR approximation)
    pub beta: [f64; R0_SAMPLES],
    /// beta * CV(R0), published in the run summary only. The sampler never
    /// reads it: a draw's beta comes from the normalised beta range instead.
    pub beta_sigma: [f64; R0_SAMPLES],

    pub latent: DerivedRate,
    pub removal: DerivedRate,
    pub hosp: DerivedRate,
    pub death: DerivedRate,
    pub death_with_icu: DerivedRate,
    pub quarantine: DerivedRate,

    pub death_prob_with_icu: f64,
    pub asymptomatic_infectiousness: f64,
    pub asymptomatic_proportion: f64,
    pub number_compartments: usize,

    /// Default hygiene transmission reduction, used when a profile asks for `<default>`
    pub better_hygiene: f64,
    pub shield_decrease: f64,
    pub shield_increase: f64,
}

struct RowIndex<'a> {
    model: FxHashMap<&'a str, Vec<&'a DiseaseRow>>,
    control: FxHashMap<&'a str, Vec<&'a DiseaseRow>>,
}

impl<'a> RowIndex<'a> {
    fn new(table: &'a DiseaseRateTable) -> Self {
        let mut model: FxHashMap<&str, Vec<&DiseaseRow>> = FxHashMap::default();
        let mut control: FxHashMap<&str, Vec<&DiseaseRow>> = FxHashMap::default();
        for row in &table.rows {
            let bucket = match row.kind {
                RowKind::Model => &mut model,
                RowKind::Control => &mut control,
            };
            bucket.entry(row.name.as_str()).or_default().push(row);
        }
        Self { model, control }
    }

    fn model(&self, name: &str) -> &'a DiseaseRow {
        self.model[name][0]
    }

    fn control(&self, name: &str) -> &'a DiseaseRow {
        self.control[name][0]
    }

    /// Check row multiplicities, reporting every missing name at once
    fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();

        let r0_count = self.model.get(R0).map_or(0, Vec::len);
        if r0_count == 0 {
            missing.push(R0.to_string());
        } else if r0_count != R0_SAMPLES {
            return Err(InputValidationError::DuplicateRow {
                table: TABLE,
                name: R0.to_string(),
                count: r0_count,
            });
        }

        for (bucket, names) in [
            (&self.model, &REQUIRED_MODEL_ROWS[..]),
            (&self.control, &REQUIRED_CONTROL_ROWS[..]),
        ] {
            for name in names {
                match bucket.get(name).map_or(0, Vec::len) {
                    0 => missing.push((*name).to_string()),
                    1 => {}
                    count => {
                        return Err(InputValidationError::DuplicateRow {
                            table: TABLE,
                            name: (*name).to_string(),
                            count,
                        });
                    }
                }
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(InputValidationError::MissingRows {
                table: TABLE,
                names: missing,
            })
        }
    }
}

fn fraction(name: &str, value: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(InputValidationError::InvalidValue {
            field: name.to_string(),
            value,
            reason: "must lie in [0, 1]",
        })
    }
}

fn non_negative(name: &str, value: f64) -> Result<f64> {
    if value >= 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(InputValidationError::InvalidValue {
            field: name.to_string(),
            value,
            reason: "must be finite and non-negative",
        })
    }
}

impl DiseaseParameters {
    /// Parse and validate the disease table.
    pub fn from_table(table: &DiseaseRateTable) -> Result<Self> {
        let index = RowIndex::new(table);
        index.validate()?;

        let period = |name: &str| {
            let row = index.model(name);
            DerivedRate::from_period(name, row.value, row.cv)
        };

        let latent = period(LATENT_PERIOD)?;
        let removal = period(INFECTIOUS_PERIOD)?;
        let hosp = period(HOSP_PERIOD)?;
        let death = period(DEATH_PERIOD)?;
        let death_with_icu = period(DEATH_PERIOD_WITH_ICU)?;
        let quarantine = period(QUARANTINE_PERIOD)?;

        let mut r0_rows: Vec<&DiseaseRow> = index.model[R0].clone();
        r0_rows.sort_by(|a, b| a.value.total_cmp(&b.value));
        let mut r0 = [0.0; R0_SAMPLES];
        let mut r0_cv = [0.0; R0_SAMPLES];
        for (k, row) in r0_rows.iter().enumerate() {
            if !(row.value > 0.0) || !row.value.is_finite() {
                return Err(InputValidationError::InvalidValue {
                    field: R0.to_string(),
                    value: row.value,
                    reason: "must be finite and positive",
                });
            }
            r0[k] = row.value;
            r0_cv[k] = non_negative("R0 CV", row.cv.unwrap_or(0.0))?;
        }
        let beta = r0.map(|r| r * removal.rate);
        let mut beta_sigma = [0.0; R0_SAMPLES];
        for k in 0..R0_SAMPLES {
            beta_sigma[k] = beta[k] * r0_cv[k];
        }

        let compartments = index.model(NUMBER_COMPARTMENTS).value;
        if compartments.fract() != 0.0 || compartments < 1.0 {
            return Err(InputValidationError::InvalidValue {
                field: NUMBER_COMPARTMENTS.to_string(),
                value: compartments,
                reason: "must be a positive integer",
            });
        }

        Ok(Self {
            r0,
            r0_cv,
            beta,
            beta_sigma,
            latent,
            removal,
            hosp,
            death,
            death_with_icu,
            quarantine,
            death_prob_with_icu: fraction(
                DEATH_PROB_WITH_ICU,
                index.model(DEATH_PROB_WITH_ICU).value,
            )?,
            asymptomatic_infectiousness: non_negative(
                ASYMPTOMATIC_INFECTIOUSNESS,
                index.model(ASYMPTOMATIC_INFECTIOUSNESS).value,
            )?,
            asymptomatic_proportion: fraction(
                ASYMPTOMATIC_PROPORTION,
                index.model(ASYMPTOMATIC_PROPORTION).value,
            )?,
            number_compartments: compartments as usize,
            better_hygiene: fraction(BETTER_HYGIENE, index.control(BETTER_HYGIENE).value)?,
            shield_decrease: non_negative(SHIELD_DECREASE, index.control(SHIELD_DECREASE).value)?,
            shield_increase: non_negative(SHIELD_INCREASE, index.control(SHIELD_INCREASE).value)?,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A complete disease table with round-number periods
    pub(crate) fn sample_table() -> DiseaseRateTable {
        DiseaseRateTable::new(vec![
            DiseaseRow::model(R0, 2.0, Some(0.1)),
            DiseaseRow::model(R0, 1.5, Some(0.1)),
            DiseaseRow::model(R0, 2.5, Some(0.1)),
            DiseaseRow::model(LATENT_PERIOD, 5.0, Some(0.2)),
            DiseaseRow::model(INFECTIOUS_PERIOD, 7.0, Some(0.2)),
            DiseaseRow::model(HOSP_PERIOD, 8.0, Some(0.1)),
            DiseaseRow::model(DEATH_PERIOD, 4.0, Some(0.1)),
            DiseaseRow::model(DEATH_PERIOD_WITH_ICU, 10.0, Some(0.1)),
            DiseaseRow::model(QUARANTINE_PERIOD, 14.0, None),
            DiseaseRow::model(DEATH_PROB_WITH_ICU, 0.5, None),
            DiseaseRow::model(ASYMPTOMATIC_INFECTIOUSNESS, 0.5, None),
            DiseaseRow::model(ASYMPTOMATIC_PROPORTION, 0.3, None),
            DiseaseRow::model(NUMBER_COMPARTMENTS, 11.0, None),
            DiseaseRow::control(BETTER_HYGIENE, 0.3),
            DiseaseRow::control(SHIELD_DECREASE, 0.2),
            DiseaseRow::control(SHIELD_INCREASE, 2.0),
        ])
    }

    #[test]
    fn test_rates_are_inverse_periods() {
        let params = DiseaseParameters::from_table(&sample_table()).unwrap();

        assert!((params.latent.rate - 0.2).abs() < 1e-9);
        assert!((params.latent.sigma - 0.2 * 0.2).abs() < 1e-9);
        assert!((params.removal.rate - 1.0 / 7.0).abs() < 1e-9);
        assert!((params.removal.sigma - 0.2 / 7.0).abs() < 1e-9);
        assert!((params.death_with_icu.rate - 0.1).abs() < 1e-9);
        assert_eq!(params.quarantine.sigma, 0.0);
    }

    #[test]
    fn test_r0_sorted_and_scaled_to_beta() {
        let params = DiseaseParameters::from_table(&sample_table()).unwrap();

        assert_eq!(params.r0, [1.5, 2.0, 2.5]);
        for k in 0..R0_SAMPLES {
            assert!((params.beta[k] - params.r0[k] / 7.0).abs() < 1e-12);
            assert!((params.beta_sigma[k] - params.beta[k] * 0.1).abs() < 1e-12);
        }
    }

    #[test]
    fn test_missing_rows_are_all_reported() {
        let mut table = sample_table();
        table
            .rows
            .retain(|r| r.name != LATENT_PERIOD && r.name != SHIELD_INCREASE);

        match DiseaseParameters::from_table(&table) {
            Err(InputValidationError::MissingRows { names, .. }) => {
                assert!(names.contains(&LATENT_PERIOD.to_string()));
                assert!(names.contains(&SHIELD_INCREASE.to_string()));
                assert_eq!(names.len(), 2);
            }
            other => panic!("expected MissingRows, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_row_rejected() {
        let mut table = sample_table();
        table.rows.push(DiseaseRow::model(HOSP_PERIOD, 9.0, None));

        assert!(matches!(
            DiseaseParameters::from_table(&table),
            Err(InputValidationError::DuplicateRow { count: 2, .. })
        ));
    }

    #[test]
    fn test_non_positive_period_rejected() {
        let mut table = sample_table();
        for row in &mut table.rows {
            if row.name == DEATH_PERIOD {
                row.value = 0.0;
            }
        }

        match DiseaseParameters::from_table(&table) {
            Err(InputValidationError::NonPositivePeriod { name, value }) => {
                assert_eq!(name, DEATH_PERIOD);
                assert_eq!(value, 0.0);
            }
            other => panic!("expected NonPositivePeriod, got {other:?}"),
        }
    }

    #[test]
    fn test_control_rows_are_not_model_rows() {
        let mut table = sample_table();
        // Same name under the wrong kind does not satisfy the requirement
        table.rows.retain(|r| r.name != BETTER_HYGIENE);
        table.rows.push(DiseaseRow::model(BETTER_HYGIENE, 0.3, None));

        assert!(matches!(
            DiseaseParameters::from_table(&table),
            Err(InputValidationError::MissingRows { .. })
        ));
    }
}
