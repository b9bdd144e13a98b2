//! Intervention schedule resolver
//!
//! Turns an intervention profile (rows of Parameter / Start Time / End Time /
//! Value) into a `SimulationControl`. Magnitudes given in people are divided
//! by the total population so the integrator works in population fractions.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{InputValidationError, Result};
use crate::model::{
    BetterHygiene, DiseaseParameters, HighRiskRemoval, IcuCapacity, InterventionKind,
    Interventions, RunControls, Shielding, SimulationControl, SymptomaticRemoval, TimeWindow,
    default_workers,
};

const TABLE: &str = "intervention profile";

/// Placeholder meaning "use the value from the disease table"
pub const DEFAULT_MARKER: &str = "<default>";
/// Placeholder meaning "no window"
pub const NO_EDIT_MARKER: &str = "<no_edit>";

pub const HIGH_RISK_CATEGORIES: &str = "remove_high_risk_categories";
pub const HORIZON: &str = "t_sim";
pub const ITERATIONS: &str = "numberOfIterations";
pub const WORKERS: &str = "nProcesses";
pub const RANDOM_SEED: &str = "random_seed";

/// One row of an intervention profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub parameter: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub value: String,
}

impl ProfileRow {
    pub fn new(parameter: &str, value: &str) -> Self {
        Self {
            parameter: parameter.to_string(),
            start_time: None,
            end_time: None,
            value: value.to_string(),
        }
    }

    #[must_use]
    pub fn window(mut self, start: u32, end: u32) -> Self {
        self.start_time = Some(start.to_string());
        self.end_time = Some(end.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionProfile {
    pub rows: Vec<ProfileRow>,
}

impl InterventionProfile {
    pub fn new(rows: Vec<ProfileRow>) -> Self {
        Self { rows }
    }

    /// A profile with every intervention off, unconstrained ICU capacity and
    /// the given run controls.
    pub fn baseline(iterations: usize, horizon: u32, total_population: f64) -> Self {
        Self::new(vec![
            ProfileRow::new("better_hygiene", "0"),
            ProfileRow::new("ICU_capacity", &total_population.to_string()),
            ProfileRow::new("remove_symptomatic", "0"),
            ProfileRow::new("shielding", "no"),
            ProfileRow::new("remove_high_risk", "0"),
            ProfileRow::new(HIGH_RISK_CATEGORIES, "0"),
            ProfileRow::new(HORIZON, &horizon.to_string()),
            ProfileRow::new(ITERATIONS, &iterations.to_string()),
        ])
    }

    /// Replace the value of `parameter`, adding the row if absent
    #[must_use]
    pub fn set(mut self, row: ProfileRow) -> Self {
        match self.rows.iter_mut().find(|r| r.parameter == row.parameter) {
            Some(existing) => *existing = row,
            None => self.rows.push(row),
        }
        self
    }
}

fn required_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = InterventionKind::ALL
        .iter()
        .map(|k| k.profile_name())
        .collect();
    names.extend([HIGH_RISK_CATEGORIES, HORIZON, ITERATIONS]);
    names
}

/// `yes`, `true`, `t` and `1` (any case) are true; anything else is false
pub fn str2bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "yes" | "true" | "t" | "1"
    )
}

struct ProfileIndex<'a> {
    rows: FxHashMap<&'a str, Vec<&'a ProfileRow>>,
}

impl<'a> ProfileIndex<'a> {
    fn new(profile: &'a InterventionProfile) -> Result<Self> {
        let mut rows: FxHashMap<&str, Vec<&ProfileRow>> = FxHashMap::default();
        for row in &profile.rows {
            rows.entry(row.parameter.trim()).or_default().push(row);
        }
        if let Some((name, dupes)) = rows.iter().find(|(_, v)| v.len() > 1) {
            return Err(InputValidationError::DuplicateRow {
                table: TABLE,
                name: (*name).to_string(),
                count: dupes.len(),
            });
        }
        let missing: Vec<String> = required_names()
            .into_iter()
            .filter(|n| !rows.contains_key(n))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(InputValidationError::MissingRows {
                table: TABLE,
                names: missing,
            });
        }
        Ok(Self { rows })
    }

    fn get(&self, name: &str) -> Option<&'a ProfileRow> {
        self.rows.get(name).map(|v| v[0])
    }

    /// Row that `new` has already checked to be present
    fn row(&self, name: &str) -> &'a ProfileRow {
        self.rows[name][0]
    }

    fn number(&self, name: &str) -> Result<f64> {
        parse_number(name, &self.row(name).value)
    }

    fn integer<T: std::str::FromStr>(&self, name: &str) -> Result<T> {
        parse_integer(name, &self.row(name).value)
    }

    fn window(&self, name: &str) -> Result<Option<TimeWindow>> {
        let row = self.row(name);
        let bound = |raw: &Option<String>| -> Result<Option<u32>> {
            match raw.as_deref().map(str::trim) {
                None | Some("") | Some(NO_EDIT_MARKER) => Ok(None),
                Some(s) => parse_integer(name, s).map(Some),
            }
        };
        match (bound(&row.start_time)?, bound(&row.end_time)?) {
            (Some(start), Some(end)) => TimeWindow::new(name, start, end).map(Some),
            _ => Ok(None),
        }
    }
}

fn parse_number(field: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| InputValidationError::Unparsable {
            field: field.to_string(),
            raw: raw.to_string(),
            expected: "a number",
        })
}

fn parse_integer<T: std::str::FromStr>(field: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| InputValidationError::Unparsable {
            field: field.to_string(),
            raw: raw.to_string(),
            expected: "a non-negative integer",
        })
}

/// Resolve a profile against the disease defaults and the population size.
pub fn resolve_profile(
    profile: &InterventionProfile,
    disease: &DiseaseParameters,
    total_population: f64,
) -> Result<SimulationControl> {
    let index = ProfileIndex::new(profile)?;
    let per_person = |people: f64| people / total_population;

    let hygiene_raw = index.row("better_hygiene").value.trim();
    let better_hygiene = BetterHygiene {
        window: index.window("better_hygiene")?,
        reduction: if hygiene_raw == DEFAULT_MARKER {
            disease.better_hygiene
        } else {
            parse_number("better_hygiene", hygiene_raw)?
        },
    };

    let icu_capacity = IcuCapacity {
        fraction: per_person(index.number("ICU_capacity")?),
    };

    let remove_symptomatic = SymptomaticRemoval {
        window: index.window("remove_symptomatic")?,
        rate: per_person(index.number("remove_symptomatic")?),
    };

    let shielding = Shielding {
        window: index.window("shielding")?,
        used: str2bool(&index.row("shielding").value),
    };

    let remove_high_risk = HighRiskRemoval {
        window: index.window("remove_high_risk")?,
        rate: per_person(index.number("remove_high_risk")?),
        n_categories: index.integer(HIGH_RISK_CATEGORIES)?,
    };

    let workers = match index.get(WORKERS) {
        Some(row) => parse_integer(WORKERS, &row.value)?,
        None => default_workers(),
    };
    let random_seed = match index.get(RANDOM_SEED).map(|r| r.value.trim()) {
        None | Some("") => None,
        Some(s) if s.eq_ignore_ascii_case("none") => None,
        Some(s) => Some(parse_integer(RANDOM_SEED, s)?),
    };

    Ok(SimulationControl {
        interventions: Interventions {
            better_hygiene,
            icu_capacity,
            remove_symptomatic,
            shielding,
            remove_high_risk,
        },
        run: RunControls {
            iterations: index.integer(ITERATIONS)?,
            horizon: index.integer(HORIZON)?,
            workers,
            random_seed,
        },
    })
}

/// Fully resolved replacements, applied verbatim after profile resolution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlOverrides {
    pub better_hygiene: Option<BetterHygiene>,
    #[serde(rename = "ICU_capacity")]
    pub icu_capacity: Option<IcuCapacity>,
    pub remove_symptomatic: Option<SymptomaticRemoval>,
    pub shielding: Option<Shielding>,
    pub remove_high_risk: Option<HighRiskRemoval>,
    #[serde(rename = "numberOfIterations")]
    pub iterations: Option<usize>,
    #[serde(rename = "t_sim")]
    pub horizon: Option<u32>,
    #[serde(rename = "nProcesses")]
    pub workers: Option<usize>,
    pub random_seed: Option<u64>,
}

impl ControlOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply every present override to `control`
    pub fn apply(&self, mut control: SimulationControl) -> SimulationControl {
        let iv = &mut control.interventions;
        if let Some(v) = self.better_hygiene {
            iv.better_hygiene = v;
        }
        if let Some(v) = self.icu_capacity {
            iv.icu_capacity = v;
        }
        if let Some(v) = self.remove_symptomatic {
            iv.remove_symptomatic = v;
        }
        if let Some(v) = self.shielding {
            iv.shielding = v;
        }
        if let Some(v) = self.remove_high_risk {
            iv.remove_high_risk = v;
        }

        let run = &mut control.run;
        if let Some(v) = self.iterations {
            run.iterations = v;
        }
        if let Some(v) = self.horizon {
            run.horizon = v;
        }
        if let Some(v) = self.workers {
            run.workers = v;
        }
        if self.random_seed.is_some() {
            run.random_seed = self.random_seed;
        }
        control
    }
}
