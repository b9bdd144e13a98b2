//! Resolved intervention records and run controls
//!
//! Everything here is in population-relative units: capacities and removal
//! rates are fractions of the total population (per day for rates).

use serde::{Deserialize, Serialize};

use crate::error::{InputValidationError, Result};

/// Closed time window `[start, end]` in simulated days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: u32,
    pub end: u32,
}

impl TimeWindow {
    pub fn new(parameter: &str, start: u32, end: u32) -> Result<Self> {
        if start > end {
            return Err(InputValidationError::MalformedWindow {
                parameter: parameter.to_string(),
                start,
                end,
            });
        }
        Ok(Self { start, end })
    }

    #[inline]
    pub fn contains(&self, t: f64) -> bool {
        t >= f64::from(self.start) && t <= f64::from(self.end)
    }
}

/// `None` means always active
#[inline]
pub fn window_active(window: Option<TimeWindow>, t: f64) -> bool {
    window.is_none_or(|w| w.contains(t))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionKind {
    BetterHygiene,
    IcuCapacity,
    RemoveSymptomatic,
    Shielding,
    RemoveHighRisk,
}

impl InterventionKind {
    pub const ALL: [InterventionKind; 5] = [
        InterventionKind::BetterHygiene,
        InterventionKind::IcuCapacity,
        InterventionKind::RemoveSymptomatic,
        InterventionKind::Shielding,
        InterventionKind::RemoveHighRisk,
    ];

    /// Parameter name used in intervention profiles
    pub fn profile_name(self) -> &'static str {
        match self {
            InterventionKind::BetterHygiene => "better_hygiene",
            InterventionKind::IcuCapacity => "ICU_capacity",
            InterventionKind::RemoveSymptomatic => "remove_symptomatic",
            InterventionKind::Shielding => "shielding",
            InterventionKind::RemoveHighRisk => "remove_high_risk",
        }
    }
}

/// Fractional reduction in transmission from improved hygiene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetterHygiene {
    pub window: Option<TimeWindow>,
    pub reduction: f64,
}

/// ICU beds as a fraction of the total population
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IcuCapacity {
    pub fraction: f64,
}

/// Symptomatic removal capacity, population fraction per day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymptomaticRemoval {
    pub window: Option<TimeWindow>,
    pub rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shielding {
    pub window: Option<TimeWindow>,
    pub used: bool,
}

/// Removal of the oldest `n_categories` age bands to offsite care
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighRiskRemoval {
    pub window: Option<TimeWindow>,
    pub rate: f64,
    pub n_categories: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interventions {
    pub better_hygiene: BetterHygiene,
    pub icu_capacity: IcuCapacity,
    pub remove_symptomatic: SymptomaticRemoval,
    pub shielding: Shielding,
    pub remove_high_risk: HighRiskRemoval,
}

impl Interventions {
    /// All interventions off and ICU capacity unconstrained
    pub fn none() -> Self {
        Self {
            better_hygiene: BetterHygiene {
                window: None,
                reduction: 0.0,
            },
            icu_capacity: IcuCapacity { fraction: 1.0 },
            remove_symptomatic: SymptomaticRemoval {
                window: None,
                rate: 0.0,
            },
            shielding: Shielding {
                window: None,
                used: false,
            },
            remove_high_risk: HighRiskRemoval {
                window: None,
                rate: 0.0,
                n_categories: 0,
            },
        }
    }

    pub fn validate(&self, num_bands: usize) -> Result<()> {
        let check = |field: &str, value: f64| {
            if value >= 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(InputValidationError::InvalidValue {
                    field: field.to_string(),
                    value,
                    reason: "must be finite and non-negative",
                })
            }
        };
        check("better_hygiene", self.better_hygiene.reduction)?;
        if self.better_hygiene.reduction > 1.0 {
            return Err(InputValidationError::InvalidValue {
                field: "better_hygiene".to_string(),
                value: self.better_hygiene.reduction,
                reason: "a transmission reduction cannot exceed 1",
            });
        }
        check("ICU_capacity", self.icu_capacity.fraction)?;
        check("remove_symptomatic", self.remove_symptomatic.rate)?;
        check("remove_high_risk", self.remove_high_risk.rate)?;
        if self.remove_high_risk.n_categories > num_bands {
            return Err(InputValidationError::InvalidValue {
                field: "remove_high_risk_categories".to_string(),
                value: self.remove_high_risk.n_categories as f64,
                reason: "cannot remove more age categories than exist",
            });
        }
        for (name, window) in [
            ("better_hygiene", self.better_hygiene.window),
            ("remove_symptomatic", self.remove_symptomatic.window),
            ("shielding", self.shielding.window),
            ("remove_high_risk", self.remove_high_risk.window),
        ] {
            if let Some(w) = window {
                TimeWindow::new(name, w.start, w.end)?;
            }
        }
        Ok(())
    }
}

/// Iteration count, horizon, worker count and seed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunControls {
    pub iterations: usize,
    /// Simulation horizon in days; trajectories have `horizon + 1` points
    pub horizon: u32,
    /// Worker count; does not affect output
    pub workers: usize,
    pub random_seed: Option<u64>,
}

impl RunControls {
    pub fn new(iterations: usize, horizon: u32) -> Self {
        Self {
            iterations,
            horizon,
            workers: default_workers(),
            random_seed: None,
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(InputValidationError::InvalidValue {
                field: "numberOfIterations".to_string(),
                value: 0.0,
                reason: "must be at least 1",
            });
        }
        if self.horizon == 0 {
            return Err(InputValidationError::InvalidValue {
                field: "t_sim".to_string(),
                value: 0.0,
                reason: "must be at least 1",
            });
        }
        if self.workers == 0 {
            return Err(InputValidationError::InvalidValue {
                field: "nProcesses".to_string(),
                value: 0.0,
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}

/// Available core count, falling back to a single worker
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

/// Resolved interventions plus run controls. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationControl {
    pub interventions: Interventions,
    pub run: RunControls,
}

fn fmt_window(window: Option<TimeWindow>) -> String {
    match window {
        Some(w) => format!("{}_{}", w.start, w.end),
        None => "always".to_string(),
    }
}

impl SimulationControl {
    /// Human-readable scenario descriptor, suitable for file names.
    ///
    /// Population-relative magnitudes are re-expressed in people.
    pub fn scenario_label(&self, total_population: f64) -> String {
        let iv = &self.interventions;
        let people = |fraction: f64| (fraction * total_population).round() as i64;
        [
            format!(
                "better_hygiene_{}_{}",
                fmt_window(iv.better_hygiene.window),
                iv.better_hygiene.reduction
            ),
            format!("ICU_capacity_{}", people(iv.icu_capacity.fraction)),
            format!(
                "remove_symptomatic_{}_{}",
                fmt_window(iv.remove_symptomatic.window),
                people(iv.remove_symptomatic.rate)
            ),
            format!(
                "shielding_{}_{}",
                fmt_window(iv.shielding.window),
                iv.shielding.used
            ),
            format!(
                "remove_high_risk_{}_{}_{}",
                fmt_window(iv.remove_high_risk.window),
                people(iv.remove_high_risk.rate),
                iv.remove_high_risk.n_categories
            ),
        ]
        .join("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_is_closed_interval() {
        let w = TimeWindow::new("x", 10, 20).unwrap();
        assert!(!w.contains(9.99));
        assert!(w.contains(10.0));
        assert!(w.contains(20.0));
        assert!(!w.contains(20.01));
        assert!(window_active(None, 1e9));
    }

    #[test]
    fn test_reversed_window_rejected() {
        assert!(matches!(
            TimeWindow::new("shielding", 30, 10),
            Err(InputValidationError::MalformedWindow { start: 30, end: 10, .. })
        ));
    }

    #[test]
    fn test_negative_rate_rejected() {
        let mut iv = Interventions::none();
        iv.remove_symptomatic.rate = -0.1;
        assert!(iv.validate(3).is_err());
    }

    #[test]
    fn test_scenario_label_in_people() {
        let mut iv = Interventions::none();
        iv.icu_capacity.fraction = 0.0006;
        iv.remove_high_risk = HighRiskRemoval {
            window: Some(TimeWindow { start: 5, end: 60 }),
            rate: 0.001,
            n_categories: 2,
        };
        let control = SimulationControl {
            interventions: iv,
            run: RunControls::new(10, 100),
        };

        let label = control.scenario_label(10_000.0);
        assert!(label.contains("ICU_capacity_6"));
        assert!(label.contains("remove_high_risk_5_60_10_2"));
        assert!(label.starts_with("better_hygiene_always_0"));
    }
}
