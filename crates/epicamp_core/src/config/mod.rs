//! Simulation configuration
//!
//! The main configuration type is `ParameterSet`, which contains everything
//! needed to run an ensemble. It is built once from tabular inputs by
//! `ParameterSetBuilder` and is never mutated afterwards; workers share it by
//! reference.
//!
//! ```ignore
//! use epicamp_core::config::{InterventionProfile, ParameterSetBuilder};
//!
//! let params = ParameterSetBuilder::new("Camp")
//!     .age_limits(&[0, 40, 80])
//!     .disease_table(table)
//!     .population_rows(rows)
//!     .contact_library(library)
//!     .profile(InterventionProfile::baseline(100, 200, 20_000.0))
//!     .build()?;
//! ```

use serde::{Deserialize, Serialize};

use crate::identity;
use crate::infection::InfectionMatrices;
use crate::model::{
    CategoryMeta, DiseaseParameters, DiseaseRateTable, DrawnRates, PopulationProfile,
    SimulationControl,
};

pub mod builder;
pub mod schedule;

pub use builder::{DEFAULT_SUBSTEPS_PER_DAY, ParameterSetBuilder};
pub use schedule::{
    ControlOverrides, InterventionProfile, ProfileRow, resolve_profile, str2bool,
};

/// The immutable input of one simulation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Location identifier (camp or country)
    pub location: String,
    pub age_limits: Vec<u32>,
    /// Disease table as supplied, kept for identity
    pub disease_table: DiseaseRateTable,
    pub disease: DiseaseParameters,
    pub population: PopulationProfile,
    /// Contact matrices, normalised beta vector and dominant eigenvalue
    pub infection: InfectionMatrices,
    pub control: SimulationControl,
    pub categories: Vec<CategoryMeta>,
    /// Pre-generated rate draws. When non-empty, iteration i uses
    /// `generated_draws[i % len]` instead of sampling.
    pub generated_draws: Vec<DrawnRates>,
    /// RK4 steps per simulated day
    pub substeps_per_day: u32,
}

impl ParameterSet {
    pub fn num_bands(&self) -> usize {
        self.population.num_bands()
    }

    pub fn total_population(&self) -> f64 {
        self.population.total_population
    }

    /// Stable hex digest of every output-affecting field
    pub fn identity_hash(&self) -> Result<String, serde_json::Error> {
        identity::parameter_hash(self)
    }

    pub fn scenario_label(&self) -> String {
        self.control.scenario_label(self.total_population())
    }
}
