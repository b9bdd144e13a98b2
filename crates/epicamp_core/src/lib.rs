//! Age-stratified compartmental epidemic simulation library
//!
//! This crate provides a Monte Carlo engine for camp-scale epidemic
//! scenarios. It supports:
//! - Disease tables parsed once into validated rates and sampling sigmas
//! - Contact matrices aggregated from 5-year survey bands into model bands
//! - Next-generation-matrix normalisation of transmissibility to target R0
//! - Time-windowed interventions (hygiene, ICU capacity, symptomatic and
//!   high-risk removal, shielding)
//! - Seeded, parallel ensembles with a stable content hash per parameter set
//!
//! # Example
//!
//! ```ignore
//! use epicamp_core::config::{InterventionProfile, ParameterSetBuilder};
//! use epicamp_core::{report, simulation};
//!
//! let params = ParameterSetBuilder::new("Camp")
//!     .age_limits(&[0, 80])
//!     .disease_table(table)
//!     .population_rows(rows)
//!     .contact_library(library)
//!     .profile(InterventionProfile::baseline(100, 200, 20_000.0))
//!     .build()?;
//!
//! let key = params.identity_hash()?;
//! let ensemble = simulation::monte_carlo_simulate(&params)?;
//! let rows = report::normalize(&params, &ensemble);
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod contact;
pub mod error;
pub mod identity;
pub mod infection;
pub mod metrics;
pub mod ode;
pub mod report;
pub mod sampler;
pub mod simulation;
pub mod simulation_state;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use config::{ControlOverrides, InterventionProfile, ParameterSet, ParameterSetBuilder};
pub use error::{
    EnsembleEmptyError, InputValidationError, IterationError, ModelError, RunError,
    SimulationDivergedError,
};
pub use simulation::{monte_carlo_simulate, simulate};
