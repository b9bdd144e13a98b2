//! Command-line front end for the epicamp simulation engine
//!
//! Loads the tabular inputs of a scenario from disk, builds the parameter
//! set, runs the ensemble and writes the long-form report next to a JSON run
//! summary. Output files are named by the parameter identity hash so a
//! repeated request can be served from a previous run.

pub mod cli;
pub mod commands;
pub mod inputs;
pub mod logging;
pub mod output;
pub mod overrides;

pub use logging::init_logging;
