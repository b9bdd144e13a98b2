mod compartments;
pub mod disease;
mod intervention;
mod population;
mod results;

pub use compartments::{CategoryKind, CategoryMeta, Compartment, default_categories};
pub use disease::{DerivedRate, DiseaseParameters, DiseaseRateTable, DiseaseRow, RowKind};
pub use intervention::{
    BetterHygiene, HighRiskRemoval, IcuCapacity, InterventionKind, Interventions, RunControls,
    Shielding, SimulationControl, SymptomaticRemoval, TimeWindow, default_workers,
    window_active,
};
pub use population::{AgeBand, DEFAULT_AGE_LIMITS, PopulationProfile, PopulationRow};
pub use results::{DrawnRates, Ensemble, IterationFailure, Trajectory};
