use std::fmt;

/// Errors raised while turning tabular inputs into a `ParameterSet`.
///
/// These are always fatal and are raised before any sampling begins.
#[derive(Debug, Clone, PartialEq)]
pub enum InputValidationError {
    /// One or more named rows are absent from a table
    MissingRows {
        table: &'static str,
        names: Vec<String>,
    },
    /// A named row appears more often than allowed
    DuplicateRow {
        table: &'static str,
        name: String,
        count: usize,
    },
    /// A period-valued row is zero or negative (would divide by zero)
    NonPositivePeriod { name: String, value: f64 },
    /// A value is outside its allowed domain
    InvalidValue {
        field: String,
        value: f64,
        reason: &'static str,
    },
    /// A cell could not be parsed
    Unparsable {
        field: String,
        raw: String,
        expected: &'static str,
    },
    /// An intervention window has start > end
    MalformedWindow {
        parameter: String,
        start: u32,
        end: u32,
    },
    /// A vector or matrix has the wrong dimension
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// Age limits are not usable for aggregation
    InvalidAgeLimits { limits: Vec<u32>, reason: &'static str },
    /// No contact matrix is available for a location
    MissingContactMatrix { location: String },
    /// The dominant eigenvalue of the next-generation matrix is not real
    ComplexDominantEigenvalue { re: f64, im: f64 },
    /// The dominant eigenvalue is not strictly positive
    DegenerateContactMatrix { eigenvalue: f64 },
}

impl fmt::Display for InputValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputValidationError::MissingRows { table, names } => {
                write!(f, "{table}: missing rows: {}", names.join(", "))
            }
            InputValidationError::DuplicateRow { table, name, count } => {
                write!(f, "{table}: row '{name}' appears {count} times")
            }
            InputValidationError::NonPositivePeriod { name, value } => {
                write!(f, "period '{name}' must be positive, got {value}")
            }
            InputValidationError::InvalidValue {
                field,
                value,
                reason,
            } => write!(f, "invalid value for '{field}' ({value}): {reason}"),
            InputValidationError::Unparsable {
                field,
                raw,
                expected,
            } => write!(f, "cannot parse '{raw}' for '{field}': expected {expected}"),
            InputValidationError::MalformedWindow {
                parameter,
                start,
                end,
            } => write!(
                f,
                "time window for '{parameter}' starts after it ends ({start} > {end})"
            ),
            InputValidationError::ShapeMismatch {
                what,
                expected,
                found,
            } => write!(f, "{what}: expected dimension {expected}, found {found}"),
            InputValidationError::InvalidAgeLimits { limits, reason } => {
                write!(f, "invalid age limits {limits:?}: {reason}")
            }
            InputValidationError::MissingContactMatrix { location } => {
                write!(
                    f,
                    "no contact matrix for location '{location}' and no fallback supplied"
                )
            }
            InputValidationError::ComplexDominantEigenvalue { re, im } => write!(
                f,
                "dominant eigenvalue of the next-generation matrix is complex ({re} + {im}i)"
            ),
            InputValidationError::DegenerateContactMatrix { eigenvalue } => write!(
                f,
                "dominant eigenvalue of the next-generation matrix must be positive, got {eigenvalue}"
            ),
        }
    }
}

impl std::error::Error for InputValidationError {}

/// Non-finite integrator state for one Monte Carlo iteration.
///
/// Recovered per iteration: the iteration is dropped and flagged.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationDivergedError {
    pub iteration: usize,
    /// Simulated time at which the state stopped being finite
    pub time: f64,
    /// Index into the flat state vector of the first non-finite cell
    pub cell: usize,
}

impl fmt::Display for SimulationDivergedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "iteration {} diverged at t={:.3} (state cell {})",
            self.iteration, self.time, self.cell
        )
    }
}

impl std::error::Error for SimulationDivergedError {}

/// Why one iteration produced no trajectory
#[derive(Debug, Clone, PartialEq)]
pub enum IterationError {
    Diverged(SimulationDivergedError),
    /// The worker running this iteration's batch panicked
    WorkerFailed { iteration: usize, message: String },
}

impl IterationError {
    pub fn iteration(&self) -> usize {
        match self {
            IterationError::Diverged(e) => e.iteration,
            IterationError::WorkerFailed { iteration, .. } => *iteration,
        }
    }
}

impl fmt::Display for IterationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IterationError::Diverged(e) => write!(f, "{e}"),
            IterationError::WorkerFailed { iteration, message } => {
                write!(f, "iteration {iteration}: worker failed: {message}")
            }
        }
    }
}

impl std::error::Error for IterationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IterationError::Diverged(e) => Some(e),
            IterationError::WorkerFailed { .. } => None,
        }
    }
}

impl From<SimulationDivergedError> for IterationError {
    fn from(err: SimulationDivergedError) -> Self {
        IterationError::Diverged(err)
    }
}

/// Every iteration failed, so the run has no usable output.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleEmptyError {
    pub iterations: usize,
    pub first_failure: Option<IterationError>,
}

impl fmt::Display for EnsembleEmptyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "all {} iterations failed", self.iterations)?;
        if let Some(first) = &self.first_failure {
            write!(f, " (first: {first})")?;
        }
        Ok(())
    }
}

impl std::error::Error for EnsembleEmptyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.first_failure
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Errors from the parallel run orchestrator
#[derive(Debug, Clone)]
pub enum RunError {
    Empty(EnsembleEmptyError),
    /// The worker pool could not be created
    WorkerPool(String),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Empty(e) => write!(f, "{e}"),
            RunError::WorkerPool(msg) => write!(f, "failed to start worker pool: {msg}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Empty(e) => Some(e),
            RunError::WorkerPool(_) => None,
        }
    }
}

impl From<EnsembleEmptyError> for RunError {
    fn from(err: EnsembleEmptyError) -> Self {
        RunError::Empty(err)
    }
}

/// Umbrella error for a full simulation request
#[derive(Debug)]
pub enum ModelError {
    Input(InputValidationError),
    Run(RunError),
    Identity(serde_json::Error),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Input(e) => write!(f, "invalid input: {e}"),
            ModelError::Run(e) => write!(f, "run failed: {e}"),
            ModelError::Identity(e) => write!(f, "cannot serialize parameters for hashing: {e}"),
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Input(e) => Some(e),
            ModelError::Run(e) => Some(e),
            ModelError::Identity(e) => Some(e),
        }
    }
}

impl From<InputValidationError> for ModelError {
    fn from(err: InputValidationError) -> Self {
        ModelError::Input(err)
    }
}

impl From<RunError> for ModelError {
    fn from(err: RunError) -> Self {
        ModelError::Run(err)
    }
}

impl From<EnsembleEmptyError> for ModelError {
    fn from(err: EnsembleEmptyError) -> Self {
        ModelError::Run(RunError::Empty(err))
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Identity(err)
    }
}

pub type Result<T> = std::result::Result<T, InputValidationError>;
