//! Error types
//!
//! Construction problems ([`ConfigError`]) are reported eagerly by the
//! problem constructors; everything else ([`DeaError`]) can only arise
//! inside an analysis call. Per-unit numerical failures are not errors:
//! the affected entry becomes NaN and the report carries the index.

/// Rejected problem configuration, reported at construction time.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("problem has no units or no factors")]
    EmptyProblem,

    #[error("duplicate factor name `{0}`")]
    DuplicateFactor(String),

    #[error("unknown factor or node name `{0}`")]
    UnknownFactor(String),

    #[error("dimension mismatch: {0}")]
    ShapeMismatch(String),

    #[error("performance of unit {unit} on factor `{factor}` must be strictly positive")]
    NonPositiveData { unit: usize, factor: String },

    #[error("invalid value function for factor `{factor}`: {reason}")]
    BadValueFunction { factor: String, reason: String },

    #[error("ordinal ranks on factor `{factor}` are not a permutation of 1..=n")]
    BadOrdinalRanks { factor: String },

    #[error("interval of unit {unit} on factor `{factor}` has lo > hi")]
    BadInterval { unit: usize, factor: String },

    #[error("performance {value} of unit {unit} lies outside the value-function domain of factor `{factor}`")]
    OutOfDomain {
        unit: usize,
        factor: String,
        value: f64,
    },

    #[error("hierarchy does not match the factor set: {0}")]
    HierarchyMismatch(String),

    #[error("ratio-model weight constraint must be homogeneous within one weight group: {0}")]
    BadRatioConstraint(String),

    #[error("invalid option: {0}")]
    BadOptions(String),
}

/// Failure of an analysis call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DeaError {
    /// A model that should be feasible came back infeasible: the stated
    /// weight constraints contradict each other. Fatal for the driver call.
    #[error("admissible region is empty ({context})")]
    InfeasibleRegion { context: String },

    /// A model came back unbounded: the inputs underconstrain it.
    #[error("model is unbounded ({context})")]
    UnboundedModel { context: String },

    #[error("{failed} of {total} samples failed")]
    TooManySampleFailures { failed: usize, total: usize },

    #[error("analysis cancelled after {} unit(s)", completed.len())]
    Cancelled { completed: Vec<usize> },

    #[error("deadline exceeded after {} unit(s)", completed.len())]
    DeadlineExceeded { completed: Vec<usize> },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
