//! optimization::errors — unified error surface for optimal-estimation retrievals.
//!
//! Purpose
//! -------
//! Collect every failure a retrieval can encounter into one enum,
//! [`OEError`], with a shared result alias [`OEResult<T>`]. Each variant
//! carries just enough payload (offending index, value, dimension) to make
//! diagnostics meaningful without leaking large buffers.
//!
//! Key behaviors
//! -------------
//! - Group variants by origin: configuration/validation, forward model,
//!   linear algebra, divergence, diagnostics, and DIAL input profiles.
//! - Classify each variant into an [`ErrorKind`] so callers can tell
//!   pre-loop rejections (`Configuration`) from in-loop failures
//!   (`ForwardModel`, `SingularMatrix`, `Divergence`) that end up recorded
//!   in a FAILED `RetrievalResult`.
//! - Convert `toml` deserialization failures of instrument configuration
//!   into [`OEError::InvalidConfig`].
//!
//! Conventions
//! -----------
//! - `OEError` is `Clone + PartialEq` so it can be stored inside immutable
//!   result snapshots and compared in tests.
//! - Messages are phrased in terms of the violated constraint.
use std::fmt;

/// Crate-wide result alias for retrieval operations.
pub type OEResult<T> = Result<T, OEError>;

/// Coarse error taxonomy used by callers that only care about the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed prior/observation inputs or options; raised before iterating.
    Configuration,
    /// Forward model produced wrong-shaped or non-finite output.
    ForwardModel,
    /// A required matrix inversion was numerically unstable.
    SingularMatrix,
    /// The normalized step grew for too many consecutive iterations.
    Divergence,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OEError {
    // ---- Names / shapes ----
    /// A name list must contain at least one entry.
    EmptyNames {
        what: &'static str,
    },
    /// Names must be unique within a vector.
    DuplicateName {
        what: &'static str,
        name: String,
    },
    /// Two inputs that must share dimensions do not.
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// Names attached to a covariance do not match its vector.
    NameMismatch {
        what: &'static str,
        index: usize,
        expected: String,
        found: String,
    },
    /// Unknown variable name.
    UnknownName {
        name: String,
    },

    // ---- Input values ----
    /// Input vectors and matrices must be finite.
    NonFiniteInput {
        what: &'static str,
        index: usize,
        value: f64,
    },
    /// Covariance matrices must be square.
    NonSquareCovariance {
        what: &'static str,
        rows: usize,
        cols: usize,
    },
    /// Covariance matrices must be symmetric.
    NonSymmetricCovariance {
        what: &'static str,
        row: usize,
        col: usize,
    },
    /// Covariance matrices must be positive semidefinite.
    NotPositiveSemiDefinite {
        what: &'static str,
        eigenvalue: f64,
    },
    /// Every state parameter is held fixed; nothing to retrieve.
    NoFreeParameters,

    // ---- Options ----
    /// Convergence factor needs to be positive and finite.
    InvalidConvergenceFactor {
        value: f64,
        reason: &'static str,
    },
    /// Maximum iterations needs to be positive.
    InvalidMaxIter {
        max_iter: usize,
        reason: &'static str,
    },
    /// Consecutive-convergence requirement needs to be positive.
    InvalidConsecutive {
        value: usize,
    },
    /// Jacobian perturbation fraction needs to be positive and finite.
    InvalidPerturbation {
        value: f64,
        reason: &'static str,
    },
    /// Condition-number limit needs to be finite and > 1.
    InvalidConditionLimit {
        value: f64,
    },
    /// Levenberg–Marquardt damping needs to be finite and non-negative.
    InvalidGamma {
        index: usize,
        value: f64,
    },
    /// Chi-square significance must lie in (0, 1).
    InvalidSignificance {
        value: f64,
    },
    /// Instrument configuration failed to parse or validate.
    InvalidConfig {
        text: String,
    },

    // ---- Forward model ----
    /// Forward model output length differs from the declared observation length.
    ForwardDimMismatch {
        expected: usize,
        found: usize,
    },
    /// Forward model returned NaN or ±∞.
    NonFiniteForward {
        index: usize,
        value: f64,
    },
    /// Forward model reported a domain failure of its own.
    ForwardFailed {
        text: String,
    },
    /// Implies that finite differences should be used.
    JacobianNotImplemented,
    /// Jacobian shape does not match (observations × state).
    JacobianDimMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    /// Jacobian entries need to be finite.
    NonFiniteJacobian {
        row: usize,
        col: usize,
        value: f64,
    },

    // ---- Linear algebra ----
    /// A matrix that must be inverted is numerically singular.
    SingularMatrix {
        context: &'static str,
        condition: f64,
    },

    // ---- Divergence ----
    /// The normalized step d² grew for too many consecutive iterations.
    Diverged {
        steps: usize,
        last_d2: f64,
    },

    // ---- Diagnostics ----
    /// A reference distribution could not be constructed.
    InvalidDistribution {
        text: String,
    },

    // ---- DIAL ----
    /// Background-corrected received power must be positive to take a log ratio.
    NonPositivePower {
        gate: usize,
        value: f64,
    },
    /// A DIAL profile needs at least two range gates.
    TooFewGates {
        found: usize,
    },
}

impl OEError {
    /// Failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OEError::ForwardDimMismatch { .. }
            | OEError::NonFiniteForward { .. }
            | OEError::ForwardFailed { .. }
            | OEError::JacobianNotImplemented
            | OEError::JacobianDimMismatch { .. }
            | OEError::NonFiniteJacobian { .. } => ErrorKind::ForwardModel,
            OEError::SingularMatrix { .. } => ErrorKind::SingularMatrix,
            OEError::Diverged { .. } => ErrorKind::Divergence,
            _ => ErrorKind::Configuration,
        }
    }
}

impl std::error::Error for OEError {}

impl fmt::Display for OEError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // ---- Names / shapes ----
            OEError::EmptyNames { what } => write!(f, "{what}: at least one name is required"),
            OEError::DuplicateName { what, name } => {
                write!(f, "{what}: duplicate name '{name}'")
            }
            OEError::DimensionMismatch { what, expected, found } => {
                write!(f, "{what}: dimension mismatch, expected {expected}, found {found}")
            }
            OEError::NameMismatch { what, index, expected, found } => {
                write!(f, "{what}: name at index {index} is '{found}', expected '{expected}'")
            }
            OEError::UnknownName { name } => write!(f, "Unknown variable name '{name}'"),

            // ---- Input values ----
            OEError::NonFiniteInput { what, index, value } => {
                write!(f, "{what}: non-finite value {value} at index {index}")
            }
            OEError::NonSquareCovariance { what, rows, cols } => {
                write!(f, "{what}: covariance must be square, found {rows}x{cols}")
            }
            OEError::NonSymmetricCovariance { what, row, col } => {
                write!(f, "{what}: covariance is not symmetric at ({row}, {col})")
            }
            OEError::NotPositiveSemiDefinite { what, eigenvalue } => {
                write!(
                    f,
                    "{what}: covariance is not positive semidefinite (eigenvalue {eigenvalue})"
                )
            }
            OEError::NoFreeParameters => {
                write!(f, "All state parameters have zero prior variance")
            }

            // ---- Options ----
            OEError::InvalidConvergenceFactor { value, reason } => {
                write!(f, "Invalid convergence factor {value}: {reason}")
            }
            OEError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid maximum iterations {max_iter}: {reason}")
            }
            OEError::InvalidConsecutive { value } => {
                write!(f, "Invalid consecutive-convergence count {value}, must be > 0")
            }
            OEError::InvalidPerturbation { value, reason } => {
                write!(f, "Invalid Jacobian perturbation {value}: {reason}")
            }
            OEError::InvalidConditionLimit { value } => {
                write!(f, "Invalid condition-number limit {value}, must be finite and > 1")
            }
            OEError::InvalidGamma { index, value } => {
                write!(f, "Invalid damping factor {value} at index {index}, must be finite and >= 0")
            }
            OEError::InvalidSignificance { value } => {
                write!(f, "Invalid significance level {value}, must lie in (0, 1)")
            }
            OEError::InvalidConfig { text } => write!(f, "Invalid configuration: {text}"),

            // ---- Forward model ----
            OEError::ForwardDimMismatch { expected, found } => {
                write!(f, "Forward model dimension mismatch: expected {expected}, found {found}")
            }
            OEError::NonFiniteForward { index, value } => {
                write!(f, "Forward model returned non-finite value {value} at index {index}")
            }
            OEError::ForwardFailed { text } => write!(f, "Forward model failed: {text}"),
            OEError::JacobianNotImplemented => write!(f, "Analytic Jacobian not implemented"),
            OEError::JacobianDimMismatch { expected, found } => {
                write!(f, "Jacobian dimension mismatch: expected {expected:?}, found {found:?}")
            }
            OEError::NonFiniteJacobian { row, col, value } => {
                write!(f, "Invalid Jacobian at ({row}, {col}): {value}, must be finite")
            }

            // ---- Linear algebra ----
            OEError::SingularMatrix { context, condition } => {
                write!(f, "Singular matrix in {context} (condition number {condition:e})")
            }

            // ---- Divergence ----
            OEError::Diverged { steps, last_d2 } => {
                write!(f, "Retrieval diverged: d² grew for {steps} consecutive iterations (last {last_d2})")
            }

            // ---- Diagnostics ----
            OEError::InvalidDistribution { text } => {
                write!(f, "Invalid reference distribution: {text}")
            }

            // ---- DIAL ----
            OEError::NonPositivePower { gate, value } => {
                write!(f, "Received power at gate {gate} is {value}, must be positive after background subtraction")
            }
            OEError::TooFewGates { found } => {
                write!(f, "DIAL profile needs at least two range gates, found {found}")
            }
        }
    }
}

impl From<toml::de::Error> for OEError {
    fn from(err: toml::de::Error) -> Self {
        OEError::InvalidConfig { text: err.to_string() }
    }
}
