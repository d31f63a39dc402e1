//! estimation::types — shared numeric aliases for the retrieval engine.
//!
//! All vectors and matrices are `ndarray` containers over `f64`. `Theta`
//! has length `n` (state dimension), `ObsVec` length `m` (observation
//! dimension), `Jacobian` is `m × n` with column `j` belonging to state
//! parameter `j`, and `CovMatrix` is square.
use ndarray::{Array1, Array2};

/// State values `x` in declared parameter order.
pub type Theta = Array1<f64>;

/// Observation values `y` in declared observation order.
pub type ObsVec = Array1<f64>;

/// Sensitivity matrix `K = ∂F/∂x`, shape `(m, n)`.
pub type Jacobian = Array2<f64>;

/// Dense symmetric covariance matrix.
pub type CovMatrix = Array2<f64>;

/// Default fraction of the prior standard deviation used as the
/// finite-difference step.
pub const DEFAULT_PERTURBATION: f64 = 0.01;

/// Default divisor of the state dimension for the d² convergence threshold.
pub const DEFAULT_CONVERGENCE_FACTOR: f64 = 10.0;

/// Default iteration cap.
pub const DEFAULT_MAX_ITER: usize = 100;

/// Default chi-square significance level.
pub const DEFAULT_SIGNIFICANCE: f64 = 0.05;
