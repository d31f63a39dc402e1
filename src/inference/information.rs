//! inference::information — averaging kernel, DOFS, and information content.
//!
//! Purpose
//! -------
//! Quantify how much of the posterior is informed by the measurement rather
//! than by the prior, working on the subspace of free parameters.
//!
//! Key behaviors
//! -------------
//! - [`averaging_kernel`]: `A = I − Ŝ Sa⁻¹`; `A_ii` is the share of
//!   parameter `i` resolved by the observations.
//! - [`degrees_of_freedom`]: per-parameter `A_ii` plus `trace(A)`.
//! - [`information_content`]: Shannon information
//!   `H = ½ ln(det Sa / det Ŝ)` in nats.
//!
//! Invariants & assumptions
//! ------------------------
//! - `prior_cov` and `posterior_cov` are the free-parameter blocks, both
//!   `nf × nf` and symmetric.
//! - `Sa⁻¹` is taken as a pseudo-inverse so a nearly singular prior still
//!   yields a kernel; [`information_content`] requires both matrices to be
//!   positive definite.
use crate::optimization::{
    errors::OEResult,
    numerical_stability::{ln_det_spd, pseudo_inverse},
};
use ndarray::{Array1, Array2};

/// Averaging kernel `A = I − Ŝ Sa⁻¹`.
pub fn averaging_kernel(prior_cov: &Array2<f64>, posterior_cov: &Array2<f64>) -> Array2<f64> {
    let n = prior_cov.nrows();
    let prior_inv = pseudo_inverse(prior_cov);
    Array2::<f64>::eye(n) - posterior_cov.dot(&prior_inv)
}

/// Degrees of freedom for signal: `(diag A, trace A)`.
pub fn degrees_of_freedom(kernel: &Array2<f64>) -> (Array1<f64>, f64) {
    let per_parameter = kernel.diag().to_owned();
    let total = per_parameter.sum();
    (per_parameter, total)
}

/// Shannon information content `½ (ln det Sa − ln det Ŝ)`.
///
/// # Errors
/// [`crate::optimization::errors::OEError::SingularMatrix`] if either
/// matrix is not positive definite.
pub fn information_content(prior_cov: &Array2<f64>, posterior_cov: &Array2<f64>) -> OEResult<f64> {
    let ln_prior = ln_det_spd(prior_cov, "prior covariance determinant")?;
    let ln_post = ln_det_spd(posterior_cov, "posterior covariance determinant")?;
    Ok(0.5 * (ln_prior - ln_post))
}
