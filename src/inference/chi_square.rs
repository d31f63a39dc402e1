//! inference::chi_square — fit-quality tests against a χ²(m) reference.
//!
//! Purpose
//! -------
//! Flag retrievals whose residuals are statistically implausible given the
//! stated uncertainties. Failing a test is a diagnostic flag attached to the
//! result, never an error of the run.
//!
//! Key behaviors
//! -------------
//! - [`prior_residual_test`]: `(y − F(x_a))ᵗ (K Sa Kᵗ + Sy)⁻¹ (y − F(x_a))`,
//!   checking that the measurement is consistent with the prior.
//! - [`fit_test`]: `(y − F(x̂))ᵗ [Sy (K Sa Kᵗ + Sy)⁻¹ Sy]⁻¹ (y − F(x̂))`,
//!   checking the final fit against the covariance of the fitted residual.
//! - Both statistics use `m` (observation dimension) degrees of freedom and
//!   compare against the upper `significance` quantile.
//!
//! Conventions
//! -----------
//! - Covariances in observation space are inverted with a pseudo-inverse;
//!   statistics are clamped at zero against rounding noise.
use crate::optimization::{
    errors::{OEError, OEResult},
    estimation::types::{Jacobian, ObsVec},
    numerical_stability::pseudo_inverse,
};
use ndarray::Array2;
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Outcome of one χ² test.
///
/// - `statistic`: observed quadratic form.
/// - `critical_value`: `(1 − significance)` quantile of χ²(`dof`).
/// - `p_value`: upper-tail probability of `statistic`.
/// - `passed`: `statistic ≤ critical_value`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChiSquareTest {
    pub statistic: f64,
    pub critical_value: f64,
    pub dof: usize,
    pub p_value: f64,
    pub passed: bool,
}

impl ChiSquareTest {
    /// Compare `statistic` against χ²(`dof`) at level `significance`.
    ///
    /// # Errors
    /// [`OEError::InvalidDistribution`] if `dof == 0`.
    pub fn evaluate(statistic: f64, dof: usize, significance: f64) -> OEResult<Self> {
        let dist = ChiSquared::new(dof as f64)
            .map_err(|e| OEError::InvalidDistribution { text: e.to_string() })?;
        let critical_value = dist.inverse_cdf(1.0 - significance);
        let p_value = dist.sf(statistic);
        Ok(Self { statistic, critical_value, dof, p_value, passed: statistic <= critical_value })
    }
}

/// Residual consistency with the prior.
pub fn prior_residual_test(
    residual: &ObsVec, k: &Jacobian, prior_cov: &Array2<f64>, obs_cov: &Array2<f64>,
    significance: f64,
) -> OEResult<ChiSquareTest> {
    let s_total = innovation_covariance(k, prior_cov, obs_cov);
    let statistic = quadratic_form(residual, &pseudo_inverse(&s_total));
    ChiSquareTest::evaluate(statistic, residual.len(), significance)
}

/// Consistency of the final fit.
pub fn fit_test(
    residual: &ObsVec, k: &Jacobian, prior_cov: &Array2<f64>, obs_cov: &Array2<f64>,
    significance: f64,
) -> OEResult<ChiSquareTest> {
    let s_total_inv = pseudo_inverse(&innovation_covariance(k, prior_cov, obs_cov));
    let s_fit = obs_cov.dot(&s_total_inv).dot(obs_cov);
    let statistic = quadratic_form(residual, &pseudo_inverse(&s_fit));
    ChiSquareTest::evaluate(statistic, residual.len(), significance)
}

// ---- Helper methods ----

/// `K Sa Kᵗ + Sy`.
fn innovation_covariance(k: &Jacobian, prior_cov: &Array2<f64>, obs_cov: &Array2<f64>) -> Array2<f64> {
    k.dot(prior_cov).dot(&k.t()) + obs_cov
}

fn quadratic_form(r: &ObsVec, m: &Array2<f64>) -> f64 {
    r.dot(&m.dot(r)).max(0.0)
}
