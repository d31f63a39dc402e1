//! inference::linearity — how well a linear model explains the retrieval.
//!
//! Purpose
//! -------
//! Detect runs where the Gauss–Newton linearization was a poor description
//! of the forward model. Two figures are produced, both normalized by the
//! observation covariance and the observation dimension so that values
//! below 1 mean "nonlinearity smaller than the measurement noise".
//!
//! Key behaviors
//! -------------
//! - [`prior_linearity`]: `d = F(x̂) − [F(x_a) + K_a (x̂ − x_a)]`, the
//!   error of predicting the solution from the prior with one Jacobian.
//! - [`posterior_linearity`]: step one sigma along every principal axis
//!   `δ_j` of `Ŝ` (eigenvectors of the equilibrated matrix, see
//!   `numerical_stability::principal_axes`) and compare `F(x̂ + δ_j)` with
//!   `F(x̂) + K δ_j`; the largest discrepancy is reported.
//! - Both use `dᵗ Sy⁺ d / m`.
//!
//! Invariants & assumptions
//! ------------------------
//! - State-space quantities live on the free-parameter subspace.
//! - `eval` maps a free-space offset `δ` to `F(x̂ + δ)`; its errors
//!   propagate so the caller can decide to drop the figure.
use crate::optimization::{
    errors::OEResult,
    estimation::types::{Jacobian, ObsVec, Theta},
    numerical_stability::principal_axes,
};
use ndarray::Array2;

/// Summary of both linearity figures.
///
/// `posterior` is `None` when an extra forward evaluation failed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearityReport {
    pub prior: f64,
    pub posterior: Option<f64>,
}

impl LinearityReport {
    /// `true` when every available figure is below 1.
    pub fn is_linear(&self) -> bool {
        self.prior < 1.0 && self.posterior.map_or(true, |p| p < 1.0)
    }
}

/// Normalized discrepancy `dᵗ Sy⁺ d / m`.
pub fn normalized_discrepancy(d: &ObsVec, obs_cov_pinv: &Array2<f64>) -> f64 {
    let m = d.len().max(1) as f64;
    d.dot(&obs_cov_pinv.dot(d)).max(0.0) / m
}

/// Linear prediction from the prior versus the forward model at `x̂`.
///
/// Parameters
/// ----------
/// - `fx_hat`: `F(x̂)`.
/// - `fx_prior`: `F(x_a)`.
/// - `k_prior`: Jacobian at `x_a` (free columns).
/// - `dx`: `x̂ − x_a` on the free subspace.
/// - `obs_cov_pinv`: `Sy⁺`.
pub fn prior_linearity(
    fx_hat: &ObsVec, fx_prior: &ObsVec, k_prior: &Jacobian, dx: &Theta,
    obs_cov_pinv: &Array2<f64>,
) -> f64 {
    let linear = fx_prior + &k_prior.dot(dx);
    normalized_discrepancy(&(fx_hat - &linear), obs_cov_pinv)
}

/// Largest discrepancy along the principal axes of the posterior.
///
/// # Errors
/// Propagates the first error returned by `eval`.
pub fn posterior_linearity<E>(
    posterior_cov: &Array2<f64>, k: &Jacobian, fx_hat: &ObsVec, obs_cov_pinv: &Array2<f64>,
    mut eval: E,
) -> OEResult<f64>
where
    E: FnMut(&Theta) -> OEResult<ObsVec>,
{
    let mut worst = 0.0_f64;
    for delta in principal_axes(posterior_cov) {
        let fx = eval(&delta)?;
        let linear = fx_hat + &k.dot(&delta);
        worst = worst.max(normalized_discrepancy(&(fx - linear), obs_cov_pinv));
    }
    Ok(worst)
}
