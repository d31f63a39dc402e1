//! inference — post-retrieval diagnostics for optimal-estimation runs.
//!
//! Purpose
//! -------
//! Turn a finished retrieval (prior and posterior covariances, Jacobians,
//! predictions) into the figures used to judge it: averaging kernel and
//! degrees of freedom for signal, Shannon information content, χ² fit
//! tests, and linearity checks.
//!
//! Key behaviors
//! -------------
//! - [`Diagnostics::compute`] bundles every figure for one run. It works on
//!   the free-parameter subspace and embeds state-space results back into
//!   the full parameter ordering (fixed parameters get zero rows/columns).
//! - The posterior-direction linearity test needs extra forward
//!   evaluations; if one fails, only that figure is dropped.
//! - χ² tests never fail a run: a failed test is a `passed == false` flag.
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs come from a run that produced a posterior covariance and a
//!   final prediction; covariances are symmetric.
//! - `jacobian_prior` is the Jacobian evaluated at the prior, `jacobian`
//!   the one at the final state `x̂`. Both hold only the free columns.
//!
//! Conventions
//! -----------
//! - Quadratic forms in observation space use pseudo-inverses
//!   (`numerical_stability::pseudo_inverse`), so diagnostics degrade
//!   gracefully on nearly singular covariances.
//! - Errors are reported as `OEError`; the engine downgrades them to a
//!   missing diagnostics block rather than failing the retrieval.
//!
//! Testing notes
//! -------------
//! - Submodules test each figure on closed-form scalar cases.
//! - Integration tests check DOFS, χ² flags, and linearity on end-to-end
//!   retrievals.

pub mod chi_square;
pub mod information;
pub mod linearity;

use crate::optimization::{
    errors::OEResult,
    estimation::types::{Jacobian, ObsVec, Theta},
    numerical_stability::{embed_block, embed_vector, pseudo_inverse},
};
use ndarray::{Array1, Array2};
use tracing::debug;

pub use self::chi_square::{ChiSquareTest, fit_test, prior_residual_test};
pub use self::information::{averaging_kernel, degrees_of_freedom, information_content};
pub use self::linearity::{LinearityReport, posterior_linearity, prior_linearity};

/// Everything [`Diagnostics::compute`] needs from a finished run.
///
/// State-space fields hold the free-parameter subspace only; `free` maps
/// its positions back into the full state of length `n`.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticInputs<'a> {
    pub free: &'a [usize],
    pub n: usize,
    pub prior_cov: &'a Array2<f64>,
    pub posterior_cov: &'a Array2<f64>,
    pub obs_cov: &'a Array2<f64>,
    pub jacobian: &'a Jacobian,
    pub jacobian_prior: &'a Jacobian,
    pub y: &'a ObsVec,
    pub fx_hat: &'a ObsVec,
    pub fx_prior: &'a ObsVec,
    pub dx: &'a Theta,
    pub significance: f64,
}

/// Diagnostic figures attached to a retrieval result.
///
/// - `averaging_kernel`: `n × n`, zero rows/columns for fixed parameters.
/// - `dofs_per_parameter` / `dofs`: diagonal and trace of the kernel.
/// - `information_content`: Shannon information in nats.
/// - `chi_square_prior`: `y − F(x_a)` against `K Sa Kᵗ + Sy`.
/// - `chi_square_fit`: `y − F(x̂)` against `Sy (K Sa Kᵗ + Sy)⁻¹ Sy`.
/// - `linearity`: prior-based and posterior-direction figures.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostics {
    pub averaging_kernel: Array2<f64>,
    pub dofs_per_parameter: Array1<f64>,
    pub dofs: f64,
    pub information_content: f64,
    pub chi_square_prior: ChiSquareTest,
    pub chi_square_fit: ChiSquareTest,
    pub linearity: LinearityReport,
}

impl Diagnostics {
    /// Compute all diagnostics for one run.
    ///
    /// `eval` maps a free-space offset `δ` to `F(x̂ + δ)`.
    ///
    /// # Errors
    /// - `SingularMatrix` if a covariance is not positive definite when the
    ///   information content is formed.
    /// - `InvalidDistribution` for an empty observation space.
    pub fn compute<E>(inputs: &DiagnosticInputs<'_>, eval: E) -> OEResult<Self>
    where
        E: FnMut(&Theta) -> OEResult<ObsVec>,
    {
        let kernel = averaging_kernel(inputs.prior_cov, inputs.posterior_cov);
        let (dofs_free, dofs) = degrees_of_freedom(&kernel);
        let information_content = information_content(inputs.prior_cov, inputs.posterior_cov)?;

        let prior_residual = inputs.y - inputs.fx_prior;
        let chi_square_prior = prior_residual_test(
            &prior_residual,
            inputs.jacobian_prior,
            inputs.prior_cov,
            inputs.obs_cov,
            inputs.significance,
        )?;
        let fit_residual = inputs.y - inputs.fx_hat;
        let chi_square_fit = fit_test(
            &fit_residual,
            inputs.jacobian,
            inputs.prior_cov,
            inputs.obs_cov,
            inputs.significance,
        )?;

        let obs_cov_pinv = pseudo_inverse(inputs.obs_cov);
        let prior = prior_linearity(
            inputs.fx_hat,
            inputs.fx_prior,
            inputs.jacobian_prior,
            inputs.dx,
            &obs_cov_pinv,
        );
        let posterior = match posterior_linearity(
            inputs.posterior_cov,
            inputs.jacobian,
            inputs.fx_hat,
            &obs_cov_pinv,
            eval,
        ) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(error = %err, "posterior linearity test skipped");
                None
            }
        };

        Ok(Self {
            averaging_kernel: embed_block(&kernel, inputs.free, inputs.n),
            dofs_per_parameter: embed_vector(&dofs_free, inputs.free, inputs.n),
            dofs,
            information_content,
            chi_square_prior,
            chi_square_fit,
            linearity: LinearityReport { prior, posterior },
        })
    }
}

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use dial_retrieval::inference::prelude::*;
//
// to import the diagnostics surface in a single line.

pub mod prelude {
    pub use super::{ChiSquareTest, DiagnosticInputs, Diagnostics, LinearityReport};
}
