//! estimation::jacobian — sensitivity matrix `K = ∂F/∂x` for one iterate.
//!
//! Purpose
//! -------
//! Produce a validated `(m × n)` Jacobian at the current state, either from
//! the model's analytic implementation or by finite differences whose step
//! is scaled by each parameter's prior standard deviation.
//!
//! Key behaviors
//! -------------
//! - Prefer the analytic Jacobian when the model provides one; otherwise
//!   perturb each free parameter by `perturbation · σ_a,i` and difference
//!   (forward or central scheme).
//! - Floor the step at `√ε · max(|x_i|, 1)` when the scaled step would not
//!   change `x_i` in floating point (e.g. underflow or huge `|x_i|`).
//! - Zero the columns of fixed parameters (zero prior variance) in both
//!   paths, so they never take part in the update.
//!
//! Invariants & assumptions
//! ------------------------
//! - `free[i]` is `true` exactly when the prior variance of parameter `i`
//!   is positive; `prior_std[i] > 0` for those parameters.
//! - The unperturbed prediction `y0 = F(x)` has already been validated.
//! - Any forward-model error raised while perturbing is propagated
//!   unchanged; the engine treats it as fatal to the run.
use crate::optimization::{
    errors::OEResult,
    estimation::{
        adapter::ForwardAdapter,
        state::StateVector,
        traits::{ForwardModel, JacobianScheme},
        types::{Jacobian, ObsVec, Theta},
    },
};

/// compute_jacobian — Jacobian at `x` with fixed columns zeroed.
///
/// Parameters
/// ----------
/// - `adapter`: forward model bound to the run.
/// - `x`: current state iterate.
/// - `y0`: validated `F(x)`, reused by the forward scheme.
/// - `prior_std`: square roots of the prior variances.
/// - `free`: mask of parameters taking part in the update.
/// - `perturbation`: step as a fraction of `prior_std`.
/// - `scheme`: forward or central differences.
///
/// Errors
/// ------
/// - Forward-model errors from perturbed evaluations.
/// - `JacobianDimMismatch` / `NonFiniteJacobian` from an invalid analytic
///   Jacobian.
pub fn compute_jacobian<M: ForwardModel>(
    adapter: &ForwardAdapter<'_, M>, x: &StateVector, y0: &ObsVec, prior_std: &Theta,
    free: &[bool], perturbation: f64, scheme: JacobianScheme,
) -> OEResult<Jacobian> {
    let n = x.len();
    let m = adapter.obs_dim();
    let mut k = match adapter.analytic_jacobian(x)? {
        Some(k) => k,
        None => {
            let mut k = Jacobian::zeros((m, n));
            for i in (0..n).filter(|&i| free[i]) {
                let h = step_size(x.values()[i], prior_std[i], perturbation);
                let column = match scheme {
                    JacobianScheme::Forward => {
                        let (x_up, h_up) = perturbed(x, i, h);
                        let y_up = adapter.evaluate(&x_up)?;
                        (y_up - y0) / h_up
                    }
                    JacobianScheme::Central => {
                        let (x_up, h_up) = perturbed(x, i, h);
                        let (x_dn, h_dn) = perturbed(x, i, -h);
                        let y_up = adapter.evaluate(&x_up)?;
                        let y_dn = adapter.evaluate(&x_dn)?;
                        (y_up - y_dn) / (h_up - h_dn)
                    }
                };
                k.column_mut(i).assign(&column);
            }
            k
        }
    };
    for i in (0..n).filter(|&i| !free[i]) {
        k.column_mut(i).fill(0.0);
    }
    Ok(k)
}

// ---- Helper methods ----

/// Finite-difference step for one parameter.
fn step_size(x_i: f64, std_i: f64, perturbation: f64) -> f64 {
    let h = perturbation * std_i;
    if h > 0.0 && (x_i + h) - x_i != 0.0 {
        h
    } else {
        f64::EPSILON.sqrt() * x_i.abs().max(1.0)
    }
}

/// Copy of `x` with parameter `i` shifted by `h`, plus the step actually
/// realized in floating point.
fn perturbed(x: &StateVector, i: usize, h: f64) -> (StateVector, f64) {
    let mut values = x.values().clone();
    let base = values[i];
    values[i] = base + h;
    let realized = values[i] - base;
    (x.with_values(values), realized)
}
