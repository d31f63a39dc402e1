//! estimation::run — the iteration state machine of an optimal-estimation run.
//!
//! Purpose
//! -------
//! Drive one retrieval from the prior to a terminal state and assemble the
//! immutable [`RetrievalResult`]. Inputs have already been validated by the
//! public entry points; everything that can go wrong here (forward model
//! failures, singular matrices, divergence) ends the run as FAILED.
//!
//! Key behaviors
//! -------------
//! - Per iteration: evaluate `F(x_n)`, form the residual, compute the
//!   Jacobian, update the state on the free subspace, compute the normalized
//!   step `d²`, and append an [`IterationRecord`].
//! - Gauss–Newton update (no damping) in observation-space form:
//!   `G = Sa Kᵗ (K Sa Kᵗ + Sy)⁻¹`, `x_{n+1} = x_a + G (r + K (x_n − x_a))`,
//!   `Ŝ = (I − G K) Sa (I − G K)ᵗ + G Sy Gᵗ` (Joseph form; stays PSD when
//!   `K Sa Kᵗ` dwarfs `Sy`, where `Sa − G K Sa` cancels to zero).
//! - Levenberg–Marquardt update (damping `γ > 0`) in state-space form:
//!   `x_{n+1} = x_n + ((1 + γ) Sa⁻¹ + Kᵗ Sy⁻¹ K)⁻¹ (Kᵗ Sy⁻¹ r − Sa⁻¹ (x_n − x_a))`,
//!   `Ŝ = (Sa⁻¹ + Kᵗ Sy⁻¹ K)⁻¹`.
//! - Termination is checked after each record, in this order: converged,
//!   diverged, iteration cap, wall-clock budget.
//! - After the loop, `F(x̂)` and `K(x̂)` are evaluated once more; the
//!   result's Jacobian and the diagnostics use `K(x̂)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `free` lists the parameters with positive prior variance, in order;
//!   fixed parameters never leave their prior value.
//! - `d² = Δxᵗ Ŝ⁻¹ Δx` on the free subspace; convergence requires
//!   `d² < n_free / convergence_factor` for `required_consecutive`
//!   iterations in a row.
//! - No randomness and no wall-clock data enter the result, so identical
//!   inputs give identical results.
use crate::{
    inference::{DiagnosticInputs, Diagnostics},
    optimization::{
        errors::{OEError, OEResult},
        estimation::{
            adapter::ForwardAdapter,
            jacobian::compute_jacobian,
            result::{IterationRecord, RetrievalResult, Termination},
            state::{Covariance, ObservationVector, StateVector},
            traits::{ForwardModel, OEOptions},
            types::{Jacobian, ObsVec, Theta},
        },
        numerical_stability::{embed_block, invert_symmetric, select_block, symmetrize},
    },
};
use ndarray::{Array2, Axis};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Outcome of one update step on the free subspace.
struct Step {
    x_next: Theta,
    posterior: Array2<f64>,
    d2: f64,
}

/// Mutable loop state of one run. Borrowed inputs are never modified.
struct Engine<'a, M: ForwardModel> {
    adapter: &'a ForwardAdapter<'a, M>,
    prior: &'a StateVector,
    prior_cov: &'a Covariance,
    obs: &'a ObservationVector,
    obs_cov: &'a Covariance,
    opts: &'a OEOptions,
    free: &'a [usize],
    free_mask: Vec<bool>,
    prior_std: Theta,
    sa: Array2<f64>,
    sa_inv: Option<Array2<f64>>,
    sy_inv: Option<Array2<f64>>,
    x: Theta,
    history: Vec<IterationRecord>,
    posterior: Option<Array2<f64>>,
    jacobian: Option<Jacobian>,
    jacobian_prior: Option<Jacobian>,
    consecutive: usize,
    diverging: usize,
}

/// Run the iteration loop and assemble the result.
///
/// Parameters
/// ----------
/// - `adapter`: forward model bound to the observation dimension.
/// - `prior`, `prior_cov`: `x_a` and `Sa` (validated).
/// - `obs`, `obs_cov`: `y` and `Sy` (validated).
/// - `free`: indices of parameters with positive prior variance.
/// - `opts`: validated options.
///
/// Returns
/// -------
/// A [`RetrievalResult`] in one of the four terminal states. This function
/// does not fail; in-loop errors are recorded in the result.
pub fn run_retrieval<M: ForwardModel>(
    adapter: &ForwardAdapter<'_, M>, prior: &StateVector, prior_cov: &Covariance,
    obs: &ObservationVector, obs_cov: &Covariance, free: &[usize], opts: &OEOptions,
) -> RetrievalResult {
    let n = prior.len();
    let mut free_mask = vec![false; n];
    for &i in free {
        free_mask[i] = true;
    }
    let engine = Engine {
        adapter,
        prior,
        prior_cov,
        obs,
        obs_cov,
        opts,
        free,
        free_mask,
        prior_std: prior_cov.std_devs(),
        sa: select_block(prior_cov.matrix(), free),
        sa_inv: None,
        sy_inv: None,
        x: prior.values().clone(),
        history: Vec::new(),
        posterior: None,
        jacobian: None,
        jacobian_prior: None,
        consecutive: 0,
        diverging: 0,
    };
    engine.run()
}

impl<'a, M: ForwardModel> Engine<'a, M> {
    fn run(mut self) -> RetrievalResult {
        let start = Instant::now();
        let outcome = loop {
            match self.iterate() {
                Ok(None) => {}
                Ok(Some(termination)) => break Ok(termination),
                Err(err) => break Err(err),
            }
            if let Some(budget) = self.opts.tols.max_wall_time {
                if start.elapsed() >= budget {
                    break Ok(Termination::TimedOut);
                }
            }
        };
        self.finish(outcome)
    }

    /// One full iteration. Returns the terminal state if the run stops here.
    fn iterate(&mut self) -> OEResult<Option<Termination>> {
        let iteration = self.history.len() + 1;
        let state = self.prior.with_values(self.x.clone());
        let predicted = self.adapter.evaluate(&state)?;
        let residual = self.obs.values() - &predicted;
        let k = compute_jacobian(
            self.adapter,
            &state,
            &predicted,
            &self.prior_std,
            &self.free_mask,
            self.opts.perturbation,
            self.opts.jacobian_scheme,
        )?;
        let k_free = k.select(Axis(1), self.free);
        let gamma = self.opts.gamma(iteration - 1);
        let step = if gamma > 0.0 {
            self.damped_step(&k_free, &residual, gamma)?
        } else {
            self.gauss_newton_step(&k_free, &residual)?
        };

        let previous_d2 = self.history.last().map(|r| r.d2);
        debug!(
            iteration,
            d2 = step.d2,
            gamma,
            residual_norm = residual.dot(&residual).sqrt(),
            "optimal-estimation iteration"
        );
        self.history.push(IterationRecord {
            iteration,
            state,
            predicted: self.obs.with_values(predicted),
            residual,
            d2: step.d2,
        });
        if self.jacobian_prior.is_none() {
            self.jacobian_prior = Some(k_free);
        }
        self.jacobian = Some(k);
        self.x = embed_free(&self.x, &step.x_next, self.free);
        self.posterior = Some(step.posterior);

        let threshold = self.free.len() as f64 / self.opts.tols.convergence_factor;
        self.consecutive = if step.d2 < threshold { self.consecutive + 1 } else { 0 };
        if self.consecutive >= self.opts.tols.required_consecutive {
            return Ok(Some(Termination::Converged));
        }

        self.diverging = match previous_d2 {
            Some(prev) if step.d2 > prev => self.diverging + 1,
            _ => 0,
        };
        if let Some(limit) = self.opts.max_diverging_steps {
            if self.diverging > limit {
                return Err(OEError::Diverged { steps: self.diverging, last_d2: step.d2 });
            }
        }

        if iteration >= self.opts.tols.max_iter {
            return Ok(Some(Termination::MaxIterReached));
        }
        Ok(None)
    }

    /// Observation-space Gauss–Newton update anchored to the prior.
    fn gauss_newton_step(&self, k: &Jacobian, residual: &ObsVec) -> OEResult<Step> {
        let limit = self.opts.condition_limit;
        let sa = &self.sa;
        let x_free = self.x.select(Axis(0), self.free);
        let xa_free = self.prior.values().select(Axis(0), self.free);

        let sa_kt = sa.dot(&k.t());
        let s_total = k.dot(&sa_kt) + self.obs_cov.matrix();
        let s_total_inv = invert_symmetric(&s_total, limit, "K Sa Kᵗ + Sy")?;
        let gain = sa_kt.dot(&s_total_inv);

        let innovation = residual + &k.dot(&(&x_free - &xa_free));
        let x_next = &xa_free + &gain.dot(&innovation);
        let i_gk = Array2::<f64>::eye(self.free.len()) - &gain.dot(k);
        let mut posterior = i_gk.dot(sa).dot(&i_gk.t())
            + &gain.dot(self.obs_cov.matrix()).dot(&gain.t());
        symmetrize(&mut posterior);

        let d2 = self.normalized_step(&x_next, &x_free, &posterior)?;
        Ok(Step { x_next, posterior, d2 })
    }

    /// State-space Levenberg–Marquardt update with damping `gamma`.
    fn damped_step(&mut self, k: &Jacobian, residual: &ObsVec, gamma: f64) -> OEResult<Step> {
        let limit = self.opts.condition_limit;
        let sa_inv = cached_inverse(&mut self.sa_inv, &self.sa, limit, "prior covariance")?;
        let sy_inv =
            cached_inverse(&mut self.sy_inv, self.obs_cov.matrix(), limit, "observation covariance")?;
        let x_free = self.x.select(Axis(0), self.free);
        let xa_free = self.prior.values().select(Axis(0), self.free);

        let kt_sy_inv = k.t().dot(sy_inv);
        let information = kt_sy_inv.dot(k);
        let damped = sa_inv * (1.0 + gamma) + &information;
        let damped_inv = invert_symmetric(&damped, limit, "damped normal matrix")?;
        let gradient = kt_sy_inv.dot(residual) - sa_inv.dot(&(&x_free - &xa_free));
        let x_next = &x_free + &damped_inv.dot(&gradient);

        let mut posterior =
            invert_symmetric(&(sa_inv + &information), limit, "posterior information")?;
        symmetrize(&mut posterior);

        let d2 = self.normalized_step(&x_next, &x_free, &posterior)?;
        Ok(Step { x_next, posterior, d2 })
    }

    /// `d² = (x_{n+1} − x_n)ᵗ Ŝ⁻¹ (x_{n+1} − x_n)`.
    fn normalized_step(&self, x_next: &Theta, x: &Theta, posterior: &Array2<f64>) -> OEResult<f64> {
        let posterior_inv =
            invert_symmetric(posterior, self.opts.condition_limit, "posterior covariance")?;
        let dx = x_next - x;
        Ok(dx.dot(&posterior_inv.dot(&dx)))
    }

    /// Final prediction, diagnostics, and result assembly.
    fn finish(mut self, outcome: OEResult<Termination>) -> RetrievalResult {
        let state = self.prior.with_values(self.x.clone());
        let (termination, failure, predicted) = match outcome {
            Ok(termination) => match self.adapter.evaluate(&state) {
                Ok(fx) => (termination, None, Some(fx)),
                Err(err) => (Termination::Failed, Some(err), None),
            },
            Err(err) => (Termination::Failed, Some(err), None),
        };

        let final_jacobian = predicted.as_ref().and_then(|fx_hat| {
            match self.final_jacobian(&state, fx_hat) {
                Ok(k) => Some(k),
                Err(err) => {
                    warn!(error = %err, "Jacobian at the final state unavailable");
                    None
                }
            }
        });
        let diagnostics = match (&predicted, &final_jacobian, &self.posterior) {
            (Some(fx_hat), Some(k_hat), Some(posterior)) => {
                self.diagnostics(&state, fx_hat, k_hat, posterior)
            }
            _ => None,
        };
        if final_jacobian.is_some() {
            self.jacobian = final_jacobian;
        }

        match &failure {
            Some(err) => warn!(
                iterations = self.history.len(),
                kind = ?err.kind(),
                error = %err,
                "retrieval failed"
            ),
            None => info!(
                termination = %termination,
                iterations = self.history.len(),
                converged = termination == Termination::Converged,
                "retrieval finished"
            ),
        }

        let n = self.prior.len();
        let posterior_covariance = self.posterior.as_ref().map(|s| {
            Covariance::from_parts_unchecked(
                self.prior_cov.names().clone(),
                embed_block(s, self.free, n),
            )
        });
        RetrievalResult {
            state,
            prior: self.prior.clone(),
            predicted: predicted.map(|fx| self.obs.with_values(fx)),
            posterior_covariance,
            jacobian: self.jacobian,
            termination,
            history: self.history,
            failure,
            diagnostics,
            forward_evals: self.adapter.evals(),
        }
    }

    /// `K(x̂)` with fixed columns zeroed.
    fn final_jacobian(&self, state: &StateVector, fx_hat: &ObsVec) -> OEResult<Jacobian> {
        compute_jacobian(
            self.adapter,
            state,
            fx_hat,
            &self.prior_std,
            &self.free_mask,
            self.opts.perturbation,
            self.opts.jacobian_scheme,
        )
    }

    fn diagnostics(
        &self, state: &StateVector, fx_hat: &ObsVec, k_hat: &Jacobian, posterior: &Array2<f64>,
    ) -> Option<Diagnostics> {
        let (Some(k_prior), Some(first)) = (&self.jacobian_prior, self.history.first()) else {
            return None;
        };
        let k_free = k_hat.select(Axis(1), self.free);
        let x_hat_free = state.values().select(Axis(0), self.free);
        let dx = &x_hat_free - &self.prior.values().select(Axis(0), self.free);
        let inputs = DiagnosticInputs {
            free: self.free,
            n: self.prior.len(),
            prior_cov: &self.sa,
            posterior_cov: posterior,
            obs_cov: self.obs_cov.matrix(),
            jacobian: &k_free,
            jacobian_prior: k_prior,
            y: self.obs.values(),
            fx_hat,
            fx_prior: first.predicted.values(),
            dx: &dx,
            significance: self.opts.significance,
        };
        let eval = |delta: &Theta| {
            let shifted = embed_free(state.values(), &(&x_hat_free + delta), self.free);
            self.adapter.evaluate(&state.with_values(shifted))
        };
        match Diagnostics::compute(&inputs, eval) {
            Ok(diagnostics) => Some(diagnostics),
            Err(err) => {
                warn!(error = %err, "diagnostics unavailable");
                None
            }
        }
    }
}

/// Invert `a` on first use and keep the inverse for later iterations.
fn cached_inverse<'s>(
    slot: &'s mut Option<Array2<f64>>, a: &Array2<f64>, limit: f64, context: &'static str,
) -> OEResult<&'s Array2<f64>> {
    if slot.is_none() {
        *slot = Some(invert_symmetric(a, limit, context)?);
    }
    slot.as_ref().ok_or(OEError::SingularMatrix { context, condition: f64::INFINITY })
}

/// Copy of `full` with the free positions replaced by `values`.
fn embed_free(full: &Theta, values: &Theta, free: &[usize]) -> Theta {
    let mut out = full.clone();
    for (k, &i) in free.iter().enumerate() {
        out[i] = values[k];
    }
    out
}
