//! High-level entry points for optimal-estimation retrievals.
//!
//! [`retrieve`] validates options and inputs, binds the forward model to the
//! observation space, and delegates the loop to
//! [`run_retrieval`](crate::optimization::estimation::run::run_retrieval).
//! [`run`] is the short form with default options and a plain iteration /
//! wall-clock budget.
use crate::optimization::{
    errors::OEResult,
    estimation::{
        adapter::ForwardAdapter,
        result::RetrievalResult,
        run::run_retrieval,
        state::{Covariance, ObservationVector, StateVector},
        traits::{ForwardModel, OEOptions},
        validation::validate_problem,
    },
};
use std::time::Duration;
use tracing::debug;

/// Retrieve the maximum-a-posteriori state for `obs` given `prior`.
///
/// # Behavior
/// - Re-validates `opts` (fields are public).
/// - Checks that covariance names match their vectors and that both
///   covariances are symmetric PSD; parameters with zero prior variance are
///   held fixed.
/// - Runs the iteration loop; forward-model failures, singular matrices,
///   and divergence end the run as FAILED inside the returned result.
///
/// # Parameters
/// - `model`, `aux`: forward model and its fixed auxiliary inputs.
/// - `prior`, `prior_cov`: a-priori state `x_a` and covariance `Sa`.
/// - `obs`, `obs_cov`: measurement `y` and covariance `Sy`.
/// - `opts`: engine options.
///
/// # Errors
/// Configuration errors only (`ErrorKind::Configuration`), raised before the
/// first forward evaluation. Inputs are borrowed and never modified.
///
/// # Example
/// ```rust
/// use dial_retrieval::optimization::estimation::prelude::*;
/// use ndarray::array;
///
/// let prior = StateVector::from_pairs(vec![("co2_ppm", 400.0)])?;
/// let prior_cov = Covariance::new(prior.names().clone(), array![[5.0]])?;
/// let obs = ObservationVector::from_pairs(vec![("ratio", 0.045)])?;
/// let obs_cov = Covariance::new(obs.names().clone(), array![[1e-8]])?;
/// let model = FnModel(|x: &StateVector| x.values().mapv(|v| v * 1e-4));
///
/// let res = retrieve(&model, &(), &prior, &prior_cov, &obs, &obs_cov, &OEOptions::default())?;
/// assert!(res.converged());
/// # Ok::<(), dial_retrieval::optimization::errors::OEError>(())
/// ```
pub fn retrieve<M: ForwardModel>(
    model: &M, aux: &M::Aux, prior: &StateVector, prior_cov: &Covariance,
    obs: &ObservationVector, obs_cov: &Covariance, opts: &OEOptions,
) -> OEResult<RetrievalResult> {
    opts.validate()?;
    let free = validate_problem(prior, prior_cov, obs, obs_cov)?;
    debug!(
        n_state = prior.len(),
        n_free = free.len(),
        n_obs = obs.len(),
        max_iter = opts.tols.max_iter,
        "starting retrieval"
    );
    let adapter = ForwardAdapter::new(model, aux, obs.len());
    Ok(run_retrieval(&adapter, prior, prior_cov, obs, obs_cov, &free, opts))
}

/// Retrieval with default options, an iteration cap, and an optional
/// wall-clock budget.
///
/// # Errors
/// - `InvalidMaxIter` if `max_iterations == 0`.
/// - Any configuration error from [`retrieve`].
pub fn run<M: ForwardModel<Aux = ()>>(
    prior_state: &StateVector, prior_covariance: &Covariance, observations: &ObservationVector,
    observation_covariance: &Covariance, forward_model: &M, max_iterations: usize,
    max_wall_time: Option<Duration>,
) -> OEResult<RetrievalResult> {
    let opts = OEOptions::with_limits(max_iterations, max_wall_time)?;
    retrieve(
        forward_model,
        &(),
        prior_state,
        prior_covariance,
        observations,
        observation_covariance,
        &opts,
    )
}
