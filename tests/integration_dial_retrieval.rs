//! Integration tests for optimal-estimation retrievals and the DIAL layer.
//!
//! Purpose
//! -------
//! - Validate the end-to-end retrieval pipeline: validated inputs, the
//!   Gauss–Newton / Levenberg–Marquardt loop, termination handling, and
//!   the diagnostics attached to a finished run.
//! - Exercise the DIAL layer on synthetic lidar profiles with realistic
//!   magnitudes (n_c ≈ 1e22 m⁻³, Δσ ≈ 5e-27 m², ΔR = 100 m).
//!
//! Coverage
//! --------
//! - `optimization::estimation`:
//!   - Linear problems against the closed-form weighted-least-squares MAP.
//!   - Terminal states: converged, iteration cap, time budget, failure,
//!     divergence.
//!   - Idempotence, posterior symmetry/PSD, fixed parameters.
//!   - Configuration errors before the loop.
//! - `inference`: DOFS, information content, linearity on a linear model.
//! - `dial`: TOML configuration, per-gate batch retrieval, ordering and
//!   per-gate failure isolation.
//!
//! Exclusions
//! ----------
//! - Low-level linear algebra and validation helpers; those are covered by
//!   unit tests next to their modules.
use dial_retrieval::{
    dial::prelude::*,
    optimization::{
        errors::{ErrorKind, OEError, OEResult},
        estimation::{
            Covariance, FnModel, ForwardModel, OEOptions, ObservationVector, StateVector,
            Termination, Tolerances, VarNames, retrieve, run,
            types::{Jacobian, ObsVec},
        },
        numerical_stability::{invert_symmetric, min_eigenvalue},
    },
};
use ndarray::{Array1, Array2, array};
use proptest::prelude::*;
use std::time::Duration;

/// Purpose
/// -------
/// Three-observation, two-parameter linear problem with diagonal
/// covariances and mildly noisy data around `x = [2.0, 2.5]`.
///
/// Returns
/// -------
/// `(K, prior, prior_cov, obs, obs_cov)`.
fn linear_problem() -> (Array2<f64>, StateVector, Covariance, ObservationVector, Covariance) {
    let k = array![[1.0, 0.0], [0.0, 2.0], [1.0, 1.0]];
    let prior = StateVector::from_pairs(vec![("a", 1.0), ("b", 1.0)]).unwrap();
    let prior_cov = Covariance::new(prior.names().clone(), array![[4.0, 0.0], [0.0, 9.0]]).unwrap();
    let obs =
        ObservationVector::from_pairs(vec![("y1", 2.02), ("y2", 4.98), ("y3", 4.49)]).unwrap();
    let obs_cov = Covariance::new(
        obs.names().clone(),
        array![[0.01, 0.0, 0.0], [0.0, 0.04, 0.0], [0.0, 0.0, 0.01]],
    )
    .unwrap();
    (k, prior, prior_cov, obs, obs_cov)
}

/// Closed-form MAP `x_a + (Kᵗ Sy⁻¹ K + Sa⁻¹)⁻¹ Kᵗ Sy⁻¹ (y − K x_a)`.
fn analytic_map(
    k: &Array2<f64>, prior: &StateVector, prior_cov: &Covariance, obs: &ObservationVector,
    obs_cov: &Covariance,
) -> (Array1<f64>, Array2<f64>) {
    let sa_inv = invert_symmetric(prior_cov.matrix(), 1e12, "test prior").unwrap();
    let sy_inv = invert_symmetric(obs_cov.matrix(), 1e12, "test obs").unwrap();
    let kt_sy_inv = k.t().dot(&sy_inv);
    let posterior = invert_symmetric(&(kt_sy_inv.dot(k) + &sa_inv), 1e12, "test post").unwrap();
    let r = obs.values() - &k.dot(prior.values());
    (prior.values() + &posterior.dot(&kt_sy_inv.dot(&r)), posterior)
}

/// Forward model `F(x) = x` that reports a Jacobian of the wrong sign, so
/// every Gauss–Newton step moves further away from the data.
struct WrongSignModel;

impl ForwardModel for WrongSignModel {
    type Aux = ();

    fn forward(&self, x: &StateVector, _aux: &()) -> OEResult<ObsVec> {
        Ok(x.values().clone())
    }

    fn jacobian(&self, _x: &StateVector, _aux: &()) -> OEResult<Jacobian> {
        Ok(array![[-1.0]])
    }
}

fn scalar(name: &str, value: f64, variance: f64) -> (StateVector, Covariance) {
    let x = StateVector::from_pairs(vec![(name, value)]).unwrap();
    let cov = Covariance::new(x.names().clone(), array![[variance]]).unwrap();
    (x, cov)
}

fn scalar_obs(value: f64, variance: f64) -> (ObservationVector, Covariance) {
    let y = ObservationVector::from_pairs(vec![("y", value)]).unwrap();
    let cov = Covariance::new(y.names().clone(), array![[variance]]).unwrap();
    (y, cov)
}

#[test]
// Purpose
// -------
// A noise-free-structured linear model lands on the analytic MAP after one
// update, and the diagnostics describe a well-constrained linear problem.
//
// Given
// -----
// - `linear_problem()` with an exactly linear forward model.
//
// Expect
// ------
// - The iterate after the first update equals the closed-form MAP.
// - Converged; posterior equals `(Kᵗ Sy⁻¹ K + Sa⁻¹)⁻¹`.
// - DOFS close to 2, positive information content, linearity figures < 1.
fn linear_model_matches_weighted_least_squares() {
    let (k, prior, prior_cov, obs, obs_cov) = linear_problem();
    let model = FnModel(|x: &StateVector| k.dot(x.values()));
    let res = run(&prior, &prior_cov, &obs, &obs_cov, &model, 20, None).unwrap();
    let (x_map, s_map) = analytic_map(&k, &prior, &prior_cov, &obs, &obs_cov);

    assert_eq!(res.termination(), Termination::Converged);
    assert!(res.converged());
    assert!(res.iterations() >= 2);
    for i in 0..2 {
        assert!((res.history()[1].state.values()[i] - x_map[i]).abs() < 1e-9);
        assert!((res.state().values()[i] - x_map[i]).abs() < 1e-9);
    }
    let post = res.posterior_covariance().unwrap().matrix();
    for i in 0..2 {
        for j in 0..2 {
            assert!((post[[i, j]] - s_map[[i, j]]).abs() < 1e-9);
        }
    }

    let diag = res.diagnostics().expect("diagnostics on a converged run");
    assert!(diag.dofs > 1.9 && diag.dofs <= 2.0 + 1e-9, "dofs {}", diag.dofs);
    assert!(diag.information_content > 0.0);
    assert_eq!(diag.chi_square_fit.dof, 3);
    assert!(diag.linearity.prior < 1e-6);
    assert!(diag.linearity.is_linear());
}

#[test]
// Purpose
// -------
// The reference scalar scenario moves from 400 toward 450.
//
// Given
// -----
// - `x_a = 400`, `Sa = 5`, `F(x) = 1e-4 x`, `y = 0.045`, `Sy = 1e-8`.
// - Same problem with a loose prior, `Sa = 1e6`.
//
// Expect
// ------
// - Tight prior: converged at the MAP 400 + 50 · 5 / 6 ≈ 441.67 within a
//   handful of iterations.
// - Loose prior: converged within 0.01 of 450, where the residual vanishes.
fn co2_scalar_scenario() {
    let model = FnModel(|x: &StateVector| x.values().mapv(|v| v * 1e-4));
    let (obs, obs_cov) = scalar_obs(0.045, 1e-8);

    let (prior, prior_cov) = scalar("co2_ppm", 400.0, 5.0);
    let res = run(&prior, &prior_cov, &obs, &obs_cov, &model, 10, None).unwrap();
    assert!(res.converged());
    assert!(res.iterations() <= 5);
    let x = res.state().get("co2_ppm").unwrap();
    assert!((x - (400.0 + 50.0 * 5.0 / 6.0)).abs() < 1e-6);

    let (prior, prior_cov) = scalar("co2_ppm", 400.0, 1e6);
    let res = run(&prior, &prior_cov, &obs, &obs_cov, &model, 10, None).unwrap();
    assert!(res.converged());
    assert!((res.state().get("co2_ppm").unwrap() - 450.0).abs() < 0.01);
    assert!((res.predicted().unwrap().values()[0] - 0.045).abs() < 1e-6);
}

#[test]
// Purpose
// -------
// Identical inputs give identical results.
fn repeated_runs_are_identical() {
    let (k, prior, prior_cov, obs, obs_cov) = linear_problem();
    let model = FnModel(|x: &StateVector| k.dot(x.values()).mapv(|v| v + 0.01 * v * v));
    let first = run(&prior, &prior_cov, &obs, &obs_cov, &model, 20, None).unwrap();
    let second = run(&prior, &prior_cov, &obs, &obs_cov, &model, 20, None).unwrap();
    assert_eq!(first, second);
}

#[test]
// Purpose
// -------
// The posterior covariance is symmetric and positive semidefinite.
fn posterior_is_symmetric_psd() {
    let (k, prior, prior_cov, obs, obs_cov) = linear_problem();
    let model = FnModel(|x: &StateVector| k.dot(x.values()).mapv(|v| v + 0.05 * v.sin()));
    let res = run(&prior, &prior_cov, &obs, &obs_cov, &model, 50, None).unwrap();
    let post = res.posterior_covariance().unwrap().matrix();
    assert_eq!(post[[0, 1]], post[[1, 0]]);
    let (min, _) = min_eigenvalue(post);
    assert!(min >= -1e-12);
    let sigma = res.uncertainties().unwrap();
    assert!(sigma.iter().all(|s| *s > 0.0));
}

#[test]
// Purpose
// -------
// A parameter with zero prior variance stays at its prior value and has
// a zero Jacobian column, also with finite-difference Jacobians.
fn zero_variance_parameter_is_fixed() {
    let names = VarNames::new("state vector", ["co2_ppm", "temperature_k"]).unwrap();
    let prior = StateVector::new(names.clone(), array![400.0, 280.0]).unwrap();
    let prior_cov = Covariance::new(names, array![[25.0, 0.0], [0.0, 0.0]]).unwrap();
    let (obs, obs_cov) = scalar_obs(0.046, 1e-8);
    let model = FnModel(|x: &StateVector| {
        let v = x.values();
        array![v[0] * 1e-4 * (v[1] / 280.0).sqrt()]
    });
    let res = run(&prior, &prior_cov, &obs, &obs_cov, &model, 20, None).unwrap();
    assert!(res.converged());
    assert_eq!(res.state().get("temperature_k"), Some(280.0));
    let k = res.jacobian().unwrap();
    assert_eq!(k[[0, 1]], 0.0);
    assert!(k[[0, 0]] > 0.0);
    assert_eq!(res.posterior_covariance().unwrap().variance("temperature_k"), Some(0.0));
    for record in res.history() {
        assert_eq!(record.state.get("temperature_k"), Some(280.0));
    }
    let diag = res.diagnostics().unwrap();
    assert_eq!(diag.dofs_per_parameter[1], 0.0);
}

#[test]
// Purpose
// -------
// NaN output ends the run as FAILED with a forward-model error and no NaN
// leaks into the result.
fn nan_forward_model_fails() {
    let (prior, prior_cov) = scalar("co2_ppm", 400.0, 5.0);
    let (obs, obs_cov) = scalar_obs(0.045, 1e-8);
    let model = FnModel(|_: &StateVector| array![f64::NAN]);
    let res = run(&prior, &prior_cov, &obs, &obs_cov, &model, 10, None).unwrap();
    assert_eq!(res.termination(), Termination::Failed);
    assert!(!res.converged());
    let err = res.failure().unwrap();
    assert_eq!(err.kind(), ErrorKind::ForwardModel);
    assert!(matches!(err, OEError::NonFiniteForward { index: 0, .. }));
    assert!(res.predicted().is_none());
    assert!(res.diagnostics().is_none());
    assert!(res.history().is_empty());
    assert_eq!(res.state(), &prior);
}

#[test]
// Purpose
// -------
// A single-iteration cap on a strongly nonlinear model stops after exactly
// one record without claiming convergence.
//
// Given
// -----
// - `F(x) = x³`, `x_a = 1`, `Sa = 100`, `y = 27`, `Sy = 0.01`.
//
// Expect
// ------
// - MAX_ITER_REACHED with one record; with a larger cap the same problem
//   needs several iterations and converges near x = 3.
fn iteration_cap_on_nonlinear_model() {
    let (prior, prior_cov) = scalar("x", 1.0, 100.0);
    let (obs, obs_cov) = scalar_obs(27.0, 0.01);
    let model = FnModel(|x: &StateVector| x.values().mapv(|v| v * v * v));

    let res = run(&prior, &prior_cov, &obs, &obs_cov, &model, 1, None).unwrap();
    assert_eq!(res.termination(), Termination::MaxIterReached);
    assert!(!res.converged());
    assert_eq!(res.history().len(), 1);
    assert!(res.predicted().is_some());

    let res = run(&prior, &prior_cov, &obs, &obs_cov, &model, 100, None).unwrap();
    assert!(res.converged());
    assert!(res.iterations() >= 5);
    assert!((res.state().get("x").unwrap() - 3.0).abs() < 1e-3);
}

#[test]
// Purpose
// -------
// A zero time budget ends the run after the first recorded iteration.
fn zero_time_budget_times_out() {
    let (prior, prior_cov) = scalar("x", 1.0, 100.0);
    let (obs, obs_cov) = scalar_obs(27.0, 0.01);
    let model = FnModel(|x: &StateVector| x.values().mapv(|v| v * v * v));
    let res = run(&prior, &prior_cov, &obs, &obs_cov, &model, 100, Some(Duration::ZERO)).unwrap();
    assert_eq!(res.termination(), Termination::TimedOut);
    assert_eq!(res.iterations(), 1);
}

#[test]
// Purpose
// -------
// Runs whose normalized step keeps growing are aborted when a divergence
// limit is set, and run to the cap otherwise.
//
// Given
// -----
// - `WrongSignModel`: iterates grow geometrically, so d² increases every
//   iteration after the first.
//
// Expect
// ------
// - Limit 2: FAILED with `Diverged { steps: 3 }` after four records.
// - No limit: MAX_ITER_REACHED after the cap.
fn divergence_is_detected() {
    let (prior, prior_cov) = scalar("x", 0.0, 1.0);
    let (obs, obs_cov) = scalar_obs(1.0, 0.01);
    let opts = OEOptions { max_diverging_steps: Some(2), ..OEOptions::default() };
    let res = retrieve(&WrongSignModel, &(), &prior, &prior_cov, &obs, &obs_cov, &opts).unwrap();
    assert_eq!(res.termination(), Termination::Failed);
    assert!(matches!(res.failure(), Some(OEError::Diverged { steps: 3, .. })));
    assert_eq!(res.failure().unwrap().kind(), ErrorKind::Divergence);
    assert_eq!(res.iterations(), 4);
    assert!(res.predicted().is_none());

    let opts = OEOptions::with_limits(6, None).unwrap();
    let res = retrieve(&WrongSignModel, &(), &prior, &prior_cov, &obs, &obs_cov, &opts).unwrap();
    assert_eq!(res.termination(), Termination::MaxIterReached);
    assert_eq!(res.iterations(), 6);
}

#[test]
// Purpose
// -------
// Levenberg–Marquardt damping reaches the same MAP as Gauss–Newton on a
// linear model.
fn damping_reaches_gauss_newton_solution() {
    let (k, prior, prior_cov, obs, obs_cov) = linear_problem();
    let model = FnModel(|x: &StateVector| k.dot(x.values()));
    let tols = Tolerances { convergence_factor: 1e8, ..Tolerances::default() };
    let gn = OEOptions { tols, ..OEOptions::default() };
    let lm = OEOptions { lm_gamma: Some(vec![10.0, 1.0, 0.0]), ..gn.clone() };

    let gn_res = retrieve(&model, &(), &prior, &prior_cov, &obs, &obs_cov, &gn).unwrap();
    let lm_res = retrieve(&model, &(), &prior, &prior_cov, &obs, &obs_cov, &lm).unwrap();
    assert!(gn_res.converged() && lm_res.converged());
    assert!(lm_res.iterations() > gn_res.iterations());
    for i in 0..2 {
        assert!((gn_res.state().values()[i] - lm_res.state().values()[i]).abs() < 1e-8);
    }
    let (gp, lp) =
        (gn_res.posterior_covariance().unwrap().matrix(), lm_res.posterior_covariance().unwrap().matrix());
    for (a, b) in gp.iter().zip(lp.iter()) {
        assert!((a - b).abs() < 1e-9);
    }
}

#[test]
// Purpose
// -------
// Malformed inputs are rejected as configuration errors before the model
// is called.
fn malformed_inputs_are_rejected() {
    let model = FnModel(|_: &StateVector| -> Array1<f64> { panic!("must not be evaluated") });
    let (prior, prior_cov) = scalar("x", 1.0, 1.0);
    let (obs, obs_cov) = scalar_obs(1.0, 1.0);

    let indefinite = Covariance::new(prior.names().clone(), array![[-1.0]]).unwrap();
    let err = run(&prior, &indefinite, &obs, &obs_cov, &model, 10, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let renamed = Covariance::new(VarNames::new("state", ["z"]).unwrap(), array![[1.0]]).unwrap();
    let err = run(&prior, &renamed, &obs, &obs_cov, &model, 10, None).unwrap_err();
    assert!(matches!(err, OEError::NameMismatch { .. }));

    let err = run(&prior, &prior_cov, &obs, &prior_cov, &model, 10, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let (zero_prior, zero_cov) = scalar("x", 1.0, 0.0);
    let err = run(&zero_prior, &zero_cov, &obs, &obs_cov, &model, 10, None).unwrap_err();
    assert_eq!(err, OEError::NoFreeParameters);
}

/// Synthetic power profile for `true_n_c.len() + 1` gates with a
/// range-dependent geometric factor and a constant background.
fn synthetic_profile(true_n_c: &[f64], delta_sigma: f64, bkg: f64) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let gates = true_n_c.len() + 1;
    let mut p_on = Vec::with_capacity(gates);
    let mut p_off = Vec::with_capacity(gates);
    let mut optical_depth: f64 = 0.0;
    for i in 0..gates {
        let geometry = 1.0 / ((i + 1) as f64).powi(2);
        p_off.push(geometry + bkg);
        p_on.push(geometry * (-optical_depth).exp() + bkg);
        if i < true_n_c.len() {
            optical_depth += 2.0 * delta_sigma * true_n_c[i] * DialConfig::default().delta_range_m;
        }
    }
    (p_on, p_off, vec![bkg; gates])
}

fn default_priors() -> GatePriors {
    GatePriors { co2_ppm: 400.0, co2_ppm_std: 40.0, delta_sigma_rel_std: 0.01, ratio_std: 1e-4 }
}

#[test]
// Purpose
// -------
// A synthetic lidar profile is retrieved gate by gate in parallel.
//
// Given
// -----
// - Five layers with n_c between 0.95e22 and 1.05e22 m⁻³, Δσ = 5e-27 m²,
//   background 0.05.
// - Prior 400 ppm ± 40 ppm (≈ 1.07e22 m⁻³), cross-section ± 1 %.
//
// Expect
// ------
// - Every gate converges within 1 % of its true number density.
// - Results equal per-gate sequential retrievals, in input order.
fn profile_batch_retrieval() {
    let cfg = DialConfig::default();
    let truth = [0.95e22, 1.0e22, 1.05e22, 0.98e22, 1.02e22];
    let delta_sigma = 5e-27;
    let (p_on, p_off, p_bkg) = synthetic_profile(&truth, delta_sigma, 0.05);
    let ds = vec![delta_sigma; p_on.len()];
    let gates = gate_inputs_from_powers(&cfg, &ds, &p_on, &p_off, &p_bkg, &default_priors()).unwrap();
    assert_eq!(gates.len(), truth.len());

    let opts = OEOptions::default();
    let results = retrieve_gates(&DialForwardModel, &cfg, &gates, &opts);
    assert_eq!(results.len(), gates.len());
    for (i, res) in results.iter().enumerate() {
        let res = res.as_ref().unwrap();
        assert!(res.converged(), "gate {i}: {}", res.termination());
        let n_c = res.state().get("n_c").unwrap();
        assert!((n_c / truth[i] - 1.0).abs() < 0.01, "gate {i}: {n_c:e}");
        let ppm = ppm_from_number_density(n_c, cfg.air_number_density);
        assert!(ppm > 340.0 && ppm < 400.0);

        let g = &gates[i];
        let sequential =
            retrieve(&DialForwardModel, &cfg, &g.prior, &g.prior_cov, &g.obs, &g.obs_cov, &opts);
        assert_eq!(results[i], sequential);
    }
}

#[test]
// Purpose
// -------
// One bad gate never affects its neighbours.
//
// Given
// -----
// - Three gates: valid, indefinite observation covariance, and a prior so
//   large that the forward model overflows.
//
// Expect
// ------
// - Gate 0 converged, gate 1 a configuration error, gate 2 FAILED with a
//   forward-model error.
fn batch_isolates_failing_gates() {
    let cfg = DialConfig::default();
    let (p_on, p_off, p_bkg) = synthetic_profile(&[1e22, 1e22, 1e22], 5e-27, 0.0);
    let ds = vec![5e-27; p_on.len()];
    let mut gates =
        gate_inputs_from_powers(&cfg, &ds, &p_on, &p_off, &p_bkg, &default_priors()).unwrap();
    gates[1].obs_cov = Covariance::new(gates[1].obs.names().clone(), array![[-1e-8]]).unwrap();
    gates[2].prior = DialForwardModel::state(1e30, 5e-27).unwrap();

    let results = retrieve_gates(&DialForwardModel, &cfg, &gates, &OEOptions::default());
    assert_eq!(results.len(), 3);
    assert!(results[0].as_ref().unwrap().converged());
    assert_eq!(results[1].as_ref().unwrap_err().kind(), ErrorKind::Configuration);
    let failed = results[2].as_ref().unwrap();
    assert_eq!(failed.termination(), Termination::Failed);
    assert!(matches!(failed.failure(), Some(OEError::ForwardFailed { .. })));
}

#[test]
// Purpose
// -------
// Instrument settings loaded from TOML reach the forward model.
fn toml_config_drives_forward_model() {
    let cfg = DialConfig::from_toml_str("delta_range_m = 50.0\npower_out_on = 2e3\n").unwrap();
    assert_eq!(cfg.delta_range_m, 50.0);
    assert_eq!(cfg.power_out_on, 2e3);
    assert_eq!(cfg.power_out_off, 1e3);

    let x = DialForwardModel::state(1e22, 5e-27).unwrap();
    let y = DialForwardModel.forward(&x, &cfg).unwrap();
    assert!((y[0] - 0.005_f64.exp()).abs() < 1e-12);

    assert!(matches!(
        DialConfig::from_toml_str("delta_range_m = \"far\""),
        Err(OEError::InvalidConfig { .. })
    ));
}

proptest! {
    #[test]
    fn scalar_linear_map_is_exact(
        xa in -100.0f64..100.0,
        sa in 0.1f64..100.0,
        a in 0.1f64..10.0,
        y in -100.0f64..100.0,
        sy in 0.01f64..10.0,
    ) {
        let (prior, prior_cov) = scalar("x", xa, sa);
        let (obs, obs_cov) = scalar_obs(y, sy);
        let model = FnModel(move |x: &StateVector| x.values().mapv(|v| a * v));
        let res = run(&prior, &prior_cov, &obs, &obs_cov, &model, 20, None).unwrap();

        let gain = sa * a / (a * a * sa + sy);
        let x_map = xa + gain * (y - a * xa);
        let s_map = sa - gain * a * sa;
        prop_assert!(res.converged());
        let x = res.state().values()[0];
        prop_assert!((x - x_map).abs() <= 1e-7 * (1.0 + x_map.abs()), "{} vs {}", x, x_map);
        let s = res.posterior_covariance().unwrap().matrix()[[0, 0]];
        prop_assert!((s - s_map).abs() <= 1e-7 * s_map);
    }

    #[test]
    fn runs_always_reach_a_terminal_state(
        c in 0.0f64..0.5,
        y in -5.0f64..5.0,
        max_iter in 1usize..30,
    ) {
        let (prior, prior_cov) = scalar("x", 0.0, 4.0);
        let (obs, obs_cov) = scalar_obs(y, 0.01);
        let model = FnModel(move |x: &StateVector| x.values().mapv(|v| v + c * v * v * v));
        let res = run(&prior, &prior_cov, &obs, &obs_cov, &model, max_iter, None).unwrap();
        prop_assert!(res.iterations() <= max_iter);
        prop_assert!(matches!(
            res.termination(),
            Termination::Converged | Termination::MaxIterReached | Termination::Failed
        ));
        prop_assert_eq!(res.converged(), res.termination() == Termination::Converged);
        prop_assert!(res.state().values().iter().all(|v| v.is_finite()));
    }
}
