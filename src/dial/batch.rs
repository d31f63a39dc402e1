//! dial::batch — independent retrievals over many range gates.
//!
//! Purpose
//! -------
//! Run one optimal-estimation retrieval per range gate and collect the
//! results in input order. Gates share no state, so they are dispatched
//! with `rayon` and a failing gate never affects its neighbours.
//!
//! Key behaviors
//! -------------
//! - [`gate_inputs_from_powers`] turns a received-power profile into
//!   per-gate [`GateInput`]s for the [`DialForwardModel`](crate::dial::DialForwardModel):
//!   observed `ratio_p`, a prior from a reference mixing ratio, and
//!   diagonal covariances.
//! - [`retrieve_gates`] runs [`retrieve`] on every gate in parallel.
//!
//! Invariants & assumptions
//! ------------------------
//! - `output[i]` belongs to `gates[i]`.
//! - Each entry is its own `OEResult`: configuration errors and FAILED runs
//!   stay local to their gate.
use crate::{
    dial::{
        config::DialConfig,
        equations::{log_power_ratio, number_density_from_ppm},
        forward::DialForwardModel,
    },
    optimization::{
        errors::{OEError, OEResult},
        estimation::{
            api::retrieve,
            result::RetrievalResult,
            state::{Covariance, ObservationVector, StateVector},
            traits::{ForwardModel, OEOptions},
        },
    },
};
use rayon::prelude::*;
use tracing::debug;

/// Inputs of a single gate retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct GateInput {
    pub prior: StateVector,
    pub prior_cov: Covariance,
    pub obs: ObservationVector,
    pub obs_cov: Covariance,
}

/// Prior knowledge shared by every gate of a profile.
///
/// - `co2_ppm`, `co2_ppm_std`: reference mixing ratio and its uncertainty.
/// - `delta_sigma_rel_std`: relative uncertainty of the cross-section.
/// - `ratio_std`: standard deviation of the observed power ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatePriors {
    pub co2_ppm: f64,
    pub co2_ppm_std: f64,
    pub delta_sigma_rel_std: f64,
    pub ratio_std: f64,
}

/// Build one [`GateInput`] per adjacent gate pair of a power profile.
///
/// # Errors
/// - [`OEError::TooFewGates`] / [`OEError::DimensionMismatch`] for malformed
///   profiles.
/// - [`OEError::NonPositivePower`] with the absolute gate index if a
///   background-corrected power is not positive.
pub fn gate_inputs_from_powers(
    cfg: &DialConfig, delta_sigma_abs: &[f64], p_on: &[f64], p_off: &[f64], p_bkg: &[f64],
    priors: &GatePriors,
) -> OEResult<Vec<GateInput>> {
    let n = p_on.len();
    if n < 2 {
        return Err(OEError::TooFewGates { found: n });
    }
    for (what, len) in
        [("offline power", p_off.len()), ("background power", p_bkg.len()), ("cross-section", delta_sigma_abs.len())]
    {
        if len != n {
            return Err(OEError::DimensionMismatch { what, expected: n, found: len });
        }
    }
    let n_c = number_density_from_ppm(priors.co2_ppm, cfg.air_number_density);
    let n_c_std = number_density_from_ppm(priors.co2_ppm_std, cfg.air_number_density);

    (0..n - 1)
        .map(|i| {
            let log_ratio = log_power_ratio(
                p_on[i] - p_bkg[i],
                p_off[i] - p_bkg[i],
                p_on[i + 1] - p_bkg[i + 1],
                p_off[i + 1] - p_bkg[i + 1],
            )
            .map_err(|err| match err {
                OEError::NonPositivePower { gate, value } => {
                    OEError::NonPositivePower { gate: i + gate, value }
                }
                other => other,
            })?;
            let ds = delta_sigma_abs[i];
            Ok(GateInput {
                prior: DialForwardModel::state(n_c, ds)?,
                prior_cov: DialForwardModel::state_covariance(
                    n_c_std,
                    priors.delta_sigma_rel_std * ds.abs(),
                )?,
                obs: DialForwardModel::observation(log_ratio.exp())?,
                obs_cov: DialForwardModel::observation_covariance(priors.ratio_std)?,
            })
        })
        .collect()
}

/// Retrieve every gate in parallel; `output[i]` corresponds to `gates[i]`.
pub fn retrieve_gates<M>(
    model: &M, aux: &M::Aux, gates: &[GateInput], opts: &OEOptions,
) -> Vec<OEResult<RetrievalResult>>
where
    M: ForwardModel + Sync,
    M::Aux: Sync,
{
    gates
        .par_iter()
        .enumerate()
        .map(|(gate, input)| {
            let res = retrieve(
                model,
                aux,
                &input.prior,
                &input.prior_cov,
                &input.obs,
                &input.obs_cov,
                opts,
            );
            match &res {
                Ok(r) => debug!(gate, termination = %r.termination(), iterations = r.iterations(), "gate retrieved"),
                Err(e) => debug!(gate, error = %e, "gate rejected"),
            }
            res
        })
        .collect()
}
