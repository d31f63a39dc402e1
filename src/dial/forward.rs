//! dial::forward — power-ratio forward model for one range gate.
//!
//! Purpose
//! -------
//! Predict the two-way differential power ratio of a single gate from the
//! CO2 number density and the differential absorption cross-section:
//!
//! `ratio_p = exp(2 · Δσ · n_c · ΔR)`
//!
//! where `ΔR` comes from the [`DialConfig`] passed as auxiliary input. The
//! observed counterpart is `(P_off,above / P_on,above) · (P_on,below / P_off,below)`,
//! see [`log_power_ratio`](crate::dial::equations::log_power_ratio).
//!
//! Key behaviors
//! -------------
//! - State parameters are looked up by name ([`N_C`], [`DELTA_SIGMA_ABS`]);
//!   extra state entries are allowed and have zero sensitivity.
//! - Provides the analytic Jacobian, so no finite differences are needed.
//!
//! Conventions
//! -----------
//! - SI units: `n_c` in m⁻³, `delta_sigma_abs` in m².
use crate::{
    dial::config::DialConfig,
    optimization::{
        errors::{OEError, OEResult},
        estimation::{
            state::{Covariance, ObservationVector, StateVector, VarNames},
            traits::ForwardModel,
            types::{Jacobian, ObsVec},
        },
    },
};
use ndarray::{Array1, Array2};

/// State name of the CO2 number density (m⁻³).
pub const N_C: &str = "n_c";

/// State name of the differential absorption cross-section (m²).
pub const DELTA_SIGMA_ABS: &str = "delta_sigma_abs";

/// Observation name of the differential power ratio.
pub const RATIO_P: &str = "ratio_p";

/// Forward model `ratio_p = exp(2 Δσ n_c ΔR)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DialForwardModel;

impl DialForwardModel {
    /// Two-parameter state `[n_c, delta_sigma_abs]`.
    pub fn state(n_c: f64, delta_sigma_abs: f64) -> OEResult<StateVector> {
        StateVector::from_pairs(vec![(N_C, n_c), (DELTA_SIGMA_ABS, delta_sigma_abs)])
    }

    /// Diagonal prior covariance matching [`DialForwardModel::state`].
    pub fn state_covariance(n_c_std: f64, delta_sigma_abs_std: f64) -> OEResult<Covariance> {
        let names = VarNames::new("state vector", [N_C, DELTA_SIGMA_ABS])?;
        Covariance::from_diagonal_std(names, &[n_c_std, delta_sigma_abs_std])
    }

    /// Single-element observation `[ratio_p]`.
    pub fn observation(ratio_p: f64) -> OEResult<ObservationVector> {
        ObservationVector::from_pairs(vec![(RATIO_P, ratio_p)])
    }

    /// Observation covariance for a ratio with standard deviation `ratio_std`.
    pub fn observation_covariance(ratio_std: f64) -> OEResult<Covariance> {
        let names = VarNames::new("observation vector", [RATIO_P])?;
        Covariance::from_diagonal_std(names, &[ratio_std])
    }

    /// Noise-free ratio for the given physical values.
    pub fn ratio(n_c: f64, delta_sigma_abs: f64, delta_range_m: f64) -> f64 {
        (2.0 * delta_sigma_abs * n_c * delta_range_m).exp()
    }
}

fn lookup(x: &StateVector, name: &str) -> OEResult<f64> {
    x.get(name).ok_or_else(|| OEError::UnknownName { name: name.to_string() })
}

impl ForwardModel for DialForwardModel {
    type Aux = DialConfig;

    fn forward(&self, x: &StateVector, aux: &DialConfig) -> OEResult<ObsVec> {
        let n_c = lookup(x, N_C)?;
        let delta_sigma = lookup(x, DELTA_SIGMA_ABS)?;
        let ratio = Self::ratio(n_c, delta_sigma, aux.delta_range_m);
        if !ratio.is_finite() {
            return Err(OEError::ForwardFailed {
                text: format!("ratio_p overflows for n_c = {n_c:e}, delta_sigma_abs = {delta_sigma:e}"),
            });
        }
        Ok(Array1::from(vec![ratio]))
    }

    fn jacobian(&self, x: &StateVector, aux: &DialConfig) -> OEResult<Jacobian> {
        let n_c = lookup(x, N_C)?;
        let delta_sigma = lookup(x, DELTA_SIGMA_ABS)?;
        let dr = aux.delta_range_m;
        let ratio = Self::ratio(n_c, delta_sigma, dr);
        let mut k = Array2::<f64>::zeros((1, x.len()));
        for (j, name) in x.names().iter().enumerate() {
            k[[0, j]] = match name {
                N_C => 2.0 * delta_sigma * dr * ratio,
                DELTA_SIGMA_ABS => 2.0 * n_c * dr * ratio,
                _ => 0.0,
            };
        }
        Ok(k)
    }
}
