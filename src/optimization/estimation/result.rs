//! estimation::result — immutable snapshots produced by a retrieval run.
//!
//! Purpose
//! -------
//! Hold everything a caller needs after the iteration loop stops: the final
//! state, its prediction, the posterior covariance, the termination reason,
//! the append-only iteration history, and the diagnostics computed at the
//! solution.
//!
//! Key behaviors
//! -------------
//! - [`IterationRecord`] captures one iteration: the iterate the forward
//!   model was evaluated at, the prediction, the residual `y − F(x_n)`, and
//!   the normalized step `d²` that left it.
//! - [`Termination`] names the four terminal states of the engine.
//! - [`RetrievalResult`] exposes read-only accessors; it is assembled once
//!   by the engine and never mutated afterwards.
//!
//! Invariants & assumptions
//! ------------------------
//! - `converged()` is `true` exactly when `termination() == Converged`.
//! - `iterations() == history().len()`.
//! - `failure()` is `Some` exactly when `termination() == Failed`; a FAILED
//!   result carries no final prediction and no diagnostics.
//! - No wall-clock quantities are stored, so two runs over identical inputs
//!   compare equal.
use crate::{
    inference::Diagnostics,
    optimization::{
        errors::OEError,
        estimation::{
            state::{Covariance, ObservationVector, StateVector},
            types::{Jacobian, ObsVec, Theta},
        },
    },
};
use std::fmt;

/// Snapshot of one completed iteration.
///
/// - `iteration`: 1-based counter.
/// - `state`: iterate `x_n` the forward model was evaluated at.
/// - `predicted`: `F(x_n)`.
/// - `residual`: `y − F(x_n)`.
/// - `d2`: normalized step `(x_{n+1} − x_n)ᵗ Ŝ⁻¹ (x_{n+1} − x_n)`.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    pub iteration: usize,
    pub state: StateVector,
    pub predicted: ObservationVector,
    pub residual: ObsVec,
    pub d2: f64,
}

/// Terminal state of a retrieval run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Termination {
    Converged,
    MaxIterReached,
    TimedOut,
    Failed,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Termination::Converged => "CONVERGED",
            Termination::MaxIterReached => "MAX_ITER_REACHED",
            Termination::TimedOut => "TIMED_OUT",
            Termination::Failed => "FAILED",
        };
        f.write_str(label)
    }
}

/// Immutable outcome of one optimal-estimation run.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalResult {
    pub(crate) state: StateVector,
    pub(crate) prior: StateVector,
    pub(crate) predicted: Option<ObservationVector>,
    pub(crate) posterior_covariance: Option<Covariance>,
    pub(crate) jacobian: Option<Jacobian>,
    pub(crate) termination: Termination,
    pub(crate) history: Vec<IterationRecord>,
    pub(crate) failure: Option<OEError>,
    pub(crate) diagnostics: Option<Diagnostics>,
    pub(crate) forward_evals: usize,
}

impl RetrievalResult {
    /// Final state: `x_{n+1}` of the last completed iteration, or the last
    /// valid iterate when the run failed mid-iteration.
    pub fn state(&self) -> &StateVector {
        &self.state
    }

    /// Prior state `x_a` the run was anchored to.
    pub fn prior(&self) -> &StateVector {
        &self.prior
    }

    /// `F(x̂)` at the final state; `None` for FAILED runs.
    pub fn predicted(&self) -> Option<&ObservationVector> {
        self.predicted.as_ref()
    }

    /// Posterior covariance `Ŝ`; rows and columns of fixed parameters are zero.
    /// `None` if no iteration completed.
    pub fn posterior_covariance(&self) -> Option<&Covariance> {
        self.posterior_covariance.as_ref()
    }

    /// Jacobian at the final state `x̂` (at the last iterate for FAILED runs),
    /// with fixed columns zeroed.
    pub fn jacobian(&self) -> Option<&Jacobian> {
        self.jacobian.as_ref()
    }

    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn iterations(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> &[IterationRecord] {
        &self.history
    }

    /// Error that ended a FAILED run.
    pub fn failure(&self) -> Option<&OEError> {
        self.failure.as_ref()
    }

    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        self.diagnostics.as_ref()
    }

    /// Total forward-model evaluations, finite differences and diagnostics included.
    pub fn forward_evals(&self) -> usize {
        self.forward_evals
    }

    /// Posterior standard deviations `sqrt(diag Ŝ)`.
    pub fn uncertainties(&self) -> Option<Theta> {
        self.posterior_covariance.as_ref().map(Covariance::std_devs)
    }
}
