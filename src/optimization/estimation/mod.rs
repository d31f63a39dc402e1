//! estimation — Bayesian optimal-estimation retrievals (Rodgers form).
//!
//! Purpose
//! -------
//! Provide the nonlinear maximum-a-posteriori inversion at the heart of the
//! DIAL retrieval: combine a prior state and covariance with noisy
//! observations through a user-supplied forward model and its Jacobian,
//! iterating Gauss–Newton (optionally Levenberg–Marquardt damped) updates
//! until the normalized step is small enough.
//!
//! Key behaviors
//! -------------
//! - Callers implement [`ForwardModel`] (or wrap a closure in [`FnModel`])
//!   and call [`retrieve`] / [`run`](fn@run).
//! - Inputs are validated up front ([`validation`]); malformed covariances
//!   or misaligned names are rejected before any forward evaluation.
//! - The engine ([`run`](self::run::run_retrieval)) walks the state machine
//!   INITIALIZED → ITERATING → {CONVERGED, MAX_ITER_REACHED, TIMED_OUT,
//!   FAILED} and returns an immutable [`RetrievalResult`] with the full
//!   iteration history and diagnostics.
//! - Jacobians come from the model when it implements one, otherwise from
//!   finite differences scaled by the prior standard deviations
//!   ([`jacobian`]).
//!
//! Invariants & assumptions
//! ------------------------
//! - State values, Jacobian columns, and covariance indices share one
//!   ordering ([`VarNames`]); names are checked, not just lengths.
//! - Parameters with zero prior variance are held at their prior value and
//!   their Jacobian columns are zero.
//! - Forward models are pure functions of the state and their auxiliary
//!   inputs; the engine has no randomness, so identical inputs give
//!   identical results.
//!
//! Conventions
//! -----------
//! - `Sa` / `Sy` denote prior and observation covariances, `Ŝ` the
//!   posterior covariance, `K` the Jacobian `∂F/∂x` of shape `(m, n)`.
//! - Configuration errors are returned as `Err`; in-loop failures are
//!   recorded inside a FAILED result so batch callers can keep going.
//! - Progress is reported through `tracing` events (`debug` per iteration,
//!   `info`/`warn` at termination); installing a subscriber is up to the
//!   caller.
//!
//! Downstream usage
//! ----------------
//! - The DIAL layer implements [`ForwardModel`] for its power-ratio model
//!   and dispatches one [`retrieve`] per range gate.
//! - Most callers only need the [`prelude`].
//!
//! Testing notes
//! -------------
//! - Unit tests in the submodules cover validation, finite differences,
//!   adapter checks, and the engine on scalar problems with closed-form
//!   answers.
//! - Integration tests under `tests/` cover end-to-end properties:
//!   termination, idempotence, posterior symmetry, fixed parameters,
//!   failure handling, and damping.

pub mod adapter;
pub mod api;
pub mod jacobian;
pub mod result;
pub mod run;
pub mod state;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::{retrieve, run};
pub use self::result::{IterationRecord, RetrievalResult, Termination};
pub use self::state::{Covariance, ObservationVector, StateVector, VarNames};
pub use self::traits::{FnModel, ForwardModel, JacobianScheme, OEOptions, Tolerances};
pub use self::types::{
    CovMatrix, DEFAULT_CONVERGENCE_FACTOR, DEFAULT_MAX_ITER, DEFAULT_PERTURBATION,
    DEFAULT_SIGNIFICANCE, Jacobian, ObsVec, Theta,
};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use dial_retrieval::optimization::estimation::prelude::*;
//
// to import the main retrieval surface in a single line.

pub mod prelude {
    pub use super::api::{retrieve, run};
    pub use super::result::{RetrievalResult, Termination};
    pub use super::state::{Covariance, ObservationVector, StateVector, VarNames};
    pub use super::traits::{FnModel, ForwardModel, OEOptions, Tolerances};
}
