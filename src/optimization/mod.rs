//! optimization — optimal-estimation engine, linear algebra, and error surface.
//!
//! Purpose
//! -------
//! Provide the numerical core of the retrieval: the iterative Bayesian
//! inversion (`estimation`), the guarded covariance arithmetic it relies on
//! (`numerical_stability`), and a single error/result surface (`errors`).
//!
//! Key behaviors
//! -------------
//! - Expose `estimation::retrieve` / `estimation::run` for maximum-a-posteriori
//!   retrievals with posterior covariance and iteration history.
//! - Supply symmetric inversion, pseudo-inverses, and log-determinants that
//!   report numerical singularity as `OEError::SingularMatrix` instead of
//!   producing garbage.
//! - Normalize configuration, forward-model, and numerical failures into
//!   `errors::OEError` with the alias `OEResult<T>`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are finite once validation has passed; invalid states are
//!   reported as `OEError`, not panics.
//! - Covariances are symmetric positive semidefinite; parameters with zero
//!   variance are treated as fixed.
//!
//! Conventions
//! -----------
//! - Vectors and matrices are `ndarray` containers over `f64`.
//! - Only the engine logs (via `tracing`); linear-algebra helpers are pure.
//!
//! Downstream usage
//! ----------------
//! - The `dial` layer builds forward models and batches on top of
//!   `estimation`; `inference` consumes the engine's matrices to produce
//!   diagnostics.
//! - Front-ends typically import `optimization::prelude::*`.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each submodule; end-to-end behavior is covered
//!   in `tests/integration_dial_retrieval.rs`.

pub mod errors;
pub mod estimation;
pub mod numerical_stability;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use dial_retrieval::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::errors::{ErrorKind, OEError, OEResult};
    pub use super::estimation::prelude::*;
    pub use super::numerical_stability::prelude::*;
}
