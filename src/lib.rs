//! dial_retrieval — optimal-estimation retrieval of CO2 from differential
//! absorption lidar (DIAL) measurements.
//!
//! Purpose
//! -------
//! Serve as the crate root. The crate estimates atmospheric state parameters
//! (CO2 number density, absorption cross-section, ...) from noisy lidar
//! observations by Bayesian maximum-a-posteriori inversion, and reports the
//! posterior uncertainty and the diagnostics needed to judge each retrieval.
//!
//! Key behaviors
//! -------------
//! - `optimization`: the iterative Gauss–Newton / Levenberg–Marquardt
//!   engine (`optimization::estimation::retrieve`), guarded covariance
//!   linear algebra, and the `OEError` surface.
//! - `inference`: averaging kernel, degrees of freedom for signal,
//!   information content, χ² tests, and linearity checks.
//! - `dial`: instrument configuration, closed-form DIAL equations, the
//!   power-ratio forward model, and the parallel per-gate batch driver.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every vector and covariance carries its variable names; orderings are
//!   checked, never assumed.
//! - Retrievals are deterministic: the same inputs give the same result.
//!
//! Conventions
//! -----------
//! - Configuration errors are returned as `Err(OEError)` before iterating;
//!   failures during iteration are recorded in a FAILED result.
//! - Logging goes through `tracing`; subscribers are installed by the
//!   application, never by this crate.
//!
//! Downstream usage
//! ----------------
//! - Generic retrievals: `use dial_retrieval::optimization::prelude::*;`
//!   and implement `ForwardModel`.
//! - Lidar profiles: `use dial_retrieval::dial::prelude::*;`.
//!
//! Testing notes
//! -------------
//! - Unit tests live beside each module; end-to-end properties are in
//!   `tests/integration_dial_retrieval.rs`.

pub mod dial;
pub mod inference;
pub mod optimization;
