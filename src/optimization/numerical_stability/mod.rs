//! numerical_stability — guarded linear algebra for covariance arithmetic.
//!
//! Purpose
//! -------
//! Collect the matrix primitives the retrieval engine and its diagnostics
//! need: symmetric inversion with a condition-number guard, eigenvalue
//! truncated pseudo-inverses, log-determinants, and helpers that move
//! between the full state space and the subspace of free parameters.
//!
//! Key behaviors
//! -------------
//! - `invert_symmetric` equilibrates the diagonal before the eigen
//!   decomposition, so covariances mixing units (number densities next to
//!   cross-sections) are judged by their correlation structure rather than
//!   by raw magnitudes.
//! - `pseudo_inverse` never fails; it is used where a best-effort inverse
//!   is acceptable (diagnostics), never inside the update step.
//! - Tolerances (`EIGEN_EPS`, `DEFAULT_CONDITION_LIMIT`, `SYMMETRY_TOL`,
//!   `PSD_TOL`) are shared by validation and the engine.
//!
//! Conventions
//! -----------
//! - Inputs are `ndarray` matrices; `nalgebra::DMatrix` only appears
//!   inside the eigen decompositions.
//! - Nothing here logs or allocates beyond the returned matrices.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`linalg`] cover well-conditioned, singular,
//!   ill-conditioned, and mixed-unit matrices.

pub mod linalg;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::linalg::{
    DEFAULT_CONDITION_LIMIT, EIGEN_EPS, PSD_TOL, SYMMETRY_TOL, embed_block, embed_vector,
    from_dmatrix, invert_symmetric, ln_det_spd, min_eigenvalue, principal_axes, pseudo_inverse,
    select_block, symmetrize, to_dmatrix,
};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use dial_retrieval::optimization::numerical_stability::prelude::*;
//
// to import the main numerical-stability surface in a single line.

pub mod prelude {
    pub use super::linalg::{
        DEFAULT_CONDITION_LIMIT, EIGEN_EPS, invert_symmetric, pseudo_inverse, symmetrize,
    };
}
