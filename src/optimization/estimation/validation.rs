//! Validation helpers for optimal-estimation retrievals.
//!
//! This module centralizes the consistency checks used across the engine:
//!
//! - **Option checks**: [`verify_convergence_factor`], [`verify_perturbation`].
//! - **Problem checks**: [`validate_problem`] rejects malformed priors and
//!   observations before the loop starts (`ErrorKind::Configuration`).
//! - **Covariance checks**: [`validate_covariance`] enforces symmetry and
//!   positive semidefiniteness.
//! - **Forward output**: [`validate_forward`] and [`validate_jacobian`]
//!   enforce declared shapes and finiteness inside the loop
//!   (`ErrorKind::ForwardModel`).
use crate::optimization::{
    errors::{OEError, OEResult},
    estimation::{
        state::{Covariance, ObservationVector, StateVector, VarNames},
        types::{Jacobian, ObsVec},
    },
    numerical_stability::{PSD_TOL, SYMMETRY_TOL, min_eigenvalue},
};

/// Validate the convergence factor: finite and strictly positive.
pub fn verify_convergence_factor(value: f64) -> OEResult<()> {
    if !value.is_finite() {
        return Err(OEError::InvalidConvergenceFactor { value, reason: "Factor must be finite." });
    }
    if value <= 0.0 {
        return Err(OEError::InvalidConvergenceFactor {
            value,
            reason: "Factor must be positive.",
        });
    }
    Ok(())
}

/// Validate the finite-difference perturbation fraction.
pub fn verify_perturbation(value: f64) -> OEResult<()> {
    if !value.is_finite() {
        return Err(OEError::InvalidPerturbation { value, reason: "Perturbation must be finite." });
    }
    if value <= 0.0 {
        return Err(OEError::InvalidPerturbation {
            value,
            reason: "Perturbation must be positive.",
        });
    }
    Ok(())
}

fn verify_same_names(what: &'static str, expected: &VarNames, found: &VarNames) -> OEResult<()> {
    if expected.len() != found.len() {
        return Err(OEError::DimensionMismatch {
            what,
            expected: expected.len(),
            found: found.len(),
        });
    }
    for (index, (e, f)) in expected.iter().zip(found.iter()).enumerate() {
        if e != f {
            return Err(OEError::NameMismatch {
                what,
                index,
                expected: e.to_string(),
                found: f.to_string(),
            });
        }
    }
    Ok(())
}

/// Validate that a covariance matrix is symmetric and positive semidefinite.
///
/// # Checks
/// 1. `|C_ij − C_ji| ≤ SYMMETRY_TOL · max(|C_ij|, |C_ji|, 1e-300)`.
/// 2. Diagonal entries are non-negative; a zero diagonal implies a zero row.
/// 3. The smallest eigenvalue of the equilibrated matrix is
///    ≥ `−PSD_TOL · max|λ|`.
///
/// # Errors
/// - [`OEError::NonSymmetricCovariance`] with the first offending pair.
/// - [`OEError::NotPositiveSemiDefinite`] with the offending eigenvalue
///   (or diagonal entry).
pub fn validate_covariance(what: &'static str, cov: &Covariance) -> OEResult<()> {
    let m = cov.matrix();
    let n = m.nrows();
    for i in 0..n {
        if m[[i, i]] < 0.0 {
            return Err(OEError::NotPositiveSemiDefinite { what, eigenvalue: m[[i, i]] });
        }
        if m[[i, i]] == 0.0 {
            if let Some(&off) = m.row(i).iter().find(|v| **v != 0.0) {
                return Err(OEError::NotPositiveSemiDefinite { what, eigenvalue: -off.abs() });
            }
        }
        for j in 0..i {
            let (a, b) = (m[[i, j]], m[[j, i]]);
            let scale = a.abs().max(b.abs()).max(1e-300);
            if (a - b).abs() > SYMMETRY_TOL * scale {
                return Err(OEError::NonSymmetricCovariance { what, row: i, col: j });
            }
        }
    }
    let (min, scale) = min_eigenvalue(m);
    if min < -PSD_TOL * scale {
        return Err(OEError::NotPositiveSemiDefinite { what, eigenvalue: min });
    }
    Ok(())
}

/// validate_problem — reject malformed retrieval inputs before iterating.
///
/// Checks that prior covariance names equal the prior state names, that
/// observation covariance names equal the observation names, that both
/// covariances are symmetric PSD, and that at least one state parameter has
/// a positive prior variance.
///
/// Returns
/// -------
/// Indices of the free (non-fixed) state parameters in declared order.
/// Parameters with zero prior variance are held at their prior value.
pub fn validate_problem(
    prior: &StateVector, prior_cov: &Covariance, obs: &ObservationVector, obs_cov: &Covariance,
) -> OEResult<Vec<usize>> {
    verify_same_names("prior covariance", prior.names(), prior_cov.names())?;
    verify_same_names("observation covariance", obs.names(), obs_cov.names())?;
    validate_covariance("prior covariance", prior_cov)?;
    validate_covariance("observation covariance", obs_cov)?;
    let free: Vec<usize> =
        (0..prior.len()).filter(|&i| prior_cov.matrix()[[i, i]] > 0.0).collect();
    if free.is_empty() {
        return Err(OEError::NoFreeParameters);
    }
    Ok(free)
}

/// Validate a forward-model output against the declared observation length.
///
/// # Errors
/// - [`OEError::ForwardDimMismatch`] on length mismatch.
/// - [`OEError::NonFiniteForward`] for the first NaN or ±∞ entry.
pub fn validate_forward(y: &ObsVec, m: usize) -> OEResult<()> {
    if y.len() != m {
        return Err(OEError::ForwardDimMismatch { expected: m, found: y.len() });
    }
    for (index, &value) in y.iter().enumerate() {
        if !value.is_finite() {
            return Err(OEError::NonFiniteForward { index, value });
        }
    }
    Ok(())
}

/// Validate the shape and entries of a Jacobian.
///
/// # Errors
/// - [`OEError::JacobianDimMismatch`] if the shape is not `(m, n)`.
/// - [`OEError::NonFiniteJacobian`] for the first non-finite entry.
pub fn validate_jacobian(k: &Jacobian, m: usize, n: usize) -> OEResult<()> {
    if k.dim() != (m, n) {
        return Err(OEError::JacobianDimMismatch { expected: (m, n), found: k.dim() });
    }
    for ((row, col), &value) in k.indexed_iter() {
        if !value.is_finite() {
            return Err(OEError::NonFiniteJacobian { row, col, value });
        }
    }
    Ok(())
}
