//! Dense symmetric linear algebra for covariance arithmetic.
//!
//! Public vectors and matrices are `ndarray` containers; eigendecompositions
//! run on `nalgebra::DMatrix` after a column-major copy. Inversion never forms
//! an LU factorization: symmetric matrices are diagonally equilibrated,
//! decomposed as `Q Λ Qᵀ`, and the condition number `max|λ| / min λ` of the
//! equilibrated matrix decides whether the inverse is trusted.
//!
//! # Provided items
//! - [`EIGEN_EPS`]: relative eigenvalue floor for pseudo-inverses.
//! - [`DEFAULT_CONDITION_LIMIT`]: default singularity threshold (1e12).
//! - [`invert_symmetric`]: guarded inverse, failing with
//!   [`OEError::SingularMatrix`].
//! - [`pseudo_inverse`]: generalized inverse with eigenvalue truncation.
//! - [`symmetrize`], [`min_eigenvalue`], [`ln_det_spd`].
//! - [`select_block`], [`embed_block`], [`embed_vector`]: moves between the
//!   full state space and the subspace of free parameters.
use crate::optimization::errors::{OEError, OEResult};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2, Axis};

/// Relative eigenvalue floor: eigenvalues at or below `EIGEN_EPS * max|λ|`
/// are treated as zero by [`pseudo_inverse`].
pub const EIGEN_EPS: f64 = 1e-12;

/// Default condition-number limit above which a matrix is considered singular.
pub const DEFAULT_CONDITION_LIMIT: f64 = 1e12;

/// Relative tolerance used when checking symmetry of user inputs.
pub const SYMMETRY_TOL: f64 = 1e-9;

/// Relative tolerance for negative eigenvalues accepted as rounding noise in
/// positive-semidefinite checks.
pub const PSD_TOL: f64 = 1e-10;

/// Copy a square `ndarray` matrix into a `nalgebra::DMatrix`.
///
/// The copy proceeds column by column, matching `DMatrix` storage. No
/// symmetrization is performed.
pub fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    let (rows, cols) = a.dim();
    let mut out = DMatrix::<f64>::zeros(rows, cols);
    for j in 0..cols {
        for i in 0..rows {
            out[(i, j)] = a[[i, j]];
        }
    }
    out
}

/// Copy a `nalgebra::DMatrix` back into an `ndarray` matrix.
pub fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// Replace each off-diagonal pair with its average, in place.
///
/// The diagonal is left untouched; the caller guarantees a square matrix.
pub fn symmetrize(a: &mut Array2<f64>) {
    for i in 0..a.nrows() {
        for j in 0..i {
            let avg = 0.5 * (a[[i, j]] + a[[j, i]]);
            a[[i, j]] = avg;
            a[[j, i]] = avg;
        }
    }
}

/// Smallest eigenvalue of the diagonally equilibrated matrix, together with
/// its largest eigenvalue magnitude (used to scale tolerances).
///
/// Rows with a zero diagonal are zeroed by the scaling; callers check those
/// separately.
pub fn min_eigenvalue(a: &Array2<f64>) -> (f64, f64) {
    let (b, _) = equilibrate(a);
    let eigen = to_dmatrix(&b).symmetric_eigen();
    let min = eigen.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
    let scale = eigen.eigenvalues.iter().fold(0.0_f64, |acc, l| acc.max(l.abs()));
    (min, scale)
}

/// Jacobi scaling of a symmetric matrix: returns `(B, d⁺)` with
/// `B = D⁺ A D⁺`, `D⁺ = diag(1/√a_ii)` for positive diagonals and zero
/// otherwise. Inversions run on `B` so that parameters with wildly different
/// units (number densities vs. cross-sections) do not masquerade as
/// ill-conditioning.
fn equilibrate(a: &Array2<f64>) -> (Array2<f64>, Vec<f64>) {
    let mut sym = a.clone();
    symmetrize(&mut sym);
    let d_inv: Vec<f64> =
        sym.diag().iter().map(|&v| if v > 0.0 { 1.0 / v.sqrt() } else { 0.0 }).collect();
    let n = sym.nrows();
    for i in 0..n {
        for j in 0..n {
            sym[[i, j]] *= d_inv[i] * d_inv[j];
        }
    }
    (sym, d_inv)
}

/// Undo [`equilibrate`] on an inverse: `A⁻¹ = D⁺ B⁻¹ D⁺`.
fn unscale(b_inv: &mut Array2<f64>, d_inv: &[f64]) {
    let n = b_inv.nrows();
    for i in 0..n {
        for j in 0..n {
            b_inv[[i, j]] *= d_inv[i] * d_inv[j];
        }
    }
}

/// invert_symmetric — guarded inverse of a symmetric positive-definite matrix.
///
/// Parameters
/// ----------
/// - `a`: symmetric `n×n` matrix. Only its symmetric part is used.
/// - `condition_limit`: largest acceptable condition number of the
///   diagonally equilibrated matrix.
/// - `context`: short label reported in [`OEError::SingularMatrix`].
///
/// Returns
/// -------
/// `A⁻¹ = D⁻¹ (Q Λ⁻¹ Qᵀ) D⁻¹` where `D⁻¹ A D⁻¹ = Q Λ Qᵀ`, symmetric.
///
/// Errors
/// ------
/// - [`OEError::SingularMatrix`] when a diagonal entry or the smallest
///   eigenvalue is not strictly positive (condition reported as `+∞`), or
///   when `max λ / min λ` exceeds `condition_limit`.
pub fn invert_symmetric(
    a: &Array2<f64>, condition_limit: f64, context: &'static str,
) -> OEResult<Array2<f64>> {
    let n = a.nrows();
    if a.diag().iter().any(|&v| !(v > 0.0) || !v.is_finite()) {
        return Err(OEError::SingularMatrix { context, condition: f64::INFINITY });
    }
    let (b, d_inv) = equilibrate(a);
    let eigen = to_dmatrix(&b).symmetric_eigen();
    let lambdas = &eigen.eigenvalues;
    let max_abs = lambdas.iter().fold(0.0_f64, |acc, l| acc.max(l.abs()));
    let min = lambdas.iter().copied().fold(f64::INFINITY, f64::min);
    if !(min > 0.0) || !max_abs.is_finite() {
        return Err(OEError::SingularMatrix { context, condition: f64::INFINITY });
    }
    let condition = max_abs / min;
    if condition > condition_limit {
        return Err(OEError::SingularMatrix { context, condition });
    }
    let q = &eigen.eigenvectors;
    let mut inv = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let v: f64 = (0..n).map(|k| q[(i, k)] * q[(j, k)] / lambdas[k]).sum();
            inv[[i, j]] = v;
            inv[[j, i]] = v;
        }
    }
    unscale(&mut inv, &d_inv);
    Ok(inv)
}

/// pseudo_inverse — generalized inverse of a symmetric PSD matrix.
///
/// The matrix is equilibrated first; eigenvalues of the scaled matrix at or
/// below `EIGEN_EPS * max|λ|` are dropped, and rows/columns with a zero
/// diagonal map to zero. Never fails.
pub fn pseudo_inverse(a: &Array2<f64>) -> Array2<f64> {
    let n = a.nrows();
    let (b, d_inv) = equilibrate(a);
    let eigen = to_dmatrix(&b).symmetric_eigen();
    let lambdas = &eigen.eigenvalues;
    let max_abs = lambdas.iter().fold(0.0_f64, |acc, l| acc.max(l.abs()));
    let cutoff = EIGEN_EPS * max_abs;
    let q = &eigen.eigenvectors;
    let mut inv = Array2::<f64>::zeros((n, n));
    for (k, &lambda) in lambdas.iter().enumerate() {
        if lambda.abs() <= cutoff {
            continue;
        }
        for i in 0..n {
            let coeff = q[(i, k)] / lambda;
            for j in 0..n {
                inv[[i, j]] += coeff * q[(j, k)];
            }
        }
    }
    unscale(&mut inv, &d_inv);
    symmetrize(&mut inv);
    inv
}

/// One-sigma principal axes of a covariance, in the units of `a`.
///
/// With `B = D⁺ A D⁺ = Q Λ Qᵗ` the equilibrated matrix, returns the columns
/// of `D Q √Λ` for every positive eigenvalue. Their outer products sum to
/// `A`, so each column is a one-sigma displacement of the distribution.
pub fn principal_axes(a: &Array2<f64>) -> Vec<Array1<f64>> {
    let n = a.nrows();
    let (b, d_inv) = equilibrate(a);
    let eigen = to_dmatrix(&b).symmetric_eigen();
    let scale: Vec<f64> = d_inv.iter().map(|&d| if d > 0.0 { 1.0 / d } else { 0.0 }).collect();
    eigen
        .eigenvalues
        .iter()
        .enumerate()
        .filter(|(_, lambda)| **lambda > 0.0)
        .map(|(k, lambda)| {
            let root = lambda.sqrt();
            Array1::from_shape_fn(n, |i| scale[i] * root * eigen.eigenvectors[(i, k)])
        })
        .collect()
}

/// Natural log of the determinant of a symmetric positive-definite matrix,
/// computed as `ln det B + Σ ln a_ii` on the equilibrated matrix.
///
/// # Errors
/// [`OEError::SingularMatrix`] if any diagonal entry or eigenvalue is
/// non-positive.
pub fn ln_det_spd(a: &Array2<f64>, context: &'static str) -> OEResult<f64> {
    if a.diag().iter().any(|&v| !(v > 0.0)) {
        return Err(OEError::SingularMatrix { context, condition: f64::INFINITY });
    }
    let (b, _) = equilibrate(a);
    let eigen = to_dmatrix(&b).symmetric_eigen();
    let mut acc: f64 = a.diag().iter().map(|v| v.ln()).sum();
    for &lambda in eigen.eigenvalues.iter() {
        if !(lambda > 0.0) {
            return Err(OEError::SingularMatrix { context, condition: f64::INFINITY });
        }
        acc += lambda.ln();
    }
    Ok(acc)
}

/// Principal submatrix `a[idx, idx]`.
pub fn select_block(a: &Array2<f64>, idx: &[usize]) -> Array2<f64> {
    a.select(Axis(0), idx).select(Axis(1), idx)
}

/// Place `block` at rows/columns `idx` of an `n×n` zero matrix.
pub fn embed_block(block: &Array2<f64>, idx: &[usize], n: usize) -> Array2<f64> {
    let mut out = Array2::<f64>::zeros((n, n));
    for (bi, &i) in idx.iter().enumerate() {
        for (bj, &j) in idx.iter().enumerate() {
            out[[i, j]] = block[[bi, bj]];
        }
    }
    out
}

/// Place `v` at positions `idx` of a length-`n` zero vector.
pub fn embed_vector(v: &Array1<f64>, idx: &[usize], n: usize) -> Array1<f64> {
    let mut out = Array1::<f64>::zeros(n);
    for (k, &i) in idx.iter().enumerate() {
        out[i] = v[k];
    }
    out
}
