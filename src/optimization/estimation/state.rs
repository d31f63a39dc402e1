//! estimation::state — named, ordered vectors and covariances.
//!
//! Purpose
//! -------
//! Give every vector and matrix in a retrieval an explicit, shared ordering
//! of names so that state values, Jacobian columns, and covariance indices
//! can never silently drift apart.
//!
//! Key behaviors
//! -------------
//! - [`VarNames`] validates a non-empty list of unique names and is cheap to
//!   clone (`Arc<[String]>`).
//! - [`StateVector`] / [`ObservationVector`] pair a `VarNames` with values of
//!   the same length and reject non-finite entries.
//! - [`Covariance`] pairs a `VarNames` with a square matrix; structural
//!   checks (symmetry, positive semidefiniteness) live in
//!   `estimation::validation` so that construction stays cheap.
//!
//! Invariants & assumptions
//! ------------------------
//! - `names.len() == values.len()` for vectors and
//!   `names.len() == matrix.nrows() == matrix.ncols()` for covariances.
//! - Values are finite once construction succeeds.
use crate::optimization::{
    errors::{OEError, OEResult},
    estimation::types::{CovMatrix, ObsVec, Theta},
};
use ndarray::Array2;
use std::{collections::HashSet, sync::Arc};

/// Ordered, unique variable names shared across vectors and matrices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarNames(Arc<[String]>);

impl VarNames {
    /// Build a validated name list.
    ///
    /// # Errors
    /// - [`OEError::EmptyNames`] for an empty list.
    /// - [`OEError::DuplicateName`] for the first repeated name.
    pub fn new<I, S>(what: &'static str, names: I) -> OEResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(OEError::EmptyNames { what });
        }
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(OEError::DuplicateName { what, name: name.clone() });
            }
        }
        Ok(Self(names.into()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Position of `name`, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

fn check_finite(what: &'static str, values: &Theta) -> OEResult<()> {
    for (index, &value) in values.iter().enumerate() {
        if !value.is_finite() {
            return Err(OEError::NonFiniteInput { what, index, value });
        }
    }
    Ok(())
}

/// Named state values (CO2 concentration, cross-section, temperature, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct StateVector {
    names: VarNames,
    values: Theta,
}

impl StateVector {
    /// # Errors
    /// - [`OEError::DimensionMismatch`] if `values.len() != names.len()`.
    /// - [`OEError::NonFiniteInput`] for any NaN or ±∞ value.
    pub fn new(names: VarNames, values: Theta) -> OEResult<Self> {
        if names.len() != values.len() {
            return Err(OEError::DimensionMismatch {
                what: "state vector",
                expected: names.len(),
                found: values.len(),
            });
        }
        check_finite("state vector", &values)?;
        Ok(Self { names, values })
    }

    /// Build from `(name, value)` pairs in order.
    pub fn from_pairs<S: Into<String>>(pairs: Vec<(S, f64)>) -> OEResult<Self> {
        let (names, values): (Vec<String>, Vec<f64>) =
            pairs.into_iter().map(|(n, v)| (n.into(), v)).unzip();
        Self::new(VarNames::new("state vector", names)?, Theta::from(values))
    }

    /// Same names, new values. Used internally for iterates, so no
    /// finiteness check is repeated here.
    pub(crate) fn with_values(&self, values: Theta) -> Self {
        Self { names: self.names.clone(), values }
    }

    pub fn names(&self) -> &VarNames {
        &self.names
    }

    pub fn values(&self) -> &Theta {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of parameter `name`.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names.index_of(name).map(|i| self.values[i])
    }
}

/// Named measured quantities; immutable input to a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationVector {
    names: VarNames,
    values: ObsVec,
}

impl ObservationVector {
    /// # Errors
    /// Same rules as [`StateVector::new`].
    pub fn new(names: VarNames, values: ObsVec) -> OEResult<Self> {
        if names.len() != values.len() {
            return Err(OEError::DimensionMismatch {
                what: "observation vector",
                expected: names.len(),
                found: values.len(),
            });
        }
        check_finite("observation vector", &values)?;
        Ok(Self { names, values })
    }

    pub fn from_pairs<S: Into<String>>(pairs: Vec<(S, f64)>) -> OEResult<Self> {
        let (names, values): (Vec<String>, Vec<f64>) =
            pairs.into_iter().map(|(n, v)| (n.into(), v)).unzip();
        Self::new(VarNames::new("observation vector", names)?, ObsVec::from(values))
    }

    pub(crate) fn with_values(&self, values: ObsVec) -> Self {
        Self { names: self.names.clone(), values }
    }

    pub fn names(&self) -> &VarNames {
        &self.names
    }

    pub fn values(&self) -> &ObsVec {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names.index_of(name).map(|i| self.values[i])
    }
}

/// Covariance matrix indexed by names.
#[derive(Debug, Clone, PartialEq)]
pub struct Covariance {
    names: VarNames,
    matrix: CovMatrix,
}

impl Covariance {
    /// # Errors
    /// - [`OEError::NonSquareCovariance`] for a non-square matrix.
    /// - [`OEError::DimensionMismatch`] if the size differs from `names.len()`.
    /// - [`OEError::NonFiniteInput`] for NaN or ±∞ entries (index is row-major).
    pub fn new(names: VarNames, matrix: CovMatrix) -> OEResult<Self> {
        let (rows, cols) = matrix.dim();
        if rows != cols {
            return Err(OEError::NonSquareCovariance { what: "covariance", rows, cols });
        }
        if rows != names.len() {
            return Err(OEError::DimensionMismatch {
                what: "covariance",
                expected: names.len(),
                found: rows,
            });
        }
        for (index, &value) in matrix.iter().enumerate() {
            if !value.is_finite() {
                return Err(OEError::NonFiniteInput { what: "covariance", index, value });
            }
        }
        Ok(Self { names, matrix })
    }

    /// Diagonal covariance from standard deviations (variances = std²).
    pub fn from_diagonal_std(names: VarNames, std: &[f64]) -> OEResult<Self> {
        if std.len() != names.len() {
            return Err(OEError::DimensionMismatch {
                what: "covariance",
                expected: names.len(),
                found: std.len(),
            });
        }
        let mut matrix = Array2::<f64>::zeros((std.len(), std.len()));
        for (i, s) in std.iter().enumerate() {
            matrix[[i, i]] = s * s;
        }
        Self::new(names, matrix)
    }

    pub(crate) fn from_parts_unchecked(names: VarNames, matrix: CovMatrix) -> Self {
        Self { names, matrix }
    }

    pub fn names(&self) -> &VarNames {
        &self.names
    }

    pub fn matrix(&self) -> &CovMatrix {
        &self.matrix
    }

    pub fn dim(&self) -> usize {
        self.names.len()
    }

    /// Variance of `name`.
    pub fn variance(&self, name: &str) -> Option<f64> {
        self.names.index_of(name).map(|i| self.matrix[[i, i]])
    }

    /// Square roots of the diagonal; negative rounding noise clamps to zero.
    pub fn std_devs(&self) -> Theta {
        self.matrix.diag().mapv(|v| v.max(0.0).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Duplicate and empty name lists are rejected.
    fn var_names_validation() {
        assert!(matches!(
            VarNames::new("state", Vec::<String>::new()),
            Err(OEError::EmptyNames { .. })
        ));
        let err = VarNames::new("state", ["a", "b", "a"]).unwrap_err();
        assert_eq!(err, OEError::DuplicateName { what: "state", name: "a".into() });
    }

    #[test]
    // Purpose
    // -------
    // Name lookup follows declaration order.
    fn state_vector_lookup_by_name() {
        let x = StateVector::from_pairs(vec![("co2_ppm", 400.0), ("delta_sigma", 0.05)]).unwrap();
        assert_eq!(x.get("co2_ppm"), Some(400.0));
        assert_eq!(x.get("delta_sigma"), Some(0.05));
        assert_eq!(x.get("temperature"), None);
        assert_eq!(x.names().index_of("delta_sigma"), Some(1));
    }

    #[test]
    fn vectors_reject_bad_lengths_and_nan() {
        let names = VarNames::new("state", ["a", "b"]).unwrap();
        assert!(matches!(
            StateVector::new(names.clone(), array![1.0]),
            Err(OEError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            ObservationVector::new(names, array![1.0, f64::NAN]),
            Err(OEError::NonFiniteInput { index: 1, .. })
        ));
    }

    #[test]
    fn covariance_shape_checks_and_diagonal_builder() {
        let names = VarNames::new("state", ["a", "b"]).unwrap();
        assert!(matches!(
            Covariance::new(names.clone(), Array2::zeros((2, 3))),
            Err(OEError::NonSquareCovariance { .. })
        ));
        assert!(matches!(
            Covariance::new(names.clone(), Array2::zeros((3, 3))),
            Err(OEError::DimensionMismatch { .. })
        ));
        let cov = Covariance::from_diagonal_std(names, &[2.0, 0.1]).unwrap();
        assert_eq!(cov.variance("a"), Some(4.0));
        assert!((cov.std_devs()[1] - 0.1).abs() < 1e-15);
        assert_eq!(cov.matrix()[[0, 1]], 0.0);
    }
}
