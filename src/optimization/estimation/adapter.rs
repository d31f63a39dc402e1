//! Adapter that binds a user [`ForwardModel`] to one retrieval run.
//!
//! The adapter pairs the model with its auxiliary inputs and the declared
//! observation dimension, validates every output (length, finiteness), and
//! counts evaluations. It holds no state that influences results, so two
//! adapters over the same model produce identical outputs.
use crate::optimization::{
    errors::{OEError, OEResult},
    estimation::{
        state::StateVector,
        traits::ForwardModel,
        types::{Jacobian, ObsVec},
        validation::{validate_forward, validate_jacobian},
    },
};
use std::cell::Cell;

/// Per-run wrapper around a user forward model.
pub struct ForwardAdapter<'a, M: ForwardModel> {
    model: &'a M,
    aux: &'a M::Aux,
    m: usize,
    evals: Cell<usize>,
}

impl<'a, M: ForwardModel> ForwardAdapter<'a, M> {
    /// Bind `model` and `aux` to an observation space of dimension `m`.
    pub fn new(model: &'a M, aux: &'a M::Aux, m: usize) -> Self {
        Self { model, aux, m, evals: Cell::new(0) }
    }

    /// Evaluate `F(x)` and validate its shape and finiteness.
    ///
    /// # Errors
    /// - Any error returned by the model itself.
    /// - [`OEError::ForwardDimMismatch`] / [`OEError::NonFiniteForward`].
    pub fn evaluate(&self, x: &StateVector) -> OEResult<ObsVec> {
        self.evals.set(self.evals.get() + 1);
        let y = self.model.forward(x, self.aux)?;
        validate_forward(&y, self.m)?;
        Ok(y)
    }

    /// Analytic Jacobian, if the model provides one.
    ///
    /// Returns `Ok(None)` when the model reports
    /// [`OEError::JacobianNotImplemented`], signalling that finite
    /// differences should be used instead.
    pub fn analytic_jacobian(&self, x: &StateVector) -> OEResult<Option<Jacobian>> {
        match self.model.jacobian(x, self.aux) {
            Ok(k) => {
                validate_jacobian(&k, self.m, x.len())?;
                Ok(Some(k))
            }
            Err(OEError::JacobianNotImplemented) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Declared observation dimension.
    pub fn obs_dim(&self) -> usize {
        self.m
    }

    /// Number of forward evaluations performed so far.
    pub fn evals(&self) -> usize {
        self.evals.get()
    }
}
