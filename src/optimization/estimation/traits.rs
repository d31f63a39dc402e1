//! Public API surface for optimal-estimation retrievals.
//!
//! - [`ForwardModel`]: trait users implement for their physics.
//! - [`FnModel`]: adapter turning a plain closure into a `ForwardModel`.
//! - [`Tolerances`] and [`OEOptions`]: configuration for the engine.
//! - [`JacobianScheme`]: finite-difference scheme used when no analytic
//!   Jacobian is available.
//!
//! Convention: the forward model maps a state `x` (ordered by the prior's
//! names) to a predicted observation `F(x)` ordered by the observation
//! names. It must be a pure function of `x` and its auxiliary inputs.
use crate::optimization::{
    errors::{OEError, OEResult},
    estimation::{
        state::StateVector,
        types::{
            DEFAULT_CONVERGENCE_FACTOR, DEFAULT_MAX_ITER, DEFAULT_PERTURBATION,
            DEFAULT_SIGNIFICANCE, Jacobian, ObsVec,
        },
        validation::{verify_convergence_factor, verify_perturbation},
    },
    numerical_stability::DEFAULT_CONDITION_LIMIT,
};
use std::{str::FromStr, time::Duration};

/// User-implemented forward model interface.
///
/// - `type Aux`: fixed auxiliary inputs (physical constants, unretrieved
///   profile values) carried into every evaluation.
///
/// Required:
/// - `forward(&StateVector, &Aux) -> OEResult<ObsVec>`: evaluate `F(x)`.
///   Return a descriptive [`OEError::ForwardFailed`] for domain failures;
///   shape and finiteness are checked by the engine.
///
/// Optional:
/// - `jacobian(&StateVector, &Aux) -> OEResult<Jacobian>`: analytic
///   `∂F/∂x` of shape `(m, n)`. If not implemented, finite differences
///   scaled by the prior standard deviations are used.
pub trait ForwardModel {
    type Aux;

    // Required methods
    fn forward(&self, x: &StateVector, aux: &Self::Aux) -> OEResult<ObsVec>;

    // Optional methods
    fn jacobian(&self, _x: &StateVector, _aux: &Self::Aux) -> OEResult<Jacobian> {
        Err(OEError::JacobianNotImplemented)
    }
}

/// Closure-backed forward model without auxiliary inputs.
///
/// ```rust
/// # use dial_retrieval::optimization::estimation::{FnModel, ForwardModel, StateVector};
/// let model = FnModel(|x: &StateVector| x.values().mapv(|v| v * 1e-4));
/// let x = StateVector::from_pairs(vec![("co2_ppm", 400.0)]).unwrap();
/// let y = model.forward(&x, &()).unwrap();
/// assert!((y[0] - 0.04).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FnModel<F>(pub F);

impl<F> ForwardModel for FnModel<F>
where
    F: Fn(&StateVector) -> ObsVec,
{
    type Aux = ();

    fn forward(&self, x: &StateVector, _aux: &()) -> OEResult<ObsVec> {
        Ok((self.0)(x))
    }
}

/// Finite-difference scheme for the Jacobian.
///
/// Parsing accepts case-insensitive `"forward"` / `"central"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JacobianScheme {
    /// `(F(x + h e_i) − F(x)) / h`; reuses the unperturbed evaluation.
    #[default]
    Forward,
    /// `(F(x + h e_i) − F(x − h e_i)) / 2h`.
    Central,
}

impl FromStr for JacobianScheme {
    type Err = OEError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "forward" => Ok(JacobianScheme::Forward),
            "central" => Ok(JacobianScheme::Central),
            _ => Err(OEError::InvalidConfig {
                text: format!("unknown Jacobian scheme '{s}', expected 'forward' or 'central'"),
            }),
        }
    }
}

/// Stopping rules for the iteration loop.
///
/// - `convergence_factor`: converged when `d² < n_free / convergence_factor`.
/// - `required_consecutive`: iterations in a row that must satisfy the rule.
/// - `max_iter`: hard cap on iterations.
/// - `max_wall_time`: wall-clock budget checked once per iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub convergence_factor: f64,
    pub required_consecutive: usize,
    pub max_iter: usize,
    pub max_wall_time: Option<Duration>,
}

impl Tolerances {
    /// Construct validated tolerances.
    ///
    /// # Errors
    /// - [`OEError::InvalidConvergenceFactor`] for non-finite or non-positive factors.
    /// - [`OEError::InvalidMaxIter`] if `max_iter == 0`.
    /// - [`OEError::InvalidConsecutive`] if `required_consecutive == 0`.
    pub fn new(
        convergence_factor: f64, required_consecutive: usize, max_iter: usize,
        max_wall_time: Option<Duration>,
    ) -> OEResult<Self> {
        let tols = Self { convergence_factor, required_consecutive, max_iter, max_wall_time };
        tols.validate()?;
        Ok(tols)
    }

    pub fn validate(&self) -> OEResult<()> {
        verify_convergence_factor(self.convergence_factor)?;
        if self.max_iter == 0 {
            return Err(OEError::InvalidMaxIter {
                max_iter: self.max_iter,
                reason: "Maximum iterations must be greater than zero.",
            });
        }
        if self.required_consecutive == 0 {
            return Err(OEError::InvalidConsecutive { value: self.required_consecutive });
        }
        Ok(())
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            convergence_factor: DEFAULT_CONVERGENCE_FACTOR,
            required_consecutive: 1,
            max_iter: DEFAULT_MAX_ITER,
            max_wall_time: None,
        }
    }
}

/// Engine-level configuration.
///
/// Fields:
/// - `tols`: stopping rules.
/// - `perturbation`: finite-difference step as a fraction of the prior
///   standard deviation.
/// - `jacobian_scheme`: forward or central differences.
/// - `condition_limit`: singularity threshold for inversions.
/// - `lm_gamma`: Levenberg–Marquardt damping per iteration; the last entry
///   repeats. `None` (or zeros) gives the plain Gauss–Newton update.
/// - `max_diverging_steps`: abort into FAILED when d² grows for more than
///   this many consecutive iterations; `None` accepts oscillation up to
///   `max_iter`.
/// - `significance`: level of the chi-square fit tests.
///
/// Default:
/// - `tols`: factor 10, one consecutive iteration, 100 iterations, no time budget
/// - `perturbation`: 0.01, `jacobian_scheme`: `Forward`
/// - `condition_limit`: 1e12, `lm_gamma`: `None`
/// - `max_diverging_steps`: `None`, `significance`: 0.05
#[derive(Debug, Clone, PartialEq)]
pub struct OEOptions {
    pub tols: Tolerances,
    pub perturbation: f64,
    pub jacobian_scheme: JacobianScheme,
    pub condition_limit: f64,
    pub lm_gamma: Option<Vec<f64>>,
    pub max_diverging_steps: Option<usize>,
    pub significance: f64,
}

impl OEOptions {
    /// Create validated options.
    pub fn new(
        tols: Tolerances, perturbation: f64, jacobian_scheme: JacobianScheme,
        condition_limit: f64, lm_gamma: Option<Vec<f64>>, max_diverging_steps: Option<usize>,
        significance: f64,
    ) -> OEResult<Self> {
        let opts = Self {
            tols,
            perturbation,
            jacobian_scheme,
            condition_limit,
            lm_gamma,
            max_diverging_steps,
            significance,
        };
        opts.validate()?;
        Ok(opts)
    }

    /// Default options with a different iteration cap and time budget.
    pub fn with_limits(max_iter: usize, max_wall_time: Option<Duration>) -> OEResult<Self> {
        let tols = Tolerances { max_iter, max_wall_time, ..Tolerances::default() };
        let opts = Self { tols, ..Self::default() };
        opts.validate()?;
        Ok(opts)
    }

    /// Re-check every field; fields are public, so the engine calls this
    /// before iterating.
    pub fn validate(&self) -> OEResult<()> {
        self.tols.validate()?;
        verify_perturbation(self.perturbation)?;
        if !self.condition_limit.is_finite() || self.condition_limit <= 1.0 {
            return Err(OEError::InvalidConditionLimit { value: self.condition_limit });
        }
        if let Some(gammas) = &self.lm_gamma {
            for (index, &value) in gammas.iter().enumerate() {
                if !value.is_finite() || value < 0.0 {
                    return Err(OEError::InvalidGamma { index, value });
                }
            }
        }
        if !(self.significance > 0.0 && self.significance < 1.0) {
            return Err(OEError::InvalidSignificance { value: self.significance });
        }
        Ok(())
    }

    /// Damping for iteration `i` (0-based); zero means Gauss–Newton.
    pub fn gamma(&self, i: usize) -> f64 {
        match &self.lm_gamma {
            Some(g) if !g.is_empty() => g[i.min(g.len() - 1)],
            _ => 0.0,
        }
    }
}

impl Default for OEOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances::default(),
            perturbation: DEFAULT_PERTURBATION,
            jacobian_scheme: JacobianScheme::Forward,
            condition_limit: DEFAULT_CONDITION_LIMIT,
            lm_gamma: None,
            max_diverging_steps: None,
            significance: DEFAULT_SIGNIFICANCE,
        }
    }
}
