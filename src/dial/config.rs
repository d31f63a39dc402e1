//! dial::config — instrument and physical constants for the DIAL forward model.
//!
//! Values are carried explicitly into every forward evaluation instead of
//! living in process-wide constants. Defaults describe the reference
//! instrument: 100 m range gates, on/off wavelengths of 1571.41 / 1571.25 nm,
//! and a nominal outgoing pulse power of 1e3 for both lines.
use crate::optimization::errors::{OEError, OEResult};
use serde::{Deserialize, Serialize};

/// Range resolution of one gate (m).
pub const DEFAULT_DELTA_RANGE_M: f64 = 100.0;

/// Nominal outgoing pulse power, both wavelengths.
pub const DEFAULT_POWER_OUT: f64 = 1e3;

/// Online wavelength (m).
pub const DEFAULT_LAMBDA_ON_M: f64 = 1571.41e-9;

/// Offline wavelength (m).
pub const DEFAULT_LAMBDA_OFF_M: f64 = 1571.25e-9;

/// Loschmidt number of air at standard conditions (m⁻³).
pub const LOSCHMIDT_NUMBER_AIR: f64 = 2.6867811e25;

/// DIAL instrument configuration.
///
/// Every field is optional in TOML; missing fields take their defaults.
///
/// ```rust
/// # use dial_retrieval::dial::DialConfig;
/// let cfg = DialConfig::from_toml_str("delta_range_m = 30.0")?;
/// assert_eq!(cfg.delta_range_m, 30.0);
/// assert_eq!(cfg.power_out_on, 1e3);
/// # Ok::<(), dial_retrieval::optimization::errors::OEError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DialConfig {
    /// Range resolution ΔR (m).
    pub delta_range_m: f64,
    /// Outgoing pulse power, online wavelength.
    pub power_out_on: f64,
    /// Outgoing pulse power, offline wavelength.
    pub power_out_off: f64,
    /// Online wavelength (m).
    pub lambda_on_m: f64,
    /// Offline wavelength (m).
    pub lambda_off_m: f64,
    /// Number density of air used for ppm conversion (m⁻³).
    pub air_number_density: f64,
}

impl Default for DialConfig {
    fn default() -> Self {
        Self {
            delta_range_m: DEFAULT_DELTA_RANGE_M,
            power_out_on: DEFAULT_POWER_OUT,
            power_out_off: DEFAULT_POWER_OUT,
            lambda_on_m: DEFAULT_LAMBDA_ON_M,
            lambda_off_m: DEFAULT_LAMBDA_OFF_M,
            air_number_density: LOSCHMIDT_NUMBER_AIR,
        }
    }
}

impl DialConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    /// [`OEError::InvalidConfig`] for syntax errors, unknown keys, or values
    /// rejected by [`DialConfig::validate`].
    pub fn from_toml_str(text: &str) -> OEResult<Self> {
        let cfg: DialConfig = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check that every quantity is finite and positive and that the two
    /// wavelengths differ.
    pub fn validate(&self) -> OEResult<()> {
        let fields = [
            ("delta_range_m", self.delta_range_m),
            ("power_out_on", self.power_out_on),
            ("power_out_off", self.power_out_off),
            ("lambda_on_m", self.lambda_on_m),
            ("lambda_off_m", self.lambda_off_m),
            ("air_number_density", self.air_number_density),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(OEError::InvalidConfig {
                    text: format!("{field} = {value}, must be finite and positive"),
                });
            }
        }
        if self.lambda_on_m == self.lambda_off_m {
            return Err(OEError::InvalidConfig {
                text: "online and offline wavelengths must differ".to_string(),
            });
        }
        Ok(())
    }

    /// Differential absorption cross-section `Δσ = σ(λ_on) − σ(λ_off)` (m²).
    ///
    /// `cross_section` maps a wavelength in metres to the CO2 absorption
    /// cross-section there (line database, lookup table, ...). It is called
    /// once with [`lambda_on_m`](Self::lambda_on_m) and once with
    /// [`lambda_off_m`](Self::lambda_off_m).
    ///
    /// # Errors
    /// [`OEError::NonFiniteInput`] if a returned cross-section is negative or
    /// not finite; `index` 0 is the online value, 1 the offline one.
    pub fn differential_cross_section<F>(&self, mut cross_section: F) -> OEResult<f64>
    where
        F: FnMut(f64) -> f64,
    {
        let on = cross_section(self.lambda_on_m);
        let off = cross_section(self.lambda_off_m);
        for (index, value) in [(0, on), (1, off)] {
            if !value.is_finite() || value < 0.0 {
                return Err(OEError::NonFiniteInput { what: "absorption cross-section", index, value });
            }
        }
        Ok(on - off)
    }
}
