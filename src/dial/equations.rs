//! dial::equations — closed-form DIAL relations.
//!
//! Purpose
//! -------
//! Convert received powers at the online and offline wavelengths into CO2
//! number density over one range gate, and back. These are the analytic
//! relations behind the power-ratio forward model and the first guess used
//! to seed retrievals.
//!
//! Key behaviors
//! -------------
//! - [`power_from_backscatter`]: `P = P_out · ΔR · β_att`.
//! - [`log_power_ratio`]: `ln[(P_off,above / P_on,above) · (P_on,below / P_off,below)]`.
//! - [`number_density_from_log_ratio`]: `n_c = ln R / (2 Δσ ΔR)`;
//!   [`number_density_from_powers`] chains the two for one gate pair.
//! - [`number_density_profile`]: background-subtracted profile over
//!   adjacent gates, one value per gate pair.
//! - [`ppm_from_number_density`] / [`number_density_from_ppm`].
//!
//! Conventions
//! -----------
//! - Gate `i` is "below" gate `i + 1` (closer to the instrument).
//! - Cross-sections in m², number densities in m⁻³, ranges in m.
use crate::{
    dial::config::DialConfig,
    optimization::errors::{OEError, OEResult},
};
use ndarray::Array1;

/// Received power from attenuated backscatter.
pub fn power_from_backscatter(power_out: f64, delta_range_m: f64, beta_att: f64) -> f64 {
    power_out * delta_range_m * beta_att
}

/// Log of the two-way differential power ratio over one gate.
///
/// # Errors
/// [`OEError::NonPositivePower`] if any power is not strictly positive; the
/// reported gate is 0 for the lower pair and 1 for the upper pair.
pub fn log_power_ratio(
    p_on_below: f64, p_off_below: f64, p_on_above: f64, p_off_above: f64,
) -> OEResult<f64> {
    for (gate, value) in [(0, p_on_below), (0, p_off_below), (1, p_on_above), (1, p_off_above)] {
        if !(value > 0.0) || !value.is_finite() {
            return Err(OEError::NonPositivePower { gate, value });
        }
    }
    Ok((p_off_above / p_on_above).ln() + (p_on_below / p_off_below).ln())
}

/// CO2 number density from a log power ratio.
pub fn number_density_from_log_ratio(log_ratio: f64, delta_sigma_abs: f64, delta_range_m: f64) -> f64 {
    log_ratio / (2.0 * delta_sigma_abs * delta_range_m)
}

/// CO2 number density over one gate pair from its four received powers.
pub fn number_density_from_powers(
    delta_sigma_abs: f64, delta_range_m: f64, p_on_below: f64, p_off_below: f64,
    p_on_above: f64, p_off_above: f64,
) -> OEResult<f64> {
    let log_ratio = log_power_ratio(p_on_below, p_off_below, p_on_above, p_off_above)?;
    Ok(number_density_from_log_ratio(log_ratio, delta_sigma_abs, delta_range_m))
}

/// Number density profile from raw powers with background subtraction.
///
/// Parameters
/// ----------
/// - `cfg`: instrument configuration (`delta_range_m`).
/// - `delta_sigma_abs`: differential absorption cross-section per gate.
/// - `p_on`, `p_off`: received powers per gate.
/// - `p_bkg`: background power per gate.
///
/// Returns
/// -------
/// `n_c[i]` for the layer between gates `i` and `i + 1`, length `len − 1`.
///
/// # Errors
/// - [`OEError::TooFewGates`] for fewer than two gates.
/// - [`OEError::DimensionMismatch`] if the slices differ in length.
/// - [`OEError::NonPositivePower`] if a corrected power is not positive.
pub fn number_density_profile(
    cfg: &DialConfig, delta_sigma_abs: &[f64], p_on: &[f64], p_off: &[f64], p_bkg: &[f64],
) -> OEResult<Array1<f64>> {
    let n = p_on.len();
    if n < 2 {
        return Err(OEError::TooFewGates { found: n });
    }
    for (what, len) in
        [("offline power", p_off.len()), ("background power", p_bkg.len()), ("cross-section", delta_sigma_abs.len())]
    {
        if len != n {
            return Err(OEError::DimensionMismatch { what, expected: n, found: len });
        }
    }
    let mut out = Array1::<f64>::zeros(n - 1);
    for i in 0..n - 1 {
        out[i] = number_density_from_powers(
            delta_sigma_abs[i],
            cfg.delta_range_m,
            p_on[i] - p_bkg[i],
            p_off[i] - p_bkg[i],
            p_on[i + 1] - p_bkg[i + 1],
            p_off[i + 1] - p_bkg[i + 1],
        )
        .map_err(|err| match err {
            OEError::NonPositivePower { gate, value } => {
                OEError::NonPositivePower { gate: i + gate, value }
            }
            other => other,
        })?;
    }
    Ok(out)
}

/// Number density profile from attenuated backscatter (no background).
pub fn number_density_from_backscatter(
    cfg: &DialConfig, delta_sigma_abs: &[f64], beta_on: &[f64], beta_off: &[f64],
) -> OEResult<Array1<f64>> {
    let p_on: Vec<f64> =
        beta_on.iter().map(|b| power_from_backscatter(cfg.power_out_on, cfg.delta_range_m, *b)).collect();
    let p_off: Vec<f64> =
        beta_off.iter().map(|b| power_from_backscatter(cfg.power_out_off, cfg.delta_range_m, *b)).collect();
    let p_bkg = vec![0.0; p_on.len()];
    number_density_profile(cfg, delta_sigma_abs, &p_on, &p_off, &p_bkg)
}

/// Mixing ratio (ppm) from number densities.
pub fn ppm_from_number_density(n_c: f64, n_air: f64) -> f64 {
    n_c / n_air * 1e6
}

/// Number density from a mixing ratio (ppm).
pub fn number_density_from_ppm(ppm: f64, n_air: f64) -> f64 {
    ppm * 1e-6 * n_air
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Inverting a synthetic two-gate measurement recovers the number density.
    //
    // Given
    // -----
    // - n_c = 1e22 m⁻³, Δσ = 5e-27 m², ΔR = 100 m, so the layer optical
    //   depth is 2 Δσ n_c ΔR = 0.01.
    // - Offline power constant; online power attenuated by e^{-0.01} above.
    // - Background 0.1 added to every gate.
    //
    // Expect
    // ------
    // - n_c recovered within 1e-9 relative.
    fn profile_recovers_number_density() {
        let cfg = DialConfig::default();
        let tau = 2.0 * 5e-27 * 1e22 * 100.0;
        let bkg = 0.1;
        let p_on = [1.0 + bkg, (-tau as f64).exp() + bkg];
        let p_off = [1.0 + bkg, 1.0 + bkg];
        let n = number_density_profile(&cfg, &[5e-27, 5e-27], &p_on, &p_off, &[bkg, bkg]).unwrap();
        assert_eq!(n.len(), 1);
        assert!((n[0] / 1e22 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn backscatter_path_matches_power_path() {
        let cfg = DialConfig::default();
        let beta_on = [2e-6, 1.5e-6, 1.2e-6];
        let beta_off = [2e-6, 1.6e-6, 1.4e-6];
        let ds = [5e-27; 3];
        let from_beta = number_density_from_backscatter(&cfg, &ds, &beta_on, &beta_off).unwrap();
        let p_on: Vec<f64> = beta_on.iter().map(|b| power_from_backscatter(1e3, 100.0, *b)).collect();
        let p_off: Vec<f64> = beta_off.iter().map(|b| power_from_backscatter(1e3, 100.0, *b)).collect();
        let from_power = number_density_profile(&cfg, &ds, &p_on, &p_off, &[0.0; 3]).unwrap();
        assert_eq!(from_beta.len(), 2);
        for i in 0..2 {
            assert!((from_beta[i] - from_power[i]).abs() <= 1e-12 * from_power[i].abs());
        }
    }

    #[test]
    // Purpose
    // -------
    // Power at or below background is reported with its absolute gate index.
    fn non_positive_power_reports_gate() {
        let cfg = DialConfig::default();
        let err = number_density_profile(
            &cfg,
            &[1e-27; 3],
            &[1.0, 1.0, 0.05],
            &[1.0, 1.0, 1.0],
            &[0.1, 0.1, 0.1],
        )
        .unwrap_err();
        assert!(matches!(err, OEError::NonPositivePower { gate: 2, .. }));
        assert_eq!(
            number_density_profile(&cfg, &[1.0], &[1.0], &[1.0], &[0.0]).unwrap_err(),
            OEError::TooFewGates { found: 1 }
        );
    }

    #[test]
    fn ppm_conversion_round_trips() {
        let n = number_density_from_ppm(400.0, 2.5e25);
        assert!((n - 1e22).abs() < 1e7);
        assert!((ppm_from_number_density(n, 2.5e25) - 400.0).abs() < 1e-9);
    }
}
