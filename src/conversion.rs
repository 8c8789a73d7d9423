/// Raw CloudWatcher codes to physical units
use crate::error::{CloudWatcherError, Result};
use crate::utils::round_to;

pub const ABSOLUTE_ZERO_C: f64 = 273.15;

/// ADC readings are clamped into this range before the divider formula,
/// which is undefined at 0 and at full scale.
pub const ADC_MIN: i64 = 1;
pub const ADC_MAX: i64 = 1022;
const ADC_FULL_SCALE: f64 = 1023.0;

const LIGHT_PERIOD_SCALE: f64 = 250_000.0;
const LIGHT_TEMP_OFFSET: f64 = 0.042;
const LIGHT_TEMP_COEFFICIENT: f64 = 0.00212;

/// Ambient temperature assumed for the light sensor correction when the
/// unit has no thermistor.
pub const NOMINAL_AMBIENT_C: f64 = 20.0;

/// Per-device calibration constants.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    /// NTC divider pull-up, kOhm
    pub ntc_pullup_kohm: f64,
    /// NTC resistance at 25 °C, kOhm
    pub ntc_res_at_25_kohm: f64,
    pub ntc_beta: f64,
    /// LDR divider pull-up, kOhm
    pub ldr_pullup_kohm: f64,
    /// Sky quality zero point, mag/arcsec²
    pub sq_reference: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration {
            ntc_pullup_kohm: 9.9,
            ntc_res_at_25_kohm: 10.0,
            ntc_beta: 3811.0,
            ldr_pullup_kohm: 56.0,
            sq_reference: 19.6,
        }
    }
}

fn divider_resistance(raw: i64, pullup_kohm: f64) -> f64 {
    let raw = raw.clamp(ADC_MIN, ADC_MAX) as f64;
    pullup_kohm / ((ADC_FULL_SCALE / raw) - 1.0)
}

/// Convert a raw NTC reading to °C using the Beta model.
///
/// Higher raw values mean higher thermistor resistance, so the result falls
/// as `raw` rises. Rounded to 2 decimals.
pub fn ambient_temperature(raw: i64, calibration: &Calibration) -> f64 {
    let r = divider_resistance(raw, calibration.ntc_pullup_kohm);
    let ln_ratio = (r / calibration.ntc_res_at_25_kohm).ln();
    let kelvin = 1.0 / (ln_ratio / calibration.ntc_beta + 1.0 / (ABSOLUTE_ZERO_C + 25.0));

    round_to(kelvin - ABSOLUTE_ZERO_C, 2)
}

/// Convert a raw LDR reading to its resistance in kOhm, rounded to 1 decimal.
pub fn ldr_resistance(raw: i64, calibration: &Calibration) -> f64 {
    round_to(divider_resistance(raw, calibration.ldr_pullup_kohm), 1)
}

/// Convert a light sensor period to sky brightness in mag/arcsec².
///
/// # Arguments
/// * `period` - Raw period count reported by the light sensor
/// * `ambient_c` - Ambient temperature for the correction term, if known
/// * `calibration` - Provides the zero point
///
/// # Returns
/// The corrected magnitude rounded to 2 decimals, or `OutOfDomain` for a
/// non-positive period. Magnitude grows with the period: a darker sky makes
/// the sensor oscillate slower.
pub fn sky_brightness(period: i64, ambient_c: Option<f64>, calibration: &Calibration) -> Result<f64> {
    if period <= 0 {
        return Err(CloudWatcherError::OutOfDomain {
            quantity: "light_period",
            value: period,
        });
    }

    let magnitude = calibration.sq_reference - 2.5 * (LIGHT_PERIOD_SCALE / period as f64).log10();
    let ambient = ambient_c.unwrap_or(NOMINAL_AMBIENT_C);
    let corrected = (magnitude - LIGHT_TEMP_OFFSET) + LIGHT_TEMP_COEFFICIENT * ambient;

    Ok(round_to(corrected, 2))
}
