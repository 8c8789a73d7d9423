/// Utility functions for sample filtering, classification and formatting
use time::macros::format_description;
use time::OffsetDateTime;

use crate::models::CloudCondition;

/// Cloud condition thresholds on the corrected ambient minus sky delta, °C.
/// Checked from the top; anything at or below the last is overcast.
const CLOUD_THRESHOLDS: [(f64, CloudCondition); 5] = [
    (25.0, CloudCondition::Clear),
    (20.0, CloudCondition::MostlyClear),
    (15.0, CloudCondition::PartlyCloudy),
    (10.0, CloudCondition::MostlyCloudy),
    (5.0, CloudCondition::Cloudy),
];

const COLD_THRESHOLD_C: f64 = -10.0;
const COLD_CORRECTION_C: f64 = -3.0;
const HOT_THRESHOLD_C: f64 = 25.0;
const HOT_CORRECTION_C: f64 = 3.0;

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description!("[day].[month].[year] - [hour]:[minute]:[second]");
    dt.format(format).unwrap_or_else(|_| dt.to_string())
}

/// Convert a time::Duration to seconds as u64
///
/// Negative durations (clock went backwards) count as zero.
pub fn duration_to_seconds(duration: time::Duration) -> u64 {
    duration.whole_seconds().max(0) as u64
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Average a sample set, dropping samples more than one standard deviation
/// from the mean
///
/// # Arguments
/// * `values` - Samples of a single quantity from one acquisition cycle
///
/// # Returns
/// None for an empty set. Sets with fewer than three samples, or with no
/// spread, return the plain mean. Otherwise the mean of the samples inside
/// `[mean - sd, mean + sd]` (population standard deviation), or the plain
/// mean if that window is somehow empty.
pub fn filtered_average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;

    if values.len() < 3 {
        return Some(mean);
    }

    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / count;
    let std_dev = variance.sqrt();

    if std_dev == 0.0 {
        return Some(mean);
    }

    let low = mean - std_dev;
    let high = mean + std_dev;
    let kept: Vec<f64> = values
        .iter()
        .copied()
        .filter(|x| (low..=high).contains(x))
        .collect();

    if kept.is_empty() {
        return Some(mean);
    }

    Some(kept.iter().sum::<f64>() / kept.len() as f64)
}

/// Classify sky cover from the ambient minus sky temperature delta
///
/// Very cold or very hot ambient temperatures shift the delta before it is
/// compared against the thresholds.
pub fn classify_cloud_condition(delta_c: f64, ambient_c: f64) -> CloudCondition {
    let correction = if ambient_c < COLD_THRESHOLD_C {
        COLD_CORRECTION_C
    } else if ambient_c > HOT_THRESHOLD_C {
        HOT_CORRECTION_C
    } else {
        0.0
    };

    let adjusted = delta_c - correction;

    CLOUD_THRESHOLDS
        .iter()
        .find(|(threshold, _)| adjusted > *threshold)
        .map(|(_, condition)| *condition)
        .unwrap_or(CloudCondition::Overcast)
}
