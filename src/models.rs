use serde::Serialize;

/// Filtered result of one acquisition cycle.
///
/// Field names are the ones downstream consumers read; quantities the cycle
/// could not produce are left out of the serialized form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub sky_temp_c: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_temp_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ambient_temp_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rain_freq: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_raining: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_wet: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ldr_kohm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mpsas: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_daylight: Option<bool>,
    /// Number of sky temperature samples behind `sky_temp_c`
    pub samples: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub name: Option<String>,
    pub firmware: Option<String>,
}

/// Sky cover derived from the ambient minus sky temperature delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudCondition {
    Clear,
    MostlyClear,
    PartlyCloudy,
    MostlyCloudy,
    Cloudy,
    Overcast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    Ok,
    Stale,
    Error,
}

/// Thresholds for the boolean classifications in a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    /// Rain frequency below this means rain
    pub rain_freq: i64,
    /// Rain frequency below this means a wet sensor
    pub wet_freq: i64,
    /// LDR resistance below this means daylight, kOhm
    pub ldr_daylight_kohm: f64,
    /// Sky brightness below this means daylight, mag/arcsec²
    pub mpsas_daylight: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            rain_freq: 2000,
            wet_freq: 2400,
            ldr_daylight_kohm: 50.0,
            mpsas_daylight: 10.0,
        }
    }
}

/// Document published after every cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedReading {
    pub timestamp: Option<String>,
    pub sky_temp_c: Option<f64>,
    pub sensor_temp_c: Option<f64>,
    pub ambient_temp_c: Option<f64>,
    pub delta_c: Option<f64>,
    pub rain_freq: Option<i64>,
    pub is_raining: Option<bool>,
    pub is_wet: Option<bool>,
    pub ldr_kohm: Option<f64>,
    pub mpsas: Option<f64>,
    pub is_daylight: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_condition: Option<CloudCondition>,
    pub device: Option<DeviceInfo>,
    pub uptime_s: u64,
    pub quality: DataQuality,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Snapshot {
        Snapshot {
            sky_temp_c: -15.05,
            sensor_temp_c: None,
            ambient_temp_c: Some(8.4),
            delta_c: Some(23.45),
            rain_freq: Some(2750),
            is_raining: Some(false),
            is_wet: Some(false),
            ldr_kohm: None,
            mpsas: None,
            is_daylight: None,
            samples: 5,
        }
    }

    #[test]
    fn absent_quantities_are_not_serialized() {
        let json = serde_json::to_value(snapshot()).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj["sky_temp_c"], serde_json::json!(-15.05));
        assert_eq!(obj["rain_freq"], serde_json::json!(2750));
        assert!(!obj.contains_key("ldr_kohm"));
        assert!(!obj.contains_key("mpsas"));
        assert!(!obj.contains_key("is_daylight"));
    }

    #[test]
    fn enums_use_snake_case_names() {
        assert_eq!(
            serde_json::to_value(CloudCondition::MostlyClear).unwrap(),
            serde_json::json!("mostly_clear")
        );
        assert_eq!(
            serde_json::to_value(DataQuality::Stale).unwrap(),
            serde_json::json!("stale")
        );
    }
}
