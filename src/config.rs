use log::info;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::conversion::Calibration;
use crate::models::Thresholds;
use crate::protocol::ProtocolVariant;
use crate::sampler::DEFAULT_SAMPLE_COUNT;

#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub serial_port: String,
    pub baud_rate: u32,
    pub variant: ProtocolVariant,
    pub read_interval: Duration,
    pub read_timeout: Duration,
    pub sample_count: usize,
    pub stale_threshold_secs: u64,
    pub use_dummy: bool,
    pub calibration: Calibration,
    pub thresholds: Thresholds,
}

/// Read `key` and parse it, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| format!("Invalid value '{}' for {}: {}", raw, key, e).into()),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(e) => Err(format!("Cannot read {}: {}", key, e).into()),
    }
}

fn parse_flag(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(format!("expected true/false, got '{}'", other)),
    }
}

impl ReaderConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        let defaults = Calibration::default();
        let calibration = Calibration {
            ntc_pullup_kohm: env_or("NTC_PULLUP_RESISTANCE", defaults.ntc_pullup_kohm)?,
            ntc_res_at_25_kohm: env_or("NTC_RES_AT_25", defaults.ntc_res_at_25_kohm)?,
            ntc_beta: env_or("NTC_BETA", defaults.ntc_beta)?,
            ldr_pullup_kohm: env_or("LDR_PULLUP_RESISTANCE", defaults.ldr_pullup_kohm)?,
            sq_reference: env_or("SQ_REFERENCE", defaults.sq_reference)?,
        };

        let defaults = Thresholds::default();
        let thresholds = Thresholds {
            rain_freq: env_or("RAIN_THRESHOLD", defaults.rain_freq)?,
            wet_freq: env_or("WET_THRESHOLD", defaults.wet_freq)?,
            ldr_daylight_kohm: env_or("LDR_DAYLIGHT_THRESHOLD", defaults.ldr_daylight_kohm)?,
            mpsas_daylight: env_or("MPSAS_DAYLIGHT_THRESHOLD", defaults.mpsas_daylight)?,
        };

        let use_dummy = match env::var("USE_DUMMY") {
            Ok(raw) => parse_flag(&raw).map_err(|e| format!("Invalid USE_DUMMY: {}", e))?,
            Err(_) => false,
        };

        let config = ReaderConfig {
            serial_port: env_or("SERIAL_PORT", "/dev/ttyUSB0".to_string())?,
            baud_rate: env_or("BAUDRATE", 9600)?,
            variant: env_or("PROTOCOL_VARIANT", ProtocolVariant::Ntc)?,
            read_interval: Duration::from_secs(env_or("READ_INTERVAL_SECS", 30)?),
            read_timeout: Duration::from_millis(env_or("READ_TIMEOUT_MS", 2000)?),
            sample_count: env_or("SAMPLE_COUNT", DEFAULT_SAMPLE_COUNT)?,
            stale_threshold_secs: env_or("STALE_THRESHOLD_SECS", 300)?,
            use_dummy,
            calibration,
            thresholds,
        };

        if config.sample_count == 0 {
            return Err("SAMPLE_COUNT must be at least 1".into());
        }

        if config.thresholds.wet_freq < config.thresholds.rain_freq {
            return Err("WET_THRESHOLD must not be below RAIN_THRESHOLD".into());
        }

        info!(
            "Configuration: port={} baud={} variant={} interval={}s samples={}",
            config.serial_port,
            config.baud_rate,
            config.variant,
            config.read_interval.as_secs(),
            config.sample_count
        );

        Ok(config)
    }
}
