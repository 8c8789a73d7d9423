/// Multi-sample acquisition cycles and snapshot assembly
use log::{debug, info, warn};
use std::thread;
use std::time::Duration;

use crate::conversion::{ambient_temperature, ldr_resistance, sky_brightness, Calibration};
use crate::error::{CloudWatcherError, Result};
use crate::models::{DeviceInfo, Snapshot, Thresholds};
use crate::protocol::block::ParsedMap;
use crate::protocol::command::type_code;
use crate::protocol::{Command, CommandChannel, ProtocolVariant};
use crate::serial::Connector;
use crate::utils::{filtered_average, round_to};

pub const DEFAULT_SAMPLE_COUNT: usize = 5;
pub const DEFAULT_SAMPLE_DELAY: Duration = Duration::from_millis(100);

/// Per-quantity samples collected during one cycle.
#[derive(Debug, Default)]
struct SampleSets {
    sky_temp: Vec<f64>,
    sensor_temp: Vec<f64>,
    ambient_raw: Vec<f64>,
    ldr_raw: Vec<f64>,
    light_period: Vec<f64>,
    rain_freq: Vec<f64>,
}

/// Parse an integer field, treating a missing or garbled value as absent.
fn parse_int(parsed: &ParsedMap, code: char) -> Option<i64> {
    let raw = parsed.get(&code)?;
    match raw.parse::<i64>() {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Unparseable value {:?} for type {}: {}", raw, code, e);
            None
        }
    }
}

/// Runs acquisition cycles against one device.
pub struct Sampler<C: Connector> {
    channel: CommandChannel<C>,
    calibration: Calibration,
    thresholds: Thresholds,
    sample_delay: Duration,
}

impl<C: Connector> Sampler<C> {
    pub fn new(channel: CommandChannel<C>, calibration: Calibration, thresholds: Thresholds) -> Self {
        Sampler {
            channel,
            calibration,
            thresholds,
            sample_delay: DEFAULT_SAMPLE_DELAY,
        }
    }

    pub fn with_sample_delay(mut self, delay: Duration) -> Self {
        self.sample_delay = delay;
        self
    }

    pub fn variant(&self) -> ProtocolVariant {
        self.channel.variant()
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    /// Read the device name and firmware version.
    ///
    /// Either field is None when its command failed or carried no value.
    pub fn read_device_info(&mut self) -> DeviceInfo {
        DeviceInfo {
            name: self.first_value(Command::InternalName),
            firmware: self.first_value(Command::FirmwareVersion),
        }
    }

    fn first_value(&mut self, cmd: Command) -> Option<String> {
        match self.channel.send_command(cmd) {
            Ok(parsed) => {
                // prefer the documented type code, else whatever came back
                let preferred = match cmd {
                    Command::InternalName => Some(type_code::INTERNAL_NAME),
                    Command::FirmwareVersion => Some(type_code::FIRMWARE_VERSION),
                    _ => None,
                };
                preferred
                    .and_then(|code| parsed.get(&code))
                    .filter(|value| !value.is_empty())
                    .or_else(|| {
                        let mut values: Vec<(&char, &String)> =
                            parsed.iter().filter(|(_, v)| !v.is_empty()).collect();
                        values.sort();
                        values.first().map(|(_, v)| *v)
                    })
                    .cloned()
            }
            Err(e) => {
                warn!("Could not read {}: {}", cmd, e);
                None
            }
        }
    }

    /// Run one acquisition cycle of `sample_count` iterations.
    ///
    /// Failed exchanges only thin out the affected quantity. The cycle
    /// fails with `InsufficientData` when no sky temperature was read at all.
    pub fn acquire(&mut self, sample_count: usize) -> Result<Snapshot> {
        let mut samples = SampleSets::default();

        for iteration in 0..sample_count {
            for &cmd in self.channel.variant().cycle_commands() {
                match self.channel.send_command(cmd) {
                    Ok(parsed) => self.collect(cmd, &parsed, &mut samples),
                    Err(e) => debug!("Iteration {}: {} failed: {}", iteration, cmd, e),
                }
            }

            if iteration + 1 < sample_count {
                thread::sleep(self.sample_delay);
            }
        }

        let snapshot = self.assemble(&samples)?;
        info!(
            "Cycle complete: sky {:.2}°C from {} samples",
            snapshot.sky_temp_c, snapshot.samples
        );
        Ok(snapshot)
    }

    fn collect(&self, cmd: Command, parsed: &ParsedMap, samples: &mut SampleSets) {
        let variant = self.channel.variant();
        match cmd {
            Command::SkyTemperature => {
                if let Some(v) = parse_int(parsed, type_code::SKY_TEMPERATURE) {
                    samples.sky_temp.push(v as f64 / 100.0);
                }
            }
            Command::SensorTemperature => {
                if let Some(v) = parse_int(parsed, type_code::SENSOR_TEMPERATURE) {
                    samples.sensor_temp.push(v as f64 / 100.0);
                }
            }
            Command::Values => {
                if variant.has_ambient_sensor() {
                    if let Some(v) = parse_int(parsed, type_code::AMBIENT_RAW) {
                        samples.ambient_raw.push(v as f64);
                    }
                    if let Some(v) = parse_int(parsed, type_code::LDR_RAW) {
                        samples.ldr_raw.push(v as f64);
                    }
                }
                if variant.has_light_sensor() {
                    if let Some(v) = parse_int(parsed, type_code::LIGHT_PERIOD) {
                        samples.light_period.push(v as f64);
                    }
                }
            }
            Command::RainFrequency => {
                if let Some(v) = parse_int(parsed, type_code::RAIN_FREQUENCY) {
                    samples.rain_freq.push(v as f64);
                }
            }
            _ => {}
        }
    }

    fn assemble(&self, samples: &SampleSets) -> Result<Snapshot> {
        let sky = match filtered_average(&samples.sky_temp) {
            Some(sky) => sky,
            None => {
                warn!("Insufficient data collected: no sky temperature samples");
                return Err(CloudWatcherError::InsufficientData {
                    quantity: "sky_temp_c",
                });
            }
        };

        let cal = &self.calibration;
        let thresholds = &self.thresholds;

        // Raw counts are filtered as floats and truncated only here.
        let ambient_temp_c = filtered_average(&samples.ambient_raw)
            .map(|avg| ambient_temperature(avg as i64, cal));
        let ldr_kohm = filtered_average(&samples.ldr_raw).map(|avg| ldr_resistance(avg as i64, cal));
        let mpsas = filtered_average(&samples.light_period).and_then(|avg| {
            sky_brightness(avg as i64, ambient_temp_c, cal)
                .map_err(|e| debug!("No sky brightness: {}", e))
                .ok()
        });
        let rain_freq = filtered_average(&samples.rain_freq).map(|avg| avg as i64);

        let is_daylight = match (ldr_kohm, mpsas) {
            (Some(ldr), _) => Some(ldr < thresholds.ldr_daylight_kohm),
            (None, Some(m)) => Some(m < thresholds.mpsas_daylight),
            (None, None) => None,
        };

        Ok(Snapshot {
            sky_temp_c: round_to(sky, 2),
            sensor_temp_c: filtered_average(&samples.sensor_temp).map(|t| round_to(t, 2)),
            ambient_temp_c,
            delta_c: ambient_temp_c.map(|ambient| round_to(ambient - sky, 2)),
            rain_freq,
            is_raining: rain_freq.map(|f| f < thresholds.rain_freq),
            is_wet: rain_freq.map(|f| f < thresholds.wet_freq),
            ldr_kohm,
            mpsas,
            is_daylight,
            samples: samples.sky_temp.len(),
        })
    }
}
