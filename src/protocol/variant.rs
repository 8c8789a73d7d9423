/// Device protocol variants sharing the block codec
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::command::{Command, DEFAULT_BLOCK_COUNT};

/// Which sensor set the attached unit carries.
///
/// `Ntc` units report an ambient thermistor and an LDR in the `C!` reply.
/// `LightSensor` units have no thermistor and report the sky-quality light
/// sensor period instead of the LDR, so their `C!` reply is one block shorter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProtocolVariant {
    #[default]
    Ntc,
    LightSensor,
}

impl ProtocolVariant {
    /// Number of 15-byte blocks the device sends back for `cmd`,
    /// including the closing handshake block.
    pub fn block_count(&self, cmd: Command) -> usize {
        match (self, cmd) {
            (_, Command::ResetBuffer) => 1,
            (ProtocolVariant::Ntc, Command::Values) => 5,
            (ProtocolVariant::LightSensor, Command::Values) => 4,
            (_, Command::InternalErrors) => 5,
            (_, Command::InternalName)
            | (_, Command::FirmwareVersion)
            | (_, Command::RainFrequency)
            | (_, Command::SwitchStatus)
            | (_, Command::PwmValue)
            | (_, Command::SkyTemperature)
            | (_, Command::SensorTemperature) => 2,
        }
    }

    /// Block count for a raw wire code, falling back to the default for
    /// codes this table does not know.
    pub fn block_count_for_code(&self, code: &str) -> usize {
        Command::from_code(code)
            .map(|cmd| self.block_count(cmd))
            .unwrap_or(DEFAULT_BLOCK_COUNT)
    }

    /// Commands issued once per sampling iteration, in order.
    pub fn cycle_commands(&self) -> &'static [Command] {
        &[
            Command::SkyTemperature,
            Command::SensorTemperature,
            Command::Values,
            Command::RainFrequency,
        ]
    }

    pub fn has_ambient_sensor(&self) -> bool {
        matches!(self, ProtocolVariant::Ntc)
    }

    pub fn has_light_sensor(&self) -> bool {
        matches!(self, ProtocolVariant::LightSensor)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolVariant::Ntc => "ntc",
            ProtocolVariant::LightSensor => "light-sensor",
        }
    }
}

impl fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ntc" | "a" => Ok(ProtocolVariant::Ntc),
            "light-sensor" | "light_sensor" | "sqm" | "b" => Ok(ProtocolVariant::LightSensor),
            other => Err(format!(
                "Unknown protocol variant '{}', expected 'ntc' or 'light-sensor'",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_command_length_depends_on_variant() {
        assert_eq!(ProtocolVariant::Ntc.block_count(Command::Values), 5);
        assert_eq!(ProtocolVariant::LightSensor.block_count(Command::Values), 4);
    }

    #[test]
    fn shared_commands_have_same_length() {
        for variant in [ProtocolVariant::Ntc, ProtocolVariant::LightSensor] {
            assert_eq!(variant.block_count(Command::SkyTemperature), 2);
            assert_eq!(variant.block_count(Command::SensorTemperature), 2);
            assert_eq!(variant.block_count(Command::RainFrequency), 2);
            assert_eq!(variant.block_count(Command::InternalErrors), 5);
            assert_eq!(variant.block_count(Command::ResetBuffer), 1);
        }
    }

    #[test]
    fn every_count_is_between_one_and_five() {
        for variant in [ProtocolVariant::Ntc, ProtocolVariant::LightSensor] {
            for cmd in Command::ALL {
                let count = variant.block_count(cmd);
                assert!((1..=5).contains(&count), "{:?} {:?}", variant, cmd);
            }
        }
    }

    #[test]
    fn unknown_codes_default_to_two_blocks() {
        assert_eq!(ProtocolVariant::Ntc.block_count_for_code("K!"), 2);
        assert_eq!(ProtocolVariant::Ntc.block_count_for_code("C!"), 5);
        assert_eq!(ProtocolVariant::LightSensor.block_count_for_code("C!"), 4);
    }

    #[test]
    fn parses_from_config_strings() {
        assert_eq!("ntc".parse::<ProtocolVariant>(), Ok(ProtocolVariant::Ntc));
        assert_eq!(" Light-Sensor ".parse::<ProtocolVariant>(), Ok(ProtocolVariant::LightSensor));
        assert!("rain".parse::<ProtocolVariant>().is_err());
    }
}
