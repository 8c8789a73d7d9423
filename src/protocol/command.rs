/// CloudWatcher RS232 commands and response type codes
use std::fmt;

/// Block count used for commands missing from a variant's table.
pub const DEFAULT_BLOCK_COUNT: usize = 2;

/// Type codes carried in byte 1 of a data block.
pub mod type_code {
    pub const SKY_TEMPERATURE: char = '1';
    pub const SENSOR_TEMPERATURE: char = '2';
    pub const AMBIENT_RAW: char = '3';
    pub const LDR_RAW: char = '4';
    pub const RAIN_SENSOR_TEMPERATURE_RAW: char = '5';
    pub const ZENER_RAW: char = '6';
    pub const LIGHT_PERIOD: char = '8';
    pub const RAIN_FREQUENCY: char = 'R';
    pub const INTERNAL_NAME: char = 'N';
    pub const FIRMWARE_VERSION: char = 'V';
}

/// A two-character command understood by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    InternalName,
    FirmwareVersion,
    Values,
    InternalErrors,
    RainFrequency,
    SwitchStatus,
    PwmValue,
    SkyTemperature,
    SensorTemperature,
    ResetBuffer,
}

impl Command {
    pub const ALL: [Command; 10] = [
        Command::InternalName,
        Command::FirmwareVersion,
        Command::Values,
        Command::InternalErrors,
        Command::RainFrequency,
        Command::SwitchStatus,
        Command::PwmValue,
        Command::SkyTemperature,
        Command::SensorTemperature,
        Command::ResetBuffer,
    ];

    /// The ASCII string written to the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Command::InternalName => "A!",
            Command::FirmwareVersion => "B!",
            Command::Values => "C!",
            Command::InternalErrors => "D!",
            Command::RainFrequency => "E!",
            Command::SwitchStatus => "F!",
            Command::PwmValue => "Q!",
            Command::SkyTemperature => "S!",
            Command::SensorTemperature => "T!",
            Command::ResetBuffer => "z!",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.code() == code)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_two_ascii_chars_ending_in_bang() {
        for cmd in Command::ALL {
            let code = cmd.code();
            assert_eq!(code.len(), 2, "{:?}", cmd);
            assert!(code.is_ascii());
            assert!(code.ends_with('!'));
        }
    }

    #[test]
    fn from_code_round_trips_and_rejects_unknown() {
        assert_eq!(Command::from_code("S!"), Some(Command::SkyTemperature));
        assert_eq!(Command::from_code("z!"), Some(Command::ResetBuffer));
        assert_eq!(Command::from_code("Z!"), None);
        assert_eq!(Command::from_code("K!"), None);
    }

    #[test]
    fn display_writes_wire_code() {
        assert_eq!(Command::Values.to_string(), "C!");
    }
}
