/// In-process CloudWatcher that answers commands with protocol blocks
use log::{debug, info};
use std::io;
use std::time::Duration;

use super::transport::{Connector, Transport};
use crate::protocol::block::{encode_block, encode_handshake};
use crate::protocol::command::{type_code, Command};
use crate::protocol::ProtocolVariant;

const SIMULATED_NAME: &str = "CloudWatcher";
const SIMULATED_FIRMWARE: &str = "5.89";

#[derive(Debug, Clone)]
pub struct SimulatedConnector {
    variant: ProtocolVariant,
}

impl SimulatedConnector {
    pub fn new(variant: ProtocolVariant) -> Self {
        SimulatedConnector { variant }
    }
}

impl Connector for SimulatedConnector {
    type Link = SimulatedDevice;

    fn open(&self) -> io::Result<SimulatedDevice> {
        info!("Using simulated CloudWatcher ({} variant)", self.variant);
        Ok(SimulatedDevice::new(self.variant))
    }

    fn port_name(&self) -> &str {
        "simulated"
    }
}

/// Replies to each command with slowly drifting values.
///
/// Every reply is exactly as long as the variant's block table says, with
/// the handshake block last. Unknown commands get no reply at all.
#[derive(Debug)]
pub struct SimulatedDevice {
    variant: ProtocolVariant,
    tick: u64,
    pending: Vec<u8>,
}

impl SimulatedDevice {
    pub fn new(variant: ProtocolVariant) -> Self {
        SimulatedDevice {
            variant,
            tick: 0,
            pending: Vec::new(),
        }
    }

    /// Value oscillating around `center` by up to `amplitude`.
    fn drift(&self, center: f64, amplitude: f64, period: f64) -> i64 {
        let phase = self.tick as f64 / period * std::f64::consts::TAU;
        (center + amplitude * phase.sin()).round() as i64
    }

    fn data_blocks(&self, cmd: Command) -> Vec<(char, String)> {
        match cmd {
            Command::InternalName => vec![(type_code::INTERNAL_NAME, SIMULATED_NAME.to_string())],
            Command::FirmwareVersion => {
                vec![(type_code::FIRMWARE_VERSION, SIMULATED_FIRMWARE.to_string())]
            }
            Command::SkyTemperature => vec![(
                type_code::SKY_TEMPERATURE,
                self.drift(-1500.0, 60.0, 40.0).to_string(),
            )],
            Command::SensorTemperature => vec![(
                type_code::SENSOR_TEMPERATURE,
                self.drift(1200.0, 30.0, 90.0).to_string(),
            )],
            Command::Values => {
                let rain_sensor = (type_code::RAIN_SENSOR_TEMPERATURE_RAW, "560".to_string());
                let zener = (type_code::ZENER_RAW, "880".to_string());
                match self.variant {
                    ProtocolVariant::Ntc => vec![
                        (type_code::AMBIENT_RAW, self.drift(540.0, 8.0, 70.0).to_string()),
                        (type_code::LDR_RAW, self.drift(1000.0, 10.0, 50.0).to_string()),
                        rain_sensor,
                        zener,
                    ],
                    ProtocolVariant::LightSensor => vec![
                        rain_sensor,
                        zener,
                        (
                            type_code::LIGHT_PERIOD,
                            self.drift(600_000.0, 20_000.0, 60.0).to_string(),
                        ),
                    ],
                }
            }
            Command::RainFrequency => vec![(
                type_code::RAIN_FREQUENCY,
                self.drift(2750.0, 25.0, 30.0).to_string(),
            )],
            Command::InternalErrors => vec![
                ('E', "1 0".to_string()),
                ('E', "2 0".to_string()),
                ('E', "a 0".to_string()),
                ('E', "b 0".to_string()),
            ],
            Command::SwitchStatus => vec![('X', String::new())],
            Command::PwmValue => vec![('Q', "0".to_string())],
            Command::ResetBuffer => Vec::new(),
        }
    }

    fn respond(&mut self, cmd: Command) {
        self.tick = self.tick.wrapping_add(1);
        self.pending.clear();
        for (code, value) in self.data_blocks(cmd) {
            self.pending.extend_from_slice(&encode_block(code, &value));
        }
        self.pending.extend_from_slice(&encode_handshake());
        debug!("Simulated reply to {}: {} bytes", cmd, self.pending.len());
    }
}

impl Transport for SimulatedDevice {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let code = String::from_utf8_lossy(bytes);
        match Command::from_code(&code) {
            Some(cmd) => self.respond(cmd),
            None => {
                debug!(
                    "Simulated device ignoring unknown command {:?} (host waits for {} blocks)",
                    code,
                    self.variant.block_count_for_code(&code)
                );
                self.pending.clear();
            }
        }
        Ok(())
    }

    fn read_up_to(&mut self, n: usize, _timeout: Duration) -> io::Result<Vec<u8>> {
        let take = n.min(self.pending.len());
        Ok(self.pending.drain(..take).collect())
    }

    fn reset_buffers(&mut self) -> io::Result<()> {
        self.pending.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::block::{decode_response, BLOCK_SIZE};

    fn exchange(device: &mut SimulatedDevice, cmd: Command) -> Vec<u8> {
        device.write_all(cmd.code().as_bytes()).unwrap();
        device
            .read_up_to(10 * BLOCK_SIZE, Duration::from_millis(10))
            .unwrap()
    }

    #[test]
    fn reply_lengths_match_block_table() {
        for variant in [ProtocolVariant::Ntc, ProtocolVariant::LightSensor] {
            let mut device = SimulatedDevice::new(variant);
            for cmd in Command::ALL {
                let reply = exchange(&mut device, cmd);
                assert_eq!(
                    reply.len(),
                    variant.block_count(cmd) * BLOCK_SIZE,
                    "{:?} {:?}",
                    variant,
                    cmd
                );
            }
        }
    }

    #[test]
    fn values_reply_carries_variant_specific_codes() {
        let mut ntc = SimulatedDevice::new(ProtocolVariant::Ntc);
        let parsed = decode_response(&exchange(&mut ntc, Command::Values));
        assert!(parsed.contains_key(&type_code::AMBIENT_RAW));
        assert!(parsed.contains_key(&type_code::LDR_RAW));
        assert!(!parsed.contains_key(&type_code::LIGHT_PERIOD));

        let mut light = SimulatedDevice::new(ProtocolVariant::LightSensor);
        let parsed = decode_response(&exchange(&mut light, Command::Values));
        assert!(parsed.contains_key(&type_code::LIGHT_PERIOD));
        assert!(!parsed.contains_key(&type_code::AMBIENT_RAW));
    }

    #[test]
    fn unknown_command_gets_no_reply() {
        let mut device = SimulatedDevice::new(ProtocolVariant::Ntc);
        device.write_all(b"K!").unwrap();
        let reply = device.read_up_to(30, Duration::from_millis(10)).unwrap();
        assert!(reply.is_empty());
    }

    #[test]
    fn reset_discards_pending_reply() {
        let mut device = SimulatedDevice::new(ProtocolVariant::Ntc);
        device.write_all(b"S!").unwrap();
        device.reset_buffers().unwrap();
        let reply = device.read_up_to(30, Duration::from_millis(10)).unwrap();
        assert!(reply.is_empty());
    }
}
