/// Command round-trips over an owned transport link
use log::{debug, error, info, warn};
use std::thread;
use std::time::Duration;

use super::block::{decode_response, ParsedMap, BLOCK_SIZE};
use super::command::Command;
use super::variant::ProtocolVariant;
use crate::error::{CloudWatcherError, Result};
use crate::serial::{Connector, Transport};

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Owns the link to one device and runs request/response exchanges on it.
///
/// The link is opened lazily and replaced, never reused, after a fault.
/// Exchanges take `&mut self`, so two can never overlap on the same link.
pub struct CommandChannel<C: Connector> {
    connector: C,
    variant: ProtocolVariant,
    link: Option<C::Link>,
    read_timeout: Duration,
    reconnect_delay: Duration,
}

impl<C: Connector> CommandChannel<C> {
    pub fn new(connector: C, variant: ProtocolVariant) -> Self {
        CommandChannel {
            connector,
            variant,
            link: None,
            read_timeout: DEFAULT_READ_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn variant(&self) -> ProtocolVariant {
        self.variant
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Open a fresh link, replacing any existing one.
    pub fn connect(&mut self) -> Result<()> {
        self.close();
        match self.connector.open() {
            Ok(link) => {
                self.link = Some(link);
                Ok(())
            }
            Err(source) => {
                error!(
                    "Failed to connect to {}: {}",
                    self.connector.port_name(),
                    source
                );
                Err(CloudWatcherError::ConnectionLost {
                    port: self.connector.port_name().to_string(),
                    source,
                })
            }
        }
    }

    pub fn close(&mut self) {
        if self.link.take().is_some() {
            debug!("Dropped link to {}", self.connector.port_name());
        }
    }

    fn reconnect(&mut self) -> Result<()> {
        info!("Reconnecting to {}", self.connector.port_name());
        self.close();
        thread::sleep(self.reconnect_delay);
        self.connect()
    }

    /// Send `cmd` and decode its response.
    ///
    /// A missing link or an I/O fault gets exactly one reconnect; an I/O
    /// fault is then retried once. A short read is reported as
    /// `IncompleteResponse` without reconnecting and without decoding any
    /// part of it.
    pub fn send_command(&mut self, cmd: Command) -> Result<ParsedMap> {
        let mut reconnected = false;

        if self.link.is_none() && self.connect().is_err() {
            self.reconnect()?;
            reconnected = true;
        }

        match self.exchange(cmd) {
            Err(CloudWatcherError::Transport(e)) if !reconnected => {
                warn!("Serial error during command {}: {}", cmd, e);
                self.reconnect()?;
                self.exchange(cmd)
            }
            result => result,
        }
    }

    fn exchange(&mut self, cmd: Command) -> Result<ParsedMap> {
        let expected = self.variant.block_count(cmd) * BLOCK_SIZE;
        let timeout = self.read_timeout;

        let link = match self.link.as_mut() {
            Some(link) => link,
            None => {
                return Err(CloudWatcherError::ConnectionLost {
                    port: self.connector.port_name().to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotConnected, "no open link"),
                })
            }
        };

        let response = match Self::round_trip(link, cmd, expected, timeout) {
            Ok(response) => response,
            Err(e) => {
                // A faulted link is not trusted for the next exchange.
                self.link = None;
                return Err(e.into());
            }
        };

        if response.len() < expected {
            warn!(
                "Incomplete response for {}: got {}/{} bytes",
                cmd,
                response.len(),
                expected
            );
            return Err(CloudWatcherError::IncompleteResponse {
                command: cmd.code().to_string(),
                got: response.len(),
                expected,
            });
        }

        let parsed = decode_response(&response);
        debug!("{} -> {:?}", cmd, parsed);
        Ok(parsed)
    }

    fn round_trip(
        link: &mut C::Link,
        cmd: Command,
        expected: usize,
        timeout: Duration,
    ) -> std::io::Result<Vec<u8>> {
        link.reset_buffers()?;
        link.write_all(cmd.code().as_bytes())?;
        link.read_up_to(expected, timeout)
    }
}
