/// Byte-level access to the CloudWatcher RS232 link
use log::{debug, info};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

/// One open link to the device.
pub trait Transport: Send {
    /// Write all bytes and flush them to the wire.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read until `n` bytes arrived or `timeout` elapsed.
    ///
    /// Returning fewer than `n` bytes is not an error; the caller decides
    /// what a short read means.
    fn read_up_to(&mut self, n: usize, timeout: Duration) -> io::Result<Vec<u8>>;

    /// Drop anything pending in the input and output buffers.
    fn reset_buffers(&mut self) -> io::Result<()>;
}

/// Opens links. A reconnect asks for a fresh link rather than reviving the
/// old one.
pub trait Connector: Send {
    type Link: Transport;

    fn open(&self) -> io::Result<Self::Link>;

    fn port_name(&self) -> &str;
}

/// Connector for a real serial port, 8N1 without flow control.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    port: String,
    baud_rate: u32,
    timeout: Duration,
}

impl SerialConnector {
    pub fn new(port: impl Into<String>, baud_rate: u32, timeout: Duration) -> Self {
        SerialConnector {
            port: port.into(),
            baud_rate,
            timeout,
        }
    }
}

impl Connector for SerialConnector {
    type Link = SerialLink;

    fn open(&self) -> io::Result<SerialLink> {
        let port = serialport::new(&self.port, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.timeout)
            .open()?;

        info!(
            "Connected to CloudWatcher on {} @ {} baud",
            self.port, self.baud_rate
        );

        Ok(SerialLink {
            port,
            name: self.port.clone(),
        })
    }

    fn port_name(&self) -> &str {
        &self.port
    }
}

/// An open serial port. Closed when dropped.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    name: String,
}

impl Transport for SerialLink {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }

    fn read_up_to(&mut self, n: usize, timeout: Duration) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        let mut filled = 0;
        let deadline = Instant::now() + timeout;

        while filled < n {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            self.port.set_timeout(remaining)?;

            match self.port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(count) => filled += count,
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        buf.truncate(filled);
        debug!("Read {}/{} bytes from {}", filled, n, self.name);
        Ok(buf)
    }

    fn reset_buffers(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::All)?;
        Ok(())
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        info!("Serial connection to {} closed", self.name);
    }
}
