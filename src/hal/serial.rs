//! Serial port transport backed by the `serialport` crate.
//!
//! Opening the port toggles DTR, which resets the controller; the station's
//! readiness handshake then waits for the `100 Ready` greeting.
//!
//! # Example
//!
//! ```rust,ignore
//! use rs_dcc::hal::SerialTransport;
//! use rs_dcc::{Config, Station};
//!
//! let station = Station::new(SerialTransport::new(), Config::default());
//! station.open("/dev/ttyUSB0")?;
//! ```

use std::io::{self, Read, Write};
use std::time::Instant;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::traits::{SerialSettings, Transport};

/// Real serial line, 8N1 without flow control.
#[derive(Default)]
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    settings: Option<SerialSettings>,
}

impl core::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("settings", &self.settings)
            .field("open", &self.port.is_some())
            .finish()
    }
}

impl SerialTransport {
    /// A closed transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the serial ports present on this machine.
    pub fn available_ports() -> io::Result<Vec<String>> {
        let ports = serialport::available_ports()?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }

    fn port(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "serial port not open"))
    }
}

impl Transport for SerialTransport {
    fn open(&mut self, settings: &SerialSettings) -> io::Result<()> {
        self.close();
        let port = serialport::new(settings.port.as_str(), settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(settings.read_timeout)
            .open()?;
        self.port = Some(port);
        self.settings = Some(settings.clone());
        Ok(())
    }

    fn close(&mut self) {
        // Dropping the handle closes the port.
        self.port = None;
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let port = self.port()?;
        port.write_all(bytes)?;
        port.flush()
    }

    fn read_line(&mut self) -> io::Result<String> {
        let timeout = self
            .settings
            .as_ref()
            .map(|s| s.read_timeout)
            .unwrap_or(crate::traits::DEFAULT_READ_TIMEOUT);
        let port = self.port()?;
        let started = Instant::now();
        let mut line = Vec::new();
        let mut byte = [0u8; 1];

        while started.elapsed() < timeout {
            match port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.port()?.bytes_to_read()? as usize)
    }

    fn read_available(&mut self) -> io::Result<String> {
        let port = self.port()?;
        let pending = port.bytes_to_read()? as usize;
        if pending == 0 {
            return Ok(String::new());
        }
        let mut buf = vec![0u8; pending];
        let mut filled = 0;
        while filled < pending {
            match port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e),
            }
        }
        buf.truncate(filled);
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.port()?.clear(ClearBuffer::Input)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_transport_reports_not_connected() {
        let mut transport = SerialTransport::new();
        assert!(!transport.is_open());
        let err = transport.write_all(b"setPing()\r\n").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        assert_eq!(
            transport.bytes_available().unwrap_err().kind(),
            io::ErrorKind::NotConnected
        );
    }

    #[test]
    fn close_is_idempotent() {
        let mut transport = SerialTransport::new();
        transport.close();
        transport.close();
        assert!(!transport.is_open());
    }

    #[test]
    fn missing_port_fails_to_open() {
        let mut transport = SerialTransport::new();
        let settings = SerialSettings::new("/dev/rs-dcc-no-such-port");
        assert!(transport.open(&settings).is_err());
        assert!(!transport.is_open());
    }
}
