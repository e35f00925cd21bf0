//! Byte-oriented serial transport abstraction.
//!
//! The station never talks to a serial port directly. It drives a
//! [`Transport`], so the same engine runs against the real port
//! ([`crate::hal::SerialTransport`], `serial` feature) and against the
//! scripted fake used by the tests ([`crate::hal::MockTransport`]).
//!
//! # Example
//!
//! ```rust
//! use rs_dcc::hal::MockTransport;
//! use rs_dcc::traits::{SerialSettings, Transport};
//!
//! let mut line = MockTransport::new().with_greeting("100 Ready\r\n");
//! line.open(&SerialSettings::new("COM3")).unwrap();
//! assert!(line.is_open());
//! assert_eq!(line.read_available().unwrap(), "100 Ready\r\n");
//! ```

use std::io;
use std::time::Duration;

/// Baud rate spoken by the controller.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default bounded read timeout for one response line.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(3);

/// Port parameters handed to [`Transport::open`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerialSettings {
    /// Port identifier, e.g. `COM3` or `/dev/ttyUSB0`.
    pub port: String,
    /// Line speed.
    pub baud_rate: u32,
    /// Upper bound for a single blocking read.
    pub read_timeout: Duration,
}

impl SerialSettings {
    /// Settings for `port` at the controller's fixed baud rate.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Override the read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

/// Serial line owned by a [`Station`](crate::Station).
///
/// Implementations must not block longer than the configured read timeout
/// in [`read_line`](Self::read_line); every other read is non-blocking.
pub trait Transport: Send {
    /// Open the line. Fails if the port does not exist or is in use.
    fn open(&mut self, settings: &SerialSettings) -> io::Result<()>;

    /// Release the line. Must be safe to call when already closed.
    fn close(&mut self);

    /// Whether the line is currently held.
    fn is_open(&self) -> bool;

    /// Write all bytes and flush.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read up to and including the next `\n`.
    ///
    /// On read timeout returns whatever arrived so far (possibly empty).
    fn read_line(&mut self) -> io::Result<String>;

    /// Number of bytes buffered and readable without blocking.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Drain everything currently buffered without blocking.
    fn read_available(&mut self) -> io::Result<String>;

    /// Discard any stale buffered input.
    fn clear_input(&mut self) -> io::Result<()>;
}
