//! Connection lifecycle: open with readiness handshake, close.
//!
//! ```text
//!            open()             greeting has "100 Ready"
//! Closed ──────────▶ Opening ─────────────────────────────▶ Ready
//!    ▲                 │  port missing / no readiness marker    │
//!    │                 ▼                                        │
//!    └────────────── Failed ◀───────────────────────────────────┘
//!          close()                        (close() from any state)
//! ```
//!
//! The handshake runs exactly once per [`Connection::open`]; there is no
//! automatic reconnect.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::{HandshakeConfig, SerialConfig};
use crate::error::{DccError, Result};
use crate::parsing;
use crate::traits::Transport;

/// Lifecycle state of the serial connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum ConnectionState {
    /// No port held.
    #[default]
    Closed = 0,
    /// Port opened, waiting for the greeting.
    Opening = 1,
    /// Greeting received; commands may be dispatched.
    Ready = 2,
    /// Port unavailable or controller silent.
    Failed = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Opening,
            2 => ConnectionState::Ready,
            3 => ConnectionState::Failed,
            _ => ConnectionState::Closed,
        }
    }

    /// Returns the state as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Closed => "closed",
            ConnectionState::Opening => "opening",
            ConnectionState::Ready => "ready",
            ConnectionState::Failed => "failed",
        }
    }
}

/// The serial line plus its lifecycle state.
pub struct Connection<T: Transport> {
    transport: Mutex<T>,
    state: AtomicU8,
    serial: SerialConfig,
    handshake: HandshakeConfig,
}

impl<T: Transport> Connection<T> {
    /// Wrap a transport; the connection starts `Closed`.
    pub fn new(transport: T, serial: SerialConfig, handshake: HandshakeConfig) -> Self {
        Self {
            transport: Mutex::new(transport),
            state: AtomicU8::new(ConnectionState::Closed as u8),
            serial,
            handshake,
        }
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether commands may be dispatched.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Exclusive access to the transport.
    ///
    /// Callers dispatching commands must also hold the command lock.
    pub(crate) fn transport(&self) -> MutexGuard<'_, T> {
        self.transport.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the underlying line is held.
    pub fn is_transport_open(&self) -> bool {
        self.transport().is_open()
    }

    /// Open `port` and run the readiness handshake.
    pub fn open(&self, port: &str) -> Result<()> {
        let settings = self.serial.settings_for(port);
        let mut transport = self.transport();

        if transport.is_open() {
            transport.close();
        }
        self.set_state(ConnectionState::Opening);

        if let Err(e) = transport.open(&settings) {
            self.set_state(ConnectionState::Failed);
            error!(port, error = %e, "serial port unavailable");
            return Err(DccError::PortUnavailable {
                port: port.to_string(),
                reason: e.to_string(),
            });
        }

        info!(port, baud = settings.baud_rate, "waiting for controller greeting");
        let greeting = match self.await_greeting(&mut *transport) {
            Ok(greeting) => greeting,
            Err(e) => {
                self.set_state(ConnectionState::Failed);
                error!(port, error = %e, "handshake read failed");
                return Err(e.into());
            }
        };
        debug!(greeting = %greeting.trim_end(), "controller greeting");

        if parsing::is_ready(&greeting) {
            self.set_state(ConnectionState::Ready);
            info!(port, "controller ready");
            Ok(())
        } else {
            self.set_state(ConnectionState::Failed);
            warn!(port, "no readiness marker from controller");
            Err(DccError::NoResponse { greeting })
        }
    }

    fn await_greeting(&self, transport: &mut T) -> std::io::Result<String> {
        let window = Duration::from_millis(self.handshake.ready_window_ms as u64);
        let poll = Duration::from_millis(self.handshake.poll_ms.max(1) as u64);
        let started = Instant::now();

        while transport.bytes_available()? == 0 && started.elapsed() < window {
            thread::sleep(poll);
        }
        thread::sleep(Duration::from_millis(self.handshake.grace_ms as u64));
        transport.read_available()
    }

    /// Release the line. Safe to call in any state.
    pub fn close(&self) {
        let mut transport = self.transport();
        if transport.is_open() {
            transport.close();
            info!("serial port closed");
        }
        self.set_state(ConnectionState::Closed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockTransport;

    fn fast_handshake() -> HandshakeConfig {
        HandshakeConfig::default()
            .with_ready_window_ms(100)
            .with_grace_ms(10)
            .with_poll_ms(5)
    }

    fn connection(mock: &MockTransport) -> Connection<MockTransport> {
        Connection::new(mock.clone(), SerialConfig::default(), fast_handshake())
    }

    #[test]
    fn starts_closed() {
        let conn = connection(&MockTransport::ready());
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert!(!conn.is_ready());
    }

    #[test]
    fn ready_greeting() {
        let mock = MockTransport::ready();
        let conn = connection(&mock);
        conn.open("COM3").unwrap();
        assert_eq!(conn.state(), ConnectionState::Ready);
        assert_eq!(mock.last_settings().unwrap().baud_rate, 115_200);
    }

    #[test]
    fn missing_port() {
        let conn = connection(&MockTransport::ready().failing_open());
        let err = conn.open("COM9").unwrap_err();
        assert!(matches!(err, DccError::PortUnavailable { .. }));
        assert_eq!(conn.state(), ConnectionState::Failed);
    }

    #[test]
    fn greeting_without_marker() {
        let conn = connection(&MockTransport::new().with_greeting("booting\r\n"));
        let err = conn.open("COM3").unwrap_err();
        match err {
            DccError::NoResponse { greeting } => assert_eq!(greeting, "booting\r\n"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(conn.state(), ConnectionState::Failed);
    }

    #[test]
    fn close_is_idempotent() {
        let mock = MockTransport::ready();
        let conn = connection(&mock);
        conn.open("COM3").unwrap();
        conn.close();
        conn.close();
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert!(!conn.is_transport_open());
    }

    #[test]
    fn reopen_runs_handshake_again() {
        let mock = MockTransport::ready();
        let conn = connection(&mock);
        conn.open("COM3").unwrap();
        conn.open("COM3").unwrap();
        assert_eq!(mock.open_count(), 2);
        assert!(conn.is_ready());
    }

    #[test]
    fn state_names() {
        assert_eq!(ConnectionState::Ready.as_str(), "ready");
        assert_eq!(ConnectionState::default(), ConnectionState::Closed);
    }
}
