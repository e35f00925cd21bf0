//! Error taxonomy for the DCC client.
//!
//! None of these conditions is fatal. The lifecycle operations return them
//! directly; the command and sensor operations log them and degrade to an
//! empty response, an invalid reading or a `false` wait result.

use thiserror::Error;

/// Errors raised by the station, its engine and its transport.
#[derive(Debug, Error)]
pub enum DccError {
    /// The serial port could not be opened.
    #[error("serial port {port} unavailable: {reason}")]
    PortUnavailable {
        /// Port identifier that failed to open.
        port: String,
        /// Reason reported by the transport.
        reason: String,
    },

    /// The controller never sent its readiness marker during the handshake.
    #[error("no readiness marker from controller (greeting: {greeting:?})")]
    NoResponse {
        /// Whatever text was received instead.
        greeting: String,
    },

    /// A command was issued while the connection was not ready.
    #[error("connection is not open")]
    NotOpen,

    /// The command lock could not be acquired in time; the command was dropped.
    #[error("command line busy, dropped after {timeout_ms}ms")]
    LockTimeout {
        /// How long acquisition was attempted.
        timeout_ms: u64,
    },

    /// A response arrived without the success marker.
    #[error("controller replied without success marker: {response:?}")]
    ReplyError {
        /// Raw response text.
        response: String,
    },

    /// A sensor bank response could not be parsed.
    #[error("invalid sensor reading for device {device}")]
    SensorReadInvalid {
        /// 1-indexed S88 device number.
        device: usize,
    },

    /// A sensor bit did not become set before the deadline.
    #[error("sensor {device}:{bit} not set before deadline")]
    SensorTimeout {
        /// 1-indexed S88 device number.
        device: usize,
        /// 1-indexed sensor input.
        bit: u8,
    },

    /// A logical address cannot be mapped to the wire address space.
    #[error("invalid address: {0}")]
    InvalidAddress(&'static str),

    /// Transport I/O failure.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, DccError>;
