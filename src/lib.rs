//! # rs-dcc
//!
//! A client for DesktopStation-style DCC command stations speaking the
//! line-oriented ASCII protocol over a 115200 baud serial link.
//!
//! ## Features
//!
//! - **Readiness handshake**: waits for the controller's `100 Ready` greeting after the port reset
//! - **Serialized dispatch**: one command in flight, timed lock acquisition, busy commands dropped
//! - **Typed codec**: locomotive, turnout, power and sensor commands with wire address mapping
//! - **Sensor cache**: S88 bitfields refreshed on demand or by a cancellable background poller
//! - **HTTP API** (feature `web`): axum routes over a shared station
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Transport abstraction and domain values
//! - `address`, `commands`, `parsing` - the wire codec
//! - `lock`, `engine` - command serialization and response assembly
//! - `connection` - open, readiness handshake, close
//! - `sensors`, `poller` - S88 cache and its background refresher
//! - `station` - the client tying everything together
//! - `hal` - Concrete transports (mock for testing, `serialport` for hardware)
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use rs_dcc::{
//!     hal::MockTransport, Config, FunctionState, HandshakeConfig, LocoAddress, Power, Station,
//!     TurnoutAddress, TurnoutDirection,
//! };
//!
//! // Controller that greets, acknowledges everything and reports sensor 3 occupied.
//! let mock = MockTransport::ready().with_responder(|cmd| {
//!     if cmd.starts_with("getS88") {
//!         "@S88,0004,\r\n200 Ok\r\n".to_string()
//!     } else {
//!         "200 Ok\r\n".to_string()
//!     }
//! });
//!
//! let config = Config::default().with_handshake(HandshakeConfig::default().with_grace_ms(0));
//! let station = Station::new(mock, config);
//! station.open("COM3").unwrap();
//!
//! station.set_power(Power::On);
//! station.set_turnout(TurnoutAddress::new(1).unwrap(), TurnoutDirection::Diverging);
//! station.set_loco_function(LocoAddress::new(33), 0, FunctionState::On);
//! station.set_loco_speed(LocoAddress::new(33), 400);
//!
//! // Block until the train reaches sensor 3 of device 1.
//! assert!(station.wait_until_bit_set(1, 3, Duration::from_secs(1)));
//!
//! station.stop();
//! ```

#![warn(missing_docs)]

/// Locomotive and turnout address spaces.
pub mod address;
/// Cooperative cancellation for blocking waits.
pub mod cancel;
/// Command types and their wire encoding.
pub mod commands;
/// Configuration for the serial line, engine timing, sensors and web service.
pub mod config;
/// Connection lifecycle and readiness handshake.
pub mod connection;
/// Command dispatch over the shared serial line.
pub mod engine;
/// Error taxonomy.
pub mod error;
/// Transport implementations (mock, serial).
pub mod hal;
/// Timed mutual exclusion for the serial line.
pub mod lock;
/// Response parsing helpers.
pub mod parsing;
/// Background sensor polling thread.
pub mod poller;
/// Cached S88 sensor state.
pub mod sensors;
/// The station client.
pub mod station;
/// Transport trait and domain value types.
pub mod traits;

/// Request types for the HTTP API (serde-based).
#[cfg(feature = "serde")]
pub mod messages;

/// HTTP API over a shared station (feature-gated).
#[cfg(feature = "web")]
pub mod services;

// Re-exports for convenience
pub use address::{LocoAddress, TurnoutAddress};
pub use cancel::CancelToken;
pub use commands::DccCommand;
pub use connection::ConnectionState;
pub use engine::CommandExchange;
pub use error::{DccError, Result};
pub use lock::{CommandGuard, CommandLock};
pub use parsing::LocoConfigValue;
pub use sensors::SensorBank;
pub use station::Station;
pub use traits::{
    FunctionState, LocoDirection, Power, SerialSettings, Transport, TurnoutDirection,
};

// Config re-exports
pub use config::{
    CommandConfig, Config, HandshakeConfig, SensorConfig, SerialConfig, WebConfig,
};

// Message re-exports (for the HTTP API)
#[cfg(feature = "serde")]
pub use messages::{
    FunctionRequest, LocoDirectionRequest, LocoSpeedRequest, PowerRequest, TurnoutRequest,
};
