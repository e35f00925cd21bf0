//! Trait definitions and value types shared across the crate.
//!
//! # Submodules
//!
//! - `transport`: the byte-oriented serial line the station drives
//! - `device`: power, direction, turnout and function values with their wire encodings
//!
//! # Transport Abstraction
//!
//! [`Transport`] is the only seam between the protocol engine and hardware.
//! Use [`crate::hal::MockTransport`] in tests and
//! `crate::hal::SerialTransport` (feature `serial`) against a real controller.

pub mod device;
pub mod transport;

pub use device::*;
pub use transport::*;
