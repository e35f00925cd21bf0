//! Transport implementations.
//!
//! This module contains concrete implementations of the
//! [`Transport`](crate::traits::Transport) trait.
//!
//! # Available Implementations
//!
//! - `mock`: scripted fake line for tests and desktop development
//! - `serial`: real serial port via the `serialport` crate (requires `serial` feature)

pub mod mock;

#[cfg(feature = "serial")]
pub mod serial;

pub use mock::*;

#[cfg(feature = "serial")]
pub use serial::*;
