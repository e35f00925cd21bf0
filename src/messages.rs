//! Request bodies for the HTTP API.
//!
//! # Example
//!
//! ```
//! use rs_dcc::messages::LocoSpeedRequest;
//! use rs_dcc::LocoAddress;
//!
//! let json = r#"{"address": 10, "speed": 400}"#;
//! let req: LocoSpeedRequest = serde_json::from_str(json).unwrap();
//! assert_eq!(req.address, LocoAddress::new(10));
//! assert_eq!(req.speed_step, 0);
//! ```

use serde::{Deserialize, Serialize};

use crate::address::LocoAddress;
use crate::traits::{LocoDirection, TurnoutDirection};

// ============================================================================
// Request Types
// ============================================================================

/// Switch track power.
///
/// ```json
/// {"on": true}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerRequest {
    /// `true` powers the track.
    pub on: bool,
}

/// Set locomotive speed.
///
/// # JSON Examples
///
/// Default speed step:
/// ```json
/// {"address": 10, "speed": 400}
/// ```
///
/// Explicit speed step:
/// ```json
/// {"address": 10, "speed": 400, "speed_step": 2}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocoSpeedRequest {
    /// Logical locomotive address.
    pub address: LocoAddress,
    /// Speed value (0 stops the locomotive).
    pub speed: u16,
    /// Speed step mode, 0 when omitted.
    #[serde(default)]
    pub speed_step: u8,
}

/// Set locomotive direction.
///
/// ```json
/// {"address": 10, "direction": "reverse"}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocoDirectionRequest {
    /// Logical locomotive address.
    pub address: LocoAddress,
    /// Direction of travel.
    pub direction: LocoDirection,
}

/// Switch a locomotive function.
///
/// ```json
/// {"address": 10, "function": 0, "on": true}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRequest {
    /// Logical locomotive address.
    pub address: LocoAddress,
    /// Function number (0 = lights).
    pub function: u8,
    /// Function state.
    pub on: bool,
}

/// Throw a turnout.
///
/// The address is validated by the handler; 0 is rejected.
///
/// ```json
/// {"address": 1, "direction": "diverging"}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnoutRequest {
    /// Logical turnout address (1-indexed).
    pub address: u16,
    /// Route to select.
    pub direction: TurnoutDirection,
}
