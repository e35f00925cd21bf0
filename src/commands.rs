//! Command construction for the controller's text protocol.
//!
//! Every operation is a single line of the form `name(arg1,arg2,...)`. The
//! line terminator is appended by the engine, not here.
//!
//! # Command Set
//!
//! | Variant | Wire form |
//! |---------|-----------|
//! | [`DccCommand::Ping`] | `setPing()` |
//! | [`DccCommand::SetPower`] | `setPower(1)` |
//! | [`DccCommand::SetLocoSpeed`] | `setLocoSpeed(49162,200,0)` |
//! | [`DccCommand::SetLocoDirection`] | `setLocoDirection(49162,1)` |
//! | [`DccCommand::SetLocoFunction`] | `setLocoFunction(49162,0,1)` |
//! | [`DccCommand::SetLocoConfig`] | `setLocoConfig(49162,8)` |
//! | [`DccCommand::GetLocoConfig`] | `getLocoConfig(49162,8)` |
//! | [`DccCommand::SetTurnout`] | `setTurnout(14336,1)` |
//! | [`DccCommand::GetS88`] | `getS88(1)` |
//!
//! # Example
//!
//! ```rust
//! use rs_dcc::{DccCommand, LocoAddress, LocoDirection};
//!
//! let cmd = DccCommand::SetLocoDirection {
//!     address: LocoAddress::new(10),
//!     direction: LocoDirection::Reverse,
//! };
//! assert_eq!(cmd.encode(), "setLocoDirection(49162,2)");
//! ```

use core::fmt;

use crate::address::{LocoAddress, TurnoutAddress};
use crate::traits::{FunctionState, LocoDirection, Power, TurnoutDirection};

/// Line terminator appended to every command on the wire.
pub const LINE_TERMINATOR: &str = "\r\n";

/// One controller operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DccCommand {
    /// Keep-alive / connectivity check.
    Ping,

    /// Switch track power.
    SetPower(Power),

    /// Set locomotive speed.
    SetLocoSpeed {
        /// Locomotive decoder address.
        address: LocoAddress,
        /// Speed value passed through to the controller (0 stops the locomotive).
        speed: u16,
        /// Speed step mode; 0 lets the controller choose.
        speed_step: u8,
    },

    /// Set locomotive direction of travel.
    SetLocoDirection {
        /// Locomotive decoder address.
        address: LocoAddress,
        /// New direction.
        direction: LocoDirection,
    },

    /// Switch a locomotive function (F0 = lights, ...).
    SetLocoFunction {
        /// Locomotive decoder address.
        address: LocoAddress,
        /// Function number.
        function: u8,
        /// On or off.
        state: FunctionState,
    },

    /// Write a decoder configuration value.
    SetLocoConfig {
        /// Locomotive decoder address.
        address: LocoAddress,
        /// Raw value argument.
        value: u32,
    },

    /// Read a decoder configuration variable.
    GetLocoConfig {
        /// Locomotive decoder address.
        address: LocoAddress,
        /// Configuration variable number.
        field: u16,
    },

    /// Throw a turnout.
    SetTurnout {
        /// Turnout address.
        address: TurnoutAddress,
        /// Route to select.
        direction: TurnoutDirection,
    },

    /// Query the S88 sensor bus up to `device_count` devices.
    GetS88 {
        /// Number of devices to report (also the index of interest in the reply).
        device_count: usize,
    },
}

impl DccCommand {
    /// Speed command with the default speed step.
    pub fn loco_speed(address: impl Into<LocoAddress>, speed: u16) -> Self {
        DccCommand::SetLocoSpeed {
            address: address.into(),
            speed,
            speed_step: 0,
        }
    }

    /// Operation name as it appears on the wire.
    pub const fn name(&self) -> &'static str {
        match self {
            DccCommand::Ping => "setPing",
            DccCommand::SetPower(_) => "setPower",
            DccCommand::SetLocoSpeed { .. } => "setLocoSpeed",
            DccCommand::SetLocoDirection { .. } => "setLocoDirection",
            DccCommand::SetLocoFunction { .. } => "setLocoFunction",
            DccCommand::SetLocoConfig { .. } => "setLocoConfig",
            DccCommand::GetLocoConfig { .. } => "getLocoConfig",
            DccCommand::SetTurnout { .. } => "setTurnout",
            DccCommand::GetS88 { .. } => "getS88",
        }
    }

    /// Whether this is a high-frequency sensor query.
    ///
    /// Sensor queries answer within a few milliseconds and use the shorter
    /// post-success delay.
    pub const fn is_sensor_query(&self) -> bool {
        matches!(self, DccCommand::GetS88 { .. })
    }

    /// Encode as a command expression, without line terminator.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DccCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name();
        match *self {
            DccCommand::Ping => write!(f, "{name}()"),
            DccCommand::SetPower(power) => write!(f, "{name}({})", power.wire_value()),
            DccCommand::SetLocoSpeed {
                address,
                speed,
                speed_step,
            } => write!(f, "{name}({},{speed},{speed_step})", address.wire()),
            DccCommand::SetLocoDirection { address, direction } => {
                write!(f, "{name}({},{})", address.wire(), direction.wire_value())
            }
            DccCommand::SetLocoFunction {
                address,
                function,
                state,
            } => write!(
                f,
                "{name}({},{function},{})",
                address.wire(),
                state.wire_value()
            ),
            DccCommand::SetLocoConfig { address, value } => {
                write!(f, "{name}({},{value})", address.wire())
            }
            DccCommand::GetLocoConfig { address, field } => {
                write!(f, "{name}({},{field})", address.wire())
            }
            DccCommand::SetTurnout { address, direction } => {
                write!(f, "{name}({},{})", address.wire(), direction.wire_value())
            }
            DccCommand::GetS88 { device_count } => write!(f, "{name}({device_count})"),
        }
    }
}
