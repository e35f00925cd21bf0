//! Value types for the controller's device commands.
//!
//! Every type maps to the integer the controller expects on the wire via
//! `wire_value()`, and can be parsed from loose text (`from_text`) for the
//! HTTP API.
//!
//! | Type | Wire values |
//! |------|-------------|
//! | [`Power`] | `0` off, `1` on |
//! | [`LocoDirection`] | `1` forward, `2` reverse |
//! | [`TurnoutDirection`] | `0` straight, `1` diverging |
//! | [`FunctionState`] | `0` off, `1` on |

/// Track power.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Power {
    /// Track power off.
    #[default]
    Off,
    /// Track power on.
    On,
}

impl Power {
    /// Wire value used by `setPower`.
    #[inline]
    pub const fn wire_value(self) -> u8 {
        match self {
            Power::Off => 0,
            Power::On => 1,
        }
    }
}

impl From<bool> for Power {
    fn from(on: bool) -> Self {
        if on {
            Power::On
        } else {
            Power::Off
        }
    }
}

/// Direction of travel of a DCC locomotive.
///
/// Unlike a DC throttle there is no "stopped" direction; a locomotive is
/// stopped by setting its speed to zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LocoDirection {
    /// Forward (wire value 1).
    #[default]
    Forward,
    /// Reverse (wire value 2).
    Reverse,
}

impl LocoDirection {
    /// Wire value used by `setLocoDirection`.
    #[inline]
    pub const fn wire_value(self) -> u8 {
        match self {
            LocoDirection::Forward => 1,
            LocoDirection::Reverse => 2,
        }
    }

    /// The opposite direction.
    #[inline]
    pub const fn reversed(self) -> Self {
        match self {
            LocoDirection::Forward => LocoDirection::Reverse,
            LocoDirection::Reverse => LocoDirection::Forward,
        }
    }

    /// Returns the direction as a lowercase string.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            LocoDirection::Forward => "forward",
            LocoDirection::Reverse => "reverse",
        }
    }

    /// Parse direction from text input.
    ///
    /// Accepts `forward`/`fwd`/`1` and `reverse`/`rev`/`2`, trimmed and
    /// case-insensitive.
    ///
    /// # Examples
    ///
    /// ```
    /// use rs_dcc::LocoDirection;
    ///
    /// assert_eq!(LocoDirection::from_text("fwd"), Some(LocoDirection::Forward));
    /// assert_eq!(LocoDirection::from_text(" 2 "), Some(LocoDirection::Reverse));
    /// assert_eq!(LocoDirection::from_text("stopped"), None);
    /// ```
    pub fn from_text(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" | "fwd" | "1" => Some(LocoDirection::Forward),
            "reverse" | "rev" | "2" => Some(LocoDirection::Reverse),
            _ => None,
        }
    }
}

/// Position of a turnout (track switch).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TurnoutDirection {
    /// Straight route (wire value 0).
    #[default]
    Straight,
    /// Diverging route (wire value 1).
    Diverging,
}

impl TurnoutDirection {
    /// Wire value used by `setTurnout`.
    #[inline]
    pub const fn wire_value(self) -> u8 {
        match self {
            TurnoutDirection::Straight => 0,
            TurnoutDirection::Diverging => 1,
        }
    }

    /// The other route.
    #[inline]
    pub const fn toggled(self) -> Self {
        match self {
            TurnoutDirection::Straight => TurnoutDirection::Diverging,
            TurnoutDirection::Diverging => TurnoutDirection::Straight,
        }
    }

    /// Parse a turnout position from text (`straight`/`0`, `diverging`/`curved`/`1`).
    pub fn from_text(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "straight" | "0" => Some(TurnoutDirection::Straight),
            "diverging" | "curved" | "1" => Some(TurnoutDirection::Diverging),
            _ => None,
        }
    }
}

/// State of a locomotive function (lights, horn, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FunctionState {
    /// Function off.
    #[default]
    Off,
    /// Function on.
    On,
}

impl FunctionState {
    /// Wire value used by `setLocoFunction`.
    #[inline]
    pub const fn wire_value(self) -> u8 {
        match self {
            FunctionState::Off => 0,
            FunctionState::On => 1,
        }
    }
}

impl From<bool> for FunctionState {
    fn from(on: bool) -> Self {
        if on {
            FunctionState::On
        } else {
            FunctionState::Off
        }
    }
}
