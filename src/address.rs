//! Logical-to-wire address mapping.
//!
//! Users number locomotives by their DCC decoder address and turnouts from
//! 1. The controller expects both in its own address space:
//!
//! | Device | Wire address |
//! |--------|--------------|
//! | Locomotive `n` | `n + 0xC000` |
//! | Turnout `n` (1-indexed) | `(n - 1) + 0x3800` |
//!
//! ```rust
//! use rs_dcc::{LocoAddress, TurnoutAddress};
//!
//! assert_eq!(LocoAddress::new(33).wire(), 0xC021);
//! assert_eq!(TurnoutAddress::new(1).unwrap().wire(), 0x3800);
//! ```

use crate::error::{DccError, Result};

/// Offset of the locomotive address space.
pub const LOCO_WIRE_BASE: u32 = 0xC000;

/// Offset of the accessory (turnout) address space.
pub const TURNOUT_WIRE_BASE: u32 = 0x3800;

/// A locomotive decoder address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct LocoAddress(u16);

impl LocoAddress {
    /// Wrap a logical decoder address.
    #[inline]
    pub const fn new(address: u16) -> Self {
        Self(address)
    }

    /// The logical address.
    #[inline]
    pub const fn logical(self) -> u16 {
        self.0
    }

    /// The address sent on the wire.
    #[inline]
    pub const fn wire(self) -> u32 {
        LOCO_WIRE_BASE + self.0 as u32
    }

    /// Recover the logical address from a wire address, if it is one.
    pub fn from_wire(wire: u32) -> Option<Self> {
        wire.checked_sub(LOCO_WIRE_BASE)
            .and_then(|logical| u16::try_from(logical).ok())
            .map(Self)
    }
}

impl From<u16> for LocoAddress {
    fn from(address: u16) -> Self {
        Self::new(address)
    }
}

/// A turnout (accessory) address, numbered from 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TurnoutAddress(u16);

impl TurnoutAddress {
    /// Wrap a logical turnout number. Turnouts are numbered from 1.
    pub fn new(address: u16) -> Result<Self> {
        if address == 0 {
            return Err(DccError::InvalidAddress("turnout addresses start at 1"));
        }
        Ok(Self(address))
    }

    /// The logical (1-indexed) number.
    #[inline]
    pub const fn logical(self) -> u16 {
        self.0
    }

    /// The address sent on the wire.
    #[inline]
    pub const fn wire(self) -> u32 {
        TURNOUT_WIRE_BASE + (self.0 as u32 - 1)
    }
}

impl TryFrom<u16> for TurnoutAddress {
    type Error = DccError;

    fn try_from(address: u16) -> Result<Self> {
        Self::new(address)
    }
}
