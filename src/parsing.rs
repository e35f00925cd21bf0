//! Response parsing for the controller's text protocol.
//!
//! Responses are free-form ASCII lines. The helpers here look for the fixed
//! markers the firmware emits and pull typed values out of the
//! comma-separated report lines:
//!
//! - greeting: contains `100 Ready`
//! - acknowledgement: contains `200 Ok`
//! - sensor report: `@S88,<v1>,<v2>,...,` with one hex bitfield per device
//! - config report: `@CV,<wire-addr>,<field>,<value>,`
//!
//! Parsing never fails loudly: a report without its marker or with a
//! malformed field yields `None`.

use crate::address::LocoAddress;

/// Greeting marker sent once the controller has finished resetting.
pub const READY_MARKER: &str = "100 Ready";

/// Acknowledgement marker for a successful command.
pub const SUCCESS_MARKER: &str = "200 Ok";

/// Prefix of a sensor bank report.
pub const S88_MARKER: &str = "@S88,";

/// Prefix of a decoder configuration report.
pub const CV_MARKER: &str = "@CV,";

/// Whether a greeting carries the readiness marker.
#[inline]
pub fn is_ready(greeting: &str) -> bool {
    greeting.contains(READY_MARKER)
}

/// Whether a response carries the success marker.
#[inline]
pub fn is_success(response: &str) -> bool {
    response.contains(SUCCESS_MARKER)
}

/// Extract the bitfield of S88 device `index` (1-indexed) from a sensor report.
///
/// Only the report line is considered; field `index` is the `index`-th
/// comma-separated value after the marker, so an acknowledgement on the
/// following line does not corrupt the last field.
///
/// ```rust
/// use rs_dcc::parsing::parse_s88;
///
/// assert_eq!(parse_s88("@S88,0,FF,0A\r\n", 2), Some(255));
/// assert_eq!(parse_s88("@S88,0,FF,0A\r\n", 3), Some(10));
/// assert_eq!(parse_s88("200 Ok\r\n", 1), None);
/// ```
pub fn parse_s88(response: &str, index: usize) -> Option<u32> {
    let start = response.find(S88_MARKER)?;
    if index == 0 {
        return None;
    }
    let report = response[start..].lines().next()?;
    let field = report.split(',').nth(index)?;
    u32::from_str_radix(field.trim(), 16).ok()
}

/// A decoded `@CV` configuration report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocoConfigValue {
    /// Locomotive the report refers to.
    pub address: LocoAddress,
    /// Configuration variable number.
    pub field: u16,
    /// Value read from the decoder.
    pub value: u32,
}

/// Decode a configuration report such as `@CV,49162,8,129,\r\n`.
pub fn parse_loco_config(response: &str) -> Option<LocoConfigValue> {
    let start = response.find(CV_MARKER)?;
    let mut fields = response[start + CV_MARKER.len()..]
        .split(',')
        .map(str::trim);

    let wire: u32 = fields.next()?.parse().ok()?;
    let field: u16 = fields.next()?.parse().ok()?;
    let value: u32 = fields.next()?.parse().ok()?;

    Some(LocoConfigValue {
        address: LocoAddress::from_wire(wire)?,
        field,
        value,
    })
}
