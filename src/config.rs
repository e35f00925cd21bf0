//! Station configuration.
//!
//! Defaults match the timings the controller firmware expects. Tests shrink
//! them to keep the suite fast.
//!
//! # Example
//!
//! ```rust
//! use rs_dcc::config::{Config, SensorConfig, SerialConfig};
//!
//! // Use defaults
//! let config = Config::default();
//! assert_eq!(config.serial.baud_rate, 115_200);
//!
//! // Or customize
//! let config = Config::default()
//!     .with_serial(SerialConfig::default().with_port("/dev/ttyUSB0"))
//!     .with_sensors(SensorConfig::default().with_device_count(2));
//! ```

use core::time::Duration;

use heapless::String as HString;

use crate::traits::SerialSettings;

/// Maximum length for short config strings (port names)
pub const MAX_SHORT_STRING: usize = 64;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    let mut hs = ShortString::new();
    let take = s.len().min(MAX_SHORT_STRING);
    // Find valid UTF-8 boundary
    let valid_end = s
        .char_indices()
        .take_while(|(i, c)| i + c.len_utf8() <= take)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let _ = hs.push_str(&s[..valid_end]);
    hs
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete station configuration
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Serial line parameters
    pub serial: SerialConfig,
    /// Readiness handshake timing
    pub handshake: HandshakeConfig,
    /// Command engine timing
    pub command: CommandConfig,
    /// S88 sensor cache and poller
    pub sensors: SensorConfig,
    /// HTTP API
    pub web: WebConfig,
}

impl Config {
    /// Set serial configuration
    pub fn with_serial(mut self, serial: SerialConfig) -> Self {
        self.serial = serial;
        self
    }

    /// Set handshake configuration
    pub fn with_handshake(mut self, handshake: HandshakeConfig) -> Self {
        self.handshake = handshake;
        self
    }

    /// Set command engine configuration
    pub fn with_command(mut self, command: CommandConfig) -> Self {
        self.command = command;
        self
    }

    /// Set sensor configuration
    pub fn with_sensors(mut self, sensors: SensorConfig) -> Self {
        self.sensors = sensors;
        self
    }

    /// Set web configuration
    pub fn with_web(mut self, web: WebConfig) -> Self {
        self.web = web;
        self
    }
}

// ============================================================================
// Serial Config
// ============================================================================

/// Serial line configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SerialConfig {
    /// Default port identifier, used when `open` is not given one explicitly
    pub port: ShortString,
    /// Line speed (the controller only speaks 115200)
    pub baud_rate: u32,
    /// Bounded read timeout in milliseconds (1000-3000)
    pub read_timeout_ms: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: short_string("COM3"),
            baud_rate: crate::traits::DEFAULT_BAUD_RATE,
            read_timeout_ms: 3000,
        }
    }
}

impl SerialConfig {
    /// Set the port identifier
    pub fn with_port(mut self, port: &str) -> Self {
        self.port = short_string(port);
        self
    }

    /// Set the read timeout, clamped to 1-3 seconds
    pub fn with_read_timeout_ms(mut self, ms: u32) -> Self {
        self.read_timeout_ms = ms.clamp(1000, 3000);
        self
    }

    /// Build transport settings for `port`
    pub fn settings_for(&self, port: &str) -> SerialSettings {
        SerialSettings {
            port: port.into(),
            baud_rate: self.baud_rate,
            read_timeout: Duration::from_millis(self.read_timeout_ms as u64),
        }
    }
}

// ============================================================================
// Handshake Config
// ============================================================================

/// Readiness handshake timing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HandshakeConfig {
    /// How long to wait for the first greeting bytes
    pub ready_window_ms: u32,
    /// Extra wait for the rest of the greeting after the first bytes
    pub grace_ms: u32,
    /// Poll granularity while waiting for the first bytes
    pub poll_ms: u32,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            ready_window_ms: 3000,
            grace_ms: 1000,
            poll_ms: 100,
        }
    }
}

impl HandshakeConfig {
    /// Set the ready window
    pub fn with_ready_window_ms(mut self, ms: u32) -> Self {
        self.ready_window_ms = ms;
        self
    }

    /// Set the grace period
    pub fn with_grace_ms(mut self, ms: u32) -> Self {
        self.grace_ms = ms;
        self
    }

    /// Set the poll granularity
    pub fn with_poll_ms(mut self, ms: u32) -> Self {
        self.poll_ms = ms.max(1);
        self
    }
}

// ============================================================================
// Command Config
// ============================================================================

/// Command engine timing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommandConfig {
    /// How long a sender waits for the command lock before dropping its command
    pub lock_timeout_ms: u32,
    /// Lock acquisition poll granularity
    pub lock_poll_ms: u32,
    /// Wait after the first response line before draining the rest
    pub settle_ms: u32,
    /// Minimum settle time after a `200 Ok` for ordinary commands
    pub post_success_delay_ms: u32,
    /// Post-success delay for sensor bank queries
    pub sensor_query_delay_ms: u32,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 3000,
            lock_poll_ms: 10,
            settle_ms: 10,
            post_success_delay_ms: 100,
            sensor_query_delay_ms: 5,
        }
    }
}

impl CommandConfig {
    /// Set the lock timeout
    pub fn with_lock_timeout_ms(mut self, ms: u32) -> Self {
        self.lock_timeout_ms = ms;
        self
    }

    /// Set the lock poll granularity
    pub fn with_lock_poll_ms(mut self, ms: u32) -> Self {
        self.lock_poll_ms = ms.max(1);
        self
    }

    /// Set the settle interval
    pub fn with_settle_ms(mut self, ms: u32) -> Self {
        self.settle_ms = ms;
        self
    }

    /// Set the default post-success delay
    pub fn with_post_success_delay_ms(mut self, ms: u32) -> Self {
        self.post_success_delay_ms = ms;
        self
    }

    /// Set the sensor query post-success delay
    pub fn with_sensor_query_delay_ms(mut self, ms: u32) -> Self {
        self.sensor_query_delay_ms = ms;
        self
    }

    /// Default post-success delay as a [`Duration`]
    pub fn post_success_delay(&self) -> Duration {
        Duration::from_millis(self.post_success_delay_ms as u64)
    }

    /// Sensor query post-success delay as a [`Duration`]
    pub fn sensor_query_delay(&self) -> Duration {
        Duration::from_millis(self.sensor_query_delay_ms as u64)
    }
}

// ============================================================================
// Sensor Config
// ============================================================================

/// S88 sensor cache configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorConfig {
    /// Number of S88 devices on the bus
    pub device_count: usize,
    /// Poll granularity of `wait_until_bit_set`
    pub wait_poll_ms: u32,
    /// Default deadline of `wait_until_bit_set`
    pub wait_timeout_ms: u32,
    /// Background poller interval
    pub poll_interval_ms: u32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            device_count: 1,
            wait_poll_ms: 100,
            wait_timeout_ms: 60_000,
            poll_interval_ms: 100,
        }
    }
}

impl SensorConfig {
    /// Set the number of S88 devices (at least one)
    pub fn with_device_count(mut self, count: usize) -> Self {
        self.device_count = count.max(1);
        self
    }

    /// Set the wait poll granularity
    pub fn with_wait_poll_ms(mut self, ms: u32) -> Self {
        self.wait_poll_ms = ms.max(1);
        self
    }

    /// Set the default wait deadline
    pub fn with_wait_timeout_ms(mut self, ms: u32) -> Self {
        self.wait_timeout_ms = ms;
        self
    }

    /// Set the background poll interval
    pub fn with_poll_interval_ms(mut self, ms: u32) -> Self {
        self.poll_interval_ms = ms.max(1);
        self
    }
}

// ============================================================================
// Web Config
// ============================================================================

/// HTTP API configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WebConfig {
    /// Port to listen on
    pub port: u16,
    /// Whether to enable CORS for all origins
    pub cors_permissive: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            cors_permissive: true,
        }
    }
}

impl WebConfig {
    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set CORS mode
    pub fn with_cors(mut self, permissive: bool) -> Self {
        self.cors_permissive = permissive;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.serial.read_timeout_ms, 3000);
        assert_eq!(config.handshake.ready_window_ms, 3000);
        assert_eq!(config.handshake.grace_ms, 1000);
        assert_eq!(config.command.lock_poll_ms, 10);
        assert_eq!(config.command.post_success_delay_ms, 100);
        assert_eq!(config.sensors.wait_timeout_ms, 60_000);
        assert_eq!(config.web.port, 8080);
    }

    #[test]
    fn read_timeout_clamped() {
        let serial = SerialConfig::default().with_read_timeout_ms(10_000);
        assert_eq!(serial.read_timeout_ms, 3000);

        let serial = SerialConfig::default().with_read_timeout_ms(50);
        assert_eq!(serial.read_timeout_ms, 1000);
    }

    #[test]
    fn settings_for_port() {
        let serial = SerialConfig::default().with_read_timeout_ms(2000);
        let settings = serial.settings_for("/dev/ttyACM0");
        assert_eq!(settings.port, "/dev/ttyACM0");
        assert_eq!(settings.baud_rate, 115_200);
        assert_eq!(settings.read_timeout, Duration::from_millis(2000));
    }

    #[test]
    fn builder_pattern() {
        let config = Config::default()
            .with_serial(SerialConfig::default().with_port("/dev/ttyUSB0"))
            .with_command(
                CommandConfig::default()
                    .with_lock_timeout_ms(1000)
                    .with_post_success_delay_ms(0),
            )
            .with_sensors(SensorConfig::default().with_device_count(3))
            .with_web(WebConfig::default().with_port(3000).with_cors(false));

        assert_eq!(config.serial.port.as_str(), "/dev/ttyUSB0");
        assert_eq!(config.command.lock_timeout_ms, 1000);
        assert_eq!(config.command.post_success_delay(), Duration::ZERO);
        assert_eq!(config.sensors.device_count, 3);
        assert_eq!(config.web.port, 3000);
        assert!(!config.web.cors_permissive);
    }

    #[test]
    fn device_count_at_least_one() {
        let sensors = SensorConfig::default().with_device_count(0);
        assert_eq!(sensors.device_count, 1);
    }

    #[test]
    fn sensor_query_delay_shorter_than_default() {
        let command = CommandConfig::default();
        assert!(command.sensor_query_delay() < command.post_success_delay());
    }

    #[test]
    fn short_string_truncation() {
        let long_input = "a".repeat(100);
        let s = short_string(&long_input);
        assert_eq!(s.len(), MAX_SHORT_STRING);
    }

    #[test]
    fn short_string_utf8_boundary() {
        let input = "é".repeat(40); // 2 bytes each
        let s = short_string(&input);
        assert!(s.len() <= MAX_SHORT_STRING);
        assert!(core::str::from_utf8(s.as_bytes()).is_ok());
    }
}
