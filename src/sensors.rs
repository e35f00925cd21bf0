//! Cached S88 sensor state.
//!
//! One slot per S88 device, 1-indexed. A slot holds the last bitfield read
//! from the bus or [`INVALID_READING`] when the last refresh failed. Slots
//! are plain atomics: readers never block the poller and may observe a
//! reading one refresh old.

use std::sync::atomic::{AtomicI64, Ordering};

use tracing::{debug, warn};

use crate::commands::DccCommand;
use crate::engine::CommandEngine;
use crate::error::DccError;
use crate::parsing;
use crate::traits::Transport;

/// Slot content meaning "no valid reading".
pub const INVALID_READING: i64 = -1;

/// Per-device cached bitfields.
#[derive(Debug)]
pub struct SensorBank {
    slots: Box<[AtomicI64]>,
}

impl SensorBank {
    /// A bank of `device_count` devices (at least one), all invalid.
    pub fn new(device_count: usize) -> Self {
        let slots = (0..device_count.max(1))
            .map(|_| AtomicI64::new(INVALID_READING))
            .collect();
        Self { slots }
    }

    /// Number of configured devices.
    #[inline]
    pub fn device_count(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, device: usize) -> Option<&AtomicI64> {
        device.checked_sub(1).and_then(|i| self.slots.get(i))
    }

    /// Store a reading for `device`; `None` marks it invalid.
    ///
    /// Out-of-range devices are ignored.
    pub fn store(&self, device: usize, reading: Option<u32>) {
        if let Some(slot) = self.slot(device) {
            let raw = reading.map_or(INVALID_READING, i64::from);
            slot.store(raw, Ordering::Release);
        }
    }

    /// Last valid bitfield of `device`.
    pub fn reading(&self, device: usize) -> Option<u32> {
        let raw = self.slot(device)?.load(Ordering::Acquire);
        u32::try_from(raw).ok()
    }

    /// Sensor input `bit` (1-indexed) of `device` from the cache.
    ///
    /// An invalid reading or an out-of-range device or bit reads as `false`.
    ///
    /// ```rust
    /// use rs_dcc::sensors::SensorBank;
    ///
    /// let bank = SensorBank::new(1);
    /// bank.store(1, Some(0x0A));
    /// assert!(bank.read_bit(1, 2));
    /// assert!(!bank.read_bit(1, 1));
    /// ```
    pub fn read_bit(&self, device: usize, bit: u8) -> bool {
        if !(1..=32).contains(&bit) {
            return false;
        }
        self.reading(device)
            .is_some_and(|value| (value >> (bit - 1)) & 1 == 1)
    }

    /// Mark every device invalid.
    pub fn invalidate_all(&self) {
        for slot in self.slots.iter() {
            slot.store(INVALID_READING, Ordering::Release);
        }
    }

    /// Every slot in device order.
    pub fn snapshot(&self) -> Vec<Option<u32>> {
        (1..=self.device_count()).map(|d| self.reading(d)).collect()
    }

    /// Query `device` over `engine` and cache the result.
    ///
    /// Returns the stored reading; a failed exchange or an unparseable
    /// report stores the invalid sentinel.
    pub fn refresh_one<T: Transport>(&self, engine: &CommandEngine<T>, device: usize) -> Option<u32> {
        if self.slot(device).is_none() {
            warn!(device, "sensor device out of range");
            return None;
        }

        let command = DccCommand::GetS88 {
            device_count: device,
        };
        let response = engine.send_command(&command.encode(), engine.config().sensor_query_delay());
        let reading = parsing::parse_s88(&response, device);

        match reading {
            Some(value) => debug!(device, value, "sensor bank"),
            None => warn!(error = %DccError::SensorReadInvalid { device }, "sensor refresh failed"),
        }
        self.store(device, reading);
        reading
    }

    /// Refresh every device in ascending order.
    pub fn refresh_all<T: Transport>(&self, engine: &CommandEngine<T>) {
        for device in 1..=self.device_count() {
            self.refresh_one(engine, device);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CommandConfig, HandshakeConfig, SerialConfig};
    use crate::connection::Connection;
    use crate::hal::MockTransport;

    fn ready_engine(mock: &MockTransport) -> CommandEngine<MockTransport> {
        let handshake = HandshakeConfig::default()
            .with_ready_window_ms(50)
            .with_grace_ms(0)
            .with_poll_ms(5);
        let connection = Connection::new(mock.clone(), SerialConfig::default(), handshake);
        let engine = CommandEngine::new(
            connection,
            CommandConfig::default()
                .with_settle_ms(1)
                .with_sensor_query_delay_ms(0),
        );
        engine.connection().open("COM3").unwrap();
        engine
    }

    #[test]
    fn starts_invalid() {
        let bank = SensorBank::new(3);
        assert_eq!(bank.device_count(), 3);
        assert_eq!(bank.snapshot(), vec![None, None, None]);
        assert!(!bank.read_bit(1, 1));
    }

    #[test]
    fn at_least_one_device() {
        assert_eq!(SensorBank::new(0).device_count(), 1);
    }

    #[test]
    fn read_bit_on_ten() {
        let bank = SensorBank::new(1);
        bank.store(1, Some(10));
        assert!(bank.read_bit(1, 2));
        assert!(bank.read_bit(1, 4));
        assert!(!bank.read_bit(1, 1));
        assert!(!bank.read_bit(1, 3));
    }

    #[test]
    fn invalidate_all_clears_every_slot() {
        let bank = SensorBank::new(2);
        bank.store(1, Some(1));
        bank.store(2, Some(0));
        bank.invalidate_all();
        assert_eq!(bank.snapshot(), vec![None, None]);
        assert!(!bank.read_bit(1, 1));
    }

    #[test]
    fn out_of_range_reads_false() {
        let bank = SensorBank::new(1);
        bank.store(1, Some(u32::MAX));
        assert!(bank.read_bit(1, 32));
        assert!(!bank.read_bit(1, 0));
        assert!(!bank.read_bit(1, 33));
        assert!(!bank.read_bit(0, 1));
        assert!(!bank.read_bit(2, 1));
        bank.store(5, Some(1));
        assert_eq!(bank.reading(5), None);
    }

    #[test]
    fn invalid_reading_reads_false() {
        let bank = SensorBank::new(1);
        bank.store(1, Some(0xFF));
        bank.store(1, None);
        assert_eq!(bank.reading(1), None);
        assert!(!bank.read_bit(1, 1));
    }

    #[test]
    fn refresh_parses_requested_device() {
        let mock = MockTransport::ready().respond_with("@S88,0,FF,0A\r\n200 Ok\r\n");
        let engine = ready_engine(&mock);
        let bank = SensorBank::new(3);

        assert_eq!(bank.refresh_one(&engine, 3), Some(10));
        assert_eq!(bank.refresh_one(&engine, 2), Some(255));
        assert_eq!(mock.writes(), vec!["getS88(3)", "getS88(2)"]);
    }

    #[test]
    fn failed_refresh_stores_invalid() {
        let mock = MockTransport::ready().respond_with("300 Error\r\n");
        let engine = ready_engine(&mock);
        let bank = SensorBank::new(1);
        bank.store(1, Some(1));

        assert_eq!(bank.refresh_one(&engine, 1), None);
        assert_eq!(bank.reading(1), None);
    }

    #[test]
    fn refresh_all_ascending() {
        let mock = MockTransport::ready().respond_with("@S88,1,2\r\n200 Ok\r\n");
        let engine = ready_engine(&mock);
        let bank = SensorBank::new(2);

        bank.refresh_all(&engine);
        assert_eq!(mock.writes(), vec!["getS88(1)", "getS88(2)"]);
        assert_eq!(bank.snapshot(), vec![Some(1), Some(2)]);
    }

    #[test]
    fn refresh_out_of_range_sends_nothing() {
        let mock = MockTransport::ready();
        let engine = ready_engine(&mock);
        let bank = SensorBank::new(1);
        assert_eq!(bank.refresh_one(&engine, 4), None);
        assert_eq!(mock.bytes_written(), 0);
    }
}
