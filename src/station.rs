//! The DCC controller client.
//!
//! [`Station`] ties the serial [`Connection`], the [`CommandEngine`] and the
//! [`SensorBank`] together and exposes the controller's operations. It is
//! `Send + Sync`: share it behind an [`Arc`] between the threads driving
//! individual trains. The background poller holds its own reference to the
//! engine and the cache.
//!
//! # Example
//!
//! ```rust
//! use rs_dcc::hal::MockTransport;
//! use rs_dcc::{Config, HandshakeConfig, LocoAddress, LocoDirection, Power, Station};
//!
//! let mock = MockTransport::ready();
//! let config = Config::default()
//!     .with_handshake(HandshakeConfig::default().with_grace_ms(0));
//! let station = Station::new(mock.clone(), config);
//!
//! station.open("COM3").unwrap();
//! assert!(station.set_power(Power::On));
//! station.set_loco_direction(LocoAddress::new(10), LocoDirection::Forward);
//! station.set_loco_speed(LocoAddress::new(10), 400);
//!
//! assert_eq!(
//!     mock.writes(),
//!     vec![
//!         "setPower(1)",
//!         "setLocoDirection(49162,1)",
//!         "setLocoSpeed(49162,400,0)",
//!     ]
//! );
//! station.stop();
//! ```
//!
//! # Degraded Results
//!
//! Command operations never fail loudly. A command that cannot be sent
//! (connection not ready, line busy) or that is not acknowledged is logged,
//! and the operation returns `false` or an empty response. Use
//! [`Station::exchange`] for the typed error.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::address::{LocoAddress, TurnoutAddress};
use crate::cancel::CancelToken;
use crate::commands::DccCommand;
use crate::config::Config;
use crate::connection::{Connection, ConnectionState};
use crate::engine::{CommandEngine, CommandExchange};
use crate::error::{DccError, Result};
use crate::parsing::{self, LocoConfigValue};
use crate::poller::SensorPoller;
use crate::sensors::SensorBank;
use crate::traits::{FunctionState, LocoDirection, Power, Transport, TurnoutDirection};

/// State shared with the poller thread.
struct Core<T: Transport> {
    engine: CommandEngine<T>,
    bank: SensorBank,
}

/// Client for one DesktopStation controller on one serial line.
pub struct Station<T: Transport + 'static> {
    core: Arc<Core<T>>,
    poller: Mutex<Option<SensorPoller>>,
    config: Config,
}

impl<T: Transport + 'static> Station<T> {
    /// Create a closed station over `transport`.
    pub fn new(transport: T, config: Config) -> Self {
        let connection = Connection::new(transport, config.serial.clone(), config.handshake);
        let core = Core {
            engine: CommandEngine::new(connection, config.command),
            bank: SensorBank::new(config.sensors.device_count),
        };
        Self {
            core: Arc::new(core),
            poller: Mutex::new(None),
            config,
        }
    }

    /// Configuration in effect.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn engine(&self) -> &CommandEngine<T> {
        &self.core.engine
    }

    fn poller(&self) -> MutexGuard<'_, Option<SensorPoller>> {
        self.poller.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Open `port` and wait for the controller's readiness greeting.
    pub fn open(&self, port: &str) -> Result<()> {
        self.engine().connection().open(port)
    }

    /// Open the port named in the configuration.
    pub fn open_default(&self) -> Result<()> {
        let port = self.config.serial.port.clone();
        self.open(port.as_str())
    }

    /// Stop polling and release the port. Safe to call in any state.
    ///
    /// Cached sensor readings are discarded with the session.
    pub fn close(&self) {
        self.stop_polling();
        self.engine().connection().close();
        self.core.bank.invalidate_all();
    }

    /// Shutdown: abandon any in-flight command, cut track power, close.
    pub fn stop(&self) {
        info!("station stop");
        self.stop_polling();
        self.engine().force_unlock();

        let connection = self.engine().connection();
        if connection.is_transport_open() && connection.is_ready() {
            let acknowledged = self.set_power(Power::Off);
            if !acknowledged {
                warn!("power off not acknowledged during stop");
            }
        }
        connection.close();
        self.core.bank.invalidate_all();
    }

    /// Current connection state.
    #[inline]
    pub fn state(&self) -> ConnectionState {
        self.engine().connection().state()
    }

    /// Whether commands can be sent.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.engine().connection().is_ready()
    }

    // ---------------------------------------------------------------------
    // Dispatch
    // ---------------------------------------------------------------------

    /// Send a raw command expression; empty response on any failure.
    pub fn send_command(&self, command: &str, post_success_delay: Duration) -> String {
        self.engine().send_command(command, post_success_delay)
    }

    /// Send a raw command expression and return the classified exchange.
    pub fn exchange(&self, command: &str, post_success_delay: Duration) -> Result<CommandExchange> {
        self.engine().exchange(command, post_success_delay)
    }

    /// Send a typed command with its standard post-success delay.
    pub fn execute(&self, command: &DccCommand) -> String {
        let delay = if command.is_sensor_query() {
            self.config.command.sensor_query_delay()
        } else {
            self.config.command.post_success_delay()
        };
        self.send_command(&command.encode(), delay)
    }

    fn acknowledged(&self, command: DccCommand) -> bool {
        parsing::is_success(&self.execute(&command))
    }

    // ---------------------------------------------------------------------
    // Commands
    // ---------------------------------------------------------------------

    /// Connectivity check.
    pub fn ping(&self) -> bool {
        self.acknowledged(DccCommand::Ping)
    }

    /// Switch track power.
    pub fn set_power(&self, power: Power) -> bool {
        self.acknowledged(DccCommand::SetPower(power))
    }

    /// Set locomotive speed with the default speed step.
    pub fn set_loco_speed(&self, address: LocoAddress, speed: u16) -> bool {
        self.acknowledged(DccCommand::loco_speed(address, speed))
    }

    /// Set locomotive speed with an explicit speed step.
    pub fn set_loco_speed_step(&self, address: LocoAddress, speed: u16, speed_step: u8) -> bool {
        self.acknowledged(DccCommand::SetLocoSpeed {
            address,
            speed,
            speed_step,
        })
    }

    /// Set locomotive direction.
    pub fn set_loco_direction(&self, address: LocoAddress, direction: LocoDirection) -> bool {
        self.acknowledged(DccCommand::SetLocoDirection { address, direction })
    }

    /// Switch a locomotive function.
    pub fn set_loco_function(&self, address: LocoAddress, function: u8, state: FunctionState) -> bool {
        self.acknowledged(DccCommand::SetLocoFunction {
            address,
            function,
            state,
        })
    }

    /// Write a decoder configuration value.
    pub fn set_loco_config(&self, address: LocoAddress, value: u32) -> bool {
        self.acknowledged(DccCommand::SetLocoConfig { address, value })
    }

    /// Read a decoder configuration variable; returns the raw response.
    ///
    /// A typical reply is `@CV,49162,8,129,\r\n200 Ok\r\n`.
    pub fn get_loco_config(&self, address: LocoAddress, field: u16) -> String {
        self.execute(&DccCommand::GetLocoConfig { address, field })
    }

    /// Read a decoder configuration variable and decode the report.
    pub fn read_loco_config(&self, address: LocoAddress, field: u16) -> Option<LocoConfigValue> {
        parsing::parse_loco_config(&self.get_loco_config(address, field))
    }

    /// Throw a turnout.
    pub fn set_turnout(&self, address: TurnoutAddress, direction: TurnoutDirection) -> bool {
        self.acknowledged(DccCommand::SetTurnout { address, direction })
    }

    // ---------------------------------------------------------------------
    // Sensors
    // ---------------------------------------------------------------------

    /// Query the bus for `device` without touching the cache.
    pub fn get_sensor_bank(&self, device: usize) -> Option<u32> {
        let response = self.execute(&DccCommand::GetS88 {
            device_count: device,
        });
        parsing::parse_s88(&response, device)
    }

    /// Query `device` and store the result in the cache.
    pub fn refresh_one(&self, device: usize) -> Option<u32> {
        self.core.bank.refresh_one(self.engine(), device)
    }

    /// Refresh every configured device.
    pub fn refresh_all(&self) {
        self.core.bank.refresh_all(self.engine());
    }

    /// Cached sensor input `bit` of `device`; never performs I/O.
    pub fn read_bit(&self, device: usize, bit: u8) -> bool {
        self.core.bank.read_bit(device, bit)
    }

    /// Cached bitfield of `device`, `None` when invalid.
    pub fn sensor_reading(&self, device: usize) -> Option<u32> {
        self.core.bank.reading(device)
    }

    /// Cached bitfields of every device.
    pub fn sensor_snapshot(&self) -> Vec<Option<u32>> {
        self.core.bank.snapshot()
    }

    /// Block until sensor `bit` of `device` reads set or `timeout` elapses.
    ///
    /// Returns `true` if the bit was seen set before the deadline.
    pub fn wait_until_bit_set(&self, device: usize, bit: u8, timeout: Duration) -> bool {
        self.wait_until_bit_set_or_cancel(device, bit, timeout, &CancelToken::new())
    }

    /// [`wait_until_bit_set`](Self::wait_until_bit_set) with the configured
    /// default timeout.
    pub fn wait_for_sensor(&self, device: usize, bit: u8) -> bool {
        let timeout = Duration::from_millis(self.config.sensors.wait_timeout_ms as u64);
        self.wait_until_bit_set(device, bit, timeout)
    }

    /// Like [`wait_until_bit_set`](Self::wait_until_bit_set), but also
    /// returns `false` once `cancel` fires.
    ///
    /// Without an active poller every iteration queries the bus; with one
    /// only the cache is read.
    pub fn wait_until_bit_set_or_cancel(
        &self,
        device: usize,
        bit: u8,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> bool {
        let poll = Duration::from_millis(self.config.sensors.wait_poll_ms.max(1) as u64);
        // A timeout too large to represent never expires.
        let deadline = Instant::now().checked_add(timeout);

        loop {
            if cancel.is_cancelled() {
                debug!(device, bit, "sensor wait cancelled");
                return false;
            }
            if !self.is_polling() {
                self.refresh_one(device);
            }
            if self.read_bit(device, bit) {
                return true;
            }

            let now = Instant::now();
            let remaining = match deadline {
                Some(deadline) if now >= deadline => {
                    warn!(error = %DccError::SensorTimeout { device, bit }, "sensor not arrived");
                    return false;
                }
                Some(deadline) => deadline - now,
                None => poll,
            };
            thread::sleep(poll.min(remaining));
        }
    }

    // ---------------------------------------------------------------------
    // Polling
    // ---------------------------------------------------------------------

    /// Refresh the whole cache now and then every `interval` in the background.
    ///
    /// A poller already running is stopped first.
    pub fn start_polling(&self, interval: Duration) -> Result<()> {
        let mut slot = self.poller();
        if let Some(previous) = slot.take() {
            previous.stop();
        }

        self.core.bank.refresh_all(&self.core.engine);

        let core = Arc::clone(&self.core);
        let poller = SensorPoller::start(interval, move || {
            core.bank.refresh_all(&core.engine);
        })?;
        *slot = Some(poller);
        info!(interval_ms = interval.as_millis() as u64, "sensor polling started");
        Ok(())
    }

    /// [`start_polling`](Self::start_polling) at the configured interval.
    pub fn start_polling_default(&self) -> Result<()> {
        let interval = Duration::from_millis(self.config.sensors.poll_interval_ms as u64);
        self.start_polling(interval)
    }

    /// Stop the poller; no refresh happens after this returns. Idempotent.
    pub fn stop_polling(&self) {
        if let Some(poller) = self.poller().take() {
            poller.stop();
            info!("sensor polling stopped");
        }
    }

    /// Whether the background poller is running.
    pub fn is_polling(&self) -> bool {
        self.poller().is_some()
    }
}

impl<T: Transport + 'static> Drop for Station<T> {
    fn drop(&mut self) {
        self.stop_polling();
    }
}
