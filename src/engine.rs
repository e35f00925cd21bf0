//! Command dispatch and response assembly.
//!
//! The protocol is half-duplex with a single outstanding request. One
//! exchange is:
//!
//! 1. refuse unless the connection is ready (`NotOpen`)
//! 2. take the [`CommandLock`], or drop the command on timeout (`LockTimeout`)
//! 3. write the command line
//! 4. read one line, wait the settle interval, drain whatever else arrived
//! 5. on `200 Ok` hold the lock for the caller's post-success delay,
//!    otherwise log a reply error
//! 6. release the lock (guard drop, also on error)
//!
//! Some commands emit secondary lines a few milliseconds after the
//! acknowledgement; step 4 collects them without blocking indefinitely.

use std::io;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::commands::LINE_TERMINATOR;
use crate::config::CommandConfig;
use crate::connection::Connection;
use crate::error::{DccError, Result};
use crate::lock::CommandLock;
use crate::parsing;
use crate::traits::Transport;

/// One request/response unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandExchange {
    /// Command expression as sent, without terminator.
    pub command: String,
    /// Raw accumulated response text.
    pub response: String,
    /// Whether the response carried the success marker.
    pub success: bool,
}

impl CommandExchange {
    /// Classify a response.
    pub fn new(command: impl Into<String>, response: impl Into<String>) -> Self {
        let response = response.into();
        Self {
            command: command.into(),
            success: parsing::is_success(&response),
            response,
        }
    }

    /// The response text if acknowledged, otherwise a `ReplyError`.
    pub fn into_result(self) -> Result<String> {
        if self.success {
            Ok(self.response)
        } else {
            Err(DccError::ReplyError {
                response: self.response,
            })
        }
    }
}

/// Serializes commands over one [`Connection`].
pub struct CommandEngine<T: Transport> {
    connection: Connection<T>,
    lock: CommandLock,
    config: CommandConfig,
}

impl<T: Transport> CommandEngine<T> {
    /// Build an engine over `connection`.
    pub fn new(connection: Connection<T>, config: CommandConfig) -> Self {
        let lock = CommandLock::new(Duration::from_millis(config.lock_poll_ms as u64));
        Self {
            connection,
            lock,
            config,
        }
    }

    /// The connection this engine drives.
    #[inline]
    pub fn connection(&self) -> &Connection<T> {
        &self.connection
    }

    /// The command lock.
    #[inline]
    pub fn lock(&self) -> &CommandLock {
        &self.lock
    }

    /// Engine timing.
    #[inline]
    pub fn config(&self) -> &CommandConfig {
        &self.config
    }

    /// Send one command and assemble its response.
    pub fn exchange(&self, command: &str, post_success_delay: Duration) -> Result<CommandExchange> {
        if !self.connection.is_ready() {
            warn!(command, "connection not open, command dropped");
            return Err(DccError::NotOpen);
        }

        let timeout_ms = self.config.lock_timeout_ms as u64;
        let Some(_guard) = self.lock.acquire(Duration::from_millis(timeout_ms)) else {
            warn!(command, timeout_ms, "command line busy, command dropped");
            return Err(DccError::LockTimeout { timeout_ms });
        };

        let response = self.transact(command).map_err(|e| {
            error!(command, error = %e, "transport error during exchange");
            DccError::from(e)
        })?;

        let exchange = CommandExchange::new(command, response);
        if exchange.success {
            thread::sleep(post_success_delay);
        } else {
            warn!(command, response = %exchange.response.trim_end(), "reply error");
        }
        Ok(exchange)
    }

    fn transact(&self, command: &str) -> io::Result<String> {
        let mut transport = self.connection.transport();
        transport.clear_input()?;

        let line = format!("{command}{LINE_TERMINATOR}");
        transport.write_all(line.as_bytes())?;
        debug!(command, "sent");

        let mut response = transport.read_line()?;
        thread::sleep(Duration::from_millis(self.config.settle_ms as u64));
        response.push_str(&transport.read_available()?);
        debug!(command, response = %response.trim_end(), "received");
        Ok(response)
    }

    /// Send one command, degrading every failure to an empty response.
    ///
    /// Failures are logged by [`exchange`](Self::exchange).
    pub fn send_command(&self, command: &str, post_success_delay: Duration) -> String {
        self.exchange(command, post_success_delay)
            .map(|exchange| exchange.response)
            .unwrap_or_default()
    }

    /// Abandon any in-progress hold on the command lock.
    ///
    /// Shutdown only: the previous holder is not waited for.
    pub fn force_unlock(&self) -> bool {
        let abandoned = self.lock.force_release();
        if abandoned {
            warn!("command lock forcibly released");
        }
        abandoned
    }
}
