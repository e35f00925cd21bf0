//! Background sensor polling.
//!
//! A [`SensorPoller`] owns one named thread that runs a tick callback, then
//! waits on a channel for `interval`. The wait doubles as the cancel point:
//! a stop message or a dropped sender ends the loop, so no tick can start
//! after [`SensorPoller::stop`] returns.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use tracing::{debug, error};

/// Name given to the polling thread.
pub const POLLER_THREAD_NAME: &str = "s88-poller";

/// Handle to a running poller thread.
#[derive(Debug)]
pub struct SensorPoller {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
    interval: Duration,
}

impl SensorPoller {
    /// Spawn the poller. `tick` runs once per `interval`, starting after the
    /// first interval has elapsed.
    pub fn start<F>(interval: Duration, mut tick: F) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let thread = thread::Builder::new()
            .name(POLLER_THREAD_NAME.to_string())
            .spawn(move || {
                debug!(interval_ms = interval.as_millis() as u64, "poller started");
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => tick(),
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("poller stopped");
            })?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
            interval,
        })
    }

    /// Tick interval.
    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Cancel the pending tick and wait for the thread to exit.
    ///
    /// A tick already running is allowed to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            // The thread may already be gone; disconnect stops it either way.
            let _ = tx.try_send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("poller thread panicked");
            }
        }
    }
}

impl Drop for SensorPoller {
    fn drop(&mut self) {
        self.shutdown();
    }
}
