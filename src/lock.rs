//! Timed mutual exclusion over the single serial line.
//!
//! [`CommandLock`] is not a queue. A sender polls for the lock at a fixed
//! granularity and gives up when its timeout elapses; the command it wanted
//! to send is then dropped. There is no fairness between racing senders:
//! whoever observes the lock free first wins.
//!
//! Holding the lock is represented by a [`CommandGuard`]; dropping the guard
//! releases it. [`CommandLock::force_release`] clears the lock regardless of
//! who holds it (used by the shutdown path). Every acquisition gets a fresh
//! token, so a guard whose hold was forcibly cleared cannot release a later
//! holder when it is eventually dropped.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use rs_dcc::lock::CommandLock;
//!
//! let lock = CommandLock::new(Duration::from_millis(10));
//! let guard = lock.acquire(Duration::from_millis(50)).unwrap();
//!
//! // A second sender times out and is denied.
//! assert!(lock.acquire(Duration::from_millis(30)).is_none());
//!
//! drop(guard);
//! assert!(lock.acquire(Duration::from_millis(30)).is_some());
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Default acquisition poll granularity.
pub const DEFAULT_LOCK_POLL: Duration = Duration::from_millis(10);

/// Busy flag with bounded, polling acquisition.
#[derive(Debug)]
pub struct CommandLock {
    holder: Mutex<Option<u64>>,
    next_token: AtomicU64,
    poll: Duration,
}

impl Default for CommandLock {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_POLL)
    }
}

impl CommandLock {
    /// Create an unlocked lock polling at `poll` granularity.
    pub fn new(poll: Duration) -> Self {
        Self {
            holder: Mutex::new(None),
            next_token: AtomicU64::new(1),
            poll: poll.max(Duration::from_millis(1)),
        }
    }

    fn holder(&self) -> MutexGuard<'_, Option<u64>> {
        self.holder.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the lock if it is free right now.
    pub fn try_acquire(&self) -> Option<CommandGuard<'_>> {
        let mut holder = self.holder();
        if holder.is_some() {
            return None;
        }
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        *holder = Some(token);
        Some(CommandGuard { lock: self, token })
    }

    /// Poll for the lock until it is free or `timeout` elapses.
    ///
    /// Returns `None` on timeout; the caller must then drop its command.
    pub fn acquire(&self, timeout: Duration) -> Option<CommandGuard<'_>> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if let Some(guard) = self.try_acquire() {
                return Some(guard);
            }
            let now = Instant::now();
            let remaining = match deadline {
                Some(deadline) if now >= deadline => return None,
                Some(deadline) => deadline - now,
                None => self.poll,
            };
            thread::sleep(self.poll.min(remaining));
        }
    }

    /// Whether some sender currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.holder().is_some()
    }

    /// Clear the lock no matter who holds it.
    ///
    /// Returns `true` if a hold was abandoned. The abandoned guard becomes
    /// inert.
    pub fn force_release(&self) -> bool {
        self.holder().take().is_some()
    }

    fn release(&self, token: u64) {
        let mut holder = self.holder();
        if *holder == Some(token) {
            *holder = None;
        }
    }
}

/// Proof of holding a [`CommandLock`]. Released on drop.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct CommandGuard<'a> {
    lock: &'a CommandLock,
    token: u64,
}

impl CommandGuard<'_> {
    /// Whether this guard still owns the lock (it may have been force-released).
    pub fn is_held(&self) -> bool {
        *self.lock.holder() == Some(self.token)
    }
}

impl Drop for CommandGuard<'_> {
    fn drop(&mut self) {
        self.lock.release(self.token);
    }
}
