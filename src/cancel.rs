//! Cooperative cancellation for blocking waits.
//!
//! Long sensor waits check a [`CancelToken`] at each polling step. The token
//! is `tokio_util`'s cancellation token, which works from plain threads as
//! well as from async tasks, so the HTTP layer and blocking callers share one
//! type.
//!
//! ```rust
//! use rs_dcc::CancelToken;
//!
//! let token = CancelToken::new();
//! let handle = token.clone();
//! handle.cancel();
//! assert!(token.is_cancelled());
//! ```

/// Shared cancel signal; clones observe the same state.
pub use tokio_util::sync::CancellationToken as CancelToken;
