//! Network services: the HTTP API over a shared station.
//!
//! - `api`: JSON response envelope and payload types
//! - `web`: axum router and server runner
//!
//! # Shared State Pattern
//!
//! One [`Station`](crate::Station) serves every caller. Wrap it in an `Arc`
//! and hand clones to the router, the poller and any scripted train threads:
//!
//! ```ignore
//! use std::sync::Arc;
//! use rs_dcc::services::{build_router, WebServerConfig};
//!
//! let station = Arc::new(Station::new(SerialTransport::new(), config));
//! station.open_default()?;
//!
//! let router = build_router(Arc::clone(&station), &WebServerConfig::default());
//! ```

pub mod api;
pub mod web;

// Re-exports
pub use api::*;
pub use web::*;
