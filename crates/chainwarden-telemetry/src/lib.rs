//! Chainwarden Telemetry - Log subscriber setup for chainwarden binaries.
//!
//! Library crates only emit `tracing` events. A binary calls
//! [`setup_logging`] once to decide where those events go and how they look.
//! Logs default to stderr so that stdout stays free for report artifacts.
//!
//! # Example
//!
//! ```rust,no_run
//! use chainwarden_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), chainwarden_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("chainwarden_audit=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!(chain_id = "orders", "Verifying");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging,
};
