//! Chainwarden Config - Layered configuration for the verifier binary.
//!
//! # Usage
//!
//! ```rust,no_run
//! use chainwarden_config::{Config, LoadOptions};
//!
//! let resolved = Config::load(&LoadOptions {
//!     workspace_root: Some(".".into()),
//!     ..LoadOptions::default()
//! })
//! .unwrap();
//! println!("backend: {}", resolved.config.backend.kind);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Command-line flags**, applied by the binary after loading
//! 2. **Explicit file** passed with `--config`
//! 3. **Workspace** (`./.chainwarden/config.toml`)
//! 4. **User** (`~/.chainwarden/config.toml`)
//! 5. **Environment variables** (`CHAINWARDEN_*`), fallback only
//! 6. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! This crate depends on no other chainwarden crate. Conversion into
//! verifier, storage and logging types happens in the binary.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Environment variable fallbacks.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered merging with source tracking.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{LoadOptions, ResolvedConfig};
pub use merge::ConfigLayer;
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the
    /// final configuration fails validation.
    pub fn load(options: &LoadOptions) -> ConfigResult<ResolvedConfig> {
        loader::load(options)
    }

    /// Load a single file over the embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or
    /// fails validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
