//! Chainwarden Crypto - Digests and hash linking for audit chains.
//!
//! This crate provides:
//! - A fixed-width [`Digest`] with byte-exact equality and hex serialization
//! - [`HashAlgorithm`] selection (SHA-256 reference, BLAKE3 alternative)
//! - The [`HashLinker`] link function and the [`GENESIS`] constant
//!
//! Nothing here performs I/O. Producers and verifiers share these functions
//! so that both sides agree on every `entry_hash`.
//!
//! # Example
//!
//! ```
//! use chainwarden_crypto::{HashAlgorithm, HashLinker, GENESIS};
//!
//! let linker = HashLinker::new(HashAlgorithm::Sha256);
//! let first = linker.link(br#"{"event":"start"}"#, &GENESIS);
//! let second = linker.link(br#"{"event":"stop"}"#, &first);
//!
//! assert_ne!(first, second);
//! println!("tip: {}", second.to_hex());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod digest;
mod error;
mod linker;

pub use digest::{DIGEST_LEN, Digest, HashAlgorithm};
pub use error::{CryptoError, CryptoResult};
pub use linker::{GENESIS, HashLinker};
