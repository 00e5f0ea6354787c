//! Prelude module - commonly used types for convenient import.
//!
//! Use `use chainwarden_crypto::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use chainwarden_crypto::prelude::*;
//!
//! let linker = HashLinker::default();
//! let digest = linker.link(b"payload", &GENESIS);
//! assert_eq!(linker.algorithm(), HashAlgorithm::Sha256);
//! assert!(!digest.is_zero());
//! ```

// Errors
pub use crate::{CryptoError, CryptoResult};

// Digests
pub use crate::{DIGEST_LEN, Digest, HashAlgorithm};

// Linking
pub use crate::{GENESIS, HashLinker};
