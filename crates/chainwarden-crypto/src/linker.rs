//! Hash linking between consecutive chain entries.
//!
//! ```text
//! entry_hash[0] = H(payload[0] ‖ GENESIS)
//! entry_hash[i] = H(payload[i] ‖ entry_hash[i-1])
//! ```
//!
//! The previous digest is appended as its raw 32 bytes, not as hex.

use crate::digest::{Digest, HashAlgorithm};

/// The publicly known digest that precedes entry 0.
pub const GENESIS: Digest = Digest::zero();

/// Pure, deterministic link function for one hash algorithm.
///
/// Producers use it to compute `entry_hash` at append time; the verifier
/// uses it to recompute every stored hash instead of trusting it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HashLinker {
    algorithm: HashAlgorithm,
}

impl HashLinker {
    /// Create a linker for the given algorithm.
    #[must_use]
    pub const fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// The algorithm this linker hashes with.
    #[must_use]
    pub const fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// The genesis constant.
    #[must_use]
    pub const fn genesis() -> Digest {
        GENESIS
    }

    /// Compute the entry hash for `payload` following `prev_hash`.
    #[must_use]
    pub fn link(&self, payload: &[u8], prev_hash: &Digest) -> Digest {
        self.algorithm
            .digest_parts(&[payload, prev_hash.as_bytes()])
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_is_zero() {
        assert!(HashLinker::genesis().is_zero());
        assert_eq!(HashLinker::genesis(), GENESIS);
    }

    #[test]
    fn test_link_is_deterministic() {
        let linker = HashLinker::default();
        let a = linker.link(b"payload", &GENESIS);
        let b = linker.link(b"payload", &GENESIS);
        assert_eq!(a, b);
    }

    #[test]
    fn test_link_concatenates_raw_prev_bytes() {
        let linker = HashLinker::new(HashAlgorithm::Sha256);
        let prev = HashAlgorithm::Sha256.digest(b"prev");

        let mut input = b"payload".to_vec();
        input.extend_from_slice(prev.as_bytes());

        assert_eq!(
            linker.link(b"payload", &prev),
            HashAlgorithm::Sha256.digest(&input)
        );
    }

    #[test]
    fn test_link_depends_on_prev() {
        let linker = HashLinker::default();
        let other = HashAlgorithm::Sha256.digest(b"x");
        assert_ne!(
            linker.link(b"payload", &GENESIS),
            linker.link(b"payload", &other)
        );
    }

    #[test]
    fn test_chained_links_differ_per_position() {
        let linker = HashLinker::new(HashAlgorithm::Blake3);
        let h0 = linker.link(b"a", &GENESIS);
        let h1 = linker.link(b"a", &h0);
        assert_ne!(h0, h1);
        assert_eq!(linker.link(b"a", &h0), h1);
    }
}
