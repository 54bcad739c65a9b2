//! Pseudonym derivation.
//!
//! A peer pseudonym is the first 16 bytes of SHA-256 over the raw peer
//! identifier. The hash is one-way: nothing downstream of this function
//! ever needs the raw identifier again.

use sha2::{Digest, Sha256};

use crate::types::PeerHash;

/// Derive the pseudonym for a raw peer identifier.
pub fn peer_hash(identifier: &[u8]) -> PeerHash {
    let digest = Sha256::digest(identifier);
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    PeerHash::new(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_hash_is_deterministic() {
        assert_eq!(peer_hash(b"alice"), peer_hash(b"alice"));
    }

    #[test]
    fn test_distinct_identifiers_distinct_hashes() {
        assert_ne!(peer_hash(b"alice"), peer_hash(b"bob"));
    }

    #[test]
    fn test_known_vector() {
        // SHA-256("") = e3b0c44298fc1c149afbf4c8996fb924...
        let h = peer_hash(b"");
        assert_eq!(format!("{h}"), "e3b0c44298fc1c149afbf4c8996fb924");
    }
}
