//! Newtype wrappers for pseudonymous addressing.
//!
//! Peers are identified by a one-way hash of their real identifier; the
//! router never sees the raw value. These types keep packet ids and peer
//! pseudonyms from being accidentally mixed with other byte strings.

use core::fmt;

/// Helper to write lowercase hex without allocating.
fn fmt_hex(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for byte in bytes {
        write!(f, "{byte:02x}")?;
    }
    Ok(())
}

/// A 16-byte peer pseudonym (first 128 bits of SHA-256 of the real identifier).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct PeerHash(pub(crate) [u8; 16]);

impl PeerHash {
    /// The unset pseudonym, used when a packet carries no sender.
    pub const UNSET: PeerHash = PeerHash([0u8; 16]);

    /// Broadcast sentinel: never equal to any real pseudonym, so packets
    /// addressed here are cached and forwarded but never delivered locally.
    pub const BROADCAST: PeerHash = PeerHash([0xFF; 16]);

    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Whether this is the unset (empty-sender) pseudonym.
    #[must_use]
    pub fn is_unset(&self) -> bool {
        *self == Self::UNSET
    }

    /// Parse from a hex string. An empty string maps to [`Self::UNSET`].
    pub fn from_hex(s: &str) -> Result<Self, InvalidHash> {
        if s.is_empty() {
            return Ok(Self::UNSET);
        }
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| InvalidHash {
            expected: 32,
            actual: s.len(),
        })?;
        Ok(Self(bytes))
    }

    /// Hex encoding for the wire record. The unset pseudonym encodes as "".
    #[must_use]
    pub fn to_hex(&self) -> String {
        if self.is_unset() {
            return String::new();
        }
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for PeerHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for PeerHash {
    type Error = InvalidHash;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| InvalidHash {
            expected: 16,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for PeerHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_hex(&self.0, f)
    }
}

impl fmt::Debug for PeerHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerHash(")?;
        fmt_hex(&self.0[..4], f)?;
        write!(f, "..)")
    }
}

/// A unique packet id, assigned once at origination and never reused.
///
/// Locally originated ids are `{timestamp_ms:016x}{random:016x}`; ids from
/// other nodes are treated as opaque strings.
#[derive(Clone, PartialEq, Eq, Hash)]
#[must_use]
pub struct PacketId(String);

impl PacketId {
    /// Wrap an id received from the wire.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id from the origination time and a random nonce.
    pub fn generate(timestamp_ms: u64, nonce: u64) -> Self {
        Self(format!("{timestamp_ms:016x}{nonce:016x}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = &self.0[..self.0.len().min(8)];
        write!(f, "PacketId({head}..)")
    }
}

/// Error returned when a byte slice or hex string has the wrong length.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hash: expected {expected} hex chars or bytes, got {actual}")]
pub struct InvalidHash {
    pub expected: usize,
    pub actual: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_hash_construction() {
        let bytes = [1u8; 16];
        let hash = PeerHash::new(bytes);
        assert_eq!(hash.as_ref(), &bytes);
    }

    #[test]
    fn test_peer_hash_try_from_invalid() {
        let bytes = [3u8; 15];
        let err = PeerHash::try_from(bytes.as_ref()).unwrap_err();
        assert_eq!(err.expected, 16);
        assert_eq!(err.actual, 15);
    }

    #[test]
    fn test_display_hex() {
        let hash = PeerHash::new([
            0xab, 0xcd, 0xef, 0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0x01, 0x23, 0x45,
            0x67, 0x89,
        ]);
        assert_eq!(format!("{hash}"), "abcdef0123456789abcdef0123456789");
    }

    #[test]
    fn test_debug_format() {
        let hash = PeerHash::new([
            0xab, 0xcd, 0xef, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
        ]);
        assert_eq!(format!("{hash:?}"), "PeerHash(abcdef01..)");
    }

    #[test]
    fn test_hex_round_trip() {
        let hash = PeerHash::new([0x5a; 16]);
        let hex = hash.to_hex();
        assert_eq!(PeerHash::from_hex(&hex).unwrap(), hash);
    }

    #[test]
    fn test_unset_encodes_as_empty_string() {
        assert_eq!(PeerHash::UNSET.to_hex(), "");
        assert_eq!(PeerHash::from_hex("").unwrap(), PeerHash::UNSET);
        assert!(PeerHash::UNSET.is_unset());
    }

    #[test]
    fn test_from_hex_rejects_bad_length() {
        assert!(PeerHash::from_hex("abcd").is_err());
    }

    #[test]
    fn test_from_hex_rejects_non_hex() {
        assert!(PeerHash::from_hex(&"zz".repeat(16)).is_err());
    }

    #[test]
    fn test_broadcast_is_not_unset() {
        assert!(!PeerHash::BROADCAST.is_unset());
        assert_ne!(PeerHash::BROADCAST, PeerHash::UNSET);
    }

    #[test]
    fn test_packet_id_generate_format() {
        let id = PacketId::generate(0x1234, 0xabcd);
        assert_eq!(id.as_str(), "0000000000001234000000000000abcd");
    }

    #[test]
    fn test_packet_id_distinct_nonces() {
        let a = PacketId::generate(1000, 1);
        let b = PacketId::generate(1000, 2);
        assert_ne!(a, b);
    }
}
