//! Protocol constants.

/// Default hop budget for locally originated packets.
pub const DEFAULT_TTL: u8 = 7;

/// Default maximum packet age before expiry: 24 hours, in milliseconds.
pub const DEFAULT_MAX_AGE_MS: u64 = 24 * 60 * 60 * 1000;
