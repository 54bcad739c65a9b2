//! Routing constants.

/// Age after which a route table entry is considered stale: 60 minutes.
pub const ROUTE_STALE_MS: u64 = 60 * 60 * 1000;

/// Upper bound (exclusive) of the anti-correlation forward jitter window.
pub const FORWARD_JITTER_MS: u64 = 2000;

/// Interval between maintenance passes: 5 minutes.
pub const MAINTENANCE_INTERVAL_SECS: u64 = 300;

/// Default maximum copies handed to one newly connected peer.
pub const DEFAULT_SPRAY_COUNT: usize = 3;

/// Default packet cache capacity.
pub const DEFAULT_MAX_PACKETS: usize = 500;
