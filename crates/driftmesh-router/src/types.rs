//! Router types.

use std::time::Duration;

use driftmesh_core::constants::{DEFAULT_MAX_AGE_MS, DEFAULT_TTL};
use driftmesh_core::packet::Packet;
use driftmesh_core::types::PeerHash;

use crate::constants::{DEFAULT_MAX_PACKETS, DEFAULT_SPRAY_COUNT};

/// Router tunables, fixed at construction.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Hop budget for locally originated packets.
    pub default_ttl: u8,
    /// Max copies handed to one newly connected peer.
    pub spray_count: usize,
    /// Packet cache capacity.
    pub max_packets: usize,
    /// Packet age limit, milliseconds.
    pub max_age_ms: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            spray_count: DEFAULT_SPRAY_COUNT,
            max_packets: DEFAULT_MAX_PACKETS,
            max_age_ms: DEFAULT_MAX_AGE_MS,
        }
    }
}

/// Action returned by the router for the shell to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterAction {
    /// Surface a locally addressed packet to the application.
    Deliver(Packet),
    /// The packet was newly cached: forward it after the jitter delay,
    /// optionally with a directed next-hop hint for the transport.
    ScheduleForward {
        packet: Packet,
        delay: Duration,
        next_hop: Option<PeerHash>,
    },
    /// Nothing to do (duplicate, hop-exhausted, or refused by the cache).
    None,
}

/// Monotonic traffic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    /// Packets handed to the router, counted before dedup.
    pub received: u64,
    /// Packets delivered locally.
    pub delivered: u64,
    /// Forward copies emitted.
    pub forwarded: u64,
}

/// Outcome of one maintenance pass.
#[derive(Debug)]
pub struct MaintenanceReport {
    /// Stale route entries removed.
    pub pruned_routes: usize,
    /// Action produced by re-injecting the synthetic discovery packet.
    pub action: RouterAction,
}
