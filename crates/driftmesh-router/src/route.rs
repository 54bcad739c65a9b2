//! Distance-vector route table.
//!
//! Routes are learned passively from the hop trails of forwarded traffic.
//! Claims are unauthenticated by design: any forwarder may assert any hop
//! distance, and the table takes the claim at face value. The only defenses
//! are the strictly-smaller-hop-count replacement rule and staleness pruning.

use std::collections::HashMap;

use driftmesh_core::types::PeerHash;

use crate::constants::ROUTE_STALE_MS;

/// Best-known route to one destination pseudonym.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    /// Pseudonym of the peer to hand the packet to next.
    pub next_hop: PeerHash,
    /// Claimed hop distance to the destination.
    pub hop_count: u8,
    /// When this entry was last updated, epoch milliseconds.
    pub last_updated: u64,
}

impl RouteEntry {
    /// Whether the entry has gone stale. Uses strict `>` comparison.
    #[must_use]
    pub fn is_stale(&self, now: u64) -> bool {
        now.saturating_sub(self.last_updated) > ROUTE_STALE_MS
    }
}

/// Mapping from destination pseudonym to best-known next hop.
#[derive(Debug, Default)]
#[must_use]
pub struct RouteTable {
    entries: HashMap<PeerHash, RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Get the route entry for a destination.
    #[must_use]
    pub fn get(&self, dest: &PeerHash) -> Option<&RouteEntry> {
        self.entries.get(dest)
    }

    /// Get the next hop toward a destination, if one is known.
    #[must_use]
    pub fn next_hop(&self, dest: &PeerHash) -> Option<PeerHash> {
        self.entries.get(dest).map(|e| e.next_hop)
    }

    /// Record an observed route to `dest` via `next_hop` at `hop_count` hops.
    ///
    /// A new observation replaces an existing entry only when its hop count
    /// is strictly smaller; ties keep the incumbent, preventing route
    /// flapping between equal-cost claims. Returns whether the table changed.
    pub fn observe(&mut self, dest: PeerHash, next_hop: PeerHash, hop_count: u8, now: u64) -> bool {
        match self.entries.get(&dest) {
            Some(existing) if hop_count >= existing.hop_count => false,
            _ => {
                self.entries.insert(
                    dest,
                    RouteEntry {
                        next_hop,
                        hop_count,
                        last_updated: now,
                    },
                );
                true
            }
        }
    }

    /// Drop every stale entry. Returns the number of entries removed.
    pub fn prune_stale(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_stale(now));
        before - self.entries.len()
    }

    /// Number of entries in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> impl Iterator<Item = (&PeerHash, &RouteEntry)> {
        self.entries.iter()
    }
}
