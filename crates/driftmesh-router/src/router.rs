//! The inbound-packet state machine.
//!
//! [`MeshRouter`] owns the route table and packet cache exclusively; every
//! mutation flows through its public methods on a single logical timeline.
//! The router is pure over an explicit `now` parameter and performs no I/O:
//! it returns [`RouterAction`]s, and the async shell executes them (sleeping
//! out the jitter, emitting outbound events, feeding synthetic packets back
//! in).

use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;

use driftmesh_core::packet::{Packet, PacketKind};
use driftmesh_core::types::PeerHash;

use crate::cache::PacketCache;
use crate::constants::FORWARD_JITTER_MS;
use crate::route::RouteTable;
use crate::types::{MaintenanceReport, RouterAction, RouterConfig, RouterStats};

/// Mesh packet router: addressing, hop limiting, passive route learning,
/// dedup, and store-and-forward orchestration.
pub struct MeshRouter {
    identity: PeerHash,
    config: RouterConfig,
    routes: RouteTable,
    cache: PacketCache,
    stats: RouterStats,
}

impl MeshRouter {
    pub fn new(identity: PeerHash, config: RouterConfig) -> Self {
        let cache = PacketCache::new(config.max_packets, config.max_age_ms);
        Self {
            identity,
            config,
            routes: RouteTable::new(),
            cache,
            stats: RouterStats::default(),
        }
    }

    /// This node's own pseudonym.
    pub fn identity(&self) -> PeerHash {
        self.identity
    }

    /// Traffic counters.
    pub fn stats(&self) -> RouterStats {
        self.stats
    }

    /// Shared access to the route table.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Shared access to the packet cache.
    pub fn cache(&self) -> &PacketCache {
        &self.cache
    }

    /// Mutable access to the packet cache, for persistence loading.
    pub fn cache_mut(&mut self) -> &mut PacketCache {
        &mut self.cache
    }

    /// Originate a packet from this node at the configured hop budget.
    ///
    /// The result still goes through [`Self::handle_packet`] like any
    /// inbound packet; origination is just the self-forward path.
    pub fn create_packet(&self, recipient: PeerHash, payload: Vec<u8>, now: u64) -> Packet {
        Packet::originate(
            recipient,
            self.identity,
            payload,
            self.config.default_ttl,
            PacketKind::Message,
            now,
        )
    }

    /// The inbound-packet state machine.
    ///
    /// Dedup → passive route learning → local delivery → cache + scheduled
    /// forward → hop-exhausted drop.
    pub fn handle_packet(&mut self, packet: &Packet, now: u64) -> RouterAction {
        // The received counter covers duplicates too.
        self.stats.received += 1;

        if self.cache.has_seen(&packet.id) {
            tracing::trace!(packet = %packet.id, "duplicate, ignoring");
            return RouterAction::None;
        }

        self.learn_route(packet, now);

        if packet.recipient == self.identity {
            self.cache.mark_delivered(&packet.id);
            self.stats.delivered += 1;
            if packet.kind == PacketKind::RouteDiscovery {
                // Routing-table food only, never surfaced as content.
                tracing::trace!(packet = %packet.id, "discovery consumed");
                return RouterAction::None;
            }
            tracing::debug!(packet = %packet.id, "delivered locally");
            return RouterAction::Deliver(packet.clone());
        }

        if packet.can_forward() {
            if !self.cache.store(packet.clone(), now) {
                return RouterAction::None;
            }
            let delay = Duration::from_millis(rand::thread_rng().gen_range(0..FORWARD_JITTER_MS));
            let next_hop = self.routes.next_hop(&packet.recipient);
            tracing::debug!(
                packet = %packet.id,
                delay_ms = delay.as_millis() as u64,
                directed = next_hop.is_some(),
                "forward scheduled"
            );
            return RouterAction::ScheduleForward {
                packet: packet.clone(),
                delay,
                next_hop,
            };
        }

        tracing::debug!(packet = %packet.id, "hop budget exhausted, dropping");
        RouterAction::None
    }

    /// Build the outbound forward copy once its jitter timer has fired.
    ///
    /// Decrements the hop budget, appends our pseudonym to the hop trail,
    /// and counts the emission.
    pub fn complete_forward(&mut self, packet: &Packet) -> Packet {
        self.stats.forwarded += 1;
        packet.forward(Some(self.identity))
    }

    /// Periodic maintenance: prune stale routes, then advertise our own
    /// reachability by feeding a synthetic zero-payload discovery packet
    /// back through the ordinary inbound pipeline.
    pub fn run_maintenance(&mut self, now: u64) -> MaintenanceReport {
        let pruned_routes = self.routes.prune_stale(now);
        if pruned_routes > 0 {
            tracing::debug!(pruned = pruned_routes, "pruned stale routes");
        }

        let discovery = Packet::originate(
            PeerHash::BROADCAST,
            self.identity,
            Vec::new(),
            self.config.default_ttl,
            PacketKind::RouteDiscovery,
            now,
        );
        let action = self.handle_packet(&discovery, now);

        MaintenanceReport {
            pruned_routes,
            action,
        }
    }

    /// Spray-phase selection for a newly met peer.
    ///
    /// Pulls every forwardable, non-expired cached packet as a
    /// hop-decremented copy; over the spray cap, a uniform shuffle keeps the
    /// per-contact overhead bounded regardless of queue depth.
    pub fn packets_for_new_peer(&mut self, now: u64) -> Vec<Packet> {
        let mut packets = self.cache.get_forwardable(now);
        if packets.len() > self.config.spray_count {
            packets.shuffle(&mut rand::thread_rng());
            packets.truncate(self.config.spray_count);
        }
        packets
    }

    /// Passive route learning from the hop trail of observed traffic.
    ///
    /// The last trail entry claims to be one hop from us and
    /// `max_ttl - ttl` hops from the sender. Claims are unauthenticated and
    /// accepted at face value; the replacement rule in
    /// [`RouteTable::observe`] is the only filter.
    fn learn_route(&mut self, packet: &Packet, now: u64) {
        if packet.sender.is_unset() {
            return;
        }
        let Some(previous_hop) = packet.route_path.last() else {
            return;
        };
        let hops = packet.hops_taken();
        if self.routes.observe(packet.sender, *previous_hop, hops, now) {
            tracing::trace!(
                dest = %packet.sender,
                via = %previous_hop,
                hops,
                "route learned"
            );
        }
    }
}
