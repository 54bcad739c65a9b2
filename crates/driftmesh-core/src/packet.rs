//! The routable packet value type.
//!
//! A packet is immutable after construction: forwarding produces a fresh
//! copy with a decremented hop budget rather than mutating in place. The
//! payload is opaque, already-encrypted bytes that the router never inspects.

use crate::types::{PacketId, PeerHash};

/// Packet discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// Ordinary application payload.
    Message,
    /// Delivery acknowledgement.
    Ack,
    /// Routing-table food: carries distance-vector data, never surfaced
    /// as content at the recipient.
    RouteDiscovery,
}

impl PacketKind {
    /// Wire string for the persisted/exchange record.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PacketKind::Message => "message",
            PacketKind::Ack => "ack",
            PacketKind::RouteDiscovery => "route_discovery",
        }
    }

    /// Parse from the wire string. Unknown strings map to `Message`, and a
    /// missing `type` field defaults to `Message` at the codec layer.
    #[must_use]
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "ack" => PacketKind::Ack,
            "route_discovery" => PacketKind::RouteDiscovery,
            _ => PacketKind::Message,
        }
    }
}

/// One routable unit of the mesh overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Packet {
    /// Unique per origination; never reused.
    pub id: PacketId,
    /// Pseudonym of the destination peer.
    pub recipient: PeerHash,
    /// Pseudonym of the originating peer, or [`PeerHash::UNSET`].
    pub sender: PeerHash,
    /// Remaining hop budget.
    pub ttl: u8,
    /// Original hop budget, fixed at creation.
    pub max_ttl: u8,
    /// Opaque, already-encrypted bytes.
    pub payload: Vec<u8>,
    /// Creation time, epoch milliseconds. Drives expiry and eviction order.
    pub timestamp: u64,
    /// Discriminator.
    pub kind: PacketKind,
    /// Pseudonyms of the hops traversed so far, appended by each forwarder.
    /// Used only for passive route learning; length capped at `max_ttl`.
    pub route_path: Vec<PeerHash>,
}

impl Packet {
    /// Originate a new packet at full hop budget with a fresh id.
    pub fn originate(
        recipient: PeerHash,
        sender: PeerHash,
        payload: Vec<u8>,
        ttl: u8,
        kind: PacketKind,
        now_ms: u64,
    ) -> Self {
        Self {
            id: PacketId::generate(now_ms, rand::random::<u64>()),
            recipient,
            sender,
            ttl,
            max_ttl: ttl,
            payload,
            timestamp: now_ms,
            kind,
            route_path: Vec::new(),
        }
    }

    /// Whether this packet has hop budget left.
    #[must_use]
    pub fn can_forward(&self) -> bool {
        self.ttl > 0
    }

    /// Whether this packet has aged out. Uses strict `>` comparison.
    #[must_use]
    pub fn is_expired(&self, now_ms: u64, max_age_ms: u64) -> bool {
        now_ms.saturating_sub(self.timestamp) > max_age_ms
    }

    /// Number of hops this packet has already taken.
    #[must_use]
    pub fn hops_taken(&self) -> u8 {
        self.max_ttl.saturating_sub(self.ttl)
    }

    /// Produce the forward copy: hop budget decremented, all other fields
    /// copied verbatim. When `via` is given, it is appended to the route
    /// path unless the path already holds `max_ttl` entries.
    pub fn forward(&self, via: Option<PeerHash>) -> Self {
        let mut route_path = self.route_path.clone();
        if let Some(hop) = via {
            if route_path.len() < self.max_ttl as usize {
                route_path.push(hop);
            }
        }
        Self {
            id: self.id.clone(),
            recipient: self.recipient,
            sender: self.sender,
            ttl: self.ttl.saturating_sub(1),
            max_ttl: self.max_ttl,
            payload: self.payload.clone(),
            timestamp: self.timestamp,
            kind: self.kind,
            route_path,
        }
    }
}
