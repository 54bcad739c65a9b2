//! Store-and-forward packet cache.
//!
//! A bounded, deduplicating, expiry-aware store of packets awaiting
//! delivery, plus a bounded memo of ids that have already been delivered.
//! Eviction is the sole pressure-relief valve: when the active map is full,
//! the entry with the oldest timestamp is dropped to make room.

use std::collections::{HashMap, HashSet, VecDeque};

use driftmesh_core::packet::Packet;
use driftmesh_core::record::{self, RecordError};
use driftmesh_core::types::PacketId;

/// Bounded dedup/expiry cache of packets awaiting forwarding.
#[must_use]
pub struct PacketCache {
    max_packets: usize,
    max_age_ms: u64,
    active: HashMap<PacketId, Packet>,
    /// Delivered ids in insertion order, oldest first.
    delivered: VecDeque<PacketId>,
    delivered_set: HashSet<PacketId>,
}

impl PacketCache {
    pub fn new(max_packets: usize, max_age_ms: u64) -> Self {
        Self {
            max_packets,
            max_age_ms,
            active: HashMap::new(),
            delivered: VecDeque::new(),
            delivered_set: HashSet::new(),
        }
    }

    /// Store a packet for later forwarding.
    ///
    /// Rejects duplicates (active or already delivered), expired packets,
    /// and packets with no hop budget left. At capacity, the active entry
    /// with the oldest timestamp is evicted first; a linear scan is fine at
    /// this scale. Returns whether the packet was newly stored.
    pub fn store(&mut self, packet: Packet, now: u64) -> bool {
        if self.has_seen(&packet.id) {
            return false;
        }
        if packet.is_expired(now, self.max_age_ms) || !packet.can_forward() {
            return false;
        }

        if self.active.len() >= self.max_packets {
            self.evict_oldest();
        }
        self.active.insert(packet.id.clone(), packet);
        true
    }

    /// Move an id into the delivered memo, discarding any active payload.
    ///
    /// The memo is capped at twice the cache capacity; when it overflows,
    /// the oldest half (rounded down) is dropped.
    pub fn mark_delivered(&mut self, id: &PacketId) {
        self.active.remove(id);
        if self.delivered_set.insert(id.clone()) {
            self.delivered.push_back(id.clone());
        }

        if self.delivered.len() > 2 * self.max_packets {
            let drop_count = self.delivered.len() / 2;
            for dropped in self.delivered.drain(..drop_count) {
                self.delivered_set.remove(&dropped);
            }
        }
    }

    /// Whether this id is active or already delivered.
    #[must_use]
    pub fn has_seen(&self, id: &PacketId) -> bool {
        self.active.contains_key(id) || self.delivered_set.contains(id)
    }

    /// Purge entries that have aged out or lost their hop budget, then
    /// return the remainder as hop-decremented forward copies.
    pub fn get_forwardable(&mut self, now: u64) -> Vec<Packet> {
        let max_age = self.max_age_ms;
        self.active
            .retain(|_, p| p.can_forward() && !p.is_expired(now, max_age));
        self.active.values().map(|p| p.forward(None)).collect()
    }

    /// Number of active packets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether the active map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Size of the delivered memo.
    #[must_use]
    pub fn delivered_len(&self) -> usize {
        self.delivered.len()
    }

    /// Serialize the active entries as an ordered record list, oldest first.
    ///
    /// The delivered memo is ephemeral and does not survive a restart.
    pub fn serialize(&self) -> Result<Vec<u8>, RecordError> {
        let mut packets: Vec<Packet> = self.active.values().cloned().collect();
        packets.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        record::encode_packets(&packets)
    }

    /// Load persisted records into the cache.
    ///
    /// Corrupt records are skipped individually by the codec; records that
    /// have expired or lost their hop budget since being written are skipped
    /// by [`Self::store`]. One bad record never discards the rest. Returns
    /// the number of packets loaded.
    pub fn deserialize(&mut self, bytes: &[u8], now: u64) -> Result<usize, RecordError> {
        let (packets, skipped) = record::decode_packets_lossy(bytes)?;
        if skipped > 0 {
            tracing::warn!(skipped, "skipped corrupt cache records");
        }

        let mut loaded = 0;
        for packet in packets {
            if self.store(packet, now) {
                loaded += 1;
            }
        }
        Ok(loaded)
    }

    /// Evict the single active entry with the oldest timestamp.
    fn evict_oldest(&mut self) {
        let oldest = self
            .active
            .values()
            .min_by_key(|p| p.timestamp)
            .map(|p| p.id.clone());
        if let Some(id) = oldest {
            tracing::debug!(packet = %id, "cache full, evicting oldest");
            self.active.remove(&id);
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use driftmesh_core::packet::PacketKind;
    use driftmesh_core::types::PeerHash;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        /// The active map never exceeds capacity, whatever the store order.
        #[test]
        fn active_count_never_exceeds_capacity(
            capacity in 1..8usize,
            timestamps in proptest::collection::vec(0..10_000u64, 1..64),
        ) {
            let mut cache = PacketCache::new(capacity, u64::MAX);
            for (i, ts) in timestamps.iter().enumerate() {
                let packet = Packet {
                    id: PacketId::new(format!("p{i}")),
                    recipient: PeerHash::new([1; 16]),
                    sender: PeerHash::new([2; 16]),
                    ttl: 3,
                    max_ttl: 7,
                    payload: vec![],
                    timestamp: *ts,
                    kind: PacketKind::Message,
                    route_path: vec![],
                };
                cache.store(packet, *ts);
                prop_assert!(cache.len() <= capacity);
            }
        }
    }
}
