//! Persisted/exchange record codec.
//!
//! Packets cross process boundaries (cache persistence, peer exchange) as an
//! ordered JSON list of records: hex-encoded hashes, base64 payload, RFC 3339
//! timestamp, and a `type` string that defaults to `"message"` when absent.
//! `decode` is the exact inverse of `encode` for every field.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::packet::{Packet, PacketKind};
use crate::types::{InvalidHash, PacketId, PeerHash};

/// Errors from record encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid hash field: {0}")]
    InvalidHash(#[from] InvalidHash),

    #[error("invalid base64 payload: {0}")]
    InvalidPayload(#[from] base64::DecodeError),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Wire representation of one packet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketRecord {
    pub id: String,
    pub recipient_hash: String,
    pub sender_hash: String,
    pub ttl: u8,
    pub max_ttl: u8,
    pub payload: String,
    pub timestamp: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    /// Hop pseudonyms observed so far. Transient routing state: omitted when
    /// empty so the minimal record shape stays eight fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub route_path: Vec<String>,
}

fn default_kind() -> String {
    "message".to_string()
}

/// Encode a packet into its wire record.
#[must_use]
pub fn to_record(packet: &Packet) -> PacketRecord {
    PacketRecord {
        id: packet.id.to_string(),
        recipient_hash: packet.recipient.to_hex(),
        sender_hash: packet.sender.to_hex(),
        ttl: packet.ttl,
        max_ttl: packet.max_ttl,
        payload: BASE64.encode(&packet.payload),
        timestamp: format_timestamp(packet.timestamp),
        kind: packet.kind.as_str().to_string(),
        route_path: packet.route_path.iter().map(PeerHash::to_hex).collect(),
    }
}

/// Decode a wire record back into a packet.
pub fn from_record(record: &PacketRecord) -> Result<Packet, RecordError> {
    let route_path = record
        .route_path
        .iter()
        .map(|h| PeerHash::from_hex(h))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Packet {
        id: PacketId::new(record.id.clone()),
        recipient: PeerHash::from_hex(&record.recipient_hash)?,
        sender: PeerHash::from_hex(&record.sender_hash)?,
        ttl: record.ttl,
        max_ttl: record.max_ttl,
        payload: BASE64.decode(&record.payload)?,
        timestamp: parse_timestamp(&record.timestamp)?,
        kind: PacketKind::from_str_lossy(&record.kind),
        route_path,
    })
}

/// Encode a list of packets as the ordered JSON record list.
pub fn encode_packets(packets: &[Packet]) -> Result<Vec<u8>, RecordError> {
    let records: Vec<PacketRecord> = packets.iter().map(to_record).collect();
    Ok(serde_json::to_vec(&records)?)
}

/// Decode a JSON record list, skipping individually corrupt records.
///
/// A malformed top-level document is an error; a malformed element is not.
/// Returns the decoded packets and the number of records skipped.
pub fn decode_packets_lossy(bytes: &[u8]) -> Result<(Vec<Packet>, usize), RecordError> {
    let values: Vec<serde_json::Value> = serde_json::from_slice(bytes)?;
    let mut packets = Vec::with_capacity(values.len());
    let mut skipped = 0;

    for value in values {
        let decoded = serde_json::from_value::<PacketRecord>(value)
            .map_err(RecordError::from)
            .and_then(|record| from_record(&record));
        match decoded {
            Ok(packet) => packets.push(packet),
            Err(_) => skipped += 1,
        }
    }

    Ok((packets, skipped))
}

/// Format epoch milliseconds as RFC 3339 with millisecond precision.
fn format_timestamp(ms: u64) -> String {
    let dt = Utc
        .timestamp_millis_opt(ms as i64)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 timestamp back to epoch milliseconds.
fn parse_timestamp(s: &str) -> Result<u64, RecordError> {
    let dt = DateTime::parse_from_rfc3339(s)
        .map_err(|e| RecordError::InvalidTimestamp(e.to_string()))?;
    let ms = dt.timestamp_millis();
    if ms < 0 {
        return Err(RecordError::InvalidTimestamp(format!(
            "pre-epoch timestamp: {s}"
        )));
    }
    Ok(ms as u64)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_kind() -> impl Strategy<Value = PacketKind> {
        prop_oneof![
            Just(PacketKind::Message),
            Just(PacketKind::Ack),
            Just(PacketKind::RouteDiscovery),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn record_round_trip(
            recipient in any::<[u8; 16]>(),
            sender in any::<[u8; 16]>(),
            payload in proptest::collection::vec(any::<u8>(), 0..256),
            ttl in 0..16u8,
            extra_budget in 0..16u8,
            timestamp in 0..4_102_444_800_000u64,
            kind in arb_kind(),
        ) {
            let packet = Packet {
                id: PacketId::generate(timestamp, 42),
                recipient: PeerHash::new(recipient),
                sender: PeerHash::new(sender),
                ttl,
                max_ttl: ttl.saturating_add(extra_budget),
                payload,
                timestamp,
                kind,
                route_path: vec![],
            };
            let decoded = from_record(&to_record(&packet)).unwrap();
            prop_assert_eq!(decoded, packet);
        }
    }
}
