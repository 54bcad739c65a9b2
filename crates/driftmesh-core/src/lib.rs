//! Core types for the Driftmesh delay-tolerant messaging overlay.
//!
//! This crate holds the leaf-level building blocks shared by the router and
//! node layers: pseudonymous addressing newtypes, pseudonym derivation, the
//! immutable [`packet::Packet`] value type, and the JSON record codec used
//! for cache persistence and peer exchange.

pub mod constants;
pub mod hash;
pub mod packet;
pub mod record;
pub mod types;

pub use hash::peer_hash;
pub use packet::{Packet, PacketKind};
pub use types::{PacketId, PeerHash};
