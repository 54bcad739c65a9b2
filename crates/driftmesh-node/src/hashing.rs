//! Pseudonym hashing off the event loop.
//!
//! SHA-256 over a short identifier is cheap, but callers hashing contact
//! lists in bulk should not stall the router's event loop. This wrapper
//! moves the digest onto the blocking pool.

use driftmesh_core::{peer_hash, PeerHash};

/// Derive a pseudonym on the blocking thread pool.
///
/// Falls back to hashing inline if the blocking task is cancelled at
/// runtime shutdown.
pub async fn derive_peer_hash(identifier: impl Into<Vec<u8>>) -> PeerHash {
    let bytes = identifier.into();
    let task_bytes = bytes.clone();
    match tokio::task::spawn_blocking(move || peer_hash(&task_bytes)).await {
        Ok(hash) => hash,
        Err(_) => peer_hash(&bytes),
    }
}
