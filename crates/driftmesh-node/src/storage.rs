//! Packet cache persistence for Driftmesh nodes.
//!
//! Persists the active entries of the packet cache across restarts as the
//! ordered JSON record list. The delivered memo is ephemeral by design and
//! is never written. Uses atomic writes (write to `.tmp`, then rename) to
//! prevent corruption.

use std::path::{Path, PathBuf};

use tokio::fs;

use driftmesh_router::PacketCache;

/// File name for the serialized packet cache.
const CACHE_FILE: &str = "packet_cache";

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("failed to determine storage directory: {0}")]
    Directory(String),
}

/// Persistent storage for node state.
pub struct Storage {
    base_dir: PathBuf,
}

impl Storage {
    /// Create a new storage instance, creating the directory if needed.
    ///
    /// # Note
    /// This performs blocking I/O (`create_dir_all`). Call at startup before
    /// the async runtime is under load.
    pub fn new(base_dir: PathBuf) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Create storage at the default path (`~/.driftmesh/storage`).
    ///
    /// # Note
    /// This performs blocking I/O (`create_dir_all`). Call at startup before
    /// the async runtime is under load.
    pub fn default_path() -> Result<Self, StorageError> {
        let home = dirs::home_dir()
            .ok_or_else(|| StorageError::Directory("could not determine home directory".into()))?;
        Self::new(home.join(".driftmesh").join("storage"))
    }

    /// Save the active cache entries.
    pub async fn save_cache(&self, cache: &PacketCache) -> Result<(), StorageError> {
        let bytes = cache
            .serialize()
            .map_err(|e| StorageError::Serialize(e.to_string()))?;
        self.atomic_write(&self.base_dir.join(CACHE_FILE), &bytes)
            .await
    }

    /// Load persisted records into the cache. Returns the number of packets
    /// loaded; a missing file loads nothing. Records that are individually
    /// corrupt, expired, or hop-exhausted are skipped by the cache.
    pub async fn load_cache(&self, cache: &mut PacketCache, now: u64) -> Result<usize, StorageError> {
        let path = self.base_dir.join(CACHE_FILE);
        match fs::read(&path).await {
            Ok(bytes) => cache
                .deserialize(&bytes, now)
                .map_err(|e| StorageError::Deserialize(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    /// Write data atomically: write to a `.tmp` file then rename.
    async fn atomic_write(&self, path: &Path, data: &[u8]) -> Result<(), StorageError> {
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, data).await?;
        fs::rename(&tmp_path, path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftmesh_core::packet::{Packet, PacketKind};
    use driftmesh_core::types::{PacketId, PeerHash};

    const MAX_AGE: u64 = 60_000;

    fn make_packet(seed: u8, timestamp: u64) -> Packet {
        Packet {
            id: PacketId::new(format!("stored-{seed}")),
            recipient: PeerHash::new([0x10; 16]),
            sender: PeerHash::new([seed; 16]),
            ttl: 3,
            max_ttl: 7,
            payload: vec![seed],
            timestamp,
            kind: PacketKind::Message,
            route_path: vec![],
        }
    }

    #[tokio::test]
    async fn test_cache_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf()).unwrap();

        let mut cache = PacketCache::new(10, MAX_AGE);
        cache.store(make_packet(1, 100), 100);
        cache.store(make_packet(2, 200), 200);
        storage.save_cache(&cache).await.unwrap();

        let mut restored = PacketCache::new(10, MAX_AGE);
        let loaded = storage.load_cache(&mut restored, 300).await.unwrap();
        assert_eq!(loaded, 2);
        assert!(restored.has_seen(&PacketId::new("stored-1")));
        assert!(restored.has_seen(&PacketId::new("stored-2")));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf()).unwrap();

        let mut cache = PacketCache::new(10, MAX_AGE);
        let loaded = storage.load_cache(&mut cache, 0).await.unwrap();
        assert_eq!(loaded, 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf()).unwrap();

        let mut cache = PacketCache::new(10, MAX_AGE);
        cache.store(make_packet(1, 100), 100);
        storage.save_cache(&cache).await.unwrap();

        cache.mark_delivered(&PacketId::new("stored-1"));
        storage.save_cache(&cache).await.unwrap();

        let mut restored = PacketCache::new(10, MAX_AGE);
        let loaded = storage.load_cache(&mut restored, 200).await.unwrap();
        assert_eq!(loaded, 0);
    }

    #[tokio::test]
    async fn test_corrupt_file_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf()).unwrap();
        std::fs::write(dir.path().join(CACHE_FILE), b"{truncated").unwrap();

        let mut cache = PacketCache::new(10, MAX_AGE);
        let result = storage.load_cache(&mut cache, 0).await;
        assert!(matches!(result, Err(StorageError::Deserialize(_))));
    }
}
