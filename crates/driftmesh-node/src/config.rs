//! TOML-based configuration for Driftmesh nodes.

use std::path::Path;

use serde::Deserialize;

use driftmesh_core::constants::{DEFAULT_MAX_AGE_MS, DEFAULT_TTL};
use driftmesh_router::constants::{DEFAULT_MAX_PACKETS, DEFAULT_SPRAY_COUNT};
use driftmesh_router::RouterConfig;

use crate::error::NodeError;

/// Top-level node configuration loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub node: NodeSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("failed to read config file: {e}")))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(format!("failed to parse config: {e}")))
    }

    /// Router tunables derived from the `[node]` section.
    #[must_use]
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            default_ttl: self.node.default_ttl,
            spray_count: self.node.spray_count,
            max_packets: self.node.max_packets,
            max_age_ms: self.node.max_age_secs * 1000,
        }
    }
}

/// The `[node]` section.
#[derive(Debug, Deserialize)]
pub struct NodeSection {
    /// Raw peer identifier; only its one-way hash ever leaves this process.
    #[serde(default = "default_identifier")]
    pub identifier: String,
    /// Hop budget for locally originated packets. Default: 7.
    #[serde(default = "default_ttl")]
    pub default_ttl: u8,
    /// Max packet copies handed to one newly connected peer. Default: 3.
    #[serde(default = "default_spray_count")]
    pub spray_count: usize,
    /// Packet cache capacity. Default: 500.
    #[serde(default = "default_max_packets")]
    pub max_packets: usize,
    /// Packet age limit in seconds. Default: 86400 (24 hours).
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
    /// Custom storage directory path. Defaults to `~/.driftmesh/storage`.
    pub storage_path: Option<String>,
    /// Interval in seconds between periodic cache persistence. 0 disables. Default: 300.
    #[serde(default = "default_persist_interval")]
    pub persist_interval: u64,
    /// Whether to enable persistent storage. Default: true.
    #[serde(default = "default_enable_storage")]
    pub enable_storage: bool,
}

fn default_identifier() -> String {
    "driftmesh-node".to_string()
}

fn default_ttl() -> u8 {
    DEFAULT_TTL
}

fn default_spray_count() -> usize {
    DEFAULT_SPRAY_COUNT
}

fn default_max_packets() -> usize {
    DEFAULT_MAX_PACKETS
}

fn default_max_age_secs() -> u64 {
    DEFAULT_MAX_AGE_MS / 1000
}

fn default_persist_interval() -> u64 {
    300
}

fn default_enable_storage() -> bool {
    true
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            identifier: default_identifier(),
            default_ttl: default_ttl(),
            spray_count: default_spray_count(),
            max_packets: default_max_packets(),
            max_age_secs: default_max_age_secs(),
            storage_path: None,
            persist_interval: default_persist_interval(),
            enable_storage: default_enable_storage(),
        }
    }
}

/// The `[logging]` section.
#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
