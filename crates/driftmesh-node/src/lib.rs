//! Async node shell for the Driftmesh routing core.
//!
//! Wraps the pure [`driftmesh_router::MeshRouter`] in a tokio event loop:
//! commands in, delivery and outbound events out, jitter timers for
//! scheduled forwards, periodic maintenance, and cache persistence.

pub mod config;
pub mod error;
pub mod hashing;
pub mod logging;
pub mod node;
pub mod storage;

pub use config::NodeConfig;
pub use error::NodeError;
pub use node::{Node, NodeClient, NodeEvents, OutboundPacket};
