//! Mesh routing and store-and-forward for the Driftmesh overlay.
//!
//! Combines passive distance-vector route learning, bounded-flood
//! (spray-and-wait) fallback, TTL-based hop limiting, anti-traffic-analysis
//! jitter, and an eviction/expiry-governed packet cache. Everything here is
//! synchronous and pure over an explicit clock; the async shell lives in
//! `driftmesh-node`.

pub mod cache;
pub mod constants;
pub mod route;
pub mod router;
pub mod types;

pub use cache::PacketCache;
pub use route::{RouteEntry, RouteTable};
pub use router::MeshRouter;
pub use types::{MaintenanceReport, RouterAction, RouterConfig, RouterStats};
