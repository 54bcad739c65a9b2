//! Core Node struct and async event loop.
//!
//! The Node owns the [`MeshRouter`] exclusively: every route-table and cache
//! mutation happens sequentially inside the event loop, so there are no
//! concurrent writers. The only parallelism is the set of fire-once jitter
//! timers, each holding nothing but its own captured packet; their firing
//! order between packets is intentionally non-deterministic.

use std::time::{Duration, SystemTime};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use driftmesh_core::packet::Packet;
use driftmesh_core::peer_hash;
use driftmesh_core::types::PeerHash;
use driftmesh_router::constants::MAINTENANCE_INTERVAL_SECS;
use driftmesh_router::{MeshRouter, RouterAction, RouterStats};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::storage::Storage;

/// Current wall-clock time as epoch milliseconds.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A packet the transport should best-effort transmit.
///
/// `next_hop` is a directed/unicast hint when a route is known; a transport
/// that only supports broadcast may ignore it and flood.
#[derive(Debug, Clone)]
pub struct OutboundPacket {
    pub packet: Packet,
    pub next_hop: Option<PeerHash>,
}

/// Commands into the event loop.
#[derive(Debug)]
enum NodeCommand {
    /// A decoded inbound packet from the transport.
    Inbound(Packet),
    /// Originate a message from this node.
    Send {
        recipient: PeerHash,
        payload: Vec<u8>,
    },
    /// A new link came up: reply with the spray-phase packet selection.
    NewPeer {
        reply: oneshot::Sender<Vec<Packet>>,
    },
    /// Snapshot the traffic counters.
    Stats {
        reply: oneshot::Sender<RouterStats>,
    },
}

/// A fired jitter timer, routed back into the event loop.
#[derive(Debug)]
struct ForwardReady {
    packet: Packet,
    next_hop: Option<PeerHash>,
}

/// Handle for talking to a running node.
#[derive(Clone)]
pub struct NodeClient {
    commands: mpsc::Sender<NodeCommand>,
    shutdown_tx: watch::Sender<bool>,
}

impl NodeClient {
    /// Feed a decoded inbound packet into the router.
    pub async fn inbound(&self, packet: Packet) -> Result<(), NodeError> {
        self.commands
            .send(NodeCommand::Inbound(packet))
            .await
            .map_err(|_| NodeError::ShuttingDown)
    }

    /// Originate a message to the given pseudonym.
    pub async fn send(&self, recipient: PeerHash, payload: Vec<u8>) -> Result<(), NodeError> {
        self.commands
            .send(NodeCommand::Send { recipient, payload })
            .await
            .map_err(|_| NodeError::ShuttingDown)
    }

    /// Get the spray-phase packet selection for a newly connected peer.
    /// The caller sends each returned packet to that single peer only.
    pub async fn new_peer(&self) -> Result<Vec<Packet>, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(NodeCommand::NewPeer { reply })
            .await
            .map_err(|_| NodeError::ShuttingDown)?;
        rx.await.map_err(|_| NodeError::ShuttingDown)
    }

    /// Snapshot the router's traffic counters.
    pub async fn stats(&self) -> Result<RouterStats, NodeError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(NodeCommand::Stats { reply })
            .await
            .map_err(|_| NodeError::ShuttingDown)?;
        rx.await.map_err(|_| NodeError::ShuttingDown)
    }

    /// Signal the node to shut down.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Receiving ends of the node's outward event streams.
pub struct NodeEvents {
    /// Fires once per newly, locally delivered packet.
    pub delivered: mpsc::Receiver<Packet>,
    /// Fires once per scheduled forward whose jitter timer has elapsed.
    pub outbound: mpsc::Receiver<OutboundPacket>,
}

/// A Driftmesh node: the router core plus timers, persistence, and events.
pub struct Node {
    config: NodeConfig,
    router: MeshRouter,
    storage: Option<Storage>,
    event_tx: mpsc::Sender<ForwardReady>,
    event_rx: mpsc::Receiver<ForwardReady>,
    commands_rx: mpsc::Receiver<NodeCommand>,
    delivered_tx: mpsc::Sender<Packet>,
    outbound_tx: mpsc::Sender<OutboundPacket>,
    shutdown_rx: watch::Receiver<bool>,
    forward_timers: Vec<JoinHandle<()>>,
}

impl Node {
    /// Create a node from configuration. Returns the node itself plus the
    /// client handle and event receivers the embedding application keeps.
    pub fn new(config: NodeConfig) -> (Self, NodeClient, NodeEvents) {
        let identity = peer_hash(config.node.identifier.as_bytes());
        let router = MeshRouter::new(identity, config.router_config());

        // Initialize storage (non-fatal)
        let storage = if config.node.enable_storage {
            let result = if let Some(ref path) = config.node.storage_path {
                Storage::new(std::path::PathBuf::from(path))
            } else {
                Storage::default_path()
            };
            match result {
                Ok(s) => Some(s),
                Err(e) => {
                    tracing::warn!("failed to initialize storage: {e}");
                    None
                }
            }
        } else {
            None
        };

        let (event_tx, event_rx) = mpsc::channel(1024);
        let (commands_tx, commands_rx) = mpsc::channel(256);
        let (delivered_tx, delivered_rx) = mpsc::channel(256);
        let (outbound_tx, outbound_rx) = mpsc::channel(256);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let client = NodeClient {
            commands: commands_tx,
            shutdown_tx,
        };
        let events = NodeEvents {
            delivered: delivered_rx,
            outbound: outbound_rx,
        };

        let node = Self {
            config,
            router,
            storage,
            event_tx,
            event_rx,
            commands_rx,
            delivered_tx,
            outbound_tx,
            shutdown_rx,
            forward_timers: Vec::new(),
        };
        (node, client, events)
    }

    /// This node's own pseudonym.
    pub fn identity(&self) -> PeerHash {
        self.router.identity()
    }

    /// Load persisted cache state. Call once before [`Self::run`].
    pub async fn start(&mut self) -> Result<(), NodeError> {
        if let Some(ref storage) = self.storage {
            match storage.load_cache(self.router.cache_mut(), now_ms()).await {
                Ok(0) => {}
                Ok(count) => tracing::info!(count, "loaded cached packets"),
                Err(e) => tracing::warn!("failed to load packet cache: {e}"),
            }
        }
        tracing::info!(identity = %self.identity(), "node started");
        Ok(())
    }

    /// Run the event loop until shutdown is signalled, then tear down:
    /// cancel all pending forward timers and persist the cache.
    pub async fn run(mut self) {
        let mut maintenance_interval =
            tokio::time::interval(Duration::from_secs(MAINTENANCE_INTERVAL_SECS));

        let persist_secs = self.config.node.persist_interval;
        let persist_enabled = persist_secs > 0 && self.storage.is_some();
        let mut persist_interval = tokio::time::interval(Duration::from_secs(if persist_enabled {
            persist_secs
        } else {
            3600
        }));

        // Don't fire immediately
        maintenance_interval.tick().await;
        persist_interval.tick().await;

        let mut shutdown_rx = self.shutdown_rx.clone();

        tracing::info!("entering event loop");

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    tracing::info!("shutdown signal received");
                    break;
                }

                command = self.commands_rx.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => {
                            tracing::info!("command channel closed, exiting");
                            break;
                        }
                    }
                }

                event = self.event_rx.recv() => {
                    // The loop holds its own sender, so recv never yields None.
                    if let Some(ForwardReady { packet, next_hop }) = event {
                        self.emit_forward(packet, next_hop).await;
                    }
                }

                _ = maintenance_interval.tick() => {
                    self.run_maintenance();
                }

                _ = persist_interval.tick(), if persist_enabled => {
                    self.persist_state().await;
                }
            }
        }

        self.teardown().await;
    }

    /// Dispatch one command from the client handle.
    async fn handle_command(&mut self, command: NodeCommand) {
        match command {
            NodeCommand::Inbound(packet) => {
                let action = self.router.handle_packet(&packet, now_ms());
                self.execute(action).await;
            }
            NodeCommand::Send { recipient, payload } => {
                let packet = self.router.create_packet(recipient, payload, now_ms());
                tracing::debug!(packet = %packet.id, dest = %recipient, "originated");
                // Local origination is just the self-forward path.
                let action = self.router.handle_packet(&packet, now_ms());
                self.execute(action).await;
            }
            NodeCommand::NewPeer { reply } => {
                let packets = self.router.packets_for_new_peer(now_ms());
                tracing::debug!(count = packets.len(), "spraying to new peer");
                let _ = reply.send(packets);
            }
            NodeCommand::Stats { reply } => {
                let _ = reply.send(self.router.stats());
            }
        }
    }

    /// Execute a router action: surface a delivery or start a jitter timer.
    async fn execute(&mut self, action: RouterAction) {
        match action {
            RouterAction::Deliver(packet) => {
                if self.delivered_tx.send(packet).await.is_err() {
                    tracing::warn!("delivery receiver dropped");
                }
            }
            RouterAction::ScheduleForward {
                packet,
                delay,
                next_hop,
            } => self.schedule_forward(packet, delay, next_hop),
            RouterAction::None => {}
        }
    }

    /// Start a fire-once jitter timer for a newly cached packet. The handle
    /// is collected so teardown can cancel every pending forward.
    fn schedule_forward(&mut self, packet: Packet, delay: Duration, next_hop: Option<PeerHash>) {
        let event_tx = self.event_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = event_tx.send(ForwardReady { packet, next_hop }).await;
        });
        self.forward_timers.retain(|h| !h.is_finished());
        self.forward_timers.push(handle);
    }

    /// A jitter timer fired: build the forward copy and emit it outward.
    async fn emit_forward(&mut self, packet: Packet, next_hop: Option<PeerHash>) {
        let forwarded = self.router.complete_forward(&packet);
        tracing::debug!(
            packet = %forwarded.id,
            ttl = forwarded.ttl,
            directed = next_hop.is_some(),
            "forwarding"
        );
        let outbound = OutboundPacket {
            packet: forwarded,
            next_hop,
        };
        if self.outbound_tx.send(outbound).await.is_err() {
            tracing::warn!("outbound receiver dropped");
        }
    }

    /// Prune stale routes and advertise reachability. The synthetic
    /// discovery packet follows the ordinary forward path.
    fn run_maintenance(&mut self) {
        let report = self.router.run_maintenance(now_ms());
        if let RouterAction::ScheduleForward {
            packet,
            delay,
            next_hop,
        } = report.action
        {
            self.schedule_forward(packet, delay, next_hop);
        }
    }

    /// Persist the packet cache.
    async fn persist_state(&self) {
        if let Some(ref storage) = self.storage {
            if let Err(e) = storage.save_cache(self.router.cache()).await {
                tracing::warn!("failed to persist packet cache: {e}");
            } else {
                tracing::debug!("persisted packet cache");
            }
        }
    }

    /// Cancel every pending forward timer and persist final state.
    async fn teardown(mut self) {
        for handle in self.forward_timers.drain(..) {
            handle.abort();
        }
        self.persist_state().await;
        tracing::info!("node shutdown complete");
    }
}
