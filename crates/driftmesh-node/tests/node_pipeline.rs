//! End-to-end tests of the node event loop: inbound → cache → jitter timer
//! → outbound, local delivery, spray selection, shutdown cancellation, and
//! cache persistence across a restart.
//!
//! Uses `#[tokio::test(start_paused = true)]` so the jitter timers elapse
//! via the runtime's auto-advance instead of wall-clock waits.

use std::time::{Duration, SystemTime};

use driftmesh_core::packet::{Packet, PacketKind};
use driftmesh_core::types::{PacketId, PeerHash};
use driftmesh_core::peer_hash;
use driftmesh_node::{Node, NodeConfig};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn test_config(identifier: &str) -> NodeConfig {
    NodeConfig::parse(&format!(
        r#"
        [node]
        identifier = "{identifier}"
        enable_storage = false
        "#
    ))
    .unwrap()
}

fn make_packet(recipient: PeerHash, ttl: u8) -> Packet {
    Packet {
        id: PacketId::generate(now_ms(), rand_nonce()),
        recipient,
        sender: peer_hash(b"remote-peer"),
        ttl,
        max_ttl: 7,
        payload: b"opaque".to_vec(),
        timestamp: now_ms(),
        kind: PacketKind::Message,
        route_path: vec![],
    }
}

/// Cheap nonce without pulling `rand` into the test crate.
fn rand_nonce() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0)
}

#[tokio::test(start_paused = true)]
async fn relayed_packet_emerges_after_jitter() {
    driftmesh_node::logging::init_for_tests();
    let (node, client, mut events) = Node::new(test_config("relay"));
    let our_hash = node.identity();
    tokio::spawn(node.run());

    let inbound = make_packet(peer_hash(b"someone-else"), 5);
    client.inbound(inbound.clone()).await.unwrap();

    let out = events.outbound.recv().await.expect("forward should emerge");
    assert_eq!(out.packet.id, inbound.id);
    assert_eq!(out.packet.ttl, 4);
    assert_eq!(out.packet.route_path, vec![our_hash]);
    // No route known for the recipient: untargeted spray candidate.
    assert!(out.next_hop.is_none());

    client.shutdown();
}

#[tokio::test(start_paused = true)]
async fn locally_addressed_packet_is_delivered_not_forwarded() {
    let (node, client, mut events) = Node::new(test_config("recipient"));
    let our_hash = node.identity();
    tokio::spawn(node.run());

    let inbound = make_packet(our_hash, 5);
    client.inbound(inbound.clone()).await.unwrap();

    let delivered = events.delivered.recv().await.expect("should deliver");
    assert_eq!(delivered.id, inbound.id);
    assert_eq!(delivered.payload, inbound.payload);

    // Nothing was scheduled outward for a locally addressed packet.
    assert!(events.outbound.try_recv().is_err());

    let stats = client.stats().await.unwrap();
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.forwarded, 0);

    client.shutdown();
}

#[tokio::test(start_paused = true)]
async fn originated_message_self_forwards() {
    let (node, client, mut events) = Node::new(test_config("origin"));
    let our_hash = node.identity();
    tokio::spawn(node.run());

    let recipient = peer_hash(b"far-away");
    client.send(recipient, b"hello".to_vec()).await.unwrap();

    let out = events.outbound.recv().await.expect("origination should emit");
    assert_eq!(out.packet.recipient, recipient);
    assert_eq!(out.packet.sender, our_hash);
    // Created at the default budget of 7, emitted after one local hop.
    assert_eq!(out.packet.ttl, 6);
    assert_eq!(out.packet.max_ttl, 7);

    client.shutdown();
}

#[tokio::test(start_paused = true)]
async fn duplicate_inbound_forwards_once() {
    let (node, client, mut events) = Node::new(test_config("dedup"));
    tokio::spawn(node.run());

    let inbound = make_packet(peer_hash(b"someone-else"), 5);
    client.inbound(inbound.clone()).await.unwrap();
    client.inbound(inbound.clone()).await.unwrap();

    let _ = events.outbound.recv().await.expect("first copy forwards");
    // Give any stray timer a chance to fire, then check nothing else came.
    tokio::time::advance(Duration::from_secs(5)).await;
    assert!(events.outbound.try_recv().is_err());

    let stats = client.stats().await.unwrap();
    assert_eq!(stats.received, 2);
    assert_eq!(stats.forwarded, 1);

    client.shutdown();
}

#[tokio::test(start_paused = true)]
async fn new_peer_spray_is_capped() {
    let (node, client, _events) = Node::new(test_config("sprayer"));
    tokio::spawn(node.run());

    for i in 0..10u8 {
        let mut packet = make_packet(peer_hash(b"someone-else"), 5);
        packet.id = PacketId::new(format!("spray-{i}"));
        client.inbound(packet).await.unwrap();
    }

    let sprayed = client.new_peer().await.unwrap();
    assert_eq!(sprayed.len(), 3);
    for p in &sprayed {
        assert_eq!(p.ttl, 4);
    }

    client.shutdown();
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_pending_forwards() {
    let (node, client, mut events) = Node::new(test_config("teardown"));
    tokio::spawn(node.run());

    let inbound = make_packet(peer_hash(b"someone-else"), 5);
    client.inbound(inbound).await.unwrap();

    // Round-trip a stats request so the inbound command is definitely
    // processed and its jitter timer is pending.
    let stats = client.stats().await.unwrap();
    assert_eq!(stats.received, 1);

    client.shutdown();

    // The pending forward was cancelled, never emitted.
    assert!(events.outbound.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn cache_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let storage_path = dir.path().display().to_string();
    let config_toml = format!(
        r#"
        [node]
        identifier = "persistent"
        storage_path = "{storage_path}"
        "#
    );

    // First life: take one packet in, then shut down (which persists).
    let (mut node, client, mut events) = Node::new(NodeConfig::parse(&config_toml).unwrap());
    node.start().await.unwrap();
    let run = tokio::spawn(node.run());

    let inbound = make_packet(peer_hash(b"someone-else"), 5);
    client.inbound(inbound.clone()).await.unwrap();
    let _ = events.outbound.recv().await.expect("forward should emerge");

    client.shutdown();
    run.await.unwrap();

    // Second life: the cached packet is back and spray-eligible.
    let (mut node, client, _events) = Node::new(NodeConfig::parse(&config_toml).unwrap());
    node.start().await.unwrap();
    tokio::spawn(node.run());

    let sprayed = client.new_peer().await.unwrap();
    assert_eq!(sprayed.len(), 1);
    assert_eq!(sprayed[0].id, inbound.id);

    client.shutdown();
}
