use std::path::PathBuf;

use clap::Parser;

use driftmesh_node::{Node, NodeConfig};

#[derive(Parser)]
#[command(name = "driftmesh-node", about = "Driftmesh store-and-forward mesh node")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/driftmesh/config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match NodeConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load config from {}: {e}", cli.config.display());
            std::process::exit(1);
        }
    };

    // Initialize logging
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        driftmesh_node::logging::init_json(&config.logging.level);
    } else {
        driftmesh_node::logging::init(&config.logging.level);
    }

    let (mut node, client, mut events) = Node::new(config);

    // Spawn signal handler
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("received SIGINT, shutting down");
        client.shutdown();
    });

    // Drain node events until a transport is wired in.
    tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(out) = events.outbound.recv() => {
                    tracing::info!(
                        packet = %out.packet.id,
                        directed = out.next_hop.is_some(),
                        "outbound packet ready (no transport attached)"
                    );
                }
                Some(packet) = events.delivered.recv() => {
                    tracing::info!(packet = %packet.id, "packet delivered locally");
                }
                else => break,
            }
        }
    });

    if let Err(e) = node.start().await {
        tracing::error!("failed to start node: {e}");
        std::process::exit(1);
    }

    node.run().await;
}
