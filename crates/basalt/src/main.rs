//! `basaltd`: the Basalt control-plane daemon entry point.
//!
//! Loads layered configuration, wires a single replica (§4.7), and runs it
//! until SIGINT/SIGTERM, at which point it requests a final consensus
//! snapshot and waits for every controller to stop (§5 "Cancellation").

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use basalt::Node;
use basalt_config::BasaltConfig;
use basalt_membership::{GossipMembership, Member, StaticMembership};
use clap::Parser;

/// Basalt cluster control-plane daemon.
#[derive(Parser, Debug)]
#[command(name = "basaltd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// This node's id. Overrides configuration and environment when set.
    #[arg(long)]
    node_id: Option<String>,

    /// Data directory for this node's consensus log and snapshots.
    #[arg(long)]
    data_dir: Option<std::path::PathBuf>,

    /// Address this node's consensus/RPC listener binds to.
    #[arg(long)]
    bind: Option<String>,

    /// Propose this node as the sole voter of a brand-new cluster (§6
    /// "Bootstrap"). Only meaningful the first time a fresh data directory
    /// is started.
    #[arg(long)]
    bootstrap: bool,

    /// Shared token gossip members must present to be admitted as nodes.
    #[arg(long)]
    join_token: Option<String>,

    /// Seed addresses to join the gossip pool through, comma-separated.
    #[arg(long, value_delimiter = ',')]
    join: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = resolve_config(cli).context("failed to load configuration")?;

    tracing::info!(
        node_id = %config.node.id,
        data_dir = %config.node.data_dir.display(),
        bind = %config.node.bind_address,
        bootstrap = config.bootstrap.enabled,
        "starting basaltd"
    );

    let (membership, _events) = StaticMembership::new(Member {
        id: config.node.id.clone(),
        address: config.node.bind_address.clone(),
        status: basalt_membership::MemberStatus::Alive,
        tags: BTreeMap::new(),
    });
    let gossip: Arc<dyn GossipMembership> = Arc::new(membership);

    let node = Node::bootstrap(&config, gossip)
        .await
        .context("node bootstrap failed")?;

    println!();
    println!("basaltd is running. Press Ctrl+C to stop.");
    println!();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    tracing::info!("shutdown signal received, stopping controllers");
    node.shutdown().await;

    Ok(())
}

fn resolve_config(cli: Cli) -> Result<BasaltConfig> {
    let mut config = BasaltConfig::load()?;

    if let Some(node_id) = cli.node_id {
        config.node.id = node_id;
    }
    if config.node.id.is_empty() {
        config.node.id = std::env::var("HOSTNAME").unwrap_or_else(|_| "basalt-node".to_string());
    }
    if let Some(data_dir) = cli.data_dir {
        config.node.data_dir = data_dir;
    }
    if let Some(bind) = cli.bind {
        config.node.bind_address = bind;
    }
    if cli.bootstrap {
        config.bootstrap.enabled = true;
    }
    if cli.join_token.is_some() {
        config.gossip.join_token = cli.join_token;
    }
    if !cli.join.is_empty() {
        config.gossip.seeds = cli.join;
    }

    Ok(config)
}
