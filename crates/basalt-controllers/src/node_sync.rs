//! Node-sync controller (C6): mirrors gossip membership into the RSM as
//! [`Node`](basalt_types::Node) objects. Leader-gated; never touches
//! `voter` (that is the membership controller's concern, C5).

use std::sync::Arc;
use std::time::Duration;

use basalt_consensus::{ConsensusLog, ConsensusState};
use basalt_kernel::Command;
use basalt_membership::{GossipMembership, Member, MemberStatus};
use basalt_store::StoreManager;
use basalt_types::{Node, NodeId, NodeRole, NodeStatus, Resources};
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{info, warn};

const DEFAULT_TICK: Duration = Duration::from_secs(5);
const DEFAULT_CPU_MILLICORES: i64 = 8000;
const DEFAULT_MEMORY_MIB: i64 = 32768;
const DEFAULT_DISK_GIB: i64 = 512;

pub async fn run(
    consensus: Arc<dyn ConsensusLog>,
    gossip: Arc<dyn GossipMembership>,
    store: Arc<StoreManager>,
    join_token: Option<String>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(DEFAULT_TICK);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if consensus.state() == ConsensusState::Leader {
                    sync_once(&gossip, &store, join_token.as_deref());
                }
            }
            _ = shutdown.recv() => {
                info!("node-sync controller: shutting down");
                return;
            }
        }
    }
}

fn sync_once(gossip: &Arc<dyn GossipMembership>, store: &Arc<StoreManager>, join_token: Option<&str>) {
    for member in gossip.members() {
        // Only members gossiping role=node are mirrored into the RSM as
        // Node objects (§4.4) — control-plane peers are the membership
        // controller's concern (C5), not this one.
        if member.tags.get("role").map(String::as_str) != Some("node") {
            continue;
        }

        if let Some(token) = join_token {
            let presented = member.tags.get("token").map(String::as_str).unwrap_or("");
            if presented != token {
                continue;
            }
        }

        let node = member_to_node(&member);
        if let Err(err) = store.apply(Command::UpsertNode(node)) {
            warn!(id = %member.id, error = %err, "node-sync: upsert failed");
        }
    }
}

/// Builds a [`Node`] from a gossip member, parsing the `cpu`/`memory`/`disk`
/// capacity tags (falling back to defaults when absent or unparsable),
/// appending the `http` tag as a port suffix to the gossip-provided address
/// when present, and carrying the member's own liveness status (§4.4 —
/// later corrected, per node, by the health controller's own probes).
fn member_to_node(member: &Member) -> Node {
    let cpu = parse_tag(member, "cpu", DEFAULT_CPU_MILLICORES);
    let memory = parse_tag(member, "memory", DEFAULT_MEMORY_MIB);
    let disk = parse_tag(member, "disk", DEFAULT_DISK_GIB);

    let address = match member.tags.get("http") {
        Some(port) if !port.is_empty() => format!("{}:{}", member.address, port),
        _ => member.address.clone(),
    };

    let role = match member.tags.get("role").map(String::as_str) {
        Some("control-plane") => NodeRole::ControlPlane,
        _ => NodeRole::Node,
    };

    let status = match member.status {
        MemberStatus::Alive => NodeStatus::Alive,
        MemberStatus::Failed => NodeStatus::Failed,
        MemberStatus::Left => NodeStatus::Left,
    };

    Node {
        id: NodeId::new(member.id.clone()),
        address,
        role,
        voter: false,
        capacity: Resources {
            cpu_millicores: cpu,
            memory_mib: memory,
            disk_gib: disk,
        },
        allocated: Resources::ZERO,
        labels: member.tags.clone(),
        taints: Default::default(),
        status,
    }
}

fn parse_tag(member: &Member, key: &str, default: i64) -> i64 {
    member
        .tags
        .get(key)
        .and_then(|value| value.parse::<i64>().ok())
        .unwrap_or(default)
}
