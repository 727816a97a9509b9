//! The consensus membership controller (C5): a leader-gated `tokio` task
//! that ticks the planner against live gossip members and drives the
//! consensus log's configuration toward the plan.

use std::sync::Arc;
use std::time::Duration;

use basalt_consensus::ConsensusLog;
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{info, warn};

use crate::gossip::{GossipMembership, MemberStatus};
use crate::planner::plan;

const DEFAULT_TICK: Duration = Duration::from_secs(10);

/// Runs the membership controller until `shutdown` fires. Only acts while
/// this replica is the consensus leader (§4.3).
pub async fn run(
    consensus: Arc<dyn ConsensusLog>,
    gossip: Arc<dyn GossipMembership>,
    join_token: Option<String>,
    desired_voters: impl Fn() -> i32 + Send + Sync + 'static,
    mut shutdown: broadcast::Receiver<()>,
) {
    run_with_tick(
        consensus,
        gossip,
        join_token.as_deref(),
        desired_voters,
        DEFAULT_TICK,
        &mut shutdown,
    )
    .await;
}

async fn run_with_tick(
    consensus: Arc<dyn ConsensusLog>,
    gossip: Arc<dyn GossipMembership>,
    join_token: Option<&str>,
    desired_voters: impl Fn() -> i32,
    tick: Duration,
    shutdown: &mut broadcast::Receiver<()>,
) {
    let mut ticker = interval(tick);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if consensus.state() == basalt_consensus::ConsensusState::Leader {
                    reconcile_once(&consensus, &gossip, join_token, desired_voters());
                }
            }
            _ = shutdown.recv() => {
                info!("membership controller: shutting down");
                return;
            }
        }
    }
}

fn reconcile_once(
    consensus: &Arc<dyn ConsensusLog>,
    gossip: &Arc<dyn GossipMembership>,
    join_token: Option<&str>,
    desired_voters: i32,
) {
    let existing = match consensus.get_configuration() {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!(error = %err, "membership controller: get_configuration failed");
            return;
        }
    };

    // §4.3: only status-Alive members count, and (if a join token is
    // configured) only those presenting a matching `token` tag.
    let alive = gossip
        .members()
        .into_iter()
        .filter(|m| m.status == MemberStatus::Alive)
        .filter(|m| match join_token {
            Some(token) => m.tags.get("token").map(String::as_str) == Some(token),
            None => true,
        })
        .map(|m| (m.id, m.address))
        .collect();

    let result = plan(&existing, &alive, desired_voters);

    for id in &result.add_nonvoters {
        if let Some(address) = alive_address(&alive, id) {
            if let Err(err) = consensus.add_nonvoter(id, &address) {
                warn!(id, error = %err, "membership controller: add_nonvoter failed");
            } else {
                info!(id, address, "membership controller: added nonvoter");
            }
        }
    }

    for id in &result.promote {
        if let Some(address) = alive_address(&alive, id) {
            if let Err(err) = consensus.add_voter(id, &address) {
                warn!(id, error = %err, "membership controller: promote failed");
            }
        }
    }

    for id in &result.demote {
        if let Err(err) = consensus.remove_server(id) {
            warn!(id, error = %err, "membership controller: demote (remove) failed");
            continue;
        }
        if let Some(address) = alive_address(&alive, id) {
            if let Err(err) = consensus.add_nonvoter(id, &address) {
                warn!(id, error = %err, "membership controller: demote (re-add nonvoter) failed");
            }
        }
    }
}

fn alive_address(alive: &std::collections::BTreeMap<String, String>, id: &str) -> Option<String> {
    alive.get(id).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gossip::{Member, StaticMembership};
    use basalt_consensus::LocalConsensus;
    use std::collections::BTreeMap;

    fn member(id: &str) -> Member {
        Member {
            id: id.to_string(),
            address: format!("127.0.0.1:700{id}"),
            status: MemberStatus::Alive,
            tags: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn reconcile_promotes_nonvoters_to_reach_desired_count() {
        let (log, _rx) = LocalConsensus::new("n1", "127.0.0.1:7001");
        let consensus: Arc<dyn ConsensusLog> = Arc::new(log);

        let (membership, _rx2) = StaticMembership::new(member("1"));
        membership.upsert(member("2"));
        let gossip: Arc<dyn GossipMembership> = Arc::new(membership);

        consensus.add_nonvoter("2", "127.0.0.1:7002").unwrap();
        reconcile_once(&consensus, &gossip, None, 2);

        let cfg = consensus.get_configuration().unwrap();
        let n2 = cfg.iter().find(|s| s.id == "2").unwrap();
        assert_eq!(n2.suffrage, basalt_consensus::Suffrage::Voter);
    }

    #[tokio::test]
    async fn failed_members_never_count_toward_alive() {
        let (log, _rx) = LocalConsensus::new("n1", "127.0.0.1:7001");
        let consensus: Arc<dyn ConsensusLog> = Arc::new(log);

        let (membership, _rx2) = StaticMembership::new(member("1"));
        let mut failed = member("2");
        failed.status = MemberStatus::Failed;
        membership.upsert(failed);
        let gossip: Arc<dyn GossipMembership> = Arc::new(membership);

        reconcile_once(&consensus, &gossip, None, 2);

        let cfg = consensus.get_configuration().unwrap();
        assert!(cfg.iter().all(|s| s.id != "2"));
    }

    #[tokio::test]
    async fn mismatched_join_token_excludes_the_member() {
        let (log, _rx) = LocalConsensus::new("n1", "127.0.0.1:7001");
        let consensus: Arc<dyn ConsensusLog> = Arc::new(log);

        let (membership, _rx2) = StaticMembership::new(member("1"));
        let mut untrusted = member("2");
        untrusted.tags.insert("token".to_string(), "wrong".to_string());
        membership.upsert(untrusted);
        let gossip: Arc<dyn GossipMembership> = Arc::new(membership);

        reconcile_once(&consensus, &gossip, Some("secret"), 2);

        let cfg = consensus.get_configuration().unwrap();
        assert!(cfg.iter().all(|s| s.id != "2"));
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let (log, _rx) = LocalConsensus::new("n1", "127.0.0.1:7001");
        let consensus: Arc<dyn ConsensusLog> = Arc::new(log);
        let (membership, _rx2) = StaticMembership::new(member("1"));
        let gossip: Arc<dyn GossipMembership> = Arc::new(membership);

        let (tx, rx) = broadcast::channel(1);
        tx.send(()).unwrap();

        let mut rx = rx;
        run_with_tick(consensus, gossip, None, || 2, Duration::from_millis(10), &mut rx).await;
    }
}
