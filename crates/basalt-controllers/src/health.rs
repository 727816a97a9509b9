//! Health controller (C7): probes each node's agent `/healthz` endpoint out
//! of band and mirrors liveness back into the RSM as node status changes.

use std::sync::Arc;
use std::time::Duration;

use basalt_consensus::{ConsensusLog, ConsensusState};
use basalt_kernel::{Command, Kernel};
use basalt_store::StoreManager;
use basalt_types::NodeStatus;
use prometheus::{IntCounter, Registry};
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{info, warn};

const DEFAULT_TICK: Duration = Duration::from_secs(15);
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

pub struct Metrics {
    pub registry: Registry,
    pub probe_successes_total: IntCounter,
    pub probe_failures_total: IntCounter,
}

impl Default for Metrics {
    fn default() -> Self {
        let registry = Registry::new();
        let probe_successes_total = IntCounter::new(
            "basalt_health_probe_successes_total",
            "Node health probes that returned 2xx",
        )
        .expect("metric name/help are static and well-formed");
        let probe_failures_total = IntCounter::new(
            "basalt_health_probe_failures_total",
            "Node health probes that failed or returned non-2xx",
        )
        .expect("metric name/help are static and well-formed");
        registry.register(Box::new(probe_successes_total.clone())).unwrap();
        registry.register(Box::new(probe_failures_total.clone())).unwrap();
        Self {
            registry,
            probe_successes_total,
            probe_failures_total,
        }
    }
}

pub async fn run(
    consensus: Arc<dyn ConsensusLog>,
    kernel: Arc<Kernel>,
    store: Arc<StoreManager>,
    metrics: Arc<Metrics>,
    tick: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let tick = if tick.is_zero() { DEFAULT_TICK } else { tick };
    let mut ticker = interval(tick);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if consensus.state() == ConsensusState::Leader {
                    probe_once(&kernel, &store, &metrics).await;
                }
            }
            _ = shutdown.recv() => {
                info!("health controller: shutting down");
                return;
            }
        }
    }
}

/// Probes every node concurrently via a [`JoinSet`] instead of one at a time
/// — with many nodes each blocking up to `PROBE_TIMEOUT` on an unreachable
/// address, a sequential loop could overrun the tick interval entirely.
async fn probe_once(kernel: &Arc<Kernel>, store: &Arc<StoreManager>, metrics: &Arc<Metrics>) {
    let state = kernel.snapshot();
    let mut probes = tokio::task::JoinSet::new();
    for node in state.nodes.into_values() {
        if node.role != basalt_types::NodeRole::Node {
            continue;
        }
        probes.spawn_blocking(move || {
            let reachable = probe(&node.address);
            (node, reachable)
        });
    }

    while let Some(result) = probes.join_next().await {
        let (node, reachable) = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "health controller: probe task panicked");
                continue;
            }
        };

        if reachable {
            metrics.probe_successes_total.inc();
            if node.status != NodeStatus::Alive {
                let mut updated = node;
                updated.status = NodeStatus::Alive;
                let id = updated.id.clone();
                if let Err(err) = store.apply(Command::UpsertNode(updated)) {
                    warn!(node = %id, error = %err, "health controller: mark alive failed");
                }
            }
        } else {
            metrics.probe_failures_total.inc();
            if node.status == NodeStatus::Alive {
                let mut updated = node;
                updated.status = NodeStatus::Failed;
                let id = updated.id.clone();
                if let Err(err) = store.apply(Command::UpsertNode(updated)) {
                    warn!(node = %id, error = %err, "health controller: mark failed failed");
                }
            }
        }
    }
}

/// Synchronous `GET http://{address}/healthz`; any non-2xx or transport
/// error counts as unreachable. Runs inside `spawn_blocking` — `ureq` has
/// no tokio footprint of its own (it is the sync HTTP client chosen
/// specifically so probes don't need an async client pulled in just for
/// this one out-of-band check).
fn probe(address: &str) -> bool {
    let url = format!("http://{address}/healthz");
    ureq::get(&url)
        .timeout(PROBE_TIMEOUT)
        .call()
        .map(|resp| resp.status() / 100 == 2)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_start_at_zero() {
        let metrics = Metrics::default();
        assert_eq!(metrics.probe_successes_total.get(), 0);
        assert_eq!(metrics.probe_failures_total.get(), 0);
    }

    #[test]
    fn unreachable_address_counts_as_down() {
        // Port 0 on loopback never accepts connections.
        assert!(!probe("127.0.0.1:0"));
    }
}
