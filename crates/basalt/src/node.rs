//! `(+)` Node bootstrap & process wiring (§4.7 of SPEC_FULL.md).
//!
//! Not a component spec.md names directly, but required by §6
//! ("Bootstrap") and §7 ("Fatal startup"): assembles the kernel, the store
//! manager, a consensus log, gossip membership, and the four leader-gated
//! controllers into one running replica, and tears them down together on
//! shutdown.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use basalt_config::BasaltConfig;
use basalt_consensus::{ConsensusLog, LocalConsensus, ServerEntry, Suffrage};
use basalt_controllers::health::Metrics as HealthMetrics;
use basalt_controllers::{
    run_health_controller, run_node_sync_controller, run_placement_controller,
};
use basalt_kernel::{Command, Kernel};
use basalt_membership::{run_voter_controller, GossipMembership};
use basalt_store::StoreManager;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{BasaltError, Result};

/// The bound shutdown grace period: how long `shutdown` waits for each
/// controller task to observe the signal and return before giving up on it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A running replica.
///
/// Holds the kernel and store manager (for an embedding process, e.g. an
/// HTTP surface, to read/write through) plus the join handles of every
/// controller task spawned at bootstrap. Dropping a `Node` does not stop
/// its controllers — call [`Node::shutdown`] to do that.
pub struct Node {
    pub kernel: Arc<Kernel>,
    pub store: Arc<StoreManager>,
    consensus: Arc<dyn ConsensusLog>,
    shutdown_tx: broadcast::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
}

impl Node {
    /// Opens/creates the data directory, wires every collaborator named in
    /// §6, bootstraps a single-node configuration or joins via gossip per
    /// `config.bootstrap`, and spawns the voter, node-sync, health, and
    /// placement controllers (§4.7).
    ///
    /// `data_dir` creation failure is the one fatal-startup path this
    /// function owns (§7); everything else (gossip join failures, a
    /// rejected bootstrap proposal) is logged and degrades to "this
    /// replica starts as a non-voting follower" rather than aborting.
    pub async fn bootstrap(
        config: &BasaltConfig,
        gossip: Arc<dyn GossipMembership>,
    ) -> Result<Self> {
        create_data_dir(&config.node.data_dir)?;

        let (consensus_log, mut committed_rx) =
            LocalConsensus::new(config.node.id.clone(), config.node.bind_address.clone());
        let consensus: Arc<dyn ConsensusLog> = Arc::new(consensus_log);

        if config.bootstrap.enabled {
            consensus.bootstrap(vec![ServerEntry {
                id: config.node.id.clone(),
                address: config.node.bind_address.clone(),
                suffrage: Suffrage::Voter,
            }])?;
            info!(node = %config.node.id, "bootstrapped single-node consensus configuration");
        } else {
            match gossip.join(&config.gossip.seeds) {
                Ok(contacted) => info!(contacted, "joined gossip pool"),
                Err(err) => warn!(error = %err, "failed to join gossip pool, starting alone"),
            }
        }

        let kernel = Arc::new(Kernel::new());
        let store = Arc::new(StoreManager::new(Some(Arc::clone(&consensus))));

        // Bridges C1's committed entries into C2 (§2 "Data flow": every
        // replica's kernel sees exactly the same sequence of commands).
        let kernel_for_apply = Arc::clone(&kernel);
        tokio::spawn(async move {
            while let Some(bytes) = committed_rx.recv().await {
                match serde_json::from_slice::<Command>(&bytes) {
                    Ok(command) => kernel_for_apply.apply(command),
                    Err(err) => warn!(error = %err, "dropping undecodable committed entry"),
                }
            }
        });

        let (shutdown_tx, _) = broadcast::channel(1);
        let mut tasks = Vec::with_capacity(4);

        let desired_voters = {
            let kernel = Arc::clone(&kernel);
            let fallback = config.membership.desired_voters;
            move || {
                let configured = kernel.snapshot().config.desired_voters;
                if configured > 0 {
                    configured
                } else {
                    fallback
                }
            }
        };
        tasks.push(tokio::spawn(run_voter_controller(
            Arc::clone(&consensus),
            Arc::clone(&gossip),
            config.gossip.join_token.clone(),
            desired_voters,
            shutdown_tx.subscribe(),
        )));

        tasks.push(tokio::spawn(run_node_sync_controller(
            Arc::clone(&consensus),
            Arc::clone(&gossip),
            Arc::clone(&store),
            config.gossip.join_token.clone(),
            shutdown_tx.subscribe(),
        )));

        let health_metrics = Arc::new(HealthMetrics::default());
        tasks.push(tokio::spawn(run_health_controller(
            Arc::clone(&consensus),
            Arc::clone(&kernel),
            Arc::clone(&store),
            health_metrics,
            Duration::from_secs(config.health.probe_interval_secs),
            shutdown_tx.subscribe(),
        )));

        tasks.push(tokio::spawn(run_placement_controller(
            Arc::clone(&consensus),
            Arc::clone(&kernel),
            Arc::clone(&store),
            shutdown_tx.subscribe(),
        )));

        Ok(Self {
            kernel,
            store,
            consensus,
            shutdown_tx,
            tasks,
        })
    }

    /// Broadcasts the shutdown signal (§5 "Cancellation": every controller
    /// terminates at its next tick boundary), requests a final consensus
    /// snapshot, and waits up to [`SHUTDOWN_GRACE`] for each controller
    /// task to exit.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(());
        if let Err(err) = self.consensus.snapshot() {
            warn!(error = %err, "final snapshot request failed");
        }
        for task in self.tasks.drain(..) {
            if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
                warn!("controller task did not exit within the shutdown grace period");
            }
        }
    }
}

fn create_data_dir(path: &PathBuf) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|source| BasaltError::DataDir {
        path: path.clone(),
        source,
    })
}
