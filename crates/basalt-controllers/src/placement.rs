//! Placement controller (C9): applies the scheduler (C8) to pending VMs,
//! and separately re-places VMs whose node has failed or disappeared.

use std::sync::Arc;
use std::time::Duration;

use basalt_consensus::{ConsensusLog, ConsensusState};
use basalt_kernel::{Command, Kernel};
use basalt_store::StoreManager;
use basalt_types::{NodeStatus, Vm, VmPhase};
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{info, warn};

use crate::scheduler::choose_node;

const SCHEDULE_TICK: Duration = Duration::from_secs(5);
/// 8s, matching the source's migration controller exactly and keeping this
/// tick from aliasing against the 5s schedule tick.
const FAILOVER_TICK: Duration = Duration::from_secs(8);

pub async fn run(
    consensus: Arc<dyn ConsensusLog>,
    kernel: Arc<Kernel>,
    store: Arc<StoreManager>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut schedule_ticker = interval(SCHEDULE_TICK);
    let mut failover_ticker = interval(FAILOVER_TICK);
    loop {
        tokio::select! {
            _ = schedule_ticker.tick() => {
                if consensus.state() == ConsensusState::Leader {
                    schedule_tick(&kernel, &store);
                }
            }
            _ = failover_ticker.tick() => {
                if consensus.state() == ConsensusState::Leader {
                    failover_tick(&kernel, &store);
                }
            }
            _ = shutdown.recv() => {
                info!("placement controller: shutting down");
                return;
            }
        }
    }
}

/// Every 5s: VMs with no node, or still `Pending`, get scheduled and move
/// to `Running`. A VM left `Migrating` by the failover tick also completes
/// here (§4.6: "Migrating → (next tick schedules) → Running") once its
/// target node is confirmed `Alive`; if that node has since gone bad, it is
/// left for the next failover tick to re-place instead.
///
/// Takes an owned list of VMs up front rather than draining `state.vms` in
/// place, so `state` stays whole and can keep being passed to `choose_node`
/// (and have its node allocations updated) as each VM in the tick is
/// placed — two VMs that each individually fit a node's free capacity must
/// not both land there in the same tick (P7).
fn schedule_tick(kernel: &Arc<Kernel>, store: &Arc<StoreManager>) {
    let mut state = kernel.snapshot();
    let pending: Vec<Vm> = state.vms.values().cloned().collect();

    for mut vm in pending {
        if vm.phase == VmPhase::Migrating {
            let node_alive = state
                .nodes
                .get(&basalt_types::NodeId::new(vm.node_id.as_str()))
                .is_some_and(|n| n.status == NodeStatus::Alive);
            if node_alive {
                vm.phase = VmPhase::Running;
                let id = vm.id.clone();
                state.vms.insert(id.clone(), vm.clone());
                if let Err(err) = store.apply(Command::UpsertVm(vm)) {
                    warn!(vm = %id, error = %err, "placement: migration completion failed");
                }
            }
            continue;
        }
        if !(vm.node_id.is_empty() || vm.phase == VmPhase::Pending) {
            continue;
        }
        if let Some(node_id) = choose_node(&state, &vm) {
            vm.node_id = node_id.as_str().to_string();
            vm.phase = VmPhase::Running;
            if let Some(node) = state.nodes.get_mut(&node_id) {
                node.allocated = node.allocated.add(vm.resources);
            }
            let id = vm.id.clone();
            state.vms.insert(id.clone(), vm.clone());
            if let Err(err) = store.apply(Command::UpsertVm(vm)) {
                warn!(vm = %id, error = %err, "placement: schedule failed");
            }
        }
    }
}

/// Every 8s: VMs pointing at a missing or non-Alive node get re-placed and
/// move to `Migrating`. Same owned-list-plus-updated-local-state shape as
/// [`schedule_tick`], so two VMs failing over in the same tick can't both
/// overcommit the same replacement host (P7).
fn failover_tick(kernel: &Arc<Kernel>, store: &Arc<StoreManager>) {
    let mut state = kernel.snapshot();
    let candidates: Vec<Vm> = state.vms.values().cloned().collect();

    for mut vm in candidates {
        // Stopped is operator-terminal (§4.6): a failed host must not pull
        // a Stopped VM back onto Migrating without an operator decision.
        if vm.node_id.is_empty() || vm.phase == VmPhase::Stopped {
            continue;
        }
        let node_alive = state
            .nodes
            .get(&basalt_types::NodeId::new(vm.node_id.as_str()))
            .is_some_and(|n| n.status == NodeStatus::Alive);
        if node_alive {
            continue;
        }
        if let Some(node_id) = choose_node(&state, &vm) {
            let previous_node = basalt_types::NodeId::new(vm.node_id.as_str());
            vm.node_id = node_id.as_str().to_string();
            vm.phase = VmPhase::Migrating;
            if let Some(node) = state.nodes.get_mut(&previous_node) {
                node.allocated = node.allocated.saturating_sub(vm.resources);
            }
            if let Some(node) = state.nodes.get_mut(&node_id) {
                node.allocated = node.allocated.add(vm.resources);
            }
            let id = vm.id.clone();
            state.vms.insert(id.clone(), vm.clone());
            if let Err(err) = store.apply(Command::UpsertVm(vm)) {
                warn!(vm = %id, error = %err, "placement: failover failed");
            }
        }
    }
}
