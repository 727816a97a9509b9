//! The pure reducer: `apply(state, command)`.
//!
//! No IO, no clocks, no randomness — every rule here is the same rule
//! spec.md §4.1 describes, plus the UpsertVM decrement strategy SPEC_FULL.md
//! resolves (the source's own two divergent paths are reconciled by having
//! `UpsertVm` explicitly decrement the VM's *previous* node before crediting
//! its new one, so repeated `UpsertVm` calls without an intervening
//! `UpsertNode` still hold invariant I1).

use basalt_types::{ClusterState, NodeId, Resources};
use tracing::debug;

use crate::command::Command;

pub(crate) fn apply(state: &mut ClusterState, command: Command) {
    match command {
        Command::UpsertNode(mut node) => {
            // Recomputation is authoritative (§4.1): overrides any
            // caller-supplied `allocated`, iterating VMs in id order so the
            // sum (commutative) can never depend on iteration order.
            let mut allocated = Resources::ZERO;
            for vm in state.vms.values() {
                if vm.node_id == node.id.as_str() {
                    allocated = allocated.add(vm.resources);
                }
            }
            node.allocated = allocated;
            state.nodes.insert(node.id.clone(), node);
        }
        Command::DeleteNode(id) => {
            state.nodes.remove(&id);
        }
        Command::UpsertVm(vm) => {
            // Decrement whatever the VM previously contributed to its prior
            // node, unconditionally — covers a move, a resize, or a no-op
            // re-upsert alike, and pairs with the credit below so the net
            // effect of a same-node re-upsert is zero.
            if let Some(previous) = state.vms.get(&vm.id) {
                if previous.has_node() {
                    if let Some(node) = state.nodes.get_mut(&NodeId::new(previous.node_id.as_str())) {
                        node.allocated = node.allocated.saturating_sub(previous.resources);
                    }
                }
            }

            // Credit the VM's new node (I5: unknown node id just skips this).
            if vm.has_node() {
                if let Some(node) = state.nodes.get_mut(&NodeId::new(vm.node_id.as_str())) {
                    node.allocated = node.allocated.add(vm.resources);
                } else {
                    debug!(node_id = %vm.node_id, vm_id = %vm.id, "upsert_vm references unknown node");
                }
            }

            state.vms.insert(vm.id.clone(), vm);
        }
        Command::DeleteVm(id) => {
            if let Some(vm) = state.vms.remove(&id) {
                if vm.has_node() {
                    if let Some(node) = state.nodes.get_mut(&NodeId::new(vm.node_id.as_str())) {
                        node.allocated = node.allocated.saturating_sub(vm.resources);
                    }
                }
            }
        }
        Command::UpsertNetwork(network) => {
            state.networks.insert(network.id.clone(), network);
        }
        Command::DeleteNetwork(id) => {
            state.networks.remove(&id);
        }
        Command::UpsertStoragePool(pool) => {
            state.storage_pools.insert(pool.id.clone(), pool);
        }
        Command::DeleteStoragePool(id) => {
            state.storage_pools.remove(&id);
        }
        Command::UpsertVolume(volume) => {
            state.volumes.insert(volume.id.clone(), volume);
        }
        Command::DeleteVolume(id) => {
            state.volumes.remove(&id);
        }
        Command::UpsertTemplate(template) => {
            state.templates.insert(template.id.clone(), template);
        }
        Command::DeleteTemplate(id) => {
            state.templates.remove(&id);
        }
        Command::SetConfig(cfg) => {
            let clamped = cfg.clamped();
            state.config_history.push(state.config);
            state.config = clamped;
            state.config_version += 1;
        }
        Command::RollbackConfig => {
            if let Some(previous) = state.config_history.pop() {
                state.config = previous;
                if state.config_version > 1 {
                    state.config_version -= 1;
                }
            }
            // Empty history: no-op, per spec.md §4.1/§9.
        }
        Command::Unknown => {
            debug!("dropping unrecognized command");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_types::{ClusterConfig, Node, NodeRole, Vm, VmId, VmPhase, VmSchedulingPolicy};
    use std::collections::BTreeMap;

    fn node(id: &str, cpu: i64) -> Node {
        Node::new(
            NodeId::new(id),
            format!("10.0.0.1:{id}"),
            NodeRole::Node,
            Resources {
                cpu_millicores: cpu,
                memory_mib: cpu * 2,
                disk_gib: 200,
            },
        )
    }

    fn vm(id: &str, node_id: &str, cpu: i64) -> Vm {
        Vm {
            id: VmId::new(id),
            name: id.to_string(),
            resources: Resources {
                cpu_millicores: cpu,
                memory_mib: cpu,
                disk_gib: 10,
            },
            node_id: node_id.to_string(),
            phase: VmPhase::Pending,
            labels: BTreeMap::new(),
            policy: VmSchedulingPolicy::default(),
        }
    }

    /// S1: node + VM allocation, then delete.
    #[test]
    fn s1_node_plus_vm_allocation_then_delete() {
        let mut state = ClusterState::new();
        apply(&mut state, Command::UpsertNode(node("n1", 4000)));
        apply(&mut state, Command::UpsertVm(vm("vm1", "n1", 1000)));

        let n1 = &state.nodes[&NodeId::new("n1")];
        assert_eq!(n1.allocated.cpu_millicores, 1000);

        apply(&mut state, Command::DeleteVm(VmId::new("vm1")));
        let n1 = &state.nodes[&NodeId::new("n1")];
        assert_eq!(n1.allocated.cpu_millicores, 0);
        assert_eq!(n1.allocated.memory_mib, 0);
        assert_eq!(n1.allocated.disk_gib, 0);
    }

    /// S2: config versioning + rollback.
    #[test]
    fn s2_config_versioning_and_rollback() {
        let mut state = ClusterState::new();
        assert_eq!(state.config_version, 1);

        apply(
            &mut state,
            Command::SetConfig(ClusterConfig {
                desired_voters: 3,
                desired_non_voters: 1,
            }),
        );
        assert_eq!(state.config_version, 2);
        assert_eq!(state.config_history.len(), 1);

        apply(&mut state, Command::RollbackConfig);
        assert_eq!(state.config_version, 1);
        assert!(state.config_history.is_empty());
        assert_eq!(state.config, ClusterConfig::default());
    }

    /// P4: rollback on empty history is a no-op.
    #[test]
    fn p4_rollback_on_empty_history_is_noop() {
        let mut state = ClusterState::new();
        apply(&mut state, Command::RollbackConfig);
        assert_eq!(state.config_version, 1);
        assert!(state.config_history.is_empty());
    }

    /// I5: upsert referencing an unknown node does not panic and still
    /// stores the VM.
    #[test]
    fn i5_unknown_node_reference_is_tolerated() {
        let mut state = ClusterState::new();
        apply(&mut state, Command::UpsertVm(vm("vm1", "ghost", 500)));
        assert!(state.vms.contains_key(&VmId::new("vm1")));
    }

    /// Moving a VM between nodes via repeated UpsertVm keeps both nodes
    /// correct without an intervening UpsertNode.
    #[test]
    fn moving_a_vm_decrements_its_former_node() {
        let mut state = ClusterState::new();
        apply(&mut state, Command::UpsertNode(node("n1", 4000)));
        apply(&mut state, Command::UpsertNode(node("n2", 4000)));
        apply(&mut state, Command::UpsertVm(vm("vm1", "n1", 1000)));
        assert_eq!(state.nodes[&NodeId::new("n1")].allocated.cpu_millicores, 1000);

        apply(&mut state, Command::UpsertVm(vm("vm1", "n2", 1000)));
        assert_eq!(state.nodes[&NodeId::new("n1")].allocated.cpu_millicores, 0);
        assert_eq!(state.nodes[&NodeId::new("n2")].allocated.cpu_millicores, 1000);
    }

    /// DeleteNode leaves stale VM references in place (§3 "Lifecycles").
    #[test]
    fn delete_node_leaves_vm_node_id_stale() {
        let mut state = ClusterState::new();
        apply(&mut state, Command::UpsertNode(node("n1", 4000)));
        apply(&mut state, Command::UpsertVm(vm("vm1", "n1", 1000)));
        apply(&mut state, Command::DeleteNode(NodeId::new("n1")));

        assert!(!state.nodes.contains_key(&NodeId::new("n1")));
        assert_eq!(state.vms[&VmId::new("vm1")].node_id, "n1");
    }

    // P1 (property-based): for any sequence of Upsert*/Delete* commands
    // applied in any order, once the sequence closes with an `UpsertNode`
    // for every node it ever touched (re-triggering recomputation),
    // `node.allocated` equals the sum of resources over VMs that still
    // target it, in every component, non-negative.
    mod p1_allocation_invariant {
        use super::*;
        use proptest::prelude::*;
        use std::collections::BTreeSet;

        #[derive(Debug, Clone)]
        enum Action {
            UpsertNode(NodeId),
            UpsertVm(VmId, Option<NodeId>, i64),
            DeleteVm(VmId),
            DeleteNode(NodeId),
        }

        fn node_id() -> impl Strategy<Value = NodeId> {
            (0..3u32).prop_map(|i| NodeId::new(format!("n{i}")))
        }

        fn vm_id() -> impl Strategy<Value = VmId> {
            (0..4u32).prop_map(|i| VmId::new(format!("v{i}")))
        }

        fn action() -> impl Strategy<Value = Action> {
            prop_oneof![
                node_id().prop_map(Action::UpsertNode),
                (vm_id(), proptest::option::of(node_id()), 0i64..1000)
                    .prop_map(|(id, n, cpu)| Action::UpsertVm(id, n, cpu)),
                vm_id().prop_map(Action::DeleteVm),
                node_id().prop_map(Action::DeleteNode),
            ]
        }

        /// Capacity is deliberately oversized so the scenario never hits
        /// P7-style admission control — P1 is about bookkeeping, not
        /// scheduling, so every upsert is unconditionally accepted.
        fn fresh_node(id: NodeId) -> Node {
            Node::new(
                id,
                "10.0.0.1:0".to_string(),
                NodeRole::Node,
                Resources {
                    cpu_millicores: 1_000_000,
                    memory_mib: 1_000_000,
                    disk_gib: 1_000_000,
                },
            )
        }

        proptest! {
            #[test]
            fn p1_holds_after_closing_upserts(actions in proptest::collection::vec(action(), 0..80)) {
                let mut state = ClusterState::new();
                let mut touched: BTreeSet<NodeId> = BTreeSet::new();

                for act in actions {
                    match act {
                        Action::UpsertNode(id) => {
                            touched.insert(id.clone());
                            apply(&mut state, Command::UpsertNode(fresh_node(id)));
                        }
                        Action::UpsertVm(id, target, cpu) => {
                            if let Some(n) = &target {
                                touched.insert(n.clone());
                            }
                            let node_id = target.map(|n| n.as_str().to_string()).unwrap_or_default();
                            apply(
                                &mut state,
                                Command::UpsertVm(vm(&id.as_str().to_string(), &node_id, cpu)),
                            );
                        }
                        Action::DeleteVm(id) => apply(&mut state, Command::DeleteVm(id)),
                        Action::DeleteNode(id) => apply(&mut state, Command::DeleteNode(id)),
                    }
                }

                // P1's precondition: re-trigger recomputation for every node
                // the sequence ever touched.
                for id in &touched {
                    if let Some(existing) = state.nodes.get(id).cloned() {
                        apply(&mut state, Command::UpsertNode(existing));
                    }
                }

                for node in state.nodes.values() {
                    let expected = state
                        .vms
                        .values()
                        .filter(|vm| vm.node_id == node.id.as_str())
                        .fold(Resources::ZERO, |acc, vm| acc.add(vm.resources));
                    prop_assert_eq!(node.allocated, expected);
                    prop_assert!(node.allocated.cpu_millicores >= 0);
                    prop_assert!(node.allocated.memory_mib >= 0);
                    prop_assert!(node.allocated.disk_gib >= 0);
                }
            }
        }
    }
}
