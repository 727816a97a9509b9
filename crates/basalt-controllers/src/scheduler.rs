//! The scheduler (C8): a pure function over a [`ClusterState`] snapshot. No
//! I/O, no mutation — the placement controller is the only caller that
//! turns its answer into a command.

use basalt_types::{ClusterState, NodeId, Vm};

/// Picks a target node for `vm`, or `None` if no live node can host it
/// (P7: never returns a node violating capacity or affinity).
pub fn choose_node(state: &ClusterState, vm: &Vm) -> Option<NodeId> {
    let mut candidates: Vec<&NodeId> = state
        .nodes
        .values()
        .filter(|node| node.status == basalt_types::NodeStatus::Alive)
        .filter(|node| fits_capacity(node, vm))
        .filter(|node| matches_affinity(node, vm))
        .map(|node| &node.id)
        .collect();

    if candidates.is_empty() {
        return None;
    }

    // The "most-free" (pack) branch is reachable only when spread is false
    // and priority is nonzero; every other combination — including the
    // default policy — spreads (ascending allocated.cpu).
    let pack = !vm.policy.spread && vm.policy.priority != 0;

    candidates.sort_by(|&a, &b| {
        let na = &state.nodes[a];
        let nb = &state.nodes[b];
        let ordering = if pack {
            let free_a = na.capacity.cpu_millicores - na.allocated.cpu_millicores;
            let free_b = nb.capacity.cpu_millicores - nb.allocated.cpu_millicores;
            free_b.cmp(&free_a)
        } else {
            na.allocated.cpu_millicores.cmp(&nb.allocated.cpu_millicores)
        };
        ordering.then_with(|| a.cmp(b))
    });

    Some(candidates[0].clone())
}

fn fits_capacity(node: &basalt_types::Node, vm: &Vm) -> bool {
    node.allocated.fits_within(vm.resources, node.capacity)
}

fn matches_affinity(node: &basalt_types::Node, vm: &Vm) -> bool {
    vm.policy
        .affinity
        .iter()
        .all(|(key, value)| node.labels.get(key) == Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_types::{Node, NodeRole, NodeStatus, Resources, VmId, VmPhase, VmSchedulingPolicy};
    use std::collections::BTreeMap;

    fn node(id: &str, cpu_cap: i64, cpu_alloc: i64) -> Node {
        let mut n = Node::new(
            NodeId::new(id),
            format!("10.0.0.1:{id}"),
            NodeRole::Node,
            Resources {
                cpu_millicores: cpu_cap,
                memory_mib: cpu_cap * 4,
                disk_gib: 500,
            },
        );
        n.allocated.cpu_millicores = cpu_alloc;
        n.allocated.memory_mib = cpu_alloc * 4;
        n
    }

    fn vm(policy: VmSchedulingPolicy) -> Vm {
        Vm {
            id: VmId::new("vm1"),
            name: "vm1".to_string(),
            resources: Resources {
                cpu_millicores: 500,
                memory_mib: 1000,
                disk_gib: 10,
            },
            node_id: String::new(),
            phase: VmPhase::Pending,
            labels: BTreeMap::new(),
            policy,
        }
    }

    fn state_with(nodes: Vec<Node>) -> ClusterState {
        let mut state = ClusterState::new();
        for n in nodes {
            state.nodes.insert(n.id.clone(), n);
        }
        state
    }

    /// S5: default policy spreads — picks the least-loaded node.
    #[test]
    fn s5_default_policy_spreads_to_least_loaded() {
        let state = state_with(vec![node("n1", 4000, 3000), node("n2", 4000, 1000)]);
        let chosen = choose_node(&state, &vm(VmSchedulingPolicy::default())).unwrap();
        assert_eq!(chosen, NodeId::new("n2"));
    }

    /// S6: affinity overrides load.
    #[test]
    fn s6_affinity_overrides_load() {
        let mut n1 = node("n1", 2000, 0);
        n1.labels.insert("zone".to_string(), "a".to_string());
        let mut n2 = node("n2", 2000, 1000);
        n2.labels.insert("zone".to_string(), "b".to_string());
        let state = state_with(vec![n1, n2]);

        let mut policy = VmSchedulingPolicy::default();
        policy.affinity.insert("zone".to_string(), "b".to_string());

        let chosen = choose_node(&state, &vm(policy)).unwrap();
        assert_eq!(chosen, NodeId::new("n2"));
    }

    #[test]
    fn pack_branch_only_reachable_with_nonzero_priority_and_no_spread() {
        let state = state_with(vec![node("n1", 4000, 3000), node("n2", 4000, 1000)]);

        let mut pack_policy = VmSchedulingPolicy::default();
        pack_policy.priority = 1;
        assert_eq!(choose_node(&state, &vm(pack_policy)).unwrap(), NodeId::new("n2"));

        let mut priority_but_spread = VmSchedulingPolicy::default();
        priority_but_spread.priority = 1;
        priority_but_spread.spread = true;
        assert_eq!(
            choose_node(&state, &vm(priority_but_spread)).unwrap(),
            NodeId::new("n2")
        );
    }

    #[test]
    fn p7_rejects_nodes_without_capacity() {
        let state = state_with(vec![node("n1", 400, 0)]);
        assert!(choose_node(&state, &vm(VmSchedulingPolicy::default())).is_none());
    }

    #[test]
    fn ties_break_deterministically_by_node_id() {
        let state = state_with(vec![node("n2", 4000, 0), node("n1", 4000, 0)]);
        assert_eq!(
            choose_node(&state, &vm(VmSchedulingPolicy::default())).unwrap(),
            NodeId::new("n1")
        );
    }

    #[test]
    fn failed_nodes_are_never_candidates() {
        let mut failed = node("n1", 4000, 0);
        failed.status = NodeStatus::Failed;
        let state = state_with(vec![failed]);
        assert!(choose_node(&state, &vm(VmSchedulingPolicy::default())).is_none());
    }
}
