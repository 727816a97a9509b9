//! # basalt-kernel: the replicated state machine (C2)
//!
//! The kernel is the sole authoritative owner of the cluster's
//! [`ClusterState`](basalt_types::ClusterState). It is a deterministic
//! reducer: given the same sequence of [`Command`]s, every replica's kernel
//! reaches the same state, no matter which replica applied them or when.
//!
//! - No wall-clock reads, no randomness, no iteration over unordered
//!   collections that influences stored fields (`ClusterState` backs every
//!   collection with a `BTreeMap`).
//! - `apply` never fails for a well-formed command, and a malformed/unknown
//!   command is silently dropped rather than rejected (see [`Command::Unknown`]).
//! - Reads go through [`Kernel::snapshot`], a deep copy independent of the
//!   live state (I4).

mod command;
mod reducer;

pub use command::Command;

use std::io::{Read, Write};
use std::sync::RwLock;

use basalt_types::ClusterState;
use thiserror::Error;

/// Errors from snapshotting/restoring the kernel. `apply` itself is
/// infallible (§4.1, §7 — "FSM never throws").
#[derive(Debug, Error)]
pub enum Error {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot (de)serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// The FSM: a single exclusively-locked [`ClusterState`] plus the apply/
/// snapshot/restore contract that the consensus log drives (§4.1).
pub struct Kernel {
    state: RwLock<ClusterState>,
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ClusterState::new()),
        }
    }

    /// Applies one committed command to the state. Runs under an exclusive
    /// lock; never panics or returns an error for a well-formed command.
    pub fn apply(&self, command: Command) {
        let mut state = self.state.write().expect("kernel state lock poisoned");
        reducer::apply(&mut state, command);
    }

    /// Returns a deep copy of the current state (I4): mutating it can never
    /// affect the kernel, nor can a subsequent mutation of the kernel affect
    /// an already-returned copy.
    pub fn snapshot(&self) -> ClusterState {
        self.state.read().expect("kernel state lock poisoned").clone()
    }

    /// Serializes the current state as a self-describing JSON document,
    /// matching the source's snapshot format exactly so operators used to
    /// inspecting `snapshots/*.json` see the same shape.
    pub fn snapshot_persist<W: Write>(&self, writer: W) -> Result<()> {
        let state = self.snapshot();
        serde_json::to_writer(writer, &state)?;
        Ok(())
    }

    /// Replaces the live state atomically from a serialized snapshot. After
    /// this returns, every invariant in §3 holds (the serialized state was
    /// itself produced by a kernel that maintained them).
    pub fn restore<R: Read>(&self, reader: R) -> Result<()> {
        let restored: ClusterState = serde_json::from_reader(reader)?;
        let mut state = self.state.write().expect("kernel state lock poisoned");
        *state = restored;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_types::{Node, NodeId, NodeRole, Resources};

    #[test]
    fn snapshot_is_independent_of_live_state_p6() {
        let kernel = Kernel::new();
        kernel.apply(Command::UpsertNode(Node::new(
            NodeId::new("n1"),
            "10.0.0.1:7000".into(),
            NodeRole::Node,
            Resources {
                cpu_millicores: 4000,
                memory_mib: 8192,
                disk_gib: 200,
            },
        )));

        let mut snap = kernel.snapshot();
        snap.nodes.get_mut(&NodeId::new("n1")).unwrap().capacity.cpu_millicores = 0;

        let snap2 = kernel.snapshot();
        assert_eq!(
            snap2.nodes[&NodeId::new("n1")].capacity.cpu_millicores,
            4000
        );
    }

    #[test]
    fn restore_round_trips_p2() {
        let kernel = Kernel::new();
        kernel.apply(Command::UpsertNode(Node::new(
            NodeId::new("n1"),
            "10.0.0.1:7000".into(),
            NodeRole::Node,
            Resources {
                cpu_millicores: 4000,
                memory_mib: 8192,
                disk_gib: 200,
            },
        )));
        let before = kernel.snapshot();

        let mut buf = Vec::new();
        kernel.snapshot_persist(&mut buf).unwrap();

        let other = Kernel::new();
        other.restore(buf.as_slice()).unwrap();
        assert_eq!(other.snapshot(), before);
    }

    // P2 and P6 (property-based): build an arbitrary kernel by replaying a
    // random command sequence, then check that (a) restore(serialize(snapshot))
    // reproduces the snapshot element-wise, and (b) mutating the returned
    // snapshot never reaches back into the kernel.
    mod proptests {
        use super::*;
        use basalt_types::{ClusterConfig, NodeRole, Resources, Vm, VmId, VmPhase, VmSchedulingPolicy};
        use proptest::prelude::*;
        use std::collections::BTreeMap;

        fn node_id() -> impl Strategy<Value = NodeId> {
            (0..3u32).prop_map(|i| NodeId::new(format!("n{i}")))
        }

        fn vm_id() -> impl Strategy<Value = VmId> {
            (0..4u32).prop_map(|i| VmId::new(format!("v{i}")))
        }

        #[derive(Debug, Clone)]
        enum Action {
            UpsertNode(NodeId),
            UpsertVm(VmId, Option<NodeId>, i64),
            DeleteVm(VmId),
            DeleteNode(NodeId),
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

        fn replay(kernel: &Kernel, actions: &[Action]) {
            for act in actions {
                match act.clone() {
                    Action::UpsertNode(id) => kernel.apply(Command::UpsertNode(Node::new(
                        id,
                        "10.0.0.1:0".to_string(),
                        NodeRole::Node,
                        Resources {
                            cpu_millicores: 1_000_000,
                            memory_mib: 1_000_000,
                            disk_gib: 1_000_000,
                        },
                    ))),
                    Action::UpsertVm(id, target, cpu) => {
                        let node_id = target.map(|n| n.as_str().to_string()).unwrap_or_default();
                        kernel.apply(Command::UpsertVm(Vm {
                            id,
                            name: "vm".to_string(),
                            resources: Resources {
                                cpu_millicores: cpu,
                                memory_mib: cpu,
                                disk_gib: 0,
                            },
                            node_id,
                            phase: VmPhase::Pending,
                            labels: BTreeMap::new(),
                            policy: VmSchedulingPolicy::default(),
                        }));
                    }
                    Action::DeleteVm(id) => kernel.apply(Command::DeleteVm(id)),
                    Action::DeleteNode(id) => kernel.apply(Command::DeleteNode(id)),
                }
            }
        }

        proptest! {
            /// P2: restore(serialize(snapshot(S))) == S, element-wise.
            #[test]
            fn p2_restore_round_trips_arbitrary_state(actions in proptest::collection::vec(action(), 0..40)) {
                let kernel = Kernel::new();
                replay(&kernel, &actions);
                let before = kernel.snapshot();

                let mut buf = Vec::new();
                kernel.snapshot_persist(&mut buf).unwrap();

                let restored = Kernel::new();
                restored.restore(buf.as_slice()).unwrap();
                prop_assert_eq!(restored.snapshot(), before);
            }

            /// P6: mutating nested maps of a returned snapshot never affects
            /// a subsequent snapshot of the same kernel.
            #[test]
            fn p6_snapshot_is_independent_of_live_state(actions in proptest::collection::vec(action(), 0..40)) {
                let kernel = Kernel::new();
                replay(&kernel, &actions);

                let mut first = kernel.snapshot();
                for node in first.nodes.values_mut() {
                    node.labels.insert("mutated".to_string(), "yes".to_string());
                    node.capacity.cpu_millicores = -1;
                }
                for vm in first.vms.values_mut() {
                    vm.labels.insert("mutated".to_string(), "yes".to_string());
                }
                first.config_history.push(ClusterConfig::default());

                let second = kernel.snapshot();
                for node in second.nodes.values() {
                    prop_assert!(!node.labels.contains_key("mutated"));
                    prop_assert_ne!(node.capacity.cpu_millicores, -1);
                }
                for vm in second.vms.values() {
                    prop_assert!(!vm.labels.contains_key("mutated"));
                }
                prop_assert_ne!(second.config_history.len(), first.config_history.len());
            }
        }
    }
}
