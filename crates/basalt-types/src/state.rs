use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{NetworkId, NodeId, StoragePoolId, TemplateId, VmId, VolumeId};
use crate::resources::Resources;

/// A node's role in the cluster: control-plane replicas run the RSM and
/// consensus log; plain nodes run VMs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeRole {
    ControlPlane,
    Node,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ControlPlane => f.write_str("control-plane"),
            Self::Node => f.write_str("node"),
        }
    }
}

/// Liveness status of a node, as last observed by the health controller or
/// mirrored from gossip membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    Alive,
    Failed,
    Left,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Alive => "Alive",
            Self::Failed => "Failed",
            Self::Left => "Left",
        };
        f.write_str(s)
    }
}

/// A physical (or agent-fronted) node in the fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub address: String,
    pub role: NodeRole,
    pub voter: bool,
    pub capacity: Resources,
    /// Derived from VMs currently assigned to this node (invariant I1).
    /// Recomputed authoritatively on every `UpsertNode`.
    pub allocated: Resources,
    pub labels: BTreeMap<String, String>,
    pub taints: BTreeMap<String, String>,
    pub status: NodeStatus,
}

impl Node {
    /// Builds a node with zeroed allocation and no labels/taints, the shape
    /// the node-sync controller (C6) mirrors gossip members into.
    pub fn new(id: NodeId, address: String, role: NodeRole, capacity: Resources) -> Self {
        Self {
            id,
            address,
            role,
            voter: false,
            capacity,
            allocated: Resources::ZERO,
            labels: BTreeMap::new(),
            taints: BTreeMap::new(),
            status: NodeStatus::Alive,
        }
    }
}

/// Lifecycle phase of a VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VmPhase {
    Pending,
    Running,
    Migrating,
    Stopped,
}

impl fmt::Display for VmPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Migrating => "Migrating",
            Self::Stopped => "Stopped",
        };
        f.write_str(s)
    }
}

/// Scheduling preferences attached to a VM.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmSchedulingPolicy {
    pub priority: i32,
    pub spread: bool,
    pub affinity: BTreeMap<String, String>,
}

/// A virtual machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vm {
    pub id: VmId,
    pub name: String,
    pub resources: Resources,
    /// Empty string means unplaced. Mirrors the source's `nodeId` field
    /// rather than `Option<NodeId>` so "known empty" and the initial state
    /// are the same representation a reimplementer preserving I5 expects.
    pub node_id: String,
    pub phase: VmPhase,
    pub labels: BTreeMap<String, String>,
    pub policy: VmSchedulingPolicy,
}

impl Vm {
    pub fn has_node(&self) -> bool {
        !self.node_id.is_empty()
    }
}

/// A layer-2/3 network definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub id: NetworkId,
    pub cidr: String,
}

/// A storage pool resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoragePool {
    pub id: StoragePoolId,
    #[serde(rename = "type")]
    pub pool_type: String,
    pub size_gib: i64,
}

/// A volume carved out of a storage pool and (optionally) attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub id: VolumeId,
    pub size_gib: i64,
    pub node_id: String,
}

/// A reusable VM template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmTemplate {
    pub id: TemplateId,
    pub name: String,
    pub base_image: String,
    pub resources: Resources,
}

/// Operator-tunable cluster configuration (the versioned sub-document, I2/I3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    pub desired_voters: i32,
    pub desired_non_voters: i32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            desired_voters: 5,
            desired_non_voters: 2,
        }
    }
}

impl ClusterConfig {
    /// Clamps to the invariants I3 requires: `desiredVoters >= 1`,
    /// `desiredNonVoters >= 0`.
    pub fn clamped(mut self) -> Self {
        if self.desired_voters < 1 {
            self.desired_voters = 1;
        }
        if self.desired_non_voters < 0 {
            self.desired_non_voters = 0;
        }
        self
    }
}

/// The entire authoritative cluster-state document (§3).
///
/// Every collection is a `BTreeMap` rather than a `HashMap`: the FSM's
/// determinism requirement (§4.1 — "no iteration over unordered maps that
/// affects stored fields") then holds by construction rather than by
/// discipline at each call site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterState {
    pub nodes: BTreeMap<NodeId, Node>,
    pub vms: BTreeMap<VmId, Vm>,
    pub networks: BTreeMap<NetworkId, Network>,
    pub storage_pools: BTreeMap<StoragePoolId, StoragePool>,
    pub volumes: BTreeMap<VolumeId, Volume>,
    pub templates: BTreeMap<TemplateId, VmTemplate>,
    pub config: ClusterConfig,
    pub config_version: i64,
    pub config_history: Vec<ClusterConfig>,
}

impl Default for ClusterState {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
            vms: BTreeMap::new(),
            networks: BTreeMap::new(),
            storage_pools: BTreeMap::new(),
            volumes: BTreeMap::new(),
            templates: BTreeMap::new(),
            config: ClusterConfig::default(),
            config_version: 1,
            config_history: Vec::new(),
        }
    }
}

impl ClusterState {
    pub fn new() -> Self {
        Self::default()
    }
}
