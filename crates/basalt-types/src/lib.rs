//! # basalt-types: Core cluster-state types for Basalt
//!
//! Shared vocabulary for the replicated state machine (`basalt-kernel`), the
//! reconciliation controllers (`basalt-controllers`), and the membership
//! layer (`basalt-membership`):
//!
//! - Entity identifiers ([`NodeId`], [`VmId`], [`NetworkId`], [`StoragePoolId`],
//!   [`VolumeId`], [`TemplateId`])
//! - Resource accounting ([`Resources`])
//! - Entities ([`Node`], `struct@Vm`, [`Network`], [`StoragePool`], [`Volume`],
//!   [`VmTemplate`])
//! - Cluster configuration ([`ClusterConfig`])
//! - The full authoritative document ([`ClusterState`])

mod ids;
mod resources;
mod state;

pub use ids::{NetworkId, NodeId, StoragePoolId, TemplateId, VmId, VolumeId};
pub use resources::Resources;
pub use state::{
    ClusterConfig, ClusterState, Network, Node, NodeRole, NodeStatus, StoragePool, Vm, VmPhase,
    VmSchedulingPolicy, VmTemplate,
};
