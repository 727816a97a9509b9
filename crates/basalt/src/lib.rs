//! # basalt
//!
//! Basalt is the control plane of a small virtualization cluster manager: a
//! replicated, leader-driven coordinator that tracks nodes, VMs, networks,
//! storage pools, volumes, VM templates, and operator-tunable cluster
//! configuration, continuously reconciling the live fleet toward a declared
//! desired state.
//!
//! This crate is the bootstrap layer, not the core: it loads configuration
//! ([`basalt_config`]), wires the replicated state machine
//! ([`basalt_kernel`]), the store manager ([`basalt_store`]), a consensus
//! log ([`basalt_consensus`]), gossip membership and the voter controller
//! ([`basalt_membership`]), and the fleet reconciliation controllers
//! ([`basalt_controllers`]) into one running replica — see [`Node`]. The
//! `basaltd` binary built alongside this library is a thin CLI front-end
//! over it.
//!
//! # Architecture
//!
//! ```text
//! external clients -> StoreManager (C3) -> ConsensusLog (C1) -> Kernel (C2)
//!                                                                   ^
//!                        leader-gated control loops read/propose ---+
//!                        (C5 voter, C6 node-sync, C7 health, C9 placement)
//! ```

pub mod error;
pub mod node;

pub use error::{BasaltError, Result};
pub use node::Node;

// Re-export the core crates so an embedder depends on `basalt` alone.
pub use basalt_config as config;
pub use basalt_consensus as consensus;
pub use basalt_controllers as controllers;
pub use basalt_kernel as kernel;
pub use basalt_membership as membership;
pub use basalt_store as store;
pub use basalt_types as types;
