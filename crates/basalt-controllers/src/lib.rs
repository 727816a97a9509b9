//! # basalt-controllers: fleet reconciliation (C6-C9)
//!
//! Every controller here is leader-gated (consensus state checked at the
//! top of each tick) and proposes through [`basalt_store::StoreManager`]
//! rather than mutating the kernel directly — the kernel only changes in
//! response to a committed entry coming back through the consensus log.

pub mod health;
pub mod node_sync;
pub mod placement;
pub mod scheduler;

pub use health::run as run_health_controller;
pub use node_sync::run as run_node_sync_controller;
pub use placement::run as run_placement_controller;
pub use scheduler::choose_node;
