//! # basalt-membership: gossip membership (C4) and the voter controller (C5)

mod controller;
mod gossip;
mod planner;

pub use controller::run as run_voter_controller;
pub use gossip::{Error, GossipEvent, GossipMembership, Member, MemberStatus, Result, StaticMembership};
pub use planner::{plan, Plan};
