//! The gossip membership trait surface (C4).
//!
//! Basalt does not implement gossip itself — an external library (the
//! source wires Serf) discovers members and carries their tags. This module
//! is only the trait that collaborator satisfies, plus [`StaticMembership`],
//! a fixed-roster stand-in for tests and the dev-cluster harness.

use std::collections::BTreeMap;
use std::sync::Mutex;

use thiserror::Error;
use tokio::sync::mpsc;

/// A gossip-discovered peer's liveness, as the gossip layer itself
/// observed it (§6: `members() -> [{name, addr, port, status, tags}]`).
/// Distinct from [`basalt_types::NodeStatus`] even though the variants
/// line up one-to-one — this is what C4 reports, that is what C2 stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Alive,
    Failed,
    Left,
}

/// A gossip-discovered peer and its tags (the node-sync controller reads
/// `cpu`/`memory`/`disk`/`http`/`voter`/join-token tags off of this, §4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: String,
    pub address: String,
    pub status: MemberStatus,
    pub tags: BTreeMap<String, String>,
}

/// A membership change as observed through gossip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GossipEvent {
    Join(Member),
    Update(Member),
    Leave(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("join failed: {0}")]
    Join(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// The surface Basalt requires from an external gossip library.
pub trait GossipMembership: Send + Sync {
    /// Every currently-alive member, as last observed.
    fn members(&self) -> Vec<Member>;

    /// Replaces this node's own advertised tags.
    fn set_tags(&self, tags: BTreeMap<String, String>) -> Result<()>;

    /// Attempts to join the gossip pool through the given seed addresses.
    /// Returns how many contacts succeeded.
    fn join(&self, seeds: &[String]) -> Result<usize>;
}

/// A fixed-roster [`GossipMembership`]: no network I/O, members seeded at
/// construction or added with [`StaticMembership::upsert`]. Used by tests
/// and `basalt-devcluster`, where processes learn their peers' addresses
/// out of band (loopback ports assigned by the supervisor) rather than by
/// discovering them.
pub struct StaticMembership {
    self_member: Mutex<Member>,
    peers: Mutex<Vec<Member>>,
    events: mpsc::UnboundedSender<GossipEvent>,
}

impl StaticMembership {
    /// Builds a membership view seeded with `self_member` as the only
    /// member, plus a receiver for subsequent [`GossipEvent`]s.
    pub fn new(self_member: Member) -> (Self, mpsc::UnboundedReceiver<GossipEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                self_member: Mutex::new(self_member),
                peers: Mutex::new(Vec::new()),
                events: tx,
            },
            rx,
        )
    }

    /// Adds or updates a peer and emits the corresponding event.
    pub fn upsert(&self, member: Member) {
        let mut peers = self.peers.lock().expect("peers lock poisoned");
        let event = if let Some(existing) = peers.iter_mut().find(|m| m.id == member.id) {
            *existing = member.clone();
            GossipEvent::Update(member)
        } else {
            peers.push(member.clone());
            GossipEvent::Join(member)
        };
        let _ = self.events.send(event);
    }

    /// Removes a peer and emits a leave event.
    pub fn remove(&self, id: &str) {
        let mut peers = self.peers.lock().expect("peers lock poisoned");
        let before = peers.len();
        peers.retain(|m| m.id != id);
        if peers.len() != before {
            let _ = self.events.send(GossipEvent::Leave(id.to_string()));
        }
    }
}

impl GossipMembership for StaticMembership {
    fn members(&self) -> Vec<Member> {
        let mut all = vec![self.self_member.lock().expect("self lock poisoned").clone()];
        all.extend(self.peers.lock().expect("peers lock poisoned").iter().cloned());
        all
    }

    fn set_tags(&self, tags: BTreeMap<String, String>) -> Result<()> {
        self.self_member.lock().expect("self lock poisoned").tags = tags;
        Ok(())
    }

    fn join(&self, seeds: &[String]) -> Result<usize> {
        // No network to join over; report the seed list as "contacted" so
        // callers relying on a non-zero count for logging still see one.
        Ok(seeds.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str) -> Member {
        Member {
            id: id.to_string(),
            address: format!("127.0.0.1:700{id}"),
            status: MemberStatus::Alive,
            tags: BTreeMap::new(),
        }
    }

    #[test]
    fn members_includes_self_and_peers() {
        let (membership, _rx) = StaticMembership::new(member("0"));
        membership.upsert(member("1"));
        let ids: Vec<_> = membership.members().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["0", "1"]);
    }

    #[test]
    fn upsert_emits_join_then_update() {
        let (membership, mut rx) = StaticMembership::new(member("0"));
        membership.upsert(member("1"));
        membership.upsert(member("1"));

        assert!(matches!(rx.try_recv().unwrap(), GossipEvent::Join(_)));
        assert!(matches!(rx.try_recv().unwrap(), GossipEvent::Update(_)));
    }

    #[test]
    fn remove_emits_leave_only_when_present() {
        let (membership, mut rx) = StaticMembership::new(member("0"));
        membership.remove("ghost");
        assert!(rx.try_recv().is_err());

        membership.upsert(member("1"));
        let _ = rx.try_recv();
        membership.remove("1");
        assert!(matches!(rx.try_recv().unwrap(), GossipEvent::Leave(id) if id == "1"));
    }

    #[test]
    fn set_tags_replaces_self_tags() {
        let (membership, _rx) = StaticMembership::new(member("0"));
        let mut tags = BTreeMap::new();
        tags.insert("cpu".to_string(), "4000".to_string());
        membership.set_tags(tags.clone()).unwrap();

        let self_member = membership.members().into_iter().next().unwrap();
        assert_eq!(self_member.tags, tags);
    }
}
