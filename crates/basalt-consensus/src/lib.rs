//! # basalt-consensus: the consensus log trait surface (C1)
//!
//! Basalt never implements a consensus protocol itself — the wire format,
//! leader election, and log replication are an external collaborator's job.
//! This crate defines the trait that collaborator must satisfy and ships a
//! [`LocalConsensus`] reference implementation: a single-process stand-in
//! with no replication at all, used by tests, the dev-cluster harness, and
//! single-node bootstrap, so the rest of the workspace can be built and
//! exercised without pulling in (or faking) a real consensus library.

use std::sync::Mutex;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// A server's voting weight in the consensus configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suffrage {
    Voter,
    Nonvoter,
}

/// One entry in the consensus configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEntry {
    pub id: String,
    pub address: String,
    pub suffrage: Suffrage,
}

/// Where this replica believes itself to be in the consensus protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsensusState {
    Leader,
    Follower,
    Candidate,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("consensus log is not the leader")]
    NotLeader,
    #[error("server {0} not found in configuration")]
    ServerNotFound(String),
    #[error("consensus log unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// The surface Basalt requires from an external consensus library.
///
/// Implementors deliver committed log entries out-of-band (a channel handed
/// to whoever constructs them), not through this trait — `submit` only
/// proposes; it does not wait for the entry to commit and it does not hand
/// back the committed bytes.
pub trait ConsensusLog: Send + Sync {
    /// Proposes `data` as the next log entry. Returns once the local node
    /// has accepted the proposal for replication, not once it has committed.
    fn submit(&self, data: Vec<u8>) -> Result<()>;

    /// This replica's current role.
    fn state(&self) -> ConsensusState;

    /// The current leader's server id, if known.
    fn leader(&self) -> Option<String>;

    /// The current consensus configuration (voters and non-voters).
    fn get_configuration(&self) -> Result<Vec<ServerEntry>>;

    fn add_voter(&self, id: &str, address: &str) -> Result<()>;
    fn add_nonvoter(&self, id: &str, address: &str) -> Result<()>;
    fn remove_server(&self, id: &str) -> Result<()>;

    /// Proposes an initial single-round configuration. Only meaningful
    /// before any entry has ever been committed.
    fn bootstrap(&self, servers: Vec<ServerEntry>) -> Result<()>;

    /// Requests a snapshot of the log be taken (used on graceful shutdown).
    fn snapshot(&self) -> Result<()>;
}

/// A single-process reference [`ConsensusLog`]: every `submit` commits
/// immediately and is delivered on the channel handed back by [`LocalConsensus::new`].
/// There is no replication, no election, and exactly one voter — itself.
///
/// This is what `basalt-devcluster` and `basalt`'s own test suite wire when
/// no real consensus library is configured, and what a single-node
/// `bootstrap = true` deployment starts with until (if ever) an operator
/// replaces it with a real implementation.
pub struct LocalConsensus {
    self_id: String,
    self_addr: String,
    committed: mpsc::UnboundedSender<Vec<u8>>,
    configuration: Mutex<Vec<ServerEntry>>,
}

impl LocalConsensus {
    /// Builds a consensus log that is always its own (single-member) leader.
    /// Returns the log plus the receiver end of its committed-entry channel.
    pub fn new(self_id: impl Into<String>, self_addr: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let self_id = self_id.into();
        let self_addr = self_addr.into();
        let configuration = Mutex::new(vec![ServerEntry {
            id: self_id.clone(),
            address: self_addr.clone(),
            suffrage: Suffrage::Voter,
        }]);
        (
            Self {
                self_id,
                self_addr,
                committed: tx,
                configuration,
            },
            rx,
        )
    }
}

impl ConsensusLog for LocalConsensus {
    fn submit(&self, data: Vec<u8>) -> Result<()> {
        self.committed
            .send(data)
            .map_err(|_| Error::Unavailable("committed-entry receiver dropped".into()))
    }

    fn state(&self) -> ConsensusState {
        ConsensusState::Leader
    }

    fn leader(&self) -> Option<String> {
        Some(self.self_id.clone())
    }

    fn get_configuration(&self) -> Result<Vec<ServerEntry>> {
        Ok(self
            .configuration
            .lock()
            .expect("configuration lock poisoned")
            .clone())
    }

    fn add_voter(&self, id: &str, address: &str) -> Result<()> {
        let mut cfg = self.configuration.lock().expect("configuration lock poisoned");
        upsert(&mut cfg, id, address, Suffrage::Voter);
        debug!(id, address, "local consensus: added voter");
        Ok(())
    }

    fn add_nonvoter(&self, id: &str, address: &str) -> Result<()> {
        let mut cfg = self.configuration.lock().expect("configuration lock poisoned");
        upsert(&mut cfg, id, address, Suffrage::Nonvoter);
        debug!(id, address, "local consensus: added nonvoter");
        Ok(())
    }

    fn remove_server(&self, id: &str) -> Result<()> {
        if id == self.self_id {
            return Err(Error::NotLeader);
        }
        let mut cfg = self.configuration.lock().expect("configuration lock poisoned");
        let before = cfg.len();
        cfg.retain(|s| s.id != id);
        if cfg.len() == before {
            return Err(Error::ServerNotFound(id.to_string()));
        }
        Ok(())
    }

    fn bootstrap(&self, servers: Vec<ServerEntry>) -> Result<()> {
        let mut cfg = self.configuration.lock().expect("configuration lock poisoned");
        if servers.is_empty() {
            *cfg = vec![ServerEntry {
                id: self.self_id.clone(),
                address: self.self_addr.clone(),
                suffrage: Suffrage::Voter,
            }];
        } else {
            *cfg = servers;
        }
        Ok(())
    }

    fn snapshot(&self) -> Result<()> {
        Ok(())
    }
}

fn upsert(cfg: &mut Vec<ServerEntry>, id: &str, address: &str, suffrage: Suffrage) {
    if let Some(existing) = cfg.iter_mut().find(|s| s.id == id) {
        existing.address = address.to_string();
        existing.suffrage = suffrage;
    } else {
        cfg.push(ServerEntry {
            id: id.to_string(),
            address: address.to_string(),
            suffrage,
        });
    }
}
