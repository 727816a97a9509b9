//! # basalt-store: the store manager (C3)
//!
//! A thin proposer front-end over [`basalt_consensus::ConsensusLog`]:
//! serialize a command, submit it, record an audit event, bump a counter.
//! It never touches [`basalt_kernel::Kernel`] directly — reads go straight
//! to the kernel's own snapshot (§4.2: "Reads go directly to C2's snapshot
//! copy").

mod audit;
mod metrics;

pub use audit::{AuditEvent, AuditRing};
pub use metrics::Metrics;

use std::sync::Arc;

use basalt_consensus::ConsensusLog;
use basalt_kernel::Command;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to serialize command: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("consensus log rejected the proposal: {0}")]
    Consensus(#[from] basalt_consensus::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// The store manager. Holding `consensus: None` is the test-mode
/// configuration (§4.2): `apply` becomes a no-op that still records the
/// audit event and counter, since neither depends on an actual log.
pub struct StoreManager {
    consensus: Option<Arc<dyn ConsensusLog>>,
    audit: AuditRing,
    pub metrics: Metrics,
}

impl StoreManager {
    pub fn new(consensus: Option<Arc<dyn ConsensusLog>>) -> Self {
        Self {
            consensus,
            audit: AuditRing::default(),
            metrics: Metrics::default(),
        }
    }

    pub fn with_audit_capacity(consensus: Option<Arc<dyn ConsensusLog>>, audit_capacity: usize) -> Self {
        Self {
            consensus,
            audit: AuditRing::new(audit_capacity),
            metrics: Metrics::default(),
        }
    }

    /// Serializes `command`, submits it to the consensus log, and records
    /// the outcome. Errors never mutate state on their own — the kernel
    /// only ever changes in response to a command arriving back through
    /// the consensus log's committed-entry channel.
    pub fn apply(&self, command: Command) -> Result<()> {
        let type_name = command.type_name();

        let outcome = self.try_submit(&command);
        match &outcome {
            Ok(()) => {
                self.metrics.applies_total.inc();
                self.audit.push(AuditEvent::ok(type_name));
            }
            Err(err) => {
                self.metrics.apply_errors_total.inc();
                self.audit.push(AuditEvent::error(type_name, err));
                warn!(command = type_name, error = %err, "store manager: apply failed");
            }
        }
        outcome
    }

    fn try_submit(&self, command: &Command) -> Result<()> {
        let Some(consensus) = &self.consensus else {
            // No underlying consensus instance wired: test mode, a no-op.
            return Ok(());
        };
        let data = serde_json::to_vec(command)?;
        consensus.submit(data)?;
        Ok(())
    }

    /// The most recent audit events, oldest first.
    pub fn audit(&self) -> Vec<AuditEvent> {
        self.audit.list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_types::NodeId;

    #[test]
    fn test_mode_apply_is_a_noop_that_still_records_audit_and_counter() {
        let manager = StoreManager::new(None);
        manager.apply(Command::DeleteNode(NodeId::new("n1"))).unwrap();

        assert_eq!(manager.metrics.applies_total.get(), 1);
        let events = manager.audit();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].command_type, "DeleteNode");
        assert_eq!(events[0].info, "ok");
    }

    #[test]
    fn wired_consensus_receives_the_serialized_command() {
        let (log, mut rx) = basalt_consensus::LocalConsensus::new("n1", "127.0.0.1:7000");
        let manager = StoreManager::new(Some(Arc::new(log)));

        manager.apply(Command::DeleteNode(NodeId::new("n1"))).unwrap();

        let bytes = rx.try_recv().unwrap();
        let decoded: Command = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, Command::DeleteNode(NodeId::new("n1")));
        assert_eq!(manager.metrics.applies_total.get(), 1);
        assert_eq!(manager.metrics.apply_errors_total.get(), 0);
    }

    #[test]
    fn errors_increment_the_error_counter_and_are_audited() {
        let (log, rx) = basalt_consensus::LocalConsensus::new("n1", "127.0.0.1:7000");
        drop(rx); // closing the receiver makes submit() fail
        let manager = StoreManager::new(Some(Arc::new(log)));

        let err = manager.apply(Command::DeleteNode(NodeId::new("n1")));
        assert!(err.is_err());
        assert_eq!(manager.metrics.apply_errors_total.get(), 1);
        assert!(manager.audit()[0].info.starts_with("error:"));
    }
}
