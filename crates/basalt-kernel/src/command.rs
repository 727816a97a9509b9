use basalt_types::{
    ClusterConfig, Network, NetworkId, Node, NodeId, StoragePool, StoragePoolId, Vm, VmId,
    VmTemplate, TemplateId, Volume, VolumeId,
};
use serde::{Deserialize, Serialize};

/// A state-mutating command, the atomic unit of the replicated log.
///
/// Tagged by `type` with the payload nested under `payload`, matching the
/// wire shape the source's `store.Command{Type, Payload}` envelope used —
/// `serde`'s internally-tagged representation gives the same two-field JSON
/// object without hand-rolling the envelope.
///
/// An unrecognized `type` deserializes to [`Command::Unknown`] instead of
/// failing to parse: §9 requires "tagged-union dispatch... reject unknown
/// tags by ignoring them (forward-compatible)", and §4.1 requires that a
/// malformed command "leave state untouched" rather than abort replication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Command {
    UpsertNode(Node),
    DeleteNode(NodeId),
    UpsertVm(Vm),
    DeleteVm(VmId),
    UpsertNetwork(Network),
    DeleteNetwork(NetworkId),
    UpsertStoragePool(StoragePool),
    DeleteStoragePool(StoragePoolId),
    UpsertVolume(Volume),
    DeleteVolume(VolumeId),
    UpsertTemplate(VmTemplate),
    DeleteTemplate(TemplateId),
    SetConfig(ClusterConfig),
    RollbackConfig,
    /// Catch-all for command tags this replica does not recognize (a future
    /// version's command, or a corrupted payload). Applying it is a no-op.
    #[serde(other)]
    Unknown,
}

impl Command {
    /// The command's tag, the same string its `type` field serializes to.
    /// Used by the store manager to key audit events by command type (§4.2)
    /// without re-deriving it from the serialized JSON.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::UpsertNode(_) => "UpsertNode",
            Self::DeleteNode(_) => "DeleteNode",
            Self::UpsertVm(_) => "UpsertVm",
            Self::DeleteVm(_) => "DeleteVm",
            Self::UpsertNetwork(_) => "UpsertNetwork",
            Self::DeleteNetwork(_) => "DeleteNetwork",
            Self::UpsertStoragePool(_) => "UpsertStoragePool",
            Self::DeleteStoragePool(_) => "DeleteStoragePool",
            Self::UpsertVolume(_) => "UpsertVolume",
            Self::DeleteVolume(_) => "DeleteVolume",
            Self::UpsertTemplate(_) => "UpsertTemplate",
            Self::DeleteTemplate(_) => "DeleteTemplate",
            Self::SetConfig(_) => "SetConfig",
            Self::RollbackConfig => "RollbackConfig",
            Self::Unknown => "Unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_command_type_falls_back_to_unknown_variant() {
        let json = r#"{"type":"SomeFutureCommand","payload":{"whatever":true}}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        assert_eq!(cmd, Command::Unknown);
    }

    #[test]
    fn type_name_matches_the_wire_tag() {
        let cmd = Command::DeleteNode(NodeId::new("n1"));
        assert_eq!(cmd.type_name(), "DeleteNode");
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"type\":\"DeleteNode\""));
    }

    #[test]
    fn delete_node_round_trips() {
        let cmd = Command::DeleteNode(NodeId::new("n1"));
        let json = serde_json::to_string(&cmd).unwrap();
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }
}
