//! The voter/non-voter membership planner (C5): a pure function with no
//! I/O, directly testable for P5 (idempotence) and S3/S4.

use std::collections::BTreeMap;

use basalt_consensus::{ServerEntry, Suffrage};

/// What the planner recommends doing this tick. Each field is already
/// sorted by server id — promotions and demotions pick deterministically
/// among ties the same way every time (spec.md §4.3).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub add_nonvoters: Vec<String>,
    pub promote: Vec<String>,
    pub demote: Vec<String>,
}

/// Computes membership actions given the existing consensus configuration,
/// the gossip-alive member set (id -> address), and the desired voter
/// count. `desired_voters` is clamped to at least 1 (I3).
pub fn plan(existing: &[ServerEntry], alive: &BTreeMap<String, String>, desired_voters: i32) -> Plan {
    let desired_voters = desired_voters.max(1) as usize;

    let existing_ids: BTreeMap<&str, &ServerEntry> =
        existing.iter().map(|s| (s.id.as_str(), s)).collect();

    let mut add_nonvoters: Vec<String> = alive
        .keys()
        .filter(|id| !existing_ids.contains_key(id.as_str()))
        .cloned()
        .collect();
    add_nonvoters.sort();

    let mut voters: Vec<String> = existing
        .iter()
        .filter(|s| s.suffrage == Suffrage::Voter)
        .map(|s| s.id.clone())
        .collect();
    voters.sort();

    let mut nonvoters: Vec<String> = existing
        .iter()
        .filter(|s| s.suffrage == Suffrage::Nonvoter)
        .map(|s| s.id.clone())
        .collect();
    nonvoters.sort();

    let mut promote = Vec::new();
    let mut demote = Vec::new();

    if voters.len() < desired_voters {
        let need = desired_voters - voters.len();
        promote.extend(nonvoters.into_iter().take(need));
    } else if voters.len() > desired_voters {
        demote.extend(voters.split_off(desired_voters));
    }

    Plan {
        add_nonvoters,
        promote,
        demote,
    }
}
