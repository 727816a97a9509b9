use serde::{Deserialize, Serialize};

/// A quantity of compute resources: CPU, memory, and disk.
///
/// Fields are signed so intermediate arithmetic (subtracting a deleted VM's
/// share from a node's `allocated`) can be clamped explicitly at zero rather
/// than relying on unsigned wraparound to surface a bug later.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    /// CPU in millicores.
    pub cpu_millicores: i64,
    /// Memory in MiB.
    pub memory_mib: i64,
    /// Disk in GiB.
    pub disk_gib: i64,
}

impl Resources {
    pub const ZERO: Self = Self {
        cpu_millicores: 0,
        memory_mib: 0,
        disk_gib: 0,
    };

    /// Adds `other` component-wise.
    pub fn add(self, other: Self) -> Self {
        Self {
            cpu_millicores: self.cpu_millicores + other.cpu_millicores,
            memory_mib: self.memory_mib + other.memory_mib,
            disk_gib: self.disk_gib + other.disk_gib,
        }
    }

    /// Subtracts `other` component-wise, clamping each component at zero
    /// (invariant I1: allocated is never negative).
    pub fn saturating_sub(self, other: Self) -> Self {
        Self {
            cpu_millicores: (self.cpu_millicores - other.cpu_millicores).max(0),
            memory_mib: (self.memory_mib - other.memory_mib).max(0),
            disk_gib: (self.disk_gib - other.disk_gib).max(0),
        }
    }

    /// Returns true if `self + extra` fits within `capacity` on both CPU and
    /// memory (the scheduler's capacity predicate, §4.6 — disk is tracked
    /// but not part of the admission check, matching spec.md's predicate).
    pub fn fits_within(self, extra: Self, capacity: Self) -> bool {
        self.cpu_millicores + extra.cpu_millicores <= capacity.cpu_millicores
            && self.memory_mib + extra.memory_mib <= capacity.memory_mib
    }
}
