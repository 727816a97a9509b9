//! Layered configuration for `basaltd`.
//!
//! Sources, highest precedence first:
//! 1. CLI arguments (applied by the `basalt` crate after loading)
//! 2. Environment variables (`BASALT_*` prefix)
//! 3. `basalt.local.toml` (gitignored, local overrides)
//! 4. `basalt.toml` (git-tracked, project config)
//! 5. `~/.config/basalt/config.toml` (user defaults)
//! 6. Built-in defaults (lowest precedence)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// The complete `basaltd` configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BasaltConfig {
    pub node: NodeConfig,
    pub bootstrap: BootstrapConfig,
    pub gossip: GossipConfig,
    pub membership: MembershipConfig,
    pub health: HealthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub id: String,
    pub data_dir: PathBuf,
    pub bind_address: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            data_dir: PathBuf::from(".basalt/data"),
            bind_address: "127.0.0.1:7000".to_string(),
        }
    }
}

/// Whether and how this node proposes the cluster's initial configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub enabled: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self { enabled: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GossipConfig {
    pub bind_address: String,
    pub seeds: Vec<String>,
    pub join_token: Option<String>,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:7946".to_string(),
            seeds: Vec::new(),
            join_token: None,
        }
    }
}

/// Operator-tunable defaults for the voter controller (C5). A running
/// cluster's *actual* desired voter/non-voter counts live in the RSM's
/// `ClusterConfig` (mutated via `SetConfig`/`RollbackConfig`) — these are
/// only the values a fresh cluster bootstraps with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MembershipConfig {
    pub desired_voters: i32,
    pub desired_non_voters: i32,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            desired_voters: 5,
            desired_non_voters: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub probe_interval_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_interval_secs: 15,
        }
    }
}

impl BasaltConfig {
    /// Loads configuration from default locations.
    pub fn load() -> anyhow::Result<Self> {
        ConfigLoader::new().load()
    }

    /// Loads configuration from a specific project directory.
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Resolves relative paths against `base_dir`.
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        let base = base_dir.as_ref();
        if self.node.data_dir.is_relative() {
            self.node.data_dir = base.join(&self.node.data_dir);
        }
    }
}
