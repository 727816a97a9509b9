//! Node process management: spawns and supervises one `basaltd` child
//! process per cluster member.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use crate::{Error, NodeConfig, Result};
use tokio::process::{Child, Command};
use tokio::time::sleep;

/// Status of a cluster node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Node is stopped.
    Stopped,

    /// Node is starting up.
    Starting,

    /// Node is running normally.
    Running,

    /// Node has crashed.
    Crashed,
}

/// A managed `basaltd` child process.
pub struct NodeProcess {
    /// Node configuration.
    pub config: NodeConfig,

    /// Path to the `basaltd` binary this process spawns.
    binary_path: PathBuf,

    /// Child process handle.
    pub process: Option<Child>,

    /// Current status.
    pub status: NodeStatus,

    /// Number of restart attempts.
    pub restart_count: usize,
}

impl NodeProcess {
    /// Creates a new node process (not started).
    pub fn new(config: NodeConfig, binary_path: PathBuf) -> Self {
        Self {
            config,
            binary_path,
            process: None,
            status: NodeStatus::Stopped,
            restart_count: 0,
        }
    }

    /// Starts the node process: `basaltd --node-id node-N --data-dir ...
    /// --bind host:port [--bootstrap | --join peer1,peer2,...]`. Node 0
    /// proposes the initial single-node consensus configuration (§6
    /// "Bootstrap"); every other node starts as a gossip joiner for C5 to
    /// absorb as a non-voter.
    pub async fn start(&mut self) -> Result<()> {
        if self.status != NodeStatus::Stopped && self.status != NodeStatus::Crashed {
            return Err(Error::NodeAlreadyRunning(self.config.id));
        }

        self.status = NodeStatus::Starting;

        let mut command = Command::new(&self.binary_path);
        command
            .arg("--node-id")
            .arg(format!("node-{}", self.config.id))
            .arg("--data-dir")
            .arg(&self.config.data_dir)
            .arg("--bind")
            .arg(format!("{}:{}", self.config.bind_address, self.config.port));

        if self.config.id == 0 {
            command.arg("--bootstrap");
        } else if !self.config.peers.is_empty() {
            command.arg("--join").arg(self.config.peers.join(","));
        }

        let child = match command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                // A spawn that never started must not leave the node stuck
                // in `Starting` forever — `Crashed` lets `restart()` (and a
                // later `start()` call) retry it.
                self.status = NodeStatus::Crashed;
                return Err(Error::SpawnError(e.to_string()));
            }
        };

        self.process = Some(child);
        self.status = NodeStatus::Starting;

        // Give it a moment to start
        sleep(Duration::from_millis(200)).await;

        // Check if it's still alive
        if self.is_alive() {
            self.status = NodeStatus::Running;
            Ok(())
        } else {
            self.status = NodeStatus::Crashed;
            Err(Error::NodeStartFailed(
                self.config.id,
                "process died immediately".to_string(),
            ))
        }
    }

    /// Stops the node process gracefully.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(mut child) = self.process.take() {
            // Use tokio's built-in kill (sends SIGKILL on Unix, TerminateProcess on Windows)
            child.kill().await.ok();

            // Wait for it to exit (with timeout)
            let exit_status = tokio::time::timeout(Duration::from_secs(5), child.wait()).await;

            match exit_status {
                Ok(Ok(_status)) => {
                    self.status = NodeStatus::Stopped;
                    Ok(())
                }
                Ok(Err(e)) => {
                    self.status = NodeStatus::Stopped;
                    Err(Error::Io(e))
                }
                Err(_) => {
                    // Timeout, but we already killed it
                    self.status = NodeStatus::Stopped;
                    Ok(())
                }
            }
        } else {
            Ok(()) // Already stopped
        }
    }

    /// Checks if the node process is alive.
    pub fn is_alive(&mut self) -> bool {
        if let Some(child) = &mut self.process {
            // Try to check if process has exited
            match child.try_wait() {
                Ok(Some(_exit_status)) => false, // Process has exited
                Ok(None) => true,                // Still running
                Err(_) => false,                 // Error checking, assume dead
            }
        } else {
            false
        }
    }

    /// Returns the node ID.
    pub fn id(&self) -> usize {
        self.config.id
    }

    /// Returns the port.
    pub fn port(&self) -> u16 {
        self.config.port
    }

    /// Attempts to restart a crashed node.
    pub async fn restart(&mut self) -> Result<()> {
        if self.status != NodeStatus::Crashed {
            return Ok(());
        }

        self.restart_count += 1;

        // Exponential backoff
        let backoff = Duration::from_secs(2u64.pow(self.restart_count.min(5) as u32));
        sleep(backoff).await;

        self.start().await
    }
}
