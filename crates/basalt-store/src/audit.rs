//! Fixed-capacity audit ring, deliberately not replicated (§3: "not
//! replicated" is part of the `AuditEvent` entity's own definition).

use std::collections::VecDeque;
use std::sync::Mutex;

/// One recorded store-manager action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    pub command_type: String,
    pub info: String,
}

impl AuditEvent {
    pub fn ok(command_type: impl Into<String>) -> Self {
        Self {
            command_type: command_type.into(),
            info: "ok".to_string(),
        }
    }

    pub fn error(command_type: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self {
            command_type: command_type.into(),
            info: format!("error: {message}"),
        }
    }
}

/// A ring buffer of the most recent `capacity` events, oldest first on
/// `list()`. Protected by its own mutex, independent of the kernel's lock
/// (§5: "no nested locks").
pub struct AuditRing {
    capacity: usize,
    buf: Mutex<VecDeque<AuditEvent>>,
}

const DEFAULT_CAPACITY: usize = 256;

impl Default for AuditRing {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl AuditRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 { DEFAULT_CAPACITY } else { capacity };
        Self {
            capacity,
            buf: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn push(&self, event: AuditEvent) {
        let mut buf = self.buf.lock().expect("audit ring lock poisoned");
        if buf.len() == self.capacity {
            buf.pop_front();
        }
        buf.push_back(event);
    }

    /// The most recent `capacity` events, oldest first.
    pub fn list(&self) -> Vec<AuditEvent> {
        self.buf.lock().expect("audit ring lock poisoned").iter().cloned().collect()
    }
}
