use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a pane (a UI slot bound to one session).
///
/// Allocated by the [`Workspace`](crate::Workspace) from a monotonic counter
/// and never reused for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaneId(u64);

impl PaneId {
    pub const fn from_raw(raw: u64) -> Self {
        PaneId(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a branch/workspace checkout. Branch names come from the
/// git layer; this core only uses them as keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(String);

impl BranchId {
    pub fn new(name: impl Into<String>) -> Self {
        BranchId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BranchId {
    fn from(name: &str) -> Self {
        BranchId(name.to_string())
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
