//! Session bookkeeping: which shell processes exist, which branch owns
//! them, and whether the OS process is still running.
//!
//! The registry never talks to the gateway; killing a process and removing
//! its bookkeeping are separate, composable operations on the
//! [`Workspace`](crate::Workspace).

use std::collections::HashMap;
use std::path::PathBuf;

use quay_pty::SessionId;

use crate::ids::BranchId;

/// Metadata for one spawned PTY-attached process.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub branch: BranchId,
    pub working_dir: PathBuf,
    /// Foreground hint: whether the owning view is currently visible.
    /// Distinct from OS process liveness, which exit events drive.
    pub is_active: bool,
    pub alive: bool,
    pub exit_code: Option<u32>,
}

impl Session {
    pub fn is_alive(&self) -> bool {
        self.alive
    }
}

/// One entry per live (or exited-but-not-yet-removed) PTY process.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session: Session) {
        self.sessions.insert(session.id, session);
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Deregister bookkeeping. Idempotent; does not kill any process.
    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        self.sessions.remove(&id)
    }

    /// Foreground/background hint for all of a branch's sessions.
    /// No-op when the branch has none.
    pub fn set_active_for_branch(&mut self, branch: &BranchId, is_active: bool) {
        for session in self.sessions.values_mut() {
            if session.branch == *branch {
                session.is_active = is_active;
            }
        }
    }

    /// Record that a session's process exited. Returns `false` if the
    /// session is unknown (already removed -- expected, not an error).
    pub fn mark_exited(&mut self, id: SessionId, exit_code: Option<u32>) -> bool {
        match self.sessions.get_mut(&id) {
            Some(session) => {
                session.alive = false;
                session.exit_code = exit_code;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
