use quay_pty::{PtyError, SessionId};

use crate::ids::PaneId;

/// Errors from workspace operations.
#[derive(Debug)]
pub enum MuxError {
    /// The gateway could not start a process. Surfaced to the caller and
    /// never retried automatically; a bad working directory keeps failing.
    Spawn(PtyError),
    SessionNotFound(SessionId),
    PaneNotFound(PaneId),
    /// A layout write violated the tree's structural invariants.
    InvalidLayout(String),
}

impl std::fmt::Display for MuxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MuxError::Spawn(err) => write!(f, "process spawn failed: {err}"),
            MuxError::SessionNotFound(id) => write!(f, "unknown session: {id}"),
            MuxError::PaneNotFound(id) => write!(f, "unknown pane: {id}"),
            MuxError::InvalidLayout(msg) => write!(f, "invalid layout: {msg}"),
        }
    }
}

impl std::error::Error for MuxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MuxError::Spawn(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PtyError> for MuxError {
    fn from(err: PtyError) -> Self {
        match err {
            PtyError::SessionNotFound(id) => MuxError::SessionNotFound(id),
            other => MuxError::Spawn(other),
        }
    }
}
