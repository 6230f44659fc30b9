//! The workspace facade: every mutation of sessions, panes, branch
//! indexes, layout trees, and focus goes through here, so the
//! cross-store invariants hold at the interface level. Callers never see
//! the raw maps.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use quay_pty::{ProcessGateway, PtyError, SessionId};

use crate::error::MuxError;
use crate::ids::{BranchId, PaneId};
use crate::layout::{LayoutNode, SplitDirection};
use crate::panes::{Pane, PaneTable};
use crate::session::{Session, SessionRegistry};

/// Result of opening or splitting a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalOpened {
    pub pane_id: PaneId,
    pub session_id: SessionId,
}

pub struct Workspace<G: ProcessGateway> {
    gateway: G,
    sessions: SessionRegistry,
    panes: PaneTable,
    /// One tree per branch; no entry until the branch's first pane exists.
    layouts: HashMap<BranchId, LayoutNode>,
    focused: Option<PaneId>,
    next_pane_id: u64,
}

impl<G: ProcessGateway> Workspace<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            sessions: SessionRegistry::new(),
            panes: PaneTable::new(),
            layouts: HashMap::new(),
            focused: None,
            next_pane_id: 1,
        }
    }

    fn alloc_pane_id(&mut self) -> PaneId {
        let id = PaneId::from_raw(self.next_pane_id);
        self.next_pane_id += 1;
        id
    }

    /// Spawn a session and register it for `branch`. Nothing is recorded
    /// when the spawn fails, so a failed open leaves no partial state.
    fn spawn_session(&mut self, branch: &BranchId, working_dir: &Path) -> Result<SessionId, MuxError> {
        let spawned = self.gateway.create(working_dir)?;
        self.sessions.insert(Session {
            id: spawned.session_id,
            branch: branch.clone(),
            working_dir: working_dir.to_path_buf(),
            is_active: true,
            alive: true,
            exit_code: None,
        });
        Ok(spawned.session_id)
    }

    /// Open a new terminal for a branch. Always spawns a fresh session.
    ///
    /// The first pane of a branch becomes its whole layout tree; later
    /// panes split the branch's most recently added pane vertically.
    pub fn open_terminal(
        &mut self,
        branch: &BranchId,
        working_dir: &Path,
    ) -> Result<TerminalOpened, MuxError> {
        let session_id = self.spawn_session(branch, working_dir)?;
        let pane_id = self.alloc_pane_id();
        let anchor = self.panes.last_pane_for_branch(branch);

        self.panes.insert(Pane {
            id: pane_id,
            session_id,
            branch: branch.clone(),
            working_dir: working_dir.to_path_buf(),
        });

        let tree = match (self.layouts.remove(branch), anchor) {
            (Some(tree), Some(anchor)) => {
                tree.split_pane(anchor, SplitDirection::Vertical, pane_id)
            }
            _ => LayoutNode::leaf(pane_id),
        };
        self.layouts.insert(branch.clone(), tree);

        Ok(TerminalOpened {
            pane_id,
            session_id,
        })
    }

    /// Split an existing pane, spawning a fresh session in its working
    /// directory. The target stays the first child; the new pane becomes
    /// the second.
    pub fn split(
        &mut self,
        pane_id: PaneId,
        direction: SplitDirection,
    ) -> Result<TerminalOpened, MuxError> {
        let (branch, working_dir) = match self.panes.get(pane_id) {
            Some(pane) => (pane.branch.clone(), pane.working_dir.clone()),
            None => return Err(MuxError::PaneNotFound(pane_id)),
        };

        let session_id = self.spawn_session(&branch, &working_dir)?;
        let new_pane = self.alloc_pane_id();
        self.panes.insert(Pane {
            id: new_pane,
            session_id,
            branch: branch.clone(),
            working_dir,
        });

        let tree = match self.layouts.remove(&branch) {
            Some(tree) => tree.split_pane(pane_id, direction, new_pane),
            // The pane exists, so the tree must too; rebuild from the pane
            // rather than losing it.
            None => LayoutNode::leaf(pane_id).split_pane(pane_id, direction, new_pane),
        };
        self.layouts.insert(branch, tree);

        Ok(TerminalOpened {
            pane_id: new_pane,
            session_id,
        })
    }

    /// Remove a pane: table, branch index, layout (collapsing the parent
    /// split), and focus if it pointed here. Idempotent. When the removed
    /// pane was the session's last reference, the session is killed and
    /// deregistered too.
    pub fn remove_pane(&mut self, pane_id: PaneId) {
        let Some(pane) = self.panes.remove(pane_id) else {
            return;
        };

        if self.focused == Some(pane_id) {
            self.focused = None;
        }

        if let Some(tree) = self.layouts.remove(&pane.branch) {
            if let Some(rest) = tree.remove_pane(pane_id) {
                self.layouts.insert(pane.branch.clone(), rest);
            }
        }

        if self.panes.session_refcount(pane.session_id) == 0 {
            if let Err(e) = self.gateway.kill(pane.session_id) {
                log::debug!("session {} gone before pane close: {e}", pane.session_id);
            }
            self.sessions.remove(pane.session_id);
        }
    }

    /// Deregister session bookkeeping without killing the process.
    pub fn remove_session(&mut self, session_id: SessionId) {
        self.sessions.remove(session_id);
    }

    /// Kill the session's process and deregister it. A gateway that no
    /// longer knows the id means the process already exited; local cleanup
    /// still happens.
    pub fn kill_session(&mut self, session_id: SessionId) {
        if let Err(e) = self.gateway.kill(session_id) {
            log::debug!("kill for session {session_id}: {e}");
        }
        self.sessions.remove(session_id);
    }

    /// Write user input to a session's PTY. A `SessionNotFound` from the
    /// gateway means the process already exited: liveness is reconciled
    /// locally and the write is dropped.
    pub fn write_input(&mut self, session_id: SessionId, data: &[u8]) -> Result<(), MuxError> {
        match self.gateway.write(session_id, data) {
            Err(PtyError::SessionNotFound(id)) => {
                log::debug!("write to exited session {id} dropped");
                self.sessions.mark_exited(id, None);
                Ok(())
            }
            result => result.map_err(MuxError::from),
        }
    }

    /// Resize a session's PTY. Same already-exited handling as `write_input`.
    pub fn resize(&mut self, session_id: SessionId, cols: u16, rows: u16) -> Result<(), MuxError> {
        match self.gateway.resize(session_id, cols, rows) {
            Err(PtyError::SessionNotFound(id)) => {
                log::debug!("resize of exited session {id} dropped");
                self.sessions.mark_exited(id, None);
                Ok(())
            }
            result => result.map_err(MuxError::from),
        }
    }

    /// Foreground/background hint for a branch's sessions. No-op when the
    /// branch has none.
    pub fn set_active(&mut self, branch: &BranchId, is_active: bool) {
        self.sessions.set_active_for_branch(branch, is_active);
    }

    /// Reconcile an exit event from the gateway. Exit-after-removal is
    /// expected: unknown ids are discarded without touching any state.
    pub fn handle_exit(&mut self, session_id: SessionId, exit_code: Option<u32>) {
        if !self.sessions.mark_exited(session_id, exit_code) {
            log::debug!("exit event for unknown session {session_id} discarded");
            return;
        }
        // Release gateway resources; the process is already gone.
        if let Err(e) = self.gateway.kill(session_id) {
            log::debug!("gateway already released session {session_id}: {e}");
        }
    }

    pub fn set_focused_pane(&mut self, pane: Option<PaneId>) {
        match pane {
            Some(id) if !self.panes.contains(id) => {
                log::warn!("focus request for unknown pane {id} ignored");
            }
            other => self.focused = other,
        }
    }

    pub fn focused_pane(&self) -> Option<PaneId> {
        self.focused
    }

    pub fn panes_for_branch(&self, branch: &BranchId) -> Vec<&Pane> {
        self.panes.panes_for_branch(branch)
    }

    pub fn layout(&self, branch: &BranchId) -> Option<&LayoutNode> {
        self.layouts.get(branch)
    }

    pub fn session(&self, session_id: SessionId) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    /// Replace a branch's tree wholesale, validating it first: every leaf
    /// must name a distinct existing pane of the branch, and every indexed
    /// pane must appear as a leaf. Invalid trees are rejected and the
    /// stored tree stays untouched.
    pub fn set_layout(&mut self, branch: &BranchId, tree: LayoutNode) -> Result<(), MuxError> {
        let mut seen = HashSet::new();
        for id in tree.panes() {
            if !seen.insert(id) {
                return Err(MuxError::InvalidLayout(format!(
                    "pane {id} appears more than once"
                )));
            }
            match self.panes.get(id) {
                None => {
                    return Err(MuxError::InvalidLayout(format!("pane {id} does not exist")));
                }
                Some(pane) if pane.branch != *branch => {
                    return Err(MuxError::InvalidLayout(format!(
                        "pane {id} belongs to branch {}",
                        pane.branch
                    )));
                }
                Some(_) => {}
            }
        }
        for id in self.panes.branch_pane_ids(branch) {
            if !seen.contains(id) {
                return Err(MuxError::InvalidLayout(format!(
                    "pane {id} missing from layout"
                )));
            }
        }

        self.layouts.insert(branch.clone(), tree);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashSet;
    use std::path::Path;

    use quay_pty::{ProcessGateway, PtyError, SessionId, SpawnedProcess};

    /// In-memory gateway: allocates ids like the real one, records kills
    /// and writes, and can be told to fail the next spawn.
    #[derive(Default)]
    pub(crate) struct FakeGateway {
        next_id: u64,
        pub alive: HashSet<SessionId>,
        pub killed: Vec<SessionId>,
        pub writes: Vec<(SessionId, Vec<u8>)>,
        pub fail_spawn: bool,
    }

    impl FakeGateway {
        pub fn new() -> Self {
            Self {
                next_id: 1,
                ..Self::default()
            }
        }
    }

    impl ProcessGateway for FakeGateway {
        fn create(&mut self, _working_dir: &Path) -> Result<SpawnedProcess, PtyError> {
            if self.fail_spawn {
                return Err(PtyError::SpawnFailed("forced failure".to_string()));
            }
            let session_id = SessionId::from_raw(self.next_id);
            self.next_id += 1;
            self.alive.insert(session_id);
            Ok(SpawnedProcess {
                session_id,
                pid: Some(1000 + session_id.raw() as u32),
            })
        }

        fn write(&mut self, session_id: SessionId, data: &[u8]) -> Result<(), PtyError> {
            if !self.alive.contains(&session_id) {
                return Err(PtyError::SessionNotFound(session_id));
            }
            self.writes.push((session_id, data.to_vec()));
            Ok(())
        }

        fn resize(&mut self, session_id: SessionId, _cols: u16, _rows: u16) -> Result<(), PtyError> {
            if !self.alive.contains(&session_id) {
                return Err(PtyError::SessionNotFound(session_id));
            }
            Ok(())
        }

        fn kill(&mut self, session_id: SessionId) -> Result<(), PtyError> {
            if !self.alive.remove(&session_id) {
                return Err(PtyError::SessionNotFound(session_id));
            }
            self.killed.push(session_id);
            Ok(())
        }
    }
}
