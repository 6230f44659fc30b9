//! Pane table and branch pane index.
//!
//! Both live in one struct so the cross-reference invariant -- every pane id
//! in a branch index has a table entry and vice versa -- is maintained by
//! construction: insert and remove always update both sides.

use std::collections::HashMap;
use std::path::PathBuf;

use quay_pty::SessionId;

use crate::ids::{BranchId, PaneId};

/// A UI slot bound to exactly one terminal session.
#[derive(Debug, Clone)]
pub struct Pane {
    pub id: PaneId,
    pub session_id: SessionId,
    pub branch: BranchId,
    pub working_dir: PathBuf,
}

#[derive(Debug, Default)]
pub struct PaneTable {
    panes: HashMap<PaneId, Pane>,
    /// Per-branch pane ids in insertion order (meaningful for placement).
    by_branch: HashMap<BranchId, Vec<PaneId>>,
}

impl PaneTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pane: Pane) {
        self.by_branch
            .entry(pane.branch.clone())
            .or_default()
            .push(pane.id);
        self.panes.insert(pane.id, pane);
    }

    /// Remove a pane from the table and its branch index. Idempotent.
    pub fn remove(&mut self, id: PaneId) -> Option<Pane> {
        let pane = self.panes.remove(&id)?;
        if let Some(ids) = self.by_branch.get_mut(&pane.branch) {
            ids.retain(|p| *p != id);
            if ids.is_empty() {
                self.by_branch.remove(&pane.branch);
            }
        }
        Some(pane)
    }

    pub fn get(&self, id: PaneId) -> Option<&Pane> {
        self.panes.get(&id)
    }

    pub fn contains(&self, id: PaneId) -> bool {
        self.panes.contains_key(&id)
    }

    /// Panes of a branch in insertion order.
    pub fn panes_for_branch(&self, branch: &BranchId) -> Vec<&Pane> {
        self.branch_pane_ids(branch)
            .iter()
            .filter_map(|id| self.panes.get(id))
            .collect()
    }

    pub fn branch_pane_ids(&self, branch: &BranchId) -> &[PaneId] {
        self.by_branch.get(branch).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The branch's most recently inserted pane.
    pub fn last_pane_for_branch(&self, branch: &BranchId) -> Option<PaneId> {
        self.branch_pane_ids(branch).last().copied()
    }

    /// How many panes still reference a session.
    pub fn session_refcount(&self, session_id: SessionId) -> usize {
        self.panes
            .values()
            .filter(|pane| pane.session_id == session_id)
            .count()
    }

    pub fn len(&self) -> usize {
        self.panes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pane(id: u64, session: u64, branch: &str) -> Pane {
        Pane {
            id: PaneId::from_raw(id),
            session_id: SessionId::from_raw(session),
            branch: BranchId::from(branch),
            working_dir: PathBuf::from("/repo"),
        }
    }

    #[test]
    fn index_preserves_insertion_order() {
        let mut table = PaneTable::new();
        table.insert(pane(3, 1, "main"));
        table.insert(pane(1, 2, "main"));
        table.insert(pane(2, 3, "other"));

        let ids: Vec<PaneId> = table
            .panes_for_branch(&BranchId::from("main"))
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![PaneId::from_raw(3), PaneId::from_raw(1)]);
        assert_eq!(
            table.last_pane_for_branch(&BranchId::from("main")),
            Some(PaneId::from_raw(1))
        );
    }

    #[test]
    fn remove_updates_both_sides() {
        let mut table = PaneTable::new();
        table.insert(pane(1, 1, "main"));
        table.insert(pane(2, 2, "main"));

        assert!(table.remove(PaneId::from_raw(1)).is_some());

        assert!(!table.contains(PaneId::from_raw(1)));
        assert_eq!(
            table.branch_pane_ids(&BranchId::from("main")),
            &[PaneId::from_raw(2)]
        );
    }

    #[test]
    fn removing_last_pane_drops_the_branch_entry() {
        let mut table = PaneTable::new();
        table.insert(pane(1, 1, "main"));
        table.remove(PaneId::from_raw(1));

        assert!(table.branch_pane_ids(&BranchId::from("main")).is_empty());
        assert!(table.last_pane_for_branch(&BranchId::from("main")).is_none());
    }

    #[test]
    fn remove_is_idempotent() {
        let mut table = PaneTable::new();
        table.insert(pane(1, 1, "main"));

        assert!(table.remove(PaneId::from_raw(1)).is_some());
        assert!(table.remove(PaneId::from_raw(1)).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn session_refcount_counts_referencing_panes() {
        let mut table = PaneTable::new();
        table.insert(pane(1, 7, "main"));
        table.insert(pane(2, 7, "main"));
        table.insert(pane(3, 8, "main"));

        assert_eq!(table.session_refcount(SessionId::from_raw(7)), 2);
        table.remove(PaneId::from_raw(1));
        assert_eq!(table.session_refcount(SessionId::from_raw(7)), 1);
        table.remove(PaneId::from_raw(2));
        assert_eq!(table.session_refcount(SessionId::from_raw(7)), 0);
    }
}
