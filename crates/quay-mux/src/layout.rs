//! Binary split tree describing how a branch's panes are arranged.
//!
//! Trees are immutable values: every structural change (split, removal)
//! rebuilds the tree and the store replaces it wholesale. A split always has
//! exactly two children -- the type makes anything else unrepresentable --
//! and the first child renders first (left/top).

use serde::{Deserialize, Serialize};

use crate::ids::PaneId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitDirection {
    Horizontal,
    Vertical,
}

/// A node in a branch's layout tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayoutNode {
    /// A terminal pane occupying a leaf position.
    Terminal { pane: PaneId },
    /// A two-way split. `first` renders left (vertical) or top (horizontal).
    Split {
        direction: SplitDirection,
        first: Box<LayoutNode>,
        second: Box<LayoutNode>,
    },
}

impl LayoutNode {
    pub fn leaf(pane: PaneId) -> Self {
        LayoutNode::Terminal { pane }
    }

    pub fn contains(&self, pane: PaneId) -> bool {
        match self {
            LayoutNode::Terminal { pane: p } => *p == pane,
            LayoutNode::Split { first, second, .. } => {
                first.contains(pane) || second.contains(pane)
            }
        }
    }

    /// All pane ids in the tree, in-order (render order).
    pub fn panes(&self) -> Vec<PaneId> {
        let mut out = Vec::new();
        self.collect_panes(&mut out);
        out
    }

    fn collect_panes(&self, out: &mut Vec<PaneId>) {
        match self {
            LayoutNode::Terminal { pane } => out.push(*pane),
            LayoutNode::Split { first, second, .. } => {
                first.collect_panes(out);
                second.collect_panes(out);
            }
        }
    }

    /// Replace the `target` leaf with a split holding the target first and
    /// `new_pane` second. Returns the tree unchanged if `target` is absent.
    #[must_use]
    pub fn split_pane(self, target: PaneId, direction: SplitDirection, new_pane: PaneId) -> Self {
        match self {
            LayoutNode::Terminal { pane } if pane == target => LayoutNode::Split {
                direction,
                first: Box::new(LayoutNode::Terminal { pane }),
                second: Box::new(LayoutNode::Terminal { pane: new_pane }),
            },
            leaf @ LayoutNode::Terminal { .. } => leaf,
            LayoutNode::Split {
                direction: d,
                first,
                second,
            } => LayoutNode::Split {
                direction: d,
                first: Box::new(first.split_pane(target, direction, new_pane)),
                second: Box::new(second.split_pane(target, direction, new_pane)),
            },
        }
    }

    /// Remove the `target` leaf, collapsing its parent split to the
    /// surviving sibling. Returns `None` when the tree becomes empty.
    #[must_use]
    pub fn remove_pane(self, target: PaneId) -> Option<Self> {
        match self {
            LayoutNode::Terminal { pane } if pane == target => None,
            leaf @ LayoutNode::Terminal { .. } => Some(leaf),
            LayoutNode::Split {
                direction,
                first,
                second,
            } => match (first.remove_pane(target), second.remove_pane(target)) {
                (Some(first), Some(second)) => Some(LayoutNode::Split {
                    direction,
                    first: Box::new(first),
                    second: Box::new(second),
                }),
                (Some(survivor), None) | (None, Some(survivor)) => Some(survivor),
                (None, None) => None,
            },
        }
    }
}
