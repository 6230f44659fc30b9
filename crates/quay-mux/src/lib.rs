//! quay-mux: terminal session and split-layout management for Quay.
//!
//! Tracks the PTY sessions of each workspace branch, the panes that show
//! them, and the binary split tree arranging those panes on screen. All
//! mutations funnel through the [`Workspace`] facade so the cross-store
//! invariants (pane table, branch index, and layout leaves always agree;
//! focus never dangles) hold at the interface.
//!
//! # Architecture
//!
//! - [`Workspace`] — compound, invariant-preserving operations over the
//!   session registry, pane table, layout store, and focus tracker.
//! - [`LayoutNode`] — the per-branch split tree; pure value, replaced
//!   wholesale on every structural change.
//! - [`reconcile`] — the tokio task bridging gateway events back into the
//!   workspace (exit reconciliation, output forwarding).
//!
//! Process spawning itself lives in `quay-pty`; this crate consumes it
//! through the [`ProcessGateway`](quay_pty::ProcessGateway) contract.

pub mod error;
pub mod ids;
pub mod layout;
pub mod panes;
pub mod reconcile;
pub mod session;
pub mod workspace;

pub use error::MuxError;
pub use ids::{BranchId, PaneId};
pub use layout::{LayoutNode, SplitDirection};
pub use panes::Pane;
pub use reconcile::{spawn_reconciler, TerminalOutput};
pub use session::Session;
pub use workspace::{TerminalOpened, Workspace};
