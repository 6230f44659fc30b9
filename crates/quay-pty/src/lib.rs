//! quay-pty: PTY process gateway for Quay.
//!
//! This crate spawns shell processes attached to pseudo-terminals and
//! delivers their output and exit notifications asynchronously. It knows
//! nothing about panes, branches, or layout; that lives in `quay-mux`.
//!
//! # Architecture
//!
//! - [`PtyHandle`] — Low-level PTY process management (spawn, write, resize, kill).
//! - [`ProcessGateway`] — The command contract the session manager consumes.
//! - [`PtyGateway`] — The real gateway: one reader thread per session feeding
//!   a single [`PtyEvent`] channel.

pub mod gateway;
pub mod pty;

pub use gateway::{ProcessGateway, PtyEvent, PtyGateway, SessionId, SpawnedProcess};
pub use pty::{PtyError, PtyHandle};
