//! Event glue between the gateway and the workspace.
//!
//! Output and exit events arrive on one channel in the order the OS
//! produced them; forwarding through a single task keeps per-session
//! ordering intact. Exit events are applied under a brief workspace lock
//! that is never held across an await.

use std::sync::{Arc, Mutex};

use quay_pty::{ProcessGateway, PtyEvent, SessionId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::workspace::Workspace;

/// A chunk of PTY output, forwarded to the UI layer untouched. ANSI
/// parsing and rendering happen elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalOutput {
    pub session_id: SessionId,
    pub data: Vec<u8>,
}

/// Drain gateway events: output chunks go to `output_tx`, exits reconcile
/// session liveness. Runs until the gateway's sender side is dropped.
pub fn spawn_reconciler<G>(
    workspace: Arc<Mutex<Workspace<G>>>,
    mut events: mpsc::Receiver<PtyEvent>,
    output_tx: mpsc::Sender<TerminalOutput>,
) -> JoinHandle<()>
where
    G: ProcessGateway + 'static,
{
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                PtyEvent::Output { session_id, data } => {
                    let chunk = TerminalOutput { session_id, data };
                    if output_tx.send(chunk).await.is_err() {
                        // The UI side went away; keep applying exits so
                        // liveness bookkeeping stays correct.
                        log::debug!("output receiver dropped, discarding chunk");
                    }
                }
                PtyEvent::Exit {
                    session_id,
                    exit_code,
                } => {
                    let Ok(mut ws) = workspace.lock() else {
                        return;
                    };
                    ws.handle_exit(session_id, exit_code);
                }
            }
        }
    })
}
