//! Process gateway: spawns PTY-attached shells and delivers their
//! output and exit events over a channel.
//!
//! Blocking PTY reads must not run on the async runtime, so every session
//! gets a dedicated OS reader thread. The thread forwards output chunks via
//! `blocking_send` and, once the reader hits EOF, waits for the child and
//! emits exactly one [`PtyEvent::Exit`]. Dropping the event receiver ends
//! the subscription; reader threads stop forwarding and wind down.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

use portable_pty::Child;
use tokio::sync::mpsc;

use crate::pty::{PtyError, PtyHandle};

/// Initial PTY size; the UI resizes once the pane is laid out.
pub const DEFAULT_COLS: u16 = 80;
pub const DEFAULT_ROWS: u16 = 24;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Unique identifier for a terminal session, allocated by the gateway.
/// Never reused for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub const fn from_raw(raw: u64) -> Self {
        SessionId(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of spawning a shell process.
#[derive(Debug, Clone, Copy)]
pub struct SpawnedProcess {
    pub session_id: SessionId,
    pub pid: Option<u32>,
}

/// Asynchronous events delivered by the gateway.
///
/// Per-session ordering matches the order the OS produced the bytes, and
/// there is at most one `Exit` per session, ever.
#[derive(Debug)]
pub enum PtyEvent {
    Output {
        session_id: SessionId,
        data: Vec<u8>,
    },
    Exit {
        session_id: SessionId,
        exit_code: Option<u32>,
    },
}

/// The narrow contract the session manager consumes.
///
/// Implemented by [`PtyGateway`] for real shells and by in-memory fakes in
/// tests. `write`, `resize`, and `kill` fail with
/// [`PtyError::SessionNotFound`] for ids the gateway no longer recognizes.
pub trait ProcessGateway: Send {
    /// Spawn a shell in `working_dir`. Not retried on failure; the caller
    /// decides whether spawning again makes sense.
    fn create(&mut self, working_dir: &Path) -> Result<SpawnedProcess, PtyError>;

    fn write(&mut self, session_id: SessionId, data: &[u8]) -> Result<(), PtyError>;

    fn resize(&mut self, session_id: SessionId, cols: u16, rows: u16) -> Result<(), PtyError>;

    /// Terminate the session's process and release the gateway's resources
    /// for it. Killing an already-exited process is not an error.
    fn kill(&mut self, session_id: SessionId) -> Result<(), PtyError>;
}

/// Real gateway over `portable-pty` shells.
pub struct PtyGateway {
    sessions: HashMap<SessionId, PtyHandle>,
    events: mpsc::Sender<PtyEvent>,
    next_id: u64,
}

impl PtyGateway {
    /// Create a gateway plus the receiving end of its event stream.
    pub fn new() -> (Self, mpsc::Receiver<PtyEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let gateway = Self {
            sessions: HashMap::new(),
            events: tx,
            next_id: 1,
        };
        (gateway, rx)
    }

    /// Session ids currently held by the gateway.
    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl ProcessGateway for PtyGateway {
    fn create(&mut self, working_dir: &Path) -> Result<SpawnedProcess, PtyError> {
        let mut handle = PtyHandle::spawn(working_dir, DEFAULT_COLS, DEFAULT_ROWS)?;

        let session_id = SessionId(self.next_id);
        self.next_id += 1;

        let pid = handle.pid();
        let reader = handle
            .take_reader()
            .ok_or_else(|| PtyError::SpawnFailed("PTY reader missing".to_string()))?;
        let child = handle
            .take_child()
            .ok_or_else(|| PtyError::SpawnFailed("PTY child missing".to_string()))?;

        start_reader_thread(session_id, reader, child, self.events.clone());
        self.sessions.insert(session_id, handle);

        Ok(SpawnedProcess { session_id, pid })
    }

    fn write(&mut self, session_id: SessionId, data: &[u8]) -> Result<(), PtyError> {
        let handle = self
            .sessions
            .get_mut(&session_id)
            .ok_or(PtyError::SessionNotFound(session_id))?;
        handle.write(data)
    }

    fn resize(&mut self, session_id: SessionId, cols: u16, rows: u16) -> Result<(), PtyError> {
        let handle = self
            .sessions
            .get(&session_id)
            .ok_or(PtyError::SessionNotFound(session_id))?;
        handle.resize(cols, rows)
    }

    fn kill(&mut self, session_id: SessionId) -> Result<(), PtyError> {
        let mut handle = self
            .sessions
            .remove(&session_id)
            .ok_or(PtyError::SessionNotFound(session_id))?;
        if let Err(e) = handle.kill() {
            // The process exited on its own; the reader thread still
            // delivers the single Exit event.
            log::debug!("kill for session {session_id}: {e}");
        }
        Ok(())
        // Dropping the handle closes master and writer; the reader thread
        // sees EOF and emits the Exit event.
    }
}

/// Read PTY output on a dedicated OS thread until EOF, then reap the child.
fn start_reader_thread(
    session_id: SessionId,
    mut reader: Box<dyn Read + Send>,
    mut child: Box<dyn Child + Send + Sync>,
    events: mpsc::Sender<PtyEvent>,
) {
    std::thread::Builder::new()
        .name(format!("pty-io-{session_id}"))
        .spawn(move || {
            let mut buf = [0u8; 8192];
            loop {
                let n = match reader.read(&mut buf) {
                    Ok(0) => break, // EOF -- PTY closed
                    Ok(n) => n,
                    Err(_) => break, // read error -- PTY likely closed
                };
                let event = PtyEvent::Output {
                    session_id,
                    data: buf[..n].to_vec(),
                };
                if events.blocking_send(event).is_err() {
                    // Receiver dropped: subscription over, stop forwarding.
                    return;
                }
            }

            let exit_code = child.wait().ok().map(|status| status.exit_code());
            let _ = events.blocking_send(PtyEvent::Exit {
                session_id,
                exit_code,
            });
        })
        .expect("failed to spawn PTY reader thread");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::time::timeout;

    /// Drain events until the predicate matches or the deadline passes.
    async fn wait_for_event<F>(rx: &mut mpsc::Receiver<PtyEvent>, mut pred: F) -> Option<PtyEvent>
    where
        F: FnMut(&PtyEvent) -> bool,
    {
        let deadline = Duration::from_secs(5);
        loop {
            match timeout(deadline, rx.recv()).await {
                Ok(Some(event)) if pred(&event) => return Some(event),
                Ok(Some(_)) => continue,
                Ok(None) | Err(_) => return None,
            }
        }
    }

    #[tokio::test]
    async fn create_delivers_output() {
        let (mut gateway, mut rx) = PtyGateway::new();
        let spawned = gateway.create(Path::new("/tmp")).unwrap();

        gateway
            .write(spawned.session_id, b"echo QUAY_GATEWAY_OK\n")
            .unwrap();

        let mut collected = Vec::new();
        let found = wait_for_event(&mut rx, |event| {
            if let PtyEvent::Output { session_id, data } = event {
                assert_eq!(*session_id, spawned.session_id);
                collected.extend_from_slice(data);
            }
            String::from_utf8_lossy(&collected).contains("QUAY_GATEWAY_OK")
        })
        .await;

        assert!(found.is_some(), "never saw echoed marker in PTY output");

        gateway.kill(spawned.session_id).unwrap();
    }

    #[tokio::test]
    async fn natural_exit_delivers_exit_event() {
        let (mut gateway, mut rx) = PtyGateway::new();
        let spawned = gateway.create(Path::new("/tmp")).unwrap();

        gateway.write(spawned.session_id, b"exit 0\n").unwrap();

        let event = wait_for_event(&mut rx, |event| matches!(event, PtyEvent::Exit { .. })).await;
        match event {
            Some(PtyEvent::Exit {
                session_id,
                exit_code,
            }) => {
                assert_eq!(session_id, spawned.session_id);
                assert_eq!(exit_code, Some(0));
            }
            other => panic!("expected Exit event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn kill_delivers_exit_event_once() {
        let (mut gateway, mut rx) = PtyGateway::new();
        let spawned = gateway.create(Path::new("/tmp")).unwrap();

        gateway.kill(spawned.session_id).unwrap();
        assert!(gateway.session_ids().is_empty());

        let event = wait_for_event(&mut rx, |event| matches!(event, PtyEvent::Exit { .. })).await;
        assert!(event.is_some(), "expected an Exit event after kill");

        // Commands against the killed id now fail as unknown.
        let err = gateway.write(spawned.session_id, b"x").unwrap_err();
        assert!(matches!(err, PtyError::SessionNotFound(id) if id == spawned.session_id));
    }

    #[tokio::test]
    async fn unknown_session_commands_fail() {
        let (mut gateway, _rx) = PtyGateway::new();
        let bogus = SessionId::from_raw(999);

        assert!(matches!(
            gateway.write(bogus, b"x"),
            Err(PtyError::SessionNotFound(_))
        ));
        assert!(matches!(
            gateway.resize(bogus, 80, 24),
            Err(PtyError::SessionNotFound(_))
        ));
        assert!(matches!(
            gateway.kill(bogus),
            Err(PtyError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn session_ids_are_unique() {
        let (mut gateway, _rx) = PtyGateway::new();
        let a = gateway.create(Path::new("/tmp")).unwrap();
        let b = gateway.create(Path::new("/tmp")).unwrap();

        assert_ne!(a.session_id, b.session_id);
        assert_eq!(gateway.session_ids(), vec![a.session_id, b.session_id]);

        gateway.kill(a.session_id).unwrap();
        gateway.kill(b.session_id).unwrap();
    }
}
