use std::io::{Read, Write};
use std::path::Path;

use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, MasterPty, PtySize};

use crate::gateway::SessionId;

/// Errors from PTY and gateway operations.
#[derive(Debug)]
pub enum PtyError {
    SpawnFailed(String),
    SessionNotFound(SessionId),
    ResizeFailed(String),
    Io(std::io::Error),
}

impl std::fmt::Display for PtyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PtyError::SpawnFailed(msg) => write!(f, "PTY spawn failed: {msg}"),
            PtyError::SessionNotFound(id) => write!(f, "unknown session: {id}"),
            PtyError::ResizeFailed(msg) => write!(f, "PTY resize failed: {msg}"),
            PtyError::Io(err) => write!(f, "PTY I/O error: {err}"),
        }
    }
}

impl std::error::Error for PtyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PtyError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PtyError {
    fn from(err: std::io::Error) -> Self {
        PtyError::Io(err)
    }
}

/// Owns one spawned shell attached to a pseudo-terminal.
///
/// The reader and the child handle can be extracted (`take_reader`,
/// `take_child`) for a dedicated I/O thread; the handle keeps the master,
/// the writer, and a killer so write/resize/kill keep working afterwards.
pub struct PtyHandle {
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    killer: Box<dyn ChildKiller + Send + Sync>,
    reader: Option<Box<dyn Read + Send>>,
    child: Option<Box<dyn Child + Send + Sync>>,
    pid: Option<u32>,
}

impl PtyHandle {
    /// Spawn the user's default shell in `working_dir` at the given size.
    pub fn spawn(working_dir: &Path, cols: u16, rows: u16) -> Result<Self, PtyError> {
        let pty_system = native_pty_system();

        let pair = pty_system
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::SpawnFailed(format!("failed to open PTY: {e}")))?;

        let mut cmd = CommandBuilder::new(default_shell());
        cmd.cwd(working_dir);

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| PtyError::SpawnFailed(format!("failed to spawn shell: {e}")))?;

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| PtyError::SpawnFailed(format!("failed to clone reader: {e}")))?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| PtyError::SpawnFailed(format!("failed to take writer: {e}")))?;

        let killer = child.clone_killer();
        let pid = child.process_id();

        Ok(Self {
            master: pair.master,
            writer,
            killer,
            reader: Some(reader),
            child: Some(child),
            pid,
        })
    }

    /// OS process id of the shell, if known.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Resize the PTY to new dimensions.
    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), PtyError> {
        self.master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::ResizeFailed(format!("{e}")))
    }

    /// Write bytes to the PTY master (user input -> shell).
    pub fn write(&mut self, data: &[u8]) -> Result<(), PtyError> {
        self.writer.write_all(data)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Terminate the shell. Best effort: the process may already have exited.
    pub fn kill(&mut self) -> Result<(), PtyError> {
        self.killer.kill()?;
        Ok(())
    }

    /// Extract the PTY reader for use in a dedicated I/O thread.
    ///
    /// Returns `None` if the reader was already taken.
    pub fn take_reader(&mut self) -> Option<Box<dyn Read + Send>> {
        self.reader.take()
    }

    /// Extract the child handle so the I/O thread can `wait()` on exit.
    ///
    /// The handle keeps a killer, so `kill` keeps working afterwards.
    pub fn take_child(&mut self) -> Option<Box<dyn Child + Send + Sync>> {
        self.child.take()
    }
}

/// Returns the user's default shell, falling back to `/bin/sh`.
fn default_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
}
