use std::fs;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::time::Duration as StdDuration;

use tempfile::NamedTempFile;
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

use super::error::ProcessError;

const LOG_TARGET: &str = "audio_file_player::process";

/// Exit code recorded when we terminate a process ourselves.
pub const KILLED_EXIT_CODE: i32 = -1;

/// How long a process group gets to exit after SIGTERM before SIGKILL follows.
pub const TERMINATION_GRACE: StdDuration = StdDuration::from_millis(500);

/// Observed lifecycle state of a spawned command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    Running,
    Succeeded,
    Failed(i32),
}

impl CompletionState {
    fn from_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(0) => CompletionState::Succeeded,
            Some(code) => CompletionState::Failed(code),
            // Terminated by a signal we did not send through `kill`
            None => CompletionState::Failed(-status.signal().unwrap_or(1)),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, CompletionState::Running)
    }
}

/// A shell command running in its own process group.
///
/// stdin is closed and stdout/stderr are redirected to temporary files, so
/// output stays readable while the command runs and after it exits. The
/// temporary files are removed when the handle is dropped; a handle dropped
/// while its command is still running sends SIGKILL to the whole group and
/// leaves reaping to the runtime.
#[derive(Debug)]
pub struct ProcessHandle {
    command_line: String,
    pid: u32,
    child: Child,
    state: CompletionState,
    stdout: NamedTempFile,
    stderr: NamedTempFile,
}

impl ProcessHandle {
    /// Spawns `command_line` through `sh -c`. Must be called within a tokio runtime.
    pub fn spawn(command_line: &str) -> Result<Self, ProcessError> {
        let stdout = NamedTempFile::new()?;
        let stderr = NamedTempFile::new()?;

        // Reopen so the child gets its own file offset and our reads never disturb its writes.
        let child = Command::new("sh")
            .arg("-c")
            .arg(command_line)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout.reopen()?))
            .stderr(Stdio::from(stderr.reopen()?))
            .process_group(0)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                command: command_line.to_string(),
                source,
            })?;
        let pid = child.id().ok_or_else(|| ProcessError::Spawn {
            command: command_line.to_string(),
            source: io::Error::new(io::ErrorKind::Other, "child exited before its pid was read"),
        })?;

        debug!(target: LOG_TARGET, pid, "Spawned command: {}", command_line);

        Ok(ProcessHandle {
            command_line: command_line.to_string(),
            pid,
            child,
            state: CompletionState::Running,
            stdout,
            stderr,
        })
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    /// Leader pid, which is also the process group id.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Non-blocking completion check. A terminal state is sticky.
    pub fn poll(&mut self) -> CompletionState {
        if self.state.is_terminal() {
            return self.state;
        }
        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.state = CompletionState::from_status(status);
                trace!(target: LOG_TARGET, pid = self.pid(), state = ?self.state, "Command exited.");
            }
            Ok(None) => {}
            Err(e) => {
                // try_wait only fails if the child was already reaped elsewhere
                warn!(target: LOG_TARGET, pid = self.pid(), "Failed to poll command: {}", e);
                self.state = CompletionState::Failed(KILLED_EXIT_CODE);
            }
        }
        self.state
    }

    pub fn is_done(&mut self) -> bool {
        self.poll().is_terminal()
    }

    /// True only once the command has exited with status 0.
    pub fn is_succeeded(&mut self) -> bool {
        self.poll() == CompletionState::Succeeded
    }

    /// Terminates the whole process group and reaps the leader.
    ///
    /// SIGTERM first; a group still running after [`TERMINATION_GRACE`] gets
    /// SIGKILL. No-op when the command has already terminated.
    pub async fn kill(&mut self) {
        if self.is_done() {
            return;
        }

        info!(target: LOG_TARGET, pid = self.pid, "Killing process group of: {}", self.command_line);
        self.signal_group(libc::SIGTERM);
        match timeout(TERMINATION_GRACE, self.child.wait()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(target: LOG_TARGET, pid = self.pid, "Failed to reap killed command: {}", e),
            Err(_) => {
                warn!(
                    target: LOG_TARGET,
                    pid = self.pid,
                    "Command ignored SIGTERM for {:?}, sending SIGKILL.",
                    TERMINATION_GRACE
                );
                self.signal_group(libc::SIGKILL);
                if let Err(e) = self.child.wait().await {
                    warn!(target: LOG_TARGET, pid = self.pid, "Failed to reap killed command: {}", e);
                }
            }
        }
        // Descendants that ignored SIGTERM still hold the group after the leader is gone
        self.signal_group(libc::SIGKILL);
        self.state = CompletionState::Failed(KILLED_EXIT_CODE);
    }

    fn signal_group(&self, signal: libc::c_int) {
        let pgid = self.pid as libc::pid_t;
        // SAFETY: killpg only sends a signal; pgid is the group this handle created.
        let rc = unsafe { libc::killpg(pgid, signal) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            trace!(target: LOG_TARGET, pid = pgid, signal, "killpg failed (group likely gone): {}", err);
        }
    }

    pub fn stdout_text(&self) -> String {
        read_capture(&self.stdout)
    }

    pub fn stderr_text(&self) -> String {
        read_capture(&self.stderr)
    }
}

fn read_capture(file: &NamedTempFile) -> String {
    match fs::read(file.path()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            warn!(target: LOG_TARGET, "Failed to read captured output {:?}: {}", file.path(), e);
            String::new()
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if !self.is_done() {
            debug!(target: LOG_TARGET, pid = self.pid, "Dropped while running, killing group: {}", self.command_line);
            // The runtime reaps the leader once it exits
            self.signal_group(libc::SIGKILL);
        }
    }
}
