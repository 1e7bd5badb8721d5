//! Process-group spawning and termination.
//!
//! Commands run through the shell with the user's interactive profile
//! sourced first, each in its own process group so the command and every
//! child it spawns can be killed as one unit. Standard output is exposed as
//! a line stream; standard error is discarded.

use async_trait::async_trait;
use std::process::Stdio;
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, BufReader, Lines},
    process::{Child, ChildStdout, Command},
};

/// Identifier of a spawned process group (the group leader's pid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessGroup(pub i32);

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to spawn shell: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("child exited before it could be tracked")]
    NoPid,
    #[error("child stdout was not captured")]
    NoStdout,
}

/// Capability interface over OS process groups; the seam that keeps the
/// reporter and cancellation logic portable across platforms.
#[async_trait]
pub trait ProcessHost: Send + Sync {
    /// Spawn `command_line` through the shell in its own process group.
    /// Execution is attempted exactly once; no retry on failure.
    async fn spawn_group(&self, command_line: &str) -> Result<RunningCommand, LaunchError>;

    /// Send SIGKILL (or the platform equivalent) to the whole group.
    fn kill_group(&self, group: ProcessGroup) -> std::io::Result<()>;
}

/// A live subprocess with its stdout wired for line-by-line consumption.
#[derive(Debug)]
pub struct RunningCommand {
    pid: u32,
    group: ProcessGroup,
    child: Child,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl RunningCommand {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn group(&self) -> ProcessGroup {
        self.group
    }

    /// Next stdout line, or `None` once the stream ends. A read error ends
    /// the stream early; output is line-oriented text by contract.
    pub async fn next_line(&mut self) -> Option<String> {
        match self.stdout.next_line().await {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("stdout read failed for pid {}: {e}", self.pid);
                None
            }
        }
    }

    /// Wait for the process to exit and return its platform status.
    pub async fn wait(mut self) -> std::io::Result<std::process::ExitStatus> {
        self.child.wait().await
    }
}

/// [`ProcessHost`] backed by the operating system: `sh -c` plus Unix
/// process groups.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessHost;

#[async_trait]
impl ProcessHost for SystemProcessHost {
    async fn spawn_group(&self, command_line: &str) -> Result<RunningCommand, LaunchError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(shell_command_line(command_line))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(LaunchError::Spawn)?;
        let pid = child.id().ok_or(LaunchError::NoPid)?;
        let stdout = child.stdout.take().ok_or(LaunchError::NoStdout)?;

        Ok(RunningCommand {
            pid,
            // The child is its own group leader, so pid and pgid coincide.
            group: ProcessGroup(pid as i32),
            child,
            stdout: BufReader::new(stdout).lines(),
        })
    }

    #[cfg(unix)]
    fn kill_group(&self, group: ProcessGroup) -> std::io::Result<()> {
        use nix::{
            sys::signal::{Signal, killpg},
            unistd::Pid,
        };
        killpg(Pid::from_raw(group.0), Signal::SIGKILL)
            .map_err(|errno| std::io::Error::from_raw_os_error(errno as i32))
    }

    #[cfg(not(unix))]
    fn kill_group(&self, _group: ProcessGroup) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "process groups require a unix host",
        ))
    }
}

/// The profile is sourced when present but never blocks the command itself;
/// `.` is the POSIX spelling of `source`.
fn shell_command_line(text: &str) -> String {
    format!("[ -f \"$HOME/.bash_profile\" ] && . \"$HOME/.bash_profile\"; {text}")
}
