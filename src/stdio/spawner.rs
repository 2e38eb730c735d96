//! MCP server process harness.
//!
//! [`ServerProcess`] owns the child process and both protocol pipes for its
//! whole lifetime:
//! - dropping the harness without [`ServerProcess::shutdown`] kills the
//!   process, so early failures between launch and shutdown still release
//!   it. After `shutdown` the process is left to act on SIGTERM.
//! - stdin is held in an `Option` so [`ServerProcess::shutdown`] can close
//!   it explicitly; dropping the harness closes it implicitly.
//! - stdout is wrapped once in a [`LineReader`] so buffered bytes survive
//!   between successive [`ServerProcess::receive`] calls.
//! - stderr is connected according to [`StderrMode`] and never read.

use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::config::{ServerConfig, StderrMode};
use crate::rpc::Message;
use crate::stdio::reader::{self, LineReader};
use crate::stdio::writer;
use crate::{AppError, Result};

/// Running MCP server and its stdio pipes.
#[derive(Debug)]
pub struct ServerProcess {
    /// Child process handle.
    child: Child,
    /// Server stdin; `None` once closed.
    stdin: Option<ChildStdin>,
    /// Framed reader over the server's stdout.
    stdout: LineReader<ChildStdout>,
    /// Upper bound on a single [`receive`](Self::receive); `None` blocks.
    receive_timeout: Option<Duration>,
    /// Identifier handed out by the next [`next_request_id`](Self::next_request_id).
    next_id: u64,
    /// Set once `shutdown` has delivered SIGTERM; a failed signal leaves
    /// the kill on drop in place.
    terminated: bool,
}

impl ServerProcess {
    /// Launch the configured server with piped stdin and stdout.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - `AppError::Launch("failed to spawn server: …")` — the executable is
    ///   missing, not executable, or the OS refused to start it.
    /// - `AppError::Launch("failed to capture server …")` — a pipe was not
    ///   attached.
    pub fn start(config: &ServerConfig) -> Result<Self> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(stderr_stdio(config.stderr));

        let mut child = cmd.spawn().map_err(|err| {
            AppError::Launch(format!("failed to spawn server {}: {err}", config.command))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AppError::Launch("failed to capture server stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::Launch("failed to capture server stdout".into()))?;

        info!(
            command = config.command.as_str(),
            args = ?config.args,
            pid = child.id().unwrap_or(0),
            "server process spawned"
        );

        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout: reader::line_reader(stdout, config.max_line_bytes),
            receive_timeout: None,
            next_id: 1,
            terminated: false,
        })
    }

    /// Bound every subsequent [`receive`](Self::receive) by `timeout`.
    #[must_use]
    pub fn with_receive_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// OS process id, if the process has not been reaped.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Allocate the next request identifier (1, 2, 3, …).
    pub fn next_request_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Serialise a message and write it as one flushed line to the server.
    ///
    /// A message without `id` is a notification. No acknowledgement is read.
    ///
    /// # Errors
    ///
    /// - `AppError::Protocol("server stdin already closed")` after
    ///   [`close_input`](Self::close_input).
    /// - `AppError::Io` if the write fails.
    pub async fn send(
        &mut self,
        method: &str,
        params: Option<Value>,
        id: Option<u64>,
    ) -> Result<()> {
        self.send_message(&Message::new(method, params, id)).await
    }

    /// Write a pre-built [`Message`].
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub async fn send_message(&mut self, message: &Message) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| AppError::Protocol("server stdin already closed".into()))?;
        writer::write_message(stdin, message).await
    }

    /// Read until the next protocol message from the server.
    ///
    /// Returns `Ok(None)` when stdout closes before one arrives.
    ///
    /// # Errors
    ///
    /// - `AppError::Timeout` if a receive timeout is set and elapses.
    /// - `AppError::Io` if reading stdout fails.
    pub async fn receive(&mut self) -> Result<Option<Value>> {
        let Some(limit) = self.receive_timeout else {
            return reader::next_response(&mut self.stdout).await;
        };

        tokio::time::timeout(limit, reader::next_response(&mut self.stdout))
            .await
            .map_err(|_| AppError::Timeout(format!("no response from server within {limit:?}")))?
    }

    /// Close the server's stdin, signalling that no more requests follow.
    pub fn close_input(&mut self) {
        if self.stdin.take().is_some() {
            debug!("server stdin closed");
        }
    }

    /// Close stdin, then ask the server to terminate.
    ///
    /// Does not wait for the process to exit and does not inspect stderr.
    /// Stdin is closed before the signal is sent.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the termination signal cannot be delivered
    /// to a process that is still running.
    pub fn shutdown(mut self) -> Result<()> {
        self.close_input();

        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.terminated = true;
                info!(%status, "server already exited");
                return Ok(());
            }
            Ok(None) => {}
            Err(err) => warn!(%err, "could not poll server status before terminate"),
        }

        terminate(&mut self.child)?;
        self.terminated = true;
        info!("server termination requested");
        Ok(())
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        if self.terminated {
            return;
        }
        if let Err(err) = self.child.start_kill() {
            debug!(%err, "server kill on drop failed");
        } else {
            warn!("server dropped without shutdown, killed");
        }
    }
}

fn stderr_stdio(mode: StderrMode) -> Stdio {
    match mode {
        StderrMode::Piped => Stdio::piped(),
        StderrMode::Inherit => Stdio::inherit(),
        StderrMode::Null => Stdio::null(),
    }
}

/// Send SIGTERM so the server gets a chance to exit cleanly.
#[cfg(unix)]
fn terminate(child: &mut Child) -> Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(raw) = child.id() else {
        return Ok(());
    };
    let pid = i32::try_from(raw)
        .map_err(|_| AppError::Io(format!("server pid {raw} out of range")))?;

    match kill(Pid::from_raw(pid), Signal::SIGTERM) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(errno) => Err(AppError::Io(format!("failed to terminate server: {errno}"))),
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) -> Result<()> {
    child
        .start_kill()
        .map_err(|err| AppError::Io(format!("failed to terminate server: {err}")))
}
