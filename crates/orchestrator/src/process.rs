//! External process runner used by agents that wrap command-line tools.
//!
//! The child is placed in its own process group. The group is killed when the
//! call times out or is cancelled, and after a normal exit, so nothing the
//! tool spawned outlives the call.

use bmad_core::Outcome;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::InvocationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessCommand {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
}

impl ProcessCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// Build from `[program, args...]`; `None` when `argv` is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone()).args(args.iter().cloned()))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a process that ran to exit.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Text describing a nonzero exit: captured stderr, else the exit status.
    pub fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        match self.exit_code {
            Some(code) => format!("exited with status {}", code),
            None => "terminated by signal".to_string(),
        }
    }

    /// Exit 0 goes through `on_success`; any other exit becomes `Failed`.
    pub fn into_outcome(self, on_success: impl FnOnce(ProcessOutput) -> Outcome) -> Outcome {
        if self.success() {
            on_success(self)
        } else {
            Outcome::failed(self.failure_message())
        }
    }
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("timeout")]
    Timeout,

    #[error("cancelled")]
    Cancelled,

    #[error("process io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProcessError> for InvocationError {
    fn from(error: ProcessError) -> Self {
        match error {
            ProcessError::Timeout => InvocationError::Timeout,
            ProcessError::Cancelled => InvocationError::Cancelled,
            other => InvocationError::Process(other.to_string()),
        }
    }
}

impl From<ProcessError> for Outcome {
    fn from(error: ProcessError) -> Self {
        InvocationError::from(error).into()
    }
}

/// Run `command` to completion, bounded by `timeout` and `cancel`.
pub async fn run(
    command: &ProcessCommand,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<ProcessOutput, ProcessError> {
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);
    if let Some(dir) = &command.current_dir {
        cmd.current_dir(dir);
    }

    debug!(command = %command.display(), timeout_ms = timeout.as_millis() as u64, "Spawning process");

    let mut child = cmd.spawn().map_err(|e| ProcessError::Spawn {
        program: command.program.clone(),
        reason: e.to_string(),
    })?;
    // The leader may be reaped before the group is empty, so keep its pid,
    // which is also the process group id.
    let group = child.id();

    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());
    let abort_readers = [stdout_reader.abort_handle(), stderr_reader.abort_handle()];

    // Output is only complete once every holder of the pipes exited, so the
    // drain is bounded together with the wait.
    let completion = async {
        let status = child.wait().await?;
        let stdout = collect(stdout_reader).await?;
        let stderr = collect(stderr_reader).await?;
        Ok::<_, ProcessError>((status, stdout, stderr))
    };

    let result = tokio::select! {
        result = completion => result,
        _ = tokio::time::sleep(timeout) => Err(ProcessError::Timeout),
        _ = cancel.cancelled() => Err(ProcessError::Cancelled),
    };

    match result {
        Ok((status, stdout, stderr)) => {
            // Anything still in the group closed its pipes and would be left behind.
            kill_group(group);
            debug!(command = %command.display(), exit_code = ?status.code(), "Process exited");
            Ok(ProcessOutput {
                exit_code: status.code(),
                stdout,
                stderr,
            })
        }
        Err(error) => {
            warn!(command = %command.display(), reason = %error, "Process interrupted, terminating");
            kill_group(group);
            if let Err(e) = child.kill().await {
                debug!(error = %e, "Child already exited");
            }
            for reader in abort_readers {
                reader.abort();
            }
            Err(error)
        }
    }
}

fn spawn_reader<R>(stream: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            stream.read_to_end(&mut buf).await?;
        }
        Ok(buf)
    })
}

async fn collect(reader: JoinHandle<std::io::Result<Vec<u8>>>) -> Result<String, ProcessError> {
    let bytes = reader
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// SIGKILL every process in the group led by `group`.
#[cfg(unix)]
fn kill_group(group: Option<u32>) {
    if let Some(pgid) = group {
        // SAFETY: killpg only sends a signal; the group was created by process_group(0).
        unsafe {
            libc::killpg(pgid as libc::pid_t, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_group: Option<u32>) {}
