//! Spawned external process with observable exit
//!
//! Each [`ProcessHandle`] hands its `Child` to a reaper task. The reaper is the
//! only code that touches the OS process after spawn: it waits for the exit or,
//! once a kill is requested, delivers the kill and waits. Either way the child is
//! reaped and its exit published, so the process table entry is released on every
//! path.

use crate::command::CommandSpec;
use crate::error::{PipelineError, Result, Stage};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// How a process terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    code: Option<i32>,
    signal: Option<i32>,
}

impl ProcessExit {
    /// Exit with a plain status code
    pub const fn with_code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// Terminated by a signal
    pub const fn with_signal(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    /// Waiting on the process failed; the outcome is unknown
    pub(crate) const fn unknown() -> Self {
        Self {
            code: None,
            signal: None,
        }
    }

    fn from_status(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }

    /// Exit code, `None` when killed by a signal
    pub fn code(&self) -> Option<i32> {
        self.code
    }

    /// Terminating signal (Unix only)
    pub fn signal(&self) -> Option<i32> {
        self.signal
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {}", code),
            (None, Some(signal)) => write!(f, "killed by signal {}", signal),
            (None, None) => f.write_str("unknown exit status"),
        }
    }
}

/// Cloneable control side of a spawned process
///
/// Shared between a [`ProcessHandle`] and its supervisor.
#[derive(Debug, Clone)]
pub(crate) struct ProcessControl {
    stage: Stage,
    pid: Option<u32>,
    kill: CancellationToken,
    kill_requested: Arc<AtomicBool>,
    exit: watch::Receiver<Option<ProcessExit>>,
}

impl ProcessControl {
    /// Request termination; true only for the call that actually requested it
    pub(crate) fn kill(&self) -> bool {
        if self.exit.borrow().is_some() {
            return false;
        }
        if self.kill_requested.swap(true, Ordering::AcqRel) {
            return false;
        }
        tracing::debug!("Killing {} (pid {:?})", self.stage, self.pid);
        self.kill.cancel();
        true
    }

    pub(crate) fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub(crate) fn exit(&self) -> Option<ProcessExit> {
        *self.exit.borrow()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.exit().is_none()
    }

    pub(crate) async fn wait(&self) -> ProcessExit {
        let mut exit = self.exit.clone();
        let observed = exit.wait_for(Option::is_some).await.map(|exit| *exit);
        match observed {
            Ok(Some(exit)) => exit,
            // The reaper always publishes before finishing; a closed channel
            // means it was torn down with the runtime.
            _ => ProcessExit::unknown(),
        }
    }
}

/// One spawned external process
///
/// Piped standard streams are handed out once through the `take_*` methods.
/// Dropping the handle kills the process.
#[derive(Debug)]
pub struct ProcessHandle {
    control: ProcessControl,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
}

impl ProcessHandle {
    /// Launch `spec` as the given pipeline stage
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(stage: Stage, spec: &CommandSpec) -> Result<Self> {
        let mut child = spec.to_command().spawn().map_err(|source| PipelineError::Spawn {
            stage,
            program: spec.program_name(),
            source,
        })?;

        let pid = child.id();
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (exit_tx, exit_rx) = watch::channel(None);
        let kill = CancellationToken::new();
        tokio::spawn(reap(child, stage, pid, kill.clone(), exit_tx));

        tracing::debug!("Spawned {} `{}` (pid {:?})", stage, spec.program_name(), pid);

        Ok(Self {
            control: ProcessControl {
                stage,
                pid,
                kill,
                kill_requested: Arc::new(AtomicBool::new(false)),
                exit: exit_rx,
            },
            stdin,
            stdout,
            stderr,
        })
    }

    pub fn stage(&self) -> Stage {
        self.control.stage
    }

    /// OS process id, if the platform reported one
    pub fn pid(&self) -> Option<u32> {
        self.control.pid()
    }

    /// Exit status, once the process has been reaped
    pub fn exit(&self) -> Option<ProcessExit> {
        self.control.exit()
    }

    pub fn is_running(&self) -> bool {
        self.control.is_running()
    }

    /// Request immediate termination
    ///
    /// Never fails: on an exited process, or on a repeated call, this is a
    /// no-op. Returns whether this call requested the kill.
    pub fn kill(&self) -> bool {
        self.control.kill()
    }

    /// Wait until the process has terminated and been reaped
    pub async fn wait(&self) -> ProcessExit {
        self.control.wait().await
    }

    /// Register a one-shot observer for the process exit
    ///
    /// The callback runs exactly once on a runtime worker, including when the
    /// process already exited or is later killed.
    pub fn on_exit<F>(&self, callback: F)
    where
        F: FnOnce(ProcessExit) + Send + 'static,
    {
        let control = self.control.clone();
        tokio::spawn(async move {
            callback(control.wait().await);
        });
    }

    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.stdin.take()
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.stderr.take()
    }

    pub(crate) fn control(&self) -> ProcessControl {
        self.control.clone()
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        self.control.kill();
    }
}

async fn reap(
    mut child: Child,
    stage: Stage,
    pid: Option<u32>,
    kill: CancellationToken,
    exit_tx: watch::Sender<Option<ProcessExit>>,
) {
    let status = tokio::select! {
        biased;
        status = child.wait() => status,
        () = kill.cancelled() => {
            if let Err(err) = child.start_kill() {
                // Usually the process exited between the two branches.
                tracing::debug!("Kill of {} (pid {:?}) failed: {}", stage, pid, err);
            }
            child.wait().await
        }
    };

    let exit = match status {
        Ok(status) => ProcessExit::from_status(status),
        Err(err) => {
            tracing::warn!("Failed to wait for {} (pid {:?}): {}", stage, pid, err);
            ProcessExit::unknown()
        }
    };
    tracing::debug!("{} (pid {:?}) exited: {}", stage, pid, exit);
    exit_tx.send_replace(Some(exit));
}
