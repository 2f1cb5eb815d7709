//! Joint supervision of the fetcher -> transcoder chain
//!
//! ```text
//!  fetcher ──stdout──▶ [forwarder, 64 KiB] ──stdin──▶ transcoder ──stdout──▶ consumer
//!     │                                                   │
//!     └──────────── exit ──▶ monitor ◀── exit ────────────┘
//! ```
//!
//! The monitor task routes every exit through [`Supervision::on_stage_exit`],
//! which is the only place where one stage's fate decides the other's.

use crate::command::CommandSpec;
use crate::error::{AbnormalExit, PipelineError, Result, Stage};
use crate::process::{ProcessControl, ProcessExit, ProcessHandle};
use crate::types::PipelineState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::io::BufReader;
use tokio::process::{ChildStdin, ChildStdout};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Capacity of the fetcher -> transcoder forwarding buffer
///
/// Together with the two OS pipe buffers this bounds how far the fetcher can
/// run ahead of the consumer.
pub const FORWARD_BUFFER_BYTES: usize = 64 * 1024;

/// State shared by the supervisor, its monitor task, handles and the output stream
#[derive(Debug)]
pub(crate) struct Supervision {
    fetcher: ProcessControl,
    transcoder: ProcessControl,
    state: watch::Sender<PipelineState>,
    failure: OnceLock<AbnormalExit>,
    stop_requested: AtomicBool,
    fetcher_released: AtomicBool,
    transcoder_input_closed: AtomicBool,
    cancel: CancellationToken,
}

impl Supervision {
    fn control(&self, stage: Stage) -> &ProcessControl {
        match stage {
            Stage::Fetcher => &self.fetcher,
            Stage::Transcoder => &self.transcoder,
        }
    }

    /// Coupled lifetime of the two stages
    ///
    /// - after `stop()`, exits are expected and ignored;
    /// - a clean transcoder exit ends the unit and releases the fetcher, whose
    ///   exit is then not a failure;
    /// - a fetcher exit after the transcoder stopped reading its input is
    ///   judged by the transcoder's exit, seen before or after this one;
    /// - any other unsuccessful exit records the failure (once), moves the
    ///   state to `Failed` and tears down both stages.
    fn on_stage_exit(&self, stage: Stage, exit: ProcessExit) {
        if self.stop_requested.load(Ordering::Acquire) {
            tracing::debug!("{} exited after stop: {}", stage, exit);
            return;
        }

        if exit.success() {
            tracing::debug!("{} finished cleanly", stage);
            if stage == Stage::Transcoder {
                self.fetcher_released.store(true, Ordering::Release);
                if self.fetcher.kill() {
                    tracing::debug!("Transcoder finished first; releasing fetcher");
                }
            }
            return;
        }

        if stage == Stage::Fetcher {
            if self.fetcher_released.load(Ordering::Acquire) {
                tracing::debug!("Released fetcher exited: {}", exit);
                return;
            }
            // Writing into a closed pipe kills the fetcher with SIGPIPE.
            if self.transcoder_input_closed.load(Ordering::Acquire) {
                tracing::debug!("Fetcher exited after transcoder input closed: {}", exit);
                return;
            }
        }

        let failure = AbnormalExit { stage, exit };
        if self.failure.set(failure).is_ok() {
            tracing::warn!("{}; stopping {}", failure, stage.counterpart());
            self.state.send_if_modified(|state| {
                if state.is_live() {
                    *state = PipelineState::Failed;
                    true
                } else {
                    false
                }
            });
        }
        self.teardown();
    }

    /// Both exits observed: a pipeline nobody stopped and nothing failed completed.
    fn settle(&self) {
        let completed = self.state.send_if_modified(|state| {
            if *state == PipelineState::Streaming {
                *state = PipelineState::Completed;
                true
            } else {
                false
            }
        });
        if completed {
            tracing::debug!("Pipeline completed");
        }
    }

    fn stop(&self) {
        if self.stop_requested.swap(true, Ordering::AcqRel) {
            return;
        }
        self.state.send_replace(PipelineState::Stopped);
        tracing::debug!("Pipeline stop requested");
        self.teardown();
    }

    fn teardown(&self) {
        self.cancel.cancel();
        self.fetcher.kill();
        self.transcoder.kill();
    }
}

/// Owner of the two jointly supervised processes
///
/// Dropping the supervisor stops the pipeline.
#[derive(Debug)]
pub struct PipelineSupervisor {
    supervision: Arc<Supervision>,
    fetcher: ProcessHandle,
    transcoder: ProcessHandle,
    output: Option<ChildStdout>,
    linked: bool,
}

impl PipelineSupervisor {
    /// Spawn the fetcher, then the transcoder, then link them
    ///
    /// The fetcher is fully spawned, with its output taken, before the
    /// transcoder is launched; a failure is therefore always attributed to one
    /// stage. Processes spawned before a failure are killed when their handles
    /// drop on the error path.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(fetch: &CommandSpec, transcode: &CommandSpec) -> Result<Self> {
        let (state, _) = watch::channel(PipelineState::Building);

        let mut fetcher = ProcessHandle::spawn(Stage::Fetcher, fetch)?;
        let fetched = fetcher
            .take_stdout()
            .ok_or_else(|| PipelineError::build(Stage::Fetcher, "stdout is not piped"))?;

        let mut transcoder = ProcessHandle::spawn(Stage::Transcoder, transcode)?;
        let transcoder_input = transcoder
            .take_stdin()
            .ok_or_else(|| PipelineError::build(Stage::Transcoder, "stdin is not piped"))?;
        let output = transcoder
            .take_stdout()
            .ok_or_else(|| PipelineError::build(Stage::Transcoder, "stdout is not piped"))?;

        let supervision = Arc::new(Supervision {
            fetcher: fetcher.control(),
            transcoder: transcoder.control(),
            state,
            failure: OnceLock::new(),
            stop_requested: AtomicBool::new(false),
            fetcher_released: AtomicBool::new(false),
            transcoder_input_closed: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        });

        tokio::spawn(forward(fetched, transcoder_input, Arc::clone(&supervision)));
        supervision.state.send_replace(PipelineState::Streaming);
        tokio::spawn(monitor(Arc::clone(&supervision)));

        tracing::debug!(
            "Linked fetcher (pid {:?}) to transcoder (pid {:?})",
            fetcher.pid(),
            transcoder.pid()
        );

        Ok(Self {
            supervision,
            fetcher,
            transcoder,
            output: Some(output),
            linked: true,
        })
    }

    /// Transcoder stdout; handed out once
    pub fn take_output(&mut self) -> Option<ChildStdout> {
        self.output.take()
    }

    /// Whether fetcher output is connected to transcoder input
    pub fn is_linked(&self) -> bool {
        self.linked
    }

    pub fn state(&self) -> PipelineState {
        *self.supervision.state.borrow()
    }

    pub fn failure(&self) -> Option<AbnormalExit> {
        self.supervision.failure.get().copied()
    }

    /// Process id of one stage
    pub fn pid(&self, stage: Stage) -> Option<u32> {
        match stage {
            Stage::Fetcher => self.fetcher.pid(),
            Stage::Transcoder => self.transcoder.pid(),
        }
    }

    /// Stop both processes; idempotent and safe in any state
    pub fn stop(&mut self) {
        self.linked = false;
        self.supervision.stop();
    }

    /// Cloneable handle for observing and stopping this pipeline
    pub fn handle(&self) -> PipelineHandle {
        PipelineHandle {
            supervision: Arc::clone(&self.supervision),
        }
    }
}

impl Drop for PipelineSupervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Shared handle to a running pipeline
///
/// Cheap to clone and safe to use from any task, including concurrently with a
/// read of the output stream. It observes the processes but never signals them
/// except through [`PipelineHandle::stop`].
#[derive(Debug, Clone)]
pub struct PipelineHandle {
    supervision: Arc<Supervision>,
}

impl PipelineHandle {
    /// Stop the pipeline; idempotent
    pub fn stop(&self) {
        self.supervision.stop();
    }

    pub fn state(&self) -> PipelineState {
        *self.supervision.state.borrow()
    }

    /// Abnormal exit that failed the pipeline, if any
    pub fn failure(&self) -> Option<AbnormalExit> {
        self.supervision.failure.get().copied()
    }

    /// Exit status of one stage, once reaped
    pub fn exit(&self, stage: Stage) -> Option<ProcessExit> {
        self.supervision.control(stage).exit()
    }

    /// Process ids of stages that have not been reaped yet
    pub fn live_pids(&self) -> Vec<u32> {
        [Stage::Fetcher, Stage::Transcoder]
            .into_iter()
            .map(|stage| self.supervision.control(stage))
            .filter(|control| control.is_running())
            .filter_map(|control| control.pid())
            .collect()
    }

    /// Wait for a terminal state (`Completed`, `Stopped` or `Failed`)
    pub async fn finished(&self) -> PipelineState {
        let mut state = self.supervision.state.subscribe();
        let terminal = state.wait_for(PipelineState::is_terminal).await.map(|state| *state);
        terminal.unwrap_or(PipelineState::Stopped)
    }

    /// Wait until both processes have exited and been reaped
    pub async fn released(&self) {
        self.supervision.fetcher.wait().await;
        self.supervision.transcoder.wait().await;
    }

    pub(crate) fn cancellation(&self) -> CancellationToken {
        self.supervision.cancel.clone()
    }
}

/// Copy fetcher output into transcoder input through a bounded buffer
///
/// `copy_buf` only reads again after the previous chunk was written, so a slow
/// consumer stalls the transcoder, which stalls this task, which stops draining
/// the fetcher's pipe.
///
/// A copy error means the transcoder stopped reading. That is recorded before
/// the fetcher's output is dropped, so the fetcher can only die of the broken
/// pipe after the supervisor knows why.
async fn forward(fetched: ChildStdout, mut transcoder_input: ChildStdin, supervision: Arc<Supervision>) {
    let mut reader = BufReader::with_capacity(FORWARD_BUFFER_BYTES, fetched);
    tokio::select! {
        copied = tokio::io::copy_buf(&mut reader, &mut transcoder_input) => match copied {
            Ok(bytes) => tracing::debug!("Forwarded {} bytes to transcoder", bytes),
            Err(err) => {
                tracing::debug!("Transcoder stopped reading: {}", err);
                supervision.transcoder_input_closed.store(true, Ordering::Release);
            }
        },
        () = supervision.cancel.cancelled() => tracing::debug!("Forwarding cancelled"),
    }
    drop(reader);
    // Closing stdin is the transcoder's end-of-input.
    drop(transcoder_input);
}

async fn monitor(supervision: Arc<Supervision>) {
    let fetcher = supervision.fetcher.clone();
    let transcoder = supervision.transcoder.clone();
    let fetcher_exit = fetcher.wait();
    let transcoder_exit = transcoder.wait();
    tokio::pin!(fetcher_exit, transcoder_exit);

    let mut fetcher_done = false;
    let mut transcoder_done = false;
    while !(fetcher_done && transcoder_done) {
        tokio::select! {
            exit = &mut fetcher_exit, if !fetcher_done => {
                fetcher_done = true;
                supervision.on_stage_exit(Stage::Fetcher, exit);
            }
            exit = &mut transcoder_exit, if !transcoder_done => {
                transcoder_done = true;
                supervision.on_stage_exit(Stage::Transcoder, exit);
            }
        }
    }
    supervision.settle();
}
