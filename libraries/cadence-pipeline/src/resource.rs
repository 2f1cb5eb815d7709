//! Public entry point: one locator in, one cancellable PCM stream out

use crate::command::{CommandSpec, ExternalTools, PcmFormat};
use crate::error::{AbnormalExit, PipelineError, Result, Stage};
use crate::stream::AudioStream;
use crate::supervisor::{PipelineHandle, PipelineSupervisor};
use crate::types::PipelineState;

/// A supervised fetcher -> transcoder chain for one locator
///
/// The output stream can be moved to a consumer with [`take_output`], but the
/// pipeline keeps control of the processes. Every exit path must end in
/// [`close`] or a drop of the pipeline, both of which kill and reap the two
/// processes.
///
/// [`take_output`]: ResourcePipeline::take_output
/// [`close`]: ResourcePipeline::close
#[derive(Debug)]
pub struct ResourcePipeline {
    locator: String,
    supervisor: PipelineSupervisor,
    output: Option<AudioStream>,
}

impl ResourcePipeline {
    /// Start fetching and transcoding `locator` to [`PcmFormat::default`]
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(locator: &str, tools: &ExternalTools) -> Result<Self> {
        let fetch = CommandSpec::fetch(&tools.fetcher, locator);
        let transcode = CommandSpec::transcode(&tools.transcoder, PcmFormat::default());
        Self::open_with(locator, &fetch, &transcode)
    }

    /// Start a pipeline from explicit command lines
    pub fn open_with(locator: &str, fetch: &CommandSpec, transcode: &CommandSpec) -> Result<Self> {
        tracing::debug!("Building pipeline for {}", locator);

        let mut supervisor = match PipelineSupervisor::build(fetch, transcode) {
            Ok(supervisor) => supervisor,
            Err(err) => {
                tracing::warn!("Pipeline for {} failed to build: {}", locator, err);
                return Err(err);
            }
        };
        let output = supervisor
            .take_output()
            .ok_or_else(|| PipelineError::build(Stage::Transcoder, "output already taken"))?;
        let output = AudioStream::new(output, supervisor.handle());

        tracing::info!("Streaming {}", locator);

        Ok(Self {
            locator: locator.to_string(),
            supervisor,
            output: Some(output),
        })
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Move the audio stream to its consumer; available once
    pub fn take_output(&mut self) -> Option<AudioStream> {
        self.output.take()
    }

    pub fn state(&self) -> PipelineState {
        self.supervisor.state()
    }

    /// Abnormal exit that failed this pipeline, if any
    pub fn failure(&self) -> Option<AbnormalExit> {
        self.supervisor.failure()
    }

    /// Handle for stopping and observing the pipeline from other tasks
    pub fn handle(&self) -> PipelineHandle {
        self.supervisor.handle()
    }

    /// Process ids of stages that have not been reaped yet
    pub fn live_pids(&self) -> Vec<u32> {
        self.supervisor.handle().live_pids()
    }

    /// Stop both processes; idempotent, valid in any state
    pub fn close(&mut self) {
        if self.supervisor.state() != PipelineState::Stopped {
            tracing::debug!("Closing pipeline for {}", self.locator);
        }
        self.supervisor.stop();
    }
}
