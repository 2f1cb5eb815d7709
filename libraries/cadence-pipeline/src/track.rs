//! A resolved track and its playback attempt

use crate::command::ExternalTools;
use crate::error::{PipelineError, Result};
use crate::resource::ResourcePipeline;
use crate::types::TrackState;
use cadence_core::TrackMetadata;
use std::sync::Arc;

/// Resolved metadata plus at most one live pipeline
///
/// ```text
/// Idle ──start()──▶ Streaming ──stop() / natural end / failure──▶ Idle
/// ```
///
/// A pipeline that completes or fails has already torn down its processes,
/// but stays attached, so its outcome remains readable through
/// [`pipeline`](Track::pipeline), until [`take_finished`](Track::take_finished),
/// [`stop`](Track::stop) or the next [`start`](Track::start) detaches it.
/// [`state`](Track::state) reports `Idle` for it either way.
///
/// Dropping a track tears down its pipeline.
#[derive(Debug)]
pub struct Track {
    metadata: TrackMetadata,
    tools: Arc<ExternalTools>,
    pipeline: Option<ResourcePipeline>,
}

impl Track {
    pub fn new(metadata: TrackMetadata, tools: Arc<ExternalTools>) -> Self {
        Self {
            metadata,
            tools,
            pipeline: None,
        }
    }

    pub fn metadata(&self) -> &TrackMetadata {
        &self.metadata
    }

    /// Canonical locator handed to the fetcher
    pub fn locator(&self) -> &str {
        &self.metadata.url
    }

    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    pub fn duration_secs(&self) -> u64 {
        self.metadata.duration_secs
    }

    pub fn state(&self) -> TrackState {
        match &self.pipeline {
            Some(pipeline) if pipeline.state().is_live() => TrackState::Streaming,
            _ => TrackState::Idle,
        }
    }

    /// The attached pipeline, live or already finished
    pub fn pipeline(&self) -> Option<&ResourcePipeline> {
        self.pipeline.as_ref()
    }

    /// Detach the attached pipeline if it reached a terminal state
    ///
    /// A live pipeline stays attached and `None` is returned.
    pub fn take_finished(&mut self) -> Option<ResourcePipeline> {
        if self.pipeline.as_ref()?.state().is_live() {
            return None;
        }
        self.pipeline.take()
    }

    /// Open a pipeline for this track's locator and attach it
    ///
    /// Rejected with [`PipelineError::AlreadyPlaying`] while the attached
    /// pipeline is live; that pipeline is left untouched. A pipeline that
    /// already ended is detached first.
    pub fn start(&mut self) -> Result<&mut ResourcePipeline> {
        if self.state() == TrackState::Streaming {
            return Err(PipelineError::AlreadyPlaying {
                title: self.metadata.title.clone(),
            });
        }
        if let Some(mut finished) = self.take_finished() {
            finished.close();
        }

        let pipeline = ResourcePipeline::open(&self.metadata.url, &self.tools)?;
        Ok(self.pipeline.insert(pipeline))
    }

    /// Detach and close the attached pipeline; no-op when idle
    pub fn stop(&mut self) {
        if let Some(mut pipeline) = self.pipeline.take() {
            tracing::debug!("Stopping {}", self.metadata.title);
            pipeline.close();
        }
    }
}
