//! Error types for the resource pipeline

use crate::process::ProcessExit;
use std::fmt;
use thiserror::Error;

/// Which half of the two-process chain an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Downloader writing compressed media to stdout
    Fetcher,

    /// Transcoder turning stdin into raw PCM on stdout
    Transcoder,
}

impl Stage {
    /// The other stage of the chain
    pub fn counterpart(self) -> Self {
        match self {
            Stage::Fetcher => Stage::Transcoder,
            Stage::Transcoder => Stage::Fetcher,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Fetcher => f.write_str("fetcher"),
            Stage::Transcoder => f.write_str("transcoder"),
        }
    }
}

/// A stage that exited unsuccessfully before shutdown was requested
///
/// Recorded once per pipeline and reported through the pipeline state, the
/// handle's `failure()` and the final read of the audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{stage} exited abnormally ({exit})")]
pub struct AbnormalExit {
    pub stage: Stage,
    pub exit: ProcessExit,
}

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Executable missing or could not be launched
    #[error("Failed to spawn {stage} `{program}`: {source}")]
    Spawn {
        stage: Stage,
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Standard streams were not wired as the chain requires
    #[error("Failed to build pipeline at {stage}: {reason}")]
    Build { stage: Stage, reason: String },

    /// A stage exited unsuccessfully before shutdown was requested
    #[error(transparent)]
    AbnormalExit(#[from] AbnormalExit),

    /// A second pipeline was requested for a track that is still streaming
    #[error("Already playing: {title}")]
    AlreadyPlaying { title: String },
}

impl PipelineError {
    /// Create a build error
    pub fn build(stage: Stage, reason: impl Into<String>) -> Self {
        Self::Build {
            stage,
            reason: reason.into(),
        }
    }

    /// Stage the error is attributed to, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Spawn { stage, .. } | Self::Build { stage, .. } => Some(*stage),
            Self::AbnormalExit(failure) => Some(failure.stage),
            Self::AlreadyPlaying { .. } => None,
        }
    }
}

impl From<PipelineError> for cadence_core::CadenceError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::AlreadyPlaying { .. } => cadence_core::CadenceError::invalid_input(err.to_string()),
            other => cadence_core::CadenceError::pipeline(other.to_string()),
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
