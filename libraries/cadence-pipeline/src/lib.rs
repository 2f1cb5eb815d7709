//! Cadence - Resource Pipeline
//!
//! Turns one resolved locator into one live, killable stream of raw PCM by
//! chaining two external processes:
//!
//! ```text
//! yt-dlp -f bestaudio -o - <locator>  ──▶  ffmpeg -i pipe:0 -f s16le -ar 48000 -ac 2 pipe:1  ──▶  AudioStream
//! ```
//!
//! This crate provides:
//! - [`ProcessHandle`]: one spawned process with an observable, reaped exit
//! - [`PipelineSupervisor`]: spawns and links both stages; abnormal exit of
//!   either one tears down the other
//! - [`ResourcePipeline`]: builds the chain for a locator and exposes its
//!   [`AudioStream`] plus a [`PipelineHandle`] for cancellation
//! - [`Track`]: resolved metadata owning at most one live pipeline
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_core::TrackMetadata;
//! use cadence_pipeline::{ExternalTools, Track};
//! use std::sync::Arc;
//! use tokio::io::AsyncReadExt;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let metadata = TrackMetadata::new("https://youtube.com/watch?v=dQw4w9WgXcQ", "Song", 213);
//! let mut track = Track::new(metadata, Arc::new(ExternalTools::default()));
//!
//! let pipeline = track.start()?;
//! let mut audio = pipeline.take_output().expect("fresh pipeline");
//!
//! let mut pcm = vec![0u8; 3840];
//! let read = audio.read(&mut pcm).await?;
//! println!("first {} bytes of PCM", read);
//!
//! track.stop();
//! # Ok(())
//! # }
//! ```

mod command;
mod error;
mod process;
mod resource;
mod stream;
mod supervisor;
mod track;
pub mod types;

// Public exports
pub use cadence_core::ToolCommand;
pub use command::{CommandSpec, ExternalTools, PcmFormat, StdioConfig, StdioPolicy};
pub use error::{AbnormalExit, PipelineError, Result, Stage};
pub use process::{ProcessExit, ProcessHandle};
pub use resource::ResourcePipeline;
pub use stream::AudioStream;
pub use supervisor::{PipelineHandle, PipelineSupervisor, FORWARD_BUFFER_BYTES};
pub use track::Track;
pub use types::{PipelineState, TrackState};
