//! Sequential playback of resolved queries

use crate::sink;
use cadence_core::{CadenceError, Messages};
use cadence_metadata::{MetadataError, MetadataResolver};
use cadence_pipeline::{ExternalTools, Track};
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

/// How one track ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Finished,
    Interrupted,
}

/// Counts reported after a playback run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub played: usize,
    pub skipped: usize,
    pub interrupted: bool,
}

/// Resolves queries and streams them one after another into a sink
///
/// A query that fails to resolve, or whose pipeline fails, is reported and
/// skipped. Cancelling the shutdown token stops the active track and ends
/// the run.
pub struct Player {
    resolver: Arc<dyn MetadataResolver>,
    tools: Arc<ExternalTools>,
    messages: Messages,
    max_playlist_size: usize,
}

impl Player {
    pub fn new(
        resolver: Arc<dyn MetadataResolver>,
        tools: Arc<ExternalTools>,
        messages: Messages,
        max_playlist_size: usize,
    ) -> Self {
        Self {
            resolver,
            tools,
            messages,
            max_playlist_size,
        }
    }

    /// Play at most `max_playlist_size` queries, in order
    pub async fn play_all<W>(
        &self,
        queries: &[String],
        sink: &mut W,
        shutdown: &CancellationToken,
    ) -> PlaybackSummary
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut summary = PlaybackSummary::default();

        if queries.len() > self.max_playlist_size {
            tracing::warn!(
                "Only the first {} of {} queries will be played",
                self.max_playlist_size,
                queries.len()
            );
        }

        for query in queries.iter().take(self.max_playlist_size) {
            let resolved = tokio::select! {
                biased;
                () = shutdown.cancelled() => None,
                resolved = self.resolver.resolve(query) => Some(resolved),
            };
            let metadata = match resolved {
                None => {
                    summary.interrupted = true;
                    break;
                }
                Some(Ok(metadata)) => metadata,
                Some(Err(err)) => {
                    tracing::warn!("{}", self.describe_lookup_failure(&err));
                    summary.skipped += 1;
                    continue;
                }
            };

            let mut track = Track::new(metadata, Arc::clone(&self.tools));
            match self.play_track(&mut track, sink, shutdown).await {
                Ok(Outcome::Finished) => summary.played += 1,
                Ok(Outcome::Interrupted) => {
                    summary.interrupted = true;
                    break;
                }
                Err(err) => {
                    tracing::warn!("{}", self.messages.playback_failed(track.metadata(), &err.to_string()));
                    summary.skipped += 1;
                }
            }
        }

        tracing::info!(
            "Played {} track(s), skipped {}{}",
            summary.played,
            summary.skipped,
            if summary.interrupted { " (interrupted)" } else { "" }
        );
        summary
    }

    /// Stream one track to the sink; the track is stopped on every path
    async fn play_track<W>(
        &self,
        track: &mut Track,
        sink: &mut W,
        shutdown: &CancellationToken,
    ) -> Result<Outcome, CadenceError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut audio = track
            .start()?
            .take_output()
            .ok_or_else(|| CadenceError::pipeline("audio output already taken"))?;
        tracing::info!("{}", self.messages.started_playing(track.metadata()));

        let outcome = tokio::select! {
            copied = sink::pump(&mut audio, sink) => copied
                .map(|bytes| {
                    tracing::debug!("Wrote {} bytes of PCM for {}", bytes, track.title());
                    Outcome::Finished
                })
                .map_err(CadenceError::from),
            () = shutdown.cancelled() => {
                tracing::info!("Interrupted: stopping {}", track.title());
                Ok(Outcome::Interrupted)
            }
        };

        track.stop();
        outcome
    }

    fn describe_lookup_failure(&self, err: &MetadataError) -> String {
        match err {
            MetadataError::NoResults(query) => self.messages.no_results(query),
            MetadataError::InvalidLink(url) => self.messages.invalid_link(url),
            other => other.to_string(),
        }
    }
}
