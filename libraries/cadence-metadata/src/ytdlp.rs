//! yt-dlp backed metadata resolution
//!
//! Links on video hosts are looked up directly; every other query goes through
//! yt-dlp's `ytsearch1:` search. yt-dlp prints a single JSON document per
//! lookup (`--dump-single-json`), which is mapped onto [`TrackMetadata`].

use crate::error::{MetadataError, Result};
use crate::query::QueryKind;
use crate::resolver::{MetadataResolver, UnresolvedLinkPolicy};
use async_trait::async_trait;
use cadence_core::{ToolCommand, TrackMetadata};
use serde::Deserialize;
use std::process::Stdio;
use tokio::process::Command;

/// Title used when the lookup does not report one
pub const UNKNOWN_TITLE: &str = "Unknown title";

/// Subset of a yt-dlp info document
#[derive(Debug, Default, Deserialize)]
pub(crate) struct VideoInfo {
    #[serde(rename = "_type")]
    kind: Option<String>,
    #[serde(default)]
    entries: Option<Vec<VideoInfo>>,
    webpage_url: Option<String>,
    title: Option<String>,
    duration: Option<f64>,
}

impl VideoInfo {
    /// The item a lookup resolved to; playlists and searches yield their first entry
    fn into_first(self) -> Option<VideoInfo> {
        if self.kind.as_deref() == Some("playlist") {
            self.entries.into_iter().flatten().next()
        } else {
            Some(self)
        }
    }
}

/// [`MetadataResolver`] that shells out to yt-dlp
#[derive(Debug, Clone)]
pub struct YtDlpResolver {
    tool: ToolCommand,
    policy: UnresolvedLinkPolicy,
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new(ToolCommand::new("yt-dlp"))
    }
}

impl YtDlpResolver {
    pub fn new(tool: ToolCommand) -> Self {
        Self {
            tool,
            policy: UnresolvedLinkPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: UnresolvedLinkPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn tool(&self) -> &ToolCommand {
        &self.tool
    }

    pub fn policy(&self) -> UnresolvedLinkPolicy {
        self.policy
    }

    /// What yt-dlp is asked to look up for a query
    fn lookup_target(query: &str, kind: QueryKind) -> String {
        match kind {
            QueryKind::VideoLink => query.to_string(),
            QueryKind::Url | QueryKind::Text => format!("ytsearch1:{}", query),
        }
    }

    async fn dump_info(&self, query: &str, kind: QueryKind) -> Result<VideoInfo> {
        let target = Self::lookup_target(query, kind);
        let program = self.tool.program.display().to_string();
        tracing::debug!("Looking up {} with {}", target, program);

        let output = Command::new(&self.tool.program)
            .args(&self.tool.extra_args)
            .args(["--dump-single-json", "--no-warnings", "--skip-download", "--"])
            .arg(&target)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| MetadataError::tool(format!("Failed to run {}: {}", program, err)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!("{} failed for {}: {}", program, target, stderr.trim());
            if kind == QueryKind::VideoLink {
                return Err(MetadataError::InvalidLink(query.to_string()));
            }
            return Err(MetadataError::tool(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                stderr.trim()
            )));
        }

        if output.stdout.iter().all(u8::is_ascii_whitespace) {
            return Ok(VideoInfo::default());
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

/// Map a lookup result onto track metadata
pub(crate) fn to_metadata(
    info: VideoInfo,
    query: &str,
    kind: QueryKind,
    policy: UnresolvedLinkPolicy,
) -> Result<TrackMetadata> {
    let Some(entry) = info.into_first() else {
        return Err(not_found(query, kind));
    };

    let url = match non_blank(entry.webpage_url) {
        Some(url) => url,
        None if kind == QueryKind::VideoLink => match policy {
            UnresolvedLinkPolicy::UseOriginal => query.to_string(),
            UnresolvedLinkPolicy::Reject => return Err(MetadataError::InvalidLink(query.to_string())),
        },
        None => return Err(not_found(query, kind)),
    };

    let title = non_blank(entry.title).unwrap_or_else(|| UNKNOWN_TITLE.to_string());
    let duration_secs = entry
        .duration
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .map_or(0, |secs| secs.round() as u64);

    Ok(TrackMetadata::new(url, title, duration_secs))
}

fn not_found(query: &str, kind: QueryKind) -> MetadataError {
    if kind.is_link() {
        MetadataError::InvalidLink(query.to_string())
    } else {
        MetadataError::NoResults(query.to_string())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[async_trait]
impl MetadataResolver for YtDlpResolver {
    async fn resolve(&self, query: &str) -> Result<TrackMetadata> {
        let query = query.trim();
        if query.is_empty() {
            return Err(MetadataError::NoResults(String::new()));
        }

        let kind = QueryKind::classify(query);
        let info = self.dump_info(query, kind).await?;
        let metadata = to_metadata(info, query, kind, self.policy)?;

        tracing::debug!("Resolved {:?} to {}", query, metadata);
        Ok(metadata)
    }
}
