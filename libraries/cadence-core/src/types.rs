//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Resolved description of a playable item
///
/// Produced by metadata resolution. `url` is the canonical locator handed to the
/// fetcher; the rest is display-only and never changes after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMetadata {
    /// Canonical locator (URL or opaque identifier)
    pub url: String,

    /// Display title
    pub title: String,

    /// Duration in whole seconds (0 when unknown or live)
    pub duration_secs: u64,
}

impl TrackMetadata {
    /// Create metadata from its parts
    pub fn new(url: impl Into<String>, title: impl Into<String>, duration_secs: u64) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            duration_secs,
        }
    }

    /// Duration as a [`Duration`]
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    /// Human-readable duration, `m:ss` or `h:mm:ss`
    ///
    /// Unknown durations (0) render as `live`.
    pub fn duration_label(&self) -> String {
        if self.duration_secs == 0 {
            return "live".to_string();
        }
        let hours = self.duration_secs / 3600;
        let minutes = (self.duration_secs % 3600) / 60;
        let seconds = self.duration_secs % 60;
        if hours > 0 {
            format!("{}:{:02}:{:02}", hours, minutes, seconds)
        } else {
            format!("{}:{:02}", minutes, seconds)
        }
    }
}

impl fmt::Display for TrackMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.url)
    }
}

/// An external executable plus arguments placed before the generated ones
///
/// Used for the downloader and the transcoder; `extra_args` carries things
/// like `--cookies` or the script of a wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCommand {
    /// Executable name (looked up on the search path) or path
    pub program: PathBuf,

    /// Arguments preceding the generated command line
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl ToolCommand {
    /// Create a command with no extra arguments
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
        }
    }

    /// Add arguments that precede the generated command line
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Whether the program name is blank
    pub fn is_blank(&self) -> bool {
        self.program.as_os_str().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_label_formats() {
        let mut track = TrackMetadata::new("https://youtu.be/x", "Song", 59);
        assert_eq!(track.duration_label(), "0:59");

        track.duration_secs = 3 * 60 + 7;
        assert_eq!(track.duration_label(), "3:07");

        track.duration_secs = 3600 + 2 * 60 + 5;
        assert_eq!(track.duration_label(), "1:02:05");

        track.duration_secs = 0;
        assert_eq!(track.duration_label(), "live");
    }

    #[test]
    fn serializes_with_snake_case_fields() {
        let track = TrackMetadata::new("https://youtu.be/x", "Song", 12);
        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(json["url"], "https://youtu.be/x");
        assert_eq!(json["title"], "Song");
        assert_eq!(json["duration_secs"], 12);
        assert_eq!(track.duration(), Duration::from_secs(12));
    }

    #[test]
    fn tool_command_extra_args_default_to_empty() {
        let tool: ToolCommand = serde_json::from_str(r#"{"program": "yt-dlp"}"#).unwrap();
        assert_eq!(tool, ToolCommand::new("yt-dlp"));
        assert!(!tool.is_blank());

        let wrapped = ToolCommand::new("sh").with_args(["-c", "exec cat"]);
        assert_eq!(wrapped.extra_args, vec!["-c", "exec cat"]);
        assert!(ToolCommand::new("").is_blank());
    }
}
