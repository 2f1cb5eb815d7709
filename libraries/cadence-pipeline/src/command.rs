//! Command lines for the fetcher and transcoder processes

use cadence_core::ToolCommand;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// What a child process gets on one standard stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StdioPolicy {
    /// Connected to the null device
    Ignore,

    /// A pipe the parent can read or write
    Piped,

    /// Shared with the parent process
    Inherit,
}

impl StdioPolicy {
    fn to_stdio(self) -> Stdio {
        match self {
            StdioPolicy::Ignore => Stdio::null(),
            StdioPolicy::Piped => Stdio::piped(),
            StdioPolicy::Inherit => Stdio::inherit(),
        }
    }
}

/// Standard stream policy for stdin, stdout and stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StdioConfig {
    pub stdin: StdioPolicy,
    pub stdout: StdioPolicy,
    pub stderr: StdioPolicy,
}

impl StdioConfig {
    /// Fetcher: no input, media on a pipe, diagnostics to our stderr
    pub const FETCHER: Self = Self::new(StdioPolicy::Ignore, StdioPolicy::Piped, StdioPolicy::Inherit);

    /// Transcoder: media in and PCM out over pipes, diagnostics to our stderr
    pub const TRANSCODER: Self = Self::new(StdioPolicy::Piped, StdioPolicy::Piped, StdioPolicy::Inherit);

    pub const fn new(stdin: StdioPolicy, stdout: StdioPolicy, stderr: StdioPolicy) -> Self {
        Self { stdin, stdout, stderr }
    }
}

/// Raw PCM output format requested from the transcoder
///
/// Samples are always signed 16-bit little-endian, interleaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmFormat {
    /// ffmpeg muxer name for the sample layout
    pub const SAMPLE_FORMAT: &'static str = "s16le";

    /// Bytes per sample per channel
    pub const BYTES_PER_SAMPLE: u32 = 2;

    /// Bytes in one frame (one sample for every channel)
    pub fn frame_size(&self) -> u32 {
        Self::BYTES_PER_SAMPLE * u32::from(self.channels)
    }

    /// Bytes of PCM per second of audio
    pub fn bytes_per_second(&self) -> u64 {
        u64::from(self.sample_rate) * u64::from(self.frame_size())
    }
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
        }
    }
}

/// The two executables a pipeline chains together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalTools {
    #[serde(default = "default_fetcher")]
    pub fetcher: ToolCommand,

    #[serde(default = "default_transcoder")]
    pub transcoder: ToolCommand,
}

fn default_fetcher() -> ToolCommand {
    ToolCommand::new("yt-dlp")
}

fn default_transcoder() -> ToolCommand {
    ToolCommand::new("ffmpeg")
}

impl Default for ExternalTools {
    fn default() -> Self {
        Self {
            fetcher: default_fetcher(),
            transcoder: default_transcoder(),
        }
    }
}

/// A fully specified process launch: program, arguments and stdio policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub stdio: StdioConfig,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>, stdio: StdioConfig) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdio,
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Downloader command: best available audio for `locator`, written to stdout
    pub fn fetch(tool: &ToolCommand, locator: &str) -> Self {
        Self::new(&tool.program, StdioConfig::FETCHER)
            .args(&tool.extra_args)
            .args(["-f", "bestaudio", "-o", "-", "--", locator])
    }

    /// Transcoder command: anything on stdin to raw PCM in `format` on stdout
    pub fn transcode(tool: &ToolCommand, format: PcmFormat) -> Self {
        Self::new(&tool.program, StdioConfig::TRANSCODER)
            .args(&tool.extra_args)
            .args(["-loglevel", "error", "-i", "pipe:0", "-f", PcmFormat::SAMPLE_FORMAT])
            .arg("-ar")
            .arg(format.sample_rate.to_string())
            .arg("-ac")
            .arg(format.channels.to_string())
            .arg("pipe:1")
    }

    /// Program as shown in logs and errors
    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    pub(crate) fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(self.stdio.stdin.to_stdio())
            .stdout(self.stdio.stdout.to_stdio())
            .stderr(self.stdio.stderr.to_stdio())
            // Backstop only; the reaper task normally kills and waits first.
            .kill_on_drop(true);
        cmd
    }
}
