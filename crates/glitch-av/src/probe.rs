//! FFprobe-backed media probing.
//!
//! Shells out to `ffprobe -v error -print_format json -show_format
//! -show_streams` and maps the JSON output into [`VideoInfo`]. The
//! [`Prober`] trait is the substitution seam for tests.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use glitch_core::{Error, Rational, Result};

use crate::command::{ToolCommand, DEFAULT_TIMEOUT};
use crate::tools::ToolConfig;

/// Probed facts about a video file.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    /// Frame rate of the primary video stream.
    pub frame_rate: Rational,
    /// Container duration, when the format reports one.
    pub duration: Option<Duration>,
    /// Whether the file carries at least one audio stream.
    pub has_audio: bool,
}

/// A media prober capable of extracting the facts the video pipeline needs.
///
/// Implementations must be safe to share across threads (`Send + Sync`).
#[async_trait]
pub trait Prober: Send + Sync {
    /// Human-readable name identifying this prober implementation.
    fn name(&self) -> &'static str;

    /// Probe a media file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolNotFound`] when the backing binary is missing,
    /// or [`Error::Probe`] when probing ran but produced unusable output.
    async fn probe(&self, path: &Path) -> Result<VideoInfo>;

    /// Count the video frames (packets) in a media file.
    async fn count_frames(&self, path: &Path) -> Result<u64>;
}

/// A prober backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    /// Path to the ffprobe binary.
    ffprobe_path: PathBuf,
    /// Maximum execution time for each ffprobe invocation.
    timeout: Duration,
}

impl FfprobeProber {
    /// Create a new prober using the given ffprobe path and the default
    /// timeout.
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self {
            ffprobe_path,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a prober from a discovered [`ToolConfig`], honoring its
    /// configured timeout.
    pub fn from_config(config: &ToolConfig) -> Self {
        Self {
            ffprobe_path: config.path.clone(),
            timeout: config.timeout,
        }
    }
}

#[async_trait]
impl Prober for FfprobeProber {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    async fn probe(&self, path: &Path) -> Result<VideoInfo> {
        let mut cmd = ToolCommand::new(self.ffprobe_path.clone());
        cmd.timeout(self.timeout);
        cmd.args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ]);
        cmd.arg(path.to_string_lossy().as_ref());

        let output = cmd.execute().await?;
        let ff: FfprobeOutput = serde_json::from_str(&output.stdout)
            .map_err(|e| Error::Probe(format!("ffprobe JSON parse error: {e}")))?;

        parse_ffprobe_output(ff)
    }

    async fn count_frames(&self, path: &Path) -> Result<u64> {
        let mut cmd = ToolCommand::new(self.ffprobe_path.clone());
        cmd.timeout(self.timeout);
        cmd.args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-count_packets",
            "-show_entries",
            "stream=nb_read_packets",
            "-of",
            "csv=p=0",
        ]);
        cmd.arg(path.to_string_lossy().as_ref());

        let output = cmd.execute().await?;
        output
            .stdout
            .trim()
            .parse::<u64>()
            .map_err(|_| Error::Probe(format!("unexpected packet count: {:?}", output.stdout)))
    }
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    r_frame_rate: Option<String>,
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn parse_ffprobe_output(output: FfprobeOutput) -> Result<VideoInfo> {
    let duration = output
        .format
        .duration
        .and_then(|s| s.parse::<f64>().ok())
        .map(Duration::from_secs_f64);

    let mut frame_rate = None;
    let mut has_audio = false;

    for stream in output.streams {
        match stream.codec_type.as_deref() {
            Some("video") if frame_rate.is_none() => {
                frame_rate = stream.r_frame_rate.as_deref().and_then(Rational::parse);
            }
            Some("audio") => has_audio = true,
            _ => {}
        }
    }

    let frame_rate =
        frame_rate.ok_or_else(|| Error::Probe("no video stream with a frame rate".into()))?;
    if frame_rate.num == 0 {
        return Err(Error::Probe("zero frame rate".into()));
    }

    Ok(VideoInfo {
        frame_rate,
        duration,
        has_audio,
    })
}
