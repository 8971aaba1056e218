//! FFmpeg-backed frame extraction and reassembly.
//!
//! The [`Transcoder`] trait is the substitution seam for tests; the real
//! implementation shells out to ffmpeg through [`ToolCommand`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use glitch_core::{Error, Rational, Result};

use crate::command::{ToolCommand, DEFAULT_TIMEOUT};
use crate::tools::ToolConfig;

/// ffmpeg image-sequence filename pattern used for extracted frames.
pub const FRAME_PATTERN: &str = "%08d.jpg";

/// External transcoder interface: per-frame JPEG extraction and reassembly.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Human-readable name identifying this transcoder implementation.
    fn name(&self) -> &'static str;

    /// Decompose `input` into an ordered JPEG frame sequence inside
    /// `frames_dir`, written at `frame_rate` using [`FRAME_PATTERN`].
    ///
    /// Returns the number of frames written.
    async fn extract_frames(
        &self,
        input: &Path,
        frame_rate: Rational,
        frames_dir: &Path,
    ) -> Result<u64>;

    /// Mux the frame sequence in `frames_dir` back into `output` at
    /// `frame_rate`. When `audio_source` is given, its first audio stream is
    /// carried over unchanged (`-c:a copy`).
    async fn reassemble(
        &self,
        frames_dir: &Path,
        frame_rate: Rational,
        audio_source: Option<&Path>,
        output: &Path,
    ) -> Result<()>;
}

/// A transcoder backed by the `ffmpeg` CLI.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    /// Path to the ffmpeg binary.
    ffmpeg_path: PathBuf,
    /// Maximum execution time for each ffmpeg invocation.
    timeout: Duration,
}

impl FfmpegTranscoder {
    /// Create a new transcoder using the given ffmpeg path and the default
    /// timeout.
    pub fn new(ffmpeg_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a transcoder from a discovered [`ToolConfig`], honoring its
    /// configured timeout.
    pub fn from_config(config: &ToolConfig) -> Self {
        Self {
            ffmpeg_path: config.path.clone(),
            timeout: config.timeout,
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    async fn extract_frames(
        &self,
        input: &Path,
        frame_rate: Rational,
        frames_dir: &Path,
    ) -> Result<u64> {
        let pattern = frames_dir.join(FRAME_PATTERN);
        tracing::debug!(input = %input.display(), %frame_rate, "extracting frames");

        let mut cmd = ToolCommand::new(self.ffmpeg_path.clone());
        cmd.timeout(self.timeout);
        cmd.args(["-y", "-v", "error", "-i"]);
        cmd.arg(input.to_string_lossy().as_ref());
        cmd.args(["-r", &frame_rate.to_string()]);
        cmd.args(["-qscale:v", "2"]);
        cmd.arg(pattern.to_string_lossy().as_ref());
        cmd.execute().await?;

        let mut count = 0u64;
        for entry in std::fs::read_dir(frames_dir)? {
            let entry = entry?;
            if entry.path().extension().and_then(|e| e.to_str()) == Some("jpg") {
                count += 1;
            }
        }
        if count == 0 {
            return Err(Error::tool(
                "ffmpeg",
                format!("no frames extracted from {}", input.display()),
            ));
        }
        Ok(count)
    }

    async fn reassemble(
        &self,
        frames_dir: &Path,
        frame_rate: Rational,
        audio_source: Option<&Path>,
        output: &Path,
    ) -> Result<()> {
        let pattern = frames_dir.join(FRAME_PATTERN);
        tracing::debug!(
            output = %output.display(),
            %frame_rate,
            with_audio = audio_source.is_some(),
            "reassembling frames"
        );

        let mut cmd = ToolCommand::new(self.ffmpeg_path.clone());
        cmd.timeout(self.timeout);
        cmd.args(["-y", "-v", "error"]);
        cmd.args(["-framerate", &frame_rate.to_string()]);
        cmd.arg("-i");
        cmd.arg(pattern.to_string_lossy().as_ref());

        if let Some(audio) = audio_source {
            cmd.arg("-i");
            cmd.arg(audio.to_string_lossy().as_ref());
            cmd.args(["-map", "0:v:0", "-map", "1:a:0", "-c:a", "copy", "-shortest"]);
        }

        cmd.args(["-pix_fmt", "yuv420p"]);
        cmd.args(["-r", &frame_rate.to_string()]);
        cmd.arg(output.to_string_lossy().as_ref());
        cmd.execute().await?;
        Ok(())
    }
}
