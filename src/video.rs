//! Video glitch pipeline.
//!
//! Runs Probing -> Extracting -> CorruptingFrames -> Reassembling over an
//! input video: probes frame rate and audio presence, extracts per-frame
//! JPEGs into a [`FrameWorkspace`], glitches every frame over a bounded
//! worker pool, and muxes the frames back at the original rate with the
//! original audio track. The frame workspace is removed on every exit path,
//! and a partial output file never survives a failure.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use glitch_av::{FfmpegTranscoder, FfprobeProber, FrameWorkspace, Prober, ToolRegistry, Transcoder};
use glitch_core::{CorruptionSpec, Error, MediaFormat, Result};

use crate::image::ImagePipeline;

/// Pipeline stages, used for log and error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Probing,
    Extracting,
    CorruptingFrames,
    Reassembling,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Probing => write!(f, "probing"),
            Self::Extracting => write!(f, "extracting"),
            Self::CorruptingFrames => write!(f, "corrupting-frames"),
            Self::Reassembling => write!(f, "reassembling"),
        }
    }
}

/// Pipeline glitching a video file frame by frame.
pub struct VideoPipeline {
    prober: Arc<dyn Prober>,
    transcoder: Arc<dyn Transcoder>,
    image: ImagePipeline,
}

impl VideoPipeline {
    /// Build a pipeline backed by the real ffprobe and ffmpeg binaries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolNotFound`] when either binary was not discovered.
    pub fn new(tools: &ToolRegistry) -> Result<Self> {
        let ffprobe = tools.require("ffprobe")?;
        let ffmpeg = tools.require("ffmpeg")?;
        Ok(Self::with_collaborators(
            Arc::new(FfprobeProber::from_config(ffprobe)),
            Arc::new(FfmpegTranscoder::from_config(ffmpeg)),
        ))
    }

    /// Build a pipeline from explicit collaborators.
    ///
    /// This is the substitution seam: tests inject fake probers and
    /// transcoders here instead of shelling out.
    pub fn with_collaborators(
        prober: Arc<dyn Prober>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        Self {
            prober,
            transcoder,
            image: ImagePipeline::new(),
        }
    }

    /// Glitch a video, writing the result next to the input as
    /// `{stem}_glitch.mp4`.
    ///
    /// Frame corruption runs over a worker pool of `concurrency` tasks
    /// (clamped to at least one). The first permanently failed frame cancels
    /// all pending frame work and fails the pipeline with
    /// [`Error::FrameCorruptionFailed`]; no partial output is left behind.
    pub async fn glitch(
        &self,
        input: &Path,
        spec: &CorruptionSpec,
        concurrency: usize,
    ) -> Result<PathBuf> {
        spec.validate()?;
        let concurrency = concurrency.max(1);
        let output = output_path(input);

        let workspace = FrameWorkspace::new()?;
        let result = self
            .run(input, &output, spec, concurrency, &workspace)
            .await;
        // Workspace drops here, removing the frame directory on every path.
        drop(workspace);

        match result {
            Ok(()) => Ok(output),
            Err(e) => {
                let _ = std::fs::remove_file(&output);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        input: &Path,
        output: &Path,
        spec: &CorruptionSpec,
        concurrency: usize,
        workspace: &FrameWorkspace,
    ) -> Result<()> {
        tracing::info!(stage = %Stage::Probing, input = %input.display(), "probing input");
        let info = self.prober.probe(input).await?;

        tracing::info!(
            stage = %Stage::Extracting,
            frame_rate = %info.frame_rate,
            has_audio = info.has_audio,
            "extracting frames"
        );
        let frame_count = self
            .transcoder
            .extract_frames(input, info.frame_rate, workspace.dir())
            .await?;

        tracing::info!(stage = %Stage::CorruptingFrames, frame_count, concurrency, "glitching frames");
        self.corrupt_frames(workspace, frame_count, spec, concurrency)
            .await?;

        tracing::info!(stage = %Stage::Reassembling, output = %output.display(), "reassembling");
        let audio_source = info.has_audio.then_some(input);
        self.transcoder
            .reassemble(workspace.dir(), info.frame_rate, audio_source, output)
            .await?;

        let reassembled = self.prober.count_frames(output).await?;
        if reassembled.abs_diff(frame_count) > 1 {
            return Err(Error::FrameCountMismatch {
                extracted: frame_count,
                reassembled,
            });
        }

        Ok(())
    }

    /// Glitch every extracted frame in place over a bounded worker pool.
    ///
    /// Results land at their original index because each task rewrites only
    /// its own frame file; completion order is irrelevant.
    async fn corrupt_frames(
        &self,
        workspace: &FrameWorkspace,
        frame_count: u64,
        spec: &CorruptionSpec,
        concurrency: usize,
    ) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let cancel = CancellationToken::new();
        let mut tasks: JoinSet<Result<()>> = JoinSet::new();

        for index in 0..frame_count {
            let path = workspace.frame_path(index);
            let frame_spec = CorruptionSpec {
                seed: spec.seed.map(|s| frame_seed(s, index)),
                ..*spec
            };
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let image = self.image.clone();

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| Error::pipeline(Stage::CorruptingFrames, "worker pool closed"))?;
                if cancel.is_cancelled() {
                    return Ok(());
                }
                // The glitch itself is CPU-bound; keep it off the async threads.
                tokio::task::spawn_blocking(move || glitch_frame(&image, &path, &frame_spec, index))
                    .await
                    .map_err(|e| {
                        Error::pipeline(Stage::CorruptingFrames, format!("frame task panicked: {e}"))
                    })?
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let result = joined.unwrap_or_else(|e| {
                Err(Error::pipeline(
                    Stage::CorruptingFrames,
                    format!("frame task aborted: {e}"),
                ))
            });
            if let Err(e) = result {
                // Fail fast: stop handing out work and drop in-flight tasks.
                cancel.cancel();
                tasks.abort_all();
                while tasks.join_next().await.is_some() {}
                return Err(e);
            }
        }

        Ok(())
    }
}

/// Glitch one frame file in place.
fn glitch_frame(
    image: &ImagePipeline,
    path: &Path,
    spec: &CorruptionSpec,
    index: u64,
) -> Result<()> {
    let run = || -> Result<()> {
        let bytes = std::fs::read(path)?;
        let glitched = image.glitch(&bytes, MediaFormat::Jpeg, None, spec)?;
        std::fs::write(path, glitched)?;
        Ok(())
    };
    run().map_err(|e| Error::frame(index as usize, e))
}

/// Deterministically derive a per-frame seed from the master seed.
///
/// SplitMix64 finalizer over the master seed and frame index, so a fixed
/// master seed reproduces the exact same glitch on every frame while
/// adjacent frames still corrupt independently.
fn frame_seed(master: u64, index: u64) -> u64 {
    let mut z = master.wrapping_add(index.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Output path next to the input: `{stem}_glitch.mp4`.
fn output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}_glitch.mp4"))
}
