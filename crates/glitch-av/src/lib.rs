//! # glitch-av
//!
//! External tool management for the video glitch pipeline.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and ffprobe.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support for running external processes.
//! - **Probing** ([`Prober`], [`FfprobeProber`]) -- frame rate, duration,
//!   audio presence, and frame counting via ffprobe.
//! - **Transcoding** ([`Transcoder`], [`FfmpegTranscoder`]) -- per-frame
//!   JPEG extraction and reassembly via ffmpeg.
//! - **Frame workspace** ([`FrameWorkspace`]) -- temporary frame directory
//!   owned by a single pipeline run, removed on drop.
//!
//! The [`Prober`] and [`Transcoder`] traits are the substitution seams for
//! tests: pipelines accept any implementation, so fakes can stand in for the
//! real CLI tools.

pub mod command;
pub mod probe;
pub mod tools;
pub mod transcode;
pub mod workspace;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use probe::{FfprobeProber, Prober, VideoInfo};
pub use tools::{ToolConfig, ToolInfo, ToolPaths, ToolRegistry};
pub use transcode::{FfmpegTranscoder, Transcoder, FRAME_PATTERN};
pub use workspace::FrameWorkspace;
