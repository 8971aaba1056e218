//! Unified error type for the glitchart workspace.
//!
//! All crates funnel their failures into [`Error`], which carries enough
//! context (offending offset, frame index, tool stderr) to diagnose a failed
//! run without re-running with added instrumentation.

use std::fmt;

/// Unified error type covering all failure modes in glitchart.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input is not a structurally valid JPEG stream.
    #[error("malformed JPEG stream at offset {offset}: {message}")]
    MalformedStream {
        /// Byte offset at which parsing gave up.
        offset: usize,
        /// Human-readable description of the structural problem.
        message: String,
    },

    /// The requested format is outside the supported set.
    #[error("unsupported format: {format}")]
    UnsupportedFormat {
        /// The format string as the caller supplied it.
        format: String,
    },

    /// Corruption could not produce a decodable stream within the retry budget.
    #[error("corruption unrecoverable after {attempts} attempt(s): {last_error}")]
    UnrecoverableCorruption {
        /// Number of attempts made before giving up.
        attempts: u32,
        /// Decode error from the final attempt.
        last_error: String,
    },

    /// A single video frame failed to glitch, aborting the whole pipeline.
    #[error("frame {index} failed to glitch: {source}")]
    FrameCorruptionFailed {
        /// Zero-based index of the failed frame.
        index: usize,
        /// The per-frame failure.
        source: Box<Error>,
    },

    /// Reassembly produced a different frame count than extraction.
    #[error("frame count mismatch: extracted {extracted}, reassembled {reassembled}")]
    FrameCountMismatch {
        /// Frames written during extraction.
        extracted: u64,
        /// Frames counted in the reassembled output.
        reassembled: u64,
    },

    /// An external tool binary could not be resolved.
    #[error("tool not found: {tool}; is it installed and in PATH?")]
    ToolNotFound {
        /// Name of the missing tool.
        tool: String,
    },

    /// Media probing failed.
    #[error("probe error: {0}")]
    Probe(String),

    /// An external tool (ffmpeg, ffprobe) returned an error.
    #[error("tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description, including captured stderr.
        message: String,
    },

    /// The raster codec failed to decode or encode an image.
    #[error("codec error: {source}")]
    Codec {
        /// The underlying codec error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A pipeline stage failed.
    #[error("pipeline error [{stage}]: {message}")]
    Pipeline {
        /// The pipeline stage that failed.
        stage: String,
        /// Human-readable error description.
        message: String,
    },

    /// Parameters failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

impl Error {
    /// Convenience constructor for [`Error::MalformedStream`].
    pub fn malformed(offset: usize, message: impl Into<String>) -> Self {
        Error::MalformedStream {
            offset,
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::UnsupportedFormat`].
    pub fn unsupported(format: impl fmt::Display) -> Self {
        Error::UnsupportedFormat {
            format: format.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Codec`].
    pub fn codec(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Codec {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Pipeline`].
    pub fn pipeline(stage: impl fmt::Display, message: impl Into<String>) -> Self {
        Error::Pipeline {
            stage: stage.to_string(),
            message: message.into(),
        }
    }

    /// Wrap a per-frame failure into [`Error::FrameCorruptionFailed`].
    pub fn frame(index: usize, source: Error) -> Self {
        Error::FrameCorruptionFailed {
            index,
            source: Box::new(source),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
