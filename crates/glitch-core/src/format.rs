//! The closed set of media formats the library operates on.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Supported media formats.
///
/// Pipelines pattern-match on this variant instead of branching on loose
/// format strings; anything outside this set is rejected with
/// [`Error::UnsupportedFormat`] before any work is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    Jpeg,
    Png,
    WebP,
    Mp4,
}

impl MediaFormat {
    /// Whether this is a still-image format (anything but [`MediaFormat::Mp4`]).
    pub fn is_image(self) -> bool {
        !matches!(self, Self::Mp4)
    }

    /// Canonical file extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Mp4 => "mp4",
        }
    }

    /// Resolve a format from a file extension (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] for anything outside the
    /// supported set.
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::WebP),
            "mp4" => Ok(Self::Mp4),
            other => Err(Error::unsupported(other)),
        }
    }

    /// Resolve a format from a file path's extension.
    pub fn from_path(path: &std::path::Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| Error::unsupported(path.display()))?;
        Self::from_extension(ext)
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jpeg => write!(f, "jpeg"),
            Self::Png => write!(f, "png"),
            Self::WebP => write!(f, "webp"),
            Self::Mp4 => write!(f, "mp4"),
        }
    }
}
