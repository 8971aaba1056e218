//! Temporary frame storage for a single video pipeline run.
//!
//! A [`FrameWorkspace`] owns the directory holding extracted frames. The
//! directory lives exactly as long as the workspace value: dropping it (on
//! success, failure, or panic) removes the directory and everything in it.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use glitch_core::Result;

/// Exclusive owner of the temporary frame directory for one pipeline run.
pub struct FrameWorkspace {
    temp_dir: TempDir,
}

impl FrameWorkspace {
    /// Create a fresh, empty frame directory.
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        Ok(Self { temp_dir })
    }

    /// Path to the frame directory.
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of the frame with the given zero-based index.
    ///
    /// ffmpeg writes image sequences 1-based, so frame `0` lives in
    /// `00000001.jpg`.
    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.temp_dir.path().join(format!("{:08}.jpg", index + 1))
    }

    /// List extracted frame files in index order.
    pub fn list_frames(&self) -> Result<Vec<PathBuf>> {
        let mut frames = Vec::new();
        for entry in std::fs::read_dir(self.temp_dir.path())? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("jpg") {
                frames.push(path);
            }
        }
        frames.sort();
        Ok(frames)
    }
}
