//! # glitchart
//!
//! Glitch art through controlled JPEG corruption.
//!
//! Images are converted to a baseline JPEG, a bounded number of bytes inside
//! the entropy-coded scan data is randomly mutated (headers and marker
//! structure stay untouched), and the result is validated against the
//! decoder, so the output is always a structurally valid image. Videos are
//! glitched frame by frame and re-muxed at the original frame rate with the
//! original audio track.
//!
//! The heavy lifting lives in the workspace crates:
//!
//! - `glitch-jpeg` -- JPEG segment scanner and corruption engine.
//! - `glitch-av` -- ffmpeg/ffprobe discovery, execution, probing, and the
//!   temporary frame workspace.
//! - `glitch-core` -- shared error type, formats, and corruption parameters.
//!
//! # Example
//!
//! ```no_run
//! use glitchart::{glitch_image_file, CorruptionSpec};
//!
//! # fn main() -> glitchart::Result<()> {
//! // Writes monalisa_glitch.jpg next to the input.
//! let spec = CorruptionSpec::default().with_amount(0.01).with_seed(42);
//! let out = glitch_image_file(std::path::Path::new("monalisa.jpg"), &spec)?;
//! println!("wrote {}", out.display());
//! # Ok(())
//! # }
//! ```

pub mod image;
pub mod video;

use std::path::{Path, PathBuf};

pub use glitch_av::{ToolPaths, ToolRegistry};
pub use glitch_core::{CorruptionSpec, Error, MediaFormat, Rational, Result};
pub use image::ImagePipeline;
pub use video::VideoPipeline;

/// Glitch an in-memory JPEG, returning JPEG bytes.
pub fn glitch_jpeg(input: &[u8], spec: &CorruptionSpec) -> Result<Vec<u8>> {
    ImagePipeline::new().glitch(input, MediaFormat::Jpeg, None, spec)
}

/// Glitch an in-memory PNG, returning PNG bytes.
pub fn glitch_png(input: &[u8], spec: &CorruptionSpec) -> Result<Vec<u8>> {
    ImagePipeline::new().glitch(input, MediaFormat::Png, None, spec)
}

/// Glitch an in-memory WebP, returning WebP bytes.
pub fn glitch_webp(input: &[u8], spec: &CorruptionSpec) -> Result<Vec<u8>> {
    ImagePipeline::new().glitch(input, MediaFormat::WebP, None, spec)
}

/// Glitch an image file, writing the result next to the input as
/// `{stem}_glitch.{ext}` and returning the output path.
///
/// The format is taken from the file extension.
pub fn glitch_image_file(input: &Path, spec: &CorruptionSpec) -> Result<PathBuf> {
    let format = MediaFormat::from_path(input)?;
    if !format.is_image() {
        return Err(Error::unsupported(format));
    }

    let bytes = std::fs::read(input)?;
    let glitched = ImagePipeline::new().glitch(&bytes, format, None, spec)?;

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    let output = input.with_file_name(format!("{stem}_glitch.{}", format.extension()));
    std::fs::write(&output, glitched)?;
    Ok(output)
}

/// Glitch an MP4 video, writing `{stem}_glitch.mp4` next to the input.
///
/// `concurrency` bounds the frame worker pool; pass `0` (or use
/// [`default_concurrency`]) to size it by the machine's CPU count. Requires
/// ffmpeg and ffprobe on `PATH` (or configured via [`ToolPaths`] and
/// [`VideoPipeline::new`]).
pub async fn glitch_mp4(
    input: &Path,
    spec: &CorruptionSpec,
    concurrency: usize,
) -> Result<PathBuf> {
    let tools = ToolRegistry::discover(&ToolPaths::default());
    let pipeline = VideoPipeline::new(&tools)?;
    let concurrency = if concurrency == 0 {
        default_concurrency()
    } else {
        concurrency
    };
    pipeline.glitch(input, spec, concurrency).await
}

/// Default frame worker pool size: one worker per logical CPU.
pub fn default_concurrency() -> usize {
    num_cpus::get().max(1)
}
