//! Still-image glitch pipeline.
//!
//! Converts any supported raster input to a baseline JPEG representation,
//! corrupts the scan data, and re-encodes to the requested output format.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use glitch_core::{CorruptionSpec, Error, MediaFormat, Result};

/// JPEG quality used for the intermediate baseline encoding.
///
/// Fixed so that a given input always produces the same intermediate stream
/// and corruption effects stay predictable. Higher quality means longer scan
/// data and subtler glitches for the same `amount`.
pub const JPEG_QUALITY: u8 = 85;

/// Pipeline glitching a single raster image.
#[derive(Debug, Clone)]
pub struct ImagePipeline {
    jpeg_quality: u8,
}

impl Default for ImagePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ImagePipeline {
    /// Create a pipeline with the default intermediate [`JPEG_QUALITY`].
    pub fn new() -> Self {
        Self {
            jpeg_quality: JPEG_QUALITY,
        }
    }

    /// Glitch an image held in memory.
    ///
    /// The input is decoded according to `input_format`, re-encoded to a
    /// baseline JPEG, corrupted under `spec`, and re-encoded to
    /// `output_format` (defaulting to the input format). EXIF and color
    /// profile metadata are not carried over.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedFormat`] if either format is not a still-image
    ///   format.
    /// - [`Error::Codec`] if decoding or encoding fails.
    /// - [`Error::UnrecoverableCorruption`] propagated from the corruption
    ///   engine when no decodable mutation was found within the retry budget.
    pub fn glitch(
        &self,
        input: &[u8],
        input_format: MediaFormat,
        output_format: Option<MediaFormat>,
        spec: &CorruptionSpec,
    ) -> Result<Vec<u8>> {
        let output_format = output_format.unwrap_or(input_format);
        if !input_format.is_image() {
            return Err(Error::unsupported(input_format));
        }
        if !output_format.is_image() {
            return Err(Error::unsupported(output_format));
        }

        let decoded = image::load_from_memory_with_format(input, raster_format(input_format))
            .map_err(Error::codec)?;

        let jpeg = self.encode_baseline_jpeg(&decoded)?;
        let corrupted = glitch_jpeg::corrupt(&jpeg, spec)?;

        if output_format == MediaFormat::Jpeg {
            // The corrupted stream is already a validated JPEG; re-encoding
            // it would smooth the artifacts away.
            return Ok(corrupted);
        }

        let glitched =
            image::load_from_memory_with_format(&corrupted, image::ImageFormat::Jpeg)
                .map_err(Error::codec)?;

        let mut out = Vec::new();
        glitched
            .write_to(&mut Cursor::new(&mut out), raster_format(output_format))
            .map_err(Error::codec)?;
        Ok(out)
    }

    /// Encode to a sequential baseline JPEG at the pipeline's fixed quality.
    ///
    /// Alpha is flattened onto a white background first; the JPEG encoder
    /// has no alpha channel.
    fn encode_baseline_jpeg(&self, img: &DynamicImage) -> Result<Vec<u8>> {
        let flattened = flatten_onto_white(img);
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, self.jpeg_quality)
            .encode_image(&flattened)
            .map_err(Error::codec)?;
        Ok(buf)
    }
}

/// Map a still-image [`MediaFormat`] onto the codec's format enum.
fn raster_format(format: MediaFormat) -> image::ImageFormat {
    match format {
        MediaFormat::Jpeg => image::ImageFormat::Jpeg,
        MediaFormat::Png => image::ImageFormat::Png,
        MediaFormat::WebP => image::ImageFormat::WebP,
        MediaFormat::Mp4 => unreachable!("callers reject non-image formats first"),
    }
}

/// Composite an image onto a white background, dropping alpha.
fn flatten_onto_white(img: &DynamicImage) -> image::RgbImage {
    let rgba = img.to_rgba8();
    let mut out = image::RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let a = u16::from(a);
        let blend = |c: u8| -> u8 { ((u16::from(c) * a + 255 * (255 - a)) / 255) as u8 };
        out.put_pixel(x, y, image::Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}
