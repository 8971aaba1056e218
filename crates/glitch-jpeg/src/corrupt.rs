//! Scan-data corruption engine.
//!
//! Mutates a bounded number of bytes inside the scan-data span of a baseline
//! JPEG stream, then validates that the result still decodes. Failed attempts
//! shrink the corruption amount by the spec's backoff factor and retry, up to
//! the spec's attempt budget.
//!
//! With an explicit seed the engine is fully deterministic: identical input
//! and spec always produce identical output.

use std::ops::Range;

use glitch_core::{CorruptionSpec, Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::scan;

/// Corrupt the scan data of a JPEG stream.
///
/// Draws `clamp(floor(amount * span_len), 1, span_len)` distinct offsets
/// uniformly from the scan-data span and overwrites each with a byte drawn
/// from `[0x00, 0xFE]` (`0xFF` is excluded so no marker code can be
/// introduced). A replacement that would break a `0xFF 0x00` stuffing escape
/// is corrected to `0x00` instead, keeping the escape intact.
///
/// Every byte outside the scan-data span is returned unchanged.
///
/// # Errors
///
/// - [`Error::Validation`] if the spec parameters are out of range.
/// - [`Error::MalformedStream`] if the input is not a parseable baseline
///   JPEG (no mutation is attempted).
/// - [`Error::UnrecoverableCorruption`] if no attempt produced a decodable
///   stream within `spec.max_attempts`.
pub fn corrupt(stream: &[u8], spec: &CorruptionSpec) -> Result<Vec<u8>> {
    spec.validate()?;
    let span = scan::scan_span(stream)?;
    if span.is_empty() {
        return Err(Error::malformed(span.start, "empty scan-data span"));
    }

    let seed = match spec.seed {
        Some(seed) => seed,
        None => {
            let seed: u64 = rand::random();
            tracing::debug!(seed, "no seed given, drew a fresh one");
            seed
        }
    };
    let mut rng = StdRng::seed_from_u64(seed);

    let mut amount = spec.amount;
    let mut last_error = String::new();
    for attempt in 1..=spec.max_attempts {
        let mutated = mutate(stream, span.clone(), amount, &mut rng);
        match decode_check(&mutated) {
            Ok(()) => {
                tracing::debug!(attempt, amount, "corrupted stream decodes");
                return Ok(mutated);
            }
            Err(message) => {
                tracing::debug!(attempt, amount, %message, "decode failed, shrinking amount");
                last_error = message;
                amount *= spec.backoff_factor;
            }
        }
    }

    Err(Error::UnrecoverableCorruption {
        attempts: spec.max_attempts,
        last_error,
    })
}

/// Number of offsets to mutate for a given amount and span length.
fn mutation_count(amount: f64, span_len: usize) -> usize {
    ((amount * span_len as f64).floor() as usize).clamp(1, span_len)
}

/// Apply one round of mutations, returning the modified copy.
fn mutate(stream: &[u8], span: Range<usize>, amount: f64, rng: &mut StdRng) -> Vec<u8> {
    let mut out = stream.to_vec();
    let n = mutation_count(amount, span.len());

    let offsets = rand::seq::index::sample(rng, span.len(), n);
    for off in offsets.iter() {
        let i = span.start + off;
        let value: u8 = rng.gen_range(0x00..=0xFE);
        // A byte following a literal 0xFF must stay 0x00: replacing it would
        // turn the stuffing escape (or a restart marker) into a marker code.
        if i > span.start && out[i - 1] == 0xFF {
            out[i] = 0x00;
        } else {
            out[i] = value;
        }
    }
    out
}

/// Check that the stream still decodes as a JPEG.
fn decode_check(stream: &[u8]) -> std::result::Result<(), String> {
    image::load_from_memory_with_format(stream, image::ImageFormat::Jpeg)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{parse, SegmentKind};
    use assert_matches::assert_matches;
    use image::codecs::jpeg::JpegEncoder;

    /// Synthetic stream with a scan span of exactly `len` bytes.
    fn stream_with_span(len: usize) -> Vec<u8> {
        let mut out = vec![0xFF, 0xD8];
        out.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x03, 0x01]);
        out.extend(std::iter::repeat(0x5A).take(len));
        out.extend_from_slice(&[0xFF, 0xD9]);
        out
    }

    /// A real decodable JPEG produced by the `image` encoder.
    fn real_jpeg() -> Vec<u8> {
        let mut img = image::RgbImage::new(32, 32);
        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = image::Rgb([(x * 8) as u8, (y * 8) as u8, ((x + y) * 4) as u8]);
        }
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, 85)
            .encode_image(&img)
            .unwrap();
        buf
    }

    fn seeded_rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    #[test]
    fn mutation_count_bounds() {
        assert_eq!(mutation_count(0.1, 100), 10);
        assert_eq!(mutation_count(0.001, 100), 1); // floor hits 0, clamped up
        assert_eq!(mutation_count(1.0, 100), 100);
        assert_eq!(mutation_count(1.0, 1), 1);
    }

    #[test]
    fn mutates_exactly_the_planned_offsets() {
        let stream = stream_with_span(100);
        let span = scan::scan_span(&stream).unwrap();
        assert_eq!(span.len(), 100);

        let out = mutate(&stream, span.clone(), 0.1, &mut seeded_rng(42));
        let changed = stream
            .iter()
            .zip(&out)
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();

        // The span is all 0x5A, so no stuffing repair fires and every drawn
        // offset differs unless the rng drew 0x5A itself; allow that slack.
        assert!(changed.len() <= 10);
        assert!(!changed.is_empty());
        assert!(changed.iter().all(|&i| span.contains(&i)));
    }

    #[test]
    fn same_seed_same_output() {
        let stream = stream_with_span(100);
        let span = scan::scan_span(&stream).unwrap();
        let a = mutate(&stream, span.clone(), 0.1, &mut seeded_rng(42));
        let b = mutate(&stream, span.clone(), 0.1, &mut seeded_rng(42));
        assert_eq!(a, b);
    }

    #[test]
    fn different_seed_different_output() {
        let stream = stream_with_span(100);
        let span = scan::scan_span(&stream).unwrap();
        let a = mutate(&stream, span.clone(), 0.1, &mut seeded_rng(42));
        let b = mutate(&stream, span.clone(), 0.1, &mut seeded_rng(7));
        assert_ne!(a, b);
    }

    #[test]
    fn never_introduces_a_marker() {
        // Scan data containing stuffing escapes and a restart marker.
        let mut out = vec![0xFF, 0xD8];
        out.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x03, 0x01]);
        let mut scan_bytes = vec![0u8; 0];
        for i in 0..60u8 {
            scan_bytes.push(i);
            scan_bytes.extend_from_slice(&[0xFF, 0x00]);
        }
        scan_bytes.extend_from_slice(&[0xFF, 0xD3, 0x10]);
        out.extend_from_slice(&scan_bytes);
        out.extend_from_slice(&[0xFF, 0xD9]);

        let span = scan::scan_span(&out).unwrap();
        for seed in 0..20 {
            let mutated = mutate(&out, span.clone(), 1.0, &mut seeded_rng(seed));
            // Every 0xFF inside the span must still be followed by 0x00 or a
            // restart code; otherwise the scan would terminate early.
            let reparsed_span = scan::scan_span(&mutated).unwrap();
            assert_eq!(reparsed_span, span, "seed {seed} broke the scan span");
        }
    }

    #[test]
    fn headers_byte_identical_after_corrupt() {
        let stream = real_jpeg();
        let spec = CorruptionSpec::default().with_amount(0.05).with_seed(42);
        let out = corrupt(&stream, &spec).unwrap();

        let before = parse(&stream).unwrap();
        let after = parse(&out).unwrap();
        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(&after) {
            assert_eq!(a.marker, b.marker);
            assert_eq!(a.offset, b.offset);
            assert_eq!(a.length, b.length);
            if a.kind != SegmentKind::ScanData {
                assert_eq!(&stream[a.range()], &out[b.range()]);
            }
        }
    }

    #[test]
    fn corrupt_output_decodes() {
        let stream = real_jpeg();
        let spec = CorruptionSpec::default().with_amount(0.02).with_seed(1);
        let out = corrupt(&stream, &spec).unwrap();
        assert!(image::load_from_memory_with_format(&out, image::ImageFormat::Jpeg).is_ok());
    }

    #[test]
    fn corrupt_is_deterministic_with_seed() {
        let stream = real_jpeg();
        let spec = CorruptionSpec::default().with_amount(0.02).with_seed(42);
        let a = corrupt(&stream, &spec).unwrap();
        let b = corrupt(&stream, &spec).unwrap();
        assert_eq!(a, b);

        let other = corrupt(&stream, &spec.with_seed(7)).unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn undecodable_stream_exhausts_attempts() {
        // The synthetic fixture never decodes as an image, so every attempt
        // fails and the attempt budget runs out.
        let stream = stream_with_span(100);
        let spec = CorruptionSpec::default()
            .with_amount(0.5)
            .with_seed(42)
            .with_max_attempts(3);
        let err = corrupt(&stream, &spec).unwrap_err();
        assert_matches!(err, Error::UnrecoverableCorruption { attempts: 3, .. });
    }

    #[test]
    fn rejects_malformed_input_before_mutation() {
        let spec = CorruptionSpec::default();
        let err = corrupt(&[0x00, 0x01, 0x02], &spec).unwrap_err();
        assert_matches!(err, Error::MalformedStream { .. });
    }

    #[test]
    fn rejects_invalid_spec() {
        let stream = real_jpeg();
        let err = corrupt(&stream, &CorruptionSpec::default().with_amount(2.0)).unwrap_err();
        assert_matches!(err, Error::Validation(_));
    }

    #[test]
    fn rejects_empty_scan_span() {
        let stream = stream_with_span(0);
        let err = corrupt(&stream, &CorruptionSpec::default()).unwrap_err();
        assert_matches!(err, Error::MalformedStream { .. });
    }
}
