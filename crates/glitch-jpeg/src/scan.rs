//! JPEG marker segment scanner.
//!
//! Walks a JPEG byte stream from Start-Of-Image, reading each marker and its
//! declared payload, and locates the single entropy-coded scan-data span that
//! follows the Start-Of-Scan header. Inside scan data, a `0xFF` byte only
//! terminates the span when it is a true marker: not a `0xFF 0x00` stuffing
//! escape and not one of the restart markers `0xFFD0`..`0xFFD7`.
//!
//! The scanner is a pure function of its input; it never mutates the stream.

use glitch_core::{Error, Result};
use std::ops::Range;

/// JPEG marker constants.
pub mod markers {
    /// Start-Of-Image.
    pub const SOI: u16 = 0xFFD8;
    /// Start-Of-Scan.
    pub const SOS: u16 = 0xFFDA;
    /// End-Of-Image.
    pub const EOI: u16 = 0xFFD9;
    /// First restart marker; `RST0..=RST7` are `0xFFD0..=0xFFD7`.
    pub const RST0: u16 = 0xFFD0;
    /// Last restart marker.
    pub const RST7: u16 = 0xFFD7;
    /// Temporary private marker, standalone like the restart markers.
    pub const TEM: u16 = 0xFF01;

    /// Whether the marker's low byte denotes a restart marker.
    pub fn is_restart(code: u8) -> bool {
        (0xD0..=0xD7).contains(&code)
    }

    /// Whether the marker is standalone (carries no length-prefixed payload).
    pub fn is_standalone(code: u8) -> bool {
        code == 0x01 || code == 0xD8 || code == 0xD9 || is_restart(code)
    }
}

/// Classification of a parsed segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// A marker with a length-prefixed payload (APPn, DQT, DHT, SOF, SOS, ...).
    Header,
    /// The entropy-coded scan data following the SOS header. Not introduced
    /// by a marker of its own; its `marker` field is zero.
    ScanData,
    /// A standalone marker with no payload (SOI, EOI, restart markers, TEM).
    Other,
}

/// One contiguous region of a JPEG stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Full marker code (e.g. `0xFFDA`), or `0` for the scan-data span.
    pub marker: u16,
    /// Byte offset of the segment start within the stream.
    pub offset: usize,
    /// Total segment length in bytes, marker included where present.
    pub length: usize,
    /// Segment classification.
    pub kind: SegmentKind,
}

impl Segment {
    /// The half-open byte range this segment covers.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.length
    }
}

/// Parse a JPEG stream into its ordered sequence of segments.
///
/// Exactly one [`SegmentKind::ScanData`] segment is produced, covering the
/// bytes between the end of the SOS header and the terminating marker
/// (normally EOI). Bytes after EOI are ignored.
///
/// # Errors
///
/// Returns [`Error::MalformedStream`] when the stream lacks SOI, EOI, or a
/// SOS marker, when a declared segment length overruns the stream, or when a
/// second scan appears (progressive streams are not supported).
pub fn parse(stream: &[u8]) -> Result<Vec<Segment>> {
    if stream.len() < 2 || stream[0] != 0xFF || stream[1] != 0xD8 {
        return Err(Error::malformed(0, "missing SOI marker"));
    }

    let mut segments = vec![Segment {
        marker: markers::SOI,
        offset: 0,
        length: 2,
        kind: SegmentKind::Other,
    }];
    let mut pos = 2;
    let mut seen_scan = false;

    loop {
        if pos + 2 > stream.len() {
            return Err(Error::malformed(pos, "stream ended before EOI marker"));
        }
        if stream[pos] != 0xFF {
            return Err(Error::malformed(
                pos,
                format!("expected marker, found 0x{:02X}", stream[pos]),
            ));
        }
        // Fill bytes: any number of 0xFF padding bytes may precede a marker.
        let mut code = stream[pos + 1];
        while code == 0xFF {
            pos += 1;
            if pos + 2 > stream.len() {
                return Err(Error::malformed(pos, "stream ended before EOI marker"));
            }
            code = stream[pos + 1];
        }
        if code == 0x00 {
            return Err(Error::malformed(pos, "invalid marker 0xFF00 outside scan data"));
        }
        let marker = 0xFF00 | u16::from(code);

        if marker == markers::EOI {
            segments.push(Segment {
                marker,
                offset: pos,
                length: 2,
                kind: SegmentKind::Other,
            });
            if !seen_scan {
                return Err(Error::malformed(pos, "no SOS marker before EOI"));
            }
            return Ok(segments);
        }

        if markers::is_standalone(code) {
            segments.push(Segment {
                marker,
                offset: pos,
                length: 2,
                kind: SegmentKind::Other,
            });
            pos += 2;
            continue;
        }

        // Length-prefixed segment; the declared length includes its own
        // two bytes but not the marker.
        if pos + 4 > stream.len() {
            return Err(Error::malformed(pos, "truncated segment length"));
        }
        let declared = usize::from(u16::from_be_bytes([stream[pos + 2], stream[pos + 3]]));
        if declared < 2 {
            return Err(Error::malformed(
                pos,
                format!("declared length {declared} below minimum of 2"),
            ));
        }
        let total = 2 + declared;
        if pos + total > stream.len() {
            return Err(Error::malformed(
                pos,
                format!(
                    "declared length {declared} exceeds remaining {} bytes",
                    stream.len() - pos - 2
                ),
            ));
        }
        segments.push(Segment {
            marker,
            offset: pos,
            length: total,
            kind: SegmentKind::Header,
        });
        pos += total;

        if marker == markers::SOS {
            if seen_scan {
                return Err(Error::malformed(
                    pos,
                    "second SOS marker; progressive streams are not supported",
                ));
            }
            seen_scan = true;
            let scan_start = pos;
            let scan_end = find_scan_end(stream, scan_start)?;
            segments.push(Segment {
                marker: 0,
                offset: scan_start,
                length: scan_end - scan_start,
                kind: SegmentKind::ScanData,
            });
            pos = scan_end;
        }
    }
}

/// Advance through entropy-coded data until a true marker is found.
///
/// `0xFF 0x00` (byte stuffing) and `0xFF 0xD0..=0xD7` (restart markers) are
/// part of the scan data and skipped over.
fn find_scan_end(stream: &[u8], start: usize) -> Result<usize> {
    let mut i = start;
    while i + 1 < stream.len() {
        if stream[i] != 0xFF {
            i += 1;
            continue;
        }
        let next = stream[i + 1];
        if next == 0x00 || markers::is_restart(next) {
            i += 2;
            continue;
        }
        if next == 0xFF {
            // Fill byte inside scan data; only the last 0xFF can start a marker.
            i += 1;
            continue;
        }
        return Ok(i);
    }
    Err(Error::malformed(
        stream.len(),
        "scan data ended without EOI marker",
    ))
}

/// Locate the scan-data span `[start, end)` of a JPEG stream.
///
/// Convenience wrapper over [`parse`] for callers that only need the span.
pub fn scan_span(stream: &[u8]) -> Result<Range<usize>> {
    let segments = parse(stream)?;
    let scan = segments
        .iter()
        .find(|s| s.kind == SegmentKind::ScanData)
        .expect("parse always yields a scan-data segment");
    Ok(scan.range())
}
