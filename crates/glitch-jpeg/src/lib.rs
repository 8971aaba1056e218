//! # glitch-jpeg
//!
//! Byte-level JPEG glitching: a structural scanner that locates the
//! entropy-coded scan-data span of a baseline JPEG stream, and a corruption
//! engine that mutates bytes only inside that span, validating the result
//! against the `image` decoder with a bounded shrinking-amount retry.
//!
//! Everything outside the scan-data span -- marker table, headers, quant and
//! huffman tables -- is preserved byte for byte, so the glitched stream stays
//! structurally valid.

pub mod corrupt;
pub mod scan;

pub use corrupt::corrupt;
pub use scan::{parse, scan_span, Segment, SegmentKind};
