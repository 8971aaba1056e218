//! Exact frame-rate representation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A frame rate as an exact rational (e.g. 30000/1001 for NTSC 29.97).
///
/// Kept as a fraction so extraction and reassembly use the identical rate
/// string and the output duration stays within one frame period of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rational {
    pub num: u32,
    pub den: u32,
}

impl Rational {
    /// Construct a rational; a zero denominator is normalized to 1.
    pub fn new(num: u32, den: u32) -> Self {
        Self {
            num,
            den: den.max(1),
        }
    }

    /// The rate as a floating point frames-per-second value.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of a single frame period in seconds.
    pub fn frame_period(self) -> f64 {
        if self.num == 0 {
            0.0
        } else {
            f64::from(self.den) / f64::from(self.num)
        }
    }

    /// Parse an ffprobe-style rate string: `"30000/1001"`, `"25/1"`, or `"24"`.
    pub fn parse(s: &str) -> Option<Self> {
        if let Some((num, den)) = s.split_once('/') {
            let num: u32 = num.trim().parse().ok()?;
            let den: u32 = den.trim().parse().ok()?;
            if den == 0 {
                return None;
            }
            return Some(Self { num, den });
        }
        let num: u32 = s.trim().parse().ok()?;
        Some(Self { num, den: 1 })
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}
