//! glitch-core: shared types, errors, and corruption parameters.
//!
//! This crate is the foundational dependency for all other glitch-* crates,
//! providing the unified error type, the closed set of supported media
//! formats, frame-rate rationals, and the corruption parameter block.

pub mod error;
pub mod format;
pub mod rational;
pub mod spec;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use format::MediaFormat;
pub use rational::Rational;
pub use spec::CorruptionSpec;
