//! Corruption parameters shared by the image and video pipelines.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default fraction of the scan-data span to corrupt.
const DEFAULT_AMOUNT: f64 = 0.005;

/// Default retry budget for decode validation.
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default shrink factor applied to `amount` after a failed attempt.
const DEFAULT_BACKOFF_FACTOR: f64 = 0.5;

/// Parameters governing how much scan data is mutated and how failed
/// attempts are retried.
///
/// `amount` is the fraction of the scan-data span to corrupt, in `(0, 1]`.
/// When a mutated stream fails decode validation, `amount` is multiplied by
/// `backoff_factor` and the mutation is retried, up to `max_attempts` total
/// attempts.
///
/// A fixed `seed` makes corruption fully reproducible: identical input and
/// parameters always yield identical output. Without one, a fresh seed is
/// drawn per call and logged at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorruptionSpec {
    /// Fraction of the scan-data span to mutate, in `(0, 1]`.
    pub amount: f64,
    /// Pseudo-random generator seed; `None` draws a fresh one per call.
    pub seed: Option<u64>,
    /// Total attempts before giving up with an unrecoverable error.
    pub max_attempts: u32,
    /// Multiplier applied to `amount` after each failed attempt, in `(0, 1)`.
    pub backoff_factor: f64,
}

impl Default for CorruptionSpec {
    fn default() -> Self {
        Self {
            amount: DEFAULT_AMOUNT,
            seed: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
        }
    }
}

impl CorruptionSpec {
    /// Builder: set the corruption amount.
    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = amount;
        self
    }

    /// Builder: set an explicit seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder: set the retry budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Check that all parameters are in range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when `amount` is outside `(0, 1]`,
    /// `max_attempts` is zero, or `backoff_factor` is outside `(0, 1)`.
    pub fn validate(&self) -> Result<()> {
        if !(self.amount > 0.0 && self.amount <= 1.0) {
            return Err(Error::Validation(format!(
                "amount must be in (0, 1], got {}",
                self.amount
            )));
        }
        if self.max_attempts == 0 {
            return Err(Error::Validation("max_attempts must be at least 1".into()));
        }
        if !(self.backoff_factor > 0.0 && self.backoff_factor < 1.0) {
            return Err(Error::Validation(format!(
                "backoff_factor must be in (0, 1), got {}",
                self.backoff_factor
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(CorruptionSpec::default().validate().is_ok());
    }

    #[test]
    fn builder_chain() {
        let spec = CorruptionSpec::default()
            .with_amount(0.1)
            .with_seed(42)
            .with_max_attempts(3);
        assert_eq!(spec.amount, 0.1);
        assert_eq!(spec.seed, Some(42));
        assert_eq!(spec.max_attempts, 3);
    }

    #[test]
    fn rejects_out_of_range_amount() {
        assert!(CorruptionSpec::default().with_amount(0.0).validate().is_err());
        assert!(CorruptionSpec::default().with_amount(1.5).validate().is_err());
        assert!(CorruptionSpec::default().with_amount(1.0).validate().is_ok());
    }

    #[test]
    fn rejects_zero_attempts() {
        assert!(CorruptionSpec::default()
            .with_max_attempts(0)
            .validate()
            .is_err());
    }

    #[test]
    fn rejects_bad_backoff() {
        let mut spec = CorruptionSpec::default();
        spec.backoff_factor = 1.0;
        assert!(spec.validate().is_err());
        spec.backoff_factor = 0.0;
        assert!(spec.validate().is_err());
    }

    #[test]
    fn serde_round_trip_keeps_seed() {
        let spec = CorruptionSpec::default().with_seed(7);
        let json = serde_json::to_string(&spec).unwrap();
        let back: CorruptionSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
