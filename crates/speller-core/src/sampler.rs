//! Bounded exponential jitter for flash and inter-flash durations.
//!
//! Values are drawn from an exponential distribution with the requested
//! expectation and rejected until they land inside `[min, max]`. There is no
//! cap on the number of draws: a range far from the expectation takes long to
//! hit, and an empty range (`min > max`) never does. `Config::validate`
//! rejects the latter before a session can start.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// Draw one exponential variate with rate 1.
fn exponential<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // gen::<f64>() is in [0, 1); 0 maps to infinity and is always rejected.
    -rng.gen::<f64>().ln()
}

/// Draw from an exponential distribution scaled by `expectation`, constrained
/// to `[min, max]` by rejection.
pub fn sample<R: Rng + ?Sized>(rng: &mut R, expectation: f64, min: f64, max: f64) -> f64 {
    loop {
        let v = exponential(rng) * expectation;
        if v >= min && v <= max {
            return v;
        }
    }
}

/// `{expectation, min, max}` in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JitterRange {
    pub expectation: f64,
    pub min: f64,
    pub max: f64,
}

impl JitterRange {
    pub const fn new(expectation: f64, min: f64, max: f64) -> Self {
        Self {
            expectation,
            min,
            max,
        }
    }

    /// Sample in milliseconds.
    pub fn sample_ms<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        sample(rng, self.expectation, self.min, self.max)
    }

    /// Sample as a `Duration`, saturating at `Duration::MAX`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::try_from_secs_f64(self.sample_ms(rng) / 1000.0).unwrap_or(Duration::MAX)
    }

    pub(crate) fn validate(&self, key: &str) -> Result<(), ConfigError> {
        let values = [self.expectation, self.min, self.max];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::invalid(key, "values must be finite"));
        }
        if self.expectation <= 0.0 {
            return Err(ConfigError::invalid(key, "expectation must be positive"));
        }
        if self.min < 0.0 {
            return Err(ConfigError::invalid(key, "min must not be negative"));
        }
        if self.min > self.max {
            return Err(ConfigError::invalid(
                key,
                format!("min ({}) is greater than max ({})", self.min, self.max),
            ));
        }
        if Duration::try_from_secs_f64(self.max / 1000.0).is_err() {
            return Err(ConfigError::invalid(
                key,
                format!("max ({} ms) does not fit in a duration", self.max),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Mcg128Xsl64;

    #[test]
    fn default_flash_range_stays_in_bounds() {
        let mut rng = Mcg128Xsl64::seed_from_u64(1);
        let range = JitterRange::new(80.0, 60.0, 160.0);
        for _ in 0..10_000 {
            let v = range.sample_ms(&mut rng);
            assert!((60.0..=160.0).contains(&v), "{v} out of range");
        }
    }

    #[test]
    fn duration_matches_milliseconds() {
        let mut a = Mcg128Xsl64::seed_from_u64(9);
        let mut b = Mcg128Xsl64::seed_from_u64(9);
        let range = JitterRange::new(120.0, 80.0, 300.0);
        let ms = range.sample_ms(&mut a);
        let d = range.sample(&mut b);
        assert!((d.as_secs_f64() * 1000.0 - ms).abs() < 1e-6);
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Mcg128Xsl64::seed_from_u64(3);
        let mut b = Mcg128Xsl64::seed_from_u64(3);
        for _ in 0..100 {
            assert_eq!(sample(&mut a, 80.0, 60.0, 160.0), sample(&mut b, 80.0, 60.0, 160.0));
        }
    }

    #[test]
    fn validate_flags_empty_range() {
        assert!(JitterRange::new(80.0, 60.0, 160.0).validate("k").is_ok());
        assert!(JitterRange::new(80.0, 170.0, 160.0).validate("k").is_err());
        assert!(JitterRange::new(0.0, 60.0, 160.0).validate("k").is_err());
        assert!(JitterRange::new(80.0, -1.0, 160.0).validate("k").is_err());
        assert!(JitterRange::new(f64::NAN, 60.0, 160.0).validate("k").is_err());
    }

    #[test]
    fn validate_rejects_max_beyond_duration() {
        let huge = JitterRange::new(1e25, 1e24, 1e26);
        let err = huge.validate("durations.flash").unwrap_err();
        assert!(err.to_string().contains("durations.flash"));
        // A day is still fine.
        assert!(JitterRange::new(1e6, 0.0, 8.64e7).validate("k").is_ok());
    }

    #[test]
    fn oversized_sample_saturates_instead_of_panicking() {
        let mut rng = Mcg128Xsl64::seed_from_u64(5);
        let huge = JitterRange::new(1e25, 1e24, 1e26);
        assert_eq!(huge.sample(&mut rng), Duration::MAX);
    }

    proptest! {
        #[test]
        fn sample_always_within_bounds(
            seed in any::<u64>(),
            expectation in 1.0f64..500.0,
            min_factor in 0.01f64..3.0,
            width_factor in 0.5f64..10.0,
        ) {
            // Keep the window reachable so rejection terminates quickly.
            let min = expectation * min_factor;
            let max = min + expectation * width_factor;
            let mut rng = Mcg128Xsl64::seed_from_u64(seed);
            let v = sample(&mut rng, expectation, min, max);
            prop_assert!(v >= min && v <= max);
        }
    }
}
