//! Jittered waits: uniform samples from a (min, max) range, and a sleep that
//! gives way to cancellation.

use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::session::Cancelled;
use crate::config::ConfigError;

/// A validated `[min, max]` range of seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayRange {
    min: f64,
    max: f64,
}

impl DelayRange {
    pub fn new(min: f64, max: f64) -> Result<Self, ConfigError> {
        Self::named("min", min, "max", max)
    }

    /// Like `new`, but errors name the config fields the bounds came from.
    pub fn named(
        min_field: &'static str,
        min: f64,
        max_field: &'static str,
        max: f64,
    ) -> Result<Self, ConfigError> {
        for (field, value) in [(min_field, min), (max_field, max)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidDelay { field, value });
            }
        }
        if min > max {
            return Err(ConfigError::InvertedRange {
                min_field,
                max_field,
                min,
                max,
            });
        }
        Ok(Self { min, max })
    }

    /// Build from bounds already checked by `RetryConfig::validate`.
    pub(crate) fn clamped(min: f64, max: f64) -> Self {
        let min = if min.is_finite() { min.max(0.0) } else { 0.0 };
        let max = if max.is_finite() { max.max(min) } else { min };
        Self { min, max }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Uniform sample in `[min, max]`, inclusive on both ends.
    pub fn sample(&self) -> Duration {
        Duration::from_secs_f64(jittered(self.min, self.max))
    }
}

/// Uniform sample in `[min, max]` seconds. Bounds must satisfy `0 <= min <= max`.
pub fn jittered(min: f64, max: f64) -> f64 {
    if min >= max {
        return min;
    }
    rand::rng().random_range(min..=max)
}

/// Sleep for `duration` without blocking the runtime. Returns `Err(Cancelled)`
/// as soon as `cancel` fires.
pub async fn wait(duration: Duration, cancel: &CancellationToken) -> Result<(), Cancelled> {
    if duration.is_zero() {
        return if cancel.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        };
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
