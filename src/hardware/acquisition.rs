//! Bounded retry-with-backoff for initial sensor acquisition
//!
//! Driven by frame ticks rather than sleeping, so it never blocks. Once
//! the attempt budget is spent the caller proceeds in degraded mode.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Retry budget for GPS/compass acquisition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub max_attempts: u32,
    pub initial_interval_s: f32,
    pub max_interval_s: f32,
    /// Interval multiplier applied after each attempt
    pub backoff_factor: f32,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_interval_s: 0.5,
            max_interval_s: 1.0,
            backoff_factor: 1.25,
        }
    }
}

/// Result of one acquisition tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AcquisitionStatus {
    /// Sensor delivered; no more retries
    Acquired,
    /// Between attempts
    Waiting,
    /// Time for attempt number `attempt` (1-based)
    Retry { attempt: u32 },
    /// Budget spent without success
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Pending,
    Acquired,
    Exhausted,
}

/// Tick-driven retry counter
#[derive(Debug, Clone)]
pub struct AcquisitionRetry {
    sensor: &'static str,
    config: AcquisitionConfig,
    phase: Phase,
    attempts: u32,
    interval_s: f32,
    since_last_s: f32,
}

impl AcquisitionRetry {
    pub fn new(sensor: &'static str, config: AcquisitionConfig) -> Self {
        let interval_s = config.initial_interval_s;
        Self {
            sensor,
            config,
            phase: Phase::Pending,
            attempts: 0,
            interval_s,
            since_last_s: 0.0,
        }
    }

    /// Advance by `dt` seconds
    pub fn tick(&mut self, dt: f32) -> AcquisitionStatus {
        match self.phase {
            Phase::Acquired => return AcquisitionStatus::Acquired,
            Phase::Exhausted => return AcquisitionStatus::Exhausted,
            Phase::Pending => {}
        }

        self.since_last_s += dt.max(0.0);
        if self.since_last_s < self.interval_s {
            return AcquisitionStatus::Waiting;
        }
        self.since_last_s = 0.0;

        if self.attempts >= self.config.max_attempts {
            self.phase = Phase::Exhausted;
            warn!(
                sensor = self.sensor,
                attempts = self.attempts,
                "acquisition exhausted, continuing in degraded mode"
            );
            return AcquisitionStatus::Exhausted;
        }

        self.attempts += 1;
        self.interval_s = (self.interval_s * self.config.backoff_factor).min(self.config.max_interval_s);
        debug!(sensor = self.sensor, attempt = self.attempts, "acquisition retry");
        AcquisitionStatus::Retry { attempt: self.attempts }
    }

    pub fn mark_acquired(&mut self) {
        if self.phase != Phase::Acquired {
            debug!(sensor = self.sensor, attempts = self.attempts, "acquired");
        }
        self.phase = Phase::Acquired;
    }

    pub fn is_acquired(&self) -> bool {
        self.phase == Phase::Acquired
    }

    pub fn is_exhausted(&self) -> bool {
        self.phase == Phase::Exhausted
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reset(&mut self) {
        self.phase = Phase::Pending;
        self.attempts = 0;
        self.interval_s = self.config.initial_interval_s;
        self.since_last_s = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retries_then_exhausts() {
        let mut retry = AcquisitionRetry::new("gps", AcquisitionConfig::default());
        let mut retries = 0;
        let mut exhausted_at = None;

        for frame in 0..2000 {
            match retry.tick(0.05) {
                AcquisitionStatus::Retry { attempt } => {
                    retries += 1;
                    assert_eq!(attempt, retries);
                }
                AcquisitionStatus::Exhausted => {
                    exhausted_at = Some(frame);
                    break;
                }
                _ => {}
            }
        }

        assert_eq!(retries, 10);
        assert!(exhausted_at.is_some());
        assert!(retry.is_exhausted());
        // Exhaustion is sticky
        assert_eq!(retry.tick(10.0), AcquisitionStatus::Exhausted);
    }

    #[test]
    fn test_interval_backs_off_to_cap() {
        let mut retry = AcquisitionRetry::new("gps", AcquisitionConfig::default());
        assert_eq!(retry.tick(0.4), AcquisitionStatus::Waiting);
        assert_eq!(retry.tick(0.1), AcquisitionStatus::Retry { attempt: 1 });
        // Second interval is 0.625s
        assert_eq!(retry.tick(0.6), AcquisitionStatus::Waiting);
        assert_eq!(retry.tick(0.05), AcquisitionStatus::Retry { attempt: 2 });
        for _ in 0..5 {
            retry.tick(5.0);
        }
        assert!(retry.interval_s <= 1.0 + f32::EPSILON);
    }

    #[test]
    fn test_acquired_stops_retrying() {
        let mut retry = AcquisitionRetry::new("compass", AcquisitionConfig::default());
        retry.tick(1.0);
        retry.mark_acquired();
        assert_eq!(retry.tick(100.0), AcquisitionStatus::Acquired);
        assert_eq!(retry.attempts(), 1);

        retry.reset();
        assert!(!retry.is_acquired());
        assert_eq!(retry.attempts(), 0);
    }
}
