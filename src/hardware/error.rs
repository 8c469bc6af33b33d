//! Sensor error types and recovery policy

use thiserror::Error;

/// Errors raised by sensor sources
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorError {
    /// Platform refused access (location/motion permission)
    #[error("Permission denied for {sensor}")]
    PermissionDenied { sensor: &'static str },
    /// Hardware or platform API missing on this device
    #[error("Sensor unavailable: {sensor}")]
    Unavailable { sensor: &'static str },
    /// Operation requires a started source
    #[error("{sensor} source not started")]
    NotStarted { sensor: &'static str },
    /// Every producer handle was dropped
    #[error("Sample channel closed")]
    ChannelClosed,
    /// Initial acquisition gave up
    #[error("Acquisition timed out after {attempts} attempts")]
    AcquisitionTimeout { attempts: u32 },
}

/// Error recovery strategy for sensor failures
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecoveryStrategy {
    /// Retry on the next tick
    Retry,
    /// Wait and then retry
    RetryWithDelay { delay_s: f32 },
    /// Continue with default values
    Degrade,
    /// Fail permanently
    Fail,
}

impl SensorError {
    /// Get the recommended recovery strategy for this error
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            SensorError::PermissionDenied { .. } => RecoveryStrategy::Fail,
            SensorError::Unavailable { .. } => RecoveryStrategy::Degrade,
            SensorError::NotStarted { .. } => RecoveryStrategy::Retry,
            SensorError::ChannelClosed => RecoveryStrategy::Degrade,
            SensorError::AcquisitionTimeout { .. } => RecoveryStrategy::RetryWithDelay { delay_s: 1.0 },
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.recovery_strategy(), RecoveryStrategy::Fail)
    }
}

/// Result type for sensor operations
pub type SensorResult<T> = Result<T, SensorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_is_fatal() {
        let err = SensorError::PermissionDenied { sensor: "location" };
        assert_eq!(err.recovery_strategy(), RecoveryStrategy::Fail);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_unavailable_degrades() {
        let err = SensorError::Unavailable { sensor: "compass" };
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "Sensor unavailable: compass");
    }
}
