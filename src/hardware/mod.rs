//! Sensor abstraction layer
//!
//! Wraps platform geolocation delivery and initial acquisition. Orientation
//! sensors are polled per frame and handled by `processing::heading`.

pub mod acquisition;
pub mod error;
pub mod location;
pub mod mock;

pub use acquisition::{AcquisitionConfig, AcquisitionRetry, AcquisitionStatus};
pub use error::{RecoveryStrategy, SensorError, SensorResult};
pub use location::{FixSink, LocationConfig, LocationSource, LocationStats};
pub use mock::SimulatedGps;
