//! Sensor fusion and coin positioning

pub mod alignment;
pub mod fallback;
pub mod heading;
pub mod mode;
pub mod reconciler;

pub use alignment::{CompassAlignment, CompassAlignmentState};
pub use fallback::{decide_mode, FallbackConfig, GyroscopeFallbackPositioner, TrackingMode, TrackingMonitor};
pub use heading::{HeadingConfig, HeadingReadings, HeadingSource};
pub use mode::{Placement, PlacementFrame, PositioningMode};
pub use reconciler::{LockEvent, PositionReconciler, PositionerRuntimeState, ReconcilerConfig};
