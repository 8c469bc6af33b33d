//! AR Coin Hunt positioning core
//!
//! Turns noisy GPS fixes and a drifting compass into stable placements for
//! coins in a camera-tracked AR world, and drives each coin through its
//! Hidden → Materializing → Visible → Collectible → Collecting display states.
//! Degrades to heading-relative placement when native tracking stalls.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod coins;
pub mod validation;
pub mod utils;
pub mod hardware;
pub mod api;

// Re-export commonly used types
pub use core::{
    CameraPose, CoinDisplayState, CoinTarget, GeoPoint, HeadingMethod, HeadingSample, LocationFix,
    TrackingQuality, EARTH_RADIUS_M,
};
pub use algorithms::geo_math::{bearing_degrees, destination_point, distance_meters};
pub use processing::{
    CompassAlignment, GyroscopeFallbackPositioner, HeadingReadings, HeadingSource, Placement, PlacementFrame,
    PositionReconciler, PositioningMode, TrackingMode, TrackingMonitor,
};
pub use coins::{CoinDisplayStateMachine, CoinEvent, CoinLifecycleManager, CollectOutcome};
pub use hardware::{FixSink, LocationSource, SensorError, SimulatedGps};
pub use validation::InputError;
pub use utils::{ConfigError, ConfigManager, HuntConfig};
pub use api::{CoinRenderState, FrameInput, HuntSession, SessionStatus};

/// Install a `tracing` subscriber honoring `RUST_LOG`, defaulting to `info`
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
