//! Physical constants and default thresholds

/// Mean Earth radius used by the haversine formulas (meters)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Render height for coins that don't specify one (meters)
pub const DEFAULT_COIN_HEIGHT_M: f32 = 0.0;

/// Upper bound on simultaneously active coins
pub const MAX_ACTIVE_COINS: usize = 20;
