//! Core data types for the coin positioning system

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::validation::error::InputError;

/// Geographic coordinate in decimal degrees (WGS84)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Construct a point, rejecting non-finite or out-of-range values
    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self, InputError> {
        let point = Self::new(latitude, longitude);
        crate::validation::data::validate_point(&point)?;
        Ok(point)
    }

    pub fn is_valid(&self) -> bool {
        crate::validation::data::validate_point(self).is_ok()
    }
}

/// One GPS fix as delivered by the platform geolocation callback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub coordinate: GeoPoint,
    /// Altitude above the ellipsoid (meters)
    pub altitude: f64,
    /// Radius of 68% confidence (meters)
    pub horizontal_accuracy_m: f32,
    /// Milliseconds since an arbitrary epoch, monotonic per source
    pub timestamp_ms: u64,
}

impl LocationFix {
    pub fn new(coordinate: GeoPoint, horizontal_accuracy_m: f32, timestamp_ms: u64) -> Self {
        Self {
            coordinate,
            altitude: 0.0,
            horizontal_accuracy_m,
            timestamp_ms,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = altitude;
        self
    }
}

/// Sensor path that produced a heading value, in fallback priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeadingMethod {
    AttitudeSensor,
    Accelerometer,
    GravitySensor,
    LegacyCompass,
    Camera,
}

/// Device heading estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadingSample {
    /// Degrees clockwise from true north, in [0, 360)
    pub degrees_from_north: f32,
    pub source: HeadingMethod,
    pub smoothed: bool,
}

/// A coin placed at a geographic coordinate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinTarget {
    pub id: String,
    pub coordinate: GeoPoint,
    /// Render height above the ground plane (meters)
    pub height_above_ground_m: f32,
    /// Reward credited on collection
    pub value: f64,
}

impl CoinTarget {
    pub fn new(id: impl Into<String>, coordinate: GeoPoint, value: f64) -> Self {
        Self {
            id: id.into(),
            coordinate,
            height_above_ground_m: crate::core::constants::DEFAULT_COIN_HEIGHT_M,
            value,
        }
    }

    pub fn with_height(mut self, height_above_ground_m: f32) -> Self {
        self.height_above_ground_m = height_above_ground_m;
        self
    }
}

/// Coarse tracking quality reported by the native AR tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingQuality {
    Tracking,
    Initializing,
    Limited,
    NotAvailable,
}

/// Camera pose in the AR world frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl CameraPose {
    pub fn new(position: Vector3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Self { position, rotation }
    }

    pub fn at(position: Vector3<f32>) -> Self {
        Self::new(position, UnitQuaternion::identity())
    }
}

impl Default for CameraPose {
    fn default() -> Self {
        Self::at(Vector3::zeros())
    }
}

/// Per-coin display state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoinDisplayState {
    Hidden,
    Materializing,
    Visible,
    Collectible,
    Collecting,
}

impl CoinDisplayState {
    /// States whose placement comes from a positioner
    pub fn is_positioned(&self) -> bool {
        matches!(
            self,
            CoinDisplayState::Visible | CoinDisplayState::Collectible | CoinDisplayState::Collecting
        )
    }
}
