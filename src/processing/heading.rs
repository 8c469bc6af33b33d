//! Device heading from whichever orientation sensor is alive
//!
//! Sources are tried in a fixed priority order each tick:
//! 1. Platform attitude sensor (fused yaw relative to true north)
//! 2. Accelerometer + magnetometer, tilt compensated
//! 3. Gravity sensor + magnetometer, tilt compensated
//! 4. Legacy compass API
//! 5. AR camera yaw (last resort, not north referenced)
//!
//! The first usable value is fed through a circular smoother. When every
//! source is dead the last smoothed value is kept.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::algorithms::geo_math::heading_degrees;
use crate::algorithms::smoothing::AngleSmoother;
use crate::core::{HeadingMethod, HeadingSample};
use crate::validation::data::validate_heading;

/// Configuration for heading estimation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadingConfig {
    /// Weight of each new sample in the circular EMA (0-1]
    pub smoothing_factor: f32,
    /// Minimum magnetic field magnitude to trust (μT)
    pub min_mag_magnitude_ut: f32,
    /// Maximum magnetic field magnitude to trust (μT)
    pub max_mag_magnitude_ut: f32,
}

impl Default for HeadingConfig {
    fn default() -> Self {
        Self {
            smoothing_factor: 0.15,
            min_mag_magnitude_ut: 20.0, // Earth's field is ~25-65 μT
            max_mag_magnitude_ut: 70.0,
        }
    }
}

/// Raw orientation readings polled from the platform this frame
///
/// Vectors are in device coordinates: +x right, +y toward the top edge,
/// +z out of the screen. The camera looks along -z.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadingReadings {
    pub attitude_yaw_deg: Option<f32>,
    pub accelerometer: Option<Vector3<f32>>,
    pub gravity: Option<Vector3<f32>>,
    pub magnetometer: Option<Vector3<f32>>,
    pub legacy_compass_deg: Option<f32>,
    pub camera_yaw_deg: Option<f32>,
}

impl HeadingReadings {
    /// Readings with only the attitude sensor populated
    pub fn attitude(yaw_deg: f32) -> Self {
        Self {
            attitude_yaw_deg: Some(yaw_deg),
            ..Default::default()
        }
    }
}

/// Heading of the camera's forward axis from an up-vector and a magnetic
/// field vector, both in device coordinates
///
/// Falls back to the device's top edge when the camera points straight
/// up or down.
pub fn tilt_compensated_heading(up: &Vector3<f32>, magnetic: &Vector3<f32>) -> Option<f32> {
    if up.norm() < 0.1 {
        return None;
    }
    let up = up.normalize();
    let east = magnetic.cross(&up);
    if east.norm() < 1e-3 {
        // Field parallel to gravity, no horizontal component
        return None;
    }
    let east = east.normalize();
    let north = up.cross(&east);

    // Camera forward is device -z
    let forward_east = -east.z;
    let forward_north = -north.z;
    let (e, n) = if (forward_east * forward_east + forward_north * forward_north).sqrt() > 0.2 {
        (forward_east, forward_north)
    } else {
        (east.y, north.y)
    };

    Some(heading_degrees(e.atan2(n).to_degrees() as f64))
}

/// Best-effort heading estimator with a sensor fallback chain
pub struct HeadingSource {
    config: HeadingConfig,
    smoother: AngleSmoother,
    raw: Option<HeadingSample>,
    smoothed: Option<HeadingSample>,
    active_method: Option<HeadingMethod>,
    available: bool,
}

impl HeadingSource {
    pub fn new(config: HeadingConfig) -> Self {
        let smoother = AngleSmoother::new(config.smoothing_factor);
        Self {
            config,
            smoother,
            raw: None,
            smoothed: None,
            active_method: None,
            available: false,
        }
    }

    /// Fold in this frame's readings
    ///
    /// Returns the fresh smoothed sample, or `None` if no source produced
    /// a value this frame.
    pub fn update(&mut self, readings: &HeadingReadings) -> Option<HeadingSample> {
        let Some((degrees, method)) = self.select(readings) else {
            if self.available {
                warn!("no heading source available, holding last value");
            }
            self.available = false;
            return None;
        };

        if self.active_method != Some(method) {
            debug!(from = ?self.active_method, to = ?method, "heading source changed");
            self.active_method = Some(method);
        }
        self.available = true;

        let degrees = heading_degrees(degrees as f64);
        self.raw = Some(HeadingSample {
            degrees_from_north: degrees,
            source: method,
            smoothed: false,
        });

        let smoothed = HeadingSample {
            degrees_from_north: self.smoother.update(degrees),
            source: method,
            smoothed: true,
        };
        self.smoothed = Some(smoothed);
        Some(smoothed)
    }

    /// Last smoothed heading, possibly from an earlier frame
    pub fn current(&self) -> Option<HeadingSample> {
        self.smoothed
    }

    /// Smoothed degrees from north, if any source ever reported
    pub fn smoothed_degrees(&self) -> Option<f32> {
        self.smoothed.map(|s| s.degrees_from_north)
    }

    pub fn raw(&self) -> Option<HeadingSample> {
        self.raw
    }

    pub fn active_method(&self) -> Option<HeadingMethod> {
        self.active_method
    }

    /// Whether the last update found a live source
    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn reset(&mut self) {
        self.smoother.reset();
        self.raw = None;
        self.smoothed = None;
        self.active_method = None;
        self.available = false;
    }

    fn select(&self, readings: &HeadingReadings) -> Option<(f32, HeadingMethod)> {
        if let Some(yaw) = readings.attitude_yaw_deg.and_then(|v| validate_heading(v, "attitude").ok()) {
            return Some((yaw, HeadingMethod::AttitudeSensor));
        }

        let magnetic = readings.magnetometer.filter(|m| self.magnetometer_trusted(m));
        if let Some(mag) = &magnetic {
            if let Some(deg) = readings
                .accelerometer
                .and_then(|a| tilt_compensated_heading(&a, mag))
            {
                return Some((deg, HeadingMethod::Accelerometer));
            }
            if let Some(deg) = readings.gravity.and_then(|g| tilt_compensated_heading(&g, mag)) {
                return Some((deg, HeadingMethod::GravitySensor));
            }
        }

        if let Some(deg) = readings
            .legacy_compass_deg
            .and_then(|v| validate_heading(v, "legacy_compass").ok())
        {
            return Some((deg, HeadingMethod::LegacyCompass));
        }

        readings
            .camera_yaw_deg
            .and_then(|v| validate_heading(v, "camera").ok())
            .map(|deg| (deg, HeadingMethod::Camera))
    }

    fn magnetometer_trusted(&self, mag: &Vector3<f32>) -> bool {
        let magnitude = mag.norm();
        magnitude.is_finite()
            && magnitude >= self.config.min_mag_magnitude_ut
            && magnitude <= self.config.max_mag_magnitude_ut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upright_facing_north() -> (Vector3<f32>, Vector3<f32>) {
        // y = up, z = south, field points north and down
        (Vector3::new(0.0, 9.81, 0.0), Vector3::new(0.0, -30.0, -30.0))
    }

    #[test]
    fn test_tilt_compensation_upright_north() {
        let (up, mag) = upright_facing_north();
        let heading = tilt_compensated_heading(&up, &mag).unwrap();
        assert!(heading < 0.5 || heading > 359.5, "heading {}", heading);
    }

    #[test]
    fn test_tilt_compensation_upright_east() {
        // Camera faces east: x = south, y = up, z = west
        let up = Vector3::new(0.0, 9.81, 0.0);
        let mag = Vector3::new(-30.0, -30.0, 0.0);
        let heading = tilt_compensated_heading(&up, &mag).unwrap();
        assert!((heading - 90.0).abs() < 0.5, "heading {}", heading);
    }

    #[test]
    fn test_tilt_compensation_flat_uses_top_edge() {
        // Face up, top edge north
        let up = Vector3::new(0.0, 0.0, 9.81);
        let mag = Vector3::new(0.0, 30.0, -30.0);
        let heading = tilt_compensated_heading(&up, &mag).unwrap();
        assert!(heading < 0.5 || heading > 359.5, "heading {}", heading);
    }

    #[test]
    fn test_attitude_preferred() {
        let (up, mag) = upright_facing_north();
        let mut source = HeadingSource::new(HeadingConfig::default());
        let readings = HeadingReadings {
            attitude_yaw_deg: Some(45.0),
            accelerometer: Some(up),
            magnetometer: Some(mag),
            legacy_compass_deg: Some(200.0),
            ..Default::default()
        };
        let sample = source.update(&readings).unwrap();
        assert_eq!(sample.source, HeadingMethod::AttitudeSensor);
        assert!((sample.degrees_from_north - 45.0).abs() < 1e-3);
        assert!(sample.smoothed);
    }

    #[test]
    fn test_fallback_chain_order() {
        let (up, mag) = upright_facing_north();
        let mut source = HeadingSource::new(HeadingConfig::default());

        let mut readings = HeadingReadings {
            accelerometer: Some(up),
            gravity: Some(up),
            magnetometer: Some(mag),
            legacy_compass_deg: Some(10.0),
            camera_yaw_deg: Some(20.0),
            ..Default::default()
        };
        source.update(&readings);
        assert_eq!(source.active_method(), Some(HeadingMethod::Accelerometer));

        readings.accelerometer = None;
        source.update(&readings);
        assert_eq!(source.active_method(), Some(HeadingMethod::GravitySensor));

        // Distorted field is ignored
        readings.magnetometer = Some(Vector3::new(0.0, 0.0, 500.0));
        source.update(&readings);
        assert_eq!(source.active_method(), Some(HeadingMethod::LegacyCompass));

        readings.legacy_compass_deg = Some(f32::NAN);
        source.update(&readings);
        assert_eq!(source.active_method(), Some(HeadingMethod::Camera));
    }

    #[test]
    fn test_raw_heading_just_below_north_wraps_to_zero() {
        let mut source = HeadingSource::new(HeadingConfig::default());
        source.update(&HeadingReadings::attitude(-1e-6));
        assert_eq!(source.raw().unwrap().degrees_from_north, 0.0);
        let smoothed = source.smoothed_degrees().unwrap();
        assert!((0.0..360.0).contains(&smoothed), "smoothed {}", smoothed);
    }

    #[test]
    fn test_unavailable_holds_last_value() {
        let mut source = HeadingSource::new(HeadingConfig::default());
        source.update(&HeadingReadings::attitude(120.0));
        assert!(source.update(&HeadingReadings::default()).is_none());
        assert!(!source.is_available());
        assert!((source.smoothed_degrees().unwrap() - 120.0).abs() < 1e-3);
    }

    #[test]
    fn test_smoothing_damps_jitter() {
        let mut source = HeadingSource::new(HeadingConfig::default());
        source.update(&HeadingReadings::attitude(90.0));
        let sample = source.update(&HeadingReadings::attitude(110.0)).unwrap();
        assert!(sample.degrees_from_north > 90.0 && sample.degrees_from_north < 100.0);
        assert!((source.raw().unwrap().degrees_from_north - 110.0).abs() < 1e-3);
    }
}
