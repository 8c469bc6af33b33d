//! Degraded positioning for sessions where native tracking fails
//!
//! [`TrackingMonitor`] watches the tracker's quality signal and the camera
//! pose. Once it decides tracking is unusable it latches fallback for the
//! rest of the session; flipping back would make every coin jump.
//!
//! [`GyroscopeFallbackPositioner`] then places each coin relative to the
//! camera using the live smoothed compass heading, like a compass needle.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::algorithms::geo_math::{bearing_degrees, distance_meters, normalize_degrees_180};
use crate::core::{CameraPose, CoinTarget, LocationFix, TrackingQuality};

/// Thresholds for declaring native tracking failed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Camera frozen this long means the tracker is stuck (seconds)
    pub stationary_timeout_s: f32,
    /// Ignore failures before the session has run this long (seconds)
    pub min_session_time_s: f32,
    /// Camera moves smaller than this count as stationary (meters)
    pub stationary_epsilon_m: f32,
    /// Non-tracking quality must persist this long (seconds)
    pub not_tracking_grace_s: f32,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            stationary_timeout_s: 3.0,
            min_session_time_s: 2.0,
            stationary_epsilon_m: 0.001,
            not_tracking_grace_s: 1.0,
        }
    }
}

/// Which positioner family drives coin placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingMode {
    Native,
    Fallback,
}

/// Pure mode decision for one frame
pub fn decide_mode(
    quality: TrackingQuality,
    camera_stationary_s: f32,
    session_time_s: f32,
    config: &FallbackConfig,
) -> TrackingMode {
    if session_time_s < config.min_session_time_s {
        return TrackingMode::Native;
    }
    if quality != TrackingQuality::Tracking || camera_stationary_s > config.stationary_timeout_s {
        TrackingMode::Fallback
    } else {
        TrackingMode::Native
    }
}

/// Per-session tracker health watchdog with a one-way fallback latch
#[derive(Debug, Clone)]
pub struct TrackingMonitor {
    config: FallbackConfig,
    session_time_s: f32,
    stationary_s: f32,
    not_tracking_s: f32,
    anchor: Option<Vector3<f32>>,
    latched: bool,
}

impl TrackingMonitor {
    pub fn new(config: FallbackConfig) -> Self {
        Self {
            config,
            session_time_s: 0.0,
            stationary_s: 0.0,
            not_tracking_s: 0.0,
            anchor: None,
            latched: false,
        }
    }

    /// Feed one frame; returns the mode to use this frame
    pub fn update(&mut self, pose: Option<&CameraPose>, quality: TrackingQuality, dt: f32) -> TrackingMode {
        if self.latched {
            return TrackingMode::Fallback;
        }
        let dt = dt.max(0.0);
        self.session_time_s += dt;

        if quality == TrackingQuality::Tracking {
            self.not_tracking_s = 0.0;
        } else {
            self.not_tracking_s += dt;
        }

        match (pose, self.anchor) {
            (Some(pose), Some(anchor)) if (pose.position - anchor).norm() <= self.config.stationary_epsilon_m => {
                self.stationary_s += dt;
            }
            (Some(pose), _) => {
                self.anchor = Some(pose.position);
                self.stationary_s = 0.0;
            }
            // No pose at all counts as frozen
            (None, _) => self.stationary_s += dt,
        }

        // Short quality dips are ignored
        let effective = if self.not_tracking_s >= self.config.not_tracking_grace_s {
            quality
        } else {
            TrackingQuality::Tracking
        };

        let mode = decide_mode(effective, self.stationary_s, self.session_time_s, &self.config);
        if mode == TrackingMode::Fallback {
            self.latched = true;
            warn!(
                quality = ?quality,
                stationary_s = self.stationary_s,
                session_s = self.session_time_s,
                "native tracking judged failed, switching to gyroscope fallback"
            );
        }
        mode
    }

    /// Latch fallback regardless of tracker health, e.g. when sensor
    /// acquisition gave up
    pub fn force_fallback(&mut self, reason: &'static str) {
        if !self.latched {
            self.latched = true;
            warn!(reason, "forcing gyroscope fallback");
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.latched
    }

    pub fn stationary_s(&self) -> f32 {
        self.stationary_s
    }

    /// Clear the latch; only for an AR session restart
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }
}

/// Result of one fallback placement step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackOutput {
    /// Offset in the camera's yaw frame (+z straight ahead)
    pub offset: Vector3<f32>,
    pub distance_m: Option<f64>,
    /// Inside collect range: bearing-following suppressed, coin pinned ahead
    pub pinned: bool,
}

/// Heading-relative positioner for one coin
#[derive(Debug, Clone)]
pub struct GyroscopeFallbackPositioner {
    target: CoinTarget,
    collect_distance_m: f64,
    view_distance_m: f32,
    last: Option<FallbackOutput>,
}

impl GyroscopeFallbackPositioner {
    pub fn new(target: CoinTarget, collect_distance_m: f64, view_distance_m: f32) -> Self {
        Self {
            target,
            collect_distance_m,
            view_distance_m,
            last: None,
        }
    }

    /// Place the coin relative to where the device points right now
    ///
    /// A missing heading is treated as north; a missing fix holds the
    /// previous placement.
    pub fn update(&mut self, fix: Option<&LocationFix>, smoothed_heading: Option<f32>) -> FallbackOutput {
        let Some(fix) = fix.filter(|f| f.coordinate.is_valid()) else {
            return self.last.unwrap_or(FallbackOutput {
                offset: Vector3::zeros(),
                distance_m: None,
                pinned: false,
            });
        };

        let player = fix.coordinate;
        let distance = distance_meters(&player, &self.target.coordinate);
        let height = self.target.height_above_ground_m;

        let output = if distance <= self.collect_distance_m {
            // Bearing is noise at this range; keep the coin tappable
            FallbackOutput {
                offset: Vector3::new(0.0, height, self.view_distance_m),
                distance_m: Some(distance),
                pinned: true,
            }
        } else {
            let bearing = bearing_degrees(&player, &self.target.coordinate);
            let heading = smoothed_heading.filter(|h| h.is_finite()).unwrap_or(0.0);
            let relative = normalize_degrees_180((bearing - heading) as f64).to_radians();
            FallbackOutput {
                offset: Vector3::new(
                    (distance * relative.sin()) as f32,
                    height,
                    (distance * relative.cos()) as f32,
                ),
                distance_m: Some(distance),
                pinned: false,
            }
        };

        self.last = Some(output);
        output
    }

    pub fn target(&self) -> &CoinTarget {
        &self.target
    }
}
