//! GPS to AR-world reconciliation for a single coin
//!
//! Converts the player-to-coin bearing and distance into a horizontal
//! offset in the AR world frame, rotated by the session's frozen compass
//! reference. Two gates keep the coin still on screen:
//! - a movement gate that ignores fixes within a few meters of the last
//!   one used, since stationary GPS wanders that much
//! - a position lock with hysteresis once the player is close, released
//!   only when they walk well beyond the lock radius

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::algorithms::geo_math::{angular_difference, bearing_degrees, distance_meters, normalize_degrees_180};
use crate::algorithms::smoothing::SmoothDamp;
use crate::core::{CoinTarget, GeoPoint, LocationFix};
use crate::processing::alignment::CompassAlignment;

/// Thresholds for the native-tracking positioner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Minimum player movement before recomputing (meters)
    pub movement_threshold_m: f64,
    /// Freeze the offset below this distance (meters)
    pub lock_distance_m: f64,
    /// Release the lock above this distance (meters)
    pub unlock_distance_m: f64,
    /// Time constant for easing toward a new offset (seconds)
    pub smoothing_time_s: f32,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            movement_threshold_m: 3.0,
            lock_distance_m: 8.0,
            unlock_distance_m: 15.0,
            smoothing_time_s: 0.3,
        }
    }
}

/// Per-coin positioner state
#[derive(Debug, Clone, PartialEq)]
pub struct PositionerRuntimeState {
    pub is_locked: bool,
    /// Target offset from the last recomputation (before smoothing)
    pub last_computed_world_offset: Vector3<f32>,
    pub last_player_fix_used: Option<GeoPoint>,
    /// EMA of the adjusted bearing's rate of change (degrees/second)
    pub smoothed_bearing_velocity: f32,
    last_bearing: Option<(f32, u64)>,
}

impl Default for PositionerRuntimeState {
    fn default() -> Self {
        Self {
            is_locked: false,
            last_computed_world_offset: Vector3::zeros(),
            last_player_fix_used: None,
            smoothed_bearing_velocity: 0.0,
            last_bearing: None,
        }
    }
}

/// Lock transitions reported by a reconcile step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LockEvent {
    Locked { distance_m: f64 },
    Unlocked { distance_m: f64 },
}

/// Result of one reconcile step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcileOutput {
    /// Smoothed offset to render this frame
    pub offset: Vector3<f32>,
    /// Player-to-coin distance, when a fix is available
    pub distance_m: Option<f64>,
    pub locked: bool,
    /// Whether a new target offset was computed this step
    pub recomputed: bool,
    pub lock_event: Option<LockEvent>,
}

const BEARING_VELOCITY_ALPHA: f32 = 0.3;

/// Native-tracking positioner for one coin
#[derive(Debug, Clone)]
pub struct PositionReconciler {
    config: ReconcilerConfig,
    target: CoinTarget,
    alignment: CompassAlignment,
    state: PositionerRuntimeState,
    smoother: SmoothDamp,
    last_distance_m: Option<f64>,
}

impl PositionReconciler {
    pub fn new(target: CoinTarget, alignment: CompassAlignment, config: ReconcilerConfig) -> Self {
        let smoother = SmoothDamp::new(config.smoothing_time_s);
        Self {
            config,
            target,
            alignment,
            state: PositionerRuntimeState::default(),
            smoother,
            last_distance_m: None,
        }
    }

    /// Advance one frame with the player's latest fix
    ///
    /// Never fails: with no fix, or an invalid one, the last offset is held.
    pub fn recompute(&mut self, fix: Option<&LocationFix>, dt: f32) -> ReconcileOutput {
        let Some(fix) = fix else {
            return self.hold(dt, None);
        };
        let player = fix.coordinate;
        if !player.is_valid() {
            warn!(coin = %self.target.id, "skipping invalid player fix");
            return self.hold(dt, None);
        }

        let distance = distance_meters(&player, &self.target.coordinate);
        self.last_distance_m = Some(distance);
        let mut lock_event = None;
        let mut force = false;

        if self.state.is_locked {
            if distance > self.config.unlock_distance_m {
                self.state.is_locked = false;
                force = true;
                lock_event = Some(LockEvent::Unlocked { distance_m: distance });
                debug!(coin = %self.target.id, distance_m = distance, "position unlocked");
            } else {
                return self.hold(dt, lock_event);
            }
        }

        let recomputed = force || self.passes_movement_gate(&player);
        if recomputed {
            self.compute_target(fix, distance);
        }

        if distance < self.config.lock_distance_m {
            self.state.is_locked = true;
            lock_event = Some(LockEvent::Locked { distance_m: distance });
            debug!(coin = %self.target.id, distance_m = distance, "position locked");
        }

        let mut output = self.hold(dt, lock_event);
        output.recomputed = recomputed;
        output
    }

    pub fn target(&self) -> &CoinTarget {
        &self.target
    }

    pub fn state(&self) -> &PositionerRuntimeState {
        &self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state.is_locked
    }

    pub fn current_offset(&self) -> Vector3<f32> {
        self.smoother.current()
    }

    pub fn last_distance_m(&self) -> Option<f64> {
        self.last_distance_m
    }

    /// Drop all cached state; the next fix is treated as the first
    pub fn reset(&mut self) {
        self.state = PositionerRuntimeState::default();
        self.smoother.reset();
        self.last_distance_m = None;
    }

    fn passes_movement_gate(&self, player: &GeoPoint) -> bool {
        match &self.state.last_player_fix_used {
            None => true,
            Some(last) => distance_meters(last, player) >= self.config.movement_threshold_m,
        }
    }

    fn compute_target(&mut self, fix: &LocationFix, distance: f64) {
        let player = fix.coordinate;
        let bearing = bearing_degrees(&player, &self.target.coordinate);
        let adjusted = normalize_degrees_180((bearing - self.alignment.reference()) as f64);
        let rad = adjusted.to_radians();

        let offset = Vector3::new(
            (distance * rad.sin()) as f32,
            self.target.height_above_ground_m,
            (distance * rad.cos()) as f32,
        );

        self.update_bearing_velocity(adjusted as f32, fix.timestamp_ms);

        let first = self.state.last_player_fix_used.is_none();
        self.state.last_computed_world_offset = offset;
        self.state.last_player_fix_used = Some(player);
        if first {
            self.smoother.snap_to(offset);
        }
    }

    fn update_bearing_velocity(&mut self, bearing: f32, timestamp_ms: u64) {
        if let Some((prev, prev_ms)) = self.state.last_bearing {
            let elapsed_s = timestamp_ms.saturating_sub(prev_ms) as f32 / 1000.0;
            if elapsed_s > 0.0 {
                let rate = angular_difference(prev, bearing) / elapsed_s;
                self.state.smoothed_bearing_velocity = BEARING_VELOCITY_ALPHA * rate
                    + (1.0 - BEARING_VELOCITY_ALPHA) * self.state.smoothed_bearing_velocity;
            }
        }
        self.state.last_bearing = Some((bearing, timestamp_ms));
    }

    fn hold(&mut self, dt: f32, lock_event: Option<LockEvent>) -> ReconcileOutput {
        let offset = if self.smoother.is_initialized() {
            self.smoother.advance(self.state.last_computed_world_offset, dt)
        } else {
            self.smoother.current()
        };
        ReconcileOutput {
            offset,
            distance_m: self.last_distance_m,
            locked: self.state.is_locked,
            recomputed: false,
            lock_event,
        }
    }
}
