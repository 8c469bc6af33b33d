//! Per-coin positioner selection

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::core::{CoinTarget, LocationFix};
use crate::processing::alignment::CompassAlignment;
use crate::processing::fallback::GyroscopeFallbackPositioner;
use crate::processing::reconciler::{LockEvent, PositionReconciler, ReconcilerConfig};

/// Coordinate frame an offset is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementFrame {
    /// Fixed AR world frame, relative to the player's tracked position
    ArWorld,
    /// Camera yaw frame, +z straight ahead
    Camera,
}

/// Unified positioner output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub offset: Vector3<f32>,
    pub frame: PlacementFrame,
    pub distance_m: Option<f64>,
    pub locked: bool,
    pub lock_event: Option<LockEvent>,
    /// Fallback coin inside collect range; held in place but not drawn
    pub pinned: bool,
}

/// Active positioner for one coin
#[derive(Debug, Clone)]
pub enum PositioningMode {
    Native(PositionReconciler),
    Fallback(GyroscopeFallbackPositioner),
}

impl PositioningMode {
    pub fn native(target: CoinTarget, alignment: CompassAlignment, config: ReconcilerConfig) -> Self {
        PositioningMode::Native(PositionReconciler::new(target, alignment, config))
    }

    pub fn target(&self) -> &CoinTarget {
        match self {
            PositioningMode::Native(r) => r.target(),
            PositioningMode::Fallback(g) => g.target(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, PositioningMode::Fallback(_))
    }

    /// Switch to heading-relative placement; no-op if already degraded
    pub fn degrade(&mut self, collect_distance_m: f64, view_distance_m: f32) {
        if let PositioningMode::Native(reconciler) = self {
            let target = reconciler.target().clone();
            *self = PositioningMode::Fallback(GyroscopeFallbackPositioner::new(
                target,
                collect_distance_m,
                view_distance_m,
            ));
        }
    }

    /// Drop cached native state so the next fix recomputes from scratch
    pub fn reset(&mut self) {
        if let PositioningMode::Native(reconciler) = self {
            reconciler.reset();
        }
    }

    /// Run one frame of whichever positioner is active
    pub fn update(&mut self, fix: Option<&LocationFix>, smoothed_heading: Option<f32>, dt: f32) -> Placement {
        match self {
            PositioningMode::Native(reconciler) => {
                let out = reconciler.recompute(fix, dt);
                Placement {
                    offset: out.offset,
                    frame: PlacementFrame::ArWorld,
                    distance_m: out.distance_m,
                    locked: out.locked,
                    lock_event: out.lock_event,
                    pinned: false,
                }
            }
            PositioningMode::Fallback(positioner) => {
                let out = positioner.update(fix, smoothed_heading);
                Placement {
                    offset: out.offset,
                    frame: PlacementFrame::Camera,
                    distance_m: out.distance_m,
                    locked: false,
                    lock_event: None,
                    pinned: out.pinned,
                }
            }
        }
    }
}
