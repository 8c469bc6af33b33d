//! Frame input and render output types for the session API

use nalgebra::Vector3;
use serde::Serialize;

use crate::core::{CameraPose, CoinDisplayState, TrackingQuality};
use crate::processing::heading::HeadingReadings;
use crate::processing::mode::PlacementFrame;

/// Everything the platform hands the session once per rendered frame
#[derive(Debug, Clone)]
pub struct FrameInput {
    /// Seconds since the previous frame
    pub dt: f32,
    /// Camera pose from the native tracker, if it produced one
    pub camera_pose: Option<CameraPose>,
    pub tracking_quality: TrackingQuality,
    pub heading_readings: HeadingReadings,
}

impl FrameInput {
    pub fn new(dt: f32, tracking_quality: TrackingQuality) -> Self {
        Self {
            dt,
            camera_pose: None,
            tracking_quality,
            heading_readings: HeadingReadings::default(),
        }
    }

    pub fn with_pose(mut self, pose: CameraPose) -> Self {
        self.camera_pose = Some(pose);
        self
    }

    pub fn with_heading(mut self, readings: HeadingReadings) -> Self {
        self.heading_readings = readings;
        self
    }
}

/// What the render layer needs for one coin this frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinRenderState {
    pub id: String,
    pub state: CoinDisplayState,
    /// `None` while hidden
    #[serde(skip)]
    pub offset: Option<Vector3<f32>>,
    pub frame: Option<PlacementFrame>,
    pub should_render: bool,
    pub distance_m: Option<f64>,
    pub locked: bool,
}

/// Coarse session health for observability
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SessionStatus {
    pub using_fallback: bool,
    pub compass_captured: bool,
    pub compass_degraded: bool,
    pub gps_acquired: bool,
    /// GPS never delivered within the retry budget
    pub gps_exhausted: bool,
    pub rejected_fixes: u64,
    pub active_coins: usize,
}
