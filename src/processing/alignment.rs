//! Session-wide compass reference
//!
//! The native tracker already follows camera rotation, so GPS bearings
//! must be converted into the AR frame exactly once, against a heading
//! frozen when tracking is first established. Every coin in the session
//! shares the same reference through a cloned [`CompassAlignment`] handle.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::algorithms::geo_math::heading_degrees;

/// Snapshot of the alignment state
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CompassAlignmentState {
    pub reference_heading_degrees: f32,
    pub captured: bool,
    /// Captured without a compass reading (reference defaulted to 0)
    pub degraded: bool,
}

/// Shared handle to the session's compass reference
#[derive(Debug, Clone, Default)]
pub struct CompassAlignment {
    inner: Arc<RwLock<CompassAlignmentState>>,
}

impl CompassAlignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the reference heading if none is held yet
    ///
    /// Returns true when this call performed the capture. Later calls are
    /// ignored until [`reset`](Self::reset).
    pub fn capture_reference(&self, current_heading: Option<f32>) -> bool {
        let mut state = self.inner.write();
        if state.captured {
            return false;
        }
        Self::apply(&mut state, current_heading);
        true
    }

    /// User-triggered recapture: reset and capture in one step
    pub fn recapture(&self, current_heading: Option<f32>) {
        let mut state = self.inner.write();
        Self::apply(&mut state, current_heading);
    }

    /// Forget the reference; call on AR session restart only
    pub fn reset(&self) {
        let mut state = self.inner.write();
        if state.captured {
            info!(reference = state.reference_heading_degrees, "compass reference cleared");
        }
        *state = CompassAlignmentState::default();
    }

    pub fn is_captured(&self) -> bool {
        self.inner.read().captured
    }

    /// Reference heading in degrees; 0 when nothing was captured
    pub fn reference(&self) -> f32 {
        let state = self.inner.read();
        if state.captured {
            state.reference_heading_degrees
        } else {
            0.0
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.inner.read().degraded
    }

    pub fn snapshot(&self) -> CompassAlignmentState {
        *self.inner.read()
    }

    fn apply(state: &mut CompassAlignmentState, heading: Option<f32>) {
        match heading.filter(|h| h.is_finite()) {
            Some(h) => {
                state.reference_heading_degrees = heading_degrees(h as f64);
                state.degraded = false;
                info!(reference = state.reference_heading_degrees, "compass reference captured");
            }
            None => {
                state.reference_heading_degrees = 0.0;
                state.degraded = true;
                warn!("compass unavailable at capture, reference defaulted to 0");
            }
        }
        state.captured = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_immutable_after_capture() {
        let alignment = CompassAlignment::new();
        assert!(!alignment.is_captured());
        assert_eq!(alignment.reference(), 0.0);

        assert!(alignment.capture_reference(Some(73.0)));
        for heading in [0.0, 120.0, 359.0] {
            assert!(!alignment.capture_reference(Some(heading)));
            assert_eq!(alignment.reference(), 73.0);
        }
        assert!(!alignment.capture_reference(None));
        assert_eq!(alignment.reference(), 73.0);
    }

    #[test]
    fn test_unavailable_heading_degrades_to_zero() {
        let alignment = CompassAlignment::new();
        assert!(alignment.capture_reference(None));
        assert!(alignment.is_captured());
        assert!(alignment.is_degraded());
        assert_eq!(alignment.reference(), 0.0);
    }

    #[test]
    fn test_reset_allows_new_capture() {
        let alignment = CompassAlignment::new();
        alignment.capture_reference(Some(10.0));
        alignment.reset();
        assert!(!alignment.is_captured());
        assert!(alignment.capture_reference(Some(200.0)));
        assert_eq!(alignment.reference(), 200.0);
    }

    #[test]
    fn test_reference_just_below_north_wraps_to_zero() {
        let alignment = CompassAlignment::new();
        alignment.capture_reference(Some(-1e-6));
        assert_eq!(alignment.reference(), 0.0);
    }

    #[test]
    fn test_handles_share_state() {
        let alignment = CompassAlignment::new();
        let coin_handle = alignment.clone();
        alignment.capture_reference(Some(-30.0));
        assert_eq!(coin_handle.reference(), 330.0);

        coin_handle.recapture(Some(15.0));
        assert_eq!(alignment.reference(), 15.0);
        assert_eq!(
            alignment.snapshot(),
            CompassAlignmentState { reference_heading_degrees: 15.0, captured: true, degraded: false }
        );
    }
}
