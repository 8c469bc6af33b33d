//! Per-coin display state machine
//!
//! Distance from the player drives Hidden → Materializing → Visible →
//! Collectible, with a wide margin before re-hiding so a player lingering
//! at the edge does not make the coin blink. Materializing and Collecting
//! are timed and advance on their own.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::CoinDisplayState;

/// Distance and timing thresholds for the display states
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Coins closer than this start materializing (meters)
    pub materialize_distance_m: f64,
    /// Extra distance beyond materialize before re-hiding (meters)
    pub hide_hysteresis_m: f64,
    /// Coins closer than this can be collected (meters)
    pub collect_distance_m: f64,
    pub materialize_duration_s: f32,
    pub collecting_duration_s: f32,
    /// Materializing coins appear this far ahead of the camera (meters)
    pub view_distance_m: f32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            materialize_distance_m: 20.0,
            hide_hysteresis_m: 10.0,
            collect_distance_m: 5.0,
            materialize_duration_s: 0.8,
            collecting_duration_s: 1.0,
            view_distance_m: 2.0,
        }
    }
}

impl DisplayConfig {
    /// Distance beyond which a shown coin hides again
    pub fn hide_distance_m(&self) -> f64 {
        self.materialize_distance_m + self.hide_hysteresis_m
    }
}

/// A state change reported by [`CoinDisplayStateMachine::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CoinDisplayState,
    pub to: CoinDisplayState,
}

#[derive(Debug, Clone)]
pub struct CoinDisplayStateMachine {
    config: DisplayConfig,
    state: CoinDisplayState,
    timer_s: f32,
    finished: bool,
}

impl CoinDisplayStateMachine {
    pub fn new(config: DisplayConfig) -> Self {
        Self {
            config,
            state: CoinDisplayState::Hidden,
            timer_s: 0.0,
            finished: false,
        }
    }

    pub fn state(&self) -> CoinDisplayState {
        self.state
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    /// Advance one tick
    ///
    /// `distance_m` is `None` when no player fix exists yet; distance-driven
    /// transitions then hold while timed states keep running.
    pub fn update(&mut self, distance_m: Option<f64>, dt: f32) -> Option<Transition> {
        let dt = dt.max(0.0);
        let next = match self.state {
            CoinDisplayState::Hidden => match distance_m {
                Some(d) if d <= self.config.materialize_distance_m => Some(CoinDisplayState::Materializing),
                _ => None,
            },
            CoinDisplayState::Materializing => {
                self.timer_s += dt;
                (self.timer_s >= self.config.materialize_duration_s).then_some(CoinDisplayState::Visible)
            }
            CoinDisplayState::Visible => match distance_m {
                Some(d) if d <= self.config.collect_distance_m => Some(CoinDisplayState::Collectible),
                Some(d) if d > self.config.hide_distance_m() => Some(CoinDisplayState::Hidden),
                _ => None,
            },
            CoinDisplayState::Collectible => match distance_m {
                // A teleport-sized GPS jump skips straight past Visible
                Some(d) if d > self.config.hide_distance_m() => Some(CoinDisplayState::Hidden),
                Some(d) if d > self.config.collect_distance_m => Some(CoinDisplayState::Visible),
                _ => None,
            },
            CoinDisplayState::Collecting => {
                self.timer_s += dt;
                if !self.finished && self.timer_s >= self.config.collecting_duration_s {
                    self.finished = true;
                    debug!("collect animation finished");
                }
                None
            }
        };

        next.map(|to| self.enter(to))
    }

    /// Start the collect animation; only valid from Collectible
    pub fn collect(&mut self) -> bool {
        if self.state != CoinDisplayState::Collectible {
            return false;
        }
        self.enter(CoinDisplayState::Collecting);
        true
    }

    /// Whether the render layer should draw this coin
    pub fn should_render(&self) -> bool {
        match self.state {
            CoinDisplayState::Hidden => false,
            CoinDisplayState::Collecting => !self.finished,
            _ => true,
        }
    }

    /// Collecting has run its full duration; the coin can be released
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Camera-relative placement that overrides the positioner, if any
    pub fn placement_override(&self) -> Option<Vector3<f32>> {
        (self.state == CoinDisplayState::Materializing).then(|| Vector3::new(0.0, 0.0, self.config.view_distance_m))
    }

    fn enter(&mut self, to: CoinDisplayState) -> Transition {
        let from = self.state;
        self.state = to;
        self.timer_s = 0.0;
        self.finished = false;
        debug!(?from, ?to, "coin display transition");
        Transition { from, to }
    }
}
