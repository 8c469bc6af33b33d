//! Device geolocation wrapper
//!
//! Platform callbacks run on their own queue and push fixes through a
//! cloneable [`FixSink`]. The frame loop calls [`LocationSource::poll`]
//! once per tick, which validates, throttles and keeps the newest fix.

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::algorithms::geo_math::distance_meters;
use crate::core::LocationFix;
use crate::hardware::error::{SensorError, SensorResult};
use crate::validation::data::validate_fix;

/// Throttle applied to incoming fixes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Accept a fix once the player moved at least this far (meters)
    pub min_distance_m: f64,
    /// ...or once this much time passed since the last accepted fix
    pub min_interval_ms: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            min_distance_m: 2.0,
            min_interval_ms: 2000,
        }
    }
}

/// Producer handle given to the platform geolocation callback
#[derive(Debug, Clone)]
pub struct FixSink {
    tx: Sender<LocationFix>,
}

impl FixSink {
    pub fn push(&self, fix: LocationFix) -> SensorResult<()> {
        self.tx.send(fix).map_err(|_| SensorError::ChannelClosed)
    }
}

/// Counters for observability
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocationStats {
    pub accepted: u64,
    pub throttled: u64,
    pub rejected: u64,
}

/// Throttled stream of validated GPS fixes
pub struct LocationSource {
    config: LocationConfig,
    tx: Sender<LocationFix>,
    rx: Receiver<LocationFix>,
    running: bool,
    last_fix: Option<LocationFix>,
    stats: LocationStats,
}

impl LocationSource {
    pub fn new(config: LocationConfig) -> Self {
        let (tx, rx) = unbounded();
        Self {
            config,
            tx,
            rx,
            running: false,
            last_fix: None,
            stats: LocationStats::default(),
        }
    }

    /// Handle for the platform callback
    pub fn sink(&self) -> FixSink {
        FixSink { tx: self.tx.clone() }
    }

    /// Begin accepting fixes; anything queued before start is dropped
    pub fn start(&mut self) -> SensorResult<()> {
        if self.running {
            return Ok(());
        }
        let stale = self.rx.try_iter().count();
        self.running = true;
        info!(dropped = stale, "location updates started");
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            info!("location updates stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Drain pending fixes and return the newest accepted one, if any
    pub fn poll(&mut self) -> SensorResult<Option<LocationFix>> {
        if !self.running {
            // Keep the queue from growing while stopped
            self.rx.try_iter().for_each(drop);
            return Err(SensorError::NotStarted { sensor: "location" });
        }

        let mut newest = None;
        while let Ok(fix) = self.rx.try_recv() {
            if let Err(e) = validate_fix(&fix) {
                self.stats.rejected += 1;
                error!(kind = e.kind(), error = %e, "rejected location fix");
                continue;
            }
            if self.should_accept(&fix) {
                self.stats.accepted += 1;
                self.last_fix = Some(fix);
                newest = Some(fix);
            } else {
                self.stats.throttled += 1;
            }
        }

        if let Some(fix) = &newest {
            debug!(
                lat = fix.coordinate.latitude,
                lon = fix.coordinate.longitude,
                accuracy_m = fix.horizontal_accuracy_m,
                "location fix"
            );
        }
        Ok(newest)
    }

    pub fn last_fix(&self) -> Option<&LocationFix> {
        self.last_fix.as_ref()
    }

    pub fn stats(&self) -> LocationStats {
        self.stats
    }

    fn should_accept(&self, fix: &LocationFix) -> bool {
        let Some(last) = &self.last_fix else {
            return true;
        };
        if fix.timestamp_ms < last.timestamp_ms {
            return false;
        }

        let moved = distance_meters(&last.coordinate, &fix.coordinate);
        let elapsed = fix.timestamp_ms - last.timestamp_ms;
        moved >= self.config.min_distance_m || elapsed >= self.config.min_interval_ms
    }
}
