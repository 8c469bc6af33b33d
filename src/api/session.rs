//! Per-AR-session orchestration
//!
//! [`HuntSession`] owns the sensor sources, the shared compass reference,
//! the tracking watchdog and the active coin set. The host drives it with
//! one [`tick`](HuntSession::tick) per rendered frame; nothing in here
//! blocks or reads the wall clock.

use tracing::{debug, error, info, warn};

use crate::api::types::{CoinRenderState, FrameInput, SessionStatus};
use crate::coins::lifecycle::{CoinEvent, CoinLifecycleManager, CollectOutcome};
use crate::core::{CoinTarget, LocationFix, TrackingQuality};
use crate::hardware::acquisition::{AcquisitionRetry, AcquisitionStatus};
use crate::hardware::error::{SensorError, SensorResult};
use crate::hardware::location::{FixSink, LocationSource};
use crate::processing::alignment::CompassAlignment;
use crate::processing::fallback::{TrackingMode, TrackingMonitor};
use crate::processing::heading::HeadingSource;
use crate::utils::config::{ConfigError, HuntConfig};
use crate::validation::data::validate_point;

pub struct HuntSession {
    config: HuntConfig,
    location: LocationSource,
    heading: HeadingSource,
    alignment: CompassAlignment,
    monitor: TrackingMonitor,
    gps_retry: AcquisitionRetry,
    compass_retry: AcquisitionRetry,
    coins: CoinLifecycleManager,
    targets: Vec<CoinTarget>,
    targets_dirty: bool,
    /// Tracking came up but no heading was available to capture yet
    capture_pending: bool,
}

impl HuntSession {
    pub fn new(config: HuntConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let alignment = CompassAlignment::new();
        let coins = CoinLifecycleManager::new(
            config.lifecycle.clone(),
            config.collection.clone(),
            config.reconciler.clone(),
            config.display.clone(),
            alignment.clone(),
        );

        Ok(Self {
            location: LocationSource::new(config.location.clone()),
            heading: HeadingSource::new(config.heading.clone()),
            monitor: TrackingMonitor::new(config.fallback.clone()),
            gps_retry: AcquisitionRetry::new("location", config.acquisition.clone()),
            compass_retry: AcquisitionRetry::new("compass", config.acquisition.clone()),
            alignment,
            coins,
            targets: Vec::new(),
            targets_dirty: false,
            capture_pending: false,
            config,
        })
    }

    pub fn config(&self) -> &HuntConfig {
        &self.config
    }

    /// Begin accepting location fixes
    pub fn start(&mut self) -> SensorResult<()> {
        self.location.start()
    }

    pub fn stop(&mut self) {
        self.location.stop();
    }

    /// Handle for the platform geolocation callback
    pub fn location_sink(&self) -> FixSink {
        self.location.sink()
    }

    /// Shared compass reference, e.g. for a debug overlay
    pub fn alignment(&self) -> &CompassAlignment {
        &self.alignment
    }

    pub fn coins(&self) -> &CoinLifecycleManager {
        &self.coins
    }

    pub fn coins_mut(&mut self) -> &mut CoinLifecycleManager {
        &mut self.coins
    }

    /// Replace the hunt's coin list; invalid coordinates are skipped
    pub fn set_targets(&mut self, targets: Vec<CoinTarget>) {
        self.targets = targets
            .into_iter()
            .filter(|t| match validate_point(&t.coordinate) {
                Ok(()) => true,
                Err(e) => {
                    error!(coin = %t.id, kind = e.kind(), error = %e, "skipping coin with invalid coordinate");
                    false
                }
            })
            .collect();
        self.targets_dirty = true;
    }

    /// React to the native tracker's quality signal
    ///
    /// The first `Tracking` report of a session captures the compass
    /// reference. Without a heading the capture is retried on later ticks.
    pub fn on_tracking_state(&mut self, quality: TrackingQuality) {
        if quality != TrackingQuality::Tracking || self.alignment.is_captured() || self.capture_pending {
            return;
        }
        match self.heading.smoothed_degrees() {
            Some(heading) => {
                self.alignment.capture_reference(Some(heading));
                self.compass_retry.mark_acquired();
            }
            None => {
                debug!("tracking established before compass, deferring capture");
                self.capture_pending = true;
            }
        }
    }

    /// User-triggered compass recalibration
    pub fn recapture_compass(&mut self) {
        self.alignment.recapture(self.heading.smoothed_degrees());
        self.coins.reset_positioners();
    }

    /// AR session restarted: new world origin, new reference, native mode
    pub fn restart(&mut self) {
        info!("AR session restart");
        self.alignment.reset();
        self.monitor.reset();
        self.heading.reset();
        self.compass_retry.reset();
        self.capture_pending = false;
        self.coins.restore_native();
    }

    /// Advance one rendered frame
    pub fn tick(&mut self, input: FrameInput) -> Vec<CoinRenderState> {
        let dt = input.dt.max(0.0);

        self.poll_location(dt);
        self.heading.update(&input.heading_readings);
        self.on_tracking_state(input.tracking_quality);
        self.advance_capture(dt);

        let mode = self.monitor.update(input.camera_pose.as_ref(), input.tracking_quality, dt);
        if mode == TrackingMode::Fallback && !self.coins.is_fallback() {
            self.coins.degrade_all();
        }

        let fix = self.location.last_fix().copied();
        if self.targets_dirty {
            let player = fix.map(|f| f.coordinate);
            self.coins.sync_targets(&self.targets, player.as_ref());
            self.targets_dirty = false;
        }

        self.coins.update(fix.as_ref(), self.heading.smoothed_degrees(), dt);
        self.render_states()
    }

    /// Try to collect a coin with the latest accepted fix
    pub fn try_collect(&mut self, id: &str) -> CollectOutcome {
        let fix = self.location.last_fix().copied();
        self.coins.try_collect(id, fix.as_ref())
    }

    pub fn drain_events(&mut self) -> Vec<CoinEvent> {
        self.coins.drain_events()
    }

    pub fn last_fix(&self) -> Option<&LocationFix> {
        self.location.last_fix()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            using_fallback: self.coins.is_fallback(),
            compass_captured: self.alignment.is_captured(),
            compass_degraded: self.alignment.is_degraded(),
            gps_acquired: self.location.last_fix().is_some(),
            gps_exhausted: self.gps_retry.is_exhausted(),
            rejected_fixes: self.location.stats().rejected,
            active_coins: self.coins.active_count(),
        }
    }

    fn poll_location(&mut self, dt: f32) {
        match self.location.poll() {
            Ok(Some(_)) => {
                self.gps_retry.mark_acquired();
                // New position may bring coins into or out of range
                self.targets_dirty = true;
            }
            Ok(None) => match self.gps_retry.tick(dt) {
                AcquisitionStatus::Retry { attempt } => debug!(attempt, "still waiting for a GPS fix"),
                AcquisitionStatus::Exhausted if !self.monitor.is_fallback() => self.enter_degraded_mode("location"),
                _ => {}
            },
            Err(SensorError::NotStarted { .. }) => {}
            Err(e) => warn!(error = %e, "location poll failed"),
        }
    }

    fn advance_capture(&mut self, dt: f32) {
        if !self.capture_pending {
            return;
        }
        if self.alignment.is_captured() {
            self.capture_pending = false;
            return;
        }
        if let Some(heading) = self.heading.smoothed_degrees() {
            self.alignment.capture_reference(Some(heading));
            self.compass_retry.mark_acquired();
            self.capture_pending = false;
        } else if self.compass_retry.tick(dt) == AcquisitionStatus::Exhausted {
            self.alignment.capture_reference(None);
            self.capture_pending = false;
            self.enter_degraded_mode("compass");
        }
    }

    /// Initial acquisition gave up: reference stays at 0 and coins switch
    /// to gyroscope placement for the rest of the session
    fn enter_degraded_mode(&mut self, sensor: &'static str) {
        warn!(sensor, "acquisition never succeeded, continuing degraded");
        self.monitor.force_fallback(sensor);
        self.coins.degrade_all();
    }

    fn render_states(&self) -> Vec<CoinRenderState> {
        self.coins
            .iter()
            .map(|coin| {
                let placement = coin.placement();
                CoinRenderState {
                    id: coin.id().to_string(),
                    state: coin.display_state(),
                    offset: placement.map(|p| p.offset),
                    frame: placement.map(|p| p.frame),
                    should_render: coin.should_render(),
                    distance_m: coin.distance_m(),
                    locked: placement.is_some_and(|p| p.locked),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::geo_math::{destination_point, distance_meters};
    use crate::core::{CameraPose, CoinDisplayState, GeoPoint};
    use crate::hardware::mock::SimulatedGps;
    use crate::processing::heading::HeadingReadings;
    use crate::processing::mode::PlacementFrame;
    use nalgebra::Vector3;

    const DT: f32 = 1.0 / 30.0;
    const START: GeoPoint = GeoPoint::new(52.52, 13.405);

    fn session() -> HuntSession {
        let mut session = HuntSession::new(HuntConfig::default()).unwrap();
        session.start().unwrap();
        session
    }

    fn frame(pose: Vector3<f32>, heading: f32) -> FrameInput {
        FrameInput::new(DT, TrackingQuality::Tracking)
            .with_pose(CameraPose::at(pose))
            .with_heading(HeadingReadings::attitude(heading))
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = HuntConfig::default();
        config.reconciler.unlock_distance_m = 1.0;
        assert!(HuntSession::new(config).is_err());
    }

    #[test]
    fn test_compass_captured_on_first_tracking_frame() {
        let mut s = session();
        s.tick(FrameInput::new(DT, TrackingQuality::Initializing).with_heading(HeadingReadings::attitude(40.0)));
        assert!(!s.status().compass_captured);

        s.tick(frame(Vector3::zeros(), 40.0));
        assert!(s.alignment().is_captured());
        assert!((s.alignment().reference() - 40.0).abs() < 1e-3);

        // Later headings don't move the reference
        s.tick(frame(Vector3::new(0.1, 0.0, 0.0), 200.0));
        assert!((s.alignment().reference() - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_missing_compass_degrades_after_retries() {
        let mut s = session();
        s.location_sink().push(LocationFix::new(START, 5.0, 1_000)).unwrap();
        let mut x = 0.0;
        for _ in 0..600 {
            x += 0.01;
            s.tick(FrameInput::new(DT, TrackingQuality::Tracking).with_pose(CameraPose::at(Vector3::new(x, 0.0, 0.0))));
        }
        let status = s.status();
        assert!(status.gps_acquired);
        assert!(!status.gps_exhausted);
        assert!(status.compass_captured);
        assert!(status.compass_degraded);
        assert_eq!(s.alignment().reference(), 0.0);
        assert!(status.using_fallback);
    }

    #[test]
    fn test_missing_gps_degrades_after_retries() {
        let mut s = session();
        let coin = CoinTarget::new("east", destination_point(&START, 90.0, 12.0), 0.5);
        s.set_targets(vec![coin]);

        let mut x = 0.0;
        for _ in 0..900 {
            x += 0.01;
            s.tick(frame(Vector3::new(x, 1.5, 0.0), 30.0));
        }
        let status = s.status();
        assert!(status.gps_exhausted);
        assert!(!status.compass_degraded);
        assert!(status.using_fallback);

        // A fix arriving late spawns the coin straight into heading-relative placement
        s.location_sink().push(LocationFix::new(START, 5.0, 1_000)).unwrap();
        let mut states = Vec::new();
        for _ in 0..40 {
            x += 0.01;
            states = s.tick(frame(Vector3::new(x, 1.5, 0.0), 90.0));
        }
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].frame, Some(PlacementFrame::Camera));
        assert!(s.coins().get("east").unwrap().is_fallback());
    }

    #[test]
    fn test_fallback_hides_coin_inside_collect_range() {
        let mut s = session();
        let coin = CoinTarget::new("near", destination_point(&START, 0.0, 3.0), 0.5);
        s.set_targets(vec![coin]);
        s.location_sink().push(LocationFix::new(START, 5.0, 1_000)).unwrap();

        let mut states = Vec::new();
        for _ in 0..150 {
            states = s.tick(frame(Vector3::new(0.0, 1.5, 0.0), 0.0));
        }

        assert!(s.status().using_fallback);
        let coin = &states[0];
        assert_eq!(coin.state, CoinDisplayState::Collectible);
        assert_eq!(coin.frame, Some(PlacementFrame::Camera));
        assert!(!coin.should_render);
        assert!(!s.coins().get("near").unwrap().should_render());

        assert_eq!(s.try_collect("near"), CollectOutcome::Success(0.5));
    }

    #[test]
    fn test_frozen_camera_switches_to_heading_relative_placement() {
        let mut s = session();
        let coin = CoinTarget::new("north", destination_point(&START, 0.0, 15.0), 0.5);
        s.set_targets(vec![coin]);
        s.location_sink().push(LocationFix::new(START, 5.0, 1_000)).unwrap();

        let mut at_two_seconds = None;
        for i in 0..120 {
            let states = s.tick(frame(Vector3::new(0.0, 1.5, 0.0), 0.0));
            if i == 60 {
                at_two_seconds = states.first().cloned();
            }
        }

        let early = at_two_seconds.unwrap();
        assert_eq!(early.state, CoinDisplayState::Visible);
        assert_eq!(early.frame, Some(PlacementFrame::ArWorld));

        assert!(s.status().using_fallback);
        let states = s.tick(frame(Vector3::new(0.0, 1.5, 0.0), 0.0));
        let coin = &states[0];
        assert_eq!(coin.frame, Some(PlacementFrame::Camera));
        let offset = coin.offset.unwrap();
        assert!(offset.x.abs() < 0.1 && (offset.z - 15.0).abs() < 0.1);

        // Turning to face east swings the coin to the left
        let mut states = Vec::new();
        for _ in 0..60 {
            states = s.tick(frame(Vector3::new(0.0, 1.5, 0.0), 90.0));
        }
        let offset = states[0].offset.unwrap();
        assert!((offset.x + 15.0).abs() < 0.5 && offset.z.abs() < 0.5);

        // Tracking recovering doesn't bring native mode back
        for i in 0..60 {
            s.tick(frame(Vector3::new(i as f32 * 0.05, 1.5, 0.0), 90.0));
        }
        assert!(s.status().using_fallback);

        s.restart();
        assert!(!s.status().using_fallback);
        assert!(!s.status().compass_captured);
    }

    #[test]
    fn test_walk_up_and_collect() {
        let mut s = session();
        let coin_at = destination_point(&START, 45.0, 40.0);
        s.set_targets(vec![
            CoinTarget::new("target", coin_at, 0.75),
            CoinTarget::new("bad", GeoPoint::new(f64::NAN, 0.0), 1.0),
        ]);

        let stop = destination_point(&coin_at, 225.0, 2.0);
        let mut gps = SimulatedGps::new(3).with_interval(2000);
        let sink = s.location_sink();
        let mut x = 0.0;
        let mut tick = |s: &mut HuntSession, frames: usize| {
            let mut out = Vec::new();
            for _ in 0..frames {
                x += 0.01;
                out = s.tick(frame(Vector3::new(x, 1.5, 0.0), 45.0));
            }
            out
        };

        for fix in gps.walk(&START, &stop, 3.0) {
            sink.push(fix).unwrap();
            tick(&mut s, 15);
        }
        let states = tick(&mut s, 30);

        assert_eq!(states.len(), 1);
        let coin = &states[0];
        assert_eq!(coin.state, CoinDisplayState::Collectible);
        assert!(coin.locked);
        assert!(coin.distance_m.unwrap() < 3.0);
        assert!(s.status().gps_acquired);
        assert!(!s.status().using_fallback);

        assert_eq!(s.try_collect("target"), CollectOutcome::Success(0.75));
        assert_eq!(s.try_collect("target"), CollectOutcome::OutOfRange);
        tick(&mut s, 40);

        let events = s.drain_events();
        assert_eq!(
            events,
            vec![
                CoinEvent::Spawned { id: "target".into() },
                CoinEvent::Collected { id: "target".into(), value: 0.75 },
                CoinEvent::Despawned { id: "target".into() },
            ]
        );
        assert_eq!(s.status().active_coins, 0);
        assert!(distance_meters(&s.last_fix().unwrap().coordinate, &coin_at) < 3.0);
    }

    #[test]
    fn test_rejected_fixes_are_counted() {
        let mut s = session();
        let sink = s.location_sink();
        sink.push(LocationFix::new(GeoPoint::new(120.0, 0.0), 5.0, 10)).unwrap();
        sink.push(LocationFix::new(START, f32::NAN, 20)).unwrap();
        s.tick(frame(Vector3::zeros(), 0.0));

        let status = s.status();
        assert_eq!(status.rejected_fixes, 2);
        assert!(!status.gps_acquired);
    }
}
