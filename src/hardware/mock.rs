//! Simulated GPS feed for testing and the demo binary

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::algorithms::geo_math::{bearing_degrees, destination_point, distance_meters};
use crate::core::{GeoPoint, LocationFix};

/// Deterministic jittered GPS generator
pub struct SimulatedGps {
    rng: StdRng,
    jitter_radius_m: f64,
    accuracy_m: f32,
    interval_ms: u64,
    clock_ms: u64,
}

impl SimulatedGps {
    /// Create a generator with a fixed seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            jitter_radius_m: 0.0,
            accuracy_m: 5.0,
            interval_ms: 1000,
            clock_ms: 0,
        }
    }

    /// Scatter fixes uniformly over a disc of this radius
    pub fn with_jitter(mut self, radius_m: f64) -> Self {
        self.jitter_radius_m = radius_m.max(0.0);
        self
    }

    /// Reported horizontal accuracy
    pub fn with_accuracy(mut self, accuracy_m: f32) -> Self {
        self.accuracy_m = accuracy_m;
        self
    }

    /// Time between consecutive fixes
    pub fn with_interval(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    /// One noisy fix around the true position
    pub fn fix_near(&mut self, truth: &GeoPoint) -> LocationFix {
        let coordinate = if self.jitter_radius_m > 0.0 {
            let bearing: f32 = self.rng.gen_range(0.0..360.0);
            let r = self.jitter_radius_m * self.rng.gen::<f64>().sqrt();
            destination_point(truth, bearing, r)
        } else {
            *truth
        };

        self.clock_ms += self.interval_ms;
        LocationFix::new(coordinate, self.accuracy_m, self.clock_ms)
    }

    /// Fixes along the straight line `from` -> `to`, one every `step_m`
    pub fn walk(&mut self, from: &GeoPoint, to: &GeoPoint, step_m: f64) -> Vec<LocationFix> {
        let total = distance_meters(from, to);
        let bearing = bearing_degrees(from, to);
        // Tolerate round-off so an exact multiple doesn't add a step
        let steps = (total / step_m.max(0.01) - 1e-6).ceil().max(0.0) as usize;

        (0..=steps)
            .map(|i| {
                let along = (i as f64 * step_m).min(total);
                let truth = destination_point(from, bearing, along);
                self.fix_near(&truth)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_stays_inside_radius() {
        let center = GeoPoint::new(35.0, 139.0);
        let mut gps = SimulatedGps::new(7).with_jitter(2.0);
        for _ in 0..200 {
            let fix = gps.fix_near(&center);
            assert!(distance_meters(&center, &fix.coordinate) <= 2.0 + 1e-6);
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let center = GeoPoint::new(35.0, 139.0);
        let mut a = SimulatedGps::new(42).with_jitter(3.0);
        let mut b = SimulatedGps::new(42).with_jitter(3.0);
        for _ in 0..10 {
            assert_eq!(a.fix_near(&center), b.fix_near(&center));
        }
    }

    #[test]
    fn test_walk_reaches_destination() {
        let from = GeoPoint::new(0.0, 0.0);
        let to = destination_point(&from, 45.0, 30.0);
        let mut gps = SimulatedGps::new(1).with_interval(500);
        let fixes = gps.walk(&from, &to, 5.0);

        assert_eq!(fixes.len(), 7);
        let last = fixes.last().unwrap();
        assert!(distance_meters(&last.coordinate, &to) < 0.01);
        assert_eq!(last.timestamp_ms, 3500);
    }
}
