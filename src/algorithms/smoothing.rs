use nalgebra::{Vector2, Vector3};

use crate::algorithms::geo_math::heading_degrees;

/// Critically damped spring toward a moving target
///
/// Reaches the target without overshoot; `smoothing_time_s` is roughly
/// the time to cover most of the remaining distance.
#[derive(Debug, Clone)]
pub struct SmoothDamp {
    pub smoothing_time_s: f32,
    current: Vector3<f32>,
    velocity: Vector3<f32>,
    initialized: bool,
}

impl SmoothDamp {
    pub fn new(smoothing_time_s: f32) -> Self {
        Self {
            smoothing_time_s: smoothing_time_s.max(1e-4),
            current: Vector3::zeros(),
            velocity: Vector3::zeros(),
            initialized: false,
        }
    }

    /// Jump straight to a value and drop any residual velocity
    pub fn snap_to(&mut self, value: Vector3<f32>) {
        self.current = value;
        self.velocity = Vector3::zeros();
        self.initialized = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn current(&self) -> Vector3<f32> {
        self.current
    }

    /// Step toward `target` by `dt` seconds
    pub fn advance(&mut self, target: Vector3<f32>, dt: f32) -> Vector3<f32> {
        if !self.initialized {
            self.snap_to(target);
            return self.current;
        }
        if dt <= 0.0 {
            return self.current;
        }

        let omega = 2.0 / self.smoothing_time_s;
        let x = omega * dt;
        let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

        let original = self.current;
        let change = original - target;
        let temp = (self.velocity + change * omega) * dt;
        self.velocity = (self.velocity - temp * omega) * decay;
        let mut output = target + (change + temp) * decay;

        // Clamp if the step crossed the target
        if (target - original).dot(&(output - target)) > 0.0 {
            output = target;
            self.velocity = Vector3::zeros();
        }

        self.current = output;
        self.current
    }

    pub fn reset(&mut self) {
        self.current = Vector3::zeros();
        self.velocity = Vector3::zeros();
        self.initialized = false;
    }
}

/// Exponential smoothing of a compass angle on the unit circle
#[derive(Debug, Clone)]
pub struct AngleSmoother {
    /// Weight of each new sample (0-1, higher follows faster)
    pub alpha: f32,
    state: Option<Vector2<f32>>,
}

impl AngleSmoother {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(1e-3, 1.0),
            state: None,
        }
    }

    /// Fold in a new sample and return the smoothed angle in [0, 360)
    pub fn update(&mut self, degrees: f32) -> f32 {
        let rad = degrees.to_radians();
        let sample = Vector2::new(rad.cos(), rad.sin());

        let next = match self.state {
            Some(prev) => {
                let blended = prev * (1.0 - self.alpha) + sample * self.alpha;
                // Opposite samples can cancel out
                if blended.norm() < 1e-4 {
                    sample
                } else {
                    blended
                }
            }
            None => sample,
        };
        self.state = Some(next);

        Self::to_degrees(&next)
    }

    pub fn value(&self) -> Option<f32> {
        self.state.as_ref().map(Self::to_degrees)
    }

    pub fn reset(&mut self) {
        self.state = None;
    }

    fn to_degrees(v: &Vector2<f32>) -> f32 {
        heading_degrees(v.y.atan2(v.x).to_degrees() as f64)
    }
}
