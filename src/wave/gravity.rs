// PlayBuoy: Gravity Tracker

use nalgebra::Vector3;

use super::filter::SinglePoleLowPass;
use crate::config::STANDARD_GRAVITY;

/// Slow per-axis low-pass over raw specific force.
///
/// Follows the body-frame projection of gravity as the buoy's mean attitude
/// drifts, while the much faster wave accelerations average out.
#[derive(Debug, Clone)]
pub struct GravityTracker {
    alpha: f32,
    estimate: Vector3<f32>,
}

impl GravityTracker {
    pub fn new(cutoff_hz: f32, sample_rate_hz: f32) -> Self {
        Self {
            alpha: SinglePoleLowPass::new(cutoff_hz, sample_rate_hz).alpha(),
            estimate: Vector3::new(0.0, 0.0, STANDARD_GRAVITY),
        }
    }

    pub fn update(&mut self, accel: &Vector3<f32>) -> Vector3<f32> {
        self.estimate = self.estimate * (1.0 - self.alpha) + accel * self.alpha;
        self.estimate
    }

    pub fn estimate(&self) -> Vector3<f32> {
        self.estimate
    }
}
