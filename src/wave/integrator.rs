// PlayBuoy: Double Integrator

use core::f32::consts::PI;

/// Trapezoidal acceleration -> velocity -> displacement integrator.
///
/// Both integrals start at rest. The previous acceleration is taken as
/// zero before the first sample.
#[derive(Debug, Clone)]
pub struct TrapezoidIntegrator {
    dt: f32,
    prev_accel: f32,
    velocity: f32,
    displacement: f32,
}

impl TrapezoidIntegrator {
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            prev_accel: 0.0,
            velocity: 0.0,
            displacement: 0.0,
        }
    }

    /// Advance one sample and return the new displacement.
    pub fn process(&mut self, accel: f32) -> f32 {
        let prev_velocity = self.velocity;
        self.velocity += 0.5 * (self.prev_accel + accel) * self.dt;
        self.displacement += 0.5 * (prev_velocity + self.velocity) * self.dt;
        self.prev_accel = accel;
        self.displacement
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn displacement(&self) -> f32 {
        self.displacement
    }
}

/// |H| of one trapezoid stage at `freq_hz`: (dt/2)·cot(w/2).
pub fn trapezoid_gain(freq_hz: f32, sample_rate_hz: f32) -> f32 {
    let w = 2.0 * PI * freq_hz / sample_rate_hz;
    0.5 / sample_rate_hz / (w / 2.0).tan()
}
