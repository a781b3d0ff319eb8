// PlayBuoy: Attitude Filter

use nalgebra::{UnitQuaternion, Vector3};

/// Mahony complementary filter.
///
/// Integrates body rates and pulls the estimate toward the measured
/// gravity direction with a PI correction. The quaternion maps body to
/// earth frame, earth z up.
#[derive(Debug, Clone)]
pub struct MahonyFilter {
    kp: f32,
    ki: f32,
    orientation: UnitQuaternion<f32>,
    integral: Vector3<f32>,
}

impl MahonyFilter {
    pub fn new(kp: f32, ki: f32) -> Self {
        Self {
            kp,
            ki,
            orientation: UnitQuaternion::identity(),
            integral: Vector3::zeros(),
        }
    }

    /// One step with gyro in deg/s and specific force in any unit.
    pub fn update(&mut self, gyro_dps: &Vector3<f32>, accel: &Vector3<f32>, dt: f32) {
        let mut omega = gyro_dps.map(f32::to_radians);

        // Free fall or a dead sensor: gyro-only propagation
        if let Some(measured_up) = accel.try_normalize(1e-6) {
            let error = measured_up.cross(&self.up_in_body());
            if self.ki > 0.0 {
                self.integral += error * (self.ki * dt);
            }
            omega += error * self.kp + self.integral;
        }

        self.orientation *= UnitQuaternion::from_scaled_axis(omega * dt);
    }

    /// Earth-frame up expressed in body coordinates.
    pub fn up_in_body(&self) -> Vector3<f32> {
        self.orientation.inverse_transform_vector(&Vector3::z())
    }

    /// (roll, pitch, yaw) in degrees.
    pub fn euler_deg(&self) -> (f32, f32, f32) {
        let (roll, pitch, yaw) = self.orientation.euler_angles();
        (roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::STANDARD_GRAVITY;
    use approx::assert_abs_diff_eq;

    const DT: f32 = 0.1;

    #[test]
    fn level_and_still_stays_level() {
        let mut filter = MahonyFilter::new(1.0, 0.0);
        let rest = Vector3::new(0.0, 0.0, STANDARD_GRAVITY);
        for _ in 0..600 {
            filter.update(&Vector3::zeros(), &rest, DT);
        }
        let (roll, pitch, yaw) = filter.euler_deg();
        assert_abs_diff_eq!(roll, 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(pitch, 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(yaw, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn converges_to_a_static_tilt() {
        let mut filter = MahonyFilter::new(1.0, 0.0);
        let tilt = 10.0_f32.to_radians();
        let accel = Vector3::new(0.0, tilt.sin(), tilt.cos()) * STANDARD_GRAVITY;
        for _ in 0..600 {
            filter.update(&Vector3::zeros(), &accel, DT);
        }
        let angle = filter.up_in_body().angle(&accel);
        assert!(angle.to_degrees() < 0.5, "residual {}°", angle.to_degrees());
    }

    #[test]
    fn integrates_yaw_rate() {
        let mut filter = MahonyFilter::new(1.0, 0.0);
        let rest = Vector3::new(0.0, 0.0, STANDARD_GRAVITY);
        let yaw_rate = Vector3::new(0.0, 0.0, 90.0);
        for _ in 0..10 {
            filter.update(&yaw_rate, &rest, DT);
        }
        let (_, _, yaw) = filter.euler_deg();
        assert_abs_diff_eq!(yaw, 90.0, epsilon = 0.1);
    }

    #[test]
    fn integral_term_cancels_gyro_bias() {
        let mut filter = MahonyFilter::new(1.0, 0.2);
        let rest = Vector3::new(0.0, 0.0, STANDARD_GRAVITY);
        let bias = Vector3::new(2.0, -1.0, 0.0);
        for _ in 0..3000 {
            filter.update(&bias, &rest, DT);
        }
        let (roll, pitch, _) = filter.euler_deg();
        assert!(roll.abs() < 0.5 && pitch.abs() < 0.5, "roll {} pitch {}", roll, pitch);
    }

    #[test]
    fn zero_accel_falls_back_to_gyro() {
        let mut filter = MahonyFilter::new(1.0, 0.0);
        filter.update(&Vector3::new(0.0, 0.0, 45.0), &Vector3::zeros(), 1.0);
        let (_, _, yaw) = filter.euler_deg();
        assert_abs_diff_eq!(yaw, 45.0, epsilon = 1e-3);
    }
}
