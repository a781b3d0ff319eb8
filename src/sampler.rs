// PlayBuoy: Inertial Sampler
//
// One read per tick: raw codes -> physical units -> plausibility check.
// Bus errors and implausible readings both come back as `None`; the caller
// skips the filter update for that tick.

use crate::config::STANDARD_GRAVITY;
use crate::drivers::imu::{InertialSensor, SensorError, SensorScale};
use crate::events::InertialSample;

pub struct InertialSampler<'a, S: InertialSensor> {
    sensor: &'a mut S,
    scale: SensorScale,
    tolerance: f32,
    read_failures: u32,
    rejected: u32,
}

impl<'a, S: InertialSensor> InertialSampler<'a, S> {
    pub fn new(sensor: &'a mut S, tolerance: f32) -> Self {
        Self {
            sensor,
            scale: SensorScale::default(),
            tolerance,
            read_failures: 0,
            rejected: 0,
        }
    }

    pub fn init(&mut self) -> Result<(), SensorError> {
        self.sensor.init()
    }

    pub fn sample(&mut self, timestamp_ms: u64) -> Option<InertialSample> {
        let raw = match self.sensor.read_raw() {
            Ok(raw) => raw,
            Err(e) => {
                self.read_failures += 1;
                log::debug!("IMU read failed at {} ms: {}", timestamp_ms, e);
                return None;
            }
        };

        let accel = self.scale.accel(raw.accel);
        let deviation = (accel.norm() - STANDARD_GRAVITY).abs();
        if deviation > self.tolerance {
            self.rejected += 1;
            log::debug!("Discarding tick at {} ms, |a| off g by {:.2} m/s²", timestamp_ms, deviation);
            return None;
        }

        Some(InertialSample::new(accel, self.scale.gyro(raw.gyro), timestamp_ms))
    }

    /// Ticks lost to bus errors.
    pub fn read_failures(&self) -> u32 {
        self.read_failures
    }

    /// Ticks discarded by the magnitude check.
    pub fn rejected(&self) -> u32 {
        self.rejected
    }
}
