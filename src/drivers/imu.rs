// PlayBuoy: Inertial Sensor Interface
//
// The wave pipeline only sees this trait. The MPU9250 implements it on the
// device; `sim::SyntheticSea` implements it on the host.

use nalgebra::Vector3;
use thiserror::Error;

use crate::config::*;
use crate::events::RawSample;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("I2C transfer failed (esp_err_t {0})")]
    Bus(i32),
    #[error("unexpected WHO_AM_I 0x{0:02x}")]
    WrongDevice(u8),
    #[error("sensor read before init")]
    NotInitialised,
    #[error("sensor unavailable")]
    Unavailable,
}

/// Capability of a 6-axis motion sensor.
pub trait InertialSensor {
    /// Wake and configure the device. Called once per sampling window.
    fn init(&mut self) -> Result<(), SensorError>;

    /// Burst-read the six raw axis codes.
    fn read_raw(&mut self) -> Result<RawSample, SensorError>;
}

/// Fixed conversion from register codes to physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorScale {
    /// LSB per g.
    pub accel_lsb_per_g: f32,
    /// LSB per deg/s.
    pub gyro_lsb_per_dps: f32,
}

impl Default for SensorScale {
    fn default() -> Self {
        Self {
            accel_lsb_per_g: ACCEL_SCALE_8G,
            gyro_lsb_per_dps: GYRO_SCALE_500,
        }
    }
}

impl SensorScale {
    /// Accelerometer codes to m/s².
    pub fn accel(&self, raw: [i16; 3]) -> Vector3<f32> {
        let k = STANDARD_GRAVITY / self.accel_lsb_per_g;
        Vector3::new(raw[0] as f32 * k, raw[1] as f32 * k, raw[2] as f32 * k)
    }

    /// Gyroscope codes to deg/s.
    pub fn gyro(&self, raw: [i16; 3]) -> Vector3<f32> {
        Vector3::new(
            raw[0] as f32 / self.gyro_lsb_per_dps,
            raw[1] as f32 / self.gyro_lsb_per_dps,
            raw[2] as f32 / self.gyro_lsb_per_dps,
        )
    }

    /// Inverse of [`SensorScale::accel`], saturating at the i16 range.
    pub fn accel_code(&self, value: f32) -> i16 {
        let code = (value / STANDARD_GRAVITY * self.accel_lsb_per_g).round();
        code.clamp(i16::MIN as f32, i16::MAX as f32) as i16
    }

    /// Inverse of [`SensorScale::gyro`], saturating at the i16 range.
    pub fn gyro_code(&self, value: f32) -> i16 {
        let code = (value * self.gyro_lsb_per_dps).round();
        code.clamp(i16::MIN as f32, i16::MAX as f32) as i16
    }
}
