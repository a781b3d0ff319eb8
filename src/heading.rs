// PlayBuoy: Compass Heading & Wave Direction
//
// Heading is read sparsely during the sampling window (every Nth tick) and
// only feeds the direction label. It never touches the heave computation.

use nalgebra::Vector3;

use crate::config::{MAG_CALIBRATION_MIN_SPAN_UT, MAG_OFFSET_LIMIT_UT};
use crate::drivers::imu::SensorError;

const DIRECTIONS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

/// Capability of a compass-like source. Returns NaN when no heading is available.
pub trait HeadingSource {
    fn heading_deg(&mut self) -> f32;
}

/// Capability of a 3-axis magnetometer, field in µT in the accelerometer frame.
pub trait Magnetometer {
    fn read_field(&mut self) -> Result<Vector3<f32>, SensorError>;
}

// ---------------------------------------------------------------------------
// Hard-iron calibration
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagCalibration {
    pub offset: Vector3<f32>,
    pub valid: bool,
}

impl Default for MagCalibration {
    fn default() -> Self {
        Self {
            offset: Vector3::zeros(),
            valid: false,
        }
    }
}

impl MagCalibration {
    /// Stored form: x, y, z offsets as little-endian f32.
    pub const ENCODED_LEN: usize = 12;

    pub fn to_bytes(&self) -> [u8; Self::ENCODED_LEN] {
        let mut bytes = [0u8; Self::ENCODED_LEN];
        for (chunk, v) in bytes.chunks_exact_mut(4).zip(self.offset.iter()) {
            chunk.copy_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    /// `None` for a wrong length or an offset no real hard iron produces.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::ENCODED_LEN {
            return None;
        }
        let mut offset = Vector3::zeros();
        for (v, chunk) in offset.iter_mut().zip(bytes.chunks_exact(4)) {
            *v = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        if !offset.iter().all(|v| v.is_finite() && v.abs() <= MAG_OFFSET_LIMIT_UT) {
            return None;
        }
        Some(Self {
            offset,
            valid: true,
        })
    }

    /// Remove the hard-iron offset. Uncalibrated fields pass through.
    pub fn apply(&self, field: Vector3<f32>) -> Vector3<f32> {
        if self.valid {
            field - self.offset
        } else {
            field
        }
    }
}

/// Collects per-axis extremes while the buoy is rotated by hand.
#[derive(Debug, Clone)]
pub struct MagCalibrator {
    min: Vector3<f32>,
    max: Vector3<f32>,
    samples: u32,
}

impl Default for MagCalibrator {
    fn default() -> Self {
        Self::new()
    }
}

impl MagCalibrator {
    pub fn new() -> Self {
        Self {
            min: Vector3::repeat(f32::INFINITY),
            max: Vector3::repeat(f32::NEG_INFINITY),
            samples: 0,
        }
    }

    pub fn observe(&mut self, field: Vector3<f32>) {
        if !field.iter().all(|v| v.is_finite()) {
            return;
        }
        self.min = self.min.inf(&field);
        self.max = self.max.sup(&field);
        self.samples += 1;
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Offset is the midpoint of each axis range.
    ///
    /// `None` if nothing was observed, or if the buoy did not turn far enough
    /// to span the horizontal axes.
    pub fn finish(self) -> Option<MagCalibration> {
        if self.samples == 0 {
            return None;
        }
        let span = self.max - self.min;
        if span.x < MAG_CALIBRATION_MIN_SPAN_UT || span.y < MAG_CALIBRATION_MIN_SPAN_UT {
            log::warn!(
                "Magnetometer calibration rejected, horizontal span {:.1} / {:.1} µT",
                span.x,
                span.y
            );
            return None;
        }
        Some(MagCalibration {
            offset: (self.max + self.min) * 0.5,
            valid: true,
        })
    }
}

/// Heading in degrees [0, 360) from a body-frame field, assuming a level sensor.
pub fn heading_degrees(field: Vector3<f32>, calibration: &MagCalibration) -> f32 {
    let field = calibration.apply(field);
    let heading = field.y.atan2(field.x).to_degrees();
    if !heading.is_finite() {
        return f32::NAN;
    }
    heading.rem_euclid(360.0)
}

// ---------------------------------------------------------------------------
// Compass
// ---------------------------------------------------------------------------

const HEADING_READ_ATTEMPTS: usize = 3;

/// Magnetometer plus hard-iron correction, optionally learning a new one.
pub struct Compass<M: Magnetometer> {
    magnetometer: M,
    calibration: MagCalibration,
    calibrator: Option<MagCalibrator>,
}

impl<M: Magnetometer> Compass<M> {
    pub fn new(magnetometer: M, calibration: MagCalibration) -> Self {
        Self {
            magnetometer,
            calibration,
            calibrator: None,
        }
    }

    pub fn calibration(&self) -> &MagCalibration {
        &self.calibration
    }

    pub fn magnetometer(&self) -> &M {
        &self.magnetometer
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibrator.is_some()
    }

    /// Every field read from now on feeds the hard-iron extremes.
    pub fn start_calibration(&mut self) {
        log::info!("Magnetometer calibration started");
        self.calibrator = Some(MagCalibrator::new());
    }

    /// Adopts the new calibration if the observed rotation was sufficient.
    pub fn finish_calibration(&mut self) -> Option<MagCalibration> {
        let calibrator = self.calibrator.take()?;
        let samples = calibrator.samples();
        let calibration = calibrator.finish()?;
        self.calibration = calibration;
        log::info!(
            "Magnetometer calibration from {} fields: offset {:.1} / {:.1} / {:.1} µT",
            samples,
            calibration.offset.x,
            calibration.offset.y,
            calibration.offset.z
        );
        Some(calibration)
    }
}

impl<M: Magnetometer> HeadingSource for Compass<M> {
    fn heading_deg(&mut self) -> f32 {
        for _ in 0..HEADING_READ_ATTEMPTS {
            let field = match self.magnetometer.read_field() {
                Ok(field) => field,
                Err(e) => {
                    log::debug!("Magnetometer read failed: {}", e);
                    continue;
                }
            };
            if let Some(calibrator) = self.calibrator.as_mut() {
                calibrator.observe(field);
            }
            let heading = heading_degrees(field, &self.calibration);
            if !heading.is_nan() {
                return heading;
            }
        }
        f32::NAN
    }
}

// ---------------------------------------------------------------------------
// Window average
// ---------------------------------------------------------------------------

/// Circular mean of heading samples; 350° and 10° average to 0°, not 180°.
#[derive(Debug, Clone, Default)]
pub struct HeadingAccumulator {
    sum_sin: f32,
    sum_cos: f32,
    count: u32,
}

impl HeadingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// NaN readings are ignored.
    pub fn add(&mut self, heading_deg: f32) {
        if !heading_deg.is_finite() {
            return;
        }
        let (sin, cos) = heading_deg.to_radians().sin_cos();
        self.sum_sin += sin;
        self.sum_cos += cos;
        self.count += 1;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// `None` without samples, or when the samples cancel out.
    pub fn mean_deg(&self) -> Option<f32> {
        if self.count == 0 {
            return None;
        }
        let resultant = self.sum_sin.hypot(self.sum_cos) / self.count as f32;
        if resultant < 1e-3 {
            return None;
        }
        Some(self.sum_sin.atan2(self.sum_cos).to_degrees().rem_euclid(360.0))
    }
}

/// Eight-point compass label, "N/A" without a heading.
pub fn direction_label(heading_deg: Option<f32>) -> &'static str {
    match heading_deg {
        Some(h) if h.is_finite() => {
            let sector = ((h.rem_euclid(360.0) + 22.5) / 45.0).floor() as usize % 8;
            DIRECTIONS[sector]
        }
        _ => "N/A",
    }
}
