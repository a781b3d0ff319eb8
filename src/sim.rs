// PlayBuoy: Simulated Hardware
//
// Deterministic stand-ins for the IMU, compass, clock and watchdog. Used by
// the host build of the firmware binary and by the test suites.

use core::f32::consts::PI;

use anyhow::Context;
use nalgebra::Vector3;

use crate::config::STANDARD_GRAVITY;
use crate::drivers::imu::{InertialSensor, SensorError, SensorScale};
use crate::events::RawSample;
use crate::heading::{HeadingSource, Magnetometer};
use crate::tasks::wave::{Clock, Watchdog};

/// `esp_err_t` ESP_FAIL, reported for simulated bus dropouts.
const SIM_BUS_ERROR: i32 = -1;

// Mid-latitude Europe, µT
const EARTH_HORIZONTAL_UT: f32 = 20.0;
const EARTH_VERTICAL_UT: f32 = -44.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    /// Sinusoidal heave displacement `amplitude_m * sin(2πt / period_s)`.
    Swell { amplitude_m: f32, period_s: f32 },
    /// Gravity only.
    Still,
    /// All-zero register codes, as from a dead sensor.
    Zero,
}

impl Waveform {
    /// Vertical acceleration (m/s²) at time `t` seconds.
    pub fn heave_accel(&self, t: f32) -> f32 {
        match *self {
            Waveform::Swell {
                amplitude_m,
                period_s,
            } => {
                let w = 2.0 * PI / period_s;
                -amplitude_m * w * w * (w * t).sin()
            }
            Waveform::Still | Waveform::Zero => 0.0,
        }
    }
}

/// An [`InertialSensor`] riding a synthetic sea.
///
/// Each `read_raw` call advances one sample period.
#[derive(Debug, Clone)]
pub struct SyntheticSea {
    waveform: Waveform,
    sample_rate_hz: f32,
    scale: SensorScale,
    tilt_deg: f32,
    gyro_dps: Vector3<f32>,
    dropout_every: Option<u32>,
    fail_init: bool,
    initialised: bool,
    reads: u32,
}

impl SyntheticSea {
    pub fn new(waveform: Waveform, sample_rate_hz: f32) -> Self {
        Self {
            waveform,
            sample_rate_hz,
            scale: SensorScale::default(),
            tilt_deg: 0.0,
            gyro_dps: Vector3::zeros(),
            dropout_every: None,
            fail_init: false,
            initialised: false,
            reads: 0,
        }
    }

    /// Constant roll of the sensor frame about x.
    pub fn with_tilt_deg(mut self, tilt_deg: f32) -> Self {
        self.tilt_deg = tilt_deg;
        self
    }

    /// Constant body rate reported by the gyro.
    pub fn with_gyro_dps(mut self, gyro_dps: Vector3<f32>) -> Self {
        self.gyro_dps = gyro_dps;
        self
    }

    /// Every `n`th read fails with a bus error.
    pub fn with_dropout_every(mut self, n: u32) -> Self {
        self.dropout_every = Some(n.max(1));
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Number of `read_raw` calls so far.
    pub fn reads(&self) -> u32 {
        self.reads
    }
}

impl InertialSensor for SyntheticSea {
    fn init(&mut self) -> Result<(), SensorError> {
        if self.fail_init {
            return Err(SensorError::Unavailable);
        }
        self.initialised = true;
        Ok(())
    }

    fn read_raw(&mut self) -> Result<RawSample, SensorError> {
        if !self.initialised {
            return Err(SensorError::NotInitialised);
        }
        let t = self.reads as f32 / self.sample_rate_hz;
        self.reads += 1;

        if let Some(n) = self.dropout_every {
            if self.reads % n == 0 {
                return Err(SensorError::Bus(SIM_BUS_ERROR));
            }
        }
        if self.waveform == Waveform::Zero {
            return Ok(RawSample::default());
        }

        let up = STANDARD_GRAVITY + self.waveform.heave_accel(t);
        let (sin, cos) = self.tilt_deg.to_radians().sin_cos();
        let accel = [0.0, up * sin, up * cos];
        let gyro = self.gyro_dps;

        Ok(RawSample {
            accel: accel.map(|a| self.scale.accel_code(a)),
            gyro: [
                self.scale.gyro_code(gyro.x),
                self.scale.gyro_code(gyro.y),
                self.scale.gyro_code(gyro.z),
            ],
        })
    }
}

/// Virtual time that only moves when someone waits.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now_ms: u64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SimClock {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn delay_ms(&mut self, ms: u64) {
        self.now_ms += ms;
    }
}

#[derive(Debug, Clone, Default)]
pub struct CountingWatchdog {
    feeds: u32,
}

impl CountingWatchdog {
    pub fn feeds(&self) -> u32 {
        self.feeds
    }
}

impl Watchdog for CountingWatchdog {
    fn feed(&mut self) {
        self.feeds += 1;
    }
}

/// Compass stuck on one heading. NaN models a compass that never answers.
#[derive(Debug, Clone)]
pub struct FixedHeading {
    heading_deg: f32,
    reads: u32,
}

impl FixedHeading {
    pub fn new(heading_deg: f32) -> Self {
        Self {
            heading_deg,
            reads: 0,
        }
    }

    pub fn reads(&self) -> u32 {
        self.reads
    }
}

impl HeadingSource for FixedHeading {
    fn heading_deg(&mut self) -> f32 {
        self.reads += 1;
        self.heading_deg
    }
}

/// Inputs of one simulated wake cycle: `[battery_v] [amplitude_m] [period_s]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WakeScenario {
    pub battery_v: f32,
    pub amplitude_m: f32,
    pub period_s: f32,
}

impl Default for WakeScenario {
    fn default() -> Self {
        Self {
            battery_v: 3.85,
            amplitude_m: 0.15,
            period_s: 3.0,
        }
    }
}

impl WakeScenario {
    /// Positional values after the program name; missing ones keep their
    /// defaults. Arguments starting with `-` are not positional.
    pub fn from_args<I, A>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<str>,
    {
        let mut scenario = Self::default();
        let positional = args
            .into_iter()
            .skip(1)
            .filter(|arg| !arg.as_ref().starts_with('-'));
        let slots = [
            &mut scenario.battery_v,
            &mut scenario.amplitude_m,
            &mut scenario.period_s,
        ];
        for (index, (slot, arg)) in slots.into_iter().zip(positional).enumerate() {
            let arg = arg.as_ref();
            *slot = arg
                .parse()
                .with_context(|| format!("argument {} is not a number: {:?}", index + 1, arg))?;
        }
        anyhow::ensure!(scenario.period_s > 0.0, "period must be positive");
        Ok(scenario)
    }
}

/// A level magnetometer yawing at a constant step per read, with a
/// hard-iron bias added to every field.
#[derive(Debug, Clone)]
pub struct SimMagnetometer {
    yaw_deg: f32,
    yaw_step_deg: f32,
    hard_iron: Vector3<f32>,
    reads: u32,
}

impl SimMagnetometer {
    /// Starts pointing `yaw_deg` east of magnetic north.
    pub fn new(yaw_deg: f32) -> Self {
        Self {
            yaw_deg,
            yaw_step_deg: 0.0,
            hard_iron: Vector3::zeros(),
            reads: 0,
        }
    }

    pub fn with_hard_iron(mut self, offset: Vector3<f32>) -> Self {
        self.hard_iron = offset;
        self
    }

    pub fn with_yaw_step_deg(mut self, step: f32) -> Self {
        self.yaw_step_deg = step;
        self
    }

    /// Yaw the next read will report, in [0, 360).
    pub fn yaw_deg(&self) -> f32 {
        self.yaw_deg.rem_euclid(360.0)
    }

    pub fn reads(&self) -> u32 {
        self.reads
    }
}

impl Magnetometer for SimMagnetometer {
    fn read_field(&mut self) -> Result<Vector3<f32>, SensorError> {
        let (sin, cos) = self.yaw_deg.to_radians().sin_cos();
        let field = Vector3::new(
            EARTH_HORIZONTAL_UT * cos,
            EARTH_HORIZONTAL_UT * sin,
            EARTH_VERTICAL_UT,
        );
        self.yaw_deg += self.yaw_step_deg;
        self.reads += 1;
        Ok(field + self.hard_iron)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_before_init_fail() {
        let mut sea = SyntheticSea::new(Waveform::Still, 10.0);
        assert_eq!(sea.read_raw(), Err(SensorError::NotInitialised));
        assert_eq!(sea.reads(), 0);
    }

    #[test]
    fn still_water_reads_one_g() {
        let mut sea = SyntheticSea::new(Waveform::Still, 10.0);
        sea.init().unwrap();
        let raw = sea.read_raw().unwrap();
        assert_eq!(raw.accel, [0, 0, 4096]);
        assert_eq!(raw.gyro, [0, 0, 0]);
    }

    #[test]
    fn swell_peaks_a_quarter_period_in() {
        let mut sea = SyntheticSea::new(
            Waveform::Swell {
                amplitude_m: 0.1,
                period_s: 2.0,
            },
            10.0,
        );
        sea.init().unwrap();
        let codes: Vec<i16> = (0..10).map(|_| sea.read_raw().unwrap().accel[2]).collect();
        // Displacement crest at t = 0.5 s is the acceleration trough.
        let trough = codes.iter().copied().min().unwrap();
        assert_eq!(codes[5], trough);
        assert!(trough < 4096);
    }

    #[test]
    fn tilt_rotates_gravity_into_y() {
        let mut sea = SyntheticSea::new(Waveform::Still, 10.0).with_tilt_deg(30.0);
        sea.init().unwrap();
        let raw = sea.read_raw().unwrap();
        assert_eq!(raw.accel[1], 2048);
        assert_eq!(raw.accel[2], 3547);
    }

    #[test]
    fn dropouts_and_zero_codes() {
        let mut sea = SyntheticSea::new(Waveform::Zero, 10.0).with_dropout_every(3);
        sea.init().unwrap();
        assert_eq!(sea.read_raw(), Ok(RawSample::default()));
        assert_eq!(sea.read_raw(), Ok(RawSample::default()));
        assert_eq!(sea.read_raw(), Err(SensorError::Bus(SIM_BUS_ERROR)));
        assert_eq!(sea.reads(), 3);
    }

    #[test]
    fn failing_init_is_reported() {
        let mut sea = SyntheticSea::new(Waveform::Still, 10.0).failing_init();
        assert_eq!(sea.init(), Err(SensorError::Unavailable));
    }

    #[test]
    fn scenario_defaults_without_arguments() {
        let scenario = WakeScenario::from_args(["playbuoy"]).unwrap();
        assert_eq!(scenario, WakeScenario::default());
    }

    #[test]
    fn scenario_reads_positional_values() {
        let scenario = WakeScenario::from_args(["playbuoy", "4.1", "--verbose", "0.3"]).unwrap();
        assert_eq!(scenario.battery_v, 4.1);
        assert_eq!(scenario.amplitude_m, 0.3);
        assert_eq!(scenario.period_s, 3.0);
    }

    #[test]
    fn scenario_rejects_bad_values() {
        assert!(WakeScenario::from_args(["playbuoy", "swell"]).is_err());
        assert!(WakeScenario::from_args(["playbuoy", "3.9", "0.1", "0"]).is_err());
    }

    #[test]
    fn magnetometer_turns_each_read() {
        let mut mag = SimMagnetometer::new(350.0).with_yaw_step_deg(20.0);
        let first = mag.read_field().unwrap();
        assert!((first.y.atan2(first.x).to_degrees() + 10.0).abs() < 1e-3);
        assert!((mag.yaw_deg() - 10.0).abs() < 1e-3);
        assert_eq!(mag.reads(), 1);
    }

    #[test]
    fn clock_moves_only_on_delay() {
        let mut clock = SimClock::new();
        assert_eq!(clock.now_ms(), 0);
        clock.delay_ms(100);
        clock.delay_ms(40);
        assert_eq!(clock.now_ms(), 140);
    }
}
