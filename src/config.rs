// PlayBuoy: Hardware & System Configuration
// Target: LilyGo T-SIM7000G (ESP32) with GY-91 (MPU9250) on I2C

use crate::wave::{SERIES_CAPACITY, WAVE_POWER_COEFFICIENT};

// ---------------------------------------------------------------------------
// GPIO / I2C Bus
// ---------------------------------------------------------------------------
pub const PIN_I2C_SDA: i32 = 21;
pub const PIN_I2C_SCL: i32 = 22;
pub const PIN_BATTERY_ADC: i32 = 35; // ADC1 channel 7
pub const I2C_BAUDRATE_HZ: u32 = 400_000;
pub const I2C_TIMEOUT_TICKS: u32 = 1000; // FreeRTOS ticks

pub const I2C_ADDR_MPU9250: u8 = 0x68;
pub const I2C_ADDR_AK8963: u8 = 0x0C; // reachable once MPU9250 bypass is on

// ---------------------------------------------------------------------------
// MPU9250 Sensor Scale Factors
// ---------------------------------------------------------------------------
pub const ACCEL_SCALE_8G: f32 = 4096.0; // LSB/g  at ±8 g
pub const GYRO_SCALE_500: f32 = 65.5; // LSB/°/s at ±500 °/s
pub const MAG_SCALE_16BIT: f32 = 0.15; // µT/LSB in 16-bit output mode
pub const MAG_CALIBRATION_MIN_SPAN_UT: f32 = 20.0; // per horizontal axis
pub const MAG_OFFSET_LIMIT_UT: f32 = 1000.0;

/// Standard gravity in m/s².
pub const STANDARD_GRAVITY: f32 = 9.80665;

// ---------------------------------------------------------------------------
// Battery
// ---------------------------------------------------------------------------
pub const BATTERY_DIVIDER_RATIO: f32 = 2.0; // 1:2 resistor divider before the ADC
pub const CHARGE_THRESHOLD_V: f32 = 3.70;
pub const CHARGE_HYSTERESIS_V: f32 = 0.03;
pub const BATTERY_CRITICAL_V: f32 = 3.00;
// Readings outside this range are treated as a failed measurement
pub const BATTERY_PLAUSIBLE_MIN_V: f32 = 2.50;
pub const BATTERY_PLAUSIBLE_MAX_V: f32 = 4.50;
pub const BATTERY_UNKNOWN_SLEEP_H: u32 = 6; // retry soon when the ADC fails

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------
pub const WATCHDOG_TIMEOUT_S: u64 = 2700; // 45 minutes, panic on trigger
pub const UTC_OFFSET_S: i32 = 3600; // CET; sleep policy only needs month/hour

// ---------------------------------------------------------------------------
// Wave Pipeline
// ---------------------------------------------------------------------------

/// Every tunable of the wave-motion pipeline.
///
/// The defaults are the values the buoy ships with. Tests and the host
/// simulation tweak individual fields with struct update syntax.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveConfig {
    /// Tick rate of the sampling loop (Hz).
    pub sample_rate_hz: f32,
    /// Reject a tick when |accel| deviates from g by more than this (m/s²).
    pub accel_magnitude_tolerance: f32,
    /// Cutoff of the gravity tracker low-pass (Hz).
    pub gravity_cutoff_hz: f32,
    /// Heave acceleration is clamped to ±this (m/s²).
    pub heave_clamp: f32,
    /// |heave| below this is floored to exactly zero (m/s²).
    pub heave_floor: f32,
    /// Band-limiting high-pass cutoff (Hz).
    pub highpass_cutoff_hz: f32,
    /// Band-limiting low-pass cutoff (Hz).
    pub lowpass_cutoff_hz: f32,
    /// Start-up segment dropped before analysis (s).
    pub settle_secs: f32,
    /// Windows shorter than this yield zero statistics (s).
    pub min_window_secs: f32,
    /// Calm-sea gate: RMS of filtered acceleration (m/s²).
    pub gate_rms: f32,
    /// Calm-sea gate: max |filtered acceleration| (m/s²).
    pub gate_max_abs: f32,
    /// Gain applied after the displacement band-pass.
    pub displacement_amp_scale: f32,
    /// Dead zone around zero for the upcrossing detector (m).
    pub hysteresis_m: f32,
    pub min_period_s: f32,
    pub max_period_s: f32,
    /// A wave must be strictly taller than this to count (m).
    pub min_wave_height_m: f32,
    /// Single waves taller than this are dropped (m).
    pub max_wave_height_m: f32,
    /// Any wave taller than this invalidates the whole window (m).
    pub divergence_height_m: f32,
    /// Deep-water power proxy: P = k * Hs² * Tp.
    pub power_coefficient: f32,
    /// Heading is read on every Nth tick.
    pub heading_every_n_ticks: u32,
    pub watchdog_interval_ms: u64,
    /// Upper bound on stored samples, clamped to [`SERIES_CAPACITY`].
    pub max_samples: usize,
    /// Mahony proportional gain.
    pub mahony_kp: f32,
    /// Mahony integral gain.
    pub mahony_ki: f32,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 10.0,
            accel_magnitude_tolerance: 4.9,
            gravity_cutoff_hz: 0.02,
            heave_clamp: 5.0,
            heave_floor: 0.001,
            highpass_cutoff_hz: 0.28,
            lowpass_cutoff_hz: 1.0,
            settle_secs: 5.0,
            min_window_secs: 5.0,
            gate_rms: 0.01,
            gate_max_abs: 0.04,
            displacement_amp_scale: 1.75,
            hysteresis_m: 0.0005,
            min_period_s: 1.0,
            max_period_s: 30.0,
            min_wave_height_m: 0.015,
            max_wave_height_m: 0.8,
            divergence_height_m: 5.0,
            power_coefficient: WAVE_POWER_COEFFICIENT,
            heading_every_n_ticks: 10,
            watchdog_interval_ms: 5000,
            max_samples: SERIES_CAPACITY,
            mahony_kp: 1.0,
            mahony_ki: 0.0,
        }
    }
}

impl WaveConfig {
    /// Integration step (s).
    pub fn dt(&self) -> f32 {
        1.0 / self.sample_rate_hz
    }

    /// Tick period of the sampling loop (ms).
    pub fn tick_ms(&self) -> u64 {
        (1000.0 / self.sample_rate_hz).round() as u64
    }

    /// Number of samples covering `secs` at the configured rate.
    pub fn samples_for(&self, secs: f32) -> usize {
        (secs * self.sample_rate_hz).round() as usize
    }

    /// Sample budget actually honoured by the displacement series.
    pub fn sample_budget(&self) -> usize {
        self.max_samples.min(SERIES_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tick_is_100ms() {
        let config = WaveConfig::default();
        assert_eq!(config.tick_ms(), 100);
        assert!((config.dt() - 0.1).abs() < 1e-6);
        assert_eq!(config.samples_for(5.0), 50);
    }

    #[test]
    fn sample_budget_never_exceeds_capacity() {
        let config = WaveConfig {
            max_samples: SERIES_CAPACITY * 4,
            ..Default::default()
        };
        assert_eq!(config.sample_budget(), SERIES_CAPACITY);

        let small = WaveConfig {
            max_samples: 600,
            ..Default::default()
        };
        assert_eq!(small.sample_budget(), 600);
    }
}
