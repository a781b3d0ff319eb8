// PlayBuoy: Wave Pipeline
//
// Per tick: attitude, gravity, heave, band-pass, double integration.
// At window end: detrend, settle discard, calm-sea gate, second band-pass,
// then zero-upcrossing statistics.

use super::analyzer::{detect_waves, summarize};
use super::attitude::MahonyFilter;
use super::detrend::detrend;
use super::filter::BandPass;
use super::gravity::GravityTracker;
use super::heave::extract_heave;
use super::integrator::TrapezoidIntegrator;
use super::series::{Capacity, DisplacementSeries};
use super::WindowPhase;
use crate::config::WaveConfig;
use crate::events::{InertialSample, WaveStatistics, WindowOutcome};

/// All state of one sampling window, from first tick to final statistics.
///
/// Built fresh for each window and consumed by [`WavePipeline::finish`];
/// nothing carries over between wake cycles.
pub struct WavePipeline {
    config: WaveConfig,
    phase: WindowPhase,
    attitude: MahonyFilter,
    gravity: GravityTracker,
    bandpass: BandPass,
    integrator: TrapezoidIntegrator,
    series: DisplacementSeries,
}

impl WavePipeline {
    pub fn new(config: WaveConfig) -> Self {
        let rate = config.sample_rate_hz;
        Self {
            phase: WindowPhase::Idle,
            attitude: MahonyFilter::new(config.mahony_kp, config.mahony_ki),
            gravity: GravityTracker::new(config.gravity_cutoff_hz, rate),
            bandpass: BandPass::new(config.highpass_cutoff_hz, config.lowpass_cutoff_hz, rate),
            integrator: TrapezoidIntegrator::new(config.dt()),
            series: DisplacementSeries::with_budget(config.sample_budget()),
            config,
        }
    }

    pub fn phase(&self) -> WindowPhase {
        self.phase
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Full per-tick path for an accepted inertial sample.
    pub fn push_sample(&mut self, sample: &InertialSample) -> Capacity {
        if !self.accepts_samples() {
            return Capacity::Exhausted;
        }
        self.attitude.update(&sample.gyro, &sample.accel, self.config.dt());
        let gravity = self.gravity.update(&sample.accel);
        let heave = extract_heave(
            &sample.accel,
            &gravity,
            self.config.heave_clamp,
            self.config.heave_floor,
        );
        self.push_heave(heave)
    }

    /// Enters at the band-limiting stage with a heave acceleration (m/s²).
    pub fn push_heave(&mut self, heave: f32) -> Capacity {
        if !self.accepts_samples() {
            return Capacity::Exhausted;
        }
        self.phase = WindowPhase::Sampling;
        let accel = self.bandpass.process(heave);
        let displacement = self.integrator.process(accel);
        let capacity = self.series.push(displacement, accel);
        if capacity == Capacity::Exhausted {
            log::warn!(
                "Displacement series full at {} samples, ending window early",
                self.series.len()
            );
        }
        capacity
    }

    fn accepts_samples(&self) -> bool {
        matches!(self.phase, WindowPhase::Idle | WindowPhase::Sampling) && !self.series.is_full()
    }

    /// Runs the end-of-window analysis. Later calls return zero statistics.
    pub fn finish(&mut self) -> WaveStatistics {
        let stats = self.analyse();
        self.phase = WindowPhase::Done;
        stats
    }

    fn analyse(&mut self) -> WaveStatistics {
        if self.phase == WindowPhase::Done {
            return WaveStatistics::zero(WindowOutcome::InsufficientSamples);
        }

        let (roll, pitch, yaw) = self.attitude.euler_deg();
        log::debug!(
            "Attitude at window end: roll {:.1}° pitch {:.1}° yaw {:.1}°",
            roll,
            pitch,
            yaw
        );

        let n = self.series.len();
        let min_samples = self.config.samples_for(self.config.min_window_secs);
        let settle = self.config.samples_for(self.config.settle_secs);
        if n < min_samples || settle >= n {
            log::info!("Only {} samples collected, need more than {}", n, min_samples.max(settle));
            return WaveStatistics::zero(WindowOutcome::InsufficientSamples);
        }

        self.phase = WindowPhase::Detrending;
        let fit = detrend(self.series.displacement_mut());
        log::debug!("Detrend removed slope {:.3e} m/sample, offset {:.4} m", fit.slope, fit.intercept);

        let accel = &self.series.accel()[settle..];
        let sum_sq: f64 = accel.iter().map(|&a| (a as f64) * (a as f64)).sum();
        let rms = (sum_sq / accel.len() as f64).sqrt() as f32;
        let max_abs = accel.iter().fold(0.0f32, |m, a| m.max(a.abs()));
        if rms < self.config.gate_rms && max_abs < self.config.gate_max_abs {
            log::info!("Calm sea: accel RMS {:.4}, max {:.4} m/s²", rms, max_abs);
            return WaveStatistics::zero(WindowOutcome::CalmSea);
        }

        self.phase = WindowPhase::Filtering;
        let working = &mut self.series.displacement_mut()[settle..];
        let mean = working.iter().map(|&x| x as f64).sum::<f64>() / working.len() as f64;
        let mut bandpass = BandPass::new(
            self.config.highpass_cutoff_hz,
            self.config.lowpass_cutoff_hz,
            self.config.sample_rate_hz,
        );
        let scale = self.config.displacement_amp_scale;
        for x in working.iter_mut() {
            *x = bandpass.process((*x as f64 - mean) as f32) * scale;
        }

        self.phase = WindowPhase::Analyzing;
        let mut waves = match detect_waves(working, &self.config) {
            Ok(waves) => waves,
            Err(diverged) => {
                log::warn!(
                    "Wave of {:.2} m exceeds {:.1} m, discarding window",
                    diverged.height_m,
                    self.config.divergence_height_m
                );
                return WaveStatistics::zero(WindowOutcome::Diverged);
            }
        };
        let stats = summarize(&mut waves, self.config.power_coefficient);
        if stats.outcome == WindowOutcome::NoWaves {
            log::info!("No valid waves in {} samples", working.len());
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::STANDARD_GRAVITY;
    use core::f32::consts::PI;
    use nalgebra::Vector3;

    fn swell_heave(i: usize, amplitude: f32, period_s: f32) -> f32 {
        let w = 2.0 * PI / period_s;
        -amplitude * w * w * (w * i as f32 / 10.0).sin()
    }

    #[test]
    fn phases_advance_through_the_window() {
        let mut pipeline = WavePipeline::new(WaveConfig::default());
        assert_eq!(pipeline.phase(), WindowPhase::Idle);
        for i in 0..900 {
            pipeline.push_heave(swell_heave(i, 0.1, 4.0));
        }
        assert_eq!(pipeline.phase(), WindowPhase::Sampling);
        let stats = pipeline.finish();
        assert_eq!(pipeline.phase(), WindowPhase::Done);
        assert_eq!(stats.outcome, WindowOutcome::Analysed);
        assert_eq!(pipeline.push_heave(0.0), Capacity::Exhausted);
    }

    #[test]
    fn short_window_is_insufficient() {
        let mut pipeline = WavePipeline::new(WaveConfig::default());
        for i in 0..49 {
            pipeline.push_heave(swell_heave(i, 0.1, 2.0));
        }
        let stats = pipeline.finish();
        assert!(stats.is_zero());
        assert_eq!(stats.outcome, WindowOutcome::InsufficientSamples);
    }

    #[test]
    fn window_equal_to_settle_is_insufficient() {
        let mut pipeline = WavePipeline::new(WaveConfig::default());
        for i in 0..50 {
            pipeline.push_heave(swell_heave(i, 0.1, 2.0));
        }
        assert_eq!(pipeline.finish().outcome, WindowOutcome::InsufficientSamples);
    }

    #[test]
    fn still_water_is_gated() {
        let mut pipeline = WavePipeline::new(WaveConfig::default());
        for _ in 0..1200 {
            pipeline.push_heave(0.0);
        }
        let stats = pipeline.finish();
        assert!(stats.is_zero());
        assert_eq!(stats.outcome, WindowOutcome::CalmSea);
    }

    #[test]
    fn upright_rest_through_the_full_path_is_gated() {
        let mut pipeline = WavePipeline::new(WaveConfig::default());
        let rest = Vector3::new(0.0, 0.0, STANDARD_GRAVITY);
        for i in 0..600u64 {
            pipeline.push_sample(&InertialSample::new(rest, Vector3::zeros(), i * 100));
        }
        assert_eq!(pipeline.finish().outcome, WindowOutcome::CalmSea);
    }

    #[test]
    fn budget_stops_the_window() {
        let config = WaveConfig {
            max_samples: 120,
            ..Default::default()
        };
        let mut pipeline = WavePipeline::new(config);
        let mut accepted = 0;
        for i in 0..1000 {
            accepted += 1;
            if pipeline.push_heave(swell_heave(i, 0.1, 2.0)) == Capacity::Exhausted {
                break;
            }
        }
        assert_eq!(accepted, 120);
        assert_eq!(pipeline.len(), 120);
    }

    #[test]
    fn noise_only_above_the_gate_finds_no_waves() {
        // 3 Hz chatter passes the gate but integrates to nothing wave-like.
        let mut pipeline = WavePipeline::new(WaveConfig::default());
        for i in 0..600 {
            let t = i as f32 / 10.0;
            pipeline.push_heave(0.2 * (2.0 * PI * 3.0 * t).sin());
        }
        let stats = pipeline.finish();
        assert!(stats.is_zero());
        assert_ne!(stats.outcome, WindowOutcome::CalmSea);
    }

    #[test]
    fn finishing_twice_yields_zero() {
        let mut pipeline = WavePipeline::new(WaveConfig::default());
        for i in 0..900 {
            pipeline.push_heave(swell_heave(i, 0.1, 4.0));
        }
        assert!(!pipeline.finish().is_zero());
        assert!(pipeline.finish().is_zero());
    }
}
