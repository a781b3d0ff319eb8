// PlayBuoy: Wave Sampling Task
//
// Runs one sampling window synchronously on the caller's thread. The only
// suspension point is the per-tick delay that paces the loop; the watchdog
// is fed every few seconds so a ten-minute window never trips it.

use crate::battery::sampling_window_ms;
use crate::config::WaveConfig;
use crate::drivers::imu::InertialSensor;
use crate::events::{WaveStatistics, WindowOutcome};
use crate::heading::{direction_label, HeadingAccumulator, HeadingSource};
use crate::sampler::InertialSampler;
use crate::wave::{wave_power, Capacity, WavePipeline};

/// Monotonic millisecond clock with a blocking delay.
pub trait Clock {
    fn now_ms(&self) -> u64;
    fn delay_ms(&mut self, ms: u64);
}

pub trait Watchdog {
    fn feed(&mut self);
}

/// Owner of the last window's results.
///
/// Getters are pure reads and stay valid until the next
/// [`WaveRecorder::record_wave_data`] call replaces them.
pub struct WaveRecorder {
    config: WaveConfig,
    statistics: WaveStatistics,
    heading_deg: Option<f32>,
}

impl WaveRecorder {
    pub fn new(config: WaveConfig) -> Self {
        Self {
            config,
            statistics: WaveStatistics::default(),
            heading_deg: None,
        }
    }

    pub fn record_wave_data<S, H, C, W>(
        &mut self,
        sensor: &mut S,
        heading: &mut H,
        clock: &mut C,
        watchdog: &mut W,
        battery_percent: u8,
    ) where
        S: InertialSensor,
        H: HeadingSource,
        C: Clock,
        W: Watchdog,
    {
        let window_ms = sampling_window_ms(battery_percent);
        log::info!(
            "Starting wave window: {} s at {} Hz (battery {}%)",
            window_ms / 1000,
            self.config.sample_rate_hz,
            battery_percent
        );

        self.statistics = WaveStatistics::default();
        self.heading_deg = None;

        let mut sampler = InertialSampler::new(sensor, self.config.accel_magnitude_tolerance);
        if let Err(e) = sampler.init() {
            log::error!("IMU init failed, no wave data this cycle: {}", e);
            self.statistics = WaveStatistics::zero(WindowOutcome::SensorUnavailable);
            return;
        }

        let mut pipeline = Box::new(WavePipeline::new(self.config.clone()));
        let mut headings = HeadingAccumulator::new();
        let tick_ms = self.config.tick_ms();
        let heading_every = self.config.heading_every_n_ticks.max(1);

        let start = clock.now_ms();
        let mut last_feed = start;
        let mut tick: u32 = 0;

        loop {
            let tick_start = clock.now_ms();
            let elapsed = tick_start.saturating_sub(start);
            if elapsed >= window_ms {
                break;
            }

            if tick_start.saturating_sub(last_feed) >= self.config.watchdog_interval_ms {
                watchdog.feed();
                last_feed = tick_start;
            }

            if let Some(sample) = sampler.sample(elapsed) {
                if pipeline.push_sample(&sample) == Capacity::Exhausted {
                    break;
                }
            }

            if tick % heading_every == 0 {
                headings.add(heading.heading_deg());
            }
            tick = tick.wrapping_add(1);

            let spent = clock.now_ms().saturating_sub(tick_start);
            if spent < tick_ms {
                clock.delay_ms(tick_ms - spent);
            }
        }

        log::info!(
            "Collected {} samples in {} ticks ({} read failures, {} rejected)",
            pipeline.len(),
            tick,
            sampler.read_failures(),
            sampler.rejected()
        );

        self.statistics = pipeline.finish();
        self.heading_deg = headings.mean_deg();
        log::debug!(
            "{} heading samples, mean {:?}",
            headings.count(),
            self.heading_deg
        );
    }

    /// Significant wave height (m).
    pub fn wave_height(&self) -> f32 {
        self.statistics.significant_height_m
    }

    /// Period of the significant waves (s).
    pub fn wave_period(&self) -> f32 {
        self.statistics.peak_period_s
    }

    /// Eight-point compass label, or "N/A".
    pub fn wave_direction(&self) -> &'static str {
        direction_label(self.heading_deg)
    }

    pub fn statistics(&self) -> &WaveStatistics {
        &self.statistics
    }

    pub fn log_wave_stats(&self) {
        let stats = &self.statistics;
        log::info!("Wave window: {}", stats.outcome.name());
        log::info!("Wave height: {:.2} m", stats.significant_height_m);
        log::info!("Wave period: {:.2} s", stats.peak_period_s);
        log::info!("Wave direction: {}", self.wave_direction());
        log::info!(
            "Wave power: {:.2} kW/m",
            wave_power(stats.significant_height_m, stats.peak_period_s)
        );
        log::info!("Wave count: {}", stats.wave_count);
    }
}
