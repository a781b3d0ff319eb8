// PlayBuoy: Wave Analyzer
//
// Zero-upcrossing wave detection and top-third statistics.

use heapless::Vec;

use crate::config::WaveConfig;
use crate::events::{WaveEvent, WaveStatistics, WindowOutcome};

/// Deep-water power proxy coefficient (kW/m per m²·s).
pub const WAVE_POWER_COEFFICIENT: f32 = 0.49;

/// Enough for a full series of the shortest accepted period.
pub const MAX_WAVES: usize = 320;

pub type WaveList = Vec<WaveEvent, MAX_WAVES>;

/// A single cycle exceeded the divergence bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diverged {
    pub height_m: f32,
}

/// Power proxy in kW/m for a height (m) and period (s).
pub fn wave_power(height_m: f32, period_s: f32) -> f32 {
    WAVE_POWER_COEFFICIENT * height_m * height_m * period_s
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Below,
    Above,
}

/// Upcrossing detector with a dead band around zero.
///
/// Side changes only register outside `±hysteresis`, so noise around zero
/// cannot start a new cycle. Each Below -> Above transition closes the
/// cycle opened by the previous one.
struct UpcrossingDetector<'a> {
    config: &'a WaveConfig,
    side: Option<Side>,
    cycle_start: Option<usize>,
    max: f32,
    min: f32,
}

impl<'a> UpcrossingDetector<'a> {
    fn new(config: &'a WaveConfig) -> Self {
        Self {
            config,
            side: None,
            cycle_start: None,
            max: 0.0,
            min: 0.0,
        }
    }

    /// Returns a completed cycle, accepted or not, at each upcrossing.
    fn step(&mut self, index: usize, x: f32) -> Option<WaveEvent> {
        let h = self.config.hysteresis_m;
        let side = if x > h {
            Some(Side::Above)
        } else if x < -h {
            Some(Side::Below)
        } else {
            None
        };

        let mut completed = None;
        if side == Some(Side::Above) && self.side == Some(Side::Below) {
            if let Some(start) = self.cycle_start {
                completed = Some(WaveEvent {
                    height_m: self.max - self.min,
                    period_s: (index - start) as f32 / self.config.sample_rate_hz,
                });
            }
            self.cycle_start = Some(index);
            self.max = x;
            self.min = x;
        } else {
            self.max = self.max.max(x);
            self.min = self.min.min(x);
        }

        if side.is_some() {
            self.side = side;
        }
        completed
    }
}

/// Collects the plausible waves of a working signal.
///
/// Returns `Err` as soon as any cycle is taller than the divergence bound.
pub fn detect_waves(signal: &[f32], config: &WaveConfig) -> Result<WaveList, Diverged> {
    let mut detector = UpcrossingDetector::new(config);
    let mut waves = WaveList::new();
    let mut rejected = 0u32;

    for (i, &x) in signal.iter().enumerate() {
        let wave = match detector.step(i, x) {
            Some(wave) => wave,
            None => continue,
        };

        if wave.height_m > config.divergence_height_m {
            return Err(Diverged {
                height_m: wave.height_m,
            });
        }
        let period_ok = wave.period_s >= config.min_period_s && wave.period_s <= config.max_period_s;
        let height_ok =
            wave.height_m > config.min_wave_height_m && wave.height_m <= config.max_wave_height_m;
        if !(period_ok && height_ok) {
            rejected += 1;
            continue;
        }
        if waves.push(wave).is_err() {
            log::warn!("Wave list full at {} waves, ignoring the rest", MAX_WAVES);
            break;
        }
    }

    log::debug!("Upcrossing: {} accepted, {} rejected", waves.len(), rejected);
    Ok(waves)
}

/// Hs and Tp as means over the highest third (at least one wave).
pub fn summarize(waves: &mut [WaveEvent], power_coefficient: f32) -> WaveStatistics {
    if waves.is_empty() {
        return WaveStatistics::zero(WindowOutcome::NoWaves);
    }

    waves.sort_unstable_by(|a, b| b.height_m.total_cmp(&a.height_m));
    let top = (waves.len() / 3).max(1);
    let highest = &waves[..top];
    let hs = highest.iter().map(|w| w.height_m).sum::<f32>() / top as f32;
    let tp = highest.iter().map(|w| w.period_s).sum::<f32>() / top as f32;

    WaveStatistics {
        significant_height_m: hs,
        peak_period_s: tp,
        power_kw_per_m: power_coefficient * hs * hs * tp,
        wave_count: waves.len() as u32,
        outcome: WindowOutcome::Analysed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use core::f32::consts::PI;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn sine(amplitude: f32, period_s: f32, secs: f32) -> std::vec::Vec<f32> {
        let n = (secs * 10.0) as usize;
        (0..n)
            .map(|i| amplitude * (2.0 * PI * i as f32 / 10.0 / period_s).sin())
            .collect()
    }

    #[test]
    fn counts_cycles_of_a_clean_sine() {
        let config = WaveConfig::default();
        let waves = detect_waves(&sine(0.1, 2.0, 60.0), &config).unwrap();
        // The rise at t = 0 has no Below before it: 29 upcrossings, 28 cycles.
        assert_eq!(waves.len(), 28);
        for wave in &waves {
            assert_relative_eq!(wave.period_s, 2.0, epsilon = 1e-5);
            assert_relative_eq!(wave.height_m, 0.2, max_relative = 0.02);
        }
    }

    #[test]
    fn dither_inside_the_dead_band_adds_no_cycles() {
        let config = WaveConfig::default();
        let mut signal = sine(0.1, 4.0, 40.0);
        for (i, x) in signal.iter_mut().enumerate() {
            *x += if i % 2 == 0 { 0.0004 } else { -0.0004 };
        }
        let waves = detect_waves(&signal, &config).unwrap();
        assert_eq!(waves.len(), 8);
        assert!(waves.iter().all(|w| (w.period_s - 4.0).abs() < 0.15));
    }

    #[test]
    fn short_and_small_cycles_are_rejected() {
        let config = WaveConfig::default();
        // 0.5 s period
        assert!(detect_waves(&sine(0.1, 0.5, 30.0), &config).unwrap().is_empty());
        // 0.006 m peak-to-peak
        assert!(detect_waves(&sine(0.003, 3.0, 30.0), &config).unwrap().is_empty());
    }

    #[test]
    fn tall_waves_are_dropped_but_do_not_abort() {
        let config = WaveConfig::default();
        let waves = detect_waves(&sine(1.0, 5.0, 60.0), &config).unwrap();
        assert!(waves.is_empty());
    }

    #[test]
    fn runaway_cycle_aborts_the_window() {
        let config = WaveConfig::default();
        let err = detect_waves(&sine(3.0, 5.0, 30.0), &config).unwrap_err();
        assert!(err.height_m > 5.0);
    }

    #[test]
    fn accepted_waves_always_respect_bounds() {
        let config = WaveConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        for _ in 0..200 {
            let len = rng.gen_range(10..3000);
            let scale: f32 = rng.gen_range(0.0001..3.0);
            let mut level = 0.0f32;
            let signal: std::vec::Vec<f32> = (0..len)
                .map(|_| {
                    // Random walk plus white noise covers both long and short cycles.
                    level = 0.95 * level + rng.gen_range(-1.0f32..1.0) * scale * 0.3;
                    level + rng.gen_range(-1.0f32..1.0) * scale * 0.05
                })
                .collect();

            if let Ok(waves) = detect_waves(&signal, &config) {
                for wave in &waves {
                    assert!(wave.period_s >= 1.0 && wave.period_s <= 30.0, "{:?}", wave);
                    assert!(wave.height_m > 0.015 && wave.height_m <= 0.8, "{:?}", wave);
                }
            }
        }
    }

    #[test]
    fn summary_averages_the_highest_third() {
        let mut waves = [
            WaveEvent { height_m: 0.10, period_s: 3.0 },
            WaveEvent { height_m: 0.40, period_s: 6.0 },
            WaveEvent { height_m: 0.20, period_s: 4.0 },
            WaveEvent { height_m: 0.30, period_s: 5.0 },
            WaveEvent { height_m: 0.05, period_s: 2.0 },
            WaveEvent { height_m: 0.50, period_s: 8.0 },
        ];
        let stats = summarize(&mut waves, WAVE_POWER_COEFFICIENT);
        assert_eq!(stats.wave_count, 6);
        assert_eq!(stats.outcome, WindowOutcome::Analysed);
        assert_relative_eq!(stats.significant_height_m, 0.45, epsilon = 1e-6);
        assert_relative_eq!(stats.peak_period_s, 7.0, epsilon = 1e-6);
        assert_relative_eq!(stats.power_kw_per_m, wave_power(0.45, 7.0), epsilon = 1e-6);
    }

    #[test]
    fn summary_of_fewer_than_three_uses_the_tallest() {
        let mut waves = [
            WaveEvent { height_m: 0.1, period_s: 3.0 },
            WaveEvent { height_m: 0.2, period_s: 5.0 },
        ];
        let stats = summarize(&mut waves, WAVE_POWER_COEFFICIENT);
        assert_eq!(stats.wave_count, 2);
        assert_relative_eq!(stats.significant_height_m, 0.2);
        assert_relative_eq!(stats.peak_period_s, 5.0);
    }

    #[test]
    fn no_waves_is_all_zero() {
        let stats = summarize(&mut [], WAVE_POWER_COEFFICIENT);
        assert!(stats.is_zero());
        assert_eq!(stats.outcome, WindowOutcome::NoWaves);
    }

    #[test]
    fn power_proxy() {
        assert_relative_eq!(wave_power(1.0, 10.0), 4.9, epsilon = 1e-6);
        assert_eq!(wave_power(0.0, 8.0), 0.0);
    }
}
