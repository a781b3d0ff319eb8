// PlayBuoy: Band-limiting Filters
//
// Single-pole IIR stages and the band-limiting cascade. The same cascade
// runs twice per window: on heave acceleration before integration, and with
// fresh state on the detrended displacement.

use core::f32::consts::PI;

/// RC time constant of a first-order section with the given cutoff.
fn rc(cutoff_hz: f32) -> f32 {
    1.0 / (2.0 * PI * cutoff_hz)
}

/// First-order RC low-pass: `y += alpha * (x - y)`.
#[derive(Debug, Clone)]
pub struct SinglePoleLowPass {
    alpha: f32,
    y: f32,
}

impl SinglePoleLowPass {
    /// # Panics
    /// Panics if the cutoff or sample rate is not positive.
    pub fn new(cutoff_hz: f32, sample_rate_hz: f32) -> Self {
        assert!(
            cutoff_hz > 0.0 && sample_rate_hz > 0.0,
            "Cutoff and sample rate must be positive"
        );
        let dt = 1.0 / sample_rate_hz;
        Self {
            alpha: dt / (rc(cutoff_hz) + dt),
            y: 0.0,
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn process(&mut self, input: f32) -> f32 {
        self.y += self.alpha * (input - self.y);
        self.y
    }

    /// |H| at `freq_hz` for a filter sampled at `sample_rate_hz`.
    pub fn gain_at(&self, freq_hz: f32, sample_rate_hz: f32) -> f32 {
        let w = 2.0 * PI * freq_hz / sample_rate_hz;
        let beta = 1.0 - self.alpha;
        // |1 - beta e^{-jw}|
        let denom = (1.0 - 2.0 * beta * w.cos() + beta * beta).sqrt();
        self.alpha / denom
    }
}

/// First-order RC high-pass: `y = alpha * (y_prev + x - x_prev)`.
#[derive(Debug, Clone)]
pub struct SinglePoleHighPass {
    alpha: f32,
    x_prev: f32,
    y: f32,
}

impl SinglePoleHighPass {
    /// # Panics
    /// Panics if the cutoff or sample rate is not positive.
    pub fn new(cutoff_hz: f32, sample_rate_hz: f32) -> Self {
        assert!(
            cutoff_hz > 0.0 && sample_rate_hz > 0.0,
            "Cutoff and sample rate must be positive"
        );
        let dt = 1.0 / sample_rate_hz;
        let rc = rc(cutoff_hz);
        Self {
            alpha: rc / (rc + dt),
            x_prev: 0.0,
            y: 0.0,
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn process(&mut self, input: f32) -> f32 {
        self.y = self.alpha * (self.y + input - self.x_prev);
        self.x_prev = input;
        self.y
    }

    pub fn gain_at(&self, freq_hz: f32, sample_rate_hz: f32) -> f32 {
        let w = 2.0 * PI * freq_hz / sample_rate_hz;
        let a = self.alpha;
        // alpha |1 - e^{-jw}| / |1 - alpha e^{-jw}|
        let num = 2.0 * (w / 2.0).sin();
        let denom = (1.0 - 2.0 * a * w.cos() + a * a).sqrt();
        a * num / denom
    }
}

/// High-pass followed by low-pass.
#[derive(Debug, Clone)]
pub struct BandPass {
    highpass: SinglePoleHighPass,
    lowpass: SinglePoleLowPass,
    sample_rate_hz: f32,
}

impl BandPass {
    pub fn new(highpass_hz: f32, lowpass_hz: f32, sample_rate_hz: f32) -> Self {
        Self {
            highpass: SinglePoleHighPass::new(highpass_hz, sample_rate_hz),
            lowpass: SinglePoleLowPass::new(lowpass_hz, sample_rate_hz),
            sample_rate_hz,
        }
    }

    pub fn process(&mut self, input: f32) -> f32 {
        self.lowpass.process(self.highpass.process(input))
    }

    /// Steady-state magnitude response of the cascade at `freq_hz`.
    pub fn gain_at(&self, freq_hz: f32) -> f32 {
        self.highpass.gain_at(freq_hz, self.sample_rate_hz)
            * self.lowpass.gain_at(freq_hz, self.sample_rate_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SAMPLE_RATE: f32 = 10.0;

    /// Amplitude of the steady-state output, from its RMS over whole periods.
    fn amplitude_after(filter: &mut BandPass, freq: f32, samples: usize, settle: usize) -> f32 {
        let mut sum_sq = 0.0;
        for i in 0..samples {
            let t = i as f32 / SAMPLE_RATE;
            let out = filter.process((2.0 * PI * freq * t).sin());
            if i >= settle {
                sum_sq += out * out;
            }
        }
        (2.0 * sum_sq / (samples - settle) as f32).sqrt()
    }

    #[test]
    fn test_coefficients() {
        let hp = SinglePoleHighPass::new(0.28, SAMPLE_RATE);
        let lp = SinglePoleLowPass::new(1.0, SAMPLE_RATE);
        assert_relative_eq!(hp.alpha(), 0.850392, epsilon = 1e-4);
        assert_relative_eq!(lp.alpha(), 0.385869, epsilon = 1e-4);
    }

    #[test]
    #[should_panic(expected = "must be positive")]
    fn test_zero_cutoff_rejected() {
        let _ = SinglePoleLowPass::new(0.0, SAMPLE_RATE);
    }

    #[test]
    fn test_highpass_rejects_dc() {
        let mut hp = SinglePoleHighPass::new(0.28, SAMPLE_RATE);
        let mut out = 0.0;
        for _ in 0..200 {
            out = hp.process(3.0);
        }
        assert!(out.abs() < 1e-6, "DC should be removed: got {}", out);
    }

    #[test]
    fn test_lowpass_passes_dc() {
        let mut lp = SinglePoleLowPass::new(1.0, SAMPLE_RATE);
        let mut out = 0.0;
        for _ in 0..100 {
            out = lp.process(2.0);
        }
        assert_relative_eq!(out, 2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_bandpass_attenuates_outside_wave_band() {
        let bp = BandPass::new(0.28, 1.0, SAMPLE_RATE);
        let in_band = bp.gain_at(0.5);
        assert!(bp.gain_at(0.02) < 0.15 * in_band);
        assert!(bp.gain_at(4.0) < 0.4 * in_band);
    }

    #[test]
    fn test_measured_gain_matches_response() {
        for freq in [0.1_f32, 0.25, 0.5, 1.0] {
            let mut bp = BandPass::new(0.28, 1.0, SAMPLE_RATE);
            let expected = bp.gain_at(freq);
            // 60 whole periods, the first half discarded as transient
            let samples = (60.0 * SAMPLE_RATE / freq).round() as usize;
            let amplitude = amplitude_after(&mut bp, freq, samples, samples / 2);
            assert_relative_eq!(amplitude, expected, max_relative = 0.02);
        }
    }

    #[test]
    fn test_fresh_state_starts_at_zero() {
        let mut bp = BandPass::new(0.28, 1.0, SAMPLE_RATE);
        assert_eq!(bp.process(0.0), 0.0);
    }
}
