// PlayBuoy: Sensor Samples & Wave Results

use nalgebra::Vector3;

// ---------------------------------------------------------------------------
// Raw IMU reading (register codes, before scaling)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawSample {
    pub accel: [i16; 3],
    pub gyro: [i16; 3],
}

// ---------------------------------------------------------------------------
// Inertial sample in physical units (one per accepted tick)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InertialSample {
    /// Specific force in m/s², body frame.
    pub accel: Vector3<f32>,
    /// Angular rate in deg/s, body frame.
    pub gyro: Vector3<f32>,
    /// Milliseconds since the window started.
    pub timestamp_ms: u64,
}

impl InertialSample {
    pub fn new(accel: Vector3<f32>, gyro: Vector3<f32>, timestamp_ms: u64) -> Self {
        Self {
            accel,
            gyro,
            timestamp_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Wave events and window statistics
// ---------------------------------------------------------------------------

/// One zero-upcrossing cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveEvent {
    pub height_m: f32,
    pub period_s: f32,
}

/// Why a sampling window produced the statistics it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowOutcome {
    /// No window has been recorded yet.
    #[default]
    NotRecorded,
    /// At least one valid wave was found.
    Analysed,
    /// The window was analysed but no wave passed the plausibility checks.
    NoWaves,
    /// The IMU failed to initialise; nothing was sampled.
    SensorUnavailable,
    /// Fewer samples than the minimum window were collected.
    InsufficientSamples,
    /// Filtered acceleration stayed under the noise-floor gate.
    CalmSea,
    /// A wave above the divergence bound was seen; the filter chain blew up.
    Diverged,
}

impl WindowOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotRecorded => "not recorded",
            Self::Analysed => "analysed",
            Self::NoWaves => "no valid waves",
            Self::SensorUnavailable => "sensor unavailable",
            Self::InsufficientSamples => "insufficient samples",
            Self::CalmSea => "calm sea",
            Self::Diverged => "diverged",
        }
    }
}

/// Result of one sampling window, read by the telemetry side.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WaveStatistics {
    /// Significant wave height, mean of the highest third (m).
    pub significant_height_m: f32,
    /// Mean period of the same highest third (s).
    pub peak_period_s: f32,
    /// Deep-water power proxy (kW/m).
    pub power_kw_per_m: f32,
    /// Number of valid waves in the window.
    pub wave_count: u32,
    pub outcome: WindowOutcome,
}

impl WaveStatistics {
    /// All-zero statistics tagged with the reason.
    pub fn zero(outcome: WindowOutcome) -> Self {
        Self {
            outcome,
            ..Default::default()
        }
    }

    pub fn is_zero(&self) -> bool {
        self.significant_height_m == 0.0
            && self.peak_period_s == 0.0
            && self.power_kw_per_m == 0.0
            && self.wave_count == 0
    }
}
