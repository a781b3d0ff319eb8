// PlayBuoy: Wave-Motion Estimation
//
// Raw inertial samples in, Hs / Tp / power out.
//
// Per tick: attitude and gravity tracking, heave projection, band-pass and
// double integration into a bounded displacement series. Per window:
// detrend, settle discard, calm-sea gate, second band-pass and
// zero-upcrossing analysis.

pub mod analyzer;
pub mod attitude;
pub mod detrend;
pub mod filter;
pub mod gravity;
pub mod heave;
pub mod integrator;
pub mod pipeline;
pub mod series;

pub use analyzer::{wave_power, WAVE_POWER_COEFFICIENT};
pub use pipeline::WavePipeline;
pub use series::Capacity;

/// Worst-case samples held for one window (5 minutes at 10 Hz).
pub const SERIES_CAPACITY: usize = 3000;

/// Where a [`WavePipeline`] is in its one-shot window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    Idle,
    Sampling,
    Detrending,
    Filtering,
    Analyzing,
    Done,
}
