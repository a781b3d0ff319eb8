// PlayBuoy: Displacement Series
//
// Per-window storage of integrated displacement and band-limited acceleration,
// reserved once up to the sample budget.

use super::SERIES_CAPACITY;

/// Whether the series can take another sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    Available,
    /// The budget is used up; the sampling loop should stop.
    Exhausted,
}

/// Bounded per-window buffer of (displacement, band-limited acceleration).
///
/// Storage for the whole budget is reserved up front so the sampling loop
/// never allocates. Pushes past the budget are dropped.
#[derive(Debug, Clone)]
pub struct DisplacementSeries {
    displacement: Vec<f32>,
    accel: Vec<f32>,
    budget: usize,
}

impl DisplacementSeries {
    pub fn with_budget(budget: usize) -> Self {
        let budget = budget.min(SERIES_CAPACITY);
        Self {
            displacement: Vec::with_capacity(budget),
            accel: Vec::with_capacity(budget),
            budget,
        }
    }

    pub fn push(&mut self, displacement: f32, accel: f32) -> Capacity {
        if self.is_full() {
            return Capacity::Exhausted;
        }
        self.displacement.push(displacement);
        self.accel.push(accel);
        if self.is_full() {
            Capacity::Exhausted
        } else {
            Capacity::Available
        }
    }

    pub fn len(&self) -> usize {
        self.displacement.len()
    }

    pub fn is_empty(&self) -> bool {
        self.displacement.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.budget
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn displacement(&self) -> &[f32] {
        &self.displacement
    }

    pub fn displacement_mut(&mut self) -> &mut [f32] {
        &mut self.displacement
    }

    pub fn accel(&self) -> &[f32] {
        &self.accel
    }
}
