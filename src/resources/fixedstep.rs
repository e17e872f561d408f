//! Fixed-step accumulator.
//!
//! Decouples the variable per-update delta from a constant step: every
//! update adds its delta to the accumulator, and each full quantum in the
//! accumulator pays for one step. At most `max_steps_per_update` steps run
//! per update; whatever is left over stays in the accumulator and is spent
//! by later updates. Accumulator growth is not clamped.

use bevy_ecs::prelude::Resource;

#[derive(Resource, Debug, Clone)]
pub struct FixedStepClock {
    quantum: f64,
    accumulator: f64,
    max_steps_per_update: Option<u32>,
    steps_last_update: u32,
    total_steps: u64,
}

impl Default for FixedStepClock {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HZ)
    }
}

impl FixedStepClock {
    pub const DEFAULT_HZ: u32 = 60;

    /// Clock stepping `step_hz` times per second, one step per update at most.
    pub fn new(step_hz: u32) -> Self {
        Self {
            quantum: 1.0 / step_hz.max(1) as f64,
            accumulator: 0.0,
            max_steps_per_update: Some(1),
            steps_last_update: 0,
            total_steps: 0,
        }
    }

    /// Cap on steps per update; `None` drains the whole backlog every update.
    pub fn with_max_steps_per_update(mut self, max: Option<u32>) -> Self {
        self.max_steps_per_update = max;
        self
    }

    /// Add `dt` seconds and consume as many quanta as allowed.
    ///
    /// Returns the number of steps to run for this update. Negative and
    /// non-finite deltas count as zero.
    pub fn advance(&mut self, dt: f32) -> u32 {
        if dt.is_finite() {
            self.accumulator += f64::from(dt.max(0.0));
        }

        let mut steps = 0;
        while self.accumulator >= self.quantum
            && self.max_steps_per_update.is_none_or(|max| steps < max)
        {
            self.accumulator -= self.quantum;
            steps += 1;
        }

        self.steps_last_update = steps;
        self.total_steps += u64::from(steps);
        steps
    }

    /// Step length in seconds.
    pub fn quantum(&self) -> f64 {
        self.quantum
    }

    /// Unspent time in seconds.
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    pub fn max_steps_per_update(&self) -> Option<u32> {
        self.max_steps_per_update
    }

    pub fn steps_last_update(&self) -> u32 {
        self.steps_last_update
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }
}
