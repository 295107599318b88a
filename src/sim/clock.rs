//! Fixed-step accumulator
//!
//! Turns variable real frame times into a whole number of fixed ticks.

use crate::consts::MAX_FRAME_DT;

#[derive(Debug, Clone)]
pub struct FixedStep {
    pub dt: f32,
    pub max_substeps: u32,
    accumulator: f32,
}

impl FixedStep {
    pub fn new(dt: f32, max_substeps: u32) -> Self {
        Self {
            dt,
            max_substeps,
            accumulator: 0.0,
        }
    }

    /// Feed one frame's real elapsed time and return how many ticks to run.
    /// Long frames are clamped and excess ticks past `max_substeps` dropped.
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.clamp(0.0, MAX_FRAME_DT);

        let mut steps = 0;
        while self.accumulator >= self.dt && steps < self.max_substeps {
            self.accumulator -= self.dt;
            steps += 1;
        }
        if steps == self.max_substeps {
            // Spiral of death guard
            self.accumulator = self.accumulator.min(self.dt);
        }
        steps
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
