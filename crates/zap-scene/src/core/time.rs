use std::time::Duration;

/// Upper bound on physics steps run for one frame.
pub const MAX_STEPS_PER_FRAME: u32 = 10;

/// Fixed timestep accumulator for the physics step.
/// Frame time goes in; a whole number of `dt` steps comes out.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    dt: f32,
    accumulator: f32,
}

impl FixedTimestep {
    /// Non-positive `dt` disables stepping entirely.
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            accumulator: 0.0,
        }
    }

    /// Add elapsed frame time. Returns the number of fixed steps to run.
    pub fn accumulate(&mut self, elapsed: Duration) -> u32 {
        if self.dt <= 0.0 {
            return 0;
        }
        self.accumulator += elapsed.as_secs_f32();
        // Drop backlog beyond the cap instead of trying to catch up.
        self.accumulator = self.accumulator.min(self.dt * MAX_STEPS_PER_FRAME as f32);
        let steps = (self.accumulator / self.dt) as u32;
        self.accumulator -= steps as f32 * self.dt;
        steps
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Forget accumulated time, e.g. after a map reload.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
