//! Simulation time for the tick loop.
//!
//! Time only advances when the driver feeds it a delta, so every run with the
//! same deltas observes the same clock.

/// Tracks simulated time and a fixed-step accumulator.
#[derive(Debug, Clone)]
pub struct SimClock {
    /// Duration of the last advance, in seconds.
    delta: f64,
    /// Total simulated time since start/reset, in seconds.
    elapsed: f64,
    /// Advances since start/reset.
    frame_count: u64,
    /// Fixed timestep for the simulation (default 60 Hz).
    fixed_timestep: f64,
    /// Accumulated time for fixed updates.
    accumulator: f64,
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            delta: 0.0,
            elapsed: 0.0,
            frame_count: 0,
            fixed_timestep: 1.0 / 60.0,
            accumulator: 0.0,
        }
    }

    /// Advance the clock by `dt` seconds. Negative or non-finite deltas count as zero.
    pub fn advance(&mut self, dt: f64) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.delta = dt;
        self.elapsed += dt;
        self.frame_count += 1;
        self.accumulator += dt;
    }

    /// Delta of the last advance in seconds.
    pub fn delta_seconds(&self) -> f64 {
        self.delta
    }

    /// Total elapsed time in seconds.
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the fixed timestep in seconds.
    pub fn fixed_timestep_seconds(&self) -> f64 {
        self.fixed_timestep
    }

    /// Check if a fixed update should run and consume the time.
    pub fn should_fixed_update(&mut self) -> bool {
        if self.accumulator >= self.fixed_timestep {
            self.accumulator -= self.fixed_timestep;
            true
        } else {
            false
        }
    }

    /// Set the fixed timestep rate in Hz.
    pub fn set_fixed_rate(&mut self, hz: f64) {
        if hz > 0.0 {
            self.fixed_timestep = 1.0 / hz;
        }
    }

    /// Back to zero, keeping the fixed rate.
    pub fn reset(&mut self) {
        *self = Self {
            fixed_timestep: self.fixed_timestep,
            ..Self::new()
        };
    }
}
