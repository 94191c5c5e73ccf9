//! Fixed-timestep simulation clock
//!
//! Carries unconsumed wall time across displayed frames so the number of
//! ticks depends only on total elapsed time, not on how it was sliced.

/// Time debt accumulator for the field update scheduler
#[derive(Debug, Clone)]
pub struct SimulationClock {
    /// Unconsumed time in seconds, always in `[0, step)` between frames
    accumulator: f64,

    /// Fixed tick size in seconds
    step: f64,

    /// Optional cap on ticks per frame
    max_ticks_per_frame: Option<u32>,

    /// Optional clamp applied to each frame delta before accumulation
    max_frame_delta: Option<f64>,

    /// Ticks discarded because the cap was hit
    dropped_ticks: u64,

    /// The most recent frame delta after sanitizing and clamping
    last_delta: f64,
}

impl SimulationClock {
    /// Create a clock ticking every `step` seconds with no caps
    pub fn new(step: f64) -> Self {
        debug_assert!(step > 0.0, "step must be positive");
        Self {
            accumulator: 0.0,
            step,
            max_ticks_per_frame: None,
            max_frame_delta: None,
            dropped_ticks: 0,
            last_delta: 0.0,
        }
    }

    /// Bound the ticks a single frame may run; excess debt is dropped
    pub fn with_max_ticks(mut self, max_ticks: Option<u32>) -> Self {
        self.max_ticks_per_frame = max_ticks;
        self
    }

    /// Clamp anomalously large frame deltas before they are accumulated
    pub fn with_max_frame_delta(mut self, max_delta: Option<f64>) -> Self {
        self.max_frame_delta = max_delta;
        self
    }

    /// Add `delta` seconds and return how many ticks are due this frame.
    ///
    /// Returns `floor((accumulator + delta) / step)` (subject to the cap) and
    /// leaves the remainder in the accumulator.
    pub fn advance(&mut self, delta: f64) -> u32 {
        let mut delta = if delta.is_finite() {
            delta.max(0.0)
        } else {
            0.0
        };
        if let Some(max_delta) = self.max_frame_delta {
            delta = delta.min(max_delta);
        }
        self.last_delta = delta;

        let total = self.accumulator + delta;
        let mut due = (total / self.step).floor();
        let mut remainder = total - due * self.step;

        // Floating point can leave the remainder a hair outside [0, step)
        if remainder >= self.step {
            due += 1.0;
            remainder -= self.step;
        }
        if remainder < 0.0 {
            if due >= 1.0 {
                due -= 1.0;
                remainder += self.step;
            } else {
                remainder = 0.0;
            }
        }

        let due = due as u64;
        let ticks = match self.max_ticks_per_frame {
            Some(cap) if due > cap as u64 => {
                let dropped = due - cap as u64;
                self.dropped_ticks += dropped;
                log::warn!(
                    "[SimulationClock::advance] Frame owed {} ticks, capped at {} ({} dropped)",
                    due,
                    cap,
                    dropped
                );
                cap
            }
            _ => due as u32,
        };

        self.accumulator = remainder.clamp(0.0, self.step);
        if self.accumulator >= self.step {
            self.accumulator = 0.0;
        }
        ticks
    }

    /// Unconsumed time in seconds
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Fixed tick size in seconds
    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn dropped_ticks(&self) -> u64 {
        self.dropped_ticks
    }

    /// Seconds the last `advance` actually accounted for. Anything that
    /// integrates over the frame should use this rather than the raw delta.
    pub fn last_delta(&self) -> f64 {
        self.last_delta
    }
}
