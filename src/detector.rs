//! Ring edge detector — turns a raw sample stream into discrete ring events.
//!
//! Two counters, no history buffer:
//!
//! ```text
//!             sample >= threshold            streak == limit
//!   Armed ─────────────────────────▶ Rising ────────────────▶ RING
//!     ▲  ◀─────────────────────────    │                        │
//!     │        sample < threshold      │                        │ cooldown = N
//!     │                                                         ▼
//!     └──────────────────────────── CoolingDown (N samples ignored)
//! ```
//!
//! - A short noise spike never fires: the signal must stay at or above the
//!   threshold for `streak_limit` consecutive samples.
//! - One physical ring never fires twice: after an event the next
//!   `cooldown_samples` samples are consumed without being looked at.
//!
//! The detector counts samples, not time.  It relies on the caller feeding
//! it at the fixed cadence the limits were chosen for (see
//! [`Scheduler`](crate::scheduler::Scheduler)).

use crate::config::DetectorConfig;

/// Counter state.  `{ streak: 0, cooldown: 0 }` is the rest state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectorState {
    /// Consecutive samples at or above the threshold.
    pub streak: u32,
    /// Samples still to be ignored after the last ring.
    pub cooldown: u32,
}

impl DetectorState {
    pub const REST: Self = Self { streak: 0, cooldown: 0 };
}

/// Outcome of feeding one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// Sample below threshold; detector armed with an empty streak.
    Idle,
    /// Sample qualified; streak is growing but has not reached the limit.
    Rising { streak: u32 },
    /// The streak reached the limit on this sample.  Fires once.
    Ring,
    /// Sample ignored; `remaining` samples of cooldown are left.
    CoolingDown { remaining: u32 },
}

/// Threshold + streak + cooldown ring detector.
#[derive(Debug, Clone)]
pub struct EdgeDetector {
    config: DetectorConfig,
    state: DetectorState,
}

impl EdgeDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            state: DetectorState::REST,
        }
    }

    /// Process one sample.
    ///
    /// NaN never satisfies `>=` and therefore behaves like a low sample.
    pub fn feed(&mut self, sample: f32) -> Detection {
        if self.state.cooldown > 0 {
            self.state.cooldown -= 1;
            return Detection::CoolingDown {
                remaining: self.state.cooldown,
            };
        }

        if sample >= self.config.threshold {
            self.state.streak += 1;
            if self.state.streak >= self.config.streak_limit {
                self.state.streak = 0;
                self.state.cooldown = self.config.cooldown_samples;
                return Detection::Ring;
            }
            Detection::Rising {
                streak: self.state.streak,
            }
        } else {
            self.state.streak = 0;
            Detection::Idle
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// `true` when the next qualifying sample will be counted.
    pub fn is_armed(&self) -> bool {
        self.state.cooldown == 0
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Return to the rest state (drops any streak and cooldown).
    pub fn reset(&mut self) {
        self.state = DetectorState::REST;
    }
}
