//! Combo state machine
//!
//! Counts consecutive merges that land within a time window of each other.
//! Time is simulated seconds, so the combo is as deterministic as the tick.

use serde::{Deserialize, Serialize};

use crate::tuning::Tuning;

/// Presentation tier of a running combo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComboTier {
    /// Fewer than two consecutive merges, nothing shown
    None,
    Warm,
    Hot,
    Blazing,
}

impl ComboTier {
    pub fn for_count(count: u32) -> Self {
        match count {
            0 | 1 => ComboTier::None,
            2 => ComboTier::Warm,
            3 | 4 => ComboTier::Hot,
            _ => ComboTier::Blazing,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComboTier::None => "none",
            ComboTier::Warm => "warm",
            ComboTier::Hot => "hot",
            ComboTier::Blazing => "blazing",
        }
    }
}

/// Consecutive-merge tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComboTracker {
    count: u32,
    last_event: f64,
    /// Longest gap (seconds) between two merges that still chain
    pub window: f64,
    /// Bonus multiplier per chained merge past the first
    pub bonus_step: f64,
    /// How often `poll` re-checks the window
    pub poll_interval: f64,
    next_poll: f64,
}

impl Default for ComboTracker {
    fn default() -> Self {
        Self::new(1.5, 0.5, 0.1)
    }
}

impl ComboTracker {
    pub fn new(window: f64, bonus_step: f64, poll_interval: f64) -> Self {
        Self {
            count: 0,
            last_event: 0.0,
            window,
            bonus_step,
            poll_interval,
            next_poll: 0.0,
        }
    }

    pub fn from_tuning(tuning: &Tuning) -> Self {
        Self::new(
            tuning.combo_window,
            tuning.combo_bonus_step,
            tuning.combo_poll_interval,
        )
    }

    /// Record a merge at simulated time `now` and return the new count
    pub fn register_merge(&mut self, now: f64) -> u32 {
        if self.count == 0 || now - self.last_event <= self.window {
            self.count += 1;
        } else {
            self.count = 1;
        }
        self.last_event = now;
        self.count
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// The window has lapsed even if nobody has noticed yet
    pub fn is_expired(&self, now: f64) -> bool {
        self.count > 0 && now - self.last_event > self.window
    }

    /// Timeout watch, throttled to `poll_interval`. Returns true if the
    /// combo was reset by this call.
    pub fn poll(&mut self, now: f64) -> bool {
        if now < self.next_poll {
            return false;
        }
        self.next_poll = now + self.poll_interval;

        if self.is_expired(now) {
            log::debug!("Combo of {} expired", self.count);
            self.count = 0;
            true
        } else {
            false
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Count as of `now`: zero once the window has lapsed, even before
    /// the next `poll` notices
    pub fn count_at(&self, now: f64) -> u32 {
        if self.is_expired(now) { 0 } else { self.count }
    }

    pub fn tier(&self) -> ComboTier {
        ComboTier::for_count(self.count)
    }

    /// Extra points for a merge worth `base`, at the current count
    pub fn bonus(&self, base: u64) -> u64 {
        if self.count < 2 {
            return 0;
        }
        (base as f64 * (self.count - 1) as f64 * self.bonus_step).floor() as u64
    }
}
