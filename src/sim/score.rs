//! Score ledger

use serde::{Deserialize, Serialize};

use crate::persistence::{BEST_SCORE_KEY, KeyValueStore};

/// Current and best score for the session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreLedger {
    current: u64,
    best: u64,
    new_record: bool,
}

impl ScoreLedger {
    pub fn new(best: u64) -> Self {
        Self {
            current: 0,
            best,
            new_record: false,
        }
    }

    /// Start a ledger from the persisted best score
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let best = store.get_int(BEST_SCORE_KEY, 0).max(0) as u64;
        log::info!("Best score loaded: {}", best);
        Self::new(best)
    }

    pub fn add(&mut self, points: u64) {
        self.current = self.current.saturating_add(points);
        log::debug!("Score +{} = {}", points, self.current);
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn best(&self) -> u64 {
        self.best
    }

    /// The last `check_record` raised the best score
    pub fn is_new_record(&self) -> bool {
        self.new_record
    }

    /// Raise the best score if the current one beats it, and persist it.
    /// A storage failure keeps the in-memory best.
    pub fn check_record(&mut self, store: &mut dyn KeyValueStore) -> bool {
        if self.current <= self.best {
            self.new_record = false;
            return false;
        }

        self.best = self.current;
        self.new_record = true;
        log::info!("New best score: {}", self.best);

        store.set_int(BEST_SCORE_KEY, self.best.min(i64::MAX as u64) as i64);
        if let Err(e) = store.flush() {
            log::warn!("Failed to save best score: {}", e);
        }
        true
    }

    /// Zero the current score for a new round; the best is kept
    pub fn reset(&mut self) {
        self.current = 0;
        self.new_record = false;
    }
}
