//! Session-scoped reward counters.

use serde::{Deserialize, Serialize};
use tracing::debug;
use twostep_core::TrialMeta;

/// Cumulative and per-block reward, owned by the session and lent to each
/// trial.
///
/// Resets only happen through the boundary methods, which the trial calls
/// before anything reads the counters for that trial.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningTotals {
    session_total: i64,
    block_total: i64,
}

impl RunningTotals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_session(&mut self) {
        debug!(previous = self.session_total, "session total reset");
        self.session_total = 0;
    }

    pub fn begin_block(&mut self) {
        debug!(previous = self.block_total, "block total reset");
        self.block_total = 0;
    }

    /// Applies the resets implied by the trial's position: trial 1 of any
    /// list starts a block, trial 1 of block 1 also starts the session.
    pub fn observe_trial_start(&mut self, meta: &TrialMeta) {
        if meta.starts_block() {
            self.begin_block();
        }
        if meta.starts_session() {
            self.begin_session();
        }
    }

    /// Counts a resolved outcome. Practice rewards show on the block
    /// counter but never reach the session total.
    pub fn record(&mut self, outcome: i64, practice: bool) {
        self.block_total = self.block_total.saturating_add(outcome);
        if !practice {
            self.session_total = self.session_total.saturating_add(outcome);
        }
    }

    pub fn session_total(&self) -> i64 {
        self.session_total
    }

    pub fn block_total(&self) -> i64 {
        self.block_total
    }
}
