//! Per-execution counters kept by every main loop, mirrored into the
//! global Prometheus metrics.

use aerie_telemetry::{BAGS_COMPLETED, BAGS_FETCHED, BAGS_FILTERED, LOOP_TERMINATIONS};
use serde::{Deserialize, Serialize};

use crate::chain::ChainOutcome;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopStats {
    /// Bags pulled from the source.
    pub fetched: u64,
    /// Bags that went through every module they were routed to.
    pub completed: u64,
    /// Bags dropped by a `Filter` result.
    pub filtered: u64,
    /// Whether a module ended the loop with `Terminate`.
    pub terminated: bool,
}

impl LoopStats {
    pub(crate) fn record_fetch(&mut self) {
        self.fetched += 1;
        BAGS_FETCHED.inc();
    }

    pub(crate) fn record_outcome(&mut self, outcome: &ChainOutcome) {
        match outcome {
            ChainOutcome::Completed => {
                self.completed += 1;
                BAGS_COMPLETED.inc();
            }
            ChainOutcome::Filtered { .. } => {
                self.filtered += 1;
                BAGS_FILTERED.inc();
            }
            ChainOutcome::Terminated { .. } => {
                self.terminated = true;
                LOOP_TERMINATIONS.inc();
            }
        }
    }
}
