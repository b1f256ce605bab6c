use serde::{Deserialize, Serialize};

use crate::config::SchedulerConfig;
use crate::types::StatsSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectionMode {
    Uniform,
    Adaptive,
}

impl SelectionMode {
    pub fn is_adaptive(self) -> bool {
        matches!(self, Self::Adaptive)
    }
}

/// Chooses the mode for the next cycle from the number of cycles completed
/// so far (before this one) and the learner's aggregate history.
///
/// New learners get uniform exposure; a learner graduates to adaptive review
/// either by completing enough cycles or by showing high accuracy over a
/// meaningful sample.
pub fn selection_mode(
    cycles_completed: u32,
    history: &StatsSummary,
    config: &SchedulerConfig,
) -> SelectionMode {
    let cycle_index = u64::from(cycles_completed) + 1;
    let seasoned = cycle_index > u64::from(config.adaptive_after_cycles);
    let proven = history.attempts >= config.min_attempts_for_adaptive
        && history.accuracy() >= config.high_accuracy;

    if seasoned || proven {
        SelectionMode::Adaptive
    } else {
        SelectionMode::Uniform
    }
}
