use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AttemptRecord, CycleCounter, Domain, ItemKey, ItemStats, LastResult, ScopeKey, UserKey};

/// Outcome of one answered item after reveal handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptOutcome {
    pub effective_correct: bool,
    pub revealed: bool,
    pub last_result: LastResult,
}

impl AttemptOutcome {
    /// Revealing the solution forfeits credit even when the learner's own
    /// answer matched.
    pub fn classify(raw_correct: bool, revealed: bool) -> Self {
        let effective_correct = raw_correct && !revealed;
        let last_result = if effective_correct {
            LastResult::Correct
        } else if revealed {
            LastResult::Revealed
        } else {
            LastResult::Wrong
        };
        Self {
            effective_correct,
            revealed,
            last_result,
        }
    }
}

/// Increment applied to a stats row in a single read-modify-write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsDelta {
    pub correct: u32,
    pub wrong: u32,
    pub reveals: u32,
    pub last_result: LastResult,
    pub seen_at: String,
}

impl StatsDelta {
    pub fn from_outcome(outcome: &AttemptOutcome, now: DateTime<Utc>) -> Self {
        Self {
            correct: u32::from(outcome.effective_correct),
            wrong: u32::from(!outcome.effective_correct),
            reveals: u32::from(outcome.revealed),
            last_result: outcome.last_result,
            seen_at: format_timestamp(now),
        }
    }

    pub fn is_correct(&self) -> bool {
        self.last_result == LastResult::Correct
    }
}

/// Applies `delta` to a prior row (`None` for the first attempt). Stores that
/// cannot express the update in SQL use this under their own lock.
pub fn apply_delta(prior: Option<&ItemStats>, delta: &StatsDelta) -> ItemStats {
    let prior = prior.cloned().unwrap_or_default();
    ItemStats {
        attempts: prior.attempts + 1,
        correct: prior.correct + delta.correct,
        wrong: prior.wrong + delta.wrong,
        reveals: prior.reveals + delta.reveals,
        correct_streak: if delta.is_correct() {
            prior.correct_streak + 1
        } else {
            0
        },
        last_result: delta.last_result,
        last_seen_at: Some(delta.seen_at.clone()),
    }
}

pub fn advance_cycle(prior: &CycleCounter, now: DateTime<Utc>) -> CycleCounter {
    CycleCounter {
        cycles_completed: prior.cycles_completed + 1,
        last_cycle_at: Some(format_timestamp(now)),
    }
}

pub struct AttemptInput<'a> {
    pub user: UserKey,
    pub domain: Domain,
    pub item: ItemKey,
    pub scope: Option<ScopeKey>,
    pub answers: &'a [String],
    pub cycle_number: u32,
}

pub fn attempt_record(input: &AttemptInput<'_>, outcome: &AttemptOutcome, now: DateTime<Utc>) -> AttemptRecord {
    AttemptRecord {
        id: uuid::Uuid::new_v4().to_string(),
        user: input.user,
        domain: input.domain,
        item: input.item,
        scope: input.scope,
        asked_at: format_timestamp(now),
        was_correct: outcome.effective_correct,
        was_revealed: outcome.revealed,
        answers: input.answers.to_vec(),
        cycle_number: input.cycle_number,
    }
}

pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}
