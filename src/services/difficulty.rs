use chrono::{DateTime, Utc};

use crate::types::ItemStats;

const UNSEEN_DIFFICULTY: f64 = 5.0;
const MIN_DIFFICULTY: f64 = 0.1;
const BASE_DIFFICULTY: f64 = 1.0;
const INACCURACY_WEIGHT: f64 = 4.0;
const STREAK_CAP: u32 = 6;
const STREAK_BONUS: f64 = 0.25;
const REVEAL_CAP: u32 = 5;
const REVEAL_PENALTY: f64 = 0.15;
const STALENESS_DAYS: f64 = 4.0;
const UNPARSEABLE_SEEN_PENALTY: f64 = 0.2;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Scalar difficulty used to order and tie-break cycle items. Higher means
/// the learner is more likely to need the item; never below 0.1.
pub fn item_difficulty(stats: &ItemStats, now: DateTime<Utc>) -> f64 {
    if stats.attempts == 0 {
        return UNSEEN_DIFFICULTY;
    }

    let accuracy = stats.accuracy();
    let mut difficulty = BASE_DIFFICULTY + (1.0 - accuracy) * INACCURACY_WEIGHT;
    difficulty -= f64::from(stats.correct_streak.min(STREAK_CAP)) * STREAK_BONUS;
    difficulty += f64::from(stats.reveals.min(REVEAL_CAP)) * REVEAL_PENALTY;
    if let Some(ref seen) = stats.last_seen_at {
        difficulty += staleness(seen, now);
    }

    difficulty.max(MIN_DIFFICULTY)
}

/// Same as [`item_difficulty`] for an item with no stored history.
pub fn difficulty_or_unseen(stats: Option<&ItemStats>, now: DateTime<Utc>) -> f64 {
    stats.map_or(UNSEEN_DIFFICULTY, |s| item_difficulty(s, now))
}

fn staleness(seen: &str, now: DateTime<Utc>) -> f64 {
    match DateTime::parse_from_rfc3339(seen) {
        Ok(seen) => {
            let elapsed = now.signed_duration_since(seen.with_timezone(&Utc));
            let days = elapsed.num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY;
            (days / STALENESS_DAYS).clamp(0.0, 1.0)
        }
        Err(err) => {
            tracing::warn!(last_seen = %seen, error = %err, "unparseable last_seen timestamp");
            UNPARSEABLE_SEEN_PENALTY
        }
    }
}
