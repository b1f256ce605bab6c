use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::SchedulerConfig;
use crate::services::adaptivity::SelectionMode;
use crate::types::{Domain, ItemStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CycleTarget {
    /// Every candidate is eligible every cycle.
    Unbounded,
    Bounded(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FinalOrder {
    Shuffle,
    HardestFirst,
}

/// Quota and ordering rules for one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionPolicy {
    pub target: CycleTarget,
    /// Order applied to an adaptive selection. Uniform cycles are always
    /// random.
    pub final_order: FinalOrder,
}

impl CompositionPolicy {
    pub fn unbounded() -> Self {
        Self {
            target: CycleTarget::Unbounded,
            final_order: FinalOrder::HardestFirst,
        }
    }

    pub fn bounded_exact(size: usize) -> Self {
        Self {
            target: CycleTarget::Bounded(size),
            final_order: FinalOrder::Shuffle,
        }
    }

    pub fn bounded_sorted(size: usize) -> Self {
        Self {
            target: CycleTarget::Bounded(size),
            final_order: FinalOrder::HardestFirst,
        }
    }

    /// Lexical items use the whole pool, numbers shuffle a fixed-size cycle,
    /// phrase cards present a fixed-size cycle hardest first.
    pub fn for_domain(domain: Domain, cycle_size: Option<usize>, config: &SchedulerConfig) -> Self {
        match domain {
            Domain::Lexical(_) => Self::unbounded(),
            Domain::Number => Self::bounded_exact(cycle_size.unwrap_or(config.number_cycle_size)),
            Domain::Phrase => Self::bounded_sorted(cycle_size.unwrap_or(config.phrase_cycle_size)),
        }
    }
}

/// A candidate item with the statistics snapshot it is judged by.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate<T> {
    pub item: T,
    pub stats: ItemStats,
    pub difficulty: f64,
}

pub fn is_hard(stats: &ItemStats, config: &SchedulerConfig) -> bool {
    stats.attempts == 0
        || stats.accuracy() < config.high_accuracy
        || stats.correct_streak < config.easy_min_streak
}

fn easy_quota(pool_size: usize, fraction: f64) -> usize {
    ((pool_size as f64 * fraction).floor() as usize).max(1)
}

/// Produces the ordered items of one cycle. Pure apart from `rng`.
pub fn compose_cycle<T, R>(
    mut candidates: Vec<ScoredCandidate<T>>,
    mode: SelectionMode,
    policy: &CompositionPolicy,
    config: &SchedulerConfig,
    rng: &mut R,
) -> Vec<ScoredCandidate<T>>
where
    R: Rng + ?Sized,
{
    if candidates.is_empty() {
        return candidates;
    }

    candidates.shuffle(rng);

    let selection = match policy.target {
        CycleTarget::Unbounded => {
            if !mode.is_adaptive() {
                return candidates;
            }
            select_unbounded(candidates, config)
        }
        CycleTarget::Bounded(size) => {
            let target = size.min(candidates.len());
            if !mode.is_adaptive() {
                candidates.truncate(target);
                return candidates;
            }
            select_bounded(candidates, target, config)
        }
    };

    finish(selection, policy.final_order, rng)
}

fn partition<T>(
    candidates: Vec<ScoredCandidate<T>>,
    config: &SchedulerConfig,
) -> (Vec<ScoredCandidate<T>>, Vec<ScoredCandidate<T>>) {
    candidates
        .into_iter()
        .partition(|candidate| is_hard(&candidate.stats, config))
}

/// `candidates` arrive shuffled, so taking prefixes draws at random.
fn select_unbounded<T>(
    candidates: Vec<ScoredCandidate<T>>,
    config: &SchedulerConfig,
) -> Vec<ScoredCandidate<T>> {
    let keep_easy = easy_quota(candidates.len(), config.easy_review_fraction);
    let (mut hard, mut easy) = partition(candidates, config);
    easy.truncate(keep_easy);

    tracing::debug!(hard = hard.len(), easy = easy.len(), "unbounded adaptive selection");
    hard.append(&mut easy);
    hard
}

fn select_bounded<T>(
    candidates: Vec<ScoredCandidate<T>>,
    target: usize,
    config: &SchedulerConfig,
) -> Vec<ScoredCandidate<T>> {
    let easy_quota = easy_quota(target, config.easy_review_fraction);
    let hard_quota = target.saturating_sub(easy_quota);
    let (hard, easy) = partition(candidates, config);

    let hard_taken = hard_quota.min(hard.len());
    let easy_taken = easy_quota.min(easy.len());

    let mut hard = hard.into_iter();
    let mut easy = easy.into_iter();
    let mut selected: Vec<_> = hard
        .by_ref()
        .take(hard_taken)
        .chain(easy.by_ref().take(easy_taken))
        .collect();

    if selected.len() < target {
        let missing = target - selected.len();
        selected.extend(hard.chain(easy).take(missing));
    }

    tracing::debug!(
        target_size = target,
        hard_quota,
        easy_quota,
        hard_taken,
        easy_taken,
        selected = selected.len(),
        "bounded adaptive selection"
    );
    selected
}

fn finish<T, R>(
    mut selection: Vec<ScoredCandidate<T>>,
    order: FinalOrder,
    rng: &mut R,
) -> Vec<ScoredCandidate<T>>
where
    R: Rng + ?Sized,
{
    match order {
        FinalOrder::Shuffle => selection.shuffle(rng),
        FinalOrder::HardestFirst => {
            selection.sort_by(|a, b| b.difficulty.total_cmp(&a.difficulty));
        }
    }
    selection
}
