//! Practice scheduler: the entry point callers use to start, answer and
//! complete practice cycles.
//!
//! The scheduler owns no state besides its RNG. History lives in the
//! [`PracticeStore`]; candidates come from the store (lexical items, phrase
//! cards) or are generated (numbers).

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{SchedulerConfig, NUMBER_MAX_LIMIT};
use crate::content::{
    candidate_phrases, number_item, phrase_item, CardMode, GrammaticalCase,
    Level, NumberComponent, NumberRange, PhraseFilter,
};
use crate::error::{PracticeError, PracticeResult};
use crate::services::adaptivity::{selection_mode, SelectionMode};
use crate::services::answer_check::{check_answers, pad_answers, AnswerCheckOptions};
use crate::services::composer::{compose_cycle, CompositionPolicy, ScoredCandidate};
use crate::services::difficulty::{difficulty_or_unseen, item_difficulty};
use crate::services::progress::{attempt_record, AttemptInput, AttemptOutcome, StatsDelta};
use crate::storage::PracticeStore;
use crate::types::{
    CycleCounter, Domain, ItemKey, ItemStats, LexicalKind, PracticeItem, ScopeKey, StatsKey,
    StatsSummary, UserKey,
};

// ============================================================
// Requests and responses
// ============================================================

/// Candidate filters for one cycle. Fields that do not apply to the
/// requested domain are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CycleParams {
    pub include_solutions: bool,
    /// Bounded domains only; defaults come from [`SchedulerConfig`].
    pub cycle_size: Option<usize>,
    /// Number domain: inclusive upper bound.
    pub ceiling: Option<i64>,
    pub components: Option<Vec<NumberComponent>>,
    pub levels: Option<Vec<Level>>,
    pub modes: Option<Vec<CardMode>>,
    pub cases: Option<Vec<GrammaticalCase>>,
    /// Defaults to `true`.
    pub include_plural: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedItem {
    pub key: ItemKey,
    pub prompt: String,
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solutions: Option<Vec<String>>,
    pub attempts: u32,
    pub accuracy: f64,
    pub correct_streak: u32,
    pub difficulty: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CyclePlan {
    pub items: Vec<PlannedItem>,
    pub adaptive: bool,
    pub cycle_number: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum CycleStart {
    Ready(CyclePlan),
    /// Valid request, but no item passed the filters.
    #[serde(rename_all = "camelCase")]
    NothingToPractice { adaptive: bool, cycle_number: u32 },
}

impl CycleStart {
    pub fn adaptive(&self) -> bool {
        match self {
            Self::Ready(plan) => plan.adaptive,
            Self::NothingToPractice { adaptive, .. } => *adaptive,
        }
    }

    pub fn cycle_number(&self) -> u32 {
        match self {
            Self::Ready(plan) => plan.cycle_number,
            Self::NothingToPractice { cycle_number, .. } => *cycle_number,
        }
    }

    pub fn items(&self) -> &[PlannedItem] {
        match self {
            Self::Ready(plan) => &plan.items,
            Self::NothingToPractice { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswer {
    pub user: UserKey,
    pub domain: Domain,
    pub item: ItemKey,
    #[serde(default)]
    pub scope: Option<ScopeKey>,
    #[serde(default)]
    pub answers: Vec<String>,
    #[serde(default)]
    pub revealed: bool,
    /// Defaults to the cycle in progress (completed cycles + 1).
    #[serde(default)]
    pub cycle_number: Option<u32>,
    #[serde(default)]
    pub show_solution: bool,
}

impl SubmitAnswer {
    pub fn new(user: UserKey, domain: Domain, item: ItemKey, answers: Vec<String>) -> Self {
        Self {
            user,
            domain,
            item,
            scope: None,
            answers,
            revealed: false,
            cycle_number: None,
            show_solution: false,
        }
    }

    pub fn in_scope(mut self, scope: ScopeKey) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn revealed(mut self) -> Self {
        self.revealed = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    /// Credit after reveal handling.
    pub correct: bool,
    pub revealed: bool,
    /// Present when the solution was revealed or explicitly requested.
    pub solution: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub summary: StatsSummary,
    pub accuracy: f64,
    pub cycle_count: u32,
    pub last_cycle_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub item: ItemKey,
    pub stats: ItemStats,
    pub accuracy: f64,
    pub difficulty: f64,
}

// ============================================================
// PracticeScheduler
// ============================================================

pub struct PracticeScheduler<S, R = StdRng> {
    store: S,
    config: SchedulerConfig,
    rng: Mutex<R>,
}

impl<S: PracticeStore> PracticeScheduler<S, StdRng> {
    pub fn new(store: S, config: SchedulerConfig) -> Self {
        Self::with_rng(store, config, StdRng::from_entropy())
    }
}

impl<S, R> PracticeScheduler<S, R>
where
    S: PracticeStore,
    R: Rng,
{
    pub fn with_rng(store: S, config: SchedulerConfig, rng: R) -> Self {
        Self {
            store,
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Composes the next cycle. Parameters are validated before anything is
    /// read from the store.
    pub fn start_cycle(
        &self,
        user: UserKey,
        domain: Domain,
        scope: Option<ScopeKey>,
        params: &CycleParams,
    ) -> PracticeResult<CycleStart> {
        if params.cycle_size == Some(0) {
            return Err(PracticeError::invalid("cycle size must be positive"));
        }
        let pool = self.candidates(domain, scope, params)?;

        let (counter, summary) = self.history(user, domain, scope)?;
        let mode = selection_mode(counter.cycles_completed, &summary, &self.config);
        let adaptive = mode.is_adaptive();
        let cycle_number = counter.cycles_completed + 1;

        if pool.is_empty() {
            tracing::info!(user = %user, domain = %domain, cycle_number, "nothing to practice");
            return Ok(CycleStart::NothingToPractice {
                adaptive,
                cycle_number,
            });
        }

        let pool_size = pool.len();
        let policy = CompositionPolicy::for_domain(domain, params.cycle_size, &self.config);
        let selected = match pool {
            CandidatePool::Items(items) => {
                let keys: Vec<ItemKey> = items.iter().map(|item| item.key).collect();
                let stats = if user.is_anonymous() {
                    HashMap::new()
                } else {
                    self.store.load_stats(user, domain, scope, &keys)?
                };
                self.compose(items, |item| item.key, stats, mode, &policy)
            }
            CandidatePool::Numbers(values) => {
                let stats = if user.is_anonymous() {
                    HashMap::new()
                } else {
                    self.store.list_stats(user, domain, scope)?.into_iter().collect()
                };
                self.compose(values, |value| ItemKey::from(*value), stats, mode, &policy)
                    .into_iter()
                    .map(|candidate| {
                        Ok(ScoredCandidate {
                            item: number_item(candidate.item)?,
                            stats: candidate.stats,
                            difficulty: candidate.difficulty,
                        })
                    })
                    .collect::<PracticeResult<Vec<_>>>()?
            }
        };

        tracing::info!(
            user = %user,
            domain = %domain,
            adaptive,
            cycle_number,
            pool = pool_size,
            selected = selected.len(),
            "cycle composed"
        );

        let items = selected
            .into_iter()
            .map(|candidate| planned_item(candidate, params.include_solutions))
            .collect();

        Ok(CycleStart::Ready(CyclePlan {
            items,
            adaptive,
            cycle_number,
        }))
    }

    /// Scores one answer and records it. Anonymous submissions are scored
    /// but never written.
    pub fn submit_answer(&self, submission: &SubmitAnswer) -> PracticeResult<AnswerOutcome> {
        let item = self.resolve_item(submission.domain, submission.item, submission.scope)?;
        let solutions = item.solutions();
        let answers = pad_answers(&submission.answers, solutions.len());
        let raw_correct = check_answers(
            &answers,
            &solutions,
            AnswerCheckOptions::for_domain(submission.domain),
        );
        let outcome = AttemptOutcome::classify(raw_correct, submission.revealed);

        if submission.user.is_anonymous() {
            tracing::debug!(domain = %submission.domain, item = submission.item, "anonymous answer not recorded");
        } else {
            self.record(submission, &answers, &outcome)?;
        }

        let solution = (submission.revealed || submission.show_solution).then_some(solutions);
        Ok(AnswerOutcome {
            correct: outcome.effective_correct,
            revealed: outcome.revealed,
            solution,
        })
    }

    /// Marks the current cycle as finished. No-op for anonymous users.
    pub fn complete_cycle(
        &self,
        user: UserKey,
        domain: Domain,
        scope: Option<ScopeKey>,
    ) -> PracticeResult<CycleCounter> {
        if user.is_anonymous() {
            return Ok(CycleCounter::default());
        }
        let counter = self
            .store
            .increment_cycle_counter(user, domain, scope, Utc::now())?;
        tracing::info!(user = %user, domain = %domain, cycles = counter.cycles_completed, "cycle completed");
        Ok(counter)
    }

    pub fn user_stats(
        &self,
        user: UserKey,
        domain: Domain,
        scope: Option<ScopeKey>,
    ) -> PracticeResult<UserStats> {
        let (counter, summary) = self.history(user, domain, scope)?;
        Ok(UserStats {
            accuracy: summary.accuracy(),
            summary,
            cycle_count: counter.cycles_completed,
            last_cycle_at: counter.last_cycle_at,
        })
    }

    /// Per-item history ordered by item key.
    pub fn item_results(
        &self,
        user: UserKey,
        domain: Domain,
        scope: Option<ScopeKey>,
    ) -> PracticeResult<Vec<ItemResult>> {
        if user.is_anonymous() {
            return Ok(Vec::new());
        }
        let now = Utc::now();
        Ok(self
            .store
            .list_stats(user, domain, scope)?
            .into_iter()
            .map(|(item, stats)| ItemResult {
                item,
                accuracy: stats.accuracy(),
                difficulty: difficulty_or_unseen(Some(&stats), now),
                stats,
            })
            .collect())
    }

    // ========== helpers ==========

    fn history(
        &self,
        user: UserKey,
        domain: Domain,
        scope: Option<ScopeKey>,
    ) -> PracticeResult<(CycleCounter, StatsSummary)> {
        if user.is_anonymous() {
            return Ok((CycleCounter::default(), StatsSummary::default()));
        }
        let counter = self.store.cycle_counter(user, domain, scope)?;
        let summary = self.store.aggregate(user, domain, scope)?;
        Ok((counter, summary))
    }

    fn candidates(
        &self,
        domain: Domain,
        scope: Option<ScopeKey>,
        params: &CycleParams,
    ) -> PracticeResult<CandidatePool> {
        match domain {
            Domain::Lexical(kind) => Ok(CandidatePool::Items(
                self.store.load_candidate_items(kind, scope)?,
            )),
            Domain::Number => {
                let ceiling = params
                    .ceiling
                    .unwrap_or(i64::from(self.config.number_default_max));
                let range = NumberRange::new(ceiling, params.components.clone())?;
                Ok(CandidatePool::Numbers(range.values().collect()))
            }
            Domain::Phrase => {
                let filter = PhraseFilter::resolve(
                    params.levels.clone(),
                    params.modes.clone(),
                    params.cases.clone(),
                    params.include_plural.unwrap_or(true),
                )?;
                Ok(CandidatePool::Items(candidate_phrases(
                    &self.store.load_phrase_cards()?,
                    &filter,
                )?))
            }
        }
    }

    /// Scores `pool` against the learner's stats and composes the cycle.
    fn compose<T>(
        &self,
        pool: Vec<T>,
        key: impl Fn(&T) -> ItemKey,
        mut stats: HashMap<ItemKey, ItemStats>,
        mode: SelectionMode,
        policy: &CompositionPolicy,
    ) -> Vec<ScoredCandidate<T>> {
        let now = Utc::now();
        let scored: Vec<ScoredCandidate<T>> = pool
            .into_iter()
            .map(|item| {
                let stats = stats.remove(&key(&item)).unwrap_or_default();
                let difficulty = item_difficulty(&stats, now);
                ScoredCandidate {
                    item,
                    stats,
                    difficulty,
                }
            })
            .collect();

        let mut rng = self.rng.lock();
        compose_cycle(scored, mode, policy, &self.config, &mut *rng)
    }

    fn resolve_item(
        &self,
        domain: Domain,
        item: ItemKey,
        scope: Option<ScopeKey>,
    ) -> PracticeResult<PracticeItem> {
        match domain {
            Domain::Number => {
                let value = u32::try_from(item)
                    .ok()
                    .filter(|v| *v <= NUMBER_MAX_LIMIT)
                    .ok_or_else(|| PracticeError::invalid(format!("number {item} is out of range")))?;
                number_item(value)
            }
            Domain::Phrase => match self.store.load_phrase_card(item)? {
                Some(card) => phrase_item(&card),
                None => Err(PracticeError::ItemNotFound { domain, item }),
            },
            Domain::Lexical(kind) => {
                let Some(found) = self.store.load_item(kind, item)? else {
                    let other = match kind {
                        LexicalKind::Noun => LexicalKind::Verb,
                        LexicalKind::Verb => LexicalKind::Noun,
                    };
                    if self.store.load_item(other, item)?.is_some() {
                        return Err(PracticeError::invalid(format!(
                            "item {item} is a {}, not a {}",
                            other.as_str(),
                            kind.as_str()
                        )));
                    }
                    return Err(PracticeError::ItemNotFound { domain, item });
                };
                if let Some(scope) = scope {
                    if !self.store.scope_contains(scope, kind, item)? {
                        return Err(PracticeError::invalid(format!(
                            "item {item} is not part of scope {scope}"
                        )));
                    }
                }
                Ok(found)
            }
        }
    }

    fn record(
        &self,
        submission: &SubmitAnswer,
        answers: &[String],
        outcome: &AttemptOutcome,
    ) -> PracticeResult<()> {
        let (user, domain, scope) = (submission.user, submission.domain, submission.scope);
        let cycle_number = match submission.cycle_number {
            Some(number) => number,
            None => self.store.cycle_counter(user, domain, scope)?.cycles_completed + 1,
        };

        let now = Utc::now();
        let key = StatsKey {
            user,
            domain,
            item: submission.item,
            scope,
        };
        let input = AttemptInput {
            user,
            domain,
            item: submission.item,
            scope,
            answers,
            cycle_number,
        };
        let delta = StatsDelta::from_outcome(outcome, now);
        let record = attempt_record(&input, outcome, now);

        match self.store.record_attempt(&key, &delta, &record) {
            Ok(stats) => {
                tracing::debug!(
                    user = %user,
                    domain = %domain,
                    item = submission.item,
                    result = outcome.last_result.as_str(),
                    streak = stats.correct_streak,
                    "attempt recorded"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(user = %user, domain = %domain, item = submission.item, error = %e, "failed to record attempt");
                Err(e.into())
            }
        }
    }
}

/// Lexical items and phrase cards arrive fully built. Numbers stay plain
/// integers until selected, so only the chosen ones get spelled.
enum CandidatePool {
    Items(Vec<PracticeItem>),
    Numbers(Vec<u32>),
}

impl CandidatePool {
    fn len(&self) -> usize {
        match self {
            Self::Items(items) => items.len(),
            Self::Numbers(values) => values.len(),
        }
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn planned_item(candidate: ScoredCandidate<PracticeItem>, include_solutions: bool) -> PlannedItem {
    let ScoredCandidate {
        item,
        stats,
        difficulty,
    } = candidate;
    PlannedItem {
        key: item.key,
        labels: item.labels(),
        solutions: include_solutions.then(|| item.solutions()),
        prompt: item.prompt,
        attempts: stats.attempts,
        accuracy: stats.accuracy(),
        correct_streak: stats.correct_streak,
        difficulty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::lexical_item;
    use crate::storage::MemoryStore;
    use rand_chacha::ChaCha8Rng;

    fn scheduler() -> PracticeScheduler<MemoryStore, ChaCha8Rng> {
        let store = MemoryStore::new();
        for (key, prompt, noun) in [(1, "pes", "der Hund"), (2, "mačka", "die Katze"), (3, "hiša", "das Haus")] {
            store.insert_item(
                LexicalKind::Noun,
                lexical_item(LexicalKind::Noun, key, prompt, None, vec![noun.to_string()]).unwrap(),
            );
        }
        PracticeScheduler::with_rng(store, SchedulerConfig::default(), ChaCha8Rng::seed_from_u64(11))
    }

    #[test]
    fn zero_cycle_size_is_rejected() {
        let params = CycleParams {
            cycle_size: Some(0),
            ..Default::default()
        };
        let err = scheduler().start_cycle(UserKey(1), Domain::Number, None, &params).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn lexical_cycle_contains_whole_pool() {
        let start = scheduler()
            .start_cycle(UserKey(1), Domain::NOUN, None, &CycleParams::default())
            .unwrap();
        assert_eq!(start.items().len(), 3);
        assert_eq!(start.cycle_number(), 1);
        assert!(!start.adaptive());
        assert!(start.items().iter().all(|item| item.solutions.is_none()));
    }

    #[test]
    fn empty_pool_is_nothing_to_practice() {
        let start = scheduler()
            .start_cycle(UserKey(1), Domain::VERB, None, &CycleParams::default())
            .unwrap();
        assert!(matches!(start, CycleStart::NothingToPractice { cycle_number: 1, .. }));
    }

    #[test]
    fn both_cycle_outcomes_use_camel_case_fields() {
        let scheduler = scheduler();
        let empty = scheduler
            .start_cycle(UserKey(1), Domain::VERB, None, &CycleParams::default())
            .unwrap();
        let ready = scheduler
            .start_cycle(UserKey(1), Domain::NOUN, None, &CycleParams::default())
            .unwrap();

        let empty = serde_json::to_value(&empty).unwrap();
        assert_eq!(empty["status"], "nothingToPractice");
        assert_eq!(empty["cycleNumber"], 1);
        assert!(empty.get("cycle_number").is_none());

        let ready = serde_json::to_value(&ready).unwrap();
        assert_eq!(ready["status"], "ready");
        assert_eq!(ready["cycleNumber"], 1);

        let back: CycleStart = serde_json::from_value(empty).unwrap();
        assert!(matches!(back, CycleStart::NothingToPractice { adaptive: false, cycle_number: 1 }));
    }

    #[test]
    fn number_cycle_at_the_hard_limit_spells_only_the_selection() {
        let params = CycleParams {
            include_solutions: true,
            ceiling: Some(i64::from(NUMBER_MAX_LIMIT)),
            ..Default::default()
        };
        let start = scheduler().start_cycle(UserKey(1), Domain::Number, None, &params).unwrap();
        let items = start.items();
        assert_eq!(items.len(), SchedulerConfig::default().number_cycle_size);
        for item in items {
            let value = u32::try_from(item.key).unwrap();
            assert!(value <= NUMBER_MAX_LIMIT);
            assert_eq!(item.prompt, value.to_string());
            assert_eq!(item.solutions, Some(vec![crate::content::number_to_german(value).unwrap()]));
            assert_eq!(item.difficulty, 5.0);
        }
    }

    #[test]
    fn revealed_answer_returns_solution_and_no_credit() {
        let scheduler = scheduler();
        let outcome = scheduler
            .submit_answer(&SubmitAnswer::new(UserKey(1), Domain::NOUN, 1, vec!["der Hund".into()]).revealed())
            .unwrap();
        assert!(!outcome.correct);
        assert_eq!(outcome.solution, Some(vec!["der Hund".to_string()]));

        let results = scheduler.item_results(UserKey(1), Domain::NOUN, None).unwrap();
        assert_eq!(results[0].stats.reveals, 1);
        assert_eq!(results[0].stats.wrong, 1);
    }

    #[test]
    fn wrong_kind_is_invalid_and_unknown_item_is_not_found() {
        let scheduler = scheduler();
        let err = scheduler
            .submit_answer(&SubmitAnswer::new(UserKey(1), Domain::VERB, 1, vec![]))
            .unwrap_err();
        assert!(err.is_invalid_input());

        let err = scheduler
            .submit_answer(&SubmitAnswer::new(UserKey(1), Domain::NOUN, 99, vec![]))
            .unwrap_err();
        assert!(matches!(err, PracticeError::ItemNotFound { item: 99, .. }));
    }

    #[test]
    fn number_out_of_range_is_rejected() {
        let err = scheduler()
            .submit_answer(&SubmitAnswer::new(UserKey(1), Domain::Number, -1, vec![]))
            .unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn partial_answer_is_scored_wrong() {
        let scheduler = scheduler();
        let outcome = scheduler
            .submit_answer(&SubmitAnswer::new(UserKey(1), Domain::Number, 21, vec![]))
            .unwrap();
        assert!(!outcome.correct);
        assert_eq!(outcome.solution, None);

        let outcome = scheduler
            .submit_answer(&SubmitAnswer::new(UserKey(1), Domain::Number, 21, vec!["Einundzwanzig ".into()]))
            .unwrap();
        assert!(outcome.correct);
    }
}
