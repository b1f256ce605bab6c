use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::content::PhraseCard;
use crate::services::progress::{advance_cycle, apply_delta, StatsDelta};
use crate::storage::{PracticeStore, StorageError, StorageResult};
use crate::types::{
    AttemptRecord, CycleCounter, Domain, ItemKey, ItemStats, LexicalKind, PracticeItem, ScopeKey,
    StatsKey, StatsSummary, UserKey,
};

type CounterKey = (UserKey, Domain, Option<ScopeKey>);

#[derive(Default)]
struct MemoryState {
    items: HashMap<LexicalKind, BTreeMap<ItemKey, PracticeItem>>,
    scope_items: HashMap<(ScopeKey, LexicalKind), HashSet<ItemKey>>,
    phrase_cards: BTreeMap<ItemKey, PhraseCard>,
    stats: HashMap<StatsKey, ItemStats>,
    counters: HashMap<CounterKey, CycleCounter>,
    attempts: Vec<AttemptRecord>,
}

/// In-process store. One mutex guards all state, so `record_attempt` is a
/// single critical section.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_item(&self, kind: LexicalKind, item: PracticeItem) {
        self.state
            .lock()
            .items
            .entry(kind)
            .or_default()
            .insert(item.key, item);
    }

    pub fn insert_phrase_card(&self, card: PhraseCard) {
        self.state.lock().phrase_cards.insert(card.id, card);
    }

    pub fn assign_scope_items(&self, scope: ScopeKey, kind: LexicalKind, items: &[ItemKey]) {
        self.state
            .lock()
            .scope_items
            .entry((scope, kind))
            .or_default()
            .extend(items.iter().copied());
    }

    /// Makes subsequent writes fail, for exercising the error path.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

fn matches(key: &StatsKey, user: UserKey, domain: Domain, scope: Option<ScopeKey>) -> bool {
    key.user == user && key.domain == domain && key.scope == scope
}

impl PracticeStore for MemoryStore {
    fn load_candidate_items(
        &self,
        kind: LexicalKind,
        scope: Option<ScopeKey>,
    ) -> StorageResult<Vec<PracticeItem>> {
        let state = self.state.lock();
        let Some(items) = state.items.get(&kind) else {
            return Ok(Vec::new());
        };
        let subset = scope.and_then(|s| state.scope_items.get(&(s, kind)));
        Ok(items
            .values()
            .filter(|item| subset.map_or(true, |set| set.contains(&item.key)))
            .cloned()
            .collect())
    }

    fn load_item(&self, kind: LexicalKind, item: ItemKey) -> StorageResult<Option<PracticeItem>> {
        Ok(self
            .state
            .lock()
            .items
            .get(&kind)
            .and_then(|items| items.get(&item))
            .cloned())
    }

    fn scope_contains(&self, scope: ScopeKey, kind: LexicalKind, item: ItemKey) -> StorageResult<bool> {
        Ok(self
            .state
            .lock()
            .scope_items
            .get(&(scope, kind))
            .map_or(true, |set| set.contains(&item)))
    }

    fn load_phrase_cards(&self) -> StorageResult<Vec<PhraseCard>> {
        Ok(self.state.lock().phrase_cards.values().cloned().collect())
    }

    fn load_phrase_card(&self, id: ItemKey) -> StorageResult<Option<PhraseCard>> {
        Ok(self.state.lock().phrase_cards.get(&id).cloned())
    }

    fn load_stats(
        &self,
        user: UserKey,
        domain: Domain,
        scope: Option<ScopeKey>,
        items: &[ItemKey],
    ) -> StorageResult<HashMap<ItemKey, ItemStats>> {
        let state = self.state.lock();
        Ok(items
            .iter()
            .filter_map(|&item| {
                let key = StatsKey {
                    user,
                    domain,
                    item,
                    scope,
                };
                state.stats.get(&key).map(|s| (item, s.clone()))
            })
            .collect())
    }

    fn record_attempt(
        &self,
        key: &StatsKey,
        delta: &StatsDelta,
        record: &AttemptRecord,
    ) -> StorageResult<ItemStats> {
        let mut state = self.state.lock();
        self.check_writable()?;

        let updated = apply_delta(state.stats.get(key), delta);
        state.stats.insert(*key, updated.clone());
        state.attempts.push(record.clone());
        Ok(updated)
    }

    fn cycle_counter(
        &self,
        user: UserKey,
        domain: Domain,
        scope: Option<ScopeKey>,
    ) -> StorageResult<CycleCounter> {
        Ok(self
            .state
            .lock()
            .counters
            .get(&(user, domain, scope))
            .cloned()
            .unwrap_or_default())
    }

    fn increment_cycle_counter(
        &self,
        user: UserKey,
        domain: Domain,
        scope: Option<ScopeKey>,
        at: DateTime<Utc>,
    ) -> StorageResult<CycleCounter> {
        let mut state = self.state.lock();
        self.check_writable()?;

        let counter = state.counters.entry((user, domain, scope)).or_default();
        *counter = advance_cycle(counter, at);
        Ok(counter.clone())
    }

    fn aggregate(
        &self,
        user: UserKey,
        domain: Domain,
        scope: Option<ScopeKey>,
    ) -> StorageResult<StatsSummary> {
        let state = self.state.lock();
        Ok(state
            .stats
            .iter()
            .filter(|(key, _)| matches(key, user, domain, scope))
            .fold(StatsSummary::default(), |mut acc, (_, s)| {
                acc.attempts += u64::from(s.attempts);
                acc.correct += u64::from(s.correct);
                acc.wrong += u64::from(s.wrong);
                acc.reveals += u64::from(s.reveals);
                acc
            }))
    }

    fn list_stats(
        &self,
        user: UserKey,
        domain: Domain,
        scope: Option<ScopeKey>,
    ) -> StorageResult<Vec<(ItemKey, ItemStats)>> {
        let state = self.state.lock();
        let mut rows: Vec<_> = state
            .stats
            .iter()
            .filter(|(key, _)| matches(key, user, domain, scope))
            .map(|(key, s)| (key.item, s.clone()))
            .collect();
        rows.sort_by_key(|(item, _)| *item);
        Ok(rows)
    }

    fn recent_attempts(
        &self,
        user: UserKey,
        domain: Domain,
        scope: Option<ScopeKey>,
        limit: usize,
    ) -> StorageResult<Vec<AttemptRecord>> {
        let state = self.state.lock();
        Ok(state
            .attempts
            .iter()
            .rev()
            .filter(|r| r.user == user && r.domain == domain && r.scope == scope)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::progress::{attempt_record, AttemptInput, AttemptOutcome};
    use crate::types::AnswerSlot;

    fn key(item: ItemKey, scope: Option<ScopeKey>) -> StatsKey {
        StatsKey {
            user: UserKey(1),
            domain: Domain::NOUN,
            item,
            scope,
        }
    }

    fn record(store: &MemoryStore, key: &StatsKey, correct: bool) -> StorageResult<ItemStats> {
        let now = Utc::now();
        let outcome = AttemptOutcome::classify(correct, false);
        let input = AttemptInput {
            user: key.user,
            domain: key.domain,
            item: key.item,
            scope: key.scope,
            answers: &[],
            cycle_number: 1,
        };
        store.record_attempt(
            key,
            &StatsDelta::from_outcome(&outcome, now),
            &attempt_record(&input, &outcome, now),
        )
    }

    #[test]
    fn scoped_stats_are_separate() {
        let store = MemoryStore::new();
        record(&store, &key(1, None), true).unwrap();
        record(&store, &key(1, Some(ScopeKey(9))), false).unwrap();

        let global = store.aggregate(UserKey(1), Domain::NOUN, None).unwrap();
        let scoped = store.aggregate(UserKey(1), Domain::NOUN, Some(ScopeKey(9))).unwrap();
        assert_eq!((global.attempts, global.correct), (1, 1));
        assert_eq!((scoped.attempts, scoped.wrong), (1, 1));
    }

    #[test]
    fn failed_write_leaves_stats_untouched() {
        let store = MemoryStore::new();
        let k = key(5, None);
        let before = record(&store, &k, true).unwrap();

        store.set_fail_writes(true);
        assert!(matches!(record(&store, &k, false), Err(StorageError::Unavailable(_))));
        store.set_fail_writes(false);

        let after = store.load_stats(UserKey(1), Domain::NOUN, None, &[5]).unwrap();
        assert_eq!(after.get(&5), Some(&before));
        assert_eq!(store.recent_attempts(UserKey(1), Domain::NOUN, None, 10).unwrap().len(), 1);
    }

    #[test]
    fn scope_subset_restricts_candidates() {
        let store = MemoryStore::new();
        for key in 1..=3 {
            store.insert_item(
                LexicalKind::Noun,
                PracticeItem::new(key, format!("item {key}"), vec![AnswerSlot::new("a", "b")]),
            );
        }
        store.assign_scope_items(ScopeKey(2), LexicalKind::Noun, &[1, 3]);

        let all = store.load_candidate_items(LexicalKind::Noun, Some(ScopeKey(1))).unwrap();
        let subset = store.load_candidate_items(LexicalKind::Noun, Some(ScopeKey(2))).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(subset.iter().map(|i| i.key).collect::<Vec<_>>(), vec![1, 3]);
        assert!(!store.scope_contains(ScopeKey(2), LexicalKind::Noun, 2).unwrap());
        assert!(store.scope_contains(ScopeKey(1), LexicalKind::Noun, 2).unwrap());
    }

    #[test]
    fn counters_increment_independently() {
        let store = MemoryStore::new();
        store.increment_cycle_counter(UserKey(1), Domain::Number, None, Utc::now()).unwrap();
        store.increment_cycle_counter(UserKey(1), Domain::Number, None, Utc::now()).unwrap();
        assert_eq!(store.cycle_counter(UserKey(1), Domain::Number, None).unwrap().cycles_completed, 2);
        assert_eq!(store.cycle_counter(UserKey(1), Domain::Phrase, None).unwrap().cycles_completed, 0);
    }
}
