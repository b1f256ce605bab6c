use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::config::Config;
use crate::content::PhraseCard;
use crate::services::progress::{format_timestamp, StatsDelta};
use crate::storage::{migrations, PracticeStore, StorageResult};
use crate::types::{
    AnswerSlot, AttemptRecord, CycleCounter, Domain, ItemKey, ItemStats, LastResult, LexicalKind,
    PracticeItem, ScopeKey, StatsKey, StatsSummary, UserKey,
};

const STATS_COLUMNS: &str =
    "item_id, attempts, correct, wrong, reveals, correct_streak, last_result, last_seen_at";

const UPSERT_STATS: &str = r#"
    INSERT INTO item_stats (
        user_id, domain, item_id, scoped, scope_id,
        attempts, correct, wrong, reveals, correct_streak, last_result, last_seen_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7, ?8, ?9, ?10, ?11)
    ON CONFLICT (user_id, domain, item_id, scoped, scope_id) DO UPDATE SET
        attempts = attempts + 1,
        correct = correct + excluded.correct,
        wrong = wrong + excluded.wrong,
        reveals = reveals + excluded.reveals,
        correct_streak = CASE WHEN excluded.correct_streak > 0 THEN correct_streak + 1 ELSE 0 END,
        last_result = excluded.last_result,
        last_seen_at = excluded.last_seen_at
"#;

/// SQLite-backed store. The connection is shared behind a mutex; every
/// multi-statement write runs in a transaction.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database file, enables WAL and runs migrations.
    pub fn new<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA busy_timeout=5000;",
        )?;
        Self::from_connection(conn)
    }

    pub fn from_config(config: &Config) -> StorageResult<Self> {
        Self::new(&config.db_path)
    }

    pub fn in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        let version = migrations::run_migrations(&conn)?;
        tracing::debug!(schema_version = version, "sqlite store ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` inside a transaction; an error rolls everything back.
    pub fn transaction<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> StorageResult<T>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    // ========== Content authoring ==========

    pub fn insert_item(&self, kind: LexicalKind, item: &PracticeItem) -> StorageResult<()> {
        let slots = serde_json::to_string(&item.slots)?;
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO lexical_items (kind, id, prompt, slots_json) VALUES (?1, ?2, ?3, ?4)",
            params![kind.as_str(), item.key, item.prompt, slots],
        )?;
        Ok(())
    }

    pub fn insert_phrase_card(&self, card: &PhraseCard) -> StorageResult<()> {
        let json = serde_json::to_string(card)?;
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO phrase_cards (id, card_json) VALUES (?1, ?2)",
            params![card.id, json],
        )?;
        Ok(())
    }

    pub fn assign_scope_items(&self, scope: ScopeKey, kind: LexicalKind, items: &[ItemKey]) -> StorageResult<()> {
        self.transaction(|conn| {
            let mut stmt = conn.prepare(
                "INSERT OR IGNORE INTO scope_items (scope_id, kind, item_id) VALUES (?1, ?2, ?3)",
            )?;
            for item in items {
                stmt.execute(params![scope.0, kind.as_str(), item])?;
            }
            Ok(())
        })
    }
}

// ============================================================
// Row helpers
// ============================================================

fn scope_columns(scope: Option<ScopeKey>) -> (bool, i64) {
    match scope {
        Some(scope) => (true, scope.0),
        None => (false, 0),
    }
}

fn conversion_error(index: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, message.into())
}

fn domain_at(row: &Row<'_>, index: usize) -> rusqlite::Result<Domain> {
    let tag: String = row.get(index)?;
    Domain::from_str(&tag).ok_or_else(|| conversion_error(index, format!("unknown domain {tag}")))
}

fn json_at<T: serde::de::DeserializeOwned>(row: &Row<'_>, index: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(index)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(index, e.to_string()))
}

/// Expects [`STATS_COLUMNS`] order.
fn stats_from_row(row: &Row<'_>) -> rusqlite::Result<(ItemKey, ItemStats)> {
    let last_result: String = row.get(6)?;
    Ok((
        row.get(0)?,
        ItemStats {
            attempts: row.get(1)?,
            correct: row.get(2)?,
            wrong: row.get(3)?,
            reveals: row.get(4)?,
            correct_streak: row.get(5)?,
            last_result: LastResult::from_str(&last_result),
            last_seen_at: row.get(7)?,
        },
    ))
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<PracticeItem> {
    let slots: Vec<AnswerSlot> = json_at(row, 2)?;
    Ok(PracticeItem::new(row.get(0)?, row.get::<_, String>(1)?, slots))
}

fn attempt_from_row(row: &Row<'_>) -> rusqlite::Result<AttemptRecord> {
    let scoped: bool = row.get(4)?;
    let scope_id: i64 = row.get(5)?;
    Ok(AttemptRecord {
        id: row.get(0)?,
        user: UserKey(row.get(1)?),
        domain: domain_at(row, 2)?,
        item: row.get(3)?,
        scope: scoped.then_some(ScopeKey(scope_id)),
        asked_at: row.get(6)?,
        was_correct: row.get(7)?,
        was_revealed: row.get(8)?,
        answers: json_at(row, 9)?,
        cycle_number: row.get(10)?,
    })
}

fn read_stats(
    conn: &Connection,
    key: &StatsKey,
) -> StorageResult<Option<ItemStats>> {
    let (scoped, scope_id) = scope_columns(key.scope);
    let stats = conn
        .query_row(
            &format!(
                "SELECT {STATS_COLUMNS} FROM item_stats
                 WHERE user_id = ?1 AND domain = ?2 AND item_id = ?3 AND scoped = ?4 AND scope_id = ?5"
            ),
            params![key.user.0, key.domain.as_str(), key.item, scoped, scope_id],
            stats_from_row,
        )
        .optional()?;
    Ok(stats.map(|(_, s)| s))
}

fn read_counter(conn: &Connection, user: UserKey, domain: Domain, scope: Option<ScopeKey>) -> StorageResult<CycleCounter> {
    let (scoped, scope_id) = scope_columns(scope);
    let counter = conn
        .query_row(
            "SELECT cycles_completed, last_cycle_at FROM cycle_counters
             WHERE user_id = ?1 AND domain = ?2 AND scoped = ?3 AND scope_id = ?4",
            params![user.0, domain.as_str(), scoped, scope_id],
            |row| {
                Ok(CycleCounter {
                    cycles_completed: row.get(0)?,
                    last_cycle_at: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(counter.unwrap_or_default())
}

// ============================================================
// PracticeStore
// ============================================================

impl PracticeStore for SqliteStore {
    fn load_candidate_items(
        &self,
        kind: LexicalKind,
        scope: Option<ScopeKey>,
    ) -> StorageResult<Vec<PracticeItem>> {
        let conn = self.conn.lock();

        let restricted = match scope {
            Some(scope) => conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM scope_items WHERE scope_id = ?1 AND kind = ?2)",
                params![scope.0, kind.as_str()],
                |row| row.get::<_, bool>(0),
            )?,
            None => false,
        };

        let items = if let (true, Some(scope)) = (restricted, scope) {
            let mut stmt = conn.prepare(
                "SELECT i.id, i.prompt, i.slots_json FROM lexical_items i
                 JOIN scope_items s ON s.kind = i.kind AND s.item_id = i.id
                 WHERE i.kind = ?1 AND s.scope_id = ?2
                 ORDER BY i.id",
            )?;
            let rows = stmt.query_map(params![kind.as_str(), scope.0], item_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        } else {
            let mut stmt = conn.prepare(
                "SELECT id, prompt, slots_json FROM lexical_items WHERE kind = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![kind.as_str()], item_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        Ok(items)
    }

    fn load_item(&self, kind: LexicalKind, item: ItemKey) -> StorageResult<Option<PracticeItem>> {
        let conn = self.conn.lock();
        let item = conn
            .query_row(
                "SELECT id, prompt, slots_json FROM lexical_items WHERE kind = ?1 AND id = ?2",
                params![kind.as_str(), item],
                item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    fn scope_contains(&self, scope: ScopeKey, kind: LexicalKind, item: ItemKey) -> StorageResult<bool> {
        let conn = self.conn.lock();
        let (registered, member): (i64, bool) = conn.query_row(
            "SELECT COUNT(*), COALESCE(MAX(item_id = ?3), 0) FROM scope_items
             WHERE scope_id = ?1 AND kind = ?2",
            params![scope.0, kind.as_str(), item],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(registered == 0 || member)
    }

    fn load_phrase_cards(&self) -> StorageResult<Vec<PhraseCard>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT card_json FROM phrase_cards ORDER BY id")?;
        let cards = stmt
            .query_map([], |row| json_at(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cards)
    }

    fn load_phrase_card(&self, id: ItemKey) -> StorageResult<Option<PhraseCard>> {
        let conn = self.conn.lock();
        let card = conn
            .query_row(
                "SELECT card_json FROM phrase_cards WHERE id = ?1",
                params![id],
                |row| json_at(row, 0),
            )
            .optional()?;
        Ok(card)
    }

    fn load_stats(
        &self,
        user: UserKey,
        domain: Domain,
        scope: Option<ScopeKey>,
        items: &[ItemKey],
    ) -> StorageResult<HashMap<ItemKey, ItemStats>> {
        if items.is_empty() {
            return Ok(HashMap::new());
        }
        let wanted: HashSet<ItemKey> = items.iter().copied().collect();
        Ok(self
            .list_stats(user, domain, scope)?
            .into_iter()
            .filter(|(item, _)| wanted.contains(item))
            .collect())
    }

    fn record_attempt(
        &self,
        key: &StatsKey,
        delta: &StatsDelta,
        record: &AttemptRecord,
    ) -> StorageResult<ItemStats> {
        let (scoped, scope_id) = scope_columns(key.scope);
        let answers = serde_json::to_string(&record.answers)?;

        self.transaction(|conn| {
            conn.execute(
                UPSERT_STATS,
                params![
                    key.user.0,
                    key.domain.as_str(),
                    key.item,
                    scoped,
                    scope_id,
                    delta.correct,
                    delta.wrong,
                    delta.reveals,
                    u32::from(delta.is_correct()),
                    delta.last_result.as_str(),
                    delta.seen_at,
                ],
            )?;

            conn.execute(
                "INSERT INTO attempts (
                    id, user_id, domain, item_id, scoped, scope_id, asked_at,
                    was_correct, was_revealed, answers_json, cycle_number
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.id,
                    record.user.0,
                    record.domain.as_str(),
                    record.item,
                    scoped,
                    scope_id,
                    record.asked_at,
                    record.was_correct,
                    record.was_revealed,
                    answers,
                    record.cycle_number,
                ],
            )?;

            read_stats(conn, key)?.ok_or_else(|| {
                crate::storage::StorageError::NotFound(format!("stats row for item {}", key.item))
            })
        })
    }

    fn cycle_counter(
        &self,
        user: UserKey,
        domain: Domain,
        scope: Option<ScopeKey>,
    ) -> StorageResult<CycleCounter> {
        read_counter(&self.conn.lock(), user, domain, scope)
    }

    fn increment_cycle_counter(
        &self,
        user: UserKey,
        domain: Domain,
        scope: Option<ScopeKey>,
        at: DateTime<Utc>,
    ) -> StorageResult<CycleCounter> {
        let (scoped, scope_id) = scope_columns(scope);
        self.transaction(|conn| {
            conn.execute(
                "INSERT INTO cycle_counters (user_id, domain, scoped, scope_id, cycles_completed, last_cycle_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5)
                 ON CONFLICT (user_id, domain, scoped, scope_id) DO UPDATE SET
                     cycles_completed = cycles_completed + 1,
                     last_cycle_at = excluded.last_cycle_at",
                params![user.0, domain.as_str(), scoped, scope_id, format_timestamp(at)],
            )?;
            read_counter(conn, user, domain, scope)
        })
    }

    fn aggregate(
        &self,
        user: UserKey,
        domain: Domain,
        scope: Option<ScopeKey>,
    ) -> StorageResult<StatsSummary> {
        let (scoped, scope_id) = scope_columns(scope);
        let conn = self.conn.lock();
        let (attempts, correct, wrong, reveals): (i64, i64, i64, i64) = conn.query_row(
            "SELECT COALESCE(SUM(attempts), 0), COALESCE(SUM(correct), 0),
                    COALESCE(SUM(wrong), 0), COALESCE(SUM(reveals), 0)
             FROM item_stats
             WHERE user_id = ?1 AND domain = ?2 AND scoped = ?3 AND scope_id = ?4",
            params![user.0, domain.as_str(), scoped, scope_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;
        Ok(StatsSummary {
            attempts: attempts.max(0) as u64,
            correct: correct.max(0) as u64,
            wrong: wrong.max(0) as u64,
            reveals: reveals.max(0) as u64,
        })
    }

    fn list_stats(
        &self,
        user: UserKey,
        domain: Domain,
        scope: Option<ScopeKey>,
    ) -> StorageResult<Vec<(ItemKey, ItemStats)>> {
        let (scoped, scope_id) = scope_columns(scope);
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {STATS_COLUMNS} FROM item_stats
             WHERE user_id = ?1 AND domain = ?2 AND scoped = ?3 AND scope_id = ?4
             ORDER BY item_id"
        ))?;
        let rows = stmt
            .query_map(params![user.0, domain.as_str(), scoped, scope_id], stats_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn recent_attempts(
        &self,
        user: UserKey,
        domain: Domain,
        scope: Option<ScopeKey>,
        limit: usize,
    ) -> StorageResult<Vec<AttemptRecord>> {
        let (scoped, scope_id) = scope_columns(scope);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, domain, item_id, scoped, scope_id, asked_at,
                    was_correct, was_revealed, answers_json, cycle_number
             FROM attempts
             WHERE user_id = ?1 AND domain = ?2 AND scoped = ?3 AND scope_id = ?4
             ORDER BY asked_at DESC, rowid DESC
             LIMIT ?5",
        )?;
        let rows = stmt
            .query_map(params![user.0, domain.as_str(), scoped, scope_id, limit], attempt_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::progress::{attempt_record, AttemptInput, AttemptOutcome};

    fn record(store: &SqliteStore, key: &StatsKey, raw_correct: bool, revealed: bool) -> StorageResult<ItemStats> {
        let now = Utc::now();
        let outcome = AttemptOutcome::classify(raw_correct, revealed);
        let answers = vec!["der Hund".to_string()];
        let input = AttemptInput {
            user: key.user,
            domain: key.domain,
            item: key.item,
            scope: key.scope,
            answers: &answers,
            cycle_number: 3,
        };
        store.record_attempt(
            key,
            &StatsDelta::from_outcome(&outcome, now),
            &attempt_record(&input, &outcome, now),
        )
    }

    fn noun_key(item: ItemKey) -> StatsKey {
        StatsKey {
            user: UserKey(7),
            domain: Domain::NOUN,
            item,
            scope: None,
        }
    }

    #[test]
    fn upsert_tracks_counts_and_streak() {
        let store = SqliteStore::in_memory().unwrap();
        let key = noun_key(1);

        record(&store, &key, true, false).unwrap();
        let stats = record(&store, &key, true, false).unwrap();
        assert_eq!((stats.attempts, stats.correct, stats.correct_streak), (2, 2, 2));

        let stats = record(&store, &key, true, true).unwrap();
        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.wrong, 1);
        assert_eq!(stats.reveals, 1);
        assert_eq!(stats.correct_streak, 0);
        assert_eq!(stats.last_result, LastResult::Revealed);
        assert_eq!(stats.attempts, stats.correct + stats.wrong);
    }

    #[test]
    fn attempts_are_logged_newest_first() {
        let store = SqliteStore::in_memory().unwrap();
        record(&store, &noun_key(1), true, false).unwrap();
        record(&store, &noun_key(2), false, false).unwrap();

        let log = store.recent_attempts(UserKey(7), Domain::NOUN, None, 10).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].item, 2);
        assert_eq!(log[0].answers, vec!["der Hund"]);
        assert_eq!(log[0].cycle_number, 3);
    }

    #[test]
    fn failed_log_insert_rolls_back_stats() {
        let store = SqliteStore::in_memory().unwrap();
        let key = noun_key(4);
        let before = record(&store, &key, true, false).unwrap();

        store
            .transaction(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER reject_attempts BEFORE INSERT ON attempts
                     BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
                )?;
                Ok(())
            })
            .unwrap();

        assert!(record(&store, &key, false, false).is_err());
        let after = store.load_stats(UserKey(7), Domain::NOUN, None, &[4]).unwrap();
        assert_eq!(after.get(&4), Some(&before));
    }

    #[test]
    fn content_round_trips() {
        let store = SqliteStore::in_memory().unwrap();
        let item = PracticeItem::new(3, "pes", vec![AnswerSlot::new("člen + samostalnik", "der Hund")]);
        store.insert_item(LexicalKind::Noun, &item).unwrap();
        store.insert_item(LexicalKind::Noun, &PracticeItem::new(4, "mačka", vec![])).unwrap();
        store.assign_scope_items(ScopeKey(1), LexicalKind::Noun, &[3]).unwrap();

        assert_eq!(store.load_item(LexicalKind::Noun, 3).unwrap(), Some(item));
        assert_eq!(store.load_item(LexicalKind::Verb, 3).unwrap(), None);
        assert_eq!(store.load_candidate_items(LexicalKind::Noun, None).unwrap().len(), 2);
        assert_eq!(store.load_candidate_items(LexicalKind::Noun, Some(ScopeKey(1))).unwrap().len(), 1);
        assert_eq!(store.load_candidate_items(LexicalKind::Noun, Some(ScopeKey(2))).unwrap().len(), 2);
        assert!(!store.scope_contains(ScopeKey(1), LexicalKind::Noun, 4).unwrap());
        assert!(store.scope_contains(ScopeKey(2), LexicalKind::Noun, 4).unwrap());
    }

    #[test]
    fn cycle_counter_upserts() {
        let store = SqliteStore::in_memory().unwrap();
        let scope = Some(ScopeKey(5));
        assert_eq!(store.cycle_counter(UserKey(1), Domain::VERB, scope).unwrap().cycles_completed, 0);
        store.increment_cycle_counter(UserKey(1), Domain::VERB, scope, Utc::now()).unwrap();
        let counter = store.increment_cycle_counter(UserKey(1), Domain::VERB, scope, Utc::now()).unwrap();
        assert_eq!(counter.cycles_completed, 2);
        assert!(counter.last_cycle_at.is_some());
        assert_eq!(store.cycle_counter(UserKey(1), Domain::VERB, None).unwrap().cycles_completed, 0);
    }
}
