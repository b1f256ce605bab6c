//! Persistence boundary of the scheduler.
//!
//! The scheduler only talks to [`PracticeStore`]. Two implementations ship
//! with the crate:
//! - [`MemoryStore`] keeps everything in process, used by tests and guest
//!   sessions that never persist;
//! - [`SqliteStore`] keeps stats, cycle counters and the attempt log in a
//!   local SQLite database.
//!
//! Every stats mutation goes through [`PracticeStore::record_attempt`], which
//! must apply the upsert and the attempt log entry atomically.

pub mod memory;
pub mod migrations;
pub mod sqlite;

pub use memory::MemoryStore;
pub use migrations::run_migrations;
pub use sqlite::SqliteStore;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::content::PhraseCard;
use crate::services::progress::StatsDelta;
use crate::types::{
    AttemptRecord, CycleCounter, Domain, ItemKey, ItemStats, LexicalKind, PracticeItem, ScopeKey,
    StatsKey, StatsSummary, UserKey,
};

// ============================================================
// Errors
// ============================================================

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("data not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

// ============================================================
// PracticeStore
// ============================================================

pub trait PracticeStore: Send + Sync {
    /// Lexical items of one kind. With a scope that has a registered item
    /// subset only that subset is returned.
    fn load_candidate_items(
        &self,
        kind: LexicalKind,
        scope: Option<ScopeKey>,
    ) -> StorageResult<Vec<PracticeItem>>;

    fn load_item(&self, kind: LexicalKind, item: ItemKey) -> StorageResult<Option<PracticeItem>>;

    /// Whether `item` belongs to the scope's subset. Scopes without a
    /// registered subset contain every item.
    fn scope_contains(&self, scope: ScopeKey, kind: LexicalKind, item: ItemKey) -> StorageResult<bool>;

    fn load_phrase_cards(&self) -> StorageResult<Vec<PhraseCard>>;

    fn load_phrase_card(&self, id: ItemKey) -> StorageResult<Option<PhraseCard>>;

    /// Stats rows for the requested items; items without history are absent.
    fn load_stats(
        &self,
        user: UserKey,
        domain: Domain,
        scope: Option<ScopeKey>,
        items: &[ItemKey],
    ) -> StorageResult<HashMap<ItemKey, ItemStats>>;

    /// Atomic upsert of the stats row plus the audit entry. On error nothing
    /// is applied.
    fn record_attempt(
        &self,
        key: &StatsKey,
        delta: &StatsDelta,
        record: &AttemptRecord,
    ) -> StorageResult<ItemStats>;

    fn cycle_counter(
        &self,
        user: UserKey,
        domain: Domain,
        scope: Option<ScopeKey>,
    ) -> StorageResult<CycleCounter>;

    fn increment_cycle_counter(
        &self,
        user: UserKey,
        domain: Domain,
        scope: Option<ScopeKey>,
        at: DateTime<Utc>,
    ) -> StorageResult<CycleCounter>;

    fn aggregate(
        &self,
        user: UserKey,
        domain: Domain,
        scope: Option<ScopeKey>,
    ) -> StorageResult<StatsSummary>;

    /// Every stats row of the user in the domain, ordered by item key.
    fn list_stats(
        &self,
        user: UserKey,
        domain: Domain,
        scope: Option<ScopeKey>,
    ) -> StorageResult<Vec<(ItemKey, ItemStats)>>;

    /// Newest first.
    fn recent_attempts(
        &self,
        user: UserKey,
        domain: Domain,
        scope: Option<ScopeKey>,
        limit: usize,
    ) -> StorageResult<Vec<AttemptRecord>>;
}
