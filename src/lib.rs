//! Practice-cycle scheduler for a German vocabulary trainer.
//!
//! Given a learner's history it decides which items the next practice cycle
//! contains, in what order, and whether selection is biased toward items the
//! learner struggles with. Answers are scored against canonical solutions
//! and fed back into per-item statistics.
//!
//! ```no_run
//! use vaja_core::{Config, CycleParams, Domain, PracticeScheduler, SqliteStore, UserKey};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env();
//! let _guard = vaja_core::logging::init_tracing(&config.log_level);
//!
//! let store = SqliteStore::from_config(&config)?;
//! let scheduler = PracticeScheduler::new(store, config.scheduler.clone());
//! let cycle = scheduler.start_cycle(UserKey(1), Domain::Number, None, &CycleParams::default())?;
//! println!("{} items, adaptive: {}", cycle.items().len(), cycle.adaptive());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod content;
pub mod error;
pub mod logging;
pub mod services;
pub mod storage;
pub mod types;

pub use config::{Config, SchedulerConfig};
pub use error::{PracticeError, PracticeResult};
pub use services::{
    AnswerOutcome, CycleParams, CyclePlan, CycleStart, ItemResult, PlannedItem, PracticeScheduler,
    SubmitAnswer, UserStats,
};
pub use storage::{MemoryStore, PracticeStore, SqliteStore, StorageError, StorageResult};
pub use types::{
    AnswerSlot, AttemptRecord, CycleCounter, Domain, ItemKey, ItemStats, LastResult, LexicalKind,
    PracticeItem, ScopeKey, StatsKey, StatsSummary, UserKey,
};
