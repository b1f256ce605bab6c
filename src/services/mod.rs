pub mod adaptivity;
pub mod answer_check;
pub mod composer;
pub mod difficulty;
pub mod progress;
pub mod session;

pub use adaptivity::{selection_mode, SelectionMode};
pub use answer_check::{check_answers, normalize_answer, AnswerCheckOptions};
pub use composer::{compose_cycle, CompositionPolicy, CycleTarget, FinalOrder, ScoredCandidate};
pub use difficulty::item_difficulty;
pub use session::{
    AnswerOutcome, CycleParams, CyclePlan, CycleStart, ItemResult, PlannedItem, PracticeScheduler,
    SubmitAnswer, UserStats,
};
