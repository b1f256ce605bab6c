use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================
// Keys
// ============================================================

/// Learner key. Non-positive values identify the anonymous guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserKey(pub i64);

impl UserKey {
    pub const ANONYMOUS: UserKey = UserKey(0);

    pub fn is_anonymous(self) -> bool {
        self.0 <= 0
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Item key. In the number domain the key is the number itself.
pub type ItemKey = i64;

/// Collection-version key. Statistics under a scope are tracked apart from
/// the unscoped ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeKey(pub i64);

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================
// Domains
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LexicalKind {
    Noun,
    Verb,
}

impl LexicalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Noun => "noun",
            Self::Verb => "verb",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Lexical(LexicalKind),
    Number,
    Phrase,
}

impl Domain {
    pub const NOUN: Domain = Domain::Lexical(LexicalKind::Noun);
    pub const VERB: Domain = Domain::Lexical(LexicalKind::Verb);

    /// Stable storage tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lexical(kind) => kind.as_str(),
            Self::Number => "number",
            Self::Phrase => "family",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "noun" => Some(Self::NOUN),
            "verb" => Some(Self::VERB),
            "number" => Some(Self::Number),
            "family" | "phrase" => Some(Self::Phrase),
            _ => None,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================
// PracticeItem
// ============================================================

/// One expected answer: the label shown to the learner and the canonical
/// solution for that slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSlot {
    pub label: String,
    pub solution: String,
}

impl AnswerSlot {
    pub fn new(label: impl Into<String>, solution: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            solution: solution.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeItem {
    pub key: ItemKey,
    pub prompt: String,
    pub slots: Vec<AnswerSlot>,
}

impl PracticeItem {
    pub fn new(key: ItemKey, prompt: impl Into<String>, slots: Vec<AnswerSlot>) -> Self {
        Self {
            key,
            prompt: prompt.into(),
            slots,
        }
    }

    pub fn labels(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.label.clone()).collect()
    }

    pub fn solutions(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.solution.clone()).collect()
    }
}

// ============================================================
// Statistics
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LastResult {
    #[default]
    None,
    Correct,
    Wrong,
    Revealed,
}

impl LastResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Correct => "correct",
            Self::Wrong => "wrong",
            Self::Revealed => "revealed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "correct" => Self::Correct,
            "wrong" => Self::Wrong,
            "revealed" => Self::Revealed,
            _ => Self::None,
        }
    }
}

/// Per user x item (x scope) performance.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStats {
    pub attempts: u32,
    pub correct: u32,
    pub wrong: u32,
    pub reveals: u32,
    pub correct_streak: u32,
    pub last_result: LastResult,
    /// RFC 3339 as stored; parsing happens at scoring time.
    pub last_seen_at: Option<String>,
}

impl ItemStats {
    pub fn accuracy(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        f64::from(self.attempts.saturating_sub(self.wrong)) / f64::from(self.attempts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatsKey {
    pub user: UserKey,
    pub domain: Domain,
    pub item: ItemKey,
    pub scope: Option<ScopeKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleCounter {
    pub cycles_completed: u32,
    pub last_cycle_at: Option<String>,
}

/// Aggregated history of one user over a domain (and scope).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub attempts: u64,
    pub correct: u64,
    pub wrong: u64,
    pub reveals: u64,
}

impl StatsSummary {
    pub fn accuracy(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.correct as f64 / self.attempts as f64
        }
    }
}

/// Audit row for one answered (or revealed) item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub id: String,
    pub user: UserKey,
    pub domain: Domain,
    pub item: ItemKey,
    pub scope: Option<ScopeKey>,
    pub asked_at: String,
    pub was_correct: bool,
    pub was_revealed: bool,
    pub answers: Vec<String>,
    pub cycle_number: u32,
}
