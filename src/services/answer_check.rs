use serde::{Deserialize, Serialize};

use crate::types::Domain;

/// Normalization switches for one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerCheckOptions {
    pub allow_umlaut_fallback: bool,
    pub collapse_spaces: bool,
}

impl Default for AnswerCheckOptions {
    fn default() -> Self {
        Self {
            allow_umlaut_fallback: false,
            collapse_spaces: true,
        }
    }
}

impl AnswerCheckOptions {
    /// Fixed per-domain policy; callers cannot override it.
    pub fn for_domain(domain: Domain) -> Self {
        match domain {
            Domain::Lexical(_) => Self {
                allow_umlaut_fallback: false,
                collapse_spaces: true,
            },
            Domain::Number => Self {
                allow_umlaut_fallback: true,
                collapse_spaces: false,
            },
            Domain::Phrase => Self {
                allow_umlaut_fallback: true,
                collapse_spaces: true,
            },
        }
    }
}

pub fn normalize_answer(value: &str, options: AnswerCheckOptions) -> String {
    let mut cleaned = value.trim().to_lowercase().replace('ß', "ss");
    if options.collapse_spaces {
        cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    }
    if options.allow_umlaut_fallback {
        cleaned = cleaned
            .replace('ä', "ae")
            .replace('ö', "oe")
            .replace('ü', "ue");
    }
    cleaned
}

/// Positional comparison of normalized answers. Both sides go through the
/// same normalization; a length mismatch is a mismatch.
pub fn check_answers<A, S>(answers: &[A], solutions: &[S], options: AnswerCheckOptions) -> bool
where
    A: AsRef<str>,
    S: AsRef<str>,
{
    answers.len() == solutions.len()
        && answers
            .iter()
            .zip(solutions)
            .all(|(a, s)| normalize_answer(a.as_ref(), options) == normalize_answer(s.as_ref(), options))
}

/// Pads missing trailing answers with empty strings so a partially answered
/// item is scored, and scored wrong.
pub fn pad_answers(answers: &[String], slots: usize) -> Vec<String> {
    let mut padded = answers.to_vec();
    if padded.len() < slots {
        padded.resize(slots, String::new());
    }
    padded
}
