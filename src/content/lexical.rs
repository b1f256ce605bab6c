//! Stored vocabulary items: nouns with article and irregular verb forms.

use crate::error::{PracticeError, PracticeResult};
use crate::types::{AnswerSlot, ItemKey, LexicalKind, PracticeItem};

pub const NOUN_LABELS: [&str; 1] = ["člen + samostalnik"];
pub const VERB_LABELS: [&str; 4] = ["infinitiv", "3. oseba ednine", "preterit", "perfekt"];

pub fn default_labels(kind: LexicalKind) -> &'static [&'static str] {
    match kind {
        LexicalKind::Noun => &NOUN_LABELS,
        LexicalKind::Verb => &VERB_LABELS,
    }
}

/// Pairs solutions with labels. Without explicit labels the kind's default
/// labels are used, which then must match the solution count.
pub fn lexical_slots(
    kind: LexicalKind,
    labels: Option<Vec<String>>,
    solutions: Vec<String>,
) -> PracticeResult<Vec<AnswerSlot>> {
    let labels = match labels {
        Some(labels) if !labels.is_empty() => labels,
        _ => default_labels(kind).iter().map(|l| l.to_string()).collect(),
    };

    if labels.len() != solutions.len() {
        return Err(PracticeError::invalid(format!(
            "{} item has {} labels but {} solutions",
            kind.as_str(),
            labels.len(),
            solutions.len()
        )));
    }

    Ok(labels
        .into_iter()
        .zip(solutions)
        .map(|(label, solution)| AnswerSlot { label, solution })
        .collect())
}

pub fn lexical_item(
    kind: LexicalKind,
    key: ItemKey,
    prompt: impl Into<String>,
    labels: Option<Vec<String>>,
    solutions: Vec<String>,
) -> PracticeResult<PracticeItem> {
    Ok(PracticeItem::new(key, prompt, lexical_slots(kind, labels, solutions)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_get_four_default_labels() {
        let slots = lexical_slots(
            LexicalKind::Verb,
            None,
            vec!["gehen".into(), "geht".into(), "ging".into(), "ist gegangen".into()],
        )
        .unwrap();
        assert_eq!(slots.len(), 4);
        assert_eq!(slots[2], AnswerSlot::new("preterit", "ging"));
    }

    #[test]
    fn explicit_labels_win() {
        let slots = lexical_slots(
            LexicalKind::Noun,
            Some(vec!["samostalnik".into(), "množina".into()]),
            vec!["der Hund".into(), "die Hunde".into()],
        )
        .unwrap();
        assert_eq!(slots[1].label, "množina");
    }

    #[test]
    fn builds_noun_item() {
        let item = lexical_item(LexicalKind::Noun, 8, "pes", None, vec!["der Hund".into()]).unwrap();
        assert_eq!(item.prompt, "pes");
        assert_eq!(item.labels(), vec!["člen + samostalnik"]);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = lexical_slots(LexicalKind::Noun, None, vec!["der Hund".into(), "die Hunde".into()]);
        assert!(err.unwrap_err().is_invalid_input());
    }
}
