//! Candidate shaping per domain. These only decide which items enter the
//! pool and what their answers are, never how a cycle is composed.

pub mod lexical;
pub mod numbers;
pub mod phrases;

pub use lexical::{default_labels, lexical_item, lexical_slots};
pub use numbers::{number_item, number_to_german, NumberComponent, NumberRange};
pub use phrases::{
    candidate_phrases, phrase_item, CardMode, Gender, GrammaticalCase, Level, NumberForm,
    PhraseCard, PhraseFilter, Pronoun,
};
