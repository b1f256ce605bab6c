#![allow(dead_code)]

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use vaja_core::content::{
    lexical_item, number_to_german, CardMode, Gender, GrammaticalCase, Level, NumberForm,
    PhraseCard, Pronoun,
};
use vaja_core::{
    Domain, ItemKey, LexicalKind, MemoryStore, PracticeScheduler, PracticeStore, SchedulerConfig,
    ScopeKey, SubmitAnswer, UserKey,
};

pub const NOUNS: [(ItemKey, &str, &str); 8] = [
    (1, "pes", "der Hund"),
    (2, "mačka", "die Katze"),
    (3, "hiša", "das Haus"),
    (4, "miza", "der Tisch"),
    (5, "okno", "das Fenster"),
    (6, "knjiga", "das Buch"),
    (7, "jabolko", "der Apfel"),
    (8, "ulica", "die Straße"),
];

pub const VERBS: [(ItemKey, &str, [&str; 4]); 2] = [
    (101, "iti", ["gehen", "geht", "ging", "ist gegangen"]),
    (102, "jesti", ["essen", "isst", "aß", "hat gegessen"]),
];

pub type TestScheduler<S = MemoryStore> = PracticeScheduler<S, ChaCha8Rng>;

pub fn seeded<S: PracticeStore>(store: S, seed: u64) -> TestScheduler<S> {
    PracticeScheduler::with_rng(store, SchedulerConfig::default(), ChaCha8Rng::seed_from_u64(seed))
}

pub fn noun_solution(key: ItemKey) -> &'static str {
    NOUNS
        .iter()
        .find(|(k, _, _)| *k == key)
        .map(|(_, _, solution)| *solution)
        .expect("unknown noun key")
}

pub fn family_cards() -> Vec<PhraseCard> {
    let noun = |id, form| PhraseCard {
        id,
        level: Level::A1,
        mode: CardMode::Noun,
        case: None,
        pronoun: None,
        number_form: Some(form),
        lemma: "Bruder".to_string(),
        gender: Gender::Masculine,
        plural: "Brüder".to_string(),
        sl_singular: "brat".to_string(),
        sl_plural: "bratje".to_string(),
    };
    let phrase = |id, level, case, pronoun, gender| PhraseCard {
        id,
        level,
        mode: CardMode::Phrase,
        case: Some(case),
        pronoun: Some(pronoun),
        number_form: None,
        lemma: "Tante".to_string(),
        gender,
        plural: "Tanten".to_string(),
        sl_singular: "teta".to_string(),
        sl_plural: "tete".to_string(),
    };

    vec![
        noun(1, NumberForm::Pair),
        noun(2, NumberForm::Singular),
        noun(3, NumberForm::Plural),
        phrase(4, Level::A1, GrammaticalCase::Nominative, Pronoun::My, Gender::Feminine),
        phrase(5, Level::A1, GrammaticalCase::Nominative, Pronoun::Your, Gender::Feminine),
        phrase(6, Level::A1, GrammaticalCase::Nominative, Pronoun::Our, Gender::Plural),
        phrase(7, Level::A2, GrammaticalCase::Dative, Pronoun::His, Gender::Feminine),
        phrase(8, Level::A2, GrammaticalCase::Accusative, Pronoun::Their, Gender::Plural),
    ]
}

pub fn seeded_memory_store() -> MemoryStore {
    let store = MemoryStore::new();
    for (key, prompt, solution) in NOUNS {
        let item = lexical_item(LexicalKind::Noun, key, prompt, None, vec![solution.to_string()])
            .expect("noun fixture");
        store.insert_item(LexicalKind::Noun, item);
    }
    for (key, prompt, forms) in VERBS {
        let solutions = forms.iter().map(|f| f.to_string()).collect();
        let item = lexical_item(LexicalKind::Verb, key, prompt, None, solutions).expect("verb fixture");
        store.insert_item(LexicalKind::Verb, item);
    }
    for card in family_cards() {
        store.insert_phrase_card(card);
    }
    store
}

pub fn answer_noun<S: PracticeStore>(
    scheduler: &TestScheduler<S>,
    user: UserKey,
    key: ItemKey,
    correct: bool,
    scope: Option<ScopeKey>,
) {
    let answer = if correct { noun_solution(key) } else { "der Fehler" };
    let mut submission = SubmitAnswer::new(user, Domain::NOUN, key, vec![answer.to_string()]);
    submission.scope = scope;
    scheduler.submit_answer(&submission).expect("noun submission");
}

pub fn answer_number<S: PracticeStore>(scheduler: &TestScheduler<S>, user: UserKey, value: u32, correct: bool) -> bool {
    let answer = if correct {
        number_to_german(value).expect("spellable number")
    } else {
        "falsch".to_string()
    };
    scheduler
        .submit_answer(&SubmitAnswer::new(user, Domain::Number, i64::from(value), vec![answer]))
        .expect("number submission")
        .correct
}
