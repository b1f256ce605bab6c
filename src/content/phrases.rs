//! Family-vocabulary cards: nouns with articles and possessive phrases
//! declined by case.

use serde::{Deserialize, Serialize};

use crate::error::{PracticeError, PracticeResult};
use crate::types::{AnswerSlot, ItemKey, PracticeItem};

pub const LABEL_NOUN: &str = "člen + samostalnik";
pub const LABEL_PLURAL: &str = "plural (z die)";
pub const LABEL_PHRASE: &str = "Zapis po nemško";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    A1,
    A2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardMode {
    Noun,
    Phrase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrammaticalCase {
    Nominative,
    Accusative,
    Dative,
}

impl GrammaticalCase {
    fn label(self) -> &'static str {
        match self {
            Self::Nominative => "Nominativ",
            Self::Accusative => "Akuzativ",
            Self::Dative => "Dativ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[serde(rename = "m")]
    Masculine,
    #[serde(rename = "f")]
    Feminine,
    #[serde(rename = "n")]
    Neuter,
    #[serde(rename = "pl")]
    Plural,
}

impl Gender {
    fn article(self) -> &'static str {
        match self {
            Self::Masculine => "der",
            Self::Feminine | Self::Plural => "die",
            Self::Neuter => "das",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pronoun {
    My,
    Your,
    His,
    Her,
    Our,
    YourPl,
    Their,
    YourFormal,
}

impl Pronoun {
    fn german_stem(self) -> &'static str {
        match self {
            Self::My => "mein",
            Self::Your => "dein",
            Self::His => "sein",
            Self::Her | Self::Their => "ihr",
            Self::Our => "unser",
            Self::YourPl => "euer",
            Self::YourFormal => "Ihr",
        }
    }

    /// Slovenian forms indexed m, f, n, pl.
    fn slovenian_forms(self) -> [&'static str; 4] {
        match self {
            Self::My => ["moj", "moja", "moje", "moji"],
            Self::Your => ["tvoj", "tvoja", "tvoje", "tvoji"],
            Self::His => ["njegov", "njegova", "njegovo", "njegovi"],
            Self::Her => ["njen", "njena", "njeno", "njeni"],
            Self::Our => ["naš", "naša", "naše", "naši"],
            Self::YourPl => ["vaš", "vaša", "vaše", "vaši"],
            Self::Their => ["njihov", "njihova", "njihovo", "njihovi"],
            Self::YourFormal => ["Vaš", "Vaša", "Vaše", "Vaši"],
        }
    }
}

/// How a noun card asks for the noun.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberForm {
    Pair,
    Singular,
    Plural,
}

/// Stored family-vocabulary card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhraseCard {
    pub id: ItemKey,
    pub level: Level,
    pub mode: CardMode,
    /// Only meaningful for phrase cards.
    pub case: Option<GrammaticalCase>,
    pub pronoun: Option<Pronoun>,
    /// Only meaningful for noun cards.
    pub number_form: Option<NumberForm>,
    pub lemma: String,
    pub gender: Gender,
    pub plural: String,
    pub sl_singular: String,
    pub sl_plural: String,
}

fn gender_index(gender: Gender) -> usize {
    match gender {
        Gender::Masculine => 0,
        Gender::Feminine => 1,
        Gender::Neuter => 2,
        Gender::Plural => 3,
    }
}

fn case_ending(case: GrammaticalCase, gender: Gender) -> &'static str {
    const NOMINATIVE: [&str; 4] = ["", "e", "", "e"];
    const ACCUSATIVE: [&str; 4] = ["en", "e", "", "e"];
    const DATIVE: [&str; 4] = ["em", "er", "em", "en"];
    let table = match case {
        GrammaticalCase::Nominative => NOMINATIVE,
        GrammaticalCase::Accusative => ACCUSATIVE,
        GrammaticalCase::Dative => DATIVE,
    };
    table[gender_index(gender)]
}

pub fn german_possessive(pronoun: Pronoun, case: GrammaticalCase, gender: Gender) -> String {
    let stem = pronoun.german_stem();
    let ending = case_ending(case, gender);
    if stem == "euer" && ending.starts_with('e') {
        return format!("eur{ending}");
    }
    format!("{stem}{ending}")
}

pub fn german_dative_plural(plural: &str) -> String {
    if plural.ends_with('n') || plural.ends_with('s') {
        plural.to_string()
    } else {
        format!("{plural}n")
    }
}

pub fn slovenian_possessive(pronoun: Pronoun, gender: Gender) -> &'static str {
    pronoun.slovenian_forms()[gender_index(gender)]
}

/// Builds the prompt and answer slots for a card.
pub fn phrase_item(card: &PhraseCard) -> PracticeResult<PracticeItem> {
    match card.mode {
        CardMode::Noun => Ok(noun_item(card)),
        CardMode::Phrase => phrase_card_item(card),
    }
}

fn noun_item(card: &PhraseCard) -> PracticeItem {
    let article = card.gender.article();
    let singular = format!("{article} {}", card.lemma);
    let plural = format!("die {}", card.plural);
    match card.number_form.unwrap_or(NumberForm::Pair) {
        NumberForm::Plural => PracticeItem::new(
            card.id,
            card.sl_plural.clone(),
            vec![AnswerSlot::new(LABEL_PLURAL, plural)],
        ),
        NumberForm::Singular => PracticeItem::new(
            card.id,
            card.sl_singular.clone(),
            vec![AnswerSlot::new(LABEL_NOUN, singular)],
        ),
        NumberForm::Pair => PracticeItem::new(
            card.id,
            format!("{} / {}", card.sl_singular, card.sl_plural),
            vec![
                AnswerSlot::new(LABEL_NOUN, singular),
                AnswerSlot::new(LABEL_PLURAL, plural),
            ],
        ),
    }
}

fn phrase_card_item(card: &PhraseCard) -> PracticeResult<PracticeItem> {
    let (Some(case), Some(pronoun)) = (card.case, card.pronoun) else {
        return Err(PracticeError::invalid(format!(
            "phrase card {} is missing its case or pronoun",
            card.id
        )));
    };

    let plural = card.gender == Gender::Plural;
    let sl_noun = if plural { &card.sl_plural } else { &card.sl_singular };
    let prompt = format!(
        "{}: {} {}",
        case.label(),
        slovenian_possessive(pronoun, card.gender),
        sl_noun
    );

    let mut noun = if plural {
        card.plural.clone()
    } else {
        card.lemma.clone()
    };
    if case == GrammaticalCase::Dative && plural {
        noun = german_dative_plural(&noun);
    }
    let determiner = german_possessive(pronoun, case, card.gender);

    Ok(PracticeItem::new(
        card.id,
        prompt,
        vec![AnswerSlot::new(LABEL_PHRASE, format!("{determiner} {noun}"))],
    ))
}

/// Level/mode/case/plural filters for a phrase cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhraseFilter {
    pub levels: Vec<Level>,
    pub modes: Vec<CardMode>,
    pub cases: Vec<GrammaticalCase>,
    pub include_plural: bool,
}

impl Default for PhraseFilter {
    fn default() -> Self {
        Self {
            levels: vec![Level::A1],
            modes: vec![CardMode::Noun, CardMode::Phrase],
            cases: vec![GrammaticalCase::Nominative],
            include_plural: true,
        }
    }
}

impl PhraseFilter {
    /// Applies defaults to omitted filters and rejects explicitly empty ones.
    /// Case selection only applies from A2 on; below that it is nominative.
    pub fn resolve(
        levels: Option<Vec<Level>>,
        modes: Option<Vec<CardMode>>,
        cases: Option<Vec<GrammaticalCase>>,
        include_plural: bool,
    ) -> PracticeResult<Self> {
        let defaults = Self::default();
        let levels = levels.unwrap_or(defaults.levels);
        let modes = modes.unwrap_or(defaults.modes);
        let mut cases = cases.unwrap_or(defaults.cases);

        if levels.is_empty() {
            return Err(PracticeError::invalid("select at least one level"));
        }
        if modes.is_empty() {
            return Err(PracticeError::invalid("select at least one practice mode"));
        }
        if !levels.contains(&Level::A2) {
            cases = vec![GrammaticalCase::Nominative];
        }
        if modes.contains(&CardMode::Phrase) && cases.is_empty() {
            return Err(PracticeError::invalid("select at least one case"));
        }

        Ok(Self {
            levels,
            modes,
            cases,
            include_plural,
        })
    }

    pub fn accepts(&self, card: &PhraseCard) -> bool {
        if !self.levels.contains(&card.level) || !self.modes.contains(&card.mode) {
            return false;
        }
        match card.mode {
            CardMode::Phrase => card.case.map_or(false, |case| self.cases.contains(&case)),
            CardMode::Noun => {
                let form = card.number_form.unwrap_or(NumberForm::Pair);
                if self.include_plural {
                    matches!(form, NumberForm::Pair | NumberForm::Plural)
                } else {
                    matches!(form, NumberForm::Singular | NumberForm::Plural)
                }
            }
        }
    }
}

pub fn candidate_phrases(cards: &[PhraseCard], filter: &PhraseFilter) -> PracticeResult<Vec<PracticeItem>> {
    cards
        .iter()
        .filter(|card| filter.accepts(card))
        .map(phrase_item)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noun_card(id: ItemKey, form: NumberForm) -> PhraseCard {
        PhraseCard {
            id,
            level: Level::A1,
            mode: CardMode::Noun,
            case: None,
            pronoun: None,
            number_form: Some(form),
            lemma: "Vater".to_string(),
            gender: Gender::Masculine,
            plural: "Väter".to_string(),
            sl_singular: "oče".to_string(),
            sl_plural: "očetje".to_string(),
        }
    }

    fn phrase_card(id: ItemKey, case: GrammaticalCase, pronoun: Pronoun, gender: Gender) -> PhraseCard {
        let (lemma, plural) = match gender {
            Gender::Feminine => ("Schwester", "Schwestern"),
            _ => ("Kind", "Kinder"),
        };
        PhraseCard {
            id,
            level: Level::A2,
            mode: CardMode::Phrase,
            case: Some(case),
            pronoun: Some(pronoun),
            number_form: None,
            lemma: lemma.to_string(),
            gender,
            plural: plural.to_string(),
            sl_singular: "otrok".to_string(),
            sl_plural: "otroci".to_string(),
        }
    }

    #[test]
    fn possessive_endings() {
        assert_eq!(german_possessive(Pronoun::My, GrammaticalCase::Nominative, Gender::Masculine), "mein");
        assert_eq!(german_possessive(Pronoun::Your, GrammaticalCase::Accusative, Gender::Masculine), "deinen");
        assert_eq!(german_possessive(Pronoun::Our, GrammaticalCase::Dative, Gender::Feminine), "unserer");
        assert_eq!(german_possessive(Pronoun::YourPl, GrammaticalCase::Accusative, Gender::Feminine), "eure");
        assert_eq!(german_possessive(Pronoun::YourPl, GrammaticalCase::Nominative, Gender::Neuter), "euer");
        assert_eq!(german_possessive(Pronoun::YourFormal, GrammaticalCase::Dative, Gender::Plural), "Ihren");
    }

    #[test]
    fn dative_plural_suffix() {
        assert_eq!(german_dative_plural("Kinder"), "Kindern");
        assert_eq!(german_dative_plural("Schwestern"), "Schwestern");
        assert_eq!(german_dative_plural("Omas"), "Omas");
    }

    #[test]
    fn noun_card_payloads() {
        let pair = phrase_item(&noun_card(1, NumberForm::Pair)).unwrap();
        assert_eq!(pair.prompt, "oče / očetje");
        assert_eq!(pair.solutions(), vec!["der Vater", "die Väter"]);
        assert_eq!(pair.labels(), vec![LABEL_NOUN, LABEL_PLURAL]);

        let singular = phrase_item(&noun_card(2, NumberForm::Singular)).unwrap();
        assert_eq!(singular.prompt, "oče");
        assert_eq!(singular.solutions(), vec!["der Vater"]);
        assert_eq!(singular.labels(), vec!["člen + samostalnik"]);

        let plural = phrase_item(&noun_card(3, NumberForm::Plural)).unwrap();
        assert_eq!(plural.prompt, "očetje");
        assert_eq!(plural.solutions(), vec!["die Väter"]);
        assert_eq!(plural.labels(), vec!["plural (z die)"]);
    }

    #[test]
    fn phrase_card_payload() {
        let card = phrase_card(4, GrammaticalCase::Dative, Pronoun::Our, Gender::Plural);
        let item = phrase_item(&card).unwrap();
        assert_eq!(item.prompt, "Dativ: naši otroci");
        assert_eq!(item.solutions(), vec!["unseren Kindern"]);

        let card = phrase_card(5, GrammaticalCase::Nominative, Pronoun::Her, Gender::Feminine);
        assert_eq!(phrase_item(&card).unwrap().solutions(), vec!["ihre Schwester"]);
    }

    #[test]
    fn phrase_card_without_case_is_rejected() {
        let mut card = phrase_card(6, GrammaticalCase::Dative, Pronoun::My, Gender::Neuter);
        card.case = None;
        assert!(phrase_item(&card).is_err());
    }

    #[test]
    fn filter_defaults_and_validation() {
        let filter = PhraseFilter::resolve(None, None, None, true).unwrap();
        assert_eq!(filter, PhraseFilter::default());

        assert!(PhraseFilter::resolve(Some(vec![]), None, None, true).is_err());
        assert!(PhraseFilter::resolve(None, Some(vec![]), None, true).is_err());
        assert!(PhraseFilter::resolve(Some(vec![Level::A2]), None, Some(vec![]), true).is_err());

        // below A2 the case selection collapses to nominative
        let a1 = PhraseFilter::resolve(None, None, Some(vec![GrammaticalCase::Dative]), true).unwrap();
        assert_eq!(a1.cases, vec![GrammaticalCase::Nominative]);
    }

    #[test]
    fn filter_selects_cards() {
        let cards = vec![
            noun_card(1, NumberForm::Pair),
            noun_card(2, NumberForm::Singular),
            noun_card(3, NumberForm::Plural),
            phrase_card(4, GrammaticalCase::Dative, Pronoun::Our, Gender::Plural),
            phrase_card(5, GrammaticalCase::Nominative, Pronoun::My, Gender::Neuter),
        ];

        let with_plural = PhraseFilter::resolve(
            Some(vec![Level::A1, Level::A2]),
            None,
            Some(vec![GrammaticalCase::Dative]),
            true,
        )
        .unwrap();
        let keys: Vec<_> = candidate_phrases(&cards, &with_plural).unwrap().iter().map(|i| i.key).collect();
        assert_eq!(keys, vec![1, 3, 4]);

        let singular_only = PhraseFilter::resolve(
            Some(vec![Level::A1]),
            Some(vec![CardMode::Noun]),
            None,
            false,
        )
        .unwrap();
        let keys: Vec<_> = candidate_phrases(&cards, &singular_only).unwrap().iter().map(|i| i.key).collect();
        assert_eq!(keys, vec![2, 3]);
    }
}
