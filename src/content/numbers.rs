//! Integer practice items: numbers spelled out in German.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::NUMBER_MAX_LIMIT;
use crate::error::{PracticeError, PracticeResult};
use crate::types::{AnswerSlot, ItemKey, PracticeItem};

pub const NUMBER_LABEL: &str = "Zapis po nemško";

const BASIC: [&str; 20] = [
    "null", "eins", "zwei", "drei", "vier", "fünf", "sechs", "sieben", "acht", "neun", "zehn",
    "elf", "zwölf", "dreizehn", "vierzehn", "fünfzehn", "sechzehn", "siebzehn", "achtzehn",
    "neunzehn",
];

const TENS: [&str; 10] = [
    "", "", "zwanzig", "dreißig", "vierzig", "fünfzig", "sechzig", "siebzig", "achtzig", "neunzig",
];

/// Magnitude class used to filter the integer range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberComponent {
    Basic,
    Teens,
    Tens,
    CompositeTens,
    Hundreds,
    CompositeHundreds,
    Thousands,
    CompositeThousands,
}

impl NumberComponent {
    pub fn of(value: u32) -> Self {
        match value {
            0..=12 => Self::Basic,
            13..=19 => Self::Teens,
            20..=99 if value % 10 == 0 => Self::Tens,
            20..=99 => Self::CompositeTens,
            100..=999 if value % 100 == 0 => Self::Hundreds,
            100..=999 => Self::CompositeHundreds,
            _ if value % 1000 == 0 => Self::Thousands,
            _ => Self::CompositeThousands,
        }
    }
}

/// Spells `value` in German. Fails above one million.
pub fn number_to_german(value: u32) -> PracticeResult<String> {
    if value > NUMBER_MAX_LIMIT {
        return Err(PracticeError::invalid(format!(
            "number {value} exceeds the supported maximum {NUMBER_MAX_LIMIT}"
        )));
    }
    Ok(spell(value))
}

fn spell(value: u32) -> String {
    match value {
        0..=19 => BASIC[value as usize].to_string(),
        20..=99 => {
            let tens = TENS[(value / 10) as usize];
            match value % 10 {
                0 => tens.to_string(),
                1 => format!("einund{tens}"),
                ones => format!("{}und{tens}", BASIC[ones as usize]),
            }
        }
        100..=999 => compound(value / 100, value % 100, "hundert"),
        1_000..=999_999 => compound(value / 1000, value % 1000, "tausend"),
        _ => "eine Million".to_string(),
    }
}

fn compound(multiplier: u32, remainder: u32, unit: &str) -> String {
    let prefix = if multiplier == 1 {
        "ein".to_string()
    } else {
        spell(multiplier)
    };
    if remainder == 0 {
        format!("{prefix}{unit}")
    } else {
        format!("{prefix}{unit}{}", spell(remainder))
    }
}

/// Candidate range for one number cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberRange {
    pub ceiling: u32,
    /// `None` keeps every number; an empty set is rejected.
    pub components: Option<BTreeSet<NumberComponent>>,
}

impl NumberRange {
    pub fn new(ceiling: i64, components: Option<Vec<NumberComponent>>) -> PracticeResult<Self> {
        if ceiling < 0 {
            return Err(PracticeError::invalid("number ceiling must be non-negative"));
        }
        if ceiling > i64::from(NUMBER_MAX_LIMIT) {
            return Err(PracticeError::invalid(format!(
                "number ceiling must be at most {NUMBER_MAX_LIMIT}"
            )));
        }
        let components = match components {
            Some(list) if list.is_empty() => {
                return Err(PracticeError::invalid("select at least one number component"));
            }
            Some(list) => Some(list.into_iter().collect()),
            None => None,
        };
        Ok(Self {
            ceiling: ceiling as u32,
            components,
        })
    }

    pub fn contains(&self, value: u32) -> bool {
        value <= self.ceiling
            && self
                .components
                .as_ref()
                .map_or(true, |set| set.contains(&NumberComponent::of(value)))
    }

    pub fn values(&self) -> impl Iterator<Item = u32> + '_ {
        (0..=self.ceiling).filter(move |v| self.contains(*v))
    }
}

pub fn number_item(value: u32) -> PracticeResult<PracticeItem> {
    let solution = number_to_german(value)?;
    Ok(PracticeItem::new(
        ItemKey::from(value),
        value.to_string(),
        vec![AnswerSlot::new(NUMBER_LABEL, solution)],
    ))
}
