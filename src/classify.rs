//! Literal trigger-phrase classification
//!
//! The state machine never looks at message text. This module turns text
//! into the two booleans it cares about, by case-insensitive phrase matching
//! and nothing more.

use crate::state_machine::Signals;
use regex::RegexSet;

/// Apology phrases recognized out of the box (English and Persian)
pub const DEFAULT_APOLOGY_PHRASES: &[&str] = &[
    "sorry",
    "i apologize",
    "my bad",
    "forgive me",
    "ببخشید",
    "معذرت",
];

pub trait Classifier: Send + Sync {
    fn classify(&self, text: &str) -> Signals;
}

/// Matches configured phrases anywhere in the message
#[derive(Debug, Clone)]
pub struct PhraseClassifier {
    apology: RegexSet,
    provocation: RegexSet,
}

impl PhraseClassifier {
    pub fn new<A, P>(apology: A, provocation: P) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        Self {
            apology: phrase_set(apology),
            provocation: phrase_set(provocation),
        }
    }
}

impl Default for PhraseClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_APOLOGY_PHRASES, std::iter::empty::<&str>())
    }
}

impl Classifier for PhraseClassifier {
    fn classify(&self, text: &str) -> Signals {
        Signals {
            apology: self.apology.is_match(text),
            provocation: self.provocation.is_match(text),
        }
    }
}

/// Build a case-insensitive set of escaped literals; blank phrases are skipped
fn phrase_set<I>(phrases: I) -> RegexSet
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let patterns: Vec<String> = phrases
        .into_iter()
        .map(|p| p.as_ref().trim().to_string())
        .filter(|p| !p.is_empty())
        .map(|p| format!("(?i){}", regex::escape(&p)))
        .collect();

    // Escaped literals always compile; fall back to matching nothing
    RegexSet::new(&patterns).unwrap_or_else(|_| RegexSet::empty())
}
