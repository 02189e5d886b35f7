//! Runtime configuration read from the environment
//!
//! Every setting has a default; malformed values fall back to it with a
//! warning rather than aborting startup.

use crate::classify::DEFAULT_APOLOGY_PHRASES;
use crate::history;
use crate::state_machine::Thresholds;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_PERSONA_NAME: &str = "Xeno";
const DEFAULT_GREETING_PROBABILITY: f64 = 0.5;
const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Persona behaviour settings
#[derive(Debug, Clone)]
pub struct PersonaConfig {
    pub name: String,
    pub prompt_file: Option<PathBuf>,
    pub thresholds: Thresholds,
    pub history_capacity: usize,
    pub greeting_probability: f64,
    /// Fixed seed for the greeting dice, for reproducible runs
    pub greeting_seed: Option<u64>,
    pub apology_phrases: Vec<String>,
    pub provocation_phrases: Vec<String>,
    pub generation_timeout: Duration,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PERSONA_NAME.to_string(),
            prompt_file: None,
            thresholds: Thresholds::default(),
            history_capacity: history::DEFAULT_CAPACITY,
            greeting_probability: DEFAULT_GREETING_PROBABILITY,
            greeting_seed: None,
            apology_phrases: DEFAULT_APOLOGY_PHRASES
                .iter()
                .map(ToString::to_string)
                .collect(),
            provocation_phrases: Vec::new(),
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }
}

impl PersonaConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let day_length = match parsed::<u32>(&get, "PERSONA_DAY_LENGTH") {
            Some(0) => None,
            Some(n) => Some(n),
            None => defaults.thresholds.day_length,
        };

        let mut apology_phrases = defaults.apology_phrases;
        apology_phrases.extend(list(&get, "PERSONA_APOLOGY_PHRASES"));

        Self {
            name: get("PERSONA_NAME")
                .filter(|n| !n.trim().is_empty())
                .unwrap_or(defaults.name),
            prompt_file: get("PERSONA_PROMPT_FILE").map(PathBuf::from),
            thresholds: Thresholds {
                day_length,
                ..defaults.thresholds
            },
            history_capacity: parsed(&get, "PERSONA_HISTORY_CAPACITY")
                .unwrap_or(defaults.history_capacity),
            greeting_probability: parsed::<f64>(&get, "PERSONA_GREETING_PROBABILITY")
                .filter(|p| (0.0..=1.0).contains(p))
                .unwrap_or(defaults.greeting_probability),
            greeting_seed: parsed(&get, "PERSONA_GREETING_SEED"),
            apology_phrases,
            provocation_phrases: list(&get, "PERSONA_PROVOCATION_PHRASES"),
            generation_timeout: parsed(&get, "PERSONA_GENERATION_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.generation_timeout),
        }
    }
}

/// HTTP host settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub bot_token: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let get = |key: &str| std::env::var(key).ok();
        Self {
            port: parsed(&get, "PORT").unwrap_or(DEFAULT_PORT),
            bot_token: get("BOT_TOKEN").filter(|t| !t.is_empty()),
        }
    }
}

fn parsed<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = get(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparsable setting");
            None
        }
    }
}

/// Comma-separated list; blank entries dropped
fn list(get: &impl Fn(&str) -> Option<String>, key: &str) -> Vec<String> {
    get(key)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}
