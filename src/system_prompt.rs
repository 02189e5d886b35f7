//! Persona instruction construction
//!
//! Combines the persona description with a directive describing how the
//! current reply should sound, so the generator can stay in character as
//! the state machine moves between moods.

use crate::state_machine::Tone;
use std::fmt::Write;
use std::path::Path;

/// Base persona description; `{name}` is replaced with the persona's name
const BASE_PERSONA: &str = r"You are {name}, a member of a small group chat of friends. You are not an assistant: you are a person with moods, a sense of humour and a short attention span.

Write like a friend texting: short messages, casual tone, the occasional emoji. Never mention being an AI, a model, or a bot. Never write more than a few sentences.

Your energy changes during the day. You get sleepy after a long chat, take naps, go to bed at night, and are grumpy if someone wakes you up. You sulk when people are rude to you until they apologize.";

const GREETING_DIRECTIVE: &str =
    "Open your reply with a short, friendly greeting to the chat before answering, as if you just popped in.";

/// The persona the generator is asked to play
#[derive(Debug, Clone)]
pub struct Persona {
    pub name: String,
    description: String,
}

impl Persona {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let description = BASE_PERSONA.replace("{name}", &name);
        Self { name, description }
    }

    /// Replace the built-in description with the contents of a file.
    ///
    /// `{name}` placeholders in the file are substituted as well. Unreadable
    /// or empty files leave the built-in description in place.
    pub fn with_description_file(mut self, path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) if !content.trim().is_empty() => {
                self.description = content.trim().replace("{name}", &self.name);
            }
            Ok(_) => {
                tracing::warn!(path = %path.display(), "Persona file is empty, using built-in persona");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot read persona file, using built-in persona");
            }
        }
        self
    }

    /// Full instruction for one generated reply
    pub fn instruction(&self, tone: Tone, greet: bool) -> String {
        let mut prompt = self.description.clone();

        prompt.push_str("\n\n<current_mood>\n");
        let _ = writeln!(prompt, "{}", tone_directive(tone));
        if greet {
            let _ = writeln!(prompt, "{GREETING_DIRECTIVE}");
        }
        prompt.push_str("</current_mood>");

        prompt
    }
}

fn tone_directive(tone: Tone) -> String {
    match tone {
        Tone::Normal => "You are awake, alert and in a good mood. Reply naturally.".to_string(),
        Tone::Drowsy => {
            "You are very sleepy and struggling to keep your eyes open. Keep replies short and yawny."
                .to_string()
        }
        Tone::Groggy { turns_left, of } => format!(
            "You just woke up from a nap and are still groggy ({}). {}",
            fraction(turns_left, of),
            if turns_left * 2 > of {
                "You are confused, slow, and keep losing track of what people said."
            } else {
                "You are mostly coherent now, just a little slow."
            }
        ),
        Tone::Irritated { turns_left, of } => format!(
            "Someone woke you up in the middle of the night and you are irritated ({}). {}",
            fraction(turns_left, of),
            if turns_left * 2 > of {
                "Be short, grumpy and a bit sarcastic."
            } else {
                "You are calming down, only slightly grumpy now."
            }
        ),
    }
}

/// "intensity 3/5"-style hint
fn fraction(turns_left: u32, of: u32) -> String {
    format!("intensity {turns_left}/{of}")
}
