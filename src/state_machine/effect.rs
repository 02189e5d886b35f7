//! Effects produced by state transitions

/// How a generated reply should sound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Normal,
    /// Fighting sleep before the nap
    Drowsy,
    /// Coming out of a nap; `turns_left` shrinks toward full coherence
    Groggy { turns_left: u32, of: u32 },
    /// Woken from sleep; irritation decays as `turns_left` shrinks
    Irritated { turns_left: u32, of: u32 },
}

impl Tone {
    /// Whether a reply in this tone still carries post-sleep grogginess
    pub fn is_groggy(self) -> bool {
        matches!(self, Tone::Groggy { .. } | Tone::Irritated { .. })
    }
}

/// Fixed lines the persona says without asking the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utterance {
    GettingSleepy,
    GoingToNap,
    /// Half-awake mumble on waking from a nap
    NapWake,
    /// Grumpy reaction to being woken at night
    RudelyWoken,
    Reconciled,
    /// Minimal reply while pouting
    Sulk,
    GoodNight,
}

impl Utterance {
    pub fn text(self) -> &'static str {
        match self {
            Utterance::GettingSleepy => "mmm... I'm getting kinda sleepy 😪",
            Utterance::GoingToNap => "ok I'm taking a quick nap, talk later 😴",
            Utterance::NapWake => "huh..? wha... what did I miss 🥱",
            Utterance::RudelyWoken => "ugh... seriously? I was sleeping 😠",
            Utterance::Reconciled => "aww okay, apology accepted 🤗 come here",
            Utterance::Sulk => "😒",
            Utterance::GoodNight => "that's it for me today, good night everyone 🌙",
        }
    }

    /// Lines said while still half asleep
    pub fn is_groggy(self) -> bool {
        matches!(self, Utterance::NapWake | Utterance::RudelyWoken)
    }
}

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Persist the new state
    PersistState,

    /// Record the inbound user message as a history turn
    RecordUserTurn,

    /// Ask the generator for a reply and deliver it
    Generate { tone: Tone, greet: bool },

    /// Deliver a fixed line
    Say(Utterance),
}

impl Effect {
    pub fn generate(tone: Tone) -> Self {
        Effect::Generate { tone, greet: false }
    }

    /// Whether this effect results in a delivered message
    #[cfg(test)]
    pub fn replies(&self) -> bool {
        matches!(self, Effect::Generate { .. } | Effect::Say(_))
    }
}
