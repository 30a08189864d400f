//! Default bot strategy

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use crate::model::{AttackType, DocId, Prompt, PromptType, Submission};

use super::{BotAnswer, BotStrategy};

const LINES: &[&str] = &[
    "I've seen better footwork on a shopping cart",
    "Your corner is charging you by the hour to watch this",
    "Even your mouthguard wants a transfer",
    "You punch like you're apologizing",
    "The ring announcer mispronounced you on purpose",
    "Your training montage was just napping",
    "I'd roast you but the gym already did",
    "You bring a spoon to a knife fight",
];

const JABS: &[&str] = &[
    "Tragic", "Soggy", "Beige", "Expired", "Wobbly", "Dusty", "Lukewarm", "Decaf",
];

/// Canned trash talk, shortest-answer voting.
///
/// Votes for the shortest answer on the theory that brevity is wit; ties
/// break at random.
#[derive(Debug)]
pub struct HeckleBot {
    rng: Mutex<StdRng>,
}

impl HeckleBot {
    /// Bot with an OS-seeded generator.
    #[must_use]
    pub fn new() -> Self {
        Self::seeded(rand::rng().random())
    }

    /// Reproducible bot.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        match self.rng.lock() {
            Ok(mut rng) => f(&mut rng),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

impl Default for HeckleBot {
    fn default() -> Self {
        Self::new()
    }
}

impl BotStrategy for HeckleBot {
    fn answer(&self, prompt: &Prompt) -> BotAnswer {
        self.with_rng(|rng| {
            let bank = if prompt.prompt_type == PromptType::Jab {
                JABS
            } else {
                LINES
            };
            let text = bank.choose(rng).copied().unwrap_or("Boo").to_string();
            let attack_type = (prompt.prompt_type == PromptType::Final)
                .then(|| AttackType::ALL.choose(rng).copied().unwrap_or(AttackType::Jab));
            BotAnswer { text, attack_type }
        })
    }

    fn vote(&self, prompt: &Prompt, submissions: &[Submission]) -> Option<DocId> {
        let candidates: Vec<&Submission> = submissions
            .iter()
            .filter(|s| s.prompt_id == prompt.id)
            .collect();
        let shortest = candidates.iter().map(|s| s.text.chars().count()).min()?;
        let best: Vec<&&Submission> = candidates
            .iter()
            .filter(|s| s.text.chars().count() == shortest)
            .collect();
        self.with_rng(|rng| best.choose(rng).map(|s| s.id.clone()))
    }
}
