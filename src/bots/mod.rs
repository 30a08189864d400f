//! Bot players
//!
//! A [`BotStrategy`] decides what a bot writes and whom it votes for;
//! [`delay`] decides how long it pretends to think. When nobody human is
//! involved in a battle the bots act almost immediately.

pub mod strategy;

use std::time::Duration;

use rand::Rng;

use crate::config::schema::BotConfig;
use crate::model::{AttackType, DocId, Fighter, Prompt, Role, Submission};

pub use strategy::HeckleBot;

/// What a bot submits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotAnswer {
    /// Answer text
    pub text: String,
    /// Final-round attack
    pub attack_type: Option<AttackType>,
}

/// Decides bot answers and votes.
pub trait BotStrategy: Send + Sync + std::fmt::Debug {
    /// Answer for `prompt`. Must respect the prompt's answer rules.
    fn answer(&self, prompt: &Prompt) -> BotAnswer;

    /// Submission to vote for, or `None` to abstain.
    fn vote(&self, prompt: &Prompt, submissions: &[Submission]) -> Option<DocId>;
}

/// Every combatant of `prompt`, and every corner man backing one, is a bot.
#[must_use]
pub fn battle_is_all_bots(prompt: &Prompt, participants: &[Fighter]) -> bool {
    participants
        .iter()
        .filter(|p| {
            prompt.is_combatant(&p.id)
                || (p.role == Role::CornerMan
                    && p.team_id.as_ref().is_some_and(|c| prompt.is_combatant(c)))
        })
        .all(|p| p.is_bot)
}

/// How long a bot waits before acting.
pub fn delay<R: Rng + ?Sized>(config: &BotConfig, all_bots: bool, rng: &mut R) -> Duration {
    if all_bots {
        return config.instant_delay;
    }
    if config.max_delay <= config.min_delay {
        return config.min_delay;
    }
    let min = u64::try_from(config.min_delay.as_millis()).unwrap_or(u64::MAX);
    let max = u64::try_from(config.max_delay.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(rng.random_range(min..=max))
}

/// Who should type the answer for `author` on a prompt, if a bot can.
///
/// A bot combatant answers for itself. A knocked-out captain is covered by
/// its first bot corner man.
#[must_use]
pub fn answering_bot<'a>(author: &'a Fighter, participants: &'a [Fighter]) -> Option<&'a Fighter> {
    if author.is_bot && !author.knocked_out {
        return Some(author);
    }
    if author.knocked_out {
        return participants.iter().find(|p| {
            p.is_bot && p.role == Role::CornerMan && p.team_id.as_ref() == Some(&author.id)
        });
    }
    None
}
