//! Eligibility and tally
//!
//! Counts submissions and votes, decides who may vote on a battle and
//! detects when everybody expected has acted.

use std::collections::HashMap;

use crate::error::Rejection;
use crate::model::{DocId, Fighter, Prompt, Role, Submission, Vote};

/// Submission progress for one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionProgress {
    /// Two answers per prompt
    pub expected: usize,
    /// Answers received for the round's prompts
    pub received: usize,
}

impl SubmissionProgress {
    /// Every combatant has answered every prompt.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.expected > 0 && self.received >= self.expected
    }
}

/// Counts answers against the round's prompts.
///
/// Submissions for prompts outside `prompts` are ignored.
#[must_use]
pub fn submission_progress(prompts: &[Prompt], submissions: &[Submission]) -> SubmissionProgress {
    let received = submissions
        .iter()
        .filter(|s| prompts.iter().any(|p| p.id == s.prompt_id))
        .count();
    SubmissionProgress {
        expected: prompts.len() * 2,
        received,
    }
}

/// Checks whether `voter` may vote on `prompt`.
///
/// # Errors
///
/// [`Rejection::CombatantCannotVote`] for a combatant and
/// [`Rejection::TeamLoyalty`] for a corner man whose captain is fighting.
pub fn check_eligible(prompt: &Prompt, voter: &Fighter) -> Result<(), Rejection> {
    if prompt.is_combatant(&voter.id) {
        return Err(Rejection::CombatantCannotVote);
    }
    if voter.role == Role::CornerMan
        && voter
            .team_id
            .as_ref()
            .is_some_and(|captain| prompt.is_combatant(captain))
    {
        return Err(Rejection::TeamLoyalty);
    }
    Ok(())
}

/// Whether `voter` may vote on `prompt`.
#[must_use]
pub fn is_eligible(prompt: &Prompt, voter: &Fighter) -> bool {
    check_eligible(prompt, voter).is_ok()
}

/// Votes needed to close a battle: every eligible participant, at least one.
#[must_use]
pub fn expected_voters(prompt: &Prompt, participants: &[Fighter]) -> usize {
    let eligible = participants.iter().filter(|p| is_eligible(prompt, p)).count();
    eligible.max(1)
}

/// Whether the votes on `prompt` are in.
#[must_use]
pub fn voting_complete(prompt: &Prompt, participants: &[Fighter], votes: &[Vote]) -> bool {
    let received = votes.iter().filter(|v| v.prompt_id == prompt.id).count();
    received >= expected_voters(prompt, participants)
}

/// Vote counts for one battle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BattleTally {
    counts: HashMap<DocId, u32>,
}

impl BattleTally {
    /// Counts `votes` per submission.
    #[must_use]
    pub fn count(votes: &[Vote]) -> Self {
        let mut counts = HashMap::new();
        for vote in votes {
            *counts.entry(vote.submission_id.clone()).or_insert(0) += 1;
        }
        Self { counts }
    }

    /// Votes for one submission.
    #[must_use]
    pub fn votes_for(&self, submission_id: &DocId) -> u32 {
        self.counts.get(submission_id).copied().unwrap_or(0)
    }

    /// Total votes counted.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }
}

/// Finds the submission credited to `author` on `prompt`.
#[must_use]
pub fn submission_of<'a>(
    submissions: &'a [Submission],
    prompt_id: &DocId,
    author: &DocId,
) -> Option<&'a Submission> {
    submissions
        .iter()
        .find(|s| &s.prompt_id == prompt_id && &s.author_id == author)
}
