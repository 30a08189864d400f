//! Answers, votes and corner-man suggestions.

use chrono::Utc;
use tracing::debug;

use crate::error::{GameError, Rejection, StoreError};
use crate::identity::Actor;
use crate::model::{AttackType, DocId, Kind, PromptType, Role, Submission, Suggestion, Vote};
use crate::phase::Phase;
use crate::tally;

use super::Arena;

fn wrong_phase(expected: Phase, actual: Phase) -> Rejection {
    Rejection::WrongPhase {
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

impl Arena {
    /// Submits an answer.
    ///
    /// A combatant answers for themselves; a corner man answers for the
    /// captain, who is credited as the author. Completing the round's
    /// answers moves the match to VOTING.
    ///
    /// # Errors
    ///
    /// Rejections for wrong phase, unassigned prompt, empty or oversized
    /// text, multi-word jabs, a missing or forbidden attack type, and
    /// duplicates.
    pub async fn submit_answer(
        &self,
        actor: &Actor,
        prompt_id: &DocId,
        text: &str,
        attack_type: Option<AttackType>,
    ) -> Result<Submission, GameError> {
        let prompt = self.load_prompt(prompt_id).await?;
        if prompt.match_id != actor.match_id {
            return Err(GameError::not_found("prompt", prompt_id));
        }
        let m = self.load_match(&prompt.match_id).await?;
        let phase = Phase::of(&m);
        if phase != Phase::PROMPTS || prompt.round != m.current_round {
            return Self::reject(wrong_phase(Phase::PROMPTS, phase));
        }

        let me = self.load_fighter(&actor.id).await?;
        let author_id = if prompt.is_combatant(&me.id) {
            if me.knocked_out {
                return Self::reject(Rejection::KnockedOut);
            }
            me.id.clone()
        } else {
            match &me.team_id {
                Some(captain) if me.role == Role::CornerMan && prompt.is_combatant(captain) => {
                    captain.clone()
                }
                _ => return Self::reject(Rejection::NotAssigned),
            }
        };

        let text = text.trim();
        if text.is_empty() {
            return Self::reject(Rejection::EmptyAnswer);
        }
        let len = text.chars().count();
        let max = self.config.answers.max_length;
        if len > max {
            return Self::reject(Rejection::AnswerTooLong { len, max });
        }
        if prompt.prompt_type == PromptType::Jab {
            let words = text.split_whitespace().count();
            if words != 1 {
                return Self::reject(Rejection::JabTooManyWords { words });
            }
        }
        match (prompt.prompt_type, attack_type) {
            (PromptType::Final, None) => return Self::reject(Rejection::AttackTypeRequired),
            (PromptType::Standard | PromptType::Jab | PromptType::Haymaker, Some(_)) => {
                return Self::reject(Rejection::AttackTypeNotAllowed);
            }
            _ => {}
        }

        let mut submission = Submission {
            id: DocId::submission(&prompt.id, &author_id),
            seq: 0,
            match_id: prompt.match_id.clone(),
            prompt_id: prompt.id.clone(),
            author_id,
            submitted_by: me.id.clone(),
            text: text.to_string(),
            attack_type,
        };
        submission.seq = match self.db.insert(&submission).await {
            Ok(seq) => seq,
            Err(StoreError::Duplicate(_)) => return Self::reject(Rejection::DuplicateSubmission),
            Err(e) => return Err(e.into()),
        };
        debug!(
            match_id = %submission.match_id,
            prompt_id = %submission.prompt_id,
            author_id = %submission.author_id,
            submitted_by = %submission.submitted_by,
            "answer submitted"
        );

        self.check_submissions(&submission.match_id).await?;
        Ok(submission)
    }

    /// Casts a vote on the battle currently open for voting.
    ///
    /// The last expected vote reveals the battle.
    ///
    /// # Errors
    ///
    /// Rejections for wrong phase or prompt, combatants, loyal corner men,
    /// answers from another battle, and repeat votes.
    pub async fn submit_vote(
        &self,
        actor: &Actor,
        prompt_id: &DocId,
        submission_id: &DocId,
    ) -> Result<Vote, GameError> {
        let m = self.load_match(&actor.match_id).await?;
        let phase = Phase::of(&m);
        if phase != Phase::VOTING || m.current_prompt_id.as_ref() != Some(prompt_id) {
            return Self::reject(wrong_phase(Phase::VOTING, phase));
        }

        let prompt = self.load_prompt(prompt_id).await?;
        let voter = self.load_fighter(&actor.id).await?;
        if let Err(rejection) = tally::check_eligible(&prompt, &voter) {
            return Self::reject(rejection);
        }

        let submission: Submission = self
            .db
            .get(submission_id)
            .await?
            .ok_or_else(|| GameError::not_found("submission", submission_id))?;
        if submission.prompt_id != prompt.id {
            return Self::reject(Rejection::SubmissionNotInPrompt);
        }

        let mut vote = Vote {
            id: DocId::vote(&prompt.id, &voter.id),
            seq: 0,
            match_id: m.id.clone(),
            prompt_id: prompt.id.clone(),
            voter_id: voter.id.clone(),
            submission_id: submission.id.clone(),
        };
        vote.seq = match self.db.insert(&vote).await {
            Ok(seq) => seq,
            Err(StoreError::Duplicate(_)) => return Self::reject(Rejection::DuplicateVote),
            Err(e) => return Err(e.into()),
        };
        debug!(match_id = %m.id, %prompt_id, voter_id = %vote.voter_id, "vote cast");

        self.check_votes(&m.id, prompt_id).await?;
        Ok(vote)
    }

    /// A corner man sends advice to their captain.
    ///
    /// # Errors
    ///
    /// [`Rejection::NotCornerMan`] unless the sender backs a captain; length
    /// and phase rejections otherwise.
    pub async fn send_suggestion(&self, actor: &Actor, text: &str) -> Result<Suggestion, GameError> {
        let me = self.load_fighter(&actor.id).await?;
        let Some(captain) = me.team_id.clone().filter(|_| me.role == Role::CornerMan) else {
            return Self::reject(Rejection::NotCornerMan);
        };
        let m = self.load_match(&me.match_id).await?;
        if Phase::of(&m).is_terminal() {
            return Self::reject(wrong_phase(Phase::PROMPTS, Phase::of(&m)));
        }

        let text = text.trim();
        if text.is_empty() {
            return Self::reject(Rejection::EmptyAnswer);
        }
        let len = text.chars().count();
        let max = self.config.answers.max_suggestion_length;
        if len > max {
            return Self::reject(Rejection::SuggestionTooLong { len, max });
        }

        let mut suggestion = Suggestion {
            id: DocId::generate(Kind::Suggestion),
            seq: 0,
            match_id: me.match_id.clone(),
            from_id: me.id.clone(),
            to_id: captain,
            text: text.to_string(),
            created_at: Utc::now(),
        };
        suggestion.seq = self.db.insert(&suggestion).await?;
        Ok(suggestion)
    }

    /// Suggestions sent to `captain_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn suggestions_for(&self, captain_id: &DocId) -> Result<Vec<Suggestion>, GameError> {
        Ok(self.db.query("to_id", captain_id).await?)
    }
}
