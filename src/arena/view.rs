use serde::Serialize;

use crate::error::GameError;
use crate::model::{DocId, Fighter, Match, Prompt, Submission, Vote};

use super::Arena;

/// Everything a client needs to render a match.
#[derive(Debug, Clone, Serialize)]
pub struct MatchView {
    /// Match record. Carries the host token, so only hand it to the host.
    #[serde(rename = "match")]
    pub game: Match,
    /// Participants in join order
    pub participants: Vec<Fighter>,
    /// Prompts of the current round
    pub prompts: Vec<Prompt>,
    /// Answers to the current prompt
    pub submissions: Vec<Submission>,
    /// Votes on the current prompt
    pub votes: Vec<Vote>,
}

impl MatchView {
    /// Live fighters, most HP first.
    #[must_use]
    pub fn standings(&self) -> Vec<&Fighter> {
        let mut live: Vec<&Fighter> = self
            .participants
            .iter()
            .filter(|f| f.is_live_fighter())
            .collect();
        live.sort_by_key(|f| (std::cmp::Reverse(f.hp), f.seq));
        live
    }

    /// Participant by id.
    #[must_use]
    pub fn participant(&self, id: &DocId) -> Option<&Fighter> {
        self.participants.iter().find(|f| &f.id == id)
    }
}

impl Arena {
    /// Snapshot of a match for display.
    ///
    /// # Errors
    ///
    /// [`GameError::NotFound`] for an unknown match.
    pub async fn match_view(&self, match_id: &DocId) -> Result<MatchView, GameError> {
        let game = self.load_match(match_id).await?;
        let participants = self.participants(match_id).await?;
        let prompts = self.round_prompts(match_id, game.current_round).await?;
        let (submissions, votes) = match &game.current_prompt_id {
            Some(prompt_id) => (
                self.prompt_submissions(prompt_id).await?,
                self.prompt_votes(prompt_id).await?,
            ),
            None => (Vec::new(), Vec::new()),
        };

        Ok(MatchView {
            game,
            participants,
            prompts,
            submissions,
            votes,
        })
    }
}
