//! Lobby: creating, joining and starting matches.

use chrono::Utc;
use tracing::info;

use crate::error::{GameError, Rejection};
use crate::identity::{Actor, Authenticator, new_token};
use crate::model::{DocId, Fighter, Kind, Match, Role, Status};
use crate::observability::{Event, metrics};
use crate::phase::{self, Advance, Expected, Phase, PhaseUpdate};
use crate::rounds::{self, MAIN_ROUND};

use super::Arena;

impl Arena {
    fn clean_name(&self, raw: &str) -> Result<String, GameError> {
        let name = raw.trim();
        if name.is_empty() {
            return Self::reject(Rejection::InvalidName("name cannot be empty".into()));
        }
        let max = self.config.answers.max_name_length;
        if name.chars().count() > max {
            return Self::reject(Rejection::InvalidName(format!(
                "name is longer than {max} characters"
            )));
        }
        Ok(name.to_string())
    }

    /// Opens a lobby. The returned match carries the host token.
    ///
    /// # Errors
    ///
    /// Rejects blank or oversized names; propagates storage failures.
    pub async fn create_match(&self, name: &str) -> Result<Match, GameError> {
        let name = self.clean_name(name)?;
        let mut m = Match {
            id: DocId::generate(Kind::Match),
            seq: 0,
            name,
            status: Status::Lobby,
            round_status: None,
            current_round: 0,
            max_rounds: self.config.rounds.max_rounds,
            current_prompt_id: None,
            transitioning: false,
            host_token: new_token(),
            created_at: Utc::now(),
            winner_id: None,
            end_reason: None,
        };
        m.seq = self.db.insert(&m).await?;

        info!(match_id = %m.id, name = %m.name, "match created");
        metrics::match_opened();
        self.emit(Event::MatchCreated {
            timestamp: m.created_at,
            match_id: m.id.clone(),
            name: m.name.clone(),
        });
        Ok(m)
    }

    /// Adds a participant to a lobby. The returned record carries the
    /// participant's join token.
    ///
    /// # Errors
    ///
    /// Rejects joins outside the lobby, into a full match, or with a bad
    /// name. Unknown matches are [`GameError::NotFound`].
    pub async fn join_match(
        &self,
        match_id: &DocId,
        name: &str,
        is_bot: bool,
    ) -> Result<Fighter, GameError> {
        let m = self.load_match(match_id).await?;
        if m.status != Status::Lobby || m.transitioning {
            return Self::reject(Rejection::WrongPhase {
                expected: Phase::LOBBY.to_string(),
                actual: Phase::of(&m).to_string(),
            });
        }
        let name = self.clean_name(name)?;

        let max = self.config.rounds.max_participants;
        if self.participants(match_id).await?.len() >= max {
            return Self::reject(Rejection::MatchFull { max });
        }

        let hp = self.config.rounds.starting_hp;
        let mut fighter = Fighter {
            id: DocId::generate(Kind::Fighter),
            seq: 0,
            match_id: match_id.clone(),
            name,
            role: Role::Fighter,
            hp,
            max_hp: hp,
            knocked_out: false,
            win_streak: 0,
            team_id: None,
            is_bot,
            token: new_token(),
            seed: None,
        };
        fighter.seq = self.db.insert(&fighter).await?;

        info!(%match_id, fighter_id = %fighter.id, name = %fighter.name, is_bot, "fighter joined");
        self.emit(Event::FighterJoined {
            timestamp: Utc::now(),
            match_id: match_id.clone(),
            fighter_id: fighter.id.clone(),
            name: fighter.name.clone(),
            is_bot,
        });
        Ok(fighter)
    }

    /// Host adds an automated fighter.
    ///
    /// # Errors
    ///
    /// [`GameError::Unauthorized`] for a bad host token, otherwise as
    /// [`join_match`](Self::join_match).
    pub async fn add_bot(
        &self,
        match_id: &DocId,
        host_token: &str,
        name: &str,
    ) -> Result<Fighter, GameError> {
        let m = self.load_match(match_id).await?;
        Self::verify_host(&m, host_token)?;
        self.join_match(match_id, name, true).await
    }

    /// Resolves a participant credential.
    ///
    /// # Errors
    ///
    /// See [`Authenticator::validate_actor`].
    pub async fn authenticate(&self, actor_id: &DocId, token: &str) -> Result<Actor, GameError> {
        self.auth.validate_actor(actor_id, token).await
    }

    /// Host starts the match: Main Round setup, then LOBBY → PROMPTS.
    ///
    /// Returns [`Advance::RaceLost`] if the match already left the lobby.
    ///
    /// # Errors
    ///
    /// [`GameError::Unauthorized`] for a bad host token and
    /// [`Rejection::NotEnoughFighters`] below the configured minimum.
    pub async fn start_match(&self, match_id: &DocId, host_token: &str) -> Result<Advance, GameError> {
        let m = self.load_match(match_id).await?;
        Self::verify_host(&m, host_token)?;
        if m.status != Status::Lobby {
            return Ok(Advance::RaceLost);
        }

        let fighters = self.participants(match_id).await?;
        let min = self.config.rounds.min_fighters;
        if fighters.len() < min {
            return Self::reject(Rejection::NotEnoughFighters {
                min,
                have: fighters.len(),
            });
        }

        let Some(lease) = phase::acquire(&self.db, match_id, &Expected::phase(Phase::LOBBY)).await? else {
            return Ok(Advance::RaceLost);
        };

        let plans = self.with_rng(|rng| rounds::plan_main_round(&fighters, &self.config, rng));
        if let Err(e) = self.insert_prompts(match_id, MAIN_ROUND, plans).await {
            return Err(Self::abandon(lease, e).await);
        }

        let t = lease
            .commit(
                PhaseUpdate::to(Phase::PROMPTS).round(MAIN_ROUND).no_prompt(),
                "match started",
            )
            .await?;
        self.emit_transition(&t);
        self.schedule_answers(match_id, MAIN_ROUND).await?;
        Ok(Advance::Advanced(t))
    }
}
