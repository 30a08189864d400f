//! Bot scheduling and the scheduled-action dispatcher.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::bots;
use crate::error::GameError;
use crate::identity::Actor;
use crate::model::{DocId, Fighter, Match, Prompt, Submission};
use crate::observability::metrics;
use crate::phase::Phase;
use crate::scheduler::ScheduledAction;
use crate::tally;

use super::Arena;

impl Arena {
    /// Schedules an answer for every unanswered prompt slot a bot can fill.
    pub(super) async fn schedule_answers(&self, match_id: &DocId, round: u8) -> Result<(), GameError> {
        let prompts = self.round_prompts(match_id, round).await?;
        let participants = self.participants(match_id).await?;
        let submissions = self.match_submissions(match_id).await?;

        for prompt in &prompts {
            let all_bots = bots::battle_is_all_bots(prompt, &participants);
            for author_id in &prompt.assigned_to {
                if tally::submission_of(&submissions, &prompt.id, author_id).is_some() {
                    continue;
                }
                let Some(author) = participants.iter().find(|p| &p.id == author_id) else {
                    continue;
                };
                let Some(bot) = bots::answering_bot(author, &participants) else {
                    continue;
                };
                let delay = self.with_rng(|rng| bots::delay(&self.config.bots, all_bots, rng));
                self.scheduler.run_after(
                    delay,
                    ScheduledAction::BotAnswer {
                        match_id: match_id.clone(),
                        prompt_id: prompt.id.clone(),
                        author_id: author_id.clone(),
                        actor_id: bot.id.clone(),
                        round,
                    },
                );
            }
        }
        Ok(())
    }

    /// Schedules a vote from every eligible bot.
    pub(super) fn schedule_votes(&self, prompt: &Prompt, participants: &[Fighter]) {
        let all_bots = bots::battle_is_all_bots(prompt, participants);
        for voter in participants
            .iter()
            .filter(|p| p.is_bot && tally::is_eligible(prompt, p))
        {
            let delay = self.with_rng(|rng| bots::delay(&self.config.bots, all_bots, rng));
            self.scheduler.run_after(
                delay,
                ScheduledAction::BotVote {
                    match_id: prompt.match_id.clone(),
                    prompt_id: prompt.id.clone(),
                    voter_id: voter.id.clone(),
                },
            );
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Runs a scheduled action.
    ///
    /// Actions whose match, phase, round or prompt moved on are skipped, and
    /// so are actions the rules reject. Only storage failures surface.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn handle(&self, action: ScheduledAction) -> Result<(), GameError> {
        let kind = action.kind();
        match self.dispatch(&action).await {
            Ok(true) => {
                metrics::record_bot_action(kind);
                Ok(())
            }
            Ok(false) => {
                debug!(match_id = %action.match_id(), kind, "stale scheduled action skipped");
                Ok(())
            }
            Err(GameError::Rejected(rejection)) => {
                debug!(match_id = %action.match_id(), kind, %rejection, "scheduled action rejected");
                Ok(())
            }
            Err(GameError::NotFound { kind: what, id }) => {
                debug!(match_id = %action.match_id(), kind, what, %id, "scheduled action target gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn dispatch(&self, action: &ScheduledAction) -> Result<bool, GameError> {
        let Some(m) = self.db.get::<Match>(action.match_id()).await? else {
            return Ok(false);
        };

        match action {
            ScheduledAction::BotAnswer {
                prompt_id,
                author_id,
                actor_id,
                round,
                ..
            } => {
                if Phase::of(&m) != Phase::PROMPTS || m.current_round != *round {
                    return Ok(false);
                }
                let submission_id = DocId::submission(prompt_id, author_id);
                if self.db.get::<Submission>(&submission_id).await?.is_some() {
                    return Ok(false);
                }
                let prompt = self.load_prompt(prompt_id).await?;
                let bot = self.load_fighter(actor_id).await?;
                let answer = self.strategy.answer(&prompt);
                self.submit_answer(&Actor::from(&bot), prompt_id, &answer.text, answer.attack_type)
                    .await?;
                Ok(true)
            }
            ScheduledAction::BotVote {
                prompt_id,
                voter_id,
                ..
            } => {
                if Phase::of(&m) != Phase::VOTING || m.current_prompt_id.as_ref() != Some(prompt_id) {
                    return Ok(false);
                }
                let prompt = self.load_prompt(prompt_id).await?;
                let submissions = self.prompt_submissions(prompt_id).await?;
                let Some(choice) = self.strategy.vote(&prompt, &submissions) else {
                    return Ok(false);
                };
                let voter = self.load_fighter(voter_id).await?;
                self.submit_vote(&Actor::from(&voter), prompt_id, &choice).await?;
                Ok(true)
            }
            ScheduledAction::AdvanceBattle { match_id, prompt_id } => {
                Ok(self.advance_battle(match_id, prompt_id).await?.is_advanced())
            }
            ScheduledAction::AdvanceRound { match_id, round } => {
                Ok(self.advance_round(match_id, *round).await?.is_advanced())
            }
            ScheduledAction::CleanupMatch { match_id } => self.cleanup(match_id).await,
        }
    }

    /// Executes actions from a [`TokioScheduler`](crate::scheduler::TokioScheduler)
    /// channel until `cancel` fires or the channel closes.
    pub async fn run_scheduled(
        self: Arc<Self>,
        mut rx: mpsc::UnboundedReceiver<ScheduledAction>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("scheduled action loop cancelled");
                    break;
                }
                action = rx.recv() => {
                    let Some(action) = action else {
                        debug!("scheduler channel closed");
                        break;
                    };
                    let arena = Arc::clone(&self);
                    tokio::spawn(async move {
                        let kind = action.kind();
                        if let Err(e) = arena.handle(action).await {
                            warn!(kind, error = %e, "scheduled action failed");
                        }
                    });
                }
            }
        }
    }
}
