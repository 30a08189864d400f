//! Phase advancement: completion checks, battle resolution, round
//! transitions and cleanup.
//!
//! Every transition follows the same shape: check the snapshot, take the
//! guard pinned to that snapshot, do the writes, commit. A caller that loses
//! the guard returns [`Advance::RaceLost`] without writing anything.

use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::cut;
use crate::damage::{self, Battle, ComboTier, Combatant, Corner};
use crate::error::GameError;
use crate::model::{DocId, Fighter, Match, Prompt, Role, Status, Submission, Suggestion, Vote};
use crate::observability::{Event, metrics};
use crate::phase::{self, Advance, Expected, Lease, Phase, PhaseTransition, PhaseUpdate};
use crate::rounds::{self, FINAL, MAIN_ROUND, PromptPlan, SEMI_FINALS};
use crate::scheduler::ScheduledAction;
use crate::tally::{self, BattleTally};

use super::Arena;

/// What the next round looks like once its records are written.
enum RoundSetup {
    Play { round: u8, reason: &'static str },
    End { winner: Option<DocId>, reason: &'static str },
}

/// Where the match goes after a revealed battle.
enum AfterReveal {
    SuddenDeath,
    Battle(Prompt),
    RoundOver,
}

impl Arena {
    // ========================================================================
    // Completion checks
    // ========================================================================

    /// Moves PROMPTS → VOTING once every combatant has answered.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn check_submissions(&self, match_id: &DocId) -> Result<Advance, GameError> {
        let m = self.load_match(match_id).await?;
        if Phase::of(&m) != Phase::PROMPTS || m.transitioning {
            return Ok(Advance::RaceLost);
        }

        let round = m.current_round;
        let prompts = self.round_prompts(match_id, round).await?;
        let submissions = self.match_submissions(match_id).await?;
        let progress = tally::submission_progress(&prompts, &submissions);
        if !progress.is_complete() {
            debug!(%match_id, expected = progress.expected, received = progress.received, "waiting for answers");
            return Ok(Advance::NotReady("waiting for answers"));
        }

        let fighters = self.participants(match_id).await?;
        let Some(first) = rounds::first_battle(round, &prompts, &fighters, &self.config).cloned() else {
            warn!(%match_id, round, "answers complete but no playable battle");
            return Ok(Advance::NotReady("no playable battle"));
        };

        let expected = Expected::phase(Phase::PROMPTS).round(round);
        let Some(lease) = phase::acquire(&self.db, match_id, &expected).await? else {
            return Ok(Advance::RaceLost);
        };
        let t = lease
            .commit(PhaseUpdate::to(Phase::VOTING).prompt(&first.id), "answers complete")
            .await?;
        self.emit_transition(&t);
        self.open_battle(&first).await?;
        Ok(Advance::Advanced(t))
    }

    /// Reveals the battle once every eligible voter has voted.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn check_votes(&self, match_id: &DocId, prompt_id: &DocId) -> Result<Advance, GameError> {
        let m = self.load_match(match_id).await?;
        if Phase::of(&m) != Phase::VOTING
            || m.transitioning
            || m.current_prompt_id.as_ref() != Some(prompt_id)
        {
            return Ok(Advance::RaceLost);
        }

        let prompt = self.load_prompt(prompt_id).await?;
        let participants = self.participants(match_id).await?;
        let votes = self.prompt_votes(prompt_id).await?;
        if !tally::voting_complete(&prompt, &participants, &votes) {
            return Ok(Advance::NotReady("waiting for votes"));
        }
        self.reveal(&m.id, &prompt).await
    }

    /// Schedules bot votes on a battle that just opened, or reveals it at
    /// once when nobody is allowed to vote on it.
    async fn open_battle(&self, prompt: &Prompt) -> Result<(), GameError> {
        let participants = self.participants(&prompt.match_id).await?;
        if participants.iter().any(|p| tally::is_eligible(prompt, p)) {
            self.schedule_votes(prompt, &participants);
            return Ok(());
        }
        warn!(match_id = %prompt.match_id, prompt_id = %prompt.id, "battle has no eligible voters");
        self.reveal(&prompt.match_id, prompt).await?;
        Ok(())
    }

    // ========================================================================
    // Reveal
    // ========================================================================

    /// VOTING → REVEAL: tallies the battle and applies damage.
    ///
    /// Ends the match when fewer than two fighters are left standing, or
    /// when a Final battle has no jury.
    ///
    /// # Errors
    ///
    /// Propagates storage failures. The guard is released on failure.
    pub(super) async fn reveal(&self, match_id: &DocId, prompt: &Prompt) -> Result<Advance, GameError> {
        let expected = Expected::phase(Phase::VOTING)
            .round(prompt.round)
            .prompt(&prompt.id);
        let Some(lease) = phase::acquire(&self.db, match_id, &expected).await? else {
            return Ok(Advance::RaceLost);
        };

        let fighters = match self.resolve_battle(prompt).await {
            Ok(fighters) => fighters,
            Err(e) => return Err(Self::abandon(lease, e).await),
        };

        let live = fighters.iter().filter(|f| f.is_live_fighter()).count();
        let juryless = !fighters.iter().any(|f| tally::is_eligible(prompt, f));
        let winner = cut::champion(&fighters).map(|f| f.id.clone());

        if live < 2 {
            return self.end_match(lease, winner, "knockout").await;
        }
        if juryless && prompt.round == FINAL {
            return self.end_match(lease, winner, "no jury").await;
        }

        let t = lease
            .commit(PhaseUpdate::to(Phase::REVEAL), "votes in")
            .await?;
        self.emit_transition(&t);
        if let Some(delay) = self.config.bots.auto_advance {
            self.scheduler.run_after(
                delay,
                ScheduledAction::AdvanceBattle {
                    match_id: match_id.clone(),
                    prompt_id: prompt.id.clone(),
                },
            );
        }
        Ok(Advance::Advanced(t))
    }

    /// Tallies votes, applies damage and returns the refreshed roster.
    async fn resolve_battle(&self, prompt: &Prompt) -> Result<Vec<Fighter>, GameError> {
        let [left_id, right_id] = prompt.assigned_to.as_slice() else {
            return Err(GameError::not_found("matchup", &prompt.id));
        };

        let fighters = self.participants(&prompt.match_id).await?;
        let round_prompts = self.round_prompts(&prompt.match_id, prompt.round).await?;
        let submissions = self.prompt_submissions(&prompt.id).await?;
        let votes = self.prompt_votes(&prompt.id).await?;
        let votes = BattleTally::count(&votes);

        let combatant = |id: &DocId| -> Result<Combatant, GameError> {
            let f = fighters
                .iter()
                .find(|f| &f.id == id)
                .ok_or_else(|| GameError::not_found("participant", id))?;
            let answer = tally::submission_of(&submissions, &prompt.id, id);
            Ok(Combatant {
                hp: f.hp,
                win_streak: f.win_streak,
                votes: answer.map_or(0, |s| votes.votes_for(&s.id)),
                answer_len: answer.map_or(usize::MAX, |s| s.text.chars().count()),
                attack: answer.and_then(|s| s.attack_type),
            })
        };

        let battle = Battle {
            round: prompt.round,
            left: combatant(left_id)?,
            right: combatant(right_id)?,
            bragging: rounds::is_bragging_round(
                prompt,
                &round_prompts,
                &fighters,
                &self.config.rounds.semi_finals,
            ),
        };
        let outcome = damage::resolve(&self.config.damage, &battle);

        if !battle.bragging {
            for (corner, id) in [(Corner::Left, left_id), (Corner::Right, right_id)] {
                let side = outcome.side(corner);
                let mut fields = json!({ "hp": side.hp, "win_streak": side.win_streak });
                if side.knocked_out {
                    fields["knocked_out"] = Value::Bool(true);
                    info!(match_id = %prompt.match_id, fighter_id = %id, round = prompt.round, "knockout");
                    metrics::record_knockout(prompt.round);
                }
                self.db.patch(id, fields).await?;
                metrics::record_damage(prompt.round, side.damage);
            }
            metrics::record_combo(outcome.combo_tier);
            if outcome.combo_tier == ComboTier::Finisher {
                info!(match_id = %prompt.match_id, prompt_id = %prompt.id, "finisher landed");
            }
        }

        debug!(
            match_id = %prompt.match_id,
            prompt_id = %prompt.id,
            left_votes = battle.left.votes,
            right_votes = battle.right.votes,
            left_damage = outcome.left.damage,
            right_damage = outcome.right.damage,
            bragging = battle.bragging,
            "battle resolved"
        );
        self.emit(Event::DamageResolved {
            timestamp: Utc::now(),
            match_id: prompt.match_id.clone(),
            prompt_id: prompt.id.clone(),
            round: prompt.round,
            left_id: left_id.clone(),
            right_id: right_id.clone(),
            left_votes: battle.left.votes,
            right_votes: battle.right.votes,
            damage: outcome.event(),
            tie: outcome.tie,
            bragging: battle.bragging,
        });

        Ok(self.participants(&prompt.match_id).await?)
    }

    // ========================================================================
    // Between battles
    // ========================================================================

    /// Leaves REVEAL: next battle, sudden-death prompt, or ROUND_RESULTS.
    ///
    /// # Errors
    ///
    /// Propagates storage failures. The guard is released on failure.
    pub async fn advance_battle(&self, match_id: &DocId, prompt_id: &DocId) -> Result<Advance, GameError> {
        let m = self.load_match(match_id).await?;
        if Phase::of(&m) != Phase::REVEAL || m.current_prompt_id.as_ref() != Some(prompt_id) {
            return Ok(Advance::RaceLost);
        }

        let round = m.current_round;
        let expected = Expected::phase(Phase::REVEAL).round(round).prompt(prompt_id);
        let Some(lease) = phase::acquire(&self.db, match_id, &expected).await? else {
            return Ok(Advance::RaceLost);
        };

        let step = match self.after_reveal(match_id, round, prompt_id).await {
            Ok(step) => step,
            Err(e) => return Err(Self::abandon(lease, e).await),
        };

        match step {
            AfterReveal::SuddenDeath => {
                let t = lease
                    .commit(PhaseUpdate::to(Phase::PROMPTS).no_prompt(), "sudden death")
                    .await?;
                self.emit_transition(&t);
                self.schedule_answers(match_id, round).await?;
                Ok(Advance::Advanced(t))
            }
            AfterReveal::Battle(next) => {
                let t = lease
                    .commit(PhaseUpdate::to(Phase::VOTING).prompt(&next.id), "next battle")
                    .await?;
                self.emit_transition(&t);
                self.open_battle(&next).await?;
                Ok(Advance::Advanced(t))
            }
            AfterReveal::RoundOver => {
                let t = lease
                    .commit(PhaseUpdate::to(Phase::ROUND_RESULTS).no_prompt(), "round over")
                    .await?;
                self.emit_transition(&t);
                if let Some(delay) = self.config.bots.auto_advance {
                    self.scheduler.run_after(
                        delay,
                        ScheduledAction::AdvanceRound {
                            match_id: match_id.clone(),
                            round,
                        },
                    );
                }
                Ok(Advance::Advanced(t))
            }
        }
    }

    async fn after_reveal(
        &self,
        match_id: &DocId,
        round: u8,
        prompt_id: &DocId,
    ) -> Result<AfterReveal, GameError> {
        let current = self.load_prompt(prompt_id).await?;
        let prompts = self.round_prompts(match_id, round).await?;

        if round == FINAL {
            let [a, b] = current.assigned_to.as_slice() else {
                return Err(GameError::not_found("matchup", prompt_id));
            };
            let pair = (a.clone(), b.clone());
            let plan = self.with_rng(|rng| rounds::plan_final_prompt(&pair, &self.config, &prompts, rng));
            self.insert_prompts(match_id, FINAL, vec![plan]).await?;
            return Ok(AfterReveal::SuddenDeath);
        }

        let fighters = self.participants(match_id).await?;
        Ok(
            match rounds::next_battle(&current, &prompts, &fighters, &self.config) {
                Some(next) => AfterReveal::Battle(next.clone()),
                None => AfterReveal::RoundOver,
            },
        )
    }

    /// Host moves on from a revealed battle.
    ///
    /// # Errors
    ///
    /// [`GameError::Unauthorized`] for a bad host token.
    pub async fn next_battle(&self, match_id: &DocId, host_token: &str) -> Result<Advance, GameError> {
        let m = self.load_match(match_id).await?;
        Self::verify_host(&m, host_token)?;
        match (Phase::of(&m), &m.current_prompt_id) {
            (Phase::REVEAL, Some(prompt_id)) => self.advance_battle(match_id, prompt_id).await,
            _ => Ok(Advance::NotReady("no battle is being revealed")),
        }
    }

    // ========================================================================
    // Between rounds
    // ========================================================================

    /// Leaves ROUND_RESULTS for the next round, or ends the match.
    ///
    /// # Errors
    ///
    /// Propagates storage failures. The guard is released on failure.
    pub async fn advance_round(&self, match_id: &DocId, round: u8) -> Result<Advance, GameError> {
        let m = self.load_match(match_id).await?;
        if Phase::of(&m) != Phase::ROUND_RESULTS || m.current_round != round {
            return Ok(Advance::RaceLost);
        }

        let expected = Expected::phase(Phase::ROUND_RESULTS).round(round);
        let Some(lease) = phase::acquire(&self.db, match_id, &expected).await? else {
            return Ok(Advance::RaceLost);
        };

        let setup = if round >= m.max_rounds {
            Ok(RoundSetup::End {
                winner: None,
                reason: "all rounds played",
            })
        } else {
            match round {
                MAIN_ROUND => self.setup_semi_finals(match_id).await,
                SEMI_FINALS => self.setup_final(match_id).await,
                _ => Ok(RoundSetup::End {
                    winner: None,
                    reason: "all rounds played",
                }),
            }
        };

        match setup {
            Ok(RoundSetup::Play { round: next, reason }) => {
                let t = lease
                    .commit(PhaseUpdate::to(Phase::PROMPTS).round(next).no_prompt(), reason)
                    .await?;
                self.emit_transition(&t);
                self.schedule_answers(match_id, next).await?;
                Ok(Advance::Advanced(t))
            }
            Ok(RoundSetup::End { winner, reason }) => {
                let winner = match winner {
                    Some(w) => Some(w),
                    None => match self.participants(match_id).await {
                        Ok(fighters) => cut::champion(&fighters).map(|f| f.id.clone()),
                        Err(e) => return Err(Self::abandon(lease, e).await),
                    },
                };
                self.end_match(lease, winner, reason).await
            }
            Err(e) => Err(Self::abandon(lease, e).await),
        }
    }

    /// Host starts the next round.
    ///
    /// # Errors
    ///
    /// [`GameError::Unauthorized`] for a bad host token.
    pub async fn next_round(&self, match_id: &DocId, host_token: &str) -> Result<Advance, GameError> {
        let m = self.load_match(match_id).await?;
        Self::verify_host(&m, host_token)?;
        if Phase::of(&m) != Phase::ROUND_RESULTS {
            return Ok(Advance::NotReady("round is still in progress"));
        }
        self.advance_round(match_id, m.current_round).await
    }

    /// The Cut, then Semi-Finals prompts.
    async fn setup_semi_finals(&self, match_id: &DocId) -> Result<RoundSetup, GameError> {
        let fighters = self.participants(match_id).await?;
        let plan = match cut::plan_cut(&fighters, self.config.rounds.semi_finals.finalists) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(%match_id, error = %e, "cannot seed the semi-finals");
                return Ok(RoundSetup::End {
                    winner: cut::champion(&fighters).map(|f| f.id.clone()),
                    reason: "invalid bracket",
                });
            }
        };

        for (seed, id) in (1u32..).zip(&plan.advancing) {
            self.db
                .patch(id, json!({ "seed": seed, "win_streak": 0 }))
                .await?;
        }
        for assignment in &plan.corner_men {
            self.db
                .patch(
                    &assignment.corner_man,
                    json!({
                        "role": Role::CornerMan,
                        "team_id": assignment.captain,
                        "win_streak": 0,
                    }),
                )
                .await?;
        }
        info!(
            %match_id,
            advancing = plan.advancing.len(),
            corner_men = plan.corner_men.len(),
            "cut applied"
        );
        self.emit(Event::CutApplied {
            timestamp: Utc::now(),
            match_id: match_id.clone(),
            advancing: plan.advancing.clone(),
            corner_men: plan.corner_men.clone(),
        });

        self.clear_round(match_id, MAIN_ROUND).await?;
        let bracket = rounds::seed_semi_finals(&plan.advancing);
        let plans = self.with_rng(|rng| rounds::plan_semi_finals(&bracket, &self.config, rng));
        self.insert_prompts(match_id, SEMI_FINALS, plans).await?;

        Ok(RoundSetup::Play {
            round: SEMI_FINALS,
            reason: "the cut",
        })
    }

    /// Final entry, then the first sudden-death prompt.
    async fn setup_final(&self, match_id: &DocId) -> Result<RoundSetup, GameError> {
        let fighters = self.participants(match_id).await?;
        let semi_prompts = self.round_prompts(match_id, SEMI_FINALS).await?;
        let entry = rounds::final_entry(&semi_prompts, &fighters);

        let [a, b] = entry.finalists.as_slice() else {
            return Ok(RoundSetup::End {
                winner: entry.finalists.first().cloned(),
                reason: "semi-finals decided the match",
            });
        };

        for id in &entry.eliminated {
            self.db
                .patch(
                    id,
                    json!({ "role": Role::CornerMan, "team_id": null, "win_streak": 0 }),
                )
                .await?;
        }
        let hp = self.config.rounds.final_round.hp;
        for id in &entry.finalists {
            self.db.patch(id, json!({ "hp": hp, "max_hp": hp })).await?;
        }
        info!(%match_id, left = %a, right = %b, "finalists decided");

        self.clear_round(match_id, SEMI_FINALS).await?;
        let pair = (a.clone(), b.clone());
        let plan = self.with_rng(|rng| rounds::plan_final_prompt(&pair, &self.config, &[], rng));
        self.insert_prompts(match_id, FINAL, vec![plan]).await?;

        Ok(RoundSetup::Play {
            round: FINAL,
            reason: "final",
        })
    }

    // ========================================================================
    // Records
    // ========================================================================

    /// Stores planned prompts in order.
    pub(super) async fn insert_prompts(
        &self,
        match_id: &DocId,
        round: u8,
        plans: Vec<PromptPlan>,
    ) -> Result<Vec<Prompt>, GameError> {
        let mut stored = Vec::with_capacity(plans.len());
        for plan in plans {
            let mut prompt = plan.into_prompt(match_id, round);
            prompt.seq = self.db.insert(&prompt).await?;
            stored.push(prompt);
        }
        debug!(%match_id, round, prompts = stored.len(), "prompts created");
        Ok(stored)
    }

    /// Deletes a finished round's prompts with their answers and votes.
    async fn clear_round(&self, match_id: &DocId, round: u8) -> Result<(), GameError> {
        for prompt in self.round_prompts(match_id, round).await? {
            for s in self.prompt_submissions(&prompt.id).await? {
                self.db.delete(&s.id).await?;
            }
            for v in self.prompt_votes(&prompt.id).await? {
                self.db.delete(&v.id).await?;
            }
            self.db.delete(&prompt.id).await?;
        }
        Ok(())
    }

    // ========================================================================
    // End of match
    // ========================================================================

    async fn end_match(
        &self,
        lease: Lease,
        winner: Option<DocId>,
        reason: &'static str,
    ) -> Result<Advance, GameError> {
        let t = lease
            .commit(PhaseUpdate::to(Phase::RESULTS).ended(winner.clone(), reason), reason)
            .await?;
        self.emit_transition(&t);
        self.finish(&t, winner);
        Ok(Advance::Advanced(t))
    }

    fn finish(&self, t: &PhaseTransition, winner: Option<DocId>) {
        match &winner {
            Some(w) => info!(match_id = %t.match_id, winner_id = %w, reason = %t.reason, "match ended"),
            None => info!(match_id = %t.match_id, reason = %t.reason, "match ended without a winner"),
        }
        self.emit(Event::MatchEnded {
            timestamp: Utc::now(),
            match_id: t.match_id.clone(),
            winner_id: winner,
            reason: t.reason.clone(),
        });
        self.scheduler.run_after(
            self.config.cleanup_delay,
            ScheduledAction::CleanupMatch {
                match_id: t.match_id.clone(),
            },
        );
    }

    /// Deletes a finished match and everything in it.
    ///
    /// Returns `false` when the match is gone or not finished.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn cleanup(&self, match_id: &DocId) -> Result<bool, GameError> {
        let Some(m) = self.db.get::<Match>(match_id).await? else {
            return Ok(false);
        };
        if m.status != Status::Results {
            debug!(%match_id, status = %m.status, "cleanup skipped, match still running");
            return Ok(false);
        }

        let mut ids: Vec<DocId> = Vec::new();
        ids.extend(self.db.query::<Vote>("match_id", match_id).await?.into_iter().map(|d| d.id));
        ids.extend(
            self.db
                .query::<Submission>("match_id", match_id)
                .await?
                .into_iter()
                .map(|d| d.id),
        );
        ids.extend(self.db.query::<Prompt>("match_id", match_id).await?.into_iter().map(|d| d.id));
        ids.extend(
            self.db
                .query::<Suggestion>("match_id", match_id)
                .await?
                .into_iter()
                .map(|d| d.id),
        );
        ids.extend(self.participants(match_id).await?.into_iter().map(|d| d.id));
        for id in &ids {
            self.db.delete(id).await?;
        }
        self.db.delete(match_id).await?;

        info!(%match_id, documents = ids.len() + 1, "match cleaned up");
        metrics::match_closed();
        Ok(true)
    }
}
