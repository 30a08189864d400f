//! Shared integration-test harness: an [`Arena`] over the in-memory store
//! with a recording scheduler, plus helpers to push a match into a given
//! state.

#![allow(dead_code)]

use std::process::Output;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use roastbout::arena::Arena;
use roastbout::bots::HeckleBot;
use roastbout::config::GameConfig;
use roastbout::identity::Actor;
use roastbout::model::{DocId, Fighter, Match, Prompt, PromptType, Status};
use roastbout::scheduler::{RecordingScheduler, ScheduledAction};
use roastbout::store::Db;

/// Game config with one prompt per Main Round matchup and instant bots.
pub fn quick_config() -> GameConfig {
    let mut config = GameConfig::default();
    config.rounds.main_round.prompts_per_matchup = 1;
    config.bots.min_delay = Duration::from_millis(10);
    config.bots.max_delay = Duration::from_millis(20);
    config
}

/// Arena plus the scheduler it writes to.
pub struct Harness {
    pub arena: Arc<Arena>,
    pub scheduler: Arc<RecordingScheduler>,
}

#[allow(clippy::missing_panics_doc)]
impl Harness {
    pub fn new() -> Self {
        Self::with_config(quick_config())
    }

    pub fn with_config(config: GameConfig) -> Self {
        let scheduler = Arc::new(RecordingScheduler::new());
        let arena = Arena::new(Db::memory(), Arc::new(config), scheduler.clone())
            .with_seed(11)
            .with_strategy(Arc::new(HeckleBot::seeded(11)));
        Self {
            arena: Arc::new(arena),
            scheduler,
        }
    }

    pub fn db(&self) -> &Db {
        self.arena.db()
    }

    /// Opens a lobby with human `names`, in join order.
    pub async fn lobby(&self, names: &[&str]) -> (Match, Vec<Fighter>) {
        let m = self.arena.create_match("Test bout").await.unwrap();
        let mut fighters = Vec::new();
        for name in names {
            fighters.push(self.arena.join_match(&m.id, name, false).await.unwrap());
        }
        (m, fighters)
    }

    /// Lobby plus start.
    pub async fn started(&self, names: &[&str]) -> (Match, Vec<Fighter>) {
        let (m, fighters) = self.lobby(names).await;
        let advance = self.arena.start_match(&m.id, &m.host_token).await.unwrap();
        assert!(advance.is_advanced(), "start should advance: {advance:?}");
        (m, fighters)
    }

    pub async fn game(&self, match_id: &DocId) -> Match {
        self.db().get(match_id).await.unwrap().unwrap()
    }

    pub async fn fighter(&self, id: &DocId) -> Fighter {
        self.db().get(id).await.unwrap().unwrap()
    }

    pub async fn actor(&self, id: &DocId) -> Actor {
        Actor::from(&self.fighter(id).await)
    }

    pub async fn prompts(&self, match_id: &DocId) -> Vec<Prompt> {
        self.arena.match_view(match_id).await.unwrap().prompts
    }

    pub async fn current_prompt(&self, match_id: &DocId) -> Prompt {
        let id = self.game(match_id).await.current_prompt_id.unwrap();
        self.db().get(&id).await.unwrap().unwrap()
    }

    pub async fn patch(&self, id: &DocId, fields: serde_json::Value) {
        self.db().patch(id, fields).await.unwrap();
    }

    /// Sets the match to ROUND_RESULTS of `round` without playing it.
    pub async fn skip_to_round_results(&self, match_id: &DocId, round: u8) {
        self.patch(
            match_id,
            json!({
                "status": Status::RoundResults,
                "round_status": null,
                "current_round": round,
                "current_prompt_id": null,
            }),
        )
        .await;
    }

    /// Every combatant answers every prompt of the current round, except
    /// the slots listed in `skip` as `(prompt index, author)`.
    pub async fn answer_all_except(&self, match_id: &DocId, skip: &[(usize, &DocId)]) {
        let prompts = self.prompts(match_id).await;
        for (i, prompt) in prompts.iter().enumerate() {
            for author in &prompt.assigned_to {
                if skip.iter().any(|(idx, id)| *idx == i && *id == author) {
                    continue;
                }
                let actor = self.actor(author).await;
                let (text, attack) = answer_for(prompt, author);
                self.arena
                    .submit_answer(&actor, &prompt.id, &text, attack)
                    .await
                    .unwrap();
            }
        }
    }

    pub async fn answer_all(&self, match_id: &DocId) {
        self.answer_all_except(match_id, &[]).await;
    }

    /// Votes for `author`'s answer on the current battle.
    pub async fn vote_for(&self, match_id: &DocId, voter: &DocId, author: &DocId) {
        let prompt = self.current_prompt(match_id).await;
        let submission = DocId::submission(&prompt.id, author);
        let actor = self.actor(voter).await;
        self.arena
            .submit_vote(&actor, &prompt.id, &submission)
            .await
            .unwrap();
    }

    /// Runs scheduled actions until none are left, skipping cleanup.
    pub async fn run_scheduled(&self) -> usize {
        let mut ran = 0;
        loop {
            let due = self.scheduler.drain();
            if due.is_empty() {
                return ran;
            }
            for action in due {
                if matches!(action, ScheduledAction::CleanupMatch { .. }) {
                    continue;
                }
                self.arena.handle(action).await.unwrap();
                ran += 1;
            }
        }
    }
}

/// A valid answer for `prompt` from `author`. Authors answer with their
/// own id so answer lengths are distinct and predictable.
pub fn answer_for(
    prompt: &Prompt,
    author: &DocId,
) -> (String, Option<roastbout::model::AttackType>) {
    match prompt.prompt_type {
        PromptType::Jab => ("Soggy".to_string(), None),
        PromptType::Final => (
            format!("final words from {author}"),
            Some(roastbout::model::AttackType::Jab),
        ),
        _ => (format!("you are no match for {author}"), None),
    }
}

/// Runs the built binary with `args`.
#[allow(clippy::missing_panics_doc)]
pub fn run_cli(args: &[&str]) -> Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_roastbout"))
        .args(args)
        .env_remove("ROASTBOUT_CONFIG")
        .env_remove("ROASTBOUT_LOG_LEVEL")
        .output()
        .expect("failed to run roastbout")
}
