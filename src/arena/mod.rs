//! The arena
//!
//! [`Arena`] is the service every caller talks to: lobby management,
//! answers, votes and suggestions, host controls, and the scheduled
//! callbacks that keep bot-driven matches moving. All state lives in the
//! document store; the arena itself only holds collaborators, so several
//! arenas over one store cooperate through the transition guard.

mod advance;
mod lobby;
mod play;
mod schedule;
mod view;

use std::sync::{Arc, Mutex};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::bots::{BotStrategy, HeckleBot};
use crate::config::GameConfig;
use crate::error::{GameError, Rejection};
use crate::identity::{TokenAuthenticator, constant_time_eq};
use crate::model::{DocId, Fighter, Match, Prompt, Submission, Vote};
use crate::observability::{Event, EventEmitter, metrics};
use crate::phase::{Lease, PhaseTransition};
use crate::scheduler::Scheduler;
use crate::store::Db;

pub use view::MatchView;

/// Match engine over a document store.
#[derive(Debug)]
pub struct Arena {
    db: Db,
    config: Arc<GameConfig>,
    scheduler: Arc<dyn Scheduler>,
    strategy: Arc<dyn BotStrategy>,
    events: Arc<EventEmitter>,
    auth: TokenAuthenticator,
    rng: Mutex<StdRng>,
}

impl Arena {
    /// Creates an arena with the default bot strategy and no event output.
    #[must_use]
    pub fn new(db: Db, config: Arc<GameConfig>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            auth: TokenAuthenticator::new(db.clone()),
            db,
            config,
            scheduler,
            strategy: Arc::new(HeckleBot::new()),
            events: Arc::new(EventEmitter::noop()),
            rng: Mutex::new(StdRng::seed_from_u64(rand::rng().random())),
        }
    }

    /// Replaces the bot strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Arc<dyn BotStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sends game events to `events`.
    #[must_use]
    pub fn with_events(mut self, events: Arc<EventEmitter>) -> Self {
        self.events = events;
        self
    }

    /// Makes prompt draws and bot delays reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// The store.
    #[must_use]
    pub const fn db(&self) -> &Db {
        &self.db
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    // ========================================================================
    // Shared helpers
    // ========================================================================

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        match self.rng.lock() {
            Ok(mut rng) => f(&mut rng),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn reject<T>(rejection: Rejection) -> Result<T, GameError> {
        debug!(reason = rejection.label(), "action rejected");
        metrics::record_rejection(&rejection);
        Err(GameError::Rejected(rejection))
    }

    fn emit(&self, event: Event) {
        self.events.emit(event);
    }

    fn emit_transition(&self, t: &PhaseTransition) {
        self.emit(Event::PhaseChanged {
            timestamp: Utc::now(),
            match_id: t.match_id.clone(),
            from: t.from,
            to: t.to,
            round: t.round,
            reason: t.reason.clone(),
        });
    }

    fn verify_host(m: &Match, host_token: &str) -> Result<(), GameError> {
        if constant_time_eq(m.host_token.as_bytes(), host_token.as_bytes()) {
            Ok(())
        } else {
            Err(GameError::Unauthorized("invalid host token".into()))
        }
    }

    /// Releases a lease after a failed transition body, keeping the
    /// original error.
    async fn abandon(lease: Lease, err: GameError) -> GameError {
        let match_id = lease.match_id().clone();
        if let Err(release) = lease.abort().await {
            warn!(%match_id, error = %release, "failed to release transition guard");
        }
        err
    }

    async fn load_match(&self, match_id: &DocId) -> Result<Match, GameError> {
        self.db
            .get(match_id)
            .await?
            .ok_or_else(|| GameError::not_found("match", match_id))
    }

    async fn load_fighter(&self, id: &DocId) -> Result<Fighter, GameError> {
        self.db
            .get(id)
            .await?
            .ok_or_else(|| GameError::not_found("participant", id))
    }

    async fn load_prompt(&self, id: &DocId) -> Result<Prompt, GameError> {
        self.db
            .get(id)
            .await?
            .ok_or_else(|| GameError::not_found("prompt", id))
    }

    /// Participants of a match in join order.
    async fn participants(&self, match_id: &DocId) -> Result<Vec<Fighter>, GameError> {
        Ok(self.db.query("match_id", match_id).await?)
    }

    /// Prompts of one round in creation order.
    async fn round_prompts(&self, match_id: &DocId, round: u8) -> Result<Vec<Prompt>, GameError> {
        let prompts: Vec<Prompt> = self.db.query("match_id", match_id).await?;
        Ok(prompts.into_iter().filter(|p| p.round == round).collect())
    }

    async fn match_submissions(&self, match_id: &DocId) -> Result<Vec<Submission>, GameError> {
        Ok(self.db.query("match_id", match_id).await?)
    }

    async fn prompt_submissions(&self, prompt_id: &DocId) -> Result<Vec<Submission>, GameError> {
        Ok(self.db.query("prompt_id", prompt_id).await?)
    }

    async fn prompt_votes(&self, prompt_id: &DocId) -> Result<Vec<Vote>, GameError> {
        Ok(self.db.query("prompt_id", prompt_id).await?)
    }
}
