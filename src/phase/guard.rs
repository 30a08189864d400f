//! Transition guard
//!
//! Every transition flips the match's `transitioning` flag through a single
//! conditional patch that also pins the phase, round and prompt the caller
//! observed. Exactly one concurrent trigger wins; the others see the
//! condition fail and back off. The winner clears the flag in the same
//! write that commits the new phase.

use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::error::{GameError, StoreError};
use crate::model::{DocId, Match};
use crate::observability::metrics;
use crate::store::Db;

use super::state::{Phase, PhaseTransition, can_transition};

/// What the caller expects the match to look like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expected {
    phase: Phase,
    round: Option<u8>,
    prompt: Option<Option<DocId>>,
}

impl Expected {
    /// Expect `phase`, any round, any prompt.
    #[must_use]
    pub const fn phase(phase: Phase) -> Self {
        Self {
            phase,
            round: None,
            prompt: None,
        }
    }

    /// Also pin the round.
    #[must_use]
    pub const fn round(mut self, round: u8) -> Self {
        self.round = Some(round);
        self
    }

    /// Also pin the current prompt.
    #[must_use]
    pub fn prompt(mut self, prompt_id: &DocId) -> Self {
        self.prompt = Some(Some(prompt_id.clone()));
        self
    }

    /// Pins everything to the given snapshot.
    #[must_use]
    pub fn snapshot(m: &Match) -> Self {
        Self {
            phase: Phase::of(m),
            round: Some(m.current_round),
            prompt: Some(m.current_prompt_id.clone()),
        }
    }

    fn conditions(&self) -> Value {
        let mut c = Map::new();
        c.insert("transitioning".into(), Value::Bool(false));
        c.insert("status".into(), json!(self.phase.status));
        c.insert("round_status".into(), json!(self.phase.round_status));
        if let Some(round) = self.round {
            c.insert("current_round".into(), json!(round));
        }
        if let Some(prompt) = &self.prompt {
            c.insert("current_prompt_id".into(), json!(prompt));
        }
        Value::Object(c)
    }
}

/// Fields written when a transition commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseUpdate {
    to: Phase,
    round: Option<u8>,
    prompt: Option<Option<DocId>>,
    winner: Option<Option<DocId>>,
    end_reason: Option<String>,
}

impl PhaseUpdate {
    /// Move to `to`, leaving round and prompt alone.
    #[must_use]
    pub const fn to(to: Phase) -> Self {
        Self {
            to,
            round: None,
            prompt: None,
            winner: None,
            end_reason: None,
        }
    }

    /// Set the current round.
    #[must_use]
    pub const fn round(mut self, round: u8) -> Self {
        self.round = Some(round);
        self
    }

    /// Set the current prompt.
    #[must_use]
    pub fn prompt(mut self, prompt_id: &DocId) -> Self {
        self.prompt = Some(Some(prompt_id.clone()));
        self
    }

    /// Clear the current prompt.
    #[must_use]
    pub fn no_prompt(mut self) -> Self {
        self.prompt = Some(None);
        self
    }

    /// Record the outcome of the match.
    #[must_use]
    pub fn ended(mut self, winner: Option<DocId>, reason: impl Into<String>) -> Self {
        self.winner = Some(winner);
        self.end_reason = Some(reason.into());
        self
    }

    /// Target phase.
    #[must_use]
    pub const fn target(&self) -> Phase {
        self.to
    }

    fn fields(&self) -> Value {
        let mut f = Map::new();
        f.insert("transitioning".into(), Value::Bool(false));
        f.insert("status".into(), json!(self.to.status));
        f.insert("round_status".into(), json!(self.to.round_status));
        if let Some(round) = self.round {
            f.insert("current_round".into(), json!(round));
        }
        if let Some(prompt) = &self.prompt {
            f.insert("current_prompt_id".into(), json!(prompt));
        }
        if let Some(winner) = &self.winner {
            f.insert("winner_id".into(), json!(winner));
        }
        if let Some(reason) = &self.end_reason {
            f.insert("end_reason".into(), json!(reason));
        }
        Value::Object(f)
    }
}

/// Acquires the guard on `match_id` if the match matches `expected`.
///
/// Returns `None` when the guard is held or the match has moved on.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] for an unknown match.
pub async fn acquire(
    db: &Db,
    match_id: &DocId,
    expected: &Expected,
) -> Result<Option<Lease>, StoreError> {
    let won = db
        .patch_if(match_id, expected.conditions(), json!({ "transitioning": true }))
        .await?;

    if !won {
        debug!(%match_id, expected = %expected.phase, "transition guard not acquired");
        metrics::record_race_loss();
        return Ok(None);
    }

    Ok(Some(Lease {
        db: db.clone(),
        match_id: match_id.clone(),
        from: expected.phase,
        round: expected.round,
        released: false,
    }))
}

/// A held transition guard.
///
/// Consume it with [`commit`](Self::commit) or [`abort`](Self::abort). A
/// lease dropped while still held is released in the background.
#[derive(Debug)]
pub struct Lease {
    db: Db,
    match_id: DocId,
    from: Phase,
    round: Option<u8>,
    released: bool,
}

impl Lease {
    /// Phase the guard was taken in.
    #[must_use]
    pub const fn from(&self) -> Phase {
        self.from
    }

    /// Match this lease guards.
    #[must_use]
    pub const fn match_id(&self) -> &DocId {
        &self.match_id
    }

    /// Writes the new phase and clears the guard in one patch.
    ///
    /// # Errors
    ///
    /// [`GameError::IllegalTransition`] if `update` leaves the phase graph;
    /// the guard is released unchanged. Storage failures propagate.
    pub async fn commit(
        mut self,
        update: PhaseUpdate,
        reason: impl Into<String>,
    ) -> Result<PhaseTransition, GameError> {
        let to = update.target();
        if !can_transition(self.from, to) {
            warn!(match_id = %self.match_id, from = %self.from, %to, "illegal transition requested");
            self.release().await?;
            return Err(GameError::IllegalTransition {
                from: self.from.to_string(),
                to: to.to_string(),
            });
        }

        self.db.patch(&self.match_id, update.fields()).await?;
        self.released = true;

        let reason = reason.into();
        let round = update.round.or(self.round).unwrap_or_default();
        info!(match_id = %self.match_id, from = %self.from, %to, round, %reason, "phase transition");
        metrics::record_transition(to.label());

        Ok(PhaseTransition {
            match_id: self.match_id.clone(),
            from: self.from,
            to,
            round,
            reason,
        })
    }

    /// Releases the guard without changing phase.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn abort(mut self) -> Result<(), StoreError> {
        debug!(match_id = %self.match_id, from = %self.from, "transition aborted");
        self.release().await
    }

    async fn release(&mut self) -> Result<(), StoreError> {
        self.db
            .patch(&self.match_id, json!({ "transitioning": false }))
            .await?;
        self.released = true;
        Ok(())
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!(match_id = %self.match_id, "transition guard dropped while held, releasing");
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let db = self.db.clone();
            let match_id = self.match_id.clone();
            handle.spawn(async move {
                let _ = db.patch(&match_id, json!({ "transitioning": false })).await;
            });
        }
    }
}
