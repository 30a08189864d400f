//! Deferred actions
//!
//! The engine never sleeps inline. Bot answers and votes, host
//! auto-advance and match cleanup are handed to a [`Scheduler`] as
//! [`ScheduledAction`]s and executed later by
//! [`Arena::handle`](crate::arena::Arena::handle), which re-checks that the
//! match is still where the action expects it.

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::trace;

use crate::model::DocId;

/// Work to run after a delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScheduledAction {
    /// A bot answers a prompt, possibly on a captain's behalf.
    BotAnswer {
        /// Match
        match_id: DocId,
        /// Prompt to answer
        prompt_id: DocId,
        /// Combatant credited
        author_id: DocId,
        /// Bot that types it
        actor_id: DocId,
        /// Round the answer belongs to
        round: u8,
    },
    /// A bot votes on the current battle.
    BotVote {
        /// Match
        match_id: DocId,
        /// Battle
        prompt_id: DocId,
        /// Voting bot
        voter_id: DocId,
    },
    /// Leave REVEAL for the next battle.
    AdvanceBattle {
        /// Match
        match_id: DocId,
        /// Battle being revealed
        prompt_id: DocId,
    },
    /// Leave ROUND_RESULTS for the next round.
    AdvanceRound {
        /// Match
        match_id: DocId,
        /// Round that just finished
        round: u8,
    },
    /// Delete a finished match.
    CleanupMatch {
        /// Match
        match_id: DocId,
    },
}

impl ScheduledAction {
    /// Match the action belongs to.
    #[must_use]
    pub const fn match_id(&self) -> &DocId {
        match self {
            Self::BotAnswer { match_id, .. }
            | Self::BotVote { match_id, .. }
            | Self::AdvanceBattle { match_id, .. }
            | Self::AdvanceRound { match_id, .. }
            | Self::CleanupMatch { match_id } => match_id,
        }
    }

    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BotAnswer { .. } => "answer",
            Self::BotVote { .. } => "vote",
            Self::AdvanceBattle { .. } => "advance_battle",
            Self::AdvanceRound { .. } => "advance_round",
            Self::CleanupMatch { .. } => "cleanup",
        }
    }
}

/// Fire-and-forget deferred execution.
pub trait Scheduler: Send + Sync + std::fmt::Debug {
    /// Runs `action` after `delay`.
    fn run_after(&self, delay: Duration, action: ScheduledAction);
}

// ============================================================================
// Tokio
// ============================================================================

/// Sleeps on the tokio timer, then delivers the action on a channel.
///
/// Pair with [`Arena::run_scheduled`](crate::arena::Arena::run_scheduled)
/// on the receiving end.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<ScheduledAction>,
}

impl TokioScheduler {
    /// Creates the scheduler and the receiving end of its channel.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ScheduledAction>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Scheduler for TokioScheduler {
    fn run_after(&self, delay: Duration, action: ScheduledAction) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(action).is_err() {
                trace!("scheduler channel closed, dropping action");
            }
        });
    }
}

// ============================================================================
// Recording
// ============================================================================

/// Keeps actions in memory for the caller to run in its own order.
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    pending: Mutex<Vec<(Duration, ScheduledAction)>>,
}

impl RecordingScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes every pending action, shortest delay first (stable).
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn drain(&self) -> Vec<ScheduledAction> {
        let mut pending = std::mem::take(&mut *self.pending.lock().expect("scheduler lock poisoned"));
        pending.sort_by_key(|(delay, _)| *delay);
        pending.into_iter().map(|(_, action)| action).collect()
    }

    /// Snapshot of pending actions with their delays.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn pending(&self) -> Vec<(Duration, ScheduledAction)> {
        self.pending.lock().expect("scheduler lock poisoned").clone()
    }

    /// Number of pending actions.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.lock().expect("scheduler lock poisoned").len()
    }

    /// No pending actions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Scheduler for RecordingScheduler {
    fn run_after(&self, delay: Duration, action: ScheduledAction) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.push((delay, action));
        }
    }
}
