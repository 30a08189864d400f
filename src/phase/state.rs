//! Phase representation
//!
//! A match's phase is its coarse [`Status`] plus the [`RoundStatus`]
//! sub-phase while voting. This module owns the legal transition graph.

use serde::Serialize;

use crate::model::{DocId, Match, RoundStatus, Status};

/// Status plus voting sub-phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Phase {
    /// Coarse status
    pub status: Status,
    /// Sub-phase, only set while voting
    pub round_status: Option<RoundStatus>,
}

impl Phase {
    /// Waiting for players
    pub const LOBBY: Self = Self::plain(Status::Lobby);
    /// Writing answers
    pub const PROMPTS: Self = Self::plain(Status::Prompts);
    /// Votes open on the current prompt
    pub const VOTING: Self = Self::voting(RoundStatus::Voting);
    /// Damage shown for the current prompt
    pub const REVEAL: Self = Self::voting(RoundStatus::Reveal);
    /// Between rounds
    pub const ROUND_RESULTS: Self = Self::plain(Status::RoundResults);
    /// Terminal
    pub const RESULTS: Self = Self::plain(Status::Results);

    const fn plain(status: Status) -> Self {
        Self {
            status,
            round_status: None,
        }
    }

    /// A voting sub-phase.
    #[must_use]
    pub const fn voting(round_status: RoundStatus) -> Self {
        Self {
            status: Status::Voting,
            round_status: Some(round_status),
        }
    }

    /// Phase a match record is in.
    #[must_use]
    pub const fn of(m: &Match) -> Self {
        match m.status {
            Status::Voting => Self {
                status: Status::Voting,
                round_status: m.round_status,
            },
            other => Self::plain(other),
        }
    }

    /// No transition leaves this phase.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self.status, Status::Results)
    }

    /// Stable label for metrics and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match (self.status, self.round_status) {
            (Status::Lobby, _) => "LOBBY",
            (Status::Prompts, _) => "PROMPTS",
            (Status::Voting, Some(RoundStatus::Reveal)) => "REVEAL",
            (Status::Voting, _) => "VOTING",
            (Status::RoundResults, _) => "ROUND_RESULTS",
            (Status::Results, _) => "RESULTS",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.round_status {
            Some(rs) if self.status == Status::Voting => write!(f, "{}/{rs}", self.status),
            _ => write!(f, "{}", self.status),
        }
    }
}

/// Whether `from → to` is an edge of the match graph.
///
/// Any non-terminal phase may end the match early.
#[must_use]
pub fn can_transition(from: Phase, to: Phase) -> bool {
    if from.is_terminal() {
        return false;
    }
    if to == Phase::RESULTS {
        return true;
    }
    matches!(
        (from.label(), to.label()),
        ("LOBBY", "PROMPTS")
            | ("PROMPTS", "VOTING")
            | ("VOTING", "REVEAL")
            | ("REVEAL", "VOTING" | "ROUND_RESULTS" | "PROMPTS")
            | ("ROUND_RESULTS", "PROMPTS")
    )
}

/// Record of a committed transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTransition {
    /// Match that moved
    pub match_id: DocId,
    /// Phase left
    pub from: Phase,
    /// Phase entered
    pub to: Phase,
    /// Round after the transition
    pub round: u8,
    /// Human-readable trigger
    pub reason: String,
}

/// Result of a transition attempt.
///
/// Losing a race is not an error: another trigger already moved the match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// This call committed the transition
    Advanced(PhaseTransition),
    /// The guard was held or the match had already moved on
    RaceLost,
    /// Preconditions not met yet
    NotReady(&'static str),
}

impl Advance {
    /// This call moved the match.
    #[must_use]
    pub const fn is_advanced(&self) -> bool {
        matches!(self, Self::Advanced(_))
    }

    /// Phase entered, if this call moved the match.
    #[must_use]
    pub const fn entered(&self) -> Option<Phase> {
        match self {
            Self::Advanced(t) => Some(t.to),
            _ => None,
        }
    }
}
