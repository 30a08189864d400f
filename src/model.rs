//! Game records
//!
//! Every record is a document in the [`crate::store`]: it carries its own
//! `_id` and a store-assigned `_seq` creation index. Field names are the
//! document field names, so patches can address them directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Record;

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque document identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(pub String);

impl DocId {
    /// Generates a fresh random id with a kind prefix, e.g. `match_3f2a…`.
    #[must_use]
    pub fn generate(kind: Kind) -> Self {
        Self(format!("{}_{}", kind.as_str(), uuid::Uuid::new_v4().simple()))
    }

    /// Deterministic submission id: one per `(prompt, author)`.
    #[must_use]
    pub fn submission(prompt_id: &Self, author_id: &Self) -> Self {
        Self(format!("submission_{}_{}", prompt_id.0, author_id.0))
    }

    /// Deterministic vote id: one per `(prompt, voter)`.
    #[must_use]
    pub fn vote(prompt_id: &Self, voter_id: &Self) -> Self {
        Self(format!("vote_{}_{}", prompt_id.0, voter_id.0))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Document kinds held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// [`Match`]
    Match,
    /// [`Fighter`]
    Fighter,
    /// [`Prompt`]
    Prompt,
    /// [`Submission`]
    Submission,
    /// [`Vote`]
    Vote,
    /// [`Suggestion`]
    Suggestion,
}

impl Kind {
    /// Stable string form used in ids and in the `_kind` document field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::Fighter => "fighter",
            Self::Prompt => "prompt",
            Self::Submission => "submission",
            Self::Vote => "vote",
            Self::Suggestion => "suggestion",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Coarse match phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Waiting for players
    Lobby,
    /// Fighters are writing answers
    Prompts,
    /// Battles are being voted on one at a time
    Voting,
    /// Between rounds
    RoundResults,
    /// Terminal
    Results,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Lobby => "LOBBY",
            Self::Prompts => "PROMPTS",
            Self::Voting => "VOTING",
            Self::RoundResults => "ROUND_RESULTS",
            Self::Results => "RESULTS",
        };
        f.write_str(s)
    }
}

/// Sub-phase inside [`Status::Voting`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundStatus {
    /// Votes are open for the current prompt
    Voting,
    /// Votes are in and damage has been applied
    Reveal,
}

impl std::fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Voting => f.write_str("VOTING"),
            Self::Reveal => f.write_str("REVEAL"),
        }
    }
}

/// Participant role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Active combatant
    Fighter,
    /// Eliminated participant backing a fighter
    CornerMan,
}

/// Kind of prompt, which decides answer rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptType {
    /// Main Round prompt
    Standard,
    /// Single-word Semi-Finals prompt
    Jab,
    /// Free-form Semi-Finals closer
    Haymaker,
    /// Sudden-death Final prompt
    Final,
}

/// Attack chosen with a Final answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackType {
    /// Baseline
    Jab,
    /// Hits harder
    Haymaker,
    /// Hits hardest, punished hardest when it fails
    FlyingKick,
}

impl AttackType {
    /// All attack types in table order.
    pub const ALL: [Self; 3] = [Self::Jab, Self::Haymaker, Self::FlyingKick];
}

// ============================================================================
// Records
// ============================================================================

/// One live game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    #[serde(rename = "_id")]
    pub id: DocId,
    #[serde(rename = "_seq", default)]
    pub seq: u64,
    pub name: String,
    pub status: Status,
    #[serde(default)]
    pub round_status: Option<RoundStatus>,
    pub current_round: u8,
    pub max_rounds: u8,
    #[serde(default)]
    pub current_prompt_id: Option<DocId>,
    /// Transition guard. Only flipped through a conditional patch.
    #[serde(default)]
    pub transitioning: bool,
    pub host_token: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub winner_id: Option<DocId>,
    #[serde(default)]
    pub end_reason: Option<String>,
}

/// A participant. Named for the role everybody starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fighter {
    #[serde(rename = "_id")]
    pub id: DocId,
    #[serde(rename = "_seq", default)]
    pub seq: u64,
    pub match_id: DocId,
    pub name: String,
    pub role: Role,
    pub hp: u32,
    pub max_hp: u32,
    #[serde(default)]
    pub knocked_out: bool,
    #[serde(default)]
    pub win_streak: u32,
    /// Captain this corner man backs.
    #[serde(default)]
    pub team_id: Option<DocId>,
    #[serde(default)]
    pub is_bot: bool,
    pub token: String,
    /// Rank assigned by The Cut, 1-based.
    #[serde(default)]
    pub seed: Option<u32>,
}

impl Fighter {
    /// Fighter role and not knocked out.
    #[must_use]
    pub fn is_live_fighter(&self) -> bool {
        self.role == Role::Fighter && !self.knocked_out
    }
}

/// A question for one battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    #[serde(rename = "_id")]
    pub id: DocId,
    #[serde(rename = "_seq", default)]
    pub seq: u64,
    pub match_id: DocId,
    pub round: u8,
    pub text: String,
    pub prompt_type: PromptType,
    /// Combatants, in matchup order.
    pub assigned_to: Vec<DocId>,
}

impl Prompt {
    /// Whether `id` is one of this prompt's combatants.
    #[must_use]
    pub fn is_combatant(&self, id: &DocId) -> bool {
        self.assigned_to.contains(id)
    }
}

/// One answer to a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(rename = "_id")]
    pub id: DocId,
    #[serde(rename = "_seq", default)]
    pub seq: u64,
    pub match_id: DocId,
    pub prompt_id: DocId,
    /// Combatant credited with the answer.
    pub author_id: DocId,
    /// Participant who actually typed it (a corner man, or the author).
    pub submitted_by: DocId,
    pub text: String,
    #[serde(default)]
    pub attack_type: Option<AttackType>,
}

/// One ballot on a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: DocId,
    #[serde(rename = "_seq", default)]
    pub seq: u64,
    pub match_id: DocId,
    pub prompt_id: DocId,
    pub voter_id: DocId,
    pub submission_id: DocId,
}

/// Advice from a corner man to the captain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "_id")]
    pub id: DocId,
    #[serde(rename = "_seq", default)]
    pub seq: u64,
    pub match_id: DocId,
    pub from_id: DocId,
    pub to_id: DocId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

macro_rules! impl_record {
    ($($ty:ty => $kind:expr),* $(,)?) => {
        $(
            impl Record for $ty {
                const KIND: Kind = $kind;

                fn id(&self) -> &DocId {
                    &self.id
                }
            }
        )*
    };
}

impl_record! {
    Match => Kind::Match,
    Fighter => Kind::Fighter,
    Prompt => Kind::Prompt,
    Submission => Kind::Submission,
    Vote => Kind::Vote,
    Suggestion => Kind::Suggestion,
}
