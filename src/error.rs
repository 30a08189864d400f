//! Error types for `roastbout`
//!
//! One error enum per concern, aggregated into [`RoastboutError`] for the
//! binary. Race losses during phase transitions are deliberately absent:
//! they are reported through [`crate::phase::Advance`], not as errors.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `roastbout` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Storage backend error
    pub const STORE_ERROR: i32 = 4;

    /// Game rule error surfaced to the CLI
    pub const GAME_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `roastbout` operations.
#[derive(Debug, Error)]
pub enum RoastboutError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Game rule or lookup error
    #[error(transparent)]
    Game(#[from] GameError),

    /// Storage error outside of a game operation
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Invalid command-line usage
    #[error("usage error: {0}")]
    Usage(String),

    /// A simulated match stopped making progress
    #[error("simulation stalled: {0}")]
    Simulation(String),

    /// Stopped by SIGINT or SIGTERM
    #[error("interrupted")]
    Interrupted,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl RoastboutError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Game(_) => ExitCode::GAME_ERROR,
            Self::Store(_) => ExitCode::STORE_ERROR,
            Self::Usage(_) => ExitCode::USAGE_ERROR,
            Self::Simulation(_) => ExitCode::ERROR,
            Self::Interrupted => ExitCode::INTERRUPTED,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}{}: {message}", line.map_or_else(String::new, |l| format!(" (line {l})")))]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}")]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },

    /// Environment variable referenced in configuration is not set
    #[error("environment variable '{var}' not set (referenced at {location})")]
    EnvVarNotSet {
        /// Name of the environment variable
        var: String,
        /// Location in the configuration where it was referenced
        location: String,
    },

    /// One or more configuration files failed validation.
    #[error("{count} file(s) failed validation")]
    ValidationFailed {
        /// Number of files that failed validation.
        count: usize,
    },
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "damage.round_multipliers.2")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - validation failure that prevents configuration from being used
    Error,
    /// Warning - potential issue that does not prevent configuration loading
    Warning,
}

// ============================================================================
// Storage Errors
// ============================================================================

/// Document store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document with this id
    #[error("document not found: {0}")]
    NotFound(String),

    /// Document exists but belongs to a different kind
    #[error("document {id} is a {actual}, expected {expected}")]
    KindMismatch {
        /// Document id
        id: String,
        /// Kind the caller asked for
        expected: &'static str,
        /// Kind stored
        actual: String,
    },

    /// Insert collided with an existing id
    #[error("document already exists: {0}")]
    Duplicate(String),

    /// Record could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-specific failure
    #[error("storage backend failure: {0}")]
    Backend(String),
}

// ============================================================================
// Game Errors
// ============================================================================

/// Errors returned synchronously by game operations.
#[derive(Debug, Error)]
pub enum GameError {
    /// Input rejected with a user-facing reason
    #[error("rejected: {0}")]
    Rejected(#[from] Rejection),

    /// Unknown match, prompt, submission or participant
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Record kind
        kind: &'static str,
        /// Id that was looked up
        id: String,
    },

    /// Credential or host token did not check out
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A committed transition would break the phase graph
    #[error("illegal transition from {from} to {to}")]
    IllegalTransition {
        /// Phase held by the guard
        from: String,
        /// Requested phase
        to: String,
    },

    /// Storage failure while serving the operation
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GameError {
    /// Shorthand for a [`GameError::NotFound`].
    #[must_use]
    pub fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Returns the rejection reason if this is a validation error.
    #[must_use]
    pub const fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(r) => Some(r),
            _ => None,
        }
    }
}

/// User-facing reasons a submission, vote or lobby action is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// The match is not in the phase this action belongs to
    #[error("action not allowed during {actual} (expected {expected})")]
    WrongPhase {
        /// Phase the action requires
        expected: String,
        /// Phase the match is in
        actual: String,
    },

    /// An answer for this author already exists on the prompt
    #[error("an answer was already submitted for this prompt")]
    DuplicateSubmission,

    /// The voter already voted on this prompt
    #[error("you already voted on this battle")]
    DuplicateVote,

    /// Combatants cannot vote on their own battle
    #[error("fighters cannot vote on their own battle")]
    CombatantCannotVote,

    /// Corner men cannot vote on a battle involving their captain
    #[error("corner men cannot vote on their captain's battle")]
    TeamLoyalty,

    /// The author is not one of the prompt's combatants
    #[error("this prompt is not assigned to you")]
    NotAssigned,

    /// Single-word prompt answered with several words
    #[error("jab answers must be a single word (got {words})")]
    JabTooManyWords {
        /// Word count of the rejected answer
        words: usize,
    },

    /// Blank answer
    #[error("answer cannot be empty")]
    EmptyAnswer,

    /// Answer exceeds the configured length
    #[error("answer is {len} characters (max {max})")]
    AnswerTooLong {
        /// Character count of the rejected answer
        len: usize,
        /// Configured maximum
        max: usize,
    },

    /// Final-round answer without an attack type
    #[error("choose an attack for the final")]
    AttackTypeRequired,

    /// Attack type given outside the final
    #[error("attacks can only be chosen in the final")]
    AttackTypeNotAllowed,

    /// Action requires the corner man role
    #[error("only corner men can do that")]
    NotCornerMan,

    /// Knocked-out fighters cannot act as fighters
    #[error("knocked-out fighters cannot answer")]
    KnockedOut,

    /// Not enough fighters to start
    #[error("need at least {min} fighters (have {have})")]
    NotEnoughFighters {
        /// Configured minimum
        min: usize,
        /// Fighters present
        have: usize,
    },

    /// The lobby is full
    #[error("match is full ({max} participants)")]
    MatchFull {
        /// Configured maximum
        max: usize,
    },

    /// Blank or oversized display name
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Vote target does not belong to the prompt being voted on
    #[error("that answer is not part of this battle")]
    SubmissionNotInPrompt,

    /// Suggestion text exceeds the configured length
    #[error("suggestion is {len} characters (max {max})")]
    SuggestionTooLong {
        /// Character count of the rejected suggestion
        len: usize,
        /// Configured maximum
        max: usize,
    },
}

impl Rejection {
    /// Stable label for metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::WrongPhase { .. } => "wrong_phase",
            Self::DuplicateSubmission => "duplicate_submission",
            Self::DuplicateVote => "duplicate_vote",
            Self::CombatantCannotVote => "combatant_vote",
            Self::TeamLoyalty => "team_loyalty",
            Self::NotAssigned => "not_assigned",
            Self::JabTooManyWords { .. } => "jab_words",
            Self::EmptyAnswer => "empty_answer",
            Self::AnswerTooLong { .. } => "answer_too_long",
            Self::AttackTypeRequired => "attack_required",
            Self::AttackTypeNotAllowed => "attack_not_allowed",
            Self::NotCornerMan => "not_corner_man",
            Self::KnockedOut => "knocked_out",
            Self::NotEnoughFighters { .. } => "not_enough_fighters",
            Self::MatchFull { .. } => "match_full",
            Self::InvalidName(_) => "invalid_name",
            Self::SubmissionNotInPrompt => "submission_not_in_prompt",
            Self::SuggestionTooLong { .. } => "suggestion_too_long",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_by_variant() {
        let config = RoastboutError::Config(ConfigError::ValidationFailed { count: 1 });
        assert_eq!(config.exit_code(), ExitCode::CONFIG_ERROR);

        let game = RoastboutError::Game(GameError::not_found("match", "m1"));
        assert_eq!(game.exit_code(), ExitCode::GAME_ERROR);

        let store = RoastboutError::Store(StoreError::Backend("down".into()));
        assert_eq!(store.exit_code(), ExitCode::STORE_ERROR);

        let usage = RoastboutError::Usage("bad".into());
        assert_eq!(usage.exit_code(), ExitCode::USAGE_ERROR);

        assert_eq!(RoastboutError::Interrupted.exit_code(), ExitCode::INTERRUPTED);
    }

    #[test]
    fn parse_error_includes_line() {
        let err = ConfigError::ParseError {
            path: PathBuf::from("game.yaml"),
            line: Some(7),
            message: "bad indent".into(),
        };
        assert_eq!(err.to_string(), "parse error in game.yaml (line 7): bad indent");
    }

    #[test]
    fn rejection_messages_are_user_facing() {
        let err = GameError::from(Rejection::JabTooManyWords { words: 3 });
        assert_eq!(
            err.to_string(),
            "rejected: jab answers must be a single word (got 3)"
        );
        assert_eq!(err.rejection(), Some(&Rejection::JabTooManyWords { words: 3 }));
    }

    #[test]
    fn not_found_display() {
        let err = GameError::not_found("prompt", "p-42");
        assert_eq!(err.to_string(), "prompt not found: p-42");
        assert!(err.rejection().is_none());
    }

    #[test]
    fn validation_issue_display() {
        let issue = ValidationIssue {
            path: "damage.cap".into(),
            message: "must be positive".into(),
            severity: Severity::Error,
        };
        assert_eq!(issue.to_string(), "error: must be positive at damage.cap");
    }
}
