//! Structured game event stream.
//!
//! Discrete, typed events emitted as matches progress. Events are
//! serialized as newline-delimited JSON (JSONL) and carry a monotonically
//! increasing sequence number for ordering.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cut::CornerAssignment;
use crate::damage::DamageEvent;
use crate::model::DocId;
use crate::phase::Phase;

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during a match.
///
/// Tagged with `"type"` when serialized so consumers can dispatch on the
/// event kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A lobby was opened.
    MatchCreated {
        /// When the match was created.
        timestamp: DateTime<Utc>,
        /// Match id.
        match_id: DocId,
        /// Display name.
        name: String,
    },

    /// Somebody joined the lobby.
    FighterJoined {
        /// When they joined.
        timestamp: DateTime<Utc>,
        /// Match id.
        match_id: DocId,
        /// Participant id.
        fighter_id: DocId,
        /// Display name.
        name: String,
        /// Automated participant.
        is_bot: bool,
    },

    /// A phase transition was committed.
    PhaseChanged {
        /// When the transition committed.
        timestamp: DateTime<Utc>,
        /// Match id.
        match_id: DocId,
        /// Phase left.
        from: Phase,
        /// Phase entered.
        to: Phase,
        /// Round after the transition.
        round: u8,
        /// Why the transition fired.
        reason: String,
    },

    /// A battle was resolved.
    DamageResolved {
        /// When damage was applied.
        timestamp: DateTime<Utc>,
        /// Match id.
        match_id: DocId,
        /// Battle prompt.
        prompt_id: DocId,
        /// Round number.
        round: u8,
        /// Left combatant.
        left_id: DocId,
        /// Right combatant.
        right_id: DocId,
        /// Votes for the left answer.
        left_votes: u32,
        /// Votes for the right answer.
        right_votes: u32,
        /// Damage, knockouts and combo tier.
        #[serde(flatten)]
        damage: DamageEvent,
        /// Equal votes.
        tie: bool,
        /// Non-eliminating bragging round.
        bragging: bool,
    },

    /// The Cut promoted and demoted participants.
    CutApplied {
        /// When the cut was applied.
        timestamp: DateTime<Utc>,
        /// Match id.
        match_id: DocId,
        /// Semi-finalists, best seed first.
        advancing: Vec<DocId>,
        /// New corner men and their captains.
        corner_men: Vec<CornerAssignment>,
    },

    /// The match reached RESULTS.
    MatchEnded {
        /// When the match ended.
        timestamp: DateTime<Utc>,
        /// Match id.
        match_id: DocId,
        /// Champion, if anybody is left standing.
        winner_id: Option<DocId>,
        /// Why the match ended.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EventEnvelope {
    sequence: u64,
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Each call to [`emit`](Self::emit) increments the sequence counter,
/// serializes the event as one JSON line, and flushes. Serialization or I/O
/// failures are dropped.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Creates an emitter that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock()
            && let Ok(line) = serde_json::to_string(&envelope)
        {
            let _ = writeln!(w, "{line}");
            let _ = w.flush();
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}
