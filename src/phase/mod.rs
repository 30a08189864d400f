//! Match state machine
//!
//! `LOBBY → PROMPTS → VOTING{VOTING → REVEAL} → ROUND_RESULTS → PROMPTS → …
//! → RESULTS`, with early termination to RESULTS from any live phase.
//!
//! # Architecture
//!
//! - [`Phase`] - status plus voting sub-phase, and the legal edges
//! - [`guard`] - the store-backed `transitioning` flag that makes each
//!   transition exactly-once across concurrent triggers
//! - [`Advance`] - what a transition attempt reports back

pub mod guard;
pub mod state;

pub use guard::{Expected, Lease, PhaseUpdate, acquire};
pub use state::{Advance, Phase, PhaseTransition, can_transition};
