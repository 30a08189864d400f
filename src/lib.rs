//! `roastbout` - match engine for a turn-based insult boxing party game
//!
//! Players answer prompts, everybody else votes, and votes turn into
//! damage. This library holds the phase state machine with its transition
//! guard, the damage engine, round setup and The Cut, bot scheduling, and
//! a document store to run it all against.

pub mod arena;
pub mod bots;
pub mod cli;
pub mod config;
pub mod cut;
pub mod damage;
pub mod error;
pub mod identity;
pub mod model;
pub mod observability;
pub mod phase;
pub mod rounds;
pub mod scheduler;
pub mod store;
pub mod tally;
