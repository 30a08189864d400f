//! Command-line interface
//!
//! Argument definitions and command handlers for the `roastbout` binary.

pub mod args;
pub mod commands;
