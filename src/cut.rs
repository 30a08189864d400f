//! The Cut
//!
//! Between the Main Round and the Semi-Finals: ranks fighters by HP, keeps
//! the top N, and turns everybody else into corner men.

use std::cmp::Reverse;

use serde::Serialize;

use crate::model::{DocId, Fighter, Role};

/// A demoted fighter and the captain they now back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CornerAssignment {
    /// New corner man
    pub corner_man: DocId,
    /// Advancing fighter they back
    pub captain: DocId,
}

/// Result of a successful cut.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutPlan {
    /// Advancing fighters, best seed first
    pub advancing: Vec<DocId>,
    /// Everyone else, in ranking order
    pub corner_men: Vec<CornerAssignment>,
}

/// The Cut cannot produce a bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("only {survivors} fighter(s) survived the cut")]
pub struct InvalidBracket {
    /// Un-knocked-out fighters available
    pub survivors: usize,
}

/// Fighters in ranking order: HP descending, then join order.
#[must_use]
pub fn rank(fighters: &[Fighter]) -> Vec<&Fighter> {
    let mut ranked: Vec<&Fighter> = fighters.iter().filter(|f| f.role == Role::Fighter).collect();
    ranked.sort_by_key(|f| (f.knocked_out, Reverse(f.hp), f.seq));
    ranked
}

/// Pairs each demoted participant with a captain.
///
/// Round-robin over the advancing fighters in reverse seed order, so the
/// best of the demoted backs the weakest survivor.
#[must_use]
pub fn assign_teams(advancing: &[DocId], demoted: &[DocId]) -> Vec<CornerAssignment> {
    if advancing.is_empty() {
        return Vec::new();
    }
    demoted
        .iter()
        .enumerate()
        .map(|(i, corner_man)| CornerAssignment {
            corner_man: corner_man.clone(),
            captain: advancing[advancing.len() - 1 - (i % advancing.len())].clone(),
        })
        .collect()
}

/// Plans The Cut keeping at most `finalists` fighters.
///
/// # Errors
///
/// [`InvalidBracket`] when fewer than two fighters are still standing.
pub fn plan_cut(fighters: &[Fighter], finalists: usize) -> Result<CutPlan, InvalidBracket> {
    let ranked = rank(fighters);
    let survivors = ranked.iter().filter(|f| !f.knocked_out).count();
    if survivors < 2 {
        return Err(InvalidBracket { survivors });
    }

    let keep = survivors.min(finalists);
    let advancing: Vec<DocId> = ranked[..keep].iter().map(|f| f.id.clone()).collect();
    let demoted: Vec<DocId> = ranked[keep..].iter().map(|f| f.id.clone()).collect();

    Ok(CutPlan {
        corner_men: assign_teams(&advancing, &demoted),
        advancing,
    })
}

/// Winner of a finished match: the live fighter with the most HP.
#[must_use]
pub fn champion(fighters: &[Fighter]) -> Option<&Fighter> {
    fighters
        .iter()
        .filter(|f| f.is_live_fighter())
        .min_by_key(|f| (Reverse(f.hp), f.seed.unwrap_or(u32::MAX), f.seq))
}
