//! Damage engine
//!
//! Turns one resolved battle (two answers and their vote counts) into HP
//! deltas, knockout flags and streak updates. Pure: the caller persists the
//! outcome and decides what phase comes next.

use serde::Serialize;

use crate::config::schema::{DamageConfig, TieBreaker};
use crate::model::AttackType;

/// Guards the floor against `13.999…` artifacts of float multipliers.
const FLOOR_EPSILON: f64 = 1e-9;

/// Combo tier reached by the winner of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComboTier {
    /// No combo
    #[default]
    None,
    /// Second consecutive win: flat bonus
    Double,
    /// Third consecutive win: instant knockout
    Finisher,
}

impl ComboTier {
    /// Tier earned by a winner who enters the battle on `streak` wins.
    #[must_use]
    pub const fn for_streak(streak: u32) -> Self {
        match streak {
            0 => Self::None,
            1 => Self::Double,
            _ => Self::Finisher,
        }
    }

    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Double => "double",
            Self::Finisher => "finisher",
        }
    }
}

/// Which side of the matchup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    /// First combatant in `assigned_to`
    Left,
    /// Second combatant in `assigned_to`
    Right,
}

impl Corner {
    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// One side of a battle as the engine sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Combatant {
    /// HP entering the battle
    pub hp: u32,
    /// Consecutive wins entering the battle
    pub win_streak: u32,
    /// Votes received
    pub votes: u32,
    /// Answer length in characters, for the tie-breaker
    pub answer_len: usize,
    /// Final-round attack, if any
    pub attack: Option<AttackType>,
}

/// A battle ready to be resolved.
#[derive(Debug, Clone, Copy)]
pub struct Battle {
    /// Round number (selects multipliers and the attack table)
    pub round: u8,
    /// Left combatant
    pub left: Combatant,
    /// Right combatant
    pub right: Combatant,
    /// Played after the matchup was decided; never eliminates
    pub bragging: bool,
}

impl Battle {
    const fn side(&self, corner: Corner) -> &Combatant {
        match corner {
            Corner::Left => &self.left,
            Corner::Right => &self.right,
        }
    }

    /// Total votes cast.
    #[must_use]
    pub const fn total_votes(&self) -> u32 {
        self.left.votes + self.right.votes
    }
}

/// Resolved state of one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SideOutcome {
    /// Damage taken
    pub damage: u32,
    /// HP after damage, never below zero
    pub hp: u32,
    /// Whether this battle knocked the side out
    pub knocked_out: bool,
    /// Streak after the battle
    pub win_streak: u32,
}

impl SideOutcome {
    const fn unchanged(c: &Combatant) -> Self {
        Self {
            damage: 0,
            hp: c.hp,
            knocked_out: false,
            win_streak: c.win_streak,
        }
    }

    const fn hit(c: &Combatant, damage: u32, win_streak: u32) -> Self {
        let hp = c.hp.saturating_sub(damage);
        Self {
            damage,
            hp,
            knocked_out: hp == 0,
            win_streak,
        }
    }
}

/// Full outcome of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// Left side
    pub left: SideOutcome,
    /// Right side
    pub right: SideOutcome,
    /// Side with more votes, or the tie-break pick
    pub winner: Option<Corner>,
    /// Equal votes
    pub tie: bool,
    /// Combo reached by the winner
    pub combo_tier: ComboTier,
}

impl Outcome {
    /// Outcome for one side.
    #[must_use]
    pub const fn side(&self, corner: Corner) -> &SideOutcome {
        match corner {
            Corner::Left => &self.left,
            Corner::Right => &self.right,
        }
    }

    /// The event handed to the presentation layer.
    #[must_use]
    pub const fn event(&self) -> DamageEvent {
        DamageEvent {
            left_damage: self.left.damage,
            right_damage: self.right.damage,
            left_ko: self.left.knocked_out,
            right_ko: self.right.knocked_out,
            combo_tier: self.combo_tier,
        }
    }
}

/// Damage-resolution event for renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DamageEvent {
    /// Damage dealt to the left combatant
    pub left_damage: u32,
    /// Damage dealt to the right combatant
    pub right_damage: u32,
    /// Left combatant knocked out
    pub left_ko: bool,
    /// Right combatant knocked out
    pub right_ko: bool,
    /// Combo tier reached
    pub combo_tier: ComboTier,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn floor_u32(raw: f64) -> u32 {
    if raw <= 0.0 {
        0
    } else {
        (raw + FLOOR_EPSILON).floor().min(f64::from(u32::MAX)) as u32
    }
}

/// Damage both sides take on a tie.
#[must_use]
pub fn tie_damage(config: &DamageConfig, round: u8) -> u32 {
    floor_u32(config.tie_share * f64::from(config.cap) * config.multiplier(round))
}

/// Vote-share damage dealt to the loser before combos.
///
/// Uses the loser's own share of the vote, scaled by the cap, the round
/// multiplier and, when both sides picked an attack, the winner's `dealt`
/// and the loser's `received_on_fail` factors.
#[must_use]
pub fn base_damage(config: &DamageConfig, battle: &Battle, winner: Corner) -> u32 {
    let total = battle.total_votes();
    if total == 0 {
        return 0;
    }
    let win = battle.side(winner);
    let lose = battle.side(winner.opponent());

    let mut raw = f64::from(lose.votes) * f64::from(config.cap) * config.multiplier(battle.round)
        / f64::from(total);

    if let (Some(attack), Some(defense)) = (win.attack, lose.attack) {
        raw *= config.attack(battle.round, attack).dealt;
        raw *= config.attack(battle.round, defense).received_on_fail;
    }

    floor_u32(raw)
}

/// Resolves a battle.
#[must_use]
pub fn resolve(config: &DamageConfig, battle: &Battle) -> Outcome {
    let total = battle.total_votes();

    if total == 0 {
        return Outcome {
            left: SideOutcome::unchanged(&battle.left),
            right: SideOutcome::unchanged(&battle.right),
            winner: None,
            tie: false,
            combo_tier: ComboTier::None,
        };
    }

    if battle.left.votes == battle.right.votes {
        return resolve_tie(config, battle);
    }

    let winner = if battle.left.votes > battle.right.votes {
        Corner::Left
    } else {
        Corner::Right
    };

    if battle.bragging {
        return Outcome {
            left: SideOutcome::unchanged(&battle.left),
            right: SideOutcome::unchanged(&battle.right),
            winner: Some(winner),
            tie: false,
            combo_tier: ComboTier::None,
        };
    }

    let win = battle.side(winner);
    let lose = battle.side(winner.opponent());
    let combo_tier = ComboTier::for_streak(win.win_streak);

    let mut damage = base_damage(config, battle, winner);
    match combo_tier {
        ComboTier::None => {}
        ComboTier::Double => damage = damage.saturating_add(config.combo.double_bonus),
        ComboTier::Finisher => damage = damage.max(lose.hp),
    }

    let winner_out = SideOutcome {
        damage: 0,
        hp: win.hp,
        knocked_out: false,
        win_streak: win.win_streak.saturating_add(1),
    };
    let loser_out = SideOutcome::hit(lose, damage, 0);

    let (left, right) = match winner {
        Corner::Left => (winner_out, loser_out),
        Corner::Right => (loser_out, winner_out),
    };

    Outcome {
        left,
        right,
        winner: Some(winner),
        tie: false,
        combo_tier,
    }
}

fn resolve_tie(config: &DamageConfig, battle: &Battle) -> Outcome {
    let tie_break = match config.tie_breaker {
        TieBreaker::ShorterAnswer if battle.left.answer_len < battle.right.answer_len => {
            Some(Corner::Left)
        }
        TieBreaker::ShorterAnswer if battle.right.answer_len < battle.left.answer_len => {
            Some(Corner::Right)
        }
        _ => None,
    };

    if battle.bragging {
        return Outcome {
            left: SideOutcome::unchanged(&battle.left),
            right: SideOutcome::unchanged(&battle.right),
            winner: tie_break,
            tie: true,
            combo_tier: ComboTier::None,
        };
    }

    let damage = tie_damage(config, battle.round);
    let streak = |corner: Corner, c: &Combatant| {
        if tie_break == Some(corner) {
            c.win_streak.saturating_add(1)
        } else {
            0
        }
    };

    Outcome {
        left: SideOutcome::hit(&battle.left, damage, streak(Corner::Left, &battle.left)),
        right: SideOutcome::hit(&battle.right, damage, streak(Corner::Right, &battle.right)),
        winner: tie_break,
        tie: true,
        combo_tier: ComboTier::None,
    }
}
