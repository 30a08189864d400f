//! Round setup
//!
//! Pairs fighters, draws prompt texts and decides which battle is played
//! next. Everything here is pure: the arena persists the plans.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::config::schema::{GameConfig, SemiFinalsConfig};
use crate::model::{DocId, Fighter, Kind, Prompt, PromptType};

/// Round numbers.
pub const MAIN_ROUND: u8 = 1;
/// Round 2
pub const SEMI_FINALS: u8 = 2;
/// Round 3
pub const FINAL: u8 = 3;

/// Used when a prompt bank is empty.
const FALLBACK_PROMPT: &str = "Say something about your opponent";

/// Two combatants, in matchup order.
pub type Matchup = (DocId, DocId);

/// A prompt that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPlan {
    /// Prompt text
    pub text: String,
    /// Answer rules
    pub prompt_type: PromptType,
    /// Combatants
    pub assigned_to: Vec<DocId>,
}

impl PromptPlan {
    /// Materializes the plan as a record with a fresh id.
    #[must_use]
    pub fn into_prompt(self, match_id: &DocId, round: u8) -> Prompt {
        Prompt {
            id: DocId::generate(Kind::Prompt),
            seq: 0,
            match_id: match_id.clone(),
            round,
            text: self.text,
            prompt_type: self.prompt_type,
            assigned_to: self.assigned_to,
        }
    }
}

// ============================================================================
// Prompt texts
// ============================================================================

/// Draws texts from a bank without repeats until the bank runs out, then
/// reshuffles.
#[derive(Debug)]
pub struct TextDeck<'a> {
    bank: &'a [String],
    order: Vec<usize>,
}

impl<'a> TextDeck<'a> {
    /// Creates a deck over `bank`.
    #[must_use]
    pub const fn new(bank: &'a [String]) -> Self {
        Self {
            bank,
            order: Vec::new(),
        }
    }

    /// Next text.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> String {
        if self.bank.is_empty() {
            return FALLBACK_PROMPT.to_string();
        }
        if self.order.is_empty() {
            self.order = (0..self.bank.len()).collect();
            self.order.shuffle(rng);
        }
        self.order
            .pop()
            .and_then(|i| self.bank.get(i))
            .cloned()
            .unwrap_or_else(|| FALLBACK_PROMPT.to_string())
    }
}

// ============================================================================
// Main Round
// ============================================================================

/// Pairs live fighters in join order. An odd fighter out also fights the
/// first fighter.
#[must_use]
pub fn main_round_pairs(fighters: &[Fighter]) -> Vec<Matchup> {
    let mut live: Vec<&Fighter> = fighters.iter().filter(|f| f.is_live_fighter()).collect();
    live.sort_by_key(|f| f.seq);

    let mut pairs: Vec<Matchup> = live
        .chunks_exact(2)
        .map(|pair| (pair[0].id.clone(), pair[1].id.clone()))
        .collect();

    if live.len() % 2 == 1 && live.len() >= 3 {
        let last = live[live.len() - 1];
        pairs.push((last.id.clone(), live[0].id.clone()));
    }
    pairs
}

/// Round 1 prompts, matchup-major.
pub fn plan_main_round<R: Rng + ?Sized>(
    fighters: &[Fighter],
    config: &GameConfig,
    rng: &mut R,
) -> Vec<PromptPlan> {
    let mut deck = TextDeck::new(&config.prompts.standard);
    let per_matchup = config.rounds.main_round.prompts_per_matchup;

    main_round_pairs(fighters)
        .into_iter()
        .flat_map(|(a, b)| {
            (0..per_matchup)
                .map(|_| PromptPlan {
                    text: deck.draw(rng),
                    prompt_type: PromptType::Standard,
                    assigned_to: vec![a.clone(), b.clone()],
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

// ============================================================================
// Semi-Finals
// ============================================================================

/// Semi-Finals bracket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemiBracket {
    /// 1 vs N, 2 vs N-1, ...
    pub matchups: Vec<Matchup>,
    /// Top seed when the field is odd
    pub bye: Option<DocId>,
}

/// Seeds the bracket from fighters ordered best first.
#[must_use]
pub fn seed_semi_finals(seeded: &[DocId]) -> SemiBracket {
    let (bye, field) = if seeded.len() % 2 == 1 {
        (seeded.first().cloned(), seeded.get(1..).unwrap_or_default())
    } else {
        (None, seeded)
    };

    let half = field.len() / 2;
    let matchups = (0..half)
        .map(|i| (field[i].clone(), field[field.len() - 1 - i].clone()))
        .collect();

    SemiBracket { matchups, bye }
}

/// Round 2 prompts: per matchup, the jabs then the haymakers.
pub fn plan_semi_finals<R: Rng + ?Sized>(
    bracket: &SemiBracket,
    config: &GameConfig,
    rng: &mut R,
) -> Vec<PromptPlan> {
    let semis = &config.rounds.semi_finals;
    let mut jabs = TextDeck::new(&config.prompts.jab);
    let mut haymakers = TextDeck::new(&config.prompts.haymaker);

    let mut plans = Vec::with_capacity(bracket.matchups.len() * semis.prompts_per_matchup());
    for (a, b) in &bracket.matchups {
        let assigned_to = vec![a.clone(), b.clone()];
        for _ in 0..semis.jab_prompts {
            plans.push(PromptPlan {
                text: jabs.draw(rng),
                prompt_type: PromptType::Jab,
                assigned_to: assigned_to.clone(),
            });
        }
        for _ in 0..semis.haymaker_prompts {
            plans.push(PromptPlan {
                text: haymakers.draw(rng),
                prompt_type: PromptType::Haymaker,
                assigned_to: assigned_to.clone(),
            });
        }
    }
    plans
}

/// Outcome of the Semi-Finals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalEntry {
    /// At most two, best first
    pub finalists: Vec<DocId>,
    /// Fighters leaving the ring
    pub eliminated: Vec<DocId>,
}

fn seed_key(f: &Fighter) -> (std::cmp::Reverse<u32>, u32, u64) {
    (std::cmp::Reverse(f.hp), f.seed.unwrap_or(u32::MAX), f.seq)
}

/// Decides who reaches the Final.
///
/// Each semi matchup sends its live combatant with more HP (ties go to the
/// better seed); a live fighter without a matchup advances on a bye. When
/// more than two qualify, the two strongest go through.
#[must_use]
pub fn final_entry(semi_prompts: &[Prompt], fighters: &[Fighter]) -> FinalEntry {
    let find = |id: &DocId| fighters.iter().find(|f| &f.id == id);

    let mut matchups: Vec<&[DocId]> = Vec::new();
    for prompt in semi_prompts {
        if !matchups.contains(&prompt.assigned_to.as_slice()) {
            matchups.push(&prompt.assigned_to);
        }
    }

    let mut qualified: Vec<&Fighter> = matchups
        .iter()
        .filter_map(|ids| {
            ids.iter()
                .filter_map(|id| find(id))
                .filter(|f| f.is_live_fighter())
                .min_by_key(|f| seed_key(f))
        })
        .collect();

    qualified.extend(fighters.iter().filter(|f| {
        f.is_live_fighter() && !matchups.iter().any(|ids| ids.contains(&f.id))
    }));

    qualified.sort_by_key(|f| seed_key(f));
    qualified.truncate(2);

    let finalists: Vec<DocId> = qualified.iter().map(|f| f.id.clone()).collect();
    let eliminated = fighters
        .iter()
        .filter(|f| f.role == crate::model::Role::Fighter && !finalists.contains(&f.id))
        .map(|f| f.id.clone())
        .collect();

    FinalEntry {
        finalists,
        eliminated,
    }
}

// ============================================================================
// Final
// ============================================================================

/// A fresh sudden-death prompt, avoiding texts already used this round.
pub fn plan_final_prompt<R: Rng + ?Sized>(
    finalists: &Matchup,
    config: &GameConfig,
    used: &[Prompt],
    rng: &mut R,
) -> PromptPlan {
    let bank = &config.prompts.final_round;
    let fresh: Vec<&String> = bank
        .iter()
        .filter(|text| !used.iter().any(|p| &p.text == *text))
        .collect();

    let text = if fresh.is_empty() {
        TextDeck::new(bank).draw(rng)
    } else {
        fresh[rng.random_range(0..fresh.len())].clone()
    };

    PromptPlan {
        text,
        prompt_type: PromptType::Final,
        assigned_to: vec![finalists.0.clone(), finalists.1.clone()],
    }
}

// ============================================================================
// Battle order
// ============================================================================

/// 1-based position of `prompt` among the round's prompts with the same
/// ordered `assigned_to`.
#[must_use]
pub fn matchup_position(prompt: &Prompt, round_prompts: &[Prompt]) -> usize {
    round_prompts
        .iter()
        .filter(|p| p.assigned_to == prompt.assigned_to && p.seq <= prompt.seq)
        .count()
}

/// A combatant is knocked out or no longer fighting.
#[must_use]
pub fn matchup_decided(prompt: &Prompt, fighters: &[Fighter]) -> bool {
    prompt.assigned_to.iter().any(|id| {
        fighters
            .iter()
            .find(|f| &f.id == id)
            .is_none_or(|f| !f.is_live_fighter())
    })
}

/// The last Semi-Finals prompt of a matchup that is already decided.
#[must_use]
pub fn is_bragging_round(
    prompt: &Prompt,
    round_prompts: &[Prompt],
    fighters: &[Fighter],
    semis: &SemiFinalsConfig,
) -> bool {
    prompt.round == SEMI_FINALS
        && matchup_position(prompt, round_prompts) == semis.prompts_per_matchup()
        && matchup_decided(prompt, fighters)
}

fn playable(prompt: &Prompt, round_prompts: &[Prompt], fighters: &[Fighter], config: &GameConfig) -> bool {
    !matchup_decided(prompt, fighters)
        || is_bragging_round(prompt, round_prompts, fighters, &config.rounds.semi_finals)
}

/// First battle to vote on once answers are in.
///
/// The Final votes on its latest prompt; other rounds start from the
/// earliest playable prompt.
#[must_use]
pub fn first_battle<'a>(
    round: u8,
    round_prompts: &'a [Prompt],
    fighters: &[Fighter],
    config: &GameConfig,
) -> Option<&'a Prompt> {
    if round == FINAL {
        return round_prompts.iter().max_by_key(|p| p.seq);
    }
    let mut ordered: Vec<&Prompt> = round_prompts.iter().collect();
    ordered.sort_by_key(|p| p.seq);
    ordered
        .into_iter()
        .find(|p| playable(p, round_prompts, fighters, config))
}

/// Next battle after `current`, or `None` when the round is over.
#[must_use]
pub fn next_battle<'a>(
    current: &Prompt,
    round_prompts: &'a [Prompt],
    fighters: &[Fighter],
    config: &GameConfig,
) -> Option<&'a Prompt> {
    let mut ordered: Vec<&Prompt> = round_prompts
        .iter()
        .filter(|p| p.seq > current.seq)
        .collect();
    ordered.sort_by_key(|p| p.seq);
    ordered
        .into_iter()
        .find(|p| playable(p, round_prompts, fighters, config))
}
