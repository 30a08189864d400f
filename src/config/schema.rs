//! Game configuration schema
//!
//! Every field has a default, so an empty file is a valid configuration.
//! Tuning knobs that the damage math reads (caps, multipliers, the Final
//! attack table) live here rather than in control flow.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::AttackType;

// ============================================================================
// Top-Level Configuration
// ============================================================================

/// Root configuration for a `roastbout` deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    /// Round structure and HP
    pub rounds: RoundsConfig,

    /// Damage math
    pub damage: DamageConfig,

    /// Answer and suggestion limits
    pub answers: AnswerLimits,

    /// Automated actor timing
    pub bots: BotConfig,

    /// Delay before a finished match is deleted
    #[serde(with = "duration_str")]
    pub cleanup_delay: Duration,

    /// Prompt text banks
    pub prompts: PromptBanks,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rounds: RoundsConfig::default(),
            damage: DamageConfig::default(),
            answers: AnswerLimits::default(),
            bots: BotConfig::default(),
            cleanup_delay: Duration::from_secs(60 * 60),
            prompts: PromptBanks::default(),
        }
    }
}

// ============================================================================
// Rounds
// ============================================================================

/// Round structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoundsConfig {
    /// Number of rounds; the last one is the Final
    pub max_rounds: u8,
    /// HP every fighter joins with
    pub starting_hp: u32,
    /// Fighters required to start
    pub min_fighters: usize,
    /// Lobby capacity
    pub max_participants: usize,
    /// Round 1
    pub main_round: MainRoundConfig,
    /// Round 2
    pub semi_finals: SemiFinalsConfig,
    /// Round 3
    #[serde(rename = "final")]
    pub final_round: FinalConfig,
}

impl Default for RoundsConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            starting_hp: 100,
            min_fighters: 3,
            max_participants: 12,
            main_round: MainRoundConfig::default(),
            semi_finals: SemiFinalsConfig::default(),
            final_round: FinalConfig::default(),
        }
    }
}

/// Main Round settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MainRoundConfig {
    /// Prompts generated for each matchup
    pub prompts_per_matchup: usize,
}

impl Default for MainRoundConfig {
    fn default() -> Self {
        Self {
            prompts_per_matchup: 5,
        }
    }
}

/// Semi-Finals settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SemiFinalsConfig {
    /// Fighters kept by The Cut
    pub finalists: usize,
    /// Single-word prompts per matchup
    pub jab_prompts: usize,
    /// Free-form closers per matchup
    pub haymaker_prompts: usize,
}

impl SemiFinalsConfig {
    /// Total prompts per Semi-Finals matchup.
    #[must_use]
    pub const fn prompts_per_matchup(&self) -> usize {
        self.jab_prompts + self.haymaker_prompts
    }
}

impl Default for SemiFinalsConfig {
    fn default() -> Self {
        Self {
            finalists: 4,
            jab_prompts: 3,
            haymaker_prompts: 1,
        }
    }
}

/// Final settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FinalConfig {
    /// HP (and max HP) finalists are reset to
    pub hp: u32,
}

impl Default for FinalConfig {
    fn default() -> Self {
        Self { hp: 200 }
    }
}

// ============================================================================
// Damage
// ============================================================================

/// How a tied vote picks a nominal winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreaker {
    /// The shorter answer takes the tie
    #[default]
    ShorterAnswer,
    /// Ties stay ties
    None,
}

/// Damage/defense multiplier pair for a Final attack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttackProfile {
    /// Multiplier on damage dealt when this attack wins
    pub dealt: f64,
    /// Multiplier on damage taken when this attack loses
    pub received_on_fail: f64,
}

impl AttackProfile {
    /// Neutral profile.
    pub const NEUTRAL: Self = Self {
        dealt: 1.0,
        received_on_fail: 1.0,
    };
}

/// Combo settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComboConfig {
    /// Flat bonus on a second consecutive win
    pub double_bonus: u32,
}

impl Default for ComboConfig {
    fn default() -> Self {
        Self { double_bonus: 15 }
    }
}

/// Damage math settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DamageConfig {
    /// Maximum vote-share damage before multipliers
    pub cap: u32,
    /// Per-round multiplier; missing rounds use 1.0
    pub round_multipliers: BTreeMap<u8, f64>,
    /// Share of the cap both sides take on a tie
    pub tie_share: f64,
    /// Combo bonuses
    pub combo: ComboConfig,
    /// Tie resolution
    pub tie_breaker: TieBreaker,
    /// Attack table keyed by round, then attack type
    pub attacks: BTreeMap<u8, BTreeMap<AttackType, AttackProfile>>,
}

impl DamageConfig {
    /// Multiplier for `round`, 1.0 when unconfigured.
    #[must_use]
    pub fn multiplier(&self, round: u8) -> f64 {
        self.round_multipliers.get(&round).copied().unwrap_or(1.0)
    }

    /// Attack profile for `round`, neutral when unconfigured.
    #[must_use]
    pub fn attack(&self, round: u8, attack: AttackType) -> AttackProfile {
        self.attacks
            .get(&round)
            .and_then(|table| table.get(&attack))
            .copied()
            .unwrap_or(AttackProfile::NEUTRAL)
    }
}

impl Default for DamageConfig {
    fn default() -> Self {
        let final_table = BTreeMap::from([
            (AttackType::Jab, AttackProfile::NEUTRAL),
            (
                AttackType::Haymaker,
                AttackProfile {
                    dealt: 2.0,
                    received_on_fail: 1.0,
                },
            ),
            (
                AttackType::FlyingKick,
                AttackProfile {
                    dealt: 3.0,
                    received_on_fail: 4.0,
                },
            ),
        ]);
        Self {
            cap: 35,
            round_multipliers: BTreeMap::from([(1, 1.0), (2, 1.3), (3, 1.0)]),
            tie_share: 0.5,
            combo: ComboConfig::default(),
            tie_breaker: TieBreaker::default(),
            attacks: BTreeMap::from([(3, final_table)]),
        }
    }
}

// ============================================================================
// Answers / Bots
// ============================================================================

/// Length limits for free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnswerLimits {
    /// Max answer length in characters
    pub max_length: usize,
    /// Max suggestion length in characters
    pub max_suggestion_length: usize,
    /// Max display name length in characters
    pub max_name_length: usize,
}

impl Default for AnswerLimits {
    fn default() -> Self {
        Self {
            max_length: 120,
            max_suggestion_length: 200,
            max_name_length: 24,
        }
    }
}

/// Automated actor timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BotConfig {
    /// Delay used when nobody human is waiting
    #[serde(with = "duration_str")]
    pub instant_delay: Duration,
    /// Lower bound of the randomized delay
    #[serde(with = "duration_str")]
    pub min_delay: Duration,
    /// Upper bound of the randomized delay
    #[serde(with = "duration_str")]
    pub max_delay: Duration,
    /// When set, REVEAL and ROUND_RESULTS advance on their own after this delay
    #[serde(with = "option_duration_str", skip_serializing_if = "Option::is_none")]
    pub auto_advance: Option<Duration>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            instant_delay: Duration::from_millis(50),
            min_delay: Duration::from_millis(1500),
            max_delay: Duration::from_millis(4000),
            auto_advance: None,
        }
    }
}

// ============================================================================
// Prompt Banks
// ============================================================================

/// Prompt texts drawn at round setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PromptBanks {
    /// Main Round prompts
    pub standard: Vec<String>,
    /// Single-word Semi-Finals prompts
    pub jab: Vec<String>,
    /// Semi-Finals closers
    pub haymaker: Vec<String>,
    /// Sudden-death prompts
    #[serde(rename = "final")]
    pub final_round: Vec<String>,
}

fn owned(texts: &[&str]) -> Vec<String> {
    texts.iter().map(ToString::to_string).collect()
}

impl Default for PromptBanks {
    fn default() -> Self {
        Self {
            standard: owned(&[
                "Your opponent's autobiography is titled...",
                "The real reason your opponent was kicked out of the gym",
                "Describe your opponent's fighting style as a weather forecast",
                "Your opponent's walk-out song should be...",
                "What the referee whispers about your opponent",
                "Your opponent's secret training montage consists of...",
                "The worst thing your opponent ever said in a press conference",
                "Your opponent's mouthguard is actually made of...",
                "The product your opponent would endorse",
                "What your opponent's corner really thinks of them",
                "Your opponent's victory dance looks like...",
                "Rename your opponent's signature move",
            ]),
            jab: owned(&[
                "One word for your opponent's haircut",
                "One word for your opponent's cooking",
                "One word for your opponent's cardio",
                "One word for your opponent's fashion sense",
                "One word for your opponent's dance moves",
                "One word for your opponent's singing voice",
                "One word for your opponent's driving",
                "One word for your opponent's handshake",
            ]),
            haymaker: owned(&[
                "Deliver the line that ends your opponent's career",
                "Write your opponent's retirement announcement",
                "The headline after you beat your opponent",
                "Your opponent's ring name, honestly updated",
            ]),
            final_round: owned(&[
                "Last words before the knockout",
                "The trophy engraving after you win",
                "What your opponent will tell their grandkids about tonight",
                "Your opponent's excuse for losing the final",
                "The one insult that finishes this",
            ]),
        }
    }
}

// ============================================================================
// Duration (de)serialization
// ============================================================================

/// Humantime strings such as `"1500ms"` or `"1h"`.
pub mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes a duration as a humantime string.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    /// Deserializes a humantime string.
    ///
    /// # Errors
    ///
    /// Fails on strings humantime cannot parse.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

/// Optional humantime strings.
pub mod option_duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes an optional duration as a humantime string.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_str(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_none(),
        }
    }

    /// Deserializes an optional humantime string.
    ///
    /// # Errors
    ///
    /// Fails on strings humantime cannot parse.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| humantime::parse_duration(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = GameConfig::default();
        assert_eq!(config.damage.cap, 35);
        assert!((config.damage.multiplier(1) - 1.0).abs() < f64::EPSILON);
        assert!((config.damage.multiplier(2) - 1.3).abs() < f64::EPSILON);
        assert_eq!(config.rounds.semi_finals.finalists, 4);
        assert_eq!(config.rounds.semi_finals.prompts_per_matchup(), 4);
        assert_eq!(config.rounds.final_round.hp, 200);
        assert_eq!(config.cleanup_delay, Duration::from_secs(3600));
    }

    #[test]
    fn final_attack_table() {
        let damage = DamageConfig::default();
        let kick = damage.attack(3, AttackType::FlyingKick);
        assert!((kick.dealt - 3.0).abs() < f64::EPSILON);
        assert!((kick.received_on_fail - 4.0).abs() < f64::EPSILON);
        // Rounds without a table are neutral
        assert_eq!(damage.attack(1, AttackType::FlyingKick), AttackProfile::NEUTRAL);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = r#"
damage:
  cap: 40
  round_multipliers:
    2: 1.5
bots:
  min_delay: 200ms
  max_delay: 1s
  auto_advance: 3s
"#;
        let config: GameConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.damage.cap, 40);
        assert!((config.damage.multiplier(2) - 1.5).abs() < f64::EPSILON);
        assert!((config.damage.multiplier(1) - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.bots.min_delay, Duration::from_millis(200));
        assert_eq!(config.bots.auto_advance, Some(Duration::from_secs(3)));
        assert_eq!(config.rounds, RoundsConfig::default());
    }

    #[test]
    fn attack_table_from_yaml() {
        let yaml = r#"
damage:
  attacks:
    3:
      haymaker: { dealt: 2.5, received_on_fail: 1.5 }
"#;
        let config: GameConfig = serde_yaml::from_str(yaml).unwrap();
        let hay = config.damage.attack(3, AttackType::Haymaker);
        assert!((hay.dealt - 2.5).abs() < f64::EPSILON);
        // Overriding the round-3 table replaces it wholesale
        assert_eq!(config.damage.attack(3, AttackType::Jab), AttackProfile::NEUTRAL);
    }

    #[test]
    fn unknown_fields_rejected() {
        let err = serde_yaml::from_str::<GameConfig>("damage:\n  capp: 3\n").unwrap_err();
        assert!(err.to_string().contains("capp"));
    }

    #[test]
    fn round_trips_through_yaml() {
        let config = GameConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: GameConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, config);
    }
}
