//! Configuration validation
//!
//! Runs on the deserialized [`GameConfig`] and collects every issue rather
//! than stopping at the first one.

use crate::config::schema::GameConfig;
use crate::error::{Severity, ValidationIssue};

// ============================================================================
// Public API
// ============================================================================

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns every issue found.
    pub fn validate(&mut self, config: &GameConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_rounds(config);
        self.validate_damage(config);
        self.validate_answers(config);
        self.validate_bots(config);
        self.validate_prompts(config);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Sections
    // ========================================================================

    fn validate_rounds(&mut self, config: &GameConfig) {
        let rounds = &config.rounds;

        if rounds.max_rounds != 3 {
            self.add_error(
                "rounds.max_rounds",
                "only the three-round format (main, semi-finals, final) is supported",
            );
        }
        if rounds.starting_hp == 0 {
            self.add_error("rounds.starting_hp", "must be greater than zero");
        }
        if rounds.final_round.hp == 0 {
            self.add_error("rounds.final.hp", "must be greater than zero");
        } else if rounds.final_round.hp < rounds.starting_hp {
            self.add_warning(
                "rounds.final.hp",
                "final HP is lower than starting HP; finalists will enter weaker",
            );
        }
        if rounds.min_fighters < 3 {
            self.add_error(
                "rounds.min_fighters",
                "a match needs at least 3 participants so every battle has a voter",
            );
        }
        if rounds.max_participants < rounds.min_fighters {
            self.add_error(
                "rounds.max_participants",
                "must be at least rounds.min_fighters",
            );
        }
        if rounds.main_round.prompts_per_matchup == 0 {
            self.add_error("rounds.main_round.prompts_per_matchup", "must be at least 1");
        }
        if rounds.semi_finals.finalists < 2 {
            self.add_error("rounds.semi_finals.finalists", "The Cut must keep at least 2");
        }
        if rounds.semi_finals.prompts_per_matchup() == 0 {
            self.add_error(
                "rounds.semi_finals",
                "jab_prompts + haymaker_prompts must be at least 1",
            );
        }
    }

    fn validate_damage(&mut self, config: &GameConfig) {
        let damage = &config.damage;

        if damage.cap == 0 {
            self.add_error("damage.cap", "must be greater than zero");
        } else if damage.cap > config.rounds.starting_hp {
            self.add_warning(
                "damage.cap",
                "cap exceeds starting HP; a single battle can knock a fighter out",
            );
        }

        for (round, multiplier) in &damage.round_multipliers {
            if !multiplier.is_finite() || *multiplier <= 0.0 {
                self.add_error(
                    &format!("damage.round_multipliers.{round}"),
                    "must be a positive number",
                );
            }
        }

        if !(0.0..=1.0).contains(&damage.tie_share) {
            self.add_error("damage.tie_share", "must be between 0 and 1");
        }

        for (round, table) in &damage.attacks {
            if *round == 0 || *round > config.rounds.max_rounds {
                self.add_warning(
                    &format!("damage.attacks.{round}"),
                    "attack table for a round that never happens",
                );
            }
            for (attack, profile) in table {
                let path = format!("damage.attacks.{round}.{attack:?}");
                if !profile.dealt.is_finite() || profile.dealt <= 0.0 {
                    self.add_error(&format!("{path}.dealt"), "must be a positive number");
                }
                if !profile.received_on_fail.is_finite() || profile.received_on_fail <= 0.0 {
                    self.add_error(
                        &format!("{path}.received_on_fail"),
                        "must be a positive number",
                    );
                }
            }
        }
    }

    fn validate_answers(&mut self, config: &GameConfig) {
        let answers = &config.answers;
        if answers.max_length == 0 {
            self.add_error("answers.max_length", "must be greater than zero");
        }
        if answers.max_suggestion_length == 0 {
            self.add_error("answers.max_suggestion_length", "must be greater than zero");
        }
        if answers.max_name_length == 0 {
            self.add_error("answers.max_name_length", "must be greater than zero");
        }
    }

    fn validate_bots(&mut self, config: &GameConfig) {
        let bots = &config.bots;
        if bots.min_delay > bots.max_delay {
            self.add_error("bots.min_delay", "must not exceed bots.max_delay");
        }
        if bots.instant_delay > bots.min_delay {
            self.add_warning(
                "bots.instant_delay",
                "instant delay is longer than the human-facing minimum",
            );
        }
    }

    fn validate_prompts(&mut self, config: &GameConfig) {
        let banks = &config.prompts;
        for (path, bank) in [
            ("prompts.standard", &banks.standard),
            ("prompts.jab", &banks.jab),
            ("prompts.haymaker", &banks.haymaker),
            ("prompts.final", &banks.final_round),
        ] {
            if bank.is_empty() {
                self.add_error(path, "prompt bank cannot be empty");
            } else if bank.iter().any(|p| p.trim().is_empty()) {
                self.add_error(path, "prompt bank contains a blank prompt");
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::AttackProfile;
    use crate::model::AttackType;
    use std::time::Duration;

    fn validate(config: &GameConfig) -> ValidationResult {
        Validator::new().validate(config)
    }

    fn has_error(result: &ValidationResult, path: &str) -> bool {
        result.errors.iter().any(|e| e.path == path)
    }

    #[test]
    fn defaults_are_valid() {
        let result = validate(&GameConfig::default());
        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn collects_all_errors() {
        let mut config = GameConfig::default();
        config.damage.cap = 0;
        config.rounds.semi_finals.finalists = 1;
        config.prompts.jab.clear();

        let result = validate(&config);
        assert!(has_error(&result, "damage.cap"));
        assert!(has_error(&result, "rounds.semi_finals.finalists"));
        assert!(has_error(&result, "prompts.jab"));
    }

    #[test]
    fn non_positive_multiplier() {
        let mut config = GameConfig::default();
        config.damage.round_multipliers.insert(2, 0.0);
        assert!(has_error(&validate(&config), "damage.round_multipliers.2"));
    }

    #[test]
    fn bad_attack_profile() {
        let mut config = GameConfig::default();
        config.damage.attacks.entry(3).or_default().insert(
            AttackType::Haymaker,
            AttackProfile {
                dealt: -1.0,
                received_on_fail: 1.0,
            },
        );
        let result = validate(&config);
        assert!(has_error(&result, "damage.attacks.3.Haymaker.dealt"));
    }

    #[test]
    fn delay_bounds() {
        let mut config = GameConfig::default();
        config.bots.min_delay = Duration::from_secs(10);
        assert!(has_error(&validate(&config), "bots.min_delay"));
    }

    #[test]
    fn weak_final_is_a_warning() {
        let mut config = GameConfig::default();
        config.rounds.final_round.hp = 50;
        let result = validate(&config);
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.path == "rounds.final.hp"));
    }
}
