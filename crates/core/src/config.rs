//! Gameplay configuration

use std::env;

use crate::types::{CollisionRule, Difficulty, GROUND_FALLBACK_Y};

/// Session configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    /// Seed for block geometry and color sampling.
    pub seed: u32,
    /// Difficulty at session creation.
    pub difficulty: Difficulty,
    pub collision_rule: CollisionRule,
    /// Ground height used when the base platform cannot be found.
    pub ground_fallback_y: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            difficulty: Difficulty::Easy,
            collision_rule: CollisionRule::default(),
            ground_fallback_y: GROUND_FALLBACK_Y,
        }
    }
}

impl GameConfig {
    /// Create from environment variables
    ///
    /// - `TOWER_SEED`: RNG seed (default 1)
    /// - `TOWER_DIFFICULTY`: `easy`, `normal` or `hard` (default `easy`)
    /// - `TOWER_COLLISION_RULE`: `overlap` or `unsupported` (default `unsupported`)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let seed = env::var("TOWER_SEED")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.seed);

        let difficulty = env::var("TOWER_DIFFICULTY")
            .ok()
            .and_then(|s| Difficulty::from_str(&s))
            .unwrap_or(defaults.difficulty);

        let collision_rule = env::var("TOWER_COLLISION_RULE")
            .ok()
            .and_then(|s| CollisionRule::from_str(&s))
            .unwrap_or(defaults.collision_rule);

        Self {
            seed,
            difficulty,
            collision_rule,
            ..defaults
        }
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_collision_rule(mut self, rule: CollisionRule) -> Self {
        self.collision_rule = rule;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dialog_start_state() {
        let config = GameConfig::default();
        assert_eq!(config.difficulty, Difficulty::Easy);
        assert_eq!(config.collision_rule, CollisionRule::Unsupported);
        assert_eq!(config.ground_fallback_y, 0.5);
    }

    #[test]
    fn from_env_does_not_panic() {
        let _config = GameConfig::from_env();
    }

    #[test]
    fn builder_methods() {
        let config = GameConfig::default()
            .with_seed(9)
            .with_difficulty(Difficulty::Hard)
            .with_collision_rule(CollisionRule::Overlap);
        assert_eq!(config.seed, 9);
        assert_eq!(config.difficulty, Difficulty::Hard);
        assert_eq!(config.collision_rule, CollisionRule::Overlap);
    }
}
