use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

/// Rewards without noise for one block: `[planet][alien]`.
pub type CleanRewards = [[i64; 2]; 3];

/// Default drift schedule, one entry per block.
pub const DEFAULT_CLEAN_REWARDS: [CleanRewards; 5] = [
    [[3, 7], [6, 9], [2, 3]],
    [[2, 4], [6, 11], [1, 2]],
    [[4, 6], [5, 9], [1, 4]],
    [[6, 10], [9, 11], [2, 4]],
    [[8, 10], [9, 10], [2, 8]],
];

/// Clean rewards of the two practice aliens.
pub const ALIEN_PRACTICE_REWARDS: [i64; 2] = [2, 7];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlienPracticeRounds {
    pub trials_per_round: usize,
    /// Consecutive picks of the better alien that end the practice.
    pub streak_required: usize,
    pub max_rounds: usize,
}

impl Default for AlienPracticeRounds {
    fn default() -> Self {
        Self {
            trials_per_round: 10,
            streak_required: 3,
            max_rounds: 10,
        }
    }
}

/// Every constant of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// `None` waits forever for each choice.
    pub choice_duration_ms: Option<u64>,
    pub feedback_duration_ms: u64,
    pub warning_duration_ms: u64,
    pub iti_duration_ms: u64,
    pub animation: bool,
    pub randomize_s1: bool,
    pub randomize_s2: bool,
    pub show_gem_counter: bool,
    pub valid_responses: [String; 2],
    /// Missed task trials (cumulative) that abort the session.
    pub missed_threshold: usize,
    pub blocks: usize,
    pub trials_per_block: usize,
    pub forced_per_block: usize,
    /// Forced trials are never placed before this 0-based position.
    pub forced_min_position: usize,
    pub practice_trials: usize,
    pub alien_practice: AlienPracticeRounds,
    pub reward_noise_sd: f64,
    pub clean_rewards: Vec<CleanRewards>,
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            choice_duration_ms: Some(10_000),
            feedback_duration_ms: 1_200,
            warning_duration_ms: 5_000,
            iti_duration_ms: 1_000,
            animation: true,
            randomize_s1: true,
            randomize_s2: false,
            show_gem_counter: false,
            valid_responses: ["arrowleft".to_string(), "arrowright".to_string()],
            missed_threshold: 6,
            blocks: 5,
            trials_per_block: 40,
            forced_per_block: 6,
            forced_min_position: 3,
            practice_trials: 10,
            alien_practice: AlienPracticeRounds::default(),
            reward_noise_sd: 2.0,
            clean_rewards: DEFAULT_CLEAN_REWARDS.to_vec(),
            seed: None,
        }
    }
}

impl SessionConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        info!(path = %path.display(), "session config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Invalid(message));

        if self.blocks == 0 {
            return invalid("blocks must be at least 1".to_string());
        }
        if self.trials_per_block == 0 {
            return invalid("trials_per_block must be at least 1".to_string());
        }
        let eligible = self.trials_per_block.saturating_sub(self.forced_min_position);
        if self.forced_per_block > eligible {
            return invalid(format!(
                "forced_per_block {} exceeds the {eligible} eligible positions",
                self.forced_per_block
            ));
        }
        if self.clean_rewards.len() < self.blocks {
            return invalid(format!(
                "clean_rewards covers {} blocks, {} requested",
                self.clean_rewards.len(),
                self.blocks
            ));
        }
        if self.alien_practice.trials_per_round == 0 {
            return invalid("alien_practice.trials_per_round must be at least 1".to_string());
        }
        if self.alien_practice.max_rounds == 0 {
            return invalid("alien_practice.max_rounds must be at least 1".to_string());
        }
        if self.missed_threshold == 0 {
            return invalid("missed_threshold must be at least 1".to_string());
        }
        if !self.reward_noise_sd.is_finite() || self.reward_noise_sd < 0.0 {
            return invalid(format!(
                "reward_noise_sd must be a non-negative number, got {}",
                self.reward_noise_sd
            ));
        }
        if self.valid_responses[0].eq_ignore_ascii_case(&self.valid_responses[1]) {
            return invalid("the two response keys must differ".to_string());
        }
        Ok(())
    }

    /// Positions below this count as the first half of a block.
    pub fn half_block(&self) -> usize {
        self.trials_per_block / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = SessionConfig::default();
        config.validate().unwrap();
        assert_eq!(config.choice_duration_ms, Some(10_000));
        assert_eq!(config.clean_rewards.len(), 5);
        assert!(!config.randomize_s2);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{ "blocks": 2, "seed": 7, "alien_practice": { "max_rounds": 3 } }"#)
                .unwrap();
        assert_eq!(config.blocks, 2);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.alien_practice.max_rounds, 3);
        assert_eq!(config.alien_practice.trials_per_round, 10);
        assert_eq!(config.trials_per_block, 40);
    }

    #[test]
    fn validate_rejects_impossible_forced_counts() {
        let config = SessionConfig {
            trials_per_block: 8,
            forced_per_block: 6,
            ..SessionConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validate_rejects_missing_block_schedules() {
        let config = SessionConfig {
            blocks: 6,
            ..SessionConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validate_rejects_zero_round_size() {
        let mut config = SessionConfig::default();
        config.alien_practice.trials_per_round = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn from_path_reports_io_and_parse_errors() {
        let missing = std::env::temp_dir().join("twostep-config-does-not-exist.json");
        assert!(matches!(
            SessionConfig::from_path(&missing),
            Err(ConfigError::Io { .. })
        ));

        let path = std::env::temp_dir().join(format!("twostep-config-{}.json", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(b"{ not json").unwrap();
        drop(file);
        assert!(matches!(
            SessionConfig::from_path(&path),
            Err(ConfigError::Parse(_))
        ));

        fs::write(&path, r#"{ "blocks": 1, "trials_per_block": 12 }"#).unwrap();
        let config = SessionConfig::from_path(&path).unwrap();
        assert_eq!(config.blocks, 1);
        fs::remove_file(&path).unwrap();
    }
}
