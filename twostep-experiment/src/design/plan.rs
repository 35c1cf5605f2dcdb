use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use twostep_core::{AlienPracticeConfig, ForcedOverrides, TrialConfig, TrialMeta};

use super::rewards::{alien_practice_outcomes, block_schedule};
use super::sampling::weighted_sample;
use super::stimuli::{BlockStimuli, design_blocks, practice_aliens};
use crate::config::SessionConfig;
use crate::error::ConfigError;
use crate::transition::DESTINATIONS;

/// Forced rocket per trial position of one block.
///
/// Positions are drawn without replacement from `min_position..trials`,
/// twice as likely in the first half of the block. Targets alternate
/// between the two rockets before shuffling so each rocket is forced about
/// equally often.
pub fn place_forced<R: Rng + ?Sized>(
    trials: usize,
    count: usize,
    min_position: usize,
    rng: &mut R,
) -> BTreeMap<usize, usize> {
    let positions: Vec<usize> = (min_position..trials).collect();
    let half = trials / 2;
    let weights: Vec<u32> = positions
        .iter()
        .map(|position| if *position < half { 2 } else { 1 })
        .collect();
    let picked = weighted_sample(&positions, &weights, count, rng);

    let mut targets: Vec<usize> = (0..count).map(|i| i % 2).collect();
    targets.shuffle(rng);
    picked.into_iter().zip(targets).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockPlan {
    /// 1-based.
    pub block: u32,
    pub stimuli: BlockStimuli,
    pub trials: Vec<TrialConfig>,
}

impl BlockPlan {
    pub fn forced_count(&self) -> usize {
        self.trials.iter().filter(|trial| trial.is_forced()).count()
    }
}

/// Everything a session will show, designed up front from one seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPlan {
    pub blocks: Vec<BlockPlan>,
    /// Two-step practice on block 1 stimuli.
    pub practice: Vec<TrialConfig>,
    /// Alien practice template; outcomes are drawn per trial.
    pub alien_practice: AlienPracticeConfig,
    pub reward_noise_sd: f64,
}

impl SessionPlan {
    pub fn design<R: Rng + ?Sized>(config: &SessionConfig, rng: &mut R) -> Result<Self, ConfigError> {
        config.validate()?;
        let designed = design_blocks(config.blocks, rng);

        let mut blocks = Vec::with_capacity(config.blocks);
        let mut first_schedule = Vec::new();
        for (index, (stimuli, clean)) in designed.into_iter().zip(&config.clean_rewards).enumerate() {
            let block = index as u32 + 1;
            let schedule = block_schedule(clean, config.trials_per_block, config.reward_noise_sd, rng);
            let forced = place_forced(
                config.trials_per_block,
                config.forced_per_block,
                config.forced_min_position,
                rng,
            );
            let trials = schedule
                .iter()
                .enumerate()
                .map(|(position, outcomes)| {
                    let overrides = match forced.get(&position) {
                        Some(rocket) => ForcedOverrides {
                            enabled: true,
                            state1_key: Some(*rocket),
                            state1_color: Some(stimuli.rocket_colors[*rocket].clone()),
                            ..ForcedOverrides::default()
                        },
                        None => ForcedOverrides::default(),
                    };
                    task_trial(
                        config,
                        &stimuli,
                        stimuli.aliens.clone(),
                        outcomes.clone(),
                        overrides,
                        TrialMeta {
                            trial: position as u32 + 1,
                            block: Some(block),
                            practice: false,
                        },
                    )
                })
                .collect();
            if index == 0 {
                first_schedule = schedule;
            }
            info!(
                block,
                rockets = ?stimuli.rocket_colors,
                deterministic = %stimuli.deterministic_rocket_color,
                planets = ?stimuli.planet_names,
                fallback = stimuli.rocket_fallback,
                "block designed"
            );
            blocks.push(BlockPlan {
                block,
                stimuli,
                trials,
            });
        }

        let Some(first) = blocks.first().map(|plan| &plan.stimuli) else {
            return Err(ConfigError::Invalid("no blocks designed".to_string()));
        };
        let aliens = practice_aliens(&first.planet_names);
        if config.practice_trials > first_schedule.len() {
            warn!(
                practice = config.practice_trials,
                available = first_schedule.len(),
                "practice runs past the block 1 schedule, extra trials pay nothing"
            );
        }
        let practice = (0..config.practice_trials)
            .map(|index| {
                let outcomes = first_schedule
                    .get(index)
                    .cloned()
                    .unwrap_or_else(|| vec![0; 2 * DESTINATIONS]);
                let overrides = if index == 1 {
                    ForcedOverrides {
                        enabled: true,
                        state1_key: Some(0),
                        state2_key: Some(0),
                        ..ForcedOverrides::default()
                    }
                } else {
                    ForcedOverrides::default()
                };
                task_trial(
                    config,
                    first,
                    aliens.clone(),
                    outcomes,
                    overrides,
                    TrialMeta {
                        trial: index as u32 + 1,
                        block: None,
                        practice: true,
                    },
                )
            })
            .collect();

        let alien_practice = AlienPracticeConfig {
            aliens: aliens.iter().take(2).cloned().collect(),
            outcomes: None,
            planet_color: first.planet_colors.first().cloned().unwrap_or_default(),
            randomize: false,
            valid_responses: config.valid_responses.clone(),
            choice_duration_ms: config.choice_duration_ms,
            feedback_duration_ms: config.feedback_duration_ms,
            warning_duration_ms: config.warning_duration_ms,
            iti_duration_ms: config.iti_duration_ms,
            meta: TrialMeta {
                trial: 0,
                block: None,
                practice: true,
            },
        };

        Ok(Self {
            blocks,
            practice,
            alien_practice,
            reward_noise_sd: config.reward_noise_sd,
        })
    }

    /// Alien practice trial `trial` (1-based) with freshly drawn outcomes.
    pub fn alien_practice_trial<R: Rng + ?Sized>(&self, trial: u32, rng: &mut R) -> AlienPracticeConfig {
        AlienPracticeConfig {
            outcomes: Some(alien_practice_outcomes(self.reward_noise_sd, rng)),
            meta: TrialMeta {
                trial,
                ..self.alien_practice.meta.clone()
            },
            ..self.alien_practice.clone()
        }
    }

    pub fn block(&self, block: u32) -> Option<&BlockPlan> {
        self.blocks.iter().find(|plan| plan.block == block)
    }

    pub fn task_trials(&self) -> usize {
        self.blocks.iter().map(|block| block.trials.len()).sum()
    }
}

fn task_trial(
    config: &SessionConfig,
    stimuli: &BlockStimuli,
    aliens: Vec<String>,
    outcomes: Vec<i64>,
    forced: ForcedOverrides,
    meta: TrialMeta,
) -> TrialConfig {
    TrialConfig {
        rocket_colors: stimuli.rocket_colors.clone(),
        deterministic_rocket_color: stimuli.deterministic_rocket_color.clone(),
        planet_colors: stimuli.planet_colors.clone(),
        aliens,
        outcomes: Some(outcomes),
        valid_responses_s1: config.valid_responses.clone(),
        valid_responses_s2: config.valid_responses.clone(),
        randomize_s1: config.randomize_s1,
        randomize_s2: config.randomize_s2,
        stage1_timeout_ms: config.choice_duration_ms,
        stage2_timeout_ms: config.choice_duration_ms,
        feedback_duration_ms: config.feedback_duration_ms,
        warning_duration_ms: config.warning_duration_ms,
        animation: config.animation,
        show_gem_counter: config.show_gem_counter,
        forced,
        meta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn forced_positions_respect_minimum_and_balance() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let forced = place_forced(40, 6, 3, &mut rng);
            assert_eq!(forced.len(), 6);
            assert!(forced.keys().all(|position| (3..40).contains(position)));
            assert_eq!(forced.values().filter(|rocket| **rocket == 0).count(), 3);
        }
    }

    #[test]
    fn forced_positions_lean_to_first_half() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut first_half = 0;
        let mut total = 0;
        for _ in 0..500 {
            for position in place_forced(40, 6, 3, &mut rng).keys() {
                total += 1;
                if *position < 20 {
                    first_half += 1;
                }
            }
        }
        // 17 first-half slots at weight 2 against 20 at weight 1.
        assert!(first_half * 2 > total, "{first_half} of {total}");
    }

    #[test]
    fn default_plan_matches_session_shape() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = SessionConfig::default();
        let plan = SessionPlan::design(&config, &mut rng).unwrap();
        assert_eq!(plan.blocks.len(), 5);
        assert_eq!(plan.task_trials(), 200);
        for block in &plan.blocks {
            assert_eq!(block.forced_count(), 6);
            let first = &block.trials[0];
            assert!(first.meta.starts_block());
            assert_eq!(first.meta.block, Some(block.block));
            assert_eq!(first.stage1_timeout_ms, Some(10_000));
            assert!(block.trials.iter().all(|t| t.outcomes.as_ref().map(Vec::len) == Some(6)));
            for forced in block.trials.iter().filter(|t| t.is_forced()) {
                let rocket = forced.forced.state1_key.unwrap();
                assert_eq!(
                    forced.forced.state1_color.as_deref(),
                    Some(block.stimuli.rocket_colors[rocket].as_str())
                );
                assert!(forced.meta.trial > 3);
            }
        }
        assert!(plan.block(1).unwrap().trials[0].meta.starts_session());
    }

    #[test]
    fn practice_uses_block_one_stimuli_and_forces_second_trial() {
        let mut rng = StdRng::seed_from_u64(4);
        let plan = SessionPlan::design(&SessionConfig::default(), &mut rng).unwrap();
        let block1 = &plan.blocks[0];
        assert_eq!(plan.practice.len(), 10);
        for (index, trial) in plan.practice.iter().enumerate() {
            assert!(trial.is_practice());
            assert_eq!(trial.meta.block, None);
            assert_eq!(trial.rocket_colors, block1.stimuli.rocket_colors);
            assert_eq!(trial.outcomes.as_ref(), Some(block1.trials[index].outcomes.as_ref().unwrap()));
            assert!(trial.aliens[0].starts_with("P1-"));
            assert_eq!(trial.is_forced(), index == 1);
        }
        assert_eq!(plan.practice[1].forced.state2_key, Some(0));
    }

    #[test]
    fn long_practice_pads_with_zero_rewards() {
        let mut rng = StdRng::seed_from_u64(5);
        let config = SessionConfig {
            blocks: 1,
            trials_per_block: 10,
            forced_per_block: 2,
            practice_trials: 12,
            ..SessionConfig::default()
        };
        let plan = SessionPlan::design(&config, &mut rng).unwrap();
        assert_eq!(plan.practice[11].outcomes, Some(vec![0; 6]));
    }

    #[test]
    fn alien_practice_draws_fresh_outcomes() {
        let mut rng = StdRng::seed_from_u64(6);
        let plan = SessionPlan::design(&SessionConfig::default(), &mut rng).unwrap();
        let trial = plan.alien_practice_trial(4, &mut rng);
        assert_eq!(trial.aliens.len(), 2);
        assert!(!trial.randomize);
        assert_eq!(trial.meta.trial, 4);
        assert_eq!(trial.outcomes.as_ref().map(Vec::len), Some(2));
        assert_eq!(trial.planet_color, plan.blocks[0].stimuli.planet_colors[0]);
    }

    #[test]
    fn invalid_config_is_refused() {
        let mut rng = StdRng::seed_from_u64(7);
        let config = SessionConfig {
            blocks: 0,
            ..SessionConfig::default()
        };
        assert!(matches!(
            SessionPlan::design(&config, &mut rng),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn same_seed_same_plan() {
        let config = SessionConfig::default();
        let a = SessionPlan::design(&config, &mut StdRng::seed_from_u64(8)).unwrap();
        let b = SessionPlan::design(&config, &mut StdRng::seed_from_u64(8)).unwrap();
        assert_eq!(a, b);
    }
}
