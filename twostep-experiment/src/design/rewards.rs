//! Noisy reward vectors drawn around each block's clean rewards.

use rand::Rng;

use super::sampling::noisy_reward;
use crate::config::{ALIEN_PRACTICE_REWARDS, CleanRewards};

/// One reward vector per trial, indexed by absolute alien (planet-major).
pub fn block_schedule<R: Rng + ?Sized>(
    clean: &CleanRewards,
    trials: usize,
    sd: f64,
    rng: &mut R,
) -> Vec<Vec<i64>> {
    (0..trials).map(|_| trial_outcomes(clean, sd, rng)).collect()
}

pub fn trial_outcomes<R: Rng + ?Sized>(clean: &CleanRewards, sd: f64, rng: &mut R) -> Vec<i64> {
    clean
        .iter()
        .flatten()
        .map(|reward| noisy_reward(*reward, sd, rng))
        .collect()
}

/// Rewards for the two practice aliens, drawn fresh for every trial.
pub fn alien_practice_outcomes<R: Rng + ?Sized>(sd: f64, rng: &mut R) -> Vec<i64> {
    ALIEN_PRACTICE_REWARDS
        .iter()
        .map(|reward| noisy_reward(*reward, sd, rng))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CLEAN_REWARDS;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn noiseless_schedule_flattens_planets_in_order() {
        let mut rng = StdRng::seed_from_u64(1);
        let schedule = block_schedule(&DEFAULT_CLEAN_REWARDS[0], 3, 0.0, &mut rng);
        assert_eq!(schedule.len(), 3);
        assert!(schedule.iter().all(|trial| trial == &[3, 7, 6, 9, 2, 3]));
    }

    #[test]
    fn noisy_schedule_stays_near_clean_rewards() {
        let mut rng = StdRng::seed_from_u64(2);
        let schedule = block_schedule(&DEFAULT_CLEAN_REWARDS[3], 400, 2.0, &mut rng);
        let mean_alien_3 =
            schedule.iter().map(|trial| trial[3] as f64).sum::<f64>() / schedule.len() as f64;
        assert!((mean_alien_3 - 11.0).abs() < 0.5, "{mean_alien_3}");
        assert!(schedule.iter().flatten().all(|reward| *reward >= 0));
    }

    #[test]
    fn practice_outcomes_have_two_entries() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(alien_practice_outcomes(0.0, &mut rng), vec![2, 7]);
    }
}
