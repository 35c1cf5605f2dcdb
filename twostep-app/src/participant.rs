use std::collections::HashMap;
use std::ops::Range;

use anyhow::{Result, bail};
use rand::Rng;
use rand::rngs::StdRng;
use twostep_core::{DisplayMapping, Side, TrialRecord, TrialState};
use twostep_experiment::ActiveTrial;
use twostep_timing::NANOS_PER_MILLI;

const LEARNING_RATE: f64 = 0.3;
const EXPLORE: f64 = 0.1;
const RT_MS: Range<u64> = 350..1_200;

/// Reply planned for the choice on screen. `side: None` lets it time out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plan {
    pub at_ns: u64,
    pub side: Option<Side>,
}

impl Plan {
    pub fn press_due(&self, now_ns: u64) -> Option<Side> {
        self.side.filter(|_| now_ns >= self.at_ns)
    }
}

/// Simulated subject: obeys forced trials and learns alien values with a
/// delta rule, choosing rockets at random.
#[derive(Debug)]
pub struct Participant {
    miss_rate: f64,
    rng: StdRng,
    values: HashMap<usize, f64>,
}

impl Participant {
    pub fn new(miss_rate: f64, rng: StdRng) -> Result<Self> {
        if !(0.0..=1.0).contains(&miss_rate) {
            bail!("miss rate must lie within 0..=1, got {miss_rate}");
        }
        Ok(Self {
            miss_rate,
            rng,
            values: HashMap::new(),
        })
    }

    pub fn plan(&mut self, trial: &ActiveTrial, now_ns: u64, can_time_out: bool) -> Plan {
        let at_ns = now_ns + self.rng.random_range(RT_MS) * NANOS_PER_MILLI;
        if can_time_out && self.rng.random_bool(self.miss_rate) {
            return Plan { at_ns, side: None };
        }
        Plan {
            at_ns,
            side: Some(self.choose(trial)),
        }
    }

    fn choose(&mut self, trial: &ActiveTrial) -> Side {
        match trial {
            ActiveTrial::TwoStep(trial) => {
                let (stage1, stage2) = trial.forced_sides();
                if trial.state() == TrialState::AwaitStage1 {
                    return stage1.unwrap_or_else(|| self.random_side());
                }
                match (stage2, trial.stage2_mapping()) {
                    (Some(side), _) => side,
                    (None, Some(mapping)) => self.greedy(mapping),
                    (None, None) => self.random_side(),
                }
            }
            ActiveTrial::AlienPractice(trial) => self.greedy(trial.mapping()),
        }
    }

    fn greedy(&mut self, mapping: DisplayMapping) -> Side {
        if self.rng.random_bool(EXPLORE) {
            return self.random_side();
        }
        let left = self.value(mapping.option_at(Side::Left));
        let right = self.value(mapping.option_at(Side::Right));
        if left > right {
            Side::Left
        } else if right > left {
            Side::Right
        } else {
            self.random_side()
        }
    }

    fn value(&self, option: usize) -> f64 {
        self.values.get(&option).copied().unwrap_or(0.0)
    }

    fn random_side(&mut self) -> Side {
        if self.rng.random_bool(0.5) { Side::Left } else { Side::Right }
    }

    pub fn learn(&mut self, record: &TrialRecord) {
        if let (Some(alien), Some(outcome)) = (record.stage2_choice, record.outcome) {
            let value = self.values.entry(alien).or_insert(0.0);
            *value += LEARNING_RATE * (outcome as f64 - *value);
        }
    }

    /// New aliens (or new rewards) make old values meaningless.
    pub fn forget(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use twostep_core::{TrialKind, TrialMeta};

    #[test]
    fn rejects_out_of_range_miss_rate() {
        assert!(Participant::new(1.5, StdRng::seed_from_u64(0)).is_err());
        assert!(Participant::new(-0.1, StdRng::seed_from_u64(0)).is_err());
    }

    #[test]
    fn values_move_toward_outcomes() {
        let mut participant = Participant::new(0.0, StdRng::seed_from_u64(0)).unwrap();
        let mut record = TrialRecord::empty(TrialKind::TwoStep, TrialMeta::default(), 0);
        record.stage2_choice = Some(3);
        record.outcome = Some(10);
        participant.learn(&record);
        participant.learn(&record);
        assert!((participant.value(3) - 5.1).abs() < 1e-9);
        participant.forget();
        assert_eq!(participant.value(3), 0.0);
    }

    #[test]
    fn press_is_due_at_planned_time() {
        let plan = Plan {
            at_ns: 10,
            side: Some(Side::Left),
        };
        assert_eq!(plan.press_due(9), None);
        assert_eq!(plan.press_due(10), Some(Side::Left));
    }
}
