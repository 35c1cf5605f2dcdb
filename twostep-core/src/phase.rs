use serde::{Deserialize, Serialize};

/// Session phases, in the order they run.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Welcome,
    /// Stage-2-only trials with two aliens on one planet.
    AlienPractice,
    /// Full two-step trials flagged as practice.
    TwoStepPractice,
    Task,
    Debrief,
}

impl SessionPhase {
    pub fn allows_input(&self) -> bool {
        !matches!(self, Self::Debrief)
    }

    pub fn runs_trials(&self) -> bool {
        matches!(
            self,
            Self::AlienPractice | Self::TwoStepPractice | Self::Task
        )
    }

    pub fn next(&self) -> Option<Self> {
        use SessionPhase::*;
        Some(match self {
            Welcome => AlienPractice,
            AlienPractice => TwoStepPractice,
            TwoStepPractice => Task,
            Task => Debrief,
            Debrief => return None,
        })
    }

    pub fn is_practice(&self) -> bool {
        matches!(self, Self::AlienPractice | Self::TwoStepPractice)
    }

    pub fn is_task(&self) -> bool {
        matches!(self, Self::Task)
    }

    pub fn is_welcome(&self) -> bool {
        matches!(self, Self::Welcome)
    }
}
