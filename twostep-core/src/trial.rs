use serde::{Deserialize, Serialize};

use crate::config::TrialMeta;

/// Trial state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialState {
    Init,
    AwaitStage1,
    Transitioning,
    AwaitStage2,
    Feedback,
    TimedOutStage1,
    TimedOutStage2,
    Ended,
}

impl TrialState {
    pub fn is_timed_out(self) -> bool {
        matches!(self, Self::TimedOutStage1 | Self::TimedOutStage2)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ended)
    }

    pub fn awaits_input(self) -> bool {
        matches!(self, Self::AwaitStage1 | Self::AwaitStage2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialKind {
    TwoStep,
    AlienPractice,
}

/// Recorded result per trial, handed to the runner exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub kind: TrialKind,
    pub stage1_ids: Option<[usize; 2]>,
    pub stage1_key: Option<usize>,
    pub stage1_choice: Option<usize>,
    pub stage1_rt_ns: Option<u64>,
    pub destination: Option<usize>,
    pub stage2_ids: Option<[usize; 2]>,
    pub stage2_key: Option<usize>,
    pub stage2_choice: Option<usize>,
    pub stage2_rt_ns: Option<u64>,
    pub outcome: Option<i64>,
    pub missing_response: bool,
    pub forced: bool,
    #[serde(default)]
    pub rocket_colors: Vec<String>,
    #[serde(default)]
    pub planet_colors: Vec<String>,
    pub meta: TrialMeta,
    pub started_ns: u64,
    pub ended_ns: u64,
}

impl TrialRecord {
    pub fn empty(kind: TrialKind, meta: TrialMeta, started_ns: u64) -> Self {
        Self {
            kind,
            stage1_ids: None,
            stage1_key: None,
            stage1_choice: None,
            stage1_rt_ns: None,
            destination: None,
            stage2_ids: None,
            stage2_key: None,
            stage2_choice: None,
            stage2_rt_ns: None,
            outcome: None,
            missing_response: true,
            forced: false,
            rocket_colors: Vec::new(),
            planet_colors: Vec::new(),
            meta,
            started_ns,
            ended_ns: started_ns,
        }
    }

    pub fn stage1_rt_ms(&self) -> Option<f64> {
        self.stage1_rt_ns.map(|ns| ns as f64 / 1_000_000.0)
    }

    pub fn stage2_rt_ms(&self) -> Option<f64> {
        self.stage2_rt_ns.map(|ns| ns as f64 / 1_000_000.0)
    }
}
