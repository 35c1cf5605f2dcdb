use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use twostep_core::{Presenter, SessionPhase, TrialKind, TrialMeta, TrialRecord};
use twostep_timing::Timer;

use crate::config::SessionConfig;
use crate::design::SessionPlan;
use crate::error::ConfigError;
use crate::practice::AlienPracticeTrial;
use crate::totals::RunningTotals;
use crate::trial::{TrialEnv, TrialEvent, TrialStep, TwoStepTrial};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PhaseStarted(SessionPhase),
    TrialStarted {
        phase: SessionPhase,
        meta: TrialMeta,
    },
    TrialFinished {
        phase: SessionPhase,
        kind: TrialKind,
        meta: TrialMeta,
        missing: bool,
        outcome: Option<i64>,
    },
    /// A task trial went unanswered and will be repeated.
    Missed { missed: usize },
    AlienPracticeRound { round: usize, streak: usize },
    BlockFinished { block: u32, earned: i64 },
    Finished { total: i64 },
    Aborted { missed: usize },
}

/// The trial currently on screen.
#[derive(Debug)]
pub enum ActiveTrial {
    TwoStep(TwoStepTrial),
    AlienPractice(AlienPracticeTrial),
}

impl ActiveTrial {
    pub fn update(&self, now_ns: u64) -> Vec<TrialEvent> {
        match self {
            ActiveTrial::TwoStep(trial) => trial.update(now_ns),
            ActiveTrial::AlienPractice(trial) => trial.update(now_ns),
        }
    }

    pub fn handle_event<R, P>(
        &mut self,
        event: TrialEvent,
        now_ns: u64,
        env: &mut TrialEnv<'_, R, P>,
    ) -> TrialStep
    where
        R: Rng + ?Sized,
        P: Presenter + ?Sized,
    {
        match self {
            ActiveTrial::TwoStep(trial) => trial.handle_event(event, now_ns, env),
            ActiveTrial::AlienPractice(trial) => trial.handle_event(event, now_ns, env),
        }
    }

    pub fn next_deadline_ns(&self) -> Option<u64> {
        match self {
            ActiveTrial::TwoStep(trial) => trial.next_deadline_ns(),
            ActiveTrial::AlienPractice(trial) => trial.next_deadline_ns(),
        }
    }

    pub fn as_two_step(&self) -> Option<&TwoStepTrial> {
        match self {
            ActiveTrial::TwoStep(trial) => Some(trial),
            ActiveTrial::AlienPractice(_) => None,
        }
    }
}

/// What the session produced, ready to be written out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub records: Vec<TrialRecord>,
    pub session_total: i64,
    pub missed: usize,
    pub aborted: bool,
    pub phase: SessionPhase,
    pub alien_practice_rounds: usize,
}

#[derive(Debug, Clone, Default)]
struct Progress {
    /// Index into the phase's trial list, or into the current block.
    trial_index: usize,
    block_index: usize,
    alien_trials: u32,
    round: usize,
    round_trial: usize,
    streak: usize,
}

/// Runs one participant through every phase of the session.
///
/// Like the trials it hosts, the machine is polled: `update` delivers due
/// timers, `handle_key` delivers input, and both return what happened.
pub struct SessionStateMachine<T, R, P>
where
    T: Timer,
    R: Rng,
    P: Presenter,
{
    pub phase: SessionPhase,
    pub timer: T,
    pub rng: R,
    pub presenter: P,
    pub config: SessionConfig,
    pub plan: SessionPlan,
    pub current: Option<ActiveTrial>,
    pub totals: RunningTotals,
    pub records: Vec<TrialRecord>,
    progress: Progress,
    missed: usize,
    aborted: bool,
}

impl<T, R, P> SessionStateMachine<T, R, P>
where
    T: Timer,
    R: Rng,
    P: Presenter,
{
    pub fn new(config: SessionConfig, timer: T, mut rng: R, presenter: P) -> Result<Self, ConfigError> {
        let plan = SessionPlan::design(&config, &mut rng)?;
        Ok(Self {
            phase: SessionPhase::default(),
            timer,
            rng,
            presenter,
            config,
            plan,
            current: None,
            totals: RunningTotals::new(),
            records: Vec::new(),
            progress: Progress::default(),
            missed: 0,
            aborted: false,
        })
    }

    /// Leaves the welcome screen and starts the first trial.
    pub fn begin(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.phase.is_welcome() {
            info!("session started");
            self.advance_phase(&mut events);
        }
        events
    }

    pub fn handle_key(&mut self, key: &str) -> Vec<SessionEvent> {
        if self.phase.is_welcome() {
            return self.begin();
        }
        let mut events = Vec::new();
        if self.phase.allows_input() {
            self.dispatch(TrialEvent::KeyPressed(key.to_string()), &mut events);
        }
        events
    }

    pub fn update(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if !self.phase.runs_trials() {
            return events;
        }
        let now_ns = self.timer.now();
        let due = self
            .current
            .as_ref()
            .map(|trial| trial.update(now_ns))
            .unwrap_or_default();
        for event in due {
            self.dispatch(event, &mut events);
        }
        events
    }

    /// Ends the current trial as missed; the session carries on as it
    /// would after a timeout.
    pub fn abort_trial(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        self.dispatch(TrialEvent::Abort, &mut events);
        events
    }

    /// Ends the current trial and the whole session.
    pub fn abort(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.is_finished() {
            return events;
        }
        let now_ns = self.timer.now();
        if let Some(mut trial) = self.current.take() {
            let mut env = TrialEnv::new(&mut self.rng, &mut self.presenter, &mut self.totals);
            if let TrialStep::Finished(record) = trial.handle_event(TrialEvent::Abort, now_ns, &mut env) {
                self.store(record, &mut events);
            }
        }
        self.abort_session(&mut events);
        events
    }

    fn dispatch(&mut self, event: TrialEvent, events: &mut Vec<SessionEvent>) {
        let now_ns = self.timer.now();
        let Some(trial) = self.current.as_mut() else {
            return;
        };
        let mut env = TrialEnv::new(&mut self.rng, &mut self.presenter, &mut self.totals);
        if let TrialStep::Finished(record) = trial.handle_event(event, now_ns, &mut env) {
            self.current = None;
            self.on_trial_finished(record, events);
        }
    }

    fn store(&mut self, record: TrialRecord, events: &mut Vec<SessionEvent>) {
        events.push(SessionEvent::TrialFinished {
            phase: self.phase,
            kind: record.kind,
            meta: record.meta.clone(),
            missing: record.missing_response,
            outcome: record.outcome,
        });
        self.records.push(record);
    }

    fn on_trial_finished(&mut self, record: TrialRecord, events: &mut Vec<SessionEvent>) {
        let missing = record.missing_response;
        let alien = record.stage2_choice;
        self.store(record, events);

        match self.phase {
            SessionPhase::AlienPractice => {
                // Alien 1 is the generous one.
                if alien == Some(1) {
                    self.progress.streak += 1;
                } else {
                    self.progress.streak = 0;
                }
                self.progress.round_trial += 1;
                let rounds = &self.config.alien_practice;
                if self.progress.round_trial >= rounds.trials_per_round {
                    self.progress.round += 1;
                    self.progress.round_trial = 0;
                    info!(
                        round = self.progress.round,
                        streak = self.progress.streak,
                        "alien practice round finished"
                    );
                    events.push(SessionEvent::AlienPracticeRound {
                        round: self.progress.round,
                        streak: self.progress.streak,
                    });
                    if self.progress.streak >= rounds.streak_required
                        || self.progress.round >= rounds.max_rounds
                    {
                        self.advance_phase(events);
                        return;
                    }
                }
                self.start_trial(events);
            }
            SessionPhase::TwoStepPractice => {
                self.progress.trial_index += 1;
                if self.progress.trial_index >= self.plan.practice.len() {
                    self.advance_phase(events);
                } else {
                    self.start_trial(events);
                }
            }
            SessionPhase::Task => {
                if missing {
                    self.missed += 1;
                    warn!(
                        missed = self.missed,
                        threshold = self.config.missed_threshold,
                        "task trial missed"
                    );
                    events.push(SessionEvent::Missed {
                        missed: self.missed,
                    });
                    if self.missed >= self.config.missed_threshold {
                        self.abort_session(events);
                    } else {
                        self.start_trial(events);
                    }
                    return;
                }

                self.progress.trial_index += 1;
                let block_len = self
                    .plan
                    .blocks
                    .get(self.progress.block_index)
                    .map_or(0, |block| block.trials.len());
                if self.progress.trial_index >= block_len {
                    let block = self.progress.block_index as u32 + 1;
                    let earned = self.totals.block_total();
                    info!(block, earned, total = self.totals.session_total(), "block finished");
                    events.push(SessionEvent::BlockFinished { block, earned });
                    self.progress.block_index += 1;
                    self.progress.trial_index = 0;
                    if self.progress.block_index >= self.plan.blocks.len() {
                        self.advance_phase(events);
                        return;
                    }
                }
                self.start_trial(events);
            }
            SessionPhase::Welcome | SessionPhase::Debrief => {}
        }
    }

    fn advance_phase(&mut self, events: &mut Vec<SessionEvent>) {
        while let Some(next) = self.phase.next() {
            self.phase = next;
            self.progress.trial_index = 0;
            info!(phase = ?next, "phase started");
            events.push(SessionEvent::PhaseStarted(next));

            match next {
                SessionPhase::TwoStepPractice => {
                    self.totals.begin_block();
                    if self.plan.practice.is_empty() {
                        continue;
                    }
                }
                SessionPhase::Task if self.plan.blocks.is_empty() => continue,
                SessionPhase::Debrief => {
                    let total = self.totals.session_total();
                    info!(total, missed = self.missed, "session finished");
                    events.push(SessionEvent::Finished { total });
                    return;
                }
                _ => {}
            }
            self.start_trial(events);
            return;
        }
    }

    fn start_trial(&mut self, events: &mut Vec<SessionEvent>) {
        let now_ns = self.timer.now();
        let mut env = TrialEnv::new(&mut self.rng, &mut self.presenter, &mut self.totals);
        let trial = match self.phase {
            SessionPhase::AlienPractice => {
                self.progress.alien_trials += 1;
                let config = self
                    .plan
                    .alien_practice_trial(self.progress.alien_trials, &mut *env.rng);
                ActiveTrial::AlienPractice(AlienPracticeTrial::start(config, now_ns, &mut env))
            }
            SessionPhase::TwoStepPractice => {
                let Some(config) = self.plan.practice.get(self.progress.trial_index).cloned() else {
                    return;
                };
                ActiveTrial::TwoStep(TwoStepTrial::start(config, now_ns, &mut env))
            }
            SessionPhase::Task => {
                let Some(config) = self
                    .plan
                    .blocks
                    .get(self.progress.block_index)
                    .and_then(|block| block.trials.get(self.progress.trial_index))
                    .cloned()
                else {
                    return;
                };
                ActiveTrial::TwoStep(TwoStepTrial::start(config, now_ns, &mut env))
            }
            SessionPhase::Welcome | SessionPhase::Debrief => return,
        };

        let meta = match &trial {
            ActiveTrial::TwoStep(trial) => trial.config().meta.clone(),
            ActiveTrial::AlienPractice(_) => TrialMeta {
                trial: self.progress.alien_trials,
                block: None,
                practice: true,
            },
        };
        events.push(SessionEvent::TrialStarted {
            phase: self.phase,
            meta,
        });
        self.current = Some(trial);
    }

    fn abort_session(&mut self, events: &mut Vec<SessionEvent>) {
        self.current = None;
        self.aborted = true;
        self.phase = SessionPhase::Debrief;
        warn!(missed = self.missed, "session aborted");
        events.push(SessionEvent::Aborted {
            missed: self.missed,
        });
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            records: self.records.clone(),
            session_total: self.totals.session_total(),
            missed: self.missed,
            aborted: self.aborted,
            phase: self.phase,
            alien_practice_rounds: self.progress.round,
        }
    }

    /// Earliest time `update` has something to deliver.
    pub fn next_deadline_ns(&self) -> Option<u64> {
        self.current.as_ref().and_then(ActiveTrial::next_deadline_ns)
    }

    pub fn current_phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_awaiting_input(&self) -> bool {
        self.phase.is_welcome()
            || self.current.as_ref().is_some_and(|trial| match trial {
                ActiveTrial::TwoStep(trial) => trial.state().awaits_input(),
                ActiveTrial::AlienPractice(trial) => {
                    trial.state() == crate::practice::PracticeState::AwaitChoice
                }
            })
    }

    pub fn is_finished(&self) -> bool {
        self.phase == SessionPhase::Debrief
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn missed(&self) -> usize {
        self.missed
    }

    /// Position within the running phase: (1-based trial, trials in list).
    pub fn trial_progress(&self) -> Option<(usize, usize)> {
        match self.phase {
            SessionPhase::TwoStepPractice => {
                Some((self.progress.trial_index + 1, self.plan.practice.len()))
            }
            SessionPhase::Task => self
                .plan
                .blocks
                .get(self.progress.block_index)
                .map(|block| (self.progress.trial_index + 1, block.trials.len())),
            _ => None,
        }
    }
}
