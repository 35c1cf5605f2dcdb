//! Stage-2-only trial used while teaching the aliens.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use twostep_core::{
    AlienPracticeConfig, DisplayMapping, Presenter, Side, Stage, TrialKind, TrialRecord,
};

use crate::reward;
use crate::trial::{TrialEnv, TrialEvent, TrialStep, shuffled_mapping};
use crate::window::{Expiry, HoldKind, InputWindows};

pub const PRACTICE_MISSED_WARNING: &str =
    "You did not respond within the allotted time. Please pay more attention on the next trial.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticeState {
    Init,
    /// Stimuli hidden before the choice.
    Iti,
    AwaitChoice,
    Feedback,
    TimedOut,
    Ended,
}

#[derive(Debug)]
pub struct AlienPracticeTrial {
    config: AlienPracticeConfig,
    state: PracticeState,
    mapping: DisplayMapping,
    windows: InputWindows,
    key: Option<usize>,
    choice: Option<usize>,
    rt_ns: Option<u64>,
    outcome: Option<i64>,
    started_at_ns: u64,
    aborted: bool,
}

impl AlienPracticeTrial {
    pub fn start<R, P>(config: AlienPracticeConfig, now_ns: u64, env: &mut TrialEnv<'_, R, P>) -> Self
    where
        R: Rng + ?Sized,
        P: Presenter + ?Sized,
    {
        let mapping = shuffled_mapping(config.randomize, env.rng);
        reward::check_schedule(config.outcomes.as_deref(), 2);
        env.presenter.clear();

        let mut windows = InputWindows::new();
        windows.start_hold(HoldKind::InterTrial, config.iti_duration_ms, now_ns);
        info!(trial = config.meta.trial, "alien practice trial started");

        let mut trial = Self {
            config,
            state: PracticeState::Init,
            mapping,
            windows,
            key: None,
            choice: None,
            rt_ns: None,
            outcome: None,
            started_at_ns: now_ns,
            aborted: false,
        };
        trial.enter(PracticeState::Iti);
        trial
    }

    pub fn update(&self, now_ns: u64) -> Vec<TrialEvent> {
        if self.state == PracticeState::Ended {
            return Vec::new();
        }
        self.windows
            .poll(now_ns)
            .map(TrialEvent::from)
            .into_iter()
            .collect()
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
        match (self.state, event) {
            (PracticeState::Ended, _) => TrialStep::Ignored,
            (_, TrialEvent::Abort) => {
                self.aborted = true;
                self.finish(now_ns, env.presenter)
            }

            (PracticeState::Iti, TrialEvent::HoldElapsed(HoldKind::InterTrial))
                if self.is_due(Expiry::Hold(HoldKind::InterTrial), now_ns) =>
            {
                self.windows.cancel_hold();
                env.presenter.present_layout(Stage::Two, &self.mapping);
                self.windows.arm(
                    Stage::Two,
                    &self.config.valid_responses,
                    self.config.choice_duration_ms,
                    now_ns,
                );
                self.enter(PracticeState::AwaitChoice);
                TrialStep::Pending
            }

            (PracticeState::AwaitChoice, TrialEvent::KeyPressed(_))
                if self.windows.window_expired(now_ns) =>
            {
                self.on_timeout(now_ns, env.presenter)
            }

            (PracticeState::AwaitChoice, TrialEvent::KeyPressed(key)) => {
                let Some(press) = self.windows.press(&key, now_ns) else {
                    return TrialStep::Ignored;
                };
                self.windows.cancel(press.window);
                self.choose(press.side, press.rt_ns, now_ns, env.presenter);
                TrialStep::Pending
            }

            (PracticeState::AwaitChoice, TrialEvent::WindowExpired(id))
                if self.is_due(Expiry::Window(id), now_ns) =>
            {
                self.on_timeout(now_ns, env.presenter)
            }

            (PracticeState::Feedback, TrialEvent::HoldElapsed(HoldKind::Feedback))
                if self.is_due(Expiry::Hold(HoldKind::Feedback), now_ns) =>
            {
                self.finish(now_ns, env.presenter)
            }

            (PracticeState::TimedOut, TrialEvent::HoldElapsed(HoldKind::MissedWarning))
                if self.is_due(Expiry::Hold(HoldKind::MissedWarning), now_ns) =>
            {
                self.finish(now_ns, env.presenter)
            }

            _ => TrialStep::Ignored,
        }
    }

    fn on_timeout<P: Presenter + ?Sized>(&mut self, now_ns: u64, presenter: &mut P) -> TrialStep {
        self.windows.cancel_all();
        self.enter(PracticeState::TimedOut);
        presenter.present_missed_warning(PRACTICE_MISSED_WARNING);
        self.windows.start_hold(
            HoldKind::MissedWarning,
            self.config.warning_duration_ms,
            now_ns,
        );
        TrialStep::Pending
    }

    fn choose<P: Presenter + ?Sized>(&mut self, side: Side, rt_ns: u64, now_ns: u64, presenter: &mut P) {
        let alien = self.mapping.option_at(side);
        let outcome = reward::resolve(self.config.outcomes.as_deref(), alien);
        self.key = Some(side.index());
        self.choice = Some(alien);
        self.rt_ns = Some(rt_ns);
        self.outcome = Some(outcome);
        self.enter(PracticeState::Feedback);
        presenter.present_feedback(side, outcome);
        self.windows
            .start_hold(HoldKind::Feedback, self.config.feedback_duration_ms, now_ns);
    }

    fn finish<P: Presenter + ?Sized>(&mut self, now_ns: u64, presenter: &mut P) -> TrialStep {
        self.windows.cancel_all();
        self.enter(PracticeState::Ended);
        presenter.clear();

        let mut record = TrialRecord::empty(
            TrialKind::AlienPractice,
            self.config.meta.clone(),
            self.started_at_ns,
        );
        record.stage2_ids = Some(self.mapping.ids());
        record.stage2_key = self.key;
        record.stage2_choice = self.choice;
        record.stage2_rt_ns = self.rt_ns;
        record.outcome = self.outcome;
        record.missing_response = self.aborted || self.choice.is_none();
        record.planet_colors = vec![self.config.planet_color.clone()];
        record.ended_ns = now_ns;
        info!(choice = ?record.stage2_choice, outcome = ?record.outcome, "alien practice trial finished");
        TrialStep::Finished(record)
    }

    fn is_due(&self, expiry: Expiry, now_ns: u64) -> bool {
        self.windows.poll(now_ns) == Some(expiry)
    }

    fn enter(&mut self, next: PracticeState) {
        debug!(from = ?self.state, to = ?next, "practice state");
        self.state = next;
    }

    pub fn state(&self) -> PracticeState {
        self.state
    }

    pub fn mapping(&self) -> DisplayMapping {
        self.mapping
    }

    pub fn next_deadline_ns(&self) -> Option<u64> {
        self.windows.next_deadline_ns()
    }

    pub fn is_finished(&self) -> bool {
        self.state == PracticeState::Ended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::totals::RunningTotals;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use twostep_core::{Presented, RecordingPresenter};
    use twostep_timing::NANOS_PER_MILLI;

    const MS: u64 = NANOS_PER_MILLI;

    fn config() -> AlienPracticeConfig {
        AlienPracticeConfig {
            aliens: vec!["P1-green".to_string(), "P2-green".to_string()],
            outcomes: Some(vec![2, 7]),
            randomize: false,
            choice_duration_ms: Some(10_000),
            feedback_duration_ms: 1_200,
            ..AlienPracticeConfig::default()
        }
    }

    fn drive(
        trial: &mut AlienPracticeTrial,
        rng: &mut StdRng,
        presenter: &mut RecordingPresenter,
        totals: &mut RunningTotals,
        event: TrialEvent,
        now: u64,
    ) -> TrialStep {
        let mut env = TrialEnv::new(rng, presenter, totals);
        trial.handle_event(event, now, &mut env)
    }

    #[test]
    fn keys_during_iti_are_ignored_then_choice_is_scored() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut presenter = RecordingPresenter::new();
        let mut totals = RunningTotals::new();
        let mut trial = {
            let mut env = TrialEnv::new(&mut rng, &mut presenter, &mut totals);
            AlienPracticeTrial::start(config(), 0, &mut env)
        };
        assert_eq!(trial.state(), PracticeState::Iti);
        let key = TrialEvent::KeyPressed("arrowright".to_string());
        assert_eq!(
            drive(&mut trial, &mut rng, &mut presenter, &mut totals, key.clone(), 500 * MS),
            TrialStep::Ignored
        );

        let events = trial.update(1_000 * MS);
        assert_eq!(events, vec![TrialEvent::HoldElapsed(HoldKind::InterTrial)]);
        for event in events {
            drive(&mut trial, &mut rng, &mut presenter, &mut totals, event, 1_000 * MS);
        }
        assert_eq!(trial.state(), PracticeState::AwaitChoice);

        drive(&mut trial, &mut rng, &mut presenter, &mut totals, key, 1_300 * MS);
        assert!(presenter.calls.contains(&Presented::Feedback(Side::Right, 7)));

        let step = drive(
            &mut trial,
            &mut rng,
            &mut presenter,
            &mut totals,
            TrialEvent::HoldElapsed(HoldKind::Feedback),
            2_500 * MS,
        );
        let TrialStep::Finished(record) = step else {
            panic!("expected finished trial");
        };
        assert_eq!(record.kind, TrialKind::AlienPractice);
        assert_eq!(record.stage2_choice, Some(1));
        assert_eq!(record.stage2_rt_ns, Some(300 * MS));
        assert_eq!(record.outcome, Some(7));
        assert_eq!(record.stage1_choice, None);
        assert!(!record.missing_response);
        // Practice choices never touch the counters.
        assert_eq!(totals, RunningTotals::new());
    }

    #[test]
    fn choice_window_times_out_after_iti() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut presenter = RecordingPresenter::new();
        let mut totals = RunningTotals::new();
        let mut trial = {
            let mut env = TrialEnv::new(&mut rng, &mut presenter, &mut totals);
            AlienPracticeTrial::start(config(), 0, &mut env)
        };
        for now in [1_000 * MS, 11_000 * MS] {
            for event in trial.update(now) {
                drive(&mut trial, &mut rng, &mut presenter, &mut totals, event, now);
            }
        }
        assert_eq!(trial.state(), PracticeState::TimedOut);
        let mut finished = None;
        for event in trial.update(16_000 * MS) {
            finished = Some(drive(&mut trial, &mut rng, &mut presenter, &mut totals, event, 16_000 * MS));
        }
        let Some(TrialStep::Finished(record)) = finished else {
            panic!("expected finished trial");
        };
        assert!(record.missing_response);
        assert_eq!(record.outcome, None);
        assert!(trial.update(u64::MAX).is_empty());
    }
    fn armed_trial(
        rng: &mut StdRng,
        presenter: &mut RecordingPresenter,
        totals: &mut RunningTotals,
    ) -> AlienPracticeTrial {
        let mut trial = {
            let mut env = TrialEnv::new(&mut *rng, &mut *presenter, &mut *totals);
            AlienPracticeTrial::start(config(), 0, &mut env)
        };
        for event in trial.update(1_000 * MS) {
            drive(&mut trial, rng, presenter, totals, event, 1_000 * MS);
        }
        assert_eq!(trial.state(), PracticeState::AwaitChoice);
        trial
    }

    #[test]
    fn key_after_the_deadline_times_out_without_a_poll() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut presenter = RecordingPresenter::new();
        let mut totals = RunningTotals::new();
        let mut trial = armed_trial(&mut rng, &mut presenter, &mut totals);

        // Window opened at 1 s with a 10 s limit.
        let key = TrialEvent::KeyPressed("arrowright".to_string());
        let step = drive(&mut trial, &mut rng, &mut presenter, &mut totals, key, 11_000 * MS);
        assert_eq!(step, TrialStep::Pending);
        assert_eq!(trial.state(), PracticeState::TimedOut);
        assert_eq!(presenter.count(|call| matches!(call, Presented::Feedback(..))), 0);
    }

    #[test]
    fn abort_during_feedback_is_recorded_as_missing() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut presenter = RecordingPresenter::new();
        let mut totals = RunningTotals::new();
        let mut trial = armed_trial(&mut rng, &mut presenter, &mut totals);

        let key = TrialEvent::KeyPressed("arrowleft".to_string());
        drive(&mut trial, &mut rng, &mut presenter, &mut totals, key, 1_400 * MS);
        assert_eq!(trial.state(), PracticeState::Feedback);

        let step = drive(&mut trial, &mut rng, &mut presenter, &mut totals, TrialEvent::Abort, 1_500 * MS);
        let TrialStep::Finished(record) = step else {
            panic!("expected finished trial");
        };
        assert_eq!(record.stage2_choice, Some(0));
        assert!(record.missing_response);
    }
}
