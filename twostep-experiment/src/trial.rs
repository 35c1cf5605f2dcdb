use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info};
use twostep_core::{
    DisplayMapping, Presenter, Side, Stage, TrialConfig, TrialKind, TrialRecord, TrialState,
};

use crate::forced::{self, ForcedPolicy};
use crate::reward;
use crate::totals::RunningTotals;
use crate::transition::{self, DESTINATIONS};
use crate::window::{Expiry, HoldKind, InputWindow, InputWindows, WindowId};

/// Rocket launch animation between the stages.
pub const LAUNCH_MS: u64 = 800;

pub const MISSED_WARNING: &str = "You did not respond within the allotted time. \
Please pay more attention on the next trial. \
Warning: If you miss too many trials, we may end the experiment early and reject your work.";

/// Inputs to a running trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrialEvent {
    KeyPressed(String),
    WindowExpired(WindowId),
    HoldElapsed(HoldKind),
    /// Ends the trial at once as a missed response.
    Abort,
}

impl From<Expiry> for TrialEvent {
    fn from(expiry: Expiry) -> Self {
        match expiry {
            Expiry::Window(id) => TrialEvent::WindowExpired(id),
            Expiry::Hold(kind) => TrialEvent::HoldElapsed(kind),
        }
    }
}

/// What handling one event did.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialStep {
    /// The trial moved on and is still running.
    Pending,
    /// A forced trial got the wrong side; the same window stays armed.
    Rejected,
    /// Not applicable in the current state.
    Ignored,
    /// Returned exactly once per trial.
    Finished(TrialRecord),
}

/// Session resources a trial borrows while handling an event.
pub struct TrialEnv<'a, R: ?Sized, P: ?Sized> {
    pub rng: &'a mut R,
    pub presenter: &'a mut P,
    pub totals: &'a mut RunningTotals,
}

impl<'a, R: Rng + ?Sized, P: Presenter + ?Sized> TrialEnv<'a, R, P> {
    pub fn new(rng: &'a mut R, presenter: &'a mut P, totals: &'a mut RunningTotals) -> Self {
        Self {
            rng,
            presenter,
            totals,
        }
    }
}

/// Subject responses of one trial. Each field is written once, in stage
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrialResponse {
    pub stage1_key: Option<usize>,
    pub stage1_choice: Option<usize>,
    pub stage1_rt_ns: Option<u64>,
    pub destination: Option<usize>,
    pub stage2_key: Option<usize>,
    pub stage2_choice: Option<usize>,
    pub stage2_rt_ns: Option<u64>,
    pub outcome: Option<i64>,
}

/// Left/right assignment of a two-option stage; identity when not
/// randomized.
pub fn shuffled_mapping<R: Rng + ?Sized>(randomize: bool, rng: &mut R) -> DisplayMapping {
    if !randomize {
        return DisplayMapping::IDENTITY;
    }
    let mut ids = DisplayMapping::IDENTITY.ids();
    ids.shuffle(rng);
    DisplayMapping::new(ids).unwrap_or_default()
}

/// One two-step trial, from layout to record.
///
/// The trial owns its config, responses, both stage-2 mappings and its
/// input windows. The host polls [`TwoStepTrial::update`] for timer expiry
/// and feeds the results, plus key presses, to
/// [`TwoStepTrial::handle_event`].
#[derive(Debug)]
pub struct TwoStepTrial {
    config: TrialConfig,
    state: TrialState,
    response: TrialResponse,
    stage1_mapping: DisplayMapping,
    /// Alien order before the planet offset; forced aliens resolve here.
    stage2_base: DisplayMapping,
    /// `stage2_base` offset to the reached planet; set on entering stage 2.
    stage2_mapping: Option<DisplayMapping>,
    forced_stage1: Option<Side>,
    forced_stage2: Option<Side>,
    windows: InputWindows,
    started_at_ns: u64,
    rejected: usize,
    /// Ended by `TrialEvent::Abort`; the record counts as missed.
    aborted: bool,
}

impl TwoStepTrial {
    pub fn start<R, P>(config: TrialConfig, now_ns: u64, env: &mut TrialEnv<'_, R, P>) -> Self
    where
        R: Rng + ?Sized,
        P: Presenter + ?Sized,
    {
        let stage1_mapping = shuffled_mapping(config.randomize_s1, env.rng);
        let stage2_base = shuffled_mapping(config.randomize_s2, env.rng);
        let policy = ForcedPolicy::new(&config.forced);
        let forced_stage1 = policy.stage1_side(&config.rocket_colors, stage1_mapping);
        let banner = policy.stage1_banner(forced_stage1);

        info!(
            trial = config.meta.trial,
            block = ?config.meta.block,
            forced = config.is_forced(),
            practice = config.is_practice(),
            "trial started"
        );
        reward::check_schedule(config.outcomes.as_deref(), 2 * DESTINATIONS);

        env.totals.observe_trial_start(&config.meta);
        env.presenter
            .update_counter(env.totals.block_total(), config.show_gem_counter);
        env.presenter.present_layout(Stage::One, &stage1_mapping);
        env.presenter.show_banner(banner.as_deref());

        let mut windows = InputWindows::new();
        windows.arm(
            Stage::One,
            &config.valid_responses_s1,
            config.stage1_timeout_ms,
            now_ns,
        );

        let mut trial = Self {
            config,
            state: TrialState::Init,
            response: TrialResponse::default(),
            stage1_mapping,
            stage2_base,
            stage2_mapping: None,
            forced_stage1,
            forced_stage2: None,
            windows,
            started_at_ns: now_ns,
            rejected: 0,
            aborted: false,
        };
        trial.enter(TrialState::AwaitStage1);
        trial
    }

    /// Timer expiries due at `now_ns`, as events for `handle_event`.
    pub fn update(&self, now_ns: u64) -> Vec<TrialEvent> {
        if self.state.is_terminal() {
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
            (TrialState::Ended, _) => TrialStep::Ignored,

            (_, TrialEvent::Abort) => {
                info!(state = ?self.state, "trial aborted");
                self.aborted = true;
                self.finish(now_ns, env.presenter)
            }

            // A key landing on or after the deadline is a timeout, whether
            // or not the host polled first.
            (TrialState::AwaitStage1 | TrialState::AwaitStage2, TrialEvent::KeyPressed(_))
                if self.windows.window_expired(now_ns) =>
            {
                self.on_timeout(now_ns, env.presenter)
            }

            (TrialState::AwaitStage1, TrialEvent::KeyPressed(key)) => {
                self.on_stage1_key(&key, now_ns, env)
            }

            (TrialState::AwaitStage2, TrialEvent::KeyPressed(key)) => {
                self.on_stage2_key(&key, now_ns, env)
            }

            (TrialState::AwaitStage1 | TrialState::AwaitStage2, TrialEvent::WindowExpired(id))
                if self.is_due(Expiry::Window(id), now_ns) =>
            {
                self.on_timeout(now_ns, env.presenter)
            }

            (TrialState::Transitioning, TrialEvent::HoldElapsed(HoldKind::Launch))
                if self.is_due(Expiry::Hold(HoldKind::Launch), now_ns) =>
            {
                self.windows.cancel_hold();
                match self.response.destination {
                    Some(destination) => {
                        self.begin_stage2(destination, now_ns, env.presenter);
                        TrialStep::Pending
                    }
                    None => TrialStep::Ignored,
                }
            }

            (TrialState::Feedback, TrialEvent::HoldElapsed(HoldKind::Feedback))
                if self.is_due(Expiry::Hold(HoldKind::Feedback), now_ns) =>
            {
                self.finish(now_ns, env.presenter)
            }

            (
                TrialState::TimedOutStage1 | TrialState::TimedOutStage2,
                TrialEvent::HoldElapsed(HoldKind::MissedWarning),
            ) if self.is_due(Expiry::Hold(HoldKind::MissedWarning), now_ns) => {
                self.finish(now_ns, env.presenter)
            }

            _ => TrialStep::Ignored,
        }
    }

    fn on_stage1_key<R, P>(
        &mut self,
        key: &str,
        now_ns: u64,
        env: &mut TrialEnv<'_, R, P>,
    ) -> TrialStep
    where
        R: Rng + ?Sized,
        P: Presenter + ?Sized,
    {
        let Some(press) = self.windows.press(key, now_ns) else {
            return TrialStep::Ignored;
        };
        if !forced::accepts(self.forced_stage1, press.side) {
            self.rejected += 1;
            debug!(pressed = ?press.side, mandated = ?self.forced_stage1, "stage-1 key rejected");
            return TrialStep::Rejected;
        }
        self.windows.cancel(press.window);

        let rocket = self.stage1_mapping.option_at(press.side);
        self.response.stage1_key = Some(press.side.index());
        self.response.stage1_choice = Some(rocket);
        self.response.stage1_rt_ns = Some(press.rt_ns);
        self.enter(TrialState::Transitioning);

        let chosen_color = self
            .config
            .rocket_colors
            .get(rocket)
            .map(String::as_str)
            .unwrap_or_default();
        let destination = transition::resolve_destination(
            chosen_color,
            &self.config.deterministic_rocket_color,
            ForcedPolicy::new(&self.config.forced).transition(),
            env.rng,
        );
        self.response.destination = Some(destination);
        debug!(rocket, destination, "transition resolved");

        if self.config.animation {
            self.windows.start_hold(HoldKind::Launch, LAUNCH_MS, now_ns);
        } else {
            self.begin_stage2(destination, now_ns, env.presenter);
        }
        TrialStep::Pending
    }

    fn begin_stage2<P: Presenter + ?Sized>(
        &mut self,
        destination: usize,
        now_ns: u64,
        presenter: &mut P,
    ) {
        let mapping = self.stage2_base.offset(2 * destination);
        self.stage2_mapping = Some(mapping);

        let policy = ForcedPolicy::new(&self.config.forced);
        self.forced_stage2 = policy.stage2_side(self.stage2_base, destination);

        presenter.present_layout(Stage::Two, &mapping);
        presenter.show_banner(policy.stage2_banner());
        if policy.shows_reward_preview() {
            presenter.preview_rewards(reward::preview(
                self.config.outcomes.as_deref(),
                mapping.ids(),
            ));
        }

        self.windows.arm(
            Stage::Two,
            &self.config.valid_responses_s2,
            self.config.stage2_timeout_ms,
            now_ns,
        );
        self.enter(TrialState::AwaitStage2);
    }

    fn on_stage2_key<R, P>(
        &mut self,
        key: &str,
        now_ns: u64,
        env: &mut TrialEnv<'_, R, P>,
    ) -> TrialStep
    where
        R: Rng + ?Sized,
        P: Presenter + ?Sized,
    {
        let Some(press) = self.windows.press(key, now_ns) else {
            return TrialStep::Ignored;
        };
        // Kept quirk: practice forced trials instruct the alien but accept
        // either side.
        if !self.config.is_practice() && !forced::accepts(self.forced_stage2, press.side) {
            self.rejected += 1;
            debug!(pressed = ?press.side, mandated = ?self.forced_stage2, "stage-2 key rejected");
            return TrialStep::Rejected;
        }
        let Some(mapping) = self.stage2_mapping else {
            return TrialStep::Ignored;
        };
        self.windows.cancel(press.window);

        let alien = mapping.option_at(press.side);
        let outcome = reward::resolve(self.config.outcomes.as_deref(), alien);
        self.response.stage2_key = Some(press.side.index());
        self.response.stage2_choice = Some(alien);
        self.response.stage2_rt_ns = Some(press.rt_ns);
        self.response.outcome = Some(outcome);
        self.enter(TrialState::Feedback);

        env.presenter.present_feedback(press.side, outcome);
        env.totals.record(outcome, self.config.is_practice());
        env.presenter
            .update_counter(env.totals.block_total(), self.config.show_gem_counter);
        self.windows
            .start_hold(HoldKind::Feedback, self.config.feedback_duration_ms, now_ns);
        TrialStep::Pending
    }

    fn on_timeout<P: Presenter + ?Sized>(&mut self, now_ns: u64, presenter: &mut P) -> TrialStep {
        self.windows.cancel_all();
        let next = if self.state == TrialState::AwaitStage1 {
            TrialState::TimedOutStage1
        } else {
            TrialState::TimedOutStage2
        };
        info!(state = ?next, "no response within the window");
        self.enter(next);
        presenter.present_missed_warning(MISSED_WARNING);
        self.windows.start_hold(
            HoldKind::MissedWarning,
            self.config.warning_duration_ms,
            now_ns,
        );
        TrialStep::Pending
    }

    fn finish<P: Presenter + ?Sized>(&mut self, now_ns: u64, presenter: &mut P) -> TrialStep {
        self.windows.cancel_all();
        self.enter(TrialState::Ended);
        presenter.clear();

        let record = self.record(now_ns);
        info!(
            trial = record.meta.trial,
            block = ?record.meta.block,
            destination = ?record.destination,
            outcome = ?record.outcome,
            missing = record.missing_response,
            "trial finished"
        );
        TrialStep::Finished(record)
    }

    fn record(&self, now_ns: u64) -> TrialRecord {
        let response = &self.response;
        TrialRecord {
            kind: TrialKind::TwoStep,
            stage1_ids: Some(self.stage1_mapping.ids()),
            stage1_key: response.stage1_key,
            stage1_choice: response.stage1_choice,
            stage1_rt_ns: response.stage1_rt_ns,
            destination: response.destination,
            stage2_ids: self.stage2_mapping.map(DisplayMapping::ids),
            stage2_key: response.stage2_key,
            stage2_choice: response.stage2_choice,
            stage2_rt_ns: response.stage2_rt_ns,
            outcome: response.outcome,
            missing_response: self.aborted
                || response.stage1_choice.is_none()
                || response.stage2_choice.is_none(),
            forced: self.config.is_forced(),
            rocket_colors: self.config.rocket_colors.to_vec(),
            planet_colors: self.config.planet_colors.clone(),
            meta: self.config.meta.clone(),
            started_ns: self.started_at_ns,
            ended_ns: now_ns,
        }
    }

    /// True only when `expiry` is the timer actually running out at `now_ns`.
    fn is_due(&self, expiry: Expiry, now_ns: u64) -> bool {
        self.windows.poll(now_ns) == Some(expiry)
    }

    fn enter(&mut self, next: TrialState) {
        debug!(from = ?self.state, to = ?next, "trial state");
        self.state = next;
    }

    pub fn state(&self) -> TrialState {
        self.state
    }

    pub fn config(&self) -> &TrialConfig {
        &self.config
    }

    pub fn response(&self) -> &TrialResponse {
        &self.response
    }

    pub fn stage1_mapping(&self) -> DisplayMapping {
        self.stage1_mapping
    }

    pub fn stage2_base(&self) -> DisplayMapping {
        self.stage2_base
    }

    pub fn stage2_mapping(&self) -> Option<DisplayMapping> {
        self.stage2_mapping
    }

    /// Enforced sides for stage 1 and stage 2.
    pub fn forced_sides(&self) -> (Option<Side>, Option<Side>) {
        (self.forced_stage1, self.forced_stage2)
    }

    pub fn active_window(&self) -> Option<&InputWindow> {
        self.windows.active()
    }

    pub fn windows(&self) -> &InputWindows {
        &self.windows
    }

    pub fn next_deadline_ns(&self) -> Option<u64> {
        self.windows.next_deadline_ns()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }
}
