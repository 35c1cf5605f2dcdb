use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result, bail};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};
use twostep_experiment::{SessionConfig, SessionEvent, SessionStateMachine, SessionSummary};
use twostep_timing::Timer;

use crate::Args;
use crate::participant::{Participant, Plan};
use crate::presenter::ConsolePresenter;

pub struct App<T: Timer> {
    session: SessionStateMachine<T, StdRng, ConsolePresenter>,
    participant: Participant,
    plan: Option<Plan>,
}

impl<T: Timer> App<T> {
    pub fn new(args: &Args, timer: T) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => SessionConfig::from_path(path)
                .with_context(|| format!("loading session config {}", path.display()))?,
            None => SessionConfig::default(),
        };
        let seed = args
            .seed
            .or(config.seed)
            .unwrap_or_else(|| rand::rng().random());
        config.seed = Some(seed);
        info!(seed, blocks = config.blocks, trials = config.trials_per_block, "session configured");

        let participant = Participant::new(args.miss_rate, StdRng::seed_from_u64(seed.rotate_left(17)))?;
        let session = SessionStateMachine::new(
            config,
            timer,
            StdRng::seed_from_u64(seed),
            ConsolePresenter::default(),
        )?;

        Ok(Self {
            session,
            participant,
            plan: None,
        })
    }

    pub fn run(mut self) -> Result<SessionSummary> {
        info!(
            platform = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            "two-step task starting"
        );
        let events = self.session.begin();
        self.observe(events);

        while !self.session.is_finished() {
            self.step()?;
        }

        let summary = self.session.summary();
        info!(
            total = summary.session_total,
            missed = summary.missed,
            aborted = summary.aborted,
            warnings = self.session.presenter.warnings,
            "session complete"
        );
        Ok(summary)
    }

    fn step(&mut self) -> Result<()> {
        let now_ns = self.session.timer.now();
        if self.session.is_awaiting_input() {
            if self.plan.is_none() {
                let can_time_out = self.session.next_deadline_ns().is_some();
                let trial = self
                    .session
                    .current
                    .as_ref()
                    .context("awaiting input with no trial on screen")?;
                self.plan = Some(self.participant.plan(trial, now_ns, can_time_out));
            }
        } else {
            self.plan = None;
        }

        let press_at = self.plan.filter(|plan| plan.side.is_some()).map(|plan| plan.at_ns);
        let wake_ns = match (press_at, self.session.next_deadline_ns()) {
            (Some(press), Some(deadline)) => press.min(deadline),
            (Some(press), None) => press,
            (None, Some(deadline)) => deadline,
            (None, None) => bail!("session stalled in {:?}", self.session.current_phase()),
        };
        self.session.timer.sleep_until(wake_ns);

        let now_ns = self.session.timer.now();
        let events = match self.plan.and_then(|plan| plan.press_due(now_ns)) {
            Some(side) => {
                self.plan = None;
                let key = self.session.config.valid_responses[side.index()].clone();
                debug!(key = %key, "key pressed");
                self.session.handle_key(&key)
            }
            None => self.session.update(),
        };
        self.observe(events);
        Ok(())
    }

    fn observe(&mut self, events: Vec<SessionEvent>) {
        for event in events {
            match event {
                SessionEvent::PhaseStarted(phase) => {
                    self.participant.forget();
                    info!(?phase, "phase started");
                }
                SessionEvent::TrialStarted { phase, meta } => {
                    debug!(?phase, trial = meta.trial, block = ?meta.block, "trial started");
                }
                SessionEvent::TrialFinished { missing, outcome, .. } => {
                    if let Some(record) = self.session.records.last() {
                        self.participant.learn(record);
                    }
                    debug!(missing, ?outcome, "trial finished");
                }
                SessionEvent::Missed { missed } => warn!(missed, "missed trial will be repeated"),
                SessionEvent::AlienPracticeRound { round, streak } => {
                    info!(round, streak, "alien practice round")
                }
                SessionEvent::BlockFinished { block, earned } => {
                    self.participant.forget();
                    info!(block, earned, "block finished");
                }
                SessionEvent::Finished { total } => info!(total, "all blocks done"),
                SessionEvent::Aborted { missed } => warn!(missed, "session ended early"),
            }
        }
    }
}

pub fn write_summary(path: &Path, summary: &SessionSummary) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), summary)
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), records = summary.records.len(), "results saved");
    Ok(())
}
