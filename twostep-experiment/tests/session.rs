use rand::SeedableRng;
use rand::rngs::StdRng;
use twostep_core::{Presented, RecordingPresenter, SessionPhase, Side, Stage, TrialKind, TrialState};
use twostep_experiment::{
    ActiveTrial, AlienPracticeRounds, SessionConfig, SessionEvent, SessionStateMachine,
    SessionSummary,
};
use twostep_timing::{ManualTimer, Timer};

type Machine = SessionStateMachine<ManualTimer, StdRng, RecordingPresenter>;

fn config() -> SessionConfig {
    SessionConfig {
        blocks: 2,
        trials_per_block: 8,
        forced_per_block: 3,
        forced_min_position: 2,
        practice_trials: 4,
        alien_practice: AlienPracticeRounds {
            trials_per_round: 3,
            streak_required: 3,
            max_rounds: 2,
        },
        ..SessionConfig::default()
    }
}

fn machine(config: SessionConfig, seed: u64) -> Machine {
    SessionStateMachine::new(
        config,
        ManualTimer::new(),
        StdRng::seed_from_u64(seed),
        RecordingPresenter::new(),
    )
    .unwrap()
}

fn key_for(side: Side) -> &'static str {
    match side {
        Side::Left => "arrowleft",
        Side::Right => "arrowright",
    }
}

/// Participant that obeys forced trials and otherwise always picks left.
fn step(machine: &mut Machine, events: &mut Vec<SessionEvent>) {
    if machine.is_awaiting_input() {
        let side = match machine.current.as_ref() {
            Some(ActiveTrial::TwoStep(trial)) => {
                let (stage1, stage2) = trial.forced_sides();
                let forced = if trial.state() == TrialState::AwaitStage1 { stage1 } else { stage2 };
                forced.unwrap_or(Side::Left)
            }
            _ => Side::Right,
        };
        machine.timer.advance_ms(350);
        events.extend(machine.handle_key(key_for(side)));
        return;
    }
    match machine.next_deadline_ns() {
        Some(deadline) => machine.timer.set(deadline.max(machine.timer.now())),
        None => machine.timer.advance_ms(1),
    }
    events.extend(machine.update());
}

fn run_to_end(machine: &mut Machine) -> Vec<SessionEvent> {
    let mut events = machine.begin();
    let mut guard = 0;
    while !machine.is_finished() {
        step(machine, &mut events);
        guard += 1;
        assert!(guard < 100_000, "session did not finish");
    }
    events
}

#[test]
fn session_produces_one_record_per_planned_trial() {
    let mut machine = machine(config(), 11);
    run_to_end(&mut machine);
    let summary = machine.summary();

    let practice = summary
        .records
        .iter()
        .filter(|r| r.kind == TrialKind::TwoStep && r.meta.practice)
        .count();
    let task = summary
        .records
        .iter()
        .filter(|r| r.kind == TrialKind::TwoStep && !r.meta.practice)
        .count();
    let alien = summary
        .records
        .iter()
        .filter(|r| r.kind == TrialKind::AlienPractice)
        .count();
    assert_eq!(practice, 4);
    assert_eq!(task, 16);
    assert_eq!(alien, 3);
    assert!(summary.records.iter().all(|r| !r.missing_response));
    assert!(summary.records.iter().all(|r| r.stage1_rt_ms().is_some() || r.kind == TrialKind::AlienPractice));
}

#[test]
fn forced_trials_follow_their_mandated_rocket() {
    let mut machine = machine(config(), 5);
    let plan = machine.plan.clone();
    run_to_end(&mut machine);

    let forced_records: Vec<_> = machine
        .records
        .iter()
        .filter(|r| r.forced && !r.meta.practice)
        .collect();
    assert_eq!(forced_records.len(), 6);
    for record in forced_records {
        let block = record.meta.block.unwrap();
        let trial = &plan.block(block).unwrap().trials[record.meta.trial as usize - 1];
        let wanted = trial.forced.state1_key.unwrap();
        assert_eq!(record.stage1_choice, Some(wanted));
        assert_eq!(trial.forced.alien_index, None);
    }
}

#[test]
fn stage_two_layout_shows_the_destination_aliens() {
    let mut machine = machine(config(), 8);
    run_to_end(&mut machine);

    for record in machine.records.iter().filter(|r| r.kind == TrialKind::TwoStep) {
        let destination = record.destination.unwrap();
        let ids = record.stage2_ids.unwrap();
        let mut sorted = ids;
        sorted.sort_unstable();
        assert_eq!(sorted, [2 * destination, 2 * destination + 1]);
    }
    assert!(machine.presenter.layouts().any(|(stage, _)| stage == Stage::Two));
}

#[test]
fn identical_seeds_give_identical_sessions() {
    let mut a = machine(config(), 99);
    let mut b = machine(config(), 99);
    run_to_end(&mut a);
    run_to_end(&mut b);
    assert_eq!(a.summary(), b.summary());
}

#[test]
fn gem_counter_follows_the_configured_visibility() {
    let mut machine = machine(
        SessionConfig {
            show_gem_counter: true,
            ..config()
        },
        3,
    );
    run_to_end(&mut machine);
    assert!(machine.presenter.count(|call| matches!(call, Presented::Counter(_, true))) > 0);
    assert_eq!(machine.presenter.count(|call| matches!(call, Presented::Counter(_, false))), 0);
}

#[test]
fn silent_participant_aborts_after_threshold() {
    let mut machine = machine(
        SessionConfig {
            missed_threshold: 2,
            choice_duration_ms: Some(1_000),
            ..config()
        },
        21,
    );
    let mut events = machine.begin();
    while !machine.current_phase().is_task() {
        step(&mut machine, &mut events);
    }
    while !machine.is_finished() {
        let deadline = machine.next_deadline_ns().unwrap();
        machine.timer.set(deadline);
        events.extend(machine.update());
    }

    let summary = machine.summary();
    assert!(summary.aborted);
    assert_eq!(summary.missed, 2);
    assert_eq!(summary.phase, SessionPhase::Debrief);
    assert!(events.contains(&SessionEvent::Aborted { missed: 2 }));
    let warnings = machine
        .presenter
        .count(|call| matches!(call, Presented::MissedWarning(text) if text.contains("reject")));
    assert_eq!(warnings, 2);
}

#[test]
fn summary_serializes_to_json() {
    let mut machine = machine(config(), 2);
    run_to_end(&mut machine);
    let summary = machine.summary();
    let json = serde_json::to_string(&summary).unwrap();
    let back: SessionSummary = serde_json::from_str(&json).unwrap();
    assert_eq!(back, summary);
}
