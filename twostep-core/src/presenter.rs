use crate::layout::{DisplayMapping, Side, Stage};

/// Display side effects a trial asks of its host.
///
/// The trial never draws anything itself; it only tells the host what the
/// subject should be seeing. Implementations decide how (terminal, window,
/// log file).
pub trait Presenter {
    /// Shows the options of `stage` with `mapping[side]` on each side.
    fn present_layout(&mut self, stage: Stage, mapping: &DisplayMapping);

    /// `None` hides the instruction banner.
    fn show_banner(&mut self, text: Option<&str>);

    /// Reveals upcoming rewards per side before the stage-2 choice.
    fn preview_rewards(&mut self, rewards: [i64; 2]);

    fn present_feedback(&mut self, side: Side, outcome: i64);

    fn present_missed_warning(&mut self, message: &str);

    fn update_counter(&mut self, block_total: i64, visible: bool);

    fn clear(&mut self);
}

/// One presentation call, as captured by [`RecordingPresenter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presented {
    Layout(Stage, DisplayMapping),
    Banner(Option<String>),
    RewardPreview([i64; 2]),
    Feedback(Side, i64),
    MissedWarning(String),
    Counter(i64, bool),
    Cleared,
}

/// Keeps every call in order. Used by headless runs and tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    pub calls: Vec<Presented>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_banner(&self) -> Option<&str> {
        self.calls.iter().rev().find_map(|call| match call {
            Presented::Banner(text) => Some(text.as_deref()),
            _ => None,
        })?
    }

    pub fn layouts(&self) -> impl Iterator<Item = (Stage, DisplayMapping)> + '_ {
        self.calls.iter().filter_map(|call| match call {
            Presented::Layout(stage, mapping) => Some((*stage, *mapping)),
            _ => None,
        })
    }

    pub fn count(&self, matches: impl Fn(&Presented) -> bool) -> usize {
        self.calls.iter().filter(|call| matches(call)).count()
    }
}

impl Presenter for RecordingPresenter {
    fn present_layout(&mut self, stage: Stage, mapping: &DisplayMapping) {
        self.calls.push(Presented::Layout(stage, *mapping));
    }

    fn show_banner(&mut self, text: Option<&str>) {
        self.calls.push(Presented::Banner(text.map(str::to_string)));
    }

    fn preview_rewards(&mut self, rewards: [i64; 2]) {
        self.calls.push(Presented::RewardPreview(rewards));
    }

    fn present_feedback(&mut self, side: Side, outcome: i64) {
        self.calls.push(Presented::Feedback(side, outcome));
    }

    fn present_missed_warning(&mut self, message: &str) {
        self.calls.push(Presented::MissedWarning(message.to_string()));
    }

    fn update_counter(&mut self, block_total: i64, visible: bool) {
        self.calls.push(Presented::Counter(block_total, visible));
    }

    fn clear(&mut self) {
        self.calls.push(Presented::Cleared);
    }
}
